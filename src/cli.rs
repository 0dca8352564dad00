use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rolesync")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Converge Windows Server roles and features across a fleet",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// PowerShell executable (overrides config)
    #[arg(long, global = true, env = "ROLESYNC_SHELL")]
    pub shell: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Make target hosts match a reference host or manifest
    Sync(SyncArgs),

    /// Save a host's catalog as a manifest file
    Snapshot(SnapshotArgs),

    /// List the catalog of a host or manifest
    Show(ShowArgs),

    /// Inspect or create the config file
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Sync
// ============================================================================

#[derive(Parser)]
pub struct SyncArgs {
    /// Reference host name, or path to a manifest file
    #[arg(short, long)]
    pub source: String,

    /// Target hosts (comma-separated or repeated; defaults to config targets)
    pub targets: Vec<String>,

    /// Never install these features (comma-separated)
    #[arg(long, value_name = "NAMES")]
    pub exclude_install: Option<String>,

    /// Never remove these features (comma-separated)
    #[arg(long, value_name = "NAMES")]
    pub exclude_remove: Option<String>,

    /// Decide and report, but change nothing
    #[arg(long, visible_alias = "dry-run")]
    pub simulate: bool,

    /// Export a live source snapshot to this manifest path
    #[arg(short, long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Maximum hosts reconciled at once
    #[arg(short, long)]
    pub throttle: Option<usize>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

// ============================================================================
// Snapshot / Show
// ============================================================================

#[derive(Parser)]
pub struct SnapshotArgs {
    /// Host to read
    pub host: String,

    /// Manifest path (default: <host>.json in the current directory)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Parser)]
pub struct ShowArgs {
    /// Host name, or path to a manifest file
    pub source: String,

    /// Include features that are not installed
    #[arg(short, long)]
    pub all: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync() {
        let cli = Cli::try_parse_from([
            "rolesync",
            "sync",
            "--source",
            "srv-ref",
            "srv-a,srv-b",
            "srv-c",
            "--exclude-remove",
            "Telnet-Client",
            "--dry-run",
            "-t",
            "2",
        ])
        .unwrap();

        match cli.command {
            Command::Sync(args) => {
                assert_eq!(args.source, "srv-ref");
                assert_eq!(args.targets, vec!["srv-a,srv-b", "srv-c"]);
                assert_eq!(args.exclude_remove.as_deref(), Some("Telnet-Client"));
                assert!(args.simulate);
                assert_eq!(args.throttle, Some(2));
                assert_eq!(args.format, OutputFormat::Table);
            }
            _ => panic!("expected sync"),
        }
    }

    #[test]
    fn test_sync_requires_source() {
        assert!(Cli::try_parse_from(["rolesync", "sync", "srv-a"]).is_err());
    }
}
