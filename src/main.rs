mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod report;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub quiet: bool,
    pub shell: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        quiet: cli.quiet,
        shell: cli.shell,
    };

    match cli.command {
        Command::Sync(args) => commands::sync::run(&ctx, args),
        Command::Snapshot(args) => commands::snapshot::run(&ctx, args),
        Command::Show(args) => commands::show::run(&ctx, args),
        Command::Config(cmd) => commands::config::run(&ctx, cmd),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "rolesync", &mut io::stdout());
            Ok(())
        }
    }
}
