use anyhow::{Result, bail};

use crate::Context;
use crate::cli::ConfigCommand;
use crate::config::RolesyncConfig;
use crate::{paths, ui};

pub fn run(_ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(),
        ConfigCommand::Path => {
            println!("{}", paths::config_file()?.display());
            Ok(())
        }
        ConfigCommand::Init { force } => init(force),
    }
}

fn show() -> Result<()> {
    let path = paths::config_file()?;
    let config = RolesyncConfig::load_from(&path)?;

    ui::header("Configuration");
    ui::kv("Config file", &path.display().to_string());
    if !path.exists() {
        ui::dim("Not found, showing defaults. Run 'rolesync config init' to create it.");
    }

    ui::section("Effective settings");
    ui::kv("throttle", &config.throttle.to_string());
    ui::kv("shell", config.shell.as_deref().unwrap_or("(platform default)"));
    ui::kv("targets", &list_or_none(&config.targets));
    ui::kv("install_exclude", &list_or_none(&config.install_exclude));
    ui::kv("remove_exclude", &list_or_none(&config.remove_exclude));
    ui::kv("export_path", config.export_path.as_deref().unwrap_or("(none)"));

    let retry = &config.retry;
    ui::section("Retry");
    ui::kv("max_attempts", &retry.max_attempts.to_string());
    ui::kv("base_delay_secs", &retry.base_delay_secs.to_string());
    ui::kv("backoff_factor", &retry.backoff_factor.to_string());
    ui::kv("max_delay_secs", &retry.max_delay_secs.to_string());

    Ok(())
}

fn init(force: bool) -> Result<()> {
    let path = paths::config_file()?;
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    RolesyncConfig::default().save_to(&path)?;
    ui::success(&format!("Created {}", path.display()));
    Ok(())
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}
