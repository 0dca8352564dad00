pub mod config;
pub mod show;
pub mod snapshot;
pub mod sync;

use featurekit::PowerShellBackend;

use crate::Context;
use crate::config::RolesyncConfig;

/// Build the PowerShell backend from the command line and config
pub fn backend(ctx: &Context, config: &RolesyncConfig) -> PowerShellBackend {
    let backend = PowerShellBackend::new().with_retry(config.retry.to_retry_config());
    match ctx.shell.as_deref().or(config.shell.as_deref()) {
        Some(shell) => backend.with_shell(shell),
        None => backend,
    }
}
