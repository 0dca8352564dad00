use anyhow::{Context as _, Result};
use featurekit::{Host, HostBackend};
use std::path::PathBuf;

use crate::Context;
use crate::cli::SnapshotArgs;
use crate::config::RolesyncConfig;
use crate::ui;

pub fn run(ctx: &Context, args: SnapshotArgs) -> Result<()> {
    let config = RolesyncConfig::load()?;
    let backend = super::backend(ctx, &config);
    let host = Host::new(args.host.trim());

    let snapshot = backend
        .query_inventory(&host)
        .with_context(|| format!("Could not read the catalog of {}", host))?;

    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("{}.json", host)));
    featurekit::save_manifest(&snapshot, &path)
        .with_context(|| format!("Could not save manifest for {}", host))?;

    if !ctx.quiet {
        let summary = snapshot.summary();
        ui::success(&format!("Saved {} to {}", host, path.display()));
        ui::dim(&format!(
            "{} of {} features installed",
            summary.installed, summary.total
        ));
    }
    Ok(())
}
