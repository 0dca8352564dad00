use anyhow::{Context as _, Result};
use featurekit::{FeatureSnapshot, HostBackend};
use reconcile::SourceSpec;

use crate::Context;
use crate::cli::{OutputFormat, ShowArgs};
use crate::config::RolesyncConfig;
use crate::report;

pub fn run(ctx: &Context, args: ShowArgs) -> Result<()> {
    let snapshot = load_snapshot(ctx, &SourceSpec::parse(&args.source))?;

    match args.format {
        OutputFormat::Json => report::print_catalog_json(&snapshot, args.all),
        OutputFormat::Table => {
            report::display_catalog(&snapshot, args.all);
            Ok(())
        }
    }
}

/// Read a catalog from a manifest, or from a live host
fn load_snapshot(ctx: &Context, source: &SourceSpec) -> Result<FeatureSnapshot> {
    match source {
        SourceSpec::Manifest(path) => featurekit::load_manifest(path)
            .with_context(|| format!("Could not load manifest {}", path.display())),
        SourceSpec::Host(host) => {
            let config = RolesyncConfig::load()?;
            super::backend(ctx, &config)
                .query_inventory(host)
                .with_context(|| format!("Could not read the catalog of {}", host))
        }
    }
}
