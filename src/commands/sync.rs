use anyhow::{Context as _, Result, bail};
use dialoguer::Confirm;
use reconcile::{NoProgress, RunOptions, SourceSpec};

use crate::Context;
use crate::cli::{OutputFormat, SyncArgs};
use crate::config::RolesyncConfig;
use crate::progress::FleetProgress;
use crate::{report, ui};

pub fn run(ctx: &Context, args: SyncArgs) -> Result<()> {
    let config = RolesyncConfig::load()?;
    let source = SourceSpec::parse(&args.source);
    let targets = config.resolve_targets(&args.targets);
    if targets.is_empty() {
        bail!("No target hosts given. Pass them as arguments or set `targets` in the config.");
    }

    let opts = RunOptions {
        install_exclude: config.install_exclusions(args.exclude_install.as_deref()),
        remove_exclude: config.remove_exclusions(args.exclude_remove.as_deref()),
        simulate: args.simulate,
        export: config.resolve_export(args.export.as_deref()),
        throttle: config.resolve_throttle(args.throttle),
    };

    let json = args.format == OutputFormat::Json;
    let interactive = !json && !ctx.quiet;

    if interactive {
        ui::header("Role Sync");
        ui::kv("Source", &source.to_string());
        ui::kv(
            "Targets",
            &targets
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        );
        ui::kv(
            "Mode",
            if opts.simulate {
                "simulate (no changes)"
            } else {
                "apply"
            },
        );
        if !opts.install_exclude.is_empty() {
            ui::kv("Never install", &join(opts.install_exclude.iter()));
        }
        if !opts.remove_exclude.is_empty() {
            ui::kv("Never remove", &join(opts.remove_exclude.iter()));
        }
        println!();
    }

    if !opts.simulate && !args.yes && !confirm(targets.len())? {
        ui::warn("Cancelled");
        return Ok(());
    }

    let backend = super::backend(ctx, &config);
    let result = if interactive && console::Term::stdout().is_term() {
        reconcile::run(&backend, &source, &targets, &opts, &FleetProgress::new())
    } else {
        reconcile::run(&backend, &source, &targets, &opts, &NoProgress)
    }
    .with_context(|| format!("Sync from {} failed", source))?;

    if json {
        report::print_result_json(&result)?;
    } else {
        report::display_result(&result);
    }

    let failed = result.failures().len();
    if failed > 0 {
        bail!("{} of {} hosts failed", failed, result.hosts.len());
    }

    if interactive {
        println!();
        ui::success(if result.simulated {
            "Simulation complete"
        } else {
            "Sync complete"
        });
    }
    Ok(())
}

fn confirm(host_count: usize) -> Result<bool> {
    Confirm::new()
        .with_prompt(format!(
            "Install and remove features on {} host(s)?",
            host_count
        ))
        .default(false)
        .interact()
        .context("Confirmation needs a terminal; pass --yes to skip it")
}

fn join<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}
