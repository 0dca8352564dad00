//! Result and catalog display

use anyhow::Result;
use colored::Colorize;
use featurekit::{FeatureRecord, FeatureSnapshot};
use reconcile::{Action, ActionRecord, ReconciliationResult, RunSummary};
use serde::Serialize;

use crate::ui;

/// Display a reconciliation result as a per-host change list
pub fn display_result(result: &ReconciliationResult) {
    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        if result.simulated {
            "Planned Changes".bold()
        } else {
            "Changes Applied".bold()
        }
    );
    println!("│");
    println!("│ Source: {}", result.source.to_string().cyan());
    println!("│");

    for report in &result.hosts {
        let status = match &report.error {
            None => "✓".green(),
            Some(_) => "✗".red(),
        };
        println!("│ {} {}", status, report.host.to_string().bold());

        if report.actions.is_empty() && report.error.is_none() {
            println!("│     {}", "already matches source".dimmed());
        }
        for record in &report.actions {
            println!("│     {}", format_record(record));
        }
        if let Some(e) = &report.error {
            for line in format_failure(e) {
                println!("│     {}", line);
            }
        }
        println!("│");
    }

    for host in &result.skipped_duplicates {
        println!("│ {} {} {}", "-".dimmed(), host, "skipped (duplicate target)".dimmed());
    }
    if !result.skipped_duplicates.is_empty() {
        println!("│");
    }

    let summary = result.summary();
    println!("├─────────────────────────────────────────────────────┤");
    println!("│ {}", format_summary(&summary, result.simulated));
    println!("└─────────────────────────────────────────────────────┘");

    if let Some(path) = &result.exported_to {
        println!();
        ui::kv("Source exported to", &path.display().to_string());
    }
}

/// Error line plus the advice for its category
fn format_failure(error: &featurekit::Error) -> [String; 2] {
    [
        error.to_string().red().to_string(),
        error.category().advice().dimmed().to_string(),
    ]
}

fn format_record(record: &ActionRecord) -> String {
    match record.action {
        Action::Installed => format!("{} {}", "+".green(), record.feature),
        Action::Removed => format!("{} {}", "-".red(), record.feature),
    }
}

fn format_summary(summary: &RunSummary, simulated: bool) -> String {
    format!(
        "Summary: {} {} ({} install, {} remove) on {} hosts, {} failed",
        summary.total_actions().to_string().bold(),
        if simulated { "planned" } else { "applied" },
        summary.installs.to_string().green(),
        summary.removals.to_string().red(),
        summary.hosts_ok + summary.hosts_failed,
        if summary.hosts_failed > 0 {
            summary.hosts_failed.to_string().red()
        } else {
            summary.hosts_failed.to_string().dimmed()
        }
    )
}

#[derive(Serialize)]
struct JsonResult<'a> {
    #[serde(flatten)]
    result: &'a ReconciliationResult,
    summary: RunSummary,
}

/// Print a reconciliation result as JSON
pub fn print_result_json(result: &ReconciliationResult) -> Result<()> {
    let doc = JsonResult {
        result,
        summary: result.summary(),
    };
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

/// Display a catalog as an indented tree
pub fn display_catalog(snapshot: &FeatureSnapshot, all: bool) {
    let local = snapshot.captured_at.with_timezone(&chrono::Local);
    ui::header(&format!("Catalog of {}", snapshot.host));
    ui::kv("Captured", &local.format("%Y-%m-%d %H:%M:%S").to_string());

    let summary = snapshot.summary();
    ui::kv(
        "Installed",
        &format!(
            "{} of {} ({} roles, {} role services, {} features)",
            summary.installed, summary.total, summary.roles, summary.role_services, summary.features
        ),
    );
    println!();

    for record in snapshot.features.iter().filter(|f| all || f.installed) {
        println!("{}", format_catalog_line(record));
    }
}

fn format_catalog_line(record: &FeatureRecord) -> String {
    let marker = if record.installed {
        "[X]".green()
    } else {
        "[ ]".dimmed()
    };
    let indent = "    ".repeat(record.depth.saturating_sub(1) as usize);
    format!(
        "{}{} {:<40} {}",
        indent,
        marker,
        record.display_name,
        record.name.dimmed()
    )
}

/// Print the (filtered) catalog as JSON
pub fn print_catalog_json(snapshot: &FeatureSnapshot, all: bool) -> Result<()> {
    let features: Vec<&FeatureRecord> = snapshot
        .features
        .iter()
        .filter(|f| all || f.installed)
        .collect();
    let json = serde_json::json!({
        "host": snapshot.host,
        "captured_at": snapshot.captured_at,
        "features": features,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use featurekit::{FeatureType, Host};

    #[test]
    fn test_catalog_line_indents_by_depth() {
        colored::control::set_override(false);
        let top = FeatureRecord::new("Web-Server", FeatureType::Role, true);
        let child =
            FeatureRecord::new("Web-Ftp-Server", FeatureType::RoleService, false).with_parent("Web-Server");

        assert!(format_catalog_line(&top).starts_with("[X] Web-Server"));
        assert!(format_catalog_line(&child).starts_with("    [ ] Web-Ftp-Server"));
    }

    #[test]
    fn test_format_record_symbols() {
        colored::control::set_override(false);
        let host = Host::new("srv01");
        let add = ActionRecord::new(host.clone(), "Web-Server", Action::Installed);
        let del = ActionRecord::new(host, "Telnet-Client", Action::Removed);

        assert_eq!(format_record(&add), "+ Web-Server");
        assert_eq!(format_record(&del), "- Telnet-Client");
    }

    #[test]
    fn test_failure_carries_category_advice() {
        colored::control::set_override(false);
        let err = featurekit::Error::UnreachableHost {
            host: "srv01".to_string(),
            message: "WinRM cannot complete the operation".to_string(),
        };

        let [headline, advice] = format_failure(&err);
        assert_eq!(headline, "host unreachable: srv01: WinRM cannot complete the operation");
        assert_eq!(advice, "Check that WinRM is enabled and the host name resolves");
    }

    #[test]
    fn test_format_summary_counts() {
        colored::control::set_override(false);
        let summary = RunSummary {
            hosts_ok: 2,
            hosts_failed: 1,
            installs: 3,
            removals: 2,
        };
        assert_eq!(
            format_summary(&summary, true),
            "Summary: 5 planned (3 install, 2 remove) on 3 hosts, 1 failed"
        );
    }
}
