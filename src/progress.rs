//! Progress display for fleet runs.

use colored::Colorize;
use featurekit::Host;
use indicatif::{ProgressBar, ProgressStyle};
use reconcile::{HostReport, ProgressCallback};

/// Progress bar over the hosts of a run
pub struct FleetProgress {
    bar: ProgressBar,
}

impl FleetProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Self { bar }
    }
}

impl Default for FleetProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressCallback for FleetProgress {
    fn on_run_start(&self, hosts: &[Host]) {
        self.bar.set_length(hosts.len() as u64);
    }

    fn on_host_start(&self, host: &Host) {
        self.bar.set_message(host.to_string());
    }

    fn on_host_complete(&self, report: &HostReport) {
        self.bar.suspend(|| match &report.error {
            None => println!(
                "  {} {} ({} changes)",
                "✓".green(),
                report.host,
                report.actions.len()
            ),
            Some(e) => println!("  {} {} ({})", "✗".red(), report.host, e),
        });
        self.bar.inc(1);
    }

    fn on_run_complete(&self) {
        self.bar.finish_and_clear();
    }
}
