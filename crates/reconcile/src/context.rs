//! Progress reporting hooks
//!
//! The orchestrator reports through this trait so the crate can be driven
//! from a terminal, a service or a test without knowing which.

use crate::orchestrator::HostReport;
use featurekit::Host;

/// Progress callback for a reconciliation run
///
/// Host callbacks arrive from worker threads, possibly at the same time,
/// so implementations take `&self` and must be `Sync`.
pub trait ProgressCallback: Sync {
    /// Called once the source snapshot is in hand, before any host starts
    fn on_run_start(&self, hosts: &[Host]);

    /// Called when a worker picks up a host
    fn on_host_start(&self, host: &Host);

    /// Called when a host finishes, successfully or not
    fn on_host_complete(&self, report: &HostReport);

    /// Called after every host has finished
    fn on_run_complete(&self);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_run_start(&self, _hosts: &[Host]) {}
    fn on_host_start(&self, _host: &Host) {}
    fn on_host_complete(&self, _report: &HostReport) {}
    fn on_run_complete(&self) {}
}
