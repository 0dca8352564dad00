//! Fleet orchestration - one source, many targets
//!
//! The source snapshot is acquired first, strictly one at a time. Targets
//! are then reconciled on a bounded rayon pool, each host running its own
//! two-phase loop. A failing host is recorded in its report and never
//! stops the others; only source acquisition and manifest export abort
//! the run.

use crate::action::{ActionLog, ActionRecord};
use crate::context::ProgressCallback;
use crate::engine::Reconciler;
use crate::exclusion::ExclusionSet;
use featurekit::{FeatureSnapshot, Host, HostBackend};
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// Default number of hosts reconciled at once.
pub const DEFAULT_THROTTLE: usize = 5;

/// Where the reference snapshot comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// Query a live host
    Host(Host),
    /// Load a previously saved manifest
    Manifest(PathBuf),
}

impl SourceSpec {
    /// Interpret a command-line value.
    ///
    /// An existing file is a manifest; anything else is a host name.
    pub fn parse(value: &str) -> Self {
        let path = PathBuf::from(value);
        if path.is_file() {
            Self::Manifest(path)
        } else {
            Self::Host(Host::new(value))
        }
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host(host) => write!(f, "{}", host),
            Self::Manifest(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Options for a reconciliation run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Names the install phase must not install
    pub install_exclude: ExclusionSet,
    /// Names the removal phase must not remove
    pub remove_exclude: ExclusionSet,
    /// Decide and log, but change nothing
    pub simulate: bool,
    /// Save a live source snapshot here
    pub export: Option<PathBuf>,
    /// Maximum hosts reconciled at once
    pub throttle: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            install_exclude: ExclusionSet::new(),
            remove_exclude: ExclusionSet::new(),
            simulate: false,
            export: None,
            throttle: DEFAULT_THROTTLE,
        }
    }
}

/// Outcome for one target host.
#[derive(Debug, Serialize)]
pub struct HostReport {
    /// Target host
    pub host: Host,
    /// Actions taken before the host finished or failed
    pub actions: ActionLog,
    /// Why the host stopped early, if it did
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<featurekit::Error>,
}

impl HostReport {
    /// Whether the host completed both phases.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

fn serialize_error<S: Serializer>(
    error: &Option<featurekit::Error>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Aggregate of a run across every target.
#[derive(Debug, Serialize)]
pub struct ReconciliationResult {
    /// Host the reference snapshot was read from
    pub source: Host,
    /// Whether this was a simulated run
    pub simulated: bool,
    /// Per-host outcomes, in target order
    pub hosts: Vec<HostReport>,
    /// Where the source snapshot was exported, if it was
    pub exported_to: Option<PathBuf>,
    /// Targets dropped because an earlier target named the same host
    pub skipped_duplicates: Vec<Host>,
}

impl ReconciliationResult {
    /// Every action record, host by host in target order.
    pub fn records(&self) -> Vec<&ActionRecord> {
        self.hosts.iter().flat_map(|h| h.actions.iter()).collect()
    }

    /// Hosts that stopped early.
    pub fn failures(&self) -> Vec<&HostReport> {
        self.hosts.iter().filter(|h| !h.is_success()).collect()
    }

    /// Whether every host completed.
    pub fn is_success(&self) -> bool {
        self.hosts.iter().all(HostReport::is_success)
    }

    /// Counts for display.
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for report in &self.hosts {
            if report.is_success() {
                summary.hosts_ok += 1;
            } else {
                summary.hosts_failed += 1;
            }
            summary.installs += report.actions.installs();
            summary.removals += report.actions.removals();
        }
        summary
    }
}

/// Counts across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Hosts that completed both phases
    pub hosts_ok: usize,
    /// Hosts that stopped early
    pub hosts_failed: usize,
    /// Install records (real or simulated)
    pub installs: usize,
    /// Removal records (real or simulated)
    pub removals: usize,
}

impl RunSummary {
    /// Total actions across all hosts.
    pub fn total_actions(&self) -> usize {
        self.installs + self.removals
    }
}

/// Failures that abort a whole run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The reference snapshot could not be read
    #[error("Failed to read source {spec}: {cause}")]
    Source {
        /// Source as given
        spec: String,
        /// Underlying error
        #[source]
        cause: featurekit::Error,
    },

    /// The source snapshot could not be exported
    #[error("Failed to export source snapshot: {cause}")]
    Export {
        /// Underlying error
        #[source]
        cause: featurekit::Error,
    },

    /// The worker pool could not be created
    #[error("Failed to create thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Reconcile every target against the source.
pub fn run<B, P>(
    backend: &B,
    source: &SourceSpec,
    targets: &[Host],
    opts: &RunOptions,
    progress: &P,
) -> Result<ReconciliationResult, RunError>
where
    B: HostBackend + ?Sized,
    P: ProgressCallback,
{
    let (snapshot, exported_to) = acquire_source(backend, source, opts.export.as_ref())?;
    log::info!(
        "Source {}: {} installed of {} features",
        snapshot.host,
        snapshot.installed().len(),
        snapshot.len()
    );

    let (targets, skipped_duplicates) = dedup_targets(targets);
    progress.on_run_start(&targets);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.throttle.max(1))
        .build()?;

    let reconciler = Reconciler::new(
        backend,
        &opts.install_exclude,
        &opts.remove_exclude,
        opts.simulate,
    );

    let hosts: Vec<HostReport> = pool.install(|| {
        targets
            .par_iter()
            .map(|host| {
                progress.on_host_start(host);
                let mut actions = ActionLog::new();
                let error = reconciler.reconcile(&snapshot, host, &mut actions).err();
                if let Some(e) = &error {
                    log::error!("{}: {}", host, e);
                }
                let report = HostReport {
                    host: host.clone(),
                    actions,
                    error,
                };
                progress.on_host_complete(&report);
                report
            })
            .collect()
    });

    progress.on_run_complete();

    Ok(ReconciliationResult {
        source: snapshot.host,
        simulated: opts.simulate,
        hosts,
        exported_to,
        skipped_duplicates,
    })
}

/// Read the reference snapshot, exporting it when it came from a live host.
fn acquire_source<B: HostBackend + ?Sized>(
    backend: &B,
    source: &SourceSpec,
    export: Option<&PathBuf>,
) -> Result<(FeatureSnapshot, Option<PathBuf>), RunError> {
    let source_error = |cause| RunError::Source {
        spec: source.to_string(),
        cause,
    };

    match source {
        SourceSpec::Manifest(path) => {
            let snapshot = featurekit::load_manifest(path).map_err(source_error)?;
            if export.is_some() {
                log::debug!("Source is a manifest; skipping export");
            }
            Ok((snapshot, None))
        }
        SourceSpec::Host(host) => {
            let snapshot = backend.query_inventory(host).map_err(source_error)?;
            let exported = match export {
                Some(path) => {
                    featurekit::save_manifest(&snapshot, path)
                        .map_err(|cause| RunError::Export { cause })?;
                    log::info!("Exported source snapshot to {}", path.display());
                    Some(path.clone())
                }
                None => None,
            };
            Ok((snapshot, exported))
        }
    }
}

/// Split targets into first occurrences and repeats (host names are
/// case-insensitive).
fn dedup_targets(targets: &[Host]) -> (Vec<Host>, Vec<Host>) {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(targets.len());
    let mut repeated = Vec::new();
    for host in targets {
        if seen.insert(host.name().to_lowercase()) {
            unique.push(host.clone());
        } else {
            log::warn!("Ignoring duplicate target {}", host);
            repeated.push(host.clone());
        }
    }
    (unique, repeated)
}
