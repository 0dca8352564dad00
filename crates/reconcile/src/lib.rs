//! # reconcile
//!
//! Converges a fleet of Windows Server hosts onto the role/feature set of a
//! reference host or a saved manifest.
//!
//! ## Architecture
//!
//! - **Exclusion**: names each phase must leave alone
//! - **Engine**: the per-host two-phase install/removal loop
//! - **Action log**: ordered record of what was (or would be) changed
//! - **Orchestrator**: source acquisition and the bounded parallel fan-out
//!
//! ## Usage
//!
//! ```no_run
//! use featurekit::{Host, PowerShellBackend};
//! use reconcile::{NoProgress, RunOptions, SourceSpec, run};
//!
//! let backend = PowerShellBackend::new();
//! let source = SourceSpec::parse("srv-ref-01");
//! let targets = vec![Host::new("srv-web-01"), Host::new("srv-web-02")];
//! let opts = RunOptions {
//!     simulate: true,
//!     ..Default::default()
//! };
//!
//! let result = run(&backend, &source, &targets, &opts, &NoProgress)?;
//! for record in result.records() {
//!     println!("{} {} {}", record.host, record.action, record.feature);
//! }
//! # Ok::<(), reconcile::RunError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod action;
pub mod context;
pub mod engine;
pub mod exclusion;
pub mod orchestrator;

pub use action::{Action, ActionLog, ActionRecord};
pub use context::{NoProgress, ProgressCallback};
pub use engine::{Eligibility, Phase, Reconciler, Step};
pub use exclusion::{ExclusionSet, is_excluded};
pub use orchestrator::{
    DEFAULT_THROTTLE, HostReport, ReconciliationResult, RunError, RunOptions, RunSummary,
    SourceSpec, run,
};
