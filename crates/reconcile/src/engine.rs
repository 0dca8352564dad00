//! Reconciliation engine - drives one host to match a source snapshot
//!
//! The engine runs two phases against a target host:
//! 1. Install - every feature installed on the source but missing on the target
//! 2. Removal - every feature absent on the source but present on the target
//!
//! Acting on one feature can silently install or remove others (cascades),
//! so each phase re-reads the target before a decision while its view is
//! [`Eligibility::Fresh`]. A skipped or simulated step turns the view
//! [`Eligibility::Stale`] for the rest of the phase and nothing turns it
//! fresh again: later decisions in that phase use the last view read, even
//! after a real change.

use crate::action::{Action, ActionLog, ActionRecord};
use crate::exclusion::{ExclusionSet, is_excluded};
use featurekit::{FeatureSnapshot, Host, HostBackend, Result};
use std::collections::HashSet;

/// Whether a phase re-reads the target before its next decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// Re-read the target before deciding
    Fresh,
    /// Keep using the last view read
    Stale,
}

/// Outcome of one decision, as far as eligibility is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A real install or removal was made
    Applied,
    /// An install or removal was decided but not made
    Simulated,
    /// Nothing to do (already in place, or excluded)
    Skipped,
}

impl Eligibility {
    /// Eligibility for the next decision.
    pub fn after(self, step: Step) -> Self {
        match step {
            Step::Applied => self,
            Step::Simulated | Step::Skipped => Eligibility::Stale,
        }
    }
}

/// The two reconciliation phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Install what the source has and the target lacks
    Install,
    /// Remove what the target has and the source lacks
    Removal,
}

impl Phase {
    /// Source names this phase walks, in catalog order.
    fn candidates(self, source: &FeatureSnapshot) -> Vec<&str> {
        match self {
            Phase::Install => source.installed(),
            Phase::Removal => source.not_installed(),
        }
    }

    /// Whether a feature with the given target presence needs action.
    fn needs_action(self, on_target: bool) -> bool {
        match self {
            Phase::Install => !on_target,
            Phase::Removal => on_target,
        }
    }

    fn action(self) -> Action {
        match self {
            Phase::Install => Action::Installed,
            Phase::Removal => Action::Removed,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Phase::Install => "install",
            Phase::Removal => "removal",
        }
    }
}

/// Reconciles target hosts against a source snapshot.
///
/// A reconciler holds only read-only inputs, so one instance can serve
/// many hosts concurrently.
pub struct Reconciler<'a, B: HostBackend + ?Sized> {
    backend: &'a B,
    install_exclude: &'a ExclusionSet,
    remove_exclude: &'a ExclusionSet,
    simulate: bool,
}

impl<'a, B: HostBackend + ?Sized> Reconciler<'a, B> {
    /// Create a reconciler.
    pub fn new(
        backend: &'a B,
        install_exclude: &'a ExclusionSet,
        remove_exclude: &'a ExclusionSet,
        simulate: bool,
    ) -> Self {
        Self {
            backend,
            install_exclude,
            remove_exclude,
            simulate,
        }
    }

    /// Reconcile `host` against `source`, appending decisions to `log`.
    ///
    /// The target's installed names are written to an audit file first;
    /// an audit failure is logged and ignored. Any query, install or
    /// removal failure stops the host at once. Records appended before the
    /// failure stay in `log`.
    pub fn reconcile(&self, source: &FeatureSnapshot, host: &Host, log: &mut ActionLog) -> Result<()> {
        let current = self.backend.query_inventory(host)?;
        self.audit(host, &current);

        self.run_phase(Phase::Install, source, host, log)?;
        self.run_phase(Phase::Removal, source, host, log)?;
        Ok(())
    }

    fn audit(&self, host: &Host, current: &FeatureSnapshot) {
        match self.backend.persist_audit(host, &current.installed()) {
            Ok(path) => log::info!("{}: pre-change audit written to {}", host, path.display()),
            Err(e) => log::warn!("{}: {} ({})", host, e.category().description(), e),
        }
    }

    fn run_phase(
        &self,
        phase: Phase,
        source: &FeatureSnapshot,
        host: &Host,
        log: &mut ActionLog,
    ) -> Result<()> {
        let exclude = match phase {
            Phase::Install => self.install_exclude,
            Phase::Removal => self.remove_exclude,
        };

        let mut eligibility = Eligibility::Fresh;
        let mut on_target: HashSet<String> = HashSet::new();

        for name in phase.candidates(source) {
            if eligibility == Eligibility::Fresh {
                on_target = installed_set(&self.backend.query_inventory(host)?);
            }

            let step = if phase.needs_action(on_target.contains(name)) && !is_excluded(name, exclude) {
                let step = if self.simulate {
                    log::info!("{}: [simulate] {} {}", host, phase.label(), name);
                    Step::Simulated
                } else {
                    log::info!("{}: {} {}", host, phase.label(), name);
                    match phase {
                        Phase::Install => self.backend.install(host, name)?,
                        Phase::Removal => self.backend.remove(host, name)?,
                    }
                    Step::Applied
                };
                log.push(ActionRecord::new(host.clone(), name, phase.action()));
                step
            } else {
                log::debug!("{}: {} phase skips {}", host, phase.label(), name);
                Step::Skipped
            };

            eligibility = eligibility.after(step);
        }

        Ok(())
    }
}

fn installed_set(snapshot: &FeatureSnapshot) -> HashSet<String> {
    snapshot.installed_names().into_iter().map(str::to_string).collect()
}
