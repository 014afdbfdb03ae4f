use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::deadline::{self, DeadlineAction, DeadlineLedger, DeadlineMode, PollingUnit};
use super::domain::{
    ChatId, Owner, OwnerId, ProbationarySubject, ProbationaryStatus, Report, ReportId, Species,
};
use super::messages;
use super::notifier::Notifier;
use super::rules::{self, StatusRule};
use super::store::{OwnerStore, ReportStore};

/// Settings the sweep needs beyond its collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    pub volunteer_chat_id: ChatId,
    pub deadline_unit: PollingUnit,
    pub deadline_mode: DeadlineMode,
}

/// Status change written by a rule during a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusTransition {
    pub rule: StatusRule,
    pub species: Species,
    pub owner_id: OwnerId,
    pub from: ProbationaryStatus,
    pub to: ProbationaryStatus,
}

/// Deadline notification delivered during a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadlineNotice {
    pub action: DeadlineAction,
    pub species: Species,
    pub report_id: ReportId,
    pub owner_id: OwnerId,
    pub destination: ChatId,
}

/// Outcome of one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub started_at: NaiveDateTime,
    pub owners_scanned: usize,
    pub reports_scanned: usize,
    pub notifications_sent: usize,
    pub delivery_failures: usize,
    pub persistence_failures: usize,
    pub load_failures: usize,
    pub orphan_reports: usize,
    pub transitions: Vec<StatusTransition>,
    pub deadline_notices: Vec<DeadlineNotice>,
}

impl SweepSummary {
    pub fn new(started_at: NaiveDateTime) -> Self {
        Self {
            started_at,
            owners_scanned: 0,
            reports_scanned: 0,
            notifications_sent: 0,
            delivery_failures: 0,
            persistence_failures: 0,
            load_failures: 0,
            orphan_reports: 0,
            transitions: Vec::new(),
            deadline_notices: Vec::new(),
        }
    }

    pub fn failures(&self) -> usize {
        self.delivery_failures + self.persistence_failures + self.load_failures
    }
}

#[derive(Debug, Default)]
struct SpeciesSnapshot {
    owners: Vec<Owner>,
    reports: Vec<Report>,
    reports_loaded: bool,
}

/// Periodic probation sweep. Each call to [`ProbationEngine::run_sweep`] loads fresh
/// owner and report snapshots for every species, runs the status rules in
/// [`StatusRule::ORDERED`] and finishes with the reporting deadline check.
///
/// Sweeps are serialized: the deadline ledger lock is held for the whole pass, so an
/// overlapping call waits for the running one instead of double-notifying.
pub struct ProbationEngine<O, R, N>
where
    O: ?Sized,
    R: ?Sized,
    N: ?Sized,
{
    owners: Arc<O>,
    reports: Arc<R>,
    notifier: Arc<N>,
    config: SweepConfig,
    ledger: Mutex<DeadlineLedger>,
}

impl<O, R, N> ProbationEngine<O, R, N>
where
    O: OwnerStore + ?Sized,
    R: ReportStore + ?Sized,
    N: Notifier + ?Sized,
{
    pub fn new(owners: Arc<O>, reports: Arc<R>, notifier: Arc<N>, config: SweepConfig) -> Self {
        Self {
            owners,
            reports,
            notifier,
            config,
            ledger: Mutex::new(DeadlineLedger::default()),
        }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Runs one sweep against the local wall clock.
    pub fn run_sweep(&self) -> SweepSummary {
        self.run_sweep_at(Local::now().naive_local())
    }

    pub fn run_sweep_at(&self, now: NaiveDateTime) -> SweepSummary {
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        let mut summary = SweepSummary::new(now);

        let snapshots: Vec<(Species, SpeciesSnapshot)> = Species::ALL
            .into_iter()
            .map(|species| (species, self.load_snapshot(species, &mut summary)))
            .collect();

        for rule in StatusRule::ORDERED {
            for (_, snapshot) in &snapshots {
                rules::apply(
                    rule,
                    &snapshot.owners,
                    self.owners.as_ref(),
                    self.notifier.as_ref(),
                    &mut summary,
                );
            }
        }

        for (species, snapshot) in &snapshots {
            // The ledger for a species is only trusted against a complete report list.
            if snapshot.reports_loaded {
                self.check_deadlines(*species, snapshot, now, &mut ledger, &mut summary);
            }
        }

        info!(
            owners = summary.owners_scanned,
            reports = summary.reports_scanned,
            sent = summary.notifications_sent,
            transitions = summary.transitions.len(),
            failures = summary.failures(),
            "probation sweep finished"
        );
        summary
    }

    fn load_snapshot(&self, species: Species, summary: &mut SweepSummary) -> SpeciesSnapshot {
        let owners = self.owners.list_owners(species).unwrap_or_else(|err| {
            warn!(%species, error = %err, "failed to load owners; skipping species");
            summary.load_failures += 1;
            Vec::new()
        });
        let (reports, reports_loaded) = match self.reports.list_reports(species) {
            Ok(reports) => (reports, true),
            Err(err) => {
                warn!(%species, error = %err, "failed to load reports; skipping deadline check");
                summary.load_failures += 1;
                (Vec::new(), false)
            }
        };
        summary.owners_scanned += owners.len();
        summary.reports_scanned += reports.len();
        SpeciesSnapshot {
            owners,
            reports,
            reports_loaded,
        }
    }

    fn check_deadlines(
        &self,
        species: Species,
        snapshot: &SpeciesSnapshot,
        now: NaiveDateTime,
        ledger: &mut DeadlineLedger,
        summary: &mut SweepSummary,
    ) {
        let owners: HashMap<OwnerId, &Owner> = snapshot
            .owners
            .iter()
            .map(|owner| (owner.id, owner))
            .collect();
        let unit = self.config.deadline_unit;

        for report in &snapshot.reports {
            let elapsed = unit.elapsed(report.date_of_last_report, now);
            let sent = ledger.stage(species, report.id, report.date_of_last_report);
            let Some(action) = deadline::evaluate(elapsed, self.config.deadline_mode, sent)
            else {
                continue;
            };

            let Some(owner) = owners.get(&report.owner_id) else {
                warn!(
                    %species,
                    report_id = report.id.0,
                    owner_id = %report.owner_id,
                    "report references an unknown owner"
                );
                summary.orphan_reports += 1;
                continue;
            };

            let (destination, text) = match action {
                DeadlineAction::RemindOwner => (owner.chat_id(), messages::owner_reminder(unit)),
                DeadlineAction::EscalateToVolunteer => (
                    self.config.volunteer_chat_id,
                    messages::volunteer_escalation(owner.name(), owner.chat_id(), unit),
                ),
            };

            if let Err(err) = self.notifier.send_message(destination, &text) {
                warn!(
                    %species,
                    report_id = report.id.0,
                    ?action,
                    error = %err,
                    "deadline notification failed"
                );
                summary.delivery_failures += 1;
                continue;
            }

            debug!(%species, report_id = report.id.0, ?action, %destination, "deadline notification sent");
            ledger.record(species, report.id, report.date_of_last_report, action);
            summary.notifications_sent += 1;
            summary.deadline_notices.push(DeadlineNotice {
                action,
                species,
                report_id: report.id,
                owner_id: owner.id(),
                destination,
            });
        }

        let seen: Vec<ReportId> = snapshot.reports.iter().map(|report| report.id).collect();
        ledger.retain_seen(species, &seen);
    }
}
