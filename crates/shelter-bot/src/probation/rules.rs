use serde::Serialize;
use tracing::{debug, warn};

use super::domain::{Owner, ProbationarySubject, ProbationaryStatus};
use super::engine::{StatusTransition, SweepSummary};
use super::messages;
use super::notifier::Notifier;
use super::store::OwnerStore;

/// Status-driven notification rule. Each rule matches a volunteer decision, tells the
/// owner about it and settles the owner into a terminal status so later sweeps skip it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusRule {
    Passed,
    NotPassed,
    BadReporting,
    DeadlineExtended,
}

impl StatusRule {
    /// Evaluation order of a sweep.
    pub const ORDERED: [StatusRule; 4] = [
        StatusRule::Passed,
        StatusRule::NotPassed,
        StatusRule::BadReporting,
        StatusRule::DeadlineExtended,
    ];

    pub fn trigger(self) -> ProbationaryStatus {
        match self {
            StatusRule::Passed => ProbationaryStatus::Passed,
            StatusRule::NotPassed => ProbationaryStatus::NotPassed,
            StatusRule::BadReporting => ProbationaryStatus::BadReporting,
            StatusRule::DeadlineExtended => ProbationaryStatus::Extended,
        }
    }

    pub fn terminal(self) -> ProbationaryStatus {
        match self {
            StatusRule::Passed => ProbationaryStatus::FinallyPassed,
            StatusRule::NotPassed => ProbationaryStatus::FinallyNotPassed,
            StatusRule::BadReporting => ProbationaryStatus::Unsatisfactory,
            StatusRule::DeadlineExtended => ProbationaryStatus::FinallyExtended,
        }
    }

    pub fn matches<S: ProbationarySubject>(self, subject: &S) -> bool {
        if subject.status() != self.trigger() {
            return false;
        }
        match self {
            StatusRule::DeadlineExtended => subject.extension_days() > 0,
            _ => true,
        }
    }

    pub fn message<S: ProbationarySubject>(self, subject: &S) -> String {
        match self {
            StatusRule::Passed => messages::probation_passed(),
            StatusRule::NotPassed => messages::probation_not_passed(),
            StatusRule::BadReporting => messages::bad_reporting(subject.species()),
            StatusRule::DeadlineExtended => {
                messages::probation_extended(subject.extension_days())
            }
        }
    }

    /// Subjects of the snapshot this rule applies to, in snapshot order.
    pub fn select<S: ProbationarySubject>(self, snapshot: &[S]) -> Vec<&S> {
        snapshot
            .iter()
            .filter(|subject| self.matches(*subject))
            .collect()
    }
}

/// Runs one rule over a pre-sweep snapshot: select, deliver, then persist the terminal
/// status for each owner whose notification went out. A failed delivery leaves the
/// owner untouched so the next sweep retries it.
pub(crate) fn apply<O, N>(
    rule: StatusRule,
    snapshot: &[Owner],
    owners: &O,
    notifier: &N,
    summary: &mut SweepSummary,
) where
    O: OwnerStore + ?Sized,
    N: Notifier + ?Sized,
{
    for owner in rule.select(snapshot) {
        let text = rule.message(owner);
        if let Err(err) = notifier.send_message(owner.chat_id(), &text) {
            warn!(
                ?rule,
                owner_id = %owner.id(),
                species = %owner.species(),
                error = %err,
                "status notification failed; status left unchanged"
            );
            summary.delivery_failures += 1;
            continue;
        }
        summary.notifications_sent += 1;
        debug!(?rule, owner_id = %owner.id(), chat_id = %owner.chat_id(), "status notification sent");

        let mut settled = owner.clone();
        settled.set_status(rule.terminal());
        match owners.save_owner(settled) {
            Ok(_) => summary.transitions.push(StatusTransition {
                rule,
                species: owner.species(),
                owner_id: owner.id(),
                from: owner.status(),
                to: rule.terminal(),
            }),
            Err(err) => {
                warn!(
                    ?rule,
                    owner_id = %owner.id(),
                    species = %owner.species(),
                    error = %err,
                    "failed to persist terminal status"
                );
                summary.persistence_failures += 1;
            }
        }
    }
}
