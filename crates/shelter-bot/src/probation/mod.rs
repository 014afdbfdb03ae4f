//! Probation tracking for adopters and the periodic notification sweep.
//!
//! Volunteers record decisions through [`ProbationRegistry`]; the [`ProbationEngine`]
//! picks them up on its next sweep, notifies the adopter over the configured
//! [`Notifier`] and settles the owner's status so the message is not repeated. The same
//! sweep watches report timestamps and reminds adopters (then a volunteer) when reports
//! stop arriving.

pub mod deadline;
pub mod domain;
pub mod engine;
pub mod messages;
pub mod notifier;
pub mod registry;
pub mod rules;
pub mod seed;
pub mod store;
pub mod telegram;

#[cfg(test)]
mod tests;

pub use deadline::{DeadlineAction, DeadlineLedger, DeadlineMode, PollingUnit, ReminderStage};
pub use domain::{
    ChatId, NewOwner, NewReport, Owner, OwnerId, ProbationarySubject, ProbationaryStatus,
    Report, ReportId, ReportPayload, Species,
};
pub use engine::{DeadlineNotice, ProbationEngine, StatusTransition, SweepConfig, SweepSummary};
pub use notifier::{LogNotifier, Notifier, NotifyError};
pub use registry::{ProbationRegistry, RegistryError, DEFAULT_PROBATION_DAYS, MAX_EXTENSION_DAYS};
pub use rules::StatusRule;
pub use seed::{SeedError, ShelterSeed};
pub use store::{OwnerStore, ReportStore, StoreError};
pub use telegram::TelegramNotifier;
