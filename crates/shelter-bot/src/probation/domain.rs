use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Identifier assigned to an owner by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub u64);

/// Identifier assigned to a report row by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub u64);

/// Telegram chat identifier used as a message destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Animal species handled by the shelter. Owners and reports are stored per species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Dog,
    Cat,
}

impl Species {
    pub const ALL: [Species; 2] = [Species::Dog, Species::Cat];

    pub fn label(self) -> &'static str {
        match self {
            Species::Dog => "dog",
            Species::Cat => "cat",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle state of an adopter's probation period.
///
/// Volunteers move an owner out of `Active` into one of the pending outcomes
/// (`Passed`, `NotPassed`, `BadReporting`, `Extended`); the sweep then notifies the
/// owner and settles the status into the matching terminal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProbationaryStatus {
    Active,
    Passed,
    FinallyPassed,
    NotPassed,
    FinallyNotPassed,
    BadReporting,
    Unsatisfactory,
    Extended,
    FinallyExtended,
}

impl ProbationaryStatus {
    pub fn label(self) -> &'static str {
        match self {
            ProbationaryStatus::Active => "ACTIVE",
            ProbationaryStatus::Passed => "PASSED",
            ProbationaryStatus::FinallyPassed => "FINALLY_PASSED",
            ProbationaryStatus::NotPassed => "NOT_PASSED",
            ProbationaryStatus::FinallyNotPassed => "FINALLY_NOT_PASSED",
            ProbationaryStatus::BadReporting => "BAD_REPORTING",
            ProbationaryStatus::Unsatisfactory => "UNSATISFACTORY",
            ProbationaryStatus::Extended => "EXTENDED",
            ProbationaryStatus::FinallyExtended => "FINALLY_EXTENDED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let status = match raw.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => ProbationaryStatus::Active,
            "PASSED" => ProbationaryStatus::Passed,
            "FINALLY_PASSED" => ProbationaryStatus::FinallyPassed,
            "NOT_PASSED" => ProbationaryStatus::NotPassed,
            "FINALLY_NOT_PASSED" => ProbationaryStatus::FinallyNotPassed,
            "BAD_REPORTING" => ProbationaryStatus::BadReporting,
            "UNSATISFACTORY" => ProbationaryStatus::Unsatisfactory,
            "EXTENDED" => ProbationaryStatus::Extended,
            "FINALLY_EXTENDED" => ProbationaryStatus::FinallyExtended,
            _ => return None,
        };
        Some(status)
    }

    /// Statuses only the sweep writes; used to suppress re-notification.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProbationaryStatus::FinallyPassed
                | ProbationaryStatus::FinallyNotPassed
                | ProbationaryStatus::Unsatisfactory
                | ProbationaryStatus::FinallyExtended
        )
    }

    /// Probation is over; no further volunteer decision applies.
    pub fn is_closed(self) -> bool {
        matches!(
            self,
            ProbationaryStatus::FinallyPassed | ProbationaryStatus::FinallyNotPassed
        )
    }

    /// Statuses a volunteer may assign by hand.
    pub fn is_volunteer_decision(self) -> bool {
        matches!(
            self,
            ProbationaryStatus::Passed
                | ProbationaryStatus::NotPassed
                | ProbationaryStatus::BadReporting
                | ProbationaryStatus::Extended
        )
    }

    pub fn accepts_volunteer_decision(self, next: ProbationaryStatus) -> bool {
        next.is_volunteer_decision() && !self.is_closed()
    }
}

impl fmt::Display for ProbationaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Adopter on probation. Dog and cat owners share this shape and are told apart by
/// `species`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    pub species: Species,
    pub chat_id: ChatId,
    pub name: String,
    pub probationary_status: ProbationaryStatus,
    #[serde(default)]
    pub period_extend: u32,
    #[serde(default)]
    pub date_of_end_probation: Option<NaiveDateTime>,
}

/// Fields supplied when registering an owner; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOwner {
    pub species: Species,
    pub chat_id: ChatId,
    pub name: String,
    pub date_of_end_probation: Option<NaiveDateTime>,
}

/// Capability set the sweep rules need from a subject on probation.
pub trait ProbationarySubject {
    fn id(&self) -> OwnerId;
    fn species(&self) -> Species;
    fn chat_id(&self) -> ChatId;
    fn name(&self) -> &str;
    fn status(&self) -> ProbationaryStatus;
    fn set_status(&mut self, status: ProbationaryStatus);
    fn extension_days(&self) -> u32;
}

impl ProbationarySubject for Owner {
    fn id(&self) -> OwnerId {
        self.id
    }

    fn species(&self) -> Species {
        self.species
    }

    fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> ProbationaryStatus {
        self.probationary_status
    }

    fn set_status(&mut self, status: ProbationaryStatus) {
        self.probationary_status = status;
    }

    fn extension_days(&self) -> u32 {
        self.period_extend
    }
}

/// Latest progress report of an owner. One row per owner, updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub species: Species,
    pub owner_id: OwnerId,
    pub date_of_last_report: NaiveDateTime,
    #[serde(default)]
    pub string_report: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_report: Option<Vec<u8>>,
}

/// Report row that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReport {
    pub species: Species,
    pub owner_id: OwnerId,
    pub date_of_last_report: NaiveDateTime,
    pub payload: ReportPayload,
}

/// Content of a single submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportPayload {
    Text(String),
    Photo(Vec<u8>),
}

impl Report {
    /// Applies a submission to the row; the other payload kind is left untouched.
    pub fn apply(&mut self, payload: ReportPayload, submitted_at: NaiveDateTime) {
        match payload {
            ReportPayload::Text(text) => self.string_report = Some(text),
            ReportPayload::Photo(bytes) => self.photo_report = Some(bytes),
        }
        self.date_of_last_report = submitted_at;
    }
}
