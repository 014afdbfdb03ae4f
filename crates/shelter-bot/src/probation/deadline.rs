use std::collections::HashMap;

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

use super::domain::{ReportId, Species};

/// Granularity of the reporting deadline windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollingUnit {
    Minute,
    Hour,
    Day,
}

impl PollingUnit {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "minute" | "minutes" | "min" => Some(Self::Minute),
            "hour" | "hours" | "h" => Some(Self::Hour),
            "day" | "days" | "d" => Some(Self::Day),
            _ => None,
        }
    }

    fn minutes(self) -> i64 {
        match self {
            PollingUnit::Minute => 1,
            PollingUnit::Hour => 60,
            PollingUnit::Day => 24 * 60,
        }
    }

    pub fn span_label(self) -> &'static str {
        match self {
            PollingUnit::Minute => "minute",
            PollingUnit::Hour => "hour",
            PollingUnit::Day => "24 hours",
        }
    }

    pub fn plural_label(self) -> &'static str {
        match self {
            PollingUnit::Minute => "minutes",
            PollingUnit::Hour => "hours",
            PollingUnit::Day => "days",
        }
    }

    pub fn truncate(self, at: NaiveDateTime) -> NaiveDateTime {
        let time = match self {
            PollingUnit::Minute => NaiveTime::from_hms_opt(at.hour(), at.minute(), 0),
            PollingUnit::Hour => NaiveTime::from_hms_opt(at.hour(), 0, 0),
            PollingUnit::Day => NaiveTime::from_hms_opt(0, 0, 0),
        };
        time.map(|time| at.date().and_time(time)).unwrap_or(at)
    }

    /// Full units between `since` and `now` truncated to this unit. A report is one
    /// unit old only once a whole unit has passed since it was submitted.
    pub fn elapsed(self, since: NaiveDateTime, now: NaiveDateTime) -> i64 {
        let delta = self.truncate(now) - since;
        delta.num_seconds().div_euclid(self.minutes() * 60)
    }
}

/// How deadline windows are matched against the elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeadlineMode {
    /// Fire only while exactly one (owner) or two (volunteer) units have elapsed.
    Window,
    /// Fire once the threshold is reached, even if the exact unit was missed.
    CatchUp,
}

impl DeadlineMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "window" | "exact" => Some(Self::Window),
            "catch-up" | "catchup" | "threshold" => Some(Self::CatchUp),
            _ => None,
        }
    }
}

/// Notification a report's deadline calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineAction {
    RemindOwner,
    EscalateToVolunteer,
}

/// Furthest deadline notification already delivered for a report timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ReminderStage {
    #[default]
    Quiet,
    OwnerReminded,
    VolunteerEscalated,
}

impl DeadlineAction {
    fn stage(self) -> ReminderStage {
        match self {
            DeadlineAction::RemindOwner => ReminderStage::OwnerReminded,
            DeadlineAction::EscalateToVolunteer => ReminderStage::VolunteerEscalated,
        }
    }
}

pub fn evaluate(elapsed: i64, mode: DeadlineMode, sent: ReminderStage) -> Option<DeadlineAction> {
    let (remind, escalate) = match mode {
        DeadlineMode::Window => (elapsed == 1, elapsed == 2),
        DeadlineMode::CatchUp => (elapsed >= 1, elapsed >= 2),
    };

    if remind && !escalate && sent < ReminderStage::OwnerReminded {
        Some(DeadlineAction::RemindOwner)
    } else if escalate && sent < ReminderStage::VolunteerEscalated {
        Some(DeadlineAction::EscalateToVolunteer)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy)]
struct LedgerEntry {
    reported_at: NaiveDateTime,
    stage: ReminderStage,
}

/// Remembers which deadline notifications went out for each report timestamp so
/// repeated sweeps inside one unit do not repeat them. A new submission moves
/// `date_of_last_report` and starts the report over.
#[derive(Debug, Default)]
pub struct DeadlineLedger {
    entries: HashMap<(Species, ReportId), LedgerEntry>,
}

impl DeadlineLedger {
    pub fn stage(&self, species: Species, id: ReportId, reported_at: NaiveDateTime) -> ReminderStage {
        match self.entries.get(&(species, id)) {
            Some(entry) if entry.reported_at == reported_at => entry.stage,
            _ => ReminderStage::Quiet,
        }
    }

    pub fn record(
        &mut self,
        species: Species,
        id: ReportId,
        reported_at: NaiveDateTime,
        action: DeadlineAction,
    ) {
        let stage = action.stage();
        self.entries
            .entry((species, id))
            .and_modify(|entry| {
                if entry.reported_at != reported_at {
                    *entry = LedgerEntry { reported_at, stage };
                } else if entry.stage < stage {
                    entry.stage = stage;
                }
            })
            .or_insert(LedgerEntry { reported_at, stage });
    }

    /// Drops entries for reports of `species` that are no longer in the store.
    pub fn retain_seen(&mut self, species: Species, seen: &[ReportId]) {
        self.entries
            .retain(|(entry_species, id), _| *entry_species != species || seen.contains(id));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
