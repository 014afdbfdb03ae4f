//! Outbound message texts.

use super::deadline::PollingUnit;
use super::domain::{ChatId, Species};

pub fn probation_passed() -> String {
    "Good afternoon, congratulations: your probation period is over.".to_string()
}

pub fn probation_not_passed() -> String {
    "Good afternoon. Unfortunately you did not pass the probation period. \
     Please return the animal to the shelter."
        .to_string()
}

pub fn bad_reporting(species: Species) -> String {
    format!(
        "Dear adopter, we noticed that your reports are not as detailed as they need to be. \
         Please take reporting more seriously, otherwise the shelter volunteers will have to \
         check the {}'s living conditions in person.",
        species.label()
    )
}

pub fn probation_extended(days: u32) -> String {
    format!("Dear adopter, your probation period has been extended by {days} days.")
}

pub fn owner_reminder(unit: PollingUnit) -> String {
    format!(
        "Dear adopter, we noticed that over the last {} your reports about the animal \
         were not detailed. Please take reporting seriously.",
        unit.span_label()
    )
}

pub fn volunteer_escalation(name: &str, chat_id: ChatId, unit: PollingUnit) -> String {
    format!(
        "Adopter {name} (chat id {chat_id}) has not submitted a report for more than two {}, \
         please get in touch with them.",
        unit.plural_label()
    )
}
