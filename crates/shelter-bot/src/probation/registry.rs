use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use tracing::info;

use super::domain::{
    ChatId, NewOwner, NewReport, Owner, OwnerId, ProbationaryStatus, Report, ReportPayload,
    Species,
};
use super::store::{OwnerStore, ReportStore, StoreError};

/// Length of a fresh probation period.
pub const DEFAULT_PROBATION_DAYS: i64 = 30;
/// Longest extension a volunteer may grant in one step.
pub const MAX_EXTENSION_DAYS: u32 = 30;

/// Volunteer-facing operations on owners and their reports. The sweep reacts to the
/// statuses written here.
pub struct ProbationRegistry<O: ?Sized, R: ?Sized> {
    owners: Arc<O>,
    reports: Arc<R>,
    probation_days: i64,
}

impl<O, R> ProbationRegistry<O, R>
where
    O: OwnerStore + ?Sized,
    R: ReportStore + ?Sized,
{
    pub fn new(owners: Arc<O>, reports: Arc<R>) -> Self {
        Self {
            owners,
            reports,
            probation_days: DEFAULT_PROBATION_DAYS,
        }
    }

    pub fn with_probation_days(mut self, days: i64) -> Self {
        self.probation_days = days;
        self
    }

    /// Registers an adopter; a chat may hold only one owner per species.
    pub fn register_owner(
        &self,
        species: Species,
        name: &str,
        chat_id: ChatId,
        now: NaiveDateTime,
    ) -> Result<Owner, RegistryError> {
        if self.owners.find_owner_by_chat(species, chat_id)?.is_some() {
            return Err(RegistryError::AlreadyExists { species, chat_id });
        }

        let owner = self.owners.insert_owner(NewOwner {
            species,
            chat_id,
            name: name.trim().to_string(),
            date_of_end_probation: Some(now + Duration::days(self.probation_days)),
        })?;
        info!(%species, owner_id = %owner.id, %chat_id, "owner registered");
        Ok(owner)
    }

    pub fn find_owner(&self, species: Species, id: OwnerId) -> Result<Owner, RegistryError> {
        self.owners
            .find_owner(species, id)?
            .ok_or(RegistryError::NotFound { species, id })
    }

    pub fn change_status(
        &self,
        species: Species,
        id: OwnerId,
        status: ProbationaryStatus,
    ) -> Result<Owner, RegistryError> {
        let mut owner = self.find_owner(species, id)?;
        if !owner.probationary_status.accepts_volunteer_decision(status) {
            return Err(RegistryError::InvalidTransition {
                from: owner.probationary_status,
                to: status,
            });
        }

        owner.probationary_status = status;
        let saved = self.owners.save_owner(owner)?;
        info!(%species, owner_id = %id, %status, "probation status changed");
        Ok(saved)
    }

    /// Records the extension days and pushes the probation end date. The owner is told
    /// once a volunteer marks them `EXTENDED`.
    pub fn extend_probation(
        &self,
        species: Species,
        id: OwnerId,
        days: u32,
    ) -> Result<Owner, RegistryError> {
        if days == 0 || days > MAX_EXTENSION_DAYS {
            return Err(RegistryError::InvalidExtension { days });
        }

        let mut owner = self.find_owner(species, id)?;
        if owner.probationary_status.is_closed() {
            return Err(RegistryError::InvalidTransition {
                from: owner.probationary_status,
                to: ProbationaryStatus::Extended,
            });
        }

        owner.period_extend = days;
        owner.date_of_end_probation = owner
            .date_of_end_probation
            .map(|end| end + Duration::days(i64::from(days)));
        Ok(self.owners.save_owner(owner)?)
    }

    pub fn record_text_report(
        &self,
        species: Species,
        owner_id: OwnerId,
        text: &str,
        at: NaiveDateTime,
    ) -> Result<Report, RegistryError> {
        self.record(species, owner_id, ReportPayload::Text(text.to_string()), at)
    }

    pub fn record_photo_report(
        &self,
        species: Species,
        owner_id: OwnerId,
        image: Vec<u8>,
        at: NaiveDateTime,
    ) -> Result<Report, RegistryError> {
        self.record(species, owner_id, ReportPayload::Photo(image), at)
    }

    fn record(
        &self,
        species: Species,
        owner_id: OwnerId,
        payload: ReportPayload,
        at: NaiveDateTime,
    ) -> Result<Report, RegistryError> {
        self.find_owner(species, owner_id)?;

        let report = match self.reports.latest_report(species, owner_id)? {
            Some(mut existing) => {
                existing.apply(payload, at);
                self.reports.save_report(existing)?
            }
            None => self.reports.insert_report(NewReport {
                species,
                owner_id,
                date_of_last_report: at,
                payload,
            })?,
        };
        Ok(report)
    }

    pub fn latest_report(
        &self,
        species: Species,
        owner_id: OwnerId,
    ) -> Result<Option<Report>, RegistryError> {
        Ok(self.reports.latest_report(species, owner_id)?)
    }

    pub fn reports_for_owner(
        &self,
        species: Species,
        owner_id: OwnerId,
    ) -> Result<Vec<Report>, RegistryError> {
        Ok(self.reports.reports_for_owner(species, owner_id)?)
    }
}

/// Error raised by the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("{species} owner with chat id {chat_id} already exists")]
    AlreadyExists { species: Species, chat_id: ChatId },
    #[error("{species} owner with id {id} not found")]
    NotFound { species: Species, id: OwnerId },
    #[error("the probation period cannot be extended by {days} days")]
    InvalidExtension { days: u32 },
    #[error("status {from} cannot change to {to}")]
    InvalidTransition {
        from: ProbationaryStatus,
        to: ProbationaryStatus,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}
