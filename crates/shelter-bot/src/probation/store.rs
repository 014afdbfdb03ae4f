use super::domain::{ChatId, NewOwner, NewReport, Owner, OwnerId, Report, Species};

/// Owner persistence seam. Implementations key rows by `(species, id)`.
pub trait OwnerStore: Send + Sync {
    fn list_owners(&self, species: Species) -> Result<Vec<Owner>, StoreError>;
    fn find_owner(&self, species: Species, id: OwnerId) -> Result<Option<Owner>, StoreError>;
    fn find_owner_by_chat(
        &self,
        species: Species,
        chat_id: ChatId,
    ) -> Result<Option<Owner>, StoreError>;
    fn insert_owner(&self, owner: NewOwner) -> Result<Owner, StoreError>;
    /// Upsert by id.
    fn save_owner(&self, owner: Owner) -> Result<Owner, StoreError>;
}

/// Report persistence seam.
pub trait ReportStore: Send + Sync {
    fn list_reports(&self, species: Species) -> Result<Vec<Report>, StoreError>;
    fn latest_report(
        &self,
        species: Species,
        owner_id: OwnerId,
    ) -> Result<Option<Report>, StoreError>;
    fn reports_for_owner(
        &self,
        species: Species,
        owner_id: OwnerId,
    ) -> Result<Vec<Report>, StoreError>;
    fn insert_report(&self, report: NewReport) -> Result<Report, StoreError>;
    fn save_report(&self, report: Report) -> Result<Report, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
