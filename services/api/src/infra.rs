use chrono::NaiveDateTime;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use shelter_bot::config::TelegramConfig;
use shelter_bot::probation::{
    ChatId, LogNotifier, NewOwner, NewReport, Notifier, NotifyError, Owner, OwnerId, OwnerStore,
    ProbationaryStatus, Report, ReportId, ReportStore, ShelterSeed, Species, StoreError,
    SweepSummary, TelegramNotifier,
};
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) sweeps: Arc<SweepBoard>,
}

/// Running totals of the sweep scheduler plus the most recent summary.
#[derive(Debug, Clone, Default, Serialize)]
pub(crate) struct SweepStats {
    pub(crate) sweeps: u64,
    pub(crate) notifications_sent: u64,
    pub(crate) failures: u64,
    pub(crate) last: Option<SweepSummary>,
}

#[derive(Debug, Default)]
pub(crate) struct SweepBoard {
    stats: Mutex<SweepStats>,
}

impl SweepBoard {
    pub(crate) fn record(&self, summary: SweepSummary) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.sweeps += 1;
        stats.notifications_sent += summary.notifications_sent as u64;
        stats.failures += summary.failures() as u64;
        stats.last = Some(summary);
    }

    pub(crate) fn snapshot(&self) -> SweepStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Default)]
struct ShelterTables {
    owners: BTreeMap<(Species, OwnerId), Owner>,
    reports: BTreeMap<(Species, ReportId), Report>,
}

impl ShelterTables {
    fn next_owner_id(&self, species: Species) -> OwnerId {
        let max = self
            .owners
            .keys()
            .filter(|(owner_species, _)| *owner_species == species)
            .map(|(_, id)| id.0)
            .max()
            .unwrap_or(0);
        OwnerId(max + 1)
    }

    fn next_report_id(&self, species: Species) -> ReportId {
        let max = self
            .reports
            .keys()
            .filter(|(report_species, _)| *report_species == species)
            .map(|(_, id)| id.0)
            .max()
            .unwrap_or(0);
        ReportId(max + 1)
    }
}

/// Owner and report tables for both species, kept in process memory.
#[derive(Default, Clone)]
pub(crate) struct InMemoryShelterStore {
    tables: Arc<Mutex<ShelterTables>>,
}

impl InMemoryShelterStore {
    pub(crate) fn from_seed(seed: ShelterSeed) -> Self {
        let mut tables = ShelterTables::default();
        for owner in seed.owners {
            tables.owners.insert((owner.species, owner.id), owner);
        }
        for report in seed.reports {
            tables.reports.insert((report.species, report.id), report);
        }
        Self {
            tables: Arc::new(Mutex::new(tables)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ShelterTables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("shelter store mutex poisoned".to_string()))
    }
}

impl OwnerStore for InMemoryShelterStore {
    fn list_owners(&self, species: Species) -> Result<Vec<Owner>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .owners
            .values()
            .filter(|owner| owner.species == species)
            .cloned()
            .collect())
    }

    fn find_owner(&self, species: Species, id: OwnerId) -> Result<Option<Owner>, StoreError> {
        Ok(self.lock()?.owners.get(&(species, id)).cloned())
    }

    fn find_owner_by_chat(
        &self,
        species: Species,
        chat_id: ChatId,
    ) -> Result<Option<Owner>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .owners
            .values()
            .find(|owner| owner.species == species && owner.chat_id == chat_id)
            .cloned())
    }

    fn insert_owner(&self, owner: NewOwner) -> Result<Owner, StoreError> {
        let mut tables = self.lock()?;
        let stored = Owner {
            id: tables.next_owner_id(owner.species),
            species: owner.species,
            chat_id: owner.chat_id,
            name: owner.name,
            probationary_status: ProbationaryStatus::Active,
            period_extend: 0,
            date_of_end_probation: owner.date_of_end_probation,
        };
        tables
            .owners
            .insert((stored.species, stored.id), stored.clone());
        Ok(stored)
    }

    fn save_owner(&self, owner: Owner) -> Result<Owner, StoreError> {
        let mut tables = self.lock()?;
        let key = (owner.species, owner.id);
        if !tables.owners.contains_key(&key) {
            return Err(StoreError::NotFound);
        }
        tables.owners.insert(key, owner.clone());
        Ok(owner)
    }
}

impl ReportStore for InMemoryShelterStore {
    fn list_reports(&self, species: Species) -> Result<Vec<Report>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .reports
            .values()
            .filter(|report| report.species == species)
            .cloned()
            .collect())
    }

    fn latest_report(
        &self,
        species: Species,
        owner_id: OwnerId,
    ) -> Result<Option<Report>, StoreError> {
        Ok(self
            .reports_for_owner(species, owner_id)?
            .into_iter()
            .max_by_key(|report| report.date_of_last_report))
    }

    fn reports_for_owner(
        &self,
        species: Species,
        owner_id: OwnerId,
    ) -> Result<Vec<Report>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .reports
            .values()
            .filter(|report| report.species == species && report.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn insert_report(&self, report: NewReport) -> Result<Report, StoreError> {
        let mut tables = self.lock()?;
        let mut stored = Report {
            id: tables.next_report_id(report.species),
            species: report.species,
            owner_id: report.owner_id,
            date_of_last_report: report.date_of_last_report,
            string_report: None,
            photo_report: None,
        };
        stored.apply(report.payload, report.date_of_last_report);
        tables
            .reports
            .insert((stored.species, stored.id), stored.clone());
        Ok(stored)
    }

    fn save_report(&self, report: Report) -> Result<Report, StoreError> {
        let mut tables = self.lock()?;
        let key = (report.species, report.id);
        if !tables.reports.contains_key(&key) {
            return Err(StoreError::NotFound);
        }
        tables.reports.insert(key, report.clone());
        Ok(report)
    }
}

/// Picks the Bot API client when a token is configured, otherwise logs messages only.
/// Must run outside the async runtime because the Bot API client blocks.
pub(crate) fn build_notifier(
    telegram: &TelegramConfig,
    deliver: bool,
) -> Result<Arc<dyn Notifier>, NotifyError> {
    match telegram.bot_token.as_deref() {
        Some(token) if deliver => Ok(Arc::new(TelegramNotifier::new(
            &telegram.api_base,
            token,
        )?)),
        _ => Ok(Arc::new(LogNotifier)),
    }
}

pub(crate) fn parse_timestamp(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .map_err(|err| format!("invalid timestamp '{value}': {err}"))
}
