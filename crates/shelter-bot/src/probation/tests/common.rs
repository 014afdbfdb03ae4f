use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};

use crate::probation::domain::{
    ChatId, NewOwner, NewReport, Owner, OwnerId, ProbationaryStatus, Report, ReportId, Species,
};
use crate::probation::notifier::{Notifier, NotifyError};
use crate::probation::store::{OwnerStore, ReportStore, StoreError};
use crate::probation::{DeadlineMode, PollingUnit, ProbationEngine, SweepConfig};

pub(super) const VOLUNTEER_CHAT: ChatId = ChatId(5102380657);

pub(super) fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 10)
        .and_then(|date| date.and_hms_opt(12, 30, 0))
        .expect("valid timestamp")
}

pub(super) fn owner(
    species: Species,
    id: u64,
    chat_id: i64,
    status: ProbationaryStatus,
) -> Owner {
    Owner {
        id: OwnerId(id),
        species,
        chat_id: ChatId(chat_id),
        name: format!("{}-owner-{id}", species.label()),
        probationary_status: status,
        period_extend: 0,
        date_of_end_probation: None,
    }
}

pub(super) fn report(
    species: Species,
    id: u64,
    owner_id: u64,
    date_of_last_report: NaiveDateTime,
) -> Report {
    Report {
        id: ReportId(id),
        species,
        owner_id: OwnerId(owner_id),
        date_of_last_report,
        string_report: Some("walked twice, ate well".to_string()),
        photo_report: None,
    }
}

pub(super) fn sweep_config(unit: PollingUnit, mode: DeadlineMode) -> SweepConfig {
    SweepConfig {
        volunteer_chat_id: VOLUNTEER_CHAT,
        deadline_unit: unit,
        deadline_mode: mode,
    }
}

pub(super) type TestEngine = ProbationEngine<MemoryStore, MemoryStore, RecordingNotifier>;

pub(super) fn build_engine(
    store: &Arc<MemoryStore>,
    notifier: &Arc<RecordingNotifier>,
    config: SweepConfig,
) -> TestEngine {
    ProbationEngine::new(store.clone(), store.clone(), notifier.clone(), config)
}

#[derive(Default)]
struct Tables {
    owners: BTreeMap<(Species, OwnerId), Owner>,
    reports: BTreeMap<(Species, ReportId), Report>,
    next_owner: u64,
    next_report: u64,
}

/// Owner and report tables in one place, with hooks to fail selected writes.
#[derive(Default)]
pub(super) struct MemoryStore {
    tables: Mutex<Tables>,
    saved: Mutex<Vec<Owner>>,
    failing_saves: Mutex<HashSet<OwnerId>>,
    unavailable: Mutex<HashSet<Species>>,
    reports_unavailable: Mutex<HashSet<Species>>,
}

impl MemoryStore {
    pub(super) fn with(owners: Vec<Owner>, reports: Vec<Report>) -> Self {
        let store = Self::default();
        {
            let mut tables = store.tables.lock().expect("store mutex poisoned");
            for owner in owners {
                tables.next_owner = tables.next_owner.max(owner.id.0);
                tables.owners.insert((owner.species, owner.id), owner);
            }
            for report in reports {
                tables.next_report = tables.next_report.max(report.id.0);
                tables.reports.insert((report.species, report.id), report);
            }
        }
        store
    }

    pub(super) fn owner(&self, species: Species, id: u64) -> Owner {
        self.tables
            .lock()
            .expect("store mutex poisoned")
            .owners
            .get(&(species, OwnerId(id)))
            .cloned()
            .expect("owner present")
    }

    pub(super) fn saved(&self) -> Vec<Owner> {
        self.saved.lock().expect("saved mutex poisoned").clone()
    }

    pub(super) fn fail_saves_for(&self, id: u64) {
        self.failing_saves
            .lock()
            .expect("failing mutex poisoned")
            .insert(OwnerId(id));
    }

    pub(super) fn make_unavailable(&self, species: Species) {
        self.unavailable
            .lock()
            .expect("unavailable mutex poisoned")
            .insert(species);
    }

    pub(super) fn fail_report_loads(&self, species: Species) {
        self.reports_unavailable
            .lock()
            .expect("unavailable mutex poisoned")
            .insert(species);
    }

    pub(super) fn make_available(&self, species: Species) {
        self.unavailable
            .lock()
            .expect("unavailable mutex poisoned")
            .remove(&species);
        self.reports_unavailable
            .lock()
            .expect("unavailable mutex poisoned")
            .remove(&species);
    }

    fn check_available(&self, species: Species) -> Result<(), StoreError> {
        if self
            .unavailable
            .lock()
            .expect("unavailable mutex poisoned")
            .contains(&species)
        {
            return Err(StoreError::Unavailable("database offline".to_string()));
        }
        Ok(())
    }
}

impl OwnerStore for MemoryStore {
    fn list_owners(&self, species: Species) -> Result<Vec<Owner>, StoreError> {
        self.check_available(species)?;
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(tables
            .owners
            .values()
            .filter(|owner| owner.species == species)
            .cloned()
            .collect())
    }

    fn find_owner(&self, species: Species, id: OwnerId) -> Result<Option<Owner>, StoreError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(tables.owners.get(&(species, id)).cloned())
    }

    fn find_owner_by_chat(
        &self,
        species: Species,
        chat_id: ChatId,
    ) -> Result<Option<Owner>, StoreError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(tables
            .owners
            .values()
            .find(|owner| owner.species == species && owner.chat_id == chat_id)
            .cloned())
    }

    fn insert_owner(&self, owner: NewOwner) -> Result<Owner, StoreError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        tables.next_owner += 1;
        let stored = Owner {
            id: OwnerId(tables.next_owner),
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
        if self
            .failing_saves
            .lock()
            .expect("failing mutex poisoned")
            .contains(&owner.id)
        {
            return Err(StoreError::Unavailable("write rejected".to_string()));
        }
        self.saved
            .lock()
            .expect("saved mutex poisoned")
            .push(owner.clone());
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        tables.owners.insert((owner.species, owner.id), owner.clone());
        Ok(owner)
    }
}

impl ReportStore for MemoryStore {
    fn list_reports(&self, species: Species) -> Result<Vec<Report>, StoreError> {
        self.check_available(species)?;
        if self
            .reports_unavailable
            .lock()
            .expect("unavailable mutex poisoned")
            .contains(&species)
        {
            return Err(StoreError::Unavailable("report table offline".to_string()));
        }
        let tables = self.tables.lock().expect("store mutex poisoned");
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
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(tables
            .reports
            .values()
            .filter(|report| report.species == species && report.owner_id == owner_id)
            .max_by_key(|report| report.date_of_last_report)
            .cloned())
    }

    fn reports_for_owner(
        &self,
        species: Species,
        owner_id: OwnerId,
    ) -> Result<Vec<Report>, StoreError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(tables
            .reports
            .values()
            .filter(|report| report.species == species && report.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn insert_report(&self, report: NewReport) -> Result<Report, StoreError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        tables.next_report += 1;
        let mut stored = Report {
            id: ReportId(tables.next_report),
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
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        tables
            .reports
            .insert((report.species, report.id), report.clone());
        Ok(report)
    }
}

/// Captures every message; chats listed in `failing` reject delivery.
#[derive(Default)]
pub(super) struct RecordingNotifier {
    sent: Mutex<Vec<(ChatId, String)>>,
    failing: Mutex<HashSet<ChatId>>,
}

impl RecordingNotifier {
    pub(super) fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn sent_to(&self, chat_id: ChatId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(destination, _)| *destination == chat_id)
            .map(|(_, text)| text)
            .collect()
    }

    pub(super) fn fail_for(&self, chat_id: i64) {
        self.failing
            .lock()
            .expect("notifier mutex poisoned")
            .insert(ChatId(chat_id));
    }

    pub(super) fn recover(&self) {
        self.failing.lock().expect("notifier mutex poisoned").clear();
    }
}

impl Notifier for RecordingNotifier {
    fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), NotifyError> {
        if self
            .failing
            .lock()
            .expect("notifier mutex poisoned")
            .contains(&chat_id)
        {
            return Err(NotifyError::Transport("connection reset".to_string()));
        }
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push((chat_id, text.to_string()));
        Ok(())
    }
}
