use super::common::*;
use std::sync::Arc;

use chrono::Duration;

use crate::probation::domain::{ChatId, OwnerId, ProbationaryStatus, Species};
use crate::probation::{
    DeadlineMode, PollingUnit, ProbationRegistry, RegistryError, StoreError,
    DEFAULT_PROBATION_DAYS,
};

fn registry() -> (ProbationRegistry<MemoryStore, MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    (ProbationRegistry::new(store.clone(), store.clone()), store)
}

#[test]
fn register_owner_starts_an_active_probation() {
    let (registry, _) = registry();

    let owner = registry
        .register_owner(Species::Dog, " Alex ", ChatId(1525), now())
        .expect("owner registered");

    assert_eq!(owner.name, "Alex");
    assert_eq!(owner.probationary_status, ProbationaryStatus::Active);
    assert_eq!(owner.period_extend, 0);
    assert_eq!(
        owner.date_of_end_probation,
        Some(now() + Duration::days(DEFAULT_PROBATION_DAYS))
    );
    assert_eq!(
        registry
            .find_owner(Species::Dog, owner.id)
            .expect("owner found"),
        owner
    );
}

#[test]
fn register_owner_rejects_duplicate_chat_per_species() {
    let (registry, _) = registry();
    registry
        .register_owner(Species::Cat, "Alex", ChatId(1525), now())
        .expect("first registration");

    match registry.register_owner(Species::Cat, "Alex", ChatId(1525), now()) {
        Err(RegistryError::AlreadyExists { species, chat_id }) => {
            assert_eq!(species, Species::Cat);
            assert_eq!(chat_id, ChatId(1525));
        }
        other => panic!("expected duplicate owner error, got {other:?}"),
    }

    registry
        .register_owner(Species::Dog, "Alex", ChatId(1525), now())
        .expect("same chat may adopt another species");
}

#[test]
fn find_owner_reports_missing_ids() {
    let (registry, _) = registry();
    match registry.find_owner(Species::Dog, OwnerId(42)) {
        Err(RegistryError::NotFound { id, .. }) => assert_eq!(id, OwnerId(42)),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn change_status_accepts_volunteer_decisions_only() {
    let (registry, _) = registry();
    let owner = registry
        .register_owner(Species::Dog, "Alex", ChatId(1), now())
        .expect("registered");

    let updated = registry
        .change_status(Species::Dog, owner.id, ProbationaryStatus::BadReporting)
        .expect("volunteer decision accepted");
    assert_eq!(
        updated.probationary_status,
        ProbationaryStatus::BadReporting
    );

    assert!(matches!(
        registry.change_status(Species::Dog, owner.id, ProbationaryStatus::FinallyPassed),
        Err(RegistryError::InvalidTransition { .. })
    ));
    assert!(matches!(
        registry.change_status(Species::Dog, owner.id, ProbationaryStatus::Active),
        Err(RegistryError::InvalidTransition { .. })
    ));
}

#[test]
fn closed_probation_cannot_be_reopened() {
    let (registry, store) = registry();
    let mut owner = registry
        .register_owner(Species::Cat, "Maria", ChatId(2), now())
        .expect("registered");
    owner.probationary_status = ProbationaryStatus::FinallyNotPassed;
    crate::probation::OwnerStore::save_owner(store.as_ref(), owner.clone()).expect("saved");

    match registry.change_status(Species::Cat, owner.id, ProbationaryStatus::Passed) {
        Err(RegistryError::InvalidTransition { from, to }) => {
            assert_eq!(from, ProbationaryStatus::FinallyNotPassed);
            assert_eq!(to, ProbationaryStatus::Passed);
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
    assert!(matches!(
        registry.extend_probation(Species::Cat, owner.id, 5),
        Err(RegistryError::InvalidTransition { .. })
    ));
}

#[test]
fn extend_probation_validates_days_and_moves_end_date() {
    let (registry, _) = registry();
    let owner = registry
        .register_owner(Species::Dog, "Alex", ChatId(3), now())
        .expect("registered");

    for days in [0, 31] {
        match registry.extend_probation(Species::Dog, owner.id, days) {
            Err(RegistryError::InvalidExtension { days: rejected }) => assert_eq!(rejected, days),
            other => panic!("expected invalid extension, got {other:?}"),
        }
    }

    let extended = registry
        .extend_probation(Species::Dog, owner.id, 14)
        .expect("extension accepted");
    assert_eq!(extended.period_extend, 14);
    assert_eq!(
        extended.date_of_end_probation,
        Some(now() + Duration::days(DEFAULT_PROBATION_DAYS + 14))
    );
    assert_eq!(
        extended.probationary_status,
        ProbationaryStatus::Active,
        "the volunteer marks EXTENDED separately"
    );
}

#[test]
fn reports_are_updated_in_place_per_owner() {
    let (registry, _) = registry();
    let owner = registry
        .register_owner(Species::Cat, "Maria", ChatId(4), now())
        .expect("registered");

    let first = registry
        .record_text_report(Species::Cat, owner.id, "sleeps a lot", now())
        .expect("text stored");
    let later = now() + Duration::hours(3);
    let second = registry
        .record_photo_report(Species::Cat, owner.id, vec![0xFF, 0xD8, 0xFF], later)
        .expect("photo stored");
    let third = registry
        .record_text_report(Species::Cat, owner.id, "plays with a ball", later)
        .expect("text replaced");

    assert_eq!(first.id, second.id);
    assert_eq!(second.id, third.id);
    assert_eq!(third.string_report.as_deref(), Some("plays with a ball"));
    assert_eq!(third.photo_report.as_deref(), Some(&[0xFF, 0xD8, 0xFF][..]));
    assert_eq!(third.date_of_last_report, later);
    assert_eq!(
        registry
            .reports_for_owner(Species::Cat, owner.id)
            .expect("listed")
            .len(),
        1
    );
    assert_eq!(
        registry
            .latest_report(Species::Cat, owner.id)
            .expect("lookup")
            .map(|report| report.id),
        Some(first.id)
    );
}

#[test]
fn reports_for_unknown_owner_are_rejected() {
    let (registry, _) = registry();
    assert!(matches!(
        registry.record_text_report(Species::Dog, OwnerId(9), "hello", now()),
        Err(RegistryError::NotFound { .. })
    ));
}

#[test]
fn store_failures_surface_through_registry() {
    let (registry, store) = registry();
    let owner = registry
        .register_owner(Species::Dog, "Alex", ChatId(5), now())
        .expect("registered");
    store.fail_saves_for(owner.id.0);

    assert!(matches!(
        registry.change_status(Species::Dog, owner.id, ProbationaryStatus::Passed),
        Err(RegistryError::Store(StoreError::Unavailable(_)))
    ));
}

#[test]
fn volunteer_extension_reaches_the_owner_on_next_sweep() {
    let (registry, store) = registry();
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = build_engine(
        &store,
        &notifier,
        sweep_config(PollingUnit::Day, DeadlineMode::Window),
    );
    let owner = registry
        .register_owner(Species::Dog, "Alex", ChatId(321583984), now())
        .expect("registered");
    registry
        .extend_probation(Species::Dog, owner.id, 5)
        .expect("extended");
    registry
        .change_status(Species::Dog, owner.id, ProbationaryStatus::Extended)
        .expect("marked extended");

    engine.run_sweep_at(now());

    let messages = notifier.sent_to(ChatId(321583984));
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("5 days"));
    assert_eq!(
        registry
            .find_owner(Species::Dog, owner.id)
            .expect("found")
            .probationary_status,
        ProbationaryStatus::FinallyExtended
    );
}
