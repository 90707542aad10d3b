//! Two-run privilege expiry scenario over the SQLite backend.

use chrono::{Duration, TimeZone, Utc};
use coursegate_core::observability::EngineMetrics;
use coursegate_core::scheduler::{
    AuthorizationState, FixedClock, PrivilegeExpiryScheduler, StandingAuthorization, Transition,
};
use coursegate_core::store::{AccountStore, AuthorizationStore, SqliteStore};
use coursegate_core::{UserAccount, UserRole};
use std::sync::Arc;

const GRACE_DAYS: u32 = 14;

#[tokio::test]
async fn lapsed_authorization_enters_grace_then_revokes_once() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    store.put_account(&UserAccount::administrator("dev")).unwrap();

    let start = Utc.with_ymd_and_hms(2026, 5, 1, 3, 0, 0).unwrap();
    let clock = Arc::new(FixedClock::new(start));
    let metrics = Arc::new(EngineMetrics::new().unwrap());
    let scheduler = PrivilegeExpiryScheduler::new(
        store.clone(),
        store.clone(),
        clock.clone(),
        metrics.clone(),
        "dev",
        GRACE_DAYS,
    );

    let overdue = start - Duration::days(i64::from(GRACE_DAYS) + 1);
    store
        .save_authorization(&StandingAuthorization::new_active("dev", overdue, GRACE_DAYS))
        .await
        .unwrap();

    // Run 1: ACTIVE -> GRACE, role untouched.
    let first = scheduler.run_once().await.unwrap();
    assert_eq!(first.transition, Transition::EnteredGrace);
    assert_eq!(first.state, AuthorizationState::Grace);
    assert!(!first.role_demoted);
    let account = store.get_account("dev").await.unwrap().unwrap();
    assert_eq!(account.role, UserRole::Administrator);

    let record = store.load_authorization("dev").await.unwrap().unwrap();
    assert!(!record.active);
    assert_eq!(record.deactivated_at, Some(start));

    // Run 2, grace window over: GRACE -> REVOKED, role demoted.
    clock.advance(Duration::days(i64::from(GRACE_DAYS) + 1));
    let second = scheduler.run_once().await.unwrap();
    assert_eq!(second.transition, Transition::Revoked);
    assert_eq!(second.state, AuthorizationState::Revoked);
    assert!(second.role_demoted);
    let account = store.get_account("dev").await.unwrap().unwrap();
    assert_eq!(account.role, UserRole::Ordinary);

    // Run 3: nothing left to do.
    let third = scheduler.run_once().await.unwrap();
    assert_eq!(third.transition, Transition::NoChange);
    assert_eq!(third.state, AuthorizationState::Revoked);
    assert!(!third.role_demoted);

    assert_eq!(metrics.transition_count("entered_grace"), 1);
    assert_eq!(metrics.transition_count("revoked"), 1);
}

#[tokio::test]
async fn renewal_brings_a_revoked_record_back_to_active() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    store.put_account(&UserAccount::member("dev", None)).unwrap();
    let now = Utc.with_ymd_and_hms(2026, 5, 1, 3, 0, 0).unwrap();
    let scheduler = PrivilegeExpiryScheduler::new(
        store.clone(),
        store.clone(),
        Arc::new(FixedClock::new(now)),
        Arc::new(EngineMetrics::new().unwrap()),
        "dev",
        GRACE_DAYS,
    );

    let mut record = StandingAuthorization::new_active("dev", now - Duration::days(90), GRACE_DAYS);
    record.deactivate(now - Duration::days(60));
    store.save_authorization(&record).await.unwrap();
    assert_eq!(
        scheduler.run_once().await.unwrap().state,
        AuthorizationState::Revoked
    );

    let renewed = scheduler.renew().await.unwrap();
    assert!(renewed.active);
    let stored = store.load_authorization("dev").await.unwrap().unwrap();
    assert_eq!(stored.last_renewed_at, now);
    assert!(stored.deactivated_at.is_none());
    assert_eq!(
        scheduler.run_once().await.unwrap().state,
        AuthorizationState::Active
    );
}
