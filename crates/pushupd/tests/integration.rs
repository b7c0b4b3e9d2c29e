//! Integration tests for pushupd
//!
//! These tests drive the full command → device → payment → database cycle
//! with a mock counter and a mock billing endpoint.

use pushup_billing::{MockGateway, PaymentRequest};
use pushup_config::{SessionSettings, parse_config};
use pushup_core::{
    BridgeEngine, BusyLock, CommandInbox, CoreEvent, EnqueueTarget, LockStatus, enqueue,
};
use pushup_device::MockDevice;
use pushup_store::{SqliteStore, StoreOptions, ViolationStore};
use pushup_util::{MonotonicInstant, RuleId, UNPAID_SENTINEL, UserId, ViolationId};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn seed_database(path: &Path) -> Arc<SqliteStore> {
    let store = SqliteStore::open(path, StoreOptions::default()).unwrap();
    Connection::open(path)
        .unwrap()
        .execute_batch(
            r#"
            INSERT INTO rules (id, user_id) VALUES (7, 42);
            INSERT INTO violation (id, rule_id, date_creation) VALUES (99, 7, '2025-03-01 08:00:00');
            INSERT INTO parents (p_id, ch_id, push_ups, time) VALUES (10, 42, 15, 30);
            "#,
        )
        .unwrap();
    Arc::new(store)
}

fn date_paid(path: &Path, violation: i64) -> String {
    Connection::open(path)
        .unwrap()
        .query_row(
            "SELECT date_paid FROM violation WHERE id = ?",
            [violation],
            |row| row.get(0),
        )
        .unwrap()
}

fn session_settings() -> SessionSettings {
    SessionSettings {
        poll_interval: Duration::from_millis(10),
        min_session: Duration::from_secs(2),
        manual_paid_check_every: 5,
    }
}

#[test]
fn test_full_session_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("pushupd.db");
    let store = seed_database(&db);

    let device = MockDevice::new();
    let gateway = MockGateway::new();
    let inbox = CommandInbox::new(dir.path().join("pushup_cmd.txt"));
    let lock = BusyLock::new(dir.path().join("pushup_busy.lock"));

    let mut engine = BridgeEngine::new(
        store.clone(),
        Arc::new(gateway.clone()),
        Box::new(device.clone()),
        inbox.clone(),
        lock.clone(),
        session_settings(),
    );

    std::fs::write(inbox.path(), "7|Alice").unwrap();
    let t0 = MonotonicInstant::now();

    // Dispatch
    let step = engine.step(t0);
    assert!(matches!(&step.events[..], [CoreEvent::SessionStarted { .. }]));
    assert_eq!(device.sent_lines(), vec!["42|Alice|15|30"]);
    assert!(!inbox.is_pending());
    assert!(lock.is_held());

    // Counter acknowledges, then goes quiet for a poll
    device.push_line("ACK|START");
    device.push_timeout();
    engine.step(t0 + Duration::from_millis(200));
    let step = engine.step(t0 + Duration::from_secs(1));
    assert!(step.pause);
    assert!(engine.is_busy());

    // Series finished
    device.push_line(r#"{"action":"DONE","user_id":"42","count":15}"#);
    let step = engine.step(t0 + Duration::from_secs(40));
    assert!(matches!(
        &step.events[..],
        [CoreEvent::SessionCompleted { payment_ok: true, marked_paid: true, .. }]
    ));

    assert_eq!(
        gateway.requests(),
        vec![PaymentRequest::new(ViolationId::new(99), UserId::new(42))]
    );
    assert_ne!(date_paid(&db, 99), UNPAID_SENTINEL);
    assert_eq!(store.find_unpaid_violation(RuleId::new(7)).unwrap(), None);
    assert!(!lock.is_held());
    assert!(engine.current_session().is_none());

    // Back to idle: nothing queued
    let step = engine.step(t0 + Duration::from_secs(41));
    assert!(step.pause);
    assert!(step.events.is_empty());
}

#[test]
fn test_producer_and_daemon_share_handoff() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("pushupd.db");
    let store = seed_database(&db);

    let inbox = CommandInbox::new(dir.path().join("pushup_cmd.txt"));
    let lock = BusyLock::new(dir.path().join("pushup_busy.lock"));
    let stale_after = Duration::from_secs(300);

    assert_eq!(lock.status(stale_after).unwrap(), LockStatus::Ready);

    let command = enqueue(
        &inbox,
        &lock,
        &*store,
        EnqueueTarget::User(UserId::new(42)),
        "Alice",
    )
    .unwrap();
    assert_eq!(command.rule_id, RuleId::new(7));
    assert_eq!(lock.status(stale_after).unwrap().as_str(), "BUSY");
    assert_eq!(
        store.oldest_unpaid_rule_for_user(UserId::new(42)).unwrap(),
        Some(RuleId::new(7))
    );

    let device = MockDevice::new();
    let gateway = MockGateway::new();
    let mut engine = BridgeEngine::new(
        store.clone(),
        Arc::new(gateway.clone()),
        Box::new(device.clone()),
        inbox.clone(),
        lock.clone(),
        session_settings(),
    );

    let t0 = MonotonicInstant::now();
    engine.step(t0);
    assert_eq!(device.sent_lines(), vec!["42|Alice|15|30"]);

    device.push_line(r#"{"action":"DONE"}"#);
    engine.step(t0 + Duration::from_secs(3));

    assert_eq!(lock.status(stale_after).unwrap(), LockStatus::Ready);
    assert_eq!(store.oldest_unpaid_rule_for_user(UserId::new(42)).unwrap(), None);
    assert_eq!(gateway.requests().len(), 1);
}

#[test]
fn test_config_drives_session_policy() {
    let settings = parse_config(
        r#"
        config_version = 1

        [session]
        min_session_seconds = 10
        manual_paid_check_every = 2
        "#,
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("pushupd.db");
    let store = seed_database(&db);
    let device = MockDevice::new();
    let inbox = CommandInbox::new(dir.path().join("pushup_cmd.txt"));
    let lock = BusyLock::new(dir.path().join("pushup_busy.lock"));

    let mut engine = BridgeEngine::new(
        store,
        Arc::new(MockGateway::new()),
        Box::new(device.clone()),
        inbox.clone(),
        lock,
        settings.session,
    );

    std::fs::write(inbox.path(), "7|Alice").unwrap();
    let t0 = MonotonicInstant::now();
    engine.step(t0);

    device.push_line(r#"{"action":"DONE"}"#);
    let step = engine.step(t0 + Duration::from_secs(5));
    assert!(matches!(&step.events[..], [CoreEvent::DoneIgnored { .. }]));

    Connection::open(&db)
        .unwrap()
        .execute_batch("UPDATE violation SET date_paid = '2025-03-01 09:00:00' WHERE id = 99;")
        .unwrap();

    let step = engine.step(t0 + Duration::from_secs(6));
    assert!(matches!(&step.events[..], [CoreEvent::ManuallyPaid { polls: 2, .. }]));
    assert!(!engine.is_busy());
}
