//! What reaches the caller when a commit does not land.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::common::*;

#[derive(Default)]
struct Collecting {
    failures: Mutex<Vec<String>>,
    commit_errors: Mutex<Vec<String>>,
    states: Mutex<Vec<CommitState>>,
    executes: Mutex<Vec<String>>,
}

impl Observer for Collecting {
    fn transition(&self, _attempt: u32, state: CommitState) {
        self.states.lock().push(state);
    }

    fn commit_error(&self, message: &str) {
        self.commit_errors.lock().push(message.to_string());
    }

    fn transaction_failed(&self, error: &Error, context: &str) {
        self.failures.lock().push(format!("{} | {}", context, error));
    }

    fn execute_failed(&self, command: &Command, error: &Error) {
        self.executes.lock().push(format!("{} | {}", command, error));
    }
}

#[test]
fn database_error_returns_none_by_default() {
    let (db, api) = open();
    let observer = Arc::new(Collecting::default());
    db.inject_status(CommitStatus::Error, 1);

    let mut txn = api.transaction().with_observer(observer.clone());
    txn.add(Command::create("Bridge", [("name", "br0")]));
    assert_eq!(txn.commit().unwrap(), None);

    assert_eq!(*observer.commit_errors.lock(), vec!["injected commit failure"]);
    assert_eq!(observer.states.lock().last(), Some(&CommitState::Failed));
    assert_eq!(db.row_count("Bridge"), 0);
}

#[test]
fn database_error_raised_with_check_error() {
    let (db, api) = open();
    let observer = Arc::new(Collecting::default());
    db.inject_status(CommitStatus::Error, 1);

    let mut txn = api
        .transaction_with(short_options().with_check_error(true))
        .with_observer(observer.clone());
    txn.add(Command::create("Bridge", [("name", "br0")]));
    let err = txn.commit().unwrap_err();

    assert_eq!(
        err,
        Error::CommitFailed {
            message: "injected commit failure".to_string()
        }
    );
    let failures = observer.failures.lock();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].starts_with("Transaction failed on ovstxn-commit: Create(table=Bridge"));
}

#[test]
fn constraint_violation_is_a_database_error() {
    let (db, api) = open();
    let row = db.insert_row("Bridge", bridge_row("br0")).unwrap();

    let mut txn = api.transaction_with(short_options().with_check_error(true));
    txn.add(Command::add("Bridge", "br0", "flood_vlans", [1, 2, 3]));
    txn.add(Command::set("Bridge", "br0", [("stp_enable", "yes")]));
    let err = txn.commit().unwrap_err();

    assert!(matches!(err, Error::CommitFailed { .. }));
    assert!(err.to_string().contains("constraint violation: Bridge.stp_enable"));
    assert_eq!(db.row("Bridge", row).unwrap()["flood_vlans"], Datum::empty_set());
}

#[test]
fn command_failure_rolls_back_the_whole_transaction() {
    let (db, api) = open();
    let mut txn = api.transaction_with(short_options().with_log_errors(false));
    let created = txn.add(Command::create("Bridge", [("name", "br0")]));
    txn.add(Command::destroy("Port", "no-such-port"));
    let after = txn.add(Command::create("Bridge", [("name", "br1")]));

    assert_eq!(txn.commit().unwrap(), None);
    assert_eq!(db.row_count("Bridge"), 0);
    assert!(matches!(created.result(), Output::PendingRow(_)));
    assert!(matches!(after.result(), Output::PendingRow(_)));
}

#[test]
fn aborted_commit_returns_none_even_with_check_error() {
    let (db, api) = open();
    db.inject_status(CommitStatus::Aborted, 1);
    let result = Command::create("Bridge", [("name", "br0")])
        .execute(&api, true, true)
        .unwrap();
    assert_eq!(result, None);
    assert_eq!(db.row_count("Bridge"), 0);
}

#[test]
fn retry_timeout_is_raised_without_check_error() {
    let (db, api) = open();
    db.inject_status(CommitStatus::TryAgain, 1);
    let observer = Arc::new(Collecting::default());

    let mut txn = api
        .transaction_with(TransactionOptions::new().with_timeout(Duration::ZERO))
        .with_observer(observer.clone());
    txn.add(Command::create("Bridge", [("name", "br0")]));
    let err = txn.commit().unwrap_err();
    assert!(err.is_timeout());
}

#[test]
fn retries_until_the_database_settles() {
    let (db, api) = open();
    db.inject_status(CommitStatus::TryAgain, 4);
    let observer = Arc::new(Collecting::default());

    let mut txn = api
        .transaction_with(short_options())
        .with_observer(observer.clone());
    txn.add(Command::create("Bridge", [("name", "br0")]));
    txn.commit().unwrap().unwrap();

    let states = observer.states.lock().clone();
    assert_eq!(states.first(), Some(&CommitState::Pending));
    assert_eq!(
        states
            .iter()
            .filter(|s| **s == CommitState::Attempting)
            .count(),
        5
    );
    assert_eq!(states.last(), Some(&CommitState::Succeeded));
    assert_eq!(db.pending_injections(), 0);
}

#[test]
fn transaction_commit_after_shutdown_always_fails() {
    let (_db, api) = open();
    api.shutdown();
    let mut txn = api.transaction_with(short_options().with_log_errors(false));
    txn.add(Command::get("Bridge", "br0", "name"));
    assert_eq!(txn.commit().unwrap_err(), Error::WorkerStopped);
}

#[test]
fn execute_after_shutdown_follows_check_error() {
    let (_db, api) = open();
    let observer = Arc::new(Collecting::default());
    let api = api.with_observer(observer.clone());
    api.shutdown();

    let swallowed = Command::get("Bridge", "br0", "name").execute(&api, false, true);
    assert_eq!(swallowed, Ok(None));
    assert_eq!(
        *observer.executes.lock(),
        vec![format!("Get(table=Bridge, record=br0, column=name) | {}", Error::WorkerStopped)]
    );

    let err = Command::get("Bridge", "br0", "name")
        .execute(&api, true, false)
        .unwrap_err();
    assert_eq!(err, Error::WorkerStopped);
    assert_eq!(observer.executes.lock().len(), 1);
}

#[test]
fn execute_swallows_a_retry_timeout_without_check_error() {
    let (db, api) = open_with(ApiConfig {
        timeout_secs: 1,
        ..ApiConfig::default()
    });
    db.inject_status(CommitStatus::TryAgain, 1_000_000);

    let result = Command::create("Bridge", [("name", "br0")]).execute(&api, false, false);
    assert_eq!(result, Ok(None));
    assert_eq!(db.row_count("Bridge"), 0);
}
