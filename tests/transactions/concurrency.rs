//! Many callers, one commit worker.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use crate::common::*;

#[test]
fn callers_on_many_threads_all_commit() {
    let (db, api) = open();
    let api = Arc::new(api);
    let start = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let api = Arc::clone(&api);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                let mut txn = api.transaction_with(short_options().with_check_error(true));
                let bridge = txn.add(Command::create("Bridge", [("name", format!("br{}", i))]));
                txn.commit().unwrap().unwrap();
                bridge.row_uuid().unwrap()
            })
        })
        .collect();

    let mut uuids: Vec<Uuid> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    uuids.sort();
    uuids.dedup();
    assert_eq!(uuids.len(), 8);
    assert_eq!(db.row_count("Bridge"), 8);
}

#[test]
fn concurrent_map_adds_keep_every_key() {
    let (db, api) = open();
    let row = db.insert_row("Bridge", bridge_row("br0")).unwrap();
    let api = Arc::new(api);

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let api = Arc::clone(&api);
            thread::spawn(move || {
                Command::add(
                    "Bridge",
                    "br0",
                    "external_ids",
                    [Value::map([(format!("k{}", i), "v")])],
                )
                .execute(&api, true, true)
                .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let ids = db.row("Bridge", row).unwrap()["external_ids"].clone();
    assert_eq!(ids.len(), 6);
}

#[test]
fn later_transactions_see_earlier_commits() {
    let (_db, api) = open();
    for i in 0..5 {
        let mut txn = api.transaction_with(short_options().with_check_error(true));
        txn.add(Command::create("Port", [("name", format!("p{}", i))]));
        let count = txn.add(Command::find("Port", Vec::new(), Some(vec!["name".to_string()])));
        txn.commit().unwrap().unwrap();
        assert_eq!(count.result().as_rows().unwrap().len(), i + 1);
    }
}

#[test]
fn caller_timeout_does_not_cancel_the_commit() {
    let (db, api) = open();
    let release = Arc::new(Barrier::new(2));

    let gate = Arc::clone(&release);
    let hook = move |attempt_number: u32, _attempt: &mut dyn Attempt| {
        if attempt_number == 1 {
            gate.wait();
        }
    };
    let mut slow = api
        .transaction_with(TransactionOptions::new().with_timeout(Duration::from_millis(50)))
        .with_pre_commit(Arc::new(hook));
    slow.add(Command::create("Bridge", [("name", "slow")]));

    let err = slow.commit().unwrap_err();
    assert!(matches!(err, Error::ChannelTimeout { .. }));
    assert!(err.is_timeout());

    // The worker is still inside the slow commit; let it finish and queue
    // behind it.
    release.wait();
    let name = Command::get("Bridge", "slow", "name")
        .execute(&api, true, true)
        .unwrap();
    assert_eq!(name, Some(Output::Datum(text("slow"))));
    assert_eq!(db.row_count("Bridge"), 1);
}

#[test]
fn shutdown_lets_queued_commits_finish() {
    let (db, api) = open();
    let api = Arc::new(api);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let api = Arc::clone(&api);
            thread::spawn(move || {
                Command::create("Port", [("name", format!("p{}", i))]).execute(&api, true, false)
            })
        })
        .collect();
    api.shutdown();

    let mut committed = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(Some(_)) => committed += 1,
            Ok(None) => panic!("commit unexpectedly returned no result"),
            Err(err) => assert_eq!(err, Error::WorkerStopped),
        }
    }
    assert_eq!(db.row_count("Port"), committed);
    assert_eq!(api.worker_stats().queue_depth, 0);
}
