//! Shared test utilities for the integration suites.
//!
//! Import via `mod common;` from a suite's main.rs.

#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;

pub use ovstxn::storage::testing::{bridge_row, port_row, vswitch_schema};
pub use ovstxn::storage::MemoryDatabase;
pub use ovstxn::{
    Api, ApiConfig, Attempt, Command, CommandExt, CommandHandle, CommitState, CommitStatus,
    Condition, Datum, Error, Observer, Op, Output, PreCommitHook, TransactionOptions, Uuid, Value,
};

static INIT_TRACING: Once = Once::new();

/// Route library logs to the test harness once per binary.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
            .try_init();
    });
}

/// Database with the vswitch schema and an API over a fresh connection.
pub fn open() -> (MemoryDatabase, Api) {
    open_with(ApiConfig::default())
}

/// Same as [`open`] with an explicit config.
pub fn open_with(config: ApiConfig) -> (MemoryDatabase, Api) {
    init_tracing();
    let db = MemoryDatabase::new(vswitch_schema());
    let api = Api::new(db.connect(), config).unwrap();
    (db, api)
}

/// Options with a short budget so failing tests finish quickly.
pub fn short_options() -> TransactionOptions {
    TransactionOptions::new().with_timeout(Duration::from_secs(5))
}

/// Shorthand for a scalar string datum.
pub fn text(s: &str) -> Datum {
    Datum::from(s)
}

/// Hook that runs `f` with the database before the first attempt only.
pub struct BeforeFirstAttempt<F> {
    pub db: MemoryDatabase,
    pub f: F,
}

impl<F> PreCommitHook for BeforeFirstAttempt<F>
where
    F: Fn(&MemoryDatabase) + Send + Sync,
{
    fn pre_commit(&self, attempt_number: u32, _attempt: &mut dyn Attempt) {
        if attempt_number == 1 {
            (self.f)(&self.db);
        }
    }
}

/// Wrap a concurrent writer as a hook.
pub fn before_first_attempt<F>(db: &MemoryDatabase, f: F) -> Arc<dyn PreCommitHook>
where
    F: Fn(&MemoryDatabase) + Send + Sync + 'static,
{
    Arc::new(BeforeFirstAttempt { db: db.clone(), f })
}
