//! Caller-side transaction handle.
//!
//! A [`Transaction`] collects commands on the caller's thread. `commit`
//! ships them to the commit worker, then waits for the outcome no longer
//! than the transaction timeout. A timed-out wait does not cancel the
//! commit; the worker still runs it and drops the result.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use ovstxn_core::{Attempt, Error, Result};
use ovstxn_executor::{CommandHandle, Output};

use crate::observer::{NoopObserver, Observer};
use crate::protocol::{execute_request, CommitOutcome, CommitRequest};
use crate::slot::ResultSlot;
use crate::worker::CommitWorker;

/// Default transaction timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Per-transaction policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Budget for the retry loop and for the caller's wait on the worker
    pub timeout: Duration,
    /// Raise command and commit failures instead of returning no result
    pub check_error: bool,
    /// Report failures through the observer
    pub log_errors: bool,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            check_error: false,
            log_errors: true,
        }
    }
}

impl TransactionOptions {
    /// Options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set whether failures are raised
    pub fn with_check_error(mut self, check_error: bool) -> Self {
        self.check_error = check_error;
        self
    }

    /// Set whether failures are reported
    pub fn with_log_errors(mut self, log_errors: bool) -> Self {
        self.log_errors = log_errors;
        self
    }
}

/// Hook run on the worker after each attempt opens and before its commands
/// run. Receives the 1-based attempt number.
pub trait PreCommitHook: Send + Sync {
    /// Called once per attempt
    fn pre_commit(&self, attempt_number: u32, attempt: &mut dyn Attempt);
}

impl<F> PreCommitHook for F
where
    F: Fn(u32, &mut dyn Attempt) + Send + Sync,
{
    fn pre_commit(&self, attempt_number: u32, attempt: &mut dyn Attempt) {
        self(attempt_number, attempt)
    }
}

/// An ordered batch of commands committed atomically.
pub struct Transaction {
    worker: Arc<CommitWorker>,
    commands: Vec<CommandHandle>,
    options: TransactionOptions,
    observer: Arc<dyn Observer>,
    hook: Option<Arc<dyn PreCommitHook>>,
}

impl Transaction {
    /// Create an empty transaction committed through `worker`.
    pub fn new(worker: Arc<CommitWorker>, options: TransactionOptions) -> Self {
        Self {
            worker,
            commands: Vec::new(),
            options,
            observer: Arc::new(NoopObserver),
            hook: None,
        }
    }

    /// Report progress and failures to `observer`
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Run `hook` at the start of every attempt
    pub fn with_pre_commit(mut self, hook: Arc<dyn PreCommitHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Append a command.
    ///
    /// Returns the handle the result will land in. Passing in an existing
    /// handle adds that same handle.
    pub fn add(&mut self, command: impl Into<CommandHandle>) -> CommandHandle {
        let handle = command.into();
        self.commands.push(handle.clone());
        handle
    }

    /// Commands in execution order
    pub fn commands(&self) -> &[CommandHandle] {
        &self.commands
    }

    /// Policy of this transaction
    pub fn options(&self) -> &TransactionOptions {
        &self.options
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if no command was added
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commit on the worker and wait for the outcome.
    ///
    /// Returns one result per command in order, or `None` when the commit
    /// did not land and `check_error` is off.
    ///
    /// # Errors
    ///
    /// - `Error::ChannelTimeout` if the worker did not answer within the
    ///   timeout; raised regardless of `check_error`
    /// - `Error::RetryTimeout` if the retry budget ran out; raised regardless
    ///   of `check_error`
    /// - `Error::WorkerStopped` if the worker was shut down
    /// - Command and commit failures when `check_error` is set
    pub fn commit(self) -> Result<Option<Vec<Output>>> {
        let Transaction {
            worker,
            commands,
            options,
            observer,
            hook,
        } = self;

        let request = CommitRequest {
            commands,
            options,
            observer: Arc::clone(&observer),
            hook,
        };
        let command_names: Vec<String> =
            request.commands.iter().map(ToString::to_string).collect();
        debug!(target: "ovstxn::txn", commands = %request, "Submitting transaction");

        let slot: ResultSlot<CommitOutcome> = ResultSlot::new();
        let poster = slot.clone();
        worker.submit(move |connection| {
            let outcome = execute_request(connection, &request);
            if !poster.post(outcome) {
                warn!(
                    target: "ovstxn::worker",
                    commands = %request,
                    "Caller stopped waiting; dropping commit result"
                );
            }
        })?;

        match slot.wait(options.timeout) {
            None => Err(Error::ChannelTimeout {
                commands: command_names,
                timeout: options.timeout,
            }),
            Some(Ok(results)) => Ok(results),
            Some(Err(failure)) => {
                if options.log_errors {
                    observer.transaction_failed(&failure.error, &failure.context);
                }
                if options.check_error || failure.error.is_timeout() {
                    Err(failure.error)
                } else {
                    Ok(None)
                }
            }
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transaction[")?;
        for (i, handle) in self.commands.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", handle)?;
        }
        write!(f, "]")
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("commands", &self.commands)
            .field("options", &self.options)
            .field("has_pre_commit", &self.hook.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::testing::RecordingObserver;
    use ovstxn_core::{CommitStatus, Datum};
    use ovstxn_executor::Command;
    use ovstxn_storage::testing::{bridge_row, vswitch_schema};
    use ovstxn_storage::MemoryDatabase;
    use std::sync::Barrier;

    fn start() -> (MemoryDatabase, Arc<CommitWorker>) {
        let db = MemoryDatabase::new(vswitch_schema());
        let worker = CommitWorker::start(Box::new(db.connect()), "txn-test").unwrap();
        (db, Arc::new(worker))
    }

    #[test]
    fn test_options_builder() {
        let options = TransactionOptions::new()
            .with_timeout(Duration::from_secs(3))
            .with_check_error(true)
            .with_log_errors(false);
        assert_eq!(options.timeout, Duration::from_secs(3));
        assert!(options.check_error);
        assert!(!options.log_errors);
        assert_eq!(TransactionOptions::default().timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_add_returns_shared_handle() {
        let (_db, worker) = start();
        let mut txn = Transaction::new(worker, TransactionOptions::new());
        let handle = txn.add(Command::get("Bridge", "br0", "name"));
        let again = txn.add(handle.clone());
        assert!(handle.ptr_eq(&again));
        assert_eq!(txn.len(), 2);
        assert!(txn.commands()[0].ptr_eq(&txn.commands()[1]));
        assert_eq!(
            txn.to_string(),
            "Transaction[Get(table=Bridge, record=br0, column=name), Get(table=Bridge, record=br0, column=name)]"
        );
    }

    #[test]
    fn test_commit_fills_handles() {
        let (db, worker) = start();
        db.insert_row("Bridge", bridge_row("br0")).unwrap();

        let mut txn = Transaction::new(worker, TransactionOptions::new());
        let port = txn.add(Command::create("Port", [("name", "p0")]));
        txn.add(Command::add("Bridge", "br0", "ports", [&port]));
        let ports = txn.add(Command::get("Bridge", "br0", "ports"));

        let results = txn.commit().unwrap().unwrap();
        assert_eq!(results.len(), 3);

        let uuid = port.row_uuid().unwrap();
        assert!(db.row("Port", uuid).is_some());
        assert_eq!(results[0], Output::Row(uuid));
        assert!(matches!(ports.result(), Output::Datum(_)));
    }

    #[test]
    fn test_empty_transaction_commits() {
        let (_db, worker) = start();
        let txn = Transaction::new(worker, TransactionOptions::new());
        assert!(txn.is_empty());
        assert_eq!(txn.commit().unwrap(), Some(vec![]));
    }

    #[test]
    fn test_failure_swallowed_and_reported() {
        let (db, worker) = start();
        db.inject_status(CommitStatus::Error, 1);
        let observer = Arc::new(RecordingObserver::default());
        let mut txn =
            Transaction::new(worker, TransactionOptions::new()).with_observer(observer.clone());
        txn.add(Command::create("Bridge", [("name", "br0")]));

        assert_eq!(txn.commit().unwrap(), None);
        assert!(observer
            .events()
            .contains(&"commit_error:injected commit failure".to_string()));
        // Without check_error nothing reaches the caller-side report.
        assert!(!observer
            .events()
            .iter()
            .any(|e| e.starts_with("transaction_failed")));
    }

    #[test]
    fn test_failure_raised_with_check_error() {
        let (_db, worker) = start();
        let observer = Arc::new(RecordingObserver::default());
        let mut txn = Transaction::new(worker, TransactionOptions::new().with_check_error(true))
            .with_observer(observer.clone());
        txn.add(Command::destroy("Bridge", "br9"));

        let err = txn.commit().unwrap_err();
        assert!(err.is_not_found());
        assert!(observer.events().iter().any(|e| e.starts_with("transaction_failed:")));
    }

    #[test]
    fn test_retry_timeout_raised_without_check_error() {
        let (db, worker) = start();
        db.inject_status(CommitStatus::TryAgain, 1);
        let mut txn = Transaction::new(
            worker,
            TransactionOptions::new().with_timeout(Duration::ZERO),
        );
        txn.add(Command::create("Bridge", [("name", "br0")]));

        // A zero budget also expires the caller's wait; either timeout is
        // raised regardless of check_error.
        let err = txn.commit().unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_channel_timeout_does_not_cancel_commit() {
        let (db, worker) = start();
        let barrier = Arc::new(Barrier::new(2));
        let b = Arc::clone(&barrier);
        worker
            .submit(move |_conn| {
                b.wait();
            })
            .unwrap();

        let mut txn = Transaction::new(
            Arc::clone(&worker),
            TransactionOptions::new().with_timeout(Duration::from_millis(20)),
        );
        txn.add(Command::create("Bridge", [("name", "late")]));

        let err = txn.commit().unwrap_err();
        match &err {
            Error::ChannelTimeout { commands, timeout } => {
                assert_eq!(commands.len(), 1);
                assert!(commands[0].starts_with("Create(table=Bridge"));
                assert_eq!(*timeout, Duration::from_millis(20));
            }
            other => panic!("Expected ChannelTimeout, got {:?}", other),
        }

        barrier.wait();
        worker.drain();
        assert_eq!(db.row_count("Bridge"), 1);
        let (_, row) = &db.rows("Bridge")[0];
        assert_eq!(row["name"], Datum::from("late"));
    }

    #[test]
    fn test_commit_after_shutdown_is_rejected() {
        let (_db, worker) = start();
        worker.shutdown();
        let txn = Transaction::new(worker, TransactionOptions::new().with_check_error(false));
        assert!(matches!(txn.commit(), Err(Error::WorkerStopped)));
    }

    #[test]
    fn test_closure_pre_commit_hook() {
        let (_db, worker) = start();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let hook = move |attempt_number: u32, _attempt: &mut dyn Attempt| {
            s.lock().push(attempt_number);
        };
        let mut txn =
            Transaction::new(worker, TransactionOptions::new()).with_pre_commit(Arc::new(hook));
        txn.add(Command::create("Bridge", [("name", "br0")]));
        txn.commit().unwrap().unwrap();
        assert_eq!(*seen.lock(), vec![1]);
    }
}
