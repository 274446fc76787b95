//! Reporting port for transactions.
//!
//! Transactions never pick a logger themselves. They report state
//! transitions and failures to an [`Observer`] handed in at construction;
//! [`NoopObserver`] discards everything and [`TracingObserver`] forwards to
//! `tracing`. Failure callbacks fire only when the transaction's
//! `log_errors` flag is set.

use tracing::{debug, error};

use ovstxn_core::Error;
use ovstxn_executor::Command;

use crate::protocol::CommitState;

/// Receives transaction progress and failures.
///
/// Called from the commit worker thread, except for
/// [`transaction_failed`](Observer::transaction_failed) and
/// [`execute_failed`](Observer::execute_failed), which run on the caller's
/// thread.
pub trait Observer: Send + Sync {
    /// The commit protocol entered `state` during attempt `attempt`
    /// (0 before the first attempt).
    fn transition(&self, _attempt: u32, _state: CommitState) {}

    /// Command `index` failed and the attempt was aborted.
    fn command_failed(&self, _index: usize, _command: &Command, _error: &Error) {}

    /// The database reported ERROR for a commit attempt.
    fn commit_error(&self, _message: &str) {}

    /// The worker reported a failure for the whole transaction.
    /// `context` names the transaction and the worker thread.
    fn transaction_failed(&self, _error: &Error, _context: &str) {}

    /// A single command run through `CommandExt::execute` did not produce
    /// a result.
    fn execute_failed(&self, _command: &Command, _error: &Error) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

/// Observer that forwards to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn transition(&self, attempt: u32, state: CommitState) {
        debug!(target: "ovstxn::txn", attempt, %state, "Transaction state changed");
    }

    fn command_failed(&self, index: usize, command: &Command, error: &Error) {
        error!(target: "ovstxn::txn", index, %command, %error, "Error executing command");
    }

    fn commit_error(&self, message: &str) {
        error!(target: "ovstxn::txn", "OVSDB error: {}", message);
    }

    fn transaction_failed(&self, error: &Error, context: &str) {
        error!(target: "ovstxn::txn", %error, "{}", context);
    }

    fn execute_failed(&self, command: &Command, error: &Error) {
        error!(target: "ovstxn::txn", %command, %error, "Error executing command");
    }
}
