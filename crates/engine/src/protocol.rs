//! The transaction commit protocol.
//!
//! Runs on the commit worker, one transaction at a time:
//!
//! ```text
//! Pending -> Attempting -> Succeeded | Aborted | Failed | TimedOut
//!               ^   |
//!               |   v
//!               Retry   (TRY_AGAIN)
//! ```
//!
//! Every attempt re-runs the whole command sequence against a fresh
//! [`Attempt`](ovstxn_core::Attempt). Only TRY_AGAIN loops; command
//! failures and database errors never retry.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::debug;

use ovstxn_core::{CommitStatus, Connection, Error, Result};
use ovstxn_executor::{CommandHandle, Output};

use crate::observer::Observer;
use crate::transaction::{PreCommitHook, TransactionOptions};
use crate::worker::panic_message;

/// State of one transaction in the commit protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitState {
    /// Queued, no attempt opened yet
    Pending,
    /// Commands are running against an attempt
    Attempting,
    /// TRY_AGAIN: waiting for the database to change before the next attempt
    Retry,
    /// SUCCESS or UNCHANGED; results finalized
    Succeeded,
    /// ABORTED
    Aborted,
    /// A command failed or the database reported ERROR
    Failed,
    /// The retry budget ran out
    TimedOut,
}

impl CommitState {
    /// Check if the protocol ends in this state
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            CommitState::Pending | CommitState::Attempting | CommitState::Retry
        )
    }
}

impl fmt::Display for CommitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommitState::Pending => "PENDING",
            CommitState::Attempting => "ATTEMPTING",
            CommitState::Retry => "RETRY",
            CommitState::Succeeded => "SUCCEEDED",
            CommitState::Aborted => "ABORTED",
            CommitState::Failed => "FAILED",
            CommitState::TimedOut => "TIMED_OUT",
        };
        f.write_str(name)
    }
}

impl FromStr for CommitState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(CommitState::Pending),
            "ATTEMPTING" => Ok(CommitState::Attempting),
            "RETRY" => Ok(CommitState::Retry),
            "SUCCEEDED" => Ok(CommitState::Succeeded),
            "ABORTED" => Ok(CommitState::Aborted),
            "FAILED" => Ok(CommitState::Failed),
            "TIMED_OUT" => Ok(CommitState::TimedOut),
            other => Err(Error::invalid_value(format!("unknown commit state '{}'", other))),
        }
    }
}

/// Everything the worker needs to commit one transaction.
pub(crate) struct CommitRequest {
    pub(crate) commands: Vec<CommandHandle>,
    pub(crate) options: TransactionOptions,
    pub(crate) observer: Arc<dyn Observer>,
    pub(crate) hook: Option<Arc<dyn PreCommitHook>>,
}

impl CommitRequest {
    fn transition(&self, attempt: u32, state: CommitState) {
        debug!(target: "ovstxn::txn", attempt, %state, "Commit state");
        self.observer.transition(attempt, state);
    }
}

impl fmt::Display for CommitRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, handle) in self.commands.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", handle)?;
        }
        Ok(())
    }
}

/// Commit `request` through `connection`.
///
/// Returns `Ok(Some(results))` on SUCCESS or UNCHANGED, one result per
/// command in order, and `Ok(None)` on ABORTED or a database ERROR without
/// `check_error`.
///
/// # Errors
///
/// - `Error::RetryTimeout` when the budget ran out while retrying
/// - `Error::CommandFailed` when a command failed and `check_error` is set
/// - `Error::CommitFailed` on ERROR when `check_error` is set
pub(crate) fn run_commit(
    connection: &mut dyn Connection,
    request: &CommitRequest,
) -> Result<Option<Vec<Output>>> {
    let options = &request.options;
    let start = Instant::now();
    let mut attempts: u32 = 0;
    request.transition(attempts, CommitState::Pending);

    loop {
        // The first attempt always runs, even with an exhausted budget.
        if attempts > 0 {
            let elapsed = start.elapsed();
            if elapsed > options.timeout {
                request.transition(attempts, CommitState::TimedOut);
                return Err(Error::RetryTimeout {
                    attempts,
                    elapsed,
                    timeout: options.timeout,
                });
            }
        }
        attempts += 1;
        request.transition(attempts, CommitState::Attempting);

        let mut attempt = connection.begin_attempt();
        if let Some(hook) = &request.hook {
            hook.pre_commit(attempts, attempt.as_mut());
        }

        for (index, handle) in request.commands.iter().enumerate() {
            debug!(target: "ovstxn::txn", index, command = %handle, "Running txn command");
            if let Err(source) = handle.run(attempt.as_mut()) {
                attempt.abort();
                let error = Error::CommandFailed {
                    index,
                    command: handle.to_string(),
                    source: Box::new(source),
                };
                if options.log_errors {
                    request.observer.command_failed(index, handle.command(), &error);
                }
                if options.check_error {
                    request.transition(attempts, CommitState::Failed);
                    return Err(error);
                }
            }
        }

        let seqno = attempt.change_seqno();
        let status = attempt.commit_block();
        debug!(target: "ovstxn::txn", attempt = attempts, %status, "Commit attempt finished");

        match status {
            CommitStatus::TryAgain => {
                request.transition(attempts, CommitState::Retry);
                drop(attempt);
                let remaining = options.timeout.saturating_sub(start.elapsed());
                connection.wait_for_change(remaining, seqno);
            }
            CommitStatus::Error => {
                let message = attempt
                    .error()
                    .unwrap_or_else(|| "unknown error".to_string());
                if options.log_errors {
                    request.observer.commit_error(&message);
                }
                request.transition(attempts, CommitState::Failed);
                if options.check_error {
                    return Err(Error::CommitFailed { message });
                }
                return Ok(None);
            }
            CommitStatus::Aborted => {
                debug!(target: "ovstxn::txn", "Transaction aborted");
                request.transition(attempts, CommitState::Aborted);
                return Ok(None);
            }
            CommitStatus::Unchanged | CommitStatus::Success => {
                for handle in &request.commands {
                    handle.finalize(attempt.as_ref());
                }
                request.transition(attempts, CommitState::Succeeded);
                return Ok(Some(
                    request.commands.iter().map(CommandHandle::result).collect(),
                ));
            }
        }
    }
}

/// A failed commit as reported back to the caller.
#[derive(Debug)]
pub(crate) struct WorkerFailure {
    pub(crate) error: Error,
    /// Names the worker thread and the transaction's commands
    pub(crate) context: String,
}

/// What the worker posts back for one transaction.
pub(crate) type CommitOutcome = std::result::Result<Option<Vec<Output>>, WorkerFailure>;

/// Run [`run_commit`] on the worker thread, turning errors and panics into a
/// [`WorkerFailure`].
pub(crate) fn execute_request(
    connection: &mut dyn Connection,
    request: &CommitRequest,
) -> CommitOutcome {
    let error = match panic::catch_unwind(AssertUnwindSafe(|| run_commit(connection, request))) {
        Ok(Ok(results)) => return Ok(results),
        Ok(Err(error)) => error,
        Err(payload) => Error::internal(format!(
            "commit panicked: {}",
            panic_message(payload.as_ref())
        )),
    };
    let thread = thread::current();
    let context = format!(
        "Transaction failed on {}: {}",
        thread.name().unwrap_or("unnamed thread"),
        request
    );
    Err(WorkerFailure { error, context })
}
