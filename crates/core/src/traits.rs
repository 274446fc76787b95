//! Database collaborator traits
//!
//! The transaction layer never talks to the wire protocol itself. It drives
//! a [`Connection`] (the client replica of the database, owned by the commit
//! worker) through short-lived [`Attempt`]s. Implementations decide how rows
//! are cached and how a commit reaches the server.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::error::Result;
use crate::schema::DatabaseSchema;
use crate::value::Datum;

/// Outcome of one commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitStatus {
    /// The attempt made no change to the database
    Unchanged,
    /// The attempt committed
    Success,
    /// The attempt was aborted by the client
    Aborted,
    /// A verified column changed underneath the attempt; start over
    TryAgain,
    /// The database rejected the attempt; see [`Attempt::error`]
    Error,
}

impl fmt::Display for CommitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommitStatus::Unchanged => "UNCHANGED",
            CommitStatus::Success => "SUCCESS",
            CommitStatus::Aborted => "ABORTED",
            CommitStatus::TryAgain => "TRY_AGAIN",
            CommitStatus::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// A single commit attempt against the replica.
///
/// Reads observe the replica plus this attempt's own writes. An attempt is
/// not reusable once `commit_block` has returned.
pub trait Attempt {
    /// Schema of the database
    fn schema(&self) -> &DatabaseSchema;

    /// UUIDs of the rows currently in `table`, including rows inserted by
    /// this attempt and excluding rows it deleted.
    fn rows(&self, table: &str) -> Result<Vec<Uuid>>;

    /// Whether `row` is currently in `table`
    fn contains(&self, table: &str, row: Uuid) -> Result<bool> {
        Ok(self.rows(table)?.contains(&row))
    }

    /// Current value of a declared column
    fn read(&self, table: &str, row: Uuid, column: &str) -> Result<Datum>;

    /// Insert a row; returns its temporary UUID
    fn insert(&mut self, table: &str) -> Result<Uuid>;

    /// Replace a column value
    fn write(&mut self, table: &str, row: Uuid, column: &str, value: Datum) -> Result<()>;

    /// Require the column to be unchanged at commit time, else TRY_AGAIN
    fn verify(&mut self, table: &str, row: Uuid, column: &str) -> Result<()>;

    /// Delete a row
    fn delete(&mut self, table: &str, row: Uuid) -> Result<()>;

    /// Abort; `commit_block` will report ABORTED
    fn abort(&mut self);

    /// Change sequence number of the connection this attempt was opened on
    fn change_seqno(&self) -> u64;

    /// Commit and block until the outcome is known
    fn commit_block(&mut self) -> CommitStatus;

    /// Error text after `CommitStatus::Error`
    fn error(&self) -> Option<String>;

    /// Durable UUID assigned to a row inserted under the temporary UUID `temp`
    fn insert_uuid(&self, temp: Uuid) -> Option<Uuid>;
}

/// The live database connection.
///
/// Owned by exactly one thread; never shared.
pub trait Connection: Send {
    /// Open a fresh attempt against the current replica state
    fn begin_attempt(&mut self) -> Box<dyn Attempt + '_>;

    /// Sequence number that advances whenever the replica changes
    fn change_seqno(&self) -> u64;

    /// Block until the sequence number moves past `since_seqno` or `timeout`
    /// elapses. Returns true if a change was seen.
    fn wait_for_change(&mut self, timeout: Duration, since_seqno: u64) -> bool;
}
