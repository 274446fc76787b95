//! Error types for ovstxn
//!
//! Every layer (commands, the commit protocol, the commit channel and the
//! reference backend) reports failures through the single [`Error`] enum.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! # Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Not Found | `TableNotFound`, `ColumnNotFound`, `RowNotFound`, `RowNotFoundInList` |
//! | Command | `CommandFailed`, `AmbiguousRecord`, `InvalidValue`, `TypeMismatch` |
//! | Commit | `CommitFailed` |
//! | Timeout | `RetryTimeout`, `ChannelTimeout` |
//! | System | `WorkerStopped`, `Config`, `Internal` |

use std::time::Duration;
use thiserror::Error;

/// Result type alias for ovstxn operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for ovstxn
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    // ==================== Not Found ====================
    /// Table is not part of the schema
    #[error("table not found: {table}")]
    TableNotFound { table: String },

    /// Column is not part of the table schema
    #[error("column not found: {table}.{column}")]
    ColumnNotFound { table: String, column: String },

    /// A record identifier did not resolve to a row
    #[error("cannot find {table} with record {record}")]
    RowNotFound { table: String, record: String },

    /// One of the records of a List command did not resolve
    #[error(
        "row doesn't exist in the DB. Request info: table={table}, columns={columns:?}, records={records:?}"
    )]
    RowNotFoundInList {
        table: String,
        columns: Option<Vec<String>>,
        records: Vec<String>,
    },

    // ==================== Command Errors ====================
    /// A name lookup matched more than one row
    #[error("record {record} matches more than one row in {table}")]
    AmbiguousRecord { table: String, record: String },

    /// A caller value cannot be turned into a column value
    #[error("invalid value: {reason}")]
    InvalidValue { reason: String },

    /// The existing column value has the wrong shape for the operation
    #[error("type mismatch on {table}.{column}: expected {expected}, got {actual}")]
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },

    /// A command's run phase failed; the attempt was aborted
    #[error("command {index} ({command}) failed: {source}")]
    CommandFailed {
        index: usize,
        command: String,
        source: Box<Error>,
    },

    // ==================== Commit Errors ====================
    /// The database reported ERROR for the commit attempt
    #[error("OVSDB error: {message}")]
    CommitFailed { message: String },

    // ==================== Timeouts ====================
    /// The retry budget elapsed while the commit kept returning TRY_AGAIN
    #[error("transaction timed out after {attempts} attempt(s): {elapsed:?} elapsed, budget {timeout:?}")]
    RetryTimeout {
        attempts: u32,
        elapsed: Duration,
        timeout: Duration,
    },

    /// The caller stopped waiting for the commit worker
    #[error("commands [{}] exceeded timeout {timeout:?} waiting for the commit worker", .commands.join(", "))]
    ChannelTimeout {
        commands: Vec<String>,
        timeout: Duration,
    },

    // ==================== System Errors ====================
    /// The commit worker has been shut down
    #[error("commit worker is not running")]
    WorkerStopped,

    /// Invalid configuration
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// Internal error (bug or invariant violation)
    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl Error {
    /// Row lookup failure for `record` in `table`
    pub fn row_not_found(table: impl Into<String>, record: impl ToString) -> Self {
        Error::RowNotFound {
            table: table.into(),
            record: record.to_string(),
        }
    }

    /// Invalid caller value
    pub fn invalid_value(reason: impl Into<String>) -> Self {
        Error::InvalidValue {
            reason: reason.into(),
        }
    }

    /// Internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Error::Internal {
            reason: reason.into(),
        }
    }

    /// True for the NotFound family.
    ///
    /// A `CommandFailed` wrapper is looked through.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::TableNotFound { .. }
            | Error::ColumnNotFound { .. }
            | Error::RowNotFound { .. }
            | Error::RowNotFoundInList { .. } => true,
            Error::CommandFailed { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// True for failures a transaction commit raises regardless of `check_error`.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::RetryTimeout { .. } | Error::ChannelTimeout { .. }
        )
    }
}
