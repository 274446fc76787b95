//! ovstxn - client-side transactions for OVSDB-style replicated databases
//!
//! Callers batch [`Command`]s into a [`Transaction`]; a dedicated commit
//! worker owns the database connection and commits each batch atomically,
//! retrying on TRY_AGAIN until the transaction timeout.
//!
//! # Quick Start
//!
//! ```
//! use ovstxn::storage::{testing::vswitch_schema, MemoryDatabase};
//! use ovstxn::{Api, ApiConfig, Command, Output};
//!
//! let db = MemoryDatabase::new(vswitch_schema());
//! let api = Api::new(db.connect(), ApiConfig::default())?;
//!
//! let mut txn = api.transaction();
//! let bridge = txn.add(Command::create("Bridge", [("name", "br0")]));
//! txn.add(Command::set("Bridge", &bridge, [("datapath_type", "netdev")]));
//! txn.commit()?;
//!
//! assert!(matches!(bridge.result(), Output::Row(_)));
//! # Ok::<(), ovstxn::Error>(())
//! ```
//!
//! # Architecture
//!
//! - `ovstxn-core`: values, schema, errors and the `Connection`/`Attempt` traits
//! - `ovstxn-executor`: commands and their run/finalize phases
//! - `ovstxn-engine`: the commit worker, retry protocol and API
//! - `ovstxn-storage`: an in-memory database implementing the traits

pub use ovstxn_core::{
    Atom, AtomType, Attempt, ColumnType, CommitStatus, Condition, Connection, DatabaseSchema,
    Datum, Error, Op, Result, RowMap, TableSchema, Uuid,
};
pub use ovstxn_engine::{
    Api, ApiConfig, CommandExt, CommitState, CommitWorker, NoopObserver, Observer, PreCommitHook,
    TracingObserver, Transaction, TransactionOptions, WorkerStats, CONFIG_FILE_NAME,
};
pub use ovstxn_executor::{Command, CommandHandle, Output, Record, Value};

/// In-memory reference database
pub use ovstxn_storage as storage;
