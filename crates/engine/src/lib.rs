//! Transaction engine for ovstxn
//!
//! This crate turns command sequences into atomic commits:
//! - Api: owns the connection through a dedicated commit worker
//! - Transaction: caller-side batch of commands with a bounded wait
//! - Protocol: the retry loop run on the worker (TRY_AGAIN handling)
//! - Observer: reporting port for state changes and failures
//! - Config: `ovstxn.toml` defaults for timeout and error policy
//!
//! The worker is the only thread that touches the connection. Callers
//! exchange results with it through one-shot [`ResultSlot`]s.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod observer;
pub mod protocol;
pub mod slot;
pub mod transaction;
pub mod worker;

pub use api::{Api, CommandExt};
pub use config::{ApiConfig, CONFIG_FILE_NAME, DEFAULT_WORKER_THREAD_NAME};
pub use observer::{NoopObserver, Observer, TracingObserver};
pub use protocol::CommitState;
pub use slot::ResultSlot;
pub use transaction::{PreCommitHook, Transaction, TransactionOptions, DEFAULT_TIMEOUT};
pub use worker::{CommitWorker, Job, WorkerStats};
