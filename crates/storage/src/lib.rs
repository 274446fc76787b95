//! In-memory reference backend for ovstxn
//!
//! [`MemoryDatabase`] plays the server: it holds committed rows with a
//! version per column, a change sequence number, and wakes waiters on every
//! commit. [`MemoryConnection`] is a client replica handle implementing
//! [`ovstxn_core::Connection`]; each attempt works on a snapshot taken when
//! it was opened, so a commit by another client in between is detected
//! through `verify` and reported as TRY_AGAIN.
//!
//! The `testing` module carries the schemas and fixtures the workspace
//! tests share.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod attempt;
mod memory;
pub mod testing;

pub use attempt::MemoryAttempt;
pub use memory::{MemoryConnection, MemoryDatabase};
