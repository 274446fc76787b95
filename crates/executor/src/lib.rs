//! # ovstxn Executor
//!
//! The command layer of ovstxn: everything that runs inside a single commit
//! attempt.
//!
//! - [`Command`] - The closed set of row mutations and queries
//! - [`CommandHandle`] - A shared command plus its result slot
//! - [`Value`] / [`Record`] - Caller-side values and row identifiers
//! - [`Output`] - Per-command results
//!
//! ## Quick Start
//!
//! ```text
//! use ovstxn_executor::{Command, CommandHandle};
//!
//! let create = CommandHandle::new(Command::create("Bridge", [("name", "br0")]));
//! let set = CommandHandle::new(Command::set("Bridge", &create, [("datapath_type", "netdev")]));
//!
//! // The commit protocol drives each handle against every attempt:
//! create.run(attempt)?;
//! set.run(attempt)?;
//! // ... and after SUCCESS:
//! create.finalize(attempt);
//! ```
//!
//! ## Commands
//!
//! | Command | Result |
//! |---------|--------|
//! | Create | temporary row UUID, durable after finalize |
//! | Destroy, Set, Add, Clear | nothing |
//! | Get | one column value, singleton sets unwrapped |
//! | List, Find | column maps, one per row |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
mod command;
mod handle;
mod output;
pub mod resolve;
mod value;

// Handler modules
mod handlers;

// Test modules
#[cfg(test)]
mod tests;

pub use command::Command;
pub use handle::CommandHandle;
pub use output::Output;
pub use value::{Record, Value};
