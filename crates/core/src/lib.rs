//! Core types and traits for ovstxn
//!
//! This crate defines the foundational types used throughout the system:
//! - Atom / Datum: the values a database column holds
//! - AtomType / ColumnType / TableSchema: column and table metadata
//! - Condition / Op: row predicates used by queries
//! - Error: Error type hierarchy
//! - Traits: the database collaborator (Connection, Attempt)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod condition;
pub mod error;
pub mod schema;
pub mod traits;
pub mod value;

pub use condition::{Condition, Op};
pub use error::{Error, Result};
pub use schema::{AtomType, ColumnType, DatabaseSchema, TableSchema, UUID_COLUMN};
pub use traits::{Attempt, CommitStatus, Connection};
pub use value::{Atom, Datum, RowMap};

// Row identifiers are plain UUIDs on both sides of a commit.
pub use uuid::Uuid;
