//! Command enum defining every row operation.
//!
//! Commands are the "instruction set" of a transaction. Each variant is
//! self-contained: all parameters needed to run it against an attempt are in
//! the variant. Commands are built through the constructors
//! ([`Command::create`], [`Command::set`], ...) and wrapped in a
//! [`CommandHandle`](crate::CommandHandle) that carries their result.

use std::fmt;

use ovstxn_core::{Attempt, Condition, Result};

use crate::handlers::{read, write};
use crate::{Output, Record, Value};

/// A row mutation or query.
///
/// # Command Categories
///
/// | Category | Commands | Output |
/// |----------|----------|--------|
/// | Write | Create | `Output::PendingRow`, then `Output::Row` |
/// | Write | Destroy, Set, Add, Clear | `Output::None` |
/// | Read | Get | `Output::Datum` |
/// | Read | List, Find | `Output::Rows` |
#[derive(Debug, Clone)]
pub enum Command {
    // ==================== Write ====================
    /// Insert a row and write the given columns.
    /// Returns: `Output::PendingRow`, `Output::Row` after commit
    Create {
        table: String,
        columns: Vec<(String, Value)>,
    },

    /// Delete a row.
    /// Returns: `Output::None`
    Destroy { table: String, record: Record },

    /// Write columns; map values merge into an existing map.
    /// Returns: `Output::None`
    Set {
        table: String,
        record: Record,
        values: Vec<(String, Value)>,
    },

    /// Add to a set or map column; existing map keys are kept.
    /// Returns: `Output::None`
    Add {
        table: String,
        record: Record,
        column: String,
        values: Vec<Value>,
    },

    /// Reset a column to the empty value of its type.
    /// Returns: `Output::None`
    Clear {
        table: String,
        record: Record,
        column: String,
    },

    // ==================== Read ====================
    /// Read one column.
    /// Returns: `Output::Datum`
    Get {
        table: String,
        record: Record,
        column: String,
    },

    /// Read rows by record, or every row when `records` is empty.
    /// Returns: `Output::Rows`
    List {
        table: String,
        records: Vec<Record>,
        columns: Option<Vec<String>>,
        if_exists: bool,
    },

    /// Read the rows matching every condition.
    /// Returns: `Output::Rows`
    Find {
        table: String,
        conditions: Vec<Condition>,
        columns: Option<Vec<String>>,
    },
}

fn pairs<I, C, V>(pairs: I) -> Vec<(String, Value)>
where
    I: IntoIterator<Item = (C, V)>,
    C: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(c, v)| (c.into(), v.into()))
        .collect()
}

impl Command {
    /// Create a row in `table` with the given column values.
    pub fn create<I, C, V>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<String>,
        V: Into<Value>,
    {
        Command::Create {
            table: table.into(),
            columns: pairs(columns),
        }
    }

    /// Destroy the row `record`.
    pub fn destroy(table: impl Into<String>, record: impl Into<Record>) -> Self {
        Command::Destroy {
            table: table.into(),
            record: record.into(),
        }
    }

    /// Set columns of `record`.
    pub fn set<I, C, V>(table: impl Into<String>, record: impl Into<Record>, values: I) -> Self
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<String>,
        V: Into<Value>,
    {
        Command::Set {
            table: table.into(),
            record: record.into(),
            values: pairs(values),
        }
    }

    /// Add `values` to the collection in `column`.
    pub fn add<I, V>(
        table: impl Into<String>,
        record: impl Into<Record>,
        column: impl Into<String>,
        values: I,
    ) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Command::Add {
            table: table.into(),
            record: record.into(),
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Clear `column` of `record`.
    pub fn clear(
        table: impl Into<String>,
        record: impl Into<Record>,
        column: impl Into<String>,
    ) -> Self {
        Command::Clear {
            table: table.into(),
            record: record.into(),
            column: column.into(),
        }
    }

    /// Get `column` of `record`.
    pub fn get(
        table: impl Into<String>,
        record: impl Into<Record>,
        column: impl Into<String>,
    ) -> Self {
        Command::Get {
            table: table.into(),
            record: record.into(),
            column: column.into(),
        }
    }

    /// List `records` (all rows when empty), restricted to `columns`.
    ///
    /// With `if_exists`, records that do not resolve are skipped instead of
    /// failing the command.
    pub fn list<I, R>(
        table: impl Into<String>,
        records: I,
        columns: Option<Vec<String>>,
        if_exists: bool,
    ) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Record>,
    {
        Command::List {
            table: table.into(),
            records: records.into_iter().map(Into::into).collect(),
            columns,
            if_exists,
        }
    }

    /// Find rows where every condition holds, restricted to `columns`.
    pub fn find<I>(table: impl Into<String>, conditions: I, columns: Option<Vec<String>>) -> Self
    where
        I: IntoIterator<Item = Condition>,
    {
        Command::Find {
            table: table.into(),
            conditions: conditions.into_iter().collect(),
            columns,
        }
    }

    /// Variant name
    pub fn name(&self) -> &'static str {
        match self {
            Command::Create { .. } => "Create",
            Command::Destroy { .. } => "Destroy",
            Command::Set { .. } => "Set",
            Command::Add { .. } => "Add",
            Command::Clear { .. } => "Clear",
            Command::Get { .. } => "Get",
            Command::List { .. } => "List",
            Command::Find { .. } => "Find",
        }
    }

    /// Target table
    pub fn table(&self) -> &str {
        match self {
            Command::Create { table, .. }
            | Command::Destroy { table, .. }
            | Command::Set { table, .. }
            | Command::Add { table, .. }
            | Command::Clear { table, .. }
            | Command::Get { table, .. }
            | Command::List { table, .. }
            | Command::Find { table, .. } => table,
        }
    }

    /// Check if the command only reads
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Command::Get { .. } | Command::List { .. } | Command::Find { .. }
        )
    }

    /// Run against one attempt.
    ///
    /// Side effects stay inside `attempt`; the command itself is not changed.
    pub fn run(&self, attempt: &mut dyn Attempt) -> Result<Output> {
        match self {
            Command::Create { table, columns } => write::create(attempt, table, columns),
            Command::Destroy { table, record } => write::destroy(attempt, table, record),
            Command::Set {
                table,
                record,
                values,
            } => write::set(attempt, table, record, values),
            Command::Add {
                table,
                record,
                column,
                values,
            } => write::add(attempt, table, record, column, values),
            Command::Clear {
                table,
                record,
                column,
            } => write::clear(attempt, table, record, column),
            Command::Get {
                table,
                record,
                column,
            } => read::get(&*attempt, table, record, column),
            Command::List {
                table,
                records,
                columns,
                if_exists,
            } => read::list(&*attempt, table, records, columns.as_deref(), *if_exists),
            Command::Find {
                table,
                conditions,
                columns,
            } => read::find(&*attempt, table, conditions, columns.as_deref()),
        }
    }

    /// Translate `result` after a successful commit.
    ///
    /// Only Create changes its result: the temporary row UUID becomes the
    /// durable one, or nothing if the row was destroyed before commit.
    pub fn finalize(&self, attempt: &dyn Attempt, result: Output) -> Output {
        match (self, result) {
            // A row destroyed before commit never gets a durable UUID.
            (Command::Create { .. }, Output::PendingRow(temp)) => attempt
                .insert_uuid(temp)
                .map_or(Output::None, Output::Row),
            (_, result) => result,
        }
    }
}

fn write_pairs(f: &mut fmt::Formatter<'_>, pairs: &[(String, Value)]) -> fmt::Result {
    write!(f, "[")?;
    for (i, (column, value)) in pairs.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}={}", column, value)?;
    }
    write!(f, "]")
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "]")
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(table={}", self.name(), self.table())?;
        match self {
            Command::Create { columns, .. } => {
                write!(f, ", columns=")?;
                write_pairs(f, columns)?;
            }
            Command::Destroy { record, .. } => write!(f, ", record={}", record)?,
            Command::Set { record, values, .. } => {
                write!(f, ", record={}, values=", record)?;
                write_pairs(f, values)?;
            }
            Command::Add {
                record,
                column,
                values,
                ..
            } => {
                write!(f, ", record={}, column={}, values=", record, column)?;
                write_list(f, values)?;
            }
            Command::Clear { record, column, .. } | Command::Get { record, column, .. } => {
                write!(f, ", record={}, column={}", record, column)?
            }
            Command::List {
                records,
                columns,
                if_exists,
                ..
            } => {
                write!(f, ", records=")?;
                write_list(f, records)?;
                write!(f, ", columns={:?}, if_exists={}", columns, if_exists)?;
            }
            Command::Find {
                conditions,
                columns,
                ..
            } => {
                write!(f, ", conditions=")?;
                write_list(f, conditions)?;
                write!(f, ", columns={:?}", columns)?;
            }
        }
        write!(f, ")")
    }
}
