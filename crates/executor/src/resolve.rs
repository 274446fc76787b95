//! Record resolution and column reads.
//!
//! A [`Record`] names a row by UUID, by a value of one of the table's index
//! columns, or by reference to another command's row. Tables without an
//! index fall back to a `name` column when they have one.

use uuid::Uuid;

use ovstxn_core::{Atom, Attempt, Datum, Error, Result, RowMap, UUID_COLUMN};

use crate::Record;

const FALLBACK_INDEX: &str = "name";

/// Resolve `record` to a row of `table` visible to `attempt`.
pub fn resolve_record(attempt: &dyn Attempt, table: &str, record: &Record) -> Result<Uuid> {
    let row = match record {
        Record::Uuid(uuid) => *uuid,
        Record::Result(handle) => handle
            .row_uuid()
            .ok_or_else(|| Error::row_not_found(table, record))?,
        Record::Name(name) => return resolve_name(attempt, table, name),
    };
    if attempt.contains(table, row)? {
        Ok(row)
    } else {
        Err(Error::row_not_found(table, record))
    }
}

fn resolve_name(attempt: &dyn Attempt, table: &str, name: &str) -> Result<Uuid> {
    let schema = attempt.schema().table(table)?;
    let indexes: Vec<&str> = if schema.indexes.is_empty() {
        if schema.columns.contains_key(FALLBACK_INDEX) {
            vec![FALLBACK_INDEX]
        } else {
            Vec::new()
        }
    } else {
        schema.indexes.iter().map(String::as_str).collect()
    };

    let wanted = Datum::Scalar(Atom::from(name));
    let rows = attempt.rows(table)?;
    for column in indexes {
        let mut found = None;
        for &row in &rows {
            if attempt.read(table, row, column)?.unwrap_singleton() != wanted {
                continue;
            }
            if found.is_some() {
                return Err(Error::AmbiguousRecord {
                    table: table.to_string(),
                    record: name.to_string(),
                });
            }
            found = Some(row);
        }
        if let Some(row) = found {
            return Ok(row);
        }
    }
    Err(Error::row_not_found(table, name))
}

/// Current value of `column`, including the virtual `_uuid` column.
pub fn column_value(attempt: &dyn Attempt, table: &str, row: Uuid, column: &str) -> Result<Datum> {
    if column == UUID_COLUMN {
        return Ok(Datum::Scalar(Atom::Uuid(row)));
    }
    attempt.read(table, row, column)
}

/// Column map of one row restricted to `columns`.
pub fn row_map(attempt: &dyn Attempt, table: &str, row: Uuid, columns: &[String]) -> Result<RowMap> {
    columns
        .iter()
        .map(|c| -> Result<(String, Datum)> { Ok((c.clone(), column_value(attempt, table, row, c)?)) })
        .collect()
}

/// The columns a listing returns: `requested`, or every declared column
/// plus `_uuid`.
pub fn listed_columns(
    attempt: &dyn Attempt,
    table: &str,
    requested: Option<&[String]>,
) -> Result<Vec<String>> {
    match requested {
        Some(columns) if !columns.is_empty() => Ok(columns.to_vec()),
        _ => Ok(attempt.schema().table(table)?.all_columns()),
    }
}
