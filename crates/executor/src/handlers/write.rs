//! Write command handlers.
//!
//! Every handler works only through the attempt it is given, so re-running
//! it against a fresh attempt after TRY_AGAIN starts from the then-current
//! rows.

use std::collections::btree_map::Entry;

use ovstxn_core::{Attempt, ColumnType, Datum, Error, Result};
use tracing::trace;

use crate::codec::to_column_datum;
use crate::resolve::resolve_record;
use crate::{Output, Record, Value};

// =============================================================================
// Helpers
// =============================================================================

fn column_type(attempt: &dyn Attempt, table: &str, column: &str) -> Result<ColumnType> {
    Ok(attempt.schema().table(table)?.column_type(column)?.clone())
}

fn mismatch(table: &str, column: &str, expected: &str, actual: &Datum) -> Error {
    Error::TypeMismatch {
        table: table.to_string(),
        column: column.to_string(),
        expected: expected.to_string(),
        actual: actual.shape().to_string(),
    }
}

// =============================================================================
// Individual Handlers
// =============================================================================

/// Handle Create command.
pub(crate) fn create(
    attempt: &mut dyn Attempt,
    table: &str,
    columns: &[(String, Value)],
) -> Result<Output> {
    let mut datums = Vec::with_capacity(columns.len());
    {
        let schema = attempt.schema().table(table)?;
        for (column, value) in columns {
            datums.push((column.as_str(), to_column_datum(value, schema.column_type(column)?)?));
        }
    }
    let row = attempt.insert(table)?;
    for (column, datum) in datums {
        attempt.write(table, row, column, datum)?;
    }
    trace!(target: "ovstxn::txn", table, %row, "Row inserted");
    Ok(Output::PendingRow(row))
}

/// Handle Destroy command.
pub(crate) fn destroy(attempt: &mut dyn Attempt, table: &str, record: &Record) -> Result<Output> {
    let row = resolve_record(&*attempt, table, record)?;
    attempt.delete(table, row)?;
    Ok(Output::None)
}

/// Handle Set command.
pub(crate) fn set(
    attempt: &mut dyn Attempt,
    table: &str,
    record: &Record,
    values: &[(String, Value)],
) -> Result<Output> {
    let row = resolve_record(&*attempt, table, record)?;
    for (column, value) in values {
        let ty = column_type(&*attempt, table, column)?;
        let datum = match to_column_datum(value, &ty)? {
            Datum::Map(entries) => match attempt.read(table, row, column)? {
                Datum::Map(mut existing) => {
                    existing.extend(entries);
                    Datum::Map(existing)
                }
                _ => Datum::Map(entries),
            },
            other => other,
        };
        attempt.write(table, row, column, datum)?;
    }
    Ok(Output::None)
}

/// Handle Add command.
///
/// Map columns keep existing keys; set columns gain the new atoms. Either
/// way the new value derives from the current one, so the column is
/// verified and a concurrent change turns the commit into TRY_AGAIN.
pub(crate) fn add(
    attempt: &mut dyn Attempt,
    table: &str,
    record: &Record,
    column: &str,
    values: &[Value],
) -> Result<Output> {
    let row = resolve_record(&*attempt, table, record)?;
    let ty = column_type(&*attempt, table, column)?;
    let existing = attempt.read(table, row, column)?;

    let updated = if ty.is_map() {
        let mut map = match existing {
            Datum::Map(map) => map,
            other => return Err(mismatch(table, column, "map", &other)),
        };
        for value in values {
            match to_column_datum(value, &ty)? {
                Datum::Map(entries) => {
                    for (key, v) in entries {
                        if let Entry::Vacant(slot) = map.entry(key) {
                            slot.insert(v);
                        }
                    }
                }
                other => return Err(mismatch(table, column, "map", &other)),
            }
        }
        Datum::Map(map)
    } else if ty.is_scalar() {
        return Err(mismatch(table, column, "set or map", &existing));
    } else {
        let mut set = match existing.into_collection() {
            Datum::Set(set) => set,
            other => return Err(mismatch(table, column, "set", &other)),
        };
        for value in values {
            match to_column_datum(value, &ty)? {
                Datum::Set(atoms) => set.extend(atoms),
                Datum::Scalar(atom) => {
                    set.insert(atom);
                }
                other => return Err(mismatch(table, column, "set", &other)),
            }
        }
        Datum::Set(set)
    };

    attempt.verify(table, row, column)?;
    attempt.write(table, row, column, updated)?;
    Ok(Output::None)
}

/// Handle Clear command.
pub(crate) fn clear(
    attempt: &mut dyn Attempt,
    table: &str,
    record: &Record,
    column: &str,
) -> Result<Output> {
    let row = resolve_record(&*attempt, table, record)?;
    let empty = column_type(&*attempt, table, column)?.empty_datum();
    attempt.write(table, row, column, empty)?;
    Ok(Output::None)
}
