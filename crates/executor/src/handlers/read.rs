//! Read command handlers.

use ovstxn_core::{Attempt, Condition, Error, Result};

use crate::resolve::{column_value, listed_columns, resolve_record, row_map};
use crate::{Output, Record};

/// Handle Get command.
///
/// A one-element set comes back as its element, the way vsctl prints
/// single-valued sets.
pub(crate) fn get(
    attempt: &dyn Attempt,
    table: &str,
    record: &Record,
    column: &str,
) -> Result<Output> {
    let row = resolve_record(attempt, table, record)?;
    let datum = column_value(attempt, table, row, column)?;
    Ok(Output::Datum(datum.unwrap_singleton()))
}

/// Handle List command.
pub(crate) fn list(
    attempt: &dyn Attempt,
    table: &str,
    records: &[Record],
    columns: Option<&[String]>,
    if_exists: bool,
) -> Result<Output> {
    let selected = listed_columns(attempt, table, columns)?;

    let rows = if records.is_empty() {
        attempt.rows(table)?
    } else {
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            match resolve_record(attempt, table, record) {
                Ok(row) => rows.push(row),
                Err(Error::RowNotFound { .. }) if if_exists => continue,
                Err(Error::RowNotFound { .. }) => {
                    return Err(Error::RowNotFoundInList {
                        table: table.to_string(),
                        columns: columns.map(<[String]>::to_vec),
                        records: records.iter().map(ToString::to_string).collect(),
                    })
                }
                Err(e) => return Err(e),
            }
        }
        rows
    };

    let maps = rows
        .into_iter()
        .map(|row| row_map(attempt, table, row, &selected))
        .collect::<Result<Vec<_>>>()?;
    Ok(Output::Rows(maps))
}

/// Handle Find command.
pub(crate) fn find(
    attempt: &dyn Attempt,
    table: &str,
    conditions: &[Condition],
    columns: Option<&[String]>,
) -> Result<Output> {
    let selected = listed_columns(attempt, table, columns)?;
    let mut maps = Vec::new();
    'rows: for row in attempt.rows(table)? {
        for condition in conditions {
            let value = column_value(attempt, table, row, &condition.column)?;
            if !condition.matches(&value) {
                continue 'rows;
            }
        }
        maps.push(row_map(attempt, table, row, &selected)?);
    }
    Ok(Output::Rows(maps))
}
