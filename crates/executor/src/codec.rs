//! Value codec: caller [`Value`]s to column [`Datum`]s.
//!
//! References to other commands' rows are resolved here, so a command can
//! point at a row created earlier in the same transaction. Shapes are
//! canonicalized against the column type: a bare atom written to a set
//! column becomes a one-element set, a one-element set written to a scalar
//! column becomes the atom, and integers written to real columns are
//! widened. Anything else the column does not accept is left for the commit
//! attempt to reject.

use ovstxn_core::{Atom, AtomType, ColumnType, Datum, Error, Result};

use crate::Value;

/// Encode a value that must be a single atom.
pub fn to_atom(value: &Value) -> Result<Atom> {
    match value {
        Value::Atom(atom) => Ok(atom.clone()),
        Value::Result(handle) => handle.row_uuid().map(Atom::Uuid).ok_or_else(|| {
            Error::invalid_value(format!(
                "{} has no row result to reference",
                handle.command().name()
            ))
        }),
        Value::Set(_) | Value::Map(_) => Err(Error::invalid_value(format!(
            "expected a single value, got {}",
            value
        ))),
    }
}

/// Encode a value without knowing the target column.
pub fn to_datum(value: &Value) -> Result<Datum> {
    match value {
        Value::Set(values) => Ok(Datum::Set(
            values.iter().map(to_atom).collect::<Result<_>>()?,
        )),
        Value::Map(entries) => Ok(Datum::Map(
            entries
                .iter()
                .map(|(k, v)| -> Result<(Atom, Atom)> { Ok((to_atom(k)?, to_atom(v)?)) })
                .collect::<Result<_>>()?,
        )),
        Value::Atom(_) | Value::Result(_) => Ok(Datum::Scalar(to_atom(value)?)),
    }
}

/// Encode a value for a column of type `column`.
pub fn to_column_datum(value: &Value, column: &ColumnType) -> Result<Datum> {
    let datum = widen(to_datum(value)?, column);
    Ok(match datum {
        Datum::Scalar(atom) if !column.is_map() && !column.is_scalar() => Datum::set([atom]),
        Datum::Set(set) if column.is_scalar() && set.len() == 1 => {
            Datum::Set(set).unwrap_singleton()
        }
        other => other,
    })
}

fn widen(datum: Datum, column: &ColumnType) -> Datum {
    let real = |atom: Atom, ty: Option<AtomType>| match (atom, ty) {
        (Atom::Integer(i), Some(AtomType::Real)) => Atom::Real(i as f64),
        (atom, _) => atom,
    };
    match datum {
        Datum::Scalar(a) => Datum::Scalar(real(a, Some(column.key))),
        Datum::Set(set) => Datum::Set(set.into_iter().map(|a| real(a, Some(column.key))).collect()),
        Datum::Map(map) => Datum::Map(
            map.into_iter()
                .map(|(k, v)| (real(k, Some(column.key)), real(v, column.value)))
                .collect(),
        ),
    }
}
