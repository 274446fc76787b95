//! Row predicates
//!
//! A [`Condition`] compares one column of a row against a value. Scalar
//! comparisons (`=`, `!=`, `<`, `<=`, `>`, `>=`) look at the column after a
//! one-element set has been unwrapped; the braced forms (`{=}`, `{!=}`,
//! `{<=}`, `{>=}`) compare the column as a collection.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::value::Datum;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `{=}`: same elements
    SetEq,
    /// `{!=}`: different elements
    SetNe,
    /// `{<=}`: column is a subset of the value
    Subset,
    /// `{>=}`: column includes every element of the value
    Includes,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::SetEq => "{=}",
            Op::SetNe => "{!=}",
            Op::Subset => "{<=}",
            Op::Includes => "{>=}",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Op {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s {
            "=" | "==" => Op::Eq,
            "!=" => Op::Ne,
            "<" => Op::Lt,
            "<=" => Op::Le,
            ">" => Op::Gt,
            ">=" => Op::Ge,
            "{=}" => Op::SetEq,
            "{!=}" => Op::SetNe,
            "{<=}" => Op::Subset,
            "{>=}" => Op::Includes,
            other => {
                return Err(Error::invalid_value(format!(
                    "unknown condition operator '{}'",
                    other
                )))
            }
        };
        Ok(op)
    }
}

/// `column op value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Column to test (may be `_uuid`)
    pub column: String,
    /// Operator
    pub op: Op,
    /// Right-hand side
    pub value: Datum,
}

impl Condition {
    /// Create a condition
    pub fn new(column: impl Into<String>, op: Op, value: impl Into<Datum>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// Create a condition from an operator string such as `"="` or `"{>=}"`
    pub fn parse(
        column: impl Into<String>,
        op: &str,
        value: impl Into<Datum>,
    ) -> crate::Result<Self> {
        Ok(Self::new(column, op.parse()?, value))
    }

    /// Evaluate against the column's current value.
    pub fn matches(&self, column: &Datum) -> bool {
        match self.op {
            Op::Eq => scalar_eq(column, &self.value),
            Op::Ne => !scalar_eq(column, &self.value),
            Op::Lt => scalar_cmp(column, &self.value) == Some(Ordering::Less),
            Op::Le => matches!(
                scalar_cmp(column, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Op::Gt => scalar_cmp(column, &self.value) == Some(Ordering::Greater),
            Op::Ge => matches!(
                scalar_cmp(column, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Op::SetEq => collection(column) == collection(&self.value),
            Op::SetNe => collection(column) != collection(&self.value),
            Op::Subset => includes(&collection(&self.value), &collection(column)),
            Op::Includes => includes(&collection(column), &collection(&self.value)),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.column, self.op, self.value)
    }
}

fn scalar_eq(a: &Datum, b: &Datum) -> bool {
    a.clone().unwrap_singleton() == b.clone().unwrap_singleton()
}

// Only scalars of the same kind are ordered.
fn scalar_cmp(a: &Datum, b: &Datum) -> Option<Ordering> {
    match (a.clone().unwrap_singleton(), b.clone().unwrap_singleton()) {
        (Datum::Scalar(x), Datum::Scalar(y)) if x.kind() == y.kind() => Some(x.cmp(&y)),
        _ => None,
    }
}

fn collection(d: &Datum) -> Datum {
    d.clone().into_collection()
}

fn includes(outer: &Datum, inner: &Datum) -> bool {
    match (outer, inner) {
        (Datum::Set(o), Datum::Set(i)) => i.is_subset(o),
        (Datum::Map(o), Datum::Map(i)) => i.iter().all(|(k, v)| o.get(k) == Some(v)),
        _ => false,
    }
}
