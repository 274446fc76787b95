//! Caller-side values and row identifiers.
//!
//! A [`Value`] is what a caller hands to a command before it knows anything
//! about the column it will land in. The [codec](crate::codec) turns it into
//! a [`Datum`](ovstxn_core::Datum) once the column type is known.

use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use ovstxn_core::Atom;

use crate::CommandHandle;

/// A column value as supplied by the caller.
#[derive(Debug, Clone)]
pub enum Value {
    /// A single atom
    Atom(Atom),
    /// An unordered collection; duplicates collapse when encoded
    Set(Vec<Value>),
    /// Key/value pairs in caller order; a later pair for the same key wins
    Map(Vec<(Value, Value)>),
    /// The row produced by another command of the same transaction
    Result(CommandHandle),
}

impl Value {
    /// Build a set value
    pub fn set<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Set(values.into_iter().map(Into::into).collect())
    }

    /// Build a map value
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Value>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Check if this is a map value
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Atom(atom) => write!(f, "{}", atom),
            Value::Set(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Result(handle) => write!(f, "<result of {}>", handle.command().name()),
        }
    }
}

macro_rules! value_from_atom {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Atom(Atom::from(v))
                }
            }
        )*
    };
}

value_from_atom!(i64, f64, bool, &str, String, Uuid);

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Atom(Atom::Integer(i64::from(v)))
    }
}

impl From<Atom> for Value {
    fn from(atom: Atom) -> Self {
        Value::Atom(atom)
    }
}

impl From<CommandHandle> for Value {
    fn from(handle: CommandHandle) -> Self {
        Value::Result(handle)
    }
}

impl From<&CommandHandle> for Value {
    fn from(handle: &CommandHandle) -> Self {
        Value::Result(handle.clone())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::set(values)
    }
}

impl<K: Into<Value>, V: Into<Value>> From<BTreeMap<K, V>> for Value {
    fn from(entries: BTreeMap<K, V>) -> Self {
        Value::map(entries)
    }
}

/// Identifies one row of a table.
#[derive(Debug, Clone)]
pub enum Record {
    /// The row's UUID
    Uuid(Uuid),
    /// A name looked up through the table's index columns
    Name(String),
    /// The row produced by another command of the same transaction
    Result(CommandHandle),
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Uuid(uuid) => write!(f, "{}", uuid),
            Record::Name(name) => write!(f, "{}", name),
            Record::Result(handle) => match handle.row_uuid() {
                Some(uuid) => write!(f, "{}", uuid),
                None => write!(f, "<result of {}>", handle.command().name()),
            },
        }
    }
}

impl From<Uuid> for Record {
    fn from(uuid: Uuid) -> Self {
        Record::Uuid(uuid)
    }
}

/// A string that parses as a UUID names the row by UUID.
impl From<&str> for Record {
    fn from(s: &str) -> Self {
        match Uuid::parse_str(s) {
            Ok(uuid) => Record::Uuid(uuid),
            Err(_) => Record::Name(s.to_string()),
        }
    }
}

impl From<String> for Record {
    fn from(s: String) -> Self {
        match Uuid::parse_str(&s) {
            Ok(uuid) => Record::Uuid(uuid),
            Err(_) => Record::Name(s),
        }
    }
}

impl From<CommandHandle> for Record {
    fn from(handle: CommandHandle) -> Self {
        Record::Result(handle)
    }
}

impl From<&CommandHandle> for Record {
    fn from(handle: &CommandHandle) -> Self {
        Record::Result(handle.clone())
    }
}
