//! Table and column metadata
//!
//! The replica exposes just enough schema for commands to do their work:
//! the declared type of each column (so Clear can produce an empty value and
//! the backend can check writes) and the index columns used to look rows up
//! by name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::value::{Atom, Datum};

/// Pseudo-column holding a row's UUID.
pub const UUID_COLUMN: &str = "_uuid";

/// Type of a single atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtomType {
    /// 64-bit signed integer
    Integer,
    /// 64-bit floating point
    Real,
    /// Boolean
    Boolean,
    /// UTF-8 string
    String,
    /// UUID
    Uuid,
}

impl AtomType {
    /// The zero value of this type.
    pub fn default_atom(self) -> Atom {
        match self {
            AtomType::Integer => Atom::Integer(0),
            AtomType::Real => Atom::Real(0.0),
            AtomType::Boolean => Atom::Boolean(false),
            AtomType::String => Atom::String(String::new()),
            AtomType::Uuid => Atom::Uuid(Uuid::nil()),
        }
    }
}

impl fmt::Display for AtomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AtomType::Integer => "integer",
            AtomType::Real => "real",
            AtomType::Boolean => "boolean",
            AtomType::String => "string",
            AtomType::Uuid => "uuid",
        };
        f.write_str(name)
    }
}

/// Declared type of a column.
///
/// `value` is set for map columns. `min`/`max` bound the number of atoms
/// (or map entries); `max: None` means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnType {
    /// Type of the atoms (or of map keys)
    pub key: AtomType,
    /// Type of map values; `None` for non-map columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<AtomType>,
    /// Minimum number of elements
    pub min: usize,
    /// Maximum number of elements (`None` = unlimited)
    #[serde(default)]
    pub max: Option<usize>,
}

impl ColumnType {
    /// Exactly one atom
    pub fn scalar(key: AtomType) -> Self {
        Self {
            key,
            value: None,
            min: 1,
            max: Some(1),
        }
    }

    /// Zero or one atom
    pub fn optional(key: AtomType) -> Self {
        Self {
            key,
            value: None,
            min: 0,
            max: Some(1),
        }
    }

    /// Any number of atoms
    pub fn set(key: AtomType) -> Self {
        Self {
            key,
            value: None,
            min: 0,
            max: None,
        }
    }

    /// Any number of key/value pairs
    pub fn map(key: AtomType, value: AtomType) -> Self {
        Self {
            key,
            value: Some(value),
            min: 0,
            max: None,
        }
    }

    /// Limit the number of elements
    pub fn with_max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    /// Check if this is a map column
    pub fn is_map(&self) -> bool {
        self.value.is_some()
    }

    /// Check if this column holds exactly one atom
    pub fn is_scalar(&self) -> bool {
        !self.is_map() && self.min == 1 && self.max == Some(1)
    }

    /// The empty value of this column: empty map, empty set, or for a
    /// single-valued column the default atom of its type.
    pub fn empty_datum(&self) -> Datum {
        if self.is_map() {
            Datum::empty_map()
        } else if self.is_scalar() {
            Datum::Scalar(self.key.default_atom())
        } else {
            Datum::empty_set()
        }
    }

    /// Whether `datum` is a legal value for this column.
    pub fn accepts(&self, datum: &Datum) -> bool {
        let within = |n: usize| n >= self.min && self.max.map_or(true, |max| n <= max);
        match (datum, self.value) {
            (Datum::Scalar(a), None) => a.kind() == self.key && within(1),
            (Datum::Set(set), None) => set.iter().all(|a| a.kind() == self.key) && within(set.len()),
            (Datum::Map(map), Some(value)) => {
                map.iter()
                    .all(|(k, v)| k.kind() == self.key && v.kind() == value)
                    && within(map.len())
            }
            _ => false,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(value) => write!(f, "map<{}, {}>", self.key, value),
            None if self.is_scalar() => write!(f, "{}", self.key),
            None => write!(f, "set<{}>", self.key),
        }
    }
}

/// Schema of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name
    pub name: String,
    /// Declared columns (without `_uuid`)
    pub columns: BTreeMap<String, ColumnType>,
    /// Columns that identify a row by name, tried in order
    #[serde(default)]
    pub indexes: Vec<String>,
}

impl TableSchema {
    /// Create an empty table schema
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: BTreeMap::new(),
            indexes: Vec::new(),
        }
    }

    /// Add a column
    pub fn column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.insert(name.into(), column_type);
        self
    }

    /// Add an index column used for name lookups
    pub fn index(mut self, column: impl Into<String>) -> Self {
        self.indexes.push(column.into());
        self
    }

    /// Type of `column`, or `ColumnNotFound`
    pub fn column_type(&self, column: &str) -> Result<&ColumnType> {
        self.columns.get(column).ok_or_else(|| Error::ColumnNotFound {
            table: self.name.clone(),
            column: column.to_string(),
        })
    }

    /// All declared column names followed by `_uuid`
    pub fn all_columns(&self) -> Vec<String> {
        self.columns
            .keys()
            .cloned()
            .chain(std::iter::once(UUID_COLUMN.to_string()))
            .collect()
    }
}

/// Schema of a whole database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    /// Tables by name
    pub tables: BTreeMap<String, TableSchema>,
}

impl DatabaseSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table
    pub fn with_table(mut self, table: TableSchema) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Look up a table, or `TableNotFound`
    pub fn table(&self, name: &str) -> Result<&TableSchema> {
        self.tables.get(name).ok_or_else(|| Error::TableNotFound {
            table: name.to_string(),
        })
    }
}
