//! Column value types
//!
//! This module defines:
//! - Atom: a single scalar (integer, real, boolean, string, UUID)
//! - Datum: the value of a column (scalar, set of atoms, or map of atoms)
//!
//! ## Ordering
//!
//! Atoms are totally ordered so that sets and maps have one canonical form.
//! Atoms of different kinds order by kind (Integer < Real < Boolean < String
//! < Uuid); reals order by `f64::total_cmp`, so `NaN == NaN` and
//! `-0.0 < 0.0` inside a datum.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

use crate::schema::AtomType;

/// Column name to value mapping produced by List and Find.
pub type RowMap = BTreeMap<String, Datum>;

/// A single database scalar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Atom {
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point
    Real(f64),
    /// Boolean
    Boolean(bool),
    /// UTF-8 string
    String(String),
    /// Row reference or other UUID
    Uuid(Uuid),
}

impl Atom {
    /// The atom's type.
    pub fn kind(&self) -> AtomType {
        match self {
            Atom::Integer(_) => AtomType::Integer,
            Atom::Real(_) => AtomType::Real,
            Atom::Boolean(_) => AtomType::Boolean,
            Atom::String(_) => AtomType::String,
            Atom::Uuid(_) => AtomType::Uuid,
        }
    }

    /// String contents, if this is a string atom.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Atom::String(s) => Some(s),
            _ => None,
        }
    }

    /// UUID contents, if this is a UUID atom.
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Atom::Uuid(u) => Some(*u),
            _ => None,
        }
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Atom {}

impl Ord for Atom {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Atom::Integer(a), Atom::Integer(b)) => a.cmp(b),
            (Atom::Real(a), Atom::Real(b)) => a.total_cmp(b),
            (Atom::Boolean(a), Atom::Boolean(b)) => a.cmp(b),
            (Atom::String(a), Atom::String(b)) => a.cmp(b),
            (Atom::Uuid(a), Atom::Uuid(b)) => a.cmp(b),
            _ => self.kind().cmp(&other.kind()),
        }
    }
}

impl PartialOrd for Atom {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Integer(i) => write!(f, "{}", i),
            Atom::Real(r) => write!(f, "{}", r),
            Atom::Boolean(b) => write!(f, "{}", b),
            Atom::String(s) => write!(f, "{:?}", s),
            Atom::Uuid(u) => write!(f, "{}", u),
        }
    }
}

impl From<i64> for Atom {
    fn from(v: i64) -> Self {
        Atom::Integer(v)
    }
}

impl From<f64> for Atom {
    fn from(v: f64) -> Self {
        Atom::Real(v)
    }
}

impl From<bool> for Atom {
    fn from(v: bool) -> Self {
        Atom::Boolean(v)
    }
}

impl From<&str> for Atom {
    fn from(v: &str) -> Self {
        Atom::String(v.to_string())
    }
}

impl From<String> for Atom {
    fn from(v: String) -> Self {
        Atom::String(v)
    }
}

impl From<Uuid> for Atom {
    fn from(v: Uuid) -> Self {
        Atom::Uuid(v)
    }
}

/// The value held by a column.
///
/// Single-valued columns hold a `Scalar`; optional and multi-valued columns
/// hold a `Set`; key/value columns hold a `Map`. The replica reports an
/// optional column with one value as a one-element set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Datum {
    /// Exactly one atom
    Scalar(Atom),
    /// Zero or more distinct atoms
    Set(BTreeSet<Atom>),
    /// Zero or more key/value pairs with distinct keys
    Map(BTreeMap<Atom, Atom>),
}

impl Datum {
    /// Empty set datum
    pub fn empty_set() -> Self {
        Datum::Set(BTreeSet::new())
    }

    /// Empty map datum
    pub fn empty_map() -> Self {
        Datum::Map(BTreeMap::new())
    }

    /// Build a set datum; duplicates collapse.
    pub fn set<I, A>(atoms: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Atom>,
    {
        Datum::Set(atoms.into_iter().map(Into::into).collect())
    }

    /// Build a map datum; a later entry for the same key wins.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Atom>,
        V: Into<Atom>,
    {
        Datum::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Check if this is a map
    pub fn is_map(&self) -> bool {
        matches!(self, Datum::Map(_))
    }

    /// Number of atoms (scalars count as one, maps count entries)
    pub fn len(&self) -> usize {
        match self {
            Datum::Scalar(_) => 1,
            Datum::Set(s) => s.len(),
            Datum::Map(m) => m.len(),
        }
    }

    /// True for an empty set or map
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The scalar atom, if this is a scalar
    pub fn as_scalar(&self) -> Option<&Atom> {
        match self {
            Datum::Scalar(a) => Some(a),
            _ => None,
        }
    }

    /// The map entries, if this is a map
    pub fn as_map(&self) -> Option<&BTreeMap<Atom, Atom>> {
        match self {
            Datum::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Turn a one-element set into its element; anything else is returned as is.
    pub fn unwrap_singleton(self) -> Datum {
        match self {
            Datum::Set(set) if set.len() == 1 => match set.into_iter().next() {
                Some(atom) => Datum::Scalar(atom),
                None => Datum::empty_set(),
            },
            other => other,
        }
    }

    /// View as a collection: a scalar becomes a one-element set.
    pub fn into_collection(self) -> Datum {
        match self {
            Datum::Scalar(a) => Datum::Set(BTreeSet::from([a])),
            other => other,
        }
    }

    /// Short name of the datum's shape, for error messages
    pub fn shape(&self) -> &'static str {
        match self {
            Datum::Scalar(_) => "scalar",
            Datum::Set(_) => "set",
            Datum::Map(_) => "map",
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Scalar(a) => write!(f, "{}", a),
            Datum::Set(set) => {
                write!(f, "[")?;
                for (i, atom) in set.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", atom)?;
                }
                write!(f, "]")
            }
            Datum::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

macro_rules! datum_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Datum {
                fn from(v: $ty) -> Self {
                    Datum::Scalar(v.into())
                }
            }
        )*
    };
}

datum_from_scalar!(Atom, i64, f64, bool, &str, String, Uuid);
