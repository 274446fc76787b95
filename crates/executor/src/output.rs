//! Output enum for command results.
//!
//! Every command produces exactly one output variant; the mapping is fixed
//! per [`Command`](crate::Command) variant.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ovstxn_core::{Datum, RowMap};

/// Result of one command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Output {
    /// No result (Destroy, Set, Add, Clear, or not run yet)
    #[default]
    None,

    /// Temporary UUID of a row created in the current attempt
    PendingRow(Uuid),

    /// Durable UUID of a committed row
    Row(Uuid),

    /// A single column value
    Datum(Datum),

    /// Column maps, one per row
    Rows(Vec<RowMap>),
}

impl Output {
    /// Row UUID, temporary or durable
    pub fn row_uuid(&self) -> Option<Uuid> {
        match self {
            Output::PendingRow(uuid) | Output::Row(uuid) => Some(*uuid),
            _ => None,
        }
    }

    /// Column value of a Get
    pub fn as_datum(&self) -> Option<&Datum> {
        match self {
            Output::Datum(datum) => Some(datum),
            _ => None,
        }
    }

    /// Rows of a List or Find
    pub fn as_rows(&self) -> Option<&[RowMap]> {
        match self {
            Output::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Check for the empty result
    pub fn is_none(&self) -> bool {
        matches!(self, Output::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let uuid = Uuid::new_v4();
        assert_eq!(Output::PendingRow(uuid).row_uuid(), Some(uuid));
        assert_eq!(Output::Row(uuid).row_uuid(), Some(uuid));
        assert_eq!(Output::Datum(Datum::from(1i64)).row_uuid(), None);
        assert!(Output::default().is_none());
        assert!(Output::Rows(Vec::new()).as_rows().unwrap().is_empty());
    }

    #[test]
    fn test_output_serializes() {
        let output = Output::Datum(Datum::from("br0"));
        let json = serde_json::to_string(&output).unwrap();
        let back: Output = serde_json::from_str(&json).unwrap();
        assert_eq!(back, output);
    }
}
