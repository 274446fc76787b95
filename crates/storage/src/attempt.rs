//! One commit attempt against a [`MemoryDatabase`](crate::MemoryDatabase).
//!
//! The attempt reads from the snapshot taken when it was opened and buffers
//! every write. `commit_block` validates verified columns against the
//! committed state, then applies all buffered changes under one sequence
//! number.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use ovstxn_core::{Atom, Attempt, CommitStatus, DatabaseSchema, Datum, Error, Result};

use crate::memory::{Shared, StoredColumn, StoredRow, Tables};

type RowKey = (String, Uuid);

struct Verified {
    table: String,
    row: Uuid,
    column: String,
    version: u64,
}

/// Attempt handed out by [`MemoryConnection`](crate::MemoryConnection).
pub struct MemoryAttempt {
    shared: Arc<Shared>,
    snapshot: Tables,
    snapshot_seqno: u64,
    inserted: BTreeMap<Uuid, String>,
    writes: BTreeMap<RowKey, BTreeMap<String, Datum>>,
    deleted: BTreeSet<RowKey>,
    verified: Vec<Verified>,
    insert_uuids: BTreeMap<Uuid, Uuid>,
    aborted: bool,
    finished: bool,
    error: Option<String>,
}

impl MemoryAttempt {
    pub(crate) fn new(shared: Arc<Shared>, snapshot: Tables, snapshot_seqno: u64) -> Self {
        Self {
            shared,
            snapshot,
            snapshot_seqno,
            inserted: BTreeMap::new(),
            writes: BTreeMap::new(),
            deleted: BTreeSet::new(),
            verified: Vec::new(),
            insert_uuids: BTreeMap::new(),
            aborted: false,
            finished: false,
            error: None,
        }
    }

    fn snapshot_row(&self, table: &str, row: Uuid) -> Option<&StoredRow> {
        self.snapshot.get(table).and_then(|t| t.get(&row))
    }

    fn is_inserted(&self, table: &str, row: Uuid) -> bool {
        self.inserted.get(&row).map_or(false, |t| t == table)
    }

    fn exists(&self, table: &str, row: Uuid) -> bool {
        if self.deleted.contains(&(table.to_string(), row)) {
            return false;
        }
        self.is_inserted(table, row) || self.snapshot_row(table, row).is_some()
    }

    fn require_row(&self, table: &str, row: Uuid) -> Result<()> {
        if self.exists(table, row) {
            Ok(())
        } else {
            Err(Error::row_not_found(table, row))
        }
    }

    fn has_changes(&self) -> bool {
        !(self.inserted.is_empty() && self.writes.is_empty() && self.deleted.is_empty())
    }

    fn conflicts(&self, tables: &Tables) -> bool {
        let stale = self.verified.iter().any(|v| {
            let current = tables
                .get(&v.table)
                .and_then(|t| t.get(&v.row))
                .map(|row| row.get(&v.column).map_or(0, |c| c.version));
            current != Some(v.version)
        });
        let vanished = self
            .writes
            .keys()
            .chain(self.deleted.iter())
            .filter(|(table, row)| !self.is_inserted(table, *row))
            .any(|(table, row)| !tables.get(table).map_or(false, |t| t.contains_key(row)));
        stale || vanished
    }

    fn invalid_write(&self) -> Option<String> {
        for ((table, _), columns) in &self.writes {
            for (column, datum) in columns {
                let ty = match self
                    .shared
                    .schema
                    .table(table)
                    .and_then(|t| t.column_type(column))
                {
                    Ok(ty) => ty,
                    Err(e) => return Some(e.to_string()),
                };
                if !ty.accepts(datum) {
                    return Some(format!(
                        "constraint violation: {}.{} expects {}, got {}",
                        table, column, ty, datum
                    ));
                }
            }
        }
        None
    }
}

// Rewrite temporary row UUIDs into the durable ones assigned at commit.
fn remap(datum: &Datum, uuids: &BTreeMap<Uuid, Uuid>) -> Datum {
    let atom = |a: &Atom| match a {
        Atom::Uuid(u) => Atom::Uuid(*uuids.get(u).unwrap_or(u)),
        other => other.clone(),
    };
    match datum {
        Datum::Scalar(a) => Datum::Scalar(atom(a)),
        Datum::Set(set) => Datum::Set(set.iter().map(atom).collect()),
        Datum::Map(map) => Datum::Map(map.iter().map(|(k, v)| (atom(k), atom(v))).collect()),
    }
}

impl Attempt for MemoryAttempt {
    fn schema(&self) -> &DatabaseSchema {
        &self.shared.schema
    }

    fn rows(&self, table: &str) -> Result<Vec<Uuid>> {
        self.shared.schema.table(table)?;
        let committed = self
            .snapshot
            .get(table)
            .into_iter()
            .flat_map(|t| t.keys().copied());
        let inserted = self
            .inserted
            .iter()
            .filter(|(_, t)| t.as_str() == table)
            .map(|(row, _)| *row);
        Ok(committed
            .chain(inserted)
            .filter(|row| !self.deleted.contains(&(table.to_string(), *row)))
            .collect())
    }

    fn contains(&self, table: &str, row: Uuid) -> Result<bool> {
        self.shared.schema.table(table)?;
        Ok(self.exists(table, row))
    }

    fn read(&self, table: &str, row: Uuid, column: &str) -> Result<Datum> {
        let ty = self.shared.schema.table(table)?.column_type(column)?;
        self.require_row(table, row)?;
        let written = self
            .writes
            .get(&(table.to_string(), row))
            .and_then(|cols| cols.get(column));
        if let Some(datum) = written {
            return Ok(datum.clone());
        }
        Ok(self
            .snapshot_row(table, row)
            .and_then(|r| r.get(column))
            .map(|c| c.datum.clone())
            .unwrap_or_else(|| ty.empty_datum()))
    }

    fn insert(&mut self, table: &str) -> Result<Uuid> {
        self.shared.schema.table(table)?;
        let row = Uuid::new_v4();
        self.inserted.insert(row, table.to_string());
        Ok(row)
    }

    fn write(&mut self, table: &str, row: Uuid, column: &str, value: Datum) -> Result<()> {
        self.shared.schema.table(table)?.column_type(column)?;
        self.require_row(table, row)?;
        self.writes
            .entry((table.to_string(), row))
            .or_default()
            .insert(column.to_string(), value);
        Ok(())
    }

    fn verify(&mut self, table: &str, row: Uuid, column: &str) -> Result<()> {
        self.shared.schema.table(table)?.column_type(column)?;
        self.require_row(table, row)?;
        if self.is_inserted(table, row) {
            return Ok(());
        }
        let version = self
            .snapshot_row(table, row)
            .and_then(|r| r.get(column))
            .map_or(0, |c| c.version);
        self.verified.push(Verified {
            table: table.to_string(),
            row,
            column: column.to_string(),
            version,
        });
        Ok(())
    }

    fn delete(&mut self, table: &str, row: Uuid) -> Result<()> {
        self.require_row(table, row)?;
        let key = (table.to_string(), row);
        self.writes.remove(&key);
        if self.inserted.remove(&row).is_none() {
            self.deleted.insert(key);
        }
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
    }

    fn change_seqno(&self) -> u64 {
        self.snapshot_seqno
    }

    fn commit_block(&mut self) -> CommitStatus {
        if self.aborted {
            return CommitStatus::Aborted;
        }
        if self.finished {
            self.error = Some("attempt already committed".to_string());
            return CommitStatus::Error;
        }
        self.finished = true;

        let shared = Arc::clone(&self.shared);
        let mut state = shared.state.lock();

        if let Some(status) = state.injected.pop_front() {
            match status {
                CommitStatus::TryAgain => {
                    shared.bump(&mut state);
                }
                CommitStatus::Error => {
                    self.error = Some("injected commit failure".to_string());
                }
                _ => {}
            }
            debug!(target: "ovstxn::storage", %status, "Injected commit status");
            return status;
        }

        if self.conflicts(&state.tables) {
            debug!(target: "ovstxn::storage", "Verified column changed, TRY_AGAIN");
            return CommitStatus::TryAgain;
        }
        if !self.has_changes() {
            return CommitStatus::Unchanged;
        }
        if let Some(message) = self.invalid_write() {
            self.error = Some(message);
            return CommitStatus::Error;
        }

        let version = state.seqno + 1;
        self.insert_uuids = self
            .inserted
            .keys()
            .map(|temp| (*temp, Uuid::new_v4()))
            .collect();

        for (temp, table) in &self.inserted {
            let schema = match shared.schema.table(table) {
                Ok(schema) => schema,
                Err(e) => {
                    self.error = Some(e.to_string());
                    return CommitStatus::Error;
                }
            };
            let mut row: StoredRow = schema
                .columns
                .iter()
                .map(|(name, ty)| {
                    let datum = ty.empty_datum();
                    (name.clone(), StoredColumn { datum, version })
                })
                .collect();
            if let Some(columns) = self.writes.get(&(table.clone(), *temp)) {
                for (name, datum) in columns {
                    let datum = remap(datum, &self.insert_uuids);
                    row.insert(name.clone(), StoredColumn { datum, version });
                }
            }
            let durable = self.insert_uuids[temp];
            state.tables.entry(table.clone()).or_default().insert(durable, row);
        }

        for ((table, row), columns) in &self.writes {
            if self.inserted.contains_key(row) {
                continue;
            }
            if let Some(stored) = state.tables.get_mut(table).and_then(|t| t.get_mut(row)) {
                for (name, datum) in columns {
                    let datum = remap(datum, &self.insert_uuids);
                    stored.insert(name.clone(), StoredColumn { datum, version });
                }
            }
        }

        for (table, row) in &self.deleted {
            if let Some(t) = state.tables.get_mut(table) {
                t.remove(row);
            }
        }

        let seqno = shared.bump(&mut state);
        debug!(
            target: "ovstxn::storage",
            seqno,
            inserted = self.inserted.len(),
            updated = self.writes.len(),
            deleted = self.deleted.len(),
            "Attempt committed"
        );
        CommitStatus::Success
    }

    fn error(&self) -> Option<String> {
        self.error.clone()
    }

    fn insert_uuid(&self, temp: Uuid) -> Option<Uuid> {
        self.insert_uuids.get(&temp).copied()
    }
}
