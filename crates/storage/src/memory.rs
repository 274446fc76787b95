//! Shared committed state and client connections.

use parking_lot::{Condvar, Mutex};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use ovstxn_core::{
    Attempt, CommitStatus, Connection, DatabaseSchema, Datum, Error, Result, RowMap,
};

use crate::attempt::MemoryAttempt;

/// A committed column value and the sequence number that last wrote it.
#[derive(Debug, Clone)]
pub(crate) struct StoredColumn {
    pub(crate) datum: Datum,
    pub(crate) version: u64,
}

pub(crate) type StoredRow = BTreeMap<String, StoredColumn>;
pub(crate) type Tables = BTreeMap<String, BTreeMap<Uuid, StoredRow>>;

pub(crate) struct State {
    pub(crate) seqno: u64,
    pub(crate) tables: Tables,
    pub(crate) injected: VecDeque<CommitStatus>,
}

pub(crate) struct Shared {
    pub(crate) schema: DatabaseSchema,
    pub(crate) state: Mutex<State>,
    pub(crate) changed: Condvar,
}

impl Shared {
    /// Advance the sequence number and wake every waiter. Caller holds the lock.
    pub(crate) fn bump(&self, state: &mut State) -> u64 {
        state.seqno += 1;
        self.changed.notify_all();
        state.seqno
    }
}

/// The committed database all connections share.
///
/// Cloning yields another handle to the same data.
#[derive(Clone)]
pub struct MemoryDatabase {
    shared: Arc<Shared>,
}

impl MemoryDatabase {
    /// Create an empty database with `schema`.
    pub fn new(schema: DatabaseSchema) -> Self {
        let tables = schema
            .tables
            .keys()
            .map(|name| (name.clone(), BTreeMap::new()))
            .collect();
        Self {
            shared: Arc::new(Shared {
                schema,
                state: Mutex::new(State {
                    seqno: 0,
                    tables,
                    injected: VecDeque::new(),
                }),
                changed: Condvar::new(),
            }),
        }
    }

    /// Open a client connection.
    pub fn connect(&self) -> MemoryConnection {
        MemoryConnection {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Database schema
    pub fn schema(&self) -> &DatabaseSchema {
        &self.shared.schema
    }

    /// Current change sequence number
    pub fn change_seqno(&self) -> u64 {
        self.shared.state.lock().seqno
    }

    /// Force the next `times` commit attempts to report `status` without
    /// applying anything. An injected TRY_AGAIN also advances the sequence
    /// number, as if another client had committed first.
    pub fn inject_status(&self, status: CommitStatus, times: usize) {
        let mut state = self.shared.state.lock();
        state.injected.extend(std::iter::repeat(status).take(times));
    }

    /// Number of injected statuses not yet consumed
    pub fn pending_injections(&self) -> usize {
        self.shared.state.lock().injected.len()
    }

    /// Commit a new row directly, as another client would.
    ///
    /// Columns not given get the empty value of their type.
    pub fn insert_row<I, C>(&self, table: &str, columns: I) -> Result<Uuid>
    where
        I: IntoIterator<Item = (C, Datum)>,
        C: Into<String>,
    {
        let schema = self.shared.schema.table(table)?;
        let mut values: BTreeMap<String, Datum> = schema
            .columns
            .iter()
            .map(|(name, ty)| (name.clone(), ty.empty_datum()))
            .collect();
        for (column, datum) in columns {
            let column = column.into();
            check_value(&self.shared.schema, table, &column, &datum)?;
            values.insert(column, datum);
        }

        let row = Uuid::new_v4();
        let mut state = self.shared.state.lock();
        let version = self.shared.bump(&mut state);
        let stored = values
            .into_iter()
            .map(|(name, datum)| (name, StoredColumn { datum, version }))
            .collect();
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .insert(row, stored);
        debug!(target: "ovstxn::storage", table, %row, seqno = version, "Row inserted directly");
        Ok(row)
    }

    /// Commit a single column write directly, as another client would.
    pub fn update_row(&self, table: &str, row: Uuid, column: &str, datum: Datum) -> Result<()> {
        check_value(&self.shared.schema, table, column, &datum)?;
        let mut state = self.shared.state.lock();
        if !row_committed(&state, table, row) {
            return Err(Error::row_not_found(table, row));
        }
        let version = state.seqno + 1;
        if let Some(stored) = state.tables.get_mut(table).and_then(|t| t.get_mut(&row)) {
            stored.insert(column.to_string(), StoredColumn { datum, version });
        }
        self.shared.bump(&mut state);
        Ok(())
    }

    /// Delete a committed row directly, as another client would.
    pub fn delete_row(&self, table: &str, row: Uuid) -> Result<()> {
        let mut state = self.shared.state.lock();
        let removed = state
            .tables
            .get_mut(table)
            .and_then(|t| t.remove(&row))
            .is_some();
        if !removed {
            return Err(Error::row_not_found(table, row));
        }
        self.shared.bump(&mut state);
        Ok(())
    }

    /// Committed column values of one row
    pub fn row(&self, table: &str, row: Uuid) -> Option<RowMap> {
        let state = self.shared.state.lock();
        state
            .tables
            .get(table)
            .and_then(|t| t.get(&row))
            .map(to_row_map)
    }

    /// All committed rows of a table
    pub fn rows(&self, table: &str) -> Vec<(Uuid, RowMap)> {
        let state = self.shared.state.lock();
        state
            .tables
            .get(table)
            .map(|t| t.iter().map(|(uuid, row)| (*uuid, to_row_map(row))).collect())
            .unwrap_or_default()
    }

    /// Number of committed rows in a table
    pub fn row_count(&self, table: &str) -> usize {
        let state = self.shared.state.lock();
        state.tables.get(table).map_or(0, BTreeMap::len)
    }
}

fn to_row_map(row: &StoredRow) -> RowMap {
    row.iter()
        .map(|(name, column)| (name.clone(), column.datum.clone()))
        .collect()
}

fn row_committed(state: &State, table: &str, row: Uuid) -> bool {
    state
        .tables
        .get(table)
        .map_or(false, |t| t.contains_key(&row))
}

fn check_value(schema: &DatabaseSchema, table: &str, column: &str, datum: &Datum) -> Result<()> {
    let ty = schema.table(table)?.column_type(column)?;
    if ty.accepts(datum) {
        Ok(())
    } else {
        Err(Error::TypeMismatch {
            table: table.to_string(),
            column: column.to_string(),
            expected: ty.to_string(),
            actual: datum.to_string(),
        })
    }
}

/// Client connection to a [`MemoryDatabase`].
pub struct MemoryConnection {
    shared: Arc<Shared>,
}

impl Connection for MemoryConnection {
    fn begin_attempt(&mut self) -> Box<dyn Attempt + '_> {
        let (tables, seqno) = {
            let state = self.shared.state.lock();
            (state.tables.clone(), state.seqno)
        };
        Box::new(MemoryAttempt::new(Arc::clone(&self.shared), tables, seqno))
    }

    fn change_seqno(&self) -> u64 {
        self.shared.state.lock().seqno
    }

    fn wait_for_change(&mut self, timeout: Duration, since_seqno: u64) -> bool {
        let mut state = self.shared.state.lock();
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => {
                while state.seqno <= since_seqno {
                    self.shared.changed.wait(&mut state);
                }
                return true;
            }
        };
        while state.seqno <= since_seqno {
            if self
                .shared
                .changed
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return state.seqno > since_seqno;
            }
        }
        true
    }
}
