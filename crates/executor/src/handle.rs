//! Shared command handle with a result slot.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use ovstxn_core::{Attempt, Result};

use crate::{Command, Output};

struct Inner {
    command: Command,
    result: Mutex<Output>,
}

/// A [`Command`] plus the slot its result lands in.
///
/// Cloning is cheap and yields a handle to the same command, so a caller can
/// keep one clone, add another to a transaction, and read the result after
/// commit. Each attempt overwrites the slot; after SUCCESS it holds the
/// finalized result.
#[derive(Clone)]
pub struct CommandHandle {
    inner: Arc<Inner>,
}

impl CommandHandle {
    /// Wrap a command; the result starts as [`Output::None`]
    pub fn new(command: Command) -> Self {
        Self {
            inner: Arc::new(Inner {
                command,
                result: Mutex::new(Output::None),
            }),
        }
    }

    /// The wrapped command
    pub fn command(&self) -> &Command {
        &self.inner.command
    }

    /// Current result
    pub fn result(&self) -> Output {
        self.inner.result.lock().clone()
    }

    /// Row UUID in the result, temporary or durable
    pub fn row_uuid(&self) -> Option<Uuid> {
        self.inner.result.lock().row_uuid()
    }

    /// Run the command against `attempt` and store its result.
    pub fn run(&self, attempt: &mut dyn Attempt) -> Result<()> {
        let output = self.inner.command.run(attempt)?;
        *self.inner.result.lock() = output;
        Ok(())
    }

    /// Finalize the stored result after a successful commit.
    pub fn finalize(&self, attempt: &dyn Attempt) {
        let mut slot = self.inner.result.lock();
        let current = std::mem::take(&mut *slot);
        *slot = self.inner.command.finalize(attempt, current);
    }

    /// Clear the stored result
    pub fn reset(&self) {
        *self.inner.result.lock() = Output::None;
    }

    /// Check if two handles share the same command
    pub fn ptr_eq(&self, other: &CommandHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<Command> for CommandHandle {
    fn from(command: Command) -> Self {
        CommandHandle::new(command)
    }
}

impl fmt::Debug for CommandHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHandle")
            .field("command", &self.inner.command.name())
            .field("table", &self.inner.command.table())
            .field("result", &*self.inner.result.lock())
            .finish()
    }
}

impl fmt::Display for CommandHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner.command, f)
    }
}
