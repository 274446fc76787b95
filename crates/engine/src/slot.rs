//! One-shot result slot between a caller and the commit worker.
//!
//! The caller waits with a deadline; the worker posts exactly once. If the
//! caller gives up first, the slot remembers it and the later post is
//! dropped, so the worker can tell that nobody will read the result.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct SlotState<T> {
    value: Option<T>,
    posted: bool,
    abandoned: bool,
}

struct SlotInner<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

/// A single-use handoff of one value.
///
/// Clones share the slot; one side posts, the other waits.
pub struct ResultSlot<T> {
    inner: Arc<SlotInner<T>>,
}

impl<T> Clone for ResultSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResultSlot<T> {
    /// Create an empty slot
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SlotInner {
                state: Mutex::new(SlotState {
                    value: None,
                    posted: false,
                    abandoned: false,
                }),
                ready: Condvar::new(),
            }),
        }
    }

    /// Post the value.
    ///
    /// Returns false if the value was dropped: the waiter already gave up,
    /// or something was posted before.
    pub fn post(&self, value: T) -> bool {
        let mut state = self.inner.state.lock();
        if state.posted {
            return false;
        }
        state.posted = true;
        if state.abandoned {
            return false;
        }
        state.value = Some(value);
        self.inner.ready.notify_all();
        true
    }

    /// Wait up to `timeout` for the value.
    ///
    /// On `None` the slot is abandoned and any later post is dropped.
    pub fn wait(&self, timeout: Duration) -> Option<T> {
        let mut state = self.inner.state.lock();
        if let Some(deadline) = Instant::now().checked_add(timeout) {
            while state.value.is_none() && !state.abandoned {
                if self.inner.ready.wait_until(&mut state, deadline).timed_out() {
                    break;
                }
            }
        } else {
            while state.value.is_none() && !state.abandoned {
                self.inner.ready.wait(&mut state);
            }
        }
        let value = state.value.take();
        if value.is_none() {
            state.abandoned = true;
        }
        value
    }

    /// Check if the waiter gave up
    pub fn is_abandoned(&self) -> bool {
        self.inner.state.lock().abandoned
    }
}
