//! The commit worker thread.
//!
//! One dedicated thread owns the database [`Connection`] and runs commit
//! jobs strictly one at a time in submission order. Callers never touch the
//! connection; they hand the worker a job and wait for its result.

use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error};

use ovstxn_core::{Connection, Error, Result};

/// Work run on the commit worker with exclusive use of the connection.
pub type Job = Box<dyn FnOnce(&mut dyn Connection) + Send>;

/// Worker metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    /// Number of jobs waiting in the queue.
    pub queue_depth: usize,
    /// Whether a job is executing right now.
    pub busy: bool,
    /// Total number of jobs finished since start, panicked ones included.
    pub jobs_completed: u64,
    /// Whether the worker still accepts jobs.
    pub running: bool,
}

struct WorkerInner {
    queue: Mutex<VecDeque<Job>>,
    work_ready: Condvar,
    drain_cond: Condvar,
    shutdown: AtomicBool,
    active_jobs: AtomicUsize,
    jobs_completed: AtomicU64,
}

/// Single-threaded FIFO executor owning the database connection.
pub struct CommitWorker {
    inner: Arc<WorkerInner>,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_name: String,
}

impl CommitWorker {
    /// Spawn the worker thread, moving `connection` onto it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if the thread cannot be spawned.
    pub fn start(connection: Box<dyn Connection>, thread_name: impl Into<String>) -> Result<Self> {
        let thread_name = thread_name.into();
        let inner = Arc::new(WorkerInner {
            queue: Mutex::new(VecDeque::new()),
            work_ready: Condvar::new(),
            drain_cond: Condvar::new(),
            shutdown: AtomicBool::new(false),
            active_jobs: AtomicUsize::new(0),
            jobs_completed: AtomicU64::new(0),
        });

        let inner_clone = Arc::clone(&inner);
        let handle = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || worker_loop(&inner_clone, connection))
            .map_err(|e| {
                Error::internal(format!(
                    "failed to spawn commit worker '{}': {}",
                    thread_name, e
                ))
            })?;
        debug!(target: "ovstxn::worker", thread = %thread_name, "Commit worker started");

        Ok(Self {
            inner,
            handle: Mutex::new(Some(handle)),
            thread_name,
        })
    }

    /// Name of the worker thread
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Queue a job behind every job submitted before it.
    ///
    /// # Errors
    ///
    /// Returns `Error::WorkerStopped` after [`shutdown`](Self::shutdown).
    pub fn submit(&self, job: impl FnOnce(&mut dyn Connection) + Send + 'static) -> Result<()> {
        {
            let mut queue = self.inner.queue.lock();
            // Checked under the lock so a job is never queued behind the
            // worker's final empty-queue check.
            if self.inner.shutdown.load(Ordering::Acquire) {
                return Err(Error::WorkerStopped);
            }
            queue.push_back(Box::new(job));
        }
        self.inner.work_ready.notify_one();
        Ok(())
    }

    /// Block until every queued and in-flight job has finished.
    pub fn drain(&self) {
        let mut queue = self.inner.queue.lock();
        while !queue.is_empty() || self.inner.active_jobs.load(Ordering::Acquire) > 0 {
            self.inner.drain_cond.wait(&mut queue);
        }
    }

    /// Stop accepting jobs, run what is queued, then join the thread.
    ///
    /// Idempotent.
    pub fn shutdown(&self) {
        {
            let _queue = self.inner.queue.lock();
            self.inner.shutdown.store(true, Ordering::Release);
            self.inner.work_ready.notify_all();
        }

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!(target: "ovstxn::worker", thread = %self.thread_name, "Commit worker exited by panic");
            }
            debug!(target: "ovstxn::worker", thread = %self.thread_name, "Commit worker stopped");
        }
    }

    /// Whether the worker still accepts jobs
    pub fn is_running(&self) -> bool {
        !self.inner.shutdown.load(Ordering::Acquire)
    }

    /// Return a snapshot of worker metrics.
    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            queue_depth: self.inner.queue.lock().len(),
            busy: self.inner.active_jobs.load(Ordering::Relaxed) > 0,
            jobs_completed: self.inner.jobs_completed.load(Ordering::Relaxed),
            running: self.is_running(),
        }
    }
}

impl Drop for CommitWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Decrements `active_jobs` and wakes drain waiters, panic or not.
struct ActiveJobGuard<'a> {
    inner: &'a WorkerInner,
}

impl Drop for ActiveJobGuard<'_> {
    fn drop(&mut self) {
        self.inner.jobs_completed.fetch_add(1, Ordering::Relaxed);
        self.inner.active_jobs.fetch_sub(1, Ordering::Release);
        let _queue = self.inner.queue.lock();
        self.inner.drain_cond.notify_all();
    }
}

fn worker_loop(inner: &WorkerInner, mut connection: Box<dyn Connection>) {
    loop {
        let job = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(job) = queue.pop_front() {
                    inner.active_jobs.fetch_add(1, Ordering::Release);
                    break job;
                }
                if inner.shutdown.load(Ordering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        let _guard = ActiveJobGuard { inner };

        // Jobs catch their own panics; this keeps the thread alive if one
        // slips through.
        let conn = connection.as_mut();
        if let Err(payload) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| job(conn))) {
            error!(
                target: "ovstxn::worker",
                "commit job panicked: {}",
                panic_message(payload.as_ref())
            );
        }
    }
}

/// Text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "(non-string panic)".to_string()
    }
}
