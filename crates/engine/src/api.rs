//! Entry point tying a connection, the commit worker and config together.

use std::sync::Arc;
use tracing::info;

use ovstxn_core::{Connection, Result};
use ovstxn_executor::{Command, CommandHandle, Output};

use crate::config::ApiConfig;
use crate::observer::{NoopObserver, Observer};
use crate::transaction::{Transaction, TransactionOptions};
use crate::worker::{CommitWorker, WorkerStats};

/// Transaction API over one database connection.
///
/// The connection moves onto a dedicated commit worker at construction.
/// `Api` can be shared across threads; every transaction it creates commits
/// through the same worker, in submission order.
pub struct Api {
    worker: Arc<CommitWorker>,
    config: ApiConfig,
    observer: Arc<dyn Observer>,
}

impl Api {
    /// Validate `config` and start the commit worker on `connection`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an invalid config and `Error::Internal`
    /// if the worker thread cannot be spawned.
    pub fn new(connection: impl Connection + 'static, config: ApiConfig) -> Result<Self> {
        config.validate()?;
        let worker = CommitWorker::start(Box::new(connection), config.worker_thread_name.clone())?;
        info!(
            target: "ovstxn::worker",
            thread = %config.worker_thread_name,
            timeout_secs = config.timeout_secs,
            "Transaction API started"
        );
        Ok(Self {
            worker: Arc::new(worker),
            config,
            observer: Arc::new(NoopObserver),
        })
    }

    /// Observer handed to every transaction created afterwards
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Options new transactions start with
    pub fn default_options(&self) -> TransactionOptions {
        self.config.transaction_options()
    }

    /// Start a transaction with the configured defaults.
    pub fn transaction(&self) -> Transaction {
        self.transaction_with(self.default_options())
    }

    /// Start a transaction with explicit options.
    pub fn transaction_with(&self, options: TransactionOptions) -> Transaction {
        Transaction::new(Arc::clone(&self.worker), options)
            .with_observer(Arc::clone(&self.observer))
    }

    /// Commit worker metrics
    pub fn worker_stats(&self) -> WorkerStats {
        self.worker.stats()
    }

    /// Stop the commit worker after it finishes queued transactions.
    ///
    /// Later commits fail with `Error::WorkerStopped`.
    pub fn shutdown(&self) {
        self.worker.shutdown();
    }
}

/// Run a single command as its own transaction.
pub trait CommandExt {
    /// Commit this command alone and return its result.
    ///
    /// `check_error` and `log_errors` override the API defaults; the
    /// timeout comes from the API config. Every failure, timeouts and a
    /// stopped worker included, is reported to the API's observer when
    /// `log_errors` is set and returned only when `check_error` is set;
    /// otherwise the result is `Ok(None)`.
    fn execute(self, api: &Api, check_error: bool, log_errors: bool) -> Result<Option<Output>>;
}

impl CommandExt for CommandHandle {
    fn execute(self, api: &Api, check_error: bool, log_errors: bool) -> Result<Option<Output>> {
        let options = api
            .default_options()
            .with_check_error(check_error)
            .with_log_errors(log_errors);
        let mut txn = api.transaction_with(options);
        txn.add(self.clone());
        match txn.commit() {
            Ok(results) => Ok(results.and_then(|results| results.into_iter().next())),
            Err(error) => {
                if log_errors {
                    api.observer.execute_failed(self.command(), &error);
                }
                if check_error {
                    Err(error)
                } else {
                    Ok(None)
                }
            }
        }
    }
}

impl CommandExt for Command {
    fn execute(self, api: &Api, check_error: bool, log_errors: bool) -> Result<Option<Output>> {
        CommandHandle::new(self).execute(api, check_error, log_errors)
    }
}
