//! API configuration via `ovstxn.toml`
//!
//! The file carries the defaults every transaction starts from: the commit
//! timeout, whether failures are raised, and whether they are reported.
//! Individual transactions override them through
//! [`TransactionOptions`](crate::TransactionOptions).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use ovstxn_core::{Error, Result};

use crate::transaction::TransactionOptions;

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "ovstxn.toml";

/// Name of the commit worker thread unless configured otherwise.
pub const DEFAULT_WORKER_THREAD_NAME: &str = "ovstxn-commit";

/// API configuration loaded from `ovstxn.toml`.
///
/// # Example
///
/// ```toml
/// timeout_secs = 180
/// check_error = false
/// log_errors = true
/// worker_thread_name = "ovstxn-commit"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Default transaction timeout in seconds. Bounds both the retry loop and
    /// the caller's wait for the commit worker.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Raise command and commit failures to the caller by default.
    #[serde(default)]
    pub check_error: bool,
    /// Report failures through the transaction observer by default.
    #[serde(default = "default_log_errors")]
    pub log_errors: bool,
    /// Name of the commit worker thread.
    #[serde(default = "default_worker_thread_name")]
    pub worker_thread_name: String,
}

fn default_timeout_secs() -> u64 {
    180
}

fn default_log_errors() -> bool {
    true
}

fn default_worker_thread_name() -> String {
    DEFAULT_WORKER_THREAD_NAME.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            check_error: false,
            log_errors: default_log_errors(),
            worker_thread_name: default_worker_thread_name(),
        }
    }
}

impl ApiConfig {
    /// Default transaction timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Options a new transaction starts with
    pub fn transaction_options(&self) -> TransactionOptions {
        TransactionOptions::new()
            .with_timeout(self.timeout())
            .with_check_error(self.check_error)
            .with_log_errors(self.log_errors)
    }

    /// Check the values.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for a zero timeout or an empty thread name.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(Error::Config {
                reason: "timeout_secs must be greater than zero".to_string(),
            });
        }
        if self.worker_thread_name.trim().is_empty() {
            return Err(Error::Config {
                reason: "worker_thread_name must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# ovstxn configuration
#
# Default transaction timeout in seconds. A commit that keeps getting
# TRY_AGAIN past this budget fails, and a caller stops waiting for the
# commit worker after this long.
timeout_secs = 180

# Raise command and commit failures to the caller (default: false).
# With false, a failed commit returns no result, matching ovs-vsctl.
check_error = false

# Report failures through the transaction observer (default: true).
log_errors = true

# Name of the thread that owns the database connection.
worker_thread_name = "ovstxn-commit"
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            reason: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;
        let config: ApiConfig = toml::from_str(&content).map_err(|e| Error::Config {
            reason: format!("Failed to parse config file '{}': {}", path.display(), e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| Error::Config {
                reason: format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ),
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::internal(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| Error::Config {
            reason: format!("Failed to write config file '{}': {}", path.display(), e),
        })
    }
}
