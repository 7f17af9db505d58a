//! Ring log configuration.

use super::header::MAX_CAPACITY;
use crate::error::{Result, RingLogError};
use std::env;
use std::time::Duration;

/// Default ring capacity: 16 MB.
pub const DEFAULT_CAPACITY: u32 = 16 * 1024 * 1024;

/// Default suffix appended to the data file path to name the lock token.
pub const DEFAULT_LOCK_SUFFIX: &str = ".lck";

/// Configuration for opening a ring log.
#[derive(Debug, Clone)]
pub struct RingLogConfig {
    /// Data capacity in bytes, used only when the file is first initialized.
    pub capacity: u32,
    /// Whether to msync the data and header after every commit.
    ///
    /// When false, commits are visible to every other mapping of the file
    /// immediately but reach stable storage only when the OS writes them back
    /// or the log is closed.
    pub sync_on_commit: bool,
    /// Upper bound on waiting for the cross-process lock.
    ///
    /// `None` blocks until the lock is free.
    pub lock_timeout: Option<Duration>,
    /// Suffix appended to the data path to form the lock token path.
    pub lock_suffix: String,
}

impl Default for RingLogConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            sync_on_commit: false,
            lock_timeout: None,
            lock_suffix: DEFAULT_LOCK_SUFFIX.to_string(),
        }
    }
}

impl RingLogConfig {
    /// Create configuration from environment variables.
    ///
    /// Environment variables:
    /// - `RINGLOG_CAPACITY`: capacity in bytes
    /// - `RINGLOG_SYNC_ON_COMMIT`: "true" or "1" to msync on every commit
    /// - `RINGLOG_LOCK_TIMEOUT_MS`: lock wait bound in milliseconds
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let capacity = env::var("RINGLOG_CAPACITY")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(defaults.capacity);

        let sync_on_commit = env::var("RINGLOG_SYNC_ON_COMMIT")
            .map(|s| s.to_lowercase() == "true" || s == "1")
            .unwrap_or(defaults.sync_on_commit);

        let lock_timeout = env::var("RINGLOG_LOCK_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis);

        Self {
            capacity,
            sync_on_commit,
            lock_timeout,
            lock_suffix: defaults.lock_suffix,
        }
    }

    /// Set the capacity.
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Enable msync on every commit.
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync_on_commit = sync;
        self
    }

    /// Bound the wait for the cross-process lock.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Use a different lock token suffix.
    pub fn with_lock_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.lock_suffix = suffix.into();
        self
    }

    /// Check that the configuration can describe a valid ring.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(RingLogError::Config {
                cause: "capacity must be greater than zero".to_string(),
            });
        }
        if self.capacity > MAX_CAPACITY {
            return Err(RingLogError::Config {
                cause: format!(
                    "capacity {} exceeds maximum of {} bytes",
                    self.capacity, MAX_CAPACITY
                ),
            });
        }
        if self.lock_suffix.is_empty() {
            return Err(RingLogError::Config {
                cause: "lock suffix must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
