//! Named cross-process lock.
//!
//! The lock is an advisory exclusive `flock` on a small token file that sits
//! next to the data file. Any process that opens the same token path
//! participates; the token never holds data.

use crate::error::{Result, RingLogError};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Sleep between `try_lock` attempts when a timeout is configured.
const LOCK_POLL_INTERVAL: Duration = Duration::from_micros(200);

/// A cross-process mutex identified by a file path.
#[derive(Debug)]
pub struct NamedLock {
    file: File,
    path: PathBuf,
    timeout: Option<Duration>,
}

impl NamedLock {
    /// Open (creating if needed) the lock token at `path`.
    pub fn open(path: impl AsRef<Path>, timeout: Option<Duration>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| RingLogError::Lock {
                path: path.clone(),
                cause: format!("Failed to open lock token: {}", e),
            })?;

        Ok(Self {
            file,
            path,
            timeout,
        })
    }

    /// Path of the lock token for a data file.
    pub fn token_path(data_path: impl AsRef<Path>, suffix: &str) -> PathBuf {
        let mut token = data_path.as_ref().as_os_str().to_os_string();
        token.push(suffix);
        PathBuf::from(token)
    }

    /// Take the lock, waiting up to the configured timeout.
    pub fn acquire(&self) -> Result<LockGuard<'_>> {
        let Some(timeout) = self.timeout else {
            self.file.lock_exclusive().map_err(|e| RingLogError::Lock {
                path: self.path.clone(),
                cause: e.to_string(),
            })?;
            return Ok(LockGuard { lock: self });
        };

        let start = Instant::now();
        loop {
            if let Some(guard) = self.try_acquire()? {
                return Ok(guard);
            }
            let waited = start.elapsed();
            if waited >= timeout {
                tracing::warn!(path = %self.path.display(), waited_ms = waited.as_millis() as u64, "Lock wait timed out");
                return Err(RingLogError::LockTimeout {
                    path: self.path.clone(),
                    waited_ms: waited.as_millis() as u64,
                });
            }
            thread::sleep(LOCK_POLL_INTERVAL);
        }
    }

    /// Take the lock if it is free right now.
    pub fn try_acquire(&self) -> Result<Option<LockGuard<'_>>> {
        match self.file.try_lock_exclusive() {
            Ok(()) => Ok(Some(LockGuard { lock: self })),
            Err(e) if is_contended(&e) => Ok(None),
            Err(e) => Err(RingLogError::Lock {
                path: self.path.clone(),
                cause: e.to_string(),
            }),
        }
    }

    /// Delete a lock token. Missing tokens are not an error.
    pub fn remove(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RingLogError::Io {
                path: path.to_path_buf(),
                cause: format!("Failed to delete lock token: {}", e),
            }),
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Scoped ownership of a [`NamedLock`]; unlocks on drop.
#[derive(Debug)]
pub struct LockGuard<'a> {
    lock: &'a NamedLock,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = fs2::FileExt::unlock(&self.lock.file) {
            tracing::warn!(path = %self.lock.path.display(), error = %e, "Failed to release lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn token_path_appends_suffix() {
        let token = NamedLock::token_path("/tmp/ring/test.log", ".lck");
        assert_eq!(token, PathBuf::from("/tmp/ring/test.log.lck"));
    }

    #[test]
    fn second_handle_is_excluded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ring.lck");

        let first = NamedLock::open(&path, None).unwrap();
        let second = NamedLock::open(&path, None).unwrap();

        let guard = first.acquire().unwrap();
        assert!(second.try_acquire().unwrap().is_none());

        drop(guard);
        assert!(second.try_acquire().unwrap().is_some());
    }

    #[test]
    fn acquire_times_out_while_held() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ring.lck");

        let holder = NamedLock::open(&path, None).unwrap();
        let waiter = NamedLock::open(&path, Some(Duration::from_millis(20))).unwrap();

        let _guard = holder.acquire().unwrap();
        let err = waiter.acquire().unwrap_err();
        assert!(matches!(err, RingLogError::LockTimeout { .. }));
        assert!(err.is_retriable());
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ring.lck");

        let lock = NamedLock::open(&path, None).unwrap();
        drop(lock);
        assert!(path.exists());

        NamedLock::remove(&path).unwrap();
        assert!(!path.exists());
        NamedLock::remove(&path).unwrap();
    }
}
