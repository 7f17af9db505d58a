//! The ring log engine.

use super::config::RingLogConfig;
use super::header::{RingHeader, Span};
use super::window::{ReadWindow, WriteWindow};
use crate::error::{Result, RingLogError};
use crate::lock::NamedLock;
use crate::region::MappedFile;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Snapshot of a ring's occupancy, taken under the lock.
#[derive(Debug, Clone, Serialize)]
pub struct RingStats {
    /// Backing file path.
    pub path: PathBuf,
    /// Usable capacity in bytes.
    pub capacity: u32,
    /// Committed, unreleased bytes.
    pub committed: u32,
    /// Bytes held by the outstanding reservation.
    pub reserved: u32,
    /// Region A.
    pub region_a: Span,
    /// Region B.
    pub region_b: Span,
    /// The outstanding reservation.
    pub reservation: Span,
    /// Free bytes after region A.
    pub free_tail: u32,
    /// Free bytes between region B and region A.
    pub free_head: u32,
}

/// A persistent circular byte log shared between one producer and one
/// consumer process.
///
/// Each process opens its own `RingLog` on the same path. Every operation
/// takes the cross-process lock for its own duration only; windows returned
/// by [`reserve`](Self::reserve) and [`acquire`](Self::acquire) are used
/// without it.
///
/// # Example
///
/// ```no_run
/// use ringlog_core::RingLog;
///
/// # fn main() -> ringlog_core::Result<()> {
/// let mut producer = RingLog::open("/tmp/ringlog/demo.log", 4096)?;
/// let mut window = producer.reserve(5)?;
/// window.put(b"hello")?;
/// producer.commits(5)?;
///
/// let mut consumer = RingLog::open("/tmp/ringlog/demo.log", 4096)?;
/// let len = {
///     let window = consumer.acquire()?;
///     assert_eq!(&window[..], b"hello");
///     window.len()
/// };
/// consumer.release(len)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RingLog {
    path: PathBuf,
    config: RingLogConfig,
    lock: NamedLock,
    mapped: Option<MappedFile>,
}

impl RingLog {
    /// Open or create the ring at `path` with the default configuration.
    ///
    /// `capacity` only takes effect if this is the first open of the file.
    pub fn open(path: impl AsRef<Path>, capacity: u32) -> Result<Self> {
        Self::open_with_config(path, &RingLogConfig::default().with_capacity(capacity))
    }

    /// Open or create the ring at `path`.
    pub fn open_with_config(path: impl AsRef<Path>, config: &RingLogConfig) -> Result<Self> {
        config.validate()?;
        Self::open_inner(path.as_ref(), config, true)
    }

    /// Attach to an existing, initialized ring without creating or resizing it.
    pub fn attach(path: impl AsRef<Path>, config: &RingLogConfig) -> Result<Self> {
        Self::open_inner(path.as_ref(), config, false)
    }

    fn open_inner(path: &Path, config: &RingLogConfig, create: bool) -> Result<Self> {
        let path = path.to_path_buf();

        if create {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| RingLogError::OpenFailed {
                    path: path.clone(),
                    cause: format!("Failed to create directory {}: {}", parent.display(), e),
                })?;
            }
        } else if !path.exists() {
            return Err(RingLogError::OpenFailed {
                path,
                cause: "file does not exist".to_string(),
            });
        }

        let token = NamedLock::token_path(&path, &config.lock_suffix);
        let lock = NamedLock::open(&token, config.lock_timeout).map_err(|e| open_failed(&path, e))?;

        let mapped = {
            let _guard = lock.acquire().map_err(|e| open_failed(&path, e))?;

            let capacity = if create { config.capacity } else { 0 };
            let mut mapped = MappedFile::open(&path, capacity, create)?;

            let mut header = mapped.peek_header()?;
            if !header.is_initialized() {
                if !create {
                    return Err(RingLogError::OpenFailed {
                        path,
                        cause: "ring header was never initialized".to_string(),
                    });
                }
                header = RingHeader::new(config.capacity);
                mapped.store_header(&header)?;
                mapped.flush_header()?;
                tracing::debug!(path = %path.display(), capacity = header.avail, "Initialized ring header");
            } else {
                mapped.load_header()?;
                if create && header.avail != config.capacity {
                    tracing::warn!(
                        path = %path.display(),
                        existing = header.avail,
                        requested = config.capacity,
                        "Attached to ring with a different capacity; keeping existing"
                    );
                }
                tracing::debug!(path = %path.display(), %header, "Attached to ring");
            }

            mapped
        };

        Ok(Self {
            path,
            config: config.clone(),
            lock,
            mapped: Some(mapped),
        })
    }

    /// Delete a ring's data file and lock token.
    ///
    /// Missing files are not an error. Any process still mapping the file
    /// keeps its mapping until it closes.
    pub fn remove(path: impl AsRef<Path>) -> Result<()> {
        Self::remove_with_config(path, &RingLogConfig::default())
    }

    /// Delete a ring's data file and the lock token named by `config`.
    pub fn remove_with_config(path: impl AsRef<Path>, config: &RingLogConfig) -> Result<()> {
        let path = path.as_ref();

        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(RingLogError::Io {
                    path: path.to_path_buf(),
                    cause: format!("Failed to delete ring file: {}", e),
                });
            }
        }
        NamedLock::remove(NamedLock::token_path(path, &config.lock_suffix))?;

        tracing::debug!(path = %path.display(), "Removed ring");
        Ok(())
    }

    /// Get the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `close` has not been called yet.
    pub fn is_open(&self) -> bool {
        self.mapped.is_some()
    }

    /// Claim `size` contiguous bytes for writing.
    ///
    /// Fails with [`RingLogError::TooBig`] when `size` exceeds the capacity
    /// and with the retriable [`RingLogError::NoFree`] when the space is not
    /// free yet. Only one reservation can be outstanding; a second call
    /// before [`commits`](Self::commits) replaces the first.
    pub fn reserve(&mut self, size: usize) -> Result<WriteWindow<'_>> {
        let mapped = self.mapped.as_mut().ok_or_else(|| RingLogError::NotOpen {
            path: self.path.clone(),
        })?;

        let _guard = self.lock.acquire()?;
        let mut header = mapped.load_header()?;

        let size = u32::try_from(size).map_err(|_| RingLogError::TooBig {
            requested: size as u64,
            capacity: header.avail,
        })?;

        if !header.reservation().is_empty() {
            tracing::debug!(previous = %header.reservation(), "Replacing outstanding reservation");
        }

        let span = header.reserve(size).inspect_err(|e| {
            if let RingLogError::TooBig { .. } = e {
                tracing::warn!(path = %self.path.display(), requested = size, capacity = header.avail, "Reservation can never fit");
            }
        })?;
        mapped.store_header(&header)?;
        if self.config.sync_on_commit {
            mapped.flush_header()?;
        }

        tracing::trace!(%span, %header, "Reserved");

        let buf = mapped.data_mut(span)?;
        Ok(WriteWindow::new(buf, span))
    }

    /// Finalize the outstanding reservation with `size` bytes.
    ///
    /// `size == 0` cancels the reservation. Sizes above the reservation are
    /// clamped to it.
    pub fn commits(&mut self, size: usize) -> Result<()> {
        let mapped = self.mapped.as_mut().ok_or_else(|| RingLogError::NotOpen {
            path: self.path.clone(),
        })?;

        let _guard = self.lock.acquire()?;
        let mut header = mapped.load_header()?;

        let reservation = header.reservation();
        let size = u32::try_from(size).unwrap_or(u32::MAX);
        let outcome = header.commit(size);

        if self.config.sync_on_commit {
            mapped.flush_data(Span::new(reservation.offset, size.min(reservation.len)))?;
        }
        mapped.store_header(&header)?;
        if self.config.sync_on_commit {
            mapped.flush_header()?;
        }

        tracing::trace!(?outcome, %header, "Committed");
        Ok(())
    }

    /// Borrow the oldest committed bytes (region A) for reading.
    ///
    /// Fails with the retriable [`RingLogError::NoData`] when nothing is
    /// committed.
    pub fn acquire(&self) -> Result<ReadWindow<'_>> {
        let mapped = self.mapped()?;

        let _guard = self.lock.acquire()?;
        let header = mapped.load_header()?;

        let span = header.acquire().ok_or(RingLogError::NoData)?;
        tracing::trace!(%span, "Acquired");

        Ok(ReadWindow::new(mapped.data(span)?, span))
    }

    /// Mark `size` bytes at the front of region A as consumed.
    pub fn release(&mut self, size: usize) -> Result<()> {
        let mapped = self.mapped.as_mut().ok_or_else(|| RingLogError::NotOpen {
            path: self.path.clone(),
        })?;

        let _guard = self.lock.acquire()?;
        let mut header = mapped.load_header()?;

        let size = u32::try_from(size).unwrap_or(u32::MAX);
        let promoted = header.release(size);
        mapped.store_header(&header)?;
        if self.config.sync_on_commit {
            mapped.flush_header()?;
        }

        tracing::trace!(size, promoted, %header, "Released");
        Ok(())
    }

    /// Discard all data and any reservation. The capacity is kept.
    pub fn reset(&mut self) -> Result<()> {
        let mapped = self.mapped.as_mut().ok_or_else(|| RingLogError::NotOpen {
            path: self.path.clone(),
        })?;

        let _guard = self.lock.acquire()?;
        let mut header = mapped.load_header()?;
        header.reset();
        mapped.store_header(&header)?;
        mapped.flush_header()?;

        tracing::debug!(path = %self.path.display(), capacity = header.avail, "Reset ring");
        Ok(())
    }

    /// Flush all views and release the file. Safe to call more than once.
    pub fn close(&mut self) -> Result<()> {
        let Some(mapped) = self.mapped.take() else {
            return Ok(());
        };

        let _guard = self.lock.acquire()?;
        mapped.flush_all()?;
        drop(mapped);

        tracing::debug!(path = %self.path.display(), "Closed ring");
        Ok(())
    }

    /// Committed, unreleased bytes in both regions.
    pub fn commited_size(&self) -> Result<usize> {
        let mapped = self.mapped()?;

        let _guard = self.lock.acquire()?;
        Ok(mapped.load_header()?.committed() as usize)
    }

    /// Size of the outstanding reservation.
    ///
    /// Read without the lock; advisory only. Zero once closed.
    pub fn reserved_size(&self) -> usize {
        self.peek().map(|h| h.len_r as usize).unwrap_or(0)
    }

    /// Total capacity of the ring.
    ///
    /// Read without the lock; advisory only. Zero once closed.
    pub fn capacity_size(&self) -> usize {
        self.peek().map(|h| h.avail as usize).unwrap_or(0)
    }

    /// Full occupancy snapshot, taken under the lock.
    pub fn stats(&self) -> Result<RingStats> {
        let mapped = self.mapped()?;

        let _guard = self.lock.acquire()?;
        let header = mapped.load_header()?;

        Ok(RingStats {
            path: self.path.clone(),
            capacity: header.avail,
            committed: header.committed(),
            reserved: header.len_r,
            region_a: header.region_a(),
            region_b: header.region_b(),
            reservation: header.reservation(),
            free_tail: header.free_tail(),
            free_head: header.free_head(),
        })
    }

    /// Snapshot of the raw header, taken under the lock.
    pub fn header(&self) -> Result<RingHeader> {
        let mapped = self.mapped()?;

        let _guard = self.lock.acquire()?;
        mapped.load_header()
    }

    fn mapped(&self) -> Result<&MappedFile> {
        self.mapped.as_ref().ok_or_else(|| RingLogError::NotOpen {
            path: self.path.clone(),
        })
    }

    fn peek(&self) -> Option<RingHeader> {
        self.mapped.as_ref().and_then(|m| m.peek_header().ok())
    }
}

impl Drop for RingLog {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to close ring on drop");
        }
    }
}

fn open_failed(path: &Path, e: RingLogError) -> RingLogError {
    match e {
        RingLogError::LockTimeout { .. } => e,
        other => RingLogError::OpenFailed {
            path: path.to_path_buf(),
            cause: other.to_string(),
        },
    }
}
