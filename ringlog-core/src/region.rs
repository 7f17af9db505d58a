//! Memory-mapped views of a ring file.
//!
//! One file, three independent mappings:
//!
//! ```text
//! ┌──────────────────────────────┐ offset 0
//! │ Header (32 bytes)            │ <- header view (read/write)
//! ├──────────────────────────────┤ offset 32
//! │ Data segment                 │ <- writer view (read/write)
//! │                              │ <- reader view (read-only)
//! └──────────────────────────────┘ offset 32 + data_len
//! ```
//!
//! All mappings are shared, so a store through any of them is visible to
//! every other mapping of the same file, in this process or another, without
//! a flush. `flush_*` only matters for durability.

use crate::error::{Result, RingLogError};
use crate::ring::{HEADER_SIZE, RingHeader, Span};
use memmap2::{Mmap, MmapMut, MmapOptions};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// The backing file of a ring log and its three views.
#[derive(Debug)]
pub struct MappedFile {
    header: MmapMut,
    writer: MmapMut,
    reader: Mmap,
    // Keeps the descriptor alive for the lifetime of the mappings.
    _file: File,
    path: PathBuf,
    data_len: usize,
}

impl MappedFile {
    /// Open the file at `path`, sizing it for at least `capacity` data bytes.
    ///
    /// The file is grown when shorter than `HEADER_SIZE + capacity` and never
    /// shrunk, so attaching with a smaller capacity cannot cut off data
    /// another process still owns. With `create == false` a missing file is
    /// an error and the file is not resized.
    pub fn open(path: impl AsRef<Path>, capacity: u32, create: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(create)
            .truncate(false)
            .open(&path)
            .map_err(|e| RingLogError::OpenFailed {
                path: path.clone(),
                cause: e.to_string(),
            })?;

        let current = file
            .metadata()
            .map_err(|e| RingLogError::OpenFailed {
                path: path.clone(),
                cause: e.to_string(),
            })?
            .len();

        let wanted = (HEADER_SIZE as u64) + capacity as u64;
        let file_len = if create && current < wanted {
            file.set_len(wanted).map_err(|e| RingLogError::OpenFailed {
                path: path.clone(),
                cause: format!("Failed to size file to {} bytes: {}", wanted, e),
            })?;
            wanted
        } else {
            current
        };

        if file_len <= HEADER_SIZE as u64 {
            return Err(RingLogError::OpenFailed {
                path,
                cause: format!("file is {} bytes, too small for a ring", file_len),
            });
        }

        let data_len = usize::try_from(file_len - HEADER_SIZE as u64).map_err(|_| {
            RingLogError::OpenFailed {
                path: path.clone(),
                cause: format!("file of {} bytes does not fit in memory", file_len),
            }
        })?;

        let header = unsafe {
            MmapOptions::new()
                .len(HEADER_SIZE)
                .map_mut(&file)
                .map_err(|e| mmap_error(&path, "header", e))?
        };

        let writer = unsafe {
            MmapOptions::new()
                .offset(HEADER_SIZE as u64)
                .len(data_len)
                .map_mut(&file)
                .map_err(|e| mmap_error(&path, "writer", e))?
        };

        let reader = unsafe {
            MmapOptions::new()
                .offset(HEADER_SIZE as u64)
                .len(data_len)
                .map(&file)
                .map_err(|e| mmap_error(&path, "reader", e))?
        };

        tracing::debug!(path = %path.display(), file_len, data_len, "Mapped ring file");

        Ok(Self {
            header,
            writer,
            reader,
            _file: file,
            path,
            data_len,
        })
    }

    /// Size of the mapped data segment.
    pub fn data_len(&self) -> usize {
        self.data_len
    }

    /// Parse the header without checking invariants.
    ///
    /// Used for first-open detection and for the unlocked statistics reads.
    pub fn peek_header(&self) -> Result<RingHeader> {
        RingHeader::from_bytes(&self.header).map_err(|e| RingLogError::Corrupt {
            path: self.path.clone(),
            cause: e.to_string(),
        })
    }

    /// Parse the header and check it against the mapped data segment.
    pub fn load_header(&self) -> Result<RingHeader> {
        let header = self.peek_header()?;
        header
            .validate(self.data_len)
            .map_err(|cause| RingLogError::Corrupt {
                path: self.path.clone(),
                cause,
            })?;
        Ok(header)
    }

    /// Write the header into the shared mapping.
    pub fn store_header(&mut self, header: &RingHeader) -> Result<()> {
        header
            .write_to(&mut self.header)
            .map_err(|e| RingLogError::Io {
                path: self.path.clone(),
                cause: e.to_string(),
            })
    }

    /// Writable slice of the data segment.
    pub fn data_mut(&mut self, span: Span) -> Result<&mut [u8]> {
        let range = span.range();
        let len = self.data_len;
        self.writer
            .get_mut(range)
            .ok_or_else(|| out_of_bounds(&self.path, span, len))
    }

    /// Read-only slice of the data segment.
    pub fn data(&self, span: Span) -> Result<&[u8]> {
        self.reader
            .get(span.range())
            .ok_or_else(|| out_of_bounds(&self.path, span, self.data_len))
    }

    /// Flush the header view to disk.
    pub fn flush_header(&self) -> Result<()> {
        self.header.flush().map_err(|e| self.io_error("header", e))
    }

    /// Flush a range of the writer view to disk.
    pub fn flush_data(&self, span: Span) -> Result<()> {
        if span.is_empty() {
            return Ok(());
        }
        self.writer
            .flush_range(span.offset as usize, span.len as usize)
            .map_err(|e| self.io_error("data", e))
    }

    /// Flush every view.
    pub fn flush_all(&self) -> Result<()> {
        self.header.flush().map_err(|e| self.io_error("header", e))?;
        self.writer.flush().map_err(|e| self.io_error("data", e))
    }

    fn io_error(&self, view: &str, e: std::io::Error) -> RingLogError {
        RingLogError::Io {
            path: self.path.clone(),
            cause: format!("Failed to flush {} view: {}", view, e),
        }
    }
}

fn mmap_error(path: &Path, view: &str, e: std::io::Error) -> RingLogError {
    RingLogError::Mmap {
        path: path.to_path_buf(),
        cause: format!("{} view: {}", view, e),
    }
}

fn out_of_bounds(path: &Path, span: Span, data_len: usize) -> RingLogError {
    RingLogError::Corrupt {
        path: path.to_path_buf(),
        cause: format!("span {} outside data segment of {} bytes", span, data_len),
    }
}
