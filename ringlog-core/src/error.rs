//! Error types for ringlog.
//!
//! Every failure carries the path of the log it happened on, or the sizes
//! involved, so a message is actionable without a debugger. Transient
//! conditions (`NoFree`, `NoData`, `LockTimeout`) are ordinary `Err` values
//! that callers are expected to retry; see [`RingLogError::is_retriable`].

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for ringlog operations.
#[derive(Error, Debug)]
pub enum RingLogError {
    // =========================================================================
    // Lifecycle Errors (E001-E099)
    // =========================================================================
    /// Failed to create or open the backing file or its lock token.
    #[error("E001: Failed to open ring log at {path}: {cause}")]
    OpenFailed {
        /// The path where opening failed.
        path: PathBuf,
        /// Reason for the failure.
        cause: String,
    },

    /// Failed to memory-map the backing file.
    #[error("E002: Failed to mmap ring log at {path}: {cause}")]
    Mmap {
        /// The path of the backing file.
        path: PathBuf,
        /// Reason for the mmap failure.
        cause: String,
    },

    /// Operation attempted after `close()`.
    #[error("E003: Ring log at {path} is not open")]
    NotOpen {
        /// The path of the closed log.
        path: PathBuf,
    },

    /// Invalid configuration value.
    #[error("E004: Invalid ring log configuration: {cause}")]
    Config {
        /// Description of the configuration error.
        cause: String,
    },

    // =========================================================================
    // Protocol Errors (E100-E199)
    // =========================================================================
    /// Requested block can never fit, whatever the occupancy.
    #[error("E101: Request of {requested} bytes exceeds ring capacity of {capacity} bytes")]
    TooBig {
        /// Number of bytes requested.
        requested: u64,
        /// Total capacity of the ring.
        capacity: u32,
    },

    /// Not enough contiguous free space right now.
    #[error("E102: No free space: requested {requested} bytes, {available} contiguous bytes free")]
    NoFree {
        /// Number of bytes requested.
        requested: u32,
        /// Contiguous bytes free on the side the reservation policy picked.
        available: u32,
    },

    /// No committed data to read.
    #[error("E103: No committed data available")]
    NoData,

    /// Caller supplied more bytes than the handed-out window holds.
    #[error("E104: {len} bytes do not fit in a window of {window} bytes")]
    MoreData {
        /// Number of bytes the caller tried to write.
        len: usize,
        /// Length of the window.
        window: u32,
    },

    // =========================================================================
    // Lock Errors (E200-E299)
    // =========================================================================
    /// Timed out waiting for the cross-process lock.
    #[error("E201: Timed out after {waited_ms}ms waiting for lock {path}")]
    LockTimeout {
        /// The lock token path.
        path: PathBuf,
        /// How long the caller waited.
        waited_ms: u64,
    },

    /// The cross-process lock could not be taken or released.
    #[error("E202: Lock operation failed on {path}: {cause}")]
    Lock {
        /// The lock token path.
        path: PathBuf,
        /// Reason for the failure.
        cause: String,
    },

    // =========================================================================
    // Integrity Errors (E300-E399)
    // =========================================================================
    /// The shared header violates its invariants.
    #[error("E301: Ring header corrupt in {path}: {cause}")]
    Corrupt {
        /// The path of the backing file.
        path: PathBuf,
        /// Description of the violated invariant.
        cause: String,
    },

    // =========================================================================
    // I/O Errors (E900-E999)
    // =========================================================================
    /// Flushing a mapped view or removing a file failed.
    #[error("E901: I/O error on {path}: {cause}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        cause: String,
    },
}

impl RingLogError {
    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::OpenFailed { .. } => "E001",
            Self::Mmap { .. } => "E002",
            Self::NotOpen { .. } => "E003",
            Self::Config { .. } => "E004",
            Self::TooBig { .. } => "E101",
            Self::NoFree { .. } => "E102",
            Self::NoData => "E103",
            Self::MoreData { .. } => "E104",
            Self::LockTimeout { .. } => "E201",
            Self::Lock { .. } => "E202",
            Self::Corrupt { .. } => "E301",
            Self::Io { .. } => "E901",
        }
    }

    /// Check if this error is transient and the call may succeed on retry.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::NoFree { .. } | Self::NoData | Self::LockTimeout { .. }
        )
    }

    /// Check if retrying the same call cannot help.
    ///
    /// Exactly the errors that are not retriable; `TooBig` is the one
    /// producers most need to tell apart from `NoFree`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !self.is_retriable()
    }

    /// Check if this error means the log instance is unusable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::OpenFailed { .. }
                | Self::Mmap { .. }
                | Self::NotOpen { .. }
                | Self::Lock { .. }
                | Self::Corrupt { .. }
        )
    }

    /// Map this error onto the flat status taxonomy.
    #[must_use]
    pub fn status(&self) -> Status {
        Status::from(self)
    }
}

/// Result type alias using `RingLogError`.
pub type Result<T> = std::result::Result<T, RingLogError>;

/// Flat status codes for ring log operations.
///
/// These are the numeric values written by tools that report outcomes as
/// integers (exit codes, C callers). `Success` is zero; failures are negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Status {
    /// Operation completed successfully.
    Success = 0,
    /// Internal error: corrupt header, lock or I/O failure after open.
    Internal = -1,
    /// The log was closed.
    NotOpen = -2,
    /// Request larger than the ring's total capacity.
    TooBig = -3,
    /// No free space right now.
    NoFree = -4,
    /// No data available right now.
    NoData = -5,
    /// More data than the window provides.
    MoreData = -6,
    /// Lock wait timed out.
    Timeout = -7,
    /// Opening or creating the log failed.
    OpenFailed = -8,
}

impl Status {
    /// Raw integer value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Status of a completed call.
    #[must_use]
    pub fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(e) => e.status(),
        }
    }
}

impl From<&RingLogError> for Status {
    fn from(err: &RingLogError) -> Self {
        match err {
            RingLogError::OpenFailed { .. }
            | RingLogError::Mmap { .. }
            | RingLogError::Config { .. } => Self::OpenFailed,
            RingLogError::NotOpen { .. } => Self::NotOpen,
            RingLogError::TooBig { .. } => Self::TooBig,
            RingLogError::NoFree { .. } => Self::NoFree,
            RingLogError::NoData => Self::NoData,
            RingLogError::MoreData { .. } => Self::MoreData,
            RingLogError::LockTimeout { .. } => Self::Timeout,
            RingLogError::Lock { .. } | RingLogError::Corrupt { .. } | RingLogError::Io { .. } => {
                Self::Internal
            }
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::Internal => "internal error",
            Self::NotOpen => "not open",
            Self::TooBig => "too big",
            Self::NoFree => "no free space",
            Self::NoData => "no data",
            Self::MoreData => "more data",
            Self::Timeout => "timeout",
            Self::OpenFailed => "open failed",
        };
        write!(f, "{} ({})", name, self.as_i32())
    }
}
