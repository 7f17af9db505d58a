//! Prelude for convenient imports.
//!
//! # Example
//!
//! ```ignore
//! use ringlog_core::prelude::*;
//! ```

pub use crate::error::{Result, RingLogError, Status};
pub use crate::ring::{ReadWindow, RingLog, RingLogConfig, RingStats, Span, WriteWindow};
