//! ringlog core library
//!
//! A persistent, cross-process circular byte log: a fixed-capacity ring
//! buffer stored in a memory-mapped file, shared by one producer process and
//! one consumer process without a broker.
//!
//! # Key Components
//!
//! - **Ring**: the header layout and the reserve/commit/acquire/release protocol
//! - **Region**: the memory-mapped header, writer and reader views of the file
//! - **Lock**: a named cross-process lock guarding every header access
//!
//! # Example
//!
//! ```no_run
//! use ringlog_core::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let config = RingLogConfig::default().with_capacity(1024 * 1024);
//! let mut log = RingLog::open_with_config("/tmp/ringlog/events.log", &config)?;
//!
//! match log.reserve(512) {
//!     Ok(mut window) => window.fill(0xab),
//!     // Full: back off and retry later.
//!     Err(e) if e.is_retriable() => return Ok(()),
//!     Err(e) => return Err(e),
//! }
//! log.commits(512)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod lock;
pub mod prelude;
pub mod region;
pub mod ring;

// Re-export key types at crate root for convenience
pub use error::{Result, RingLogError, Status};
pub use ring::{RingLog, RingLogConfig, RingStats, Span};
