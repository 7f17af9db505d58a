//! Memory-mapped circular byte log.
//!
//! One producer and one consumer, each in its own process, exchange byte
//! blocks through a file that both map. The file starts with a fixed header
//! holding all bookkeeping, followed by the data segment:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ Header: crc32 avail idx_a len_a idx_b len_b idx_r len_r (int32) │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ Data segment (avail bytes, no framing)                          │
//! │                                                                 │
//! │   [ B: wrapped run ]  free  [ A: oldest run ]  free             │
//! │   0                         idx_a                     avail     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol
//!
//! - Producer: `reserve(n)` → write into the window → `commits(n)`.
//!   `commits(0)` cancels.
//! - Consumer: `acquire()` → read region A → `release(n)`.
//!
//! Bytes are never moved. When the space after A becomes tighter than the
//! space already consumed before it, new reservations wrap to offset 0 and
//! collect in region B. Once the consumer has released all of A, B is
//! relabelled as A.
//!
//! # Concurrency
//!
//! Every call takes the named lock for its own duration. Exactly one
//! producer and one consumer may use a ring at a time; a second producer
//! would overwrite the single reservation slot.

mod config;
mod header;
mod log;
mod window;

pub use config::{DEFAULT_CAPACITY, DEFAULT_LOCK_SUFFIX, RingLogConfig};
pub use header::{CommitOutcome, HEADER_SIZE, MAX_CAPACITY, RingHeader, Span};
pub use log::{RingLog, RingStats};
pub use window::{ReadWindow, WriteWindow};
