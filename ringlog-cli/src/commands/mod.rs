//! CLI command implementations.

pub mod inspect;
pub mod recv;
pub mod remove;
pub mod reset;
pub mod send;

use crate::StreamArgs;
use anyhow::Result;
use ringlog_core::RingLogConfig;

/// Byte expected at stream position `pos` when blocks of `size` bytes are
/// filled with their index.
pub fn pattern_byte(pos: u64, size: usize) -> u8 {
    ((pos / size as u64) % 251) as u8
}

/// Total bytes a stream of `count` blocks of `size` bytes carries.
pub fn stream_total(args: &StreamArgs) -> Result<u64> {
    anyhow::ensure!(args.size > 0, "Block size must be greater than zero");
    match args.count.checked_mul(args.size as u64) {
        Some(total) => Ok(total),
        None => anyhow::bail!(
            "Stream of {} blocks of {} bytes overflows a 64-bit byte count",
            args.count,
            args.size
        ),
    }
}

/// Configuration for a stream command: environment first, then flags.
pub fn stream_config(args: &StreamArgs) -> RingLogConfig {
    RingLogConfig::from_env().with_capacity(args.capacity)
}
