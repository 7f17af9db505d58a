//! Recv command - drain a ring and verify the block pattern.

use super::{pattern_byte, stream_config, stream_total};
use crate::StreamArgs;
use anyhow::{Context, Result};
use ringlog_core::{RingLog, RingLogError};
use std::thread;
use std::time::{Duration, Instant};

/// Run the recv command.
pub fn run(args: &StreamArgs) -> Result<()> {
    let total = stream_total(args)?;

    let config = stream_config(args);
    let mut log = RingLog::open_with_config(&args.path, &config)
        .with_context(|| format!("Failed to open ring: {}", args.path.display()))?;

    tracing::info!(path = %args.path.display(), total, "Receiving");

    let poll = Duration::from_millis(args.poll_ms);
    let start = Instant::now();
    let mut received = 0u64;

    while received < total {
        let len = match log.acquire() {
            Ok(window) => {
                let remaining = usize::try_from(total - received).unwrap_or(usize::MAX);
                let chunk = &window[..window.len().min(remaining)];
                if let Some((pos, found)) = (received..)
                    .zip(chunk.iter().copied())
                    .find(|(pos, b)| *b != pattern_byte(*pos, args.size))
                {
                    anyhow::bail!(
                        "Data mismatch at byte {}: expected {}, found {}",
                        pos,
                        pattern_byte(pos, args.size),
                        found
                    );
                }
                chunk.len()
            }
            Err(RingLogError::NoData) => {
                thread::sleep(poll);
                continue;
            }
            Err(e) => return Err(e).context("Failed to acquire data"),
        };

        log.release(len).context("Failed to release data")?;
        received += len as u64;
        tracing::trace!(received, total, "Progress");
    }

    log.close().context("Failed to close ring")?;

    tracing::info!(elapsed_ms = start.elapsed().as_millis() as u64, "Receive complete");
    println!(
        "received {} count {} size {} capacity {}",
        received, args.count, args.size, args.capacity
    );
    Ok(())
}
