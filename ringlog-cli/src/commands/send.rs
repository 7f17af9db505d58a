//! Send command - write fixed-size blocks into a ring.

use super::{pattern_byte, stream_config, stream_total};
use crate::StreamArgs;
use anyhow::{Context, Result};
use ringlog_core::RingLog;
use std::thread;
use std::time::{Duration, Instant};

/// Run the send command.
pub fn run(args: &StreamArgs) -> Result<()> {
    let total = stream_total(args)?;

    let config = stream_config(args);
    let mut log = RingLog::open_with_config(&args.path, &config)
        .with_context(|| format!("Failed to open ring: {}", args.path.display()))?;

    tracing::info!(path = %args.path.display(), count = args.count, size = args.size, "Sending");

    let poll = Duration::from_millis(args.poll_ms);
    let start = Instant::now();
    let mut retries = 0u64;

    for block in 0..args.count {
        loop {
            match log.reserve(args.size) {
                Ok(mut window) => {
                    window.fill(pattern_byte(block * args.size as u64, args.size));
                    break;
                }
                Err(e) if e.is_terminal() => {
                    return Err(e)
                        .with_context(|| format!("Failed to reserve block {}", block));
                }
                Err(_) => {
                    retries += 1;
                    thread::sleep(poll);
                }
            }
        }
        log.commits(args.size)
            .with_context(|| format!("Failed to commit block {}", block))?;
    }

    log.close().context("Failed to close ring")?;

    tracing::info!(elapsed_ms = start.elapsed().as_millis() as u64, retries, "Send complete");
    println!(
        "sent {} count {} size {} capacity {}",
        total,
        args.count,
        args.size,
        args.capacity
    );
    Ok(())
}
