//! Reset command - discard all data in a ring.

use anyhow::{Context, Result};
use ringlog_core::{RingLog, RingLogConfig};
use std::path::Path;

/// Run the reset command.
pub fn run(path: &Path) -> Result<()> {
    let mut log = RingLog::attach(path, &RingLogConfig::from_env())
        .with_context(|| format!("Failed to attach to ring: {}", path.display()))?;
    log.reset().context("Failed to reset ring")?;
    log.close().context("Failed to close ring")?;

    println!("reset {}", path.display());
    Ok(())
}
