//! Remove command - delete a ring file and its lock token.

use anyhow::{Context, Result};
use ringlog_core::{RingLog, RingLogConfig};
use std::path::Path;

/// Run the remove command.
pub fn run(path: &Path) -> Result<()> {
    RingLog::remove_with_config(path, &RingLogConfig::from_env())
        .with_context(|| format!("Failed to remove ring: {}", path.display()))?;

    tracing::info!(path = %path.display(), "Removed");
    Ok(())
}
