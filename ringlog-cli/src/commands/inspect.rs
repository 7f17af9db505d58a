//! Inspect command - print the occupancy of an existing ring.

use anyhow::{Context, Result};
use ringlog_core::{RingLog, RingLogConfig};
use std::path::Path;

/// Run the inspect command.
pub fn run(path: &Path, json: bool) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("Ring file not found: {}", path.display());
    }

    let log = RingLog::attach(path, &RingLogConfig::from_env())
        .with_context(|| format!("Failed to attach to ring: {}", path.display()))?;
    let stats = log.stats().context("Failed to read ring header")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Ring Information");
    println!("================");
    println!("Path:        {}", stats.path.display());
    println!("Capacity:    {} bytes", stats.capacity);
    println!("Committed:   {} bytes", stats.committed);
    println!("Reserved:    {} bytes", stats.reserved);
    println!();
    println!("Region A:    {}", stats.region_a);
    println!("Region B:    {}", stats.region_b);
    println!("Reservation: {}", stats.reservation);
    println!("Free tail:   {} bytes", stats.free_tail);
    println!("Free head:   {} bytes", stats.free_head);

    Ok(())
}
