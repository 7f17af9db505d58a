//! Common test utilities for integration tests.

#![allow(dead_code)]

use ringlog_core::ring::RingHeader;
use ringlog_core::{RingLog, RingLogConfig};
use std::path::PathBuf;
use tempfile::TempDir;

/// A ring file path inside a fresh temporary directory.
pub fn temp_ring_path() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ring.log");
    (dir, path)
}

/// Open a fresh ring of `capacity` bytes.
pub fn open_ring(capacity: u32) -> (TempDir, PathBuf, RingLog) {
    let (dir, path) = temp_ring_path();
    let log = RingLog::open(&path, capacity).unwrap();
    (dir, path, log)
}

/// Configuration with a lock timeout so a broken test fails instead of hanging.
pub fn test_config(capacity: u32) -> RingLogConfig {
    RingLogConfig::default()
        .with_capacity(capacity)
        .with_lock_timeout(std::time::Duration::from_secs(5))
}

/// Check every header invariant that must hold between calls.
pub fn assert_invariants(header: &RingHeader) {
    assert!(
        header.idx_a + header.len_a <= header.avail,
        "region A past capacity: {}",
        header
    );
    assert!(
        header.idx_b + header.len_b <= header.idx_a,
        "region B overlaps A: {}",
        header
    );
    if header.len_a == 0 {
        assert_eq!(header.len_b, 0, "B without A: {}", header);
    }
}

/// Write `data` as one reserved block and commit it.
pub fn push(log: &mut RingLog, data: &[u8]) {
    log.reserve(data.len()).unwrap().put(data).unwrap();
    log.commits(data.len()).unwrap();
}

/// Read `len` bytes from the front of region A and release them.
pub fn pop(log: &mut RingLog, len: usize) -> Vec<u8> {
    let bytes = log.acquire().unwrap()[..len].to_vec();
    log.release(len).unwrap();
    bytes
}
