//! Ring header structure and the region bookkeeping stored in it.
//!
//! All occupancy state lives in the 32-byte header at offset 0 of the file.
//! The methods here are the whole reserve/commit/acquire/release protocol,
//! expressed as pure transitions on a header value. The engine loads the
//! header from the shared mapping under the lock, applies one transition and
//! stores it back.

use crate::error::{Result, RingLogError};
use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::fmt;
use std::io::{self, Cursor};
use std::ops::Range;

/// Fixed size of the ring header in bytes.
pub const HEADER_SIZE: usize = 32;

/// Largest capacity representable in the on-disk `int32` fields.
pub const MAX_CAPACITY: u32 = i32::MAX as u32;

/// A byte range inside the data segment, as offset and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    /// Offset from the start of the data segment.
    pub offset: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    /// Create a new span.
    #[must_use]
    pub const fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    /// One past the last byte.
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.offset + self.len
    }

    /// Whether the span covers no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The span as a `usize` range for slicing.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.offset as usize..self.end() as usize
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.offset, self.end())
    }
}

/// How a `commit` changed occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Zero-size commit: the reservation was dropped.
    Cancelled,
    /// The ring was empty; the reservation became region A.
    StartedA,
    /// The reservation abutted region A and extended it.
    ExtendedA,
    /// The reservation was at the wrapped front and went into region B.
    ExtendedB,
}

/// Ring file header.
///
/// Stored at the beginning of every ring file. Field order matches the
/// on-disk layout; every field is a native-endian 32-bit integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct RingHeader {
    /// Reserved for an external integrity layer.
    pub crc32: u32,
    /// Usable data capacity in bytes. Zero means "never initialized".
    pub avail: u32,
    /// Region A offset.
    pub idx_a: u32,
    /// Region A length.
    pub len_a: u32,
    /// Region B offset.
    pub idx_b: u32,
    /// Region B length.
    pub len_b: u32,
    /// Outstanding reservation offset.
    pub idx_r: u32,
    /// Outstanding reservation length.
    pub len_r: u32,
}

impl RingHeader {
    /// Create a freshly initialized header for a ring of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        Self {
            avail: capacity,
            ..Self::default()
        }
    }

    /// Read a header from a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Buffer too small for header",
            ));
        }

        let mut cursor = Cursor::new(bytes);

        Ok(Self {
            crc32: cursor.read_u32::<NativeEndian>()?,
            avail: cursor.read_u32::<NativeEndian>()?,
            idx_a: cursor.read_u32::<NativeEndian>()?,
            len_a: cursor.read_u32::<NativeEndian>()?,
            idx_b: cursor.read_u32::<NativeEndian>()?,
            len_b: cursor.read_u32::<NativeEndian>()?,
            idx_r: cursor.read_u32::<NativeEndian>()?,
            len_r: cursor.read_u32::<NativeEndian>()?,
        })
    }

    /// Write the header into the first `HEADER_SIZE` bytes of `buf`.
    pub fn write_to(&self, buf: &mut [u8]) -> io::Result<()> {
        if buf.len() < HEADER_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Buffer too small for header",
            ));
        }

        let mut cursor = Cursor::new(&mut buf[..HEADER_SIZE]);

        cursor.write_u32::<NativeEndian>(self.crc32)?;
        cursor.write_u32::<NativeEndian>(self.avail)?;
        cursor.write_u32::<NativeEndian>(self.idx_a)?;
        cursor.write_u32::<NativeEndian>(self.len_a)?;
        cursor.write_u32::<NativeEndian>(self.idx_b)?;
        cursor.write_u32::<NativeEndian>(self.len_b)?;
        cursor.write_u32::<NativeEndian>(self.idx_r)?;
        cursor.write_u32::<NativeEndian>(self.len_r)?;

        debug_assert_eq!(cursor.position() as usize, HEADER_SIZE);

        Ok(())
    }

    /// Whether some process has already initialized this header.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.avail != 0
    }

    /// Validate the header invariants against a data segment of `data_len` bytes.
    ///
    /// All later arithmetic relies on these holding, so the engine checks
    /// them every time it loads the shared header.
    pub fn validate(&self, data_len: usize) -> std::result::Result<(), String> {
        if self.avail > MAX_CAPACITY {
            return Err(format!("capacity {} exceeds int32 range", self.avail));
        }
        if self.avail as usize > data_len {
            return Err(format!(
                "capacity {} exceeds mapped data segment of {} bytes",
                self.avail, data_len
            ));
        }
        let end_a = self.idx_a as u64 + self.len_a as u64;
        if end_a > self.avail as u64 {
            return Err(format!(
                "region A [{}, {}) exceeds capacity {}",
                self.idx_a, end_a, self.avail
            ));
        }
        let end_b = self.idx_b as u64 + self.len_b as u64;
        if end_b > self.idx_a as u64 {
            return Err(format!(
                "region B [{}, {}) overlaps region A at {}",
                self.idx_b, end_b, self.idx_a
            ));
        }
        let end_r = self.idx_r as u64 + self.len_r as u64;
        if end_r > self.avail as u64 {
            return Err(format!(
                "reservation [{}, {}) exceeds capacity {}",
                self.idx_r, end_r, self.avail
            ));
        }
        Ok(())
    }

    /// Region A: the oldest committed run.
    #[must_use]
    pub fn region_a(&self) -> Span {
        Span::new(self.idx_a, self.len_a)
    }

    /// Region B: the committed run that wrapped to the front.
    #[must_use]
    pub fn region_b(&self) -> Span {
        Span::new(self.idx_b, self.len_b)
    }

    /// The outstanding reservation, empty when idle.
    #[must_use]
    pub fn reservation(&self) -> Span {
        Span::new(self.idx_r, self.len_r)
    }

    /// Total committed, unreleased bytes.
    #[must_use]
    pub fn committed(&self) -> u32 {
        self.len_a + self.len_b
    }

    /// Room between the end of region A and the end of the buffer.
    #[must_use]
    pub fn free_tail(&self) -> u32 {
        self.avail - self.idx_a - self.len_a
    }

    /// Room between the end of region B and the start of region A.
    #[must_use]
    pub fn free_head(&self) -> u32 {
        self.idx_a - self.idx_b - self.len_b
    }

    /// Claim `size` bytes for the producer and record them as the reservation.
    ///
    /// While region B exists new data can only go after B. Otherwise the
    /// space after A is used as long as it is at least as large as the space
    /// freed in front of A; when the front is larger the reservation wraps
    /// to offset 0 and, once committed, starts region B.
    pub fn reserve(&mut self, size: u32) -> Result<Span> {
        if size > self.avail {
            return Err(RingLogError::TooBig {
                requested: size as u64,
                capacity: self.avail,
            });
        }

        let offset = if self.len_b != 0 {
            let free = self.free_head();
            if free == 0 || free < size {
                return Err(RingLogError::NoFree {
                    requested: size,
                    available: free,
                });
            }
            self.idx_b + self.len_b
        } else {
            let free = self.free_tail();
            if free >= self.idx_a {
                if free == 0 || free < size {
                    return Err(RingLogError::NoFree {
                        requested: size,
                        available: free,
                    });
                }
                self.idx_a + self.len_a
            } else {
                // Nothing released at the front yet, wrapping would hit A.
                if self.idx_a == 0 || self.idx_a < size {
                    return Err(RingLogError::NoFree {
                        requested: size,
                        available: self.idx_a,
                    });
                }
                0
            }
        };

        self.idx_r = offset;
        self.len_r = size;

        Ok(self.reservation())
    }

    /// Finalize the outstanding reservation with `size` bytes.
    ///
    /// `size == 0` cancels. Larger sizes are clamped to the reservation.
    pub fn commit(&mut self, size: u32) -> CommitOutcome {
        if size == 0 {
            self.idx_r = 0;
            self.len_r = 0;
            return CommitOutcome::Cancelled;
        }

        let size = size.min(self.len_r);

        let outcome = if self.len_a == 0 && self.len_b == 0 {
            self.idx_a = self.idx_r;
            self.len_a = size;
            CommitOutcome::StartedA
        } else if self.idx_r == self.idx_a + self.len_a {
            self.len_a += size;
            CommitOutcome::ExtendedA
        } else {
            self.len_b += size;
            CommitOutcome::ExtendedB
        };

        self.idx_r = 0;
        self.len_r = 0;

        outcome
    }

    /// The readable span: region A, or `None` when it is empty.
    #[must_use]
    pub fn acquire(&self) -> Option<Span> {
        if self.len_a == 0 {
            None
        } else {
            Some(self.region_a())
        }
    }

    /// Mark `size` bytes at the front of region A as consumed.
    ///
    /// Consuming all of A promotes B to A. Returns `true` when that happened.
    pub fn release(&mut self, size: u32) -> bool {
        if size >= self.len_a {
            self.idx_a = self.idx_b;
            self.len_a = self.len_b;
            self.idx_b = 0;
            self.len_b = 0;
            true
        } else {
            self.idx_a += size;
            self.len_a -= size;
            false
        }
    }

    /// Drop all data and any reservation, keeping the capacity.
    pub fn reset(&mut self) {
        *self = Self::new(self.avail);
    }
}

impl fmt::Display for RingHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "avail={} A={} B={} R={}",
            self.avail,
            self.region_a(),
            self.region_b(),
            self.reservation()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committed_ring(capacity: u32, size: u32) -> RingHeader {
        let mut header = RingHeader::new(capacity);
        header.reserve(size).unwrap();
        header.commit(size);
        header
    }

    #[test]
    fn header_roundtrip() {
        let header = RingHeader {
            crc32: 7,
            avail: 1024,
            idx_a: 100,
            len_a: 200,
            idx_b: 0,
            len_b: 50,
            idx_r: 50,
            len_r: 10,
        };

        let mut buf = [0u8; HEADER_SIZE];
        header.write_to(&mut buf).unwrap();

        let restored = RingHeader::from_bytes(&buf).unwrap();
        assert_eq!(restored, header);
    }

    #[test]
    fn header_layout_is_native_int32() {
        let header = RingHeader::new(16);
        let mut buf = [0u8; HEADER_SIZE];
        header.write_to(&mut buf).unwrap();

        assert_eq!(&buf[0..4], &0i32.to_ne_bytes());
        assert_eq!(&buf[4..8], &16i32.to_ne_bytes());
        assert!(buf[8..].iter().all(|b| *b == 0));
    }

    #[test]
    fn header_size_is_32() {
        assert_eq!(HEADER_SIZE, 32);
        assert_eq!(std::mem::size_of::<RingHeader>(), HEADER_SIZE);
    }

    #[test]
    fn short_buffer_rejected() {
        assert!(RingHeader::from_bytes(&[0u8; 16]).is_err());
        assert!(RingHeader::new(8).write_to(&mut [0u8; 31]).is_err());
    }

    #[test]
    fn header_validation() {
        let header = RingHeader::new(16);
        assert!(header.validate(16).is_ok());
        assert!(header.validate(8).is_err());

        let mut bad_a = header;
        bad_a.idx_a = 10;
        bad_a.len_a = 7;
        assert!(bad_a.validate(16).is_err());

        let mut bad_b = header;
        bad_b.idx_a = 4;
        bad_b.len_a = 2;
        bad_b.len_b = 5;
        assert!(bad_b.validate(16).is_err());

        let mut bad_r = header;
        bad_r.idx_r = 12;
        bad_r.len_r = 5;
        assert!(bad_r.validate(16).is_err());
    }

    #[test]
    fn reserve_on_empty_ring_starts_at_zero() {
        let mut header = RingHeader::new(16);
        let span = header.reserve(10).unwrap();
        assert_eq!(span, Span::new(0, 10));
        assert_eq!(header.reservation(), span);
        assert_eq!(header.committed(), 0);
    }

    #[test]
    fn second_reserve_replaces_the_first() {
        let mut header = RingHeader::new(16);
        assert_eq!(header.reserve(4).unwrap(), Span::new(0, 4));
        assert_eq!(header.reserve(6).unwrap(), Span::new(0, 6));
        assert_eq!(header.reservation(), Span::new(0, 6));
        assert_eq!(header.committed(), 0);

        assert_eq!(header.commit(6), CommitOutcome::StartedA);
        assert_eq!(header.region_a(), Span::new(0, 6));
        assert!(header.reservation().is_empty());
    }

    #[test]
    fn full_capacity_fits_once() {
        let mut header = RingHeader::new(16);
        assert_eq!(header.reserve(16).unwrap(), Span::new(0, 16));
        header.commit(16);

        let err = header.reserve(1).unwrap_err();
        assert!(matches!(err, RingLogError::NoFree { .. }));
    }

    #[test]
    fn oversized_request_is_too_big() {
        let mut header = RingHeader::new(16);
        let err = header.reserve(17).unwrap_err();
        assert!(matches!(
            err,
            RingLogError::TooBig {
                requested: 17,
                capacity: 16
            }
        ));
        assert!(!err.is_retriable());
        assert_eq!(header.reservation(), Span::default());
    }

    #[test]
    fn commit_on_empty_ring_creates_region_a() {
        let header = committed_ring(16, 10);
        assert_eq!(header.region_a(), Span::new(0, 10));
        assert!(header.region_b().is_empty());
        assert!(header.reservation().is_empty());
    }

    #[test]
    fn tail_short_and_no_front_room_fails() {
        let mut header = committed_ring(16, 10);
        let err = header.reserve(10).unwrap_err();
        assert!(matches!(
            err,
            RingLogError::NoFree {
                requested: 10,
                available: 6
            }
        ));
    }

    #[test]
    fn partial_release_then_extend_a() {
        let mut header = committed_ring(16, 10);
        assert!(!header.release(4));
        assert_eq!(header.region_a(), Span::new(4, 6));

        let span = header.reserve(4).unwrap();
        assert_eq!(span, Span::new(10, 4));
        assert_eq!(header.commit(4), CommitOutcome::ExtendedA);
        assert_eq!(header.region_a(), Span::new(4, 10));
    }

    #[test]
    fn wrap_when_front_room_exceeds_tail() {
        let mut header = committed_ring(16, 14);
        header.release(8);
        assert_eq!(header.region_a(), Span::new(8, 6));
        assert_eq!(header.free_tail(), 2);

        let span = header.reserve(5).unwrap();
        assert_eq!(span, Span::new(0, 5));
        assert_eq!(header.commit(5), CommitOutcome::ExtendedB);
        assert_eq!(header.region_b(), Span::new(0, 5));
        assert_eq!(header.committed(), 11);

        // Further reservations go after B, bounded by A.
        assert_eq!(header.free_head(), 3);
        assert!(header.reserve(4).is_err());
        assert_eq!(header.reserve(3).unwrap(), Span::new(5, 3));
        header.commit(3);
        assert_eq!(header.region_b(), Span::new(0, 8));
        assert!(header.reserve(1).is_err());
    }

    #[test]
    fn wrap_blocked_when_front_too_small() {
        let mut header = committed_ring(16, 15);
        header.release(3);
        // Tail 1 < front 3, so the wrap branch is used but 4 does not fit.
        let err = header.reserve(4).unwrap_err();
        assert!(matches!(
            err,
            RingLogError::NoFree {
                requested: 4,
                available: 3
            }
        ));
        assert_eq!(header.reserve(3).unwrap(), Span::new(0, 3));
    }

    #[test]
    fn draining_a_promotes_b() {
        let mut header = committed_ring(16, 14);
        header.release(8);
        header.reserve(5).unwrap();
        header.commit(5);

        assert!(header.release(6));
        assert_eq!(header.region_a(), Span::new(0, 5));
        assert!(header.region_b().is_empty());
        assert_eq!(header.acquire(), Some(Span::new(0, 5)));
    }

    #[test]
    fn acquire_ignores_region_b() {
        let mut header = committed_ring(16, 14);
        header.release(8);
        header.reserve(5).unwrap();
        header.commit(5);
        assert_eq!(header.acquire(), Some(Span::new(8, 6)));
    }

    #[test]
    fn cancel_leaves_occupancy_unchanged() {
        let mut header = committed_ring(16, 4);
        let before = header;

        let first = header.reserve(6).unwrap();
        assert_eq!(header.commit(0), CommitOutcome::Cancelled);
        assert_eq!(header, before);

        let second = header.reserve(6).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn commit_is_clamped_to_reservation() {
        let mut header = RingHeader::new(16);
        header.reserve(4).unwrap();
        header.commit(100);
        assert_eq!(header.region_a(), Span::new(0, 4));
    }

    #[test]
    fn commit_after_consumer_drained_everything() {
        let mut header = committed_ring(16, 6);
        let span = header.reserve(4).unwrap();
        assert_eq!(span, Span::new(6, 4));

        // Consumer empties the ring while the producer is still copying.
        header.release(6);
        assert_eq!(header.committed(), 0);

        assert_eq!(header.commit(4), CommitOutcome::StartedA);
        assert_eq!(header.region_a(), Span::new(6, 4));
    }

    #[test]
    fn acquire_on_empty_ring() {
        let header = RingHeader::new(16);
        assert_eq!(header.acquire(), None);
    }

    #[test]
    fn reset_keeps_capacity() {
        let mut header = committed_ring(16, 10);
        header.crc32 = 0xdead;
        header.reserve(2).unwrap();
        header.reset();
        assert_eq!(header, RingHeader::new(16));
    }
}
