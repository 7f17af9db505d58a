//! Borrowed views handed out by `reserve` and `acquire`.

use super::header::Span;
use crate::error::{Result, RingLogError};
use std::ops::{Deref, DerefMut};

/// Writable window over a reservation.
///
/// Borrows the log mutably, so the producer must drop it before calling
/// `commits`. The lock is not held while the window is alive.
#[derive(Debug)]
pub struct WriteWindow<'a> {
    buf: &'a mut [u8],
    span: Span,
}

impl<'a> WriteWindow<'a> {
    pub(crate) fn new(buf: &'a mut [u8], span: Span) -> Self {
        Self { buf, span }
    }

    /// Copy `data` to the start of the window.
    ///
    /// Returns the number of bytes written.
    pub fn put(&mut self, data: &[u8]) -> Result<usize> {
        if data.len() > self.buf.len() {
            return Err(RingLogError::MoreData {
                len: data.len(),
                window: self.span.len,
            });
        }
        self.buf[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    /// Position of the window in the data segment.
    pub fn span(&self) -> Span {
        self.span
    }
}

impl Deref for WriteWindow<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &*self.buf
    }
}

impl DerefMut for WriteWindow<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut *self.buf
    }
}

/// Read-only window over region A.
#[derive(Debug, Clone, Copy)]
pub struct ReadWindow<'a> {
    buf: &'a [u8],
    span: Span,
}

impl<'a> ReadWindow<'a> {
    pub(crate) fn new(buf: &'a [u8], span: Span) -> Self {
        Self { buf, span }
    }

    /// Position of the window in the data segment.
    pub fn span(&self) -> Span {
        self.span
    }

    /// The window contents with the full borrow lifetime.
    pub fn as_slice(&self) -> &'a [u8] {
        self.buf
    }
}

impl Deref for ReadWindow<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buf
    }
}
