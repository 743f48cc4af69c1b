// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cursor-based byte buffer used by channel transfers.
//!
//! ```text
//!  0 <= position <= limit <= capacity
//!
//!  +----------------+===============+-----------+
//!  |   consumed     |   remaining   |  beyond   |
//!  +----------------+===============+-----------+
//!  0             position         limit     capacity
//! ```
//!
//! Receives store bytes at `position` and advance it; sends transmit the
//! `remaining` region and advance `position` by the count the OS accepted.

use crate::error::{ChannelError, Result};

/// Owned bytes with a position/limit cursor and a read-only flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ByteBuffer {
    data: Vec<u8>,
    position: usize,
    limit: usize,
    read_only: bool,
}

impl ByteBuffer {
    /// Zero-filled buffer, position 0, limit = capacity.
    #[must_use]
    pub fn allocate(capacity: usize) -> Self {
        Self::wrap(vec![0u8; capacity])
    }

    /// Take ownership of `data`; the whole vector is remaining.
    #[must_use]
    pub fn wrap(data: Vec<u8>) -> Self {
        let limit = data.len();
        Self {
            data,
            position: 0,
            limit,
            read_only: false,
        }
    }

    /// Copy `bytes` into a new buffer; the whole slice is remaining.
    #[must_use]
    pub fn copy_from_slice(bytes: &[u8]) -> Self {
        Self::wrap(bytes.to_vec())
    }

    /// Same contents and cursor, but rejected as a receive target.
    #[must_use]
    pub fn into_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.limit - self.position
    }

    #[must_use]
    pub fn has_remaining(&self) -> bool {
        self.position < self.limit
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Move the cursor. Fails if `position > limit`.
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.limit {
            return Err(ChannelError::IllegalArgument(format!(
                "position {} exceeds limit {}",
                position, self.limit
            )));
        }
        self.position = position;
        Ok(())
    }

    /// Set the limit, pulling the position back if it lies beyond it.
    pub fn set_limit(&mut self, limit: usize) -> Result<()> {
        if limit > self.data.len() {
            return Err(ChannelError::IllegalArgument(format!(
                "limit {} exceeds capacity {}",
                limit,
                self.data.len()
            )));
        }
        self.limit = limit;
        if self.position > limit {
            self.position = limit;
        }
        Ok(())
    }

    /// Limit = position, position = 0 (switch from filling to draining).
    pub fn flip(&mut self) {
        self.limit = self.position;
        self.position = 0;
    }

    /// Position = 0, limit = capacity.
    pub fn clear(&mut self) {
        self.position = 0;
        self.limit = self.data.len();
    }

    /// Bytes between position and limit.
    #[must_use]
    pub fn remaining_slice(&self) -> &[u8] {
        &self.data[self.position..self.limit]
    }

    /// Writable view of the bytes between position and limit.
    pub fn remaining_mut(&mut self) -> Result<&mut [u8]> {
        if self.read_only {
            return Err(ChannelError::UnwritableBuffer);
        }
        Ok(&mut self.data[self.position..self.limit])
    }

    /// Bytes before the position (what has been filled or consumed).
    #[must_use]
    pub fn filled(&self) -> &[u8] {
        &self.data[..self.position]
    }

    /// Advance the position by `count`, saturating at the limit.
    pub fn advance(&mut self, count: usize) {
        self.position = self.position.saturating_add(count).min(self.limit);
    }

    /// Copy as much of `src` as fits into the remaining region and advance.
    /// Returns the number of bytes copied.
    pub fn put_slice(&mut self, src: &[u8]) -> Result<usize> {
        let dst = self.remaining_mut()?;
        let n = dst.len().min(src.len());
        dst[..n].copy_from_slice(&src[..n]);
        self.advance(n);
        Ok(n)
    }

    /// Backing storage, ignoring the cursor.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::wrap(data)
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self::copy_from_slice(bytes)
    }
}

/// Validate `offset`/`length` against a slice of `len` buffers.
pub(crate) fn check_range(offset: usize, length: usize, len: usize) -> Result<()> {
    match offset.checked_add(length) {
        Some(end) if end <= len => Ok(()),
        _ => Err(ChannelError::IndexOutOfBounds {
            offset,
            length,
            len,
        }),
    }
}

/// Sum of `remaining()` over `buffers`; with `writable`, every buffer must
/// accept stores.
pub(crate) fn total_remaining(buffers: &[ByteBuffer], writable: bool) -> Result<usize> {
    let mut total = 0usize;
    for buf in buffers {
        if writable && buf.is_read_only() {
            return Err(ChannelError::UnwritableBuffer);
        }
        total = total.saturating_add(buf.remaining());
    }
    Ok(total)
}

/// Fill `targets` in order from `src`, each up to its remaining capacity.
pub(crate) fn scatter_into(targets: &mut [ByteBuffer], src: &[u8]) -> Result<()> {
    let mut left = src;
    for target in targets {
        if left.is_empty() {
            break;
        }
        let n = target.put_slice(left)?;
        left = &left[n..];
    }
    Ok(())
}

/// Concatenate the remaining regions of `sources` without moving them.
pub(crate) fn gather_from(sources: &[ByteBuffer], total: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(total);
    for source in sources {
        out.extend_from_slice(source.remaining_slice());
    }
    out
}

/// Advance `sources` in order by a total of `count` bytes.
pub(crate) fn advance_across(sources: &mut [ByteBuffer], mut count: usize) {
    for source in sources {
        if count == 0 {
            break;
        }
        let gap = count.min(source.remaining());
        source.advance(gap);
        count -= gap;
    }
}
