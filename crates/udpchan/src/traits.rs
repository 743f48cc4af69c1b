// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Capability traits implemented by channels.
//!
//! A channel is not a subclass of anything: it implements [`ByteChannel`]
//! (connected-mode transfers, single and scatter/gather) and [`Selectable`]
//! (what a selector needs to watch it) independently.

use crate::buffer::ByteBuffer;
use crate::error::Result;
use crate::ops::Ops;
use crate::select::Registrations;
#[cfg(unix)]
use std::os::unix::io::RawFd;

/// Transfers between a channel and cursor buffers.
///
/// Counts are the number of bytes moved; zero means "nothing transferred
/// right now" (would block, interrupted, or closed while waiting).
pub trait ByteChannel {
    /// Fill `dst` from the channel, advancing its position.
    fn read(&self, dst: &mut ByteBuffer) -> Result<usize>;

    /// Drain `src` into the channel, advancing its position.
    fn write(&self, src: &mut ByteBuffer) -> Result<usize>;

    /// Scatter one transfer across `dsts[offset..offset + length]`.
    fn read_scatter(&self, dsts: &mut [ByteBuffer], offset: usize, length: usize) -> Result<u64>;

    /// Gather one transfer from `srcs[offset..offset + length]`.
    fn write_gather(&self, srcs: &mut [ByteBuffer], offset: usize, length: usize) -> Result<u64>;

    /// Scatter across every buffer.
    fn read_all(&self, dsts: &mut [ByteBuffer]) -> Result<u64> {
        let len = dsts.len();
        self.read_scatter(dsts, 0, len)
    }

    /// Gather from every buffer.
    fn write_all(&self, srcs: &mut [ByteBuffer]) -> Result<u64> {
        let len = srcs.len();
        self.write_gather(srcs, 0, len)
    }
}

/// What a selector needs from a channel it watches.
pub trait Selectable: Send + Sync {
    /// Operations meaningful for this channel type.
    fn valid_ops(&self) -> Ops;

    fn is_open(&self) -> bool;

    fn is_blocking(&self) -> bool;

    /// Whether "writable" only makes sense after a connection completes.
    fn is_connection_oriented(&self) -> bool {
        false
    }

    fn is_connected(&self) -> bool;

    /// Descriptor to poll, if the backing socket has one.
    #[cfg(unix)]
    fn raw_fd(&self) -> Option<RawFd>;

    /// Keys this channel is registered under, plus its blocking mode.
    fn registrations(&self) -> &Registrations;
}
