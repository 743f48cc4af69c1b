// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transfer paths of [`DatagramChannel`].
//!
//! ```text
//!  receive / read / read_scatter        send / write / write_gather
//!            |                                   |
//!      gate.begin()                        gate.begin()
//!      read_lock                           write_lock
//!            |                                   |
//!   handle.receive (bounded wait)       handle.send (bounded wait)
//!            |                                   |
//!     WouldBlock & blocking -> retry    WouldBlock & blocking -> retry
//!     closed meanwhile      -> empty    closed meanwhile      -> 0
//! ```
//!
//! Scatter and gather go through one scratch buffer so the whole transfer
//! is a single datagram.

use super::gate::BlockingSection;
use super::DatagramChannel;
use crate::addr::{resolve_destination, Endpoint};
use crate::buffer::{
    advance_across, check_range, gather_from, scatter_into, total_remaining, ByteBuffer,
};
use crate::error::{is_would_block, ChannelError, Result};
use crate::policy::check_destination;
use crate::traits::ByteChannel;
use std::io;
use std::net::SocketAddr;

/// Outcome of one OS-level attempt inside a transfer loop.
enum Attempt<T> {
    Done(T),
    Retry,
    Empty,
}

impl DatagramChannel {
    /// Receive one datagram into `dst`, returning its sender.
    ///
    /// `None` means nothing was received: the channel is not bound yet, it
    /// is non-blocking and no datagram is queued, the wait was interrupted,
    /// or the channel was closed while waiting. In blocking mode the call
    /// waits until a datagram arrives or the channel is closed.
    ///
    /// A datagram larger than `dst.remaining()` is truncated. Datagrams from
    /// senders the access policy refuses are discarded. When connected, only
    /// the peer's datagrams are delivered.
    pub fn receive(&self, dst: &mut ByteBuffer) -> Result<Option<SocketAddr>> {
        if dst.is_read_only() {
            return Err(ChannelError::UnwritableBuffer);
        }
        self.gate.check_open()?;
        if !self.is_bound() {
            return Ok(None);
        }

        let section = self.gate.begin()?;
        let _read = self.read_lock.lock();
        loop {
            let connected = self.is_connected();
            let outcome = {
                let region = dst.remaining_mut()?;
                self.attempt(&section, || {
                    self.handle.receive(region, false, connected)
                })?
            };
            match outcome {
                Attempt::Done((n, from)) => {
                    if !connected && !self.policy.check_accept(from) {
                        log::trace!("[CHANNEL] discarded {} bytes from refused sender {}", n, from);
                        if self.is_blocking() && !section.is_interrupted() {
                            continue;
                        }
                        return Ok(None);
                    }
                    dst.advance(n);
                    log::trace!("[CHANNEL] received {} bytes from {}", n, from);
                    return Ok(Some(from));
                }
                Attempt::Retry => continue,
                Attempt::Empty => return Ok(None),
            }
        }
    }

    /// Send the remaining bytes of `src` as one datagram to `dest`.
    ///
    /// Returns the number of bytes the OS accepted (the position of `src`
    /// advances by that much); zero in non-blocking mode when the send
    /// would block, or when the channel was closed mid-call. When the
    /// channel is connected `dest` must be the peer.
    pub fn send(&self, src: &mut ByteBuffer, dest: impl Into<Endpoint>) -> Result<usize> {
        let dest = dest.into();
        self.gate.check_open()?;
        let addr = resolve_destination(&dest)?;
        let peer = self.remote_address();
        match peer {
            Some(peer) if peer != addr => {
                return Err(ChannelError::IllegalArgument(format!(
                    "destination {} differs from connected peer {}",
                    addr, peer
                )));
            }
            Some(_) => {}
            None => check_destination(self.policy.as_ref(), addr)?,
        }

        let section = self.gate.begin()?;
        let _write = self.write_lock.lock();
        let target = if peer.is_some() { None } else { Some(addr) };
        let sent = self.transmit(&section, src.remaining_slice(), target)?;
        src.advance(sent);
        log::trace!("[CHANNEL] sent {} bytes to {}", sent, addr);
        Ok(sent)
    }

    /// Connected-mode read into one contiguous region.
    fn read_region(&self, region: &mut [u8]) -> Result<usize> {
        let section = self.gate.begin()?;
        let _read = self.read_lock.lock();
        loop {
            let outcome = self.attempt(&section, || self.handle.receive(region, false, true))?;
            match outcome {
                Attempt::Done((n, _)) => return Ok(n),
                Attempt::Retry => continue,
                Attempt::Empty => return Ok(0),
            }
        }
    }

    /// Connected-mode write of one contiguous region.
    fn write_region(&self, bytes: &[u8]) -> Result<usize> {
        let section = self.gate.begin()?;
        let _write = self.write_lock.lock();
        self.transmit(&section, bytes, None)
    }

    fn transmit(
        &self,
        section: &BlockingSection<'_>,
        bytes: &[u8],
        dest: Option<SocketAddr>,
    ) -> Result<usize> {
        loop {
            match self.attempt(section, || self.handle.send(bytes, dest))? {
                Attempt::Done(n) => return Ok(n),
                Attempt::Retry => continue,
                Attempt::Empty => return Ok(0),
            }
        }
    }

    /// One bounded OS call, classified for the retry loops.
    ///
    /// Would-block retries in blocking mode and yields "empty" otherwise.
    /// An interrupted call, or any failure once the channel has been
    /// closed underneath us, is "empty" too.
    fn attempt<T>(
        &self,
        section: &BlockingSection<'_>,
        op: impl FnOnce() -> io::Result<T>,
    ) -> Result<Attempt<T>> {
        if section.is_interrupted() {
            return Ok(Attempt::Empty);
        }
        match op() {
            Ok(value) => Ok(Attempt::Done(value)),
            Err(e) if is_would_block(&e) => {
                if self.is_blocking() && !section.is_interrupted() {
                    Ok(Attempt::Retry)
                } else {
                    Ok(Attempt::Empty)
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(Attempt::Empty),
            Err(_) if section.is_interrupted() => Ok(Attempt::Empty),
            Err(e) => Err(e.into()),
        }
    }
}

impl ByteChannel for DatagramChannel {
    /// Read one datagram from the connected peer.
    fn read(&self, dst: &mut ByteBuffer) -> Result<usize> {
        if dst.is_read_only() {
            return Err(ChannelError::UnwritableBuffer);
        }
        self.check_open_connected()?;
        if !dst.has_remaining() {
            return Ok(0);
        }
        let n = {
            let region = dst.remaining_mut()?;
            self.read_region(region)?
        };
        dst.advance(n);
        Ok(n)
    }

    /// Write `src` as one datagram to the connected peer.
    fn write(&self, src: &mut ByteBuffer) -> Result<usize> {
        self.check_open_connected()?;
        if !src.has_remaining() {
            return Ok(0);
        }
        let n = self.write_region(src.remaining_slice())?;
        src.advance(n);
        Ok(n)
    }

    fn read_scatter(&self, dsts: &mut [ByteBuffer], offset: usize, length: usize) -> Result<u64> {
        check_range(offset, length, dsts.len())?;
        self.check_open_connected()?;
        let targets = &mut dsts[offset..offset + length];
        let total = total_remaining(targets, true)?;
        if total == 0 {
            return Ok(0);
        }
        let mut scratch = vec![0u8; total];
        let n = self.read_region(&mut scratch)?;
        scatter_into(targets, &scratch[..n])?;
        Ok(n as u64)
    }

    fn write_gather(&self, srcs: &mut [ByteBuffer], offset: usize, length: usize) -> Result<u64> {
        check_range(offset, length, srcs.len())?;
        self.check_open_connected()?;
        let sources = &mut srcs[offset..offset + length];
        let total = total_remaining(sources, false)?;
        if total == 0 {
            return Ok(0);
        }
        let scratch = gather_from(sources, total);
        let n = self.write_region(&scratch)?;
        advance_across(sources, n);
        Ok(n as u64)
    }
}
