// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Socket handle abstraction consumed by datagram channels.
//!
//! A [`NetworkSystem`] is injected into every channel at construction and
//! opens the [`SocketHandle`] the channel exclusively owns. Two backends:
//!
//! - [`OsNetwork`] - real UDP sockets (`socket2` + `std::net`)
//! - [`LoopbackNetwork`] - in-process datagram fabric with fault injection,
//!   for deterministic tests of the channel state machine
//!
//! # Blocking Contract
//!
//! Channels never let a handle block forever. In blocking mode the channel
//! installs a poll timeout; a receive with nothing to deliver returns
//! `WouldBlock` (or `TimedOut`) once the timeout elapses so the caller can
//! re-check whether the channel was closed.

mod loopback;
mod os;

pub use loopback::{LoopbackFaults, LoopbackNetwork};
pub use os::OsNetwork;

use crate::config::ChannelConfig;
use std::io;
use std::net::SocketAddr;
#[cfg(unix)]
use std::os::unix::io::RawFd;
use std::time::Duration;

/// Address family of a datagram socket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Family {
    #[default]
    V4,
    V6,
}

impl Family {
    /// Whether `addr` can be used with a socket of this family.
    #[must_use]
    pub fn accepts(self, addr: &SocketAddr) -> bool {
        matches!(
            (self, addr),
            (Family::V4, SocketAddr::V4(_)) | (Family::V6, SocketAddr::V6(_))
        )
    }
}

/// Factory for datagram socket handles.
pub trait NetworkSystem: Send + Sync {
    /// Open a new, unbound datagram socket.
    fn open_datagram(&self, family: Family) -> io::Result<Box<dyn SocketHandle>>;
}

/// An OS-level (or simulated) datagram socket.
///
/// All methods take `&self`; implementations must tolerate a receive and a
/// send running concurrently on different threads, and `close` racing with
/// either (it may wait for the in-flight call to return).
pub trait SocketHandle: Send + Sync {
    /// Assign a local address.
    fn bind(&self, local: SocketAddr) -> io::Result<()>;

    /// Associate with a single peer. UDP connect performs no handshake.
    fn connect(&self, peer: SocketAddr, timeout: Option<Duration>) -> io::Result<()>;

    /// Drop the peer association.
    fn disconnect(&self) -> io::Result<()>;

    /// Transmit one datagram. `None` sends to the connected peer.
    fn send(&self, bytes: &[u8], dest: Option<SocketAddr>) -> io::Result<usize>;

    /// Receive one datagram into `bytes`, returning the stored length and
    /// the sender. With `peek` the datagram stays queued. `connected` tells
    /// the handle that only the associated peer's datagrams are wanted.
    fn receive(
        &self,
        bytes: &mut [u8],
        peek: bool,
        connected: bool,
    ) -> io::Result<(usize, SocketAddr)>;

    /// Apply the socket options of `config` (buffer sizes, reuse, broadcast,
    /// TTL). Called once, before the socket is bound.
    fn apply_options(&self, config: &ChannelConfig) -> io::Result<()>;

    /// Switch between non-blocking (`true`) and blocking (`false`) mode.
    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()>;

    /// Bound how long a blocking receive/send may wait (None = forever).
    fn set_poll_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    /// Local address, if one has been assigned (explicitly or implicitly).
    fn local_addr(&self) -> io::Result<Option<SocketAddr>>;

    /// Descriptor for readiness registration (None if not pollable).
    #[cfg(unix)]
    fn raw_fd(&self) -> Option<RawFd>;

    /// Release the socket. Idempotent.
    fn close(&self) -> io::Result<()>;
}

pub(crate) fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "socket closed")
}

pub(crate) fn family_mismatch(family: Family, addr: SocketAddr) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("address {} does not match socket family {:?}", addr, family),
    )
}
