// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Datagram channel: connection/binding state machine and transfer paths.
//!
//! # Connection State
//!
//! ```text
//!             bind()                connect()
//!  +---------+------->+-------+------------------->+-----------+
//!  | Unbound |        | Bound |                    | Connected |
//!  +---------+        +-------+<-------------------+-----------+
//!       |                 ^        disconnect()          ^
//!       +-----------------|------------------------------+
//!                         |      connect() (implicit bind)
//!
//!  any state --close()--> Closed (terminal)
//! ```
//!
//! # Locking
//!
//! - `conn` serializes `bind`/`connect`/`disconnect`/`close`
//! - `read_lock` serializes `receive`/`read`/`read_scatter`
//! - `write_lock` serializes `send`/`write`/`write_gather`
//!
//! A read-path and a write-path operation may run concurrently. Transfers
//! read the connection state when they start and do not hold `conn` across
//! the OS call.

mod adapter;
mod gate;
mod transfer;

#[cfg(test)]
mod tests;

pub use adapter::{DatagramPacket, DatagramSocketAdapter};
pub use gate::OpenState;

use crate::addr::{validate_connect_target, Endpoint};
use crate::config::ChannelConfig;
use crate::error::{ChannelError, Result};
use crate::net::{Family, NetworkSystem, SocketHandle};
use crate::ops::Ops;
use crate::policy::{check_destination, AccessPolicy, PermitAll};
use crate::select::Registrations;
use crate::traits::Selectable;
use gate::CloseGate;
use parking_lot::Mutex;
use std::io;
use std::net::SocketAddr;
#[cfg(unix)]
use std::os::unix::io::RawFd;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default)]
struct ConnectionState {
    /// Peer recorded by `connect`; `Some` exactly while connected.
    target: Option<SocketAddr>,
    bound: bool,
}

/// A selectable, cancellable UDP channel.
///
/// Share it across threads with `Arc`; every operation takes `&self`.
///
/// # Example
///
/// ```rust,no_run
/// use udpchan::{ByteBuffer, DatagramChannel, OsNetwork};
/// use std::sync::Arc;
///
/// let network = Arc::new(OsNetwork::new());
/// let server = DatagramChannel::open(network.clone()).unwrap();
/// server.bind("127.0.0.1:0".parse().unwrap()).unwrap();
/// let server_addr = server.local_address().unwrap();
///
/// let client = DatagramChannel::open(network).unwrap();
/// client.send(&mut ByteBuffer::copy_from_slice(b"hello"), server_addr).unwrap();
///
/// let mut buf = ByteBuffer::allocate(1500);
/// let from = server.receive(&mut buf).unwrap();
/// assert_eq!(buf.filled(), b"hello");
/// println!("datagram from {:?}", from);
/// ```
pub struct DatagramChannel {
    handle: Box<dyn SocketHandle>,
    family: Family,
    conn: Mutex<ConnectionState>,
    read_lock: Mutex<()>,
    write_lock: Mutex<()>,
    gate: CloseGate,
    registrations: Registrations,
    policy: Arc<dyn AccessPolicy>,
    config: ChannelConfig,
}

/// Builder for [`DatagramChannel`].
pub struct DatagramChannelBuilder {
    network: Arc<dyn NetworkSystem>,
    family: Family,
    config: ChannelConfig,
    policy: Arc<dyn AccessPolicy>,
    blocking: bool,
}

impl DatagramChannelBuilder {
    /// Address family of the socket (default IPv4).
    #[must_use]
    pub fn family(mut self, family: Family) -> Self {
        self.family = family;
        self
    }

    #[must_use]
    pub fn config(mut self, config: ChannelConfig) -> Self {
        self.config = config.normalized();
        self
    }

    /// Access policy consulted on connect, unconnected send and receive.
    #[must_use]
    pub fn policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Initial blocking mode (default blocking).
    #[must_use]
    pub fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn build(self) -> Result<DatagramChannel> {
        let handle = self.network.open_datagram(self.family)?;
        let channel = DatagramChannel {
            handle,
            family: self.family,
            conn: Mutex::new(ConnectionState::default()),
            read_lock: Mutex::new(()),
            write_lock: Mutex::new(()),
            gate: CloseGate::new(),
            registrations: Registrations::new(self.blocking),
            policy: self.policy,
            config: self.config,
        };
        channel.handle.apply_options(&channel.config)?;
        channel.apply_blocking(self.blocking)?;
        log::debug!(
            "[CHANNEL] opened family={:?} blocking={} poll_interval={:?}",
            channel.family,
            self.blocking,
            channel.config.poll_interval
        );
        Ok(channel)
    }
}

// ===== Construction =====

impl DatagramChannel {
    /// Start building a channel on top of `network`.
    #[must_use]
    pub fn builder(network: Arc<dyn NetworkSystem>) -> DatagramChannelBuilder {
        DatagramChannelBuilder {
            network,
            family: Family::V4,
            config: ChannelConfig::from_env(),
            policy: Arc::new(PermitAll),
            blocking: true,
        }
    }

    /// Open a blocking IPv4 channel with environment-derived configuration.
    pub fn open(network: Arc<dyn NetworkSystem>) -> Result<Self> {
        Self::builder(network).build()
    }
}

// ===== Connection state machine =====

impl DatagramChannel {
    /// Assign a local address.
    pub fn bind(&self, local: SocketAddr) -> Result<()> {
        let mut conn = self.conn.lock();
        self.gate.check_open()?;
        if conn.target.is_some() {
            return Err(ChannelError::AlreadyConnected);
        }
        if conn.bound {
            return Err(ChannelError::AlreadyBound);
        }
        self.handle.bind(local)?;
        conn.bound = true;
        log::debug!(
            "[CHANNEL] bound requested={} local={:?}",
            local,
            self.handle.local_addr().ok().flatten()
        );
        Ok(())
    }

    /// Associate the channel with a single peer.
    ///
    /// The target must be resolved and must not be the wildcard address.
    /// A connection-refused report from the OS is ignored: UDP connect is an
    /// address association, not a handshake, and the channel is connected
    /// regardless. Any other OS failure leaves the channel unconnected.
    pub fn connect(&self, target: impl Into<Endpoint>) -> Result<()> {
        let target = target.into();
        let mut conn = self.conn.lock();
        self.gate.check_open()?;
        if conn.target.is_some() {
            return Err(ChannelError::AlreadyConnected);
        }
        let addr = validate_connect_target(&target)?;
        check_destination(self.policy.as_ref(), addr)?;

        {
            let section = self.gate.begin()?;
            match self.handle.connect(addr, None) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                    log::debug!("[CHANNEL] connect {} refused by OS, keeping association", addr);
                }
                Err(e) => return Err(e.into()),
            }
            if section.is_interrupted() {
                return Err(ChannelError::Closed);
            }
        }

        conn.target = Some(addr);
        conn.bound = true;
        log::debug!(
            "[CHANNEL] connected peer={} local={:?}",
            addr,
            self.handle.local_addr().ok().flatten()
        );
        Ok(())
    }

    /// Drop the peer association. No-op when not connected or not open.
    pub fn disconnect(&self) -> Result<()> {
        let mut conn = self.conn.lock();
        if conn.target.is_none() || !self.gate.is_open() {
            return Ok(());
        }
        self.handle.disconnect()?;
        let peer = conn.target.take();
        log::debug!("[CHANNEL] disconnected peer={:?}", peer);
        Ok(())
    }

    /// Close the channel. Idempotent.
    ///
    /// Operations blocked on other threads observe the closure within one
    /// poll interval and return an empty result. All selection keys of the
    /// channel are cancelled.
    pub fn close(&self) -> Result<()> {
        if !self.gate.start_close() {
            return Ok(());
        }
        self.conn.lock().target = None;
        self.registrations.cancel_all();
        let result = self.handle.close();
        self.gate.finish_close();
        log::debug!(
            "[CHANNEL] closed (blocking sections still draining: {})",
            self.gate.in_flight()
        );
        result.map_err(Into::into)
    }

    /// Switch blocking mode.
    ///
    /// A channel with a valid selection key cannot return to blocking mode.
    pub fn configure_blocking(&self, blocking: bool) -> Result<()> {
        self.gate.check_open()?;
        self.registrations
            .set_blocking(blocking, |b| self.apply_blocking(b))
    }

    fn apply_blocking(&self, blocking: bool) -> Result<()> {
        if blocking {
            self.handle.set_nonblocking(false)?;
            self.handle
                .set_poll_timeout(Some(self.config.poll_interval))?;
        } else {
            self.handle.set_nonblocking(true)?;
        }
        Ok(())
    }
}

// ===== Accessors =====

impl DatagramChannel {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.gate.is_open()
    }

    #[must_use]
    pub fn open_state(&self) -> OpenState {
        self.gate.state()
    }

    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.registrations.is_blocking()
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.conn.lock().bound
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.conn.lock().target.is_some()
    }

    /// Peer recorded by `connect`.
    #[must_use]
    pub fn remote_address(&self) -> Option<SocketAddr> {
        self.conn.lock().target
    }

    /// Local address reported by the socket (None once closed or unbound).
    #[must_use]
    pub fn local_address(&self) -> Option<SocketAddr> {
        if !self.gate.is_open() {
            return None;
        }
        self.handle.local_addr().ok().flatten()
    }

    #[must_use]
    pub fn family(&self) -> Family {
        self.family
    }

    #[must_use]
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Blocking sections currently entered (zero when the channel is idle).
    #[must_use]
    pub fn blocking_sections_in_flight(&self) -> usize {
        self.gate.in_flight()
    }

    /// Whether some selector holds a valid key for this channel.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.registrations.is_registered()
    }

    /// Synchronous socket-style facade over this channel.
    #[must_use]
    pub fn socket(&self) -> DatagramSocketAdapter<'_> {
        DatagramSocketAdapter::new(self)
    }

    fn check_open_connected(&self) -> Result<()> {
        self.gate.check_open()?;
        if !self.is_connected() {
            return Err(ChannelError::NotYetConnected);
        }
        Ok(())
    }
}

impl Selectable for DatagramChannel {
    fn valid_ops(&self) -> Ops {
        Ops::READ | Ops::WRITE
    }

    fn is_open(&self) -> bool {
        self.gate.is_open()
    }

    fn is_blocking(&self) -> bool {
        self.registrations.is_blocking()
    }

    fn is_connected(&self) -> bool {
        DatagramChannel::is_connected(self)
    }

    #[cfg(unix)]
    fn raw_fd(&self) -> Option<RawFd> {
        if !self.gate.is_open() {
            return None;
        }
        self.handle.raw_fd()
    }

    fn registrations(&self) -> &Registrations {
        &self.registrations
    }
}

impl Drop for DatagramChannel {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("[CHANNEL] close on drop failed: {}", e);
        }
    }
}

impl std::fmt::Debug for DatagramChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let conn = *self.conn.lock();
        f.debug_struct("DatagramChannel")
            .field("family", &self.family)
            .field("state", &self.gate.state())
            .field("bound", &conn.bound)
            .field("peer", &conn.target)
            .finish()
    }
}
