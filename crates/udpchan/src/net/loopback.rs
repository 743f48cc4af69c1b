// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process datagram fabric.
//!
//! Every bound [`LoopbackNetwork`] socket owns an unbounded crossbeam queue;
//! the fabric maps local addresses to queue senders. Delivery is immediate
//! and lossless unless a fault is injected, which makes channel behavior
//! reproducible without touching the OS.
//!
//! Semantics mirror UDP where the channel can observe them:
//! - sends to an address nobody bound are silently dropped
//! - connecting to an address nobody bound reports `ConnectionRefused`
//! - datagrams larger than the receive buffer are truncated
//! - a connected socket only delivers datagrams from its peer
//! - sending from an unbound socket binds it to an ephemeral port

use super::{closed_error, family_mismatch, Family, NetworkSystem, SocketHandle};
use crate::config::ChannelConfig;
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
#[cfg(unix)]
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// First port handed out for implicit or port-0 binds.
const EPHEMERAL_PORT_START: u16 = 49_152;

/// Faults injected into every socket of a [`LoopbackNetwork`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoopbackFaults {
    /// Report (and deliver) at most this many bytes per send.
    pub send_limit: Option<usize>,
    /// Accept sends but never deliver them.
    pub drop_sends: bool,
    /// Fail every connect with this error kind.
    pub connect_error: Option<io::ErrorKind>,
    /// Fail every disconnect with this error kind.
    pub disconnect_error: Option<io::ErrorKind>,
}

/// Deterministic in-memory [`NetworkSystem`].
#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    fabric: Arc<Fabric>,
}

struct Fabric {
    routes: DashMap<SocketAddr, Sender<Datagram>>,
    next_port: AtomicU16,
    faults: Mutex<LoopbackFaults>,
    delivered: AtomicU64,
}

impl Default for Fabric {
    fn default() -> Self {
        Self {
            routes: DashMap::new(),
            next_port: AtomicU16::new(EPHEMERAL_PORT_START),
            faults: Mutex::new(LoopbackFaults::default()),
            delivered: AtomicU64::new(0),
        }
    }
}

#[derive(Clone, Debug)]
struct Datagram {
    from: SocketAddr,
    bytes: Vec<u8>,
}

impl LoopbackNetwork {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active fault set.
    pub fn set_faults(&self, faults: LoopbackFaults) {
        *self.fabric.faults.lock() = faults;
    }

    /// Clear all injected faults.
    pub fn clear_faults(&self) {
        self.set_faults(LoopbackFaults::default());
    }

    /// Number of datagrams handed to a bound receiver so far.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.fabric.delivered.load(Ordering::Relaxed)
    }

    /// Whether some socket is currently bound to `addr`.
    #[must_use]
    pub fn is_bound(&self, addr: SocketAddr) -> bool {
        self.fabric.routes.contains_key(&addr)
    }
}

impl NetworkSystem for LoopbackNetwork {
    fn open_datagram(&self, family: Family) -> io::Result<Box<dyn SocketHandle>> {
        let (tx, rx) = unbounded();
        Ok(Box::new(LoopbackSocket {
            fabric: Arc::clone(&self.fabric),
            family,
            tx,
            rx,
            state: Mutex::new(SocketState::default()),
            peeked: Mutex::new(None),
        }))
    }
}

#[derive(Default)]
struct SocketState {
    local: Option<SocketAddr>,
    peer: Option<SocketAddr>,
    nonblocking: bool,
    timeout: Option<Duration>,
    closed: bool,
}

struct LoopbackSocket {
    fabric: Arc<Fabric>,
    family: Family,
    tx: Sender<Datagram>,
    rx: Receiver<Datagram>,
    state: Mutex<SocketState>,
    peeked: Mutex<Option<Datagram>>,
}

impl LoopbackSocket {
    fn loopback_ip(&self) -> IpAddr {
        match self.family {
            Family::V4 => IpAddr::V4(Ipv4Addr::LOCALHOST),
            Family::V6 => IpAddr::V6(Ipv6Addr::LOCALHOST),
        }
    }

    fn check_family(&self, addr: SocketAddr) -> io::Result<()> {
        if self.family.accepts(&addr) {
            Ok(())
        } else {
            Err(family_mismatch(self.family, addr))
        }
    }

    /// Install a route for `requested` (port 0 / wildcard allowed).
    fn bind_locked(&self, state: &mut SocketState, requested: SocketAddr) -> io::Result<SocketAddr> {
        if state.local.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "socket already bound",
            ));
        }
        let ip = if requested.ip().is_unspecified() {
            self.loopback_ip()
        } else {
            requested.ip()
        };
        let addr = if requested.port() == 0 {
            self.allocate_port(ip)?
        } else {
            SocketAddr::new(ip, requested.port())
        };
        match self.fabric.routes.entry(addr) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(io::Error::from(io::ErrorKind::AddrInUse))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(self.tx.clone());
            }
        }
        state.local = Some(addr);
        Ok(addr)
    }

    fn allocate_port(&self, ip: IpAddr) -> io::Result<SocketAddr> {
        for _ in 0..=u16::MAX - EPHEMERAL_PORT_START {
            let mut port = self.fabric.next_port.fetch_add(1, Ordering::Relaxed);
            if port < EPHEMERAL_PORT_START {
                port = EPHEMERAL_PORT_START;
                self.fabric.next_port.store(port + 1, Ordering::Relaxed);
            }
            let addr = SocketAddr::new(ip, port);
            if !self.fabric.routes.contains_key(&addr) {
                return Ok(addr);
            }
        }
        Err(io::Error::from(io::ErrorKind::AddrInUse))
    }

    fn next_datagram(&self, nonblocking: bool, timeout: Option<Duration>) -> io::Result<Datagram> {
        if let Some(dgram) = self.peeked.lock().take() {
            return Ok(dgram);
        }
        if nonblocking {
            return match self.rx.try_recv() {
                Ok(dgram) => Ok(dgram),
                Err(TryRecvError::Empty) => Err(io::Error::from(io::ErrorKind::WouldBlock)),
                Err(TryRecvError::Disconnected) => Err(closed_error()),
            };
        }
        match timeout {
            Some(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(dgram) => Ok(dgram),
                Err(RecvTimeoutError::Timeout) => Err(io::Error::from(io::ErrorKind::WouldBlock)),
                Err(RecvTimeoutError::Disconnected) => Err(closed_error()),
            },
            None => self.rx.recv().map_err(|_| closed_error()),
        }
    }
}

impl SocketHandle for LoopbackSocket {
    fn bind(&self, local: SocketAddr) -> io::Result<()> {
        self.check_family(local)?;
        let mut state = self.state.lock();
        if state.closed {
            return Err(closed_error());
        }
        self.bind_locked(&mut state, local).map(|_| ())
    }

    fn connect(&self, peer: SocketAddr, _timeout: Option<Duration>) -> io::Result<()> {
        self.check_family(peer)?;
        let mut state = self.state.lock();
        if state.closed {
            return Err(closed_error());
        }
        if state.local.is_none() {
            let any = SocketAddr::new(self.loopback_ip(), 0);
            self.bind_locked(&mut state, any)?;
        }
        if let Some(kind) = self.fabric.faults.lock().connect_error {
            return Err(io::Error::new(kind, "injected connect failure"));
        }
        // A refused peer stays associated, as with a real UDP socket.
        state.peer = Some(peer);
        if !self.fabric.routes.contains_key(&peer) {
            return Err(io::Error::from(io::ErrorKind::ConnectionRefused));
        }
        Ok(())
    }

    fn disconnect(&self) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(closed_error());
        }
        if let Some(kind) = self.fabric.faults.lock().disconnect_error {
            return Err(io::Error::new(kind, "injected disconnect failure"));
        }
        state.peer = None;
        Ok(())
    }

    fn send(&self, bytes: &[u8], dest: Option<SocketAddr>) -> io::Result<usize> {
        let from = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(closed_error());
            }
            match state.local {
                Some(local) => local,
                None => {
                    let any = SocketAddr::new(self.loopback_ip(), 0);
                    self.bind_locked(&mut state, any)?
                }
            }
        };
        let dest = match dest {
            Some(dest) => dest,
            None => self
                .state
                .lock()
                .peer
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?,
        };
        self.check_family(dest)?;

        let faults = self.fabric.faults.lock().clone();
        let accepted = faults
            .send_limit
            .map_or(bytes.len(), |limit| limit.min(bytes.len()));
        if faults.drop_sends {
            return Ok(accepted);
        }
        if let Some(route) = self.fabric.routes.get(&dest) {
            let dgram = Datagram {
                from,
                bytes: bytes[..accepted].to_vec(),
            };
            if route.send(dgram).is_ok() {
                self.fabric.delivered.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(accepted)
    }

    fn receive(
        &self,
        bytes: &mut [u8],
        peek: bool,
        connected: bool,
    ) -> io::Result<(usize, SocketAddr)> {
        loop {
            let (nonblocking, timeout, peer) = {
                let state = self.state.lock();
                if state.closed {
                    return Err(closed_error());
                }
                (state.nonblocking, state.timeout, state.peer)
            };
            let dgram = self.next_datagram(nonblocking, timeout)?;
            if connected && peer.is_some_and(|p| p != dgram.from) {
                continue;
            }
            let n = dgram.bytes.len().min(bytes.len());
            bytes[..n].copy_from_slice(&dgram.bytes[..n]);
            let from = dgram.from;
            if peek {
                *self.peeked.lock() = Some(dgram);
            }
            return Ok((n, from));
        }
    }

    fn apply_options(&self, _config: &ChannelConfig) -> io::Result<()> {
        // No kernel buffers or TTL in the fabric.
        if self.state.lock().closed {
            return Err(closed_error());
        }
        Ok(())
    }

    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        self.state.lock().nonblocking = nonblocking;
        Ok(())
    }

    fn set_poll_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.state.lock().timeout = timeout;
        Ok(())
    }

    fn local_addr(&self) -> io::Result<Option<SocketAddr>> {
        let state = self.state.lock();
        if state.closed {
            return Err(closed_error());
        }
        Ok(state.local)
    }

    #[cfg(unix)]
    fn raw_fd(&self) -> Option<RawFd> {
        None
    }

    fn close(&self) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        if let Some(local) = state.local {
            self.fabric.routes.remove(&local);
        }
        Ok(())
    }
}
