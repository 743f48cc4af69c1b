// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Real UDP sockets.
//!
//! Sockets are created through `socket2` (so options can be applied before
//! binding) and then held as `std::net::UdpSocket`. The socket sits behind a
//! `RwLock<Option<_>>`: transfers take the read side for the duration of one
//! OS call, `close` takes the write side and drops the descriptor, so close
//! waits for at most one poll-timeout slice.

use super::{closed_error, family_mismatch, Family, NetworkSystem, SocketHandle};
use crate::config::ChannelConfig;
use parking_lot::RwLock;
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use std::io;
use std::net::{SocketAddr, UdpSocket};
#[cfg(unix)]
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;

/// Opens real UDP sockets.
///
/// Socket options come from the channel's [`ChannelConfig`], applied through
/// [`SocketHandle::apply_options`] right after the socket is opened.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsNetwork;

impl OsNetwork {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl NetworkSystem for OsNetwork {
    fn open_datagram(&self, family: Family) -> io::Result<Box<dyn SocketHandle>> {
        let domain = match family {
            Family::V4 => Domain::IPV4,
            Family::V6 => Domain::IPV6,
        };
        let socket: UdpSocket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?.into();
        log::debug!("[NET] opened {:?} datagram socket", family);
        Ok(Box::new(OsSocket {
            family,
            socket: RwLock::new(Some(socket)),
        }))
    }
}

/// One OS datagram socket.
struct OsSocket {
    family: Family,
    socket: RwLock<Option<UdpSocket>>,
}

impl OsSocket {
    fn with_socket<R>(&self, f: impl FnOnce(&UdpSocket) -> io::Result<R>) -> io::Result<R> {
        let guard = self.socket.read();
        match guard.as_ref() {
            Some(socket) => f(socket),
            None => Err(closed_error()),
        }
    }

    fn check_family(&self, addr: SocketAddr) -> io::Result<()> {
        if self.family.accepts(&addr) {
            Ok(())
        } else {
            Err(family_mismatch(self.family, addr))
        }
    }
}

impl SocketHandle for OsSocket {
    fn bind(&self, local: SocketAddr) -> io::Result<()> {
        self.check_family(local)?;
        self.with_socket(|socket| SockRef::from(socket).bind(&local.into()))
    }

    fn connect(&self, peer: SocketAddr, _timeout: Option<Duration>) -> io::Result<()> {
        // UDP connect only records the peer; there is nothing to wait for.
        self.check_family(peer)?;
        self.with_socket(|socket| socket.connect(peer))
    }

    fn disconnect(&self) -> io::Result<()> {
        self.with_socket(|socket| {
            let before = socket.local_addr()?;
            dissolve_association(socket)?;
            restore_local_port(socket, before)
        })
    }

    fn send(&self, bytes: &[u8], dest: Option<SocketAddr>) -> io::Result<usize> {
        if let Some(dest) = dest {
            self.check_family(dest)?;
        }
        self.with_socket(|socket| match dest {
            Some(dest) => socket.send_to(bytes, dest),
            None => socket.send(bytes),
        })
    }

    fn receive(
        &self,
        bytes: &mut [u8],
        peek: bool,
        _connected: bool,
    ) -> io::Result<(usize, SocketAddr)> {
        // The kernel already filters foreign datagrams on a connected socket.
        self.with_socket(|socket| {
            if peek {
                socket.peek_from(bytes)
            } else {
                socket.recv_from(bytes)
            }
        })
    }

    fn apply_options(&self, config: &ChannelConfig) -> io::Result<()> {
        self.with_socket(|socket| {
            let sock = SockRef::from(socket);
            if config.reuse_address {
                sock.set_reuse_address(true)?;
            }
            if let Some(size) = config.recv_buffer_size {
                sock.set_recv_buffer_size(size)?;
            }
            if let Some(size) = config.send_buffer_size {
                sock.set_send_buffer_size(size)?;
            }
            if config.broadcast {
                sock.set_broadcast(true)?;
            }
            if let Some(ttl) = config.ttl {
                sock.set_ttl(ttl)?;
            }
            Ok(())
        })
    }

    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        self.with_socket(|socket| socket.set_nonblocking(nonblocking))
    }

    fn set_poll_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.with_socket(|socket| {
            socket.set_read_timeout(timeout)?;
            socket.set_write_timeout(timeout)
        })
    }

    fn local_addr(&self) -> io::Result<Option<SocketAddr>> {
        self.with_socket(|socket| {
            let addr = socket.local_addr()?;
            // Unbound sockets report port 0 on every platform we target.
            Ok((addr.port() != 0).then_some(addr))
        })
    }

    #[cfg(unix)]
    fn raw_fd(&self) -> Option<RawFd> {
        self.socket.read().as_ref().map(AsRawFd::as_raw_fd)
    }

    fn close(&self) -> io::Result<()> {
        if let Some(socket) = self.socket.write().take() {
            log::debug!(
                "[NET] closing datagram socket local={:?}",
                socket.local_addr().ok()
            );
            drop(socket);
        }
        Ok(())
    }
}

/// Dissolve a UDP association by connecting to `AF_UNSPEC`.
#[cfg(unix)]
fn dissolve_association(socket: &UdpSocket) -> io::Result<()> {
    let fd = socket.as_raw_fd();
    // SAFETY: an all-zero sockaddr is a valid bit pattern for the C struct.
    let mut addr: libc::sockaddr = unsafe { std::mem::zeroed() };
    addr.sa_family = libc::AF_UNSPEC as libc::sa_family_t;
    // SAFETY:
    // - fd is a live datagram socket (borrowed from `socket` for this call)
    // - addr points to a stack sockaddr and the length matches its size
    // - connect(AF_UNSPEC) only clears the kernel's peer association
    let ret = unsafe {
        libc::connect(
            fd,
            &addr,
            std::mem::size_of::<libc::sockaddr>() as libc::socklen_t,
        )
    };
    if ret == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    // BSD-derived stacks dissolve the association but still report this.
    if err.raw_os_error() == Some(libc::EAFNOSUPPORT) {
        return Ok(());
    }
    Err(err)
}

/// Linux unhashes a kernel-chosen port (and address) when the association
/// is dissolved; bind the socket back to the port it had.
fn restore_local_port(socket: &UdpSocket, before: SocketAddr) -> io::Result<()> {
    let after = socket.local_addr()?;
    if after.port() == before.port() {
        return Ok(());
    }
    let rebind = SocketAddr::new(after.ip(), before.port());
    log::debug!("[NET] restoring local port after disconnect: {}", rebind);
    SockRef::from(socket).bind(&rebind.into())
}

#[cfg(not(unix))]
fn dissolve_association(_socket: &UdpSocket) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "datagram disconnect is not supported on this platform",
    ))
}
