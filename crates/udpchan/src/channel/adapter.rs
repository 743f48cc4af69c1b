// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Socket-style facade over a [`DatagramChannel`].
//!
//! The adapter owns nothing: it borrows the channel and forwards to it, so
//! closing either closes both. Packet-level `send`/`receive` require the
//! channel to be in blocking mode.

use super::DatagramChannel;
use crate::buffer::ByteBuffer;
use crate::config::MAX_DATAGRAM_SIZE;
use crate::error::{ChannelError, Result};
use crate::net::Family;
use crate::traits::ByteChannel;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// A payload plus the peer it came from or goes to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DatagramPacket {
    buf: Vec<u8>,
    len: usize,
    address: Option<SocketAddr>,
}

impl DatagramPacket {
    /// Empty packet able to receive up to `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity],
            len: 0,
            address: None,
        }
    }

    /// Outgoing packet. `address` may be omitted on a connected socket.
    #[must_use]
    pub fn new(data: &[u8], address: Option<SocketAddr>) -> Self {
        Self {
            buf: data.to_vec(),
            len: data.len(),
            address,
        }
    }

    /// Payload bytes (for a received packet, the stored datagram).
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn address(&self) -> Option<SocketAddr> {
        self.address
    }

    pub fn set_address(&mut self, address: Option<SocketAddr>) {
        self.address = address;
    }
}

/// Borrowed socket view of a channel.
#[derive(Clone, Copy, Debug)]
pub struct DatagramSocketAdapter<'a> {
    channel: &'a DatagramChannel,
}

impl<'a> DatagramSocketAdapter<'a> {
    pub(crate) fn new(channel: &'a DatagramChannel) -> Self {
        Self { channel }
    }

    /// The channel this socket wraps.
    #[must_use]
    pub fn channel(&self) -> &'a DatagramChannel {
        self.channel
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.channel.is_bound()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        !self.channel.is_open()
    }

    /// Connected peer's address.
    #[must_use]
    pub fn inet_address(&self) -> Option<IpAddr> {
        self.channel.remote_address().map(|addr| addr.ip())
    }

    /// Connected peer's port.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.channel.remote_address().map(|addr| addr.port())
    }

    #[must_use]
    pub fn local_address(&self) -> Option<SocketAddr> {
        self.channel.local_address()
    }

    #[must_use]
    pub fn local_port(&self) -> Option<u16> {
        self.local_address().map(|addr| addr.port())
    }

    /// Bind the wrapped channel. Fails with `AlreadyConnected` once
    /// connected.
    pub fn bind(&self, local: SocketAddr) -> Result<()> {
        self.channel.bind(local)
    }

    pub fn connect(&self, peer: SocketAddr) -> Result<()> {
        self.channel.connect(peer)
    }

    /// Drop the peer association; failures are logged, not reported.
    pub fn disconnect(&self) {
        if let Err(e) = self.channel.disconnect() {
            log::debug!("[CHANNEL] socket disconnect failed: {}", e);
        }
    }

    pub fn close(&self) -> Result<()> {
        self.channel.close()
    }

    /// Send `packet` to its address, or to the peer when connected.
    pub fn send(&self, packet: &DatagramPacket) -> Result<()> {
        self.check_blocking()?;
        if packet.len() > MAX_DATAGRAM_SIZE {
            return Err(ChannelError::IllegalArgument(format!(
                "packet of {} bytes exceeds the maximum datagram size {}",
                packet.len(),
                MAX_DATAGRAM_SIZE
            )));
        }
        let mut buf = ByteBuffer::copy_from_slice(packet.data());
        match (self.channel.remote_address(), packet.address()) {
            (Some(_), None) => {
                self.channel.write(&mut buf)?;
            }
            (_, Some(dest)) => {
                self.channel.send(&mut buf, dest)?;
            }
            (None, None) => {
                return Err(ChannelError::IllegalArgument(
                    "packet has no destination and the socket is not connected".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Block until a datagram arrives and store it in `packet`.
    ///
    /// An unbound socket is first bound to an ephemeral port on the
    /// wildcard address. Fails with `Closed` if the channel is closed while
    /// waiting.
    pub fn receive(&self, packet: &mut DatagramPacket) -> Result<()> {
        self.check_blocking()?;
        if !self.channel.is_bound() {
            let wildcard = match self.channel.family() {
                Family::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                Family::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            };
            match self.channel.bind(SocketAddr::new(wildcard, 0)) {
                Ok(()) | Err(ChannelError::AlreadyBound) => {}
                Err(e) => return Err(e),
            }
        }

        let mut buf = ByteBuffer::wrap(std::mem::take(&mut packet.buf));
        let result = loop {
            match self.channel.receive(&mut buf) {
                Ok(None) if self.channel.is_open() && self.channel.is_blocking() => buf.clear(),
                other => break other,
            }
        };
        let len = buf.position();
        packet.buf = buf.into_vec();
        match result? {
            Some(from) => {
                packet.len = len;
                packet.address = Some(from);
                Ok(())
            }
            None if self.channel.is_open() => Err(ChannelError::IllegalBlockingMode),
            None => Err(ChannelError::Closed),
        }
    }

    fn check_blocking(&self) -> Result<()> {
        if self.channel.is_blocking() {
            Ok(())
        } else {
            Err(ChannelError::IllegalBlockingMode)
        }
    }
}
