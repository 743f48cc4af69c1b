// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # udpchan - Selectable UDP Datagram Channels
//!
//! Thread-safe UDP channels that can be used in blocking mode, in
//! non-blocking mode, or multiplexed through a [`Selector`]. Any operation
//! blocked on one thread is released within one poll interval when another
//! thread closes the channel.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use udpchan::{ByteBuffer, ByteChannel, DatagramChannel, OsNetwork, Result};
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     let network = Arc::new(OsNetwork::new());
//!
//!     let server = DatagramChannel::open(network.clone())?;
//!     server.bind("127.0.0.1:0".parse().unwrap())?;
//!     let server_addr = server.local_address().unwrap();
//!
//!     let client = DatagramChannel::open(network)?;
//!     client.connect(server_addr)?;
//!     client.write(&mut ByteBuffer::copy_from_slice(b"ping"))?;
//!
//!     let mut buf = ByteBuffer::allocate(1500);
//!     let from = server.receive(&mut buf)?;
//!     println!("{:?} sent {:?}", from, buf.filled());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                        DatagramChannel                              |
//! |   bind / connect / disconnect / close | send / receive | read/write |
//! |   DatagramSocketAdapter (socket view) | ByteChannel | Selectable    |
//! +---------------------------------------------------------------------+
//! |          CloseGate (blocking sections)  |  Registrations (keys)     |
//! +---------------------------------------------------------------------+
//! |                         NetworkSystem                               |
//! |   OsNetwork (socket2 / std::net)  |  LoopbackNetwork (in-process)   |
//! +---------------------------------------------------------------------+
//! |                    Selector (mio, unix only)                        |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DatagramChannel`] | UDP channel with connect/bind state and transfers |
//! | [`ByteBuffer`] | Position/limit cursor buffer used by every transfer |
//! | [`SelectionKey`] | Registration of a channel with a selector |
//! | [`Selector`] | Level-triggered readiness multiplexer |
//! | [`NetworkSystem`] | Injected socket factory |
//!
//! ## Logging
//!
//! The crate logs through the `log` facade with `[CHANNEL]`, `[SELECT]` and
//! `[NET]` prefixes. Install any logger (for example `env_logger`) to see
//! them.

// Clippy: No blanket suppressions. Fix issues properly or use inline #[allow] with justification.

/// Peer and destination addresses.
pub mod addr;
/// Cursor buffers and scatter/gather helpers.
pub mod buffer;
/// Datagram channel, its socket adapter and open-state tracking.
pub mod channel;
/// Runtime configuration (poll interval, socket options).
pub mod config;
/// Error type shared by every operation.
pub mod error;
/// Socket backends (OS and in-process loopback).
pub mod net;
/// Interest/readiness operation sets.
pub mod ops;
/// Access checks for connect, send and receive.
pub mod policy;
/// Selection keys and the selector.
pub mod select;
/// Capability traits implemented by channels.
pub mod traits;

pub use addr::Endpoint;
pub use buffer::ByteBuffer;
pub use channel::{
    DatagramChannel, DatagramChannelBuilder, DatagramPacket, DatagramSocketAdapter, OpenState,
};
pub use config::{ChannelConfig, DEFAULT_POLL_INTERVAL, MAX_DATAGRAM_SIZE};
pub use error::{ChannelError, Result};
pub use net::{Family, LoopbackFaults, LoopbackNetwork, NetworkSystem, OsNetwork, SocketHandle};
pub use ops::Ops;
pub use policy::{AccessPolicy, HostAllowList, PermitAll};
pub use select::{Attachment, Registrations, SelectionKey};
#[cfg(unix)]
pub use select::Selector;
pub use traits::{ByteChannel, Selectable};

/// udpchan version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
