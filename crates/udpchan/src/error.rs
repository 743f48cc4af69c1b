// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by channels, selection keys and the selector.

use std::io;

/// Errors returned by datagram channel and selector operations.
///
/// State-validation variants (`Closed`, `NotYetConnected`, `AlreadyConnected`,
/// `AlreadyBound`, `IllegalArgument`, ...) are programming errors: the channel
/// state is left unchanged. `Io` wraps failures reported by the socket handle.
///
/// Interrupted blocking waits are never reported through this type; they
/// surface as empty / zero results.
///
/// # Example
///
/// ```rust,no_run
/// use udpchan::{ChannelError, DatagramChannel, OsNetwork};
/// use std::sync::Arc;
///
/// let channel = DatagramChannel::open(Arc::new(OsNetwork::new())).unwrap();
/// match channel.connect("0.0.0.0:9000".parse::<std::net::SocketAddr>().unwrap()) {
///     Err(ChannelError::IllegalArgument(msg)) => println!("rejected: {}", msg),
///     Err(e) => println!("other error: {}", e),
///     Ok(()) => println!("connected"),
/// }
/// ```
#[derive(Debug)]
pub enum ChannelError {
    // ========================================================================
    // Channel state
    // ========================================================================
    /// Operation attempted on a closed (or closing) channel.
    Closed,
    /// Connected-mode operation on an unconnected channel.
    NotYetConnected,
    /// Second `connect`, or `bind` on a connected channel.
    AlreadyConnected,
    /// `bind` on a channel that already has a local address.
    AlreadyBound,
    /// Blocking-only call in non-blocking mode, or switching a registered
    /// channel back to blocking mode.
    IllegalBlockingMode,

    // ========================================================================
    // Arguments
    // ========================================================================
    /// Wildcard connect target, mismatched destination, bad interest mask.
    IllegalArgument(String),
    /// Target host was never resolved to an address.
    UnresolvedAddress(String),
    /// Read-only buffer passed where bytes must be stored.
    UnwritableBuffer,
    /// `offset`/`length` do not describe a range of the buffer slice.
    IndexOutOfBounds {
        /// First buffer index requested
        offset: usize,
        /// Number of buffers requested
        length: usize,
        /// Number of buffers available
        len: usize,
    },

    // ========================================================================
    // Selection
    // ========================================================================
    /// Operation on a cancelled selection key.
    CancelledKey,

    // ========================================================================
    // Environment
    // ========================================================================
    /// Refused by the installed access policy.
    AccessDenied(String),
    /// Failure reported by the socket handle.
    Io(io::Error),
}

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelError::Closed => write!(f, "Channel is closed"),
            ChannelError::NotYetConnected => write!(f, "Channel is not connected"),
            ChannelError::AlreadyConnected => write!(f, "Channel is already connected"),
            ChannelError::AlreadyBound => write!(f, "Channel is already bound"),
            ChannelError::IllegalBlockingMode => write!(f, "Illegal blocking mode"),
            ChannelError::IllegalArgument(msg) => write!(f, "Illegal argument: {}", msg),
            ChannelError::UnresolvedAddress(host) => write!(f, "Unresolved address: {}", host),
            ChannelError::UnwritableBuffer => write!(f, "Buffer is read-only"),
            ChannelError::IndexOutOfBounds {
                offset,
                length,
                len,
            } => write!(
                f,
                "Buffer range out of bounds: offset={} length={} len={}",
                offset, length, len
            ),
            ChannelError::CancelledKey => write!(f, "Selection key is cancelled"),
            ChannelError::AccessDenied(msg) => write!(f, "Access denied: {}", msg),
            ChannelError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ChannelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChannelError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ChannelError {
    fn from(e: io::Error) -> Self {
        ChannelError::Io(e)
    }
}

/// Convenient alias for channel results.
pub type Result<T> = core::result::Result<T, ChannelError>;

/// Whether an OS error means "nothing happened yet, try again".
///
/// Timeouts on a socket with a receive timeout surface as `WouldBlock` on
/// Unix and `TimedOut` on Windows.
pub(crate) fn is_would_block(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
