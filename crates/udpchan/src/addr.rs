// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Remote endpoint addressing.

use crate::error::{ChannelError, Result};
use std::fmt;
use std::net::{IpAddr, SocketAddr, SocketAddrV4, SocketAddrV6};

/// A (host, port) pair, resolved or not.
///
/// Name resolution happens outside this crate; an `Unresolved` endpoint is
/// what callers hold when it failed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Concrete IP address and port.
    Resolved(SocketAddr),
    /// Host name that never resolved.
    Unresolved {
        /// Host name as given
        host: String,
        /// Port as given
        port: u16,
    },
}

impl Endpoint {
    #[must_use]
    pub fn unresolved(host: impl Into<String>, port: u16) -> Self {
        Self::Unresolved {
            host: host.into(),
            port,
        }
    }

    /// Resolved socket address, if any.
    #[must_use]
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        match self {
            Self::Resolved(addr) => Some(*addr),
            Self::Unresolved { .. } => None,
        }
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        match self {
            Self::Resolved(addr) => addr.port(),
            Self::Unresolved { port, .. } => *port,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(addr) => write!(f, "{}", addr),
            Self::Unresolved { host, port } => write!(f, "{}:{} (unresolved)", host, port),
        }
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::Resolved(addr)
    }
}

impl From<SocketAddrV4> for Endpoint {
    fn from(addr: SocketAddrV4) -> Self {
        Self::Resolved(addr.into())
    }
}

impl From<SocketAddrV6> for Endpoint {
    fn from(addr: SocketAddrV6) -> Self {
        Self::Resolved(addr.into())
    }
}

impl From<(IpAddr, u16)> for Endpoint {
    fn from((ip, port): (IpAddr, u16)) -> Self {
        Self::Resolved(SocketAddr::new(ip, port))
    }
}

/// Validate a `connect` target: it must be resolved and name a concrete
/// host (not the wildcard address).
pub(crate) fn validate_connect_target(target: &Endpoint) -> Result<SocketAddr> {
    let addr = match target {
        Endpoint::Resolved(addr) => *addr,
        Endpoint::Unresolved { host, port } => {
            return Err(ChannelError::UnresolvedAddress(format!("{}:{}", host, port)))
        }
    };
    if addr.ip().is_unspecified() {
        return Err(ChannelError::IllegalArgument(format!(
            "cannot connect to wildcard address {}",
            addr
        )));
    }
    Ok(addr)
}

/// Resolve a send destination; a missing host is an I/O failure there.
pub(crate) fn resolve_destination(target: &Endpoint) -> Result<SocketAddr> {
    target.socket_addr().ok_or_else(|| {
        ChannelError::Io(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            format!("destination {} has no address", target),
        ))
    })
}
