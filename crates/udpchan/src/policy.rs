// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Access policy hook consulted on connect, unconnected send and receive.

use crate::error::{ChannelError, Result};
use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};

/// Permission checks applied by a channel.
///
/// - `check_connect` on `connect` and on unconnected `send` to unicast targets
/// - `check_multicast` in place of `check_connect` for multicast targets
/// - `check_accept` for every datagram received while unconnected; a `false`
///   answer discards the datagram
pub trait AccessPolicy: Send + Sync {
    fn check_connect(&self, _target: SocketAddr) -> Result<()> {
        Ok(())
    }

    fn check_multicast(&self, _group: IpAddr) -> Result<()> {
        Ok(())
    }

    fn check_accept(&self, _source: SocketAddr) -> bool {
        true
    }
}

/// Policy that allows everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermitAll;

impl AccessPolicy for PermitAll {}

/// Policy that only talks to a fixed set of hosts.
#[derive(Debug, Default, Clone)]
pub struct HostAllowList {
    hosts: HashSet<IpAddr>,
    allow_multicast: bool,
}

impl HostAllowList {
    #[must_use]
    pub fn new<I: IntoIterator<Item = IpAddr>>(hosts: I) -> Self {
        Self {
            hosts: hosts.into_iter().collect(),
            allow_multicast: false,
        }
    }

    #[must_use]
    pub fn with_multicast(mut self, allow: bool) -> Self {
        self.allow_multicast = allow;
        self
    }
}

impl AccessPolicy for HostAllowList {
    fn check_connect(&self, target: SocketAddr) -> Result<()> {
        if self.hosts.contains(&target.ip()) {
            Ok(())
        } else {
            Err(ChannelError::AccessDenied(format!("connect to {}", target)))
        }
    }

    fn check_multicast(&self, group: IpAddr) -> Result<()> {
        if self.allow_multicast {
            Ok(())
        } else {
            Err(ChannelError::AccessDenied(format!("multicast to {}", group)))
        }
    }

    fn check_accept(&self, source: SocketAddr) -> bool {
        self.hosts.contains(&source.ip())
    }
}

/// Route a destination to the multicast or connect check.
pub(crate) fn check_destination(policy: &dyn AccessPolicy, target: SocketAddr) -> Result<()> {
    if target.ip().is_multicast() {
        policy.check_multicast(target.ip())
    } else {
        policy.check_connect(target)
    }
}
