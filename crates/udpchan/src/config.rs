// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Channel configuration.
//!
//! # Environment Variables
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `UDPCHAN_POLL_INTERVAL_MS` | Blocking-wait slice in milliseconds (min 1) |
//! | `UDPCHAN_RCVBUF` | `SO_RCVBUF` in bytes |
//! | `UDPCHAN_SNDBUF` | `SO_SNDBUF` in bytes |
//! | `UDPCHAN_REUSEADDR` | `1` enables `SO_REUSEADDR` |
//! | `UDPCHAN_TTL` | Unicast TTL (1-255) |

use std::time::Duration;

/// Default slice a blocking OS call may wait before re-checking for close.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Lower bound for the poll interval (a zero socket timeout means "forever").
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Largest payload a UDP datagram can carry over IPv4.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Maximum readiness events collected per `Selector::select` pass.
pub const SELECTOR_EVENT_CAPACITY: usize = 256;

/// Socket and cancellation settings applied when a channel is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Upper bound on how long a blocking OS call waits before the channel
    /// re-checks whether it was closed. Also bounds how long `close()` waits
    /// for an in-flight OS call.
    pub poll_interval: Duration,
    /// SO_RCVBUF (None = OS default)
    pub recv_buffer_size: Option<usize>,
    /// SO_SNDBUF (None = OS default)
    pub send_buffer_size: Option<usize>,
    /// SO_REUSEADDR
    pub reuse_address: bool,
    /// SO_BROADCAST
    pub broadcast: bool,
    /// IP_TTL (None = OS default)
    pub ttl: Option<u32>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            recv_buffer_size: None,
            send_buffer_size: None,
            reuse_address: false,
            broadcast: false,
            ttl: None,
        }
    }
}

impl ChannelConfig {
    /// Configuration with a custom poll interval and OS defaults otherwise.
    #[must_use]
    pub const fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            recv_buffer_size: None,
            send_buffer_size: None,
            reuse_address: false,
            broadcast: false,
            ttl: None,
        }
    }

    /// Create from environment variables, falling back to defaults for
    /// anything unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ms) = env_parse::<u64>("UDPCHAN_POLL_INTERVAL_MS") {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(size) = env_parse::<usize>("UDPCHAN_RCVBUF") {
            config.recv_buffer_size = Some(size);
        }
        if let Some(size) = env_parse::<usize>("UDPCHAN_SNDBUF") {
            config.send_buffer_size = Some(size);
        }
        if let Ok(val) = std::env::var("UDPCHAN_REUSEADDR") {
            config.reuse_address = val == "1";
        }
        if let Some(ttl) = env_parse::<u8>("UDPCHAN_TTL") {
            config.ttl = Some(u32::from(ttl));
        }

        config.normalized()
    }

    /// Clamp values the OS would reject.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.poll_interval < MIN_POLL_INTERVAL {
            self.poll_interval = MIN_POLL_INTERVAL;
        }
        if self.ttl == Some(0) {
            self.ttl = None;
        }
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
