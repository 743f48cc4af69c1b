// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Close gate and blocking-section bracket.
//!
//! # State Machine
//!
//! ```text
//!   +------+   close()   +---------+   handle closed   +--------+
//!   | Open |------------>| Closing |------------------>| Closed |
//!   +------+             +---------+                   +--------+
//! ```
//!
//! Every potentially blocking OS call runs inside a [`BlockingSection`]
//! obtained from [`CloseGate::begin`]. Dropping the section is the "end" half
//! of the bracket, so the in-flight count stays balanced on every exit path,
//! including `?` and panics. A blocked call polls
//! [`BlockingSection::is_interrupted`] between bounded OS waits and gives up
//! once the gate has left `Open`.

use crate::error::{ChannelError, Result};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

const OPEN: u8 = 0;
const CLOSING: u8 = 1;
const CLOSED: u8 = 2;

/// Open-state of a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpenState {
    Open,
    Closing,
    Closed,
}

impl std::fmt::Display for OpenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OpenState::Open => "Open",
            OpenState::Closing => "Closing",
            OpenState::Closed => "Closed",
        };
        write!(f, "{}", s)
    }
}

/// Monotonic open/closing/closed flag plus blocking-section accounting.
#[derive(Debug)]
pub(crate) struct CloseGate {
    state: AtomicU8,
    in_flight: AtomicUsize,
}

impl CloseGate {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(OPEN),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn state(&self) -> OpenState {
        match self.state.load(Ordering::Acquire) {
            OPEN => OpenState::Open,
            CLOSING => OpenState::Closing,
            _ => OpenState::Closed,
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state.load(Ordering::Acquire) == OPEN
    }

    pub(crate) fn check_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(ChannelError::Closed)
        }
    }

    /// Open -> Closing. Returns `false` if someone else already started.
    pub(crate) fn start_close(&self) -> bool {
        self.state
            .compare_exchange(OPEN, CLOSING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Closing -> Closed.
    pub(crate) fn finish_close(&self) {
        self.state.store(CLOSED, Ordering::Release);
    }

    /// Enter a blocking section. Fails if the channel is no longer open.
    pub(crate) fn begin(&self) -> Result<BlockingSection<'_>> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let section = BlockingSection { gate: self };
        if !self.is_open() {
            // `section` drops here and rebalances the count.
            return Err(ChannelError::Closed);
        }
        Ok(section)
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// RAII "begin ... end" bracket around a potentially blocking OS call.
#[derive(Debug)]
pub(crate) struct BlockingSection<'a> {
    gate: &'a CloseGate,
}

impl BlockingSection<'_> {
    /// Whether the channel was closed while this section was active.
    pub(crate) fn is_interrupted(&self) -> bool {
        !self.gate.is_open()
    }
}

impl Drop for BlockingSection<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
