// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Selection keys: the (channel, selector) registration record.
//!
//! ```text
//!   Selector ---owns---> SelectionKey ---weak---> channel
//!       ^                    |
//!       +--- keys lock ------+   (interest mask writes)
//!       +--- cancel queue ---+   (deregistration on next select)
//! ```
//!
//! The interest mask is only written while the selector's keys lock is held,
//! because the selector's poll loop reads it from another thread. The ready
//! mask is only written by the selector.

use crate::error::{ChannelError, Result};
use crate::ops::Ops;
use crate::traits::Selectable;
use mio::Token;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};

/// Opaque value carried by a key on behalf of the caller.
pub type Attachment = Arc<dyn Any + Send + Sync>;

/// Selector state a key needs to reach without owning the selector.
pub(crate) struct SelectorShared {
    pub(crate) id: u64,
    pub(crate) keys_lock: Mutex<()>,
    pub(crate) cancelled: Mutex<Vec<Token>>,
}

impl SelectorShared {
    pub(crate) fn new(id: u64) -> Self {
        Self {
            id,
            keys_lock: Mutex::new(()),
            cancelled: Mutex::new(Vec::new()),
        }
    }
}

/// Registration of one channel with one selector.
pub struct SelectionKey {
    token: Token,
    selector_id: u64,
    channel: Weak<dyn Selectable>,
    selector: Arc<SelectorShared>,
    interest: AtomicU32,
    ready: AtomicU32,
    valid: AtomicBool,
    /// Whether the descriptor is currently armed in the poller.
    armed: AtomicBool,
    attachment: Mutex<Option<Attachment>>,
}

impl SelectionKey {
    pub(crate) fn new(
        token: Token,
        channel: Weak<dyn Selectable>,
        selector: Arc<SelectorShared>,
        interest: Ops,
        attachment: Option<Attachment>,
    ) -> Self {
        Self {
            token,
            selector_id: selector.id,
            channel,
            selector,
            interest: AtomicU32::new(interest.bits()),
            ready: AtomicU32::new(0),
            valid: AtomicBool::new(true),
            armed: AtomicBool::new(false),
            attachment: Mutex::new(attachment),
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn check_valid(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ChannelError::CancelledKey)
        }
    }

    /// Current interest mask.
    pub fn interest_ops(&self) -> Result<Ops> {
        self.check_valid()?;
        Ok(self.interest_ops_no_check())
    }

    /// Interest mask without the validity check (selector poll loop).
    pub(crate) fn interest_ops_no_check(&self) -> Ops {
        let _guard = self.selector.keys_lock.lock();
        Ops::from_bits(self.interest.load(Ordering::Acquire))
    }

    /// Replace the interest mask. Bits outside the channel's `valid_ops()`
    /// are rejected and the previous mask is kept.
    pub fn set_interest_ops(&self, ops: Ops) -> Result<()> {
        self.check_valid()?;
        let channel = self.channel.upgrade().ok_or(ChannelError::CancelledKey)?;
        let valid = channel.valid_ops();
        if !ops.is_subset_of(valid) {
            return Err(ChannelError::IllegalArgument(format!(
                "interest {} outside valid ops {}",
                ops, valid
            )));
        }
        let _guard = self.selector.keys_lock.lock();
        self.interest.store(ops.bits(), Ordering::Release);
        log::trace!("[SELECT] key {:?} interest={}", self.token, ops);
        Ok(())
    }

    /// Operations found ready by the last select pass that touched this key.
    pub fn ready_ops(&self) -> Result<Ops> {
        self.check_valid()?;
        Ok(Ops::from_bits(self.ready.load(Ordering::Acquire)))
    }

    pub(crate) fn set_ready_ops(&self, ops: Ops) {
        self.ready.store(ops.bits(), Ordering::Release);
    }

    pub(crate) fn add_ready_ops(&self, ops: Ops) {
        self.ready.fetch_or(ops.bits(), Ordering::AcqRel);
    }

    pub fn is_readable(&self) -> Result<bool> {
        Ok(self.ready_ops()?.contains(Ops::READ))
    }

    pub fn is_writable(&self) -> Result<bool> {
        Ok(self.ready_ops()?.contains(Ops::WRITE))
    }

    /// Invalidate the key; the selector drops it on its next pass.
    /// Idempotent.
    pub fn cancel(&self) {
        if self.valid.swap(false, Ordering::AcqRel) {
            self.selector.cancelled.lock().push(self.token);
            log::debug!("[SELECT] key {:?} cancelled", self.token);
        }
    }

    /// The registered channel, while it is still alive.
    #[must_use]
    pub fn channel(&self) -> Option<Arc<dyn Selectable>> {
        self.channel.upgrade()
    }

    /// Replace the attachment, returning the previous one.
    pub fn attach(&self, attachment: Option<Attachment>) -> Option<Attachment> {
        std::mem::replace(&mut *self.attachment.lock(), attachment)
    }

    #[must_use]
    pub fn attachment(&self) -> Option<Attachment> {
        self.attachment.lock().clone()
    }

    /// Whether "writable" is meaningful yet: always for connectionless
    /// channels, otherwise only once connected.
    pub(crate) fn is_connected(&self) -> bool {
        match self.channel.upgrade() {
            Some(channel) => !channel.is_connection_oriented() || channel.is_connected(),
            None => false,
        }
    }

    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    #[must_use]
    pub fn selector_id(&self) -> u64 {
        self.selector_id
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub(crate) fn set_armed(&self, armed: bool) {
        self.armed.store(armed, Ordering::Release);
    }
}

impl fmt::Debug for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionKey")
            .field("token", &self.token)
            .field("selector_id", &self.selector_id)
            .field(
                "interest",
                &Ops::from_bits(self.interest.load(Ordering::Relaxed)),
            )
            .field("ready", &Ops::from_bits(self.ready.load(Ordering::Relaxed)))
            .field("valid", &self.is_valid())
            .finish()
    }
}
