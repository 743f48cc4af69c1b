// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-channel registration bookkeeping.
//!
//! Blocking mode and the set of selection keys live under one lock: a
//! channel may only be registered while non-blocking, and may not go back
//! to blocking while any of its keys is still valid.

use super::key::SelectionKey;
use crate::error::{ChannelError, Result};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Keys a channel is registered under, plus its blocking flag.
pub struct Registrations {
    inner: Mutex<RegistrationState>,
}

struct RegistrationState {
    blocking: bool,
    keys: Vec<Weak<SelectionKey>>,
}

impl RegistrationState {
    fn prune(&mut self) {
        self.keys
            .retain(|k| k.upgrade().is_some_and(|key| key.is_valid()));
    }
}

impl Registrations {
    pub(crate) fn new(blocking: bool) -> Self {
        Self {
            inner: Mutex::new(RegistrationState {
                blocking,
                keys: Vec::new(),
            }),
        }
    }

    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.inner.lock().blocking
    }

    /// Whether any key is still valid.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        let mut state = self.inner.lock();
        state.prune();
        !state.keys.is_empty()
    }

    /// Number of valid keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        let mut state = self.inner.lock();
        state.prune();
        state.keys.len()
    }

    /// Change blocking mode; `apply` pushes the change down to the socket and
    /// runs under the registration lock.
    pub(crate) fn set_blocking(
        &self,
        blocking: bool,
        apply: impl FnOnce(bool) -> Result<()>,
    ) -> Result<()> {
        let mut state = self.inner.lock();
        if state.blocking == blocking {
            return Ok(());
        }
        state.prune();
        if blocking && !state.keys.is_empty() {
            return Err(ChannelError::IllegalBlockingMode);
        }
        apply(blocking)?;
        state.blocking = blocking;
        Ok(())
    }

    /// Return the valid key held for `selector_id`, or create one.
    ///
    /// The second element is `true` when an existing key was returned.
    pub(crate) fn register(
        &self,
        selector_id: u64,
        create: impl FnOnce() -> Result<Arc<SelectionKey>>,
    ) -> Result<(Arc<SelectionKey>, bool)> {
        let mut state = self.inner.lock();
        if state.blocking {
            return Err(ChannelError::IllegalBlockingMode);
        }
        state.prune();
        let existing = state
            .keys
            .iter()
            .filter_map(Weak::upgrade)
            .find(|key| key.selector_id() == selector_id);
        if let Some(key) = existing {
            return Ok((key, true));
        }
        let key = create()?;
        state.keys.push(Arc::downgrade(&key));
        Ok((key, false))
    }

    /// Valid key held for `selector_id`, if any.
    #[must_use]
    pub fn key_for(&self, selector_id: u64) -> Option<Arc<SelectionKey>> {
        let mut state = self.inner.lock();
        state.prune();
        state
            .keys
            .iter()
            .filter_map(Weak::upgrade)
            .find(|key| key.selector_id() == selector_id)
    }

    /// Cancel every key (channel is closing).
    pub(crate) fn cancel_all(&self) {
        let keys: Vec<_> = {
            let mut state = self.inner.lock();
            state.keys.drain(..).filter_map(|k| k.upgrade()).collect()
        };
        for key in keys {
            key.cancel();
        }
    }
}
