// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Readiness selection for datagram channels.
//!
//! A thin, level-triggered selector over `mio::Poll`:
//!
//! ```text
//! select(timeout)
//!   1. drop cancelled keys (deregister their descriptors)
//!   2. re-arm every valid key with its current interest mask
//!   3. mio::Poll::poll
//!   4. translate events into each key's ready mask
//! ```
//!
//! Re-arming on every pass turns mio's edge-triggered registrations into
//! level-triggered reporting: a datagram that is still queued is reported
//! again on the next pass. "Writable" is only reported for keys whose
//! channel counts as connected (see [`SelectionKey`]).

mod key;
mod registration;

pub use key::{Attachment, SelectionKey};
pub use registration::Registrations;

#[cfg(unix)]
pub use selector::Selector;

#[cfg(unix)]
mod selector {
    use super::key::SelectorShared;
    use super::{Attachment, SelectionKey};
    use crate::config::SELECTOR_EVENT_CAPACITY;
    use crate::error::{ChannelError, Result};
    use crate::ops::Ops;
    use crate::traits::Selectable;
    use mio::unix::SourceFd;
    use mio::{Events, Interest, Poll, Registry, Token, Waker};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use std::sync::{Arc, Weak};
    use std::time::Duration;

    /// Token reserved for the wakeup handle.
    const WAKER_TOKEN: Token = Token(0);

    /// First token handed to a key.
    const KEY_TOKEN_START: usize = 1;

    static NEXT_SELECTOR_ID: AtomicU64 = AtomicU64::new(1);

    /// Multiplexes readiness of many registered channels.
    pub struct Selector {
        shared: Arc<SelectorShared>,
        poll: Mutex<Poll>,
        registry: Registry,
        waker: Waker,
        keys: Mutex<HashMap<Token, Arc<SelectionKey>>>,
        selected: Mutex<HashMap<Token, Arc<SelectionKey>>>,
        next_token: AtomicUsize,
        open: AtomicBool,
    }

    impl Selector {
        pub fn open() -> Result<Self> {
            let poll = Poll::new()?;
            let registry = poll.registry().try_clone()?;
            let waker = Waker::new(poll.registry(), WAKER_TOKEN)?;
            let id = NEXT_SELECTOR_ID.fetch_add(1, Ordering::Relaxed);
            log::debug!("[SELECT] selector {} opened", id);
            Ok(Self {
                shared: Arc::new(SelectorShared::new(id)),
                poll: Mutex::new(poll),
                registry,
                waker,
                keys: Mutex::new(HashMap::new()),
                selected: Mutex::new(HashMap::new()),
                next_token: AtomicUsize::new(KEY_TOKEN_START),
                open: AtomicBool::new(true),
            })
        }

        #[must_use]
        pub fn id(&self) -> u64 {
            self.shared.id
        }

        #[must_use]
        pub fn is_open(&self) -> bool {
            self.open.load(Ordering::Acquire)
        }

        fn check_open(&self) -> Result<()> {
            if self.is_open() {
                Ok(())
            } else {
                Err(ChannelError::Closed)
            }
        }

        /// Register `channel` for `ops`.
        ///
        /// The channel must be open and non-blocking. Registering a channel
        /// that already has a valid key with this selector updates that
        /// key's interest (and attachment, when one is given) and returns it.
        pub fn register<C>(
            &self,
            channel: &Arc<C>,
            ops: Ops,
            attachment: Option<Attachment>,
        ) -> Result<Arc<SelectionKey>>
        where
            C: Selectable + 'static,
        {
            self.check_open()?;
            if !channel.is_open() {
                return Err(ChannelError::Closed);
            }
            let valid = channel.valid_ops();
            if !ops.is_subset_of(valid) {
                return Err(ChannelError::IllegalArgument(format!(
                    "interest {} outside valid ops {}",
                    ops, valid
                )));
            }
            if channel.raw_fd().is_none() {
                return Err(ChannelError::Io(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "channel has no pollable descriptor",
                )));
            }

            let weak: Weak<C> = Arc::downgrade(channel);
            let (key, existing) = channel.registrations().register(self.shared.id, || {
                let token = Token(self.next_token.fetch_add(1, Ordering::Relaxed));
                let key = Arc::new(SelectionKey::new(
                    token,
                    weak,
                    Arc::clone(&self.shared),
                    ops,
                    attachment.clone(),
                ));
                self.keys.lock().insert(token, Arc::clone(&key));
                Ok(key)
            })?;

            if existing {
                key.set_interest_ops(ops)?;
                if attachment.is_some() {
                    key.attach(attachment);
                }
            }
            log::debug!(
                "[SELECT] selector {} registered key {:?} interest={} existing={}",
                self.shared.id,
                key.token(),
                ops,
                existing
            );
            Ok(key)
        }

        /// Block until at least one key is ready, `timeout` elapses, or
        /// [`wakeup`](Self::wakeup) is called. Returns the number of keys
        /// whose ready mask was updated.
        pub fn select(&self, timeout: Option<Duration>) -> Result<usize> {
            self.check_open()?;
            let mut poll = self.poll.lock();
            self.process_cancelled();
            self.arm_keys();

            let mut events = Events::with_capacity(SELECTOR_EVENT_CAPACITY);
            match poll.poll(&mut events, timeout) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(0),
                Err(e) => return Err(e.into()),
            }
            drop(poll);

            self.process_cancelled();
            let keys = self.keys.lock();
            let mut selected = self.selected.lock();
            let mut updated = 0;
            for event in events.iter() {
                let token = event.token();
                if token == WAKER_TOKEN {
                    continue;
                }
                let Some(key) = keys.get(&token) else {
                    continue;
                };
                if !key.is_valid() {
                    continue;
                }
                let interest = key.interest_ops_no_check();
                let mut ready = Ops::NONE;
                if interest.contains(Ops::READ)
                    && (event.is_readable() || event.is_read_closed() || event.is_error())
                {
                    ready |= Ops::READ;
                }
                if interest.contains(Ops::WRITE) && event.is_writable() && key.is_connected() {
                    ready |= Ops::WRITE;
                }
                if ready.is_empty() {
                    continue;
                }
                if selected.contains_key(&token) {
                    key.add_ready_ops(ready);
                } else {
                    key.set_ready_ops(ready);
                    selected.insert(token, Arc::clone(key));
                }
                updated += 1;
            }
            log::trace!(
                "[SELECT] selector {} pass: {} events, {} keys updated",
                self.shared.id,
                events.iter().count(),
                updated
            );
            Ok(updated)
        }

        /// Non-blocking select.
        pub fn select_now(&self) -> Result<usize> {
            self.select(Some(Duration::ZERO))
        }

        /// Make a blocked (or the next) `select` return immediately.
        pub fn wakeup(&self) -> Result<()> {
            self.waker.wake()?;
            Ok(())
        }

        /// Keys found ready since the selected set was last drained.
        #[must_use]
        pub fn selected_keys(&self) -> Vec<Arc<SelectionKey>> {
            self.selected.lock().values().cloned().collect()
        }

        /// Drain the selected set.
        pub fn take_selected_keys(&self) -> Vec<Arc<SelectionKey>> {
            self.selected.lock().drain().map(|(_, key)| key).collect()
        }

        /// Every key still registered (cancelled keys linger until the next
        /// select pass).
        #[must_use]
        pub fn keys(&self) -> Vec<Arc<SelectionKey>> {
            self.keys.lock().values().cloned().collect()
        }

        /// Cancel every key and refuse further use. Idempotent.
        pub fn close(&self) -> Result<()> {
            if !self.open.swap(false, Ordering::AcqRel) {
                return Ok(());
            }
            self.waker.wake()?;
            let _poll = self.poll.lock();
            let keys: Vec<_> = self.keys.lock().values().cloned().collect();
            for key in &keys {
                key.cancel();
            }
            self.process_cancelled();
            log::debug!("[SELECT] selector {} closed", self.shared.id);
            Ok(())
        }

        fn process_cancelled(&self) {
            let tokens: Vec<Token> = std::mem::take(&mut *self.shared.cancelled.lock());
            if tokens.is_empty() {
                return;
            }
            let mut keys = self.keys.lock();
            let mut selected = self.selected.lock();
            for token in tokens {
                selected.remove(&token);
                let Some(key) = keys.remove(&token) else {
                    continue;
                };
                if key.is_armed() {
                    self.disarm(&key);
                }
            }
        }

        fn arm_keys(&self) {
            let keys: Vec<_> = self.keys.lock().values().cloned().collect();
            for key in keys {
                if !key.is_valid() {
                    continue;
                }
                let fd = match key.channel() {
                    Some(channel) if channel.is_open() => channel.raw_fd(),
                    _ => None,
                };
                let Some(fd) = fd else {
                    key.cancel();
                    continue;
                };
                match to_interest(key.interest_ops_no_check()) {
                    Some(interest) => {
                        let result = if key.is_armed() {
                            self.registry
                                .reregister(&mut SourceFd(&fd), key.token(), interest)
                        } else {
                            self.registry
                                .register(&mut SourceFd(&fd), key.token(), interest)
                        };
                        match result {
                            Ok(()) => key.set_armed(true),
                            Err(e) => {
                                log::debug!(
                                    "[SELECT] arming key {:?} fd={} failed: {}",
                                    key.token(),
                                    fd,
                                    e
                                );
                                key.cancel();
                            }
                        }
                    }
                    None => {
                        if key.is_armed() {
                            self.disarm(&key);
                        }
                    }
                }
            }
        }

        fn disarm(&self, key: &SelectionKey) {
            key.set_armed(false);
            let fd = key.channel().and_then(|channel| channel.raw_fd());
            if let Some(fd) = fd {
                // A closed descriptor has already left the poller.
                if let Err(e) = self.registry.deregister(&mut SourceFd(&fd)) {
                    log::trace!("[SELECT] deregister fd={} ignored: {}", fd, e);
                }
            }
        }
    }

    impl Drop for Selector {
        fn drop(&mut self) {
            if let Err(e) = self.close() {
                log::warn!("[SELECT] selector {} close failed: {}", self.shared.id, e);
            }
        }
    }

    fn to_interest(ops: Ops) -> Option<Interest> {
        match (ops.contains(Ops::READ), ops.contains(Ops::WRITE)) {
            (true, true) => Some(Interest::READABLE | Interest::WRITABLE),
            (true, false) => Some(Interest::READABLE),
            (false, true) => Some(Interest::WRITABLE),
            (false, false) => None,
        }
    }

}
