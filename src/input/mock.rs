// SPDX-License-Identifier: GPL-3.0-only

//! In-memory [`InputHost`] for tests.
//!
//! [`MockHost`] never touches a display. Sent events, lock queries and
//! destroyed windows are recorded so assertions can check exactly what was
//! sent and in what order. Lock states and keyboard mappings are scripted
//! with [`MockHost::set_lock`] and [`MockHost::set_mapping`].
//!
//! [`MockHost::failing`] (or [`MockHost::set_failing`]) makes every call
//! return [`HostQueryError::DisplayUnavailable`].

use super::{HostQueryError, InputHost, KeyEvent, LockKey};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Recording host used by unit and integration tests.
#[derive(Debug, Default)]
pub struct MockHost {
    /// Every batch passed to `send_key_events`, one entry per call.
    pub sent: Mutex<Vec<Vec<KeyEvent>>>,
    /// Every lock key passed to `query_lock`.
    pub lock_queries: Mutex<Vec<LockKey>>,
    /// Names passed to `destroy_window_named`.
    pub destroy_requests: Mutex<Vec<String>>,
    locks: Mutex<BTreeMap<LockKey, bool>>,
    unmapped: Mutex<BTreeSet<LockKey>>,
    mappings: Mutex<HashMap<u32, Vec<u32>>>,
    windows: Mutex<Vec<String>>,
    /// When set, every call fails as if the display were gone.
    should_fail: AtomicBool,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A host whose every call fails.
    #[must_use]
    pub fn failing() -> Self {
        let host = Self::default();
        host.set_failing(true);
        host
    }

    /// Switches forced failure on or off.
    pub fn set_failing(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    fn fails(&self) -> bool {
        self.should_fail.load(Ordering::SeqCst)
    }

    pub fn set_lock(&self, key: LockKey, on: bool) {
        guard(&self.locks).insert(key, on);
    }

    /// Makes `query_lock` report that the host has no mapping for `key`.
    pub fn set_unmapped(&self, key: LockKey) {
        guard(&self.unmapped).insert(key);
    }

    /// Scripts the keysym slots returned for `keycode`.
    pub fn set_mapping(&self, keycode: u32, keysyms: Vec<u32>) {
        guard(&self.mappings).insert(keycode, keysyms);
    }

    /// Adds a top-level window that `destroy_window_named` can find.
    pub fn add_window(&self, name: &str) {
        guard(&self.windows).push(name.to_string());
    }

    /// All sent events flattened into one sequence.
    #[must_use]
    pub fn events(&self) -> Vec<KeyEvent> {
        guard(&self.sent).iter().flatten().copied().collect()
    }

    /// Number of `send_key_events` calls, i.e. connections opened for injection.
    #[must_use]
    pub fn send_count(&self) -> usize {
        guard(&self.sent).len()
    }

    #[must_use]
    pub fn lock_query_count(&self) -> usize {
        guard(&self.lock_queries).len()
    }

    #[must_use]
    pub fn windows(&self) -> Vec<String> {
        guard(&self.windows).clone()
    }
}

impl InputHost for MockHost {
    fn query_lock(&self, key: LockKey) -> Result<bool, HostQueryError> {
        if self.fails() {
            return Err(HostQueryError::DisplayUnavailable);
        }
        guard(&self.lock_queries).push(key);
        if guard(&self.unmapped).contains(&key) {
            return Err(HostQueryError::NoSymbol(key.keysym()));
        }
        Ok(guard(&self.locks).get(&key).copied().unwrap_or(false))
    }

    fn keyboard_mapping(&self, keycode: u32) -> Result<Vec<u32>, HostQueryError> {
        if self.fails() {
            return Err(HostQueryError::DisplayUnavailable);
        }
        Ok(guard(&self.mappings)
            .get(&keycode)
            .cloned()
            .unwrap_or_default())
    }

    fn send_key_events(&self, events: &[KeyEvent]) -> Result<(), HostQueryError> {
        if self.fails() {
            return Err(HostQueryError::DisplayUnavailable);
        }
        guard(&self.sent).push(events.to_vec());
        Ok(())
    }

    fn destroy_window_named(&self, name: &str) -> Result<bool, HostQueryError> {
        if self.fails() {
            return Err(HostQueryError::DisplayUnavailable);
        }
        guard(&self.destroy_requests).push(name.to_string());

        let mut windows = guard(&self.windows);
        match windows.iter().position(|w| w == name) {
            Some(pos) => {
                windows.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
