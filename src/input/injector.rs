// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic key press injection with modifier chording.
//!
//! A click on a key is sent as one batch:
//!
//! 1. press every held modifier, in held-set order
//! 2. press then release the target key
//! 3. release every held modifier, in the same order as step 1
//!
//! Modifiers are released in press order, not reversed.
//!
//! # Example
//!
//! ```rust,ignore
//! use vkbd::input::{HeldModifierSet, KeyInjector};
//!
//! let injector = KeyInjector::new(host);
//! let held = HeldModifierSet::from_codes([37, 50]); // Ctrl + Shift
//! let code = injector.inject(24, &held)?;          // Ctrl+Shift+q
//! ```

use super::{HostQueryError, InputHost, KeyEvent};
use std::sync::Arc;

/// Key codes of the modifier buttons checked at injection time.
///
/// Iteration order is the order the modifiers were added, which callers
/// build from button document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeldModifierSet {
    codes: Vec<u32>,
}

impl HeldModifierSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from codes in order; duplicates keep their first position.
    #[must_use]
    pub fn from_codes(codes: impl IntoIterator<Item = u32>) -> Self {
        let mut set = Self::new();
        for code in codes {
            set.push(code);
        }
        set
    }

    pub fn push(&mut self, code: u32) {
        if !self.codes.contains(&code) {
            self.codes.push(code);
        }
    }

    #[must_use]
    pub fn contains(&self, code: u32) -> bool {
        self.codes.contains(&code)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.codes.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Sends chorded key presses to the host.
#[derive(Clone)]
pub struct KeyInjector {
    host: Arc<dyn InputHost>,
}

impl std::fmt::Debug for KeyInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyInjector").finish_non_exhaustive()
    }
}

impl KeyInjector {
    #[must_use]
    pub fn new(host: Arc<dyn InputHost>) -> Self {
        Self { host }
    }

    /// Builds the event batch for one key press.
    ///
    /// # Arguments
    ///
    /// * `code` - Target X11 keycode
    /// * `held` - Modifiers to hold around the key
    ///
    /// # Returns
    ///
    /// `press(m..)`, `press(code)`, `release(code)`, `release(m..)` with the
    /// modifiers in held-set order in both phases.
    #[must_use]
    pub fn event_sequence(code: u32, held: &HeldModifierSet) -> Vec<KeyEvent> {
        let mut events = Vec::with_capacity(held.len() * 2 + 2);
        events.extend(held.iter().map(KeyEvent::press));
        events.push(KeyEvent::press(code));
        events.push(KeyEvent::release(code));
        events.extend(held.iter().map(KeyEvent::release));
        events
    }

    /// Injects one key press with `held` modifiers chorded around it.
    ///
    /// # Returns
    ///
    /// The injected key code, for the completion notification.
    ///
    /// # Errors
    ///
    /// Propagates the host failure; nothing is retried.
    pub fn inject(&self, code: u32, held: &HeldModifierSet) -> Result<u32, HostQueryError> {
        let events = Self::event_sequence(code, held);
        tracing::debug!(
            "Injecting keycode {} with {} held modifier(s)",
            code,
            held.len()
        );
        self.host.send_key_events(&events)?;
        Ok(code)
    }
}

// ============================================================================
// Tests
// ============================================================================
