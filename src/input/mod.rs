// SPDX-License-Identifier: GPL-3.0-only

//! Host input synchronisation and key injection for vkbd.
//!
//! Everything that talks to the host input subsystem goes through the
//! [`InputHost`] trait. The production implementation ([`x11::X11Host`])
//! opens a short-lived Xlib connection per call; tests use
//! [`mock::MockHost`], which records events in memory.
//!
//! # Features
//!
//! - **State monitor**: polls caps/num lock and tracks the host layout list
//!   ([`HostStateMonitor`])
//! - **Key translation**: resolves the unshifted/shifted glyph pair of a key
//!   code for the active layout ([`KeyTranslator`])
//! - **Key injection**: presses held modifiers around a key in a fixed
//!   order ([`KeyInjector`])
//! - **Modifier bookkeeping**: one-shot vs latched modifier buttons
//!   ([`ModifierState`])
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vkbd::input::{HeldModifierSet, KeyInjector, x11::X11Host};
//!
//! let host = Arc::new(X11Host::new());
//! let injector = KeyInjector::new(host);
//!
//! // Shift + a
//! let held = HeldModifierSet::from_codes([50]);
//! injector.inject(38, &held)?;
//! ```

// Sub-modules
pub mod injector;
pub mod mock;
pub mod modifier;
pub mod monitor;
pub mod translate;
#[cfg(target_os = "linux")]
pub mod x11;

// Re-export public API
pub use injector::{HeldModifierSet, KeyInjector};
pub use modifier::{ButtonId, ModifierState};
pub use monitor::{HostModifierState, HostStateMonitor, LayoutSelection};
pub use translate::KeyTranslator;

use xkbcommon::xkb::keysyms;

// ============================================================================
// Key Events
// ============================================================================

/// Direction of a synthesized key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// Key was pressed down.
    Pressed,
    /// Key was released.
    Released,
}

/// One synthesized key event, addressed by X11 keycode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub keycode: u32,
    pub state: KeyState,
}

impl KeyEvent {
    /// Creates a new key press event.
    #[must_use]
    pub fn press(keycode: u32) -> Self {
        Self {
            keycode,
            state: KeyState::Pressed,
        }
    }

    /// Creates a new key release event.
    #[must_use]
    pub fn release(keycode: u32) -> Self {
        Self {
            keycode,
            state: KeyState::Released,
        }
    }

    #[must_use]
    pub fn is_press(&self) -> bool {
        self.state == KeyState::Pressed
    }
}

// ============================================================================
// Lock Keys
// ============================================================================

/// Host lock keys whose state the monitor tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockKey {
    CapsLock,
    NumLock,
}

impl LockKey {
    /// Every tracked lock key, in snapshot order.
    pub const ALL: [LockKey; 2] = [LockKey::CapsLock, LockKey::NumLock];

    /// Name used in state snapshots and as a button `group_name`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            LockKey::CapsLock => "capslock",
            LockKey::NumLock => "numlock",
        }
    }

    /// Keysym of the lock key, used to find its modifier mask.
    #[must_use]
    pub fn keysym(&self) -> u32 {
        match self {
            LockKey::CapsLock => keysyms::KEY_Caps_Lock,
            LockKey::NumLock => keysyms::KEY_Num_Lock,
        }
    }
}

impl std::fmt::Display for LockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failures talking to the host. Callers recover by substituting a safe
/// default and carrying on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostQueryError {
    /// The display connection could not be opened.
    DisplayUnavailable,
    /// The host has no keycode or mask for a keysym.
    NoSymbol(u32),
    /// The keyboard-layout service could not be reached.
    ServiceUnavailable(String),
    /// The host answered with something unusable.
    InvalidReply(String),
}

impl std::fmt::Display for HostQueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostQueryError::DisplayUnavailable => write!(f, "unable to open the host display"),
            HostQueryError::NoSymbol(keysym) => {
                write!(f, "host has no mapping for keysym 0x{:04x}", keysym)
            }
            HostQueryError::ServiceUnavailable(msg) => {
                write!(f, "keyboard layout service unavailable: {}", msg)
            }
            HostQueryError::InvalidReply(msg) => write!(f, "invalid host reply: {}", msg),
        }
    }
}

impl std::error::Error for HostQueryError {}

// ============================================================================
// Host Primitives
// ============================================================================

/// Low-level primitives of the host input subsystem.
///
/// Each call is synchronous and self-contained: implementations open their
/// connection, do the work and close it again before returning.
pub trait InputHost: Send + Sync {
    /// Returns whether a lock key is currently on.
    fn query_lock(&self, key: LockKey) -> Result<bool, HostQueryError>;

    /// Returns every keysym bound to `keycode`, in group/level slot order.
    fn keyboard_mapping(&self, keycode: u32) -> Result<Vec<u32>, HostQueryError>;

    /// Sends the events in order, then flushes.
    fn send_key_events(&self, events: &[KeyEvent]) -> Result<(), HostQueryError>;

    /// Destroys the first top-level window called `name`.
    ///
    /// Returns `true` when a window was found.
    fn destroy_window_named(&self, name: &str) -> Result<bool, HostQueryError>;
}

// ============================================================================
// Module Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Test 1: KeyEvent constructors
    #[test]
    fn test_key_event_construction() {
        let press = KeyEvent::press(42);
        assert_eq!(press.keycode, 42);
        assert_eq!(press.state, KeyState::Pressed);
        assert!(press.is_press());

        let release = KeyEvent::release(42);
        assert_eq!(release.state, KeyState::Released);
        assert!(!release.is_press());
    }

    /// Test 2: Lock key names match button group names
    #[test]
    fn test_lock_key_names() {
        assert_eq!(LockKey::CapsLock.name(), "capslock");
        assert_eq!(LockKey::NumLock.to_string(), "numlock");
        assert_eq!(LockKey::CapsLock.keysym(), 0xffe5);
        assert_eq!(LockKey::NumLock.keysym(), 0xff7f);
    }

    #[test]
    fn test_host_query_error_display() {
        assert_eq!(
            HostQueryError::DisplayUnavailable.to_string(),
            "unable to open the host display"
        );
        assert!(HostQueryError::NoSymbol(0xffe5).to_string().contains("0xffe5"));
    }
}
