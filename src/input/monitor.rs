// SPDX-License-Identifier: GPL-3.0-only

//! Host lock-key and keyboard-layout state.
//!
//! [`HostStateMonitor`] is the single owner of the lock-key snapshot and the
//! host layout list. It is driven from the event loop:
//!
//! - on every poll tick, [`HostStateMonitor::poll`] re-queries the tracked
//!   lock keys and returns the full snapshot only when an entry changed
//! - on a "layout list changed" notification,
//!   [`HostStateMonitor::rebuild_layouts`] replaces the list
//! - on a "layout changed" notification,
//!   [`HostStateMonitor::resolve_current_layout`] looks the reported name up
//!   in that list, falling back to index 0 / `"us"`
//!
//! Polling can be stopped and restarted; a stopped monitor ignores ticks.

use super::{HostQueryError, InputHost, LockKey};
use crate::app_settings::FALLBACK_LAYOUT;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Lock-key name to on/off, e.g. `{"capslock": true, "numlock": false}`.
pub type HostModifierState = BTreeMap<String, bool>;

/// The active host keyboard layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutSelection {
    /// Position in the host layout list
    pub index: usize,
    pub name: String,
}

impl Default for LayoutSelection {
    fn default() -> Self {
        Self {
            index: 0,
            name: FALLBACK_LAYOUT.to_string(),
        }
    }
}

/// Polling state of the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Polling,
}

/// Owner of host modifier/lock state and layout selection.
pub struct HostStateMonitor {
    host: Arc<dyn InputHost>,
    tracked: Vec<LockKey>,
    snapshot: HostModifierState,
    layouts: Vec<String>,
    selection: LayoutSelection,
    state: MonitorState,
}

impl std::fmt::Debug for HostStateMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostStateMonitor")
            .field("tracked", &self.tracked)
            .field("snapshot", &self.snapshot)
            .field("layouts", &self.layouts)
            .field("selection", &self.selection)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl HostStateMonitor {
    /// Creates an idle monitor tracking caps lock and num lock.
    #[must_use]
    pub fn new(host: Arc<dyn InputHost>) -> Self {
        Self::with_tracked(host, LockKey::ALL.to_vec())
    }

    /// Creates an idle monitor for `tracked`; every key starts off.
    #[must_use]
    pub fn with_tracked(host: Arc<dyn InputHost>, tracked: Vec<LockKey>) -> Self {
        let snapshot = tracked
            .iter()
            .map(|key| (key.name().to_string(), false))
            .collect();

        Self {
            host,
            tracked,
            snapshot,
            layouts: Vec::new(),
            selection: LayoutSelection::default(),
            state: MonitorState::Idle,
        }
    }

    pub fn start(&mut self) {
        if self.state == MonitorState::Idle {
            tracing::debug!("Host state polling started");
        }
        self.state = MonitorState::Polling;
    }

    pub fn stop(&mut self) {
        if self.state == MonitorState::Polling {
            tracing::debug!("Host state polling stopped");
        }
        self.state = MonitorState::Idle;
    }

    #[must_use]
    pub fn state(&self) -> MonitorState {
        self.state
    }

    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.state == MonitorState::Polling
    }

    /// Runs one poll cycle.
    ///
    /// A lock key the host has no mapping for reads as off. Any other query
    /// failure keeps the key's previous value.
    ///
    /// # Returns
    ///
    /// The full snapshot when any tracked entry differs from the previous
    /// poll, `None` when nothing changed or the monitor is idle.
    pub fn poll(&mut self) -> Option<HostModifierState> {
        if !self.is_polling() {
            return None;
        }

        let mut next = self.snapshot.clone();
        for key in &self.tracked {
            match self.host.query_lock(*key) {
                Ok(on) => {
                    next.insert(key.name().to_string(), on);
                }
                Err(HostQueryError::NoSymbol(keysym)) => {
                    tracing::trace!("{} has no mapping (keysym 0x{:04x})", key, keysym);
                    next.insert(key.name().to_string(), false);
                }
                Err(e) => tracing::debug!("Unable to query {}: {}", key, e),
            }
        }

        if next == self.snapshot {
            return None;
        }

        tracing::debug!("Host modifier state changed: {:?}", next);
        self.snapshot = next;
        Some(self.snapshot.clone())
    }

    /// Most recent lock-key snapshot.
    #[must_use]
    pub fn snapshot(&self) -> &HostModifierState {
        &self.snapshot
    }

    /// Whether a lock key was on at the last poll.
    #[must_use]
    pub fn is_on(&self, key: LockKey) -> bool {
        self.snapshot.get(key.name()).copied().unwrap_or(false)
    }

    /// Replaces the ordered host layout list.
    ///
    /// A failed query keeps the previous list.
    pub fn rebuild_layouts(&mut self, reply: Result<Vec<String>, HostQueryError>) {
        match reply {
            Ok(layouts) => {
                tracing::debug!("Host layouts: {:?}", layouts);
                self.layouts = layouts;
            }
            Err(e) => tracing::warn!("Keeping host layouts {:?}: {}", self.layouts, e),
        }
    }

    /// Resolves the reported current layout name against the layout list.
    ///
    /// A failed query, an empty name, or a name missing from the list selects
    /// index 0 / `"us"`.
    pub fn resolve_current_layout(
        &mut self,
        reply: Result<String, HostQueryError>,
    ) -> LayoutSelection {
        self.selection = match reply {
            Ok(name) => match self.layouts.iter().position(|l| *l == name) {
                Some(index) if !name.is_empty() => LayoutSelection { index, name },
                _ => {
                    tracing::debug!("Layout '{}' is not in the host layout list", name);
                    LayoutSelection::default()
                }
            },
            Err(e) => {
                tracing::warn!("Unable to query the current layout: {}", e);
                LayoutSelection::default()
            }
        };
        self.selection.clone()
    }

    #[must_use]
    pub fn selection(&self) -> &LayoutSelection {
        &self.selection
    }

    #[must_use]
    pub fn layouts(&self) -> &[String] {
        &self.layouts
    }
}

// ============================================================================
// Tests
// ============================================================================
