// SPDX-License-Identifier: GPL-3.0-only

//! Modifier button bookkeeping.
//!
//! Tracks which modifier buttons are checked and whether each one should be
//! released after the next key press (one-shot) or stay checked until it is
//! clicked again (latched). Buttons are keyed by [`ButtonId`], whose ordering
//! is document order, so [`ModifierState::held`] yields modifiers in the
//! order their buttons appear in the theme.
//!
//! # Example
//!
//! ```rust,ignore
//! use vkbd::input::{ButtonId, ModifierState};
//! use vkbd::layout::PartKind;
//!
//! let mut state = ModifierState::new();
//! state.activate(ButtonId::new(PartKind::Main, 40), 50, true);
//!
//! // ... key injected with state.held() ...
//!
//! let released = state.clear_one_shot();
//! ```

use super::injector::HeldModifierSet;
use crate::app_settings::SHIFT_KEYCODES;
use crate::layout::PartKind;
use std::collections::{BTreeMap, BTreeSet};

/// Position of a button within the loaded keyboard.
///
/// Orders main-part buttons before extension buttons, then by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ButtonId {
    pub part: PartKind,
    pub index: usize,
}

impl ButtonId {
    #[must_use]
    pub fn new(part: PartKind, index: usize) -> Self {
        Self { part, index }
    }
}

/// Checked modifier buttons and their release behaviour.
#[derive(Debug, Clone, Default)]
pub struct ModifierState {
    /// Checked modifier buttons and their key codes
    active: BTreeMap<ButtonId, u32>,
    /// Buttons released after the next injected key
    one_shot: BTreeSet<ButtonId>,
}

impl ModifierState {
    /// Creates a new `ModifierState` with no active modifiers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Activates a modifier button.
    ///
    /// # Arguments
    ///
    /// * `id` - The modifier button
    /// * `code` - Its key code
    /// * `one_shot` - If `true`, the modifier is released after the next key
    ///   press. If `false`, it stays active until deactivated.
    pub fn activate(&mut self, id: ButtonId, code: u32, one_shot: bool) {
        self.active.insert(id, code);
        if one_shot {
            self.one_shot.insert(id);
        } else {
            self.one_shot.remove(&id);
        }
    }

    /// Deactivates a modifier button.
    pub fn deactivate(&mut self, id: ButtonId) {
        self.active.remove(&id);
        self.one_shot.remove(&id);
    }

    /// Toggles a modifier button.
    ///
    /// # Returns
    ///
    /// `true` if the modifier is now active, `false` if it is now inactive
    pub fn toggle(&mut self, id: ButtonId, code: u32, one_shot: bool) -> bool {
        if self.active.contains_key(&id) {
            self.deactivate(id);
            false
        } else {
            self.activate(id, code, one_shot);
            true
        }
    }

    #[must_use]
    pub fn is_active(&self, id: ButtonId) -> bool {
        self.active.contains_key(&id)
    }

    #[must_use]
    pub fn is_one_shot(&self, id: ButtonId) -> bool {
        self.one_shot.contains(&id)
    }

    /// Key codes of the active modifiers in document order.
    #[must_use]
    pub fn held(&self) -> HeldModifierSet {
        HeldModifierSet::from_codes(self.active.values().copied())
    }

    /// Whether any active modifier is a Shift key.
    #[must_use]
    pub fn shift_active(&self) -> bool {
        self.active.values().any(|code| SHIFT_KEYCODES.contains(code))
    }

    /// Releases all one-shot modifiers.
    ///
    /// # Returns
    ///
    /// The released buttons, so their checked state can be cleared.
    pub fn clear_one_shot(&mut self) -> Vec<ButtonId> {
        let released: Vec<ButtonId> = std::mem::take(&mut self.one_shot).into_iter().collect();
        for id in &released {
            self.active.remove(id);
        }
        released
    }

    /// Clears all modifiers (both active and one-shot).
    pub fn clear_all(&mut self) {
        self.active.clear();
        self.one_shot.clear();
    }

    #[must_use]
    pub fn has_active_modifiers(&self) -> bool {
        !self.active.is_empty()
    }

    /// Returns the number of currently active modifiers.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
