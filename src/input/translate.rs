// SPDX-License-Identifier: GPL-3.0-only

//! Key code to glyph translation.
//!
//! The host keyboard mapping lists keysyms per keycode two per layout group
//! (unshifted, shifted). The glyphs for layout `n` are therefore in slots
//! `2n` and `2n + 1`, each converted to a character with xkbcommon.

use super::{HostQueryError, InputHost};
use crate::layout::ButtonText;
use std::sync::Arc;
use xkbcommon::xkb::{self, Keysym};

/// Resolves the glyphs shown on unlabelled buttons.
#[derive(Clone)]
pub struct KeyTranslator {
    host: Arc<dyn InputHost>,
}

impl std::fmt::Debug for KeyTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyTranslator").finish_non_exhaustive()
    }
}

impl KeyTranslator {
    #[must_use]
    pub fn new(host: Arc<dyn InputHost>) -> Self {
        Self { host }
    }

    /// Returns the unshifted/shifted glyph pair of `code` in a layout.
    ///
    /// # Arguments
    ///
    /// * `code` - X11 keycode; 0 always yields an empty pair
    /// * `layout_index` - Index of the active host layout
    ///
    /// # Errors
    ///
    /// Returns the host failure so the caller can keep the glyphs it had.
    pub fn text_for_key_code(
        &self,
        code: u32,
        layout_index: usize,
    ) -> Result<ButtonText, HostQueryError> {
        if code == 0 {
            return Ok(ButtonText::default());
        }

        let keysyms = self.host.keyboard_mapping(code)?;
        let slot = layout_index * 2;

        let normal = keysyms.get(slot).map_or_else(String::new, |k| keysym_text(*k));
        let shifted = keysyms
            .get(slot + 1)
            .map_or_else(String::new, |k| keysym_text(*k));

        if normal.is_empty() && shifted.is_empty() {
            return Ok(ButtonText::default());
        }
        Ok(ButtonText::new(normal, shifted))
    }
}

/// Converts one keysym to its printable text, empty when it has none.
fn keysym_text(raw: u32) -> String {
    let codepoint = xkb::keysym_to_utf32(Keysym::from(raw));
    char::from_u32(codepoint)
        .filter(|c| *c != '\0' && !c.is_control())
        .map(String::from)
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================
