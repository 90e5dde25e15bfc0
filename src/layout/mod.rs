// SPDX-License-Identifier: GPL-3.0-only

//! Theme loading and geometry for vkbd keyboard layouts.
//!
//! A theme is an XML document describing one main part and an optional
//! extension part, each made of rows of keys and spacing cells. Keys and
//! spacings refer to symbolic width/height names resolved through the
//! theme's hint tables.
//!
//! # Pipeline
//!
//! 1. [`ThemeSource`] resolves a theme name to a document and falls back to
//!    the default theme once if the requested one is missing or malformed.
//! 2. [`parse_theme_from_string`] / [`parse_theme_file`] build a
//!    [`ThemeDocument`] (hint tables + part definitions).
//! 3. [`layout_part`] places a [`ButtonModel`] for every key and reports the
//!    part's bounding [`LayoutGeometry`].
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use vkbd::layout::{layout_part, ThemeSource};
//!
//! let (name, doc) = ThemeSource::embedded().load_with_fallback("standard")?;
//! for part in doc.parts() {
//!     let laid_out = layout_part(part, &doc.hints);
//!     println!(
//!         "{} part of theme {}: {} buttons in {}x{} px",
//!         part.kind,
//!         name,
//!         laid_out.buttons.len(),
//!         laid_out.geometry.size.width,
//!         laid_out.geometry.size.height,
//!     );
//! }
//! ```

// Sub-modules
pub mod button;
pub mod geometry;
pub mod loader;
pub mod parser;
pub mod types;

// Re-export public API
pub use button::{ButtonModel, ButtonText, Rect, Size};
pub use geometry::{layout_part, LayoutGeometry, PartLayout};
pub use loader::{Resources, ThemeSource};
pub use parser::{parse_theme_file, parse_theme_from_string};
pub use types::{
    CellDefinition, HintTables, KeySpec, PartDefinition, PartKind, RowDefinition, SpacingSpec,
    ThemeDocument, ThemeLoadError,
};

// ============================================================================
// Module Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_settings;

    /// The bundled default theme lays out both parts with sane geometry.
    #[test]
    fn test_standard_theme_layout() {
        let (_, doc) = ThemeSource::embedded()
            .load_with_fallback(app_settings::DEFAULT_THEME)
            .unwrap();

        for part in doc.parts() {
            let laid_out = layout_part(part, &doc.hints);
            assert_eq!(laid_out.kind, part.kind);
            assert_eq!(laid_out.geometry.total_rows, part.rows.len());
            assert!(laid_out.geometry.size.width > 0);
            assert!(laid_out.geometry.size.height > 0);

            let expected: usize = part.rows.iter().map(RowDefinition::key_count).sum();
            assert_eq!(laid_out.buttons.len(), expected);

            let widest = part.rows.iter().map(RowDefinition::key_count).max().unwrap_or(0);
            assert_eq!(laid_out.geometry.total_cols, widest);

            for button in &laid_out.buttons {
                assert!(button.rect.right() <= laid_out.geometry.size.width);
            }
        }
    }

    /// Every modifier key in the default theme carries a key code.
    #[test]
    fn test_standard_theme_modifiers_have_codes() {
        let doc = ThemeSource::embedded().load(app_settings::DEFAULT_THEME).unwrap();
        let main = layout_part(&doc.main, &doc.hints);

        let modifiers: Vec<&ButtonModel> = main.buttons.iter().filter(|b| b.modifier).collect();
        assert!(!modifiers.is_empty());
        for button in modifiers {
            assert!(button.checkable);
            assert!(button.key_code.is_some(), "{:?} has no code", button.name);
        }
    }
}
