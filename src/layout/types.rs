// SPDX-License-Identifier: GPL-3.0-only

//! Core data types for the theme parser.
//!
//! This module defines the parsed form of a theme document: the three named
//! hint tables, the main and extension parts, and the rows, keys and spacing
//! cells they contain. Everything here is immutable once parsed; a theme
//! reload builds a fresh [`ThemeDocument`].

use crate::app_settings;
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Error Handling Types
// ============================================================================

/// Error type for theme loading operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeLoadError {
    /// No theme document with the given name exists in any search location.
    NotFound {
        /// Theme name that was requested
        theme: String,
        /// Locations that were searched, in order
        searched: Vec<String>,
    },

    /// The theme document exists but is not well-formed.
    ParseError {
        /// Theme name (or file path) being parsed
        theme: String,
        /// Description of the problem
        message: String,
        /// Byte offset into the document where the problem was detected
        position: Option<usize>,
    },
}

impl ThemeLoadError {
    /// Creates a not-found error.
    pub fn not_found(theme: impl Into<String>, searched: Vec<String>) -> Self {
        Self::NotFound {
            theme: theme.into(),
            searched,
        }
    }

    /// Creates a parse error without position information.
    pub fn parse(theme: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            theme: theme.into(),
            message: message.into(),
            position: None,
        }
    }

    /// Creates a parse error at a byte offset.
    pub fn parse_at(theme: impl Into<String>, message: impl Into<String>, position: usize) -> Self {
        Self::ParseError {
            theme: theme.into(),
            message: message.into(),
            position: Some(position),
        }
    }

    /// Returns the theme name the error refers to.
    pub fn theme(&self) -> &str {
        match self {
            ThemeLoadError::NotFound { theme, .. } => theme,
            ThemeLoadError::ParseError { theme, .. } => theme,
        }
    }
}

impl fmt::Display for ThemeLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeLoadError::NotFound { theme, searched } => {
                write!(f, "Unable to open theme '{}'", theme)?;
                if !searched.is_empty() {
                    write!(f, " (searched: {})", searched.join(", "))?;
                }
            }
            ThemeLoadError::ParseError {
                theme,
                message,
                position,
            } => {
                write!(f, "Unable to parse theme '{}'", theme)?;
                if let Some(pos) = position {
                    write!(f, " at byte {}", pos)?;
                }
                write!(f, ": {}", message)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ThemeLoadError {}

// ============================================================================
// Hint Tables
// ============================================================================

/// Named pixel dimensions referenced symbolically by keys, rows and spacings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintTables {
    /// `buttonWidth` items: name -> width in pixels
    pub width: HashMap<String, i32>,
    /// `buttonHeight` items: name -> height in pixels
    pub height: HashMap<String, i32>,
    /// `spacingHints` items: name -> width in pixels
    pub spacing: HashMap<String, i32>,
    /// Width used for keys whose width hint does not resolve
    pub default_width: i32,
    /// Height used for keys and rows whose height hint does not resolve
    pub default_height: i32,
}

impl Default for HintTables {
    fn default() -> Self {
        Self {
            width: HashMap::new(),
            height: HashMap::new(),
            spacing: HashMap::new(),
            default_width: app_settings::DEFAULT_BUTTON_WIDTH,
            default_height: app_settings::DEFAULT_BUTTON_HEIGHT,
        }
    }
}

impl HintTables {
    /// Resolves a key width hint, falling back to the default width.
    pub fn key_width(&self, hint: Option<&str>) -> i32 {
        hint.and_then(|name| self.width.get(name))
            .copied()
            .unwrap_or(self.default_width)
    }

    /// Resolves a height hint, falling back to the default height.
    pub fn key_height(&self, hint: Option<&str>) -> i32 {
        self.row_height(hint).unwrap_or(self.default_height)
    }

    /// Looks up a height hint without applying a fallback.
    pub fn row_height(&self, hint: Option<&str>) -> Option<i32> {
        hint.and_then(|name| self.height.get(name)).copied()
    }

    /// Looks up a spacing width hint without applying a fallback.
    pub fn spacing_width(&self, hint: Option<&str>) -> Option<i32> {
        hint.and_then(|name| self.spacing.get(name)).copied()
    }
}

// ============================================================================
// Theme Document Structures
// ============================================================================

/// Which panel of the keyboard a part describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PartKind {
    /// The always-present main panel
    Main,
    /// The optional extension panel (numpad, navigation cluster, ...)
    Extension,
}

impl PartKind {
    /// Name used for this part in log output and notifications.
    pub fn as_str(self) -> &'static str {
        match self {
            PartKind::Main => "main",
            PartKind::Extension => "extension",
        }
    }
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key attributes recognised in a theme document.
///
/// Attribute names outside this set (`name, width, height, label, group_label,
/// group_toggle, group_name, colorGroup, tooltip, modifier, code, action,
/// checkable`) are ignored by the parser. Empty attribute values are stored
/// as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySpec {
    /// Object name of the button
    pub name: Option<String>,
    /// Width hint name (looked up in `buttonWidth`)
    pub width: Option<String>,
    /// Height hint name (looked up in `buttonHeight`)
    pub height: Option<String>,
    /// Fixed label text; keys without one show layout glyphs
    pub label: Option<String>,
    /// Tooltip text
    pub tooltip: Option<String>,
    /// Action string triggered instead of (or besides) a key code
    pub action: Option<String>,
    /// Name of the lock group this key reflects (e.g. "capslock")
    pub group_name: Option<String>,
    /// Label shown while the group is active
    pub group_label: Option<String>,
    /// Raw `group_toggle` attribute
    pub group_toggle: Option<String>,
    /// Colour group used by the stylesheet
    pub color_group: Option<String>,
    /// Raw `modifier` attribute (integer > 0 means modifier)
    pub modifier: Option<String>,
    /// Raw `checkable` attribute (integer > 0 means checkable)
    pub checkable: Option<String>,
    /// Raw `code` attribute (X11 keycode)
    pub code: Option<String>,
}

/// A `spacing` cell: advances the row cursor without producing a button.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpacingSpec {
    /// Width hint name (looked up in `spacingHints`)
    pub width: Option<String>,
    /// Height hint name (looked up in `buttonHeight`); only raises row height
    pub height: Option<String>,
}

/// One cell of a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellDefinition {
    /// A key that becomes a button
    Key(KeySpec),
    /// A spacing placeholder
    Spacing(SpacingSpec),
}

/// A row of cells laid out left to right.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowDefinition {
    /// Height hint name for the whole row
    pub height: Option<String>,
    /// Cells in document order
    pub cells: Vec<CellDefinition>,
}

impl RowDefinition {
    /// Number of key cells in this row (spacings are not counted).
    pub fn key_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| matches!(cell, CellDefinition::Key(_)))
            .count()
    }
}

/// A part: rows laid out top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDefinition {
    /// Main or extension
    pub kind: PartKind,
    /// Value of the `name` attribute, if any
    pub name: Option<String>,
    /// Rows in document order
    pub rows: Vec<RowDefinition>,
}

impl PartDefinition {
    /// Creates an empty part of the given kind.
    pub fn new(kind: PartKind) -> Self {
        Self {
            kind,
            name: None,
            rows: Vec::new(),
        }
    }
}

/// Root of a parsed theme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeDocument {
    /// Theme name the document was loaded under
    pub name: String,
    /// Width, height and spacing hint tables
    pub hints: HintTables,
    /// The main part
    pub main: PartDefinition,
    /// The first `extension` child of the main part, if any
    pub extension: Option<PartDefinition>,
}

impl ThemeDocument {
    /// Iterates over the parts in load order (main first).
    pub fn parts(&self) -> impl Iterator<Item = &PartDefinition> {
        std::iter::once(&self.main).chain(self.extension.iter())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hints() -> HintTables {
        let mut hints = HintTables::default();
        hints.width.insert("narrow".to_string(), 20);
        hints.height.insert("tall".to_string(), 40);
        hints.spacing.insert("gap".to_string(), 10);
        hints
    }

    /// Unknown and missing hints fall back to the default constants.
    #[test]
    fn test_hint_fallbacks() {
        let hints = hints();

        assert_eq!(hints.key_width(Some("narrow")), 20);
        assert_eq!(hints.key_width(Some("missing")), app_settings::DEFAULT_BUTTON_WIDTH);
        assert_eq!(hints.key_width(None), app_settings::DEFAULT_BUTTON_WIDTH);

        assert_eq!(hints.key_height(Some("tall")), 40);
        assert_eq!(hints.key_height(Some("missing")), app_settings::DEFAULT_BUTTON_HEIGHT);
        assert_eq!(hints.row_height(Some("missing")), None);

        assert_eq!(hints.spacing_width(Some("gap")), Some(10));
        assert_eq!(hints.spacing_width(Some("narrow")), None);
    }

    #[test]
    fn test_row_key_count_ignores_spacing() {
        let row = RowDefinition {
            height: None,
            cells: vec![
                CellDefinition::Key(KeySpec::default()),
                CellDefinition::Spacing(SpacingSpec::default()),
                CellDefinition::Key(KeySpec::default()),
            ],
        };
        assert_eq!(row.key_count(), 2);
    }

    #[test]
    fn test_theme_load_error_display() {
        let err = ThemeLoadError::not_found("fancy", vec!["embedded:themes/fancy.xml".into()]);
        let text = err.to_string();
        assert!(text.contains("Unable to open theme 'fancy'"));
        assert!(text.contains("embedded:themes/fancy.xml"));
        assert_eq!(err.theme(), "fancy");

        let err = ThemeLoadError::parse_at("broken", "unexpected end of document", 42);
        assert_eq!(
            err.to_string(),
            "Unable to parse theme 'broken' at byte 42: unexpected end of document"
        );
    }

    #[test]
    fn test_parts_iterates_main_first() {
        let doc = ThemeDocument {
            name: "t".into(),
            hints: HintTables::default(),
            main: PartDefinition::new(PartKind::Main),
            extension: Some(PartDefinition::new(PartKind::Extension)),
        };
        let kinds: Vec<PartKind> = doc.parts().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![PartKind::Main, PartKind::Extension]);
    }
}
