// SPDX-License-Identifier: GPL-3.0-only

//! Colour styles.
//!
//! A colour style is a stylesheet bundled as `resources/colors/<name>.css`.
//! Exactly one style is selected at a time.

use crate::app_settings;
use crate::layout::Resources;

const STYLE_PREFIX: &str = "colors/";
const STYLE_SUFFIX: &str = ".css";

/// A loaded stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorStyle {
    pub name: String,
    pub stylesheet: String,
}

/// Error selecting a style that is not bundled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStyle(pub String);

impl std::fmt::Display for UnknownStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown colour style '{}'", self.0)
    }
}

impl std::error::Error for UnknownStyle {}

/// Available colour styles and the current selection.
#[derive(Debug, Clone)]
pub struct ColorStyles {
    names: Vec<String>,
    selected: Option<String>,
}

impl ColorStyles {
    /// Lists the bundled styles, sorted by name, with nothing selected.
    #[must_use]
    pub fn embedded() -> Self {
        let mut names: Vec<String> = Resources::iter()
            .filter_map(|file| {
                file.strip_prefix(STYLE_PREFIX)
                    .and_then(|rest| rest.strip_suffix(STYLE_SUFFIX))
                    .map(str::to_string)
            })
            .collect();
        names.sort();
        Self {
            names,
            selected: None,
        }
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Selects a style, replacing any previous selection.
    ///
    /// # Errors
    ///
    /// [`UnknownStyle`] when `name` is not bundled; the previous selection is
    /// kept.
    pub fn select(&mut self, name: &str) -> Result<ColorStyle, UnknownStyle> {
        let file = Resources::get(&format!("{}{}{}", STYLE_PREFIX, name, STYLE_SUFFIX))
            .ok_or_else(|| UnknownStyle(name.to_string()))?;

        let stylesheet = String::from_utf8_lossy(&file.data).into_owned();
        self.selected = Some(name.to_string());
        tracing::debug!("Selected colour style '{}'", name);

        Ok(ColorStyle {
            name: name.to_string(),
            stylesheet,
        })
    }

    /// Selects `name`, or the default style when it is unknown.
    ///
    /// # Errors
    ///
    /// Only when the default style itself is missing.
    pub fn select_or_default(&mut self, name: &str) -> Result<ColorStyle, UnknownStyle> {
        match self.select(name) {
            Ok(style) => Ok(style),
            Err(e) if name != app_settings::DEFAULT_COLOR_STYLE => {
                tracing::warn!("{}; using '{}'", e, app_settings::DEFAULT_COLOR_STYLE);
                self.select(app_settings::DEFAULT_COLOR_STYLE)
            }
            Err(e) => Err(e),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_styles_sorted() {
        let styles = ColorStyles::embedded();
        assert_eq!(styles.names(), ["dark".to_string(), "standard".to_string()]);
        assert!(styles.selected().is_none());
    }

    /// Selection is exclusive
    #[test]
    fn test_select_is_exclusive() {
        let mut styles = ColorStyles::embedded();

        let style = styles.select("dark").unwrap();
        assert_eq!(style.name, "dark");
        assert!(style.stylesheet.contains("VButton"));
        assert_eq!(styles.selected(), Some("dark"));

        styles.select("standard").unwrap();
        assert_eq!(styles.selected(), Some("standard"));
    }

    #[test]
    fn test_unknown_style_keeps_selection() {
        let mut styles = ColorStyles::embedded();
        styles.select("dark").unwrap();

        assert_eq!(
            styles.select("neon"),
            Err(UnknownStyle("neon".to_string()))
        );
        assert_eq!(styles.selected(), Some("dark"));

        let style = styles.select_or_default("neon").unwrap();
        assert_eq!(style.name, "standard");
    }
}
