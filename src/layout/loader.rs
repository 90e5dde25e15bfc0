// SPDX-License-Identifier: GPL-3.0-only

//! Theme storage.
//!
//! Themes are looked up by name, first as `<theme_dir>/<name>.xml` when a
//! theme directory is configured, then among the themes embedded in the
//! binary under `resources/themes/`.

use super::parser::{parse_theme_file, parse_theme_from_string};
use super::types::{ThemeDocument, ThemeLoadError};
use crate::app_settings;
use rust_embed::RustEmbed;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Files bundled with the binary (themes and colour styles).
#[derive(RustEmbed)]
#[folder = "resources/"]
pub struct Resources;

const THEME_PREFIX: &str = "themes/";
const THEME_SUFFIX: &str = ".xml";

/// Resolves theme names to parsed documents.
#[derive(Debug, Clone, Default)]
pub struct ThemeSource {
    theme_dir: Option<PathBuf>,
}

impl ThemeSource {
    /// Creates a source that only knows the embedded themes.
    #[must_use]
    pub fn embedded() -> Self {
        Self { theme_dir: None }
    }

    /// Creates a source that searches `dir` before the embedded themes.
    #[must_use]
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            theme_dir: Some(dir.into()),
        }
    }

    /// Loads and parses one theme.
    ///
    /// # Errors
    ///
    /// [`ThemeLoadError::NotFound`] when no location has the theme,
    /// [`ThemeLoadError::ParseError`] when the first match is malformed.
    pub fn load(&self, name: &str) -> Result<ThemeDocument, ThemeLoadError> {
        let mut searched = Vec::new();

        if let Some(dir) = &self.theme_dir {
            let path = dir.join(format!("{}{}", name, THEME_SUFFIX));
            if path.is_file() {
                tracing::debug!("Loading theme '{}' from {}", name, path.display());
                let mut doc = parse_theme_file(&path)?;
                doc.name = name.to_string();
                return Ok(doc);
            }
            searched.push(path.display().to_string());
        }

        let key = format!("{}{}{}", THEME_PREFIX, name, THEME_SUFFIX);
        match Resources::get(&key) {
            Some(file) => {
                tracing::debug!("Loading embedded theme '{}'", name);
                let xml = std::str::from_utf8(&file.data).map_err(|e| {
                    ThemeLoadError::parse(name, format!("theme is not valid UTF-8: {}", e))
                })?;
                parse_theme_from_string(xml, name)
            }
            None => {
                searched.push(format!("embedded:{}", key));
                Err(ThemeLoadError::not_found(name, searched))
            }
        }
    }

    /// Loads a theme, falling back to the default theme once on failure.
    ///
    /// # Returns
    ///
    /// The name of the theme actually loaded together with its document.
    ///
    /// # Errors
    ///
    /// Returns the fallback's error when the default theme cannot be loaded
    /// either. Callers treat that as fatal.
    pub fn load_with_fallback(
        &self,
        name: &str,
    ) -> Result<(String, ThemeDocument), ThemeLoadError> {
        match self.load(name) {
            Ok(doc) => Ok((name.to_string(), doc)),
            Err(e) if name == app_settings::DEFAULT_THEME => {
                tracing::error!("{}", e);
                Err(e)
            }
            Err(e) => {
                tracing::warn!(
                    "{}; falling back to theme '{}'",
                    e,
                    app_settings::DEFAULT_THEME
                );
                match self.load(app_settings::DEFAULT_THEME) {
                    Ok(doc) => Ok((app_settings::DEFAULT_THEME.to_string(), doc)),
                    Err(fallback) => {
                        tracing::error!("{}", fallback);
                        Err(fallback)
                    }
                }
            }
        }
    }

    /// Lists theme names from every location, sorted and de-duplicated.
    #[must_use]
    pub fn available(&self) -> Vec<String> {
        let mut names = BTreeSet::new();

        for file in Resources::iter() {
            if let Some(name) = file
                .strip_prefix(THEME_PREFIX)
                .and_then(|rest| rest.strip_suffix(THEME_SUFFIX))
            {
                names.insert(name.to_string());
            }
        }

        if let Some(dir) = &self.theme_dir {
            match std::fs::read_dir(dir) {
                Ok(entries) => {
                    for entry in entries.flatten() {
                        let path = entry.path();
                        if path.extension().is_some_and(|ext| ext == "xml") {
                            if let Some(stem) = path.file_stem() {
                                names.insert(stem.to_string_lossy().into_owned());
                            }
                        }
                    }
                }
                Err(e) => tracing::debug!("Cannot list theme dir {}: {}", dir.display(), e),
            }
        }

        names.into_iter().collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CUSTOM: &str = r#"<theme><part><row><key code="24"/><key code="25"/></row></part></theme>"#;

    /// Test 1: The embedded default theme loads
    #[test]
    fn test_embedded_default_theme() {
        let doc = ThemeSource::embedded()
            .load(app_settings::DEFAULT_THEME)
            .expect("embedded standard theme should parse");
        assert!(!doc.main.rows.is_empty());
        assert!(doc.extension.is_some(), "standard theme ships a numpad extension");
    }

    /// Test 2: Unknown themes are not found
    #[test]
    fn test_unknown_theme() {
        let err = ThemeSource::embedded().load("does-not-exist").unwrap_err();
        assert!(matches!(err, ThemeLoadError::NotFound { .. }));
    }

    /// Test 3: Fallback retries with the default theme
    #[test]
    fn test_fallback_to_default() {
        let (name, doc) = ThemeSource::embedded()
            .load_with_fallback("does-not-exist")
            .unwrap();
        assert_eq!(name, app_settings::DEFAULT_THEME);
        assert_eq!(doc.name, app_settings::DEFAULT_THEME);
    }

    /// Test 4: The theme directory is searched first
    #[test]
    fn test_theme_dir_overrides() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("standard.xml"), CUSTOM).unwrap();

        let source = ThemeSource::with_dir(dir.path());
        let doc = source.load("standard").unwrap();
        assert_eq!(doc.main.rows.len(), 1);
        assert_eq!(doc.main.rows[0].key_count(), 2);
        assert_eq!(doc.name, "standard");
    }

    /// Test 5: A malformed theme falls back; a malformed default is fatal
    #[test]
    fn test_malformed_theme_fallback() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.xml"), "<theme><part>").unwrap();

        let source = ThemeSource::with_dir(dir.path());
        let (name, _) = source.load_with_fallback("broken").unwrap();
        assert_eq!(name, app_settings::DEFAULT_THEME);

        fs::write(dir.path().join("standard.xml"), "<theme>").unwrap();
        let err = source.load_with_fallback("broken").unwrap_err();
        assert!(matches!(err, ThemeLoadError::ParseError { .. }));
    }

    #[test]
    fn test_available_themes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("mine.xml"), CUSTOM).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let names = ThemeSource::with_dir(dir.path()).available();
        assert!(names.contains(&"standard".to_string()));
        assert!(names.contains(&"mine".to_string()));
        assert!(!names.iter().any(|n| n == "notes"));
    }
}
