// SPDX-License-Identifier: GPL-3.0-only

//! User configuration.
//!
//! Read from `$VKBD_CONFIG` when set, otherwise from
//! `<config dir>/vkbd/config.json` (e.g. `~/.config/vkbd/config.json` on
//! Linux). Every field has a default, so a partial file is valid and a
//! missing file yields [`Config::default`]. Writing the file belongs to
//! whatever settings front-end the user runs.

use crate::app_settings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Errors reading the configuration file.
#[derive(Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    Io { path: PathBuf, source: std::io::Error },
    /// The file is not valid configuration JSON.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "Unable to read {}: {}", path.display(), source)
            }
            ConfigError::Json { path, source } => {
                write!(f, "Invalid configuration in {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Json { source, .. } => Some(source),
        }
    }
}

/// User configuration that persists between application runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Theme name, resolved against `theme_dir` then the built-in themes
    pub theme: String,
    /// Colour style name; empty selects the built-in default
    pub color_style: String,
    /// Keep modifiers checked after a key press instead of releasing them
    pub sticky_modifiers: bool,
    /// Lock-state polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Extra directory searched for `<theme>.xml` before the built-in themes
    pub theme_dir: Option<PathBuf>,
    /// Follow the host keyboard-layout service on the session bus
    pub layout_service: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: app_settings::DEFAULT_THEME.to_string(),
            color_style: String::new(),
            sticky_modifiers: false,
            poll_interval_ms: app_settings::POLL_INTERVAL_MS,
            theme_dir: None,
            layout_service: true,
        }
    }
}

impl Config {
    /// Location of the configuration file.
    ///
    /// `None` when neither the override variable nor a platform config
    /// directory is available.
    #[must_use]
    pub fn path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(app_settings::CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join(app_settings::CONFIG_DIR_NAME).join("config.json"))
    }

    /// Reads configuration from `path`.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the file does not exist.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] for unreadable files, [`ConfigError::Json`] for
    /// malformed ones.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(config))
    }

    /// Loads the user configuration, falling back to defaults.
    ///
    /// Problems with the file are logged and never fatal.
    #[must_use]
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            tracing::debug!("No configuration directory; using defaults");
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(Some(config)) => {
                tracing::info!("Loaded configuration from {}", path.display());
                config
            }
            Ok(None) => {
                tracing::debug!("{} does not exist; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Colour style to select, with the empty string mapped to the default.
    #[must_use]
    pub fn color_style_or_default(&self) -> &str {
        if self.color_style.is_empty() {
            app_settings::DEFAULT_COLOR_STYLE
        } else {
            &self.color_style
        }
    }

    /// Poll interval, never zero.
    #[must_use]
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

// ============================================================================
// Tests
// ============================================================================
