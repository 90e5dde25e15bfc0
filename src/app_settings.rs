// SPDX-License-Identifier: GPL-3.0-only

//! Centralized application settings and constants.

/// Directory name used under the user's config directory.
pub const CONFIG_DIR_NAME: &str = "vkbd";

/// Environment variable that overrides the configuration file location.
pub const CONFIG_ENV_VAR: &str = "VKBD_CONFIG";

/// Theme loaded when the configured one cannot be found or parsed.
pub const DEFAULT_THEME: &str = "standard";

/// Colour style selected when none is configured.
pub const DEFAULT_COLOR_STYLE: &str = "standard";

/// Button width in pixels when a theme declares no usable default.
pub const DEFAULT_BUTTON_WIDTH: i32 = 25;

/// Button height in pixels for unresolved height hints.
pub const DEFAULT_BUTTON_HEIGHT: i32 = 25;

/// Left margin applied at the start of every row.
pub const ROW_MARGIN_LEFT: i32 = 0;

/// Horizontal gap inserted after every key.
pub const ROW_SPACING_X: i32 = 0;

/// Vertical gap inserted after every row.
pub const ROW_SPACING_Y: i32 = 0;

/// Colour group assigned to keys without a `colorGroup` attribute.
pub const DEFAULT_COLOR_GROUP: &str = "normal";

/// Lock-state polling interval in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 250;

/// Delay before a held key starts repeating, in milliseconds.
pub const REPEAT_LONG_DELAY_MS: u64 = 1000;

/// Interval between repeats of a held key, in milliseconds.
pub const REPEAT_SHORT_DELAY_MS: u64 = 250;

/// Layout name reported when the host layout service gives no usable answer.
pub const FALLBACK_LAYOUT: &str = "us";

/// Window name of the marker left behind by a login-helper instance.
pub const LOGIN_MARKER_WINDOW: &str = "vkbd.login";

/// Action string that shows or hides the extension part.
pub const ACTION_TOGGLE_EXTENSION: &str = "toggleExtension";

/// X11 keycodes of the left and right Shift keys on a pc105 keyboard.
pub const SHIFT_KEYCODES: [u32; 2] = [50, 62];

/// Well-known bus name of the KDE keyboard-layout service.
pub const LAYOUT_SERVICE_NAME: &str = "org.kde.keyboard";

/// Object path of the KDE keyboard-layout service.
pub const LAYOUT_SERVICE_PATH: &str = "/Layouts";

/// Interface name of the KDE keyboard-layout service.
pub const LAYOUT_SERVICE_INTERFACE: &str = "org.kde.KeyboardLayouts";
