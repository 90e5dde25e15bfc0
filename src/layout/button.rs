// SPDX-License-Identifier: GPL-3.0-only

//! Runtime button model.
//!
//! A [`ButtonModel`] is created for every `key` cell placed by the geometry
//! engine. It carries the computed rectangle, the X11 keycode, the glyph
//! pair shown for the active host layout and the toggle state of modifier
//! and checkable keys. Buttons are owned by their part and dropped with it
//! on theme reload.

use super::types::KeySpec;
use crate::app_settings;

/// Integer pixel size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Integer pixel rectangle relative to the owning part's origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    #[must_use]
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (exclusive).
    #[must_use]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[must_use]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }
}

/// The unshifted and shifted glyphs shown on a key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ButtonText {
    pub normal: String,
    pub shifted: String,
}

impl ButtonText {
    #[must_use]
    pub fn new(normal: impl Into<String>, shifted: impl Into<String>) -> Self {
        Self {
            normal: normal.into(),
            shifted: shifted.into(),
        }
    }

    /// Returns `true` when neither glyph is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.normal.is_empty() && self.shifted.is_empty()
    }

    pub fn clear(&mut self) {
        self.normal.clear();
        self.shifted.clear();
    }

    /// Number of selectable glyphs.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.is_empty() { 0 } else { 2 }
    }

    fn glyph(&self, index: usize) -> &str {
        if index % 2 == 0 {
            &self.normal
        } else {
            &self.shifted
        }
    }
}

/// Resolves a themed property: a non-empty attribute wins, otherwise a
/// non-empty default, otherwise unset.
fn apply_property(value: Option<&str>, default: &str) -> Option<String> {
    match value.filter(|v| !v.is_empty()) {
        Some(value) => Some(value.to_string()),
        None if !default.is_empty() => Some(default.to_string()),
        None => None,
    }
}

/// Integer attribute test used by `modifier`, `checkable` and `group_toggle`.
fn flag_set(value: Option<&str>) -> bool {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .is_some_and(|v| v > 0)
}

/// Runtime state of one placed key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonModel {
    /// Object name from the theme
    pub name: Option<String>,
    /// Geometry computed at load time
    pub rect: Rect,
    /// X11 keycode; `None` for layout-only and action-only keys
    pub key_code: Option<u32>,
    /// Fixed label; keys without one display `text`
    pub label: Option<String>,
    pub tooltip: Option<String>,
    pub action: Option<String>,
    pub group_name: Option<String>,
    pub group_label: Option<String>,
    pub group_toggle: bool,
    pub color_group: Option<String>,
    /// Modifier keys are always checkable and are pressed around other keys
    pub modifier: bool,
    pub checkable: bool,
    pub checked: bool,
    /// Glyphs for the active host layout
    pub text: ButtonText,
    text_index: usize,
    caps: bool,
    shift: bool,
    group_active: bool,
}

impl ButtonModel {
    /// Builds a button from its key attributes.
    ///
    /// A `modifier` value > 0 makes the button checkable regardless of
    /// `checkable`. A `checkable` value > 0 also makes it checkable and
    /// unchecked. The key code is only set for values > 0.
    #[must_use]
    pub fn from_key_spec(spec: &KeySpec, rect: Rect) -> Self {
        let modifier = flag_set(spec.modifier.as_deref());
        let checkable = modifier || flag_set(spec.checkable.as_deref());

        let key_code = spec
            .code
            .as_deref()
            .and_then(|code| code.trim().parse::<u32>().ok())
            .filter(|code| *code > 0);

        Self {
            name: apply_property(spec.name.as_deref(), ""),
            rect,
            key_code,
            label: apply_property(spec.label.as_deref(), ""),
            tooltip: apply_property(spec.tooltip.as_deref(), ""),
            action: apply_property(spec.action.as_deref(), ""),
            group_name: apply_property(spec.group_name.as_deref(), ""),
            group_label: apply_property(spec.group_label.as_deref(), ""),
            group_toggle: flag_set(spec.group_toggle.as_deref()),
            color_group: apply_property(
                spec.color_group.as_deref(),
                app_settings::DEFAULT_COLOR_GROUP,
            ),
            modifier,
            checkable,
            checked: false,
            text: ButtonText::default(),
            text_index: 0,
            caps: false,
            shift: false,
            group_active: false,
        }
    }

    /// Replaces the glyph pair and resets the selection index.
    pub fn set_button_text(&mut self, text: ButtonText) {
        self.text = text;
        self.text_index = 0;
    }

    #[must_use]
    pub fn text_index(&self) -> usize {
        self.text_index
    }

    pub fn set_text_index(&mut self, index: usize) {
        self.text_index = match self.text.len() {
            0 => 0,
            len => index % len,
        };
    }

    /// Advances to the next glyph, wrapping around.
    pub fn next_text(&mut self) {
        self.set_text_index(self.text_index + 1);
    }

    pub fn set_caps(&mut self, caps: bool) {
        self.caps = caps;
    }

    pub fn set_shift(&mut self, shift: bool) {
        self.shift = shift;
    }

    #[must_use]
    pub fn is_caps(&self) -> bool {
        self.caps
    }

    #[must_use]
    pub fn is_shift(&self) -> bool {
        self.shift
    }

    /// Marks whether the lock group this key reflects is currently on.
    pub fn set_group_active(&mut self, active: bool) {
        self.group_active = active;
        if self.group_toggle && self.checkable {
            self.checked = active;
        }
    }

    #[must_use]
    pub fn is_group_active(&self) -> bool {
        self.group_active
    }

    /// Toggles a checkable button; returns the new checked state.
    pub fn toggle(&mut self) -> bool {
        if self.checkable {
            self.checked = !self.checked;
        }
        self.checked
    }

    /// Text to draw on the button.
    ///
    /// Labelled keys show their label (or group label while their lock group
    /// is on). Other keys show a layout glyph: shift selects the shifted
    /// glyph, caps lock does the same for alphabetic glyphs only, and the
    /// two cancel each other out for letters.
    #[must_use]
    pub fn display_text(&self) -> String {
        if let Some(label) = &self.label {
            if self.group_active {
                if let Some(group_label) = &self.group_label {
                    return group_label.clone();
                }
            }
            return label.clone();
        }

        if self.text.is_empty() {
            return String::new();
        }

        let caps_applies = self.caps && self.text.normal.chars().any(char::is_alphabetic);
        let shifted = self.shift != caps_applies;
        self.text
            .glyph(self.text_index + usize::from(shifted))
            .to_string()
    }

    /// Maps the stored geometry onto a part that was resized from `base` to
    /// `current`, scaling position and size proportionally.
    #[must_use]
    pub fn scaled_rect(&self, base: Size, current: Size) -> Rect {
        if base.width <= 0 || base.height <= 0 {
            return self.rect;
        }

        let sx = f64::from(current.width) / f64::from(base.width);
        let sy = f64::from(current.height) / f64::from(base.height);

        Rect {
            x: (f64::from(self.rect.x) * sx).round() as i32,
            y: (f64::from(self.rect.y) * sy).round() as i32,
            width: (f64::from(self.rect.width) * sx).round() as i32,
            height: (f64::from(self.rect.height) * sy).round() as i32,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
