// SPDX-License-Identifier: GPL-3.0-only

//! The vkbd event loop.
//!
//! All keyboard state lives in [`App`] and is only touched from one task.
//! Inputs arrive as [`Message`]s (button clicks from the UI, host layout
//! notifications forwarded from the session bus, poll ticks from the lock
//! timer) and are processed one at a time; each produces zero or more
//! [`Notification`]s for the UI.
//!
//! A held button repeats its key: after [`Message::KeyPressed`] the key is
//! injected once the long repeat delay has passed, then again on every
//! short delay until [`Message::KeyReleased`], which injects it one last
//! time as a normal click.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use futures::channel::mpsc;
//! use vkbd::app::{App, Message};
//!
//! let mut app = App::new(config, host);
//! let initial = app.start()?;
//!
//! let (inbox_tx, inbox_rx) = mpsc::channel::<Message>(32);
//! let (outbox_tx, outbox_rx) = mpsc::unbounded();
//! app.run(inbox_rx, outbox_tx).await;
//! ```

use crate::app_settings;
use crate::config::Config;
use crate::input::{
    ButtonId, HostModifierState, HostQueryError, HostStateMonitor, InputHost, KeyInjector,
    KeyTranslator, LockKey, ModifierState,
};
use crate::layout::{
    layout_part, ButtonModel, PartKind, PartLayout, Size, ThemeLoadError, ThemeSource,
};
use crate::styles::ColorStyles;
use futures::channel::mpsc;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Inputs to the event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// The lock-state timer fired.
    PollTick,
    /// Resume lock-state polling.
    StartPolling,
    /// Pause lock-state polling.
    StopPolling,
    /// The host reported a new current layout (name or query failure).
    LayoutChanged(Result<String, HostQueryError>),
    /// The host reported a new layout list (names or query failure).
    LayoutListChanged(Result<Vec<String>, HostQueryError>),
    /// A button was clicked.
    KeyClicked(ButtonId),
    /// A button was pressed and is being held.
    KeyPressed(ButtonId),
    /// A held button was released; injects like a click.
    KeyReleased(ButtonId),
    /// The key-repeat timer fired.
    RepeatTick,
    /// Load another theme by name.
    ReloadTheme(String),
    /// Switch to another colour style.
    SelectColorStyle(String),
    /// Stop the event loop.
    Quit,
}

/// Outputs of the event loop, consumed by the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A theme finished loading; `name` is the theme actually used.
    ThemeLoaded(String),
    /// One button of the new theme, in document order.
    ButtonLoaded { id: ButtonId, button: ButtonModel },
    /// A part finished loading; `size` is its minimum size.
    PartLoaded {
        kind: PartKind,
        rows: usize,
        cols: usize,
        size: Size,
    },
    /// Lock-key state changed; carries the full snapshot.
    GroupStateChanged(HostModifierState),
    /// The active host layout was re-resolved.
    LayoutUpdated { index: usize, name: String },
    /// A key was injected.
    KeyProcessComplete(u32),
    /// A button's checked state changed.
    ButtonStateChanged { id: ButtonId, checked: bool },
    /// A Shift modifier was latched or released.
    ShiftChanged(bool),
    /// A button with an action was clicked.
    ButtonAction(String),
    /// The extension part was shown or hidden.
    ExtensionVisibilityChanged(bool),
    /// A colour style was selected.
    ColorStyleChanged { name: String, stylesheet: String },
}

/// A held key being auto-repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KeyRepeat {
    id: ButtonId,
    code: u32,
    /// When the next repeat is due
    deadline: Instant,
}

/// Keyboard state and the handlers driving it.
pub struct App {
    config: Config,
    host: Arc<dyn InputHost>,
    themes: ThemeSource,
    styles: ColorStyles,
    theme_name: String,
    /// Main part first, then the extension if the theme has one
    parts: Vec<PartLayout>,
    monitor: HostStateMonitor,
    translator: KeyTranslator,
    injector: KeyInjector,
    modifiers: ModifierState,
    repeat: Option<KeyRepeat>,
    extension_visible: bool,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("theme_name", &self.theme_name)
            .field("monitor", &self.monitor)
            .field("modifiers", &self.modifiers)
            .field("repeat", &self.repeat)
            .field("extension_visible", &self.extension_visible)
            .finish_non_exhaustive()
    }
}

impl App {
    /// Creates an app with no theme loaded yet; call [`App::start`] next.
    #[must_use]
    pub fn new(config: Config, host: Arc<dyn InputHost>) -> Self {
        let themes = match &config.theme_dir {
            Some(dir) => ThemeSource::with_dir(dir),
            None => ThemeSource::embedded(),
        };

        Self {
            monitor: HostStateMonitor::new(Arc::clone(&host)),
            translator: KeyTranslator::new(Arc::clone(&host)),
            injector: KeyInjector::new(Arc::clone(&host)),
            host,
            themes,
            styles: ColorStyles::embedded(),
            theme_name: String::new(),
            parts: Vec::new(),
            modifiers: ModifierState::new(),
            repeat: None,
            extension_visible: false,
            config,
        }
    }

    /// Loads the configured theme and colour style and starts polling.
    ///
    /// # Errors
    ///
    /// Returns the theme error when neither the configured theme nor the
    /// default one loads. This is fatal at startup.
    pub fn start(&mut self) -> Result<Vec<Notification>, ThemeLoadError> {
        let theme = self.config.theme.clone();
        let mut notes = self.load_theme(&theme)?;

        let style = self.config.color_style_or_default().to_string();
        notes.extend(self.select_color_style(&style));

        self.monitor.start();
        Ok(notes)
    }

    /// Destroys the marker window left by a login-helper instance.
    ///
    /// Returns `true` when a marker was found.
    pub fn remove_login_marker(&self) -> bool {
        match self
            .host
            .destroy_window_named(app_settings::LOGIN_MARKER_WINDOW)
        {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!("Login marker lookup failed: {}", e);
                false
            }
        }
    }

    /// Loads a theme (with fallback) and rebuilds every part.
    ///
    /// # Errors
    ///
    /// The loader's error when the fallback theme fails too; the current
    /// parts are left untouched in that case.
    pub fn load_theme(&mut self, name: &str) -> Result<Vec<Notification>, ThemeLoadError> {
        let (loaded, doc) = self.themes.load_with_fallback(name)?;

        self.parts = doc
            .parts()
            .map(|part| layout_part(part, &doc.hints))
            .collect();
        self.theme_name = loaded.clone();
        self.modifiers.clear_all();
        self.repeat = None;
        if self.part(PartKind::Extension).is_none() {
            self.extension_visible = false;
        }

        let index = self.monitor.selection().index;
        self.refresh_glyphs(index);
        let snapshot = self.monitor.snapshot().clone();
        self.apply_group_state(&snapshot);

        let mut notes = vec![Notification::ThemeLoaded(loaded)];
        for part in &self.parts {
            for (index, button) in part.buttons.iter().enumerate() {
                notes.push(Notification::ButtonLoaded {
                    id: ButtonId::new(part.kind, index),
                    button: button.clone(),
                });
            }
            notes.push(Notification::PartLoaded {
                kind: part.kind,
                rows: part.geometry.total_rows,
                cols: part.geometry.total_cols,
                size: part.geometry.size,
            });
        }

        tracing::info!(
            "Loaded theme '{}' ({} part(s))",
            self.theme_name,
            self.parts.len()
        );
        Ok(notes)
    }

    /// Processes one message.
    pub fn handle(&mut self, message: Message) -> Vec<Notification> {
        match message {
            Message::PollTick => self.poll(),
            Message::StartPolling => {
                self.monitor.start();
                Vec::new()
            }
            Message::StopPolling => {
                self.monitor.stop();
                Vec::new()
            }
            Message::LayoutListChanged(reply) => {
                self.monitor.rebuild_layouts(reply);
                Vec::new()
            }
            Message::LayoutChanged(reply) => {
                let selection = self.monitor.resolve_current_layout(reply);
                self.refresh_glyphs(selection.index);
                vec![Notification::LayoutUpdated {
                    index: selection.index,
                    name: selection.name,
                }]
            }
            Message::KeyClicked(id) => self.click(id),
            Message::KeyPressed(id) => {
                self.press(id);
                Vec::new()
            }
            Message::KeyReleased(id) => self.release(id),
            Message::RepeatTick => self.repeat_key(),
            Message::ReloadTheme(name) => match self.load_theme(&name) {
                Ok(notes) => notes,
                Err(e) => {
                    tracing::error!("Keeping theme '{}': {}", self.theme_name, e);
                    Vec::new()
                }
            },
            Message::SelectColorStyle(name) => self.select_color_style(&name),
            Message::Quit => Vec::new(),
        }
    }

    /// Runs the event loop until [`Message::Quit`] or the inbox closes.
    pub async fn run(
        mut self,
        mut inbox: mpsc::Receiver<Message>,
        outbox: mpsc::UnboundedSender<Notification>,
    ) {
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            let repeat_at = self.repeat.map(|repeat| repeat.deadline);

            let notes = tokio::select! {
                _ = ticker.tick(), if self.monitor.is_polling() => self.handle(Message::PollTick),
                _ = tokio::time::sleep_until(repeat_at.unwrap_or_else(Instant::now)),
                    if repeat_at.is_some() => self.handle(Message::RepeatTick),
                message = inbox.next() => match message {
                    Some(Message::Quit) | None => break,
                    Some(message) => self.handle(message),
                },
            };

            for note in notes {
                if outbox.unbounded_send(note).is_err() {
                    tracing::debug!("Notification dropped: no listener");
                }
            }
        }

        tracing::info!("Event loop stopped");
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn theme_name(&self) -> &str {
        &self.theme_name
    }

    #[must_use]
    pub fn parts(&self) -> &[PartLayout] {
        &self.parts
    }

    #[must_use]
    pub fn part(&self, kind: PartKind) -> Option<&PartLayout> {
        self.parts.iter().find(|part| part.kind == kind)
    }

    #[must_use]
    pub fn button(&self, id: ButtonId) -> Option<&ButtonModel> {
        self.part(id.part).and_then(|part| part.buttons.get(id.index))
    }

    #[must_use]
    pub fn monitor(&self) -> &HostStateMonitor {
        &self.monitor
    }

    #[must_use]
    pub fn extension_visible(&self) -> bool {
        self.extension_visible
    }

    /// The held button currently repeating its key, if any.
    #[must_use]
    pub fn repeating(&self) -> Option<ButtonId> {
        self.repeat.map(|repeat| repeat.id)
    }

    #[must_use]
    pub fn selected_color_style(&self) -> Option<&str> {
        self.styles.selected()
    }

    fn button_mut(&mut self, id: ButtonId) -> Option<&mut ButtonModel> {
        self.parts
            .iter_mut()
            .find(|part| part.kind == id.part)
            .and_then(|part| part.buttons.get_mut(id.index))
    }

    fn buttons_mut(&mut self) -> impl Iterator<Item = &mut ButtonModel> {
        self.parts.iter_mut().flat_map(|part| part.buttons.iter_mut())
    }

    // ========================================================================
    // Handlers
    // ========================================================================

    fn poll(&mut self) -> Vec<Notification> {
        match self.monitor.poll() {
            Some(snapshot) => {
                self.apply_group_state(&snapshot);
                vec![Notification::GroupStateChanged(snapshot)]
            }
            None => Vec::new(),
        }
    }

    fn apply_group_state(&mut self, snapshot: &HostModifierState) {
        let caps = snapshot
            .get(LockKey::CapsLock.name())
            .copied()
            .unwrap_or(false);

        for button in self.buttons_mut() {
            let active = button
                .group_name
                .as_ref()
                .and_then(|group| snapshot.get(group))
                .copied();
            if let Some(active) = active {
                button.set_group_active(active);
            }
            button.set_caps(caps);
        }
    }

    /// Re-resolves the glyphs of unlabelled buttons. Stops at the first host
    /// failure; buttons keep the glyphs they had.
    fn refresh_glyphs(&mut self, layout_index: usize) {
        for part in &mut self.parts {
            for button in &mut part.buttons {
                if button.label.is_some() {
                    continue;
                }
                let Some(code) = button.key_code else {
                    continue;
                };

                match self.translator.text_for_key_code(code, layout_index) {
                    Ok(text) => button.set_button_text(text),
                    Err(e) => {
                        tracing::warn!("Keeping previous key glyphs: {}", e);
                        return;
                    }
                }
            }
        }
    }

    fn click(&mut self, id: ButtonId) -> Vec<Notification> {
        let Some(button) = self.button(id) else {
            tracing::warn!("Click on unknown button {:?}", id);
            return Vec::new();
        };

        let action = button.action.clone();
        let code = button.key_code;
        let modifier = button.modifier;
        let toggles_locally = button.checkable && !button.group_toggle && !button.modifier;

        let mut notes = Vec::new();

        if let Some(action) = action {
            notes.push(Notification::ButtonAction(action.clone()));
            if action == app_settings::ACTION_TOGGLE_EXTENSION {
                notes.extend(self.toggle_extension());
            }
        }

        if modifier {
            notes.extend(self.toggle_modifier(id, code));
            return notes;
        }

        if toggles_locally {
            if let Some(button) = self.button_mut(id) {
                let checked = button.toggle();
                notes.push(Notification::ButtonStateChanged { id, checked });
            }
        }

        if let Some(code) = code {
            notes.extend(self.process_key_press(code));
        }
        notes
    }

    /// Arms the repeat timer for plain keys. Toggles, actions and keys
    /// without a code never repeat.
    fn press(&mut self, id: ButtonId) {
        let code = self
            .button(id)
            .filter(|button| !button.checkable && button.action.is_none())
            .and_then(|button| button.key_code);

        self.repeat = code.map(|code| KeyRepeat {
            id,
            code,
            deadline: Instant::now()
                + Duration::from_millis(app_settings::REPEAT_LONG_DELAY_MS),
        });
    }

    fn release(&mut self, id: ButtonId) -> Vec<Notification> {
        if self.repeat.is_some_and(|repeat| repeat.id == id) {
            self.repeat = None;
        }
        self.click(id)
    }

    fn repeat_key(&mut self) -> Vec<Notification> {
        let Some(repeat) = self.repeat.as_mut() else {
            return Vec::new();
        };
        repeat.deadline =
            Instant::now() + Duration::from_millis(app_settings::REPEAT_SHORT_DELAY_MS);
        let code = repeat.code;

        tracing::trace!("Repeating keycode {}", code);
        self.process_key_press(code)
    }

    fn toggle_modifier(&mut self, id: ButtonId, code: Option<u32>) -> Vec<Notification> {
        let was_shift = self.modifiers.shift_active();

        let checked = match code {
            Some(code) => self
                .modifiers
                .toggle(id, code, !self.config.sticky_modifiers),
            None => self.button_mut(id).is_some_and(ButtonModel::toggle),
        };
        if let Some(button) = self.button_mut(id) {
            button.checked = checked;
        }

        let mut notes = vec![Notification::ButtonStateChanged { id, checked }];
        notes.extend(self.sync_shift(was_shift));
        notes
    }

    /// Injects one key with the held modifiers, pausing the lock poller
    /// for the duration.
    ///
    /// One-shot modifiers are only released once a key was delivered; after
    /// a failed injection they stay latched for the next key.
    fn process_key_press(&mut self, code: u32) -> Vec<Notification> {
        let held = self.modifiers.held();

        let was_polling = self.monitor.is_polling();
        self.monitor.stop();
        let result = self.injector.inject(code, &held);
        if was_polling {
            self.monitor.start();
        }

        match result {
            Ok(code) => {
                let mut notes = vec![Notification::KeyProcessComplete(code)];
                notes.extend(self.complete_key_press());
                notes.extend(self.poll());
                notes
            }
            Err(e) => {
                tracing::warn!("Unable to inject keycode {}: {}", code, e);
                Vec::new()
            }
        }
    }

    /// Releases one-shot modifiers after a key was injected.
    fn complete_key_press(&mut self) -> Vec<Notification> {
        let was_shift = self.modifiers.shift_active();
        let mut notes = Vec::new();

        for id in self.modifiers.clear_one_shot() {
            if let Some(button) = self.button_mut(id) {
                button.checked = false;
            }
            notes.push(Notification::ButtonStateChanged { id, checked: false });
        }

        notes.extend(self.sync_shift(was_shift));
        notes
    }

    fn sync_shift(&mut self, was_shift: bool) -> Vec<Notification> {
        let shift = self.modifiers.shift_active();
        if shift == was_shift {
            return Vec::new();
        }

        for button in self.buttons_mut() {
            button.set_shift(shift);
        }
        vec![Notification::ShiftChanged(shift)]
    }

    fn toggle_extension(&mut self) -> Vec<Notification> {
        if self.part(PartKind::Extension).is_none() {
            tracing::debug!("Theme '{}' has no extension part", self.theme_name);
            return Vec::new();
        }

        self.extension_visible = !self.extension_visible;
        vec![Notification::ExtensionVisibilityChanged(
            self.extension_visible,
        )]
    }

    fn select_color_style(&mut self, name: &str) -> Vec<Notification> {
        match self.styles.select_or_default(name) {
            Ok(style) => vec![Notification::ColorStyleChanged {
                name: style.name,
                stylesheet: style.stylesheet,
            }],
            Err(e) => {
                tracing::warn!("{}", e);
                Vec::new()
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
