// SPDX-License-Identifier: GPL-3.0-only

//! vkbd - a themeable on-screen keyboard for X11 desktops
//!
//! This crate provides the engines behind the keyboard window: theme
//! loading and layout, host lock/layout synchronisation, and synthetic key
//! injection. Drawing the buttons is left to the UI that consumes the
//! [`app::Notification`] stream.
//!
//! # Architecture
//!
//! ```text
//!  theme XML ──► layout::parser ──► layout::geometry ──► ButtonModel ──┐
//!                                                                      │
//!  UI clicks ─────────────┐                                            ▼
//!  dbus (layout signals) ─┼──► app::App (single event loop) ──► Notification
//!  poll timer ────────────┘        │            ▲
//!                                  ▼            │
//!                     input::KeyInjector   input::HostStateMonitor
//!                                  │            │
//!                                  └─► InputHost (X11 / mock) ◄─┘
//! ```
//!
//! # Modules
//!
//! - `app`: Event loop, inbox messages and outbound notifications
//! - `app_settings`: Centralized application constants
//! - `config`: User configuration loaded from JSON
//! - `dbus`: Host keyboard-layout service client
//! - `input`: Host input state, key translation and key injection
//! - `layout`: Theme parsing and button geometry
//! - `styles`: Colour style selection

pub mod app;
pub mod app_settings;
pub mod config;
pub mod dbus;
pub mod input;
pub mod layout;
pub mod styles;

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod integration_tests {
    use crate::app::{App, Message, Notification};
    use crate::config::Config;
    use crate::dbus::{self, LayoutService, LayoutSignal};
    use crate::input::mock::MockHost;
    use crate::input::{ButtonId, HostQueryError, KeyEvent, LockKey};
    use crate::layout::PartKind;
    use futures::channel::mpsc;
    use futures::{SinkExt, StreamExt};
    use std::fs;
    use std::sync::Arc;

    const KEY_A: u32 = 38;
    const KEY_SHIFT_L: u32 = 50;

    fn find(app: &App, code: u32) -> ButtonId {
        app.parts()
            .iter()
            .find_map(|part| {
                part.buttons
                    .iter()
                    .position(|b| b.key_code == Some(code))
                    .map(|index| ButtonId::new(part.kind, index))
            })
            .expect("button with keycode")
    }

    /// Fixed answers from a layout service.
    struct FixedService {
        layouts: Vec<String>,
        current: String,
    }

    impl LayoutService for FixedService {
        async fn layouts_list(&self) -> Result<Vec<String>, HostQueryError> {
            Ok(self.layouts.clone())
        }

        async fn current_layout(&self) -> Result<String, HostQueryError> {
            Ok(self.current.clone())
        }
    }

    /// Integration Test 1: Clicks through the running event loop
    ///
    /// Drives `App::run` through its inbox and checks the injected events
    /// and the outbound completion notification.
    #[tokio::test]
    async fn test_event_loop_injects_chord() {
        let host = Arc::new(MockHost::new());
        let mut app = App::new(Config::default(), host.clone());
        app.start().unwrap();
        let shift = find(&app, KEY_SHIFT_L);
        let a = find(&app, KEY_A);

        let (mut inbox_tx, inbox_rx) = mpsc::channel::<Message>(8);
        let (outbox_tx, outbox_rx) = mpsc::unbounded::<Notification>();

        inbox_tx.send(Message::KeyClicked(shift)).await.unwrap();
        inbox_tx.send(Message::KeyClicked(a)).await.unwrap();
        inbox_tx.send(Message::Quit).await.unwrap();

        app.run(inbox_rx, outbox_tx).await;
        let notes: Vec<Notification> = outbox_rx.collect().await;

        assert_eq!(
            host.events(),
            vec![
                KeyEvent::press(KEY_SHIFT_L),
                KeyEvent::press(KEY_A),
                KeyEvent::release(KEY_A),
                KeyEvent::release(KEY_SHIFT_L),
            ]
        );
        assert!(notes.contains(&Notification::KeyProcessComplete(KEY_A)));
    }

    /// Integration Test 2: Layout signals reach the app as messages
    #[tokio::test]
    async fn test_layout_signals_update_app() {
        let host = Arc::new(MockHost::new());
        host.set_mapping(KEY_A, vec![0x61, 0x41, 0x6c6, 0x6e6]);
        let mut app = App::new(Config::default(), host);
        app.start().unwrap();

        let service = FixedService {
            layouts: vec!["us".to_string(), "ru".to_string()],
            current: "ru".to_string(),
        };
        let (tx, rx) = mpsc::channel::<Message>(8);
        dbus::forward_signals(
            &service,
            futures::stream::iter(vec![LayoutSignal::CurrentLayoutChanged]),
            tx,
        )
        .await;

        let mut updates = Vec::new();
        for message in rx.collect::<Vec<_>>().await {
            updates.extend(app.handle(message));
        }

        assert_eq!(
            updates.last(),
            Some(&Notification::LayoutUpdated {
                index: 1,
                name: "ru".to_string()
            })
        );
        assert_eq!(app.monitor().layouts().len(), 2);
        assert_eq!(app.button(find(&app, KEY_A)).unwrap().display_text(), "ф");
    }

    /// Integration Test 3: Themes from the configured directory
    #[test]
    fn test_custom_theme_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("tiny.xml"),
            r#"<theme>
                <buttonWidth width="40"/>
                <part>
                    <row><key code="38"/><key code="56"/></row>
                    <extension><row><key code="79" label="7"/></row></extension>
                </part>
            </theme>"#,
        )
        .unwrap();

        let config = Config {
            theme: "tiny".to_string(),
            theme_dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        };
        let mut app = App::new(config, Arc::new(MockHost::new()));
        let notes = app.start().unwrap();

        assert_eq!(app.theme_name(), "tiny");
        assert!(notes.contains(&Notification::PartLoaded {
            kind: PartKind::Main,
            rows: 1,
            cols: 2,
            size: crate::layout::Size::new(80, 25),
        }));
        assert!(notes.contains(&Notification::PartLoaded {
            kind: PartKind::Extension,
            rows: 1,
            cols: 1,
            size: crate::layout::Size::new(40, 25),
        }));
    }

    /// Integration Test 4: A broken configured theme falls back at startup
    #[test]
    fn test_broken_theme_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.xml"), "<theme><part><row>").unwrap();

        let config = Config {
            theme: "broken".to_string(),
            theme_dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        };
        let mut app = App::new(config, Arc::new(MockHost::new()));
        let notes = app.start().unwrap();

        assert_eq!(notes[0], Notification::ThemeLoaded("standard".to_string()));
    }

    /// Integration Test 5: Num lock state drives the extension's lock key
    #[test]
    fn test_numlock_group_in_extension() {
        let host = Arc::new(MockHost::new());
        host.set_lock(LockKey::NumLock, true);
        let mut app = App::new(Config::default(), host);
        app.start().unwrap();

        app.handle(Message::PollTick);

        let extension = app.part(PartKind::Extension).unwrap();
        let numlock = extension
            .buttons
            .iter()
            .find(|b| b.group_name.as_deref() == Some("numlock"))
            .unwrap();
        assert!(numlock.checked);
        assert!(numlock.is_group_active());
    }
}
