// SPDX-License-Identifier: GPL-3.0-only

//! vkbd Main Application
//!
//! Loads the configuration and theme, closes a leftover login-helper
//! window, then runs the event loop alongside the layout-service client
//! until interrupted.

use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vkbd::app::{App, Message, Notification};
use vkbd::app_settings;
use vkbd::config::Config;
use vkbd::dbus;
use vkbd::input::InputHost;

#[cfg(target_os = "linux")]
fn input_host() -> Option<Arc<dyn InputHost>> {
    Some(Arc::new(vkbd::input::x11::X11Host::new()))
}

#[cfg(not(target_os = "linux"))]
fn input_host() -> Option<Arc<dyn InputHost>> {
    None
}

/// Logs notifications in place of a drawing front-end.
async fn log_notifications(mut notifications: mpsc::UnboundedReceiver<Notification>) {
    while let Some(note) = notifications.next().await {
        match &note {
            Notification::ButtonLoaded { .. } => tracing::trace!("{:?}", note),
            Notification::ColorStyleChanged { name, .. } => {
                tracing::debug!("Colour style '{}' selected", name)
            }
            _ => tracing::debug!("{:?}", note),
        }
    }
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vkbd=info")),
        )
        .init();

    let Some(host) = input_host() else {
        tracing::error!("No supported input host on this platform");
        return ExitCode::FAILURE;
    };

    let config = Config::load();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start the async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async move {
        let use_layout_service = config.layout_service;
        let mut app = App::new(config, host);

        if app.remove_login_marker() {
            tracing::info!("Closed window '{}'", app_settings::LOGIN_MARKER_WINDOW);
        }

        let initial = match app.start() {
            Ok(notes) => notes,
            Err(e) => {
                tracing::error!("{}", e);
                eprintln!("vkbd: {}", e);
                return ExitCode::FAILURE;
            }
        };

        let (inbox_tx, inbox_rx) = mpsc::channel::<Message>(32);
        let (outbox_tx, outbox_rx) = mpsc::unbounded::<Notification>();
        for note in initial {
            let _ = outbox_tx.unbounded_send(note);
        }

        let layout_tx = inbox_tx.clone();
        let layouts = async move {
            if use_layout_service {
                if let Err(e) = dbus::run_layout_service(layout_tx).await {
                    tracing::warn!(
                        "Keyboard layout service unavailable ({}); using '{}'",
                        e,
                        app_settings::FALLBACK_LAYOUT
                    );
                }
            }
            std::future::pending::<()>().await
        };

        let mut quit_tx = inbox_tx;
        let shutdown = async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Interrupted; shutting down");
                    let _ = quit_tx.send(Message::Quit).await;
                }
                Err(e) => tracing::warn!("Unable to listen for Ctrl-C: {}", e),
            }
            std::future::pending::<()>().await
        };

        tokio::select! {
            _ = app.run(inbox_rx, outbox_tx) => {}
            _ = layouts => {}
            _ = shutdown => {}
            _ = log_notifications(outbox_rx) => {}
        }

        ExitCode::SUCCESS
    })
}
