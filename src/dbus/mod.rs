// SPDX-License-Identifier: GPL-3.0-only

//! Client for the host keyboard-layout service on the session bus.
//!
//! vkbd follows the desktop's active keyboard layout through the KDE layout
//! service and never changes it.
//!
//! # Interface
//!
//! - Service: `org.kde.keyboard`
//! - Object path: `/Layouts`
//! - Interface name: `org.kde.KeyboardLayouts`
//! - Methods: `getLayoutsList() -> as`, `getCurrentLayout() -> s`
//! - Signals: `currentLayoutChanged`, `layoutListChanged`
//!
//! # Architecture
//!
//! Signals are not handled where they arrive. [`forward_signals`] turns each
//! one into a fresh query and delivers the replies to the event loop inbox
//! as [`Message::LayoutListChanged`] / [`Message::LayoutChanged`], so all
//! layout state is still updated from the event loop alone.

use crate::app::Message;
use crate::input::HostQueryError;
use futures::channel::mpsc;
use futures::stream::BoxStream;
use futures::{SinkExt, Stream, StreamExt};

/// Result type for D-Bus operations.
pub type DbusResult<T> = Result<T, DbusError>;

/// Errors that can occur during D-Bus operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbusError {
    /// Failed to connect to the session bus or the service.
    ConnectionFailed(String),
    /// Failed to call a method.
    MethodCallFailed(String),
}

impl std::fmt::Display for DbusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbusError::ConnectionFailed(msg) => write!(f, "D-Bus connection failed: {}", msg),
            DbusError::MethodCallFailed(msg) => write!(f, "D-Bus method call failed: {}", msg),
        }
    }
}

impl std::error::Error for DbusError {}

impl From<DbusError> for HostQueryError {
    fn from(e: DbusError) -> Self {
        match e {
            DbusError::ConnectionFailed(msg) => HostQueryError::ServiceUnavailable(msg),
            DbusError::MethodCallFailed(msg) => HostQueryError::InvalidReply(msg),
        }
    }
}

// ============================================================================
// Layout Service
// ============================================================================

/// Asynchronous notifications from the layout service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutSignal {
    CurrentLayoutChanged,
    LayoutListChanged,
}

/// Queries answered by a host keyboard-layout service.
#[allow(async_fn_in_trait)]
pub trait LayoutService {
    /// Ordered names of the configured layouts.
    async fn layouts_list(&self) -> Result<Vec<String>, HostQueryError>;

    /// Name of the active layout.
    async fn current_layout(&self) -> Result<String, HostQueryError>;
}

/// D-Bus proxy for the KDE keyboard-layout service.
#[zbus::proxy(
    interface = "org.kde.KeyboardLayouts",
    default_service = "org.kde.keyboard",
    default_path = "/Layouts"
)]
trait KeyboardLayouts {
    /// Names of the configured layouts.
    #[zbus(name = "getLayoutsList")]
    fn get_layouts_list(&self) -> zbus::Result<Vec<String>>;

    /// Name of the active layout.
    #[zbus(name = "getCurrentLayout")]
    fn get_current_layout(&self) -> zbus::Result<String>;

    /// The active layout changed.
    #[zbus(signal, name = "currentLayoutChanged")]
    fn current_layout_changed(&self) -> zbus::Result<()>;

    /// The layout list changed.
    #[zbus(signal, name = "layoutListChanged")]
    fn layout_list_changed(&self) -> zbus::Result<()>;
}

/// [`LayoutService`] backed by the KDE service on the session bus.
pub struct KdeLayoutService {
    proxy: KeyboardLayoutsProxy<'static>,
}

impl std::fmt::Debug for KdeLayoutService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KdeLayoutService").finish_non_exhaustive()
    }
}

impl KdeLayoutService {
    /// Connects to the session bus and creates the service proxy.
    pub async fn connect() -> DbusResult<Self> {
        let connection = zbus::Connection::session()
            .await
            .map_err(|e| DbusError::ConnectionFailed(e.to_string()))?;

        let proxy = KeyboardLayoutsProxy::new(&connection)
            .await
            .map_err(|e| DbusError::ConnectionFailed(e.to_string()))?;

        tracing::debug!(
            "Connected to {} ({} at {})",
            crate::app_settings::LAYOUT_SERVICE_NAME,
            crate::app_settings::LAYOUT_SERVICE_INTERFACE,
            crate::app_settings::LAYOUT_SERVICE_PATH
        );
        Ok(Self { proxy })
    }

    /// Merged stream of both layout signals.
    pub async fn signals(&self) -> DbusResult<BoxStream<'static, LayoutSignal>> {
        let current = self
            .proxy
            .receive_current_layout_changed()
            .await
            .map_err(|e| DbusError::MethodCallFailed(e.to_string()))?
            .map(|_| LayoutSignal::CurrentLayoutChanged);

        let list = self
            .proxy
            .receive_layout_list_changed()
            .await
            .map_err(|e| DbusError::MethodCallFailed(e.to_string()))?
            .map(|_| LayoutSignal::LayoutListChanged);

        Ok(futures::stream::select(current, list).boxed())
    }
}

impl LayoutService for KdeLayoutService {
    async fn layouts_list(&self) -> Result<Vec<String>, HostQueryError> {
        self.proxy
            .get_layouts_list()
            .await
            .map_err(|e| DbusError::MethodCallFailed(e.to_string()).into())
    }

    async fn current_layout(&self) -> Result<String, HostQueryError> {
        self.proxy
            .get_current_layout()
            .await
            .map_err(|e| DbusError::MethodCallFailed(e.to_string()).into())
    }
}

// ============================================================================
// Signal Forwarding
// ============================================================================

/// Queries the service for one signal and builds the inbox messages.
///
/// A list change also re-resolves the current layout against the new list.
pub async fn messages_for_signal<S: LayoutService>(
    service: &S,
    signal: LayoutSignal,
) -> Vec<Message> {
    match signal {
        LayoutSignal::CurrentLayoutChanged => {
            vec![Message::LayoutChanged(service.current_layout().await)]
        }
        LayoutSignal::LayoutListChanged => vec![
            Message::LayoutListChanged(service.layouts_list().await),
            Message::LayoutChanged(service.current_layout().await),
        ],
    }
}

/// Forwards layout signals into the event loop inbox.
///
/// Starts with a full sync (as if the layout list had changed), then handles
/// signals one at a time until the stream ends or the inbox closes.
pub async fn forward_signals<S, St>(service: &S, mut signals: St, mut inbox: mpsc::Sender<Message>)
where
    S: LayoutService,
    St: Stream<Item = LayoutSignal> + Unpin,
{
    let mut next = Some(LayoutSignal::LayoutListChanged);

    while let Some(signal) = next {
        tracing::debug!("Layout signal: {:?}", signal);
        for message in messages_for_signal(service, signal).await {
            if inbox.send(message).await.is_err() {
                tracing::debug!("Inbox closed; stopping layout signal forwarding");
                return;
            }
        }
        next = signals.next().await;
    }

    tracing::debug!("Layout signal stream ended");
}

/// Connects to the KDE layout service and forwards its signals until the
/// inbox closes.
///
/// # Errors
///
/// Returns an error when the bus or the service cannot be reached; the
/// caller keeps running with the fallback layout.
pub async fn run_layout_service(inbox: mpsc::Sender<Message>) -> DbusResult<()> {
    let service = KdeLayoutService::connect().await?;
    let signals = service.signals().await?;
    forward_signals(&service, signals, inbox).await;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Scripted layout service; the current layout advances per query.
    struct ScriptedService {
        layouts: Result<Vec<String>, HostQueryError>,
        current: Vec<&'static str>,
        queries: Cell<usize>,
    }

    impl ScriptedService {
        fn new(layouts: &[&str], current: Vec<&'static str>) -> Self {
            Self {
                layouts: Ok(layouts.iter().map(|l| l.to_string()).collect()),
                current,
                queries: Cell::new(0),
            }
        }
    }

    impl LayoutService for ScriptedService {
        async fn layouts_list(&self) -> Result<Vec<String>, HostQueryError> {
            self.layouts.clone()
        }

        async fn current_layout(&self) -> Result<String, HostQueryError> {
            let n = self.queries.get();
            self.queries.set(n + 1);
            self.current
                .get(n)
                .map(|name| name.to_string())
                .ok_or_else(|| HostQueryError::InvalidReply("no more replies".to_string()))
        }
    }

    /// Test 1: Error conversion into host query errors
    #[test]
    fn test_dbus_error_display_and_conversion() {
        let conn = DbusError::ConnectionFailed("no bus".to_string());
        let call = DbusError::MethodCallFailed("timeout".to_string());
        assert!(conn.to_string().contains("connection failed"));
        assert!(call.to_string().contains("method call failed"));

        assert_eq!(
            HostQueryError::from(conn),
            HostQueryError::ServiceUnavailable("no bus".to_string())
        );
        assert_eq!(
            HostQueryError::from(call),
            HostQueryError::InvalidReply("timeout".to_string())
        );
    }

    /// Test 2: A list change re-queries the list and the current layout
    #[tokio::test]
    async fn test_messages_for_list_change() {
        let service = ScriptedService::new(&["us", "de"], vec!["de"]);
        let messages = messages_for_signal(&service, LayoutSignal::LayoutListChanged).await;

        assert_eq!(
            messages,
            vec![
                Message::LayoutListChanged(Ok(vec!["us".to_string(), "de".to_string()])),
                Message::LayoutChanged(Ok("de".to_string())),
            ]
        );
    }

    /// Test 3: Forwarding syncs first, then one query per signal, in order
    #[tokio::test]
    async fn test_forward_signals() {
        let service = ScriptedService::new(&["us", "ru"], vec!["us", "ru"]);
        let signals = futures::stream::iter(vec![
            LayoutSignal::CurrentLayoutChanged,
            LayoutSignal::CurrentLayoutChanged,
        ]);
        let (tx, rx) = mpsc::channel::<Message>(16);

        forward_signals(&service, signals, tx).await;
        let messages: Vec<Message> = rx.collect().await;

        assert_eq!(messages.len(), 4);
        assert!(matches!(messages[0], Message::LayoutListChanged(Ok(_))));
        assert_eq!(messages[1], Message::LayoutChanged(Ok("us".to_string())));
        assert_eq!(messages[2], Message::LayoutChanged(Ok("ru".to_string())));
        assert!(matches!(messages[3], Message::LayoutChanged(Err(_))));
    }

    /// Test 4: Forwarding stops when the inbox is closed
    #[tokio::test]
    async fn test_forward_stops_on_closed_inbox() {
        let service = ScriptedService::new(&["us"], vec!["us"]);
        let (tx, rx) = mpsc::channel::<Message>(16);
        drop(rx);

        forward_signals(&service, futures::stream::pending(), tx).await;
        assert_eq!(service.queries.get(), 1, "only the initial sync ran");
    }

    /// Test 5: Without a session bus connecting fails; with one, a missing
    /// layout service surfaces as an invalid reply.
    #[tokio::test]
    async fn test_connect_without_service() {
        match KdeLayoutService::connect().await {
            Ok(service) => match service.layouts_list().await {
                Ok(layouts) => assert!(layouts.iter().all(|name| !name.is_empty())),
                Err(e) => assert!(
                    matches!(e, HostQueryError::InvalidReply(_)),
                    "unexpected error: {}",
                    e
                ),
            },
            Err(DbusError::ConnectionFailed(msg)) => {
                tracing::warn!("D-Bus session not available: {}", msg);
            }
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }
}
