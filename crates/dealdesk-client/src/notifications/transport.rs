// Dealdesk
// Copyright (C) 2025 Dealdesk

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Notification channel connection manager
//!
//! One logical connection per session: connect, heartbeat, listener
//! fanout, bounded exponential reconnect, and a disconnect that fully
//! neutralizes the reader and timers before tearing the socket down so a
//! late event cannot fire into cleared state.
//!
//! An invalid endpoint URL is a fatal configuration error for the connect
//! attempt: it is reported and no retry is scheduled. Transient transport
//! failures reconnect with `min(2^attempts * 1s, cap)` delays until the
//! attempt budget is spent.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use metrics::counter;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::notifications::messages::{ClientMessage, Notification, ServerMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;
type Listener = Box<dyn Fn(&Notification) + Send + Sync>;

/// Connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closing,
}

/// Notification transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// WebSocket endpoint; must be a `ws` or `wss` URL
    pub url: String,

    /// Interval between heartbeat pings
    pub heartbeat_interval: Duration,

    /// Maximum reconnect attempts after a non-clean close
    pub max_reconnect_attempts: u32,

    /// Upper bound on the exponential backoff delay
    pub reconnect_backoff_cap: Duration,

    /// Add random jitter to reconnect delays
    pub jitter: bool,
}

impl TransportConfig {
    /// Configuration with default timing for an endpoint
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            heartbeat_interval: Duration::from_secs(30),
            max_reconnect_attempts: 5,
            reconnect_backoff_cap: Duration::from_secs(30),
            jitter: false,
        }
    }

    /// Reconnect delay for the given prior attempt count
    pub fn backoff_delay(&self, attempts: u32) -> Duration {
        let exp = Duration::from_millis(1000u64.saturating_mul(1u64 << attempts.min(30)));
        let mut delay = exp.min(self.reconnect_backoff_cap);

        if self.jitter {
            delay += Duration::from_millis(rand::thread_rng().gen_range(0..250));
        }

        delay
    }
}

#[derive(Default)]
struct TaskHandles {
    reader: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
    reconnect: Option<JoinHandle<()>>,
}

impl TaskHandles {
    fn abort_all(&mut self) {
        for handle in [self.reader.take(), self.heartbeat.take(), self.reconnect.take()].into_iter().flatten() {
            handle.abort();
        }
    }
}

struct TransportInner {
    config: TransportConfig,
    state: RwLock<ConnectionState>,
    listeners: DashMap<Uuid, Listener>,
    reconnect_attempts: AtomicU32,
    token: RwLock<Option<String>>,
    sink: tokio::sync::Mutex<Option<WsSink>>,
    tasks: Mutex<TaskHandles>,
}

/// Connection manager for the push-notification channel
#[derive(Clone)]
pub struct NotificationTransport {
    inner: Arc<TransportInner>,
}

impl NotificationTransport {
    /// Create a disconnected transport
    pub fn new(config: TransportConfig) -> Self {
        Self {
            inner: Arc::new(TransportInner {
                config,
                state: RwLock::new(ConnectionState::Disconnected),
                listeners: DashMap::new(),
                reconnect_attempts: AtomicU32::new(0),
                token: RwLock::new(None),
                sink: tokio::sync::Mutex::new(None),
                tasks: Mutex::new(TaskHandles::default()),
            }),
        }
    }

    /// Open the notification channel
    ///
    /// No-op when already open or connecting. An invalid endpoint is a
    /// configuration error: logged, returned, and never retried. A failed
    /// network attempt is transient and enters the reconnect schedule.
    pub async fn connect(&self, token: &str) -> ClientResult<()> {
        {
            let state = self.inner.state.read();
            if matches!(*state, ConnectionState::Open | ConnectionState::Connecting) {
                debug!(state = ?*state, "connect ignored, channel already active");
                return Ok(());
            }
        }

        let url = self.endpoint(token)?;

        *self.inner.token.write() = Some(token.to_string());
        *self.inner.state.write() = ConnectionState::Connecting;
        self.establish(url).await;
        Ok(())
    }

    /// Close the channel and reset the transport
    ///
    /// Timers and the reader are cancelled before the socket is touched,
    /// so no event arriving after this call reaches a listener.
    pub async fn disconnect(&self) {
        *self.inner.state.write() = ConnectionState::Closing;

        self.inner.tasks.lock().abort_all();

        let mut sink = self.inner.sink.lock().await;
        if let Some(mut sink) = sink.take() {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "client disconnect".into(),
            };
            if let Err(e) = sink.send(WsMessage::Close(Some(frame))).await {
                debug!(error = %e, "close frame send failed");
            }
        }
        drop(sink);

        self.inner.listeners.clear();
        self.inner.reconnect_attempts.store(0, Ordering::SeqCst);
        *self.inner.token.write() = None;
        *self.inner.state.write() = ConnectionState::Disconnected;
        info!("notification channel disconnected");
    }

    /// Register a listener; returns its id for [`Self::unsubscribe`]
    pub fn subscribe(&self, callback: impl Fn(&Notification) + Send + Sync + 'static) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.listeners.insert(id, Box::new(callback));
        debug!(listener_id = %id, "notification listener registered");
        id
    }

    /// Remove a listener
    pub fn unsubscribe(&self, id: Uuid) -> bool {
        let removed = self.inner.listeners.remove(&id).is_some();
        if removed {
            debug!(listener_id = %id, "notification listener removed");
        }
        removed
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Whether the channel is open
    pub fn is_connected(&self) -> bool {
        *self.inner.state.read() == ConnectionState::Open
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    /// Reconnect attempts consumed since the last successful open
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.reconnect_attempts.load(Ordering::SeqCst)
    }

    /// Send a heartbeat ping if the channel is open
    ///
    /// The socket may close between the state check and the send; that
    /// race is tolerated, not prevented.
    pub async fn send_heartbeat(&self) {
        if !self.is_connected() {
            return;
        }

        let payload = match serde_json::to_string(&ClientMessage::Ping) {
            Ok(payload) => payload,
            Err(_) => return,
        };

        let mut sink = self.inner.sink.lock().await;
        if let Some(sink) = sink.as_mut() {
            if let Err(e) = sink.send(WsMessage::Text(payload)).await {
                debug!(error = %e, "heartbeat send failed");
            } else {
                counter!("notification_heartbeats_sent", 1);
            }
        }
    }

    fn endpoint(&self, token: &str) -> ClientResult<Url> {
        let mut url = Url::parse(&self.inner.config.url).map_err(|e| {
            error!(url = %self.inner.config.url, error = %e, "invalid notification endpoint");
            ClientError::Config {
                message: format!("invalid notification endpoint: {}", e),
            }
        })?;

        if url.scheme() != "ws" && url.scheme() != "wss" {
            error!(url = %self.inner.config.url, scheme = %url.scheme(), "notification endpoint must use ws or wss");
            return Err(ClientError::Config {
                message: format!("notification endpoint must use ws or wss, got {}", url.scheme()),
            });
        }

        url.query_pairs_mut().append_pair("token", token);
        Ok(url)
    }

    async fn establish(&self, url: Url) {
        match connect_async(url.as_str()).await {
            Ok((stream, _response)) => {
                self.inner.reconnect_attempts.store(0, Ordering::SeqCst);

                let (sink, stream) = stream.split();
                *self.inner.sink.lock().await = Some(sink);
                *self.inner.state.write() = ConnectionState::Open;

                let mut tasks = self.inner.tasks.lock();
                tasks.reader = Some(self.spawn_reader(stream));
                tasks.heartbeat = Some(self.spawn_heartbeat());

                counter!("notification_transport_connects", 1);
                info!("notification channel connected");
            }
            Err(e) => {
                warn!(error = %e, "notification channel connect failed");
                counter!("notification_transport_errors", 1);
                *self.inner.state.write() = ConnectionState::Disconnected;
                self.schedule_reconnect();
            }
        }
    }

    fn spawn_reader(&self, mut stream: SplitStream<WsStream>) -> JoinHandle<()> {
        let transport = self.clone();

        tokio::spawn(async move {
            let mut clean = false;

            while let Some(message) = stream.next().await {
                match message {
                    Ok(WsMessage::Text(text)) => transport.dispatch(&text),
                    Ok(WsMessage::Close(frame)) => {
                        clean = matches!(&frame, Some(f) if f.code == CloseCode::Normal);
                        info!(clean = clean, "notification channel closed by server");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "notification channel transport error");
                        counter!("notification_transport_errors", 1);
                        break;
                    }
                }
            }

            transport.on_close(clean).await;
        })
    }

    fn spawn_heartbeat(&self) -> JoinHandle<()> {
        let transport = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(transport.inner.config.heartbeat_interval);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                transport.send_heartbeat().await;
            }
        })
    }

    async fn on_close(&self, clean: bool) {
        {
            let mut tasks = self.inner.tasks.lock();
            if let Some(heartbeat) = tasks.heartbeat.take() {
                heartbeat.abort();
            }
            // The reader is the task running this; it ends right after
            tasks.reader = None;
        }

        *self.inner.sink.lock().await = None;
        *self.inner.state.write() = ConnectionState::Disconnected;

        if clean {
            debug!("clean close, not reconnecting");
            return;
        }

        self.schedule_reconnect();
    }

    fn schedule_reconnect(&self) {
        let attempts = self.inner.reconnect_attempts.load(Ordering::SeqCst);
        if attempts >= self.inner.config.max_reconnect_attempts {
            warn!(attempts = attempts, "reconnect budget exhausted, giving up");
            return;
        }

        self.inner.reconnect_attempts.store(attempts + 1, Ordering::SeqCst);
        let delay = self.inner.config.backoff_delay(attempts);

        info!(attempt = attempts + 1, delay_ms = delay.as_millis() as u64, "scheduling notification reconnect");
        counter!("notification_transport_reconnects", 1);

        let transport = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let token = transport.inner.token.read().clone();
            let Some(token) = token else {
                return;
            };

            match transport.endpoint(&token) {
                Ok(url) => {
                    *transport.inner.state.write() = ConnectionState::Connecting;
                    transport.establish(url).await;
                }
                Err(_) => {
                    // endpoint() already logged; configuration errors are
                    // not retried
                }
            }
        });

        self.inner.tasks.lock().reconnect = Some(handle);
    }

    fn dispatch(&self, text: &str) {
        counter!("notification_transport_messages", 1);

        let message: ServerMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "malformed notification payload, dropping");
                counter!("notification_transport_malformed", 1);
                return;
            }
        };

        match message {
            ServerMessage::Notification { notification } => self.fan_out(&notification),
            ServerMessage::NotificationBatch { notifications } => {
                for notification in &notifications {
                    self.fan_out(notification);
                }
            }
            ServerMessage::Pong => debug!("heartbeat acknowledged"),
        }
    }

    fn fan_out(&self, notification: &Notification) {
        // No ordering guarantee across listeners
        for entry in self.inner.listeners.iter() {
            (entry.value())(notification);
        }
    }

    #[cfg(test)]
    fn has_pending_reconnect(&self) -> bool {
        self.inner.tasks.lock().reconnect.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(url: &str) -> TransportConfig {
        TransportConfig::new(url)
    }

    fn collected() -> (Arc<Mutex<Vec<Notification>>>, impl Fn(&Notification) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |n: &Notification| sink.lock().push(n.clone()))
    }

    #[tokio::test]
    async fn test_invalid_scheme_is_fatal() {
        let transport = NotificationTransport::new(test_config("http://example.com/notifications/"));

        let result = transport.connect("token-1").await;
        assert!(matches!(result, Err(ClientError::Config { .. })));
        assert_eq!(transport.state(), ConnectionState::Disconnected);
        assert!(!transport.has_pending_reconnect());
        assert_eq!(transport.reconnect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_url_is_fatal() {
        let transport = NotificationTransport::new(test_config("not a url"));

        assert!(matches!(transport.connect("token-1").await, Err(ClientError::Config { .. })));
        assert!(!transport.has_pending_reconnect());
    }

    #[test]
    fn test_backoff_schedule() {
        let config = test_config("wss://example.com/notifications/");

        assert_eq!(config.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(config.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(config.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(config.backoff_delay(4), Duration::from_secs(16));
        // Capped from here on
        assert_eq!(config.backoff_delay(5), Duration::from_secs(30));
        assert_eq!(config.backoff_delay(12), Duration::from_secs(30));
    }

    #[test]
    fn test_backoff_jitter_stays_near_base() {
        let mut config = test_config("wss://example.com/notifications/");
        config.jitter = true;

        let delay = config.backoff_delay(1);
        assert!(delay >= Duration::from_secs(2));
        assert!(delay < Duration::from_millis(2250));
    }

    #[tokio::test]
    async fn test_dispatch_fans_out_to_all_listeners() {
        let transport = NotificationTransport::new(test_config("wss://example.com/notifications/"));
        let (first_seen, first) = collected();
        let (second_seen, second) = collected();
        transport.subscribe(first);
        transport.subscribe(second);

        transport.dispatch(r#"{"type":"notification","notification":{"id":"n1","title":"Deal updated"}}"#);

        assert_eq!(first_seen.lock().len(), 1);
        assert_eq!(second_seen.lock().len(), 1);
        assert_eq!(first_seen.lock()[0].id, "n1");
    }

    #[tokio::test]
    async fn test_dispatch_batch_fans_out_each_item() {
        let transport = NotificationTransport::new(test_config("wss://example.com/notifications/"));
        let (seen, listener) = collected();
        transport.subscribe(listener);

        transport.dispatch(r#"{"type":"notification_batch","notifications":[{"id":"n1","title":"a"},{"id":"n2","title":"b"}]}"#);

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].id, "n2");
    }

    #[tokio::test]
    async fn test_malformed_payload_is_dropped() {
        let transport = NotificationTransport::new(test_config("wss://example.com/notifications/"));
        let (seen, listener) = collected();
        transport.subscribe(listener);

        transport.dispatch("{not json");
        transport.dispatch(r#"{"type":"unknown_event"}"#);

        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_pong_is_silent() {
        let transport = NotificationTransport::new(test_config("wss://example.com/notifications/"));
        let (seen, listener) = collected();
        transport.subscribe(listener);

        transport.dispatch(r#"{"type":"pong"}"#);

        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let transport = NotificationTransport::new(test_config("wss://example.com/notifications/"));
        let (seen, listener) = collected();
        let id = transport.subscribe(listener);

        assert!(transport.unsubscribe(id));
        assert!(!transport.unsubscribe(id));

        transport.dispatch(r#"{"type":"notification","notification":{"id":"n1","title":"a"}}"#);
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_detaches_everything() {
        let transport = NotificationTransport::new(test_config("wss://example.com/notifications/"));
        let (seen, listener) = collected();
        transport.subscribe(listener);

        transport.disconnect().await;

        assert_eq!(transport.state(), ConnectionState::Disconnected);
        assert_eq!(transport.listener_count(), 0);
        assert_eq!(transport.reconnect_attempts(), 0);

        // A late event after disconnect reaches no listener
        transport.dispatch(r#"{"type":"notification","notification":{"id":"n1","title":"a"}}"#);
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_reconnect_budget_exhaustion() {
        let transport = NotificationTransport::new(test_config("wss://example.com/notifications/"));

        transport.inner.reconnect_attempts.store(5, Ordering::SeqCst);
        transport.schedule_reconnect();

        assert!(!transport.has_pending_reconnect());
        assert_eq!(transport.reconnect_attempts(), 5);
    }

    #[tokio::test]
    async fn test_reconnect_increments_attempts() {
        let transport = NotificationTransport::new(test_config("wss://example.com/notifications/"));

        transport.schedule_reconnect();
        assert!(transport.has_pending_reconnect());
        assert_eq!(transport.reconnect_attempts(), 1);

        transport.disconnect().await;
    }

    #[tokio::test]
    async fn test_heartbeat_noop_when_disconnected() {
        let transport = NotificationTransport::new(test_config("wss://example.com/notifications/"));

        // Must not panic or hang without a socket
        transport.send_heartbeat().await;
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_connect_against_local_server() {
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Minimal server: accept one connection, push one notification,
        // answer pings, then hold the socket open
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            let push = r#"{"type":"notification","notification":{"id":"n1","title":"Payment verified","category":"payment_verified"}}"#;
            ws.send(WsMessage::Text(push.to_string())).await.unwrap();

            while let Some(Ok(message)) = ws.next().await {
                if let WsMessage::Text(text) = message {
                    if text.contains("ping") {
                        ws.send(WsMessage::Text(r#"{"type":"pong"}"#.to_string())).await.ok();
                    }
                } else if message.is_close() {
                    break;
                }
            }
        });

        let transport = NotificationTransport::new(test_config(&format!("ws://{}/notifications/", addr)));
        let (seen, listener) = collected();
        transport.subscribe(listener);

        transport.connect("token-1").await.unwrap();
        assert!(transport.is_connected());

        // Connecting again while open is a no-op
        transport.connect("token-1").await.unwrap();

        for _ in 0..50 {
            if !seen.lock().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(seen.lock()[0].category.as_deref(), Some("payment_verified"));

        // Heartbeat goes through on the live socket
        transport.send_heartbeat().await;

        transport.disconnect().await;
        assert!(!transport.is_connected());
        assert_eq!(transport.listener_count(), 0);
    }
}
