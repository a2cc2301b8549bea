#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::stream::{SplitSink, SplitStream};
use futures::{FutureExt as _, SinkExt as _, StreamExt as _};
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout};
use tokio_tungstenite::tungstenite::client::IntoClientRequest as _;
use tokio_tungstenite::tungstenite::error::CapacityError;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{Bytes, Error as TungsteniteError, Message};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, client_async_tls_with_config, connect_async_with_config,
};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::backoff::ReconnectDelay;
use super::config::{Options, resolve_endpoint};
use super::error::SocketError;
use super::frame::FrameAccumulator;
use crate::error::Error;
use crate::events::{Envelope, EventKind, FeedEvent, dispatch};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Writer = SplitSink<WsStream, Message>;
type Reader = SplitStream<WsStream>;

/// Broadcast channel capacity for client events.
const EVENT_CAPACITY: usize = 1024;

/// Ceiling for a single handshake attempt inside the reconnect loop.
const RECONNECT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected
    Idle,
    /// Handshake in progress
    Connecting,
    /// Successfully connected
    Open {
        /// When the connection was established
        since: Instant,
    },
    /// Caller-initiated close in progress
    Closing,
    /// Not connected
    Closed,
    /// Reconnecting after failure
    Reconnecting {
        /// Current reconnection attempt number
        attempt: u32,
    },
}

impl ConnectionState {
    /// Check if the connection is currently active.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

/// Everything the client broadcasts, in arrival order.
///
/// Each incoming message fans out through the tiers: the raw text first, then
/// the generic envelope, then the typed event when the kind is recognized.
/// Decode failures surface as [`ClientEvent::Error`] without tearing down the
/// connection.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Connection established (initial or after reconnect)
    Connected,
    /// Connection lost or closed
    Disconnected {
        /// Close status code from the server, when one was sent
        status: Option<u16>,
        /// Close reason from the server, when one was sent
        reason: Option<String>,
        /// Whether the reconnect policy will attempt recovery
        will_reconnect: bool,
    },
    /// Non-fatal error (decode failure, reconnect attempt failure)
    Error(Arc<Error>),
    /// Raw message text, before any decoding
    Raw(String),
    /// Generic envelope tier
    Envelope(Envelope),
    /// Fully typed event tier
    Event(FeedEvent),
}

/// Handle to one live socket. The writer mutex is the single outbound gate:
/// keep-alive pings, control requests, and caller sends all serialize
/// through it so frames are never interleaved.
struct Handle {
    writer: Mutex<Writer>,
    /// Sub-protocol the server agreed to, if any
    protocol: Option<String>,
}

struct Active {
    handle: Arc<Handle>,
    token: CancellationToken,
}

struct Inner {
    options: Options,
    base_path: String,
    cookies: Option<Arc<dyn reqwest::cookie::CookieStore>>,
    state_tx: watch::Sender<ConnectionState>,
    events_tx: broadcast::Sender<ClientEvent>,
    /// Serializes connect/disconnect so overlapping calls cannot race
    ops: Mutex<()>,
    active: RwLock<Option<Active>>,
    receive_task: StdMutex<Option<JoinHandle<()>>>,
    user_close: AtomicBool,
    disposed: AtomicBool,
    /// Cancelled once on dispose so background tasks can exit
    shutdown: CancellationToken,
}

/// Manages the WebSocket connection lifecycle: handshake, keep-alive,
/// receive/dispatch loop, and automatic reconnection with jittered
/// exponential backoff.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    pub(crate) fn new(
        base_path: String,
        options: Options,
        cookies: Option<Arc<dyn reqwest::cookie::CookieStore>>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                options,
                base_path,
                cookies,
                state_tx,
                events_tx,
                ops: Mutex::new(()),
                active: RwLock::new(None),
                receive_task: StdMutex::new(None),
                user_close: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Open the connection. Idempotent while already connected.
    pub async fn connect(&self) -> crate::Result<()> {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return Err(Error::disposed());
        }
        let _guard = self.inner.ops.lock().await;
        if self.state().is_connected() {
            return Ok(());
        }
        self.inner.user_close.store(false, Ordering::SeqCst);
        Self::establish(&self.inner).await
    }

    /// Close the connection and suppress reconnection.
    ///
    /// The close frame is best-effort; a connection that cannot deliver it is
    /// torn down regardless.
    pub async fn disconnect(&self) -> crate::Result<()> {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return Err(Error::disposed());
        }
        let _guard = self.inner.ops.lock().await;
        self.inner.user_close.store(true, Ordering::SeqCst);

        let active = self
            .inner
            .active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let task = self
            .inner
            .receive_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let had_active = active.is_some();
        if let Some(active) = active {
            _ = self.inner.state_tx.send(ConnectionState::Closing);
            {
                let mut writer = active.handle.writer.lock().await;
                if let Err(_e) = writer.send(Message::Close(None)).await {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(error = %_e, "Close frame could not be delivered");
                }
            }
            active.token.cancel();
        }
        if let Some(task) = task {
            _ = task.await;
        }
        if had_active {
            _ = self.inner.events_tx.send(ClientEvent::Disconnected {
                status: None,
                reason: None,
                will_reconnect: false,
            });
        }
        _ = self.inner.state_tx.send(ConnectionState::Closed);
        Ok(())
    }

    /// Send raw text over the socket.
    ///
    /// Fails without writing when the connection is not open; nothing is
    /// queued for a later connection.
    pub async fn send_text(&self, text: String) -> crate::Result<()> {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return Err(Error::disposed());
        }
        if !self.state().is_connected() {
            return Err(Error::state("cannot send: connection is not open"));
        }
        let handle = {
            let active = self
                .inner
                .active
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            match active.as_ref() {
                Some(active) => Arc::clone(&active.handle),
                None => return Err(Error::state("cannot send: connection is not open")),
            }
        };
        let mut writer = handle.writer.lock().await;
        writer
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| Error::from(SocketError::Transport(e)))
    }

    /// Release the client. Terminal; every later operation fails fast.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        self.inner.shutdown.cancel();
        let active = self
            .inner
            .active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(active) = active {
            active.token.cancel();
        }
        _ = self.inner.state_tx.send(ConnectionState::Closed);
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Subscribe to the client event bus.
    ///
    /// Each call returns a new independent receiver. Slow receivers lag and
    /// miss messages rather than blocking the receive loop.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Subscribe to connection state changes.
    ///
    /// Useful for detecting reconnections and re-establishing subscriptions.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Token cancelled when the client is disposed. Background tasks tied to
    /// the client's lifetime select on it to shut down.
    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }

    /// Sub-protocol the server selected during the handshake, if any.
    #[must_use]
    pub fn selected_protocol(&self) -> Option<String> {
        self.inner
            .active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|active| active.handle.protocol.clone())
    }

    /// Perform one handshake and, on success, install the connection and
    /// spawn the receive loop.
    ///
    /// Boxed: the receive loop this spawns re-enters `establish` through the
    /// reconnect path, and the cycle of opaque futures otherwise keeps the
    /// compiler from proving the spawned tasks are `Send`.
    fn establish(inner: &Arc<Inner>) -> BoxFuture<'_, crate::Result<()>> {
        async move {
            let endpoint = resolve_endpoint(&inner.base_path, &inner.options)?;
            _ = inner.state_tx.send(ConnectionState::Connecting);

            let token = CancellationToken::new();
            let (stream, protocol) = match Self::open_stream(inner, &endpoint).await {
                Ok(pair) => pair,
                Err(e) => {
                    _ = inner.state_tx.send(ConnectionState::Closed);
                    return Err(e.into());
                }
            };

            let (writer, reader) = stream.split();
            let handle = Arc::new(Handle {
                writer: Mutex::new(writer),
                protocol,
            });
            *inner.active.write().unwrap_or_else(PoisonError::into_inner) = Some(Active {
                handle: Arc::clone(&handle),
                token: token.clone(),
            });

            _ = inner.state_tx.send(ConnectionState::Open {
                since: Instant::now(),
            });
            _ = inner.events_tx.send(ClientEvent::Connected);
            #[cfg(feature = "tracing")]
            tracing::debug!(%endpoint, "Pipeline connection established");

            let task_inner = Arc::clone(inner);
            let task = tokio::spawn(async move {
                Self::receive_loop(task_inner, handle, reader, token).await;
            });
            *inner
                .receive_task
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(task);
            Ok(())
        }
        .boxed()
    }

    /// Dial the endpoint (optionally through a proxy tunnel) and complete the
    /// WebSocket handshake.
    async fn open_stream(
        inner: &Arc<Inner>,
        endpoint: &Url,
    ) -> Result<(WsStream, Option<String>), SocketError> {
        let mut request = endpoint
            .as_str()
            .into_client_request()
            .map_err(SocketError::Connect)?;

        // Requesting a sub-protocol makes the handshake strict: tungstenite
        // rejects servers that do not pick one. Only send the header when the
        // caller asked for protocols.
        if !inner.options.sub_protocols.is_empty()
            && let Ok(value) = HeaderValue::from_str(&inner.options.sub_protocols.join(", "))
        {
            request
                .headers_mut()
                .insert(header::SEC_WEBSOCKET_PROTOCOL, value);
        }

        if let Some(store) = &inner.cookies
            && let Some(value) = Self::cookie_header(store.as_ref(), endpoint)
        {
            request.headers_mut().insert(header::COOKIE, value);
        }

        let config = WebSocketConfig::default()
            .read_buffer_size(inner.options.receive_buffer_size)
            .max_message_size(Some(inner.options.max_message_bytes));

        let (stream, response) = if let Some(proxy) = &inner.options.proxy {
            let tcp = Self::proxy_tunnel(proxy, endpoint).await?;
            client_async_tls_with_config(request, tcp, Some(config), None)
                .await
                .map_err(SocketError::Connect)?
        } else {
            connect_async_with_config(request, Some(config), false)
                .await
                .map_err(SocketError::Connect)?
        };

        let protocol = response
            .headers()
            .get(header::SEC_WEBSOCKET_PROTOCOL)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        Ok((stream, protocol))
    }

    /// Build the Cookie header for the handshake.
    ///
    /// Cookie stores are keyed by HTTP origins, so the lookup uses the
    /// `https`/`http` twin of the pipeline endpoint.
    fn cookie_header(
        store: &dyn reqwest::cookie::CookieStore,
        endpoint: &Url,
    ) -> Option<HeaderValue> {
        let mut twin = endpoint.clone();
        let scheme = if endpoint.scheme() == "wss" {
            "https"
        } else {
            "http"
        };
        twin.set_scheme(scheme).ok()?;
        let value = store.cookies(&twin)?;
        HeaderValue::from_str(value.to_str().ok()?).ok()
    }

    /// Open a TCP connection through an HTTP `CONNECT` proxy.
    async fn proxy_tunnel(proxy: &Url, endpoint: &Url) -> Result<TcpStream, SocketError> {
        fn invalid(message: &str) -> SocketError {
            SocketError::Proxy(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                message.to_owned(),
            ))
        }

        let proxy_host = proxy.host_str().ok_or_else(|| invalid("proxy has no host"))?;
        let proxy_port = proxy.port_or_known_default().unwrap_or(8080);
        let host = endpoint
            .host_str()
            .ok_or_else(|| invalid("endpoint has no host"))?;
        let port = endpoint.port_or_known_default().unwrap_or(443);

        let mut stream = TcpStream::connect((proxy_host, proxy_port))
            .await
            .map_err(SocketError::Proxy)?;
        let connect = format!("CONNECT {host}:{port} HTTP/1.1\r\nHost: {host}:{port}\r\n\r\n");
        stream
            .write_all(connect.as_bytes())
            .await
            .map_err(SocketError::Proxy)?;

        let mut response = Vec::new();
        let mut byte = [0_u8; 1];
        while !response.ends_with(b"\r\n\r\n") {
            if response.len() > 8 * 1024 {
                return Err(invalid("proxy response headers too large"));
            }
            let n = stream.read(&mut byte).await.map_err(SocketError::Proxy)?;
            if n == 0 {
                return Err(SocketError::Proxy(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "proxy closed the connection during CONNECT",
                )));
            }
            response.push(byte[0]);
        }
        let ok = String::from_utf8_lossy(&response)
            .lines()
            .next()
            .is_some_and(|status| status.contains(" 200"));
        if !ok {
            return Err(invalid("proxy refused CONNECT"));
        }
        Ok(stream)
    }

    /// Read frames until the connection ends, dispatching each completed
    /// message through the event tiers and sending keep-alive pings.
    async fn receive_loop(
        inner: Arc<Inner>,
        handle: Arc<Handle>,
        mut reader: Reader,
        token: CancellationToken,
    ) {
        let mut accumulator = FrameAccumulator::new(inner.options.max_message_bytes);
        let mut keep_alive = interval(inner.options.keep_alive_interval);
        keep_alive.tick().await; // first tick fires immediately

        loop {
            tokio::select! {
                () = token.cancelled() => {
                    // Caller-initiated teardown; disconnect() owns the state.
                    return;
                }

                _ = keep_alive.tick() => {
                    let mut writer = handle.writer.lock().await;
                    if writer.send(Message::Ping(Bytes::new())).await.is_err() {
                        drop(writer);
                        Self::handle_closed(&inner, &handle, None, None).await;
                        return;
                    }
                }

                message = reader.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            match accumulator.push(text.as_str(), true) {
                                Ok(Some(payload)) => Self::dispatch_message(&inner, &payload),
                                Ok(None) => {}
                                Err(e) => {
                                    _ = inner
                                        .events_tx
                                        .send(ClientEvent::Error(Arc::new(e.into())));
                                    Self::handle_closed(&inner, &handle, None, None).await;
                                    return;
                                }
                            }
                        }
                        Some(Ok(Message::Binary(bytes))) => {
                            // Some intermediaries deliver text payloads as binary.
                            if let Ok(text) = std::str::from_utf8(&bytes) {
                                match accumulator.push(text, true) {
                                    Ok(Some(payload)) => Self::dispatch_message(&inner, &payload),
                                    Ok(None) => {}
                                    Err(e) => {
                                        _ = inner
                                            .events_tx
                                            .send(ClientEvent::Error(Arc::new(e.into())));
                                        Self::handle_closed(&inner, &handle, None, None).await;
                                        return;
                                    }
                                }
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (status, reason) = match frame {
                                Some(frame) => (
                                    Some(u16::from(frame.code)),
                                    Some(frame.reason.to_string()),
                                ),
                                None => (None, None),
                            };
                            Self::handle_closed(&inner, &handle, status, reason).await;
                            return;
                        }
                        Some(Ok(_)) => {
                            // Ping/Pong frames are handled by the protocol layer.
                        }
                        Some(Err(e)) => {
                            // Surface the protocol layer's size bound the same
                            // way the accumulator reports its own.
                            let error = match e {
                                TungsteniteError::Capacity(CapacityError::MessageTooLong {
                                    size,
                                    max_size,
                                }) => SocketError::MessageTooLarge {
                                    size,
                                    limit: max_size,
                                },
                                e => SocketError::Transport(e),
                            };
                            _ = inner
                                .events_tx
                                .send(ClientEvent::Error(Arc::new(error.into())));
                            Self::handle_closed(&inner, &handle, None, None).await;
                            return;
                        }
                        None => {
                            // Stream ended without a close frame.
                            _ = inner.events_tx.send(ClientEvent::Error(Arc::new(
                                SocketError::ConnectionClosed.into(),
                            )));
                            Self::handle_closed(&inner, &handle, None, None).await;
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Fan one completed message out through the event tiers.
    fn dispatch_message(inner: &Arc<Inner>, raw: &str) {
        _ = inner.events_tx.send(ClientEvent::Raw(raw.to_owned()));

        let envelope: Envelope = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %e, "Failed to decode envelope");
                _ = inner
                    .events_tx
                    .send(ClientEvent::Error(Arc::new(Error::from(e))));
                return;
            }
        };
        let key = envelope.routing_key();
        _ = inner.events_tx.send(ClientEvent::Envelope(envelope));

        let Some(kind) = EventKind::from_key(&key) else {
            #[cfg(feature = "tracing")]
            tracing::trace!(%key, "Unrecognized event kind, dropped at the typed tier");
            return;
        };
        match dispatch::decode(kind, raw) {
            Ok(event) => {
                _ = inner.events_tx.send(ClientEvent::Event(event));
            }
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(%key, error = %e, "Failed to decode typed payload");
                _ = inner.events_tx.send(ClientEvent::Error(Arc::new(e)));
            }
        }
    }

    /// React to an abnormal or server-initiated closure: announce it, clear
    /// the installed connection, and kick off the reconnect loop when the
    /// policy allows.
    async fn handle_closed(
        inner: &Arc<Inner>,
        handle: &Arc<Handle>,
        status: Option<u16>,
        reason: Option<String>,
    ) {
        let will_reconnect = inner.options.auto_reconnect
            && !inner.user_close.load(Ordering::SeqCst)
            && !inner.disposed.load(Ordering::SeqCst);

        #[cfg(feature = "tracing")]
        tracing::debug!(?status, ?reason, will_reconnect, "Pipeline connection closed");
        _ = inner.events_tx.send(ClientEvent::Disconnected {
            status,
            reason,
            will_reconnect,
        });

        {
            let mut active = inner.active.write().unwrap_or_else(PoisonError::into_inner);
            // Only clear if the installed connection is still this one.
            if active
                .as_ref()
                .is_some_and(|a| Arc::ptr_eq(&a.handle, handle))
            {
                *active = None;
            }
        }
        _ = inner.state_tx.send(ConnectionState::Closed);

        if will_reconnect {
            let inner = Arc::clone(inner);
            tokio::spawn(async move {
                Self::reconnect_loop(&inner).await;
            });
        }
    }

    /// Retry the handshake until it succeeds or reconnection is no longer
    /// wanted. The first attempt fires immediately; jittered exponential
    /// backoff applies between attempts.
    async fn reconnect_loop(inner: &Arc<Inner>) {
        let mut delay = ReconnectDelay::new(
            inner.options.initial_reconnect_delay,
            inner.options.max_reconnect_delay,
        );
        let mut attempt = 1_u32;

        loop {
            if inner.disposed.load(Ordering::SeqCst) || inner.user_close.load(Ordering::SeqCst) {
                return;
            }
            _ = inner.state_tx.send(ConnectionState::Reconnecting { attempt });

            {
                let _guard = inner.ops.lock().await;
                if inner.state_tx.borrow().is_connected() {
                    return;
                }
                match timeout(RECONNECT_ATTEMPT_TIMEOUT, Self::establish(inner)).await {
                    Ok(Ok(())) => return,
                    Ok(Err(e)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(attempt, error = %e, "Reconnect attempt failed");
                        _ = inner.events_tx.send(ClientEvent::Error(Arc::new(e)));
                    }
                    Err(_) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(attempt, "Reconnect attempt timed out");
                        _ = inner.events_tx.send(ClientEvent::Error(Arc::new(
                            SocketError::HandshakeTimeout.into(),
                        )));
                    }
                }
            }
            attempt = attempt.saturating_add(1);

            tokio::select! {
                () = inner.shutdown.cancelled() => return,
                () = sleep(delay.next_wait()) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_and_closed_are_not_connected() {
        assert!(!ConnectionState::Idle.is_connected());
        assert!(!ConnectionState::Closed.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(!ConnectionState::Reconnecting { attempt: 3 }.is_connected());
        assert!(
            ConnectionState::Open {
                since: Instant::now()
            }
            .is_connected()
        );
    }

    #[tokio::test]
    async fn send_before_connect_is_a_state_error() {
        let manager = ConnectionManager::new(
            "https://api.example.cloud".to_owned(),
            Options::default(),
            None,
        );
        let error = manager
            .send_text("{}".to_owned())
            .await
            .expect_err("not connected");
        assert_eq!(error.kind(), crate::error::Kind::State);
    }

    #[tokio::test]
    async fn disposed_manager_fails_fast() {
        let manager = ConnectionManager::new(
            "https://api.example.cloud".to_owned(),
            Options::default(),
            None,
        );
        manager.dispose();
        let error = manager.connect().await.expect_err("disposed");
        assert_eq!(error.kind(), crate::error::Kind::Disposed);
        let error = manager
            .send_text("{}".to_owned())
            .await
            .expect_err("disposed");
        assert_eq!(error.kind(), crate::error::Kind::Disposed);
    }
}
