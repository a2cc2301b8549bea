use std::sync::Arc;

use async_stream::try_stream;
use dashmap::{DashMap, Entry};
use futures::Stream;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::error::Error;
use crate::events::FeedEvent;
use crate::ws::config::Options;
use crate::ws::connection::{ClientEvent, ConnectionManager, ConnectionState};
use crate::ws::error::SocketError;

/// Control message sent to the pipeline server.
#[derive(Debug, Clone, Serialize)]
struct ControlRequest<'a> {
    #[serde(rename = "type")]
    action: ControlAction,
    topic: &'a str,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum ControlAction {
    Subscribe,
    Unsubscribe,
}

/// Client for the VRChat realtime event pipeline.
///
/// Wraps the [`ConnectionManager`] with topic subscription tracking: topics
/// are reference counted, subscription requests go to the server only on the
/// first subscribe and the last unsubscribe, and every tracked topic is
/// re-subscribed automatically after a reconnect.
///
/// # Example
///
/// ```ignore
/// let client = PipelineClient::new("https://api.vrchat.cloud/api/1");
/// client.connect().await?;
/// client.subscribe("friends").await?;
///
/// let mut events = client.events();
/// while let Ok(event) = events.recv().await {
///     println!("{event:?}");
/// }
/// ```
#[derive(Clone)]
pub struct PipelineClient {
    connection: ConnectionManager,
    /// Subscribed topics with reference counts (for multiplexing)
    topics: Arc<DashMap<String, usize>>,
}

impl PipelineClient {
    /// Create a client with default [`Options`].
    ///
    /// `base_path` is the REST API base the realtime endpoint is derived
    /// from. Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(base_path: impl Into<String>) -> Self {
        Self::with_options(base_path, Options::default())
    }

    /// Create a client with explicit [`Options`].
    #[must_use]
    pub fn with_options(base_path: impl Into<String>, options: Options) -> Self {
        Self::build(base_path.into(), options, None)
    }

    /// Create a client that attaches cookies from `store` to the handshake.
    ///
    /// The store is queried with the HTTP twin of the pipeline endpoint, so a
    /// cookie jar shared with a `reqwest` REST client carries the session
    /// over automatically.
    #[must_use]
    pub fn with_cookies(
        base_path: impl Into<String>,
        options: Options,
        store: Arc<dyn reqwest::cookie::CookieStore>,
    ) -> Self {
        Self::build(base_path.into(), options, Some(store))
    }

    fn build(
        base_path: String,
        options: Options,
        cookies: Option<Arc<dyn reqwest::cookie::CookieStore>>,
    ) -> Self {
        let client = Self {
            connection: ConnectionManager::new(base_path, options, cookies),
            topics: Arc::new(DashMap::new()),
        };
        client.start_resubscribe_handler();
        client
    }

    /// Open the connection. Idempotent while already connected.
    pub async fn connect(&self) -> crate::Result<()> {
        self.connection.connect().await
    }

    /// Close the connection and suppress reconnection.
    pub async fn disconnect(&self) -> crate::Result<()> {
        self.connection.disconnect().await
    }

    /// Release the client. Terminal; every later operation fails fast.
    pub fn dispose(&self) {
        self.connection.dispose();
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Check if the connection is currently active.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.state().is_connected()
    }

    /// Sub-protocol the server selected during the handshake, if any.
    #[must_use]
    pub fn selected_protocol(&self) -> Option<String> {
        self.connection.selected_protocol()
    }

    /// Send a serializable request over the socket.
    ///
    /// Fails without writing when the connection is not open.
    pub async fn send<R: Serialize>(&self, request: &R) -> crate::Result<()> {
        let json = serde_json::to_string(request)?;
        self.connection.send_text(json).await
    }

    /// Send raw text over the socket.
    pub async fn send_text(&self, text: String) -> crate::Result<()> {
        self.connection.send_text(text).await
    }

    /// Subscribe to a topic.
    ///
    /// The subscription request is sent to the server only when this topic is
    /// not already tracked; later subscribers multiplex onto the existing
    /// subscription.
    ///
    /// This will fail if `topic` is blank.
    pub async fn subscribe(&self, topic: &str) -> crate::Result<()> {
        let topic = Self::validated_topic(topic)?;

        let is_new = match self.topics.entry(topic.to_owned()) {
            Entry::Occupied(mut o) => {
                *o.get_mut() += 1;
                false
            }
            Entry::Vacant(v) => {
                v.insert(1);
                true
            }
        };
        if !is_new {
            #[cfg(feature = "tracing")]
            tracing::debug!(%topic, "Topic already subscribed, multiplexing");
            return Ok(());
        }

        let request = ControlRequest {
            action: ControlAction::Subscribe,
            topic,
        };
        if let Err(e) = self.send(&request).await {
            // Roll back so a later subscribe retries the server request.
            self.release_topic(topic);
            return Err(e);
        }
        Ok(())
    }

    /// Unsubscribe from a topic.
    ///
    /// Decrements the topic's reference count; the unsubscribe request goes
    /// to the server only when the count reaches zero.
    ///
    /// This will fail if `topic` is blank.
    pub async fn unsubscribe(&self, topic: &str) -> crate::Result<()> {
        let topic = Self::validated_topic(topic)?;

        if !self.release_topic(topic) {
            return Ok(());
        }
        let request = ControlRequest {
            action: ControlAction::Unsubscribe,
            topic,
        };
        self.send(&request).await
    }

    /// Get the number of tracked topics.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.topics.len()
    }

    /// Subscribe to the client event bus.
    ///
    /// Each call returns a new independent receiver carrying every tier:
    /// lifecycle events, raw text, envelopes, and typed events.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.connection.events()
    }

    /// Stream of fully typed events.
    ///
    /// Lifecycle and lower-tier events are filtered out. A receiver that
    /// falls behind the bus yields a lag error and the stream continues.
    pub fn typed_events(&self) -> impl Stream<Item = crate::Result<FeedEvent>> + use<> {
        let mut rx = self.connection.events();

        try_stream! {
            loop {
                match rx.recv().await {
                    Ok(ClientEvent::Event(event)) => yield event,
                    Ok(_) => {}
                    Err(RecvError::Lagged(n)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("Event stream lagged, missed {n} messages");
                        Err(SocketError::Lagged { count: n })?;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    fn validated_topic(topic: &str) -> crate::Result<&str> {
        if topic.trim().is_empty() {
            return Err(Error::validation("topic must not be blank"));
        }
        Ok(topic)
    }

    /// Decrement a topic's refcount. Returns true when the topic was tracked
    /// and the count reached zero.
    fn release_topic(&self, topic: &str) -> bool {
        // Entry API so decrement and removal cannot race
        if let Entry::Occupied(mut entry) = self.topics.entry(topic.to_owned()) {
            let refcount = entry.get_mut();
            *refcount = refcount.saturating_sub(1);
            if *refcount == 0 {
                entry.remove();
                return true;
            }
        }
        false
    }

    /// Watch connection state and re-subscribe tracked topics after a
    /// reconnect.
    ///
    /// The task holds a [`ConnectionManager`] clone, so the state channel
    /// never closes from its point of view; the shutdown token is what ends
    /// the task when the client is disposed.
    fn start_resubscribe_handler(&self) {
        let connection = self.connection.clone();
        let topics = Arc::clone(&self.topics);
        let shutdown = connection.shutdown_token();

        tokio::spawn(async move {
            let mut state_rx = connection.state_receiver();
            let mut was_connected = state_rx.borrow().is_connected();

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    changed = state_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                let state = *state_rx.borrow_and_update();
                if let ConnectionState::Open { .. } = state {
                    if was_connected {
                        #[cfg(feature = "tracing")]
                        tracing::debug!("Pipeline reconnected, re-establishing subscriptions");
                        let tracked: Vec<String> =
                            topics.iter().map(|r| r.key().clone()).collect();
                        for topic in tracked {
                            let request = ControlRequest {
                                action: ControlAction::Subscribe,
                                topic: &topic,
                            };
                            let json = match serde_json::to_string(&request) {
                                Ok(json) => json,
                                Err(_) => continue,
                            };
                            if let Err(_e) = connection.send_text(json).await {
                                #[cfg(feature = "tracing")]
                                tracing::warn!(%topic, error = %_e, "Failed to re-subscribe");
                            }
                        }
                    }
                    was_connected = true;
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_control_wire_format() {
        let request = ControlRequest {
            action: ControlAction::Subscribe,
            topic: "friends",
        };
        assert_eq!(
            serde_json::to_string(&request).expect("serializes"),
            r#"{"type":"subscribe","topic":"friends"}"#
        );
    }

    #[test]
    fn unsubscribe_control_wire_format() {
        let request = ControlRequest {
            action: ControlAction::Unsubscribe,
            topic: "friends",
        };
        assert_eq!(
            serde_json::to_string(&request).expect("serializes"),
            r#"{"type":"unsubscribe","topic":"friends"}"#
        );
    }

    #[tokio::test]
    async fn blank_topic_is_rejected_before_sending() {
        let client = PipelineClient::new("https://api.example.cloud");
        let error = client.subscribe("   ").await.expect_err("blank topic");
        assert_eq!(error.kind(), crate::error::Kind::Validation);
        let error = client.unsubscribe("").await.expect_err("blank topic");
        assert_eq!(error.kind(), crate::error::Kind::Validation);
        assert_eq!(client.subscription_count(), 0);
    }

    #[tokio::test]
    async fn failed_subscribe_rolls_back_tracking() {
        let client = PipelineClient::new("https://api.example.cloud");
        // Not connected, so the control request cannot be delivered.
        let error = client.subscribe("friends").await.expect_err("not open");
        assert_eq!(error.kind(), crate::error::Kind::State);
        assert_eq!(client.subscription_count(), 0);
    }

    #[tokio::test]
    async fn unsubscribe_of_untracked_topic_is_a_no_op() {
        let client = PipelineClient::new("https://api.example.cloud");
        client.unsubscribe("friends").await.expect("no-op");
        assert_eq!(client.subscription_count(), 0);
    }
}
