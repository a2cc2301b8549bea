use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Generic envelope for one pipeline message.
///
/// The server schema is intentionally permissive; every field is optional and
/// unknown fields are ignored. The payload arrives under either `data` or the
/// legacy `content` key, with `data` taking precedence when both are present.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    /// Event kind (e.g. `friend-online`, `notification-v2`)
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Subscription topic the event belongs to
    pub topic: Option<String>,
    data: Option<Value>,
    content: Option<Value>,
    /// Server-assigned message id
    pub id: Option<String>,
    /// Server-side emission time
    pub timestamp: Option<DateTime<Utc>>,
}

impl Envelope {
    /// The payload tree, resolving `data` over `content`.
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        self.data.as_ref().or(self.content.as_ref())
    }

    /// Decode the payload into a concrete type.
    pub fn payload_as<T: DeserializeOwned>(&self) -> crate::Result<Option<T>> {
        match self.payload() {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Normalized routing key: lower-cased `type`, falling back to `topic`,
    /// falling back to the empty string.
    #[must_use]
    pub fn routing_key(&self) -> String {
        self.kind
            .as_deref()
            .or(self.topic.as_deref())
            .unwrap_or("")
            .to_ascii_lowercase()
    }
}

/// Typed envelope mirroring [`Envelope`] with the payload already decoded.
///
/// The same `data`-over-`content` precedence applies at the decode boundary.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize)]
pub struct Event<T> {
    /// Event kind (e.g. `friend-online`, `notification-v2`)
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Subscription topic the event belongs to
    pub topic: Option<String>,
    data: Option<T>,
    content: Option<T>,
    /// Server-assigned message id
    pub id: Option<String>,
    /// Server-side emission time
    pub timestamp: Option<DateTime<Utc>>,
}

impl<T> Event<T> {
    /// The decoded payload, resolving `data` over `content`.
    #[must_use]
    pub fn payload(&self) -> Option<&T> {
        self.data.as_ref().or(self.content.as_ref())
    }

    /// Consume the event and return the decoded payload.
    #[must_use]
    pub fn into_payload(self) -> Option<T> {
        self.data.or(self.content)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn data_takes_precedence_over_content() {
        let raw = json!({
            "type": "user-update",
            "data": {"userId": "usr_a"},
            "content": {"userId": "usr_b"}
        });
        let envelope: Envelope = serde_json::from_value(raw).expect("valid envelope");
        assert_eq!(envelope.payload().expect("payload")["userId"], "usr_a");
    }

    #[test]
    fn content_resolves_when_data_absent() {
        let raw = json!({"type": "user-update", "content": {"userId": "usr_b"}});
        let envelope: Envelope = serde_json::from_value(raw).expect("valid envelope");
        assert_eq!(envelope.payload().expect("payload")["userId"], "usr_b");
    }

    #[test]
    fn routing_key_is_lower_cased_kind() {
        let envelope: Envelope =
            serde_json::from_value(json!({"type": "User-Online"})).expect("valid envelope");
        assert_eq!(envelope.routing_key(), "user-online");
    }

    #[test]
    fn routing_key_falls_back_to_topic() {
        let envelope: Envelope =
            serde_json::from_value(json!({"topic": "Friends"})).expect("valid envelope");
        assert_eq!(envelope.routing_key(), "friends");
    }

    #[test]
    fn routing_key_defaults_to_empty() {
        let envelope: Envelope = serde_json::from_value(json!({})).expect("valid envelope");
        assert_eq!(envelope.routing_key(), "");
    }

    #[test]
    fn timestamp_parses_rfc3339() {
        let envelope: Envelope = serde_json::from_value(
            json!({"type": "hello", "timestamp": "2024-05-01T12:00:00Z", "id": "msg_1"}),
        )
        .expect("valid envelope");
        assert!(envelope.timestamp.is_some());
        assert_eq!(envelope.id.as_deref(), Some("msg_1"));
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let envelope: Envelope = serde_json::from_value(
            json!({"type": "hello", "extensionField": 42, "another": {"nested": true}}),
        )
        .expect("permissive schema");
        assert_eq!(envelope.routing_key(), "hello");
    }

    #[test]
    fn typed_event_applies_same_precedence() {
        #[derive(Debug, Clone, Deserialize, PartialEq)]
        struct Probe {
            value: i64,
        }

        let event: Event<Probe> = serde_json::from_value(json!({
            "type": "probe",
            "data": {"value": 1},
            "content": {"value": 2}
        }))
        .expect("valid event");
        assert_eq!(event.payload(), Some(&Probe { value: 1 }));
        assert_eq!(event.into_payload(), Some(Probe { value: 1 }));
    }
}
