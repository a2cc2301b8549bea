//! Payload records for the typed event catalog.
//!
//! The upstream schema is documented as intentionally permissive, so every
//! field is optional unless the server has never been observed to omit it,
//! and unknown fields never fail deserialization. Payloads that embed full
//! REST models (users, group members, group roles) keep those subtrees as
//! raw [`Value`]s; decoding them is the caller's concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// --- System/control ---

/// Server greeting sent after a successful handshake.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloPayload {
    pub hello: Option<String>,
    pub session_id: Option<String>,
    pub server_time: Option<String>,
    /// Topics the session is already subscribed to
    pub subscriptions: Option<Vec<String>>,
    /// Extra fields the server may add without notice
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Acknowledgement of a `subscribe` command.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscribedPayload {
    pub topic: Option<String>,
}

/// Acknowledgement of an `unsubscribe` command.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UnsubscribedPayload {
    pub topic: Option<String>,
}

/// Error reported by the server over the feed.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerErrorPayload {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<Value>,
}

// --- Friends/presence ---

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOnlinePayload {
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    pub platform: Option<String>,
    pub status: Option<String>,
    pub location: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOfflinePayload {
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    pub last_platform: Option<String>,
    pub last_location: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendOnlinePayload {
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    pub platform: Option<String>,
    pub location: Option<String>,
    pub world_id: Option<String>,
    pub instance_id: Option<String>,
}

/// A friend moved to the website/API without a running client.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FriendActivePayload {
    // The server sends this one key all lower-case, unlike its siblings.
    #[serde(rename = "userid")]
    pub user_id: Option<String>,
    pub platform: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendOfflinePayload {
    pub user_id: Option<String>,
    pub platform: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendUpdatePayload {
    pub user_id: Option<String>,
    /// Full user object as served by the REST API
    pub user: Option<Value>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendLocationPayload {
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    pub location: Option<String>,
    pub world_id: Option<String>,
    pub instance_id: Option<String>,
    pub traveling_to_location: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendAddPayload {
    pub user_id: Option<String>,
    /// Full user object as served by the REST API
    pub user: Option<Value>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendDeletePayload {
    pub user_id: Option<String>,
    pub display_name: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendStatusUpdatePayload {
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    pub status: Option<String>,
    pub status_description: Option<String>,
}

// --- Invites and notifications v1 ---

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestPayload {
    pub sender_user_id: Option<String>,
    pub sender_display_name: Option<String>,
    pub message: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitePayload {
    pub sender_user_id: Option<String>,
    pub sender_display_name: Option<String>,
    pub world_id: Option<String>,
    pub world_name: Option<String>,
    pub instance_id: Option<String>,
    pub message: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteResponsePayload {
    pub responder_user_id: Option<String>,
    pub responder_display_name: Option<String>,
    pub accepted: Option<bool>,
    pub message: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestInvitePayload {
    pub requester_user_id: Option<String>,
    pub requester_display_name: Option<String>,
    pub message: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestInviteResponsePayload {
    pub responder_user_id: Option<String>,
    pub responder_display_name: Option<String>,
    pub accepted: Option<bool>,
    pub world_id: Option<String>,
    pub instance_id: Option<String>,
    pub message: Option<String>,
}

/// First-generation notification record.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: Option<String>,
    pub sender_user_id: Option<String>,
    pub receiver_user_id: Option<String>,
    pub details: Option<Value>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseNotificationPayload {
    pub notification_id: Option<String>,
    pub receiver_id: Option<String>,
    pub response_id: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeeNotificationPayload {
    pub notification_id: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HideNotificationPayload {
    pub notification_id: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearNotificationPayload {
    pub user_id: Option<String>,
}

// --- Notifications v2 ---

/// Second-generation notification record.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationV2Payload {
    pub id: Option<String>,
    #[serde(default)]
    pub version: i64,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category: Option<String>,
    pub is_system: Option<bool>,
    #[serde(rename = "ignoreDND")]
    pub ignore_dnd: Option<bool>,
    pub sender_user_id: Option<String>,
    pub sender_username: Option<String>,
    pub receiver_user_id: Option<String>,
    pub related_notifications_id: Option<String>,
    pub title: Option<String>,
    pub message: Option<String>,
    pub image_url: Option<String>,
    pub link: Option<String>,
    pub link_text: Option<String>,
    pub responses: Option<Vec<NotificationV2Response>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expiry_after_seen: Option<i64>,
    pub require_seen: Option<bool>,
    pub seen: Option<bool>,
    pub can_delete: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Quick-response action attached to a v2 notification.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationV2Response {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub data: Option<String>,
    pub icon: Option<String>,
    pub text: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationV2UpdatePayload {
    pub id: Option<String>,
    #[serde(default)]
    pub version: i64,
    /// Partial field updates, keyed by field name
    pub updates: Option<serde_json::Map<String, Value>>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationV2DeletePayload {
    pub ids: Option<Vec<String>>,
    #[serde(default)]
    pub version: i64,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSeenPayload {
    pub notification_id: Option<String>,
    pub user_id: Option<String>,
    pub seen: Option<bool>,
}

// --- User ---

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdatePayload {
    pub user_id: Option<String>,
    pub user: Option<UserUpdateDetails>,
}

/// Profile fields carried by a `user-update` event.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateDetails {
    pub id: Option<String>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub current_avatar: Option<String>,
    pub current_avatar_asset_url: Option<String>,
    pub current_avatar_image_url: Option<String>,
    pub current_avatar_thumbnail_image_url: Option<String>,
    pub fallback_avatar: Option<String>,
    pub profile_pic_override: Option<String>,
    pub status: Option<String>,
    pub status_description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub user_icon: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLocationPayload {
    pub user_id: Option<String>,
    pub location: Option<String>,
    pub instance: Option<String>,
    pub traveling_to_location: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserBadgeAssignedPayload {
    /// Badge object as served by the REST API
    pub badge: Option<Value>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBadgeUnassignedPayload {
    pub badge_id: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRefreshPayload {
    pub content_type: Option<String>,
    pub file_id: Option<String>,
    pub item_id: Option<String>,
    pub item_type: Option<String>,
    pub action_type: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifiedImageUpdatePayload {
    pub file_id: Option<String>,
    pub pixel_size: Option<i64>,
    pub version_number: Option<i64>,
    pub needs_processing: Option<bool>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceQueueJoinedPayload {
    pub instance_location: Option<String>,
    pub position: Option<i64>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceQueueReadyPayload {
    pub instance_location: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
}

// --- Groups ---

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupJoinedPayload {
    pub group_id: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupLeftPayload {
    pub group_id: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupMemberUpdatedPayload {
    /// Group member object as served by the REST API
    pub member: Option<Value>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupRoleUpdatedPayload {
    /// Group role object as served by the REST API
    pub role: Option<Value>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn friend_online_decodes_camel_case() {
        let payload: FriendOnlinePayload = serde_json::from_value(json!({
            "userId": "usr_1",
            "displayName": "Alice",
            "platform": "standalonewindows",
            "location": "wrld_1:1234",
            "worldId": "wrld_1",
            "instanceId": "1234"
        }))
        .expect("valid payload");
        assert_eq!(payload.user_id.as_deref(), Some("usr_1"));
        assert_eq!(payload.world_id.as_deref(), Some("wrld_1"));
    }

    #[test]
    fn friend_active_uses_lower_case_userid() {
        let payload: FriendActivePayload =
            serde_json::from_value(json!({"userid": "usr_2", "platform": "web"}))
                .expect("valid payload");
        assert_eq!(payload.user_id.as_deref(), Some("usr_2"));
    }

    #[test]
    fn notification_v2_tolerates_missing_fields() {
        let payload: NotificationV2Payload = serde_json::from_value(json!({
            "id": "not_1",
            "version": 2,
            "type": "group.announcement",
            "ignoreDND": true
        }))
        .expect("permissive schema");
        assert_eq!(payload.version, 2);
        assert_eq!(payload.ignore_dnd, Some(true));
        assert!(payload.responses.is_none());
    }

    #[test]
    fn hello_captures_extension_fields() {
        let payload: HelloPayload = serde_json::from_value(json!({
            "hello": "hi",
            "sessionId": "sess_1",
            "futureField": {"x": 1}
        }))
        .expect("permissive schema");
        assert_eq!(payload.session_id.as_deref(), Some("sess_1"));
        assert!(payload.extra.contains_key("futureField"));
    }
}
