use strum_macros::Display;

/// Every event kind the typed dispatch table recognizes.
///
/// The `strum` serializations are the wire routing keys. Routing is
/// case-insensitive: keys are lower-cased before lookup.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum EventKind {
    // System/control
    #[strum(serialize = "hello")]
    Hello,
    #[strum(serialize = "subscribed")]
    Subscribed,
    #[strum(serialize = "unsubscribed")]
    Unsubscribed,
    #[strum(serialize = "error")]
    ServerError,

    // Friends/presence
    #[strum(serialize = "user-online")]
    UserOnline,
    #[strum(serialize = "user-offline")]
    UserOffline,
    #[strum(serialize = "friend-online")]
    FriendOnline,
    #[strum(serialize = "friend-active")]
    FriendActive,
    #[strum(serialize = "friend-offline")]
    FriendOffline,
    #[strum(serialize = "friend-update")]
    FriendUpdate,
    #[strum(serialize = "friend-location")]
    FriendLocation,
    #[strum(serialize = "friend-add")]
    FriendAdd,
    #[strum(serialize = "friend-delete")]
    FriendDelete,
    #[strum(serialize = "friend-status-update")]
    FriendStatusUpdate,

    // Invites and notifications v1
    #[strum(serialize = "friend-request")]
    FriendRequest,
    #[strum(serialize = "invite")]
    Invite,
    #[strum(serialize = "invite-response")]
    InviteResponse,
    #[strum(serialize = "request-invite")]
    RequestInvite,
    #[strum(serialize = "request-invite-response")]
    RequestInviteResponse,
    #[strum(serialize = "notification")]
    Notification,
    #[strum(serialize = "response-notification")]
    ResponseNotification,
    #[strum(serialize = "see-notification")]
    SeeNotification,
    #[strum(serialize = "hide-notification")]
    HideNotification,
    #[strum(serialize = "clear-notification")]
    ClearNotification,

    // Notifications v2
    #[strum(serialize = "notification-v2")]
    NotificationV2,
    #[strum(serialize = "notification-v2-update")]
    NotificationV2Update,
    #[strum(serialize = "notification-v2-delete")]
    NotificationV2Delete,
    #[strum(serialize = "notification-seen")]
    NotificationSeen,

    // User
    #[strum(serialize = "user-update")]
    UserUpdate,
    #[strum(serialize = "user-location")]
    UserLocation,
    #[strum(serialize = "user-badge-assigned")]
    UserBadgeAssigned,
    #[strum(serialize = "user-badge-unassigned")]
    UserBadgeUnassigned,
    #[strum(serialize = "content-refresh")]
    ContentRefresh,
    #[strum(serialize = "modified-image-update")]
    ModifiedImageUpdate,
    #[strum(serialize = "instance-queue-joined")]
    InstanceQueueJoined,
    #[strum(serialize = "instance-queue-ready")]
    InstanceQueueReady,

    // Groups
    #[strum(serialize = "group-joined")]
    GroupJoined,
    #[strum(serialize = "group-left")]
    GroupLeft,
    #[strum(serialize = "group-member-updated")]
    GroupMemberUpdated,
    #[strum(serialize = "group-role-updated")]
    GroupRoleUpdated,
}

impl EventKind {
    /// Look up the kind for a normalized routing key.
    ///
    /// Unknown keys return `None` and are dropped silently at the typed
    /// dispatch stage.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "hello" => Self::Hello,
            "subscribed" => Self::Subscribed,
            "unsubscribed" => Self::Unsubscribed,
            "error" => Self::ServerError,
            "user-online" => Self::UserOnline,
            "user-offline" => Self::UserOffline,
            "friend-online" => Self::FriendOnline,
            "friend-active" => Self::FriendActive,
            "friend-offline" => Self::FriendOffline,
            "friend-update" => Self::FriendUpdate,
            "friend-location" => Self::FriendLocation,
            "friend-add" => Self::FriendAdd,
            "friend-delete" => Self::FriendDelete,
            "friend-status-update" => Self::FriendStatusUpdate,
            "friend-request" => Self::FriendRequest,
            "invite" => Self::Invite,
            "invite-response" => Self::InviteResponse,
            "request-invite" => Self::RequestInvite,
            "request-invite-response" => Self::RequestInviteResponse,
            "notification" => Self::Notification,
            "response-notification" => Self::ResponseNotification,
            "see-notification" => Self::SeeNotification,
            "hide-notification" => Self::HideNotification,
            "clear-notification" => Self::ClearNotification,
            "notification-v2" => Self::NotificationV2,
            "notification-v2-update" => Self::NotificationV2Update,
            "notification-v2-delete" => Self::NotificationV2Delete,
            "notification-seen" => Self::NotificationSeen,
            "user-update" => Self::UserUpdate,
            "user-location" => Self::UserLocation,
            "user-badge-assigned" => Self::UserBadgeAssigned,
            "user-badge-unassigned" => Self::UserBadgeUnassigned,
            "content-refresh" => Self::ContentRefresh,
            "modified-image-update" => Self::ModifiedImageUpdate,
            "instance-queue-joined" => Self::InstanceQueueJoined,
            "instance-queue-ready" => Self::InstanceQueueReady,
            "group-joined" => Self::GroupJoined,
            "group-left" => Self::GroupLeft,
            "group-member-updated" => Self::GroupMemberUpdated,
            "group-role-updated" => Self::GroupRoleUpdated,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keys_round_trip() {
        for kind in [
            EventKind::Hello,
            EventKind::ServerError,
            EventKind::FriendStatusUpdate,
            EventKind::RequestInviteResponse,
            EventKind::NotificationV2Delete,
            EventKind::ModifiedImageUpdate,
            EventKind::GroupRoleUpdated,
        ] {
            assert_eq!(EventKind::from_key(&kind.to_string()), Some(kind));
        }
    }

    #[test]
    fn unknown_key_is_none() {
        assert_eq!(EventKind::from_key("totally-new-kind"), None);
        assert_eq!(EventKind::from_key(""), None);
    }
}
