//! Typed dispatch table: routing key to decode-and-emit action.
//!
//! Replaces the one-signal-per-kind surface of older clients with a single
//! bus: every recognized kind decodes into one [`FeedEvent`] variant, and
//! callers match or filter on the variants they care about.

use serde::de::DeserializeOwned;

use super::envelope::Event;
use super::kind::EventKind;
use super::payloads::*;

/// One fully decoded pipeline event, tagged by kind.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum FeedEvent {
    Hello(Event<HelloPayload>),
    Subscribed(Event<SubscribedPayload>),
    Unsubscribed(Event<UnsubscribedPayload>),
    ServerError(Event<ServerErrorPayload>),
    UserOnline(Event<UserOnlinePayload>),
    UserOffline(Event<UserOfflinePayload>),
    FriendOnline(Event<FriendOnlinePayload>),
    FriendActive(Event<FriendActivePayload>),
    FriendOffline(Event<FriendOfflinePayload>),
    FriendUpdate(Event<FriendUpdatePayload>),
    FriendLocation(Event<FriendLocationPayload>),
    FriendAdd(Event<FriendAddPayload>),
    FriendDelete(Event<FriendDeletePayload>),
    FriendStatusUpdate(Event<FriendStatusUpdatePayload>),
    FriendRequest(Event<FriendRequestPayload>),
    Invite(Event<InvitePayload>),
    InviteResponse(Event<InviteResponsePayload>),
    RequestInvite(Event<RequestInvitePayload>),
    RequestInviteResponse(Event<RequestInviteResponsePayload>),
    Notification(Event<NotificationPayload>),
    ResponseNotification(Event<ResponseNotificationPayload>),
    SeeNotification(Event<SeeNotificationPayload>),
    HideNotification(Event<HideNotificationPayload>),
    ClearNotification(Event<ClearNotificationPayload>),
    NotificationV2(Event<NotificationV2Payload>),
    NotificationV2Update(Event<NotificationV2UpdatePayload>),
    NotificationV2Delete(Event<NotificationV2DeletePayload>),
    NotificationSeen(Event<NotificationSeenPayload>),
    UserUpdate(Event<UserUpdatePayload>),
    UserLocation(Event<UserLocationPayload>),
    UserBadgeAssigned(Event<UserBadgeAssignedPayload>),
    UserBadgeUnassigned(Event<UserBadgeUnassignedPayload>),
    ContentRefresh(Event<ContentRefreshPayload>),
    ModifiedImageUpdate(Event<ModifiedImageUpdatePayload>),
    InstanceQueueJoined(Event<InstanceQueueJoinedPayload>),
    InstanceQueueReady(Event<InstanceQueueReadyPayload>),
    GroupJoined(Event<GroupJoinedPayload>),
    GroupLeft(Event<GroupLeftPayload>),
    GroupMemberUpdated(Event<GroupMemberUpdatedPayload>),
    GroupRoleUpdated(Event<GroupRoleUpdatedPayload>),
}

impl FeedEvent {
    /// The kind tag this event was dispatched under.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Hello(_) => EventKind::Hello,
            Self::Subscribed(_) => EventKind::Subscribed,
            Self::Unsubscribed(_) => EventKind::Unsubscribed,
            Self::ServerError(_) => EventKind::ServerError,
            Self::UserOnline(_) => EventKind::UserOnline,
            Self::UserOffline(_) => EventKind::UserOffline,
            Self::FriendOnline(_) => EventKind::FriendOnline,
            Self::FriendActive(_) => EventKind::FriendActive,
            Self::FriendOffline(_) => EventKind::FriendOffline,
            Self::FriendUpdate(_) => EventKind::FriendUpdate,
            Self::FriendLocation(_) => EventKind::FriendLocation,
            Self::FriendAdd(_) => EventKind::FriendAdd,
            Self::FriendDelete(_) => EventKind::FriendDelete,
            Self::FriendStatusUpdate(_) => EventKind::FriendStatusUpdate,
            Self::FriendRequest(_) => EventKind::FriendRequest,
            Self::Invite(_) => EventKind::Invite,
            Self::InviteResponse(_) => EventKind::InviteResponse,
            Self::RequestInvite(_) => EventKind::RequestInvite,
            Self::RequestInviteResponse(_) => EventKind::RequestInviteResponse,
            Self::Notification(_) => EventKind::Notification,
            Self::ResponseNotification(_) => EventKind::ResponseNotification,
            Self::SeeNotification(_) => EventKind::SeeNotification,
            Self::HideNotification(_) => EventKind::HideNotification,
            Self::ClearNotification(_) => EventKind::ClearNotification,
            Self::NotificationV2(_) => EventKind::NotificationV2,
            Self::NotificationV2Update(_) => EventKind::NotificationV2Update,
            Self::NotificationV2Delete(_) => EventKind::NotificationV2Delete,
            Self::NotificationSeen(_) => EventKind::NotificationSeen,
            Self::UserUpdate(_) => EventKind::UserUpdate,
            Self::UserLocation(_) => EventKind::UserLocation,
            Self::UserBadgeAssigned(_) => EventKind::UserBadgeAssigned,
            Self::UserBadgeUnassigned(_) => EventKind::UserBadgeUnassigned,
            Self::ContentRefresh(_) => EventKind::ContentRefresh,
            Self::ModifiedImageUpdate(_) => EventKind::ModifiedImageUpdate,
            Self::InstanceQueueJoined(_) => EventKind::InstanceQueueJoined,
            Self::InstanceQueueReady(_) => EventKind::InstanceQueueReady,
            Self::GroupJoined(_) => EventKind::GroupJoined,
            Self::GroupLeft(_) => EventKind::GroupLeft,
            Self::GroupMemberUpdated(_) => EventKind::GroupMemberUpdated,
            Self::GroupRoleUpdated(_) => EventKind::GroupRoleUpdated,
        }
    }
}

fn typed<T: DeserializeOwned>(raw: &str) -> crate::Result<Event<T>> {
    serde_json::from_str(raw).map_err(crate::error::Error::from)
}

/// Decode the raw message text into the typed event for `kind`.
///
/// The raw text is decoded again rather than converting the generic
/// envelope, so typed decoding sees exactly what arrived on the wire.
pub(crate) fn decode(kind: EventKind, raw: &str) -> crate::Result<FeedEvent> {
    Ok(match kind {
        EventKind::Hello => FeedEvent::Hello(typed(raw)?),
        EventKind::Subscribed => FeedEvent::Subscribed(typed(raw)?),
        EventKind::Unsubscribed => FeedEvent::Unsubscribed(typed(raw)?),
        EventKind::ServerError => FeedEvent::ServerError(typed(raw)?),
        EventKind::UserOnline => FeedEvent::UserOnline(typed(raw)?),
        EventKind::UserOffline => FeedEvent::UserOffline(typed(raw)?),
        EventKind::FriendOnline => FeedEvent::FriendOnline(typed(raw)?),
        EventKind::FriendActive => FeedEvent::FriendActive(typed(raw)?),
        EventKind::FriendOffline => FeedEvent::FriendOffline(typed(raw)?),
        EventKind::FriendUpdate => FeedEvent::FriendUpdate(typed(raw)?),
        EventKind::FriendLocation => FeedEvent::FriendLocation(typed(raw)?),
        EventKind::FriendAdd => FeedEvent::FriendAdd(typed(raw)?),
        EventKind::FriendDelete => FeedEvent::FriendDelete(typed(raw)?),
        EventKind::FriendStatusUpdate => FeedEvent::FriendStatusUpdate(typed(raw)?),
        EventKind::FriendRequest => FeedEvent::FriendRequest(typed(raw)?),
        EventKind::Invite => FeedEvent::Invite(typed(raw)?),
        EventKind::InviteResponse => FeedEvent::InviteResponse(typed(raw)?),
        EventKind::RequestInvite => FeedEvent::RequestInvite(typed(raw)?),
        EventKind::RequestInviteResponse => FeedEvent::RequestInviteResponse(typed(raw)?),
        EventKind::Notification => FeedEvent::Notification(typed(raw)?),
        EventKind::ResponseNotification => FeedEvent::ResponseNotification(typed(raw)?),
        EventKind::SeeNotification => FeedEvent::SeeNotification(typed(raw)?),
        EventKind::HideNotification => FeedEvent::HideNotification(typed(raw)?),
        EventKind::ClearNotification => FeedEvent::ClearNotification(typed(raw)?),
        EventKind::NotificationV2 => FeedEvent::NotificationV2(typed(raw)?),
        EventKind::NotificationV2Update => FeedEvent::NotificationV2Update(typed(raw)?),
        EventKind::NotificationV2Delete => FeedEvent::NotificationV2Delete(typed(raw)?),
        EventKind::NotificationSeen => FeedEvent::NotificationSeen(typed(raw)?),
        EventKind::UserUpdate => FeedEvent::UserUpdate(typed(raw)?),
        EventKind::UserLocation => FeedEvent::UserLocation(typed(raw)?),
        EventKind::UserBadgeAssigned => FeedEvent::UserBadgeAssigned(typed(raw)?),
        EventKind::UserBadgeUnassigned => FeedEvent::UserBadgeUnassigned(typed(raw)?),
        EventKind::ContentRefresh => FeedEvent::ContentRefresh(typed(raw)?),
        EventKind::ModifiedImageUpdate => FeedEvent::ModifiedImageUpdate(typed(raw)?),
        EventKind::InstanceQueueJoined => FeedEvent::InstanceQueueJoined(typed(raw)?),
        EventKind::InstanceQueueReady => FeedEvent::InstanceQueueReady(typed(raw)?),
        EventKind::GroupJoined => FeedEvent::GroupJoined(typed(raw)?),
        EventKind::GroupLeft => FeedEvent::GroupLeft(typed(raw)?),
        EventKind::GroupMemberUpdated => FeedEvent::GroupMemberUpdated(typed(raw)?),
        EventKind::GroupRoleUpdated => FeedEvent::GroupRoleUpdated(typed(raw)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friend_online_decodes_to_typed_variant() {
        let raw = r#"{"type":"friend-online","content":{"userId":"usr_1","displayName":"Alice"}}"#;
        let event = decode(EventKind::FriendOnline, raw).expect("decodes");
        assert_eq!(event.kind(), EventKind::FriendOnline);
        let FeedEvent::FriendOnline(event) = event else {
            panic!("wrong variant");
        };
        let payload = event.payload().expect("payload present");
        assert_eq!(payload.user_id.as_deref(), Some("usr_1"));
    }

    #[test]
    fn data_key_wins_at_the_typed_boundary() {
        let raw = r#"{"type":"subscribed","data":{"topic":"friends"},"content":{"topic":"other"}}"#;
        let FeedEvent::Subscribed(event) = decode(EventKind::Subscribed, raw).expect("decodes")
        else {
            panic!("wrong variant");
        };
        assert_eq!(
            event.payload().and_then(|p| p.topic.as_deref()),
            Some("friends")
        );
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let raw = r#"{"type":"notification-v2","content":{"version":"not a number"}}"#;
        let error = decode(EventKind::NotificationV2, raw).expect_err("should fail");
        assert_eq!(error.kind(), crate::error::Kind::Decode);
    }
}
