//! Collaborators the router delivers through.

use futures::future::BoxFuture;
use serde::Serialize;

use chime_core::model::{ChannelId, EventId, UserId};

use crate::error::ServiceResult;

/// Styled block a post's text is rendered in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    /// Plain-text summary for clients that cannot render attachments.
    pub fallback: String,
    pub text: String,
    pub color: String,
}

/// A chat message posted by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingPost {
    pub user_id: UserId,
    pub channel_id: ChannelId,
    pub attachment: Attachment,
}

/// Payload of the real-time event sent to each recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RealtimeEvent {
    pub id: EventId,
    pub title: String,
    pub channel: Option<ChannelId>,
}

/// Chat host operations used to post notifications.
pub trait Messenger: Send + Sync {
    /// ## Summary
    /// Creates a post in an existing channel.
    fn create_post<'a>(&'a self, post: &'a OutgoingPost) -> BoxFuture<'a, ServiceResult<()>>;

    /// ## Summary
    /// Returns the 1:1 channel between two users, creating it if needed.
    fn direct_channel<'a>(
        &'a self,
        first: &'a UserId,
        second: &'a UserId,
    ) -> BoxFuture<'a, ServiceResult<ChannelId>>;

    /// ## Summary
    /// Returns the group conversation of exactly `members`, creating it if needed.
    fn group_channel<'a>(&'a self, members: &'a [UserId])
    -> BoxFuture<'a, ServiceResult<ChannelId>>;

    /// ## Summary
    /// Looks up the name a user is mentioned by.
    fn display_name<'a>(&'a self, user: &'a UserId) -> BoxFuture<'a, ServiceResult<String>>;
}

/// Fire-and-forget real-time delivery to a single user.
pub trait Broadcaster: Send + Sync {
    /// ## Errors
    /// Returns an error if the event could not be handed off for `recipient`.
    fn publish(
        &self,
        event_name: &str,
        payload: &RealtimeEvent,
        recipient: &UserId,
    ) -> ServiceResult<()>;
}
