//! Fan-out of a fired event to real-time clients and the chat.

use std::sync::Arc;

use chime_core::constants::EVENT_OCCUR_BROADCAST;
use chime_core::model::{ChannelId, Event, EventId, Tick, UserId};

use super::host::{Broadcaster, Messenger, OutgoingPost, RealtimeEvent};
use super::message;
use crate::error::ServiceResult;

/// Where the chat message for an event is posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatTarget {
    /// The channel the event is bound to.
    Channel(ChannelId),
    /// The 1:1 channel between the bot and the owner.
    Direct(UserId),
    /// Group conversation of attendees, owner and bot.
    Group(Vec<UserId>),
}

/// ## Summary
/// Chooses the chat target: the bound channel, else a direct message to the
/// owner when there are no attendees, else a group with attendees, owner and
/// bot, each exactly once.
#[must_use]
pub fn select_target(event: &Event, bot_id: &UserId) -> ChatTarget {
    if let Some(channel) = &event.channel {
        return ChatTarget::Channel(channel.clone());
    }
    if event.attendees.is_empty() {
        return ChatTarget::Direct(event.owner.clone());
    }

    let mut members = event.participants();
    if !members.contains(bot_id) {
        members.push(bot_id.clone());
    }
    ChatTarget::Group(members)
}

/// Real-time delivery result for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientOutcome {
    pub user: UserId,
    pub result: Result<(), String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Posted { channel: ChannelId },
    Failed { reason: String },
}

/// Everything that happened while dispatching one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub event_id: EventId,
    pub broadcasts: Vec<RecipientOutcome>,
    /// Attendees whose display name lookup failed.
    pub unresolved: Vec<UserId>,
    pub target: ChatTarget,
    pub delivery: DeliveryOutcome,
}

impl DispatchReport {
    #[must_use]
    pub fn posted(&self) -> bool {
        matches!(self.delivery, DeliveryOutcome::Posted { .. })
    }
}

/// Delivers fired events through the chat host.
#[derive(Clone)]
pub struct NotificationRouter {
    messenger: Arc<dyn Messenger>,
    broadcaster: Arc<dyn Broadcaster>,
    bot_id: UserId,
}

impl NotificationRouter {
    #[must_use]
    pub fn new(
        messenger: Arc<dyn Messenger>,
        broadcaster: Arc<dyn Broadcaster>,
        bot_id: UserId,
    ) -> Self {
        Self {
            messenger,
            broadcaster,
            bot_id,
        }
    }

    #[must_use]
    pub fn bot_id(&self) -> &UserId {
        &self.bot_id
    }

    /// ## Summary
    /// Broadcasts the event to every participant and posts one chat message.
    ///
    /// Delivery is best effort: each failure is logged and recorded in the
    /// report without stopping the remaining steps.
    #[tracing::instrument(skip_all, fields(event_id = %event.id, tick = %tick))]
    pub async fn dispatch(&self, event: &Event, tick: Tick) -> DispatchReport {
        let broadcasts = self.broadcast(event);

        let (names, unresolved) = self.resolve_names(&event.attendees).await;
        let text = message::compose(event, tick, &names);
        let target = select_target(event, &self.bot_id);

        let delivery = match self.post(event, &target, text).await {
            Ok(channel) => {
                tracing::debug!(channel_id = %channel, "Notification posted");
                DeliveryOutcome::Posted { channel }
            }
            Err(e) => {
                tracing::warn!(error = %e, target = ?target, "Failed to post notification");
                DeliveryOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        DispatchReport {
            event_id: event.id.clone(),
            broadcasts,
            unresolved,
            target,
            delivery,
        }
    }

    fn broadcast(&self, event: &Event) -> Vec<RecipientOutcome> {
        let payload = RealtimeEvent {
            id: event.id.clone(),
            title: event.title.clone(),
            channel: None,
        };

        event
            .participants()
            .into_iter()
            .map(|user| {
                let result = self
                    .broadcaster
                    .publish(EVENT_OCCUR_BROADCAST, &payload, &user)
                    .map_err(|e| {
                        tracing::warn!(user_id = %user, error = %e, "Real-time broadcast failed");
                        e.to_string()
                    });
                RecipientOutcome { user, result }
            })
            .collect()
    }

    async fn resolve_names(&self, attendees: &[UserId]) -> (Vec<String>, Vec<UserId>) {
        let mut names = Vec::with_capacity(attendees.len());
        let mut unresolved = Vec::new();

        for user in attendees {
            match self.messenger.display_name(user).await {
                Ok(name) => names.push(name),
                Err(e) => {
                    tracing::debug!(user_id = %user, error = %e, "Leaving unresolved attendee out of members line");
                    unresolved.push(user.clone());
                }
            }
        }

        (names, unresolved)
    }

    async fn resolve_channel(&self, target: &ChatTarget) -> ServiceResult<ChannelId> {
        match target {
            ChatTarget::Channel(channel) => Ok(channel.clone()),
            ChatTarget::Direct(owner) => self.messenger.direct_channel(owner, &self.bot_id).await,
            ChatTarget::Group(members) => self.messenger.group_channel(members).await,
        }
    }

    async fn post(&self, event: &Event, target: &ChatTarget, text: String) -> ServiceResult<ChannelId> {
        let channel_id = self.resolve_channel(target).await?;
        let post = OutgoingPost {
            user_id: self.bot_id.clone(),
            channel_id,
            attachment: message::attachment(event, text),
        };
        self.messenger.create_post(&post).await?;
        Ok(post.channel_id)
    }
}
