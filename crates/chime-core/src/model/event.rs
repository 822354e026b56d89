//! The unit of scheduling.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_COLOR;
use crate::model::{AlertKind, ChannelId, EventId, TeamId, Tick, UserId};

/// Calendar event as the scheduler sees it.
///
/// For recurring events `start`, `end` and `alert_time` hold the stored
/// template until the matcher rewrites them for the occurrence being
/// dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    /// Empty when the event has no description.
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub created: Option<DateTime<Utc>>,
    pub owner: UserId,
    /// Attendees in the order the store returned them, without duplicates.
    pub attendees: Vec<UserId>,
    /// Channel notifications are posted to instead of a direct/group message.
    pub channel: Option<ChannelId>,
    pub team: Option<TeamId>,
    pub recurrent: bool,
    /// RRULE text; empty for one-shot events.
    pub recurrence: String,
    pub alert: AlertKind,
    pub alert_time: Option<DateTime<Utc>>,
    pub color: Option<String>,
}

impl Event {
    /// Length of the event, never negative.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        (self.end - self.start).max(TimeDelta::zero())
    }

    #[must_use]
    pub fn color_or_default(&self) -> &str {
        match self.color.as_deref() {
            Some(color) if !color.is_empty() => color,
            _ => DEFAULT_COLOR,
        }
    }

    #[must_use]
    pub fn has_description(&self) -> bool {
        !self.description.trim().is_empty()
    }

    /// Whether this tick is the event's alert rather than its start.
    #[must_use]
    pub fn alert_fires_at(&self, tick: Tick) -> bool {
        self.alert_time.is_some_and(|at| tick.is(at))
    }

    /// ## Summary
    /// Adds an attendee unless already present.
    pub fn add_attendee(&mut self, user: UserId) {
        if !self.attendees.contains(&user) {
            self.attendees.push(user);
        }
    }

    /// ## Summary
    /// Attendees plus the owner, each exactly once, owner last when not an attendee.
    #[must_use]
    pub fn participants(&self) -> Vec<UserId> {
        let mut participants: Vec<UserId> = Vec::with_capacity(self.attendees.len() + 1);
        for user in self.attendees.iter().chain(std::iter::once(&self.owner)) {
            if !participants.contains(user) {
                participants.push(user.clone());
            }
        }
        participants
    }
}
