//! Builders for events, ticks and wired-up routers.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use chime_core::model::{AlertKind, Event, EventId, Tick, UserId};
use chime_service::notify::NotificationRouter;

use crate::host::{RecordingBroadcaster, RecordingMessenger};

pub const BOT_ID: &str = "bot";

/// ## Panics
/// Panics if the arguments do not form a valid UTC instant.
#[must_use]
pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0)
        .single()
        .unwrap_or_else(|| panic!("invalid instant {y}-{m}-{d} {h}:{min}"))
}

#[must_use]
pub fn tick(y: i32, m: u32, d: u32, h: u32, min: u32) -> Tick {
    Tick::from_instant(&utc(y, m, d, h, min))
}

/// One-hour, one-shot event owned by `owner` with no attendees or alert.
#[must_use]
pub fn event(id: &str, owner: &str, start: DateTime<Utc>) -> Event {
    Event {
        id: EventId::from(id),
        title: format!("Event {id}"),
        description: String::new(),
        start,
        end: start + TimeDelta::hours(1),
        created: None,
        owner: UserId::from(owner),
        attendees: Vec::new(),
        channel: None,
        team: None,
        recurrent: false,
        recurrence: String::new(),
        alert: AlertKind::None,
        alert_time: None,
        color: None,
    }
}

/// Same as [`event`] but repeating by `rule`.
#[must_use]
pub fn recurring(id: &str, owner: &str, start: DateTime<Utc>, rule: &str) -> Event {
    Event {
        recurrent: true,
        recurrence: rule.to_owned(),
        ..event(id, owner, start)
    }
}

/// Sets the alert kind and the stored alert instant derived from it.
#[must_use]
pub fn with_alert(mut event: Event, alert: AlertKind) -> Event {
    event.alert = alert;
    event.alert_time = alert.alert_time(&event.start);
    event
}

#[must_use]
pub fn with_attendees(mut event: Event, attendees: &[&str]) -> Event {
    for attendee in attendees {
        event.add_attendee(UserId::from(*attendee));
    }
    event
}

/// Router posting as [`BOT_ID`] through the given doubles.
#[must_use]
pub fn router(
    messenger: &Arc<RecordingMessenger>,
    broadcaster: &Arc<RecordingBroadcaster>,
) -> NotificationRouter {
    NotificationRouter::new(
        messenger.clone(),
        broadcaster.clone(),
        UserId::from(BOT_ID),
    )
}
