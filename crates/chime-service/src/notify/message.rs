//! Markdown text of notification posts.

use chime_core::model::{Event, Tick};

use super::host::Attachment;

/// ## Summary
/// First line of a notification: an alarm header when the tick is the
/// event's alert, a plain header otherwise.
#[must_use]
pub fn header(event: &Event, tick: Tick) -> String {
    if event.alert_fires_at(tick) {
        format!(
            ":alarm_clock: **{}** *{}* :alarm_clock:\n",
            event.alert.title(),
            event.title
        )
    } else {
        format!(":dart: *{}* :dart:\n", event.title)
    }
}

/// ## Summary
/// Renders the full notification text.
///
/// `member_names` are the display names that resolved; the members line is
/// present whenever the event has attendees, even if no name resolved.
#[must_use]
pub fn compose(event: &Event, tick: Tick, member_names: &[String]) -> String {
    let mut text = header(event, tick);

    if !event.attendees.is_empty() {
        let mentions: Vec<String> = member_names.iter().map(|name| format!("@{name}")).collect();
        text.push_str(&format!("**members:** {}\n", mentions.join(", ")));
    }

    if event.has_description() {
        text.push_str(&format!("**description:**\n{}", event.description));
    }

    text
}

/// ## Summary
/// Wraps the rendered text in an attachment colored after the event.
#[must_use]
pub fn attachment(event: &Event, text: String) -> Attachment {
    Attachment {
        fallback: event.title.clone(),
        text,
        color: event.color_or_default().to_owned(),
    }
}
