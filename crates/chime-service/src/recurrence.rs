//! Expansion of an event's recurrence rule into the occurrence for one day.
//!
//! The rule is anchored at midnight UTC of the stored template date, so rule
//! instants land on day boundaries; the occurrence itself keeps the template's
//! time of day.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use rrule::{RRule, RRuleSet, Tz, Unvalidated};

use chime_core::model::Event;

use crate::error::{ServiceError, ServiceResult};

// Day-granular rules produce at most one instant per window.
const MAX_INSTANTS_PER_WINDOW: u16 = 16;

/// Recomputed schedule of a recurring event for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub alert_time: Option<DateTime<Utc>>,
}

impl Occurrence {
    /// ## Summary
    /// Rewrites the event's effective schedule with this occurrence.
    pub fn apply_to(self, event: &mut Event) {
        event.start = self.start;
        event.end = self.end;
        event.alert_time = self.alert_time;
    }
}

/// Finds the RRULE body in stored rule text.
///
/// Accepts a bare body (`FREQ=DAILY`), a prefixed line (`RRULE:FREQ=DAILY`),
/// or multi-line iCalendar text containing such a line.
fn rule_body(text: &str) -> Option<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find_map(|line| {
            if line
                .get(..6)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("RRULE:"))
            {
                line.get(6..)
            } else if line.contains(':') {
                None
            } else {
                Some(line)
            }
        })
}

/// ## Summary
/// Parses stored rule text into an unvalidated rule.
///
/// ## Errors
/// Returns `ServiceError::RecurrenceError` if no rule line is present or it
/// does not parse.
pub fn parse_rule(text: &str) -> ServiceResult<RRule<Unvalidated>> {
    let body = rule_body(text)
        .ok_or_else(|| ServiceError::RecurrenceError(format!("no RRULE in '{text}'")))?;
    body.parse::<RRule<Unvalidated>>()
        .map_err(|err| ServiceError::RecurrenceError(err.to_string()))
}

/// ## Summary
/// Builds the rule set for a recurring event, anchored at midnight UTC of
/// the template start date.
///
/// ## Errors
/// Returns `ServiceError::RecurrenceError` if the rule is malformed or fails
/// validation against its anchor.
pub fn rule_set_for(event: &Event) -> ServiceResult<RRuleSet> {
    let rule = parse_rule(&event.recurrence)?;
    let anchor = event
        .start
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_utc()
        .with_timezone(&Tz::UTC);
    rule.build(anchor)
        .map_err(|err| ServiceError::RecurrenceError(err.to_string()))
}

/// ## Summary
/// Returns the rule instants in `[start, end]`, both ends inclusive, in order.
#[must_use]
pub fn instants_between(
    rule_set: RRuleSet,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<DateTime<Utc>> {
    let after = (start - TimeDelta::seconds(1)).with_timezone(&Tz::UTC);
    let before = (end + TimeDelta::seconds(1)).with_timezone(&Tz::UTC);

    rule_set
        .after(after)
        .before(before)
        .all(MAX_INSTANTS_PER_WINDOW)
        .dates
        .into_iter()
        .map(|dt| dt.with_timezone(&Utc))
        .filter(|dt| *dt >= start && *dt <= end)
        .collect()
}

/// ## Summary
/// Computes the occurrence of a recurring event on `day`, if the rule has one.
///
/// The rule is evaluated over `[day 00:00, day 00:00 + duration]`, both ends
/// inclusive, so an event lasting longer than a day also occurs on the days
/// leading up to a rule instant. Only the first instant counts. The occurrence starts on
/// `day` at the template's time of day and keeps the template's duration; its
/// alert time is derived from the alert kind.
///
/// ## Errors
/// Returns `ServiceError::RecurrenceError` if the rule cannot be parsed or built.
pub fn expand(event: &Event, day: NaiveDate) -> ServiceResult<Option<Occurrence>> {
    let rule_set = rule_set_for(event)?;

    let window_start = day.and_time(NaiveTime::MIN).and_utc();
    let duration = event.duration();
    let window_end = window_start + duration;

    let Some(first) = instants_between(rule_set, window_start, window_end)
        .into_iter()
        .next()
    else {
        tracing::trace!(event_id = %event.id, %day, "No occurrence on day");
        return Ok(None);
    };
    tracing::trace!(event_id = %event.id, instant = %first, "Rule instant found");

    let start = day.and_time(event.start.time()).and_utc();
    Ok(Some(Occurrence {
        start,
        end: start + duration,
        alert_time: event.alert.alert_time(&start),
    }))
}
