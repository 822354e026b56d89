//! Rows returned by the due-candidate query.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{Bool, Nullable, Text, Timestamptz};

use chime_core::model::{AlertKind, ChannelId, Event, EventId, TeamId, UserId};

use crate::error::{DbError, DbResult};

/// One event joined with at most one attendee.
///
/// An event with N attendees yields N rows; an event without attendees
/// yields a single row with `member = None`.
#[derive(Debug, Clone, PartialEq, Eq, QueryableByName)]
pub struct DueEventRow {
    #[diesel(sql_type = Text)]
    pub id: String,
    #[diesel(sql_type = Text)]
    pub title: String,
    #[diesel(sql_type = Timestamptz)]
    pub dt_start: DateTime<Utc>,
    #[diesel(sql_type = Timestamptz)]
    pub dt_end: DateTime<Utc>,
    #[diesel(sql_type = Nullable<Timestamptz>)]
    pub created: Option<DateTime<Utc>>,
    #[diesel(sql_type = Text)]
    pub owner: String,
    #[diesel(sql_type = Nullable<Text>)]
    pub channel: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub member: Option<String>,
    #[diesel(sql_type = Bool)]
    pub recurrent: bool,
    #[diesel(sql_type = Nullable<Text>)]
    pub recurrence: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub color: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub description: Option<String>,
    #[diesel(sql_type = Nullable<Timestamptz>)]
    pub alert_time: Option<DateTime<Utc>>,
    #[diesel(sql_type = Nullable<Text>)]
    pub alert: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub team: Option<String>,
}

/// A decoded row: the event (attendees empty) plus the row's attendee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRow {
    pub event: Event,
    pub attendee: Option<UserId>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl DueEventRow {
    /// ## Summary
    /// Decodes the raw row into domain types.
    ///
    /// ## Errors
    /// Returns `DbError::RowDecodeError` if the id or owner is empty or the
    /// alert kind is not recognized.
    pub fn decode(self) -> DbResult<CandidateRow> {
        let decode_error = |reason: String| DbError::RowDecodeError {
            event_id: self.id.clone(),
            reason,
        };

        if self.id.is_empty() {
            return Err(decode_error("empty event id".to_owned()));
        }
        if self.owner.is_empty() {
            return Err(decode_error("empty owner".to_owned()));
        }
        let alert = self
            .alert
            .as_deref()
            .unwrap_or_default()
            .parse::<AlertKind>()
            .map_err(|e| decode_error(e.to_string()))?;

        let event = Event {
            id: EventId::new(self.id),
            title: self.title,
            description: self.description.unwrap_or_default(),
            start: self.dt_start,
            end: self.dt_end,
            created: self.created,
            owner: UserId::new(self.owner),
            attendees: Vec::new(),
            channel: non_empty(self.channel).map(ChannelId::new),
            team: non_empty(self.team).map(TeamId::new),
            recurrent: self.recurrent,
            recurrence: self.recurrence.unwrap_or_default(),
            alert,
            alert_time: self.alert_time,
            color: non_empty(self.color),
        };

        Ok(CandidateRow {
            event,
            attendee: non_empty(self.member).map(UserId::new),
        })
    }
}
