//! Selection of the events due at a tick.

use std::collections::HashMap;

use chime_core::model::{Event, EventId, Tick};
use chime_db::db::store::EventStore;
use chime_db::model::CandidateRow;

use crate::error::ServiceResult;
use crate::recurrence;

/// Why a candidate was left out of a [`DueBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The row could not be decoded; only that row is dropped.
    Decode(String),
    /// The recurrence rule could not be parsed or built.
    Recurrence(String),
    /// The rule has no occurrence on the tick's day.
    NoOccurrence,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCandidate {
    pub event_id: String,
    pub reason: SkipReason,
}

/// Events due at one tick, with attendees merged and recurring schedules
/// rewritten for the occurrence being dispatched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DueBatch {
    pub events: Vec<Event>,
    pub skipped: Vec<SkippedCandidate>,
}

/// ## Summary
/// Merges one-row-per-attendee candidates into one event per id.
///
/// The first row of an id establishes the event; later rows only add their
/// attendee. Events keep the order in which their first row appeared.
#[must_use]
pub fn group_candidate_rows(rows: impl IntoIterator<Item = CandidateRow>) -> Vec<Event> {
    let mut events: Vec<Event> = Vec::new();
    let mut index: HashMap<EventId, usize> = HashMap::new();

    for CandidateRow { event, attendee } in rows {
        let slot = if let Some(&slot) = index.get(&event.id) {
            slot
        } else {
            index.insert(event.id.clone(), events.len());
            events.push(event);
            events.len() - 1
        };

        if let (Some(user), Some(merged)) = (attendee, events.get_mut(slot)) {
            merged.add_attendee(user);
        }
    }

    events
}

/// ## Summary
/// Rewrites a recurring event for its occurrence on the tick's day.
///
/// Non-recurring events pass through untouched. Returns `None` when the rule
/// has no occurrence on the tick's day, whatever the alert kind.
///
/// ## Errors
/// Returns `ServiceError::RecurrenceError` if the rule cannot be expanded.
pub fn resolve_occurrence(mut event: Event, tick: Tick) -> ServiceResult<Option<Event>> {
    if !event.recurrent {
        return Ok(Some(event));
    }

    Ok(recurrence::expand(&event, tick.date())?.map(|occurrence| {
        occurrence.apply_to(&mut event);
        event
    }))
}

/// ## Summary
/// Fetches the candidates due at `tick` and resolves them into dispatchable
/// events.
///
/// ## Errors
/// Returns `ServiceError::DatabaseError` if the candidate query fails. Row
/// and recurrence failures are reported in [`DueBatch::skipped`] instead.
#[tracing::instrument(skip_all, fields(tick = %tick))]
pub async fn find_due(store: &dyn EventStore, tick: Tick) -> ServiceResult<DueBatch> {
    let rows = store.select_due_candidates(tick).await?;
    tracing::trace!(rows = rows.len(), "Fetched due candidate rows");

    let mut skipped = Vec::new();
    let mut decoded = Vec::with_capacity(rows.len());
    for row in rows {
        let event_id = row.id.clone();
        match row.decode() {
            Ok(candidate) => decoded.push(candidate),
            Err(e) => {
                tracing::warn!(event_id = %event_id, error = %e, "Skipping undecodable candidate row");
                skipped.push(SkippedCandidate {
                    event_id,
                    reason: SkipReason::Decode(e.to_string()),
                });
            }
        }
    }

    let mut events = Vec::new();
    for event in group_candidate_rows(decoded) {
        let event_id = event.id.to_string();
        match resolve_occurrence(event, tick) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => {
                tracing::debug!(event_id = %event_id, "Recurring event does not occur today");
                skipped.push(SkippedCandidate {
                    event_id,
                    reason: SkipReason::NoOccurrence,
                });
            }
            Err(e) => {
                tracing::warn!(event_id = %event_id, error = %e, "Skipping event with unusable recurrence");
                skipped.push(SkippedCandidate {
                    event_id,
                    reason: SkipReason::Recurrence(e.to_string()),
                });
            }
        }
    }

    tracing::debug!(due = events.len(), skipped = skipped.len(), "Due events resolved");

    Ok(DueBatch { events, skipped })
}
