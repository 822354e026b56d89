//! Due-candidate selection and the processed marker.

use diesel::prelude::*;
use diesel::sql_types::Timestamptz;
use diesel_async::RunQueryDsl;

use chime_core::model::{EventId, Tick};

use crate::db::connection::DbConnection;
use crate::db::schema::calendar_events;
use crate::model::DueEventRow;

// Times of day are compared in UTC so the session time zone cannot shift them.
const SELECT_DUE_CANDIDATES: &str = "\
SELECT ce.id, ce.title, ce.dt_start, ce.dt_end, ce.created, ce.owner, ce.channel, \
       cm.member, ce.recurrent, ce.recurrence, ce.color, ce.description, \
       ce.alert_time, ce.alert, ce.team \
FROM calendar_events ce \
LEFT JOIN calendar_members cm ON ce.id = cm.event \
WHERE (ce.dt_start = $1 \
       OR ce.alert_time = $1 \
       OR (ce.recurrent = TRUE AND ( \
              (ce.dt_start AT TIME ZONE 'UTC')::time = ($1 AT TIME ZONE 'UTC')::time \
           OR (ce.alert_time AT TIME ZONE 'UTC')::time = ($1 AT TIME ZONE 'UTC')::time))) \
  AND (ce.processed IS NULL OR ce.processed <> $1) \
ORDER BY ce.dt_start, ce.id, cm.member";

/// ## Summary
/// Selects every event due at `tick`, one row per attendee.
///
/// An event is due when its start or alert time equals the tick, or when it
/// recurs and the time of day of either matches. Events whose processed
/// marker already equals the tick are excluded.
///
/// ## Errors
/// Returns an error if the query fails or a row cannot be read.
#[tracing::instrument(skip_all, fields(tick = %tick))]
pub async fn select_due_candidates(
    conn: &mut DbConnection<'_>,
    tick: Tick,
) -> QueryResult<Vec<DueEventRow>> {
    let rows: Vec<DueEventRow> = diesel::sql_query(SELECT_DUE_CANDIDATES)
        .bind::<Timestamptz, _>(tick.instant())
        .load(conn)
        .await?;

    tracing::debug!(rows = rows.len(), "Loaded due candidate rows");
    Ok(rows)
}

/// ## Summary
/// Records that `event_id` was dispatched for `tick`.
///
/// ## Errors
/// Returns an error if the update fails.
#[tracing::instrument(skip_all, fields(event_id = %event_id, tick = %tick))]
pub async fn mark_processed(
    conn: &mut DbConnection<'_>,
    event_id: &EventId,
    tick: Tick,
) -> QueryResult<usize> {
    diesel::update(calendar_events::table.filter(calendar_events::id.eq(event_id.as_str())))
        .set(calendar_events::processed.eq(Some(tick.instant())))
        .execute(conn)
        .await
}
