//! Conversion of recurrence values written by old plugin versions.
//!
//! Old versions stored the repeat days as a JSON array of weekday indexes
//! (`0` = Monday … `6` = Sunday). Those are rewritten as weekly RRULEs so the
//! scheduler only ever sees rule text.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::calendar_events;
use crate::error::DbResult;

const WEEKDAYS: [&str; 7] = ["MO", "TU", "WE", "TH", "FR", "SA", "SU"];

/// Outcome of a legacy normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyReport {
    pub converted: usize,
    /// Event ids whose stored value could not be read as a weekday list.
    pub failed: Vec<String>,
    pub cleared: usize,
}

/// ## Summary
/// Builds a weekly RRULE from weekday indexes, ignoring out-of-range and
/// repeated values. Returns `None` when no valid day remains.
#[must_use]
pub fn weekdays_to_rrule(days: &[i64]) -> Option<String> {
    let mut selected = [false; 7];
    for day in days {
        if let Some(slot) = usize::try_from(*day).ok().and_then(|i| selected.get_mut(i)) {
            *slot = true;
        }
    }

    let by_day: Vec<&str> = WEEKDAYS
        .iter()
        .zip(selected)
        .filter_map(|(name, on)| on.then_some(*name))
        .collect();

    if by_day.is_empty() {
        return None;
    }
    Some(format!(
        "RRULE:FREQ=WEEKLY;INTERVAL=1;BYDAY={}",
        by_day.join(",")
    ))
}

/// ## Summary
/// Rewrites legacy weekday-array recurrences as RRULE text and blanks out
/// empty legacy values (`[]`, `null`).
///
/// Rows are updated one by one; a row that fails is logged and reported,
/// the rest continue.
///
/// ## Errors
/// Returns an error if the initial select or the final clearing update fails.
#[tracing::instrument(skip(conn))]
pub async fn normalize_legacy_recurrence(conn: &mut DbConnection<'_>) -> DbResult<LegacyReport> {
    let mut report = LegacyReport::default();

    let legacy: Vec<(String, Option<String>)> = calendar_events::table
        .filter(calendar_events::recurrent.eq(true))
        .filter(calendar_events::recurrence.like("[%"))
        .select((calendar_events::id, calendar_events::recurrence))
        .load(conn)
        .await?;

    for (id, raw) in legacy {
        let days = match serde_json::from_str::<Vec<i64>>(raw.as_deref().unwrap_or_default()) {
            Ok(days) => days,
            Err(e) => {
                tracing::warn!(event_id = %id, error = %e, "Unreadable legacy recurrence");
                report.failed.push(id);
                continue;
            }
        };
        let Some(rule) = weekdays_to_rrule(&days) else {
            continue;
        };

        let updated = diesel::update(calendar_events::table.filter(calendar_events::id.eq(&id)))
            .set(calendar_events::recurrence.eq(Some(rule)))
            .execute(conn)
            .await;
        match updated {
            Ok(_) => report.converted += 1,
            Err(e) => {
                tracing::warn!(event_id = %id, error = %e, "Failed to rewrite legacy recurrence");
                report.failed.push(id);
            }
        }
    }

    report.cleared = diesel::update(
        calendar_events::table.filter(calendar_events::recurrence.eq_any(["[]", "null"])),
    )
    .set(calendar_events::recurrence.eq(Some(String::new())))
    .execute(conn)
    .await?;

    tracing::info!(
        converted = report.converted,
        failed = report.failed.len(),
        cleared = report.cleared,
        "Legacy recurrence normalization finished"
    );

    Ok(report)
}
