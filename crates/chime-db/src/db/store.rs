//! The narrow store interface the scheduler depends on.

use futures::future::BoxFuture;

use chime_core::model::{EventId, Tick};

use crate::db::DbProvider;
use crate::db::connection::DbPool;
use crate::db::query;
use crate::error::DbResult;
use crate::model::DueEventRow;

/// Read/write access the scheduler needs from persistence.
///
/// The scheduler never creates or deletes events; it reads due candidates and
/// writes the processed marker.
pub trait EventStore: Send + Sync {
    /// ## Summary
    /// Returns one row per (event, attendee) for every event due at `tick`
    /// whose processed marker is not `tick`.
    fn select_due_candidates(&self, tick: Tick) -> BoxFuture<'_, DbResult<Vec<DueEventRow>>>;

    /// ## Summary
    /// Sets the processed marker of `event_id` to `tick`.
    fn mark_processed<'a>(&'a self, event_id: &'a EventId, tick: Tick)
    -> BoxFuture<'a, DbResult<()>>;
}

impl EventStore for DbPool {
    fn select_due_candidates(&self, tick: Tick) -> BoxFuture<'_, DbResult<Vec<DueEventRow>>> {
        Box::pin(async move {
            let mut conn = self.get_connection().await?;
            Ok(query::due::select_due_candidates(&mut conn, tick).await?)
        })
    }

    fn mark_processed<'a>(
        &'a self,
        event_id: &'a EventId,
        tick: Tick,
    ) -> BoxFuture<'a, DbResult<()>> {
        Box::pin(async move {
            let mut conn = self.get_connection().await?;
            let updated = query::due::mark_processed(&mut conn, event_id, tick).await?;
            if updated == 0 {
                tracing::warn!(event_id = %event_id, "Event vanished before it could be marked processed");
            }
            Ok(())
        })
    }
}
