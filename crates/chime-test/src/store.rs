//! Event store kept in memory, applying the same due predicate as the
//! Postgres query.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use tokio::sync::Notify;

use chime_core::model::{Event, EventId, Tick};
use chime_db::db::store::EventStore;
use chime_db::error::{DbError, DbResult};
use chime_db::model::DueEventRow;

use crate::lock;

#[derive(Debug, Clone)]
struct StoredEvent {
    event: Event,
    processed: Option<DateTime<Utc>>,
}

impl StoredEvent {
    fn is_due(&self, tick: Tick) -> bool {
        let event = &self.event;
        let exact = tick.is(event.start) || event.alert_time.is_some_and(|at| tick.is(at));
        let same_time_of_day = event.recurrent
            && (event.start.time() == tick.time_of_day()
                || event
                    .alert_time
                    .is_some_and(|at| at.time() == tick.time_of_day()));

        (exact || same_time_of_day) && self.processed != Some(tick.instant())
    }

    fn rows(&self) -> Vec<DueEventRow> {
        let event = &self.event;
        let row = |member: Option<String>| DueEventRow {
            id: event.id.to_string(),
            title: event.title.clone(),
            dt_start: event.start,
            dt_end: event.end,
            created: event.created,
            owner: event.owner.to_string(),
            channel: event.channel.as_ref().map(ToString::to_string),
            member,
            recurrent: event.recurrent,
            recurrence: Some(event.recurrence.clone()),
            color: event.color.clone(),
            description: Some(event.description.clone()),
            alert_time: event.alert_time,
            alert: Some(event.alert.as_str().to_owned()),
            team: event.team.as_ref().map(ToString::to_string),
        };

        if event.attendees.is_empty() {
            vec![row(None)]
        } else {
            event
                .attendees
                .iter()
                .map(|user| row(Some(user.to_string())))
                .collect()
        }
    }
}

/// Holds queries until released, so a test can act while a cycle is inside
/// the store.
#[derive(Debug, Default)]
pub struct QueryGate {
    entered: Notify,
    release: Notify,
    tick: Mutex<Option<Tick>>,
}

impl QueryGate {
    /// Waits until a query reaches the gate and returns the tick it carries.
    pub async fn wait_entered(&self) -> Option<Tick> {
        self.entered.notified().await;
        *lock(&self.tick)
    }

    /// Lets the held query continue.
    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self, tick: Tick) {
        *lock(&self.tick) = Some(tick);
        self.entered.notify_one();
        self.release.notified().await;
    }
}

/// In-memory [`EventStore`] recording queries and processed markers.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: Mutex<Vec<StoredEvent>>,
    extra_rows: Mutex<Vec<DueEventRow>>,
    queries: AtomicUsize,
    markers_written: AtomicUsize,
    fail_queries: AtomicBool,
    fail_markers: AtomicBool,
    gate: Mutex<Option<Arc<QueryGate>>>,
}

impl MemoryEventStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_events(events: impl IntoIterator<Item = Event>) -> Self {
        let store = Self::new();
        for event in events {
            store.insert(event);
        }
        store
    }

    pub fn insert(&self, event: Event) {
        lock(&self.events).push(StoredEvent {
            event,
            processed: None,
        });
    }

    /// Row returned by every query regardless of the tick, e.g. a malformed one.
    pub fn insert_raw_row(&self, row: DueEventRow) {
        lock(&self.extra_rows).push(row);
    }

    #[must_use]
    pub fn processed(&self, event_id: &EventId) -> Option<DateTime<Utc>> {
        lock(&self.events)
            .iter()
            .find(|stored| &stored.event.id == event_id)
            .and_then(|stored| stored.processed)
    }

    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn markers_written(&self) -> usize {
        self.markers_written.load(Ordering::SeqCst)
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn fail_markers(&self, fail: bool) {
        self.fail_markers.store(fail, Ordering::SeqCst);
    }

    /// Holds every later query at the returned gate. Rows are read after the
    /// gate opens.
    #[must_use]
    pub fn gate_queries(&self) -> Arc<QueryGate> {
        let gate = Arc::new(QueryGate::default());
        *lock(&self.gate) = Some(gate.clone());
        gate
    }
}

impl EventStore for MemoryEventStore {
    fn select_due_candidates(&self, tick: Tick) -> BoxFuture<'_, DbResult<Vec<DueEventRow>>> {
        Box::pin(async move {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let gate = lock(&self.gate).clone();
            if let Some(gate) = gate {
                gate.pass(tick).await;
            }
            if self.fail_queries.load(Ordering::SeqCst) {
                return Err(DbError::DatabaseError(
                    diesel::result::Error::BrokenTransactionManager,
                ));
            }

            let mut rows: Vec<DueEventRow> = lock(&self.events)
                .iter()
                .filter(|stored| stored.is_due(tick))
                .flat_map(StoredEvent::rows)
                .collect();
            rows.extend(lock(&self.extra_rows).iter().cloned());
            Ok(rows)
        })
    }

    fn mark_processed<'a>(
        &'a self,
        event_id: &'a EventId,
        tick: Tick,
    ) -> BoxFuture<'a, DbResult<()>> {
        Box::pin(async move {
            if self.fail_markers.load(Ordering::SeqCst) {
                return Err(DbError::DatabaseError(
                    diesel::result::Error::BrokenTransactionManager,
                ));
            }

            if let Some(stored) = lock(&self.events)
                .iter_mut()
                .find(|stored| &stored.event.id == event_id)
            {
                stored.processed = Some(tick.instant());
                self.markers_written.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        })
    }
}
