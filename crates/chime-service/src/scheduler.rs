//! Periodic driver of matching, dispatch and processed markers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use chime_core::model::{EventId, Tick};
use chime_db::db::store::EventStore;

use crate::error::ServiceResult;
use crate::matcher::{self, SkippedCandidate};
use crate::notify::{DispatchReport, NotificationRouter};

/// A processed marker that could not be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerFailure {
    pub event_id: EventId,
    pub reason: String,
}

/// Outcome of one scheduler cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub tick: Tick,
    pub dispatched: Vec<DispatchReport>,
    pub skipped: Vec<SkippedCandidate>,
    pub marker_failures: Vec<MarkerFailure>,
}

/// Matches due events on every tick and dispatches them.
pub struct TickScheduler {
    store: Arc<dyn EventStore>,
    router: NotificationRouter,
    period: Duration,
}

impl TickScheduler {
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>, router: NotificationRouter, period: Duration) -> Self {
        Self {
            store,
            router,
            period,
        }
    }

    /// ## Summary
    /// Runs one cycle at `tick`: find due events, dispatch each, then mark it
    /// processed for `tick`.
    ///
    /// The marker is written after dispatch whatever the post outcome, so an
    /// event is notified at most once per tick.
    ///
    /// ## Errors
    /// Returns an error if the candidate query fails; nothing is dispatched or
    /// marked in that case.
    #[tracing::instrument(skip_all, fields(tick = %tick))]
    pub async fn run_cycle(&self, tick: Tick) -> ServiceResult<CycleReport> {
        let batch = matcher::find_due(self.store.as_ref(), tick).await?;

        let mut dispatched = Vec::with_capacity(batch.events.len());
        let mut marker_failures = Vec::new();

        for event in &batch.events {
            tracing::info!(event_id = %event.id, title = %event.title, "Dispatching event");
            dispatched.push(self.router.dispatch(event, tick).await);

            if let Err(e) = self.store.mark_processed(&event.id, tick).await {
                tracing::error!(event_id = %event.id, error = %e, "Failed to write processed marker");
                marker_failures.push(MarkerFailure {
                    event_id: event.id.clone(),
                    reason: e.to_string(),
                });
            }
        }

        Ok(CycleReport {
            tick,
            dispatched,
            skipped: batch.skipped,
            marker_failures,
        })
    }

    /// ## Summary
    /// Spawns the ticker loop on the current runtime.
    ///
    /// The first cycle runs immediately; afterwards one cycle runs per period.
    /// Cycles never overlap.
    #[must_use]
    pub fn start(self) -> SchedulerHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        SchedulerHandle { shutdown, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(period_secs = self.period.as_secs(), "Scheduler started");

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow_and_update() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            let tick = Tick::now();
            match self.run_cycle(tick).await {
                Ok(report) => tracing::debug!(
                    tick = %tick,
                    dispatched = report.dispatched.len(),
                    skipped = report.skipped.len(),
                    marker_failures = report.marker_failures.len(),
                    "Cycle finished"
                ),
                Err(e) => tracing::error!(tick = %tick, error = %e, "Cycle aborted"),
            }
        }

        tracing::info!("Scheduler loop exited");
    }
}

/// Handle to a running [`TickScheduler`].
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// ## Summary
    /// Requests a stop and waits for the loop to exit. A cycle in progress
    /// completes first.
    pub async fn stop(self) {
        self.shutdown.send_replace(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Scheduler task ended abnormally");
        }
        tracing::info!("Scheduler stopped");
    }
}
