use std::sync::Arc;
use std::time::Duration;

use chime_core::model::{AlertKind, EventId, UserId};
use chime_service::scheduler::TickScheduler;
use chime_test::fixtures::{event, recurring, router, tick, utc, with_alert};
use chime_test::{MemoryEventStore, RecordingBroadcaster, RecordingMessenger};

struct Harness {
    store: Arc<MemoryEventStore>,
    messenger: Arc<RecordingMessenger>,
    broadcaster: Arc<RecordingBroadcaster>,
    scheduler: TickScheduler,
}

fn harness(store: MemoryEventStore, period: Duration) -> Harness {
    let store = Arc::new(store);
    let messenger = Arc::new(RecordingMessenger::new());
    let broadcaster = Arc::new(RecordingBroadcaster::new());
    let scheduler = TickScheduler::new(store.clone(), router(&messenger, &broadcaster), period);
    Harness {
        store,
        messenger,
        broadcaster,
        scheduler,
    }
}

#[test_log::test(tokio::test)]
async fn direct_message_event_end_to_end() {
    let h = harness(
        MemoryEventStore::with_events([event("ev1", "U1", utc(2024, 1, 1, 9, 0))]),
        Duration::from_secs(15),
    );
    let nine = tick(2024, 1, 1, 9, 0);

    let report = h.scheduler.run_cycle(nine).await.expect("cycle succeeds");
    assert_eq!(report.dispatched.len(), 1);
    assert!(report.marker_failures.is_empty());

    let posts = h.messenger.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].channel_id.as_str(), "dm_U1_bot");
    assert_eq!(h.broadcaster.recipients(), vec![UserId::from("U1")]);
    assert_eq!(h.store.processed(&EventId::from("ev1")), Some(nine.instant()));

    let repeat = h.scheduler.run_cycle(nine).await.expect("cycle succeeds");
    assert!(repeat.dispatched.is_empty());
    assert_eq!(h.messenger.posts().len(), 1);
    assert_eq!(h.broadcaster.recipients().len(), 1);
    assert_eq!(h.store.query_count(), 2);
}

#[test_log::test(tokio::test)]
async fn marker_is_written_even_when_post_fails() {
    let h = harness(
        MemoryEventStore::with_events([event("ev1", "U1", utc(2024, 1, 1, 9, 0))]),
        Duration::from_secs(15),
    );
    h.messenger.fail_posts(true);
    let nine = tick(2024, 1, 1, 9, 0);

    let report = h.scheduler.run_cycle(nine).await.expect("cycle succeeds");
    assert!(!report.dispatched[0].posted());
    assert_eq!(h.store.processed(&EventId::from("ev1")), Some(nine.instant()));
}

#[test_log::test(tokio::test)]
async fn failed_query_writes_no_markers() {
    let h = harness(
        MemoryEventStore::with_events([event("ev1", "U1", utc(2024, 1, 1, 9, 0))]),
        Duration::from_secs(15),
    );
    h.store.fail_queries(true);

    assert!(h.scheduler.run_cycle(tick(2024, 1, 1, 9, 0)).await.is_err());
    assert_eq!(h.store.markers_written(), 0);
    assert!(h.messenger.posts().is_empty());
    assert!(h.broadcaster.published().is_empty());
}

#[test_log::test(tokio::test)]
async fn marker_failure_is_reported() {
    let h = harness(
        MemoryEventStore::with_events([event("ev1", "U1", utc(2024, 1, 1, 9, 0))]),
        Duration::from_secs(15),
    );
    h.store.fail_markers(true);

    let report = h
        .scheduler
        .run_cycle(tick(2024, 1, 1, 9, 0))
        .await
        .expect("cycle succeeds");
    assert_eq!(report.dispatched.len(), 1);
    assert_eq!(report.marker_failures.len(), 1);
    assert_eq!(report.marker_failures[0].event_id, EventId::from("ev1"));
}

#[test_log::test(tokio::test)]
async fn skipped_recurrence_is_not_marked() {
    let h = harness(
        MemoryEventStore::with_events([recurring(
            "standup",
            "U1",
            utc(2024, 1, 1, 9, 0),
            "FREQ=WEEKLY;BYDAY=MO",
        )]),
        Duration::from_secs(15),
    );

    let report = h
        .scheduler
        .run_cycle(tick(2024, 1, 2, 9, 0))
        .await
        .expect("cycle succeeds");
    assert!(report.dispatched.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(h.store.markers_written(), 0);
}

#[test_log::test(tokio::test)]
async fn day_before_alert_without_occurrence_today_is_not_sent() {
    let standup = recurring("standup", "U1", utc(2024, 1, 1, 9, 0), "FREQ=WEEKLY;BYDAY=MO");
    let h = harness(
        MemoryEventStore::with_events([with_alert(standup, AlertKind::OneDayBefore)]),
        Duration::from_secs(15),
    );

    // Sunday, the day before a Monday occurrence.
    let report = h
        .scheduler
        .run_cycle(tick(2024, 1, 7, 9, 0))
        .await
        .expect("cycle succeeds");
    assert!(report.dispatched.is_empty());
    assert!(h.messenger.posts().is_empty());
    assert!(h.broadcaster.published().is_empty());
    assert_eq!(h.store.markers_written(), 0);
}

#[test_log::test(tokio::test)]
async fn started_scheduler_runs_until_stopped() {
    let h = harness(MemoryEventStore::new(), Duration::from_millis(20));
    let handle = h.scheduler.start();

    tokio::time::timeout(Duration::from_secs(5), async {
        while h.store.query_count() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("scheduler ticks");
    assert!(handle.is_running());

    handle.stop().await;
    let after_stop = h.store.query_count();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(h.store.query_count(), after_stop);
}

#[test_log::test(tokio::test)]
async fn stop_before_first_tick_is_not_lost() {
    let h = harness(MemoryEventStore::new(), Duration::from_secs(3600));
    let handle = h.scheduler.start();

    tokio::time::timeout(Duration::from_secs(5), handle.stop())
        .await
        .expect("stop completes");
    assert_eq!(h.store.query_count(), 0);
}

#[test_log::test(tokio::test)]
async fn stop_waits_for_the_running_cycle() {
    let h = harness(MemoryEventStore::new(), Duration::from_secs(3600));
    let gate = h.store.gate_queries();
    let handle = h.scheduler.start();

    let now = tokio::time::timeout(Duration::from_secs(5), gate.wait_entered())
        .await
        .expect("first cycle reaches the store")
        .expect("query carries its tick");
    h.store.insert(event("ev1", "U1", now.instant()));

    let stopping = tokio::spawn(handle.stop());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!stopping.is_finished());
    assert_eq!(h.store.markers_written(), 0);

    gate.release();
    tokio::time::timeout(Duration::from_secs(5), stopping)
        .await
        .expect("stop completes")
        .expect("stop task joins");
    assert_eq!(h.store.processed(&EventId::from("ev1")), Some(now.instant()));
    assert_eq!(h.messenger.posts().len(), 1);
    assert_eq!(h.store.query_count(), 1);
}
