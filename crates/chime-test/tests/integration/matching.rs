use chime_core::model::{AlertKind, EventId, UserId};
use chime_db::db::store::EventStore;
use chime_db::model::DueEventRow;
use chime_service::error::ServiceError;
use chime_service::matcher::{SkipReason, find_due};
use chime_test::MemoryEventStore;
use chime_test::fixtures::{event, recurring, tick, utc, with_alert, with_attendees};

#[test_log::test(tokio::test)]
async fn one_shot_event_is_due_at_start_only() {
    let store = MemoryEventStore::with_events([event("a", "u1", utc(2024, 1, 1, 9, 0))]);

    let at_start = find_due(&store, tick(2024, 1, 1, 9, 0)).await.expect("query succeeds");
    assert_eq!(at_start.events.len(), 1);

    let next_minute = find_due(&store, tick(2024, 1, 1, 9, 1)).await.expect("query succeeds");
    assert!(next_minute.events.is_empty());

    let next_day = find_due(&store, tick(2024, 1, 2, 9, 0)).await.expect("query succeeds");
    assert!(next_day.events.is_empty());
}

#[test_log::test(tokio::test)]
async fn one_shot_event_is_due_at_alert() {
    let store = MemoryEventStore::with_events([with_alert(
        event("a", "u1", utc(2024, 1, 1, 9, 0)),
        AlertKind::ThirtyMinutesBefore,
    )]);

    let batch = find_due(&store, tick(2024, 1, 1, 8, 30)).await.expect("query succeeds");
    assert_eq!(batch.events.len(), 1);
    assert!(batch.events[0].alert_fires_at(tick(2024, 1, 1, 8, 30)));
}

#[test_log::test(tokio::test)]
async fn processed_marker_suppresses_same_tick_only() {
    let store = MemoryEventStore::with_events([with_alert(
        event("a", "u1", utc(2024, 1, 1, 9, 0)),
        AlertKind::FiveMinutesBefore,
    )]);

    store
        .mark_processed(&EventId::from("a"), tick(2024, 1, 1, 8, 55))
        .await
        .expect("marker written");

    let same = find_due(&store, tick(2024, 1, 1, 8, 55)).await.expect("query succeeds");
    assert!(same.events.is_empty());

    let start = find_due(&store, tick(2024, 1, 1, 9, 0)).await.expect("query succeeds");
    assert_eq!(start.events.len(), 1);
}

#[test_log::test(tokio::test)]
async fn attendee_rows_merge_into_one_event() {
    let store = MemoryEventStore::with_events([with_attendees(
        event("a", "owner", utc(2024, 1, 1, 9, 0)),
        &["u1", "u2", "u3"],
    )]);

    let batch = find_due(&store, tick(2024, 1, 1, 9, 0)).await.expect("query succeeds");
    assert_eq!(batch.events.len(), 1);
    assert_eq!(
        batch.events[0].attendees,
        vec![UserId::from("u1"), UserId::from("u2"), UserId::from("u3")]
    );
}

#[test_log::test(tokio::test)]
async fn weekly_event_is_gated_by_day() {
    // 2024-01-01 is a Monday.
    let store = MemoryEventStore::with_events([recurring(
        "standup",
        "u1",
        utc(2024, 1, 1, 9, 0),
        "FREQ=WEEKLY;BYDAY=MO",
    )]);

    let wednesday = find_due(&store, tick(2024, 1, 3, 9, 0)).await.expect("query succeeds");
    assert!(wednesday.events.is_empty());
    assert_eq!(wednesday.skipped.len(), 1);
    assert_eq!(wednesday.skipped[0].reason, SkipReason::NoOccurrence);
    assert_eq!(store.processed(&EventId::from("standup")), None);

    let monday = find_due(&store, tick(2024, 1, 8, 9, 0)).await.expect("query succeeds");
    assert_eq!(monday.events.len(), 1);
    assert_eq!(monday.events[0].start, utc(2024, 1, 8, 9, 0));
    assert_eq!(monday.events[0].end, utc(2024, 1, 8, 10, 0));
}

#[test_log::test(tokio::test)]
async fn recurring_alert_is_recomputed_for_today() {
    let store = MemoryEventStore::with_events([with_alert(
        recurring("standup", "u1", utc(2024, 1, 1, 9, 0), "FREQ=DAILY"),
        AlertKind::FifteenMinutesBefore,
    )]);

    let batch = find_due(&store, tick(2024, 3, 12, 8, 45)).await.expect("query succeeds");
    assert_eq!(batch.events.len(), 1);
    let occurrence = &batch.events[0];
    assert_eq!(occurrence.start, utc(2024, 3, 12, 9, 0));
    assert_eq!(occurrence.alert_time, Some(utc(2024, 3, 12, 8, 45)));
    assert!(occurrence.alert_fires_at(tick(2024, 3, 12, 8, 45)));
}

#[test_log::test(tokio::test)]
async fn undecodable_row_is_skipped_alone() {
    let store = MemoryEventStore::with_events([event("good", "u1", utc(2024, 1, 1, 9, 0))]);
    store.insert_raw_row(DueEventRow {
        id: "bad".to_owned(),
        title: "Broken".to_owned(),
        dt_start: utc(2024, 1, 1, 9, 0),
        dt_end: utc(2024, 1, 1, 10, 0),
        created: None,
        owner: "u1".to_owned(),
        channel: None,
        member: None,
        recurrent: false,
        recurrence: None,
        color: None,
        description: None,
        alert_time: None,
        alert: Some("3_minutes_before".to_owned()),
        team: None,
    });

    let batch = find_due(&store, tick(2024, 1, 1, 9, 0)).await.expect("query succeeds");
    assert_eq!(batch.events.len(), 1);
    assert_eq!(batch.events[0].id, EventId::from("good"));
    assert_eq!(batch.skipped.len(), 1);
    assert_eq!(batch.skipped[0].event_id, "bad");
    assert!(matches!(batch.skipped[0].reason, SkipReason::Decode(_)));
}

#[test_log::test(tokio::test)]
async fn broken_rule_is_skipped() {
    let store = MemoryEventStore::with_events([
        recurring("broken", "u1", utc(2024, 1, 1, 9, 0), "FREQ=FORTNIGHTLY"),
        event("fine", "u1", utc(2024, 1, 1, 9, 0)),
    ]);

    let batch = find_due(&store, tick(2024, 1, 1, 9, 0)).await.expect("query succeeds");
    assert_eq!(batch.events.len(), 1);
    assert!(matches!(batch.skipped[0].reason, SkipReason::Recurrence(_)));
}

#[test_log::test(tokio::test)]
async fn query_failure_aborts() {
    let store = MemoryEventStore::with_events([event("a", "u1", utc(2024, 1, 1, 9, 0))]);
    store.fail_queries(true);

    let err = find_due(&store, tick(2024, 1, 1, 9, 0))
        .await
        .expect_err("query failure propagates");
    assert!(matches!(err, ServiceError::DatabaseError(_)));
}
