use std::sync::Arc;

use chime_app::realtime::RealtimeHub;
use chime_core::constants::{DEFAULT_COLOR, EVENT_OCCUR_BROADCAST, EVENT_OCCUR_WIRE_NAME};
use chime_core::model::{AlertKind, ChannelId, UserId};
use chime_service::notify::{ChatTarget, DeliveryOutcome, NotificationRouter};
use chime_test::fixtures::{BOT_ID, event, router, tick, utc, with_alert, with_attendees};
use chime_test::{RecordingBroadcaster, RecordingMessenger};

fn doubles() -> (Arc<RecordingMessenger>, Arc<RecordingBroadcaster>) {
    (
        Arc::new(
            RecordingMessenger::new()
                .with_user("a", "alice")
                .with_user("b", "bob")
                .with_user("c", "carol"),
        ),
        Arc::new(RecordingBroadcaster::new()),
    )
}

#[test_log::test(tokio::test)]
async fn lone_owner_gets_direct_message() {
    let (messenger, broadcaster) = doubles();
    let event = event("ev", "c", utc(2024, 1, 1, 9, 0));

    let report = router(&messenger, &broadcaster)
        .dispatch(&event, tick(2024, 1, 1, 9, 0))
        .await;

    assert_eq!(report.target, ChatTarget::Direct(UserId::from("c")));
    assert_eq!(
        messenger.direct_requests(),
        vec![(UserId::from("c"), UserId::from(BOT_ID))]
    );
    let posts = messenger.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].user_id, UserId::from(BOT_ID));
    assert_eq!(posts[0].attachment.text, ":dart: *Event ev* :dart:\n");
    assert_eq!(posts[0].attachment.color, DEFAULT_COLOR);
}

#[test_log::test(tokio::test)]
async fn bound_channel_is_used_directly() {
    let (messenger, broadcaster) = doubles();
    let mut event = with_attendees(event("ev", "c", utc(2024, 1, 1, 9, 0)), &["a"]);
    event.channel = Some(ChannelId::from("town-square"));

    let report = router(&messenger, &broadcaster)
        .dispatch(&event, tick(2024, 1, 1, 9, 0))
        .await;

    assert_eq!(
        report.delivery,
        DeliveryOutcome::Posted {
            channel: ChannelId::from("town-square")
        }
    );
    assert!(messenger.direct_requests().is_empty());
    assert!(messenger.group_requests().is_empty());
}

#[test_log::test(tokio::test)]
async fn attendees_get_group_with_owner_and_bot() {
    let (messenger, broadcaster) = doubles();
    let event = with_attendees(event("ev", "c", utc(2024, 1, 1, 9, 0)), &["a", "b"]);

    router(&messenger, &broadcaster)
        .dispatch(&event, tick(2024, 1, 1, 9, 0))
        .await;

    assert_eq!(
        messenger.group_requests(),
        vec![vec![
            UserId::from("a"),
            UserId::from("b"),
            UserId::from("c"),
            UserId::from(BOT_ID),
        ]]
    );
}

#[test_log::test(tokio::test)]
async fn every_participant_gets_one_broadcast() {
    let (messenger, broadcaster) = doubles();
    let event = with_attendees(event("ev", "c", utc(2024, 1, 1, 9, 0)), &["a", "b"]);

    let report = router(&messenger, &broadcaster)
        .dispatch(&event, tick(2024, 1, 1, 9, 0))
        .await;

    let mut recipients = broadcaster.recipients();
    recipients.sort();
    assert_eq!(
        recipients,
        vec![UserId::from("a"), UserId::from("b"), UserId::from("c")]
    );
    assert!(report.broadcasts.iter().all(|outcome| outcome.result.is_ok()));

    let published = broadcaster.published();
    assert!(published.iter().all(|p| p.event_name == EVENT_OCCUR_BROADCAST));
    assert!(published.iter().all(|p| p.payload.channel.is_none()));
    assert!(published.iter().all(|p| p.payload.title == "Event ev"));
}

#[test_log::test(tokio::test)]
async fn failed_broadcast_does_not_block_others() {
    let messenger = Arc::new(RecordingMessenger::new());
    let broadcaster = Arc::new(RecordingBroadcaster::new().rejecting("b"));
    let event = with_attendees(event("ev", "c", utc(2024, 1, 1, 9, 0)), &["a", "b"]);

    let report = router(&messenger, &broadcaster)
        .dispatch(&event, tick(2024, 1, 1, 9, 0))
        .await;

    assert_eq!(broadcaster.recipients(), vec![UserId::from("a"), UserId::from("c")]);
    let failed: Vec<&UserId> = report
        .broadcasts
        .iter()
        .filter(|outcome| outcome.result.is_err())
        .map(|outcome| &outcome.user)
        .collect();
    assert_eq!(failed, vec![&UserId::from("b")]);
    assert!(report.posted());
}

#[test_log::test(tokio::test)]
async fn unresolved_attendee_is_left_out_of_members() {
    let messenger = Arc::new(
        RecordingMessenger::new()
            .with_user("a", "alice")
            .with_user("c", "carol"),
    );
    let broadcaster = Arc::new(RecordingBroadcaster::new());
    let event = with_attendees(event("ev", "owner", utc(2024, 1, 1, 9, 0)), &["a", "b", "c"]);

    let report = router(&messenger, &broadcaster)
        .dispatch(&event, tick(2024, 1, 1, 9, 0))
        .await;

    assert_eq!(report.unresolved, vec![UserId::from("b")]);
    assert!(report.posted());
    let text = &messenger.posts()[0].attachment.text;
    assert!(text.contains("**members:** @alice, @carol\n"));
}

#[test_log::test(tokio::test)]
async fn alert_tick_renders_alarm_header() {
    let (messenger, broadcaster) = doubles();
    let mut event = with_alert(event("ev", "c", utc(2024, 1, 1, 9, 0)), AlertKind::OneHourBefore);
    event.description = "Agenda in the doc".to_owned();
    event.color = Some("#F2B3B3".to_owned());

    router(&messenger, &broadcaster)
        .dispatch(&event, tick(2024, 1, 1, 8, 0))
        .await;

    let attachment = &messenger.posts()[0].attachment;
    assert_eq!(
        attachment.text,
        ":alarm_clock: **1 hour before** *Event ev* :alarm_clock:\n**description:**\nAgenda in the doc"
    );
    assert_eq!(attachment.color, "#F2B3B3");
}

#[test_log::test(tokio::test)]
async fn post_failure_is_reported() {
    let (messenger, broadcaster) = doubles();
    messenger.fail_posts(true);
    let event = event("ev", "c", utc(2024, 1, 1, 9, 0));

    let report = router(&messenger, &broadcaster)
        .dispatch(&event, tick(2024, 1, 1, 9, 0))
        .await;

    assert!(matches!(report.delivery, DeliveryOutcome::Failed { .. }));
    assert_eq!(broadcaster.recipients(), vec![UserId::from("c")]);
}

#[test_log::test(tokio::test)]
async fn realtime_hub_delivers_one_message_per_participant() {
    let hub = RealtimeHub::new(16);
    let mut rx = hub.subscribe();
    let router = NotificationRouter::new(
        Arc::new(RecordingMessenger::new()),
        Arc::new(hub),
        UserId::from(BOT_ID),
    );
    let event = with_attendees(event("ev", "c", utc(2024, 1, 1, 9, 0)), &["a", "b"]);

    router.dispatch(&event, tick(2024, 1, 1, 9, 0)).await;

    let mut recipients = Vec::new();
    while let Ok(message) = rx.try_recv() {
        assert_eq!(message.event, EVENT_OCCUR_WIRE_NAME);
        assert_eq!(message.payload["id"], "ev");
        recipients.push(message.recipient);
    }
    assert_eq!(
        recipients,
        vec![UserId::from("a"), UserId::from("b"), UserId::from("c")]
    );
}
