//! Inbound command → dispatcher → actuator state, end to end.
//!
//! Commands are delivered on the mock channel and picked up by the channel
//! pump inside a real telemetry cycle.

use nestnode::app::state::{DoorPosition, IndicatorColor};
use nestnode::config::{
    ATTRIBUTES_REQUEST_TOPIC, ATTRIBUTES_RESPONSE_TOPIC, ATTRIBUTES_TOPIC, TELEMETRY_TOPIC,
};
use std::time::Duration;

use crate::mock_hw::{MockReader, node, telemetry, with_channel};

#[test]
fn shared_door_open_changes_only_the_door() {
    let ctx = node(MockReader::default());
    let mut task = telemetry(&ctx);
    with_channel(&ctx, |ch| ch.deliver(ATTRIBUTES_TOPIC, br#"{"shared":{"door":"open"}}"#));

    let cycle = task.cycle().unwrap();

    ctx.uplink
        .with(|u| {
            assert_eq!(u.state().door(), DoorPosition::Open);
            assert_eq!(u.state().indicator(), IndicatorColor::Off);
            assert_eq!(u.period_ms(), 10_000);
            // Boot drive, then the open command.
            assert_eq!(u.actuators().doors, vec![DoorPosition::Closed, DoorPosition::Open]);
            assert_eq!(u.actuators().leds.len(), 1);
        })
        .unwrap();
    assert_eq!(cycle.sleep, Duration::from_millis(10_000));
}

#[test]
fn period_below_floor_is_rejected() {
    let ctx = node(MockReader::default());
    let mut task = telemetry(&ctx);
    with_channel(&ctx, |ch| ch.deliver(ATTRIBUTES_TOPIC, br#"{"period":500}"#));

    let first = task.cycle().unwrap();
    let second = task.cycle().unwrap();

    assert_eq!(first.sleep, Duration::from_millis(10_000));
    assert_eq!(second.sleep, Duration::from_millis(10_000));
}

#[test]
fn accepted_period_governs_the_very_next_sleep() {
    let ctx = node(MockReader::default());
    let mut task = telemetry(&ctx);
    with_channel(&ctx, |ch| ch.deliver(ATTRIBUTES_TOPIC, br#"{"params":{"period":"2500"}}"#));

    assert_eq!(task.cycle().unwrap().sleep, Duration::from_millis(2_500));
}

#[test]
fn indicator_colour_ignores_case() {
    let ctx = node(MockReader::default());
    let mut task = telemetry(&ctx);
    with_channel(&ctx, |ch| ch.deliver(ATTRIBUTES_TOPIC, br#"{"rgb":"Green"}"#));
    task.cycle().unwrap();

    with_channel(&ctx, |ch| ch.deliver(ATTRIBUTES_TOPIC, br#"{"rgb":"GREEN"}"#));
    task.cycle().unwrap();

    ctx.uplink
        .with(|u| {
            assert_eq!(u.state().indicator(), IndicatorColor::Green);
            // Boot off, then green once: the repeat is not a transition.
            assert_eq!(u.actuators().leds, vec![(0, 0, 0), (0, 255, 0)]);
        })
        .unwrap();
}

#[test]
fn unknown_colour_leaves_indicator_unchanged() {
    let ctx = node(MockReader::default());
    let mut task = telemetry(&ctx);
    with_channel(&ctx, |ch| {
        ch.deliver(ATTRIBUTES_TOPIC, br#"{"rgb":"blue"}"#);
        ch.deliver(ATTRIBUTES_TOPIC, br#"{"rgb":"magenta"}"#);
    });
    task.cycle().unwrap();

    let color = ctx.uplink.with(|u| u.state().indicator()).unwrap();
    assert_eq!(color, IndicatorColor::Blue);
}

#[test]
fn truncated_payload_changes_nothing() {
    let ctx = node(MockReader::default());
    let mut task = telemetry(&ctx);
    let before = ctx.uplink.with(|u| u.state().clone()).unwrap();

    with_channel(&ctx, |ch| ch.deliver(ATTRIBUTES_TOPIC, br#"{"shared":{"door":"op"#));
    let cycle = task.cycle().unwrap();

    let after = ctx.uplink.with(|u| u.state().clone()).unwrap();
    assert_eq!(before, after);
    // The malformed command is not a reportable fault.
    assert!(cycle.snapshot.errors().is_empty());
    assert!(cycle.published);
}

#[test]
fn attribute_response_is_dispatched_like_a_push() {
    let ctx = node(MockReader::default());
    let mut task = telemetry(&ctx);
    with_channel(&ctx, |ch| {
        ch.deliver(
            "v1/devices/me/attributes/response/1",
            br#"{"shared":{"door":"open","rgb":"red","period":5000}}"#,
        );
    });
    let cycle = task.cycle().unwrap();

    ctx.uplink
        .with(|u| {
            assert_eq!(u.state().door(), DoorPosition::Open);
            assert_eq!(u.state().indicator(), IndicatorColor::Red);
        })
        .unwrap();
    assert_eq!(cycle.sleep, Duration::from_millis(5_000));
}

#[test]
fn messages_on_other_topics_are_ignored() {
    let ctx = node(MockReader::default());
    let mut task = telemetry(&ctx);
    with_channel(&ctx, |ch| ch.deliver(TELEMETRY_TOPIC, br#"{"door":"open"}"#));
    task.cycle().unwrap();

    let door = ctx.uplink.with(|u| u.state().door()).unwrap();
    assert_eq!(door, DoorPosition::Closed);
}

#[test]
fn reconnect_bootstraps_session_and_flags_the_cycle() {
    let ctx = node(MockReader::default());
    let mut task = telemetry(&ctx);
    with_channel(&ctx, |ch| {
        ch.connected = false;
        ch.refuse_connects = 2;
        ch.subscriptions.clear();
        ch.published.clear();
    });

    let cycle = task.cycle().unwrap();

    assert_eq!(
        cycle.snapshot.errors().render().unwrap().as_str(),
        "MQTT_DOWN"
    );
    assert!(cycle.published);
    with_channel(&ctx, |ch| {
        assert_eq!(ch.connect_calls, 3);
        assert_eq!(ch.subscriptions, vec![ATTRIBUTES_TOPIC, ATTRIBUTES_RESPONSE_TOPIC]);
        assert_eq!(ch.published[0].0, ATTRIBUTES_REQUEST_TOPIC);
        assert_eq!(ch.published[0].1, b"{}");
        assert_eq!(ch.reports().len(), 1);
    });
    // Boot session, then this one.
    assert_eq!(ctx.uplink.with(|u| u.sessions()).unwrap(), 2);
}

#[test]
fn session_resumed_by_the_transport_is_bootstrapped_again() {
    let ctx = node(MockReader::default());
    let mut task = telemetry(&ctx);
    with_channel(&ctx, |ch| {
        ch.published.clear();
        ch.resume_silently();
    });

    let cycle = task.cycle().unwrap();

    // Never observed down, so not a reportable fault.
    assert!(cycle.snapshot.errors().is_empty());
    with_channel(&ctx, |ch| {
        assert_eq!(ch.connect_calls, 0);
        assert_eq!(ch.subscriptions, vec![ATTRIBUTES_TOPIC, ATTRIBUTES_RESPONSE_TOPIC]);
        assert_eq!(ch.published[0], (ATTRIBUTES_REQUEST_TOPIC.to_string(), b"{}".to_vec()));
    });
    assert_eq!(ctx.uplink.with(|u| u.sessions()).unwrap(), 2);

    // Commands pushed on the renewed subscription are applied.
    with_channel(&ctx, |ch| ch.deliver(ATTRIBUTES_TOPIC, br#"{"door":"open"}"#));
    task.cycle().unwrap();
    assert_eq!(ctx.uplink.with(|u| u.state().door()).unwrap(), DoorPosition::Open);
    assert_eq!(with_channel(&ctx, |ch| ch.subscriptions.len()), 2);
}

#[test]
fn startup_announcement_is_a_plain_init_marker() {
    let ctx = node(MockReader::default());
    ctx.uplink.with(|u| u.announce_start()).unwrap().unwrap();

    let published = with_channel(&ctx, |ch| ch.published_json(TELEMETRY_TOPIC));
    assert_eq!(published, vec![serde_json::json!({"init": "started"})]);
}
