//! Ident task: edge-triggered instant events and hand-off to the telemetry
//! report through the presence buffer.

use std::sync::Barrier;
use std::thread;

use serde_json::json;

use nestnode::app::ident::IdentTask;
use nestnode::error::{GuardError, TaskError};

use crate::mock_hw::{
    MockActuators, MockChannel, MockDelay, MockReader, TestContext, node, telemetry, with_channel,
};

type TestIdent<'a> = IdentTask<'a, MockReader, MockChannel, MockActuators, MockDelay>;

fn ident(ctx: &TestContext) -> TestIdent<'_> {
    IdentTask::new(ctx, MockDelay::default())
}

#[test]
fn repeated_tag_is_debounced_until_it_leaves() {
    let ctx = node(MockReader::with_scans(&["04A3FF21", "04A3FF21", "", "04A3FF21"]));
    let mut task = ident(&ctx);

    let published: Vec<bool> = (0..4)
        .map(|_| task.iteration().unwrap().event.is_some())
        .collect();

    assert_eq!(published, vec![true, false, false, true]);
    let events = with_channel(&ctx, |ch| ch.events());
    assert_eq!(events, vec![json!({"uid": "04A3FF21"}), json!({"uid": "04A3FF21"})]);
}

#[test]
fn previous_id_is_updated_even_when_nothing_is_published() {
    let ctx = node(MockReader::with_scans(&["AA", ""]));
    let mut task = ident(&ctx);
    task.iteration().unwrap();
    assert_eq!(task.previous().as_str(), "AA");
    task.iteration().unwrap();
    assert!(task.previous().is_empty());
}

#[test]
fn different_tag_publishes_immediately() {
    let ctx = node(MockReader::with_scans(&["AA", "BB", "AA"]));
    let mut task = ident(&ctx);
    for _ in 0..3 {
        task.iteration().unwrap();
    }
    let uids: Vec<_> = with_channel(&ctx, |ch| ch.events())
        .into_iter()
        .map(|e| e["uid"].clone())
        .collect();
    assert_eq!(uids, vec![json!("AA"), json!("BB"), json!("AA")]);
}

#[test]
fn reader_fault_publishes_once_on_onset_and_skips_scanning() {
    let mut reader = MockReader::with_scans(&["04A3FF21"]);
    reader.push_self_tests(&[false, false, true]);
    let ctx = node(reader);
    let mut task = ident(&ctx);

    let first = task.iteration().unwrap();
    let second = task.iteration().unwrap();

    assert!(first.faulted && second.faulted);
    assert!(first.tag.is_empty());
    assert_eq!(first.event.as_ref().and_then(|e| e.fault()).map(|f| f.tag()), Some("RFID_FAULT"));
    assert!(second.event.is_none());
    assert!(ctx.reader_faulted());
    // The scripted scan was not consumed while faulted.
    assert_eq!(ctx.bus.with(|r| r.halts).unwrap(), 0);

    let third = task.iteration().unwrap();
    assert!(!third.faulted);
    assert!(!ctx.reader_faulted());
    assert_eq!(third.tag.as_str(), "04A3FF21");

    let events = with_channel(&ctx, |ch| ch.events());
    assert_eq!(
        events,
        vec![json!({"error": "RFID_FAULT"}), json!({"uid": "04A3FF21"})]
    );
}

#[test]
fn dwelling_tag_delivered_instantly_is_not_reported_again() {
    // Held for two ident intervals, gone before the telemetry scan.
    let ctx = node(MockReader::with_scans(&["04A3FF21", "04A3FF21", ""]));
    let mut ident_task = ident(&ctx);
    let mut tele = telemetry(&ctx);

    assert!(ident_task.iteration().unwrap().delivered);
    assert!(ident_task.iteration().unwrap().event.is_none());
    tele.cycle().unwrap();

    let (events, reports) = with_channel(&ctx, |ch| (ch.events(), ch.reports()));
    assert_eq!(events, vec![json!({"uid": "04A3FF21"})]);
    assert_eq!(reports[0]["uid"], "None");
}

#[test]
fn undelivered_run_stays_buffered_across_repeats() {
    let ctx = node(MockReader::with_scans(&["04A3FF21", "04A3FF21"]));
    let mut task = ident(&ctx);

    with_channel(&ctx, |ch| ch.fail_publishes = true);
    assert!(!task.iteration().unwrap().delivered);
    assert_eq!(ctx.presence.take().unwrap().as_str(), "04A3FF21");

    // The repeat publishes nothing but is still owed to the periodic report.
    with_channel(&ctx, |ch| ch.fail_publishes = false);
    assert!(task.iteration().unwrap().event.is_none());
    assert_eq!(ctx.presence.take().unwrap().as_str(), "04A3FF21");
}

#[test]
fn failed_instant_publish_falls_back_to_the_periodic_report() {
    let ctx = node(MockReader::with_scans(&["C0FFEE01"]));
    with_channel(&ctx, |ch| ch.fail_publishes = true);
    let mut ident_task = ident(&ctx);

    let it = ident_task.iteration().unwrap();
    assert!(it.event.is_some() && !it.delivered);

    with_channel(&ctx, |ch| ch.fail_publishes = false);
    let mut tele = telemetry(&ctx);
    let cycle = tele.cycle().unwrap();

    assert_eq!(cycle.snapshot.tag().as_str(), "C0FFEE01");
    assert!(with_channel(&ctx, |ch| ch.events()).is_empty());
}

#[test]
fn tag_seen_between_cycles_is_reported_by_exactly_one_mechanism() {
    // Ident sees the tag once; it is gone before the telemetry scan.
    let ctx = node(MockReader::with_scans(&["5A5A5A5A", ""]));
    let mut ident_task = ident(&ctx);
    let mut tele = telemetry(&ctx);

    ident_task.iteration().unwrap();
    tele.cycle().unwrap();

    let (events, reports) = with_channel(&ctx, |ch| (ch.events(), ch.reports()));
    assert_eq!(events.len(), 1);
    assert_eq!(reports[0]["uid"], "None");
}

#[test]
fn channel_contention_keeps_the_sighting_for_telemetry() {
    let ctx = node(MockReader::with_scans(&["0102030405060708090A"]));
    let mut task = ident(&ctx);
    let held = Barrier::new(2);
    let release = Barrier::new(2);

    let it = thread::scope(|s| {
        s.spawn(|| {
            ctx.uplink
                .with(|_| {
                    held.wait();
                    release.wait();
                })
                .unwrap();
        });
        held.wait();
        let it = task.iteration();
        release.wait();
        it
    })
    .unwrap();

    assert!(!it.delivered);
    assert_eq!(it.tag.as_str().len(), 20);
    assert_eq!(ctx.presence.take().unwrap(), it.tag);
}

#[test]
fn bus_contention_abandons_the_iteration() {
    let ctx = node(MockReader::with_scans(&["AA"]));
    let mut task = ident(&ctx);
    let held = Barrier::new(2);
    let release = Barrier::new(2);

    let result = thread::scope(|s| {
        s.spawn(|| {
            ctx.bus
                .with(|_| {
                    held.wait();
                    release.wait();
                })
                .unwrap();
        });
        held.wait();
        let r = task.iteration();
        release.wait();
        r
    });

    assert_eq!(result, Err(TaskError::Guard(GuardError::Timeout("bus"))));
    assert!(task.previous().is_empty());
    assert!(with_channel(&ctx, |ch| ch.data_published().is_empty()));
}
