//! Fuzz target: `Inbox` push/drain
//!
//! Splits the input into topic/payload pairs and checks that the bounded
//! queue never holds more than its depth, never truncates a message, and
//! hands messages back in arrival order.
//!
//! cargo fuzz run fuzz_inbox

#![no_main]

use libfuzzer_sys::fuzz_target;
use nestnode::inbox::{INBOX_DEPTH, Inbox, MAX_INBOUND_PAYLOAD};

fuzz_target!(|data: &[u8]| {
    let inbox = Inbox::new();
    let mut accepted: Vec<(String, Vec<u8>)> = Vec::new();

    // Each chunk: first byte picks the topic length, the rest is payload.
    for chunk in data.chunks(97) {
        let Some((&n, rest)) = chunk.split_first() else {
            continue;
        };
        let split = (n as usize).min(rest.len());
        let topic = String::from_utf8_lossy(&rest[..split]).into_owned();
        let payload = &rest[split..];
        if inbox.push(&topic, payload) {
            assert!(payload.len() <= MAX_INBOUND_PAYLOAD);
            accepted.push((topic, payload.to_vec()));
        }
    }
    assert!(accepted.len() <= INBOX_DEPTH);

    let mut drained = Vec::new();
    let n = inbox.drain(&mut |t, p| drained.push((t.to_string(), p.to_vec())));
    assert_eq!(n, accepted.len());
    assert_eq!(drained, accepted);
    assert!(inbox.is_empty());
});
