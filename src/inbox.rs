//! Bounded queue of inbound channel messages.
//!
//! The transport's event thread pushes every received message here; the
//! channel pump drains it from inside the channel guard.  When the queue is
//! full the newest message is dropped: the server re-pushes desired state on
//! every reconnect, so a lost command is recovered at the next bootstrap.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

/// Queue depth.
pub const INBOX_DEPTH: usize = 8;
/// Longest payload the inbox stores.
pub const MAX_INBOUND_PAYLOAD: usize = 512;

pub type Topic = heapless::String<64>;
pub type Payload = heapless::Vec<u8, MAX_INBOUND_PAYLOAD>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: Topic,
    pub payload: Payload,
}

impl InboundMessage {
    /// `None` if the topic or payload does not fit.
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        let mut t = Topic::new();
        t.push_str(topic).ok()?;
        let payload = Payload::from_slice(payload).ok()?;
        Some(Self { topic: t, payload })
    }
}

pub struct Inbox {
    queue: Channel<CriticalSectionRawMutex, InboundMessage, INBOX_DEPTH>,
}

impl Inbox {
    pub const fn new() -> Self {
        Self {
            queue: Channel::new(),
        }
    }

    /// Enqueue one message.  Returns `false` if it was dropped.
    pub fn push(&self, topic: &str, payload: &[u8]) -> bool {
        let Some(msg) = InboundMessage::new(topic, payload) else {
            warn!(
                "Dropping inbound message on {} ({} bytes): too large",
                topic,
                payload.len()
            );
            return false;
        };
        if self.queue.try_send(msg).is_err() {
            warn!("Inbox full, dropping message on {}", topic);
            return false;
        }
        true
    }

    /// Hand every queued message to `on_message`, oldest first.
    pub fn drain(&self, on_message: &mut dyn FnMut(&str, &[u8])) -> usize {
        let mut n = 0;
        while let Ok(msg) = self.queue.try_receive() {
            on_message(&msg.topic, &msg.payload);
            n += 1;
        }
        n
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}
