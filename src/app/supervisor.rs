//! Connection supervisor — keeps the messaging channel live.
//!
//! `ensure_connected` never gives up: it retries the broker connection at a
//! fixed interval until it succeeds, then runs the bootstrap sequence
//! (subscribe to both command subjects, ask the server to re-push the
//! desired state).  A failed bootstrap also waits one interval and starts
//! over from the connection check.
//!
//! The bootstrap is tied to the channel's session generation, not to the
//! connected flag: a transport that reconnects on its own between two
//! checks still gets its subscriptions and state request renewed.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use super::ports::ChannelPort;
use crate::config::{ATTRIBUTES_REQUEST_TOPIC, ATTRIBUTES_RESPONSE_TOPIC, ATTRIBUTES_TOPIC};
use crate::error::ChannelError;

/// Payload of the bootstrap attribute request.
const BOOTSTRAP_REQUEST: &[u8] = b"{}";

#[derive(Debug, Clone)]
pub struct ConnectionSupervisor {
    reconnect_interval_ms: u32,
    sessions: u32,
    /// Session generation the last bootstrap ran on.
    bootstrapped: Option<u32>,
}

impl ConnectionSupervisor {
    pub fn new(reconnect_interval_ms: u32) -> Self {
        Self {
            reconnect_interval_ms,
            sessions: 0,
            bootstrapped: None,
        }
    }

    /// Number of sessions bootstrapped so far.
    pub fn sessions(&self) -> u32 {
        self.sessions
    }

    /// Whether the channel is live and its current session bootstrapped.
    pub fn is_current(&self, channel: &impl ChannelPort) -> bool {
        channel.is_connected() && self.bootstrapped == Some(channel.session())
    }

    /// Block until the channel is live and its session bootstrapped.
    /// Returns the number of failed attempts along the way.  No-op when
    /// the current session is already bootstrapped.
    pub fn ensure_connected(
        &mut self,
        channel: &mut impl ChannelPort,
        delay: &mut impl DelayNs,
    ) -> u32 {
        if self.is_current(channel) {
            return 0;
        }
        let mut failures = 0u32;
        loop {
            if !channel.is_connected() {
                if let Err(e) = channel.connect() {
                    failures = failures.saturating_add(1);
                    warn!(
                        "Broker connect failed ({}), retrying in {} ms",
                        e, self.reconnect_interval_ms
                    );
                    delay.delay_ms(self.reconnect_interval_ms);
                    continue;
                }
                info!("Broker connected");
            }
            let generation = channel.session();
            match Self::bootstrap(channel) {
                Ok(()) => {
                    self.bootstrapped = Some(generation);
                    self.sessions = self.sessions.wrapping_add(1);
                    debug!("Session {} bootstrapped", self.sessions);
                    return failures;
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    warn!(
                        "Bootstrap failed ({}), retrying in {} ms",
                        e, self.reconnect_interval_ms
                    );
                    delay.delay_ms(self.reconnect_interval_ms);
                }
            }
        }
    }

    fn bootstrap(channel: &mut impl ChannelPort) -> Result<(), ChannelError> {
        channel.subscribe(ATTRIBUTES_TOPIC)?;
        channel.subscribe(ATTRIBUTES_RESPONSE_TOPIC)?;
        channel.publish(ATTRIBUTES_REQUEST_TOPIC, BOOTSTRAP_REQUEST)
    }
}
