//! Command dispatcher — routes decoded remote commands to the actuators.
//!
//! Runs inside the channel guard, invoked from the channel pump for every
//! inbound message.  Malformed input is dropped silently: no error is
//! surfaced, nothing is flagged, and the actuator state is left as it was.

use log::{debug, info};

use super::commands::{self, Command};
use super::ports::ActuatorPort;
use super::state::ActuatorState;

/// Stateless router from raw payloads to actuator setters.
#[derive(Debug, Clone, Copy)]
pub struct CommandDispatcher {
    max_payload: usize,
}

impl CommandDispatcher {
    pub fn new(max_payload: usize) -> Self {
        Self { max_payload }
    }

    /// Handle one inbound payload.  Never fails.
    pub fn on_message(
        &self,
        payload: &[u8],
        state: &mut ActuatorState,
        actuators: &mut impl ActuatorPort,
    ) {
        let batch = match commands::decode(payload, self.max_payload) {
            Ok(batch) => batch,
            Err(e) => {
                debug!("Dropping inbound payload: {}", e);
                return;
            }
        };
        for cmd in batch {
            self.apply(cmd, state, actuators);
        }
    }

    /// Apply a single decoded command.
    pub fn apply(
        &self,
        cmd: Command,
        state: &mut ActuatorState,
        actuators: &mut impl ActuatorPort,
    ) {
        match cmd {
            Command::SetDoor(position) => {
                if state.set_door(position) {
                    actuators.set_door(position);
                }
            }
            Command::SetIndicator(color) => {
                if state.set_indicator(color) {
                    actuators.set_indicator(color.rgb());
                }
            }
            Command::SetPeriod(ms) => {
                // Rejection is logged by the setter.
                if state.set_period(ms).is_ok() {
                    info!("Next telemetry sleep: {} ms", ms);
                }
            }
        }
    }
}
