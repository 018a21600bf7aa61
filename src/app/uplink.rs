//! Everything behind the channel guard.
//!
//! The messaging channel, its connection supervisor, the actuators and the
//! actuator state share one critical section: inbound commands are
//! dispatched while the channel is pumped, so they mutate actuator state
//! under the same guard that serializes publishes.

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use super::dispatcher::CommandDispatcher;
use super::ports::{ActuatorPort, ChannelPort};
use super::report::STARTUP_ANNOUNCEMENT;
use super::state::ActuatorState;
use super::supervisor::ConnectionSupervisor;
use crate::config::{ATTRIBUTES_TOPIC, NodeConfig, TELEMETRY_TOPIC};
use crate::error::ChannelError;

/// Whether `topic` carries remote desired state.
pub fn is_command_topic(topic: &str) -> bool {
    topic == ATTRIBUTES_TOPIC
        || topic
            .strip_prefix(ATTRIBUTES_TOPIC)
            .is_some_and(|rest| rest.starts_with("/response/"))
}

pub struct Uplink<C, A> {
    channel: C,
    actuators: A,
    state: ActuatorState,
    dispatcher: CommandDispatcher,
    supervisor: ConnectionSupervisor,
}

impl<C: ChannelPort, A: ActuatorPort> Uplink<C, A> {
    /// Actuators are driven to the default state immediately.
    pub fn new(channel: C, mut actuators: A, config: &NodeConfig) -> Self {
        let state = ActuatorState::new(config.telemetry_period_ms, config.min_period_ms);
        actuators.set_door(state.door());
        actuators.set_indicator(state.indicator().rgb());
        Self {
            channel,
            actuators,
            state,
            dispatcher: CommandDispatcher::new(config.max_command_len),
            supervisor: ConnectionSupervisor::new(config.reconnect_interval_ms),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    /// Block until the channel is live and the current session
    /// bootstrapped.  See [`ConnectionSupervisor`].
    pub fn reconnect(&mut self, delay: &mut impl DelayNs) -> u32 {
        self.supervisor.ensure_connected(&mut self.channel, delay)
    }

    /// Service channel I/O and dispatch every pending command.
    pub fn pump(&mut self) -> usize {
        let Self {
            channel,
            actuators,
            state,
            dispatcher,
            ..
        } = self;
        let mut handled = 0;
        channel.pump(&mut |topic, payload| {
            if is_command_topic(topic) {
                dispatcher.on_message(payload, state, actuators);
                handled += 1;
            } else {
                debug!("Ignoring message on {}", topic);
            }
        });
        handled
    }

    /// Publish and log a failure.  Failed publishes are not retried.
    pub fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), ChannelError> {
        self.channel.publish(topic, payload).inspect_err(|e| {
            warn!("Publish to {} failed: {}", topic, e);
        })
    }

    pub fn announce_start(&mut self) -> Result<(), ChannelError> {
        self.publish(TELEMETRY_TOPIC, STARTUP_ANNOUNCEMENT)
    }

    pub fn state(&self) -> &ActuatorState {
        &self.state
    }

    pub fn period_ms(&self) -> u32 {
        self.state.period_ms()
    }

    pub fn sessions(&self) -> u32 {
        self.supervisor.sessions()
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn actuators(&self) -> &A {
        &self.actuators
    }
}
