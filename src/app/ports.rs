//! Port traits — the hexagonal boundary between the control loop and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Tasks (domain)
//! ```
//!
//! Every external collaborator (tag reader, climate probe, load cell,
//! wireless link, messaging channel, actuators, persistent config) is
//! consumed through one of these traits.  The tasks take them via
//! generics, so the domain core never touches hardware directly and
//! the whole loop runs on the host against mocks.
//!
//! All calls are synchronous with bounded latency; the only explicit
//! wait in the contract is [`LoadCellPort::wait_ready`].

use core::time::Duration;

use crate::app::state::{DoorPosition, Rgb};
use crate::config::NodeConfig;
use crate::error::ChannelError;

/// Raw identifier bytes as reported by the reader (4, 7 or 10 bytes).
pub type Uid = heapless::Vec<u8, 10>;

// ───────────────────────────────────────────────────────────────
// Tag reader port (peripheral bus)
// ───────────────────────────────────────────────────────────────

/// Proximity-tag reader primitives.  Always called under the bus guard.
pub trait TagReaderPort {
    /// Probe for tags in the idle state.  `true` if one answered.
    fn request(&mut self) -> bool;

    /// Probe for tags in the idle *or* halted state.
    fn wakeup(&mut self) -> bool;

    /// Run anticollision/select and return the full identifier.
    fn read_uid(&mut self) -> Option<Uid>;

    /// Put the selected tag into the halted state.
    fn halt(&mut self);

    /// Drop any authenticated session on the reader.
    fn stop_crypto(&mut self);

    /// Reader self-test.  `false` means the reader is not responding sanely.
    fn self_test(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Sensor ports
// ───────────────────────────────────────────────────────────────

/// One raw read from the temperature/humidity probe.  `None` means the
/// probe did not produce a value (checksum error, no response, NaN).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClimateSample {
    pub temperature_c: Option<f32>,
    pub humidity_pct: Option<f32>,
}

/// Temperature/humidity probe.
pub trait ClimatePort {
    fn read(&mut self) -> ClimateSample;
}

/// Load-cell amplifier.
pub trait LoadCellPort {
    /// Block until the amplifier has a conversion ready or `timeout` elapses.
    fn wait_ready(&mut self, timeout: Duration) -> bool;

    /// Read the tared, scaled weight in grams.  Only valid after `wait_ready`.
    fn read_grams(&mut self) -> f32;
}

// ───────────────────────────────────────────────────────────────
// Connectivity ports
// ───────────────────────────────────────────────────────────────

/// Wireless link liveness.
pub trait LinkPort {
    fn is_up(&mut self) -> bool;
}

/// Publish/subscribe messaging channel.  Always used under the channel guard.
pub trait ChannelPort {
    /// Whether the broker session is currently live.
    fn is_connected(&self) -> bool;

    /// Generation of the broker session.  Changes on every (re)connect,
    /// including ones the transport performs on its own.
    fn session(&self) -> u32;

    /// Attempt one connection to the broker.
    fn connect(&mut self) -> Result<(), ChannelError>;

    fn subscribe(&mut self, topic: &str) -> Result<(), ChannelError>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), ChannelError>;

    /// Service channel I/O and hand every inbound message received since
    /// the last pump to `on_message(topic, payload)`.
    fn pump(&mut self, on_message: &mut dyn FnMut(&str, &[u8]));
}

// ───────────────────────────────────────────────────────────────
// Actuator port
// ───────────────────────────────────────────────────────────────

/// Door servo and status indicator.
pub trait ActuatorPort {
    fn set_door(&mut self, position: DoorPosition);

    fn set_indicator(&mut self, rgb: Rgb);
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads and persists node configuration.
///
/// Implementations MUST validate before persisting.  Invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort {
    /// Returns [`ConfigError::NotFound`] if nothing is stored yet.
    fn load(&self) -> Result<NodeConfig, ConfigError>;

    fn save(&mut self, config: &NodeConfig) -> Result<(), ConfigError>;
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
