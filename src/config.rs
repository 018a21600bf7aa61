//! Node configuration parameters
//!
//! All tunable parameters for the nest node.  Values can be overridden via
//! NVS (see [`ConfigPort`](crate::app::ports::ConfigPort)); network
//! credentials are baked in at build time.

use core::ops::RangeInclusive;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::inbox::MAX_INBOUND_PAYLOAD;

// --- Wire subjects (ThingsBoard device API) ---

/// Periodic telemetry reports and the startup announcement.
pub const TELEMETRY_TOPIC: &str = "v1/devices/me/telemetry";
/// Instant presence/fault events.
pub const EVENT_TOPIC: &str = "v1/devices/me/telemetry";
/// Shared-attribute pushes carrying remote commands.
pub const ATTRIBUTES_TOPIC: &str = "v1/devices/me/attributes";
/// Answers to the bootstrap attribute request.
pub const ATTRIBUTES_RESPONSE_TOPIC: &str = "v1/devices/me/attributes/response/+";
/// Bootstrap request asking the server to re-push the desired state.
pub const ATTRIBUTES_REQUEST_TOPIC: &str = "v1/devices/me/attributes/request/1";

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    // --- Timing ---
    /// Initial telemetry period (milliseconds); remotely adjustable.
    pub telemetry_period_ms: u32,
    /// Lowest telemetry period a remote command may set (milliseconds).
    pub min_period_ms: u32,
    /// Sleep between presence scans in the ident task (milliseconds).
    pub ident_interval_ms: u32,
    /// Fixed delay between broker reconnect attempts (milliseconds).
    pub reconnect_interval_ms: u32,
    /// Bounded wait for the load cell to report ready (milliseconds).
    pub load_cell_timeout_ms: u32,
    /// Bound on bus/channel guard acquisition (milliseconds).
    pub guard_timeout_ms: u32,

    // --- Commands ---
    /// Inbound payloads longer than this are dropped unparsed (bytes).
    pub max_command_len: usize,

    // --- Reporting ---
    /// Publish `{"init":"started"}` once at boot.
    pub announce_start: bool,

    // --- Sensor plausibility ---
    /// Lowest plausible temperature (Celsius).
    pub temperature_min_c: f32,
    /// Highest plausible temperature (Celsius).
    pub temperature_max_c: f32,
    /// Lowest plausible relative humidity (%RH).
    pub humidity_min_pct: f32,
    /// Highest plausible relative humidity (%RH).
    pub humidity_max_pct: f32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Timing
            telemetry_period_ms: 10_000,
            min_period_ms: 1_000,
            ident_interval_ms: 200,
            reconnect_interval_ms: 5_000,
            load_cell_timeout_ms: 1_000,
            guard_timeout_ms: 30_000,

            // Commands
            max_command_len: 512,

            // Reporting
            announce_start: true,

            // DHT22 datasheet ranges
            temperature_min_c: -40.0,
            temperature_max_c: 80.0,
            humidity_min_pct: 0.0,
            humidity_max_pct: 100.0,
        }
    }
}

impl NodeConfig {
    /// Reject out-of-range values.  Nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_period_ms == 0 {
            return Err(ConfigError::ValidationFailed("min_period_ms must be > 0"));
        }
        if self.telemetry_period_ms < self.min_period_ms {
            return Err(ConfigError::ValidationFailed(
                "telemetry_period_ms below min_period_ms",
            ));
        }
        if self.ident_interval_ms == 0 || self.ident_interval_ms >= self.min_period_ms {
            return Err(ConfigError::ValidationFailed(
                "ident_interval_ms must be > 0 and shorter than min_period_ms",
            ));
        }
        if self.reconnect_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("reconnect_interval_ms must be > 0"));
        }
        if self.guard_timeout_ms <= self.load_cell_timeout_ms {
            return Err(ConfigError::ValidationFailed(
                "guard_timeout_ms must exceed load_cell_timeout_ms",
            ));
        }
        if self.max_command_len == 0 || self.max_command_len > MAX_INBOUND_PAYLOAD {
            return Err(ConfigError::ValidationFailed(
                "max_command_len must be > 0 and fit the inbound queue",
            ));
        }
        if !(self.temperature_min_c < self.temperature_max_c) {
            return Err(ConfigError::ValidationFailed("temperature range is empty"));
        }
        if !(self.humidity_min_pct < self.humidity_max_pct) {
            return Err(ConfigError::ValidationFailed("humidity range is empty"));
        }
        Ok(())
    }

    pub fn temperature_range(&self) -> RangeInclusive<f32> {
        self.temperature_min_c..=self.temperature_max_c
    }

    pub fn humidity_range(&self) -> RangeInclusive<f32> {
        self.humidity_min_pct..=self.humidity_max_pct
    }
}

/// Load the stored config, falling back to defaults on any error.  On first
/// boot the defaults are persisted.
pub fn load_or_init(store: &mut impl ConfigPort) -> NodeConfig {
    match store.load().and_then(|cfg| cfg.validate().map(|()| cfg)) {
        Ok(cfg) => {
            info!("Config loaded from storage");
            cfg
        }
        Err(ConfigError::NotFound) => {
            info!("No stored config, persisting defaults");
            let cfg = NodeConfig::default();
            if let Err(e) = store.save(&cfg) {
                warn!("Saving default config failed: {}", e);
            }
            cfg
        }
        Err(e) => {
            warn!("Stored config unusable ({}), using defaults", e);
            NodeConfig::default()
        }
    }
}

/// Network credentials, fixed at build time.
#[derive(Debug, Clone, Copy)]
pub struct NetworkConfig {
    pub wifi_ssid: &'static str,
    pub wifi_password: &'static str,
    /// e.g. `mqtts://srv-iot.diatel.upm.es:8883`
    pub broker_url: &'static str,
    /// Device access token, sent as the MQTT username.
    pub access_token: &'static str,
}

impl NetworkConfig {
    pub const fn from_build_env() -> Self {
        Self {
            wifi_ssid: match option_env!("NEST_WIFI_SSID") {
                Some(s) => s,
                None => "",
            },
            wifi_password: match option_env!("NEST_WIFI_PASSWORD") {
                Some(s) => s,
                None => "",
            },
            broker_url: match option_env!("NEST_BROKER_URL") {
                Some(s) => s,
                None => "mqtts://srv-iot.diatel.upm.es:8883",
            },
            access_token: match option_env!("NEST_ACCESS_TOKEN") {
                Some(s) => s,
                None => "",
            },
        }
    }
}
