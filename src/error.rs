//! Error and fault types for the nest node.
//!
//! Two families live here:
//!
//! - **Faults** are per-cycle observations (link down, sensor invalid, ...)
//!   that are accumulated and reported, never propagated.  They carry the
//!   wire tag that ends up in the telemetry `error` field.
//! - **Errors** are returned from fallible operations (channel I/O, guard
//!   acquisition, payload decoding) and handled by the calling task.
//!
//! All variants are `Copy` so they can be passed around the control loop
//! without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Cycle faults
// ---------------------------------------------------------------------------

/// An independent failure observed during one telemetry cycle or ident scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Wireless association lost.
    LinkDown,
    /// Messaging broker unavailable; triggers a reconnect.
    ChannelUnreachable,
    /// Temperature/humidity probe returned an unreadable or implausible value.
    SensorInvalid,
    /// Load cell did not become ready within the bounded wait.
    ProbeNotReady,
    /// Tag reader self-test failed.
    ReaderFault,
    /// The peripheral bus guard could not be acquired in time.
    BusTimeout,
}

impl Fault {
    /// Tag used in the published `error` field.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::LinkDown => "WIFI_DOWN",
            Self::ChannelUnreachable => "MQTT_DOWN",
            Self::SensorInvalid => "DHT_INVALID",
            Self::ProbeNotReady => "HX711_TIMEOUT",
            Self::ReaderFault => "RFID_FAULT",
            Self::BusTimeout => "BUS_TIMEOUT",
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ---------------------------------------------------------------------------
// Channel errors
// ---------------------------------------------------------------------------

/// Errors from the messaging channel port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// Operation requires a live connection.
    NotConnected,
    /// Broker refused or did not answer the connection attempt.
    ConnectFailed,
    /// Subscription request was rejected.
    SubscribeFailed,
    /// Publish could not be queued.
    PublishFailed,
    /// Serialised payload exceeds the outbound buffer.
    PayloadTooLarge,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "channel not connected"),
            Self::ConnectFailed => write!(f, "broker connection failed"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::PayloadTooLarge => write!(f, "payload too large"),
        }
    }
}

// ---------------------------------------------------------------------------
// Guard errors
// ---------------------------------------------------------------------------

/// Errors from acquiring a [`Guard`](crate::guard::Guard).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardError {
    /// The guard was not released within the configured bound.
    Timeout(&'static str),
    /// The calling thread already holds another guard.
    Nested {
        held: &'static str,
        requested: &'static str,
    },
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(name) => write!(f, "{name} guard acquisition timed out"),
            Self::Nested { held, requested } => {
                write!(f, "{requested} guard requested while holding {held}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Command decoding errors
// ---------------------------------------------------------------------------

/// Why an inbound command payload was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload exceeds the configured maximum length.
    TooLarge(usize),
    /// Payload is not valid JSON.
    Malformed,
    /// Payload is valid JSON but not an object.
    NotAnObject,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge(len) => write!(f, "payload too large ({len} bytes)"),
            Self::Malformed => write!(f, "malformed JSON"),
            Self::NotAnObject => write!(f, "payload is not an object"),
        }
    }
}

// ---------------------------------------------------------------------------
// Task errors
// ---------------------------------------------------------------------------

/// Reasons a task iteration was abandoned before completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskError {
    Guard(GuardError),
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guard(e) => write!(f, "guard: {e}"),
        }
    }
}

impl From<GuardError> for TaskError {
    fn from(e: GuardError) -> Self {
        Self::Guard(e)
    }
}
