//! Outbound report model — sensor readings, fault aggregation and the
//! two published message shapes.
//!
//! The data model keeps invalid readings explicit.  Substituting zero for
//! an invalid reading happens only in the wire structs below, at the
//! serialization boundary.

use core::fmt::Write;
use core::ops::RangeInclusive;

use serde::Serialize;

use super::presence::TagId;
use crate::error::Fault;

/// Literal sent in the `uid` field when no tag was resolved.
pub const NO_TAG: &str = "None";

/// One-shot boot marker.
pub const STARTUP_ANNOUNCEMENT: &[u8] = br#"{"init":"started"}"#;

const ERROR_SEPARATOR: &str = "; ";

// ───────────────────────────────────────────────────────────────
// SensorReading
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorReading {
    Valid(f32),
    Invalid,
}

impl SensorReading {
    /// Accept `raw` only if it is present, finite and inside `range`.
    pub fn checked(raw: Option<f32>, range: RangeInclusive<f32>) -> Self {
        match raw {
            Some(v) if v.is_finite() && range.contains(&v) => Self::Valid(v),
            _ => Self::Invalid,
        }
    }

    /// Accept any finite value.
    pub fn finite(raw: f32) -> Self {
        if raw.is_finite() {
            Self::Valid(raw)
        } else {
            Self::Invalid
        }
    }

    pub fn is_valid(self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn value(self) -> Option<f32> {
        match self {
            Self::Valid(v) => Some(v),
            Self::Invalid => None,
        }
    }

    /// Presentation default: invalid readings are published as zero.
    fn or_zero(self) -> f32 {
        self.value().unwrap_or(0.0)
    }
}

// ───────────────────────────────────────────────────────────────
// ErrorSet
// ───────────────────────────────────────────────────────────────

/// Rendered error field; long enough for every fault tag at once.
pub type ErrorString = heapless::String<96>;

/// Ordered, duplicate-free set of faults seen during one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSet(heapless::Vec<Fault, 8>);

impl ErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `fault` unless already present.  First occurrence keeps its position.
    pub fn record(&mut self, fault: Fault) {
        if !self.0.contains(&fault) {
            let _ = self.0.push(fault);
        }
    }

    pub fn contains(&self, fault: Fault) -> bool {
        self.0.contains(&fault)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn faults(&self) -> &[Fault] {
        &self.0
    }

    /// Separator-joined tags, or `None` when no fault occurred.
    pub fn render(&self) -> Option<ErrorString> {
        if self.0.is_empty() {
            return None;
        }
        let mut out = ErrorString::new();
        for fault in &self.0 {
            let _ = write!(out, "{}{}", fault.tag(), ERROR_SEPARATOR);
        }
        let trimmed_len = out.trim_end_matches(ERROR_SEPARATOR).trim().len();
        out.truncate(trimmed_len);
        Some(out)
    }
}

// ───────────────────────────────────────────────────────────────
// TelemetrySnapshot
// ───────────────────────────────────────────────────────────────

/// Pick this cycle's own scan, else the buffered sighting, else nothing.
pub fn resolve_tag(own_scan: TagId, buffered: Option<TagId>) -> TagId {
    if !own_scan.is_empty() {
        return own_scan;
    }
    buffered.filter(|id| !id.is_empty()).unwrap_or_default()
}

/// Immutable result of one telemetry cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    temperature: SensorReading,
    humidity: SensorReading,
    weight: SensorReading,
    tag: TagId,
    errors: ErrorSet,
}

#[derive(Serialize)]
struct TelemetryWire<'a> {
    temperature: f32,
    humidity: f32,
    weight: f32,
    uid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl TelemetrySnapshot {
    pub fn new(
        temperature: SensorReading,
        humidity: SensorReading,
        weight: SensorReading,
        tag: TagId,
        errors: ErrorSet,
    ) -> Self {
        Self {
            temperature,
            humidity,
            weight,
            tag,
            errors,
        }
    }

    pub fn temperature(&self) -> SensorReading {
        self.temperature
    }

    pub fn humidity(&self) -> SensorReading {
        self.humidity
    }

    pub fn weight(&self) -> SensorReading {
        self.weight
    }

    pub fn tag(&self) -> &TagId {
        &self.tag
    }

    pub fn errors(&self) -> &ErrorSet {
        &self.errors
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        let error = self.errors.render();
        serde_json::to_vec(&TelemetryWire {
            temperature: self.temperature.or_zero(),
            humidity: self.humidity.or_zero(),
            weight: self.weight.or_zero(),
            uid: if self.tag.is_empty() {
                NO_TAG
            } else {
                self.tag.as_str()
            },
            error: error.as_deref(),
        })
    }
}

// ───────────────────────────────────────────────────────────────
// InstantEvent
// ───────────────────────────────────────────────────────────────

/// Out-of-band presence/fault event from the ident task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstantEvent {
    tag: Option<TagId>,
    fault: Option<Fault>,
}

#[derive(Serialize)]
struct InstantWire<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    uid: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

impl InstantEvent {
    /// `None` unless at least one field would be present.
    pub fn new(tag: Option<TagId>, fault: Option<Fault>) -> Option<Self> {
        let tag = tag.filter(|id| !id.is_empty());
        if tag.is_none() && fault.is_none() {
            return None;
        }
        Some(Self { tag, fault })
    }

    pub fn tag(&self) -> Option<&TagId> {
        self.tag.as_ref()
    }

    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&InstantWire {
            uid: self.tag.as_ref().map(TagId::as_str),
            error: self.fault.map(Fault::tag),
        })
    }
}
