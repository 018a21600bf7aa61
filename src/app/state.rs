//! Actuator state — the remotely controlled half of the node.
//!
//! Door position, indicator colour and telemetry period.  Lives inside the
//! channel guard and is mutated only by the
//! [`CommandDispatcher`](super::dispatcher::CommandDispatcher); the
//! telemetry task reads the period from it once per cycle.

use core::fmt;

use log::{info, warn};

/// Status LED channel values (R, G, B), each 0–255.
pub type Rgb = (u8, u8, u8);

/// Door servo position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DoorPosition {
    Open,
    #[default]
    Closed,
}

impl DoorPosition {
    /// Parse a door token (`open` / `closed`), ignoring case.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.eq_ignore_ascii_case("open") {
            Some(Self::Open)
        } else if token.eq_ignore_ascii_case("closed") {
            Some(Self::Closed)
        } else {
            None
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// Recognised status indicator colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndicatorColor {
    #[default]
    Off,
    Red,
    Green,
    Blue,
}

impl IndicatorColor {
    const ALL: [Self; 4] = [Self::Off, Self::Red, Self::Green, Self::Blue];

    /// Parse a colour token, ignoring case.  Unknown tokens yield `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(token))
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
        }
    }

    /// Fixed channel values for this colour.
    pub const fn rgb(self) -> Rgb {
        match self {
            Self::Off => (0, 0, 0),
            Self::Red => (255, 0, 0),
            Self::Green => (0, 255, 0),
            Self::Blue => (0, 0, 255),
        }
    }
}

/// A period update refused because it is below the configured floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRejected {
    pub requested_ms: u32,
    pub floor_ms: u32,
}

impl fmt::Display for PeriodRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "period {} ms below floor {} ms",
            self.requested_ms, self.floor_ms
        )
    }
}

/// Process-wide actuator state.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorState {
    door: DoorPosition,
    indicator: IndicatorColor,
    period_ms: u32,
    floor_ms: u32,
}

impl ActuatorState {
    /// Door closed, indicator off, period at the configured default.
    pub fn new(period_ms: u32, floor_ms: u32) -> Self {
        Self {
            door: DoorPosition::default(),
            indicator: IndicatorColor::default(),
            period_ms: period_ms.max(floor_ms),
            floor_ms,
        }
    }

    pub fn door(&self) -> DoorPosition {
        self.door
    }

    pub fn indicator(&self) -> IndicatorColor {
        self.indicator
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Returns `true` if the position changed.
    pub fn set_door(&mut self, position: DoorPosition) -> bool {
        let changed = self.door != position;
        self.door = position;
        if changed {
            info!("Door -> {}", position.as_str());
        }
        changed
    }

    /// Returns `true` if the colour changed.
    pub fn set_indicator(&mut self, color: IndicatorColor) -> bool {
        let changed = self.indicator != color;
        self.indicator = color;
        if changed {
            info!("Indicator -> {}", color.as_str());
        }
        changed
    }

    /// Apply a new telemetry period.  Values below the floor are refused
    /// and leave the current period untouched.
    pub fn set_period(&mut self, period_ms: u32) -> Result<(), PeriodRejected> {
        if period_ms < self.floor_ms {
            let rejected = PeriodRejected {
                requested_ms: period_ms,
                floor_ms: self.floor_ms,
            };
            warn!("Period update refused: {}", rejected);
            return Err(rejected);
        }
        if self.period_ms != period_ms {
            info!("Telemetry period -> {} ms", period_ms);
        }
        self.period_ms = period_ms;
        Ok(())
    }
}
