//! Telemetry task — one aggregated report per period.
//!
//! ```text
//!  link check ─▶ [bus] scan ─▶ [channel] bootstrap? ▶ pump ▶ climate ▶ weight
//!                                         ▶ resolve tag ▶ publish ─▶ sleep(period)
//! ```
//!
//! Faults are accumulated into one [`ErrorSet`] and surfaced in the report's
//! `error` field.  The period is read from the actuator state inside the
//! channel guard on every cycle, so a command applied during this cycle's
//! pump already governs the following sleep.

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use log::{debug, error, info};

use super::context::DeviceContext;
use super::ports::{ActuatorPort, ChannelPort, ClimatePort, LinkPort, LoadCellPort, TagReaderPort};
use super::presence::{self, TagId};
use super::report::{ErrorSet, SensorReading, TelemetrySnapshot, resolve_tag};
use crate::config::TELEMETRY_TOPIC;
use crate::error::{Fault, GuardError, TaskError};

/// Sensors read only by the telemetry task.
pub struct Sensors<L, T, W> {
    pub link: L,
    pub climate: T,
    pub load_cell: W,
}

/// Result of one completed cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryCycle {
    pub snapshot: TelemetrySnapshot,
    pub published: bool,
    pub sleep: Duration,
}

pub struct TelemetryTask<'a, R, C, A, L, T, W, D> {
    ctx: &'a DeviceContext<R, C, A>,
    sensors: Sensors<L, T, W>,
    delay: D,
    last_period_ms: u32,
}

impl<'a, R, C, A, L, T, W, D> TelemetryTask<'a, R, C, A, L, T, W, D>
where
    R: TagReaderPort,
    C: ChannelPort,
    A: ActuatorPort,
    L: LinkPort,
    T: ClimatePort,
    W: LoadCellPort,
    D: DelayNs,
{
    pub fn new(ctx: &'a DeviceContext<R, C, A>, sensors: Sensors<L, T, W>, delay: D) -> Self {
        Self {
            ctx,
            sensors,
            delay,
            last_period_ms: ctx.config.telemetry_period_ms,
        }
    }

    pub fn sensors(&self) -> &Sensors<L, T, W> {
        &self.sensors
    }

    pub fn sensors_mut(&mut self) -> &mut Sensors<L, T, W> {
        &mut self.sensors
    }

    /// Run one cycle without sleeping.
    pub fn cycle(&mut self) -> Result<TelemetryCycle, TaskError> {
        let ctx = self.ctx;
        let mut errors = ErrorSet::new();

        if !self.sensors.link.is_up() {
            errors.record(Fault::LinkDown);
        }

        let own_scan = match ctx.bus.with(|reader| presence::scan(reader)) {
            Ok(id) => id,
            Err(GuardError::Timeout(_)) => {
                errors.record(Fault::BusTimeout);
                TagId::none()
            }
            Err(e) => return Err(e.into()),
        };
        if ctx.reader_faulted() {
            errors.record(Fault::ReaderFault);
        }

        let cfg = &ctx.config;
        let Sensors {
            climate, load_cell, ..
        } = &mut self.sensors;
        let delay = &mut self.delay;

        let (snapshot, published, period_ms) = ctx.uplink.with(|uplink| {
            if !uplink.is_connected() {
                errors.record(Fault::ChannelUnreachable);
            }
            // Also renews a session the transport resumed on its own.
            uplink.reconnect(delay);
            let handled = uplink.pump();
            if handled > 0 {
                debug!("Dispatched {} inbound message(s)", handled);
            }

            let sample = climate.read();
            let temperature = SensorReading::checked(sample.temperature_c, cfg.temperature_range());
            let humidity = SensorReading::checked(sample.humidity_pct, cfg.humidity_range());
            if !temperature.is_valid() || !humidity.is_valid() {
                errors.record(Fault::SensorInvalid);
            }

            let timeout = Duration::from_millis(u64::from(cfg.load_cell_timeout_ms));
            let weight = if load_cell.wait_ready(timeout) {
                let w = SensorReading::finite(load_cell.read_grams());
                if !w.is_valid() {
                    errors.record(Fault::SensorInvalid);
                }
                w
            } else {
                errors.record(Fault::ProbeNotReady);
                SensorReading::Invalid
            };

            let tag = resolve_tag(own_scan, ctx.presence.take());
            let snapshot = TelemetrySnapshot::new(temperature, humidity, weight, tag, errors);

            let published = match snapshot.to_json() {
                Ok(bytes) => uplink.publish(TELEMETRY_TOPIC, &bytes).is_ok(),
                Err(e) => {
                    error!("Telemetry serialization failed: {}", e);
                    false
                }
            };
            (snapshot, published, uplink.period_ms())
        })?;

        self.last_period_ms = period_ms;
        debug!(
            "Telemetry uid={} errors={:?} published={}",
            snapshot.tag(),
            snapshot.errors().faults(),
            published
        );
        Ok(TelemetryCycle {
            snapshot,
            published,
            sleep: Duration::from_millis(u64::from(period_ms)),
        })
    }

    /// Loop forever.  An abandoned cycle sleeps the last known period.
    pub fn run(mut self) -> ! {
        info!("Telemetry task started ({} ms)", self.last_period_ms);
        loop {
            if let Err(e) = self.cycle() {
                error!("Telemetry cycle abandoned: {}", e);
            }
            self.delay.delay_ms(self.last_period_ms);
        }
    }
}
