//! Ident task — fast presence scanning with edge-triggered instant events.
//!
//! Each iteration self-tests the reader and scans under the bus guard, then
//! compares the result with the previous iteration.  An instant event goes
//! out only on a transition: a non-empty id different from the previous
//! one, or the onset of a reader fault.  A run of identical sightings whose
//! first sighting was not delivered instantly (failed publish, channel
//! contention) is left in the presence buffer for the next telemetry
//! report; once a run is delivered, none of its repeats is buffered.

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use super::context::DeviceContext;
use super::ports::{ActuatorPort, ChannelPort, TagReaderPort};
use super::presence::{self, TagId};
use super::report::InstantEvent;
use crate::config::EVENT_TOPIC;
use crate::error::{Fault, TaskError};

/// Result of one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentIteration {
    /// This iteration's scan; empty when nothing was in range or the reader faulted.
    pub tag: TagId,
    pub faulted: bool,
    pub event: Option<InstantEvent>,
    pub delivered: bool,
}

pub struct IdentTask<'a, R, C, A, D> {
    ctx: &'a DeviceContext<R, C, A>,
    delay: D,
    interval: Duration,
    previous: TagId,
    /// The current run of identical sightings went out as an instant event.
    run_delivered: bool,
    faulted: bool,
}

impl<'a, R, C, A, D> IdentTask<'a, R, C, A, D>
where
    R: TagReaderPort,
    C: ChannelPort,
    A: ActuatorPort,
    D: DelayNs,
{
    pub fn new(ctx: &'a DeviceContext<R, C, A>, delay: D) -> Self {
        Self {
            ctx,
            delay,
            interval: Duration::from_millis(u64::from(ctx.config.ident_interval_ms)),
            previous: TagId::none(),
            run_delivered: false,
            faulted: false,
        }
    }

    pub fn previous(&self) -> &TagId {
        &self.previous
    }

    /// Run one iteration without sleeping.
    pub fn iteration(&mut self) -> Result<IdentIteration, TaskError> {
        let ctx = self.ctx;
        let scanned = ctx.bus.with(|reader| {
            if reader.self_test() {
                Some(presence::scan(reader))
            } else {
                None
            }
        })?;

        let (current, faulted) = match scanned {
            Some(id) => (id, false),
            None => (TagId::none(), true),
        };
        let fault_onset = faulted && !self.faulted;
        if faulted != self.faulted {
            if faulted {
                warn!("Tag reader self-test failed");
            } else {
                info!("Tag reader recovered");
            }
            ctx.set_reader_faulted(faulted);
        }
        self.faulted = faulted;

        if current != self.previous {
            self.run_delivered = false;
        }
        let new_tag = !current.is_empty() && current != self.previous;
        self.previous = current.clone();

        let event = InstantEvent::new(
            new_tag.then(|| current.clone()),
            fault_onset.then_some(Fault::ReaderFault),
        );
        let delivered = event.as_ref().is_some_and(|ev| self.publish(ev));

        if new_tag && delivered {
            self.run_delivered = true;
        }
        if !self.run_delivered {
            ctx.presence.offer(&current);
        }
        if new_tag {
            info!("Tag {} detected", current);
        }

        Ok(IdentIteration {
            tag: current,
            faulted,
            event,
            delivered,
        })
    }

    fn publish(&self, event: &InstantEvent) -> bool {
        let bytes = match event.to_json() {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Instant event serialization failed: {}", e);
                return false;
            }
        };
        matches!(
            self.ctx.uplink.with(|uplink| uplink.publish(EVENT_TOPIC, &bytes)),
            Ok(Ok(()))
        )
    }

    /// Loop forever at the fixed scan interval.
    pub fn run(mut self) -> ! {
        info!("Ident task started ({:?})", self.interval);
        let interval_ms = u32::try_from(self.interval.as_millis()).unwrap_or(u32::MAX);
        loop {
            if let Err(e) = self.iteration() {
                error!("Ident iteration abandoned: {}", e);
            }
            self.delay.delay_ms(interval_ms);
        }
    }
}
