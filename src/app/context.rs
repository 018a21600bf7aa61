//! Shared device context.
//!
//! One value, built at boot and borrowed by both tasks.  Every piece of
//! cross-task state lives here with its synchronization spelled out:
//!
//! | field            | sync                        | writers          |
//! |------------------|-----------------------------|------------------|
//! | `bus`            | [`Guard`] (bounded)         | both tasks       |
//! | `uplink`         | [`Guard`] (bounded)         | both tasks       |
//! | `presence`       | critical-section slot       | ident → telemetry|
//! | `reader_faulted` | atomic flag                 | ident            |

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use super::ports::{ActuatorPort, ChannelPort, TagReaderPort};
use super::presence::PresenceBuffer;
use super::uplink::Uplink;
use crate::config::NodeConfig;
use crate::guard::Guard;

pub const BUS_GUARD: &str = "bus";
pub const CHANNEL_GUARD: &str = "channel";

pub struct DeviceContext<R, C, A> {
    pub config: NodeConfig,
    pub bus: Guard<R>,
    pub uplink: Guard<Uplink<C, A>>,
    pub presence: PresenceBuffer,
    reader_faulted: AtomicBool,
}

impl<R, C, A> DeviceContext<R, C, A>
where
    R: TagReaderPort,
    C: ChannelPort,
    A: ActuatorPort,
{
    pub fn new(config: NodeConfig, reader: R, channel: C, actuators: A) -> Self {
        let bound = Duration::from_millis(u64::from(config.guard_timeout_ms));
        let uplink = Uplink::new(channel, actuators, &config);
        Self {
            bus: Guard::new(BUS_GUARD, reader, bound),
            uplink: Guard::new(CHANNEL_GUARD, uplink, bound),
            presence: PresenceBuffer::new(),
            reader_faulted: AtomicBool::new(false),
            config,
        }
    }

    pub fn reader_faulted(&self) -> bool {
        self.reader_faulted.load(Ordering::Acquire)
    }

    /// Returns the previous value.
    pub fn set_reader_faulted(&self, faulted: bool) -> bool {
        self.reader_faulted.swap(faulted, Ordering::AcqRel)
    }
}
