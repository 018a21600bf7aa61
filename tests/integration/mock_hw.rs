//! Mock adapters for integration tests.
//!
//! Every port has a recording mock so tests can script inputs (tag scans,
//! sensor values, inbound messages, link state) and assert on the full
//! output history without touching real peripherals.

use std::collections::VecDeque;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use nestnode::app::context::DeviceContext;
use nestnode::app::ports::{
    ActuatorPort, ChannelPort, ClimatePort, ClimateSample, LinkPort, LoadCellPort, TagReaderPort,
    Uid,
};
use nestnode::app::state::{DoorPosition, Rgb};
use nestnode::app::telemetry::{Sensors, TelemetryTask};
use nestnode::config::{ATTRIBUTES_REQUEST_TOPIC, NodeConfig, TELEMETRY_TOPIC};
use nestnode::error::ChannelError;
use nestnode::inbox::Inbox;
use serde_json::Value;

// ── Tag reader ────────────────────────────────────────────────

/// Each scan consumes one scripted entry; an empty script means no tag.
#[derive(Default)]
pub struct MockReader {
    scans: VecDeque<Option<Vec<u8>>>,
    self_tests: VecDeque<bool>,
    in_field: Option<Vec<u8>>,
    pub halts: u32,
    pub crypto_stops: u32,
}

#[allow(dead_code)]
impl MockReader {
    /// Scripted scans as hex ids; `""` is an empty field.
    pub fn with_scans(ids: &[&str]) -> Self {
        Self {
            scans: ids.iter().map(|id| parse_hex(id)).collect(),
            ..Self::default()
        }
    }

    pub fn push_scan(&mut self, id: &str) {
        self.scans.push_back(parse_hex(id));
    }

    /// Script upcoming self-test outcomes; unscripted tests pass.
    pub fn push_self_tests(&mut self, outcomes: &[bool]) {
        self.self_tests.extend(outcomes);
    }
}

fn parse_hex(id: &str) -> Option<Vec<u8>> {
    if id.is_empty() {
        return None;
    }
    Some(
        (0..id.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&id[i..i + 2], 16).unwrap())
            .collect(),
    )
}

impl TagReaderPort for MockReader {
    fn request(&mut self) -> bool {
        self.in_field = self.scans.pop_front().flatten();
        self.in_field.is_some()
    }

    fn wakeup(&mut self) -> bool {
        self.in_field.is_some()
    }

    fn read_uid(&mut self) -> Option<Uid> {
        self.in_field
            .as_ref()
            .map(|b| Uid::from_slice(b).unwrap())
    }

    fn halt(&mut self) {
        self.halts += 1;
    }

    fn stop_crypto(&mut self) {
        self.crypto_stops += 1;
    }

    fn self_test(&mut self) -> bool {
        self.self_tests.pop_front().unwrap_or(true)
    }
}

// ── Sensors ───────────────────────────────────────────────────

pub struct MockClimate {
    pub sample: ClimateSample,
}

impl Default for MockClimate {
    fn default() -> Self {
        Self {
            sample: ClimateSample {
                temperature_c: Some(22.5),
                humidity_pct: Some(55.0),
            },
        }
    }
}

impl ClimatePort for MockClimate {
    fn read(&mut self) -> ClimateSample {
        self.sample
    }
}

pub struct MockLoadCell {
    pub ready: bool,
    pub grams: f32,
    pub waits: Vec<Duration>,
}

impl Default for MockLoadCell {
    fn default() -> Self {
        Self {
            ready: true,
            grams: 130.0,
            waits: Vec::new(),
        }
    }
}

impl LoadCellPort for MockLoadCell {
    fn wait_ready(&mut self, timeout: Duration) -> bool {
        self.waits.push(timeout);
        self.ready
    }

    fn read_grams(&mut self) -> f32 {
        self.grams
    }
}

pub struct MockLink {
    pub up: bool,
}

impl LinkPort for MockLink {
    fn is_up(&mut self) -> bool {
        self.up
    }
}

// ── Channel ───────────────────────────────────────────────────

pub struct MockChannel {
    pub connected: bool,
    pub refuse_connects: u32,
    pub fail_publishes: bool,
    pub session: u32,
    pub connect_calls: u32,
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, Vec<u8>)>,
    inbox: Inbox,
}

#[allow(dead_code)]
impl MockChannel {
    pub fn connected() -> Self {
        Self {
            connected: true,
            refuse_connects: 0,
            fail_publishes: false,
            session: 1,
            connect_calls: 0,
            subscriptions: Vec::new(),
            published: Vec::new(),
            inbox: Inbox::new(),
        }
    }

    /// The transport dropped and resumed the session between two checks:
    /// still connected, new generation, broker-side subscriptions gone.
    pub fn resume_silently(&mut self) {
        self.session += 1;
        self.subscriptions.clear();
    }

    /// Queue an inbound message for the next pump.
    pub fn deliver(&mut self, topic: &str, payload: &[u8]) {
        assert!(self.inbox.push(topic, payload), "mock inbox rejected message");
    }

    /// Decoded payloads published on `topic`, oldest first.
    pub fn published_json(&self, topic: &str) -> Vec<Value> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| serde_json::from_slice(p).unwrap())
            .collect()
    }

    /// Periodic reports (telemetry payloads carrying a `uid` and `weight`).
    pub fn reports(&self) -> Vec<Value> {
        self.published_json(TELEMETRY_TOPIC)
            .into_iter()
            .filter(|v| v.get("weight").is_some())
            .collect()
    }

    /// Everything except the session bootstrap requests.
    pub fn data_published(&self) -> Vec<&(String, Vec<u8>)> {
        self.published
            .iter()
            .filter(|(t, _)| t != ATTRIBUTES_REQUEST_TOPIC)
            .collect()
    }

    /// Instant events (telemetry payloads without `weight`).
    pub fn events(&self) -> Vec<Value> {
        self.published_json(TELEMETRY_TOPIC)
            .into_iter()
            .filter(|v| v.get("weight").is_none() && v.get("init").is_none())
            .collect()
    }
}

impl ChannelPort for MockChannel {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn session(&self) -> u32 {
        self.session
    }

    fn connect(&mut self) -> Result<(), ChannelError> {
        self.connect_calls += 1;
        if self.refuse_connects > 0 {
            self.refuse_connects -= 1;
            return Err(ChannelError::ConnectFailed);
        }
        self.connected = true;
        self.session += 1;
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), ChannelError> {
        if !self.connected {
            return Err(ChannelError::NotConnected);
        }
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), ChannelError> {
        if !self.connected {
            return Err(ChannelError::NotConnected);
        }
        if self.fail_publishes {
            return Err(ChannelError::PublishFailed);
        }
        self.published.push((topic.to_string(), payload.to_vec()));
        Ok(())
    }

    fn pump(&mut self, on_message: &mut dyn FnMut(&str, &[u8])) {
        self.inbox.drain(on_message);
    }
}

// ── Actuators ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockActuators {
    pub doors: Vec<DoorPosition>,
    pub leds: Vec<Rgb>,
}

impl ActuatorPort for MockActuators {
    fn set_door(&mut self, position: DoorPosition) {
        self.doors.push(position);
    }

    fn set_indicator(&mut self, rgb: Rgb) {
        self.leds.push(rgb);
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// Records requested sleeps without sleeping.
#[derive(Default)]
pub struct MockDelay {
    pub sleeps_ms: Vec<u32>,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.sleeps_ms.push(ms);
    }
}

// ── Fixtures ──────────────────────────────────────────────────

pub type TestContext = DeviceContext<MockReader, MockChannel, MockActuators>;
pub type TestTelemetry<'a> =
    TelemetryTask<'a, MockReader, MockChannel, MockActuators, MockLink, MockClimate, MockLoadCell, MockDelay>;

/// Short guard bound so contention tests finish quickly.
pub fn test_config() -> NodeConfig {
    NodeConfig {
        guard_timeout_ms: 50,
        load_cell_timeout_ms: 10,
        ..NodeConfig::default()
    }
}

/// A context whose first session is already bootstrapped, as after boot.
pub fn node(reader: MockReader) -> TestContext {
    let ctx = DeviceContext::new(
        test_config(),
        reader,
        MockChannel::connected(),
        MockActuators::default(),
    );
    ctx.uplink
        .with(|u| u.reconnect(&mut MockDelay::default()))
        .unwrap();
    ctx
}

pub fn telemetry(ctx: &TestContext) -> TestTelemetry<'_> {
    TelemetryTask::new(
        ctx,
        Sensors {
            link: MockLink { up: true },
            climate: MockClimate::default(),
            load_cell: MockLoadCell::default(),
        },
        MockDelay::default(),
    )
}

/// Run `f` against the channel mock under the channel guard.
pub fn with_channel<T>(ctx: &TestContext, f: impl FnOnce(&mut MockChannel) -> T) -> T {
    ctx.uplink.with(|u| f(u.channel_mut())).unwrap()
}
