//! Nest node firmware — main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │  Rc522Reader  Dht22Probe  Hx711Scale  NestActuators          │
//! │  WifiLink     MqttChannel NvsConfigStore                     │
//! │  ────────────── Port Trait Boundary ──────────────           │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │ DeviceContext: [bus] reader · [channel] uplink     │      │
//! │  │                presence slot · reader fault flag   │      │
//! │  └────────────────────────────────────────────────────┘      │
//! │        TelemetryTask thread        IdentTask thread          │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

use std::thread;

use anyhow::{Result, anyhow};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyIOPin, AnyInputPin, AnyOutputPin, PinDriver};
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, Resolution, config::TimerConfig};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_hal::spi::{SpiDeviceDriver, SpiDriver, SpiDriverConfig, config::Config as SpiConfig};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{info, warn};
use mfrc522::comm::blocking::spi::SpiInterface;

use nestnode::adapters::hardware::{Dht22Probe, Hx711Scale, NestActuators, Rc522Reader};
use nestnode::adapters::mqtt::MqttChannel;
use nestnode::adapters::nvs::NvsConfigStore;
use nestnode::adapters::wifi::WifiLink;
use nestnode::app::context::DeviceContext;
use nestnode::app::ident::IdentTask;
use nestnode::app::telemetry::{Sensors, TelemetryTask};
use nestnode::config::{self, NetworkConfig, NodeConfig};

const TELEMETRY_STACK: usize = 10 * 1024;
const IDENT_STACK: usize = 8 * 1024;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_sys::link_patches();
    esp_idf_logger::init()?;
    info!("Nest node v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 2. Config from NVS (or defaults) ──────────────────────
    let config = match NvsConfigStore::new(nvs_partition.clone()) {
        Ok(mut store) => config::load_or_init(&mut store),
        Err(e) => {
            warn!("NVS unavailable ({}), running with defaults", e);
            NodeConfig::default()
        }
    };
    let net = NetworkConfig::from_build_env();

    // ── 3. Connectivity ───────────────────────────────────────
    let link = WifiLink::start(peripherals.modem, sysloop, nvs_partition, &net)?;
    let channel = MqttChannel::start(&net)?;

    // ── 4. Peripherals ────────────────────────────────────────
    let pins = peripherals.pins;

    let spi = SpiDriver::new(
        peripherals.spi2,
        pins.gpio18,
        pins.gpio23,
        Some(pins.gpio19),
        &SpiDriverConfig::new(),
    )?;
    let spi = SpiDeviceDriver::new(spi, Some(pins.gpio5), &SpiConfig::new().baudrate(1.MHz().into()))?;
    let reader = Rc522Reader::new(SpiInterface::new(spi))?;

    let climate = Dht22Probe::new(PinDriver::input_output_od(AnyIOPin::from(pins.gpio4))?)?;
    let load_cell = Hx711Scale::new(
        PinDriver::output(AnyOutputPin::from(pins.gpio16))?,
        PinDriver::input(AnyInputPin::from(pins.gpio17))?,
    );

    // LEDC timers live for the process lifetime.
    let servo_timer: &'static _ = Box::leak(Box::new(LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::new().frequency(50.Hz().into()).resolution(Resolution::Bits14),
    )?));
    let led_timer: &'static _ = Box::leak(Box::new(LedcTimerDriver::new(
        peripherals.ledc.timer1,
        &TimerConfig::new().frequency(1.kHz().into()).resolution(Resolution::Bits10),
    )?));
    let actuators = NestActuators::new(
        LedcDriver::new(peripherals.ledc.channel0, servo_timer, pins.gpio13)?,
        LedcDriver::new(peripherals.ledc.channel1, led_timer, pins.gpio25)?,
        LedcDriver::new(peripherals.ledc.channel2, led_timer, pins.gpio26)?,
        LedcDriver::new(peripherals.ledc.channel3, led_timer, pins.gpio27)?,
    );

    // ── 5. Shared context + first session ─────────────────────
    let announce = config.announce_start;
    let ctx = DeviceContext::new(config, reader, channel, actuators);
    ctx.uplink
        .with(|uplink| {
            uplink.reconnect(&mut FreeRtos);
            if announce && uplink.announce_start().is_ok() {
                info!("Startup announced");
            }
        })
        .map_err(|e| anyhow!("boot session: {e}"))?;

    // ── 6. Tasks ──────────────────────────────────────────────
    let telemetry = TelemetryTask::new(
        &ctx,
        Sensors {
            link,
            climate,
            load_cell,
        },
        FreeRtos,
    );
    let ident = IdentTask::new(&ctx, FreeRtos);

    info!("System ready. Starting tasks.");
    thread::scope(|s| -> Result<()> {
        thread::Builder::new()
            .name("telemetry".into())
            .stack_size(TELEMETRY_STACK)
            .spawn_scoped(s, move || {
                telemetry.run();
            })?;
        thread::Builder::new()
            .name("ident".into())
            .stack_size(IDENT_STACK)
            .spawn_scoped(s, move || {
                ident.run();
            })?;
        Ok(())
    })
}
