//! Hardware adapter — bridges the nest peripherals to the domain ports.
//!
//! This is the only module that touches the actual parts.  Board wiring:
//!
//! | Part     | Bus / signal        | ESP32 pins                       |
//! |----------|---------------------|----------------------------------|
//! | MFRC522  | SPI2                | SCK 18, MOSI 23, MISO 19, CS 5   |
//! | DHT22    | single-wire         | 4                                |
//! | HX711    | clock + data        | SCK 16, DT 17                    |
//! | Servo    | LEDC ch0 @ 50 Hz    | 13                               |
//! | RGB LED  | LEDC ch1-3 @ 1 kHz  | R 25, G 26, B 27                 |

use std::time::{Duration, Instant};

use anyhow::anyhow;
use dht_sensor::{DhtReading, dht22};
use esp_idf_hal::delay::{Ets, FreeRtos};
use esp_idf_hal::gpio::{AnyIOPin, AnyInputPin, AnyOutputPin, Input, InputOutput, Output, PinDriver};
use esp_idf_hal::ledc::LedcDriver;
use loadcell::{LoadCell, hx711::HX711};
use log::{debug, info, warn};
use mfrc522::comm::Interface;
use mfrc522::{AtqA, Initialized, Mfrc522};

use crate::app::ports::{
    ActuatorPort, ClimatePort, ClimateSample, LoadCellPort, TagReaderPort, Uid,
};
use crate::app::state::{DoorPosition, Rgb};

// ───────────────────────────────────────────────────────────────
// Tag reader (MFRC522)
// ───────────────────────────────────────────────────────────────

pub struct Rc522Reader<C: Interface> {
    dev: Mfrc522<C, Initialized>,
    atqa: Option<AtqA>,
}

impl<C: Interface> Rc522Reader<C> {
    pub fn new(comm: C) -> anyhow::Result<Self> {
        let dev = Mfrc522::new(comm)
            .init()
            .map_err(|e| anyhow!("MFRC522 init failed: {:?}", e))?;
        Ok(Self { dev, atqa: None })
    }
}

impl<C: Interface> TagReaderPort for Rc522Reader<C> {
    fn request(&mut self) -> bool {
        self.atqa = self.dev.reqa().ok();
        self.atqa.is_some()
    }

    fn wakeup(&mut self) -> bool {
        self.atqa = self.dev.wupa().ok();
        self.atqa.is_some()
    }

    fn read_uid(&mut self) -> Option<Uid> {
        let atqa = self.atqa.take()?;
        let uid = self.dev.select(&atqa).ok()?;
        Uid::from_slice(uid.as_bytes()).ok()
    }

    fn halt(&mut self) {
        if self.dev.hlta().is_err() {
            debug!("HLTA not acknowledged");
        }
    }

    fn stop_crypto(&mut self) {
        if self.dev.stop_crypto1().is_err() {
            debug!("Crypto1 stop failed");
        }
    }

    fn self_test(&mut self) -> bool {
        matches!(self.dev.version(), Ok(v) if v != 0x00 && v != 0xFF)
    }
}

// ───────────────────────────────────────────────────────────────
// Climate probe (DHT22)
// ───────────────────────────────────────────────────────────────

pub struct Dht22Probe {
    pin: PinDriver<'static, AnyIOPin, InputOutput>,
    delay: Ets,
}

impl Dht22Probe {
    pub fn new(mut pin: PinDriver<'static, AnyIOPin, InputOutput>) -> anyhow::Result<Self> {
        // Line idles high between transactions.
        pin.set_high()?;
        Ok(Self { pin, delay: Ets })
    }
}

impl ClimatePort for Dht22Probe {
    fn read(&mut self) -> ClimateSample {
        match dht22::Reading::read(&mut self.delay, &mut self.pin) {
            Ok(r) => ClimateSample {
                temperature_c: Some(r.temperature),
                humidity_pct: Some(r.relative_humidity),
            },
            Err(e) => {
                debug!("DHT22 read failed: {:?}", e);
                ClimateSample::default()
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Load cell (HX711)
// ───────────────────────────────────────────────────────────────

/// Raw counts per gram for the fitted cell.
const LOAD_CELL_SCALE: f32 = 420.0;
const TARE_SAMPLES: usize = 16;

type Hx711 = HX711<
    PinDriver<'static, AnyOutputPin, Output>,
    PinDriver<'static, AnyInputPin, Input>,
    Ets,
>;

pub struct Hx711Scale {
    cell: Hx711,
}

impl Hx711Scale {
    /// Tares with the nest empty.
    pub fn new(
        sck: PinDriver<'static, AnyOutputPin, Output>,
        dt: PinDriver<'static, AnyInputPin, Input>,
    ) -> Self {
        let mut cell = HX711::new(sck, dt, Ets);
        cell.set_scale(LOAD_CELL_SCALE);
        cell.tare(TARE_SAMPLES);
        info!("HX711 tared over {} samples", TARE_SAMPLES);
        Self { cell }
    }
}

impl LoadCellPort for Hx711Scale {
    fn wait_ready(&mut self, timeout: Duration) -> bool {
        let start = Instant::now();
        while !self.cell.is_ready() {
            if start.elapsed() >= timeout {
                return false;
            }
            FreeRtos::delay_ms(1);
        }
        true
    }

    fn read_grams(&mut self) -> f32 {
        self.cell.read_scaled().unwrap_or(f32::NAN)
    }
}

// ───────────────────────────────────────────────────────────────
// Actuators (servo + RGB LED)
// ───────────────────────────────────────────────────────────────

const SERVO_PERIOD_US: u32 = 20_000;
const DOOR_CLOSED_PULSE_US: u32 = 500;
const DOOR_OPEN_PULSE_US: u32 = 1_500;

pub struct NestActuators {
    servo: LedcDriver<'static>,
    red: LedcDriver<'static>,
    green: LedcDriver<'static>,
    blue: LedcDriver<'static>,
}

impl NestActuators {
    pub fn new(
        servo: LedcDriver<'static>,
        red: LedcDriver<'static>,
        green: LedcDriver<'static>,
        blue: LedcDriver<'static>,
    ) -> Self {
        Self {
            servo,
            red,
            green,
            blue,
        }
    }

    fn set_level(channel: &mut LedcDriver<'static>, level: u8) {
        let duty = channel.get_max_duty() * u32::from(level) / 255;
        if let Err(e) = channel.set_duty(duty) {
            warn!("LEDC duty update failed: {}", e);
        }
    }
}

impl ActuatorPort for NestActuators {
    fn set_door(&mut self, position: DoorPosition) {
        let pulse_us = match position {
            DoorPosition::Open => DOOR_OPEN_PULSE_US,
            DoorPosition::Closed => DOOR_CLOSED_PULSE_US,
        };
        let duty = (u64::from(self.servo.get_max_duty()) * u64::from(pulse_us)
            / u64::from(SERVO_PERIOD_US)) as u32;
        if let Err(e) = self.servo.set_duty(duty) {
            warn!("Servo duty update failed: {}", e);
        }
    }

    fn set_indicator(&mut self, (r, g, b): Rgb) {
        Self::set_level(&mut self.red, r);
        Self::set_level(&mut self.green, g);
        Self::set_level(&mut self.blue, b);
    }
}
