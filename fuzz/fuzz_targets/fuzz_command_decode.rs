//! Fuzz target: `commands::decode` and `CommandDispatcher::on_message`
//!
//! Drives arbitrary bytes through the inbound command path and asserts
//! that it never panics, never yields more than one command per field,
//! and never drops the telemetry period below the floor.
//!
//! cargo fuzz run fuzz_command_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use nestnode::app::commands::{self, Command};
use nestnode::app::dispatcher::CommandDispatcher;
use nestnode::app::ports::ActuatorPort;
use nestnode::app::state::{ActuatorState, DoorPosition, Rgb};

const MAX_LEN: usize = 512;
const FLOOR_MS: u32 = 1_000;

struct NullActuators;

impl ActuatorPort for NullActuators {
    fn set_door(&mut self, _position: DoorPosition) {}
    fn set_indicator(&mut self, _rgb: Rgb) {}
}

fuzz_target!(|data: &[u8]| {
    if let Ok(batch) = commands::decode(data, MAX_LEN) {
        assert!(data.len() <= MAX_LEN);
        let periods = batch
            .iter()
            .filter(|c| matches!(c, Command::SetPeriod(_)))
            .count();
        assert!(periods <= 1, "duplicate period command");
    }

    let mut state = ActuatorState::new(10_000, FLOOR_MS);
    CommandDispatcher::new(MAX_LEN).on_message(data, &mut state, &mut NullActuators);
    assert!(state.period_ms() >= FLOOR_MS);
});
