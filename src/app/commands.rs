//! Inbound remote commands.
//!
//! Remote desired state arrives as JSON on the attribute subjects.  This
//! module is the single boundary-validation step: it turns a raw payload
//! into a batch of typed [`Command`]s, so the dispatcher only ever matches
//! on variants.
//!
//! Accepted shapes:
//!
//! ```text
//! {"door":"open"}                       plain attribute push
//! {"shared":{"rgb":"Green"}}            attribute request response
//! {"params":{"period":5000}}            RPC-style envelope
//! ```
//!
//! Unknown keys and fields with an unusable value are dropped
//! individually; only a payload that is not a JSON object is an error.

use log::debug;
use serde_json::{Map, Value};

use super::state::{DoorPosition, IndicatorColor};
use crate::error::DecodeError;

/// Envelopes unwrapped transparently, in priority order.
const ENVELOPES: [&str; 2] = ["shared", "params"];

/// A decoded remote command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetDoor(DoorPosition),
    SetIndicator(IndicatorColor),
    /// Requested telemetry period in milliseconds (not yet floor-checked).
    SetPeriod(u32),
}

/// At most one command per recognised field.
pub type CommandBatch = heapless::Vec<Command, 3>;

/// Decode one inbound payload.
pub fn decode(payload: &[u8], max_len: usize) -> Result<CommandBatch, DecodeError> {
    if payload.len() > max_len {
        return Err(DecodeError::TooLarge(payload.len()));
    }
    let value: Value = serde_json::from_slice(payload).map_err(|_| DecodeError::Malformed)?;
    let Value::Object(root) = value else {
        return Err(DecodeError::NotAnObject);
    };
    let fields = unwrap_envelope(root);

    let mut batch = CommandBatch::new();
    if let Some(v) = fields.get("door") {
        match v.as_str().and_then(DoorPosition::from_token) {
            Some(pos) => push(&mut batch, Command::SetDoor(pos)),
            None => debug!("Ignoring door value {}", v),
        }
    }
    if let Some(v) = fields.get("rgb") {
        match v.as_str().and_then(IndicatorColor::from_token) {
            Some(color) => push(&mut batch, Command::SetIndicator(color)),
            None => debug!("Ignoring rgb value {}", v),
        }
    }
    if let Some(v) = fields.get("period") {
        match period_ms(v) {
            Some(ms) => push(&mut batch, Command::SetPeriod(ms)),
            None => debug!("Ignoring period value {}", v),
        }
    }
    Ok(batch)
}

fn unwrap_envelope(mut root: Map<String, Value>) -> Map<String, Value> {
    for key in ENVELOPES {
        if let Some(Value::Object(_)) = root.get(key) {
            if let Some(Value::Object(inner)) = root.remove(key) {
                return inner;
            }
        }
    }
    root
}

/// Milliseconds from a JSON number or numeric string.
fn period_ms(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => {
            if let Some(ms) = n.as_u64() {
                u32::try_from(ms).ok()
            } else {
                let ms = n.as_f64()?;
                (ms.is_finite() && ms >= 0.0 && ms <= f64::from(u32::MAX)).then(|| ms as u32)
            }
        }
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

fn push(batch: &mut CommandBatch, cmd: Command) {
    // Capacity equals the number of recognised fields.
    let _ = batch.push(cmd);
}
