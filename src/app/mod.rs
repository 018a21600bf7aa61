//! Application core — the control loop, zero direct I/O.
//!
//! Two tasks share one [`context::DeviceContext`]:
//!
//! - [`telemetry`] builds and publishes one aggregated report per period;
//! - [`ident`] scans for tags at a high rate and publishes instant events
//!   on transitions.
//!
//! All interaction with hardware and the network happens through the
//! **port traits** in [`ports`], so the whole loop runs on the host against
//! mocks.

pub mod commands;
pub mod context;
pub mod dispatcher;
pub mod ident;
pub mod ports;
pub mod presence;
pub mod report;
pub mod state;
pub mod supervisor;
pub mod telemetry;
pub mod uplink;
