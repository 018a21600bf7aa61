//! Nest node firmware library.
//!
//! Exposes the pure-logic modules for integration testing.  The ESP-IDF
//! adapters are compiled only with the `espidf` feature.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod guard;
pub mod inbox;

#[cfg(feature = "espidf")]
pub mod adapters;
