//! Doorbell controller library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod emergency;
pub mod error;
pub mod rpc;
pub mod scheduler;

pub mod pins;

// Hardware-facing modules; the ESP-IDF implementations are guarded by cfg
// attributes inside, with simulation backends on host.
pub mod adapters;
pub mod drivers;
pub mod sensors;
