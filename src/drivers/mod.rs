//! Device drivers, hardware initialisation, and per-channel input logic.

pub mod audio;
pub mod button;
pub mod hw_init;
pub mod led_patterns;
pub mod watchdog;
