//! GPIO / peripheral pin assignments for the doorbell board (ESP32).
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Channel inputs
// ---------------------------------------------------------------------------

/// Downstairs push button (digital mode), active HIGH with pull-down.
pub const DOWNSTAIRS_BUTTON_GPIO: i32 = 27;
/// Door push button (digital mode), active HIGH with pull-down.
pub const DOOR_BUTTON_GPIO: i32 = 14;

/// Intercom sense point 1 (analog mode). GPIO34 = ADC1 channel 6.
pub const INTERCOM_V1_GPIO: i32 = 34;
pub const INTERCOM_V1_ADC_CH: u32 = 6;
/// Intercom sense point 2 (analog mode). GPIO35 = ADC1 channel 7.
pub const INTERCOM_V2_GPIO: i32 = 35;
pub const INTERCOM_V2_ADC_CH: u32 = 7;

// ---------------------------------------------------------------------------
// Audio module (DFPlayer Mini on UART2, 9600 8N1)
// ---------------------------------------------------------------------------

pub const DFPLAYER_UART: i32 = 2;
pub const DFPLAYER_BAUD: i32 = 9600;
/// ESP32 RX ← module TX.
pub const DFPLAYER_RX_GPIO: i32 = 16;
/// ESP32 TX → module RX.
pub const DFPLAYER_TX_GPIO: i32 = 17;
/// BUSY output of the module, LOW while a track plays. Optional wiring.
pub const DFPLAYER_BUSY_GPIO: i32 = 25;

// ---------------------------------------------------------------------------
// Indicator
// ---------------------------------------------------------------------------

/// On-board status LED, active HIGH.
pub const STATUS_LED_GPIO: i32 = 2;
