//! Analog sensing for the intercom input mode.
//!
//! [`intercom`] holds the session classifier. This module keeps the ADC
//! scaling shared by the hardware adapter and the tests.

pub mod intercom;

/// ADC full-scale count (12-bit).
pub const ADC_FULL_SCALE: u16 = 4095;

/// Voltage at full scale with 12 dB attenuation.
pub const ADC_REFERENCE_V: f32 = 3.3;

/// Convert a raw 12-bit ADC count to volts. Counts above full scale
/// saturate.
pub fn adc_to_volts(raw: u16) -> f32 {
    f32::from(raw.min(ADC_FULL_SCALE)) * ADC_REFERENCE_V / f32::from(ADC_FULL_SCALE)
}
