//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the two channel buttons, the intercom voltage source, the status
//! LED and the audio driver, exposing them through [`InputPort`],
//! [`AudioPort`] and [`IndicatorPort`]. Pins are `embedded-hal` traits,
//! so host tests drive the adapter with plain mock pins.

use embedded_hal::digital::{InputPin, OutputPin};
use log::warn;

use crate::app::ports::{AudioPort, IndicatorPort, InputPort};
use crate::drivers::hw_init;
use crate::pins;
use crate::sensors::adc_to_volts;

/// Source of the two intercom sense voltages.
pub trait VoltageSource {
    fn read_volts(&mut self) -> (f32, f32);
}

impl<F: FnMut() -> (f32, f32)> VoltageSource for F {
    fn read_volts(&mut self) -> (f32, f32) {
        self()
    }
}

/// Both sense points on ADC1.
#[derive(Debug, Default, Clone, Copy)]
pub struct Adc1Intercom;

impl VoltageSource for Adc1Intercom {
    fn read_volts(&mut self) -> (f32, f32) {
        (
            adc_to_volts(hw_init::adc1_read(pins::INTERCOM_V1_ADC_CH)),
            adc_to_volts(hw_init::adc1_read(pins::INTERCOM_V2_ADC_CH)),
        )
    }
}

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<B, V, L, A> {
    /// Indexed by [`Channel::index`](crate::config::Channel::index).
    buttons: [B; 2],
    voltages: V,
    led: L,
    audio: A,
}

impl<B, V, L, A> HardwareAdapter<B, V, L, A>
where
    B: InputPin,
    V: VoltageSource,
    L: OutputPin,
    A: AudioPort,
{
    pub fn new(buttons: [B; 2], voltages: V, led: L, audio: A) -> Self {
        Self {
            buttons,
            voltages,
            led,
            audio,
        }
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }
}

// ── InputPort implementation ──────────────────────────────────

impl<B, V, L, A> InputPort for HardwareAdapter<B, V, L, A>
where
    B: InputPin,
    V: VoltageSource,
    L: OutputPin,
    A: AudioPort,
{
    /// Buttons drive their line HIGH when pressed.
    fn read_levels(&mut self) -> [bool; 2] {
        let [downstairs, door] = &mut self.buttons;
        [
            downstairs.is_high().unwrap_or(false),
            door.is_high().unwrap_or(false),
        ]
    }

    fn read_voltages(&mut self) -> (f32, f32) {
        self.voltages.read_volts()
    }
}

// ── AudioPort implementation ──────────────────────────────────

impl<B, V, L, A> AudioPort for HardwareAdapter<B, V, L, A>
where
    B: InputPin,
    V: VoltageSource,
    L: OutputPin,
    A: AudioPort,
{
    fn set_volume(&mut self, native: u8) {
        self.audio.set_volume(native);
    }

    fn play(&mut self, track: u16) {
        self.audio.play(track);
    }

    fn loop_track(&mut self, track: u16) {
        self.audio.loop_track(track);
    }

    fn stop(&mut self) {
        self.audio.stop();
    }

    fn is_busy(&mut self) -> Option<bool> {
        self.audio.is_busy()
    }

    fn is_available(&self) -> bool {
        self.audio.is_available()
    }

    fn poll(&mut self, now_ms: u32) {
        self.audio.poll(now_ms);
    }
}

// ── IndicatorPort implementation ──────────────────────────────

impl<B, V, L, A> IndicatorPort for HardwareAdapter<B, V, L, A>
where
    B: InputPin,
    V: VoltageSource,
    L: OutputPin,
    A: AudioPort,
{
    fn set_indicator(&mut self, on: bool) {
        let result = if on { self.led.set_high() } else { self.led.set_low() };
        if result.is_err() {
            warn!("Status LED write failed");
        }
    }
}
