//! Polled debounce classifier for the two doorbell buttons.
//!
//! ## Hardware
//!
//! Momentary switches on GPIO inputs, read once per main-loop iteration
//! through [`InputPort::read_levels`](crate::app::ports::InputPort::read_levels).
//! There is no ISR; the classifier only sees the sampled level and the
//! loop timestamp.
//!
//! ## Press validation
//!
//! | Phase    | Condition                             | Result              |
//! |----------|---------------------------------------|---------------------|
//! | Edge     | released → pressed                    | hold timer starts   |
//! | Hold     | pressed, held < 200 ms                | not valid           |
//! | Valid    | pressed, held ≥ 200 ms                | valid, latched      |
//! | Release  | pressed → released                    | validity cleared    |
//!
//! [`DebounceBank`] turns the latched level into a one-shot press per hold.

use crate::config::Channel;

/// Minimum continuous hold before a press counts.
pub const MIN_HOLD_MS: u32 = 200;

/// Debounce state for one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelDebounce {
    pressed: bool,
    was_pressed: bool,
    press_start_ms: u32,
    last_valid_press_ms: Option<u32>,
    is_valid_press: bool,
}

impl ChannelDebounce {
    pub const fn new() -> Self {
        Self {
            pressed: false,
            was_pressed: false,
            press_start_ms: 0,
            last_valid_press_ms: None,
            is_valid_press: false,
        }
    }

    /// Feed one raw level sample. Returns whether the current hold is a
    /// valid press.
    pub fn sample(&mut self, raw_level: bool, now_ms: u32) -> bool {
        self.pressed = raw_level;

        if self.pressed && !self.was_pressed {
            self.press_start_ms = now_ms;
            self.is_valid_press = false;
        } else if self.pressed && self.was_pressed {
            if !self.is_valid_press && now_ms.wrapping_sub(self.press_start_ms) >= MIN_HOLD_MS {
                self.is_valid_press = true;
                self.last_valid_press_ms = Some(now_ms);
            }
        } else if !self.pressed {
            self.is_valid_press = false;
        }

        self.was_pressed = self.pressed;
        self.is_valid_press
    }

    pub fn is_valid_press(&self) -> bool {
        self.is_valid_press
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn last_valid_press_ms(&self) -> Option<u32> {
        self.last_valid_press_ms
    }
}

/// Debouncers for both channels.
#[derive(Debug, Clone, Default)]
pub struct DebounceBank {
    channels: [ChannelDebounce; 2],
}

impl DebounceBank {
    pub const fn new() -> Self {
        Self {
            channels: [ChannelDebounce::new(); 2],
        }
    }

    /// Sample both channels and return the ones whose hold became valid on
    /// this tick.
    pub fn poll(&mut self, levels: [bool; 2], now_ms: u32) -> heapless::Vec<Channel, 2> {
        let mut presses = heapless::Vec::new();
        for channel in Channel::ALL {
            let state = &mut self.channels[channel.index()];
            let was_valid = state.is_valid_press();
            if state.sample(levels[channel.index()], now_ms) && !was_valid {
                // Capacity equals the channel count.
                let _ = presses.push(channel);
            }
        }
        presses
    }

    pub fn state(&self, channel: Channel) -> &ChannelDebounce {
        &self.channels[channel.index()]
    }

    /// Both channels currently held, used for the boot-time factory reset.
    pub fn all_pressed(&self) -> bool {
        self.channels.iter().all(ChannelDebounce::is_pressed)
    }

    pub fn reset(&mut self) {
        self.channels = [ChannelDebounce::new(); 2];
    }
}
