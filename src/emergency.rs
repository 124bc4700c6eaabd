//! Panic detector and emergency latch.
//!
//! Rapid presses on the door channel are counted inside a sliding window.
//! Reaching the threshold latches emergency mode, which overrides normal
//! chimes with a looping alert until an explicit "off" command or the
//! optional auto-timeout clears it.
//!
//! ## Counting rules
//!
//! 1. First press (count 0) opens the window at count 1.
//! 2. A press within `window_ms` of the window start increments.
//! 3. A later press restarts the window at count 1.
//! 4. Reaching the threshold latches emergency and resets the count to 0.
//!
//! The tracker only owns state. Starting the alert playback and muting
//! normal chimes is done by the caller.

use log::{info, warn};

/// Returned when a press run reaches the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanicTrigger {
    pub presses: u8,
    /// Time from the first press of the run to the triggering one.
    pub window_elapsed_ms: u32,
}

/// Why emergency mode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearReason {
    Command,
    Timeout,
}

#[derive(Debug, Clone, Default)]
pub struct PanicTracker {
    press_count: u8,
    window_start_ms: u32,
    emergency_active: bool,
    emergency_start_ms: u32,
}

impl PanicTracker {
    pub const fn new() -> Self {
        Self {
            press_count: 0,
            window_start_ms: 0,
            emergency_active: false,
            emergency_start_ms: 0,
        }
    }

    /// Count one qualifying (door) press.
    ///
    /// Returns the trigger when this press latches emergency. Presses are
    /// ignored while emergency is already active, and a threshold of 0
    /// disables counting entirely.
    pub fn register_press(&mut self, now_ms: u32, threshold: u8, window_ms: u32) -> Option<PanicTrigger> {
        if self.emergency_active || threshold == 0 {
            return None;
        }

        if self.press_count == 0 || now_ms.wrapping_sub(self.window_start_ms) > window_ms {
            self.window_start_ms = now_ms;
            self.press_count = 1;
        } else {
            self.press_count = self.press_count.saturating_add(1);
        }
        info!(
            "Panic: press {}/{} in window",
            self.press_count, threshold
        );

        if self.press_count < threshold {
            return None;
        }

        let trigger = PanicTrigger {
            presses: self.press_count,
            window_elapsed_ms: now_ms.wrapping_sub(self.window_start_ms),
        };
        warn!(
            "Panic: {} presses in {} ms, emergency latched",
            trigger.presses, trigger.window_elapsed_ms
        );
        self.press_count = 0;
        self.activate(now_ms);
        Some(trigger)
    }

    /// Latch emergency. Returns `false` if it was already active.
    pub fn activate(&mut self, now_ms: u32) -> bool {
        if self.emergency_active {
            return false;
        }
        self.emergency_active = true;
        self.emergency_start_ms = now_ms;
        true
    }

    /// Clear emergency. Returns `false` if it was not active.
    pub fn deactivate(&mut self) -> bool {
        let was_active = self.emergency_active;
        self.emergency_active = false;
        self.press_count = 0;
        was_active
    }

    /// Whether an active emergency has outlived `duration_secs`
    /// (0 = never).
    pub fn timed_out(&self, now_ms: u32, duration_secs: u16) -> bool {
        self.emergency_active
            && duration_secs > 0
            && now_ms.wrapping_sub(self.emergency_start_ms) >= u32::from(duration_secs) * 1000
    }

    pub fn is_active(&self) -> bool {
        self.emergency_active
    }

    pub fn press_count(&self) -> u8 {
        self.press_count
    }

    pub fn emergency_start_ms(&self) -> u32 {
        self.emergency_start_ms
    }
}
