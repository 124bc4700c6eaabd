//! Indicator LED pattern engine with priority-based pattern selection.
//!
//! The main loop calls `tick()` each iteration and feeds the returned
//! level into [`IndicatorPort::set_indicator`](crate::app::ports::IndicatorPort::set_indicator).
//!
//! ## Priority hierarchy (highest first)
//!
//! 1. **Alert**: emergency mode, square wave toggling every 200 ms
//! 2. **Chime**: solid for 5 s after a normal chime starts
//! 3. **Off**

/// How long the LED stays lit after a chime starts.
pub const CHIME_HOLD_MS: u32 = 5000;

/// Half-period of the emergency flash.
pub const ALERT_TOGGLE_MS: u32 = 200;

/// Pattern identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternId {
    Off,
    Chime,
    Alert,
}

/// Indicator pattern engine. Stack-allocated, no heap.
#[derive(Debug, Clone, Default)]
pub struct LedPatternEngine {
    chime_since_ms: Option<u32>,
    alert_since_ms: Option<u32>,
}

impl LedPatternEngine {
    pub const fn new() -> Self {
        Self {
            chime_since_ms: None,
            alert_since_ms: None,
        }
    }

    /// Light the LED for [`CHIME_HOLD_MS`] from `now_ms`.
    pub fn start_chime(&mut self, now_ms: u32) {
        self.chime_since_ms = Some(now_ms);
    }

    /// Set or clear the alert pattern (highest priority).
    pub fn set_alert(&mut self, active: bool, now_ms: u32) {
        self.alert_since_ms = active.then_some(now_ms);
    }

    /// Pattern that `tick` would render at `now_ms`.
    pub fn pattern(&self, now_ms: u32) -> PatternId {
        if self.alert_since_ms.is_some() {
            PatternId::Alert
        } else if self
            .chime_since_ms
            .is_some_and(|since| now_ms.wrapping_sub(since) < CHIME_HOLD_MS)
        {
            PatternId::Chime
        } else {
            PatternId::Off
        }
    }

    /// Return the LED level for `now_ms`, expiring the chime hold.
    pub fn tick(&mut self, now_ms: u32) -> bool {
        match self.pattern(now_ms) {
            PatternId::Alert => {
                let since = self.alert_since_ms.unwrap_or(now_ms);
                (now_ms.wrapping_sub(since) / ALERT_TOGGLE_MS) % 2 == 0
            }
            PatternId::Chime => true,
            PatternId::Off => {
                self.chime_since_ms = None;
                false
            }
        }
    }
}
