//! Voltage-session classifier for the building intercom line.
//!
//! Both sense points hang off one noisy analog line, so a single high
//! sample means nothing. The classifier groups samples into sessions,
//! attributes each session to a channel the moment it opens, tolerates
//! short dropouts, and only reports a press once the session has lasted
//! long enough.
//!
//! ## State machine
//!
//! ```text
//!            either ≥ threshold, not playing
//!   Idle ──────────────────────────────────────▶ Active
//!    ▲                                             │ sample, track max
//!    │    buffer full, or both < threshold -       │ press once at
//!    │    hysteresis for longer than tolerance     │ min duration
//!    └─────────────────────────────────────────────┘
//! ```
//!
//! End checks run in a fixed order each tick: buffer full, then sustained
//! dropout. Emitting the press at the minimum duration does not end the
//! session.

use crate::config::Channel;

/// Sample capacity of one session (5 s at the default cadence).
pub const MAX_SESSION_SAMPLES: usize = 1000;

/// Tuning for the classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogParams {
    /// Either voltage at or above this opens a session.
    pub threshold_v: f32,
    /// Both voltages below `threshold_v - hysteresis_v` count as a dropout.
    pub hysteresis_v: f32,
    pub sample_interval_ms: u32,
    pub min_session_ms: u32,
    /// Longest dropout a session survives.
    pub dropout_tolerance_ms: u32,
}

impl Default for AnalogParams {
    fn default() -> Self {
        Self {
            threshold_v: 3.0,
            hysteresis_v: 0.3,
            sample_interval_ms: 5,
            min_session_ms: 200,
            dropout_tolerance_ms: 15,
        }
    }
}

impl AnalogParams {
    fn low_threshold_v(&self) -> f32 {
        self.threshold_v - self.hysteresis_v
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageSample {
    pub v1: f32,
    pub v2: f32,
    /// Milliseconds since the session opened.
    pub elapsed_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Dropout,
    BufferFull,
}

/// What a finished session looked like.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSummary {
    pub channel: Channel,
    pub duration_ms: u32,
    pub max_voltage: f32,
    pub samples: usize,
    /// Met the minimum duration and produced a press.
    pub accepted: bool,
    pub reason: EndReason,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntercomEvent {
    Started { channel: Channel },
    Sample(VoltageSample),
    Press(Channel),
    Ended(SessionSummary),
}

/// Outcome of one sampling tick.
pub type IntercomEvents = heapless::Vec<IntercomEvent, 4>;

/// One candidate intercom activation.
#[derive(Debug, Clone)]
pub struct VoltageSession<const N: usize> {
    start_ms: u32,
    end_ms: u32,
    is_active: bool,
    max_voltage: f32,
    attributed: Option<Channel>,
    samples: heapless::Vec<VoltageSample, N>,
    last_high_ms: u32,
    press_emitted: bool,
}

impl<const N: usize> VoltageSession<N> {
    const fn empty() -> Self {
        Self {
            start_ms: 0,
            end_ms: 0,
            is_active: false,
            max_voltage: 0.0,
            attributed: None,
            samples: heapless::Vec::new(),
            last_high_ms: 0,
            press_emitted: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn attributed(&self) -> Option<Channel> {
        self.attributed
    }

    pub fn max_voltage(&self) -> f32 {
        self.max_voltage
    }

    pub fn start_ms(&self) -> u32 {
        self.start_ms
    }

    pub fn end_ms(&self) -> u32 {
        self.end_ms
    }

    pub fn samples(&self) -> &[VoltageSample] {
        &self.samples
    }
}

/// Two-input intercom classifier. `N` caps the samples kept per session.
pub struct IntercomClassifier<const N: usize = MAX_SESSION_SAMPLES> {
    params: AnalogParams,
    session: VoltageSession<N>,
    last_sample_ms: Option<u32>,
}

impl<const N: usize> IntercomClassifier<N> {
    pub fn new(params: AnalogParams) -> Self {
        Self {
            params,
            session: VoltageSession::empty(),
            last_sample_ms: None,
        }
    }

    pub fn params(&self) -> &AnalogParams {
        &self.params
    }

    pub fn session(&self) -> &VoltageSession<N> {
        &self.session
    }

    /// Whether the sample interval has elapsed since the last sample.
    pub fn is_due(&self, now_ms: u32) -> bool {
        self.last_sample_ms
            .is_none_or(|last| now_ms.wrapping_sub(last) >= self.params.sample_interval_ms)
    }

    /// Drop any session in progress without reporting it.
    pub fn reset(&mut self) {
        self.session = VoltageSession::empty();
        self.last_sample_ms = None;
    }

    /// Feed one pair of voltages.
    ///
    /// `playback_active` blocks new sessions so the chime itself, or the
    /// handset ringing along with it, cannot re-trigger.
    pub fn sample(&mut self, v1: f32, v2: f32, now_ms: u32, playback_active: bool) -> IntercomEvents {
        self.last_sample_ms = Some(now_ms);
        let mut events = IntercomEvents::new();

        if !self.session.is_active {
            let threshold = self.params.threshold_v;
            if (v1 >= threshold || v2 >= threshold) && !playback_active {
                let channel = if v2 >= threshold {
                    Channel::Door
                } else {
                    Channel::Downstairs
                };
                self.open(channel, v1, v2, now_ms, &mut events);
            }
            return events;
        }

        self.extend(v1, v2, now_ms, &mut events);
        events
    }

    fn open(&mut self, channel: Channel, v1: f32, v2: f32, now_ms: u32, events: &mut IntercomEvents) {
        let first = VoltageSample {
            v1,
            v2,
            elapsed_ms: 0,
        };
        let mut samples = heapless::Vec::new();
        let _ = samples.push(first);
        self.session = VoltageSession {
            start_ms: now_ms,
            end_ms: now_ms,
            is_active: true,
            max_voltage: v1.max(v2),
            attributed: Some(channel),
            samples,
            last_high_ms: now_ms,
            press_emitted: false,
        };
        let _ = events.push(IntercomEvent::Started { channel });
        let _ = events.push(IntercomEvent::Sample(first));
    }

    fn extend(&mut self, v1: f32, v2: f32, now_ms: u32, events: &mut IntercomEvents) {
        let elapsed_ms = now_ms.wrapping_sub(self.session.start_ms);
        let sample = VoltageSample { v1, v2, elapsed_ms };

        if self.session.samples.push(sample).is_err() {
            self.close(now_ms, EndReason::BufferFull, events);
            return;
        }
        let _ = events.push(IntercomEvent::Sample(sample));
        self.session.max_voltage = self.session.max_voltage.max(v1).max(v2);

        if v1 >= self.params.threshold_v || v2 >= self.params.threshold_v {
            self.session.last_high_ms = now_ms;
        }

        if self.session.samples.is_full() {
            self.close(now_ms, EndReason::BufferFull, events);
            return;
        }

        let low = self.params.low_threshold_v();
        let dropout = v1 < low && v2 < low;
        if dropout && now_ms.wrapping_sub(self.session.last_high_ms) > self.params.dropout_tolerance_ms {
            self.close(now_ms, EndReason::Dropout, events);
            return;
        }

        if !self.session.press_emitted && elapsed_ms >= self.params.min_session_ms {
            if let Some(channel) = self.session.attributed {
                self.session.press_emitted = true;
                let _ = events.push(IntercomEvent::Press(channel));
            }
        }
    }

    fn close(&mut self, now_ms: u32, reason: EndReason, events: &mut IntercomEvents) {
        self.session.end_ms = now_ms;
        let duration_ms = now_ms.wrapping_sub(self.session.start_ms);
        let accepted = duration_ms >= self.params.min_session_ms;

        if let Some(channel) = self.session.attributed {
            if accepted && !self.session.press_emitted {
                let _ = events.push(IntercomEvent::Press(channel));
            }
            let _ = events.push(IntercomEvent::Ended(SessionSummary {
                channel,
                duration_ms,
                max_voltage: self.session.max_voltage,
                samples: self.session.samples.len(),
                accepted,
                reason,
            }));
        }

        if !accepted {
            log::debug!("Intercom: {duration_ms} ms session discarded");
        }
        self.session = VoltageSession::empty();
    }
}
