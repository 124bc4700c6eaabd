//! Mock adapters for integration tests.
//!
//! Records every audio and indicator call so tests can assert on the full
//! command history without touching real GPIO or UART registers.

use doorbell::app::events::AppEvent;
use doorbell::app::ports::{
    AudioPort, ConfigError, ConfigPort, EventSink, IndicatorPort, InputPort,
};
use doorbell::app::service::AppService;
use doorbell::config::{Channel, DeviceConfig};

// ── Audio call record ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCall {
    SetVolume(u8),
    Play(u16),
    Loop(u16),
    Stop,
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub levels: [bool; 2],
    pub voltages: (f32, f32),
    /// `None` models an unwired BUSY line.
    pub busy: Option<bool>,
    pub available: bool,
    pub indicator: bool,
    pub calls: Vec<AudioCall>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            levels: [false; 2],
            voltages: (0.0, 0.0),
            busy: Some(false),
            available: true,
            indicator: false,
            calls: Vec::new(),
        }
    }

    pub fn press(&mut self, channel: Channel, held: bool) {
        self.levels[channel.index()] = held;
    }

    pub fn plays(&self) -> Vec<u16> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                AudioCall::Play(track) => Some(*track),
                _ => None,
            })
            .collect()
    }

    pub fn last_volume(&self) -> Option<u8> {
        self.calls.iter().rev().find_map(|c| match c {
            AudioCall::SetVolume(v) => Some(*v),
            _ => None,
        })
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl InputPort for MockHardware {
    fn read_levels(&mut self) -> [bool; 2] {
        self.levels
    }

    fn read_voltages(&mut self) -> (f32, f32) {
        self.voltages
    }
}

impl AudioPort for MockHardware {
    fn set_volume(&mut self, native: u8) {
        self.calls.push(AudioCall::SetVolume(native));
    }

    fn play(&mut self, track: u16) {
        self.calls.push(AudioCall::Play(track));
    }

    fn loop_track(&mut self, track: u16) {
        self.calls.push(AudioCall::Loop(track));
    }

    fn stop(&mut self) {
        self.calls.push(AudioCall::Stop);
    }

    fn is_busy(&mut self) -> Option<bool> {
        self.busy
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

impl IndicatorPort for MockHardware {
    fn set_indicator(&mut self, on: bool) {
        self.indicator = on;
    }
}

// ── MockStore ─────────────────────────────────────────────────

pub struct MockStore {
    pub record: Option<DeviceConfig>,
    pub fail_writes: bool,
    pub writes: usize,
}

#[allow(dead_code)]
impl MockStore {
    pub fn new() -> Self {
        Self {
            record: None,
            fail_writes: false,
            writes: 0,
        }
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigPort for MockStore {
    fn read_validity_marker(&self) -> bool {
        self.record.is_some()
    }

    fn read_config(&self) -> Result<DeviceConfig, ConfigError> {
        self.record.clone().ok_or(ConfigError::NotFound)
    }

    fn write_config(&mut self, config: &DeviceConfig) -> Result<(), ConfigError> {
        config.validate()?;
        if self.fail_writes {
            return Err(ConfigError::IoError);
        }
        self.writes += 1;
        self.record = Some(config.clone());
        Ok(())
    }

    fn erase_all(&mut self) -> Result<(), ConfigError> {
        self.record = None;
        Ok(())
    }
}

// ── LogSink ───────────────────────────────────────────────────

/// Records every emitted event.
pub struct LogSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl LogSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Driving helpers ───────────────────────────────────────────

/// Tick every `step_ms` from `from` (inclusive) to `to` (exclusive).
#[allow(dead_code)]
pub fn run(
    app: &mut AppService,
    hw: &mut MockHardware,
    sink: &mut LogSink,
    from: u32,
    to: u32,
    step_ms: u32,
) {
    let mut now = from;
    while now < to {
        app.tick(now, hw, sink);
        now += step_ms;
    }
}

/// Hold `channel` for `hold_ms`, then release it for `gap_ms`. Returns the
/// time after the gap.
#[allow(dead_code)]
pub fn press(
    app: &mut AppService,
    hw: &mut MockHardware,
    sink: &mut LogSink,
    channel: Channel,
    start: u32,
    hold_ms: u32,
    gap_ms: u32,
) -> u32 {
    hw.press(channel, true);
    run(app, hw, sink, start, start + hold_ms, 5);
    hw.press(channel, false);
    run(app, hw, sink, start + hold_ms, start + hold_ms + gap_ms, 5);
    start + hold_ms + gap_ms
}
