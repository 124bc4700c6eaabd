//! Application service, the hexagonal core.
//!
//! [`AppService`] owns every state machine: the button debouncers, the
//! intercom classifier, the panic tracker, the playback scheduler and the
//! indicator patterns. It exposes a clean, hardware-agnostic API. All I/O
//! flows through port traits injected at call sites, making the entire
//! service testable with mock adapters.
//!
//! ```text
//!    InputPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                  │          AppService          │
//!    AudioPort ◀── │  Debounce · Intercom · Panic │ ◀── AppCommand
//! IndicatorPort ◀──│  Scheduler · LED patterns    │ ──▶ ConfigPort
//!                  └──────────────────────────────┘
//! ```

use core::fmt::Write as _;

use log::{info, warn};

use crate::config::{percent_to_native, Channel, DeviceConfig, InputMode};
use crate::drivers::button::DebounceBank;
use crate::drivers::led_patterns::LedPatternEngine;
use crate::emergency::{ClearReason, PanicTracker};
use crate::error::CommandError;
use crate::scheduler::{
    PlayOrigin, PlayRequest, PlaybackScheduler, PlaybackTiming, SchedulerEvent,
};
use crate::sensors::intercom::{AnalogParams, IntercomClassifier, IntercomEvent};

use super::commands::AppCommand;
use super::events::{
    AppEvent, DebugText, EmergencyTrigger, SessionTelemetry, StatusReport, TimerNotice,
};
use super::ports::{AudioPort, ConfigPort, EventSink, IndicatorPort, InputPort};

/// Sleep between control loop passes. Needs a 1 kHz RTOS tick on the device.
pub const LOOP_PERIOD_MS: u32 = 1;

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    config: DeviceConfig,
    buttons: DebounceBank,
    /// Boxed: the session buffer is too large for the main task stack.
    intercom: Box<IntercomClassifier>,
    panic: PanicTracker,
    scheduler: PlaybackScheduler,
    indicator: LedPatternEngine,
    started_ms: u32,
    now_ms: u32,
    tick_count: u64,
    reboot_requested: bool,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Does **not** touch hardware; call [`start`](Self::start) next.
    pub fn new(config: DeviceConfig) -> Self {
        Self::with_analog_params(config, AnalogParams::default())
    }

    pub fn with_analog_params(config: DeviceConfig, params: AnalogParams) -> Self {
        Self {
            config,
            buttons: DebounceBank::new(),
            intercom: Box::new(IntercomClassifier::new(params)),
            panic: PanicTracker::new(),
            scheduler: PlaybackScheduler::new(),
            indicator: LedPatternEngine::new(),
            started_ms: 0,
            now_ms: 0,
            tick_count: 0,
            reboot_requested: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Silence the audio module and announce the device.
    pub fn start(&mut self, now_ms: u32, audio: &mut impl AudioPort, sink: &mut impl EventSink) {
        self.started_ms = now_ms;
        self.now_ms = now_ms;
        audio.set_volume(0);
        sink.emit(&AppEvent::Started);
        self.emit_status(audio, sink);
        info!(
            "AppService started ({} input, audio {})",
            self.config.input_mode.name(),
            if audio.is_available() { "ready" } else { "unavailable" }
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one loop iteration: emergency timeout → inputs → playback →
    /// indicator.
    ///
    /// The `hw` parameter satisfies all three hardware ports, which
    /// avoids a double mutable borrow while keeping the port boundary
    /// explicit.
    pub fn tick(
        &mut self,
        now_ms: u32,
        hw: &mut (impl InputPort + AudioPort + IndicatorPort),
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        self.now_ms = now_ms;

        // 1. Emergency auto-timeout
        if self.panic.timed_out(now_ms, self.config.emergency.duration_secs) {
            info!("Emergency auto-cleared after {} s", self.config.emergency.duration_secs);
            self.exit_emergency(ClearReason::Timeout, now_ms, hw, sink);
        }

        // 2. Inputs
        let presses = match self.config.input_mode {
            InputMode::Digital => self.buttons.poll(hw.read_levels(), now_ms),
            InputMode::Analog => self.sample_intercom(now_ms, hw, sink),
        };
        for channel in presses {
            self.on_press(channel, false, now_ms, hw, sink);
        }

        // 3. Playback
        let timing = PlaybackTiming {
            cooldown_ms: self.config.button_cooldown_ms,
            volume_reset_ms: self.config.volume_reset_ms,
        };
        let events = self
            .scheduler
            .tick(now_ms, timing, hw, self.panic.is_active());
        for event in events {
            self.on_scheduler_event(event, now_ms, sink);
        }

        // 4. Indicator and paced audio frames
        let level = self.indicator.tick(now_ms);
        hw.set_indicator(level);
        hw.poll(now_ms);
    }

    // ── Command handling ──────────────────────────────────────

    /// Process a decoded control request.
    ///
    /// Errors leave the service state unchanged, except
    /// [`CommandError::Persist`], where the in-memory change stays applied.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u32,
        audio: &mut impl AudioPort,
        store: &mut impl ConfigPort,
        sink: &mut impl EventSink,
    ) -> Result<(), CommandError> {
        self.now_ms = now_ms;
        match cmd {
            AppCommand::GetConfig => {
                sink.emit(&AppEvent::Config(Box::new(self.config.clone())));
            }
            AppCommand::GetStatus => self.emit_status(audio, sink),
            AppCommand::Reboot { confirmed } => {
                if confirmed {
                    warn!("Reboot requested over control channel");
                    self.reboot_requested = true;
                }
                sink.emit(&AppEvent::Reboot { confirmed });
            }
            AppCommand::SimulatePress(channel) => {
                self.debug(sink, format_args!("Simulating {} button press", channel.name()));
                self.on_press(channel, true, now_ms, audio, sink);
            }
            AppCommand::DirectPlay { track } => {
                if track == 0 {
                    return Err(CommandError::InvalidRequest("track must be ≥ 1"));
                }
                self.scheduler.request_play(PlayRequest {
                    track,
                    volume_percent: 100,
                    origin: PlayOrigin::Direct,
                });
            }
            AppCommand::SetChannelConfig { channel, patch } => {
                let mut candidate = self.config.clone();
                patch.apply(&mut candidate, channel);
                self.commit(candidate, store, sink)?;
            }
            AppCommand::SetDeviceConfig(patch) => {
                let mut candidate = self.config.clone();
                patch.apply(&mut candidate);
                self.commit(candidate, store, sink)?;
            }
            AppCommand::SetEmergencyConfig(patch) => {
                let mut candidate = self.config.clone();
                patch.apply(&mut candidate);
                self.commit(candidate, store, sink)?;
            }
            AppCommand::TimerSet(req) => {
                PlaybackScheduler::check_duration(req.seconds)?;
                if req.track == 0 {
                    return Err(CommandError::InvalidRequest("timer track must be ≥ 1"));
                }
                if req.volume > 100 {
                    return Err(CommandError::InvalidRequest("timer volume must be 0–100"));
                }
                self.scheduler
                    .set_timer(req.seconds, req.track, req.volume, now_ms)?;
                sink.emit(&AppEvent::Timer(TimerNotice::Started {
                    seconds: req.seconds,
                    track: req.track,
                    volume_percent: req.volume,
                }));
            }
            AppCommand::TimerStop => {
                let stopped = self.scheduler.stop_timer()?;
                sink.emit(&AppEvent::Timer(TimerNotice::Stopped {
                    remaining_ms: stopped.remaining_ms(now_ms),
                }));
            }
            AppCommand::Emergency(true) => {
                if self.panic.activate(now_ms) {
                    self.enter_emergency(EmergencyTrigger::Command, now_ms, audio, sink);
                } else {
                    self.debug(sink, format_args!("Emergency already active"));
                }
            }
            AppCommand::Emergency(false) => {
                if !self.exit_emergency(ClearReason::Command, now_ms, audio, sink) {
                    self.debug(sink, format_args!("Emergency not active"));
                }
            }
        }
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a status snapshot from the current state.
    pub fn status_report(&self, audio: &impl AudioPort) -> StatusReport {
        let timer = self.scheduler.timer();
        StatusReport {
            uptime_ms: self.now_ms.wrapping_sub(self.started_ms),
            emergency_active: self.panic.is_active(),
            is_playing: self.scheduler.is_playing(),
            audio_available: audio.is_available(),
            timer_active: timer.active,
            timer_remaining_ms: timer.remaining_ms(self.now_ms),
            config: self.config.clone(),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn is_emergency_active(&self) -> bool {
        self.panic.is_active()
    }

    pub fn panic_tracker(&self) -> &PanicTracker {
        &self.panic
    }

    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.scheduler
    }

    pub fn intercom(&self) -> &IntercomClassifier {
        &self.intercom
    }

    /// Total loop iterations executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Returns `true` once after a confirmed reboot request.
    pub fn take_reboot_request(&mut self) -> bool {
        core::mem::take(&mut self.reboot_requested)
    }

    // ── Internal ──────────────────────────────────────────────

    fn sample_intercom(
        &mut self,
        now_ms: u32,
        hw: &mut impl InputPort,
        sink: &mut impl EventSink,
    ) -> heapless::Vec<Channel, 2> {
        let mut presses = heapless::Vec::new();
        if !self.intercom.is_due(now_ms) {
            return presses;
        }

        let (v1, v2) = hw.read_voltages();
        let busy = self.scheduler.is_playing() || self.panic.is_active();
        for event in self.intercom.sample(v1, v2, now_ms, busy) {
            let telemetry = match event {
                IntercomEvent::Press(channel) => {
                    let _ = presses.push(channel);
                    continue;
                }
                IntercomEvent::Started { channel } => {
                    info!("Intercom: session opened on {}", channel.name());
                    SessionTelemetry::Started { channel }
                }
                IntercomEvent::Sample(sample) => SessionTelemetry::Sample(sample),
                IntercomEvent::Ended(summary) => {
                    info!(
                        "Intercom: {} session ended after {} ms ({:?}, peak {:.2} V)",
                        summary.channel.name(),
                        summary.duration_ms,
                        summary.reason,
                        summary.max_voltage
                    );
                    SessionTelemetry::Ended(summary)
                }
            };
            if self.config.debug_enabled {
                sink.emit(&AppEvent::Session(telemetry));
            }
        }
        presses
    }

    /// A validated or simulated press: feed the panic tracker, then queue
    /// the channel's chime.
    fn on_press(
        &mut self,
        channel: Channel,
        simulated: bool,
        now_ms: u32,
        audio: &mut impl AudioPort,
        sink: &mut impl EventSink,
    ) {
        info!(
            "Press on {}{}",
            channel.name(),
            if simulated { " (simulated)" } else { "" }
        );
        sink.emit(&AppEvent::ChannelPressed { channel, simulated });

        if self.panic.is_active() {
            self.debug(sink, format_args!("Emergency active, {} press ignored", channel.name()));
            return;
        }

        if channel == Channel::Door {
            let threshold = self.config.emergency.panic_threshold;
            let window_ms = self.config.panic_window_ms();
            if let Some(trigger) = self.panic.register_press(now_ms, threshold, window_ms) {
                self.enter_emergency(EmergencyTrigger::Panic(trigger), now_ms, audio, sink);
                return;
            }
        }

        let settings = *self.config.channel(channel);
        self.scheduler.request_play(PlayRequest {
            track: settings.track,
            volume_percent: settings.volume_percent,
            origin: PlayOrigin::Channel(channel),
        });
    }

    fn on_scheduler_event(&mut self, event: SchedulerEvent, now_ms: u32, sink: &mut impl EventSink) {
        match event {
            SchedulerEvent::Started(request) => {
                info!("Playing track {} at {}%", request.track, request.volume_percent);
                self.indicator.start_chime(now_ms);
                sink.emit(&AppEvent::PlaybackStarted(request));
            }
            SchedulerEvent::Suppressed(request) => {
                sink.emit(&AppEvent::PlaybackSuppressed(request));
            }
            SchedulerEvent::Unavailable(request) => {
                self.debug(
                    sink,
                    format_args!("Audio unavailable, track {} not played", request.track),
                );
            }
            SchedulerEvent::Finished(reason) => {
                sink.emit(&AppEvent::PlaybackFinished(reason));
            }
            SchedulerEvent::TimerFired(request) => {
                sink.emit(&AppEvent::Timer(TimerNotice::Completed {
                    track: request.track,
                }));
            }
        }
    }

    /// Take over the audio module for the alert. The tracker must already
    /// be latched.
    fn enter_emergency(
        &mut self,
        trigger: EmergencyTrigger,
        now_ms: u32,
        audio: &mut impl AudioPort,
        sink: &mut impl EventSink,
    ) {
        warn!("Emergency mode ON ({:?})", trigger);
        self.scheduler.cancel_playback();
        let settings = self.config.emergency;
        audio.set_volume(percent_to_native(settings.volume_percent));
        audio.loop_track(settings.track);
        self.indicator.set_alert(true, now_ms);
        sink.emit(&AppEvent::EmergencyActivated(trigger));
        self.emit_status(audio, sink);
    }

    /// Returns `false` when emergency was not active.
    fn exit_emergency(
        &mut self,
        reason: ClearReason,
        now_ms: u32,
        audio: &mut impl AudioPort,
        sink: &mut impl EventSink,
    ) -> bool {
        if !self.panic.deactivate() {
            return false;
        }
        info!("Emergency mode OFF ({:?})", reason);
        audio.stop();
        audio.set_volume(0);
        self.indicator.set_alert(false, now_ms);
        sink.emit(&AppEvent::EmergencyCleared(reason));
        self.emit_status(audio, sink);
        true
    }

    /// Validate, apply and persist a new configuration.
    fn commit(
        &mut self,
        candidate: DeviceConfig,
        store: &mut impl ConfigPort,
        sink: &mut impl EventSink,
    ) -> Result<(), CommandError> {
        candidate.validate()?;

        if candidate.input_mode != self.config.input_mode {
            info!("Input mode now {}", candidate.input_mode.name());
            self.buttons.reset();
            self.intercom.reset();
        }
        self.config = candidate;
        let persisted = store.write_config(&self.config);
        sink.emit(&AppEvent::Config(Box::new(self.config.clone())));
        persisted.map_err(CommandError::Persist)
    }

    fn emit_status(&self, audio: &impl AudioPort, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Status(Box::new(self.status_report(audio))));
    }

    fn debug(&self, sink: &mut impl EventSink, args: core::fmt::Arguments<'_>) {
        if !self.config.debug_enabled {
            return;
        }
        let mut text = DebugText::new();
        // Overlong lines are truncated.
        let _ = text.write_fmt(args);
        sink.emit(&AppEvent::Debug(text));
    }
}
