//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! The notification sink renders the same events for the control channel.

use log::{debug, info, warn};

use crate::app::events::{AppEvent, EmergencyTrigger, SessionTelemetry, TimerNotice};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => info!("START | doorbell core up"),
            AppEvent::Status(s) => {
                info!(
                    "STATUS | up={}s | emergency={} | playing={} | audio={} | timer={} ({} ms left) | mode={}",
                    s.uptime_ms / 1000,
                    s.emergency_active,
                    s.is_playing,
                    if s.audio_available { "ok" } else { "missing" },
                    s.timer_active,
                    s.timer_remaining_ms,
                    s.config.input_mode.name(),
                );
            }
            AppEvent::Config(c) => {
                info!(
                    "CONFIG | downstairs={}@{}% door={}@{}% | emergency={}@{}% {}s panic={}/{}s | cooldown={}ms reset={}ms | debug={}",
                    c.downstairs.track,
                    c.downstairs.volume_percent,
                    c.door.track,
                    c.door.volume_percent,
                    c.emergency.track,
                    c.emergency.volume_percent,
                    c.emergency.duration_secs,
                    c.emergency.panic_threshold,
                    c.emergency.panic_window_secs,
                    c.button_cooldown_ms,
                    c.volume_reset_ms,
                    c.debug_enabled,
                );
            }
            AppEvent::ChannelPressed { channel, simulated } => {
                info!(
                    "PRESS | {}{}",
                    channel.name(),
                    if *simulated { " (simulated)" } else { "" }
                );
            }
            AppEvent::PlaybackStarted(req) => {
                info!(
                    "PLAY | track {} at {}% ({:?})",
                    req.track, req.volume_percent, req.origin
                );
            }
            AppEvent::PlaybackSuppressed(req) => {
                info!("PLAY | track {} suppressed ({:?})", req.track, req.origin);
            }
            AppEvent::PlaybackFinished(reason) => info!("PLAY | finished ({reason:?})"),
            AppEvent::EmergencyActivated(EmergencyTrigger::Panic(t)) => {
                warn!(
                    "EMERGENCY | panic: {} presses in {} ms",
                    t.presses, t.window_elapsed_ms
                );
            }
            AppEvent::EmergencyActivated(EmergencyTrigger::Command) => {
                warn!("EMERGENCY | activated by command");
            }
            AppEvent::EmergencyCleared(reason) => info!("EMERGENCY | cleared ({reason:?})"),
            AppEvent::Timer(TimerNotice::Started { seconds, track, volume_percent }) => {
                info!("TIMER | {seconds}s -> track {track} at {volume_percent}%");
            }
            AppEvent::Timer(TimerNotice::Stopped { remaining_ms }) => {
                info!("TIMER | stopped with {remaining_ms} ms left");
            }
            AppEvent::Timer(TimerNotice::Completed { track }) => {
                info!("TIMER | completed, track {track}");
            }
            AppEvent::CommandRejected(e) => warn!("REJECT | {e}"),
            AppEvent::Reboot { confirmed: true } => warn!("REBOOT | confirmed"),
            AppEvent::Reboot { confirmed: false } => info!("REBOOT | awaiting confirmation"),
            AppEvent::Session(SessionTelemetry::Started { channel }) => {
                debug!("SESSION | started on {}", channel.name());
            }
            AppEvent::Session(SessionTelemetry::Sample(s)) => {
                debug!("SESSION | +{}ms v1={:.2} v2={:.2}", s.elapsed_ms, s.v1, s.v2);
            }
            AppEvent::Session(SessionTelemetry::Ended(s)) => {
                info!(
                    "SESSION | {} {} ms, peak {:.2} V, {} samples, {} ({:?})",
                    s.channel.name(),
                    s.duration_ms,
                    s.max_voltage,
                    s.samples,
                    if s.accepted { "accepted" } else { "rejected" },
                    s.reason,
                );
            }
            AppEvent::Debug(line) => debug!("DEBUG | {line}"),
        }
    }
}
