//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them: log to serial, or render a notification
//! for the control channel (see [`rpc::codec`](crate::rpc::codec)).

use crate::config::{Channel, DeviceConfig};
use crate::emergency::{ClearReason, PanicTrigger};
use crate::error::CommandError;
use crate::scheduler::{FinishReason, PlayRequest};
use crate::sensors::intercom::{SessionSummary, VoltageSample};

/// Free-form debug line, only emitted while debug is enabled.
pub type DebugText = heapless::String<128>;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The application service has started.
    Started,

    /// Device status snapshot (retained on the control channel).
    Status(Box<StatusReport>),

    /// Current configuration, after a change or on request.
    Config(Box<DeviceConfig>),

    /// A channel produced a validated press, or one was simulated.
    ChannelPressed { channel: Channel, simulated: bool },

    /// A chime started playing.
    PlaybackStarted(PlayRequest),

    /// A request was dropped by the cooldown or emergency mode.
    PlaybackSuppressed(PlayRequest),

    /// Playback ended and the volume was reset.
    PlaybackFinished(FinishReason),

    EmergencyActivated(EmergencyTrigger),

    EmergencyCleared(ClearReason),

    Timer(TimerNotice),

    /// A control request was refused.
    CommandRejected(CommandError),

    /// Reboot requested; `confirmed == false` means instructions were sent
    /// instead.
    Reboot { confirmed: bool },

    /// Analog session telemetry (debug only).
    Session(SessionTelemetry),

    Debug(DebugText),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyTrigger {
    Panic(PanicTrigger),
    Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerNotice {
    Started {
        seconds: i64,
        track: u16,
        volume_percent: u8,
    },
    Stopped {
        remaining_ms: u32,
    },
    Completed {
        track: u16,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionTelemetry {
    Started { channel: Channel },
    Sample(VoltageSample),
    Ended(SessionSummary),
}

/// A point-in-time status snapshot suitable for logging or transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub uptime_ms: u32,
    pub emergency_active: bool,
    pub is_playing: bool,
    pub audio_available: bool,
    pub timer_active: bool,
    pub timer_remaining_ms: u32,
    pub config: DeviceConfig,
}
