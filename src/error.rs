//! Error types for the doorbell firmware.
//!
//! Every variant is `Copy` so errors travel through the command router and
//! into [`AppEvent`](crate::app::events::AppEvent)s without allocation.
//! Storage errors live next to the port they belong to
//! ([`ConfigError`](crate::app::ports::ConfigError)).

use core::fmt;

use crate::app::ports::ConfigError;

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

/// Why an inbound control request was not carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command name, or a value that decoded but is out of range.
    /// The `&'static str` names the offending topic or field.
    InvalidRequest(&'static str),
    /// A structured payload could not be parsed.
    DecodeError(&'static str),
    /// Deferred-timer operation rejected.
    Timer(TimerError),
    /// The change was applied but could not be persisted.
    Persist(ConfigError),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest(what) => write!(f, "invalid request: {what}"),
            Self::DecodeError(what) => write!(f, "decode error: {what}"),
            Self::Timer(e) => write!(f, "timer: {e}"),
            Self::Persist(e) => write!(f, "persist: {e}"),
        }
    }
}

impl From<TimerError> for CommandError {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

impl From<ConfigError> for CommandError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(what) => Self::InvalidRequest(what),
            other => Self::Persist(other),
        }
    }
}

impl CommandError {
    /// Machine-readable reason code carried in notifications.
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::DecodeError(_) => "decode_error",
            Self::Timer(e) => e.reason(),
            Self::Persist(_) => "persist_failed",
        }
    }
}

// ---------------------------------------------------------------------------
// Deferred timer errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// A timer is already armed; it must be stopped first.
    TimerAlreadyActive,
    /// `stop` was requested with no timer armed.
    NoActiveTimer,
    /// Requested duration was zero or negative.
    InvalidDuration,
}

impl TimerError {
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::TimerAlreadyActive => "timer_already_active",
            Self::NoActiveTimer => "no_active_timer",
            Self::InvalidDuration => "invalid_duration",
        }
    }
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimerAlreadyActive => write!(f, "timer already active"),
            Self::NoActiveTimer => write!(f, "no active timer"),
            Self::InvalidDuration => write!(f, "duration must be positive"),
        }
    }
}

// ---------------------------------------------------------------------------
// Audio module errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioError {
    /// The serial link rejected a write or read.
    Serial,
    /// No valid reply frame arrived within the response window.
    NotResponding,
    /// The outbound frame queue is full.
    QueueFull,
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => write!(f, "serial link error"),
            Self::NotResponding => write!(f, "audio module not responding"),
            Self::QueueFull => write!(f, "audio command queue full"),
        }
    }
}
