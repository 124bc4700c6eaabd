//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (inputs, audio, indicator, event sinks, storage)
//! implement these traits. The [`AppService`](super::service::AppService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.

use crate::config::DeviceConfig;

// ───────────────────────────────────────────────────────────────
// Input port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Raw samples for the two channels.
pub trait InputPort {
    /// Digital levels, `true` = pressed, indexed by
    /// [`Channel::index`](crate::config::Channel::index).
    fn read_levels(&mut self) -> [bool; 2];

    /// Intercom sense voltages `(v1, v2)` in volts.
    fn read_voltages(&mut self) -> (f32, f32);
}

// ───────────────────────────────────────────────────────────────
// Audio port (driven adapter: domain → audio module)
// ───────────────────────────────────────────────────────────────

/// The playback device. Volumes are native steps (0–30); the domain
/// converts from percentages before calling.
pub trait AudioPort {
    fn set_volume(&mut self, native: u8);

    fn play(&mut self, track: u16);

    /// Play `track` repeatedly until [`stop`](Self::stop).
    fn loop_track(&mut self, track: u16);

    fn stop(&mut self);

    /// BUSY line state: `Some(true)` while playing, `None` when not wired.
    fn is_busy(&mut self) -> Option<bool>;

    /// `false` once start-up detection gave up; commands are then ignored.
    fn is_available(&self) -> bool;

    /// Give the adapter a chance to flush paced commands.
    fn poll(&mut self, _now_ms: u32) {}
}

// ───────────────────────────────────────────────────────────────
// Indicator port (driven adapter: domain → status LED)
// ───────────────────────────────────────────────────────────────

pub trait IndicatorPort {
    fn set_indicator(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / notifications)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go (serial log, outbound
/// notification queue, test recorder). Delivery is fire-and-forget.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Persistent configuration record guarded by a validity marker.
///
/// Implementations MUST validate before persisting and reject invalid
/// records with [`ConfigError::ValidationFailed`] rather than clamping.
pub trait ConfigPort {
    /// `true` when the marker byte says a record has been written.
    fn read_validity_marker(&self) -> bool;

    fn read_config(&self) -> Result<DeviceConfig, ConfigError>;

    /// Validate, then write marker and record.
    fn write_config(&mut self, config: &DeviceConfig) -> Result<(), ConfigError>;

    /// Wipe the whole region, marker included.
    fn erase_all(&mut self) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No record behind the marker.
    NotFound,
    /// Stored record failed the layout or deserialization check.
    Corrupted,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Encoded record does not fit the reserved region.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// Deliver each event to both sinks, in order.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &super::events::AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

impl<T: EventSink + ?Sized> EventSink for &mut T {
    fn emit(&mut self, event: &super::events::AppEvent) {
        (**self).emit(event);
    }
}
