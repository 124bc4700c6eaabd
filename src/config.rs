//! Device configuration.
//!
//! All tunable parameters for the doorbell: network and control-channel
//! credentials, per-channel chime settings, emergency behaviour and the
//! playback timing windows. Persisted through
//! [`ConfigPort`](crate::app::ports::ConfigPort) and mutated only by the
//! command router.

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{ConfigError, ConfigPort};

/// Highest volume step the audio module accepts.
pub const NATIVE_VOLUME_MAX: u8 = 30;

pub type Ssid = heapless::String<32>;
pub type Secret = heapless::String<64>;
pub type Host = heapless::String<64>;
pub type UserName = heapless::String<32>;

// ── Channels ──────────────────────────────────────────────────

/// One of the two physical input points.
///
/// `Door` is the second channel: it wins analog attribution ties and is the
/// only channel the panic detector counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Downstairs,
    Door,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Downstairs, Channel::Door];

    pub const fn index(self) -> usize {
        match self {
            Self::Downstairs => 0,
            Self::Door => 1,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Downstairs => "downstairs",
            Self::Door => "door",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "downstairs" => Some(Self::Downstairs),
            "door" => Some(Self::Door),
            _ => None,
        }
    }
}

/// How the two channels are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Two push buttons on digital inputs.
    Digital,
    /// Two sense points on the building intercom line, read through the ADC.
    Analog,
}

impl InputMode {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Digital => "digital",
            Self::Analog => "analog",
        }
    }
}

// ── Records ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkCredentials {
    pub ssid: Ssid,
    pub password: Secret,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerEndpoint {
    pub server: Host,
    pub port: u16,
}

/// Track and volume for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSettings {
    pub track: u16,
    /// 0–100; converted with [`percent_to_native`] at the point of use.
    pub volume_percent: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencySettings {
    pub track: u16,
    pub volume_percent: u8,
    /// Auto-clear after this many seconds; 0 keeps the alarm until cleared.
    pub duration_secs: u16,
    /// Door presses needed inside the window; 0 disables the panic detector.
    pub panic_threshold: u8,
    pub panic_window_secs: u16,
}

/// Core device configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    // --- Network ---
    pub wifi: NetworkCredentials,
    pub backup_wifi: NetworkCredentials,

    // --- Control channel ---
    pub broker: BrokerEndpoint,
    pub backup_broker: BrokerEndpoint,
    pub broker_user: UserName,
    pub broker_password: Secret,

    // --- Chimes ---
    pub downstairs: ChannelSettings,
    pub door: ChannelSettings,
    pub emergency: EmergencySettings,

    // --- Timing ---
    /// Minimum gap between two chime starts while the first is still playing.
    pub button_cooldown_ms: u32,
    /// Volume is forced back to 0 this long after a chime starts.
    pub volume_reset_ms: u32,

    // --- Device ---
    pub debug_enabled: bool,
    pub input_mode: InputMode,
}

/// Build-time default for a bounded string field.
fn build_default<const N: usize>(value: Option<&'static str>) -> heapless::String<N> {
    value
        .and_then(|v| heapless::String::try_from(v).ok())
        .unwrap_or_default()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            wifi: NetworkCredentials {
                ssid: build_default(option_env!("DOORBELL_WIFI_SSID")),
                password: build_default(option_env!("DOORBELL_WIFI_PASSWORD")),
            },
            backup_wifi: NetworkCredentials {
                ssid: build_default(option_env!("DOORBELL_BACKUP_WIFI_SSID")),
                password: build_default(option_env!("DOORBELL_BACKUP_WIFI_PASSWORD")),
            },
            broker: BrokerEndpoint {
                server: build_default(option_env!("DOORBELL_MQTT_SERVER")),
                port: 1883,
            },
            backup_broker: BrokerEndpoint {
                server: build_default(option_env!("DOORBELL_BACKUP_MQTT_SERVER")),
                port: 1883,
            },
            broker_user: build_default(option_env!("DOORBELL_MQTT_USER")),
            broker_password: build_default(option_env!("DOORBELL_MQTT_PASSWORD")),

            downstairs: ChannelSettings {
                track: 1,
                volume_percent: 50,
            },
            door: ChannelSettings {
                track: 2,
                volume_percent: 50,
            },
            emergency: EmergencySettings {
                track: 99,
                volume_percent: 100,
                duration_secs: 60,
                panic_threshold: 5,
                panic_window_secs: 20,
            },

            button_cooldown_ms: 15_000,
            volume_reset_ms: 60_000,

            debug_enabled: false,
            input_mode: InputMode::Digital,
        }
    }
}

impl DeviceConfig {
    pub fn channel(&self, channel: Channel) -> &ChannelSettings {
        match channel {
            Channel::Downstairs => &self.downstairs,
            Channel::Door => &self.door,
        }
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut ChannelSettings {
        match channel {
            Channel::Downstairs => &mut self.downstairs,
            Channel::Door => &mut self.door,
        }
    }

    pub fn panic_window_ms(&self) -> u32 {
        u32::from(self.emergency.panic_window_secs) * 1000
    }

    pub fn panic_detector_enabled(&self) -> bool {
        self.emergency.panic_threshold > 0
    }

    /// Range-check every field. Out-of-range values are rejected, never
    /// clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for channel in Channel::ALL {
            let settings = self.channel(channel);
            if settings.track == 0 {
                return Err(ConfigError::ValidationFailed("channel track must be ≥ 1"));
            }
            if settings.volume_percent > 100 {
                return Err(ConfigError::ValidationFailed(
                    "channel volume must be 0–100",
                ));
            }
        }
        if self.emergency.track == 0 {
            return Err(ConfigError::ValidationFailed(
                "emergency track must be ≥ 1",
            ));
        }
        if self.emergency.volume_percent > 100 {
            return Err(ConfigError::ValidationFailed(
                "emergency volume must be 0–100",
            ));
        }
        if self.panic_detector_enabled() && self.emergency.panic_window_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "panic_window must be ≥ 1 s while panic detection is enabled",
            ));
        }
        if self.button_cooldown_ms > 600_000 {
            return Err(ConfigError::ValidationFailed(
                "button_cooldown_ms must be 0–600000",
            ));
        }
        if !(1_000..=600_000).contains(&self.volume_reset_ms) {
            return Err(ConfigError::ValidationFailed(
                "volume_reset_ms must be 1000–600000",
            ));
        }
        for endpoint in [&self.broker, &self.backup_broker] {
            if !endpoint.server.is_empty() && endpoint.port == 0 {
                return Err(ConfigError::ValidationFailed(
                    "mqtt_port must be non-zero when a server is set",
                ));
            }
        }
        Ok(())
    }
}

/// Convert a 0–100 volume percentage to the audio module's native steps,
/// rounding to nearest. Values above 100 saturate.
pub fn percent_to_native(percent: u8) -> u8 {
    let percent = u32::from(percent.min(100));
    ((percent * u32::from(NATIVE_VOLUME_MAX) + 50) / 100) as u8
}

/// Load the stored configuration, falling back to defaults.
///
/// With `factory_reset` the store is erased first. Whenever defaults are
/// used they are persisted immediately so the next boot finds a valid
/// marker.
pub fn load_or_init<C: ConfigPort>(store: &mut C, factory_reset: bool) -> DeviceConfig {
    if factory_reset {
        warn!("Config: factory reset requested, erasing store");
        if let Err(e) = store.erase_all() {
            error!("Config: erase failed: {e}");
        }
    }

    if store.read_validity_marker() {
        match store.read_config() {
            Ok(cfg) => match cfg.validate() {
                Ok(()) => {
                    info!("Config: loaded from store");
                    return cfg;
                }
                Err(e) => warn!("Config: stored record rejected ({e}), using defaults"),
            },
            Err(e) => warn!("Config: stored record unreadable ({e}), using defaults"),
        }
    } else {
        info!("Config: no validity marker, populating defaults");
    }

    let cfg = DeviceConfig::default();
    if let Err(e) = store.write_config(&cfg) {
        error!("Config: failed to persist defaults: {e}");
    }
    cfg
}
