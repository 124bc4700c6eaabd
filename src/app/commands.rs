//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (the control
//! channel, or a local test harness) that the
//! [`AppService`](super::service::AppService) interprets and acts upon.
//! The [`rpc::codec`](crate::rpc::codec) decodes raw requests into this
//! type once, at the boundary.

use serde::Deserialize;

use crate::config::{Channel, DeviceConfig, Host, InputMode, Secret, Ssid, UserName};

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Publish the configuration (secrets omitted).
    GetConfig,

    /// Publish the retained device status.
    GetStatus,

    /// Restart the device. Only a confirmed request restarts; an
    /// unconfirmed one answers with instructions.
    Reboot { confirmed: bool },

    /// Behave as if the channel had a validated press.
    SimulatePress(Channel),

    /// Play a track at full volume, subject to the cooldown.
    DirectPlay { track: u16 },

    /// Change one channel's track and/or volume.
    SetChannelConfig { channel: Channel, patch: ChannelPatch },

    /// Change network / control-channel credentials and device flags.
    SetDeviceConfig(DevicePatch),

    /// Change emergency and timing settings.
    SetEmergencyConfig(EmergencyPatch),

    /// Arm the deferred timer.
    TimerSet(TimerRequest),

    /// Disarm the deferred timer.
    TimerStop,

    /// Enter (`true`) or leave (`false`) emergency mode.
    Emergency(bool),
}

// ── Payloads ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ChannelPatch {
    pub track: Option<u16>,
    pub volume: Option<u8>,
}

impl ChannelPatch {
    pub fn apply(&self, config: &mut DeviceConfig, channel: Channel) {
        let settings = config.channel_mut(channel);
        if let Some(track) = self.track {
            settings.track = track;
        }
        if let Some(volume) = self.volume {
            settings.volume_percent = volume;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DevicePatch {
    pub wifi_ssid: Option<Ssid>,
    pub wifi_password: Option<Secret>,
    pub backup_wifi_ssid: Option<Ssid>,
    pub backup_wifi_password: Option<Secret>,
    pub mqtt_server: Option<Host>,
    pub mqtt_port: Option<u16>,
    pub backup_mqtt_server: Option<Host>,
    pub backup_mqtt_port: Option<u16>,
    pub mqtt_user: Option<UserName>,
    pub mqtt_password: Option<Secret>,
    pub debug: Option<bool>,
    pub input_mode: Option<InputMode>,
}

impl DevicePatch {
    pub fn apply(&self, config: &mut DeviceConfig) {
        fn set<T: Clone>(slot: &mut T, value: Option<&T>) {
            if let Some(v) = value {
                slot.clone_from(v);
            }
        }
        set(&mut config.wifi.ssid, self.wifi_ssid.as_ref());
        set(&mut config.wifi.password, self.wifi_password.as_ref());
        set(&mut config.backup_wifi.ssid, self.backup_wifi_ssid.as_ref());
        set(&mut config.backup_wifi.password, self.backup_wifi_password.as_ref());
        set(&mut config.broker.server, self.mqtt_server.as_ref());
        set(&mut config.broker.port, self.mqtt_port.as_ref());
        set(&mut config.backup_broker.server, self.backup_mqtt_server.as_ref());
        set(&mut config.backup_broker.port, self.backup_mqtt_port.as_ref());
        set(&mut config.broker_user, self.mqtt_user.as_ref());
        set(&mut config.broker_password, self.mqtt_password.as_ref());
        set(&mut config.debug_enabled, self.debug.as_ref());
        set(&mut config.input_mode, self.input_mode.as_ref());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct EmergencyPatch {
    pub track: Option<u16>,
    pub volume: Option<u8>,
    pub duration: Option<u16>,
    pub panic_threshold: Option<u8>,
    pub panic_window: Option<u16>,
    pub button_cooldown_ms: Option<u32>,
    pub volume_reset_ms: Option<u32>,
}

impl EmergencyPatch {
    pub fn apply(&self, config: &mut DeviceConfig) {
        let e = &mut config.emergency;
        if let Some(v) = self.track {
            e.track = v;
        }
        if let Some(v) = self.volume {
            e.volume_percent = v;
        }
        if let Some(v) = self.duration {
            e.duration_secs = v;
        }
        if let Some(v) = self.panic_threshold {
            e.panic_threshold = v;
        }
        if let Some(v) = self.panic_window {
            e.panic_window_secs = v;
        }
        if let Some(v) = self.button_cooldown_ms {
            config.button_cooldown_ms = v;
        }
        if let Some(v) = self.volume_reset_ms {
            config.volume_reset_ms = v;
        }
    }
}

/// `timer/set` payload; every field is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TimerRequest {
    pub seconds: i64,
    pub track: u16,
    pub volume: u8,
}
