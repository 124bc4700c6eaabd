//! Request decoding and notification rendering.
//!
//! Wire format (topic + payload, as delivered by the transport):
//! ```text
//! doorbell/get/config            (empty)
//! doorbell/get/status            (empty)
//! doorbell/system/reboot         REBOOT
//! doorbell/simulate/<channel>    (empty)
//! doorbell/play/<track>          (empty)
//! doorbell/set/button/<channel>  {"track":3,"volume":70}
//! doorbell/set/config            {"wifi_ssid":"...","debug":true,...}
//! doorbell/set/emergency         {"track":99,"panic_threshold":5,...}
//! doorbell/timer/set             {"seconds":126,"track":1,"volume":100}
//! doorbell/timer/stop            (empty)
//! doorbell/emergency             ON | OFF
//! ```
//!
//! Requests are decoded exactly once into [`AppCommand`]. Outbound
//! [`AppEvent`]s are rendered into JSON [`Notification`]s; events that only
//! matter to the local log render to `None`.

use log::warn;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::app::commands::AppCommand;
use crate::app::events::{AppEvent, EmergencyTrigger, SessionTelemetry, StatusReport, TimerNotice};
use crate::config::{Channel, DeviceConfig};
use crate::emergency::ClearReason;
use crate::error::CommandError;
use crate::scheduler::PlayOrigin;

use super::channels::Notification;

pub const TOPIC_PREFIX: &str = "doorbell/";
pub const STATUS_TOPIC: &str = "doorbell/status";
pub const EVENT_TOPIC: &str = "doorbell/event";
pub const CONFIG_TOPIC: &str = "doorbell/config";
pub const ERROR_TOPIC: &str = "doorbell/error";
pub const DEBUG_TOPIC: &str = "doorbell/debug";

/// Hostname reported in the status record.
pub const HOSTNAME: &str = "doorbell";

/// Literal payload that confirms a reboot request.
pub const REBOOT_CONFIRMATION: &[u8] = b"REBOOT";

// ── Decoding ──────────────────────────────────────────────────

/// Decode one inbound request.
pub fn decode_request(topic: &str, payload: &[u8]) -> Result<AppCommand, CommandError> {
    let Some(name) = topic.strip_prefix(TOPIC_PREFIX) else {
        return Err(CommandError::InvalidRequest("topic outside doorbell/"));
    };
    let text = payload.trim_ascii();

    let cmd = match name {
        "get/config" => AppCommand::GetConfig,
        "get/status" => AppCommand::GetStatus,
        "system/reboot" => AppCommand::Reboot {
            confirmed: text == REBOOT_CONFIRMATION,
        },
        "timer/set" => AppCommand::TimerSet(parse(payload, "timer/set payload")?),
        "timer/stop" => AppCommand::TimerStop,
        "set/config" => AppCommand::SetDeviceConfig(parse(payload, "set/config payload")?),
        "set/emergency" => {
            AppCommand::SetEmergencyConfig(parse(payload, "set/emergency payload")?)
        }
        "emergency" => match text {
            b"ON" => AppCommand::Emergency(true),
            b"OFF" => AppCommand::Emergency(false),
            _ => return Err(CommandError::DecodeError("emergency payload must be ON or OFF")),
        },
        _ => return decode_parameterised(name, payload),
    };
    Ok(cmd)
}

/// Commands that carry an argument in the topic itself.
fn decode_parameterised(name: &str, payload: &[u8]) -> Result<AppCommand, CommandError> {
    if let Some(channel) = name.strip_prefix("simulate/") {
        let channel =
            Channel::from_name(channel).ok_or(CommandError::InvalidRequest("unknown channel"))?;
        return Ok(AppCommand::SimulatePress(channel));
    }
    if let Some(channel) = name.strip_prefix("set/button/") {
        let channel =
            Channel::from_name(channel).ok_or(CommandError::InvalidRequest("unknown channel"))?;
        let patch = parse(payload, "set/button payload")?;
        return Ok(AppCommand::SetChannelConfig { channel, patch });
    }
    if let Some(track) = name.strip_prefix("play/") {
        return match track.parse::<u16>() {
            Ok(track) if track > 0 => Ok(AppCommand::DirectPlay { track }),
            _ => Err(CommandError::InvalidRequest("play track must be 1–65535")),
        };
    }
    Err(CommandError::InvalidRequest("unknown command"))
}

fn parse<T: DeserializeOwned>(payload: &[u8], what: &'static str) -> Result<T, CommandError> {
    serde_json::from_slice(payload).map_err(|e| {
        warn!("Failed to parse {what}: {e}");
        CommandError::DecodeError(what)
    })
}

// ── Rendering ─────────────────────────────────────────────────

/// Render an event for the control channel.
pub fn encode_event(event: &AppEvent) -> Option<Notification> {
    let (topic, body, retain) = match event {
        AppEvent::Status(report) => (STATUS_TOPIC, status_body(report), true),
        AppEvent::Config(config) => (CONFIG_TOPIC, config_body(config), false),
        AppEvent::PlaybackStarted(request) => match request.origin {
            PlayOrigin::Channel(channel) => return text(EVENT_TOPIC, channel.name()),
            PlayOrigin::Direct | PlayOrigin::Timer => return None,
        },
        AppEvent::EmergencyActivated(trigger) => {
            let body = match trigger {
                EmergencyTrigger::Panic(t) => json!({
                    "emergency": true,
                    "trigger": "panic_button",
                    "presses": t.presses,
                    "window_ms": t.window_elapsed_ms,
                }),
                EmergencyTrigger::Command => json!({"emergency": true, "trigger": "command"}),
            };
            (STATUS_TOPIC, body, false)
        }
        AppEvent::EmergencyCleared(reason) => {
            let reason = match reason {
                ClearReason::Command => "command",
                ClearReason::Timeout => "timeout",
            };
            (STATUS_TOPIC, json!({"emergency": false, "reason": reason}), false)
        }
        AppEvent::Timer(notice) => (STATUS_TOPIC, timer_body(notice), false),
        AppEvent::CommandRejected(CommandError::Timer(e)) => (
            STATUS_TOPIC,
            json!({"timer": "error", "reason": e.reason()}),
            false,
        ),
        AppEvent::CommandRejected(e) => {
            let detail = format!("{e}");
            (ERROR_TOPIC, json!({"error": e.reason(), "detail": detail}), false)
        }
        AppEvent::Reboot { confirmed } => {
            let message = if *confirmed {
                "Rebooting device..."
            } else {
                "To reboot, send 'REBOOT' to doorbell/system/reboot"
            };
            (STATUS_TOPIC, json!({"system": "reboot", "message": message}), false)
        }
        AppEvent::Session(telemetry) => (DEBUG_TOPIC, session_body(telemetry), false),
        AppEvent::Debug(line) => return text(DEBUG_TOPIC, line.as_str()),
        AppEvent::Started
        | AppEvent::ChannelPressed { .. }
        | AppEvent::PlaybackSuppressed(_)
        | AppEvent::PlaybackFinished(_) => return None,
    };
    render(topic, &body, retain)
}

fn render(topic: &'static str, body: &Value, retain: bool) -> Option<Notification> {
    let rendered = body.to_string();
    match heapless::String::try_from(rendered.as_str()) {
        Ok(payload) => Some(Notification {
            topic,
            payload,
            retain,
        }),
        Err(()) => {
            warn!("Notification for {topic} too large ({} bytes)", rendered.len());
            None
        }
    }
}

fn text(topic: &'static str, line: &str) -> Option<Notification> {
    Some(Notification {
        topic,
        payload: heapless::String::try_from(line).ok()?,
        retain: false,
    })
}

fn status_body(report: &StatusReport) -> Value {
    let cfg = &report.config;
    json!({
        "status": "online",
        "hostname": HOSTNAME,
        "uptime_ms": report.uptime_ms,
        "mqtt_server": cfg.broker.server.as_str(),
        "mqtt_port": cfg.broker.port,
        "input_mode": cfg.input_mode.name(),
        "emergency": report.emergency_active,
        "playing": report.is_playing,
        "audio": report.audio_available,
        "timer": {
            "active": report.timer_active,
            "remaining_s": report.timer_remaining_ms.div_ceil(1000),
        },
        "config": settings_body(cfg),
    })
}

/// Channel, emergency and timing settings.
fn settings_body(cfg: &DeviceConfig) -> Value {
    json!({
        "downstairs_track": cfg.downstairs.track,
        "downstairs_volume": cfg.downstairs.volume_percent,
        "door_track": cfg.door.track,
        "door_volume": cfg.door.volume_percent,
        "emergency_track": cfg.emergency.track,
        "emergency_volume": cfg.emergency.volume_percent,
        "emergency_duration": cfg.emergency.duration_secs,
        "panic_threshold": cfg.emergency.panic_threshold,
        "panic_window": cfg.emergency.panic_window_secs,
        "button_cooldown_ms": cfg.button_cooldown_ms,
        "volume_reset_ms": cfg.volume_reset_ms,
        "debug": cfg.debug_enabled,
    })
}

/// Full configuration with passwords left out.
fn config_body(cfg: &DeviceConfig) -> Value {
    let mut body = settings_body(cfg);
    if let Value::Object(map) = &mut body {
        let network = json!({
            "wifi_ssid": cfg.wifi.ssid.as_str(),
            "backup_wifi_ssid": cfg.backup_wifi.ssid.as_str(),
            "mqtt_server": cfg.broker.server.as_str(),
            "mqtt_port": cfg.broker.port,
            "backup_mqtt_server": cfg.backup_broker.server.as_str(),
            "backup_mqtt_port": cfg.backup_broker.port,
            "mqtt_user": cfg.broker_user.as_str(),
            "input_mode": cfg.input_mode.name(),
        });
        if let Value::Object(extra) = network {
            map.extend(extra);
        }
    }
    body
}

fn timer_body(notice: &TimerNotice) -> Value {
    match notice {
        TimerNotice::Started {
            seconds,
            track,
            volume_percent,
        } => json!({
            "timer": "started",
            "seconds": seconds,
            "track": track,
            "volume": volume_percent,
        }),
        TimerNotice::Stopped { remaining_ms } => json!({
            "timer": "stopped",
            "remaining_s": remaining_ms.div_ceil(1000),
        }),
        TimerNotice::Completed { track } => json!({"timer": "completed", "track": track}),
    }
}

fn session_body(telemetry: &SessionTelemetry) -> Value {
    match telemetry {
        SessionTelemetry::Started { channel } => {
            json!({"status": "started", "channel": channel.name()})
        }
        SessionTelemetry::Sample(s) => json!({
            "delta": s.elapsed_ms,
            "adc1_v": s.v1,
            "adc2_v": s.v2,
        }),
        SessionTelemetry::Ended(summary) => json!({
            "status": "ended",
            "channel": summary.channel.name(),
            "duration_ms": summary.duration_ms,
            "max_v": summary.max_voltage,
            "samples": summary.samples,
            "accepted": summary.accepted,
        }),
    }
}
