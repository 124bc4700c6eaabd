//! Integration tests for the AppService → scheduler → audio pipeline.
//!
//! These run on the host (x86_64) and drive the service tick by tick with
//! mock adapters, checking the audio calls and events a real device would
//! see.

use crate::mock_hw::{press, run, AudioCall, LogSink, MockHardware, MockStore};

use doorbell::app::commands::{AppCommand, ChannelPatch, TimerRequest};
use doorbell::app::events::{AppEvent, EmergencyTrigger, SessionTelemetry, TimerNotice};
use doorbell::app::service::AppService;
use doorbell::config::{Channel, DeviceConfig, InputMode};
use doorbell::emergency::ClearReason;
use doorbell::error::{CommandError, TimerError};
use doorbell::scheduler::{FinishReason, PlayOrigin};

fn make_app(config: DeviceConfig) -> (AppService, MockHardware, LogSink) {
    let mut app = AppService::new(config);
    let mut hw = MockHardware::new();
    let mut sink = LogSink::new();
    app.start(0, &mut hw, &mut sink);
    (app, hw, sink)
}

fn started(sink: &LogSink) -> usize {
    sink.count(|e| matches!(e, AppEvent::PlaybackStarted(_)))
}

// ── Start-up ──────────────────────────────────────────────────

#[test]
fn start_mutes_audio_and_announces() {
    let (_app, hw, sink) = make_app(DeviceConfig::default());
    assert_eq!(hw.calls, vec![AudioCall::SetVolume(0)]);
    assert!(matches!(sink.events[0], AppEvent::Started));
    assert!(matches!(sink.events[1], AppEvent::Status(_)));
}

// ── Digital presses ───────────────────────────────────────────

#[test]
fn held_press_plays_channel_chime_once() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    hw.calls.clear();

    press(&mut app, &mut hw, &mut sink, Channel::Door, 0, 600, 100);

    assert_eq!(hw.calls, vec![AudioCall::SetVolume(15), AudioCall::Play(2)]);
    assert_eq!(started(&sink), 1);
    assert!(hw.indicator, "indicator lit after a chime starts");
}

#[test]
fn short_press_never_validates() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    press(&mut app, &mut hw, &mut sink, Channel::Downstairs, 0, 150, 100);
    assert!(hw.plays().is_empty());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::ChannelPressed { .. })), 0);
}

#[test]
fn press_during_cooldown_is_dropped() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    let t = press(&mut app, &mut hw, &mut sink, Channel::Downstairs, 0, 250, 100);
    press(&mut app, &mut hw, &mut sink, Channel::Door, t, 250, 100);

    assert_eq!(hw.plays(), vec![1]);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::PlaybackSuppressed(_))), 1);
}

#[test]
fn cooldown_lapses_while_still_playing() {
    let mut config = DeviceConfig::default();
    config.button_cooldown_ms = 1_000;
    let (mut app, mut hw, mut sink) = make_app(config);
    hw.busy = None;

    press(&mut app, &mut hw, &mut sink, Channel::Downstairs, 0, 250, 100);
    press(&mut app, &mut hw, &mut sink, Channel::Door, 1_500, 250, 100);

    assert!(app.scheduler().is_playing());
    assert_eq!(hw.plays(), vec![1, 2]);
}

#[test]
fn busy_idle_edge_ends_playback() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    let t = press(&mut app, &mut hw, &mut sink, Channel::Door, 0, 250, 50);

    hw.busy = Some(true);
    run(&mut app, &mut hw, &mut sink, t, t + 500, 10);
    assert!(app.scheduler().is_playing());

    hw.busy = Some(false);
    app.tick(t + 500, &mut hw, &mut sink);
    assert!(!app.scheduler().is_playing());
    assert_eq!(hw.last_volume(), Some(0));
    assert_eq!(
        sink.count(|e| *e == AppEvent::PlaybackFinished(FinishReason::BusyIdle)),
        1
    );
}

#[test]
fn volume_reset_deadline_without_busy_line() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    hw.busy = None;
    let t = press(&mut app, &mut hw, &mut sink, Channel::Door, 0, 250, 50);

    run(&mut app, &mut hw, &mut sink, t, 59_000, 100);
    assert!(app.scheduler().is_playing());
    assert!(!hw.indicator, "chime indicator times out after 5 s");

    run(&mut app, &mut hw, &mut sink, 59_000, 61_000, 100);
    assert!(!app.scheduler().is_playing());
    assert_eq!(hw.last_volume(), Some(0));
    assert_eq!(
        sink.count(|e| *e == AppEvent::PlaybackFinished(FinishReason::VolumeReset)),
        1
    );
}

#[test]
fn unavailable_audio_skips_playback() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    hw.available = false;
    press(&mut app, &mut hw, &mut sink, Channel::Door, 0, 250, 50);

    assert!(hw.plays().is_empty());
    assert_eq!(started(&sink), 0);
    assert!(!app.scheduler().is_playing());
}

// ── Panic detection and emergency ─────────────────────────────

fn rapid_door_presses(
    app: &mut AppService,
    hw: &mut MockHardware,
    sink: &mut LogSink,
    start: u32,
    count: usize,
) -> u32 {
    let mut t = start;
    for _ in 0..count {
        t = press(app, hw, sink, Channel::Door, t, 250, 150);
    }
    t
}

#[test]
fn rapid_door_presses_latch_emergency() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    let t = rapid_door_presses(&mut app, &mut hw, &mut sink, 0, 5);

    assert!(app.is_emergency_active());
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::EmergencyActivated(EmergencyTrigger::Panic(p)) if p.presses == 5)),
        1
    );
    let tail = &hw.calls[hw.calls.len() - 2..];
    assert_eq!(tail, &[AudioCall::SetVolume(30), AudioCall::Loop(99)]);
    assert_eq!(app.panic_tracker().press_count(), 0);

    // Further presses neither chime nor re-trigger.
    let plays = hw.plays().len();
    rapid_door_presses(&mut app, &mut hw, &mut sink, t, 5);
    assert_eq!(hw.plays().len(), plays);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::EmergencyActivated(_))), 1);
}

#[test]
fn downstairs_presses_never_count_toward_panic() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    let mut t = 0;
    for _ in 0..6 {
        t = press(&mut app, &mut hw, &mut sink, Channel::Downstairs, t, 250, 150);
    }
    assert!(!app.is_emergency_active());
}

#[test]
fn zero_threshold_disables_panic_detector() {
    let mut config = DeviceConfig::default();
    config.emergency.panic_threshold = 0;
    let (mut app, mut hw, mut sink) = make_app(config);
    rapid_door_presses(&mut app, &mut hw, &mut sink, 0, 8);
    assert!(!app.is_emergency_active());
}

#[test]
fn emergency_indicator_flashes() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    let mut store = MockStore::new();
    app.handle_command(AppCommand::Emergency(true), 0, &mut hw, &mut store, &mut sink)
        .unwrap();

    let mut levels = Vec::new();
    for t in (0..1_000).step_by(100) {
        app.tick(t, &mut hw, &mut sink);
        levels.push(hw.indicator);
    }
    assert!(levels.contains(&true));
    assert!(levels.contains(&false));
}

#[test]
fn emergency_off_stops_then_mutes() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    let mut store = MockStore::new();
    app.handle_command(AppCommand::Emergency(true), 10, &mut hw, &mut store, &mut sink)
        .unwrap();
    assert_eq!(hw.calls.last(), Some(&AudioCall::Loop(99)));

    app.handle_command(AppCommand::Emergency(false), 20, &mut hw, &mut store, &mut sink)
        .unwrap();
    let tail = &hw.calls[hw.calls.len() - 2..];
    assert_eq!(tail, &[AudioCall::Stop, AudioCall::SetVolume(0)]);
    assert_eq!(
        sink.count(|e| *e == AppEvent::EmergencyCleared(ClearReason::Command)),
        1
    );
    assert!(!app.is_emergency_active());
}

#[test]
fn emergency_auto_clears_after_duration() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    let mut store = MockStore::new();
    app.handle_command(AppCommand::Emergency(true), 0, &mut hw, &mut store, &mut sink)
        .unwrap();

    run(&mut app, &mut hw, &mut sink, 0, 59_900, 100);
    assert!(app.is_emergency_active());
    run(&mut app, &mut hw, &mut sink, 59_900, 60_100, 100);
    assert!(!app.is_emergency_active());
    assert_eq!(
        sink.count(|e| *e == AppEvent::EmergencyCleared(ClearReason::Timeout)),
        1
    );
}

#[test]
fn chimes_are_suppressed_during_emergency() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    let mut store = MockStore::new();
    app.handle_command(AppCommand::Emergency(true), 0, &mut hw, &mut store, &mut sink)
        .unwrap();
    app.handle_command(AppCommand::DirectPlay { track: 4 }, 10, &mut hw, &mut store, &mut sink)
        .unwrap();
    app.tick(20, &mut hw, &mut sink);

    assert!(hw.plays().is_empty());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::PlaybackSuppressed(_))), 1);
}

// ── Analog intercom ───────────────────────────────────────────

#[test]
fn intercom_session_survives_short_dropout() {
    let mut config = DeviceConfig::default();
    config.input_mode = InputMode::Analog;
    config.debug_enabled = true;
    let (mut app, mut hw, mut sink) = make_app(config);

    for t in 0..600 {
        let v2 = match t {
            0..250 => 3.2,
            250..255 => 0.0,
            255..355 => 3.1,
            _ => 0.0,
        };
        hw.voltages = (0.0, v2);
        app.tick(t, &mut hw, &mut sink);
    }

    let ended: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Session(SessionTelemetry::Ended(summary)) => Some(*summary),
            _ => None,
        })
        .collect();
    assert_eq!(ended.len(), 1);
    assert_eq!(ended[0].channel, Channel::Door);
    assert!(ended[0].duration_ms >= 350, "got {} ms", ended[0].duration_ms);
    assert!(ended[0].accepted);
    assert_eq!(hw.plays(), vec![2]);
}

#[test]
fn analog_mode_ignores_button_levels() {
    let mut config = DeviceConfig::default();
    config.input_mode = InputMode::Analog;
    let (mut app, mut hw, mut sink) = make_app(config);
    press(&mut app, &mut hw, &mut sink, Channel::Door, 0, 400, 50);
    assert!(hw.plays().is_empty());
}

// ── Deferred timer ────────────────────────────────────────────

#[test]
fn timer_set_twice_keeps_first() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    let mut store = MockStore::new();
    let request = TimerRequest {
        seconds: 126,
        track: 1,
        volume: 100,
    };

    app.handle_command(AppCommand::TimerSet(request), 1_000, &mut hw, &mut store, &mut sink)
        .unwrap();
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::Timer(TimerNotice::Started { seconds: 126, .. }))),
        1
    );

    let again = app.handle_command(
        AppCommand::TimerSet(TimerRequest { seconds: 5, ..request }),
        2_000,
        &mut hw,
        &mut store,
        &mut sink,
    );
    assert_eq!(again, Err(CommandError::Timer(TimerError::TimerAlreadyActive)));
    let timer = app.scheduler().timer();
    assert_eq!(timer.start_ms, 1_000);
    assert_eq!(timer.duration_ms, 126_000);
}

#[test]
fn timer_fires_and_plays() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    let mut store = MockStore::new();
    let request = TimerRequest {
        seconds: 2,
        track: 7,
        volume: 100,
    };
    app.handle_command(AppCommand::TimerSet(request), 0, &mut hw, &mut store, &mut sink)
        .unwrap();

    run(&mut app, &mut hw, &mut sink, 0, 2_100, 50);
    assert_eq!(hw.plays(), vec![7]);
    assert!(hw.calls.contains(&AudioCall::SetVolume(30)));
    assert_eq!(
        sink.count(|e| *e == AppEvent::Timer(TimerNotice::Completed { track: 7 })),
        1
    );
    assert!(sink.events.iter().any(
        |e| matches!(e, AppEvent::PlaybackStarted(r) if r.origin == PlayOrigin::Timer)
    ));
    assert!(!app.scheduler().timer().active);
}

#[test]
fn timer_stop_without_timer_fails() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    let mut store = MockStore::new();
    assert_eq!(
        app.handle_command(AppCommand::TimerStop, 0, &mut hw, &mut store, &mut sink),
        Err(CommandError::Timer(TimerError::NoActiveTimer))
    );
}

#[test]
fn non_positive_timer_is_rejected() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    let mut store = MockStore::new();
    for seconds in [0, -5] {
        let result = app.handle_command(
            AppCommand::TimerSet(TimerRequest {
                seconds,
                track: 1,
                volume: 50,
            }),
            0,
            &mut hw,
            &mut store,
            &mut sink,
        );
        assert_eq!(result, Err(CommandError::Timer(TimerError::InvalidDuration)));
    }
    assert!(!app.scheduler().timer().active);
}

#[test]
fn bad_duration_is_reported_before_bad_track_or_volume() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    let mut store = MockStore::new();
    let result = app.handle_command(
        AppCommand::TimerSet(TimerRequest {
            seconds: 0,
            track: 0,
            volume: 200,
        }),
        0,
        &mut hw,
        &mut store,
        &mut sink,
    );
    assert_eq!(result, Err(CommandError::Timer(TimerError::InvalidDuration)));

    let result = app.handle_command(
        AppCommand::TimerSet(TimerRequest {
            seconds: 10,
            track: 0,
            volume: 50,
        }),
        0,
        &mut hw,
        &mut store,
        &mut sink,
    );
    assert!(matches!(result, Err(CommandError::InvalidRequest(_))));
    assert!(!app.scheduler().timer().active);
}

// ── Configuration ─────────────────────────────────────────────

#[test]
fn channel_config_is_persisted_and_reported() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    let mut store = MockStore::new();
    let patch = ChannelPatch {
        track: Some(7),
        volume: Some(80),
    };
    app.handle_command(
        AppCommand::SetChannelConfig {
            channel: Channel::Door,
            patch,
        },
        0,
        &mut hw,
        &mut store,
        &mut sink,
    )
    .unwrap();

    assert_eq!(store.writes, 1);
    let stored = store.record.as_ref().unwrap();
    assert_eq!(stored.door.track, 7);
    assert_eq!(stored.door.volume_percent, 80);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Config(_))), 1);

    // The new settings drive the next chime: 80 % → 24.
    hw.calls.clear();
    press(&mut app, &mut hw, &mut sink, Channel::Door, 0, 250, 50);
    assert_eq!(hw.calls, vec![AudioCall::SetVolume(24), AudioCall::Play(7)]);
}

#[test]
fn out_of_range_config_changes_nothing() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    let mut store = MockStore::new();
    let result = app.handle_command(
        AppCommand::SetChannelConfig {
            channel: Channel::Downstairs,
            patch: ChannelPatch {
                track: None,
                volume: Some(150),
            },
        },
        0,
        &mut hw,
        &mut store,
        &mut sink,
    );
    assert!(matches!(result, Err(CommandError::InvalidRequest(_))));
    assert_eq!(app.config(), &DeviceConfig::default());
    assert_eq!(store.writes, 0);
}

#[test]
fn persist_failure_keeps_change_in_memory() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    let mut store = MockStore::new();
    store.fail_writes = true;
    let result = app.handle_command(
        AppCommand::SetChannelConfig {
            channel: Channel::Downstairs,
            patch: ChannelPatch {
                track: Some(3),
                volume: None,
            },
        },
        0,
        &mut hw,
        &mut store,
        &mut sink,
    );
    assert!(matches!(result, Err(CommandError::Persist(_))));
    assert_eq!(app.config().downstairs.track, 3);
}

#[test]
fn simulated_press_behaves_like_a_real_one() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    let mut store = MockStore::new();
    app.handle_command(
        AppCommand::SimulatePress(Channel::Downstairs),
        0,
        &mut hw,
        &mut store,
        &mut sink,
    )
    .unwrap();
    app.tick(1, &mut hw, &mut sink);

    assert_eq!(hw.plays(), vec![1]);
    assert_eq!(
        sink.count(|e| *e == AppEvent::ChannelPressed { channel: Channel::Downstairs, simulated: true }),
        1
    );
}

#[test]
fn reboot_needs_confirmation() {
    let (mut app, mut hw, mut sink) = make_app(DeviceConfig::default());
    let mut store = MockStore::new();
    app.handle_command(AppCommand::Reboot { confirmed: false }, 0, &mut hw, &mut store, &mut sink)
        .unwrap();
    assert!(!app.take_reboot_request());

    app.handle_command(AppCommand::Reboot { confirmed: true }, 0, &mut hw, &mut store, &mut sink)
        .unwrap();
    assert!(app.take_reboot_request());
    assert!(!app.take_reboot_request(), "request is consumed");
}
