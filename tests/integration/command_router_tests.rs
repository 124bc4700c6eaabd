//! End-to-end tests for the request queue → router → AppService path,
//! with notifications rendered through the outbound queue.

use crate::mock_hw::{LogSink, MockHardware, MockStore};

use doorbell::adapters::notify_sink::QueueSink;
use doorbell::app::events::AppEvent;
use doorbell::app::service::AppService;
use doorbell::config::DeviceConfig;
use doorbell::error::{CommandError, TimerError};
use doorbell::rpc::channels::{submit, NotificationQueue, RequestQueue};
use doorbell::rpc::codec::{ERROR_TOPIC, STATUS_TOPIC};
use doorbell::rpc::engine::CommandRouter;

struct Rig {
    app: AppService,
    hw: MockHardware,
    store: MockStore,
    log: LogSink,
    router: CommandRouter,
    requests: RequestQueue,
}

impl Rig {
    fn new() -> Self {
        let mut app = AppService::new(DeviceConfig::default());
        let mut hw = MockHardware::new();
        let mut log = LogSink::new();
        app.start(0, &mut hw, &mut log);
        log.clear();
        Self {
            app,
            hw,
            store: MockStore::new(),
            log,
            router: CommandRouter::new(),
            requests: RequestQueue::new(),
        }
    }

    fn send(&self, topic: &str, payload: &str) {
        assert!(submit(&self.requests, topic, payload.as_bytes()));
    }

    fn poll(&mut self, now_ms: u32, notify: &NotificationQueue) -> usize {
        let mut sink = (&mut self.log, QueueSink::new(notify));
        self.router.poll(
            &self.requests,
            now_ms,
            &mut self.app,
            &mut self.hw,
            &mut self.store,
            &mut sink,
        )
    }
}

fn drain(queue: &NotificationQueue) -> Vec<(String, serde_json::Value)> {
    let mut out = Vec::new();
    while let Ok(n) = queue.try_receive() {
        let body = serde_json::from_str(n.payload.as_str())
            .unwrap_or_else(|_| serde_json::Value::String(n.payload.to_string()));
        out.push((n.topic.to_string(), body));
    }
    out
}

#[test]
fn queued_requests_run_before_the_next_tick() {
    let mut rig = Rig::new();
    let notify = NotificationQueue::new();
    rig.send("doorbell/get/status", "");
    rig.send("doorbell/play/3", "");

    assert_eq!(rig.poll(10, &notify), 2);
    assert_eq!(rig.router.handled(), 2);
    assert!(rig.hw.plays().is_empty(), "playback waits for the tick");

    rig.app.tick(11, &mut rig.hw, &mut rig.log);
    assert_eq!(rig.hw.plays(), vec![3]);

    let status = drain(&notify);
    assert_eq!(status[0].0, STATUS_TOPIC);
    assert_eq!(status[0].1["status"], "online");
    assert_eq!(status[0].1["hostname"], "doorbell");
}

#[test]
fn unknown_command_is_reported() {
    let mut rig = Rig::new();
    let notify = NotificationQueue::new();
    rig.send("doorbell/launch/rocket", "");
    rig.poll(0, &notify);

    assert_eq!(rig.router.rejected(), 1);
    assert_eq!(
        rig.log.count(|e| matches!(e, AppEvent::CommandRejected(CommandError::InvalidRequest(_)))),
        1
    );
    let sent = drain(&notify);
    assert_eq!(sent[0].0, ERROR_TOPIC);
    assert_eq!(sent[0].1["error"], "invalid_request");
}

#[test]
fn malformed_payload_is_a_decode_error() {
    let mut rig = Rig::new();
    let notify = NotificationQueue::new();
    rig.send("doorbell/set/button/door", "{\"track\":");
    rig.poll(0, &notify);

    assert!(rig.log.events.iter().any(
        |e| matches!(e, AppEvent::CommandRejected(CommandError::DecodeError(_)))
    ));
    assert_eq!(rig.app.config(), &DeviceConfig::default());
}

#[test]
fn second_timer_is_refused_on_the_status_topic() {
    let mut rig = Rig::new();
    let notify = NotificationQueue::new();
    rig.send("doorbell/timer/set", r#"{"seconds":126,"track":1,"volume":100}"#);
    rig.send("doorbell/timer/set", r#"{"seconds":10,"track":2,"volume":50}"#);
    rig.poll(0, &notify);

    assert_eq!(rig.router.handled(), 1);
    assert_eq!(rig.router.rejected(), 1);
    assert_eq!(rig.app.scheduler().timer().duration_ms, 126_000);
    assert!(rig.log.events.contains(&AppEvent::CommandRejected(CommandError::Timer(
        TimerError::TimerAlreadyActive
    ))));

    let sent = drain(&notify);
    let refusal = sent
        .iter()
        .find(|(_, body)| body["timer"] == "error")
        .expect("timer error notification");
    assert_eq!(refusal.0, STATUS_TOPIC);
    assert_eq!(refusal.1["reason"], "timer_already_active");
}

#[test]
fn debug_mode_echoes_requests() {
    let mut rig = Rig::new();
    let notify = NotificationQueue::new();
    rig.send("doorbell/set/config", r#"{"debug":true}"#);
    rig.send("doorbell/get/config", "");
    rig.poll(0, &notify);

    assert!(rig.app.config().debug_enabled);
    assert_eq!(rig.store.writes, 1);
    let echoes: Vec<_> = rig
        .log
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Debug(line) => Some(line.as_str().to_owned()),
            _ => None,
        })
        .collect();
    assert_eq!(echoes, vec!["Received on topic 'doorbell/get/config': ".to_owned()]);
}

#[test]
fn config_notification_omits_passwords() {
    let mut rig = Rig::new();
    let notify = NotificationQueue::new();
    rig.send(
        "doorbell/set/config",
        r#"{"wifi_ssid":"home","wifi_password":"hunter22","mqtt_password":"s3cret"}"#,
    );
    rig.poll(0, &notify);

    assert_eq!(rig.app.config().wifi.password.as_str(), "hunter22");
    let sent = drain(&notify);
    let (_, body) = sent
        .iter()
        .find(|(topic, _)| topic == "doorbell/config")
        .expect("config notification");
    let text = body.to_string();
    assert!(text.contains("home"));
    assert!(!text.contains("hunter22"));
    assert!(!text.contains("s3cret"));
}

#[test]
fn reboot_requires_literal_confirmation() {
    let mut rig = Rig::new();
    let notify = NotificationQueue::new();
    rig.send("doorbell/system/reboot", "please");
    rig.poll(0, &notify);
    assert!(!rig.app.take_reboot_request());

    rig.send("doorbell/system/reboot", "REBOOT");
    rig.poll(1, &notify);
    assert!(rig.app.take_reboot_request());
}

#[test]
fn emergency_on_off_over_the_channel() {
    let mut rig = Rig::new();
    let notify = NotificationQueue::new();
    rig.send("doorbell/emergency", "ON");
    rig.poll(0, &notify);
    assert!(rig.app.is_emergency_active());

    rig.send("doorbell/emergency", "OFF");
    rig.poll(5, &notify);
    assert!(!rig.app.is_emergency_active());

    let flags: Vec<_> = drain(&notify)
        .into_iter()
        .filter_map(|(_, body)| body.get("emergency").and_then(|v| v.as_bool()))
        .collect();
    assert!(flags.contains(&true));
    assert!(flags.contains(&false));
}
