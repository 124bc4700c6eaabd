//! Doorbell Controller: Main Entry Point
//!
//! Hexagonal architecture with a single cooperative control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter        LogEventSink   NvsAdapter   Clock      │
//! │  (Input+Audio+LED)      QueueSink      (Config)     (ms)       │
//! │  CommandRouter ◀── REQUEST_CHANNEL ◀── transport task          │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Debounce · Intercom · Panic · Scheduler · LED         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use log::{debug, info, warn};

use doorbell::adapters::hardware::{Adc1Intercom, HardwareAdapter};
use doorbell::adapters::log_sink::LogEventSink;
use doorbell::adapters::notify_sink::QueueSink;
use doorbell::adapters::nvs::NvsAdapter;
use doorbell::adapters::time::Clock;
use doorbell::app::service::{AppService, LOOP_PERIOD_MS};
use doorbell::config::load_or_init;
use doorbell::drivers::audio::{DfPlayer, Uart2Link, INIT_ATTEMPTS};
use doorbell::drivers::hw_init::{self, GpioInput, GpioOutput};
use doorbell::drivers::watchdog::Watchdog;
use doorbell::pins;
use doorbell::rpc::channels::{NOTIFY_CHANNEL, REQUEST_CHANNEL, drain_notifications};
use doorbell::rpc::engine::CommandRouter;

// `FreeRtos::delay_ms` rounds up to whole ticks; see sdkconfig.defaults.
const _: () = assert!(
    esp_idf_svc::sys::configTICK_RATE_HZ >= 1000 / LOOP_PERIOD_MS,
    "control loop needs a 1 kHz FreeRTOS tick (CONFIG_FREERTOS_HZ=1000)"
);

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("╔══════════════════════════════════════╗");
    info!("║  Doorbell v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    hw_init::init_peripherals()?;
    let clock = Clock::new();

    // ── 2. Configuration (factory reset: both buttons held) ───
    let factory_reset = hw_init::gpio_read(pins::DOWNSTAIRS_BUTTON_GPIO)
        && hw_init::gpio_read(pins::DOOR_BUTTON_GPIO);
    if factory_reset {
        warn!("Both buttons held at boot: factory reset");
    }
    let mut nvs = NvsAdapter::new()?;
    let config = load_or_init(&mut nvs, factory_reset);

    // ── 3. Audio module ───────────────────────────────────────
    let mut player = DfPlayer::new(Uart2Link, Some(GpioInput(pins::DFPLAYER_BUSY_GPIO)));
    if let Err(e) = player.begin(INIT_ATTEMPTS) {
        warn!("Audio unavailable ({e}), running without playback");
    }

    let mut hw = HardwareAdapter::new(
        [
            GpioInput(pins::DOWNSTAIRS_BUTTON_GPIO),
            GpioInput(pins::DOOR_BUTTON_GPIO),
        ],
        Adc1Intercom,
        GpioOutput(pins::STATUS_LED_GPIO),
        player,
    );

    // ── 4. Application service ────────────────────────────────
    let mut sink = (LogEventSink::new(), QueueSink::new(&NOTIFY_CHANNEL));
    let mut app = AppService::new(config);
    app.start(clock.now_ms(), &mut hw, &mut sink);

    let mut router = CommandRouter::new();
    let mut watchdog = Watchdog::new();

    info!("System ready. Entering control loop.");

    // ── 5. Control loop ───────────────────────────────────────
    loop {
        let now_ms = clock.now_ms();

        // Requests first, so a command never lands mid-tick.
        router.poll(&REQUEST_CHANNEL, now_ms, &mut app, &mut hw, &mut nvs, &mut sink);
        app.tick(now_ms, &mut hw, &mut sink);

        // No transport attached in this build: keep the queue fresh.
        drain_notifications(&NOTIFY_CHANNEL, |n| {
            debug!("NOTIFY | {} {}", n.topic, n.payload);
        });

        if app.take_reboot_request() {
            warn!("Restarting on request");
            FreeRtos::delay_ms(100);
            // SAFETY: esp_restart never returns.
            unsafe { esp_idf_svc::sys::esp_restart() };
        }

        watchdog.feed();
        FreeRtos::delay_ms(LOOP_PERIOD_MS);
    }
}
