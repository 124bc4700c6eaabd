//! Task Watchdog Timer (TWDT) driver.
//!
//! Restarts the device if the control loop stalls for longer than
//! [`TIMEOUT_MS`]. The loop calls [`Watchdog::feed`] once per iteration.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

pub const TIMEOUT_MS: u32 = 10_000;

pub struct Watchdog {
    subscribed: bool,
    feeds: u64,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog {
    /// Subscribe the calling task to the TWDT.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Self {
        // SAFETY: called once from the main task during start-up.
        let subscribed = unsafe {
            let cfg = esp_task_wdt_config_t {
                timeout_ms: TIMEOUT_MS,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            let ret = esp_task_wdt_reconfigure(&cfg);
            if ret != ESP_OK {
                log::warn!("TWDT reconfigure returned {ret} (may already be configured)");
            }
            let ret = esp_task_wdt_add(core::ptr::null_mut());
            if ret != ESP_OK {
                log::warn!("Watchdog: failed to subscribe ({ret})");
            }
            ret == ESP_OK
        };
        if subscribed {
            info!("Watchdog: subscribed ({} s timeout, panic on trigger)", TIMEOUT_MS / 1000);
        }
        Self { subscribed, feeds: 0 }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        info!("Watchdog(sim): {} ms timeout not enforced", TIMEOUT_MS);
        Self { subscribed: false, feeds: 0 }
    }

    /// Feed the watchdog. Must be called at least every [`TIMEOUT_MS`].
    pub fn feed(&mut self) {
        self.feeds = self.feeds.wrapping_add(1);
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: the current task subscribed in new().
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn feeds(&self) -> u64 {
        self.feeds
    }
}
