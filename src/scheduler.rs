//! Playback scheduler.
//!
//! Arbitrates chime requests against the audio module. Channel presses,
//! direct-play commands and the deferred timer all funnel into a single
//! pending slot; the tick decides whether the pending request plays or is
//! dropped by the cooldown.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Request Sources                          │
//! │                                                              │
//! │  ┌───────────┐  ┌───────────┐  ┌───────────┐                 │
//! │  │ Channel   │  │ Direct    │  │ Deferred  │                 │
//! │  │ press     │  │ play cmd  │  │ timer     │                 │
//! │  └─────┬─────┘  └─────┬─────┘  └─────┬─────┘                 │
//! │        │              │              │                       │
//! │        ▼              ▼              ▼                       │
//! │  ┌────────────────────────────────────────────┐              │
//! │  │     pending slot (last write wins)         │              │
//! │  └───────────────────────┬────────────────────┘              │
//! │                          │ cooldown / availability           │
//! │                          ▼                                   │
//! │                    AudioPort::play()                         │
//! │                          │                                   │
//! │          BUSY idle edge ─┴─ volume-reset deadline            │
//! │                          ▼                                   │
//! │                  set_volume(0), not playing                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use log::{debug, info};

use crate::app::ports::AudioPort;
use crate::config::{percent_to_native, Channel};
use crate::error::TimerError;

/// Longest deferred timer accepted (one day).
pub const MAX_TIMER_SECS: i64 = 86_400;

// ═══════════════════════════════════════════════════════════════
//  Request types
// ═══════════════════════════════════════════════════════════════

/// Where a playback request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOrigin {
    /// A validated (or simulated) channel press.
    Channel(Channel),
    /// A direct-play command.
    Direct,
    /// The deferred timer expired.
    Timer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayRequest {
    pub track: u16,
    pub volume_percent: u8,
    pub origin: PlayOrigin,
}

/// Timing windows taken from the configuration each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackTiming {
    pub cooldown_ms: u32,
    pub volume_reset_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// BUSY went idle after having been busy.
    BusyIdle,
    /// The volume-reset deadline passed.
    VolumeReset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    Started(PlayRequest),
    /// Dropped by the cooldown, or while emergency playback owns the audio.
    Suppressed(PlayRequest),
    /// Dropped because the audio module never came up.
    Unavailable(PlayRequest),
    Finished(FinishReason),
    TimerFired(PlayRequest),
}

pub type SchedulerEvents = heapless::Vec<SchedulerEvent, 4>;

// ═══════════════════════════════════════════════════════════════
//  Deferred timer
// ═══════════════════════════════════════════════════════════════

/// One-shot "play this later" timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeferredTimer {
    pub active: bool,
    pub start_ms: u32,
    pub duration_ms: u32,
    pub track: u16,
    pub volume_percent: u8,
}

impl DeferredTimer {
    pub fn remaining_ms(&self, now_ms: u32) -> u32 {
        if !self.active {
            return 0;
        }
        self.duration_ms
            .saturating_sub(now_ms.wrapping_sub(self.start_ms))
    }

    fn expired(&self, now_ms: u32) -> bool {
        self.active && now_ms.wrapping_sub(self.start_ms) >= self.duration_ms
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct PlaybackScheduler {
    pending: Option<PlayRequest>,
    is_playing: bool,
    last_play_start_ms: u32,
    volume_reset_armed_at: Option<u32>,
    busy_seen: bool,
    timer: DeferredTimer,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request, replacing any pending one. Returns the replaced
    /// request.
    pub fn request_play(&mut self, request: PlayRequest) -> Option<PlayRequest> {
        self.pending.replace(request)
    }

    pub fn pending(&self) -> Option<&PlayRequest> {
        self.pending.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn last_play_start_ms(&self) -> u32 {
        self.last_play_start_ms
    }

    pub fn volume_reset_armed_at(&self) -> Option<u32> {
        self.volume_reset_armed_at
    }

    pub fn timer(&self) -> &DeferredTimer {
        &self.timer
    }

    /// Reject durations outside 1..=[`MAX_TIMER_SECS`].
    pub fn check_duration(seconds: i64) -> Result<(), TimerError> {
        if seconds <= 0 || seconds > MAX_TIMER_SECS {
            return Err(TimerError::InvalidDuration);
        }
        Ok(())
    }

    /// Arm the deferred timer.
    ///
    /// The duration is checked before the active flag, so a bad duration is
    /// always reported as such and never disturbs a running timer.
    pub fn set_timer(
        &mut self,
        seconds: i64,
        track: u16,
        volume_percent: u8,
        now_ms: u32,
    ) -> Result<(), TimerError> {
        Self::check_duration(seconds)?;
        if self.timer.active {
            return Err(TimerError::TimerAlreadyActive);
        }
        self.timer = DeferredTimer {
            active: true,
            start_ms: now_ms,
            duration_ms: (seconds * 1000) as u32,
            track,
            volume_percent,
        };
        info!("Scheduler: timer armed for {seconds} s (track {track})");
        Ok(())
    }

    /// Disarm the deferred timer, returning its last state.
    pub fn stop_timer(&mut self) -> Result<DeferredTimer, TimerError> {
        if !self.timer.active {
            return Err(TimerError::NoActiveTimer);
        }
        let stopped = self.timer;
        self.timer.active = false;
        info!("Scheduler: timer stopped");
        Ok(stopped)
    }

    /// Forget the current playback and any pending request. Used when
    /// emergency playback takes over the audio module.
    pub fn cancel_playback(&mut self) {
        self.pending = None;
        self.is_playing = false;
        self.volume_reset_armed_at = None;
        self.busy_seen = false;
    }

    /// Advance the scheduler.
    ///
    /// With `suppressed` set (emergency active), completion tracking is
    /// paused and every pending request is dropped; the deferred timer
    /// keeps counting.
    pub fn tick(
        &mut self,
        now_ms: u32,
        timing: PlaybackTiming,
        audio: &mut impl AudioPort,
        suppressed: bool,
    ) -> SchedulerEvents {
        let mut events = SchedulerEvents::new();

        if !suppressed {
            self.track_completion(now_ms, timing, audio, &mut events);
        }

        if self.timer.expired(now_ms) {
            self.timer.active = false;
            let request = PlayRequest {
                track: self.timer.track,
                volume_percent: self.timer.volume_percent,
                origin: PlayOrigin::Timer,
            };
            info!("Scheduler: timer fired (track {})", request.track);
            self.pending = Some(request);
            let _ = events.push(SchedulerEvent::TimerFired(request));
        }

        if let Some(request) = self.pending.take() {
            let cooling_down =
                self.is_playing && now_ms.wrapping_sub(self.last_play_start_ms) < timing.cooldown_ms;
            let event = if suppressed || cooling_down {
                debug!("Scheduler: track {} suppressed", request.track);
                SchedulerEvent::Suppressed(request)
            } else if !audio.is_available() {
                debug!("Scheduler: audio unavailable, track {} dropped", request.track);
                SchedulerEvent::Unavailable(request)
            } else {
                audio.set_volume(percent_to_native(request.volume_percent));
                audio.play(request.track);
                self.is_playing = true;
                self.last_play_start_ms = now_ms;
                self.volume_reset_armed_at = Some(now_ms);
                self.busy_seen = false;
                SchedulerEvent::Started(request)
            };
            let _ = events.push(event);
        }

        events
    }

    fn track_completion(
        &mut self,
        now_ms: u32,
        timing: PlaybackTiming,
        audio: &mut impl AudioPort,
        events: &mut SchedulerEvents,
    ) {
        if self.is_playing {
            match audio.is_busy() {
                Some(true) => self.busy_seen = true,
                Some(false) if self.busy_seen => {
                    self.finish(audio);
                    let _ = events.push(SchedulerEvent::Finished(FinishReason::BusyIdle));
                    return;
                }
                _ => {}
            }
        }

        if let Some(armed_at) = self.volume_reset_armed_at {
            if now_ms.wrapping_sub(armed_at) >= timing.volume_reset_ms {
                self.finish(audio);
                let _ = events.push(SchedulerEvent::Finished(FinishReason::VolumeReset));
            }
        }
    }

    fn finish(&mut self, audio: &mut impl AudioPort) {
        audio.set_volume(0);
        self.is_playing = false;
        self.busy_seen = false;
        self.volume_reset_armed_at = None;
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
