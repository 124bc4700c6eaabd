//! Command router: dispatches inbound control requests to the AppService.
//!
//! **Transport-decoupled**: the router does not own a transport. The
//! transport task pushes raw `(topic, payload)` pairs into a
//! [`RequestQueue`] via [`submit`](super::channels::submit); the control
//! loop calls [`CommandRouter::poll`] at the start of each iteration, so a
//! request never mutates state in the middle of a tick.
//!
//! Every request passes through two steps:
//!
//! 1. **Decode**: [`decode_request`] turns it into an
//!    [`AppCommand`](crate::app::commands::AppCommand) or a
//!    [`CommandError`].
//! 2. **Dispatch**: [`AppService::handle_command`] applies it.
//!
//! A failure at either step is reported as
//! [`AppEvent::CommandRejected`]; nothing is dropped silently.

use core::fmt::Write as _;

use log::{info, warn};

use crate::app::events::{AppEvent, DebugText};
use crate::app::ports::{AudioPort, ConfigPort, EventSink};
use crate::app::service::AppService;
use crate::error::CommandError;

use super::channels::RequestQueue;
use super::codec::decode_request;

/// Routes queued requests into the application service.
#[derive(Debug, Default)]
pub struct CommandRouter {
    handled: u32,
    rejected: u32,
}

impl CommandRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the queue, routing every waiting request. Returns how many
    /// were processed.
    pub fn poll(
        &mut self,
        queue: &RequestQueue,
        now_ms: u32,
        app: &mut AppService,
        audio: &mut impl AudioPort,
        store: &mut impl ConfigPort,
        sink: &mut impl EventSink,
    ) -> usize {
        let mut processed = 0;
        while let Ok(request) = queue.try_receive() {
            // Outcome is already reported through the sink.
            let _ = self.route(&request.topic, &request.payload, now_ms, app, audio, store, sink);
            processed += 1;
        }
        processed
    }

    /// Decode and dispatch one request.
    #[allow(clippy::too_many_arguments)]
    pub fn route(
        &mut self,
        topic: &str,
        payload: &[u8],
        now_ms: u32,
        app: &mut AppService,
        audio: &mut impl AudioPort,
        store: &mut impl ConfigPort,
        sink: &mut impl EventSink,
    ) -> Result<(), CommandError> {
        let body = core::str::from_utf8(payload).unwrap_or("<binary>");
        info!("Request on '{topic}' ({} bytes)", payload.len());
        if app.config().debug_enabled {
            let mut line = DebugText::new();
            let _ = write!(line, "Received on topic '{topic}': {body}");
            sink.emit(&AppEvent::Debug(line));
        }

        let result = decode_request(topic, payload)
            .and_then(|cmd| app.handle_command(cmd, now_ms, audio, store, sink));

        match result {
            Ok(()) => self.handled = self.handled.wrapping_add(1),
            Err(e) => {
                self.rejected = self.rejected.wrapping_add(1);
                warn!("Request on '{topic}' rejected: {e}");
                sink.emit(&AppEvent::CommandRejected(e));
            }
        }
        result
    }

    pub fn handled(&self) -> u32 {
        self.handled
    }

    pub fn rejected(&self) -> u32 {
        self.rejected
    }
}
