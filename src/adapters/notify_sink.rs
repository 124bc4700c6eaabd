//! Notification sink adapter.
//!
//! Renders [`AppEvent`]s with [`encode_event`] and pushes them onto the
//! outbound [`NotificationQueue`] for the transport task. Events that have
//! no control-channel form are skipped. A full queue drops the
//! notification; the log sink still records the event.

use log::debug;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::rpc::channels::NotificationQueue;
use crate::rpc::codec::encode_event;

/// Event sink feeding the outbound notification queue.
pub struct QueueSink<'a> {
    queue: &'a NotificationQueue,
    dropped: u32,
}

impl<'a> QueueSink<'a> {
    pub fn new(queue: &'a NotificationQueue) -> Self {
        Self { queue, dropped: 0 }
    }

    /// Notifications lost to a full queue since start-up.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl EventSink for QueueSink<'_> {
    fn emit(&mut self, event: &AppEvent) {
        let Some(notification) = encode_event(event) else {
            return;
        };
        if let Err(rejected) = self.queue.try_send(notification) {
            self.dropped = self.dropped.wrapping_add(1);
            let embassy_sync::channel::TrySendError::Full(n) = rejected;
            debug!("Notification queue full, '{}' dropped", n.topic);
        }
    }
}
