//! Inter-task communication channels.
//!
//! Uses `embassy-sync` bounded MPMC channels to bridge the transport task
//! (publish/subscribe client callbacks) with the synchronous control loop.
//! A request that arrives mid-tick waits in the inbound queue until the
//! router drains it at the start of the next loop iteration.
//!
//! ```text
//! ┌────────────────┐ InboundRequest ┌──────────────┐
//! │ Transport Task │───────────────▶│ Control Loop │
//! │ (callbacks)    │◀───────────────│ (sync)       │
//! └────────────────┘  Notification  └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::{String, Vec};
use log::warn;

/// Longest accepted topic.
pub const MAX_TOPIC_LEN: usize = 64;

/// Largest accepted request payload.
pub const MAX_REQUEST_PAYLOAD: usize = 512;

/// Largest rendered notification body.
///
/// Sized for the config report with every string field at capacity and
/// each byte escaped as `\u00XX` (224 bytes of strings, six bytes each,
/// plus keys and numbers).
pub const MAX_NOTIFICATION_PAYLOAD: usize = 2048;

/// Channel depth for inbound requests.
const REQUEST_DEPTH: usize = 8;

/// Channel depth for outbound notifications.
const NOTIFY_DEPTH: usize = 16;

/// A control request as received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRequest {
    pub topic: String<MAX_TOPIC_LEN>,
    pub payload: Vec<u8, MAX_REQUEST_PAYLOAD>,
}

impl InboundRequest {
    /// Copy a raw request. Returns `None` if either part exceeds its bound.
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        Some(Self {
            topic: String::try_from(topic).ok()?,
            payload: Vec::from_slice(payload).ok()?,
        })
    }
}

/// A rendered notification ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub topic: &'static str,
    pub payload: String<MAX_NOTIFICATION_PAYLOAD>,
    /// Ask the broker to keep the last value (device status).
    pub retain: bool,
}

pub type RequestQueue = Channel<CriticalSectionRawMutex, InboundRequest, REQUEST_DEPTH>;

pub type NotificationQueue = Channel<CriticalSectionRawMutex, Notification, NOTIFY_DEPTH>;

/// Inbound request channel: transport task → control loop.
pub static REQUEST_CHANNEL: RequestQueue = Channel::new();

/// Outbound notification channel: control loop → transport task.
pub static NOTIFY_CHANNEL: NotificationQueue = Channel::new();

/// Hand a raw request to the control loop. Returns `false` if the request
/// was too large or the queue is full; the request is dropped either way.
pub fn submit(queue: &RequestQueue, topic: &str, payload: &[u8]) -> bool {
    let Some(request) = InboundRequest::new(topic, payload) else {
        warn!("Request on '{topic}' too large ({} bytes), dropped", payload.len());
        return false;
    };
    if queue.try_send(request).is_err() {
        warn!("Request queue full, '{topic}' dropped");
        return false;
    }
    true
}

/// Hand every queued notification to `deliver`, oldest first. Returns how
/// many were delivered.
///
/// The transport task calls this with its publish function. Only one
/// consumer may drain a queue.
pub fn drain_notifications(queue: &NotificationQueue, mut deliver: impl FnMut(Notification)) -> usize {
    let mut delivered = 0;
    while let Ok(notification) = queue.try_receive() {
        deliver(notification);
        delivered += 1;
    }
    delivered
}
