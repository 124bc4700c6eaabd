//! DFPlayer Mini audio driver.
//!
//! Speaks the module's 10-byte serial protocol:
//!
//! ```text
//!  0    1    2    3    4     5    6    7       8       9
//! ┌────┬────┬────┬────┬─────┬────┬────┬───────┬───────┬────┐
//! │ 7E │ FF │ 06 │cmd │ 00  │ hi │ lo │ chk_hi│ chk_lo│ EF │
//! └────┴────┴────┴────┴─────┴────┴────┴───────┴───────┴────┘
//!   checksum = -(sum of bytes 1..=6) as u16
//! ```
//!
//! The module drops commands that arrive back to back, so frames are
//! queued and released at least [`FRAME_GAP_MS`] apart from
//! [`poll`](DfPlayer::poll), which the control loop calls every tick.
//! If [`begin`](DfPlayer::begin) gets no answer the driver marks itself
//! unavailable and ignores every later command.

use embedded_hal::digital::InputPin;
use heapless::Deque;
use log::{debug, info, warn};

use crate::app::ports::AudioPort;
use crate::config::NATIVE_VOLUME_MAX;
use crate::error::AudioError;

pub const FRAME_LEN: usize = 10;

/// Minimum spacing between two frames on the wire.
pub const FRAME_GAP_MS: u32 = 30;

/// How long `begin` waits for each status reply.
pub const RESPONSE_TIMEOUT_MS: u32 = 200;

/// Start-up detection attempts before giving up.
pub const INIT_ATTEMPTS: u8 = 3;

const START: u8 = 0x7E;
const VERSION: u8 = 0xFF;
const LENGTH: u8 = 0x06;
const NO_FEEDBACK: u8 = 0x00;
const END: u8 = 0xEF;

const QUEUE_DEPTH: usize = 8;

/// Commands this driver issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Play = 0x03,
    Volume = 0x06,
    Loop = 0x08,
    Stop = 0x16,
    QueryStatus = 0x42,
}

pub type Frame = [u8; FRAME_LEN];

fn checksum(frame: &[u8]) -> u16 {
    let sum: u16 = frame[1..=6].iter().map(|&b| u16::from(b)).sum();
    0u16.wrapping_sub(sum)
}

/// Build a command frame.
pub fn encode_frame(cmd: Command, param: u16) -> Frame {
    let [hi, lo] = param.to_be_bytes();
    let mut frame = [START, VERSION, LENGTH, cmd as u8, NO_FEEDBACK, hi, lo, 0, 0, END];
    let [chk_hi, chk_lo] = checksum(&frame).to_be_bytes();
    frame[7] = chk_hi;
    frame[8] = chk_lo;
    frame
}

/// Check framing and checksum of a reply. Returns `(cmd, param)`.
pub fn parse_frame(frame: &[u8]) -> Option<(u8, u16)> {
    if frame.len() != FRAME_LEN
        || frame[0] != START
        || frame[1] != VERSION
        || frame[2] != LENGTH
        || frame[9] != END
    {
        return None;
    }
    if u16::from_be_bytes([frame[7], frame[8]]) != checksum(frame) {
        return None;
    }
    Some((frame[3], u16::from_be_bytes([frame[5], frame[6]])))
}

// ── Serial link ───────────────────────────────────────────────

/// Byte transport to the module.
pub trait SerialLink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), AudioError>;

    /// Fill as much of `buf` as arrives within `timeout_ms`; returns the
    /// number of bytes read (0 on timeout).
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, AudioError>;
}

/// The UART2 link configured by [`hw_init`](super::hw_init).
#[cfg(target_os = "espidf")]
pub struct Uart2Link;

#[cfg(target_os = "espidf")]
impl SerialLink for Uart2Link {
    fn write(&mut self, bytes: &[u8]) -> Result<(), AudioError> {
        let written = super::hw_init::uart_write(bytes);
        if usize::try_from(written).ok() == Some(bytes.len()) {
            Ok(())
        } else {
            Err(AudioError::Serial)
        }
    }

    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, AudioError> {
        usize::try_from(super::hw_init::uart_read(buf, timeout_ms)).map_err(|_| AudioError::Serial)
    }
}

// ── Driver ────────────────────────────────────────────────────

/// DFPlayer driver over a serial link, with optional BUSY input.
pub struct DfPlayer<S, B> {
    link: S,
    busy: Option<B>,
    queue: Deque<Frame, QUEUE_DEPTH>,
    last_sent_ms: Option<u32>,
    available: bool,
}

impl<S: SerialLink, B: InputPin> DfPlayer<S, B> {
    /// Wrap a link. The driver is unavailable until [`begin`](Self::begin)
    /// succeeds.
    pub fn new(link: S, busy: Option<B>) -> Self {
        Self {
            link,
            busy,
            queue: Deque::new(),
            last_sent_ms: None,
            available: false,
        }
    }

    /// Ping the module with a status query, up to `attempts` times.
    pub fn begin(&mut self, attempts: u8) -> Result<(), AudioError> {
        let query = encode_frame(Command::QueryStatus, 0);
        for attempt in 1..=attempts {
            match self.ping(&query) {
                Ok(()) => {
                    self.available = true;
                    info!("DFPlayer: online (attempt {attempt})");
                    return Ok(());
                }
                Err(e) => warn!("DFPlayer: attempt {attempt}/{attempts} failed: {e}"),
            }
        }
        self.available = false;
        warn!("DFPlayer: not detected, continuing without audio");
        Err(AudioError::NotResponding)
    }

    fn ping(&mut self, query: &Frame) -> Result<(), AudioError> {
        self.link.write(query)?;
        let mut reply = [0u8; FRAME_LEN];
        let n = self.link.read(&mut reply, RESPONSE_TIMEOUT_MS)?;
        match parse_frame(&reply[..n]) {
            Some((cmd, param)) => {
                debug!("DFPlayer: reply cmd=0x{cmd:02X} param={param}");
                Ok(())
            }
            None => Err(AudioError::NotResponding),
        }
    }

    fn enqueue(&mut self, cmd: Command, param: u16) {
        if !self.available {
            return;
        }
        if self.queue.push_back(encode_frame(cmd, param)).is_err() {
            warn!("DFPlayer: {}, {cmd:?} dropped", AudioError::QueueFull);
        }
    }

    /// Frames still waiting for their slot.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Send the next queued frame if the gap since the last one has passed.
    pub fn flush_due(&mut self, now_ms: u32) {
        let due = self
            .last_sent_ms
            .is_none_or(|last| now_ms.wrapping_sub(last) >= FRAME_GAP_MS);
        if !due {
            return;
        }
        if let Some(frame) = self.queue.pop_front() {
            if let Err(e) = self.link.write(&frame) {
                warn!("DFPlayer: frame 0x{:02X} lost: {e}", frame[3]);
            }
            self.last_sent_ms = Some(now_ms);
        }
    }

    pub fn link(&self) -> &S {
        &self.link
    }
}

impl<S: SerialLink, B: InputPin> AudioPort for DfPlayer<S, B> {
    fn set_volume(&mut self, native: u8) {
        self.enqueue(Command::Volume, u16::from(native.min(NATIVE_VOLUME_MAX)));
    }

    fn play(&mut self, track: u16) {
        self.enqueue(Command::Play, track);
    }

    fn loop_track(&mut self, track: u16) {
        self.enqueue(Command::Loop, track);
    }

    fn stop(&mut self) {
        self.enqueue(Command::Stop, 0);
    }

    /// BUSY is active LOW.
    fn is_busy(&mut self) -> Option<bool> {
        self.busy.as_mut().and_then(|pin| pin.is_low().ok())
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn poll(&mut self, now_ms: u32) {
        self.flush_due(now_ms);
    }
}
