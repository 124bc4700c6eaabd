//! Control-channel command subsystem.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    Command Stack                         │
//! │                                                          │
//! │  ┌───────────┐   ┌──────────┐   ┌─────────────────────┐  │
//! │  │ Transport │──▶│ Channels │──▶│ Router (engine)     │  │
//! │  │ (extern)  │   │ (queue)  │   │ decode → AppService │  │
//! │  └───────────┘   └──────────┘   └──────────┬──────────┘  │
//! │       ▲                                    │             │
//! │       │          ┌─────────────────────────┘             │
//! │       │          ▼                                       │
//! │  ┌───────────┐   ┌──────────┐                            │
//! │  │ Transport │◀──│  Codec   │  (AppEvent → JSON)         │
//! │  │ (publish) │   │ (render) │                            │
//! │  └───────────┘   └──────────┘                            │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod channels;
pub mod codec;
pub mod engine;
