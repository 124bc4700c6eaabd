//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements     | Connects to                     |
//! |---------------|----------------|---------------------------------|
//! | `hardware`    | InputPort      | Button GPIOs, intercom ADC      |
//! |               | AudioPort      | DFPlayer driver                 |
//! |               | IndicatorPort  | Status LED GPIO                 |
//! | `log_sink`    | EventSink      | Serial log output               |
//! | `notify_sink` | EventSink      | Outbound notification queue     |
//! | `nvs`         | ConfigPort     | NVS / in-memory image           |
//! | `time`        | —              | ESP32 system timer              |

pub mod hardware;
pub mod log_sink;
pub mod notify_sink;
pub mod nvs;
pub mod time;
