//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to               |
//! |------------|--------------|---------------------------|
//! | `hardware` | GpioPort     | ESP32 GPIO                |
//! |            | StoragePort  | NVS (via `nvs`)           |
//! | `log_sink` | EventSink    | Serial log output         |
//! | `nvs`      | StoragePort  | NVS / in-memory store     |
//! | `time`     | -            | ESP32 high-resolution timer |

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
