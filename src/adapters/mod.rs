//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements    | Connects to                   |
//! |------------|---------------|-------------------------------|
//! | `heap`     | ResourceProbe | ESP-IDF heap allocator        |
//! | `log_sink` | EventSink     | Serial log output             |
//! | `nvs`      | StoragePort   | NVS / in-memory store         |
//! | `time`     | ClockPort     | ESP32 system timer, SNTP time |

pub mod heap;
pub mod log_sink;
pub mod nvs;
pub mod time;
