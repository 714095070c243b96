//! ESP32 time adapter.
//!
//! Implements [`ClockPort`].
//!
//! - **`espidf`**: monotonic time from `esp_timer_get_time()`, wall-clock
//!   time from `gettimeofday()` once SNTP has set it.
//! - **host**: `std::time::Instant` and `SystemTime` for simulation.

use crate::app::ports::ClockPort;
use crate::clock::EPOCH_2020;

pub struct Esp32TimeAdapter {
    #[cfg(not(feature = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(feature = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

impl ClockPort for Esp32TimeAdapter {
    #[cfg(feature = "espidf")]
    fn uptime_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1000
    }

    #[cfg(not(feature = "espidf"))]
    fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    #[cfg(feature = "espidf")]
    fn unix_time(&self) -> Option<u64> {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        let secs = u64::try_from(tv.tv_sec).ok()?;
        // Anything before 2020 is the RTC counting from power-on.
        (secs >= EPOCH_2020).then_some(secs)
    }

    #[cfg(not(feature = "espidf"))]
    fn unix_time(&self) -> Option<u64> {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()?
            .as_secs();
        (secs >= EPOCH_2020).then_some(secs)
    }
}
