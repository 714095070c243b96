//! Controller tuning parameters
//!
//! Timing knobs for the tick loop and the flash write-economy policy.
//! These are build-time defaults; user-facing configuration lives in
//! [`crate::settings`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    // --- Tick loop ---
    /// Interval between `tick()` calls driven by the firmware loop (ms)
    pub tick_interval_ms: u32,
    /// Interval between schedule table evaluations (ms)
    pub schedule_check_interval_ms: u32,

    // --- Statistics ---
    /// Periodic statistics save interval (ms)
    pub stats_save_interval_ms: u32,

    // --- Shot history write economy ---
    /// Quiet period after a shot before its history is written (ms)
    pub history_save_delay_ms: u32,
    /// Deadline pull-forward after a failed or deferred write (ms)
    pub history_retry_interval_ms: u32,
    /// Free heap required before attempting the history write (bytes)
    pub history_min_free_heap: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            schedule_check_interval_ms: 10_000,
            stats_save_interval_ms: 300_000, // 5 min
            history_save_delay_ms: 5000,
            history_retry_interval_ms: 2000,
            history_min_free_heap: 60_000,
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick_interval_ms must be > 0"));
        }
        if self.schedule_check_interval_ms == 0 || self.schedule_check_interval_ms > 60_000 {
            return Err(Error::Config("schedule_check_interval_ms must be 1-60000"));
        }
        if self.stats_save_interval_ms == 0 {
            return Err(Error::Config("stats_save_interval_ms must be > 0"));
        }
        if self.history_retry_interval_ms == 0 {
            return Err(Error::Config("history_retry_interval_ms must be > 0"));
        }
        Ok(())
    }
}
