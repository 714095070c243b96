//! Local wall-clock breakdown.
//!
//! The [`ClockPort`](crate::app::ports::ClockPort) hands the core raw unix
//! seconds; everything calendar-shaped (weekday for schedule masks, minute
//! of day for fire deduplication, day number for the daily rollover) is
//! derived here so adapters stay trivial.

use chrono::{DateTime, Datelike, Timelike};

/// 2020-01-01T00:00:00Z.  Anything earlier means SNTP has not run yet.
pub const EPOCH_2020: u64 = 1_577_836_800;

/// A wall-clock instant broken down in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTime {
    /// Seconds since the unix epoch (UTC).
    pub unix: u64,
    /// 0 = Sunday … 6 = Saturday.
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    /// Days since 0001-01-01 in local time; strictly increases at local midnight.
    pub day: u32,
}

impl LocalTime {
    /// Break `unix` down at `offset_minutes` east of UTC.
    ///
    /// Returns `None` for clocks that are plainly unsynchronised.
    pub fn from_unix(unix: u64, offset_minutes: i32) -> Option<Self> {
        if unix < EPOCH_2020 {
            return None;
        }
        let shifted = i64::try_from(unix).ok()? + i64::from(offset_minutes) * 60;
        let local = DateTime::from_timestamp(shifted, 0)?.naive_utc();
        Some(Self {
            unix,
            weekday: local.weekday().num_days_from_sunday() as u8,
            hour: local.hour() as u8,
            minute: local.minute() as u8,
            day: local.date().num_days_from_ce().max(0) as u32,
        })
    }

    /// `hour * 60 + minute`, the identity used for once-per-minute firing.
    pub fn minute_of_day(&self) -> u16 {
        u16::from(self.hour) * 60 + u16::from(self.minute)
    }

    /// Unix seconds narrowed to the 32-bit stamps stored in records.
    pub fn unix_u32(&self) -> u32 {
        u32::try_from(self.unix).unwrap_or(u32::MAX)
    }
}
