//! Usage statistics: lifetime, daily, maintenance and session counters.
//!
//! Lifetime counters only ever grow (factory reset aside).  Daily counters
//! belong to one local calendar day and are zeroed when a later day is
//! observed.  Maintenance counters count shots since the last recorded
//! descale / group clean / backflush.  Session counters restart every boot.
//!
//! Persisted as a version-prefixed postcard blob in namespace `stats`.

use core::fmt;
use core::str::FromStr;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{StorageError, StoragePort, read_blob};
use crate::error::Error;

pub const STATS_NAMESPACE: &str = "stats";
const STATS_KEY: &str = "counters";
const STATS_FORMAT_VERSION: u8 = 1;

// ── Maintenance ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceKind {
    Descale,
    GroupClean,
    /// Physically includes a group clean.
    Backflush,
}

impl FromStr for MaintenanceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "descale" => Ok(Self::Descale),
            "groupclean" | "groupClean" | "group_clean" => Ok(Self::GroupClean),
            "backflush" => Ok(Self::Backflush),
            _ => Err(Error::Invalid("unknown maintenance kind")),
        }
    }
}

impl fmt::Display for MaintenanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Descale => "descale",
            Self::GroupClean => "groupclean",
            Self::Backflush => "backflush",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DueLevel {
    Ok,
    Warning,
    Due,
}

impl DueLevel {
    fn for_count(count: u32, warning: u32, due: u32) -> Self {
        if count >= due {
            Self::Due
        } else if count >= warning {
            Self::Warning
        } else {
            Self::Ok
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceStatus {
    pub descale: DueLevel,
    pub group_clean: DueLevel,
    pub backflush: DueLevel,
}

const BACKFLUSH_WARNING: u32 = 80;
const BACKFLUSH_DUE: u32 = 100;
const GROUP_CLEAN_WARNING: u32 = 80;
const GROUP_CLEAN_DUE: u32 = 100;
const DESCALE_WARNING: u32 = 400;
const DESCALE_DUE: u32 = 500;

// ── Counters ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    // --- Lifetime ---
    pub total_shots: u32,
    pub total_steam_cycles: u32,
    pub total_kwh: f32,
    pub total_on_time_minutes: u32,

    // --- Today ---
    pub shots_today: u32,
    pub kwh_today: f32,
    pub on_time_today_minutes: u32,
    /// Local day number the "today" counters belong to; 0 = not yet known.
    pub day: u32,

    // --- Maintenance ---
    pub shots_since_descale: u32,
    pub shots_since_group_clean: u32,
    pub shots_since_backflush: u32,
    pub last_descale_timestamp: u32,
    pub last_group_clean_timestamp: u32,
    pub last_backflush_timestamp: u32,

    // --- Session ---
    pub session_start_timestamp: u32,
    pub session_shots: u32,
}

impl Statistics {
    pub fn record_shot(&mut self) {
        self.total_shots = self.total_shots.saturating_add(1);
        self.shots_today = self.shots_today.saturating_add(1);
        self.session_shots = self.session_shots.saturating_add(1);
        self.shots_since_descale = self.shots_since_descale.saturating_add(1);
        self.shots_since_group_clean = self.shots_since_group_clean.saturating_add(1);
        self.shots_since_backflush = self.shots_since_backflush.saturating_add(1);
    }

    pub fn record_steam_cycle(&mut self) {
        self.total_steam_cycles = self.total_steam_cycles.saturating_add(1);
    }

    /// Returns `false` (and changes nothing) for negative or non-finite input.
    pub fn add_power_usage(&mut self, kwh: f32) -> bool {
        if !kwh.is_finite() || kwh < 0.0 {
            warn!("Stats: ignoring power usage {kwh}");
            return false;
        }
        self.total_kwh += kwh;
        self.kwh_today += kwh;
        true
    }

    pub fn add_on_time_minutes(&mut self, minutes: u32) {
        self.total_on_time_minutes = self.total_on_time_minutes.saturating_add(minutes);
        self.on_time_today_minutes = self.on_time_today_minutes.saturating_add(minutes);
    }

    /// Zero the matching countdown(s) and stamp `timestamp` (unix seconds).
    pub fn record_maintenance(&mut self, kind: MaintenanceKind, timestamp: u32) {
        match kind {
            MaintenanceKind::Descale => {
                self.shots_since_descale = 0;
                self.last_descale_timestamp = timestamp;
            }
            MaintenanceKind::GroupClean => {
                self.shots_since_group_clean = 0;
                self.last_group_clean_timestamp = timestamp;
            }
            MaintenanceKind::Backflush => {
                self.shots_since_backflush = 0;
                self.last_backflush_timestamp = timestamp;
                self.shots_since_group_clean = 0;
                self.last_group_clean_timestamp = timestamp;
            }
        }
        info!("Stats: {kind} recorded");
    }

    pub fn reset_daily(&mut self) {
        self.shots_today = 0;
        self.kwh_today = 0.0;
        self.on_time_today_minutes = 0;
    }

    /// Note that local day `day` has been observed.  Resets the daily
    /// counters when `day` is later than any day seen before and returns
    /// whether it did.  Earlier days (clock stepped back) are ignored.
    pub fn roll_day(&mut self, day: u32) -> bool {
        if day <= self.day {
            return false;
        }
        let first_sighting = self.day == 0;
        self.day = day;
        if first_sighting {
            return false;
        }
        self.reset_daily();
        info!("Stats: new day, daily counters reset");
        true
    }

    pub fn start_session(&mut self, timestamp: u32) {
        self.session_start_timestamp = timestamp;
        self.session_shots = 0;
    }

    pub fn maintenance_status(&self) -> MaintenanceStatus {
        MaintenanceStatus {
            descale: DueLevel::for_count(self.shots_since_descale, DESCALE_WARNING, DESCALE_DUE),
            group_clean: DueLevel::for_count(
                self.shots_since_group_clean,
                GROUP_CLEAN_WARNING,
                GROUP_CLEAN_DUE,
            ),
            backflush: DueLevel::for_count(
                self.shots_since_backflush,
                BACKFLUSH_WARNING,
                BACKFLUSH_DUE,
            ),
        }
    }

    // ── Persistence ─────────────────────────────────────────────────

    pub fn load<S: StoragePort + ?Sized>(storage: &S) -> Self {
        let bytes = match read_blob(storage, STATS_NAMESPACE, STATS_KEY) {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound) => {
                debug!("Stats: none stored, starting from zero");
                return Self::default();
            }
            Err(e) => {
                warn!("Stats: read failed ({e}), starting from zero");
                return Self::default();
            }
        };
        match postcard::from_bytes::<(u8, Self)>(&bytes) {
            Ok((STATS_FORMAT_VERSION, stats)) => {
                info!("Stats: loaded ({} shots lifetime)", stats.total_shots);
                stats
            }
            Ok((version, _)) => {
                warn!("Stats: unsupported version {version}, starting from zero");
                Self::default()
            }
            Err(e) => {
                warn!("Stats: corrupt ({e}), starting from zero");
                Self::default()
            }
        }
    }

    pub fn save<S: StoragePort + ?Sized>(&self, storage: &mut S) -> Result<(), StorageError> {
        let bytes = postcard::to_allocvec(&(STATS_FORMAT_VERSION, self)).map_err(|e| {
            warn!("Stats: encode failed: {e}");
            StorageError::IoError
        })?;
        storage
            .write(STATS_NAMESPACE, STATS_KEY, &bytes)
            .inspect_err(|e| warn!("Stats: save failed: {e}"))
    }
}
