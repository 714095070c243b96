//! Schedule engine: timed power on/off plus idle auto-power-off.
//!
//! The table ([`ScheduleSettings`]) is plain persisted data owned by the
//! controller's settings; the engine ([`ScheduleEngine`]) holds only the
//! runtime bookkeeping (last handled minute, last user activity).  When an
//! entry fires, the engine notifies a [`ScheduleDelegate`]; it knows
//! nothing about events, transports or the control board.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  tick(local time, uptime, mode, shot)                          │
//! │                                                                │
//! │   clock synced? ──no──▶ skip table                             │
//! │        │ yes                                                   │
//! │   same minute as last? ──yes──▶ skip table                     │
//! │        │ no                                                    │
//! │   collect enabled entries matching day + hh:mm                 │
//! │        │                                                       │
//! │   resolve: any TURN_OFF beats TURN_ON, then highest id         │
//! │        │                                                       │
//! │        ▼                                                       │
//! │   delegate.on_schedule_fired(entry)          (at most one)     │
//! │                                                                │
//! │   idle ≥ auto-off timeout? ──yes──▶ delegate(Auto Power-Off)   │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::ports::{StorageError, StoragePort, read_blob};
use crate::clock::LocalTime;
use crate::error::{Error, Result};
use crate::runtime::MachineMode;
use crate::settings::patch::bounded;

/// Maximum number of live schedule entries.
pub const MAX_SCHEDULES: usize = 10;

pub const SCHEDULE_NAMESPACE: &str = "sched";
const SCHEDULE_KEY: &str = "table";
const SCHEDULE_FORMAT_VERSION: u8 = 1;

/// Display name of the synthesised idle shut-off entry.
pub const AUTO_POWER_OFF_NAME: &str = "Auto Power-Off";

const MAX_AUTO_OFF_MINUTES: u16 = 480;

// ═══════════════════════════════════════════════════════════════
//  Schedule types
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleAction {
    #[serde(rename = "on")]
    TurnOn,
    #[serde(rename = "off")]
    TurnOff,
}

/// Which boilers to bring up, and in what order, on a TURN_ON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatingStrategy {
    BrewOnly,
    #[default]
    Sequential,
    Parallel,
    SmartStagger,
}

/// Day-of-week bitmask, bit 0 = Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayMask(pub u8);

impl DayMask {
    pub const SUNDAY: Self = Self(0x01);
    pub const MONDAY: Self = Self(0x02);
    pub const SATURDAY: Self = Self(0x40);
    pub const WEEKDAYS: Self = Self(0x3E);
    pub const WEEKENDS: Self = Self(0x41);
    pub const EVERY_DAY: Self = Self(0x7F);

    /// `weekday`: 0 = Sunday … 6 = Saturday.
    pub fn contains(self, weekday: u8) -> bool {
        weekday < 7 && self.0 & (1 << weekday) != 0
    }
}

/// A single time-of-day rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    /// 1-based; 0 only on the synthesised auto-power-off entry.
    pub id: u8,
    pub enabled: bool,
    pub days: DayMask,
    pub hour: u8,
    pub minute: u8,
    pub action: ScheduleAction,
    pub strategy: HeatingStrategy,
    pub name: heapless::String<23>,
}

impl ScheduleEntry {
    /// Enabled every day with the default heating strategy.
    pub fn new(hour: u8, minute: u8, action: ScheduleAction) -> Self {
        Self {
            id: 0,
            enabled: true,
            days: DayMask::EVERY_DAY,
            hour,
            minute,
            action,
            strategy: HeatingStrategy::default(),
            name: heapless::String::new(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = bounded(name);
        self
    }

    pub fn on_days(mut self, days: DayMask) -> Self {
        self.days = days;
        self
    }

    /// The TURN_OFF pseudo-entry handed to the delegate on idle timeout.
    pub fn auto_power_off() -> Self {
        Self::new(0, 0, ScheduleAction::TurnOff).named(AUTO_POWER_OFF_NAME)
    }

    pub fn validate(&self) -> Result<()> {
        if self.hour > 23 {
            return Err(Error::Invalid("hour must be 0-23"));
        }
        if self.minute > 59 {
            return Err(Error::Invalid("minute must be 0-59"));
        }
        if self.days.0 & DayMask::EVERY_DAY.0 == 0 {
            return Err(Error::Invalid("no active day"));
        }
        Ok(())
    }

    pub fn matches(&self, now: &LocalTime) -> bool {
        self.enabled
            && self.days.contains(now.weekday)
            && self.hour == now.hour
            && self.minute == now.minute
    }
}

/// Pick the single entry to dispatch among simultaneous matches.
///
/// TURN_OFF beats TURN_ON; within the same action the highest id wins.
pub fn resolve_conflict<'a, I>(matches: I) -> Option<&'a ScheduleEntry>
where
    I: IntoIterator<Item = &'a ScheduleEntry>,
{
    matches
        .into_iter()
        .max_by_key(|e| (e.action == ScheduleAction::TurnOff, e.id))
}

// ═══════════════════════════════════════════════════════════════
//  Schedule table (persisted)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSettings {
    pub schedules: heapless::Vec<ScheduleEntry, MAX_SCHEDULES>,
    pub auto_power_off_enabled: bool,
    pub auto_power_off_minutes: u16,
    /// Highest id handed out this session; freed ids stay retired.
    #[serde(skip)]
    highest_issued_id: u8,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            schedules: heapless::Vec::new(),
            auto_power_off_enabled: false,
            auto_power_off_minutes: 60,
            highest_issued_id: 0,
        }
    }
}

impl PartialEq for ScheduleSettings {
    fn eq(&self, other: &Self) -> bool {
        self.schedules == other.schedules
            && self.auto_power_off_enabled == other.auto_power_off_enabled
            && self.auto_power_off_minutes == other.auto_power_off_minutes
    }
}

impl ScheduleSettings {
    pub fn get(&self, id: u8) -> Option<&ScheduleEntry> {
        self.schedules.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    /// Insert `entry` under a fresh id and return it.
    pub fn add(&mut self, mut entry: ScheduleEntry) -> Result<u8> {
        entry.validate()?;
        if self.schedules.is_full() {
            return Err(Error::ScheduleTableFull);
        }
        let max_live = self.schedules.iter().map(|e| e.id).max().unwrap_or(0);
        let id = self
            .highest_issued_id
            .max(max_live)
            .checked_add(1)
            .ok_or(Error::ScheduleTableFull)?;
        entry.id = id;
        self.schedules
            .push(entry)
            .map_err(|_| Error::ScheduleTableFull)?;
        self.highest_issued_id = id;
        info!("Schedule: added #{id}");
        Ok(id)
    }

    /// Replace the entry `id`, keeping its id.
    pub fn update(&mut self, id: u8, mut entry: ScheduleEntry) -> Result<()> {
        entry.validate()?;
        let slot = self
            .schedules
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(Error::ScheduleNotFound(id))?;
        entry.id = id;
        *slot = entry;
        Ok(())
    }

    pub fn remove(&mut self, id: u8) -> Result<()> {
        let pos = self
            .schedules
            .iter()
            .position(|e| e.id == id)
            .ok_or(Error::ScheduleNotFound(id))?;
        let _ = self.schedules.remove(pos);
        info!("Schedule: removed #{id}");
        Ok(())
    }

    pub fn enable(&mut self, id: u8, enabled: bool) -> Result<()> {
        let slot = self
            .schedules
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(Error::ScheduleNotFound(id))?;
        slot.enabled = enabled;
        Ok(())
    }

    pub fn set_auto_power_off(&mut self, enabled: bool, minutes: u16) -> Result<()> {
        if enabled && !(1..=MAX_AUTO_OFF_MINUTES).contains(&minutes) {
            return Err(Error::Invalid("auto power-off minutes must be 1-480"));
        }
        self.auto_power_off_enabled = enabled;
        self.auto_power_off_minutes = minutes;
        Ok(())
    }

    // ── Persistence ─────────────────────────────────────────────

    pub fn load<S: StoragePort + ?Sized>(storage: &S) -> Self {
        let bytes = match read_blob(storage, SCHEDULE_NAMESPACE, SCHEDULE_KEY) {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound) => {
                debug!("Schedule: no table stored");
                return Self::default();
            }
            Err(e) => {
                warn!("Schedule: read failed ({e}), starting empty");
                return Self::default();
            }
        };
        match postcard::from_bytes::<(u8, Self)>(&bytes) {
            Ok((SCHEDULE_FORMAT_VERSION, mut table)) => {
                table.schedules.retain(|e| e.id != 0 && e.validate().is_ok());
                info!("Schedule: loaded {} entries", table.schedules.len());
                table
            }
            Ok((version, _)) => {
                warn!("Schedule: unsupported table version {version}, starting empty");
                Self::default()
            }
            Err(e) => {
                warn!("Schedule: table corrupt ({e}), starting empty");
                Self::default()
            }
        }
    }

    pub fn save<S: StoragePort + ?Sized>(&self, storage: &mut S) -> core::result::Result<(), StorageError> {
        let bytes = postcard::to_allocvec(&(SCHEDULE_FORMAT_VERSION, self)).map_err(|e| {
            warn!("Schedule: encode failed: {e}");
            StorageError::IoError
        })?;
        storage
            .write(SCHEDULE_NAMESPACE, SCHEDULE_KEY, &bytes)
            .inspect_err(|e| warn!("Schedule: save failed: {e}"))
    }

    pub fn export(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Engine
// ═══════════════════════════════════════════════════════════════

/// Receives fired entries.
pub trait ScheduleDelegate {
    fn on_schedule_fired(&mut self, entry: &ScheduleEntry);
}

#[derive(Debug, Default)]
pub struct ScheduleEngine {
    /// Minute-of-day last evaluated against the table.
    last_minute: Option<u16>,
    last_activity_ms: u64,
}

impl ScheduleEngine {
    pub fn new(now_ms: u64) -> Self {
        Self {
            last_minute: None,
            last_activity_ms: now_ms,
        }
    }

    pub fn reset_idle_timer(&mut self, now_ms: u64) {
        self.last_activity_ms = now_ms;
    }

    pub fn idle_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_activity_ms)
    }

    pub fn is_idle_timeout(
        &self,
        table: &ScheduleSettings,
        mode: MachineMode,
        shot_active: bool,
        now_ms: u64,
    ) -> bool {
        if !table.auto_power_off_enabled || table.auto_power_off_minutes == 0 {
            return false;
        }
        if mode == MachineMode::Standby || shot_active {
            return false;
        }
        self.idle_ms(now_ms) >= u64::from(table.auto_power_off_minutes) * 60_000
    }

    /// Table evaluation alone: returns the entry to dispatch this minute.
    pub fn evaluate(
        &mut self,
        table: &ScheduleSettings,
        now: Option<LocalTime>,
    ) -> Option<ScheduleEntry> {
        let now = now?;
        let minute = now.minute_of_day();
        if self.last_minute == Some(minute) {
            return None;
        }
        self.last_minute = Some(minute);

        let matching = table.schedules.iter().filter(|e| e.matches(&now));
        resolve_conflict(matching).cloned()
    }

    /// Run one evaluation pass and hand fired entries to `delegate`.
    /// Returns how many fired (0..=2).
    pub fn tick<D: ScheduleDelegate + ?Sized>(
        &mut self,
        table: &ScheduleSettings,
        now: Option<LocalTime>,
        mode: MachineMode,
        shot_active: bool,
        now_ms: u64,
        delegate: &mut D,
    ) -> usize {
        let mut fired = 0;
        if let Some(entry) = self.evaluate(table, now) {
            info!(
                "Schedule: #{} '{}' fired ({:?})",
                entry.id, entry.name, entry.action
            );
            delegate.on_schedule_fired(&entry);
            fired += 1;
        }
        if self.is_idle_timeout(table, mode, shot_active, now_ms) {
            info!(
                "Schedule: idle for {} min, auto power-off",
                table.auto_power_off_minutes
            );
            delegate.on_schedule_fired(&ScheduleEntry::auto_power_off());
            self.reset_idle_timer(now_ms);
            fired += 1;
        }
        fired
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
