//! Settings Store: typed, sectioned user configuration.
//!
//! ```text
//!   NVS namespace "settings"
//!   ├── temperature   {"brewSetpoint":93.5,...}
//!   ├── brew          {"doseWeight":18.0,...}
//!   ├── ...           one JSON document per section
//!   └── preferences
//! ```
//!
//! Each section loads, saves and exports independently.  Loading runs the
//! stored JSON through the same lenient patch used for transport updates,
//! so a corrupt or outdated key falls back to its default without taking
//! the rest of the section with it.  The schedule table is carried here
//! for ownership but persisted by [`crate::schedule`].

pub mod patch;
pub mod sections;

use core::str::FromStr;

use log::{debug, info, warn};
use serde::Serialize;
use serde::de::{Deserialize, DeserializeOwned};
use serde_json::Value;

use crate::app::ports::{StorageError, StoragePort, read_blob};
use crate::schedule::ScheduleSettings;

pub use sections::{
    BrewSettings, CloudSettings, DisplaySettings, FirstDayOfWeek, MachineInfoSettings,
    MachineType, MqttSettings, NetworkSettings, NotificationSettings, PowerSettings,
    PreferenceSettings, ScaleSettings, SystemSettings, TemperatureSettings, TemperatureUnit,
    TimeSettings,
};

/// Storage namespace holding one key per section.
pub const SETTINGS_NAMESPACE: &str = "settings";

// ── Section names ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Temperature,
    Brew,
    Power,
    Network,
    Time,
    Mqtt,
    Cloud,
    Scale,
    Display,
    MachineInfo,
    Notifications,
    System,
    Preferences,
}

impl Section {
    /// Fixed save order.
    pub const ALL: [Section; 13] = [
        Self::Temperature,
        Self::Brew,
        Self::Power,
        Self::Network,
        Self::Time,
        Self::Mqtt,
        Self::Cloud,
        Self::Scale,
        Self::Display,
        Self::MachineInfo,
        Self::Notifications,
        Self::System,
        Self::Preferences,
    ];

    /// External name; doubles as the storage key (NVS keys max 15 chars).
    pub fn name(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Brew => "brew",
            Self::Power => "power",
            Self::Network => "network",
            Self::Time => "time",
            Self::Mqtt => "mqtt",
            Self::Cloud => "cloud",
            Self::Scale => "scale",
            Self::Display => "display",
            Self::MachineInfo => "machineInfo",
            Self::Notifications => "notifications",
            Self::System => "system",
            Self::Preferences => "preferences",
        }
    }
}

impl FromStr for Section {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sec| sec.name() == s)
            .ok_or(crate::error::Error::UnknownSection)
    }
}

impl core::fmt::Display for Section {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Section trait ───────────────────────────────────────────────────

/// One independently loadable/savable group of settings.
pub trait SettingsSection: Default + Serialize {
    const SECTION: Section;
    /// camelCase keys kept in storage but never exported.
    const SECRET_KEYS: &'static [&'static str] = &[];
    type Patch: DeserializeOwned + Default;

    /// Apply every field present in `patch` that passes validation.
    /// Returns how many fields were written.
    fn apply(&mut self, patch: Self::Patch) -> usize;
}

/// Object-safe view over any [`SettingsSection`], so the store can walk
/// sections by [`Section`] value.
pub trait SectionAccess {
    fn apply_json(&mut self, fields: &Value) -> usize;
    fn stored_bytes(&self) -> Result<Vec<u8>, serde_json::Error>;
    fn export(&self) -> Value;
    fn reset(&mut self);
}

impl<T: SettingsSection> SectionAccess for T {
    fn apply_json(&mut self, fields: &Value) -> usize {
        if !fields.is_object() {
            warn!("settings: {} update is not an object, ignored", T::SECTION);
            return 0;
        }
        match T::Patch::deserialize(fields) {
            Ok(patch) => self.apply(patch),
            Err(e) => {
                warn!("settings: {} update unreadable: {e}", T::SECTION);
                0
            }
        }
    }

    fn stored_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    fn export(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            for key in T::SECRET_KEYS {
                map.remove(*key);
            }
        }
        value
    }

    fn reset(&mut self) {
        *self = T::default();
    }
}

// ── Settings aggregate ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub temperature: TemperatureSettings,
    pub brew: BrewSettings,
    pub power: PowerSettings,
    pub network: NetworkSettings,
    pub time: TimeSettings,
    pub mqtt: MqttSettings,
    pub cloud: CloudSettings,
    pub scale: ScaleSettings,
    pub display: DisplaySettings,
    pub machine_info: MachineInfoSettings,
    pub notifications: NotificationSettings,
    pub system: SystemSettings,
    pub preferences: PreferenceSettings,
    pub schedule: ScheduleSettings,
}

impl Settings {
    pub fn section(&self, section: Section) -> &dyn SectionAccess {
        match section {
            Section::Temperature => &self.temperature,
            Section::Brew => &self.brew,
            Section::Power => &self.power,
            Section::Network => &self.network,
            Section::Time => &self.time,
            Section::Mqtt => &self.mqtt,
            Section::Cloud => &self.cloud,
            Section::Scale => &self.scale,
            Section::Display => &self.display,
            Section::MachineInfo => &self.machine_info,
            Section::Notifications => &self.notifications,
            Section::System => &self.system,
            Section::Preferences => &self.preferences,
        }
    }

    pub fn section_mut(&mut self, section: Section) -> &mut dyn SectionAccess {
        match section {
            Section::Temperature => &mut self.temperature,
            Section::Brew => &mut self.brew,
            Section::Power => &mut self.power,
            Section::Network => &mut self.network,
            Section::Time => &mut self.time,
            Section::Mqtt => &mut self.mqtt,
            Section::Cloud => &mut self.cloud,
            Section::Scale => &mut self.scale,
            Section::Display => &mut self.display,
            Section::MachineInfo => &mut self.machine_info,
            Section::Notifications => &mut self.notifications,
            Section::System => &mut self.system,
            Section::Preferences => &mut self.preferences,
        }
    }

    // ── Persistence ─────────────────────────────────────────────────

    /// Read every section, substituting defaults for anything absent or
    /// unreadable.  Never fails.
    pub fn load<S: StoragePort + ?Sized>(storage: &S) -> Self {
        let mut settings = Self::default();
        for section in Section::ALL {
            settings.load_section(section, storage);
        }
        settings
    }

    pub fn load_section<S: StoragePort + ?Sized>(&mut self, section: Section, storage: &S) {
        let target = self.section_mut(section);
        target.reset();
        let bytes = match read_blob(storage, SETTINGS_NAMESPACE, section.name()) {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound) => {
                debug!("settings: {section} not stored, using defaults");
                return;
            }
            Err(e) => {
                warn!("settings: {section} read failed ({e}), using defaults");
                return;
            }
        };
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(fields) => {
                let n = target.apply_json(&fields);
                debug!("settings: {section} loaded ({n} fields)");
            }
            Err(e) => warn!("settings: {section} corrupt ({e}), using defaults"),
        }
    }

    /// Persist exactly one section.
    pub fn save_section<S: StoragePort + ?Sized>(
        &self,
        section: Section,
        storage: &mut S,
    ) -> Result<(), StorageError> {
        let bytes = self.section(section).stored_bytes().map_err(|e| {
            warn!("settings: {section} serialise failed: {e}");
            StorageError::IoError
        })?;
        storage
            .write(SETTINGS_NAMESPACE, section.name(), &bytes)
            .inspect_err(|e| warn!("settings: {section} save failed: {e}"))
    }

    /// Persist every section in [`Section::ALL`] order.  Keeps going past a
    /// failed section and reports the first failure.
    pub fn save_all<S: StoragePort + ?Sized>(&self, storage: &mut S) -> Result<(), StorageError> {
        let mut first_err = None;
        for section in Section::ALL {
            if let Err(e) = self.save_section(section, storage) {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            None => {
                info!("settings: all sections saved");
                Ok(())
            }
            Some(e) => Err(e),
        }
    }

    // ── Partial updates ─────────────────────────────────────────────

    /// Apply the valid keys of `fields` to one section.  Returns how many
    /// fields changed value-slot.
    pub fn apply_partial(&mut self, section: Section, fields: &Value) -> usize {
        self.section_mut(section).apply_json(fields)
    }

    /// Apply a whole-settings document (`{"temperature":{...},"brew":{...}}`).
    /// Unknown section names are skipped.  Returns the sections touched.
    pub fn apply_document(&mut self, document: &Value) -> heapless::Vec<Section, 13> {
        let mut touched = heapless::Vec::new();
        let Some(map) = document.as_object() else {
            warn!("settings: import is not an object, ignored");
            return touched;
        };
        for (name, fields) in map {
            match name.parse::<Section>() {
                Ok(section) => {
                    if self.apply_partial(section, fields) > 0 {
                        let _ = touched.push(section);
                    }
                }
                Err(_) => debug!("settings: import skips unknown section {name:?}"),
            }
        }
        touched
    }

    // ── Export ──────────────────────────────────────────────────────

    /// Every section plus the schedule table, secrets removed.
    pub fn export(&self) -> Value {
        let mut map = serde_json::Map::new();
        for section in Section::ALL {
            map.insert(section.name().into(), self.section(section).export());
        }
        map.insert("schedule".into(), self.schedule.export());
        Value::Object(map)
    }

    pub fn export_section(&self, section: Section) -> Value {
        self.section(section).export()
    }
}
