//! The individual settings sections, their defaults and their patches.
//!
//! Every section is a plain struct with a hand-written `Default` (a fresh
//! device must be fully functional with no persisted data) and a `*Patch`
//! twin used both for partial updates from the transport layer and for
//! loading the persisted JSON back.

use heapless::String;
use serde::{Deserialize, Serialize};

use super::patch::{bounded, is_valid_hostname, lenient, set, set_ranged, set_text};
use super::{Section, SettingsSection};
use crate::schedule::HeatingStrategy;

// ═══════════════════════════════════════════════════════════════════════════
//  Temperature
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureSettings {
    /// °C
    pub brew_setpoint: f32,
    /// °C
    pub steam_setpoint: f32,
    pub brew_offset: f32,
    pub steam_offset: f32,
    pub eco_brew_temp: f32,
    pub eco_timeout_minutes: u16,
}

impl Default for TemperatureSettings {
    fn default() -> Self {
        Self {
            brew_setpoint: 93.5,
            steam_setpoint: 145.0,
            brew_offset: 0.0,
            steam_offset: 0.0,
            eco_brew_temp: 80.0,
            eco_timeout_minutes: 30,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemperaturePatch {
    #[serde(deserialize_with = "lenient")]
    pub brew_setpoint: Option<f32>,
    #[serde(deserialize_with = "lenient")]
    pub steam_setpoint: Option<f32>,
    #[serde(deserialize_with = "lenient")]
    pub brew_offset: Option<f32>,
    #[serde(deserialize_with = "lenient")]
    pub steam_offset: Option<f32>,
    #[serde(deserialize_with = "lenient")]
    pub eco_brew_temp: Option<f32>,
    #[serde(deserialize_with = "lenient")]
    pub eco_timeout_minutes: Option<u16>,
}

impl SettingsSection for TemperatureSettings {
    const SECTION: Section = Section::Temperature;
    type Patch = TemperaturePatch;

    fn apply(&mut self, p: TemperaturePatch) -> usize {
        let mut n = 0;
        set_ranged("brewSetpoint", &mut self.brew_setpoint, p.brew_setpoint, 80.0..=105.0, &mut n);
        set_ranged("steamSetpoint", &mut self.steam_setpoint, p.steam_setpoint, 100.0..=160.0, &mut n);
        set_ranged("brewOffset", &mut self.brew_offset, p.brew_offset, -10.0..=10.0, &mut n);
        set_ranged("steamOffset", &mut self.steam_offset, p.steam_offset, -10.0..=10.0, &mut n);
        set_ranged("ecoBrewTemp", &mut self.eco_brew_temp, p.eco_brew_temp, 50.0..=100.0, &mut n);
        set_ranged("ecoTimeoutMinutes", &mut self.eco_timeout_minutes, p.eco_timeout_minutes, 0..=480, &mut n);
        n
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Brew (brew-by-weight, preinfusion)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrewSettings {
    pub bbw_enabled: bool,
    /// Grams of ground coffee.
    pub dose_weight: f32,
    /// Grams in the cup at which brew-by-weight stops.
    pub target_weight: f32,
    /// Grams still dripping after the pump stops.
    pub stop_offset: f32,
    pub auto_tare: bool,
    /// Seconds.
    pub preinfusion_time: f32,
    /// Bar.
    pub preinfusion_pressure: f32,
    pub preinfusion_pause_ms: u16,
}

impl Default for BrewSettings {
    fn default() -> Self {
        Self {
            bbw_enabled: false,
            dose_weight: 18.0,
            target_weight: 36.0,
            stop_offset: 2.0,
            auto_tare: true,
            preinfusion_time: 0.0,
            preinfusion_pressure: 2.0,
            preinfusion_pause_ms: 5000,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrewPatch {
    #[serde(deserialize_with = "lenient")]
    pub bbw_enabled: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub dose_weight: Option<f32>,
    #[serde(deserialize_with = "lenient")]
    pub target_weight: Option<f32>,
    #[serde(deserialize_with = "lenient")]
    pub stop_offset: Option<f32>,
    #[serde(deserialize_with = "lenient")]
    pub auto_tare: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub preinfusion_time: Option<f32>,
    #[serde(deserialize_with = "lenient")]
    pub preinfusion_pressure: Option<f32>,
    #[serde(deserialize_with = "lenient")]
    pub preinfusion_pause_ms: Option<u16>,
}

impl SettingsSection for BrewSettings {
    const SECTION: Section = Section::Brew;
    type Patch = BrewPatch;

    fn apply(&mut self, p: BrewPatch) -> usize {
        let mut n = 0;
        set(&mut self.bbw_enabled, p.bbw_enabled, &mut n);
        set_ranged("doseWeight", &mut self.dose_weight, p.dose_weight, 1.0..=40.0, &mut n);
        set_ranged("targetWeight", &mut self.target_weight, p.target_weight, 1.0..=200.0, &mut n);
        set_ranged("stopOffset", &mut self.stop_offset, p.stop_offset, 0.0..=10.0, &mut n);
        set(&mut self.auto_tare, p.auto_tare, &mut n);
        set_ranged("preinfusionTime", &mut self.preinfusion_time, p.preinfusion_time, 0.0..=30.0, &mut n);
        set_ranged(
            "preinfusionPressure",
            &mut self.preinfusion_pressure,
            p.preinfusion_pressure,
            0.0..=6.0,
            &mut n,
        );
        set_ranged(
            "preinfusionPauseMs",
            &mut self.preinfusion_pause_ms,
            p.preinfusion_pause_ms,
            0..=30_000,
            &mut n,
        );
        n
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Power
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerSettings {
    /// Volts RMS.
    pub mains_voltage: u16,
    /// Amps the heaters may draw together.
    pub max_current: f32,
    pub power_on_boot: bool,
}

impl Default for PowerSettings {
    fn default() -> Self {
        Self {
            mains_voltage: 220,
            max_current: 13.0,
            power_on_boot: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PowerPatch {
    #[serde(deserialize_with = "lenient")]
    pub mains_voltage: Option<u16>,
    #[serde(deserialize_with = "lenient")]
    pub max_current: Option<f32>,
    #[serde(deserialize_with = "lenient")]
    pub power_on_boot: Option<bool>,
}

impl SettingsSection for PowerSettings {
    const SECTION: Section = Section::Power;
    type Patch = PowerPatch;

    fn apply(&mut self, p: PowerPatch) -> usize {
        let mut n = 0;
        set_ranged("mainsVoltage", &mut self.mains_voltage, p.mains_voltage, 100..=250, &mut n);
        set_ranged("maxCurrent", &mut self.max_current, p.max_current, 1.0..=16.0, &mut n);
        set(&mut self.power_on_boot, p.power_on_boot, &mut n);
        n
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Network
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSettings {
    pub wifi_ssid: String<32>,
    pub wifi_password: String<64>,
    /// Derived: an SSID has been stored.
    pub wifi_configured: bool,
    pub hostname: String<31>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            wifi_configured: false,
            hostname: bounded("brewos"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NetworkPatch {
    #[serde(deserialize_with = "lenient")]
    pub wifi_ssid: Option<std::string::String>,
    #[serde(deserialize_with = "lenient")]
    pub wifi_password: Option<std::string::String>,
    #[serde(deserialize_with = "lenient")]
    pub hostname: Option<std::string::String>,
}

impl SettingsSection for NetworkSettings {
    const SECTION: Section = Section::Network;
    const SECRET_KEYS: &'static [&'static str] = &["wifiPassword"];
    type Patch = NetworkPatch;

    fn apply(&mut self, p: NetworkPatch) -> usize {
        let mut n = 0;
        set_text("wifiSsid", &mut self.wifi_ssid, p.wifi_ssid, &mut n);
        set_text("wifiPassword", &mut self.wifi_password, p.wifi_password, &mut n);
        let hostname = p.hostname.filter(|h| {
            let ok = is_valid_hostname(h);
            if !ok {
                log::warn!("settings: hostname {h:?} rejected");
            }
            ok
        });
        set_text("hostname", &mut self.hostname, hostname, &mut n);
        self.wifi_configured = !self.wifi_ssid.is_empty();
        n
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Time
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSettings {
    pub use_ntp: bool,
    pub ntp_server: String<63>,
    pub utc_offset_minutes: i16,
    pub dst_enabled: bool,
    pub dst_offset_minutes: i16,
}

impl Default for TimeSettings {
    fn default() -> Self {
        Self {
            use_ntp: true,
            ntp_server: bounded("pool.ntp.org"),
            utc_offset_minutes: 0,
            dst_enabled: false,
            dst_offset_minutes: 60,
        }
    }
}

impl TimeSettings {
    /// Effective offset east of UTC, DST included.
    pub fn local_offset_minutes(&self) -> i32 {
        let dst = if self.dst_enabled {
            self.dst_offset_minutes
        } else {
            0
        };
        i32::from(self.utc_offset_minutes) + i32::from(dst)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimePatch {
    #[serde(deserialize_with = "lenient")]
    pub use_ntp: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub ntp_server: Option<std::string::String>,
    #[serde(deserialize_with = "lenient")]
    pub utc_offset_minutes: Option<i16>,
    #[serde(deserialize_with = "lenient")]
    pub dst_enabled: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub dst_offset_minutes: Option<i16>,
}

impl SettingsSection for TimeSettings {
    const SECTION: Section = Section::Time;
    type Patch = TimePatch;

    fn apply(&mut self, p: TimePatch) -> usize {
        let mut n = 0;
        set(&mut self.use_ntp, p.use_ntp, &mut n);
        set_text("ntpServer", &mut self.ntp_server, p.ntp_server, &mut n);
        set_ranged("utcOffsetMinutes", &mut self.utc_offset_minutes, p.utc_offset_minutes, -720..=840, &mut n);
        set(&mut self.dst_enabled, p.dst_enabled, &mut n);
        set_ranged("dstOffsetMinutes", &mut self.dst_offset_minutes, p.dst_offset_minutes, 0..=120, &mut n);
        n
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  MQTT
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MqttSettings {
    pub enabled: bool,
    pub broker: String<63>,
    pub port: u16,
    pub username: String<31>,
    pub password: String<63>,
    pub base_topic: String<31>,
    /// Publish Home Assistant discovery documents.
    pub discovery: bool,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            broker: String::new(),
            port: 1883,
            username: String::new(),
            password: String::new(),
            base_topic: bounded("brewos"),
            discovery: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MqttPatch {
    #[serde(deserialize_with = "lenient")]
    pub enabled: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub broker: Option<std::string::String>,
    #[serde(deserialize_with = "lenient")]
    pub port: Option<u16>,
    #[serde(deserialize_with = "lenient")]
    pub username: Option<std::string::String>,
    #[serde(deserialize_with = "lenient")]
    pub password: Option<std::string::String>,
    #[serde(deserialize_with = "lenient")]
    pub base_topic: Option<std::string::String>,
    #[serde(deserialize_with = "lenient")]
    pub discovery: Option<bool>,
}

impl SettingsSection for MqttSettings {
    const SECTION: Section = Section::Mqtt;
    const SECRET_KEYS: &'static [&'static str] = &["password"];
    type Patch = MqttPatch;

    fn apply(&mut self, p: MqttPatch) -> usize {
        let mut n = 0;
        set(&mut self.enabled, p.enabled, &mut n);
        set_text("broker", &mut self.broker, p.broker, &mut n);
        set_ranged("port", &mut self.port, p.port, 1..=u16::MAX, &mut n);
        set_text("username", &mut self.username, p.username, &mut n);
        set_text("password", &mut self.password, p.password, &mut n);
        set_text("baseTopic", &mut self.base_topic, p.base_topic, &mut n);
        set(&mut self.discovery, p.discovery, &mut n);
        n
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Cloud relay
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudSettings {
    pub enabled: bool,
    pub server_url: String<127>,
    /// UUID.
    pub device_id: String<36>,
    pub device_key: String<64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CloudPatch {
    #[serde(deserialize_with = "lenient")]
    pub enabled: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub server_url: Option<std::string::String>,
    #[serde(deserialize_with = "lenient")]
    pub device_id: Option<std::string::String>,
    #[serde(deserialize_with = "lenient")]
    pub device_key: Option<std::string::String>,
}

impl SettingsSection for CloudSettings {
    const SECTION: Section = Section::Cloud;
    const SECRET_KEYS: &'static [&'static str] = &["deviceKey"];
    type Patch = CloudPatch;

    fn apply(&mut self, p: CloudPatch) -> usize {
        let mut n = 0;
        set(&mut self.enabled, p.enabled, &mut n);
        set_text("serverUrl", &mut self.server_url, p.server_url, &mut n);
        set_text("deviceId", &mut self.device_id, p.device_id, &mut n);
        set_text("deviceKey", &mut self.device_key, p.device_key, &mut n);
        n
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Scale
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleSettings {
    pub enabled: bool,
    /// BLE address, `AA:BB:CC:DD:EE:FF`.
    pub paired_address: String<17>,
    pub paired_name: String<31>,
    pub scale_type: u8,
}

impl Default for ScaleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            paired_address: String::new(),
            paired_name: String::new(),
            scale_type: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScalePatch {
    #[serde(deserialize_with = "lenient")]
    pub enabled: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub paired_address: Option<std::string::String>,
    #[serde(deserialize_with = "lenient")]
    pub paired_name: Option<std::string::String>,
    #[serde(deserialize_with = "lenient")]
    pub scale_type: Option<u8>,
}

impl SettingsSection for ScaleSettings {
    const SECTION: Section = Section::Scale;
    type Patch = ScalePatch;

    fn apply(&mut self, p: ScalePatch) -> usize {
        let mut n = 0;
        set(&mut self.enabled, p.enabled, &mut n);
        set_text("pairedAddress", &mut self.paired_address, p.paired_address, &mut n);
        set_text("pairedName", &mut self.paired_name, p.paired_name, &mut n);
        set(&mut self.scale_type, p.scale_type, &mut n);
        n
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Display
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySettings {
    pub brightness: u8,
    /// Seconds until the screen dims; 0 = never.
    pub screen_timeout: u8,
    pub show_shot_timer: bool,
    pub show_weight: bool,
    pub show_pressure: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            brightness: 200,
            screen_timeout: 30,
            show_shot_timer: true,
            show_weight: true,
            show_pressure: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DisplayPatch {
    #[serde(deserialize_with = "lenient")]
    pub brightness: Option<u8>,
    #[serde(deserialize_with = "lenient")]
    pub screen_timeout: Option<u8>,
    #[serde(deserialize_with = "lenient")]
    pub show_shot_timer: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub show_weight: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub show_pressure: Option<bool>,
}

impl SettingsSection for DisplaySettings {
    const SECTION: Section = Section::Display;
    type Patch = DisplayPatch;

    fn apply(&mut self, p: DisplayPatch) -> usize {
        let mut n = 0;
        set(&mut self.brightness, p.brightness, &mut n);
        set(&mut self.screen_timeout, p.screen_timeout, &mut n);
        set(&mut self.show_shot_timer, p.show_shot_timer, &mut n);
        set(&mut self.show_weight, p.show_weight, &mut n);
        set(&mut self.show_pressure, p.show_pressure, &mut n);
        n
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Machine identity
// ═══════════════════════════════════════════════════════════════════════════

/// Boiler layout reported by the control board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineType {
    #[default]
    Unknown,
    DualBoiler,
    SingleBoiler,
    HeatExchanger,
    Thermoblock,
}

impl MachineType {
    /// Wire code used by the control board.
    pub fn code(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::DualBoiler => 1,
            Self::SingleBoiler => 2,
            Self::HeatExchanger => 3,
            Self::Thermoblock => 4,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::DualBoiler,
            2 => Self::SingleBoiler,
            3 => Self::HeatExchanger,
            4 => Self::Thermoblock,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::DualBoiler => "dual_boiler",
            Self::SingleBoiler => "single_boiler",
            Self::HeatExchanger => "heat_exchanger",
            Self::Thermoblock => "thermoblock",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineInfoSettings {
    pub device_name: String<31>,
    pub machine_brand: String<31>,
    pub machine_model: String<31>,
    pub machine_type: MachineType,
}

impl Default for MachineInfoSettings {
    fn default() -> Self {
        Self {
            device_name: bounded("BrewOS"),
            machine_brand: String::new(),
            machine_model: String::new(),
            machine_type: MachineType::Unknown,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MachineInfoPatch {
    #[serde(deserialize_with = "lenient")]
    pub device_name: Option<std::string::String>,
    #[serde(deserialize_with = "lenient")]
    pub machine_brand: Option<std::string::String>,
    #[serde(deserialize_with = "lenient")]
    pub machine_model: Option<std::string::String>,
    #[serde(deserialize_with = "lenient")]
    pub machine_type: Option<MachineType>,
}

impl SettingsSection for MachineInfoSettings {
    const SECTION: Section = Section::MachineInfo;
    type Patch = MachineInfoPatch;

    fn apply(&mut self, p: MachineInfoPatch) -> usize {
        let mut n = 0;
        set_text("deviceName", &mut self.device_name, p.device_name, &mut n);
        set_text("machineBrand", &mut self.machine_brand, p.machine_brand, &mut n);
        set_text("machineModel", &mut self.machine_model, p.machine_model, &mut n);
        set(&mut self.machine_type, p.machine_type, &mut n);
        n
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Notifications
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub machine_ready: bool,
    pub water_empty: bool,
    pub descale_due: bool,
    pub service_due: bool,
    pub backflush_due: bool,
    pub machine_error: bool,
    pub control_board_offline: bool,
    pub schedule_triggered: bool,
    pub brew_complete: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            machine_ready: true,
            water_empty: true,
            descale_due: true,
            service_due: true,
            backflush_due: true,
            machine_error: true,
            control_board_offline: true,
            schedule_triggered: true,
            brew_complete: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationPatch {
    #[serde(deserialize_with = "lenient")]
    pub machine_ready: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub water_empty: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub descale_due: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub service_due: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub backflush_due: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub machine_error: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub control_board_offline: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub schedule_triggered: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub brew_complete: Option<bool>,
}

impl SettingsSection for NotificationSettings {
    const SECTION: Section = Section::Notifications;
    type Patch = NotificationPatch;

    fn apply(&mut self, p: NotificationPatch) -> usize {
        let mut n = 0;
        set(&mut self.machine_ready, p.machine_ready, &mut n);
        set(&mut self.water_empty, p.water_empty, &mut n);
        set(&mut self.descale_due, p.descale_due, &mut n);
        set(&mut self.service_due, p.service_due, &mut n);
        set(&mut self.backflush_due, p.backflush_due, &mut n);
        set(&mut self.machine_error, p.machine_error, &mut n);
        set(&mut self.control_board_offline, p.control_board_offline, &mut n);
        set(&mut self.schedule_triggered, p.schedule_triggered, &mut n);
        set(&mut self.brew_complete, p.brew_complete, &mut n);
        n
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  System flags
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettings {
    pub setup_complete: bool,
    pub log_buffer_enabled: bool,
    pub debug_logs_enabled: bool,
    pub control_board_log_forwarding: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SystemPatch {
    #[serde(deserialize_with = "lenient")]
    pub setup_complete: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub log_buffer_enabled: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub debug_logs_enabled: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub control_board_log_forwarding: Option<bool>,
}

impl SettingsSection for SystemSettings {
    const SECTION: Section = Section::System;
    type Patch = SystemPatch;

    fn apply(&mut self, p: SystemPatch) -> usize {
        let mut n = 0;
        set(&mut self.setup_complete, p.setup_complete, &mut n);
        set(&mut self.log_buffer_enabled, p.log_buffer_enabled, &mut n);
        set(&mut self.debug_logs_enabled, p.debug_logs_enabled, &mut n);
        set(
            &mut self.control_board_log_forwarding,
            p.control_board_log_forwarding,
            &mut n,
        );
        n
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  User preferences
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirstDayOfWeek {
    #[default]
    Sunday,
    Monday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceSettings {
    pub first_day_of_week: FirstDayOfWeek,
    pub use_24_hour_time: bool,
    pub temperature_unit: TemperatureUnit,
    /// Per kWh, in `currency`.
    pub electricity_price: f32,
    /// ISO 4217.
    pub currency: String<3>,
    pub last_heating_strategy: HeatingStrategy,
    /// The dashboard has written preferences at least once.
    pub initialized: bool,
}

impl Default for PreferenceSettings {
    fn default() -> Self {
        Self {
            first_day_of_week: FirstDayOfWeek::Sunday,
            use_24_hour_time: false,
            temperature_unit: TemperatureUnit::Celsius,
            electricity_price: 0.15,
            currency: bounded("USD"),
            last_heating_strategy: HeatingStrategy::Sequential,
            initialized: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreferencePatch {
    #[serde(deserialize_with = "lenient")]
    pub first_day_of_week: Option<FirstDayOfWeek>,
    #[serde(deserialize_with = "lenient")]
    pub use_24_hour_time: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub temperature_unit: Option<TemperatureUnit>,
    #[serde(deserialize_with = "lenient")]
    pub electricity_price: Option<f32>,
    #[serde(deserialize_with = "lenient")]
    pub currency: Option<std::string::String>,
    #[serde(deserialize_with = "lenient")]
    pub last_heating_strategy: Option<HeatingStrategy>,
    #[serde(deserialize_with = "lenient")]
    pub initialized: Option<bool>,
}

impl SettingsSection for PreferenceSettings {
    const SECTION: Section = Section::Preferences;
    type Patch = PreferencePatch;

    fn apply(&mut self, p: PreferencePatch) -> usize {
        let mut n = 0;
        set(&mut self.first_day_of_week, p.first_day_of_week, &mut n);
        set(&mut self.use_24_hour_time, p.use_24_hour_time, &mut n);
        set(&mut self.temperature_unit, p.temperature_unit, &mut n);
        set_ranged("electricityPrice", &mut self.electricity_price, p.electricity_price, 0.0..=10.0, &mut n);
        set_text("currency", &mut self.currency, p.currency, &mut n);
        set(&mut self.last_heating_strategy, p.last_heating_strategy, &mut n);
        set(&mut self.initialized, p.initialized, &mut n);
        n
    }
}
