//! Runtime state machine: the live, never-persisted view of the machine.
//!
//! ```text
//!  INIT ─▶ IDLE/HEATING ─▶ READY ⇄ BREWING
//!                            READY ⇄ STEAMING
//!  any ─▶ ECO ─▶ HEATING ─▶ READY
//!  any ─▶ COOLDOWN
//!  any ─▶ FAULT                    (until the control board clears it)
//! ```
//!
//! Transitions are reported from outside (control-board telemetry, user
//! commands, schedule actions).  Setters return whether anything changed so
//! the controller only notifies on real transitions; telemetry arrives many
//! times a second and mostly repeats itself.
//!
//! While a shot is active the runtime keeps accumulators (peak pressure,
//! temperature sum, first full-pressure sample) and turns them into a
//! [`ShotRecord`] when the shot ends.

use core::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::history::ShotRecord;
use crate::settings::MachineType;

/// Pressure (bar) marking the end of preinfusion.
pub const PREINFUSION_END_BAR: f32 = 4.0;

// ── Enums ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineState {
    #[default]
    Init,
    Idle,
    Heating,
    Ready,
    Brewing,
    Steaming,
    Cooldown,
    Eco,
    Fault,
}

impl MachineState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Idle => "idle",
            Self::Heating => "heating",
            Self::Ready => "ready",
            Self::Brewing => "brewing",
            Self::Steaming => "steaming",
            Self::Cooldown => "cooldown",
            Self::Eco => "eco",
            Self::Fault => "fault",
        }
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineMode {
    #[default]
    Standby,
    On,
    Eco,
}

/// Links whose up/down state is mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peer {
    Wifi,
    Mqtt,
    Cloud,
    ControlBoard,
    Scale,
}

// ── Live state ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeState {
    pub state: MachineState,
    pub mode: MachineMode,

    // --- Boilers (°C) ---
    pub brew_temp: f32,
    pub steam_temp: f32,
    pub brew_heating: bool,
    pub steam_heating: bool,

    // --- Hydraulics / power ---
    /// Bar.
    pub pressure: f32,
    /// ml/s from the flow meter.
    pub flow_rate: f32,
    pub power_watts: f32,
    pub voltage: f32,
    /// Percent.
    pub water_level: u8,

    // --- Scale ---
    pub scale_connected: bool,
    pub scale_weight: f32,
    pub scale_flow_rate: f32,
    pub scale_stable: bool,

    // --- Shot ---
    pub shot_active: bool,
    pub shot_start_ms: u64,
    pub shot_weight: f32,

    // --- Connectivity ---
    pub wifi_connected: bool,
    pub mqtt_connected: bool,
    pub cloud_connected: bool,
    pub control_board_connected: bool,

    // --- Control board ---
    pub control_board_version: heapless::String<16>,
    pub control_board_reset_reason: u8,
    pub machine_type: MachineType,

    pub last_update_ms: u64,
    pub uptime_ms: u64,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            state: MachineState::Init,
            mode: MachineMode::Standby,
            brew_temp: 0.0,
            steam_temp: 0.0,
            brew_heating: false,
            steam_heating: false,
            pressure: 0.0,
            flow_rate: 0.0,
            power_watts: 0.0,
            voltage: 0.0,
            water_level: 100,
            scale_connected: false,
            scale_weight: 0.0,
            scale_flow_rate: 0.0,
            scale_stable: false,
            shot_active: false,
            shot_start_ms: 0,
            shot_weight: 0.0,
            wifi_connected: false,
            mqtt_connected: false,
            cloud_connected: false,
            control_board_connected: false,
            control_board_version: heapless::String::new(),
            control_board_reset_reason: 0,
            machine_type: MachineType::Unknown,
            last_update_ms: 0,
            uptime_ms: 0,
        }
    }
}

/// Accumulators that only mean something while a shot runs.
#[derive(Debug, Clone, Default)]
struct ShotTracker {
    timestamp: u32,
    dose: f32,
    peak_pressure: f32,
    temp_sum: f32,
    temp_samples: u32,
    /// First sample at full pressure.
    full_pressure_ms: Option<u64>,
}

// ── Machine ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Runtime {
    live: RuntimeState,
    shot: ShotTracker,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RuntimeState {
        &self.live
    }

    pub fn machine_state(&self) -> MachineState {
        self.live.state
    }

    pub fn mode(&self) -> MachineMode {
        self.live.mode
    }

    pub fn shot_active(&self) -> bool {
        self.live.shot_active
    }

    // ── Transitions (deduplicated) ──────────────────────────────────

    pub fn set_machine_state(&mut self, state: MachineState) -> bool {
        if self.live.state == state {
            return false;
        }
        info!("Runtime: {} -> {}", self.live.state, state);
        self.live.state = state;
        true
    }

    pub fn set_machine_mode(&mut self, mode: MachineMode) -> bool {
        if self.live.mode == mode {
            return false;
        }
        info!("Runtime: mode {:?} -> {:?}", self.live.mode, mode);
        self.live.mode = mode;
        true
    }

    pub fn set_connected(&mut self, peer: Peer, connected: bool) -> bool {
        let slot = match peer {
            Peer::Wifi => &mut self.live.wifi_connected,
            Peer::Mqtt => &mut self.live.mqtt_connected,
            Peer::Cloud => &mut self.live.cloud_connected,
            Peer::ControlBoard => &mut self.live.control_board_connected,
            Peer::Scale => &mut self.live.scale_connected,
        };
        if *slot == connected {
            return false;
        }
        *slot = connected;
        debug!("Runtime: {peer:?} {}", if connected { "up" } else { "down" });
        true
    }

    /// Returns whether the stored type changed.
    pub fn set_machine_type(&mut self, machine_type: MachineType) -> bool {
        if self.live.machine_type == machine_type {
            return false;
        }
        self.live.machine_type = machine_type;
        true
    }

    pub fn set_control_board_info(&mut self, version: &str, reset_reason: u8) {
        self.live.control_board_version = crate::settings::patch::bounded(version);
        self.live.control_board_reset_reason = reset_reason;
    }

    // ── Telemetry mirrors ───────────────────────────────────────────

    pub fn update_temperatures(&mut self, brew: f32, steam: f32, now_ms: u64) {
        self.live.brew_temp = brew;
        self.live.steam_temp = steam;
        self.live.last_update_ms = now_ms;
        if self.live.shot_active && brew.is_finite() {
            self.shot.temp_sum += brew;
            self.shot.temp_samples += 1;
        }
    }

    pub fn update_heating(&mut self, brew: bool, steam: bool) {
        self.live.brew_heating = brew;
        self.live.steam_heating = steam;
    }

    pub fn update_pressure(&mut self, bar: f32, now_ms: u64) {
        self.live.pressure = bar;
        self.live.last_update_ms = now_ms;
        if self.live.shot_active {
            if bar > self.shot.peak_pressure {
                self.shot.peak_pressure = bar;
            }
            if bar >= PREINFUSION_END_BAR && self.shot.full_pressure_ms.is_none() {
                self.shot.full_pressure_ms = Some(now_ms);
            }
        }
    }

    pub fn update_flow(&mut self, rate: f32, now_ms: u64) {
        self.live.flow_rate = rate;
        self.live.last_update_ms = now_ms;
    }

    pub fn update_power(&mut self, watts: f32, voltage: f32, now_ms: u64) {
        self.live.power_watts = watts;
        self.live.voltage = voltage;
        self.live.last_update_ms = now_ms;
    }

    pub fn update_water_level(&mut self, percent: u8, now_ms: u64) {
        self.live.water_level = percent.min(100);
        self.live.last_update_ms = now_ms;
    }

    /// A scale reading also marks the scale as connected.
    pub fn update_scale(&mut self, weight: f32, flow_rate: f32, stable: bool, now_ms: u64) {
        self.live.scale_connected = true;
        self.live.scale_weight = weight;
        self.live.scale_flow_rate = flow_rate;
        self.live.scale_stable = stable;
        self.live.last_update_ms = now_ms;
        if self.live.shot_active {
            self.live.shot_weight = weight;
        }
    }

    pub fn refresh_uptime(&mut self, now_ms: u64) {
        self.live.uptime_ms = now_ms;
    }

    // ── Shot lifecycle ──────────────────────────────────────────────

    /// Begin a shot.  Refused while one is running or the machine is in
    /// FAULT.  `fallback_dose` is used when no scale is connected.
    pub fn start_shot(&mut self, now_ms: u64, timestamp: u32, fallback_dose: f32) -> bool {
        if self.live.shot_active || self.live.state == MachineState::Fault {
            return false;
        }
        let dose = if self.live.scale_connected && self.live.scale_weight > 0.0 {
            self.live.scale_weight
        } else {
            fallback_dose
        };
        self.shot = ShotTracker {
            timestamp,
            dose,
            ..ShotTracker::default()
        };
        self.live.shot_active = true;
        self.live.shot_start_ms = now_ms;
        self.live.shot_weight = 0.0;
        self.live.state = MachineState::Brewing;
        info!("Runtime: shot started (dose {dose:.1} g)");
        true
    }

    /// Finish the running shot and produce its record.  `None` if no shot
    /// was active.
    pub fn end_shot(&mut self, now_ms: u64) -> Option<ShotRecord> {
        if !self.live.shot_active {
            return None;
        }
        let start = self.live.shot_start_ms;
        let duration_ms = u32::try_from(now_ms.saturating_sub(start)).unwrap_or(u32::MAX);
        let yield_weight = self.live.shot_weight;

        let avg_flow_rate = if duration_ms > 0 {
            yield_weight / (duration_ms as f32 / 1000.0)
        } else {
            0.0
        };
        let avg_temperature = if self.shot.temp_samples > 0 {
            self.shot.temp_sum / self.shot.temp_samples as f32
        } else {
            0.0
        };
        let preinfusion_ms = self
            .shot
            .full_pressure_ms
            .map_or(0, |t| u32::try_from(t.saturating_sub(start)).unwrap_or(u32::MAX));

        let record = ShotRecord {
            timestamp: self.shot.timestamp,
            dose_weight: self.shot.dose,
            yield_weight,
            duration_ms,
            preinfusion_ms,
            avg_flow_rate,
            peak_pressure: self.shot.peak_pressure,
            avg_temperature,
            rating: None,
        };

        self.live.shot_active = false;
        self.live.state = MachineState::Ready;
        info!(
            "Runtime: shot done {:.1} g in {} ms ({:.2} g/s)",
            yield_weight, duration_ms, avg_flow_rate
        );
        Some(record)
    }

    pub fn shot_elapsed_ms(&self, now_ms: u64) -> u64 {
        if self.live.shot_active {
            now_ms.saturating_sub(self.live.shot_start_ms)
        } else {
            0
        }
    }
}
