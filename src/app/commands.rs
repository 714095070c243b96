//! Inbound commands to the controller.
//!
//! These represent everything the outside world (control-board link,
//! dashboard, MQTT, cloud relay) can ask the
//! [`Controller`](super::controller::Controller) to do.  Telemetry variants
//! mirror sensor readings; everything else is a user-originated request and
//! counts as activity for the idle auto-power-off rule.

use crate::runtime::{MachineMode, MachineState, Peer};
use crate::schedule::ScheduleEntry;
use crate::settings::MachineType;
use crate::statistics::MaintenanceKind;

/// Commands that external adapters can send into the controller core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    // --- Control-board telemetry ---
    Temperatures { brew: f32, steam: f32 },
    Heating { brew: bool, steam: bool },
    Pressure(f32),
    Flow(f32),
    Power { watts: f32, voltage: f32 },
    WaterLevel(u8),
    Scale { weight: f32, flow_rate: f32, stable: bool },
    Connectivity { peer: Peer, connected: bool },
    /// The control board (re)booted and introduced itself.
    ControlBoardBoot {
        version: heapless::String<16>,
        reset_reason: u8,
        machine_type: MachineType,
    },
    /// The control board reports its state machine moved.
    ReportState(MachineState),

    // --- User requests ---
    SetMode(MachineMode),
    StartShot,
    EndShot,
    RateShot { index: usize, rating: u8 },
    ClearShotHistory,
    RecordSteamCycle,
    AddPowerUsage(f32),
    RecordMaintenance(MaintenanceKind),
    AddSchedule(ScheduleEntry),
    UpdateSchedule { id: u8, entry: ScheduleEntry },
    RemoveSchedule(u8),
    EnableSchedule { id: u8, enabled: bool },
    SetAutoPowerOff { enabled: bool, minutes: u16 },
    SetMachineType { machine_type: MachineType, force: bool },
    FactoryReset,
}

impl AppCommand {
    /// Telemetry is polled from the control board and never counts as a
    /// user interaction.
    pub fn is_telemetry(&self) -> bool {
        matches!(
            self,
            Self::Temperatures { .. }
                | Self::Heating { .. }
                | Self::Pressure(_)
                | Self::Flow(_)
                | Self::Power { .. }
                | Self::WaterLevel(_)
                | Self::Scale { .. }
                | Self::Connectivity { .. }
                | Self::ControlBoardBoot { .. }
                | Self::ReportState(_)
        )
    }
}

/// What a successfully handled command produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Applied.
    Done,
    /// Valid, but nothing changed (dedup, or no shot to end).
    Unchanged,
    /// A schedule was created under this id.
    ScheduleAdded(u8),
}
