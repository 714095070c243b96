//! BrewOS firmware entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  NvsAdapter     Esp32TimeAdapter   HeapProbe    LogEventSink   │
//! │  (StoragePort)  (ClockPort)        (Resource)   (EventSink)    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Controller (pure logic)                   │    │
//! │  │  Settings · Statistics · History · Runtime · Schedules │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use brewos::adapters::heap::HeapProbe;
use brewos::adapters::log_sink::LogEventSink;
use brewos::adapters::nvs::NvsAdapter;
use brewos::adapters::time::Esp32TimeAdapter;
use brewos::app::controller::Controller;
use brewos::app::events::AppEvent;
use brewos::app::ports::EventSink;
use brewos::config::ControllerConfig;
use brewos::runtime::MachineMode;
use brewos::schedule::ScheduleAction;

// ── Schedule bridge ───────────────────────────────────────────
//
// Observers cannot call back into the controller while it is publishing,
// so fired schedule actions are queued here and applied by the main loop.

#[derive(Clone, Default)]
struct PendingActions(Rc<RefCell<Vec<ScheduleAction>>>);

impl EventSink for PendingActions {
    fn emit(&mut self, event: &AppEvent<'_>) {
        if let AppEvent::ScheduleTriggered(entry) = event {
            self.0.borrow_mut().push(entry.action);
        }
    }
}

impl PendingActions {
    fn drain(&self) -> Vec<ScheduleAction> {
        core::mem::take(&mut *self.0.borrow_mut())
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  BrewOS v{}                          ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Adapters ───────────────────────────────────────────
    let nvs = NvsAdapter::new();
    if !nvs.is_available() {
        warn!("NVS unavailable, running with defaults and no persistence");
    }
    let config = ControllerConfig::default();
    let tick = Duration::from_millis(u64::from(config.tick_interval_ms));

    // ── 3. Controller ─────────────────────────────────────────
    let mut controller = Controller::new(config, nvs, Esp32TimeAdapter::new(), HeapProbe::new())?;

    let pending = PendingActions::default();
    controller.subscribe(Box::new(LogEventSink::new()));
    controller.subscribe(Box::new(pending.clone()));
    controller.begin();

    if controller.settings().power.power_on_boot {
        info!("Power-on-boot enabled, heating up");
        controller.set_machine_mode(MachineMode::On);
    }

    info!("System ready. Entering main loop.");

    // ── 4. Main loop ──────────────────────────────────────────
    loop {
        std::thread::sleep(tick);
        controller.tick();

        for action in pending.drain() {
            let mode = match action {
                ScheduleAction::TurnOn => MachineMode::On,
                ScheduleAction::TurnOff => MachineMode::Standby,
            };
            info!("Schedule action {action:?}");
            controller.set_machine_mode(mode);
        }
    }
}
