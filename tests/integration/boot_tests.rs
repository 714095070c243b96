//! Boot, statistics write economy, daily rollover and factory reset.

use brewos::adapters::heap::HeapProbe;
use brewos::adapters::nvs::NvsAdapter;
use brewos::app::commands::AppCommand;
use brewos::app::controller::Controller;
use brewos::config::ControllerConfig;
use brewos::history::HISTORY_NAMESPACE;
use brewos::runtime::MachineMode;
use brewos::schedule::{ScheduleAction, ScheduleEntry};
use brewos::settings::{MachineType, SETTINGS_NAMESPACE};
use brewos::statistics::{MaintenanceKind, STATS_NAMESPACE};
use serde_json::json;

use crate::mock_ports::{Harness, ManualClock, MemStorage, Seen};

// 2024-01-01T23:58:00Z, a Monday.
const MONDAY_2358: u64 = 1_704_067_200 + 23 * 3600 + 58 * 60;

#[test]
fn fresh_device_boots_on_defaults_without_writing() {
    let h = Harness::boot();
    assert!(h.ctl.history().is_empty());
    assert_eq!(h.ctl.stats().total_shots, 0);
    assert!((h.ctl.settings().brew.dose_weight - 18.0).abs() < 1e-4);
    assert_eq!(h.ctl.settings().machine_info.machine_type, MachineType::Unknown);
    assert!(h.ctl.settings().schedule.is_empty());
    assert_eq!(h.storage.total_writes(), 0);
}

#[test]
fn everything_persisted_comes_back_after_reboot() {
    let mut h = Harness::boot();
    h.ctl
        .apply_section("brew", &json!({"doseWeight": 20.5}))
        .unwrap();
    h.ctl
        .add_schedule(ScheduleEntry::new(7, 0, ScheduleAction::TurnOn).named("Morning"))
        .unwrap();
    h.ctl.record_maintenance(MaintenanceKind::Descale);

    let h = h.reboot();
    assert!((h.ctl.settings().brew.dose_weight - 20.5).abs() < 1e-4);
    assert_eq!(h.ctl.settings().schedule.len(), 1);
    assert_eq!(h.ctl.settings().schedule.schedules[0].name.as_str(), "Morning");
}

#[test]
fn corrupt_section_falls_back_alone() {
    let storage = MemStorage::new();
    storage.put(SETTINGS_NAMESPACE, "brew", b"{not json");
    storage.put(SETTINGS_NAMESPACE, "power", br#"{"mainsVoltage": 110, "maxCurrent": "lots"}"#);

    let h = Harness::boot_with(storage, ManualClock::new());
    let s = h.ctl.settings();
    assert!((s.brew.dose_weight - 18.0).abs() < 1e-4);
    assert_eq!(s.power.mains_voltage, 110);
    assert!((s.power.max_current - 13.0).abs() < 1e-4);
}

#[test]
fn unavailable_storage_keeps_working_in_memory() {
    let mut ctl = Controller::new(
        ControllerConfig::default(),
        NvsAdapter::unavailable(),
        ManualClock::new(),
        HeapProbe::new(),
    )
    .unwrap();
    ctl.begin();

    assert_eq!(ctl.apply_section("brew", &json!({"targetWeight": 40.0})), Ok(1));
    assert!((ctl.settings().brew.target_weight - 40.0).abs() < 1e-4);
    assert!(ctl.start_shot());
    assert!(ctl.end_shot().is_some());
    assert_eq!(ctl.stats().total_shots, 1);
    ctl.tick();
}

#[test]
fn stats_saved_on_interval_only_when_dirty() {
    let mut h = Harness::boot();
    h.run_for(600_000, 10_000);
    assert_eq!(h.storage.writes_to(STATS_NAMESPACE), 0, "nothing changed");

    h.ctl.handle_command(AppCommand::RecordSteamCycle).unwrap();
    h.run_for(200_000, 10_000);
    assert_eq!(h.storage.writes_to(STATS_NAMESPACE), 0, "inside the interval");

    h.run_for(100_000, 10_000);
    assert_eq!(h.storage.writes_to(STATS_NAMESPACE), 1);
    assert!(!h.ctl.is_stats_dirty());

    h.run_for(600_000, 10_000);
    assert_eq!(h.storage.writes_to(STATS_NAMESPACE), 1);

    let h = h.reboot();
    assert_eq!(h.ctl.stats().total_steam_cycles, 1);
}

#[test]
fn maintenance_saves_immediately() {
    let mut h = Harness::boot();
    h.clock.set_unix(MONDAY_2358);
    h.ctl.start_shot();
    h.clock.advance(1_000);
    h.ctl.end_shot();

    h.ctl
        .handle_command(AppCommand::RecordMaintenance(MaintenanceKind::Backflush))
        .unwrap();
    assert_eq!(h.storage.writes_to(STATS_NAMESPACE), 1);
    let stats = h.ctl.stats();
    assert_eq!(stats.shots_since_backflush, 0);
    assert_eq!(stats.shots_since_group_clean, 0);
    assert_eq!(stats.shots_since_descale, 1);
    assert_eq!(stats.last_backflush_timestamp, (MONDAY_2358 + 1) as u32);
}

#[test]
fn negative_power_usage_is_ignored() {
    let mut h = Harness::boot();
    h.events.clear();
    assert!(!h.ctl.add_power_usage(-1.0));
    assert!(h.ctl.add_power_usage(0.25));
    assert!((h.ctl.stats().total_kwh - 0.25).abs() < 1e-6);
    assert_eq!(h.events.count(|s| matches!(s, Seen::Stats { .. })), 1);
}

#[test]
fn daily_counters_reset_at_local_midnight_only_forward() {
    let mut h = Harness::boot();
    h.clock.set_unix(MONDAY_2358);
    h.ctl.tick();

    h.ctl.start_shot();
    h.clock.advance(25_000);
    h.ctl.end_shot();
    assert_eq!(h.ctl.stats().shots_today, 1);

    // Cross midnight.
    h.run_for(120_000, 10_000);
    assert_eq!(h.ctl.stats().shots_today, 0);
    assert_eq!(h.ctl.stats().total_shots, 1);

    h.ctl.start_shot();
    h.clock.advance(25_000);
    h.ctl.end_shot();

    // NTP steps the clock back into Monday: no reset.
    h.clock.set_unix(MONDAY_2358);
    h.ctl.tick();
    assert_eq!(h.ctl.stats().shots_today, 1);
}

#[test]
fn local_offset_moves_midnight() {
    let mut h = Harness::boot();
    h.ctl
        .apply_section("time", &json!({"utcOffsetMinutes": 120}))
        .unwrap();
    // 21:58 UTC is 23:58 at UTC+2.
    h.clock.set_unix(MONDAY_2358 - 2 * 3600);
    h.ctl.tick();
    h.ctl.start_shot();
    h.clock.advance(1_000);
    h.ctl.end_shot();

    h.run_for(180_000, 10_000);
    assert_eq!(h.ctl.stats().shots_today, 0);
}

#[test]
fn on_time_accumulates_while_powered() {
    let mut h = Harness::boot();
    h.ctl.handle_command(AppCommand::SetMode(MachineMode::On)).unwrap();
    h.run_for(150_000, 1_000);
    assert_eq!(h.ctl.stats().on_time_today_minutes, 2);
    assert_eq!(h.ctl.stats().total_on_time_minutes, 2);

    h.ctl
        .handle_command(AppCommand::SetMode(MachineMode::Standby))
        .unwrap();
    h.run_for(300_000, 1_000);
    assert_eq!(h.ctl.stats().total_on_time_minutes, 2);
}

#[test]
fn factory_reset_wipes_flash_and_memory() {
    let mut h = Harness::boot();
    h.ctl
        .apply_section("brew", &json!({"doseWeight": 21.0}))
        .unwrap();
    h.ctl
        .add_schedule(ScheduleEntry::new(6, 30, ScheduleAction::TurnOn))
        .unwrap();
    h.ctl.start_shot();
    h.clock.advance(20_000);
    h.ctl.end_shot();
    h.run_for(6_000, 1_000);
    h.ctl.record_maintenance(MaintenanceKind::Descale);
    h.events.clear();

    h.ctl.handle_command(AppCommand::FactoryReset).unwrap();

    assert!((h.ctl.settings().brew.dose_weight - 18.0).abs() < 1e-4);
    assert!(h.ctl.settings().schedule.is_empty());
    assert!(h.ctl.history().is_empty());
    assert_eq!(h.ctl.stats().total_shots, 0);
    assert!(h.storage.raw(SETTINGS_NAMESPACE, "brew").is_none());
    assert!(h.storage.raw(HISTORY_NAMESPACE, "shots").is_none());
    assert!(h.storage.raw(STATS_NAMESPACE, "counters").is_none());
    assert_eq!(h.events.seen(), vec![Seen::Settings, Seen::Stats { total_shots: 0 }]);

    let h = h.reboot();
    assert!(h.ctl.settings().schedule.is_empty());
    assert_eq!(h.ctl.stats().total_shots, 0);
}
