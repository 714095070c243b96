//! Settings store through the controller: partial updates, bulk import,
//! redaction, machine identity.

use brewos::app::commands::AppCommand;
use brewos::error::Error;
use brewos::schedule::{ScheduleAction, ScheduleEntry};
use brewos::settings::{MachineType, SETTINGS_NAMESPACE, Section};
use serde_json::{Value, json};

use crate::mock_ports::{Harness, Seen};

fn stored(h: &Harness, section: &str) -> Value {
    let raw = h.storage.raw(SETTINGS_NAMESPACE, section).unwrap();
    serde_json::from_slice(&raw).unwrap()
}

#[test]
fn partial_update_touches_only_named_fields() {
    let mut h = Harness::boot();
    let applied = h
        .ctl
        .apply_section("temperature", &json!({"brewSetpoint": 94.0}))
        .unwrap();
    assert_eq!(applied, 1);

    let t = &h.ctl.settings().temperature;
    assert!((t.brew_setpoint - 94.0).abs() < 1e-4);
    assert!((t.steam_setpoint - 145.0).abs() < 1e-4);

    assert_eq!(h.storage.writes_to(SETTINGS_NAMESPACE), 1, "only one section written");
    assert!((stored(&h, "temperature")["brewSetpoint"].as_f64().unwrap() - 94.0).abs() < 1e-4);
    assert_eq!(h.events.seen(), vec![Seen::Settings]);
}

#[test]
fn invalid_fields_are_dropped_individually() {
    let mut h = Harness::boot();
    let applied = h
        .ctl
        .apply_section(
            "brew",
            &json!({"doseWeight": 99.0, "targetWeight": "heavy", "stopOffset": 1.5}),
        )
        .unwrap();
    assert_eq!(applied, 1);
    let b = &h.ctl.settings().brew;
    assert!((b.dose_weight - 18.0).abs() < 1e-4);
    assert!((b.target_weight - 36.0).abs() < 1e-4);
    assert!((b.stop_offset - 1.5).abs() < 1e-4);
}

#[test]
fn nothing_applied_means_no_write_and_no_event() {
    let mut h = Harness::boot();
    assert_eq!(h.ctl.apply_section("brew", &json!({"bogus": 1})), Ok(0));
    assert_eq!(h.storage.total_writes(), 0);
    assert!(h.events.seen().is_empty());
}

#[test]
fn unknown_section_is_an_error() {
    let mut h = Harness::boot();
    let before = h.ctl.settings().clone();
    assert_eq!(
        h.ctl.apply_section("coffee", &json!({"x": 1})),
        Err(Error::UnknownSection)
    );
    assert_eq!(h.ctl.settings(), &before);
    assert!(h.events.seen().is_empty());
    assert_eq!(h.ctl.section_snapshot("coffee"), Err(Error::UnknownSection));
}

#[test]
fn bulk_import_writes_each_section_and_notifies_once() {
    let mut h = Harness::boot();
    let touched = h
        .ctl
        .apply_settings(&json!({
            "brew": {"targetWeight": 40.0},
            "power": {"mainsVoltage": 120},
            "display": {"brightness": 128},
            "nonsense": {"a": 1},
        }))
        .unwrap();
    assert_eq!(touched, 3);
    assert_eq!(h.storage.writes_to(SETTINGS_NAMESPACE), 3);
    assert_eq!(h.events.count(|s| *s == Seen::Settings), 1);

    assert!(h.ctl.apply_settings(&json!([1, 2])).is_err());
}

#[test]
fn secrets_are_stored_but_never_exported() {
    let mut h = Harness::boot();
    h.ctl
        .apply_section(
            "network",
            &json!({"wifiSsid": "Cafe", "wifiPassword": "hunter22"}),
        )
        .unwrap();
    h.ctl
        .apply_section("mqtt", &json!({"password": "mqtt-secret"}))
        .unwrap();

    let net = &h.ctl.settings().network;
    assert!(net.wifi_configured);
    assert_eq!(net.wifi_password.as_str(), "hunter22");
    assert_eq!(stored(&h, "network")["wifiPassword"], "hunter22");

    let doc = h.ctl.full_snapshot();
    assert_eq!(doc["network"]["wifiSsid"], "Cafe");
    assert_eq!(doc["network"]["wifiConfigured"], true);
    assert!(doc["network"].get("wifiPassword").is_none());
    assert!(doc["mqtt"].get("password").is_none());
    assert!(!doc.to_string().contains("hunter22"));

    let h = h.reboot();
    assert_eq!(h.ctl.settings().network.wifi_password.as_str(), "hunter22");
}

#[test]
fn control_characters_rejected_in_text() {
    let mut h = Harness::boot();
    let applied = h
        .ctl
        .apply_section("machineInfo", &json!({"deviceName": "bad\u{0007}name"}))
        .unwrap();
    assert_eq!(applied, 0);
    assert_eq!(h.ctl.settings().machine_info.device_name.as_str(), "BrewOS");
}

#[test]
fn reset_restores_defaults_and_keeps_schedules() {
    let mut h = Harness::boot();
    h.ctl
        .apply_section("brew", &json!({"doseWeight": 22.0}))
        .unwrap();
    h.ctl
        .add_schedule(ScheduleEntry::new(7, 0, ScheduleAction::TurnOn))
        .unwrap();

    h.ctl.reset_settings().unwrap();
    assert!((h.ctl.settings().brew.dose_weight - 18.0).abs() < 1e-4);
    assert_eq!(h.ctl.settings().schedule.len(), 1);

    let h = h.reboot();
    assert!((h.ctl.settings().brew.dose_weight - 18.0).abs() < 1e-4);
}

#[test]
fn explicit_save_reports_storage_failure() {
    let mut h = Harness::boot();
    h.storage.set_fail_writes(true);
    assert!(h.ctl.save_section(Section::Brew).is_err());
    assert!(h.ctl.save_all().is_err());
    assert!(h.events.seen().is_empty());

    h.storage.set_fail_writes(false);
    h.ctl.save_all().unwrap();
    assert_eq!(h.events.seen(), vec![Seen::Settings]);
}

#[test]
fn control_board_type_adopted_once() {
    let mut h = Harness::boot();
    h.ctl
        .handle_command(AppCommand::ControlBoardBoot {
            version: heapless::String::try_from("1.4.2").unwrap(),
            reset_reason: 1,
            machine_type: MachineType::HeatExchanger,
        })
        .unwrap();
    assert_eq!(
        h.ctl.settings().machine_info.machine_type,
        MachineType::HeatExchanger
    );
    let state = h.ctl.runtime_state();
    assert!(state.control_board_connected);
    assert_eq!(state.control_board_version.as_str(), "1.4.2");
    assert_eq!(state.machine_type, MachineType::HeatExchanger);

    // A different report later does not override the stored type.
    h.ctl
        .handle_command(AppCommand::ControlBoardBoot {
            version: heapless::String::try_from("1.4.2").unwrap(),
            reset_reason: 0,
            machine_type: MachineType::SingleBoiler,
        })
        .unwrap();
    assert_eq!(
        h.ctl.settings().machine_info.machine_type,
        MachineType::HeatExchanger
    );

    h.ctl
        .handle_command(AppCommand::SetMachineType {
            machine_type: MachineType::SingleBoiler,
            force: true,
        })
        .unwrap();
    let h = h.reboot();
    assert_eq!(
        h.ctl.settings().machine_info.machine_type,
        MachineType::SingleBoiler
    );
    assert_eq!(h.ctl.runtime_state().machine_type, MachineType::SingleBoiler);
}

#[test]
fn section_snapshot_covers_schedule_table() {
    let mut h = Harness::boot();
    h.ctl.set_auto_power_off(true, 45).unwrap();
    let sched = h.ctl.section_snapshot("schedule").unwrap();
    assert_eq!(sched["autoPowerOffEnabled"], true);
    assert_eq!(sched["autoPowerOffMinutes"], 45);
    let brew = h.ctl.section_snapshot("brew").unwrap();
    assert_eq!(brew["doseWeight"].as_f64().map(|v| v as f32), Some(18.0));
}
