//! Schedule table CRUD and dispatch, idle auto power-off.

use brewos::app::commands::{AppCommand, Reply};
use brewos::error::Error;
use brewos::runtime::MachineMode;
use brewos::schedule::{
    AUTO_POWER_OFF_NAME, DayMask, MAX_SCHEDULES, SCHEDULE_NAMESPACE, ScheduleAction, ScheduleEntry,
};

use crate::mock_ports::{Harness, Seen};

// 2024-01-01T06:59:00Z, a Monday.
const MONDAY_0659: u64 = 1_704_067_200 + 6 * 3600 + 59 * 60;

fn fired(h: &Harness) -> Vec<ScheduleEntry> {
    h.events
        .seen()
        .into_iter()
        .filter_map(|s| match s {
            Seen::Schedule(e) => Some(e),
            _ => None,
        })
        .collect()
}

#[test]
fn entry_fires_once_in_its_minute() {
    let mut h = Harness::boot();
    h.ctl
        .add_schedule(ScheduleEntry::new(7, 0, ScheduleAction::TurnOn).named("Morning"))
        .unwrap();
    h.clock.set_unix(MONDAY_0659);
    h.run_for(180_000, 10_000);

    let fired = fired(&h);
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].name.as_str(), "Morning");
    assert_eq!(fired[0].action, ScheduleAction::TurnOn);
}

#[test]
fn dispatch_does_not_change_mode() {
    let mut h = Harness::boot();
    h.ctl
        .add_schedule(ScheduleEntry::new(7, 0, ScheduleAction::TurnOn))
        .unwrap();
    h.clock.set_unix(MONDAY_0659);
    h.run_for(120_000, 10_000);
    assert_eq!(fired(&h).len(), 1);
    assert_eq!(h.ctl.runtime_state().mode, MachineMode::Standby);
}

#[test]
fn off_wins_over_on_in_the_same_minute() {
    let mut h = Harness::boot();
    h.ctl
        .add_schedule(ScheduleEntry::new(7, 0, ScheduleAction::TurnOn))
        .unwrap();
    let off = h
        .ctl
        .add_schedule(ScheduleEntry::new(7, 0, ScheduleAction::TurnOff))
        .unwrap();
    h.clock.set_unix(MONDAY_0659);
    h.run_for(120_000, 10_000);

    let fired = fired(&h);
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].id, off);
    assert_eq!(fired[0].action, ScheduleAction::TurnOff);
}

#[test]
fn disabled_and_off_day_entries_stay_quiet() {
    let mut h = Harness::boot();
    let id = h
        .ctl
        .add_schedule(ScheduleEntry::new(7, 0, ScheduleAction::TurnOn))
        .unwrap();
    h.ctl.enable_schedule(id, false).unwrap();
    h.ctl
        .add_schedule(ScheduleEntry::new(7, 0, ScheduleAction::TurnOn).on_days(DayMask::WEEKENDS))
        .unwrap();
    h.clock.set_unix(MONDAY_0659);
    h.run_for(120_000, 10_000);
    assert!(fired(&h).is_empty());
}

#[test]
fn nothing_fires_without_wall_clock() {
    let mut h = Harness::boot();
    h.ctl
        .add_schedule(ScheduleEntry::new(0, 1, ScheduleAction::TurnOn))
        .unwrap();
    h.run_for(300_000, 10_000);
    assert!(fired(&h).is_empty());
}

#[test]
fn crud_persists_and_ids_are_not_reused() {
    let mut h = Harness::boot();
    let a = h
        .ctl
        .add_schedule(ScheduleEntry::new(7, 0, ScheduleAction::TurnOn))
        .unwrap();
    let b = h
        .ctl
        .add_schedule(ScheduleEntry::new(22, 0, ScheduleAction::TurnOff))
        .unwrap();
    assert_eq!((a, b), (1, 2));
    assert!(h.storage.writes_to(SCHEDULE_NAMESPACE) >= 2);

    h.ctl.remove_schedule(b).unwrap();
    let c = h
        .ctl
        .add_schedule(ScheduleEntry::new(21, 30, ScheduleAction::TurnOff))
        .unwrap();
    assert_eq!(c, 3);

    h.ctl
        .update_schedule(a, ScheduleEntry::new(6, 45, ScheduleAction::TurnOn))
        .unwrap();
    assert_eq!(h.ctl.remove_schedule(b), Err(Error::ScheduleNotFound(b)));
    assert_eq!(
        h.ctl
            .update_schedule(a, ScheduleEntry::new(25, 0, ScheduleAction::TurnOn))
            .map_err(|e| matches!(e, Error::Invalid(_))),
        Err(true)
    );

    let h = h.reboot();
    let table = &h.ctl.settings().schedule;
    assert_eq!(table.len(), 2);
    let first = table.get(a).unwrap();
    assert_eq!((first.hour, first.minute), (6, 45));
    assert!(table.get(c).is_some());
}

#[test]
fn table_rejects_eleventh_entry() {
    let mut h = Harness::boot();
    for i in 0..MAX_SCHEDULES {
        h.ctl
            .add_schedule(ScheduleEntry::new(i as u8, 0, ScheduleAction::TurnOn))
            .unwrap();
    }
    assert_eq!(
        h.ctl
            .handle_command(AppCommand::AddSchedule(ScheduleEntry::new(
                12,
                0,
                ScheduleAction::TurnOn
            ))),
        Err(Error::ScheduleTableFull)
    );
}

#[test]
fn add_command_reports_new_id() {
    let mut h = Harness::boot();
    let reply = h
        .ctl
        .handle_command(AppCommand::AddSchedule(ScheduleEntry::new(
            8,
            0,
            ScheduleAction::TurnOn,
        )))
        .unwrap();
    assert_eq!(reply, Reply::ScheduleAdded(1));
    assert_eq!(h.events.count(|s| *s == Seen::Settings), 1);
}

#[test]
fn idle_machine_powers_off_once() {
    let mut h = Harness::boot();
    h.ctl
        .handle_command(AppCommand::SetAutoPowerOff {
            enabled: true,
            minutes: 1,
        })
        .unwrap();
    h.ctl.handle_command(AppCommand::SetMode(MachineMode::On)).unwrap();

    h.run_for(50_000, 10_000);
    assert!(fired(&h).is_empty());
    assert!(!h.ctl.is_idle_timeout());

    h.run_for(20_000, 10_000);
    let fired = fired(&h);
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].name.as_str(), AUTO_POWER_OFF_NAME);
    assert_eq!(fired[0].action, ScheduleAction::TurnOff);
}

#[test]
fn user_commands_reset_idle_timer_telemetry_does_not() {
    let mut h = Harness::boot();
    h.ctl.set_auto_power_off(true, 1).unwrap();
    h.ctl.handle_command(AppCommand::SetMode(MachineMode::On)).unwrap();

    h.clock.advance(50_000);
    h.ctl.handle_command(AppCommand::Pressure(0.0)).unwrap();
    h.clock.advance(15_000);
    assert!(h.ctl.is_idle_timeout(), "telemetry is not activity");

    h.ctl.handle_command(AppCommand::RecordSteamCycle).unwrap();
    assert!(!h.ctl.is_idle_timeout());
}

#[test]
fn no_auto_off_in_standby_or_mid_shot() {
    let mut h = Harness::boot();
    h.ctl.set_auto_power_off(true, 1).unwrap();
    h.run_for(120_000, 10_000);
    assert!(fired(&h).is_empty(), "standby is already off");

    h.ctl.set_machine_mode(MachineMode::On);
    h.ctl.start_shot();
    h.run_for(120_000, 10_000);
    assert!(fired(&h).is_empty(), "never during a shot");
}

/// Tick in 10 s steps and apply fired actions the way the firmware loop
/// does: after the tick, through `set_machine_mode`.
fn run_applying_actions(h: &mut Harness, total_ms: u64) {
    let mut applied = fired(h).len();
    let mut elapsed = 0;
    while elapsed < total_ms {
        h.clock.advance(10_000);
        h.ctl.tick();
        elapsed += 10_000;
        for entry in fired(h).into_iter().skip(applied) {
            let mode = match entry.action {
                ScheduleAction::TurnOn => MachineMode::On,
                ScheduleAction::TurnOff => MachineMode::Standby,
            };
            h.ctl.set_machine_mode(mode);
            applied += 1;
        }
    }
}

#[test]
fn scheduled_power_on_gets_a_full_idle_window() {
    let mut h = Harness::boot();
    h.ctl.set_auto_power_off(true, 30).unwrap();
    h.ctl
        .add_schedule(ScheduleEntry::new(7, 0, ScheduleAction::TurnOn).named("Morning"))
        .unwrap();

    // Overnight in standby, far past the idle timeout.
    h.run_for(2 * 3_600_000, 10_000);
    assert!(fired(&h).is_empty());

    h.clock.set_unix(MONDAY_0659);
    run_applying_actions(&mut h, 120_000);
    let names: Vec<_> = fired(&h).iter().map(|e| e.name.clone()).collect();
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].as_str(), "Morning");
    assert_eq!(h.ctl.runtime_state().mode, MachineMode::On);

    run_applying_actions(&mut h, 28 * 60_000);
    assert_eq!(fired(&h).len(), 1, "still inside the idle window");
    assert_eq!(h.ctl.runtime_state().mode, MachineMode::On);

    run_applying_actions(&mut h, 3 * 60_000);
    let fired = fired(&h);
    assert_eq!(fired.len(), 2);
    assert_eq!(fired[1].name.as_str(), AUTO_POWER_OFF_NAME);
    assert_eq!(h.ctl.runtime_state().mode, MachineMode::Standby);
}
