//! Controller: the single owner of all brewos domain state.
//!
//! ```text
//!   control board ─┐                         ┌─▶ display
//!   dashboard ─────┼─▶ handle_command() ─┐   ├─▶ WebSocket
//!   MQTT / cloud ──┘                     ▼   ├─▶ MQTT
//!                                  ┌───────────┐
//!   firmware loop ──▶ tick() ────▶ │ Controller │ ──▶ EventBus
//!                                  └─────┬─────┘
//!                   StoragePort ◀────────┤
//!                   ClockPort   ◀────────┤
//!                   ResourceProbe ◀──────┘
//! ```
//!
//! The controller owns settings, statistics, shot history, runtime state and
//! the schedule engine.  Ports are owned too: the firmware builds one
//! controller at boot and drives it from a single task, so no locking is
//! needed anywhere in the core.
//!
//! ## Flash write economy
//!
//! * Settings and schedules are written on every accepted mutation.
//! * Statistics are written when dirty, at most once per
//!   `stats_save_interval_ms`, and immediately after maintenance.
//! * Shot history is written once, `history_save_delay_ms` after the last
//!   change, and only when enough heap is free.  A deferred or failed
//!   attempt is retried `history_retry_interval_ms` later.

use log::{debug, info, warn};
use serde_json::{Map, Value};

use super::commands::{AppCommand, Reply};
use super::events::{AppEvent, EventBus, SubscriptionId};
use super::ports::{ClockPort, EventSink, ResourceProbe, StoragePort};
use crate::clock::LocalTime;
use crate::config::ControllerConfig;
use crate::error::{Error, Result};
use crate::history::{HISTORY_NAMESPACE, ShotHistory, ShotRecord};
use crate::runtime::{MachineMode, MachineState, Peer, Runtime, RuntimeState};
use crate::schedule::{SCHEDULE_NAMESPACE, ScheduleEngine, ScheduleEntry, ScheduleSettings};
use crate::settings::{MachineType, SETTINGS_NAMESPACE, Section, Settings};
use crate::statistics::{MaintenanceKind, STATS_NAMESPACE, Statistics};

const MS_PER_MINUTE: u64 = 60_000;

pub struct Controller<S, C, R>
where
    S: StoragePort,
    C: ClockPort,
    R: ResourceProbe,
{
    config: ControllerConfig,
    storage: S,
    clock: C,
    probe: R,

    settings: Settings,
    stats: Statistics,
    history: ShotHistory,
    runtime: Runtime,
    scheduler: ScheduleEngine,
    events: EventBus,

    // --- Write economy ---
    stats_dirty: bool,
    last_stats_save_ms: u64,
    history_dirty: bool,
    history_save_due_ms: u64,

    // --- Tick bookkeeping ---
    last_schedule_check_ms: Option<u64>,
    last_tick_ms: u64,
    /// Powered-on milliseconds not yet credited as a whole minute.
    on_time_carry_ms: u64,
}

impl<S, C, R> Controller<S, C, R>
where
    S: StoragePort,
    C: ClockPort,
    R: ResourceProbe,
{
    pub fn new(config: ControllerConfig, storage: S, clock: C, probe: R) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            storage,
            clock,
            probe,
            settings: Settings::default(),
            stats: Statistics::default(),
            history: ShotHistory::new(),
            runtime: Runtime::new(),
            scheduler: ScheduleEngine::new(0),
            events: EventBus::new(),
            stats_dirty: false,
            last_stats_save_ms: 0,
            history_dirty: false,
            history_save_due_ms: 0,
            last_schedule_check_ms: None,
            last_tick_ms: 0,
            on_time_carry_ms: 0,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Restore persisted state.  Never fails: anything unreadable comes
    /// back as defaults.
    pub fn begin(&mut self) {
        let now = self.clock.uptime_ms();
        info!("Controller: starting");

        self.settings = Settings::load(&self.storage);
        self.stats = Statistics::load(&self.storage);
        self.history = ShotHistory::load(&self.storage);
        self.settings.schedule = ScheduleSettings::load(&self.storage);

        self.stats.start_session(self.wall_timestamp());
        self.runtime.refresh_uptime(now);
        self.runtime
            .set_machine_type(self.settings.machine_info.machine_type);

        self.scheduler = ScheduleEngine::new(now);
        self.stats_dirty = false;
        self.last_stats_save_ms = now;
        self.history_dirty = false;
        self.last_schedule_check_ms = None;
        self.last_tick_ms = now;
        self.on_time_carry_ms = 0;

        info!(
            "Controller: ready ({} shots, {} schedules)",
            self.history.len(),
            self.settings.schedule.len()
        );
    }

    /// Periodic work.  Call roughly every `tick_interval_ms`.
    pub fn tick(&mut self) {
        let now = self.clock.uptime_ms();

        self.runtime.refresh_uptime(now);
        self.accumulate_on_time(now);
        self.service_stats_save(now);
        self.service_history_save(now);
        self.check_day_rollover();

        let due = self.last_schedule_check_ms.is_none_or(|last| {
            now.saturating_sub(last) >= u64::from(self.config.schedule_check_interval_ms)
        });
        if due {
            self.last_schedule_check_ms = Some(now);
            let local = self.local_time();
            let mode = self.runtime.mode();
            let shot = self.runtime.shot_active();
            self.scheduler.tick(
                &self.settings.schedule,
                local,
                mode,
                shot,
                now,
                &mut self.events,
            );
        }
    }

    // ── Command dispatch ──────────────────────────────────────

    /// Route one inbound command.  Anything that is not telemetry resets
    /// the idle timer before it is applied.
    pub fn handle_command(&mut self, cmd: AppCommand) -> Result<Reply> {
        let now = self.clock.uptime_ms();
        if !cmd.is_telemetry() {
            self.scheduler.reset_idle_timer(now);
        }

        let reply = |changed: bool| if changed { Reply::Done } else { Reply::Unchanged };

        match cmd {
            AppCommand::Temperatures { brew, steam } => {
                self.runtime.update_temperatures(brew, steam, now);
                Ok(Reply::Done)
            }
            AppCommand::Heating { brew, steam } => {
                self.runtime.update_heating(brew, steam);
                Ok(Reply::Done)
            }
            AppCommand::Pressure(bar) => {
                self.runtime.update_pressure(bar, now);
                Ok(Reply::Done)
            }
            AppCommand::Flow(rate) => {
                self.runtime.update_flow(rate, now);
                Ok(Reply::Done)
            }
            AppCommand::Power { watts, voltage } => {
                self.runtime.update_power(watts, voltage, now);
                Ok(Reply::Done)
            }
            AppCommand::WaterLevel(percent) => {
                self.runtime.update_water_level(percent, now);
                Ok(Reply::Done)
            }
            AppCommand::Scale {
                weight,
                flow_rate,
                stable,
            } => {
                self.runtime.update_scale(weight, flow_rate, stable, now);
                Ok(Reply::Done)
            }
            AppCommand::Connectivity { peer, connected } => {
                Ok(reply(self.set_connected(peer, connected)))
            }
            AppCommand::ControlBoardBoot {
                version,
                reset_reason,
                machine_type,
            } => {
                self.control_board_boot(&version, reset_reason, machine_type);
                Ok(Reply::Done)
            }
            AppCommand::ReportState(state) => Ok(reply(self.set_machine_state(state))),

            AppCommand::SetMode(mode) => Ok(reply(self.set_machine_mode(mode))),
            AppCommand::StartShot => Ok(reply(self.start_shot())),
            AppCommand::EndShot => Ok(reply(self.end_shot().is_some())),
            AppCommand::RateShot { index, rating } => {
                self.rate_shot(index, rating)?;
                Ok(Reply::Done)
            }
            AppCommand::ClearShotHistory => {
                self.clear_shot_history();
                Ok(Reply::Done)
            }
            AppCommand::RecordSteamCycle => {
                self.record_steam_cycle();
                Ok(Reply::Done)
            }
            AppCommand::AddPowerUsage(kwh) => Ok(reply(self.add_power_usage(kwh))),
            AppCommand::RecordMaintenance(kind) => {
                self.record_maintenance(kind);
                Ok(Reply::Done)
            }
            AppCommand::AddSchedule(entry) => self.add_schedule(entry).map(Reply::ScheduleAdded),
            AppCommand::UpdateSchedule { id, entry } => {
                self.update_schedule(id, entry)?;
                Ok(Reply::Done)
            }
            AppCommand::RemoveSchedule(id) => {
                self.remove_schedule(id)?;
                Ok(Reply::Done)
            }
            AppCommand::EnableSchedule { id, enabled } => {
                self.enable_schedule(id, enabled)?;
                Ok(Reply::Done)
            }
            AppCommand::SetAutoPowerOff { enabled, minutes } => {
                self.set_auto_power_off(enabled, minutes)?;
                Ok(Reply::Done)
            }
            AppCommand::SetMachineType {
                machine_type,
                force,
            } => Ok(reply(self.set_machine_type(machine_type, force))),
            AppCommand::FactoryReset => {
                self.factory_reset()?;
                Ok(Reply::Done)
            }
        }
    }

    // ── Observers ─────────────────────────────────────────────

    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) -> Option<SubscriptionId> {
        self.events.subscribe(sink)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // ── Settings ──────────────────────────────────────────────

    /// Merge a partial update into one section by name, persist it and
    /// notify.  Returns the number of fields applied.
    pub fn apply_section(&mut self, name: &str, fields: &Value) -> Result<usize> {
        let section: Section = name.parse()?;
        if !fields.is_object() {
            return Err(Error::Invalid("section update must be an object"));
        }
        let applied = self.settings.apply_partial(section, fields);
        if applied == 0 {
            return Ok(0);
        }
        if section == Section::MachineInfo {
            self.sync_machine_type();
        }
        self.persist_section(section);
        self.events
            .publish(&AppEvent::SettingsChanged(&self.settings));
        Ok(applied)
    }

    /// Bulk import of a `{ section: { fields } }` document.  Every touched
    /// section is written; observers hear about it once.
    pub fn apply_settings(&mut self, document: &Value) -> Result<usize> {
        if !document.is_object() {
            return Err(Error::Invalid("settings document must be an object"));
        }
        let touched = self.settings.apply_document(document);
        if touched.is_empty() {
            return Ok(0);
        }
        if touched.contains(&Section::MachineInfo) {
            self.sync_machine_type();
        }
        for section in &touched {
            self.persist_section(*section);
        }
        self.events
            .publish(&AppEvent::SettingsChanged(&self.settings));
        Ok(touched.len())
    }

    /// Write one section as it currently stands.
    pub fn save_section(&mut self, section: Section) -> Result<()> {
        self.settings.save_section(section, &mut self.storage)?;
        self.events
            .publish(&AppEvent::SettingsChanged(&self.settings));
        Ok(())
    }

    /// Write every section and the schedule table; one notification.
    pub fn save_all(&mut self) -> Result<()> {
        self.settings.save_all(&mut self.storage)?;
        self.settings.schedule.save(&mut self.storage)?;
        self.events
            .publish(&AppEvent::SettingsChanged(&self.settings));
        Ok(())
    }

    /// Restore every section to defaults.  The schedule table is kept.
    pub fn reset_settings(&mut self) -> Result<()> {
        info!("Controller: settings reset to defaults");
        let schedule = core::mem::take(&mut self.settings.schedule);
        self.settings = Settings {
            schedule,
            ..Settings::default()
        };
        self.sync_machine_type();
        self.settings.save_all(&mut self.storage)?;
        self.events
            .publish(&AppEvent::SettingsChanged(&self.settings));
        Ok(())
    }

    /// Erase every persisted namespace and return all state to defaults.
    /// In-memory state is reset even when an erase fails; the first
    /// failure is reported.
    pub fn factory_reset(&mut self) -> Result<()> {
        warn!("Controller: factory reset");
        let mut first_err = None;
        for ns in [
            SETTINGS_NAMESPACE,
            STATS_NAMESPACE,
            HISTORY_NAMESPACE,
            SCHEDULE_NAMESPACE,
        ] {
            if let Err(e) = self.storage.erase_namespace(ns) {
                warn!("Controller: erase '{ns}' failed: {e}");
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }

        let now = self.clock.uptime_ms();
        self.settings = Settings::default();
        self.stats = Statistics::default();
        self.stats.start_session(self.wall_timestamp());
        self.history.clear();
        self.scheduler = ScheduleEngine::new(now);
        self.stats_dirty = false;
        self.last_stats_save_ms = now;
        self.history_dirty = false;
        self.sync_machine_type();

        self.events
            .publish(&AppEvent::SettingsChanged(&self.settings));
        self.events.publish(&AppEvent::StatsChanged(&self.stats));

        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Adopt the machine type reported by the control board.  A type the
    /// user already configured wins unless `force` is set.  Returns whether
    /// the reported type is now in effect.
    pub fn set_machine_type(&mut self, machine_type: MachineType, force: bool) -> bool {
        let configured = self.settings.machine_info.machine_type;
        let keep = !force && configured != MachineType::Unknown && configured != machine_type;
        if keep {
            info!(
                "Controller: keeping configured machine type {} (board says {})",
                configured.as_str(),
                machine_type.as_str()
            );
        } else if configured != machine_type {
            self.settings.machine_info.machine_type = machine_type;
            self.persist_section(Section::MachineInfo);
            self.events
                .publish(&AppEvent::SettingsChanged(&self.settings));
        }
        let effective = self.settings.machine_info.machine_type;
        if self.runtime.set_machine_type(effective) {
            self.events
                .publish(&AppEvent::StateChanged(self.runtime.state()));
        }
        !keep
    }

    // ── Statistics ────────────────────────────────────────────

    pub fn record_steam_cycle(&mut self) {
        self.stats.record_steam_cycle();
        self.mark_stats_changed();
    }

    /// Returns `false` (and changes nothing) for a negative amount.
    pub fn add_power_usage(&mut self, kwh: f32) -> bool {
        if !self.stats.add_power_usage(kwh) {
            return false;
        }
        self.mark_stats_changed();
        true
    }

    /// Maintenance bypasses the save interval: the user just did something
    /// they expect to stick.
    pub fn record_maintenance(&mut self, kind: MaintenanceKind) {
        self.stats.record_maintenance(kind, self.wall_timestamp());
        self.stats_dirty = true;
        self.persist_stats(self.clock.uptime_ms());
        self.events.publish(&AppEvent::StatsChanged(&self.stats));
    }

    pub fn reset_daily(&mut self) {
        self.stats.reset_daily();
        self.mark_stats_changed();
    }

    // ── Runtime ───────────────────────────────────────────────

    pub fn set_machine_state(&mut self, state: MachineState) -> bool {
        let changed = self.runtime.set_machine_state(state);
        if changed {
            self.events
                .publish(&AppEvent::StateChanged(self.runtime.state()));
        }
        changed
    }

    /// Leaving STANDBY counts as activity: the idle time accrued while off
    /// must not trip auto-power-off right after power-on.
    pub fn set_machine_mode(&mut self, mode: MachineMode) -> bool {
        let was_standby = self.runtime.mode() == MachineMode::Standby;
        let changed = self.runtime.set_machine_mode(mode);
        if changed {
            if was_standby {
                self.scheduler.reset_idle_timer(self.clock.uptime_ms());
            }
            self.events
                .publish(&AppEvent::StateChanged(self.runtime.state()));
        }
        changed
    }

    pub fn set_connected(&mut self, peer: Peer, connected: bool) -> bool {
        let changed = self.runtime.set_connected(peer, connected);
        if changed {
            self.events
                .publish(&AppEvent::StateChanged(self.runtime.state()));
        }
        changed
    }

    /// The control board came up and announced itself.
    pub fn control_board_boot(&mut self, version: &str, reset_reason: u8, machine_type: MachineType) {
        info!("Controller: control board v{version} up (reset reason {reset_reason})");
        self.runtime.set_control_board_info(version, reset_reason);
        self.runtime.set_connected(Peer::ControlBoard, true);
        self.set_machine_type(machine_type, false);
        self.events
            .publish(&AppEvent::StateChanged(self.runtime.state()));
    }

    // ── Shots ─────────────────────────────────────────────────

    /// Returns `false` if a shot is already running or the machine is in
    /// FAULT.
    pub fn start_shot(&mut self) -> bool {
        let now = self.clock.uptime_ms();
        let timestamp = self.wall_timestamp();
        let dose = self.settings.brew.dose_weight;
        if !self.runtime.start_shot(now, timestamp, dose) {
            debug!("Controller: start_shot refused");
            return false;
        }
        self.scheduler.reset_idle_timer(now);
        self.events
            .publish(&AppEvent::StateChanged(self.runtime.state()));
        true
    }

    /// Finish the running shot: record it in history and statistics, then
    /// tell observers.  `None` if no shot was running.
    pub fn end_shot(&mut self) -> Option<ShotRecord> {
        let now = self.clock.uptime_ms();
        let record = self.runtime.end_shot(now)?;

        self.history.add(record);
        self.stats.record_shot();
        self.stats_dirty = true;
        self.events.publish(&AppEvent::StatsChanged(&self.stats));

        self.history_dirty = true;
        self.history_save_due_ms = now + u64::from(self.config.history_save_delay_ms);
        self.scheduler.reset_idle_timer(now);

        self.events.publish(&AppEvent::ShotCompleted(&record));
        self.events
            .publish(&AppEvent::StateChanged(self.runtime.state()));
        Some(record)
    }

    /// Rate the shot at logical `index` (0 = most recent); 0 clears.
    pub fn rate_shot(&mut self, index: usize, rating: u8) -> Result<()> {
        self.history.rate(index, rating)?;
        self.mark_history_dirty();
        Ok(())
    }

    pub fn clear_shot_history(&mut self) {
        self.history.clear();
        self.history_dirty = false;
        if let Err(e) = self.history.save(&mut self.storage) {
            warn!("Controller: clearing stored history failed: {e}");
        }
        info!("Controller: shot history cleared");
    }

    // ── Schedules ─────────────────────────────────────────────

    pub fn add_schedule(&mut self, entry: ScheduleEntry) -> Result<u8> {
        let id = self.settings.schedule.add(entry)?;
        self.schedules_changed();
        Ok(id)
    }

    pub fn update_schedule(&mut self, id: u8, entry: ScheduleEntry) -> Result<()> {
        self.settings.schedule.update(id, entry)?;
        self.schedules_changed();
        Ok(())
    }

    pub fn remove_schedule(&mut self, id: u8) -> Result<()> {
        self.settings.schedule.remove(id)?;
        self.schedules_changed();
        Ok(())
    }

    pub fn enable_schedule(&mut self, id: u8, enabled: bool) -> Result<()> {
        self.settings.schedule.enable(id, enabled)?;
        self.schedules_changed();
        Ok(())
    }

    pub fn set_auto_power_off(&mut self, enabled: bool, minutes: u16) -> Result<()> {
        self.settings.schedule.set_auto_power_off(enabled, minutes)?;
        self.schedules_changed();
        Ok(())
    }

    pub fn reset_idle_timer(&mut self) {
        let now = self.clock.uptime_ms();
        self.scheduler.reset_idle_timer(now);
    }

    pub fn is_idle_timeout(&self) -> bool {
        self.scheduler.is_idle_timeout(
            &self.settings.schedule,
            self.runtime.mode(),
            self.runtime.shot_active(),
            self.clock.uptime_ms(),
        )
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    pub fn history(&self) -> &ShotHistory {
        &self.history
    }

    pub fn runtime_state(&self) -> &RuntimeState {
        self.runtime.state()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn is_history_dirty(&self) -> bool {
        self.history_dirty
    }

    pub fn is_stats_dirty(&self) -> bool {
        self.stats_dirty
    }

    /// Local wall-clock time, if the clock is synced.
    pub fn local_time(&self) -> Option<LocalTime> {
        self.clock
            .unix_time()
            .and_then(|unix| LocalTime::from_unix(unix, self.settings.time.local_offset_minutes()))
    }

    // ── Snapshots ─────────────────────────────────────────────

    /// Settings, statistics, runtime state and shot history in one
    /// document, secrets redacted.
    pub fn full_snapshot(&self) -> Value {
        let mut doc = match self.settings.export() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        doc.insert("stats".into(), self.stats_snapshot());
        doc.insert("state".into(), self.state_snapshot());
        doc.insert("shotHistory".into(), self.history_snapshot());
        Value::Object(doc)
    }

    pub fn settings_snapshot(&self) -> Value {
        self.settings.export()
    }

    /// One section by name; `"schedule"` yields the schedule table.
    pub fn section_snapshot(&self, name: &str) -> Result<Value> {
        if name == "schedule" {
            return Ok(self.settings.schedule.export());
        }
        let section: Section = name.parse()?;
        Ok(self.settings.export_section(section))
    }

    /// Counters plus maintenance status.  The persisted rollover day stays
    /// internal.
    pub fn stats_snapshot(&self) -> Value {
        let mut value = serde_json::to_value(&self.stats).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.remove("day");
            if let Ok(status) = serde_json::to_value(self.stats.maintenance_status()) {
                map.insert("maintenanceStatus".into(), status);
            }
        }
        value
    }

    pub fn state_snapshot(&self) -> Value {
        let now = self.clock.uptime_ms();
        let mut value = serde_json::to_value(self.runtime.state()).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.insert(
                "shotElapsedMs".into(),
                Value::from(self.runtime.shot_elapsed_ms(now)),
            );
        }
        value
    }

    /// Newest first, each record with its brew ratio.
    pub fn history_snapshot(&self) -> Value {
        self.history
            .iter()
            .map(|shot| {
                let mut value = serde_json::to_value(shot).unwrap_or(Value::Null);
                if let Value::Object(map) = &mut value {
                    map.insert("ratio".into(), Value::from(shot.ratio()));
                }
                value
            })
            .collect()
    }

    // ── Internals ─────────────────────────────────────────────

    /// Unix seconds if the clock is synced, else 0.
    fn wall_timestamp(&self) -> u32 {
        self.local_time().map_or(0, |t| t.unix_u32())
    }

    fn accumulate_on_time(&mut self, now: u64) {
        let elapsed = now.saturating_sub(self.last_tick_ms);
        self.last_tick_ms = now;
        if self.runtime.mode() == MachineMode::Standby {
            self.on_time_carry_ms = 0;
            return;
        }
        self.on_time_carry_ms += elapsed;
        let minutes = self.on_time_carry_ms / MS_PER_MINUTE;
        if minutes > 0 {
            self.on_time_carry_ms %= MS_PER_MINUTE;
            self.stats
                .add_on_time_minutes(u32::try_from(minutes).unwrap_or(u32::MAX));
            self.mark_stats_changed();
        }
    }

    fn service_stats_save(&mut self, now: u64) {
        let interval = u64::from(self.config.stats_save_interval_ms);
        if now.saturating_sub(self.last_stats_save_ms) < interval {
            return;
        }
        if self.stats_dirty {
            self.persist_stats(now);
        } else {
            self.last_stats_save_ms = now;
        }
    }

    fn persist_stats(&mut self, now: u64) {
        self.last_stats_save_ms = now;
        match self.stats.save(&mut self.storage) {
            Ok(()) => self.stats_dirty = false,
            Err(e) => warn!("Controller: statistics save failed: {e}"),
        }
    }

    fn service_history_save(&mut self, now: u64) {
        if !self.history_dirty || now < self.history_save_due_ms {
            return;
        }
        let retry_at = now + u64::from(self.config.history_retry_interval_ms);

        let free = self.probe.free_heap_bytes();
        if free <= self.config.history_min_free_heap {
            debug!(
                "Controller: history save deferred, {free} B free (need > {})",
                self.config.history_min_free_heap
            );
            self.history_save_due_ms = retry_at;
            return;
        }

        match self.history.save(&mut self.storage) {
            Ok(()) => {
                self.history_dirty = false;
                debug!("Controller: shot history saved ({} shots)", self.history.len());
            }
            Err(e) => {
                warn!("Controller: history save failed: {e}, retrying");
                self.history_save_due_ms = retry_at;
            }
        }
    }

    fn check_day_rollover(&mut self) {
        let Some(local) = self.local_time() else {
            return;
        };
        let before = self.stats.day;
        let reset = self.stats.roll_day(local.day);
        if reset {
            info!("Controller: new day, daily statistics reset");
            self.mark_stats_changed();
        } else if self.stats.day != before {
            self.stats_dirty = true;
        }
    }

    fn mark_stats_changed(&mut self) {
        self.stats_dirty = true;
        self.events.publish(&AppEvent::StatsChanged(&self.stats));
    }

    /// Start the quiet period unless a write is already pending.
    fn mark_history_dirty(&mut self) {
        if !self.history_dirty {
            self.history_dirty = true;
            self.history_save_due_ms =
                self.clock.uptime_ms() + u64::from(self.config.history_save_delay_ms);
        }
    }

    fn sync_machine_type(&mut self) {
        let configured = self.settings.machine_info.machine_type;
        if self.runtime.set_machine_type(configured) {
            self.events
                .publish(&AppEvent::StateChanged(self.runtime.state()));
        }
    }

    /// In-memory state stays authoritative when flash is unavailable.
    fn persist_section(&mut self, section: Section) {
        if let Err(e) = self.settings.save_section(section, &mut self.storage) {
            warn!("Controller: saving '{section}' failed: {e}");
        }
    }

    fn schedules_changed(&mut self) {
        if let Err(e) = self.settings.schedule.save(&mut self.storage) {
            warn!("Controller: saving schedules failed: {e}");
        }
        self.events
            .publish(&AppEvent::SettingsChanged(&self.settings));
    }
}
