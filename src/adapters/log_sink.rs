//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one summary line per application
//! event to the ESP-IDF logger (UART / USB-CDC in production).  Transport
//! adapters (WebSocket, MQTT, display) implement the same trait.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent<'_>) {
        match event {
            AppEvent::SettingsChanged(s) => {
                info!(
                    "SETTINGS | brew={:.1}\u{00b0}C steam={:.1}\u{00b0}C | dose={:.1}g target={:.1}g | \
                     schedules={} auto_off={}",
                    s.temperature.brew_setpoint,
                    s.temperature.steam_setpoint,
                    s.brew.dose_weight,
                    s.brew.target_weight,
                    s.schedule.len(),
                    if s.schedule.auto_power_off_enabled {
                        s.schedule.auto_power_off_minutes
                    } else {
                        0
                    },
                );
            }
            AppEvent::StatsChanged(st) => {
                info!(
                    "STATS | shots={} today={} | steam={} | kWh={:.2} | since_descale={}",
                    st.total_shots,
                    st.shots_today,
                    st.total_steam_cycles,
                    st.total_kwh,
                    st.shots_since_descale,
                );
            }
            AppEvent::StateChanged(r) => {
                info!(
                    "STATE | {} mode={:?} | brew={:.1}\u{00b0}C steam={:.1}\u{00b0}C | shot={} | \
                     wifi={} mqtt={} board={}",
                    r.state,
                    r.mode,
                    r.brew_temp,
                    r.steam_temp,
                    r.shot_active,
                    r.wifi_connected,
                    r.mqtt_connected,
                    r.control_board_connected,
                );
            }
            AppEvent::ShotCompleted(shot) => {
                info!(
                    "SHOT | {:.1}g -> {:.1}g (1:{:.1}) in {:.1}s | peak={:.1}bar | preinf={}ms",
                    shot.dose_weight,
                    shot.yield_weight,
                    shot.ratio(),
                    shot.duration_ms as f32 / 1000.0,
                    shot.peak_pressure,
                    shot.preinfusion_ms,
                );
            }
            AppEvent::ScheduleTriggered(entry) => {
                info!(
                    "SCHEDULE | #{} '{}' {:?} at {:02}:{:02}",
                    entry.id, entry.name, entry.action, entry.hour, entry.minute
                );
            }
        }
    }
}
