//! Outbound application events and the subscriber list that carries them.
//!
//! The [`Controller`](super::controller::Controller) publishes these through
//! its [`EventBus`].  Subscribers implement the
//! [`EventSink`](super::ports::EventSink) port and decide what to do with
//! them: log to serial, push over WebSocket, publish over MQTT, redraw
//! the display.  Events borrow the controller's state, so a subscriber
//! that needs to keep something must copy it.

use log::warn;

use super::ports::EventSink;
use crate::history::ShotRecord;
use crate::runtime::RuntimeState;
use crate::schedule::{ScheduleDelegate, ScheduleEntry};
use crate::settings::Settings;
use crate::statistics::Statistics;

/// Structured events emitted by the controller core.
#[derive(Debug, Clone, Copy)]
pub enum AppEvent<'a> {
    /// A settings section was saved; carries the whole settings set.
    SettingsChanged(&'a Settings),

    /// Any statistics counter changed.
    StatsChanged(&'a Statistics),

    /// Machine state, mode, shot flag or a connectivity flag changed.
    StateChanged(&'a RuntimeState),

    /// A shot finished; history and statistics already include it.
    ShotCompleted(&'a ShotRecord),

    /// A schedule entry (or the auto power-off rule) fired.
    ScheduleTriggered(&'a ScheduleEntry),
}

/// Maximum simultaneous subscribers.
pub const MAX_SUBSCRIBERS: usize = 4;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u8);

/// Fixed-capacity fan-out to every registered [`EventSink`], in
/// registration order.
#[derive(Default)]
pub struct EventBus {
    sinks: heapless::Vec<(SubscriptionId, Box<dyn EventSink>), MAX_SUBSCRIBERS>,
    next_id: u8,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber.  `None` when the list is full.
    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) -> Option<SubscriptionId> {
        let id = SubscriptionId(self.next_id);
        if self.sinks.push((id, sink)).is_err() {
            warn!("Events: subscriber list full");
            return None;
        }
        self.next_id = self.next_id.wrapping_add(1);
        Some(id)
    }

    /// Returns whether `id` was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        match self.sinks.iter().position(|(sid, _)| *sid == id) {
            Some(pos) => {
                let _ = self.sinks.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn publish(&mut self, event: &AppEvent<'_>) {
        for (_, sink) in &mut self.sinks {
            sink.emit(event);
        }
    }
}

impl ScheduleDelegate for EventBus {
    fn on_schedule_fired(&mut self, entry: &ScheduleEntry) {
        self.publish(&AppEvent::ScheduleTriggered(entry));
    }
}
