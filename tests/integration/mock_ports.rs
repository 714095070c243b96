//! Mock port adapters for integration tests.
//!
//! Every mock shares its state through `Rc` handles so a test can keep a
//! clone, move the other into the controller, and still inspect or steer
//! it afterwards.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use brewos::app::controller::Controller;
use brewos::app::events::AppEvent;
use brewos::app::ports::{ClockPort, EventSink, ResourceProbe, StorageError, StoragePort};
use brewos::config::ControllerConfig;
use brewos::history::ShotRecord;
use brewos::schedule::ScheduleEntry;

// ── MemStorage ────────────────────────────────────────────────

#[derive(Default)]
struct MemInner {
    store: HashMap<String, Vec<u8>>,
    writes: Vec<String>,
    fail_writes: bool,
}

/// In-memory `StoragePort` that records every write and can be told to
/// fail them.
#[derive(Clone, Default)]
pub struct MemStorage(Rc<RefCell<MemInner>>);

#[allow(dead_code)]
impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes to `namespace` so far (any key).
    pub fn writes_to(&self, namespace: &str) -> usize {
        let prefix = format!("{namespace}::");
        self.0
            .borrow()
            .writes
            .iter()
            .filter(|k| k.starts_with(&prefix))
            .count()
    }

    pub fn total_writes(&self) -> usize {
        self.0.borrow().writes.len()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.0.borrow_mut().fail_writes = fail;
    }

    pub fn raw(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        self.0.borrow().store.get(&format!("{namespace}::{key}")).cloned()
    }

    pub fn put(&self, namespace: &str, key: &str, data: &[u8]) {
        self.0
            .borrow_mut()
            .store
            .insert(format!("{namespace}::{key}"), data.to_vec());
    }
}

impl StoragePort for MemStorage {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let inner = self.0.borrow();
        match inner.store.get(&format!("{namespace}::{key}")) {
            Some(v) => {
                let n = v.len().min(buf.len());
                buf[..n].copy_from_slice(&v[..n]);
                Ok(n)
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let mut inner = self.0.borrow_mut();
        if inner.fail_writes {
            return Err(StorageError::IoError);
        }
        let k = format!("{namespace}::{key}");
        inner.writes.push(k.clone());
        inner.store.insert(k, data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.0
            .borrow_mut()
            .store
            .remove(&format!("{namespace}::{key}"));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.0
            .borrow()
            .store
            .contains_key(&format!("{namespace}::{key}"))
    }

    fn erase_namespace(&mut self, namespace: &str) -> Result<(), StorageError> {
        let prefix = format!("{namespace}::");
        self.0
            .borrow_mut()
            .store
            .retain(|k, _| !k.starts_with(&prefix));
        Ok(())
    }
}

// ── ManualClock ───────────────────────────────────────────────

/// Clock that only moves when told to.  Wall time, once set, advances
/// together with uptime.
#[derive(Clone, Default)]
pub struct ManualClock {
    ms: Rc<Cell<u64>>,
    unix_at_zero: Rc<Cell<Option<u64>>>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.ms.get()
    }

    pub fn advance(&self, ms: u64) {
        self.ms.set(self.ms.get() + ms);
    }

    /// Make the wall clock read `unix` right now.
    pub fn set_unix(&self, unix: u64) {
        self.unix_at_zero.set(Some(unix - self.ms.get() / 1000));
    }

    pub fn unsync(&self) {
        self.unix_at_zero.set(None);
    }
}

impl ClockPort for ManualClock {
    fn uptime_ms(&self) -> u64 {
        self.ms.get()
    }

    fn unix_time(&self) -> Option<u64> {
        self.unix_at_zero.get().map(|base| base + self.ms.get() / 1000)
    }
}

// ── HeapGauge ─────────────────────────────────────────────────

#[derive(Clone)]
pub struct HeapGauge(Rc<Cell<usize>>);

#[allow(dead_code)]
impl HeapGauge {
    pub fn new(free: usize) -> Self {
        Self(Rc::new(Cell::new(free)))
    }

    pub fn set(&self, free: usize) {
        self.0.set(free);
    }
}

impl ResourceProbe for HeapGauge {
    fn free_heap_bytes(&self) -> usize {
        self.0.get()
    }
}

// ── RecordingSink ─────────────────────────────────────────────

/// Owned copy of what an event carried.
#[derive(Debug, Clone, PartialEq)]
pub enum Seen {
    Settings,
    Stats { total_shots: u32 },
    State,
    Shot(ShotRecord),
    Schedule(ScheduleEntry),
}

#[derive(Clone, Default)]
pub struct RecordingSink(Rc<RefCell<Vec<Seen>>>);

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn count(&self, pred: impl Fn(&Seen) -> bool) -> usize {
        self.0.borrow().iter().filter(|s| pred(s)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent<'_>) {
        let seen = match event {
            AppEvent::SettingsChanged(_) => Seen::Settings,
            AppEvent::StatsChanged(s) => Seen::Stats {
                total_shots: s.total_shots,
            },
            AppEvent::StateChanged(_) => Seen::State,
            AppEvent::ShotCompleted(r) => Seen::Shot(**r),
            AppEvent::ScheduleTriggered(e) => Seen::Schedule((*e).clone()),
        };
        self.0.borrow_mut().push(seen);
    }
}

// ── Harness ───────────────────────────────────────────────────

pub type TestController = Controller<MemStorage, ManualClock, HeapGauge>;

pub struct Harness {
    pub ctl: TestController,
    pub storage: MemStorage,
    pub clock: ManualClock,
    pub heap: HeapGauge,
    pub events: RecordingSink,
}

#[allow(dead_code)]
impl Harness {
    /// Fresh device, booted, with a recording observer attached.
    pub fn boot() -> Self {
        Self::boot_with(MemStorage::new(), ManualClock::new())
    }

    /// Boot against existing flash contents and clock.
    pub fn boot_with(storage: MemStorage, clock: ManualClock) -> Self {
        let heap = HeapGauge::new(200_000);
        let events = RecordingSink::new();
        let mut ctl = Controller::new(
            ControllerConfig::default(),
            storage.clone(),
            clock.clone(),
            heap.clone(),
        )
        .unwrap();
        ctl.subscribe(Box::new(events.clone())).unwrap();
        ctl.begin();
        Self {
            ctl,
            storage,
            clock,
            heap,
            events,
        }
    }

    /// Advance time in `step_ms` increments, ticking after each.
    pub fn run_for(&mut self, total_ms: u64, step_ms: u64) {
        let mut elapsed = 0;
        while elapsed < total_ms {
            self.clock.advance(step_ms);
            self.ctl.tick();
            elapsed += step_ms;
        }
    }

    /// Reboot onto the same flash and clock.
    pub fn reboot(self) -> Self {
        Self::boot_with(self.storage, self.clock)
    }
}
