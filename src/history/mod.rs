//! Shot history: fixed-capacity ring of completed brew records.
//!
//! ```text
//!   physical:  [ s5 | s6 | s2 | s3 | s4 ]      head ─▶ slot 2
//!   logical:     1    0    4    3    2          index 0 = most recent
//! ```
//!
//! Once full, the oldest record is silently overwritten.  Persistence goes
//! through the fixed-width binary [`codec`]; when to write is decided by
//! the controller's write-economy policy, not here.

pub mod codec;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{StorageError, StoragePort, read_blob};
use crate::error::{Error, Result};

/// Records retained before the oldest is overwritten.
pub const MAX_SHOT_HISTORY: usize = 50;

/// Highest user rating; 0 on flash means "unrated".
pub const MAX_RATING: u8 = 5;

pub const HISTORY_NAMESPACE: &str = "history";
pub const HISTORY_KEY: &str = "shots";

// ── Record ──────────────────────────────────────────────────────────

/// One completed extraction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotRecord {
    /// Unix seconds at shot start; 0 if the clock was not synced.
    pub timestamp: u32,
    pub dose_weight: f32,
    pub yield_weight: f32,
    pub duration_ms: u32,
    pub preinfusion_ms: u32,
    /// Grams per second over the whole shot.
    pub avg_flow_rate: f32,
    /// Bar.
    pub peak_pressure: f32,
    /// Celsius.
    pub avg_temperature: f32,
    pub rating: Option<u8>,
}

impl ShotRecord {
    /// Brew ratio (yield / dose); 0 when no dose was recorded.
    pub fn ratio(&self) -> f32 {
        if self.dose_weight > 0.0 {
            self.yield_weight / self.dose_weight
        } else {
            0.0
        }
    }
}

// ── Ring buffer ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ShotHistory {
    shots: [ShotRecord; MAX_SHOT_HISTORY],
    /// Next slot to write.
    head: usize,
    count: usize,
}

impl Default for ShotHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl ShotHistory {
    pub const fn new() -> Self {
        Self {
            shots: [ShotRecord {
                timestamp: 0,
                dose_weight: 0.0,
                yield_weight: 0.0,
                duration_ms: 0,
                preinfusion_ms: 0,
                avg_flow_rate: 0.0,
                peak_pressure: 0.0,
                avg_temperature: 0.0,
                rating: None,
            }; MAX_SHOT_HISTORY],
            head: 0,
            count: 0,
        }
    }

    /// Append a record, overwriting the oldest once full.
    pub fn add(&mut self, record: ShotRecord) {
        self.shots[self.head] = record;
        self.head = (self.head + 1) % MAX_SHOT_HISTORY;
        if self.count < MAX_SHOT_HISTORY {
            self.count += 1;
        }
    }

    /// Record at logical `index` (0 = most recent).
    pub fn get(&self, index: usize) -> Option<&ShotRecord> {
        self.slot(index).map(|slot| &self.shots[slot])
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Forget every record.  Stale slots stay in place until overwritten.
    pub fn clear(&mut self) {
        self.head = 0;
        self.count = 0;
    }

    /// Most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &ShotRecord> {
        (0..self.count).filter_map(move |i| self.get(i))
    }

    /// Oldest first, the order the codec writes.
    pub fn iter_chronological(&self) -> impl Iterator<Item = &ShotRecord> {
        (0..self.count).rev().filter_map(move |i| self.get(i))
    }

    /// Set or clear (`0`) the user rating of the record at logical `index`.
    pub fn rate(&mut self, index: usize, rating: u8) -> Result<()> {
        if rating > MAX_RATING {
            return Err(Error::Invalid("rating must be 0-5"));
        }
        let slot = self.slot(index).ok_or(Error::ShotNotFound(index))?;
        self.shots[slot].rating = (rating > 0).then_some(rating);
        Ok(())
    }

    fn slot(&self, index: usize) -> Option<usize> {
        if index >= self.count {
            return None;
        }
        Some((self.head + MAX_SHOT_HISTORY - 1 - index) % MAX_SHOT_HISTORY)
    }

    // ── Persistence ─────────────────────────────────────────────────

    /// Load the persisted ring.  A missing, truncated or foreign blob yields
    /// an empty history.
    pub fn load<S: StoragePort + ?Sized>(storage: &S) -> Self {
        let bytes = match read_blob(storage, HISTORY_NAMESPACE, HISTORY_KEY) {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound) => return Self::new(),
            Err(e) => {
                warn!("History: read failed ({e}), starting empty");
                return Self::new();
            }
        };
        match codec::decode(&bytes) {
            Ok(history) => {
                debug!("History: loaded {} shots", history.len());
                history
            }
            Err(e) => {
                warn!("History: discarding stored blob ({e})");
                Self::new()
            }
        }
    }

    /// Write the whole ring; an empty ring removes the blob instead.
    pub fn save<S: StoragePort + ?Sized>(&self, storage: &mut S) -> core::result::Result<(), StorageError> {
        if self.is_empty() {
            return storage.delete(HISTORY_NAMESPACE, HISTORY_KEY);
        }
        storage.write(HISTORY_NAMESPACE, HISTORY_KEY, &codec::encode(self))
    }
}
