//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Driven adapters (flash storage, clocks, heap probes, event sinks)
//! implement these traits.  The [`Controller`](super::controller::Controller)
//! consumes them via generics, so the domain core never touches the
//! platform directly and every policy is testable on the host.

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Largest single blob the core ever writes (NVS blob limit on ESP32).
pub const MAX_BLOB_SIZE: usize = 4000;

/// Persistent key-value storage for settings, statistics, shot history and
/// the schedule table.
///
/// Keys are namespaced so subsystems cannot collide.  Write operations MUST
/// be atomic, with no partial writes on power loss.  The ESP-IDF NVS API
/// guarantees this natively; the in-memory simulation achieves it trivially.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;

    /// Remove every key in a namespace.
    fn erase_namespace(&mut self, namespace: &str) -> Result<(), StorageError>;
}

/// Read a whole blob into an owned buffer.
pub fn read_blob<S: StoragePort + ?Sized>(
    storage: &S,
    namespace: &str,
    key: &str,
) -> Result<Vec<u8>, StorageError> {
    let mut buf = vec![0u8; MAX_BLOB_SIZE];
    let len = storage.read(namespace, key, &mut buf)?;
    buf.truncate(len);
    Ok(buf)
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: RTC / SNTP → domain)
// ───────────────────────────────────────────────────────────────

/// Time source for the tick loop.
pub trait ClockPort {
    /// Monotonic milliseconds since boot.
    fn uptime_ms(&self) -> u64;

    /// Seconds since the unix epoch, or `None` while the wall clock has not
    /// been synchronised.
    fn unix_time(&self) -> Option<u64>;
}

// ───────────────────────────────────────────────────────────────
// Resource probe (driven adapter: allocator → domain)
// ───────────────────────────────────────────────────────────────

/// Resource-pressure signal queried before expensive flash writes.
pub trait ResourceProbe {
    /// Currently free heap in bytes.
    fn free_heap_bytes(&self) -> usize;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → display / transport)
// ───────────────────────────────────────────────────────────────

/// The domain pushes [`AppEvent`](super::events::AppEvent)s through this
/// port.  Adapters decide where they go (serial log, WebSocket, MQTT, ...).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent<'_>);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// The persistence layer could not be opened at all.
    Unavailable,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::Unavailable => write!(f, "storage unavailable"),
        }
    }
}
