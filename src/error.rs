//! Unified error types for the BrewOS controller core.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! controller's command surface reports failures uniformly.  All variants
//! are `Copy` so they pass through the tick loop without allocation.
//!
//! Absent or malformed persisted data is *not* an error at this level: the
//! loaders log it and fall back to defaults.  What reaches callers as an
//! `Error` is either a rejected mutation request or a failed write.

use core::fmt;

use crate::app::ports::StorageError;
use crate::history::codec::CodecError;

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

/// Every fallible controller operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The persistence layer rejected a read or write.
    Storage(StorageError),
    /// A binary blob could not be decoded.
    Codec(CodecError),
    /// A settings section name is not recognised.
    UnknownSection,
    /// The schedule table has no free slot (or the id space is spent).
    ScheduleTableFull,
    /// No schedule entry carries this id.
    ScheduleNotFound(u8),
    /// The shot history has no record at this logical index.
    ShotNotFound(usize),
    /// A request was rejected by validation.
    Invalid(&'static str),
    /// Controller tuning is out of range.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Codec(e) => write!(f, "codec: {e}"),
            Self::UnknownSection => write!(f, "unknown settings section"),
            Self::ScheduleTableFull => write!(f, "schedule table full"),
            Self::ScheduleNotFound(id) => write!(f, "schedule {id} not found"),
            Self::ShotNotFound(idx) => write!(f, "shot {idx} not found"),
            Self::Invalid(msg) => write!(f, "invalid request: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
