//! Fixed-width binary encoding of the shot history.
//!
//! ```text
//!  0      4   5   6                         6 + n·36
//!  ├──────┼───┼───┼────────────┬─────┬──────────┤
//!  │"BRSH"│ver│ n │ record 0   │ ... │ record n-1│   oldest first
//!  └──────┴───┴───┴────────────┴─────┴──────────┘
//!
//!  record (little endian, 36 bytes):
//!   0 timestamp u32   4 dose f32      8 yield f32     12 duration_ms u32
//!  16 preinf_ms u32  20 flow f32     24 peak_bar f32  28 avg_temp f32
//!  32 rating u8      33..36 reserved (zero)
//! ```
//!
//! A blob is either accepted whole or rejected whole; a torn write never
//! yields a partially populated history.

use super::{MAX_RATING, MAX_SHOT_HISTORY, ShotHistory, ShotRecord};

pub const MAGIC: [u8; 4] = *b"BRSH";
pub const FORMAT_VERSION: u8 = 1;
pub const HEADER_LEN: usize = 6;
pub const RECORD_LEN: usize = 36;

/// Largest blob [`encode`] can produce.
pub const MAX_ENCODED_LEN: usize = HEADER_LEN + MAX_SHOT_HISTORY * RECORD_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Shorter than the fixed header.
    TooShort,
    BadMagic,
    UnsupportedVersion(u8),
    /// Declared record count runs past the end of the blob.
    Truncated { declared: u8, available: usize },
    /// Declared record count exceeds the ring capacity.
    TooManyRecords(u8),
}

impl core::fmt::Display for CodecError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TooShort => write!(f, "blob shorter than header"),
            Self::BadMagic => write!(f, "bad magic"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported format version {v}"),
            Self::Truncated {
                declared,
                available,
            } => write!(f, "{declared} records declared, {available} present"),
            Self::TooManyRecords(n) => write!(f, "{n} records exceed capacity"),
        }
    }
}

// ── Encode ──────────────────────────────────────────────────────────

pub fn encode(history: &ShotHistory) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + history.len() * RECORD_LEN);
    out.extend_from_slice(&MAGIC);
    out.push(FORMAT_VERSION);
    out.push(history.len() as u8);
    for shot in history.iter_chronological() {
        out.extend_from_slice(&encode_record(shot));
    }
    out
}

fn encode_record(shot: &ShotRecord) -> [u8; RECORD_LEN] {
    let mut rec = [0u8; RECORD_LEN];
    rec[0..4].copy_from_slice(&shot.timestamp.to_le_bytes());
    rec[4..8].copy_from_slice(&shot.dose_weight.to_le_bytes());
    rec[8..12].copy_from_slice(&shot.yield_weight.to_le_bytes());
    rec[12..16].copy_from_slice(&shot.duration_ms.to_le_bytes());
    rec[16..20].copy_from_slice(&shot.preinfusion_ms.to_le_bytes());
    rec[20..24].copy_from_slice(&shot.avg_flow_rate.to_le_bytes());
    rec[24..28].copy_from_slice(&shot.peak_pressure.to_le_bytes());
    rec[28..32].copy_from_slice(&shot.avg_temperature.to_le_bytes());
    rec[32] = shot.rating.unwrap_or(0);
    rec
}

// ── Decode ──────────────────────────────────────────────────────────

pub fn decode(data: &[u8]) -> Result<ShotHistory, CodecError> {
    if data.len() < HEADER_LEN {
        return Err(CodecError::TooShort);
    }
    if data[0..4] != MAGIC {
        return Err(CodecError::BadMagic);
    }
    if data[4] != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(data[4]));
    }
    let declared = data[5];
    if usize::from(declared) > MAX_SHOT_HISTORY {
        return Err(CodecError::TooManyRecords(declared));
    }
    let body = &data[HEADER_LEN..];
    let needed = usize::from(declared) * RECORD_LEN;
    if body.len() < needed {
        return Err(CodecError::Truncated {
            declared,
            available: body.len() / RECORD_LEN,
        });
    }

    let mut history = ShotHistory::new();
    for chunk in body[..needed].chunks_exact(RECORD_LEN) {
        history.add(decode_record(chunk));
    }
    Ok(history)
}

fn decode_record(rec: &[u8]) -> ShotRecord {
    let u32_at = |o: usize| u32::from_le_bytes([rec[o], rec[o + 1], rec[o + 2], rec[o + 3]]);
    let f32_at = |o: usize| f32::from_bits(u32_at(o));
    let rating = rec[32];
    ShotRecord {
        timestamp: u32_at(0),
        dose_weight: f32_at(4),
        yield_weight: f32_at(8),
        duration_ms: u32_at(12),
        preinfusion_ms: u32_at(16),
        avg_flow_rate: f32_at(20),
        peak_pressure: f32_at(24),
        avg_temperature: f32_at(28),
        rating: (1..=MAX_RATING).contains(&rating).then_some(rating),
    }
}
