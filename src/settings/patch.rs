//! Partial-update plumbing shared by every settings section.
//!
//! Each section has a `*Patch` struct whose fields are all `Option` and all
//! deserialised through [`lenient`]: a key that is missing, mistyped or
//! `null` simply comes out as `None`.  The section's `apply` then runs the
//! survivors through the range and text checks below.

use core::fmt::Debug;
use core::ops::RangeInclusive;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialise one field, turning a type mismatch into `None`.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// Copy `s` into a bounded string, truncating at a character boundary.
pub fn bounded<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for ch in s.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

/// Control characters never belong in a stored label or credential.
pub(crate) fn has_control_chars(s: &str) -> bool {
    s.chars().any(char::is_control)
}

/// RFC 1123 label: letters, digits and inner hyphens.
pub(crate) fn is_valid_hostname(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('-')
        && !s.ends_with('-')
        && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

// ── Appliers ────────────────────────────────────────────────────────
//
// Each returns nothing and bumps `applied` when the slot was written, so a
// section's `apply` reads as one line per field.

pub(crate) fn set<T>(slot: &mut T, value: Option<T>, applied: &mut usize) {
    if let Some(v) = value {
        *slot = v;
        *applied += 1;
    }
}

pub(crate) fn set_ranged<T>(
    field: &str,
    slot: &mut T,
    value: Option<T>,
    range: RangeInclusive<T>,
    applied: &mut usize,
) where
    T: PartialOrd + Copy + Debug,
{
    match value {
        Some(v) if range.contains(&v) => {
            *slot = v;
            *applied += 1;
        }
        Some(v) => warn!("settings: {field}={v:?} outside {range:?}, ignored"),
        None => {}
    }
}

pub(crate) fn set_text<const N: usize>(
    field: &str,
    slot: &mut heapless::String<N>,
    value: Option<String>,
    applied: &mut usize,
) {
    let Some(v) = value else { return };
    if has_control_chars(&v) {
        warn!("settings: {field} contains control characters, ignored");
        return;
    }
    if v.len() > N {
        debug!("settings: {field} truncated to {N} bytes");
    }
    *slot = bounded(&v);
    *applied += 1;
}
