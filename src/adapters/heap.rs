//! Free-heap probe.
//!
//! Implements [`ResourceProbe`] on top of `esp_get_free_heap_size()`.  The
//! host build has no meaningful figure and reports a fixed value, which
//! can be overridden for simulations of a starved device.

use crate::app::ports::ResourceProbe;

/// Reported on the host when no override is set.
#[cfg(not(feature = "espidf"))]
const HOST_FREE_HEAP: usize = 256 * 1024;

#[derive(Debug, Default)]
pub struct HeapProbe {
    #[cfg(not(feature = "espidf"))]
    fixed: Option<usize>,
}

impl HeapProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `bytes` instead of the host default.
    #[cfg(not(feature = "espidf"))]
    pub fn fixed(bytes: usize) -> Self {
        Self { fixed: Some(bytes) }
    }
}

impl ResourceProbe for HeapProbe {
    #[cfg(feature = "espidf")]
    fn free_heap_bytes(&self) -> usize {
        (unsafe { esp_idf_svc::sys::esp_get_free_heap_size() }) as usize
    }

    #[cfg(not(feature = "espidf"))]
    fn free_heap_bytes(&self) -> usize {
        self.fixed.unwrap_or(HOST_FREE_HEAP)
    }
}
