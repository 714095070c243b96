//! Fuzz target: lenient settings patches
//!
//! Interprets the input as a JSON settings document (the same shape a
//! bulk import or a persisted section uses) and verifies:
//! - No panics for any JSON shape or value type
//! - Every touched section still exports as a JSON object
//! - Exported documents never contain a secret field
//!
//! cargo fuzz run fuzz_settings_patch

#![no_main]

use brewos::settings::{Section, Settings};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(doc) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    let mut settings = Settings::default();
    let touched = settings.apply_document(&doc);
    for section in &touched {
        assert!(settings.export_section(*section).is_object());
    }

    for section in Section::ALL {
        settings.apply_partial(section, &doc);
    }

    let exported = settings.export();
    assert!(exported["network"].get("wifiPassword").is_none());
    assert!(exported["mqtt"].get("password").is_none());
    assert!(exported["cloud"].get("deviceKey").is_none());
});
