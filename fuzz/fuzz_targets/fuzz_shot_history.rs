//! Fuzz target: shot history flash codec
//!
//! Feeds arbitrary bytes to `codec::decode` and verifies:
//! - No panics under arbitrary input
//! - A successful decode never holds more than `MAX_SHOT_HISTORY` records
//! - Re-encoding a decoded history decodes to the same records
//!
//! cargo fuzz run fuzz_shot_history

#![no_main]

use brewos::history::{MAX_SHOT_HISTORY, codec};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(history) = codec::decode(data) else {
        return;
    };
    assert!(history.len() <= MAX_SHOT_HISTORY);

    let again = codec::decode(&codec::encode(&history)).expect("re-encoded blob must decode");
    assert_eq!(again.len(), history.len());
    for (a, b) in again.iter().zip(history.iter()) {
        assert_eq!(a.timestamp, b.timestamp);
        assert_eq!(a.rating, b.rating);
        assert_eq!(a.dose_weight.to_bits(), b.dose_weight.to_bits());
    }
});
