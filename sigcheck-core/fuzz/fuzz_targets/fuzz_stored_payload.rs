#![no_main]

//! Fuzz target for decoding image payloads read back from the table service.
//!
//! Run with: cargo +nightly fuzz run fuzz_stored_payload

use libfuzzer_sys::fuzz_target;
use sigcheck_core::encoder::{data_uri_for_stored, decode};

fuzz_target!(|data: &[u8]| {
    if let Ok(payload) = std::str::from_utf8(data) {
        let _ = decode(payload);
        let uri = data_uri_for_stored(payload);
        assert!(uri.starts_with("data:image/"));
    }
});
