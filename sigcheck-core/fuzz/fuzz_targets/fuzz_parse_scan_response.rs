#![no_main]

//! Fuzz target for parse_scan_response()
//!
//! Arbitrary response bodies must either fail with an error or yield a
//! finite score that classifies without panicking.
//!
//! Run with: cargo +nightly fuzz run fuzz_parse_scan_response

use libfuzzer_sys::fuzz_target;
use sigcheck_core::{classify, donut_fraction, parse_scan_response};

fuzz_target!(|data: &[u8]| {
    if let Ok(outcome) = parse_scan_response(data) {
        assert!(outcome.similarity_index.is_finite());
        assert!(!outcome.computed_at.trim().is_empty());
        let _ = classify(Some(outcome.similarity_index));
        let fraction = donut_fraction(outcome.similarity_index);
        assert!((0.0..=1.0).contains(&fraction));
    }
});
