//! Fuzz testing for envelope unwrapping.
//!
//! Feeds arbitrary bytes to `rewrite_request` under every attribute policy.
//! Any input must produce either a rewritten request or an `UnwrapError`;
//! a panic is a bug.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! cargo +nightly install cargo-fuzz
//! cargo +nightly fuzz run fuzz_envelope -- -max_total_time=60
//! ```

#![no_main]

use axum::http::{Method, Request};
use libfuzzer_sys::fuzz_target;
use pubsub_unwrap::UnwrapConfig;
use pubsub_unwrap::middleware::rewrite_request;

fuzz_target!(|data: &[u8]| {
    let configs = [
        UnwrapConfig::default(),
        UnwrapConfig::default().with_allow_attributes(false),
        UnwrapConfig::default().with_attributes_to_query(true),
    ];

    for config in &configs {
        let (mut parts, ()) = Request::new(()).into_parts();
        parts.method = Method::POST;

        if let Ok(req) = rewrite_request(parts, data, config) {
            // Every rewritten request declares its decoded length.
            assert!(req.headers().contains_key("content-length"));
        }
    }
});
