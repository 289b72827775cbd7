//! Fuzz target for YAML graph manifests.
//!
//! Parses arbitrary bytes as a manifest and, when it loads, validates the
//! resulting graph.
//!
//! Run with:
//!   cargo +nightly fuzz run manifest_yaml_parse

#![no_main]

use convgraph::manifest::fuzz_load_manifest;
use convgraph::validation::validate_graph;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Manifests are small; 1MB is plenty.
    if data.len() > 1024 * 1024 {
        return;
    }
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(env) = fuzz_load_manifest(text) {
        let _ = validate_graph(&env);
    }
});
