//! Fuzz target for JSON graph manifests.
//!
//! Run with:
//!   cargo +nightly fuzz run manifest_json_parse

#![no_main]

use convgraph::manifest::{from_json_str, ManifestPlugin};
use convgraph::{FormatEnv, FormatPlugin};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(manifest) = from_json_str(text) else {
        return;
    };
    if manifest.validate().is_err() {
        return;
    }

    let plugins: Vec<Box<dyn FormatPlugin>> = vec![Box::new(ManifestPlugin::new("fuzz", manifest))];
    let mut env = FormatEnv::new();
    let _ = env.load_plugins(&plugins);
});
