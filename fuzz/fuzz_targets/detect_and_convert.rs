//! Fuzz target for detection and conversion of arbitrary change data.
//!
//! Feeds the bytes as a `plain` change through the contacts fixture graph:
//! full detection, then a conversion towards the common contact format.
//! Errors are expected; panics and hangs are not.
//!
//! Run with:
//!   cargo +nightly fuzz run detect_and_convert

#![no_main]

use convgraph::manifest::{from_yaml_str, ManifestPlugin};
use convgraph::{FormatEnv, FormatPlugin, KnownObjType};
use libfuzzer_sys::fuzz_target;

const CONTACTS: &str = include_str!("../../tests/fixtures/contacts.yaml");

fn contacts_env() -> Option<FormatEnv> {
    let manifest = from_yaml_str(CONTACTS).ok()?;
    let plugins: Vec<Box<dyn FormatPlugin>> =
        vec![Box::new(ManifestPlugin::new("contacts", manifest))];
    let mut env = FormatEnv::new();
    env.load_plugins(&plugins);
    Some(env)
}

fuzz_target!(|data: &[u8]| {
    if data.len() > 64 * 1024 {
        return;
    }
    let Some(env) = contacts_env() else {
        return;
    };
    let Ok(mut change) = env.new_change("fuzz", "plain", Some(data.to_vec())) else {
        return;
    };

    let _ = env.detect_objformat_full(&change);
    let before = change.clone();
    if let Ok(None) = env.convert(&mut change, &KnownObjType) {
        assert_eq!(change, before);
    }
});
