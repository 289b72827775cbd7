#![allow(dead_code)]

use std::sync::Arc;

use convgraph::converter::{ConvertError, ConvertFn};
use convgraph::{Change, Conversion, Converted, ConverterFlags, ConverterKind, FormatEnv, Path};

/// Appends `suffix` to the input.
pub fn add(suffix: &'static str) -> ConvertFn {
    Arc::new(move |input: &[u8], _: Option<&str>| {
        let mut out = input.to_vec();
        out.extend_from_slice(suffix.as_bytes());
        Ok(Converted::Replaced(out))
    })
}

/// Cuts the input at the last occurrence of `marker`; fails if it is absent.
pub fn cut(marker: &'static str) -> ConvertFn {
    Arc::new(move |input: &[u8], _: Option<&str>| {
        let marker = marker.as_bytes();
        let pos = input
            .windows(marker.len())
            .rposition(|w| w == marker)
            .ok_or_else(|| ConvertError::new(format!("no '{}' to remove", String::from_utf8_lossy(marker))))?;
        Ok(Converted::Replaced(input[..pos].to_vec()))
    })
}

pub fn failing() -> ConvertFn {
    Arc::new(|_: &[u8], _: Option<&str>| Err(ConvertError::new("refused")))
}

/// Registers formats under one object type.
pub fn formats(env: &mut FormatEnv, objtype: &str, names: &[&str]) {
    for name in names {
        env.register_objformat(objtype, name).expect("register format");
    }
}

pub fn edge(env: &mut FormatEnv, kind: ConverterKind, from: &str, to: &str, func: ConvertFn) {
    env.register_converter(from, to, Conversion::with_kind(kind, func), ConverterFlags::default())
        .expect("register converter");
}

pub fn conv(env: &mut FormatEnv, from: &str, to: &str, func: ConvertFn) {
    edge(env, ConverterKind::Conv, from, to, func);
}

pub fn encap(env: &mut FormatEnv, from: &str, to: &str, func: ConvertFn) {
    edge(env, ConverterKind::Encap, from, to, func);
}

pub fn decap(env: &mut FormatEnv, from: &str, to: &str, func: ConvertFn) {
    edge(env, ConverterKind::Decap, from, to, func);
}

pub fn detector(env: &mut FormatEnv, from: &str, to: &str, verdict: bool) {
    env.register_data_detector(from, to, move |_: &[u8]| verdict);
}

pub fn change(env: &FormatEnv, format: &str, data: &str) -> Change {
    env.new_change("uid1", format, Some(data.as_bytes().to_vec()))
        .expect("create change")
}

pub fn text(change: &Change) -> &str {
    std::str::from_utf8(change.data().expect("change has data")).expect("utf-8 data")
}

pub fn format_of(env: &FormatEnv, change: &Change) -> String {
    env.format_name(change.format()).to_string()
}

/// The path as `source->target` pairs.
pub fn hops(env: &FormatEnv, path: &Path) -> Vec<String> {
    path.converters()
        .map(|id| {
            let converter = env.converters().converter(id);
            format!(
                "{}->{}",
                env.format_name(converter.source()),
                env.format_name(converter.target())
            )
        })
        .collect()
}

/// The detect/convert scenario with six formats of one object type:
/// F2 holds either F3 or F4 data and its detectors report F4.
pub fn desenc_complex() -> FormatEnv {
    desenc(ConverterFlags::default())
}

/// [`desenc_complex`] with the F2 -> F3 and F2 -> F4 fork edges only
/// followed once detection confirms them.
pub fn desenc_detect_first() -> FormatEnv {
    desenc(ConverterFlags::default().detect_first())
}

fn desenc(fork: ConverterFlags) -> FormatEnv {
    let mut env = FormatEnv::new();
    env.register_objtype("O1");
    formats(&mut env, "O1", &["F1", "F2"]);
    detector(&mut env, "F2", "F4", true);
    detector(&mut env, "F2", "F3", false);
    formats(&mut env, "O1", &["F3", "F4", "F5", "F6"]);

    decap(&mut env, "F1", "F2", add("test"));
    encap(&mut env, "F2", "F1", cut("test"));
    for target in ["F3", "F4"] {
        env.register_converter(
            "F2",
            target,
            Conversion::with_kind(ConverterKind::Decap, add("test2")),
            fork.clone(),
        )
        .expect("register fork edge");
    }
    encap(&mut env, "F3", "F2", cut("test2"));
    encap(&mut env, "F4", "F2", cut("test2"));
    conv(&mut env, "F3", "F6", add("test2"));
    conv(&mut env, "F4", "F5", add("test2"));
    conv(&mut env, "F5", "F4", cut("test2"));
    encap(&mut env, "F5", "F6", add("test2"));
    decap(&mut env, "F6", "F5", cut("test2"));
    env
}

/// Two object types: a five-step chain F1..F6 and a direct F1 -> G1 edge.
/// With `lossy_step`, F2 -> F3 is a lossy de-encapsulation.
pub fn objtype_fork(lossy_step: bool) -> FormatEnv {
    let mut env = FormatEnv::new();
    env.register_objtype("F");
    env.register_objtype("G");
    formats(&mut env, "F", &["F1", "F2", "F3", "F4", "F5", "F6"]);
    formats(&mut env, "G", &["G1"]);

    encap(&mut env, "F1", "F2", add("test"));
    if lossy_step {
        decap(&mut env, "F2", "F3", add("test"));
    } else {
        encap(&mut env, "F2", "F3", add("test"));
    }
    encap(&mut env, "F3", "F4", add("test"));
    encap(&mut env, "F4", "F5", add("test"));
    encap(&mut env, "F5", "F6", add("test"));
    encap(&mut env, "F1", "G1", add("test2"));
    env
}
