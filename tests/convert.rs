use convgraph::conversion::ConversionIssueCode;
use convgraph::{ConvGraphError, ConvertError, Converted, FormatEnv};

mod common;

use common::{add, conv, cut, decap, encap, format_of, formats, text};

fn chain(kind_forward: fn(&mut FormatEnv, &str, &str, convgraph::converter::ConvertFn)) -> FormatEnv {
    let mut env = FormatEnv::new();
    env.register_objtype("O1");
    formats(&mut env, "O1", &["F1", "F2", "F3"]);
    kind_forward(&mut env, "F1", "F2", add("test"));
    kind_forward(&mut env, "F2", "F3", add("test2"));
    env
}

#[test]
fn converts_along_chain() {
    let env = chain(conv);
    let mut change = common::change(&env, "F1", "data");
    env.convert_to_name(&mut change, "F3").unwrap();
    assert_eq!(text(&change), "datatesttest2");
    assert_eq!(format_of(&env, &change), "F3");
}

#[test]
fn converts_back_along_reverse_edges() {
    let mut env = chain(conv);
    conv(&mut env, "F2", "F1", cut("test"));
    conv(&mut env, "F3", "F2", cut("test2"));

    let mut change = common::change(&env, "F1", "data");
    env.convert_to_name(&mut change, "F3").unwrap();
    assert_eq!(text(&change), "datatesttest2");

    env.convert_to_name(&mut change, "F1").unwrap();
    assert_eq!(text(&change), "data");
    assert_eq!(format_of(&env, &change), "F1");
}

#[test]
fn decap_and_encap_round_trip() {
    let mut env = chain(decap);
    encap(&mut env, "F2", "F1", cut("test"));
    encap(&mut env, "F3", "F2", cut("test2"));

    let mut change = common::change(&env, "F1", "data");
    env.convert_to_name(&mut change, "F3").unwrap();
    assert_eq!(text(&change), "datatesttest2");

    env.convert_to_name(&mut change, "F1").unwrap();
    assert_eq!(text(&change), "data");
}

#[test]
fn detected_format_chooses_the_branch() {
    let env = common::desenc_complex();
    let mut change = common::change(&env, "F1", "data");

    let path = env.convert_to_name(&mut change, "F6").unwrap();
    assert_eq!(
        common::hops(&env, &path),
        ["F1->F2", "F2->F4", "F4->F5", "F5->F6"]
    );
    assert_eq!(text(&change), "datatesttest2test2test2");
    assert_eq!(format_of(&env, &change), "F6");

    env.convert_to_name(&mut change, "F1").unwrap();
    assert_eq!(text(&change), "data");
    assert_eq!(format_of(&env, &change), "F1");
}

#[test]
fn detect_first_fork_round_trip() {
    let env = common::desenc_detect_first();
    let mut change = common::change(&env, "F1", "data");

    let path = env.convert_to_name(&mut change, "F6").unwrap();
    assert_eq!(
        common::hops(&env, &path),
        ["F1->F2", "F2->F4", "F4->F5", "F5->F6"]
    );
    assert!(path.steps()[1].confirmed);
    assert!(!path.steps()[1].lossy);
    assert_eq!(text(&change), "datatesttest2test2test2");

    env.convert_to_name(&mut change, "F1").unwrap();
    assert_eq!(text(&change), "data");
    assert_eq!(format_of(&env, &change), "F1");
}

#[test]
fn detect_first_fork_closes_the_undetected_branch() {
    let env = common::desenc_detect_first();
    let f3 = env.find_objformat("F3").unwrap();

    // The data is detected as F4, so F2 -> F3 is never followed.
    let mut change = common::change(&env, "F1", "data");
    let err = env.convert_to(&mut change, &f3).unwrap_err();
    assert!(matches!(err, ConvGraphError::NoPath { .. }));
    assert_eq!(text(&change), "data");

    // Searching without data leaves both fork edges open.
    let blind = env.find_path_from_format(change.format(), &f3).unwrap();
    assert_eq!(common::hops(&env, &blind), ["F1->F2", "F2->F3"]);
    assert!(!blind.steps()[1].confirmed);
}

#[test]
fn extensions_wrap_every_conversion() {
    let mut env = chain(conv);
    conv(&mut env, "F2", "F1", cut("test"));
    env.register_extension(
        "F2",
        |input: &[u8], _: Option<&str>| Ok(Converted::Replaced([input, &b"+x"[..]].concat())),
        |input: &[u8], _: Option<&str>| match input.strip_suffix(b"+x") {
            Some(rest) => Ok(Converted::Replaced(rest.to_vec())),
            None => Err(ConvertError::new("extension field missing")),
        },
    )
    .unwrap();

    // Into F2: converter, then F2's `to` extension.
    let mut change = common::change(&env, "F1", "data");
    env.convert_to_name(&mut change, "F2").unwrap();
    assert_eq!(text(&change), "datatest+x");

    // Out of F2: F2's `from` extension, then the converter.
    let mut forward = change.clone();
    env.convert_to_name(&mut forward, "F3").unwrap();
    assert_eq!(text(&forward), "datatesttest2");

    env.convert_to_name(&mut change, "F1").unwrap();
    assert_eq!(text(&change), "data");
}

#[test]
fn extensions_run_in_registration_order() {
    let mut env = chain(conv);
    for tag in ["<a>", "<b>"] {
        env.register_extension(
            "F3",
            move |input: &[u8], _: Option<&str>| {
                Ok(Converted::Replaced([input, tag.as_bytes()].concat()))
            },
            |_: &[u8], _: Option<&str>| Ok(Converted::Reused),
        )
        .unwrap();
    }

    let mut change = common::change(&env, "F1", "data");
    env.convert_to_name(&mut change, "F3").unwrap();
    assert_eq!(text(&change), "datatesttest2<a><b>");
}

#[test]
fn failing_extension_fails_the_edge() {
    let mut env = chain(conv);
    env.register_extension(
        "F2",
        |_: &[u8], _: Option<&str>| Ok(Converted::Reused),
        |_: &[u8], _: Option<&str>| Err(ConvertError::new("refused")),
    )
    .unwrap();

    let f3 = env.find_objformat("F3").unwrap();
    let mut change = common::change(&env, "F1", "data");
    let path = env.find_path(&change, &f3).unwrap();
    let err = env.execute_path(&mut change, &path).unwrap_err();
    assert!(matches!(err, ConvGraphError::ConversionFailed { .. }));
    assert_eq!(text(&change), "datatest");
    assert_eq!(format_of(&env, &change), "F2");
}

#[test]
fn extension_output_is_what_detectors_see() {
    let mut env = FormatEnv::new();
    formats(&mut env, "O1", &["F1", "F2", "F3", "F4"]);
    conv(&mut env, "F1", "F2", add(""));
    decap(&mut env, "F2", "F3", add(""));
    decap(&mut env, "F2", "F4", add(""));
    env.register_data_detector("F2", "F4", |data: &[u8]| data.starts_with(b"v4:"));
    env.register_extension(
        "F2",
        |input: &[u8], _: Option<&str>| Ok(Converted::Replaced([&b"v4:"[..], input].concat())),
        |_: &[u8], _: Option<&str>| Ok(Converted::Reused),
    )
    .unwrap();

    let targets = [
        env.find_objformat("F3").unwrap(),
        env.find_objformat("F4").unwrap(),
    ];
    let mut change = common::change(&env, "F1", "data");
    let path = env.convert_to(&mut change, &targets).unwrap();
    assert_eq!(common::hops(&env, &path), ["F1->F2", "F2->F4"]);
    assert!(!path.is_lossy());
    assert_eq!(text(&change), "v4:data");
}

#[test]
fn unknown_format_extension_is_rejected() {
    let mut env = chain(conv);
    let err = env
        .register_extension(
            "F9",
            |_: &[u8], _: Option<&str>| Ok(Converted::Reused),
            |_: &[u8], _: Option<&str>| Ok(Converted::Reused),
        )
        .unwrap_err();
    assert!(matches!(err, ConvGraphError::UnknownFormat(_)));
}

#[test]
fn detect_and_convert_round_trip() {
    let mut env = FormatEnv::new();
    formats(&mut env, "O1", &["F1", "F2", "F3", "F4"]);
    common::detector(&mut env, "F1", "F2", true);
    common::detector(&mut env, "F2", "F3", true);
    common::detector(&mut env, "F2", "F4", false);
    decap(&mut env, "F1", "F2", add("test"));
    encap(&mut env, "F2", "F1", cut("test"));
    decap(&mut env, "F2", "F3", add("test2"));
    decap(&mut env, "F2", "F4", add("test2"));
    encap(&mut env, "F3", "F2", cut("test2"));
    conv(&mut env, "F3", "F4", add("test2"));
    conv(&mut env, "F4", "F3", cut("test2"));

    let mut change = common::change(&env, "F1", "data");
    env.convert_to_name(&mut change, "F4").unwrap();
    assert_eq!(text(&change), "datatesttest2test2");
    assert_eq!(change.objtype(), env.find_objtype("O1").unwrap());
    assert_eq!(format_of(&env, &change), "F4");

    env.convert_to_name(&mut change, "F1").unwrap();
    assert_eq!(text(&change), "data");
}

#[test]
fn prefers_path_without_lossy_steps() {
    let mut env = FormatEnv::new();
    formats(&mut env, "O1", &["F1", "F2", "F3", "F4", "F5"]);
    encap(&mut env, "F1", "F2", add("test"));
    encap(&mut env, "F2", "F3", add("test"));
    encap(&mut env, "F3", "F5", add("test"));
    decap(&mut env, "F1", "F4", add("test2"));
    encap(&mut env, "F4", "F5", add("test2"));

    let mut change = common::change(&env, "F1", "data");
    env.convert_to_name(&mut change, "F5").unwrap();
    assert_eq!(text(&change), "datatesttesttest");
}

#[test]
fn prefers_staying_in_objtype() {
    let env = common::objtype_fork(false);
    let targets = [
        env.find_objformat("G1").unwrap(),
        env.find_objformat("F6").unwrap(),
    ];
    let mut change = common::change(&env, "F1", "data");
    env.convert_to(&mut change, &targets).unwrap();
    assert_eq!(text(&change), "datatesttesttesttesttest");
    assert_eq!(change.objtype(), env.find_objtype("F").unwrap());
    assert_eq!(format_of(&env, &change), "F6");
}

#[test]
fn prefers_objtype_change_over_loss() {
    let env = common::objtype_fork(true);
    let targets = [
        env.find_objformat("G1").unwrap(),
        env.find_objformat("F6").unwrap(),
    ];
    let mut change = common::change(&env, "F1", "data");
    env.convert_to(&mut change, &targets).unwrap();
    assert_eq!(text(&change), "datatest2");
    assert_eq!(change.objtype(), env.find_objtype("G").unwrap());
    assert_eq!(format_of(&env, &change), "G1");
}

#[test]
fn unconfirmed_detection_still_converts_but_is_reported() {
    let mut env = FormatEnv::new();
    formats(&mut env, "O1", &["F1", "F2", "F3"]);
    common::detector(&mut env, "F1", "F2", true);
    common::detector(&mut env, "F2", "F3", false);
    decap(&mut env, "F1", "F2", add("test"));
    encap(&mut env, "F2", "F1", cut("test"));
    decap(&mut env, "F2", "F3", add("test2"));
    encap(&mut env, "F3", "F2", cut("test2"));

    let f3 = env.find_objformat("F3").unwrap();
    let mut change = common::change(&env, "F1", "data");
    let path = env.convert_to(&mut change, &f3).unwrap();
    assert!(path.is_lossy());
    assert_eq!(text(&change), "datatesttest2");

    let report = env.conversion_report(&path, &f3);
    let codes: Vec<_> = report.issues.iter().map(|issue| issue.code).collect();
    assert!(codes.contains(&ConversionIssueCode::DetectionConfirmed));
    assert!(codes.contains(&ConversionIssueCode::UnconfirmedDetection));
    assert!(codes.contains(&ConversionIssueCode::LossyStep));
}

#[test]
fn failing_converter_keeps_last_good_state() {
    let mut env = chain(conv);
    formats(&mut env, "O1", &["F4"]);
    conv(&mut env, "F3", "F4", common::failing());

    let mut change = common::change(&env, "F1", "data");
    let err = env.convert_to_name(&mut change, "F4").unwrap_err();
    match err {
        ConvGraphError::ConversionFailed {
            source_format,
            target_format,
            source,
        } => {
            assert_eq!(source_format, "F3");
            assert_eq!(target_format, "F4");
            assert_eq!(source.message(), "refused");
        }
        other => panic!("expected a conversion failure, got {other:?}"),
    }
    assert_eq!(text(&change), "datatesttest2");
    assert_eq!(format_of(&env, &change), "F3");
}

#[test]
fn change_without_data_is_retagged() {
    let env = chain(conv);
    let mut change = env.new_change("uid1", "F1", None).unwrap();
    env.convert_to_name(&mut change, "F3").unwrap();
    assert_eq!(format_of(&env, &change), "F3");
    assert_eq!(change.data(), None);
}

#[test]
fn missing_path_leaves_change_untouched() {
    let env = chain(conv);
    let mut change = common::change(&env, "F3", "data");
    let f1 = env.find_objformat("F1").unwrap();
    assert_eq!(env.convert(&mut change, &f1).unwrap(), None);
    assert_eq!(text(&change), "data");
    assert!(matches!(
        env.convert_to(&mut change, &f1),
        Err(ConvGraphError::NoPath { .. })
    ));
}

#[test]
fn path_is_reusable_across_changes() {
    let env = chain(conv);
    let f3 = env.find_objformat("F3").unwrap();
    let path = env
        .find_path_from_format(env.find_objformat("F1").unwrap(), &f3)
        .unwrap();

    for input in ["a", "b"] {
        let mut change = common::change(&env, "F1", input);
        env.execute_path(&mut change, &path).unwrap();
        assert_eq!(text(&change), format!("{input}testtest2"));
    }

    let mut wrong = common::change(&env, "F2", "x");
    assert!(matches!(
        env.execute_path(&mut wrong, &path),
        Err(ConvGraphError::PathMismatch { .. })
    ));
}

#[test]
fn frozen_env_converts_on_many_threads() {
    let env = common::desenc_complex();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let env = &env;
                scope.spawn(move || {
                    let mut change = env
                        .new_change(format!("uid{i}"), "F1", Some(b"data".to_vec()))
                        .unwrap();
                    env.convert_to_name(&mut change, "F6").unwrap();
                    change.into_data().unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), b"datatesttest2test2test2");
        }
    });
}

#[test]
fn full_detection_unwraps_to_innermost_format() {
    let mut env = FormatEnv::new();
    formats(&mut env, "data", &["plain", "wrapped"]);
    formats(&mut env, "contact", &["vcard21"]);
    env.register_data_detector("plain", "wrapped", |data: &[u8]| data.ends_with(b"</wrap>"));
    decap(&mut env, "wrapped", "plain", cut("</wrap>"));
    env.register_converter(
        "plain",
        "vcard21",
        convgraph::Conversion::detector(|data| data.starts_with(b"BEGIN:VCARD")),
        convgraph::ConverterFlags::default(),
    )
    .unwrap();

    let change = common::change(&env, "plain", "BEGIN:VCARD</wrap>");
    assert_eq!(
        env.detect_objformat(&change),
        env.find_objformat("wrapped")
    );
    let innermost = env.detect_objformat_full(&change).unwrap();
    assert_eq!(env.format_name(innermost), "vcard21");
    assert_eq!(text(&change), "BEGIN:VCARD</wrap>");
}
