//! Criterion microbenches for path finding and conversion.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure:
//! - path search over chains and dense graphs of growing size
//! - search with data detectors consulted along the way
//! - executing a found path on a change

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use convgraph::manifest::{from_yaml_str, ManifestPlugin};
use convgraph::{Conversion, Converted, ConverterFlags, FormatEnv, FormatPlugin};

const CONTACTS_FIXTURE: &str = include_str!("../tests/fixtures/contacts.yaml");
const CARD_FIXTURE: &[u8] = include_bytes!("../tests/fixtures/card30_wrapped.txt");

fn append(suffix: &'static str) -> Conversion {
    Conversion::convert(move |input: &[u8], _: Option<&str>| {
        Ok(Converted::Replaced([input, suffix.as_bytes()].concat()))
    })
}

/// Formats f0..f{n-1} linked forward losslessly and backward lossily.
fn chain_env(n: usize) -> FormatEnv {
    let mut env = FormatEnv::new();
    for i in 0..n {
        env.register_objformat("note", &format!("f{i}")).unwrap();
    }
    for i in 1..n {
        let (a, b) = (format!("f{}", i - 1), format!("f{i}"));
        env.register_converter(&a, &b, append("+"), ConverterFlags::default())
            .unwrap();
        env.register_converter(&b, &a, append("-"), ConverterFlags::default().lossy())
            .unwrap();
    }
    env
}

/// Every format converts to every other; edges to lower indices are lossy.
fn dense_env(n: usize) -> FormatEnv {
    let mut env = FormatEnv::new();
    for i in 0..n {
        env.register_objformat("note", &format!("f{i}")).unwrap();
    }
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let flags = if j < i {
                ConverterFlags::default().lossy()
            } else {
                ConverterFlags::default()
            };
            env.register_converter(&format!("f{i}"), &format!("f{j}"), append("x"), flags)
                .unwrap();
        }
    }
    env
}

fn contacts_env() -> FormatEnv {
    let manifest = from_yaml_str(CONTACTS_FIXTURE).expect("Failed to parse contacts fixture");
    let plugins: Vec<Box<dyn FormatPlugin>> =
        vec![Box::new(ManifestPlugin::new("contacts", manifest))];
    let mut env = FormatEnv::new();
    env.load_plugins(&plugins);
    env
}

/// Benchmark path search without data.
fn bench_find_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_path");

    for n in [8usize, 32, 128] {
        let env = chain_env(n);
        let change = env.new_change("bench", "f0", None).unwrap();
        let target = env.find_objformat(&format!("f{}", n - 1)).unwrap();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("chain", n), &n, |b, _| {
            b.iter(|| black_box(env.find_path(black_box(&change), &target)))
        });
    }

    for n in [8usize, 24] {
        let env = dense_env(n);
        let change = env.new_change("bench", &format!("f{}", n - 1), None).unwrap();
        let target = env.find_objformat("f0").unwrap();
        group.throughput(Throughput::Elements((n * (n - 1)) as u64));
        group.bench_with_input(BenchmarkId::new("dense", n), &n, |b, _| {
            b.iter(|| black_box(env.find_path(black_box(&change), &target)))
        });
    }

    group.finish();
}

/// Benchmark path search that unwraps and detects the data.
fn bench_find_path_detecting(c: &mut Criterion) {
    let env = contacts_env();
    let change = env
        .new_change("bench", "wrapped", Some(CARD_FIXTURE.to_vec()))
        .unwrap();
    let target = env.find_objformat("vcard21").unwrap();

    let mut group = c.benchmark_group("find_path_detecting");
    group.throughput(Throughput::Bytes(CARD_FIXTURE.len() as u64));

    group.bench_function("wrapped_to_vcard21", |b| {
        b.iter(|| black_box(env.find_path(black_box(&change), &target)))
    });

    group.finish();
}

/// Benchmark executing a path.
///
/// The path is found once; each iteration converts a fresh copy of the
/// change.
fn bench_execute_path(c: &mut Criterion) {
    let env = contacts_env();
    let change = env
        .new_change("bench", "wrapped", Some(CARD_FIXTURE.to_vec()))
        .unwrap();
    let target = env.find_objformat("vcard21").unwrap();
    let path = env.find_path(&change, &target).expect("fixture path");

    let mut group = c.benchmark_group("execute_path");
    group.throughput(Throughput::Bytes(CARD_FIXTURE.len() as u64));

    group.bench_function("wrapped_to_vcard21", |b| {
        b.iter(|| {
            let mut change = change.clone();
            env.execute_path(&mut change, black_box(&path)).unwrap();
            black_box(change)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_find_path,
    bench_find_path_detecting,
    bench_execute_path
);
criterion_main!(benches);
