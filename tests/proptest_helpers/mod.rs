#![allow(dead_code)]

use convgraph::transform::Transform;
use convgraph::{Conversion, ConverterFlags, ConverterKind, FormatEnv, PathCost};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn format_name(idx: usize) -> String {
    format!("fmt{idx}")
}

/// One link of a chain: the forward edge wraps by appending `suffix`,
/// the backward edge unwraps by stripping it.
#[derive(Clone, Debug)]
pub struct Link {
    pub suffix: String,
    pub forward: ConverterKind,
    pub backward: ConverterKind,
}

fn arb_kind() -> BoxedStrategy<ConverterKind> {
    prop_oneof![
        Just(ConverterKind::Conv),
        Just(ConverterKind::Encap),
        Just(ConverterKind::Decap),
    ]
    .boxed()
}

pub fn arb_links(max_len: usize) -> BoxedStrategy<Vec<Link>> {
    prop::collection::vec(
        ("[a-z]{1,4}", arb_kind(), arb_kind()).prop_map(|(suffix, forward, backward)| Link {
            suffix,
            forward,
            backward,
        }),
        1..=max_len,
    )
    .boxed()
}

/// Builds `fmt0 <-> fmt1 <-> ... <-> fmtN` from links.
pub fn chain_env(links: &[Link]) -> FormatEnv {
    let mut env = FormatEnv::new();
    for idx in 0..=links.len() {
        env.register_objformat("chain", &format_name(idx))
            .expect("register format");
    }
    for (idx, link) in links.iter().enumerate() {
        let from = format_name(idx);
        let to = format_name(idx + 1);
        env.register_converter(
            &from,
            &to,
            Conversion::with_kind(link.forward, Transform::Append.into_fn(Some(link.suffix.clone()))),
            ConverterFlags::default(),
        )
        .expect("register forward edge");
        env.register_converter(
            &to,
            &from,
            Conversion::with_kind(
                link.backward,
                Transform::StripSuffix.into_fn(Some(link.suffix.clone())),
            ),
            ConverterFlags::default(),
        )
        .expect("register backward edge");
    }
    env
}

/// A small graph: object type per format and directed edges by index.
#[derive(Clone, Debug)]
pub struct GraphShape {
    pub objtypes: Vec<bool>,
    pub edges: Vec<(usize, usize, ConverterKind)>,
}

pub fn arb_graph(max_formats: usize, max_edges: usize) -> BoxedStrategy<GraphShape> {
    (2..=max_formats)
        .prop_flat_map(move |n| {
            (
                prop::collection::vec(any::<bool>(), n),
                prop::collection::vec((0..n, 0..n, arb_kind()), 0..=max_edges),
            )
        })
        .prop_map(|(objtypes, edges)| {
            let mut seen = std::collections::HashSet::new();
            let edges = edges
                .into_iter()
                .filter(|(from, to, _)| from != to && seen.insert((*from, *to)))
                .collect();
            GraphShape { objtypes, edges }
        })
        .boxed()
}

pub fn graph_env(shape: &GraphShape) -> FormatEnv {
    let mut env = FormatEnv::new();
    for (idx, other) in shape.objtypes.iter().enumerate() {
        let objtype = if *other { "left" } else { "right" };
        env.register_objformat(objtype, &format_name(idx))
            .expect("register format");
    }
    for (from, to, kind) in &shape.edges {
        env.register_converter(
            &format_name(*from),
            &format_name(*to),
            Conversion::with_kind(*kind, Transform::Identity.into_fn(None)),
            ConverterFlags::default(),
        )
        .expect("register edge");
    }
    env
}

/// Cheapest cost over all simple paths, by exhaustive search.
pub fn brute_force_cost(shape: &GraphShape, from: usize, to: usize) -> Option<PathCost> {
    fn walk(
        shape: &GraphShape,
        at: usize,
        to: usize,
        visited: &mut Vec<bool>,
        cost: PathCost,
        best: &mut Option<PathCost>,
    ) {
        if at == to {
            if best.map_or(true, |b| cost < b) {
                *best = Some(cost);
            }
            return;
        }
        for &(src, dst, kind) in &shape.edges {
            if src != at || visited[dst] {
                continue;
            }
            let next = PathCost {
                losses: cost.losses + u32::from(kind.lossy_by_default()),
                objtype_changes: cost.objtype_changes
                    + u32::from(shape.objtypes[src] != shape.objtypes[dst]),
                conversions: cost.conversions + 1,
            };
            visited[dst] = true;
            walk(shape, dst, to, visited, next, best);
            visited[dst] = false;
        }
    }

    let mut visited = vec![false; shape.objtypes.len()];
    visited[from] = true;
    let mut best = None;
    walk(shape, from, to, &mut visited, PathCost::default(), &mut best);
    best
}
