//! Graph inspection.
//!
//! Summarizes a loaded environment: counts, object types with their
//! formats, and every converter edge, for the `list` command.

mod report;

pub use report::{EdgeSummary, FormatSummary, InspectReport, KindCount, ObjTypeSection, SummarySection};

use std::collections::BTreeMap;

use crate::converter::ConverterKind;
use crate::env::FormatEnv;

/// Inspect an environment and produce a report.
pub fn inspect_graph(env: &FormatEnv) -> InspectReport {
    let formats = env.formats();
    let converters = env.converters();

    let summary = SummarySection {
        objtypes: formats.objtypes().len(),
        formats: formats.formats().len(),
        converters: converters.converters().len(),
        detectors: converters.detectors().len(),
        pending: converters.pending_converters().len() + converters.pending_detectors().len(),
    };

    let objtypes = formats
        .objtypes()
        .iter()
        .map(|objtype| ObjTypeSection {
            name: objtype.name().to_string(),
            common_format: objtype
                .common_format()
                .map(|id| formats.format_name(id).to_string()),
            formats: objtype
                .formats()
                .iter()
                .map(|&id| FormatSummary {
                    name: formats.format_name(id).to_string(),
                    outgoing: converters.outgoing(id).len(),
                    incoming: converters
                        .converters()
                        .iter()
                        .filter(|c| c.target() == id)
                        .count(),
                    detectors: converters.detectors_from(id).count(),
                })
                .collect(),
        })
        .collect();

    let mut kinds: BTreeMap<&'static str, usize> = BTreeMap::new();
    let edges = converters
        .converters()
        .iter()
        .map(|converter| {
            *kinds.entry(converter.kind().name()).or_default() += 1;
            EdgeSummary {
                source: formats.format_name(converter.source()).to_string(),
                target: formats.format_name(converter.target()).to_string(),
                kind: converter.kind(),
                lossy: converter.is_lossy(),
                detect_first: converter.is_detect_first(),
            }
        })
        .collect();

    // Keep a stable kind order in the report even for kinds with no edges.
    let kinds = [
        ConverterKind::Conv,
        ConverterKind::Encap,
        ConverterKind::Decap,
        ConverterKind::Detector,
    ]
    .into_iter()
    .map(|kind| KindCount {
        kind,
        count: kinds.get(kind.name()).copied().unwrap_or(0),
    })
    .collect();

    InspectReport {
        summary,
        objtypes,
        kinds,
        edges,
    }
}
