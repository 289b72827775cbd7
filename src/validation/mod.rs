//! Converter graph validation.
//!
//! Checks a populated [`FormatEnv`] for:
//! - Registrations that never resolved (unknown format names)
//! - Data detectors without a matching converter edge
//! - Formats no converter touches
//! - Detect-first edges that can never be confirmed

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::HashSet;

use crate::env::FormatEnv;
use crate::registry::FormatId;

/// Validates a graph and returns a report of all issues found.
pub fn validate_graph(env: &FormatEnv) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_pending(env, &mut report);
    validate_objtypes(env, &mut report);
    validate_formats(env, &mut report);
    validate_detectors(env, &mut report);

    report
}

/// Reports registrations still waiting for a format.
fn validate_pending(env: &FormatEnv, report: &mut ValidationReport) {
    for pending in env.converters().pending_converters() {
        report.add(ValidationIssue::error(
            IssueCode::UnresolvedConverter,
            format!(
                "converter never resolved; unknown format(s): {}",
                missing_formats(env, &pending.source, &pending.target)
            ),
            IssueContext::Converter {
                source: pending.source.clone(),
                target: pending.target.clone(),
            },
        ));
    }

    for pending in env.converters().pending_detectors() {
        report.add(ValidationIssue::warning(
            IssueCode::UnresolvedDetector,
            format!(
                "detector never resolved; unknown format(s): {}",
                missing_formats(env, &pending.source, &pending.target)
            ),
            IssueContext::Converter {
                source: pending.source.clone(),
                target: pending.target.clone(),
            },
        ));
    }
}

fn missing_formats(env: &FormatEnv, source: &str, target: &str) -> String {
    [source, target]
        .into_iter()
        .filter(|name| env.find_objformat(name).is_none())
        .collect::<Vec<_>>()
        .join(", ")
}

fn validate_objtypes(env: &FormatEnv, report: &mut ValidationReport) {
    for objtype in env.formats().objtypes() {
        if objtype.formats().is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyObjType,
                "object type has no formats",
                IssueContext::ObjType {
                    name: objtype.name().to_string(),
                },
            ));
        }
    }
}

/// Reports formats without edges and detect-first edges nothing can confirm.
fn validate_formats(env: &FormatEnv, report: &mut ValidationReport) {
    let converters = env.converters();
    let touched: HashSet<FormatId> = converters
        .converters()
        .iter()
        .flat_map(|c| [c.source(), c.target()])
        .collect();

    for format in env.formats().formats() {
        if !touched.contains(&format.id()) {
            report.add(ValidationIssue::warning(
                IssueCode::IsolatedFormat,
                "no converter leads to or from this format",
                IssueContext::Format {
                    name: format.name().to_string(),
                },
            ));
        }
    }

    for converter in converters.converters() {
        if !converter.is_detect_first() {
            continue;
        }
        let source = env.formats().format(converter.source());
        let has_detector = converters
            .detector_for(converter.source(), converter.target())
            .is_some();
        if !has_detector && source.hooks().report_as.is_none() {
            report.add(ValidationIssue::warning(
                IssueCode::DetectFirstWithoutDetector,
                "detect-first edge has no data detector and its source has no report_as hook",
                IssueContext::Converter {
                    source: source.name().to_string(),
                    target: env.formats().format_name(converter.target()).to_string(),
                },
            ));
        }
    }
}

/// Reports detectors whose pair has no converter edge to follow.
fn validate_detectors(env: &FormatEnv, report: &mut ValidationReport) {
    let converters = env.converters();
    for detector in converters.detectors() {
        if converters
            .find_converter(detector.source(), detector.target())
            .is_none()
        {
            report.add(ValidationIssue::warning(
                IssueCode::OrphanDetector,
                "detector has no converter edge for its pair and is never consulted",
                IssueContext::Converter {
                    source: env.formats().format_name(detector.source()).to_string(),
                    target: env.formats().format_name(detector.target()).to_string(),
                },
            ));
        }
    }
}
