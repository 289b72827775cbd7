//! Path execution and path reporting.
//!
//! [`execute_path`] applies a path to a change edge by edge.
//! [`build_conversion_report`] describes a path without running it.
//!
//! Every conversion edge runs inside the extensions of its formats: the
//! source format's `from` extensions, then the converter, then the target
//! format's `to` extensions. Detector edges only relabel and run none.

pub mod report;

pub use report::{
    ConversionIssue, ConversionIssueCode, ConversionReport, ConversionSeverity, ConversionStep,
};

use tracing::debug;

use crate::change::Change;
use crate::converter::{
    ConvertError, ConvertFn, Converted, Converter, ConverterKind, ConverterRegistry,
};
use crate::error::ConvGraphError;
use crate::path::Path;
use crate::registry::FormatRegistry;

/// Applies a path to a change.
///
/// After every edge the change is tagged with the edge's target format and
/// object type. A failing edge aborts the walk and leaves the change as it
/// was after the last successful edge. Changes without data are retagged to
/// the final format without running any converter.
pub fn execute_path(
    formats: &FormatRegistry,
    converters: &ConverterRegistry,
    change: &mut Change,
    path: &Path,
) -> Result<(), ConvGraphError> {
    if path.is_empty() {
        return Ok(());
    }
    if path.source() != change.format() {
        return Err(ConvGraphError::PathMismatch {
            expected: formats.format_name(path.source()).to_string(),
            found: formats.format_name(change.format()).to_string(),
        });
    }

    if !change.has_data() {
        let target = path.target();
        change.retag(target, formats.objtype_of(target));
        debug!(
            uid = change.uid(),
            format = formats.format_name(target),
            "retagged change without data"
        );
        return Ok(());
    }

    for step in path.steps() {
        let converter = converters.converter(step.converter);
        if converter.source() != change.format() {
            return Err(ConvGraphError::PathMismatch {
                expected: formats.format_name(converter.source()).to_string(),
                found: formats.format_name(change.format()).to_string(),
            });
        }

        if converter.kind() != ConverterKind::Detector {
            let result = match change.data() {
                Some(input) => invoke_edge(formats, converter, input),
                None => Ok(Converted::Reused),
            };
            match result {
                Ok(Converted::Replaced(output)) => change.set_data(output),
                Ok(Converted::Reused) => {}
                Err(source) => {
                    return Err(ConvGraphError::ConversionFailed {
                        source_format: formats.format_name(converter.source()).to_string(),
                        target_format: formats.format_name(converter.target()).to_string(),
                        source,
                    });
                }
            }
        }

        let target = converter.target();
        change.retag(target, formats.objtype_of(target));
        debug!(
            uid = change.uid(),
            source = formats.format_name(converter.source()),
            target = formats.format_name(target),
            kind = %converter.kind(),
            size = change.size(),
            "applied converter"
        );
    }

    Ok(())
}

/// Runs one edge on a buffer together with the extensions of its formats.
///
/// Any failing function fails the whole edge; the input is never touched.
pub(crate) fn invoke_edge(
    formats: &FormatRegistry,
    converter: &Converter,
    input: &[u8],
) -> Result<Converted, ConvertError> {
    if converter.kind() == ConverterKind::Detector {
        return Ok(Converted::Reused);
    }
    let from = formats.format(converter.source()).extensions();
    let to = formats.format(converter.target()).extensions();
    if from.is_empty() && to.is_empty() {
        return converter.invoke(input);
    }

    let mut buffer = None;
    for extension in from {
        apply(&extension.from, &mut buffer, input)?;
    }
    let converted = converter.invoke(buffer.as_deref().unwrap_or(input))?;
    if let Converted::Replaced(output) = converted {
        buffer = Some(output);
    }
    for extension in to {
        apply(&extension.to, &mut buffer, input)?;
    }

    Ok(buffer.map_or(Converted::Reused, Converted::Replaced))
}

fn apply(func: &ConvertFn, buffer: &mut Option<Vec<u8>>, input: &[u8]) -> Result<(), ConvertError> {
    let current = buffer.as_deref().unwrap_or(input);
    if let Converted::Replaced(output) = func(current, None)? {
        *buffer = Some(output);
    }
    Ok(())
}

/// Describes a path: its steps, its cost, and what to watch out for.
pub fn build_conversion_report(
    formats: &FormatRegistry,
    converters: &ConverterRegistry,
    path: &Path,
    targets: Vec<String>,
) -> ConversionReport {
    let mut report = ConversionReport::new(formats.format_name(path.source()), targets);
    report.reached = formats.format_name(path.target()).to_string();
    report.cost = path.cost();

    if path.is_empty() {
        report.add(ConversionIssue::info(
            ConversionIssueCode::AlreadyInTarget,
            format!("already in target format {}", report.reached),
        ));
        return report;
    }

    for step in path.steps() {
        let converter = converters.converter(step.converter);
        let source = formats.format_name(converter.source());
        let target = formats.format_name(converter.target());
        report.steps.push(ConversionStep {
            source: source.to_string(),
            target: target.to_string(),
            kind: converter.kind(),
            lossy: step.lossy,
            confirmed: step.confirmed,
        });

        if step.lossy {
            report.add(ConversionIssue::warning(
                ConversionIssueCode::LossyStep,
                format!("{source} -> {target} ({}) may lose information", converter.kind()),
            ));
        }

        let source_objtype = formats.objtype(formats.objtype_of(converter.source()));
        let target_objtype = formats.objtype(formats.objtype_of(converter.target()));
        if source_objtype.id() != target_objtype.id() {
            report.add(ConversionIssue::warning(
                ConversionIssueCode::ObjtypeChange,
                format!(
                    "{source} -> {target} changes object type {} -> {}",
                    source_objtype.name(),
                    target_objtype.name()
                ),
            ));
        }

        if converter.kind() == ConverterKind::Detector {
            report.add(ConversionIssue::info(
                ConversionIssueCode::RetagOnly,
                format!("{source} -> {target} re-labels the data without converting it"),
            ));
        } else if step.confirmed {
            report.add(ConversionIssue::info(
                ConversionIssueCode::DetectionConfirmed,
                format!("detection confirmed {target} data under {source}"),
            ));
        } else if converter.is_detect_first()
            || converters
                .detector_for(converter.source(), converter.target())
                .is_some()
        {
            report.add(ConversionIssue::warning(
                ConversionIssueCode::UnconfirmedDetection,
                format!("{source} -> {target} taken without detection confirming {target}"),
            ));
        }
    }

    report
}
