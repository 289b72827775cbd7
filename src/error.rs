use std::path::PathBuf;
use thiserror::Error;

use crate::converter::ConvertError;
use crate::validation::ValidationReport;

/// The main error type for convgraph operations.
#[derive(Debug, Error)]
pub enum ConvGraphError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse graph manifest {path}: {source}")]
    ManifestYamlParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to parse graph manifest {path}: {source}")]
    ManifestJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid graph manifest: {0}")]
    InvalidManifest(String),

    #[error("Unknown object format: {0}")]
    UnknownFormat(String),

    #[error("Unknown object type: {0}")]
    UnknownObjType(String),

    #[error("Format '{format}' is already registered under object type '{registered}', not '{requested}'")]
    FormatObjTypeConflict {
        format: String,
        registered: String,
        requested: String,
    },

    #[error("A converter from '{source_format}' to '{target_format}' is already registered")]
    DuplicateConverter {
        source_format: String,
        target_format: String,
    },

    #[error("Unable to find a conversion path from '{from}' to any of [{targets}]")]
    NoPath { from: String, targets: String },

    #[error("Path step expects format '{expected}' but the change is in '{found}'")]
    PathMismatch { expected: String, found: String },

    #[error("Conversion from '{source_format}' to '{target_format}' failed: {source}")]
    ConversionFailed {
        source_format: String,
        target_format: String,
        #[source]
        source: ConvertError,
    },

    #[error("Format plugin '{plugin}' failed to register: {message}")]
    Plugin { plugin: String, message: String },

    #[error("Graph validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },

    #[error("Failed to write JSON report: {0}")]
    ReportJson(#[source] serde_json::Error),

    #[error("Unsupported output format: {0}")]
    UnsupportedOutput(String),
}
