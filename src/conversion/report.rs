//! Conversion report types describing a chosen path.
//!
//! Mirrors `validation::ValidationReport`: a list of issues with severities
//! and stable codes, printable as text and serializable as JSON.

use serde::Serialize;
use std::fmt;

use crate::converter::ConverterKind;
use crate::path::PathCost;

/// A report describing the path a conversion takes.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ConversionReport {
    /// Format the change starts in.
    pub from: String,
    /// Acceptable target formats.
    pub targets: Vec<String>,
    /// Format the path ends in.
    pub reached: String,
    /// Edges in path order.
    pub steps: Vec<ConversionStep>,
    pub cost: PathCost,
    /// Notes and warnings about the path.
    pub issues: Vec<ConversionIssue>,
}

impl ConversionReport {
    /// Create a new empty report for a conversion starting at `from`.
    pub fn new(from: impl Into<String>, targets: Vec<String>) -> Self {
        let from = from.into();
        Self {
            reached: from.clone(),
            from,
            targets,
            ..Default::default()
        }
    }

    /// Add an issue to the report.
    pub fn add(&mut self, issue: ConversionIssue) {
        self.issues.push(issue);
    }

    /// Count of warning-level issues.
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == ConversionSeverity::Warning)
            .count()
    }

    /// Count of info-level issues.
    pub fn info_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == ConversionSeverity::Info)
            .count()
    }

    /// Returns true if the path was priced as lossy.
    pub fn is_lossy(&self) -> bool {
        self.cost.losses > 0
    }

    /// Iterate over warning messages.
    pub fn warning_messages(&self) -> impl Iterator<Item = &str> {
        self.issues
            .iter()
            .filter(|i| i.severity == ConversionSeverity::Warning)
            .map(|i| i.message.as_str())
    }
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} -> {} ({} step(s), losses={}, objtype changes={}, conversions={})",
            self.from,
            self.reached,
            self.steps.len(),
            self.cost.losses,
            self.cost.objtype_changes,
            self.cost.conversions
        )?;

        for (i, step) in self.steps.iter().enumerate() {
            let mut tags = Vec::new();
            if step.lossy {
                tags.push("lossy");
            }
            if step.confirmed {
                tags.push("detected");
            }
            write!(
                f,
                "  {}. {} -> {} [{}]",
                i + 1,
                step.source,
                step.target,
                step.kind
            )?;
            if tags.is_empty() {
                writeln!(f)?;
            } else {
                writeln!(f, " ({})", tags.join(", "))?;
            }
        }

        let warnings = self.warning_count();
        if warnings > 0 {
            writeln!(f)?;
            writeln!(f, "Warnings ({}):", warnings)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == ConversionSeverity::Warning)
            {
                writeln!(f, "  - {}", issue.message)?;
            }
        }

        let infos = self.info_count();
        if infos > 0 {
            writeln!(f)?;
            writeln!(f, "Notes ({}):", infos)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == ConversionSeverity::Info)
            {
                writeln!(f, "  - {}", issue.message)?;
            }
        }

        Ok(())
    }
}

/// One edge of the reported path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConversionStep {
    pub source: String,
    pub target: String,
    pub kind: ConverterKind,
    pub lossy: bool,
    pub confirmed: bool,
}

/// A single issue discovered while analysing a path.
#[derive(Clone, Debug, Serialize)]
pub struct ConversionIssue {
    pub severity: ConversionSeverity,
    pub code: ConversionIssueCode,
    pub message: String,
}

impl ConversionIssue {
    /// Create a warning-level issue.
    pub fn warning(code: ConversionIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: ConversionSeverity::Warning,
            code,
            message: message.into(),
        }
    }

    /// Create an info-level issue.
    pub fn info(code: ConversionIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: ConversionSeverity::Info,
            code,
            message: message.into(),
        }
    }
}

/// Severity level for conversion issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionSeverity {
    /// The path may lose information or change what the data means.
    Warning,
    /// A note about how the path was chosen.
    Info,
}

/// Stable issue codes for programmatic consumption.
///
/// These codes are part of the JSON schema and should remain stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionIssueCode {
    /// A step may discard information.
    LossyStep,
    /// A step moves the data into another object type.
    ObjtypeChange,
    /// A step that wanted detection was taken without it.
    UnconfirmedDetection,
    /// Detection confirmed a step's target format.
    DetectionConfirmed,
    /// A detector step only re-labels the data.
    RetagOnly,
    /// The change is already in a target format.
    AlreadyInTarget,
}
