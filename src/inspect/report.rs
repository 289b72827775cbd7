//! Inspect report types and terminal formatting.

use std::fmt;

use serde::Serialize;

use crate::converter::ConverterKind;

const INNER_WIDTH: usize = 59;

/// The result of inspecting a format graph.
#[derive(Clone, Debug, Serialize)]
pub struct InspectReport {
    pub summary: SummarySection,
    /// Object types in registration order.
    pub objtypes: Vec<ObjTypeSection>,
    /// Edge count per converter kind.
    pub kinds: Vec<KindCount>,
    /// Every resolved converter edge in registration order.
    pub edges: Vec<EdgeSummary>,
}

/// Summary counts for the graph.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SummarySection {
    pub objtypes: usize,
    pub formats: usize,
    /// Resolved converter edges.
    pub converters: usize,
    /// Resolved data detectors.
    pub detectors: usize,
    /// Converters and detectors still waiting for a format.
    pub pending: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct ObjTypeSection {
    pub name: String,
    pub common_format: Option<String>,
    pub formats: Vec<FormatSummary>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FormatSummary {
    pub name: String,
    pub outgoing: usize,
    pub incoming: usize,
    /// Data detectors sourced at this format.
    pub detectors: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct KindCount {
    pub kind: ConverterKind,
    pub count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct EdgeSummary {
    pub source: String,
    pub target: String,
    pub kind: ConverterKind,
    pub lossy: bool,
    pub detect_first: bool,
}

impl fmt::Display for InspectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "╭─────────────────────────────────────────────────────────────╮")?;
        writeln!(f, "│{:^61}│", "Graph Inspection Report")?;
        writeln!(f, "╰─────────────────────────────────────────────────────────────╯")?;
        writeln!(f)?;

        self.fmt_summary(f)?;
        writeln!(f)?;
        self.fmt_objtypes(f)?;
        writeln!(f)?;
        self.fmt_edges(f)?;

        Ok(())
    }
}

impl InspectReport {
    fn fmt_summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;

        section_top(f, "Summary")?;
        line(f, "")?;
        line(f, &format!("  Object types:  {:>8}", s.objtypes))?;
        line(f, &format!("  Formats:       {:>8}", s.formats))?;
        line(f, &format!("  Converters:    {:>8}", s.converters))?;
        line(f, &format!("  Detectors:     {:>8}", s.detectors))?;
        if s.pending > 0 {
            line(f, &format!("  Pending:       {:>8}", s.pending))?;
        }
        line(f, "")?;
        let kinds: Vec<String> = self
            .kinds
            .iter()
            .filter(|k| k.count > 0)
            .map(|k| format!("{} {}", k.count, k.kind))
            .collect();
        if !kinds.is_empty() {
            line(f, &format!("  Edges by kind: {}", kinds.join(", ")))?;
            line(f, "")?;
        }
        section_bottom(f)
    }

    fn fmt_objtypes(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        section_top(f, &format!("Object Types ({})", self.objtypes.len()))?;
        line(f, "")?;

        if self.objtypes.is_empty() {
            line(f, "  No object types registered.")?;
        }
        for objtype in &self.objtypes {
            match &objtype.common_format {
                Some(common) => line(f, &format!("  {} (common: {common})", objtype.name))?,
                None => line(f, &format!("  {}", objtype.name))?,
            }
            for format in &objtype.formats {
                line(
                    f,
                    &format!(
                        "    {:<24} out {:>3}  in {:>3}  det {:>3}",
                        format.name, format.outgoing, format.incoming, format.detectors
                    ),
                )?;
            }
        }

        line(f, "")?;
        section_bottom(f)
    }

    fn fmt_edges(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        section_top(f, &format!("Converters ({})", self.edges.len()))?;
        line(f, "")?;

        if self.edges.is_empty() {
            line(f, "  No converters registered.")?;
        }
        for edge in &self.edges {
            let mut flags = Vec::new();
            if edge.lossy {
                flags.push("lossy");
            }
            if edge.detect_first {
                flags.push("detect-first");
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };
            line(
                f,
                &format!("  {} -> {} ({}){flags}", edge.source, edge.target, edge.kind),
            )?;
        }

        line(f, "")?;
        section_bottom(f)
    }
}

fn section_top(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    let fill = (INNER_WIDTH - 1).saturating_sub(title.chars().count());
    writeln!(f, "┌─ {} {}┐", title, "─".repeat(fill))
}

fn section_bottom(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "└{}┘", "─".repeat(INNER_WIDTH + 2))
}

fn line(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    writeln!(f, "│ {:<width$}│", text, width = INNER_WIDTH + 1)
}
