//! schemaflat advisory analyses -- type dependency cycles and duplicate
//! names, with structured output.
//!
//! The analyses never mutate the graph. Each produces a serializable
//! result; [`analyze()`] runs both and aggregates them into an
//! [`AnalysisReport`].

pub mod cycles;
pub mod duplicates;
pub mod report;
pub mod selection;

pub use cycles::{analyze_cycles, Cycle, CycleReport, DependencyGraph, Hop, ReflexiveReference};
pub use duplicates::{find_duplicate_names, DuplicateClassName, DuplicatePropertyName, DuplicateReport};
pub use report::{AnalysisReport, Finding, FindingSeverity};
pub use selection::TypeSelection;

use schemaflat_model::SchemaGraph;

/// Run both analyses over the graph.
pub fn analyze(graph: &SchemaGraph, selection: &TypeSelection) -> AnalysisReport {
    let selected = selection.select(graph);
    let mut report = AnalysisReport::new();
    report.cycles = Some(analyze_cycles(graph, &selected));
    report.duplicates = Some(find_duplicate_names(graph));
    report.analyses_run = vec!["cycles".to_string(), "duplicates".to_string()];
    report.extract_findings();
    report
}
