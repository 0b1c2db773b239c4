//! AnalysisReport -- aggregated output of the advisory analyses.
//!
//! The report collects the cycle and duplicate-name results and extracts
//! notable findings for summary display. It also maps findings onto the
//! diagnostic codes the engine reports.

use crate::cycles::CycleReport;
use crate::duplicates::DuplicateReport;
use schemaflat_model::{codes, Diagnostic, DiagnosticSink};
use serde::Serialize;

/// Severity level for an analysis finding.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum FindingSeverity {
    Info,
    Warning,
}

/// A notable finding from analysis.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub analysis: String,
    pub severity: FindingSeverity,
    pub message: String,
    pub entity_id: Option<String>,
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisReport {
    pub cycles: Option<CycleReport>,
    pub duplicates: Option<DuplicateReport>,
    pub analyses_run: Vec<String>,
    pub findings: Vec<Finding>,
}

impl AnalysisReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract findings from populated analysis results.
    pub fn extract_findings(&mut self) {
        self.findings.clear();

        if let Some(ref cycles) = self.cycles {
            for cycle in &cycles.cycles {
                self.findings.push(Finding {
                    analysis: "cycles".to_string(),
                    severity: FindingSeverity::Warning,
                    message: format!("Type dependency cycle: {}", cycle.render()),
                    entity_id: cycle.hops.first().map(|h| h.from.to_string()),
                    details: Some(serde_json::json!({
                        "classes": cycle.hops.iter().map(|h| &h.from_name).collect::<Vec<_>>(),
                    })),
                });
            }
            for r in &cycles.reflexive {
                self.findings.push(Finding {
                    analysis: "cycles".to_string(),
                    severity: FindingSeverity::Info,
                    message: format!(
                        "Class '{}' references itself via {}",
                        r.class_name,
                        r.properties.join(", ")
                    ),
                    entity_id: Some(r.class.to_string()),
                    details: Some(serde_json::json!({ "properties": r.properties })),
                });
            }
            if cycles.truncated {
                self.findings.push(Finding {
                    analysis: "cycles".to_string(),
                    severity: FindingSeverity::Warning,
                    message: format!("Cycle enumeration truncated at {} cycles", cycles.cycles.len()),
                    entity_id: None,
                    details: None,
                });
            }
        }

        if let Some(ref dups) = self.duplicates {
            for d in &dups.properties {
                self.findings.push(Finding {
                    analysis: "duplicates".to_string(),
                    severity: FindingSeverity::Warning,
                    message: format!(
                        "Class '{}' has {} properties named '{}'",
                        d.class_name,
                        d.properties.len(),
                        d.name
                    ),
                    entity_id: Some(d.class.to_string()),
                    details: None,
                });
            }
            for d in &dups.classes {
                self.findings.push(Finding {
                    analysis: "duplicates".to_string(),
                    severity: FindingSeverity::Warning,
                    message: format!(
                        "Package '{}' has {} classes named '{}'",
                        d.package_name,
                        d.classes.len(),
                        d.name
                    ),
                    entity_id: Some(d.package.to_string()),
                    details: None,
                });
            }
        }

        // Sort findings for deterministic output
        self.findings.sort_by(|a, b| {
            a.analysis
                .cmp(&b.analysis)
                .then_with(|| format!("{:?}", a.severity).cmp(&format!("{:?}", b.severity)))
                .then_with(|| a.message.cmp(&b.message))
        });
    }

    /// Report every result as a diagnostic.
    pub fn emit(&self, rule: &str, sink: &mut dyn DiagnosticSink) {
        if let Some(ref cycles) = self.cycles {
            for r in &cycles.reflexive {
                sink.emit(
                    Diagnostic::info(
                        codes::REFLEXIVE_REFERENCE,
                        vec![r.class_name.clone(), r.properties.join(", ")],
                    )
                    .with_rule(rule),
                );
            }
            for cycle in &cycles.cycles {
                sink.emit(
                    Diagnostic::warning(codes::CYCLE_DETECTED, vec![cycle.render()]).with_rule(rule),
                );
            }
        }
        if let Some(ref dups) = self.duplicates {
            for d in &dups.properties {
                sink.emit(
                    Diagnostic::warning(
                        codes::DUPLICATE_PROPERTY_NAME,
                        vec![d.class_name.clone(), d.name.clone()],
                    )
                    .with_rule(rule),
                );
            }
            for d in &dups.classes {
                sink.emit(
                    Diagnostic::warning(
                        codes::DUPLICATE_CLASS_NAME,
                        vec![d.package_name.clone(), d.name.clone()],
                    )
                    .with_rule(rule),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycles::{Cycle, Hop, ReflexiveReference};
    use schemaflat_model::{Diagnostics, Id};

    fn report() -> AnalysisReport {
        let hop = |f: &str, t: &str, p: &str| Hop {
            from: Id::from(f),
            from_name: f.to_string(),
            to: Id::from(t),
            to_name: t.to_string(),
            properties: vec![p.to_string()],
        };
        let mut report = AnalysisReport::new();
        report.cycles = Some(CycleReport {
            vertex_count: 3,
            edge_count: 2,
            cycles: vec![Cycle {
                hops: vec![hop("A", "B", "b"), hop("B", "A", "a")],
            }],
            reflexive: vec![ReflexiveReference {
                class: Id::from("C"),
                class_name: "C".to_string(),
                properties: vec!["self".to_string()],
            }],
            truncated: false,
        });
        report
    }

    #[test]
    fn test_findings_sorted_and_complete() {
        let mut r = report();
        r.extract_findings();
        assert_eq!(r.findings.len(), 2);
        assert_eq!(r.findings[0].severity, FindingSeverity::Info);
        assert!(r.findings[1].message.contains("A -[b]-> B -[a]-> A"));
    }

    #[test]
    fn test_emit_diagnostics() {
        let mut sink = Diagnostics::new();
        report().emit("detect-type-cycles", &mut sink);
        assert!(sink.has_code(codes::CYCLE_DETECTED));
        assert!(sink.has_code(codes::REFLEXIVE_REFERENCE));
        assert!(sink
            .entries()
            .iter()
            .all(|d| d.rule.as_deref() == Some("detect-type-cycles")));
    }
}
