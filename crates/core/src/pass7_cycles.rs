//! Group 7: type dependency cycle detection (advisory, no mutation).

use crate::config::RuleId;
use crate::session::{PassResult, Session};
use schemaflat_analyze::{analyze_cycles, AnalysisReport};
use schemaflat_model::SchemaGraph;

/// Report dependency cycles among the classes type flattening would
/// merge. The result is kept on the session for the final report.
pub fn detect_type_cycles(graph: &mut SchemaGraph, session: &mut Session) -> PassResult {
    let selection = session.type_selection()?;
    let selected = selection.select(graph);
    let cycles = analyze_cycles(graph, &selected);
    if cycles.truncated {
        tracing::warn!(found = cycles.cycles.len(), "cycle enumeration truncated");
    }
    tracing::debug!(
        vertices = cycles.vertex_count,
        edges = cycles.edge_count,
        cycles = cycles.cycles.len(),
        reflexive = cycles.reflexive.len(),
        "type dependency graph analyzed"
    );

    let partial = AnalysisReport {
        cycles: Some(cycles),
        ..AnalysisReport::default()
    };
    partial.emit(RuleId::DetectTypeCycles.as_str(), session.sink());

    session.analysis.cycles = partial.cycles;
    session.analysis.analyses_run.push("cycles".to_owned());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{params, FlattenConfig};
    use schemaflat_model::testing::SchemaBuilder;
    use schemaflat_model::{codes, Category, Diagnostics, Multiplicity};

    #[test]
    fn test_ring_and_self_reference_reported() {
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        let a = b.class("A", &pkg, Category::DataType);
        let bb = b.class("B", &pkg, Category::DataType);
        let c = b.class("C", &pkg, Category::DataType);
        let node = b.class("Node", &pkg, Category::Object);
        b.attribute_of(&a, "b", &bb, Multiplicity::ONE);
        b.attribute_of(&bb, "c", &c, Multiplicity::ONE);
        b.attribute_of(&c, "a", &a, Multiplicity::OPTIONAL);
        b.attribute_of(&node, "parent", &node, Multiplicity::OPTIONAL);
        let mut g = b.build();
        let before = g.property_count();

        let cfg = FlattenConfig::new().with_parameter(params::FLATTEN_OBJECT_TYPES, "true");
        let mut sink = Diagnostics::new();
        let mut s = Session::new(&cfg, &mut sink);
        s.begin(RuleId::DetectTypeCycles);
        detect_type_cycles(&mut g, &mut s).unwrap();
        let analysis = s.into_analysis();

        let cycles = analysis.cycles.unwrap();
        assert_eq!(cycles.cycles.len(), 1);
        assert_eq!(cycles.cycles[0].hops.len(), 3);
        assert_eq!(cycles.reflexive.len(), 1);
        assert_eq!(g.property_count(), before);
        assert_eq!(sink.with_code(codes::CYCLE_DETECTED).count(), 1);
        let reflexive: Vec<_> = sink.with_code(codes::REFLEXIVE_REFERENCE).collect();
        assert_eq!(reflexive.len(), 1);
        assert_eq!(reflexive[0].rule.as_deref(), Some("detect-type-cycles"));
    }

    #[test]
    fn test_invalid_regex_skips() {
        let mut g = SchemaBuilder::new().build();
        let cfg = FlattenConfig::new().with_parameter(params::FLATTEN_OBJECT_TYPES_INCLUDE_REGEX, "(");
        let mut sink = Diagnostics::new();
        let mut s = Session::new(&cfg, &mut sink);
        s.begin(RuleId::DetectTypeCycles);
        assert!(detect_type_cycles(&mut g, &mut s).is_err());
        drop(s);
        assert!(sink.has_code(codes::INVALID_PARAMETER));
    }
}
