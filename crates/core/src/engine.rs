//! Rule engine: runs the enabled rules over a schema graph.
//!
//! Rules always run in precedence order, whatever order the configuration
//! lists them in. A rule that cannot run with the given parameters is
//! skipped after reporting why; the run continues with the next rule.

use crate::config::{FlattenConfig, RuleId};
use crate::error::FlattenError;
use crate::session::{PassResult, Session, Skipped};
use crate::{
    pass10_types, pass11_geometry, pass12_association_classes, pass13_names, pass1_prune,
    pass2_codelists, pass2_constraints, pass3_reason_codes, pass4_optional, pass5_basic_types,
    pass6_inheritance, pass7_cycles, pass8_multiplicity, pass9_choice,
};
use schemaflat_analyze::AnalysisReport;
use schemaflat_model::{codes, DiagnosticSink, SchemaGraph};
use std::collections::BTreeSet;

type Pass = fn(&mut SchemaGraph, &mut Session) -> PassResult;

fn pass_for(rule: RuleId) -> Pass {
    match rule {
        RuleId::RemoveType => pass1_prune::remove_types,
        RuleId::PruneFlatTargetNavigability => pass1_prune::prune_flat_target_navigability,
        RuleId::FlattenConstraints => pass2_constraints::flatten_constraints,
        RuleId::RemoveConstraints => pass2_constraints::remove_constraints,
        RuleId::FlattenCodelists => pass2_codelists::flatten_codelists,
        RuleId::FlattenReasonCodes => pass3_reason_codes::flatten_reason_codes,
        RuleId::ForceOptional => pass4_optional::force_optional,
        RuleId::UnionOptionsOptional => pass4_optional::union_options_optional,
        RuleId::CollapseBasicTypes => pass5_basic_types::collapse_basic_types,
        RuleId::FlattenInheritance => pass6_inheritance::flatten_inheritance,
        RuleId::DetectTypeCycles => pass7_cycles::detect_type_cycles,
        RuleId::FlattenMultiplicity => pass8_multiplicity::flatten_multiplicity,
        RuleId::ReplaceSingleChoiceProperties => pass9_choice::replace_single_choice_properties,
        RuleId::FlattenTypes => pass10_types::flatten_types,
        RuleId::SplitHomogeneousGeometries => pass11_geometry::split_homogeneous_geometries,
        RuleId::DissolveAssociationClasses => pass12_association_classes::dissolve_association_classes,
        RuleId::FlattenNames => pass13_names::flatten_names,
        RuleId::DetectDuplicateNames => pass13_names::detect_duplicate_names,
    }
}

/// What a run did besides rewriting the graph.
#[derive(Debug, Default)]
pub struct FlattenOutcome {
    /// Rules that ran to completion, in execution order.
    pub rules_run: Vec<RuleId>,
    /// Rules that stood down because of their configuration.
    pub rules_skipped: Vec<RuleId>,
    /// Results of the advisory analyses, with findings extracted.
    pub analysis: AnalysisReport,
}

fn enabled_rules(config: &FlattenConfig, session: &mut Session) -> BTreeSet<RuleId> {
    let mut enabled = BTreeSet::new();
    for name in &config.rules {
        match name.parse::<RuleId>() {
            Ok(rule) => {
                enabled.insert(rule);
            }
            Err(unknown) => session.warn(codes::UNKNOWN_RULE, vec![unknown]),
        }
    }
    enabled
}

/// Apply every enabled rule of `config` to `graph`.
///
/// Fails only when the input graph is structurally inconsistent; all
/// other problems are reported through `sink`.
pub fn flatten(
    graph: &mut SchemaGraph,
    config: &FlattenConfig,
    sink: &mut dyn DiagnosticSink,
) -> Result<FlattenOutcome, FlattenError> {
    let violations = graph.check();
    if !violations.is_empty() {
        return Err(FlattenError::InvalidGraph(violations));
    }

    let mut session = Session::new(config, sink);
    let enabled = enabled_rules(config, &mut session);
    tracing::info!(
        rules = enabled.len(),
        classes = graph.class_count(),
        properties = graph.property_count(),
        "flattening started"
    );

    let mut outcome = FlattenOutcome::default();
    for rule in RuleId::ALL.into_iter().filter(|r| enabled.contains(r)) {
        let span = tracing::info_span!("rule", rule = %rule);
        let _guard = span.enter();
        session.begin(rule);
        match pass_for(rule)(graph, &mut session) {
            Ok(()) => {
                tracing::debug!(
                    classes = graph.class_count(),
                    properties = graph.property_count(),
                    "rule applied"
                );
                outcome.rules_run.push(rule);
            }
            Err(Skipped) => {
                tracing::warn!("rule skipped");
                outcome.rules_skipped.push(rule);
            }
        }
        session.end_pass();
    }

    for v in graph.check() {
        tracing::error!(element = %v.element, message = %v.message, "invariant violated after flattening");
    }

    outcome.analysis = session.into_analysis();
    outcome.analysis.extract_findings();
    tracing::info!(
        run = outcome.rules_run.len(),
        skipped = outcome.rules_skipped.len(),
        classes = graph.class_count(),
        properties = graph.property_count(),
        "flattening finished"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::params;
    use schemaflat_model::testing::SchemaBuilder;
    use schemaflat_model::{Category, Diagnostics, Id, Multiplicity};

    #[test]
    fn test_rules_run_in_precedence_order() {
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        let road = b.class("Road", &pkg, Category::Feature);
        b.attribute(&road, "lane", "Integer", Multiplicity::bounded(0, 2));
        let mut g = b.build();

        let cfg = FlattenConfig::new()
            .with_rule(RuleId::DetectDuplicateNames)
            .with_rule(RuleId::FlattenMultiplicity)
            .with_rule(RuleId::FlattenInheritance);
        let mut sink = Diagnostics::new();
        let outcome = flatten(&mut g, &cfg, &mut sink).unwrap();
        assert_eq!(
            outcome.rules_run,
            vec![
                RuleId::FlattenInheritance,
                RuleId::FlattenMultiplicity,
                RuleId::DetectDuplicateNames
            ]
        );
        assert_eq!(g.properties_of(&road).len(), 2);
        assert_eq!(outcome.analysis.analyses_run, vec!["duplicates".to_owned()]);
    }

    #[test]
    fn test_unknown_rule_reported() {
        let mut g = SchemaBuilder::new().build();
        let mut cfg = FlattenConfig::new();
        cfg.rules.push("flatten-everything".to_owned());
        let mut sink = Diagnostics::new();
        let outcome = flatten(&mut g, &cfg, &mut sink).unwrap();
        assert!(outcome.rules_run.is_empty());
        let w: Vec<_> = sink.with_code(codes::UNKNOWN_RULE).collect();
        assert_eq!(w.len(), 1);
        assert_eq!(w[0].params, vec!["flatten-everything".to_owned()]);
    }

    #[test]
    fn test_skipped_rule_does_not_stop_run() {
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        b.class("Road", &pkg, Category::Feature);
        let mut g = b.build();

        let cfg = FlattenConfig::new()
            .with_rule(RuleId::RemoveType)
            .with_rule(RuleId::FlattenMultiplicity)
            .with_parameter(params::MAX_OCCURS, "three");
        let mut sink = Diagnostics::new();
        let outcome = flatten(&mut g, &cfg, &mut sink).unwrap();
        assert_eq!(
            outcome.rules_skipped,
            vec![RuleId::RemoveType, RuleId::FlattenMultiplicity]
        );
        assert!(sink.has_code(codes::MISSING_PARAMETER));
        assert!(sink.has_code(codes::INVALID_PARAMETER));
    }

    #[test]
    fn test_inconsistent_input_rejected() {
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        let road = b.class("Road", &pkg, Category::Feature);
        let mut g = b.build();
        g.class_mut(&road).unwrap().supertypes.insert(Id::from("missing"));

        let mut sink = Diagnostics::new();
        let err = flatten(&mut g, &FlattenConfig::new(), &mut sink).unwrap_err();
        assert!(matches!(err, FlattenError::InvalidGraph(_)));
    }
}
