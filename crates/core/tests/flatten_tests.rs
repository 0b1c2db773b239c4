//! End-to-end runs of the rule engine over small schemas.

use proptest::prelude::*;
use schemaflat_core::{flatten, params, FlattenConfig, RuleId};
use schemaflat_model::testing::SchemaBuilder;
use schemaflat_model::{codes, Category, Diagnostics, Id, Max, Multiplicity, SchemaGraph};

fn run(g: &mut SchemaGraph, cfg: &FlattenConfig) -> (schemaflat_core::FlattenOutcome, Diagnostics) {
    let mut sink = Diagnostics::new();
    let outcome = flatten(g, cfg, &mut sink).expect("input graph is consistent");
    (outcome, sink)
}

fn names(g: &SchemaGraph, class: &Id) -> Vec<String> {
    g.properties_of(class).iter().map(|p| p.name.clone()).collect()
}

// ──────────────────────────────────────────────
// Inheritance
// ──────────────────────────────────────────────

#[test]
fn test_supertype_properties_reach_every_subtype() {
    let mut b = SchemaBuilder::new();
    let pkg = b.schema_package("App");
    let base = b.abstract_class("Base", &pkg, Category::Feature);
    b.attribute(&base, "id", "Integer", Multiplicity::ONE);
    b.attribute(&base, "name", "CharacterString", Multiplicity::OPTIONAL);
    let road = b.class("Road", &pkg, Category::Feature);
    b.generalize(&road, &base);
    b.attribute(&road, "width", "Real", Multiplicity::ONE);
    let rail = b.class("Rail", &pkg, Category::Feature);
    b.generalize(&rail, &base);
    b.attribute(&rail, "name", "CharacterString", Multiplicity::ONE);
    let mut g = b.build();

    let cfg = FlattenConfig::new().with_rule(RuleId::FlattenInheritance);
    let (outcome, _) = run(&mut g, &cfg);
    assert_eq!(outcome.rules_run, vec![RuleId::FlattenInheritance]);

    assert!(g.class(&base).is_none());
    for class in [&road, &rail] {
        let c = g.class(class).unwrap();
        assert!(c.supertypes.is_empty());
        let own = names(&g, class);
        assert!(own.contains(&"id".to_owned()), "{own:?}");
        assert!(own.contains(&"name".to_owned()), "{own:?}");
    }
    // the subtype's own, stricter property wins
    let rail_name = g.property_named(&rail, "name").unwrap();
    assert_eq!(rail_name.multiplicity, Multiplicity::ONE);
    assert_eq!(names(&g, &rail).len(), 2);
    assert!(g.check().is_empty(), "{:?}", g.check());
}

// ──────────────────────────────────────────────
// Multiplicity
// ──────────────────────────────────────────────

proptest! {
    #[test]
    fn test_bounded_properties_become_slots(lower in 0u32..6, extra in 0u32..6, ceiling in 1u32..6) {
        let max = (lower + extra).max(2);
        let min = lower.min(max);
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        let road = b.class("Road", &pkg, Category::Feature);
        b.attribute(&road, "lane", "Integer", Multiplicity::bounded(min, max));
        let mut g = b.build();

        let cfg = FlattenConfig::new()
            .with_rule(RuleId::FlattenMultiplicity)
            .with_parameter(params::MAX_OCCURS, ceiling.to_string());
        run(&mut g, &cfg);

        let slots = g.properties_of(&road);
        let count = max.min(ceiling);
        prop_assert_eq!(slots.len() as u32, count);
        prop_assert!(slots.iter().all(|p| p.multiplicity.max == Max::Bounded(1)));
        let min_sum: u32 = slots.iter().map(|p| p.multiplicity.min).sum();
        prop_assert_eq!(min_sum, min.min(count));
        prop_assert!(g.check().is_empty());
    }
}

#[test]
fn test_unbounded_property_untouched() {
    let mut b = SchemaBuilder::new();
    let pkg = b.schema_package("App");
    let road = b.class("Road", &pkg, Category::Feature);
    b.attribute(&road, "tag", "CharacterString", Multiplicity::MANY);
    let mut g = b.build();

    run(&mut g, &FlattenConfig::new().with_rule(RuleId::FlattenMultiplicity));
    assert_eq!(names(&g, &road), vec!["tag"]);
}

// ──────────────────────────────────────────────
// Type flattening
// ──────────────────────────────────────────────

#[test]
fn test_choice_merged_into_host() {
    let mut b = SchemaBuilder::new();
    let pkg = b.schema_package("App");
    let choice = b.class("Value", &pkg, Category::Union);
    b.attribute(&choice, "x", "Real", Multiplicity::OPTIONAL);
    b.attribute(&choice, "y", "Integer", Multiplicity::ONE);
    let road = b.class("Road", &pkg, Category::Feature);
    b.attribute_of(&road, "value", &choice, Multiplicity::OPTIONAL);
    let mut g = b.build();

    run(&mut g, &FlattenConfig::new().with_rule(RuleId::FlattenTypes));
    let props = g.properties_of(&road);
    assert_eq!(props.len(), 2);
    assert!(props.iter().all(|p| p.multiplicity == Multiplicity::OPTIONAL));
    assert!(g.class(&choice).is_none());
    assert!(g.check().is_empty(), "{:?}", g.check());
}

// ──────────────────────────────────────────────
// Association classes
// ──────────────────────────────────────────────

#[test]
fn test_association_class_becomes_plain_class() {
    let mut b = SchemaBuilder::new();
    let pkg = b.schema_package("App");
    let a = b.class("A", &pkg, Category::Feature);
    let bb = b.class("B", &pkg, Category::Feature);
    let ac = b.class("Link", &pkg, Category::Object);
    b.attribute(&ac, "p", "CharacterString", Multiplicity::ONE);
    let (assoc, _, _) = b.association(&a, "b", &bb, "a");
    let mut g = b.build();
    g.set_association_class(&assoc, Some(&ac));

    let cfg = FlattenConfig::new().with_rule(RuleId::DissolveAssociationClasses);
    let (_, sink) = run(&mut g, &cfg);

    assert_eq!(g.associations().count(), 2);
    assert!(g.associations().all(|x| x.association_class.is_none()));
    assert!(g.classes().all(|c| c.association_class_for.is_none()));
    assert!(g.property_named(&ac, "p").is_some());
    for assoc in g.associations() {
        let (e1, e2) = g.association_ends(&assoc.id).unwrap();
        assert!(e1.owner == ac || e2.owner == ac);
    }
    assert!(sink.has_code(codes::ASSOCIATION_CLASS_DISSOLVED));
    assert!(g.check().is_empty(), "{:?}", g.check());
}

// ──────────────────────────────────────────────
// Cycles
// ──────────────────────────────────────────────

#[test]
fn test_ring_reported_once_and_self_reference_as_reflexive() {
    let mut b = SchemaBuilder::new();
    let pkg = b.schema_package("App");
    let a = b.class("A", &pkg, Category::DataType);
    let bb = b.class("B", &pkg, Category::DataType);
    let c = b.class("C", &pkg, Category::DataType);
    let d = b.class("D", &pkg, Category::DataType);
    b.attribute_of(&a, "b", &bb, Multiplicity::ONE);
    b.attribute_of(&bb, "c", &c, Multiplicity::ONE);
    b.attribute_of(&c, "a", &a, Multiplicity::ONE);
    b.attribute_of(&d, "d", &d, Multiplicity::OPTIONAL);
    let mut g = b.build();

    let cfg = FlattenConfig::new().with_rule(RuleId::DetectTypeCycles);
    let (outcome, sink) = run(&mut g, &cfg);

    let cycles = outcome.analysis.cycles.as_ref().unwrap();
    assert_eq!(cycles.cycles.len(), 1);
    assert_eq!(cycles.cycles[0].hops.len(), 3);
    assert_eq!(cycles.reflexive.len(), 1);
    assert!(!outcome.analysis.findings.is_empty());
    assert!(sink.has_code(codes::CYCLE_DETECTED));
    assert!(sink.has_code(codes::REFLEXIVE_REFERENCE));
}

// ──────────────────────────────────────────────
// Whole pipeline
// ──────────────────────────────────────────────

#[test]
fn test_full_pipeline_keeps_graph_consistent() {
    let mut b = SchemaBuilder::new();
    let pkg = b.schema_package("App");
    let base = b.abstract_class("Named", &pkg, Category::Feature);
    b.attribute(&base, "name", "CharacterString", Multiplicity::bounded(1, 2));
    let address = b.class("Address", &pkg, Category::DataType);
    b.attribute(&address, "street", "CharacterString", Multiplicity::ONE);
    b.attribute(&address, "number", "Integer", Multiplicity::OPTIONAL);
    let road = b.class("Road", &pkg, Category::Feature);
    b.generalize(&road, &base);
    b.attribute_of(&road, "address", &address, Multiplicity::OPTIONAL);
    let sign = b.class("Sign", &pkg, Category::Feature);
    b.association_with(
        &road,
        "sign",
        Multiplicity::bounded(0, 2),
        &sign,
        "road",
        Multiplicity::ONE,
    );
    let mut g = b.build();

    let cfg = RuleId::ALL
        .into_iter()
        .filter(|r| !matches!(r, RuleId::RemoveType | RuleId::ForceOptional))
        .fold(FlattenConfig::new(), FlattenConfig::with_rule);
    let (outcome, _) = run(&mut g, &cfg);

    assert!(outcome.rules_run.contains(&RuleId::FlattenTypes));
    assert!(g.class(&base).is_none());
    assert!(g.class(&address).is_none());
    let road_names = names(&g, &road);
    for expected in ["name_1", "name_2", "address_street", "address_number"] {
        assert!(road_names.contains(&expected.to_owned()), "{road_names:?}");
    }
    assert!(g.check().is_empty(), "{:?}", g.check());
}
