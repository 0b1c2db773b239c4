//! Integration tests for the advisory analyses.

use schemaflat_analyze::{analyze, FindingSeverity, TypeSelection};
use schemaflat_model::testing::SchemaBuilder;
use schemaflat_model::{Category, Multiplicity, SchemaGraph};

/// Two data types referencing each other, a self-referencing union, and a
/// feature type that is never part of the selection.
fn fixture() -> SchemaGraph {
    let mut b = SchemaBuilder::new();
    let pkg = b.schema_package("App");
    let addr = b.class("Address", &pkg, Category::DataType);
    let loc = b.class("Location", &pkg, Category::DataType);
    let tree = b.class("TreeChoice", &pkg, Category::Union);
    let road = b.class("Road", &pkg, Category::Feature);
    b.attribute_of(&addr, "location", &loc, Multiplicity::ONE);
    b.attribute_of(&loc, "address", &addr, Multiplicity::OPTIONAL);
    b.attribute_of(&tree, "leaf", &tree, Multiplicity::OPTIONAL);
    b.attribute_of(&road, "address", &addr, Multiplicity::ONE);
    b.attribute(&road, "name", "CharacterString", Multiplicity::ONE);
    b.attribute(&road, "name", "CharacterString", Multiplicity::ONE);
    b.build()
}

// ──────────────────────────────────────────────
// Cycles
// ──────────────────────────────────────────────

#[test]
fn test_cycle_and_reflexive_reported() {
    let report = analyze(&fixture(), &TypeSelection::default());
    let cycles = report.cycles.expect("cycles should be populated");
    assert_eq!(cycles.vertex_count, 3);
    assert_eq!(cycles.cycles.len(), 1);
    assert_eq!(
        cycles.cycles[0].render(),
        "Address -[location]-> Location -[address]-> Address"
    );
    assert_eq!(cycles.reflexive.len(), 1);
    assert_eq!(cycles.reflexive[0].class_name, "TreeChoice");
}

#[test]
fn test_object_types_join_selection_when_enabled() {
    let mut b = SchemaBuilder::new();
    let pkg = b.schema_package("App");
    let a = b.class("A", &pkg, Category::Object);
    let c = b.class("C", &pkg, Category::Object);
    b.attribute_of(&a, "c", &c, Multiplicity::ONE);
    b.attribute_of(&c, "a", &a, Multiplicity::ONE);
    let g = b.build();

    let off = analyze(&g, &TypeSelection::default());
    assert!(off.cycles.unwrap().cycles.is_empty());

    let on = analyze(
        &g,
        &TypeSelection {
            flatten_object_types: true,
            ..Default::default()
        },
    );
    assert_eq!(on.cycles.unwrap().cycles.len(), 1);
}

// ──────────────────────────────────────────────
// Duplicates and findings
// ──────────────────────────────────────────────

#[test]
fn test_findings_cover_all_results() {
    let report = analyze(&fixture(), &TypeSelection::default());
    assert_eq!(report.analyses_run, vec!["cycles", "duplicates"]);
    let dups = report.duplicates.as_ref().expect("duplicates should be populated");
    assert_eq!(dups.properties.len(), 1);
    assert_eq!(dups.properties[0].class_name, "Road");

    let warnings = report
        .findings
        .iter()
        .filter(|f| f.severity == FindingSeverity::Warning)
        .count();
    assert_eq!(warnings, 2);
    assert_eq!(report.findings.len(), 3);
}

#[test]
fn test_report_serializes() {
    let report = analyze(&fixture(), &TypeSelection::default());
    let json = serde_json::to_value(&report).unwrap();
    assert!(json["cycles"]["cycles"].is_array());
    assert_eq!(json["findings"].as_array().unwrap().len(), 3);
}
