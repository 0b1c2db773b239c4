//! Round trips through the interchange document, and validation of the
//! written documents against schema/model-schema.json.

use schemaflat_interchange::{load, to_document, to_json_value, ModelDocument};
use schemaflat_model::{Category, Descriptor, Diagnostics, Id, Multiplicity, SchemaGraph};
use serde_json::json;
use std::path::Path;

fn fixture() -> serde_json::Value {
    json!({
        "packages": [
            { "id": "app", "name": "Transport", "isSchema": true, "targetNamespace": "urn:transport",
              "descriptors": { "documentation": ["Transport network"] } },
            { "id": "roads", "name": "Roads", "owner": "app" }
        ],
        "classes": [
            { "id": "named", "name": "Named", "package": "app", "stereotype": "featureType",
              "isAbstract": true,
              "properties": [{ "id": "n1", "name": "name", "type": { "name": "CharacterString" },
                               "multiplicity": "1..2" }] },
            { "id": "road", "name": "Road", "package": "roads", "stereotype": "FeatureType",
              "supertypes": ["named"],
              "descriptors": {
                  "alias": ["RD"],
                  "definition": [{ "value": "A road", "lang": "en" }, { "value": "Eine Straße", "lang": "de" }]
              },
              "tags": { "isFlatTarget": ["false"] },
              "constraints": [{ "kind": "ocl", "name": "positiveWidth", "text": "inv: self.width > 0" }],
              "properties": [
                  { "id": "w", "name": "width", "type": { "name": "Real" }, "multiplicity": "0..1" },
                  { "id": "ad", "name": "address", "type": { "id": "addr", "name": "Address" } }
              ] },
            { "id": "addr", "name": "Address", "package": "roads", "stereotype": "dataType",
              "properties": [{ "id": "st", "name": "street", "type": { "name": "CharacterString" } }] },
            { "id": "emp", "name": "Maintenance", "package": "roads" },
            { "id": "org", "name": "Operator", "package": "roads", "stereotype": "featureType" }
        ],
        "associations": [{
            "id": "as1",
            "end1": { "id": "op", "name": "operator", "owner": "road", "type": { "id": "org", "name": "Operator" },
                      "multiplicity": "0..*" },
            "end2": { "id": "rd", "name": "road", "owner": "org", "type": { "id": "road", "name": "Road" },
                      "multiplicity": "0..*", "navigable": false },
            "associationClass": "emp"
        }]
    })
}

fn load_fixture() -> SchemaGraph {
    let doc: ModelDocument = serde_json::from_value(fixture()).unwrap();
    let mut sink = Diagnostics::new();
    let graph = load(&doc, &mut sink).unwrap();
    assert!(sink.is_empty());
    graph
}

// ──────────────────────────────────────────────
// Loading
// ──────────────────────────────────────────────

#[test]
fn test_fixture_loads_consistently() {
    let g = load_fixture();
    assert!(g.check().is_empty(), "{:?}", g.check());

    let road = g.class(&Id::from("road")).unwrap();
    assert_eq!(road.category, Category::Feature);
    assert_eq!(road.code_or_name(), "RD");
    assert_eq!(road.descriptors.get(Descriptor::Definition, Some("de")), Some("Eine Straße"));
    assert_eq!(road.constraints.len(), 1);
    assert!(road.constraints[0].payload.is_some());

    assert_eq!(g.class(&Id::from("emp")).unwrap().category, Category::Object);
    assert_eq!(
        g.class(&Id::from("emp")).unwrap().association_class_for,
        Some(Id::from("as1"))
    );
    let name = g.property(&Id::from("n1")).unwrap();
    assert_eq!(name.multiplicity, Multiplicity::bounded(1, 2));
    assert!(g.property(&Id::from("ad")).unwrap().type_ref.is(&Id::from("addr")));
}

// ──────────────────────────────────────────────
// Round trip
// ──────────────────────────────────────────────

#[test]
fn test_written_document_reloads_identically() {
    let first = to_document(&load_fixture());

    let mut sink = Diagnostics::new();
    let reloaded = load(&first, &mut sink).unwrap();
    assert!(sink.is_empty());
    let second = to_document(&reloaded);
    assert_eq!(first, second);

    // attributes keep their ordering keys, ends carry their owner
    let road = first.classes.iter().find(|c| c.id == "road").unwrap();
    let keys: Vec<Option<&str>> = road.properties.iter().map(|p| p.sequence.as_deref()).collect();
    assert_eq!(keys, vec![Some("1"), Some("2")]);
    assert_eq!(first.associations[0].end1.owner.as_deref(), Some("road"));
    assert_eq!(first.associations[0].association_class.as_deref(), Some("emp"));
}

// ──────────────────────────────────────────────
// Schema validation
// ──────────────────────────────────────────────

fn validator() -> jsonschema::Validator {
    let schema_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("schema/model-schema.json");
    let schema_src = std::fs::read_to_string(&schema_path)
        .unwrap_or_else(|e| panic!("Failed to read schema at {}: {}", schema_path.display(), e));
    let schema_value: serde_json::Value = serde_json::from_str(&schema_src).unwrap();
    jsonschema::validator_for(&schema_value).unwrap_or_else(|e| panic!("Failed to compile schema: {}", e))
}

#[test]
fn test_input_and_output_match_schema() {
    let validator = validator();
    if let Err(error) = validator.validate(&fixture()) {
        panic!("fixture: {}", error);
    }
    let written = to_json_value(&load_fixture()).unwrap();
    if let Err(error) = validator.validate(&written) {
        panic!("written document: {}", error);
    }
}

#[test]
fn test_schema_rejects_malformed_documents() {
    let validator = validator();
    let bad_multiplicity = json!({
        "classes": [{ "id": "c", "name": "C", "package": "p",
                      "properties": [{ "id": "a", "name": "a", "type": { "name": "X" },
                                       "multiplicity": "many" }] }]
    });
    assert!(validator.validate(&bad_multiplicity).is_err());

    let end_without_owner = json!({
        "associations": [{ "id": "as", "end1": { "id": "e1", "name": "a", "type": { "name": "A" } },
                                        "end2": { "id": "e2", "name": "b", "owner": "x", "type": { "name": "B" } } }]
    });
    assert!(validator.validate(&end_without_owner).is_err());
}
