//! Loading an interchange document into a validated schema graph.
//!
//! The main entry point is [`load`]. Structural defects (duplicate ids,
//! dangling owners or supertypes, association ends that do not point at
//! each other) are fatal and come back as [`ModelError`]. A type
//! reference whose id does not resolve is not: it is kept as an
//! unresolved reference and reported with warning 110.

use crate::types::*;
use schemaflat_model::{
    codes, Association, Category, Class, Constraint, ConstraintContext, Diagnostic, DiagnosticSink,
    Id, Multiplicity, Package, Property, SchemaGraph, SequenceNumber, TypeRef,
};
use std::collections::BTreeSet;
use thiserror::Error;

/// Fatal defects in an interchange document.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate id '{0}'")]
    DuplicateId(String),

    #[error("{kind} '{id}' refers to missing {target_kind} '{target}'")]
    Dangling {
        kind: &'static str,
        id: String,
        target_kind: &'static str,
        target: String,
    },

    #[error("package '{0}' is part of an ownership cycle")]
    PackageCycle(String),

    #[error("association '{association}': end '{end}' has no owner")]
    MissingOwner { association: String, end: String },

    #[error("association '{association}': end '{end}' is not typed by the opposite end's owner")]
    AsymmetricAssociation { association: String, end: String },

    #[error("property '{id}': invalid multiplicity '{value}'")]
    Multiplicity { id: String, value: String },

    #[error("property '{id}': invalid ordering key '{value}'")]
    Sequence { id: String, value: String },
}

/// Parse and load a JSON document.
pub fn load_str(text: &str, sink: &mut dyn DiagnosticSink) -> Result<SchemaGraph, ModelError> {
    let doc: ModelDocument = serde_json::from_str(text)?;
    load(&doc, sink)
}

/// Build a schema graph from a parsed document.
pub fn load(doc: &ModelDocument, sink: &mut dyn DiagnosticSink) -> Result<SchemaGraph, ModelError> {
    check_unique_ids(doc)?;

    let mut graph = SchemaGraph::new();
    load_packages(&mut graph, &doc.packages)?;

    for c in &doc.classes {
        let package = Id::from(c.package.as_str());
        if graph.package(&package).is_none() {
            return Err(dangling("class", &c.id, "package", &c.package));
        }
        let id = Id::from(c.id.as_str());
        let mut class = Class::new(
            id.clone(),
            &c.name,
            package,
            Category::from_stereotype(c.stereotype.as_deref()),
        );
        class.is_abstract = c.is_abstract;
        class.is_leaf = c.is_leaf;
        class.descriptors = c.descriptors.clone();
        class.tags = c.tags.clone();
        class.constraints = constraints(&c.constraints, ConstraintContext::Class(id));
        graph.add_class(class);
    }

    for c in &doc.classes {
        let sub = Id::from(c.id.as_str());
        for sup in &c.supertypes {
            let sup_id = Id::from(sup.as_str());
            if graph.class(&sup_id).is_none() {
                return Err(dangling("class", &c.id, "supertype", sup));
            }
            graph.add_generalization(&sub, &sup_id);
        }
    }

    for c in &doc.classes {
        let owner = Id::from(c.id.as_str());
        for p in &c.properties {
            let property = property(&graph, sink, p, &owner)?;
            graph.add_attribute(property);
        }
    }

    for a in &doc.associations {
        load_association(&mut graph, sink, a)?;
    }

    tracing::debug!(
        packages = doc.packages.len(),
        classes = graph.class_count(),
        properties = graph.property_count(),
        associations = doc.associations.len(),
        "model loaded"
    );
    Ok(graph)
}

fn dangling(kind: &'static str, id: &str, target_kind: &'static str, target: &str) -> ModelError {
    ModelError::Dangling {
        kind,
        id: id.to_owned(),
        target_kind,
        target: target.to_owned(),
    }
}

/// Ids are unique across packages, classes, properties and associations.
fn check_unique_ids(doc: &ModelDocument) -> Result<(), ModelError> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let ids = doc
        .packages
        .iter()
        .map(|p| p.id.as_str())
        .chain(doc.classes.iter().flat_map(|c| {
            std::iter::once(c.id.as_str()).chain(c.properties.iter().map(|p| p.id.as_str()))
        }))
        .chain(
            doc.associations
                .iter()
                .flat_map(|a| [a.id.as_str(), a.end1.id.as_str(), a.end2.id.as_str()]),
        );
    for id in ids {
        if !seen.insert(id) {
            return Err(ModelError::DuplicateId(id.to_owned()));
        }
    }
    Ok(())
}

/// Packages are registered owner first, whatever the document order.
fn load_packages(graph: &mut SchemaGraph, packages: &[PackageDoc]) -> Result<(), ModelError> {
    let known: BTreeSet<&str> = packages.iter().map(|p| p.id.as_str()).collect();
    for p in packages {
        if let Some(owner) = &p.owner {
            if !known.contains(owner.as_str()) {
                return Err(dangling("package", &p.id, "owner package", owner));
            }
        }
    }

    let mut pending: Vec<&PackageDoc> = packages.iter().collect();
    while !pending.is_empty() {
        let (ready, rest): (Vec<&PackageDoc>, Vec<&PackageDoc>) = pending.into_iter().partition(|p| {
            p.owner
                .as_ref()
                .map_or(true, |o| graph.package(&Id::from(o.as_str())).is_some())
        });
        if ready.is_empty() {
            let stuck = rest.first().map(|p| p.id.clone()).unwrap_or_default();
            return Err(ModelError::PackageCycle(stuck));
        }
        for p in ready {
            let mut package = Package::new(
                Id::from(p.id.as_str()),
                &p.name,
                p.owner.as_deref().map(Id::from),
            );
            package.is_schema = p.is_schema;
            package.target_namespace = p.target_namespace.clone();
            package.descriptors = p.descriptors.clone();
            package.tags = p.tags.clone();
            graph.add_package(package);
        }
        pending = rest;
    }
    Ok(())
}

fn constraints(docs: &[ConstraintDoc], context: ConstraintContext) -> Vec<Constraint> {
    docs.iter()
        .map(|c| {
            let mut constraint = Constraint::new(c.kind, context.clone(), &c.name, &c.text);
            constraint.status = c.status.clone();
            constraint
        })
        .collect()
}

/// Resolve a type reference. An id that does not resolve is reported and
/// kept by name; a reference without id is looked up by name and may
/// stay unresolved silently (external and primitive types).
fn type_ref(graph: &SchemaGraph, sink: &mut dyn DiagnosticSink, element: &str, t: &TypeDoc) -> TypeRef {
    match &t.id {
        Some(id) => {
            let id = Id::from(id.as_str());
            match graph.class(&id) {
                Some(c) => {
                    let name = if t.name.is_empty() { c.name.clone() } else { t.name.clone() };
                    TypeRef::new(id, name)
                }
                None => {
                    sink.emit(Diagnostic::warning(
                        codes::TYPE_UNRESOLVED,
                        vec![element.to_owned(), t.name.clone()],
                    ));
                    TypeRef::unresolved(&t.name)
                }
            }
        }
        None => match graph.class_by_name(&t.name) {
            Some(c) => TypeRef::new(c.id.clone(), &t.name),
            None => TypeRef::unresolved(&t.name),
        },
    }
}

fn property(
    graph: &SchemaGraph,
    sink: &mut dyn DiagnosticSink,
    doc: &PropertyDoc,
    owner: &Id,
) -> Result<Property, ModelError> {
    let multiplicity: Multiplicity = doc.multiplicity.parse().map_err(|_| ModelError::Multiplicity {
        id: doc.id.clone(),
        value: doc.multiplicity.clone(),
    })?;
    let sequence: SequenceNumber = match &doc.sequence {
        Some(raw) => raw.parse().map_err(|_| ModelError::Sequence {
            id: doc.id.clone(),
            value: raw.clone(),
        })?,
        None => graph
            .class(owner)
            .map(Class::next_sequence)
            .unwrap_or_default(),
    };
    let id = Id::from(doc.id.as_str());
    let type_ref = type_ref(graph, sink, &doc.id, &doc.type_ref);
    let mut p = Property::attribute(id.clone(), &doc.name, owner.clone(), type_ref, sequence);
    p.multiplicity = multiplicity;
    p.navigable = doc.navigable;
    p.is_ordered = doc.is_ordered;
    p.is_unique = doc.is_unique;
    p.is_derived = doc.is_derived;
    p.is_read_only = doc.is_read_only;
    p.initial_value = doc.initial_value.clone();
    p.descriptors = doc.descriptors.clone();
    p.tags = doc.tags.clone();
    p.constraints = constraints(&doc.constraints, ConstraintContext::Property(id));
    Ok(p)
}

fn load_association(
    graph: &mut SchemaGraph,
    sink: &mut dyn DiagnosticSink,
    doc: &AssociationDoc,
) -> Result<(), ModelError> {
    let owner_of = |end: &PropertyDoc| -> Result<Id, ModelError> {
        let owner = end.owner.as_deref().ok_or_else(|| ModelError::MissingOwner {
            association: doc.id.clone(),
            end: end.id.clone(),
        })?;
        let id = Id::from(owner);
        if graph.class(&id).is_none() {
            return Err(dangling("association end", &end.id, "owner", owner));
        }
        Ok(id)
    };
    let o1 = owner_of(&doc.end1)?;
    let o2 = owner_of(&doc.end2)?;

    let end1 = property(graph, sink, &doc.end1, &o1)?;
    let end2 = property(graph, sink, &doc.end2, &o2)?;
    for (end, other_owner) in [(&end1, &o2), (&end2, &o1)] {
        if end.type_ref.id.as_ref().is_some_and(|t| t != other_owner) {
            return Err(ModelError::AsymmetricAssociation {
                association: doc.id.clone(),
                end: end.id.to_string(),
            });
        }
    }

    let mut assoc = Association::new(Id::from(doc.id.as_str()), end1.id.clone(), end2.id.clone());
    assoc.name = doc.name.clone();
    assoc.descriptors = doc.descriptors.clone();
    assoc.tags = doc.tags.clone();
    if let Some(ac) = &doc.association_class {
        let ac_id = Id::from(ac.as_str());
        if graph.class(&ac_id).is_none() {
            return Err(dangling("association", &doc.id, "association class", ac));
        }
        assoc.association_class = Some(ac_id);
    }
    graph.add_association(assoc, end1, end2);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaflat_model::Diagnostics;
    use serde_json::json;

    fn load_value(value: serde_json::Value) -> (Result<SchemaGraph, ModelError>, Diagnostics) {
        let doc: ModelDocument = serde_json::from_value(value).unwrap();
        let mut sink = Diagnostics::new();
        let result = load(&doc, &mut sink);
        (result, sink)
    }

    fn packages() -> serde_json::Value {
        json!([
            { "id": "sub", "name": "Roads", "owner": "app" },
            { "id": "app", "name": "App", "isSchema": true, "targetNamespace": "urn:app" }
        ])
    }

    #[test]
    fn test_load_wires_relationships() {
        let (graph, sink) = load_value(json!({
            "packages": packages(),
            "classes": [
                { "id": "c0", "name": "Named", "package": "app", "stereotype": "FeatureType",
                  "isAbstract": true,
                  "properties": [{ "id": "a0", "name": "name", "type": { "name": "CharacterString" } }] },
                { "id": "c1", "name": "Road", "package": "sub", "stereotype": "featureType",
                  "supertypes": ["c0"],
                  "properties": [
                    { "id": "a2", "name": "width", "type": { "name": "Real" },
                      "multiplicity": "0..1", "sequence": "2" },
                    { "id": "a1", "name": "lanes", "type": { "name": "Integer" },
                      "multiplicity": "1..*", "sequence": "1" }
                  ] },
                { "id": "c2", "name": "Sign", "package": "sub", "stereotype": "featureType" }
            ],
            "associations": [{
                "id": "as1",
                "end1": { "id": "r1", "name": "sign", "owner": "c1", "type": { "id": "c2", "name": "Sign" },
                          "multiplicity": "0..*" },
                "end2": { "id": "r2", "name": "road", "owner": "c2", "type": { "id": "c1", "name": "Road" },
                          "navigable": false }
            }]
        }));
        let g = graph.unwrap();
        assert!(sink.is_empty());
        assert!(g.check().is_empty(), "{:?}", g.check());

        let road = Id::from("c1");
        let class = g.class(&road).unwrap();
        assert_eq!(class.category, Category::Feature);
        assert!(class.supertypes.contains(&Id::from("c0")));
        assert!(g.class(&Id::from("c0")).unwrap().subtypes.contains(&road));
        assert!(g.in_schema(&road));

        let names: Vec<&str> = g.properties_of(&road).iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["lanes", "width", "sign"]);
        let r1 = g.property(&Id::from("r1")).unwrap();
        assert_eq!(r1.reverse, Some(Id::from("r2")));
        assert!(!g.property(&Id::from("r2")).unwrap().navigable);
    }

    #[test]
    fn test_unresolved_type_id_is_a_warning() {
        let (graph, sink) = load_value(json!({
            "packages": packages(),
            "classes": [{ "id": "c1", "name": "Road", "package": "app",
                          "properties": [{ "id": "a1", "name": "kind",
                                           "type": { "id": "gone", "name": "RoadKind" } }] }]
        }));
        let g = graph.unwrap();
        let p = g.property(&Id::from("a1")).unwrap();
        assert!(!p.type_ref.is_resolved());
        assert_eq!(p.type_ref.name, "RoadKind");
        let w: Vec<_> = sink.with_code(codes::TYPE_UNRESOLVED).collect();
        assert_eq!(w.len(), 1);
        assert_eq!(w[0].params, vec!["a1".to_owned(), "RoadKind".to_owned()]);
    }

    #[test]
    fn test_structural_defects_are_fatal() {
        let (dup, _) = load_value(json!({
            "packages": [{ "id": "x", "name": "App" }],
            "classes": [{ "id": "x", "name": "Road", "package": "x" }]
        }));
        assert!(matches!(dup, Err(ModelError::DuplicateId(id)) if id == "x"));

        let (missing, _) = load_value(json!({
            "packages": [{ "id": "app", "name": "App" }],
            "classes": [{ "id": "c1", "name": "Road", "package": "app", "supertypes": ["nope"] }]
        }));
        assert!(matches!(missing, Err(ModelError::Dangling { target_kind: "supertype", .. })));

        let (cycle, _) = load_value(json!({
            "packages": [{ "id": "a", "name": "A", "owner": "b" }, { "id": "b", "name": "B", "owner": "a" }]
        }));
        assert!(matches!(cycle, Err(ModelError::PackageCycle(_))));

        let (bad_key, _) = load_value(json!({
            "packages": [{ "id": "app", "name": "App" }],
            "classes": [{ "id": "c1", "name": "Road", "package": "app",
                          "properties": [{ "id": "a1", "name": "w", "type": { "name": "Real" },
                                           "sequence": "1..2" }] }]
        }));
        assert!(matches!(bad_key, Err(ModelError::Sequence { .. })));
    }

    #[test]
    fn test_asymmetric_association_rejected() {
        let (result, _) = load_value(json!({
            "packages": [{ "id": "app", "name": "App" }],
            "classes": [
                { "id": "c1", "name": "A", "package": "app" },
                { "id": "c2", "name": "B", "package": "app" },
                { "id": "c3", "name": "C", "package": "app" }
            ],
            "associations": [{
                "id": "as1",
                "end1": { "id": "r1", "name": "b", "owner": "c1", "type": { "id": "c3", "name": "C" } },
                "end2": { "id": "r2", "name": "a", "owner": "c2", "type": { "id": "c1", "name": "A" } }
            }]
        }));
        assert!(matches!(result, Err(ModelError::AsymmetricAssociation { .. })));
    }

    #[test]
    fn test_invalid_json() {
        let mut sink = Diagnostics::new();
        assert!(matches!(load_str("{ not json", &mut sink), Err(ModelError::Json(_))));
    }
}
