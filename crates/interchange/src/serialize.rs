//! Writing a schema graph back out as an interchange document.
//!
//! Output is deterministic: packages, classes and associations in id
//! order, attributes in ordering-key order. Every property carries its
//! ordering key so a reload reproduces the same interleaving.

use crate::types::*;
use schemaflat_model::{Constraint, Property, SchemaGraph};

fn constraint_docs(constraints: &[Constraint]) -> Vec<ConstraintDoc> {
    constraints
        .iter()
        .map(|c| ConstraintDoc {
            kind: c.kind,
            name: c.name.clone(),
            status: c.status.clone(),
            text: c.text.clone(),
        })
        .collect()
}

fn property_doc(p: &Property, with_owner: bool) -> PropertyDoc {
    PropertyDoc {
        id: p.id.to_string(),
        name: p.name.clone(),
        owner: with_owner.then(|| p.owner.to_string()),
        type_ref: TypeDoc {
            id: p.type_ref.id.as_ref().map(ToString::to_string),
            name: p.type_ref.name.clone(),
        },
        multiplicity: p.multiplicity.to_string(),
        sequence: Some(p.sequence.to_string()),
        navigable: p.navigable,
        is_ordered: p.is_ordered,
        is_unique: p.is_unique,
        is_derived: p.is_derived,
        is_read_only: p.is_read_only,
        initial_value: p.initial_value.clone(),
        descriptors: p.descriptors.clone(),
        tags: p.tags.clone(),
        constraints: constraint_docs(&p.constraints),
    }
}

/// Convert a graph into its interchange document.
pub fn to_document(graph: &SchemaGraph) -> ModelDocument {
    let packages = graph
        .packages()
        .map(|p| PackageDoc {
            id: p.id.to_string(),
            name: p.name.clone(),
            owner: p.owner.as_ref().map(ToString::to_string),
            is_schema: p.is_schema,
            target_namespace: p.target_namespace.clone(),
            descriptors: p.descriptors.clone(),
            tags: p.tags.clone(),
        })
        .collect();

    let classes = graph
        .classes()
        .map(|c| ClassDoc {
            id: c.id.to_string(),
            name: c.name.clone(),
            package: c.package.to_string(),
            stereotype: Some(c.category.stereotype().to_owned()),
            is_abstract: c.is_abstract,
            is_leaf: c.is_leaf,
            supertypes: c.supertypes.iter().map(ToString::to_string).collect(),
            descriptors: c.descriptors.clone(),
            tags: c.tags.clone(),
            constraints: constraint_docs(&c.constraints),
            properties: graph
                .properties_of(&c.id)
                .into_iter()
                .filter(|p| p.is_attribute)
                .map(|p| property_doc(p, false))
                .collect(),
        })
        .collect();

    let associations = graph
        .associations()
        .filter_map(|a| {
            let (e1, e2) = graph.association_ends(&a.id)?;
            Some(AssociationDoc {
                id: a.id.to_string(),
                name: a.name.clone(),
                end1: property_doc(e1, true),
                end2: property_doc(e2, true),
                association_class: a.association_class.as_ref().map(ToString::to_string),
                descriptors: a.descriptors.clone(),
                tags: a.tags.clone(),
            })
        })
        .collect();

    ModelDocument {
        packages,
        classes,
        associations,
    }
}

/// Pretty-printed JSON for a graph.
pub fn to_json_string(graph: &SchemaGraph) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&to_document(graph))
}

/// JSON value for a graph.
pub fn to_json_value(graph: &SchemaGraph) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(to_document(graph))
}
