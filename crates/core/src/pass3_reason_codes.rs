//! Group 3: reason-code normalization.
//!
//! A reason-code choice is an in-scope union with exactly two properties,
//! `value` (or `values`) and `reason`, where `reason` is typed by an
//! enumeration or codelist. Every attribute typed by such a choice is
//! retyped to a single value type:
//!
//! - an enumeration value type becomes a new enumeration named after the
//!   choice, extended with the reason literals;
//! - a `Boolean` value type becomes the shared four-valued enumeration;
//! - anything else is used as is.
//!
//! The choice is removed afterwards, and so is its reason type once
//! nothing references it.

use crate::config::params;
use crate::merge::type_ref_to;
use crate::session::{PassResult, Session};
use schemaflat_model::{
    codes, Category, Class, Id, Multiplicity, Property, SchemaGraph, SequenceNumber, TypeRef,
};

/// Literals appended to an extended enumeration, with their codes.
const REASON_LITERALS: [(&str, &str); 3] = [
    ("noInformation", "-999999"),
    ("notApplicable", "998"),
    ("other", "999"),
];

const BOOLEAN_LITERALS: [&str; 4] = ["false", "true", "noInformation", "notApplicable"];

struct ReasonChoice {
    choice: Id,
    name: String,
    value: Property,
    reason_type: Id,
}

fn find_choices(graph: &SchemaGraph) -> Vec<ReasonChoice> {
    let mut found = Vec::new();
    for c in graph.classes() {
        if c.category != Category::Union || !graph.in_schema(&c.id) {
            continue;
        }
        let props = graph.properties_of(&c.id);
        if props.len() != 2 {
            continue;
        }
        let value = props.iter().find(|p| p.name == "value" || p.name == "values");
        let reason = props.iter().find(|p| p.name == "reason");
        let (Some(value), Some(reason)) = (value, reason) else {
            continue;
        };
        let Some(reason_type) = graph.value_type(reason) else {
            continue;
        };
        if !reason_type.category.is_enumerated() {
            continue;
        }
        found.push(ReasonChoice {
            choice: c.id.clone(),
            name: c.name.clone(),
            value: (*value).clone(),
            reason_type: reason_type.id.clone(),
        });
    }
    found
}

pub fn flatten_reason_codes(graph: &mut SchemaGraph, session: &mut Session) -> PassResult {
    let boolean_enum_name = session.text(params::REASON_CODE_BOOLEAN_ENUMERATION, "BooleanWithReason");
    let choices = find_choices(graph);
    tracing::debug!(count = choices.len(), "reason-code choices found");

    for rc in choices {
        let referencing = graph.referencing_properties(&rc.choice);
        let roles: Vec<String> = referencing
            .iter()
            .filter_map(|id| graph.property(id))
            .filter(|p| p.is_role())
            .map(|p| p.name.clone())
            .collect();
        if !roles.is_empty() {
            for role in roles {
                session.warn(codes::REASON_CODE_ROLE_REFERENCE, vec![rc.name.clone(), role]);
            }
            continue;
        }

        let replacement = replacement_type(graph, session, &rc, &boolean_enum_name);
        session.info(codes::REASON_CODE_FOLDED, vec![rc.name.clone(), replacement.name.clone()]);

        for id in referencing {
            if let Some(p) = graph.property_mut(&id) {
                p.type_ref = replacement.clone();
                p.multiplicity = p.multiplicity.compose(&rc.value.multiplicity);
            }
        }

        graph.remove_class(&rc.choice);
        if graph.in_schema(&rc.reason_type) && !graph.is_referenced(&rc.reason_type) {
            graph.remove_class(&rc.reason_type);
        }
    }
    Ok(())
}

fn replacement_type(
    graph: &mut SchemaGraph,
    session: &mut Session,
    rc: &ReasonChoice,
    boolean_enum_name: &str,
) -> TypeRef {
    let value_type = graph.value_type(&rc.value).map(|c| (c.id.clone(), c.category));
    match value_type {
        Some((id, Category::Enumeration)) => extended_enumeration(graph, rc, &id),
        _ if rc.value.type_ref.name == "Boolean" => boolean_enumeration(graph, session, rc, boolean_enum_name),
        Some((id, _)) => type_ref_to(graph, &id),
        None => {
            session.warn(
                codes::TYPE_UNRESOLVED,
                vec![format!("{}.{}", rc.name, rc.value.name), rc.value.type_ref.name.clone()],
            );
            TypeRef::unresolved(rc.value.type_ref.name.clone())
        }
    }
}

fn package_of(graph: &SchemaGraph, class: &Id) -> Option<Id> {
    graph.class(class).map(|c| c.package.clone())
}

fn literal(graph: &mut SchemaGraph, owner: &Id, name: &str, code: Option<&str>) -> Property {
    let id = graph.fresh_id();
    let sequence = graph
        .class(owner)
        .map(Class::next_sequence)
        .unwrap_or_default();
    let mut p = Property::attribute(id, name, owner.clone(), TypeRef::unresolved(""), sequence);
    p.multiplicity = Multiplicity::ONE;
    p.initial_value = code.map(str::to_owned);
    p
}

/// Enumeration named after the choice: the value type's literals, then the
/// reason literals.
fn extended_enumeration(graph: &mut SchemaGraph, rc: &ReasonChoice, value_type: &Id) -> TypeRef {
    let Some(package) = package_of(graph, &rc.choice) else {
        return type_ref_to(graph, value_type);
    };
    let mut class = graph.new_class(rc.name.clone(), &package, Category::Enumeration);
    if let Some(source) = graph.class(value_type) {
        class.descriptors = source.descriptors.clone();
    }
    let id = graph.add_class(class);

    for lit in graph.property_ids_of(value_type) {
        if let Some(copy) = graph.copy_property(&lit, &id) {
            graph.add_attribute(copy);
        }
    }
    for (name, code) in REASON_LITERALS {
        let p = literal(graph, &id, name, Some(code));
        graph.add_attribute(p);
    }
    tracing::debug!(enumeration = %rc.name, "extended enumeration created");
    type_ref_to(graph, &id)
}

/// The shared four-valued enumeration, created on first use.
fn boolean_enumeration(
    graph: &mut SchemaGraph,
    session: &mut Session,
    rc: &ReasonChoice,
    name: &str,
) -> TypeRef {
    if let Some(id) = session.boolean_reason_enum.as_ref().filter(|id| graph.class(id).is_some()) {
        return type_ref_to(graph, id);
    }
    if let Some(existing) = graph
        .classes_named(name)
        .into_iter()
        .find(|c| c.category == Category::Enumeration)
        .map(|c| c.id.clone())
    {
        session.boolean_reason_enum = Some(existing.clone());
        return type_ref_to(graph, &existing);
    }
    let Some(package) = package_of(graph, &rc.choice) else {
        return TypeRef::unresolved(name);
    };
    let class = graph.new_class(name, &package, Category::Enumeration);
    let id = graph.add_class(class);
    for (i, lit) in BOOLEAN_LITERALS.iter().enumerate() {
        let mut p = literal(graph, &id, lit, None);
        p.sequence = SequenceNumber::single(i as i64 + 1);
        graph.add_attribute(p);
    }
    session.boolean_reason_enum = Some(id.clone());
    type_ref_to(graph, &id)
}
