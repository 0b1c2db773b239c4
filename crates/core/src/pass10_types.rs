//! Group 10: type flattening.
//!
//! Every in-scope property typed by an eligible type (choices, datatypes,
//! selected object types) is replaced by copies of that type's properties,
//! repeated until no in-scope property is typed by an eligible type. Each
//! synthesized property records the chain of types it was merged through;
//! a copy that would re-enter its own chain is skipped, which is what
//! makes the loop terminate on cyclic models.

use crate::config::{params, RemovalPolicy, RuleId, TypeMapEntry};
use crate::merge::{add_new_association, fold_property, new_role, Fold};
use crate::session::{PassResult, Session};
use schemaflat_model::{codes, Id, Property, SchemaGraph};
use std::collections::BTreeSet;

struct Separators {
    union: String,
    plain: String,
    text: String,
    precedence: crate::config::Precedence,
}

/// Retype properties named by the type map. Returns the mapped source
/// names and the in-scope source classes scheduled for removal.
fn apply_type_map(
    graph: &mut SchemaGraph,
    session: &mut Session,
    remove_all: bool,
) -> (BTreeSet<String>, Vec<Id>) {
    let entries: Vec<TypeMapEntry> = session
        .config()
        .mappings(RuleId::FlattenTypes)
        .cloned()
        .collect();
    let mut names = BTreeSet::new();
    let mut doomed = Vec::new();
    for entry in entries {
        let target = session.type_named(graph, &entry.target);
        let retyped: Vec<Id> = graph
            .properties()
            .filter(|p| p.type_ref.name == entry.source && graph.in_schema(&p.owner))
            .map(|p| p.id.clone())
            .collect();
        tracing::debug!(source = %entry.source, target = %entry.target, count = retyped.len(), "type mapped");
        for id in retyped {
            graph.set_property_type(&id, target.clone());
        }
        if entry.remove || remove_all {
            doomed.extend(
                graph
                    .classes_named(&entry.source)
                    .into_iter()
                    .filter(|c| graph.in_schema(&c.id))
                    .map(|c| c.id.clone()),
            );
        }
        names.insert(entry.source);
    }
    (names, doomed)
}

fn drop_reflexive(graph: &mut SchemaGraph, session: &mut Session, eligible: &BTreeSet<Id>) {
    for class in eligible {
        let Some(class_name) = graph.class(class).map(|c| c.name.clone()) else {
            continue;
        };
        let reflexive: Vec<(Id, String)> = graph
            .properties_of(class)
            .into_iter()
            .filter(|p| p.type_ref.is(class))
            .map(|p| (p.id.clone(), p.name.clone()))
            .collect();
        for (id, name) in reflexive {
            session.info(codes::REFLEXIVE_PROPERTY_DROPPED, vec![class_name.clone(), name]);
            graph.remove_property(&id);
        }
    }
}

/// Attributes and navigable ends; a non-navigable end holds no value.
fn carries_value(p: &Property) -> bool {
    p.is_attribute || p.navigable
}

fn is_used(graph: &SchemaGraph, class: &Id) -> bool {
    graph
        .properties()
        .any(|p| carries_value(p) && p.type_ref.is(class))
}

/// Replace one host property by the properties of its value type.
fn merge_host(graph: &mut SchemaGraph, session: &mut Session, host: &Id, seps: &Separators) {
    let Some(p) = graph.property(host).cloned() else {
        return;
    };
    let Some(t) = p.type_ref.id.clone() else {
        return;
    };
    let Some(is_union) = graph.class(&t).map(|c| c.is_union()) else {
        return;
    };
    let owner_name = graph.class(&p.owner).map(|c| c.name.clone()).unwrap_or_default();
    let sources: Vec<Property> = graph.properties_of(&t).into_iter().cloned().collect();

    let mut base_chain = session.merge_chain(&p.id).to_vec();
    base_chain.push(t.clone());
    let fold = Fold {
        separator: if is_union { seps.union.as_str() } else { seps.plain.as_str() },
        text_separator: &seps.text,
        precedence: seps.precedence,
        optional: is_union && sources.len() > 1,
    };

    let mut attributes = Vec::new();
    let mut roles = Vec::new();
    for (i, q) in sources.iter().enumerate() {
        let mut chain = base_chain.clone();
        chain.extend(session.merge_chain(&q.id).iter().cloned());
        if let Some(qt) = &q.type_ref.id {
            if chain.contains(qt) {
                session.warn(
                    codes::MERGE_CYCLE_SKIPPED,
                    vec![owner_name.clone(), p.name.clone(), q.type_ref.name.clone()],
                );
                continue;
            }
        }
        if q.is_role() && !q.navigable {
            continue;
        }
        let key = p.sequence.derive(i as i64 + 1);
        let Some(copy) = fold_property(graph, &p, q, key, &fold) else {
            continue;
        };
        session.record_merge_chain(copy.id.clone(), chain);
        if q.is_role() {
            let Some(target) = q.type_ref.id.clone() else {
                continue;
            };
            let reverse = q.reverse.as_ref().and_then(|r| graph.property(r)).cloned();
            let (name, multiplicity) = reverse
                .map(|r| (r.name, r.multiplicity))
                .unwrap_or_else(|| (owner_name.clone(), Default::default()));
            let sequence = graph
                .class(&target)
                .map(|c| c.next_sequence())
                .unwrap_or_default();
            let mut opposite = new_role(graph, name, &target, &p.owner, multiplicity, sequence);
            opposite.navigable = false;
            roles.push((copy, opposite));
        } else {
            attributes.push(copy);
        }
    }

    graph.remove_property(&p.id);
    for a in attributes {
        graph.add_attribute(a);
    }
    for (end, opposite) in roles {
        add_new_association(graph, end, opposite);
    }
}

pub fn flatten_types(graph: &mut SchemaGraph, session: &mut Session) -> PassResult {
    let seps = Separators {
        union: session.text(params::SEPARATOR_FOR_PROPERTY_FROM_UNION, "-"),
        plain: session.text(params::SEPARATOR_FOR_PROPERTY_FROM_NON_UNION, "_"),
        text: session.descriptor_separator(),
        precedence: session.precedence()?,
    };
    let selection = session.type_selection()?;
    let ignore_reflexive = session.flag(params::IGNORE_REFLEXIVE_RELATIONSHIP, false)?;
    let policy = session.parsed_or(params::TYPE_REMOVAL_POLICY, RemovalPolicy::Unreferenced)?;
    let remove_mapped = session.flag(params::REMOVE_MAPPED_TYPES, false)?;

    let (mapped, doomed) = apply_type_map(graph, session, remove_mapped);
    let eligible: BTreeSet<Id> = selection
        .select(graph)
        .into_iter()
        .filter(|id| graph.class(id).is_some_and(|c| !mapped.contains(&c.name)))
        .collect();
    tracing::debug!(eligible = eligible.len(), "types selected for flattening");

    if ignore_reflexive {
        drop_reflexive(graph, session, &eligible);
    }

    let mut round = 0usize;
    loop {
        let hosts: Vec<Id> = graph
            .properties()
            .filter(|p| {
                carries_value(p)
                    && graph.in_schema(&p.owner)
                    && p.type_ref.id.as_ref().is_some_and(|t| eligible.contains(t))
            })
            .map(|p| p.id.clone())
            .collect();
        if hosts.is_empty() {
            break;
        }
        round += 1;
        tracing::trace!(round, hosts = hosts.len(), "merge round");
        for host in hosts {
            merge_host(graph, session, &host, &seps);
        }
    }

    let removable: Vec<Id> = eligible
        .iter()
        .filter(|id| match policy {
            RemovalPolicy::Unreferenced => !is_used(graph, id),
            RemovalPolicy::All => true,
            RemovalPolicy::None => false,
        })
        .cloned()
        .collect();
    for id in removable.iter().chain(doomed.iter()) {
        graph.remove_class(id);
    }
    tracing::debug!(rounds = round, removed = removable.len() + doomed.len(), "type flattening finished");
    Ok(())
}
