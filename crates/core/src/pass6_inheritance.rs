//! Group 6: inheritance flattening.
//!
//! Superclasses are processed top-down so that a class has received
//! everything from its own supertypes before handing it on:
//!
//! 1. Attributes and class constraints are copied into every direct
//!    subtype (a subtype property of the same name wins).
//! 2. Associations touching a superclass are replicated over the
//!    replacement sets of both end owners.
//! 3. Attributes typed by a superclass are redirected to a synthesized
//!    choice over its replacement classes.
//! 4. Inheritance edges inside the processed scope are removed, and
//!    abstract superclasses nothing references any more are dropped.

use crate::config::params;
use crate::merge::{replicate_association, retype_attributes, type_ref_to, Replacement};
use crate::session::{PassResult, Session};
use schemaflat_model::{
    codes, Category, ConstraintContext, Id, Multiplicity, Property, SchemaGraph, SequenceNumber,
};
use std::collections::{BTreeMap, BTreeSet};

/// Classes taking part: the in-scope structured classes.
fn processed_scope(graph: &SchemaGraph) -> BTreeSet<Id> {
    graph
        .classes()
        .filter(|c| c.category.is_structured() && graph.in_schema(&c.id))
        .map(|c| c.id.clone())
        .collect()
}

fn sort_key(graph: &SchemaGraph, id: &Id) -> (String, Id) {
    let name = graph.class(id).map(|c| c.name.clone()).unwrap_or_default();
    (name, id.clone())
}

fn sorted_by_name(graph: &SchemaGraph, ids: impl IntoIterator<Item = Id>) -> Vec<Id> {
    let mut keyed: Vec<(String, Id)> = ids.into_iter().map(|id| sort_key(graph, &id)).collect();
    keyed.sort();
    keyed.into_iter().map(|(_, id)| id).collect()
}

/// Superclasses in top-down order: a class comes after all of its
/// superclasses; ties are broken by name, then id.
fn topological_order(graph: &SchemaGraph, superclasses: &BTreeSet<Id>) -> Vec<Id> {
    let mut pending: BTreeMap<Id, usize> = superclasses
        .iter()
        .map(|id| {
            let n = graph
                .class(id)
                .map(|c| c.supertypes.iter().filter(|s| superclasses.contains(*s)).count())
                .unwrap_or(0);
            (id.clone(), n)
        })
        .collect();
    let mut ready: BTreeSet<(String, Id)> = pending
        .iter()
        .filter(|(_, n)| **n == 0)
        .map(|(id, _)| sort_key(graph, id))
        .collect();

    let mut order = Vec::with_capacity(superclasses.len());
    while let Some(next) = ready.pop_first() {
        let (_, id) = next;
        pending.remove(&id);
        if let Some(c) = graph.class(&id) {
            for sub in &c.subtypes {
                if let Some(n) = pending.get_mut(sub) {
                    *n -= 1;
                    if *n == 0 {
                        ready.insert(sort_key(graph, sub));
                    }
                }
            }
        }
        order.push(id);
    }
    if !pending.is_empty() {
        tracing::warn!(count = pending.len(), "generalization cycle; remaining superclasses processed by name");
        order.extend(sorted_by_name(graph, pending.into_keys()));
    }
    order
}

/// 1-based position of `sup` among the supertypes of `sub`, sorted by
/// name then id.
fn supertype_rank(graph: &SchemaGraph, sub: &Id, sup: &Id) -> i64 {
    let supertypes = graph
        .class(sub)
        .map(|c| c.supertypes.iter().cloned().collect::<Vec<_>>())
        .unwrap_or_default();
    sorted_by_name(graph, supertypes)
        .iter()
        .position(|s| s == sup)
        .map(|p| p as i64 + 1)
        .unwrap_or(1)
}

/// Rank of the direct supertype of `class` through which `origin` is
/// reached.
fn path_rank(graph: &SchemaGraph, class: &Id, origin: &Id) -> i64 {
    let supertypes = graph
        .class(class)
        .map(|c| c.supertypes.iter().cloned().collect::<Vec<_>>())
        .unwrap_or_default();
    sorted_by_name(graph, supertypes)
        .iter()
        .position(|s| s == origin || graph.ancestors(s).contains(origin))
        .map(|p| p as i64 + 1)
        .unwrap_or(1)
}

/// `X` itself when concrete, plus every concrete descendant in scope,
/// sorted by name then id.
fn replacement_set(graph: &SchemaGraph, class: &Id, scope: &BTreeSet<Id>) -> Vec<Id> {
    let mut members: Vec<Id> = graph
        .descendants(class)
        .into_iter()
        .filter(|d| scope.contains(d))
        .collect();
    members.push(class.clone());
    let concrete = members
        .into_iter()
        .filter(|id| graph.class(id).is_some_and(|c| c.is_concrete()));
    sorted_by_name(graph, concrete)
}

fn copy_down(graph: &mut SchemaGraph, sup: &Id, sub: &Id) {
    let rank = supertype_rank(graph, sub, sup);
    let inherited: Vec<Property> = graph
        .properties_of(sup)
        .into_iter()
        .filter(|p| p.is_attribute)
        .cloned()
        .collect();
    for q in inherited {
        if graph.property_named(sub, &q.name).is_some() {
            tracing::trace!(property = %q.name, "overridden in subtype");
            continue;
        }
        if let Some(mut copy) = graph.copy_property(&q.id, sub) {
            copy.sequence = q.sequence.inherited(rank);
            graph.add_attribute(copy);
        }
    }

    let constraints = graph
        .class(sup)
        .map(|c| c.constraints.clone())
        .unwrap_or_default();
    if let Some(target) = graph.class_mut(sub) {
        for c in constraints {
            if target.constraints.iter().any(|own| own.name == c.name) {
                continue;
            }
            target
                .constraints
                .push(c.rebound(ConstraintContext::Class(sub.clone())));
        }
    }
}

fn replacements(
    graph: &SchemaGraph,
    owner: &Id,
    sets: &BTreeMap<Id, Vec<Id>>,
) -> Vec<Replacement> {
    match sets.get(owner) {
        Some(set) => set
            .iter()
            .enumerate()
            .map(|(i, class)| Replacement {
                class: class.clone(),
                label: graph
                    .class(class)
                    .map(|c| c.code_or_name().to_owned())
                    .unwrap_or_default(),
                rank: i as i64 + 1,
                inherit_rank: (class != owner).then(|| path_rank(graph, class, owner)),
            })
            .collect(),
        None => vec![Replacement {
            class: owner.clone(),
            label: graph
                .class(owner)
                .map(|c| c.code_or_name().to_owned())
                .unwrap_or_default(),
            rank: 1,
            inherit_rank: None,
        }],
    }
}

fn replicate_associations(
    graph: &mut SchemaGraph,
    superclasses: &BTreeSet<Id>,
    sets: &BTreeMap<Id, Vec<Id>>,
    separator: &str,
) {
    let worklist: Vec<Id> = graph
        .associations()
        .filter(|a| {
            a.ends().iter().any(|e| {
                graph
                    .property(e)
                    .is_some_and(|p| superclasses.contains(&p.owner))
            })
        })
        .map(|a| a.id.clone())
        .collect();

    for assoc in worklist {
        let Some((o1, o2)) = graph
            .association_ends(&assoc)
            .map(|(e1, e2)| (e1.owner.clone(), e2.owner.clone()))
        else {
            continue;
        };
        let r1 = replacements(graph, &o1, sets);
        let r2 = replacements(graph, &o2, sets);
        let created = replicate_association(graph, &assoc, &r1, &r2, separator);
        let keeps_original = r1.iter().any(|r| r.class == o1) && r2.iter().any(|r| r.class == o2);
        tracing::debug!(association = %assoc, copies = created.len(), keeps_original, "association replicated");
        if !keeps_original {
            graph.remove_association(&assoc);
        }
    }
}

/// Redirect attributes typed by `sup` to a choice over its replacement
/// classes, or to the single replacement.
fn redirect_references(
    graph: &mut SchemaGraph,
    session: &mut Session,
    sup: &Id,
    set: &[Id],
    suffix: &str,
    choices: &mut BTreeSet<Id>,
) {
    let Some((name, package)) = graph.class(sup).map(|c| (c.name.clone(), c.package.clone())) else {
        return;
    };
    match set {
        [] => session.warn(codes::NO_CONCRETE_SUBTYPE, vec![name]),
        [only] => {
            if only != sup {
                let target = type_ref_to(graph, only);
                retype_attributes(graph, sup, &target, |_, p| !choices.contains(&p.owner));
            }
        }
        options => {
            let class = graph.new_class(format!("{name}{suffix}"), &package, Category::Union);
            let choice = graph.add_class(class);
            choices.insert(choice.clone());
            for (i, option) in options.iter().enumerate() {
                let id = graph.fresh_id();
                let option_name = graph.class(option).map(|c| c.name.clone()).unwrap_or_default();
                let mut p = Property::attribute(
                    id,
                    option_name,
                    choice.clone(),
                    type_ref_to(graph, option),
                    SequenceNumber::single(i as i64 + 1),
                );
                p.multiplicity = Multiplicity::ONE;
                graph.add_attribute(p);
            }
            let target = type_ref_to(graph, &choice);
            let redirected = retype_attributes(graph, sup, &target, |_, p| !choices.contains(&p.owner));
            tracing::debug!(choice = %target.name, redirected = redirected.len(), "choice type created");
        }
    }
}

pub fn flatten_inheritance(graph: &mut SchemaGraph, session: &mut Session) -> PassResult {
    let suffix = session.text(params::CHOICE_TYPE_SUFFIX, "Choice");
    let separator = session.text(params::SEPARATOR_FOR_SUBTYPE_SUFFIX, "_");

    let scope = processed_scope(graph);
    let superclasses: BTreeSet<Id> = scope
        .iter()
        .filter(|id| {
            graph
                .class(id)
                .is_some_and(|c| c.subtypes.iter().any(|s| scope.contains(s)))
        })
        .cloned()
        .collect();
    if superclasses.is_empty() {
        return Ok(());
    }
    let order = topological_order(graph, &superclasses);
    let sets: BTreeMap<Id, Vec<Id>> = order
        .iter()
        .map(|x| (x.clone(), replacement_set(graph, x, &scope)))
        .collect();

    for sup in &order {
        let _span = tracing::debug_span!("superclass", class = %sup).entered();
        let subs: Vec<Id> = graph
            .class(sup)
            .map(|c| c.subtypes.iter().filter(|s| scope.contains(*s)).cloned().collect())
            .unwrap_or_default();
        for sub in sorted_by_name(graph, subs) {
            copy_down(graph, sup, &sub);
        }
    }

    replicate_associations(graph, &superclasses, &sets, &separator);

    // choice options keep pointing at the concrete classes
    let mut choices = BTreeSet::new();
    for sup in &order {
        let set = sets.get(sup).map(Vec::as_slice).unwrap_or(&[]);
        redirect_references(graph, session, sup, set, &suffix, &mut choices);
    }

    for sup in &order {
        let subs: Vec<Id> = graph
            .class(sup)
            .map(|c| c.subtypes.iter().filter(|s| scope.contains(*s)).cloned().collect())
            .unwrap_or_default();
        for sub in subs {
            graph.remove_generalization(&sub, sup);
        }
    }

    for sup in &order {
        let Some(c) = graph.class(sup) else {
            continue;
        };
        if c.is_concrete() {
            continue;
        }
        if graph.is_referenced(sup) {
            let name = c.name.clone();
            session.info(codes::SUPERCLASS_RETAINED, vec![name]);
        } else {
            graph.remove_class(sup);
        }
    }
    Ok(())
}
