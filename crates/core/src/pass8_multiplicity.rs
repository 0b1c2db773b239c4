//! Group 8: multiplicity flattening.
//!
//! A property with a bounded maximum `M > 1` (and within the configured
//! threshold) becomes `N = min(M, maxOccurs)` single-valued copies named
//! `name + sep + i` and keyed `derive(key, i)`. The first `min` copies are
//! mandatory, the rest optional. Unbounded properties are left alone.

use crate::config::params;
use crate::merge::association_label;
use crate::session::{PassResult, Session};
use schemaflat_model::{codes, Association, Id, Multiplicity, Property, SchemaGraph};

struct Limits {
    max_occurs: u32,
    threshold: Option<u32>,
    separator: String,
}

impl Limits {
    /// Number of copies a property with this multiplicity splits into, or
    /// `None` when it stays as is.
    fn copies(&self, m: &Multiplicity) -> Option<u32> {
        let max = m.max.bounded()?;
        if max <= 1 || self.threshold.is_some_and(|t| max > t) {
            return None;
        }
        Some(max.min(self.max_occurs.max(1)))
    }
}

fn slot(min: u32, i: u32) -> Multiplicity {
    if i <= min {
        Multiplicity::ONE
    } else {
        Multiplicity::OPTIONAL
    }
}

/// Unregistered copy of `source` for slot `i`.
fn indexed_copy(graph: &mut SchemaGraph, source: &Property, i: u32, separator: &str) -> Option<Property> {
    let mut p = graph.copy_property(&source.id, &source.owner)?;
    p.name = format!("{}{}{}", source.name, separator, i);
    p.sequence = source.sequence.derive(i64::from(i));
    Some(p)
}

fn split_attribute(graph: &mut SchemaGraph, id: &Id, limits: &Limits) {
    let Some(source) = graph.property(id).cloned() else {
        return;
    };
    let Some(n) = limits.copies(&source.multiplicity) else {
        return;
    };
    let mut copies = Vec::with_capacity(n as usize);
    for i in 1..=n {
        if let Some(mut p) = indexed_copy(graph, &source, i, &limits.separator) {
            p.multiplicity = slot(source.multiplicity.min, i);
            copies.push(p);
        }
    }
    graph.remove_property(id);
    for p in copies {
        graph.add_attribute(p);
    }
    tracing::trace!(property = %source.name, copies = n, "attribute split");
}

type AssociationCopy = (Association, Property, Property);

/// `n` copies of the association, both ends index-suffixed; `split` is
/// the end whose multiplicity is spread over the copies.
fn indexed_associations(
    graph: &mut SchemaGraph,
    assoc: &Id,
    split: &Property,
    other: &Property,
    n: u32,
    separator: &str,
    other_navigable: bool,
) -> Vec<AssociationCopy> {
    let mut out = Vec::new();
    for i in 1..=n {
        let (Some(a), Some(mut s), Some(mut o)) = (
            graph.copy_association(assoc),
            indexed_copy(graph, split, i, separator),
            indexed_copy(graph, other, i, separator),
        ) else {
            continue;
        };
        s.multiplicity = slot(split.multiplicity.min, i);
        o.navigable = other_navigable && other.navigable;
        out.push((a, s, o));
    }
    out
}

/// One unidirectional association per navigable end: `nav` stays
/// navigable (split when its owner is in the schema and its multiplicity
/// allows), the opposite end is not.
fn unidirectional(
    graph: &mut SchemaGraph,
    assoc: &Id,
    nav: &Property,
    other: &Property,
    limits: &Limits,
) -> Vec<AssociationCopy> {
    let copies = limits
        .copies(&nav.multiplicity)
        .filter(|_| graph.in_schema(&nav.owner));
    match copies {
        Some(n) => indexed_associations(graph, assoc, nav, other, n, &limits.separator, false),
        None => {
            let (Some(a), Some(s), Some(mut o)) = (
                graph.copy_association(assoc),
                graph.copy_property(&nav.id, &nav.owner),
                graph.copy_property(&other.id, &other.owner),
            ) else {
                return Vec::new();
            };
            o.navigable = false;
            vec![(a, s, o)]
        }
    }
}

fn split_association(graph: &mut SchemaGraph, session: &mut Session, assoc: &Id, limits: &Limits, keep: bool) {
    let Some((e1, e2)) = graph
        .association_ends(assoc)
        .map(|(a, b)| (a.clone(), b.clone()))
    else {
        return;
    };
    let splittable = |e: &Property| {
        e.navigable && graph.in_schema(&e.owner) && limits.copies(&e.multiplicity).is_some()
    };
    let (s1, s2) = (splittable(&e1), splittable(&e2));
    if !(s1 || s2) {
        return;
    }

    let bidirectional = e1.navigable
        && e2.navigable
        && e1.multiplicity.max.is_multi()
        && e2.multiplicity.max.is_multi();

    let copies = if bidirectional {
        let label = association_label(graph, assoc);
        if keep {
            session.warn(codes::BIDIRECTIONAL_KEPT, vec![label]);
            return;
        }
        session.info(codes::BIDIRECTIONAL_DISSOLVED, vec![label]);
        let mut copies = unidirectional(graph, assoc, &e1, &e2, limits);
        copies.extend(unidirectional(graph, assoc, &e2, &e1, limits));
        copies
    } else {
        let (split, other) = if s1 { (&e1, &e2) } else { (&e2, &e1) };
        let Some(n) = limits.copies(&split.multiplicity) else {
            return;
        };
        indexed_associations(graph, assoc, split, other, n, &limits.separator, true)
    };

    graph.remove_association(assoc);
    for (a, end1, end2) in copies {
        graph.add_association(a, end1, end2);
    }
}

pub fn flatten_multiplicity(graph: &mut SchemaGraph, session: &mut Session) -> PassResult {
    let limits = Limits {
        max_occurs: session.parsed_or(params::MAX_OCCURS, 3u32)?,
        threshold: session.parsed(params::MAX_MULTIPLICITY_THRESHOLD)?,
        separator: session.text(params::SEPARATOR_FOR_PROPERTY_INDEX_NUMBER, "_"),
    };
    let keep = session.flag(params::KEEP_BIDIRECTIONAL_ASSOCIATIONS, false)?;

    let attributes: Vec<Id> = graph
        .properties()
        .filter(|p| p.is_attribute && graph.in_schema(&p.owner) && limits.copies(&p.multiplicity).is_some())
        .map(|p| p.id.clone())
        .collect();
    let associations = graph.association_ids();
    tracing::debug!(attributes = attributes.len(), associations = associations.len(), "multiplicity worklist");

    for id in attributes {
        split_attribute(graph, &id, &limits);
    }
    for assoc in associations {
        split_association(graph, session, &assoc, &limits, keep);
    }
    Ok(())
}
