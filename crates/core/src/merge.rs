//! Shared rewrite primitives: folding one property through another,
//! descriptor merging, retyping references and replicating associations
//! over replacement classes.

use crate::config::Precedence;
use schemaflat_model::{
    Association, Descriptor, Descriptors, Id, Multiplicity, Property, SchemaGraph, SequenceNumber,
    TypeRef,
};

// ──────────────────────────────────────────────
// Descriptors
// ──────────────────────────────────────────────

/// Merge the descriptors of a host (outer) and a merged (inner) element.
/// Codes are joined with `name_separator`, every other kind with
/// `text_separator`; `precedence` picks the side written first.
pub(crate) fn merge_descriptors(
    outer: &Descriptors,
    inner: &Descriptors,
    name_separator: &str,
    text_separator: &str,
    precedence: Precedence,
) -> Descriptors {
    let (left, right) = match precedence {
        Precedence::Outer => (outer, inner),
        Precedence::Inner => (inner, outer),
    };
    Descriptors::merge_all(left, right, |kind| match kind {
        Descriptor::Alias => name_separator.to_owned(),
        _ => text_separator.to_owned(),
    })
}

// ──────────────────────────────────────────────
// Folding
// ──────────────────────────────────────────────

/// How a property of some type is folded into a host property typed by it.
pub(crate) struct Fold<'s> {
    /// Joins host and source names and codes.
    pub separator: &'s str,
    pub text_separator: &'s str,
    pub precedence: Precedence,
    /// Lower bound forced to zero (sources that are choice options).
    pub optional: bool,
}

/// Build the property that replaces `host` for one `source` property of
/// the host's value type. The result is owned by the host's owner, has a
/// fresh id and is not yet registered.
pub(crate) fn fold_property(
    graph: &mut SchemaGraph,
    host: &Property,
    source: &Property,
    sequence: SequenceNumber,
    fold: &Fold<'_>,
) -> Option<Property> {
    let mut p = graph.copy_property(&source.id, &host.owner)?;
    p.name = format!("{}{}{}", host.name, fold.separator, source.name);
    p.sequence = sequence;
    let multiplicity = host.multiplicity.compose(&source.multiplicity);
    p.multiplicity = if fold.optional {
        multiplicity.optional()
    } else {
        multiplicity
    };
    p.descriptors = merge_descriptors(
        &host.descriptors,
        &source.descriptors,
        fold.separator,
        fold.text_separator,
        fold.precedence,
    );
    // the merged code must follow the merged name when either side had one
    if host.descriptors.first(Descriptor::Alias).is_some()
        || source.descriptors.first(Descriptor::Alias).is_some()
    {
        let code = format!(
            "{}{}{}",
            host.code_or_name(),
            fold.separator,
            source.code_or_name()
        );
        p.descriptors.remove(Descriptor::Alias);
        p.descriptors.set_text(Descriptor::Alias, code);
    }
    Some(p)
}

// ──────────────────────────────────────────────
// References
// ──────────────────────────────────────────────

/// Retype every attribute typed by `from` whose owner passes `filter`.
/// Returns the retyped property ids.
pub(crate) fn retype_attributes(
    graph: &mut SchemaGraph,
    from: &Id,
    to: &TypeRef,
    filter: impl Fn(&SchemaGraph, &Property) -> bool,
) -> Vec<Id> {
    let targets: Vec<Id> = graph
        .referencing_properties(from)
        .into_iter()
        .filter(|id| {
            graph
                .property(id)
                .is_some_and(|p| p.is_attribute && filter(graph, p))
        })
        .collect();
    for id in &targets {
        graph.set_property_type(id, to.clone());
    }
    targets
}

pub(crate) fn type_ref_to(graph: &SchemaGraph, class: &Id) -> TypeRef {
    let name = graph
        .class(class)
        .map(|c| c.name.clone())
        .unwrap_or_default();
    TypeRef::new(class.clone(), name)
}

/// Human-readable association label for diagnostics.
pub(crate) fn association_label(graph: &SchemaGraph, id: &Id) -> String {
    let Some(a) = graph.association(id) else {
        return id.to_string();
    };
    if let Some(name) = a.name.as_ref().filter(|n| !n.is_empty()) {
        return name.clone();
    }
    match graph.association_ends(id) {
        Some((e1, e2)) => {
            let owner = |p: &Property| {
                graph
                    .class(&p.owner)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| p.owner.to_string())
            };
            format!("{}.{}-{}.{}", owner(e1), e1.name, owner(e2), e2.name)
        }
        None => id.to_string(),
    }
}

// ──────────────────────────────────────────────
// Association replication
// ──────────────────────────────────────────────

/// A class standing in for one end owner of an association.
#[derive(Debug, Clone)]
pub(crate) struct Replacement {
    pub class: Id,
    /// Appended to the name of ends retyped to this class.
    pub label: String,
    /// Position among the replacements of the same original (1-based).
    pub rank: i64,
    /// When set, ends moved to this class are keyed as inherited copies
    /// with this rank.
    pub inherit_rank: Option<i64>,
}

/// Copy `assoc` once for every pair of `owners1 × owners2` other than the
/// original pair. Returns the new association ids.
pub(crate) fn replicate_association(
    graph: &mut SchemaGraph,
    assoc: &Id,
    owners1: &[Replacement],
    owners2: &[Replacement],
    separator: &str,
) -> Vec<Id> {
    let Some((e1, e2)) = graph
        .association_ends(assoc)
        .map(|(a, b)| (a.clone(), b.clone()))
    else {
        return Vec::new();
    };
    let mut created = Vec::new();
    for a in owners1 {
        for b in owners2 {
            if a.class == e1.owner && b.class == e2.owner {
                continue;
            }
            let Some(copy) = graph.copy_association(assoc) else {
                continue;
            };
            let Some(end1) = moved_end(graph, &e1, a, b, &e2.owner, separator) else {
                continue;
            };
            let Some(end2) = moved_end(graph, &e2, b, a, &e1.owner, separator) else {
                continue;
            };
            created.push(graph.add_association(copy, end1, end2));
        }
    }
    created
}

/// Copy of `end` owned by `owner`, typed by `target`.
fn moved_end(
    graph: &mut SchemaGraph,
    end: &Property,
    owner: &Replacement,
    target: &Replacement,
    original_target: &Id,
    separator: &str,
) -> Option<Property> {
    let mut p = graph.copy_property(&end.id, &owner.class)?;
    let mut key = end.sequence.clone();
    if owner.class != end.owner {
        if let Some(rank) = owner.inherit_rank {
            key = key.inherited(rank);
        }
    }
    if &target.class != original_target {
        p.name = format!("{}{}{}", end.name, separator, target.label);
        key = key.derive(target.rank);
    }
    p.sequence = key;
    p.type_ref = type_ref_to(graph, &target.class);
    Some(p)
}

/// Register a fresh association between two new ends.
pub(crate) fn add_new_association(graph: &mut SchemaGraph, end1: Property, end2: Property) -> Id {
    let id = graph.fresh_id();
    let assoc = Association::new(id, end1.id.clone(), end2.id.clone());
    graph.add_association(assoc, end1, end2)
}

/// A new role skeleton with a fresh id.
pub(crate) fn new_role(
    graph: &mut SchemaGraph,
    name: impl Into<String>,
    owner: &Id,
    target: &Id,
    multiplicity: Multiplicity,
    sequence: SequenceNumber,
) -> Property {
    let id = graph.fresh_id();
    let mut p = Property::role(id, name, owner.clone(), type_ref_to(graph, target), sequence);
    p.multiplicity = multiplicity;
    p
}
