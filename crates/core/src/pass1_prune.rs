//! Group 1: type removal and flat-target navigability pruning.

use crate::config::params;
use crate::merge::association_label;
use crate::session::{PassResult, Session};
use schemaflat_model::{codes, Property, SchemaGraph};

/// Tag marking an association end as the target of later flattening.
pub const FLAT_TARGET_TAG: &str = "isFlatTarget";

/// Remove every class named in `removeType`, with the attributes typed by
/// it and the associations it takes part in.
pub fn remove_types(graph: &mut SchemaGraph, session: &mut Session) -> PassResult {
    let names = session.required_list(params::REMOVE_TYPE)?;
    for name in names {
        let ids: Vec<_> = graph.classes_named(&name).iter().map(|c| c.id.clone()).collect();
        if ids.is_empty() {
            let rule = session.rule().map(|r| r.as_str().to_owned()).unwrap_or_default();
            session.warn(codes::TYPE_NOT_FOUND, vec![rule, name]);
            continue;
        }
        for id in ids {
            for p in graph.referencing_properties(&id) {
                graph.remove_property(&p);
            }
            tracing::debug!(class = %name, "removing type");
            graph.remove_class(&id);
        }
    }
    Ok(())
}

/// For a bidirectional association with exactly one end flagged as flat
/// target, make the opposite end non-navigable.
pub fn prune_flat_target_navigability(graph: &mut SchemaGraph, session: &mut Session) -> PassResult {
    for assoc in graph.association_ids() {
        let Some((e1, e2)) = graph.association_ends(&assoc) else {
            continue;
        };
        if !(e1.navigable && e2.navigable) {
            continue;
        }
        if !(graph.in_schema(&e1.owner) || graph.in_schema(&e2.owner)) {
            continue;
        }
        let (t1, t2) = (is_flat_target(graph, e1, session), is_flat_target(graph, e2, session));
        let opposite = match (t1, t2) {
            (true, true) => {
                let label = association_label(graph, &assoc);
                session.warn(codes::FLAT_TARGET_BOTH_ENDS, vec![label]);
                continue;
            }
            (true, false) => e2.id.clone(),
            (false, true) => e1.id.clone(),
            (false, false) => continue,
        };
        if let Some(p) = graph.property_mut(&opposite) {
            tracing::trace!(property = %p.name, "navigability pruned");
            p.navigable = false;
        }
    }
    Ok(())
}

/// The flat-target flag of an association end. With several values the
/// first decides and the extra ones are reported.
fn is_flat_target(graph: &SchemaGraph, end: &Property, session: &mut Session) -> bool {
    let owner = graph.class(&end.owner).map(|c| c.name.as_str()).unwrap_or_default();
    let element = format!("{}.{}", owner, end.name);
    end.tags
        .get(FLAT_TARGET_TAG, None, &element, session)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
