//! Group 4: ad-hoc optionality rules.

use crate::config::params;
use crate::session::{PassResult, Session};
use schemaflat_model::{codes, Category, Id, SchemaGraph};

fn make_optional(graph: &mut SchemaGraph, class: &Id) -> usize {
    let mut changed = 0;
    for prop in graph.property_ids_of(class) {
        if let Some(p) = graph.property_mut(&prop) {
            if p.multiplicity.min > 0 {
                p.multiplicity = p.multiplicity.optional();
                changed += 1;
            }
        }
    }
    changed
}

/// Drop the lower bound of every property owned by a class named in
/// `optionalTypes`.
pub fn force_optional(graph: &mut SchemaGraph, session: &mut Session) -> PassResult {
    let names = session.required_list(params::OPTIONAL_TYPES)?;
    for name in names {
        let ids: Vec<Id> = graph.classes_named(&name).iter().map(|c| c.id.clone()).collect();
        if ids.is_empty() {
            let rule = session.rule().map(|r| r.as_str().to_owned()).unwrap_or_default();
            session.warn(codes::TYPE_NOT_FOUND, vec![rule, name]);
            continue;
        }
        for id in ids {
            let changed = make_optional(graph, &id);
            tracing::debug!(class = %name, changed, "properties made optional");
        }
    }
    Ok(())
}

/// Every option of an in-scope choice type may be absent.
pub fn union_options_optional(graph: &mut SchemaGraph, _session: &mut Session) -> PassResult {
    let unions: Vec<Id> = graph
        .classes()
        .filter(|c| c.category == Category::Union && graph.in_schema(&c.id))
        .map(|c| c.id.clone())
        .collect();
    for u in unions {
        make_optional(graph, &u);
    }
    Ok(())
}
