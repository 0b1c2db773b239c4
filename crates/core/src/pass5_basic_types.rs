//! Group 5: basic-type collapsing.
//!
//! A datatype or basic type deriving (transitively) from exactly one of the
//! configured simple base types is replaced by that base type everywhere,
//! and the intermediate class is removed.

use crate::config::params;
use crate::merge::type_ref_to;
use crate::session::{PassResult, Session};
use schemaflat_model::{codes, Category, Id, SchemaGraph};
use std::collections::BTreeSet;

pub fn collapse_basic_types(graph: &mut SchemaGraph, session: &mut Session) -> PassResult {
    let bases: BTreeSet<String> = session
        .list(params::SIMPLE_BASE_TYPES, params::DEFAULT_SIMPLE_BASE_TYPES)
        .into_iter()
        .collect();

    let mut collapses: Vec<(Id, Id)> = Vec::new();
    for c in graph.classes() {
        if !matches!(c.category, Category::DataType | Category::BasicType)
            || bases.contains(&c.name)
            || !graph.in_schema(&c.id)
        {
            continue;
        }
        let found: BTreeSet<Id> = graph
            .ancestors(&c.id)
            .into_iter()
            .filter(|a| graph.class(a).is_some_and(|ac| bases.contains(&ac.name)))
            .collect();
        let base_names: BTreeSet<&str> = found
            .iter()
            .filter_map(|a| graph.class(a).map(|ac| ac.name.as_str()))
            .collect();
        if base_names.len() != 1 {
            continue;
        }
        let Some(base) = found.into_iter().next() else {
            continue;
        };
        if !graph.properties_of(&c.id).is_empty() {
            let base_name = graph.class(&base).map(|b| b.name.clone()).unwrap_or_default();
            session.warn(codes::BASIC_TYPE_HAS_PROPERTIES, vec![c.name.clone(), base_name]);
            continue;
        }
        collapses.push((c.id.clone(), base));
    }

    for (class, base) in collapses {
        let target = type_ref_to(graph, &base);
        for p in graph.referencing_properties(&class) {
            graph.set_property_type(&p, target.clone());
        }
        tracing::debug!(class = %class, base = %target.name, "basic type collapsed");
        graph.remove_class(&class);
    }
    Ok(())
}
