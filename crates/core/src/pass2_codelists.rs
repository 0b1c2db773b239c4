//! Group 2: codelist flattening.
//!
//! Properties typed by a codelist are retyped to a plain text type and
//! remember the codelist name in a tag; roles pointing at a codelist
//! become attributes. In-scope codelist classes are then removed.

use crate::config::params;
use crate::session::{PassResult, Session};
use schemaflat_model::{Category, SchemaGraph};

/// Tag recording the codelist a property used to be typed by.
pub const CODE_LIST_TAG: &str = "codeList";

pub fn flatten_codelists(graph: &mut SchemaGraph, session: &mut Session) -> PassResult {
    let replacement_name = session.text(params::CODELIST_REPLACEMENT_TYPE, "CharacterString");
    let codelists: Vec<_> = graph
        .classes()
        .filter(|c| c.category == Category::CodeList)
        .map(|c| (c.id.clone(), c.name.clone()))
        .collect();
    if codelists.is_empty() {
        return Ok(());
    }
    let replacement = session.type_named(graph, &replacement_name);

    for (codelist, name) in &codelists {
        for prop in graph.referencing_properties(codelist) {
            let Some(p) = graph.property(&prop) else {
                continue;
            };
            let owner_ok = graph.in_schema(&p.owner)
                && graph.class(&p.owner).is_some_and(|c| c.category != Category::CodeList);
            if !owner_ok {
                continue;
            }
            if p.is_role() {
                graph.detach_role_as_attribute(&prop);
            }
            graph.set_property_type(&prop, replacement.clone());
            if let Some(p) = graph.property_mut(&prop) {
                p.tags.set(CODE_LIST_TAG, name.clone());
            }
        }
    }

    let mut removed = 0usize;
    for (codelist, _) in codelists {
        if graph.in_schema(&codelist) {
            graph.remove_class(&codelist);
            removed += 1;
        }
    }
    tracing::debug!(removed, "codelists flattened");
    Ok(())
}
