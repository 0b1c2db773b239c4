//! Group 9: replacement of single-use choice properties.
//!
//! When exactly one single-valued attribute of a non-choice class is typed
//! by a choice, that attribute is replaced by one property per option of
//! the choice and the choice is deleted once nothing references it.

use crate::config::params;
use crate::merge::{fold_property, Fold};
use crate::session::{PassResult, Session};
use schemaflat_model::{codes, Category, Id, Property, SchemaGraph};

fn is_union(graph: &SchemaGraph, class: &Id) -> bool {
    graph.class(class).is_some_and(|c| c.is_union())
}

/// The one attribute eligible for replacement, if the choice has exactly
/// one reference from a non-choice class and that reference is a
/// single-valued attribute. Non-navigable association ends are not
/// references.
fn sole_host(graph: &SchemaGraph, choice: &Id) -> Option<Property> {
    let refs: Vec<&Property> = graph
        .referencing_properties(choice)
        .iter()
        .filter_map(|id| graph.property(id))
        .filter(|p| p.is_attribute || p.navigable)
        .filter(|p| !is_union(graph, &p.owner))
        .collect();
    match refs.as_slice() {
        [host] if host.is_attribute && host.multiplicity.is_single() => Some((*host).clone()),
        _ => None,
    }
}

pub fn replace_single_choice_properties(graph: &mut SchemaGraph, session: &mut Session) -> PassResult {
    let separator = session.text(params::SEPARATOR_FOR_PROPERTY_FROM_UNION, "-");
    let text_separator = session.descriptor_separator();
    let precedence = session.precedence()?;

    let choices: Vec<(Id, String)> = graph
        .classes()
        .filter(|c| c.category == Category::Union && graph.in_schema(&c.id))
        .map(|c| (c.id.clone(), c.name.clone()))
        .collect();

    let mut replaced = 0usize;
    for (choice, name) in choices {
        let Some(host) = sole_host(graph, &choice) else {
            continue;
        };
        let options: Vec<Property> = graph.properties_of(&choice).into_iter().cloned().collect();
        if let Some(role) = options.iter().find(|o| o.is_role()) {
            session.warn(codes::CHOICE_OPTION_IS_ROLE, vec![name, role.name.clone()]);
            continue;
        }

        let fold = Fold {
            separator: &separator,
            text_separator: &text_separator,
            precedence,
            optional: options.len() > 1,
        };
        let mut folded = Vec::with_capacity(options.len());
        for (i, option) in options.iter().enumerate() {
            let key = host.sequence.derive(i as i64 + 1);
            if let Some(p) = fold_property(graph, &host, option, key, &fold) {
                folded.push(p);
            }
        }
        graph.remove_property(&host.id);
        for p in folded {
            graph.add_attribute(p);
        }
        if !graph.is_referenced(&choice) {
            graph.remove_class(&choice);
        }
        replaced += 1;
    }
    tracing::debug!(replaced, "single-use choice properties replaced");
    Ok(())
}
