//! Group 13: naming.
//!
//! `flatten-names` swaps names and codes so the codes become the names
//! seen downstream. `detect-duplicate-names` reports the collisions that
//! renaming or earlier flattening may have produced.

use crate::config::RuleId;
use crate::session::{PassResult, Session};
use schemaflat_analyze::{find_duplicate_names, AnalysisReport};
use schemaflat_model::{Descriptor, Id, SchemaGraph};

/// The code becomes the name and the former name becomes the code.
pub fn flatten_names(graph: &mut SchemaGraph, _session: &mut Session) -> PassResult {
    let classes: Vec<(Id, String, String)> = graph
        .classes()
        .filter(|c| graph.in_schema(&c.id))
        .filter_map(|c| {
            c.descriptors
                .first(Descriptor::Alias)
                .filter(|code| !code.is_empty())
                .map(|code| (c.id.clone(), c.name.clone(), code.to_owned()))
        })
        .collect();
    let properties: Vec<(Id, String, String)> = graph
        .properties()
        .filter(|p| graph.in_schema(&p.owner))
        .filter_map(|p| {
            p.descriptors
                .first(Descriptor::Alias)
                .filter(|code| !code.is_empty())
                .map(|code| (p.id.clone(), p.name.clone(), code.to_owned()))
        })
        .collect();
    tracing::debug!(classes = classes.len(), properties = properties.len(), "names from codes");

    for (id, name, code) in classes {
        graph.rename_class(&id, code);
        if let Some(c) = graph.class_mut(&id) {
            c.descriptors.set_text(Descriptor::Alias, name);
        }
    }
    for (id, name, code) in properties {
        if let Some(p) = graph.property_mut(&id) {
            p.name = code;
            p.descriptors.set_text(Descriptor::Alias, name);
        }
    }
    Ok(())
}

/// Advisory: duplicate property names per class and class names per
/// package.
pub fn detect_duplicate_names(graph: &mut SchemaGraph, session: &mut Session) -> PassResult {
    let duplicates = find_duplicate_names(graph);
    tracing::debug!(
        properties = duplicates.properties.len(),
        classes = duplicates.classes.len(),
        "duplicate names"
    );
    let partial = AnalysisReport {
        duplicates: Some(duplicates),
        ..AnalysisReport::default()
    };
    partial.emit(RuleId::DetectDuplicateNames.as_str(), session.sink());

    session.analysis.duplicates = partial.duplicates;
    session.analysis.analyses_run.push("duplicates".to_owned());
    Ok(())
}
