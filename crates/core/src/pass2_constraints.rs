//! Group 2: constraint flattening and removal.

use crate::session::{PassResult, Session};
use schemaflat_model::{ConstraintKind, SchemaGraph};

/// Turn OCL and FOL constraints of in-scope classes and their properties
/// into free-text constraints.
pub fn flatten_constraints(graph: &mut SchemaGraph, _session: &mut Session) -> PassResult {
    let mut converted = 0usize;
    for class in graph.class_ids() {
        if !graph.in_schema(&class) {
            continue;
        }
        for prop in graph.property_ids_of(&class) {
            if let Some(p) = graph.property_mut(&prop) {
                converted += to_text(&mut p.constraints);
            }
        }
        if let Some(c) = graph.class_mut(&class) {
            converted += to_text(&mut c.constraints);
        }
    }
    tracing::debug!(converted, "constraints flattened to text");
    Ok(())
}

fn to_text(constraints: &mut [schemaflat_model::Constraint]) -> usize {
    let mut n = 0;
    for c in constraints.iter_mut().filter(|c| c.kind != ConstraintKind::Text) {
        c.to_text();
        n += 1;
    }
    n
}

/// Drop every constraint of in-scope classes and their properties.
pub fn remove_constraints(graph: &mut SchemaGraph, _session: &mut Session) -> PassResult {
    for class in graph.class_ids() {
        if !graph.in_schema(&class) {
            continue;
        }
        for prop in graph.property_ids_of(&class) {
            if let Some(p) = graph.property_mut(&prop) {
                p.constraints.clear();
            }
        }
        if let Some(c) = graph.class_mut(&class) {
            c.constraints.clear();
        }
    }
    Ok(())
}
