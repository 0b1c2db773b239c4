//! Group 12: association-class elimination.

use crate::merge::{add_new_association, association_label, new_role, type_ref_to};
use crate::session::{PassResult, Session};
use schemaflat_model::{codes, Class, Id, Multiplicity, SchemaGraph};

/// Replace an association carrying an association class by two plain
/// associations through the former association class.
///
/// For `O1 --end1/end2-- O2` with class `AC` the result is
/// `O1 --end1/end2'-- AC --end1'/end2-- O2`. The outer ends keep their
/// names, multiplicities and keys; the ends owned by `AC` are `[1..1]` and
/// keyed after `AC`'s own properties in (name, id) order.
fn dissolve(graph: &mut SchemaGraph, session: &mut Session, assoc: &Id, ac: &Id) {
    let Some((e1, e2)) = graph
        .association_ends(assoc)
        .map(|(a, b)| (a.clone(), b.clone()))
    else {
        return;
    };
    let label = association_label(graph, assoc);
    let ac_name = graph.class(ac).map(|c| c.name.clone()).unwrap_or_default();
    if &e1.owner == ac || &e2.owner == ac {
        tracing::debug!(association = %label, class = %ac_name, "association class owns an end");
        graph.set_association_class(assoc, None);
        session.warn(codes::ASSOCIATION_CLASS_OWNS_END, vec![label, ac_name]);
        return;
    }

    let (Some(mut outer1), Some(mut outer2)) = (
        graph.copy_property(&e1.id, &e1.owner),
        graph.copy_property(&e2.id, &e2.owner),
    ) else {
        return;
    };
    outer1.type_ref = type_ref_to(graph, ac);
    outer2.type_ref = type_ref_to(graph, ac);

    graph.set_association_class(assoc, None);
    graph.remove_association(assoc);

    let mut inner1 = new_role(graph, &e2.name, ac, &e1.owner, Multiplicity::ONE, Default::default());
    let mut inner2 = new_role(graph, &e1.name, ac, &e2.owner, Multiplicity::ONE, Default::default());
    let mut next = graph.class(ac).map(Class::next_sequence).unwrap_or_default();
    let mut inner = [&mut inner1, &mut inner2];
    inner.sort_by(|a, b| (&a.name, &a.id).cmp(&(&b.name, &b.id)));
    for p in inner {
        p.sequence = next.clone();
        next = next.append_after();
    }

    add_new_association(graph, outer1, inner1);
    add_new_association(graph, inner2, outer2);
    tracing::debug!(association = %label, class = %ac_name, "association class dissolved");
    session.info(codes::ASSOCIATION_CLASS_DISSOLVED, vec![label, ac_name]);
}

pub fn dissolve_association_classes(graph: &mut SchemaGraph, session: &mut Session) -> PassResult {
    let work: Vec<(Id, Id)> = graph
        .associations()
        .filter_map(|a| a.association_class.clone().map(|c| (a.id.clone(), c)))
        .filter(|(_, c)| graph.in_schema(c))
        .collect();
    for (assoc, ac) in work {
        dissolve(graph, session, &assoc, &ac);
    }
    Ok(())
}
