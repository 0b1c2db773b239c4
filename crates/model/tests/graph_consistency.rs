//! Random edit sequences must leave the graph consistent.

use proptest::prelude::*;
use schemaflat_model::{
    Association, Category, Class, Id, Package, Property, SchemaGraph, TypeRef,
};

#[derive(Debug, Clone)]
enum Edit {
    AddClass,
    Generalize(usize, usize),
    Attribute(usize, usize),
    Associate(usize, usize),
    RemoveClass(usize),
    Rename(usize),
    CopyClass(usize),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        Just(Edit::AddClass),
        (0usize..16, 0usize..16).prop_map(|(a, b)| Edit::Generalize(a, b)),
        (0usize..16, 0usize..16).prop_map(|(a, b)| Edit::Attribute(a, b)),
        (0usize..16, 0usize..16).prop_map(|(a, b)| Edit::Associate(a, b)),
        (0usize..16).prop_map(Edit::RemoveClass),
        (0usize..16).prop_map(Edit::Rename),
        (0usize..16).prop_map(Edit::CopyClass),
    ]
}

fn pick(g: &SchemaGraph, i: usize) -> Option<Id> {
    let ids = g.class_ids();
    if ids.is_empty() {
        None
    } else {
        Some(ids[i % ids.len()].clone())
    }
}

fn apply(g: &mut SchemaGraph, pkg: &Id, e: &Edit) {
    match e {
        Edit::AddClass => {
            let c = g.new_class("C", pkg, Category::Feature);
            g.add_class(c);
        }
        Edit::Generalize(a, b) => {
            if let (Some(a), Some(b)) = (pick(g, *a), pick(g, *b)) {
                g.add_generalization(&a, &b);
            }
        }
        Edit::Attribute(a, b) => {
            if let (Some(a), Some(b)) = (pick(g, *a), pick(g, *b)) {
                let id = g.fresh_id();
                let seq = g.class(&a).map(Class::next_sequence).unwrap_or_default();
                let ty = TypeRef::new(b.clone(), "T");
                g.add_attribute(Property::attribute(id, "x", a, ty, seq));
            }
        }
        Edit::Associate(a, b) => {
            if let (Some(a), Some(b)) = (pick(g, *a), pick(g, *b)) {
                let e1 = g.fresh_id();
                let e2 = g.fresh_id();
                let id = g.fresh_id();
                let s1 = g.class(&a).map(Class::next_sequence).unwrap_or_default();
                let p1 = Property::role(e1.clone(), "r1", a.clone(), TypeRef::new(b.clone(), "B"), s1);
                // a reflexive association puts both ends in the same class
                let s2 = if a == b {
                    p1.sequence.append_after()
                } else {
                    g.class(&b).map(Class::next_sequence).unwrap_or_default()
                };
                let p2 = Property::role(e2.clone(), "r2", b, TypeRef::new(a, "A"), s2);
                g.add_association(Association::new(id, e1, e2), p1, p2);
            }
        }
        Edit::RemoveClass(a) => {
            if let Some(a) = pick(g, *a) {
                g.remove_class(&a);
            }
        }
        Edit::Rename(a) => {
            if let Some(a) = pick(g, *a) {
                g.rename_class(&a, format!("R{}", a));
            }
        }
        Edit::CopyClass(a) => {
            if let Some(c) = pick(g, *a).and_then(|a| g.copy_class(&a)) {
                g.add_class(c);
            }
        }
    }
}

proptest! {
    #[test]
    fn random_edits_keep_graph_consistent(edits in prop::collection::vec(edit(), 1..40)) {
        let mut g = SchemaGraph::new();
        let pkg = g.add_package(Package::new(Id::from("pkg"), "App", None));
        for e in &edits {
            apply(&mut g, &pkg, e);
            let violations = g.check();
            prop_assert!(violations.is_empty(), "after {:?}: {:?}", e, violations);
        }
    }
}

#[test]
fn test_fresh_ids_are_unique_across_kinds() {
    let mut g = SchemaGraph::new();
    let pkg = g.add_package(Package::new(Id::from("_sf2"), "App", None));
    let a = g.fresh_id();
    let b = g.fresh_id();
    assert_ne!(a, b);
    assert_ne!(a, pkg);
    assert_ne!(b, pkg);
}
