//! Builder for small graphs in tests. Enabled for this crate's tests and,
//! through the `testing` feature, for dependent crates' tests.

use crate::category::Category;
use crate::element::{Association, Class, Package, Property, TypeRef};
use crate::graph::SchemaGraph;
use crate::id::Id;
use crate::multiplicity::Multiplicity;

/// Assembles a [`SchemaGraph`] with readable ids (`t1`, `t2`, ...).
#[derive(Default)]
pub struct SchemaBuilder {
    graph: SchemaGraph,
    counter: u32,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> Id {
        self.counter += 1;
        Id::new(format!("t{}", self.counter))
    }

    pub fn package(&mut self, name: &str, owner: Option<&Id>) -> Id {
        let id = self.next_id();
        self.graph.add_package(Package::new(id, name, owner.cloned()))
    }

    pub fn schema_package(&mut self, name: &str) -> Id {
        let id = self.package(name, None);
        self.mark_schema(&id);
        id
    }

    pub fn schema_package_in(&mut self, name: &str, parent: &Id) -> Id {
        let id = self.package(name, Some(parent));
        self.mark_schema(&id);
        id
    }

    fn mark_schema(&mut self, id: &Id) {
        if let Some(p) = self.graph.package_mut(id) {
            p.is_schema = true;
        }
    }

    pub fn class(&mut self, name: &str, package: &Id, category: Category) -> Id {
        let id = self.next_id();
        self.graph
            .add_class(Class::new(id, name, package.clone(), category))
    }

    pub fn class_with_id(&mut self, id: &str, name: &str, package: &Id, category: Category) -> Id {
        self.graph
            .add_class(Class::new(Id::from(id), name, package.clone(), category))
    }

    pub fn abstract_class(&mut self, name: &str, package: &Id, category: Category) -> Id {
        let id = self.class(name, package, category);
        if let Some(c) = self.graph.class_mut(&id) {
            c.is_abstract = true;
        }
        id
    }

    pub fn generalize(&mut self, sub: &Id, sup: &Id) {
        self.graph.add_generalization(sub, sup);
    }

    /// Attribute typed by name; resolved when a class of that name exists.
    pub fn attribute(&mut self, owner: &Id, name: &str, type_name: &str, m: Multiplicity) -> Id {
        let type_ref = match self.graph.class_by_name(type_name) {
            Some(c) => TypeRef::new(c.id.clone(), type_name),
            None => TypeRef::unresolved(type_name),
        };
        self.add_attribute(owner, name, type_ref, m)
    }

    /// Attribute typed by a class of this graph.
    pub fn attribute_of(&mut self, owner: &Id, name: &str, type_id: &Id, m: Multiplicity) -> Id {
        let type_name = self
            .graph
            .class(type_id)
            .map(|c| c.name.clone())
            .unwrap_or_default();
        self.add_attribute(owner, name, TypeRef::new(type_id.clone(), type_name), m)
    }

    fn add_attribute(&mut self, owner: &Id, name: &str, type_ref: TypeRef, m: Multiplicity) -> Id {
        let id = self.next_id();
        let sequence = self
            .graph
            .class(owner)
            .map(Class::next_sequence)
            .unwrap_or_default();
        let mut p = Property::attribute(id, name, owner.clone(), type_ref, sequence);
        p.multiplicity = m;
        self.graph.add_attribute(p)
    }

    /// Bidirectional association: `a` gets role `a_role` pointing at `b`,
    /// `b` gets role `b_role` pointing at `a`. Returns (association, end on
    /// `a`, end on `b`).
    pub fn association(&mut self, a: &Id, a_role: &str, b: &Id, b_role: &str) -> (Id, Id, Id) {
        self.association_with(a, a_role, Multiplicity::ONE, b, b_role, Multiplicity::ONE)
    }

    pub fn association_with(
        &mut self,
        a: &Id,
        a_role: &str,
        a_mult: Multiplicity,
        b: &Id,
        b_role: &str,
        b_mult: Multiplicity,
    ) -> (Id, Id, Id) {
        let end1 = self.role(a, a_role, b, a_mult);
        let end2 = self.role(b, b_role, a, b_mult);
        let id = self.next_id();
        let (e1, e2) = (end1.id.clone(), end2.id.clone());
        let assoc = Association::new(id, e1.clone(), e2.clone());
        let id = self.graph.add_association(assoc, end1, end2);
        (id, e1, e2)
    }

    fn role(&mut self, owner: &Id, name: &str, target: &Id, m: Multiplicity) -> Property {
        let id = self.next_id();
        let type_name = self
            .graph
            .class(target)
            .map(|c| c.name.clone())
            .unwrap_or_default();
        let sequence = self
            .graph
            .class(owner)
            .map(Class::next_sequence)
            .unwrap_or_default();
        let mut p = Property::role(
            id,
            name,
            owner.clone(),
            TypeRef::new(target.clone(), type_name),
            sequence,
        );
        p.multiplicity = m;
        p
    }

    pub fn graph_mut(&mut self) -> &mut SchemaGraph {
        &mut self.graph
    }

    pub fn build(self) -> SchemaGraph {
        self.graph
    }
}
