//! The schema graph: id-indexed tables of packages, classes, properties and
//! associations.
//!
//! Relationships are stored as ids on both sides (supertype/subtype,
//! property/reverse property, association/ends, association class) and
//! every mutation in [`mutate`](self) keeps the two sides in step.
//! [`SchemaGraph::check`] re-verifies all of it and is what tests and the
//! engine entry point lean on.

mod check;
mod mutate;

pub use check::InvariantViolation;

use crate::element::{Association, Class, Package, Property, TypeRef};
use crate::id::Id;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    packages: BTreeMap<Id, Package>,
    classes: BTreeMap<Id, Class>,
    properties: BTreeMap<Id, Property>,
    associations: BTreeMap<Id, Association>,
    class_names: BTreeMap<String, BTreeSet<Id>>,
    next_id: u64,
}

const FRESH_ID_PREFIX: &str = "_sf";

impl SchemaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint an id not used by any element of any kind. This is the only
    /// place ids are created during a run.
    pub fn fresh_id(&mut self) -> Id {
        loop {
            self.next_id += 1;
            let candidate = Id::new(format!("{}{}", FRESH_ID_PREFIX, self.next_id));
            if !self.contains_id(&candidate) {
                return candidate;
            }
        }
    }

    pub fn contains_id(&self, id: &Id) -> bool {
        self.packages.contains_key(id)
            || self.classes.contains_key(id)
            || self.properties.contains_key(id)
            || self.associations.contains_key(id)
    }

    // ── Packages ───────────────────────────────────────────────────

    pub fn package(&self, id: &Id) -> Option<&Package> {
        self.packages.get(id)
    }

    pub fn package_mut(&mut self, id: &Id) -> Option<&mut Package> {
        self.packages.get_mut(id)
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    pub fn package_by_name(&self, name: &str) -> Option<&Package> {
        self.packages.values().find(|p| p.name == name)
    }

    /// Namespace in effect for a package: its own, else the nearest
    /// ancestor's.
    pub fn schema_namespace(&self, package: &Id) -> Option<&str> {
        let mut current = self.packages.get(package);
        while let Some(p) = current {
            if let Some(ns) = &p.target_namespace {
                return Some(ns);
            }
            current = p.owner.as_ref().and_then(|o| self.packages.get(o));
        }
        None
    }

    /// Nearest enclosing schema package (the package itself included).
    pub fn schema_package(&self, package: &Id) -> Option<&Package> {
        let mut current = self.packages.get(package);
        while let Some(p) = current {
            if p.is_schema {
                return Some(p);
            }
            current = p.owner.as_ref().and_then(|o| self.packages.get(o));
        }
        None
    }

    // ── Classes ────────────────────────────────────────────────────

    pub fn class(&self, id: &Id) -> Option<&Class> {
        self.classes.get(id)
    }

    pub fn class_mut(&mut self, id: &Id) -> Option<&mut Class> {
        self.classes.get_mut(id)
    }

    pub fn classes(&self) -> impl Iterator<Item = &Class> {
        self.classes.values()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Snapshot of all class ids, for worklists that mutate the graph.
    pub fn class_ids(&self) -> Vec<Id> {
        self.classes.keys().cloned().collect()
    }

    /// First class (in id order) carrying `name`.
    pub fn class_by_name(&self, name: &str) -> Option<&Class> {
        self.class_names
            .get(name)
            .and_then(|ids| ids.iter().next())
            .and_then(|id| self.classes.get(id))
    }

    pub fn classes_named(&self, name: &str) -> Vec<&Class> {
        self.class_names
            .get(name)
            .map(|ids| ids.iter().filter_map(|id| self.classes.get(id)).collect())
            .unwrap_or_default()
    }

    /// Resolve a type reference: by id, falling back to name when the id
    /// is missing or stale (e.g. after a merge replaced the class).
    pub fn resolve_type(&self, type_ref: &TypeRef) -> Option<&Class> {
        type_ref
            .id
            .as_ref()
            .and_then(|id| self.classes.get(id))
            .or_else(|| self.class_by_name(&type_ref.name))
    }

    /// Class of the value type of a property, if resolved.
    pub fn value_type(&self, property: &Property) -> Option<&Class> {
        property
            .type_ref
            .id
            .as_ref()
            .and_then(|id| self.classes.get(id))
    }

    /// True when some package above the class marks a schema boundary.
    pub fn in_schema(&self, class: &Id) -> bool {
        self.classes
            .get(class)
            .and_then(|c| self.schema_package(&c.package))
            .is_some()
    }

    /// All transitive supertypes.
    pub fn ancestors(&self, class: &Id) -> BTreeSet<Id> {
        self.walk(class, |c| &c.supertypes)
    }

    /// All transitive subtypes.
    pub fn descendants(&self, class: &Id) -> BTreeSet<Id> {
        self.walk(class, |c| &c.subtypes)
    }

    fn walk(&self, start: &Id, next: impl Fn(&Class) -> &BTreeSet<Id>) -> BTreeSet<Id> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(start.clone());
        while let Some(id) = queue.pop_front() {
            if let Some(c) = self.classes.get(&id) {
                for n in next(c) {
                    if n != start && seen.insert(n.clone()) {
                        queue.push_back(n.clone());
                    }
                }
            }
        }
        seen
    }

    // ── Properties ─────────────────────────────────────────────────

    pub fn property(&self, id: &Id) -> Option<&Property> {
        self.properties.get(id)
    }

    pub fn property_mut(&mut self, id: &Id) -> Option<&mut Property> {
        self.properties.get_mut(id)
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub fn property_ids(&self) -> Vec<Id> {
        self.properties.keys().cloned().collect()
    }

    /// Properties owned by `class`, in ordering-key order.
    pub fn properties_of(&self, class: &Id) -> Vec<&Property> {
        self.classes
            .get(class)
            .map(|c| {
                c.properties
                    .values()
                    .filter_map(|id| self.properties.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Ids of the properties owned by `class`, in ordering-key order.
    pub fn property_ids_of(&self, class: &Id) -> Vec<Id> {
        self.classes
            .get(class)
            .map(|c| c.properties.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn property_named(&self, class: &Id, name: &str) -> Option<&Property> {
        self.properties_of(class).into_iter().find(|p| p.name == name)
    }

    /// Properties anywhere whose value type is `class`.
    pub fn referencing_properties(&self, class: &Id) -> Vec<Id> {
        self.properties
            .values()
            .filter(|p| p.type_ref.is(class))
            .map(|p| p.id.clone())
            .collect()
    }

    pub fn is_referenced(&self, class: &Id) -> bool {
        self.properties.values().any(|p| p.type_ref.is(class))
    }

    // ── Associations ───────────────────────────────────────────────

    pub fn association(&self, id: &Id) -> Option<&Association> {
        self.associations.get(id)
    }

    pub fn association_mut(&mut self, id: &Id) -> Option<&mut Association> {
        self.associations.get_mut(id)
    }

    pub fn associations(&self) -> impl Iterator<Item = &Association> {
        self.associations.values()
    }

    pub fn association_ids(&self) -> Vec<Id> {
        self.associations.keys().cloned().collect()
    }

    /// Associations with an end owned by `class`.
    pub fn associations_of(&self, class: &Id) -> Vec<Id> {
        self.associations
            .values()
            .filter(|a| {
                a.ends()
                    .iter()
                    .any(|e| self.properties.get(*e).map(|p| &p.owner) == Some(class))
            })
            .map(|a| a.id.clone())
            .collect()
    }

    /// The two end properties of an association.
    pub fn association_ends(&self, id: &Id) -> Option<(&Property, &Property)> {
        let a = self.associations.get(id)?;
        Some((self.properties.get(&a.end1)?, self.properties.get(&a.end2)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::testing::SchemaBuilder;

    #[test]
    fn test_fresh_ids_skip_existing() {
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        b.class_with_id("_sf1", "Clash", &pkg, Category::Object);
        let mut g = b.build();
        let id = g.fresh_id();
        assert_ne!(id.as_str(), "_sf1");
        assert!(!g.contains_id(&id));
    }

    #[test]
    fn test_lookup_by_name_and_fallback() {
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        let road = b.class("Road", &pkg, Category::Feature);
        let g = b.build();
        assert_eq!(g.class_by_name("Road").map(|c| &c.id), Some(&road));
        let stale = TypeRef {
            id: Some(Id::from("gone")),
            name: "Road".into(),
        };
        assert_eq!(g.resolve_type(&stale).map(|c| &c.id), Some(&road));
    }

    #[test]
    fn test_schema_scope_and_namespace() {
        let mut b = SchemaBuilder::new();
        let root = b.package("Root", None);
        let app = b.schema_package_in("App", &root);
        let nested = b.package("Nested", Some(&app));
        b.graph_mut().package_mut(&app).unwrap().target_namespace = Some("urn:app".into());
        let inside = b.class("Inside", &nested, Category::Object);
        let outside = b.class("Outside", &root, Category::Object);
        let g = b.build();
        assert!(g.in_schema(&inside));
        assert!(!g.in_schema(&outside));
        assert_eq!(g.schema_namespace(&nested), Some("urn:app"));
        assert_eq!(g.schema_namespace(&root), None);
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        let a = b.class("A", &pkg, Category::Feature);
        let bb = b.class("B", &pkg, Category::Feature);
        let c = b.class("C", &pkg, Category::Feature);
        b.generalize(&bb, &a);
        b.generalize(&c, &bb);
        let g = b.build();
        assert_eq!(g.ancestors(&c), [a.clone(), bb.clone()].into_iter().collect());
        assert_eq!(g.descendants(&a), [bb, c].into_iter().collect());
        assert!(g.ancestors(&a).is_empty());
    }
}
