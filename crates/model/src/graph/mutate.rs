//! Graph mutation primitives. Each keeps both sides of every relationship
//! consistent; callers never patch mirror fields by hand.

use super::SchemaGraph;
use crate::constraint::ConstraintContext;
use crate::element::{Association, Class, Package, Property, TypeRef};
use crate::id::Id;
use std::collections::BTreeSet;

impl SchemaGraph {
    // ── Packages ───────────────────────────────────────────────────

    /// Register a package under its owner. Child and class sets are
    /// rebuilt from later registrations.
    pub fn add_package(&mut self, mut package: Package) -> Id {
        package.child_packages.clear();
        package.classes.clear();
        let id = package.id.clone();
        if let Some(owner) = package.owner.as_ref().and_then(|o| self.packages.get_mut(o)) {
            owner.child_packages.insert(id.clone());
        }
        self.packages.insert(id.clone(), package);
        id
    }

    // ── Classes ────────────────────────────────────────────────────

    /// Register a class in its package.
    ///
    /// Properties listed on the value are ignored (they are added through
    /// [`add_attribute`](Self::add_attribute) / [`add_association`](Self::add_association)).
    /// Supertypes and subtypes already present in the graph are mirrored.
    pub fn add_class(&mut self, mut class: Class) -> Id {
        let id = class.id.clone();
        let supertypes = std::mem::take(&mut class.supertypes);
        let subtypes = std::mem::take(&mut class.subtypes);
        class.properties.clear();
        class.association_class_for = None;

        if let Some(pkg) = self.packages.get_mut(&class.package) {
            pkg.classes.insert(id.clone());
        }
        self.class_names
            .entry(class.name.clone())
            .or_default()
            .insert(id.clone());
        self.classes.insert(id.clone(), class);

        for sup in supertypes {
            self.add_generalization(&id, &sup);
        }
        for sub in subtypes {
            self.add_generalization(&sub, &id);
        }
        id
    }

    /// Remove a class with everything hanging off it: owned properties,
    /// associations it takes part in, generalization edges, and its
    /// association-class link. Properties elsewhere still typed by the class
    /// are left pointing at its name only (unresolved); callers are expected
    /// to retype them first.
    pub fn remove_class(&mut self, id: &Id) -> Option<Class> {
        if !self.classes.contains_key(id) {
            return None;
        }

        for assoc in self.associations_of(id) {
            self.remove_association(&assoc);
        }
        for prop in self.property_ids_of(id) {
            self.remove_property(&prop);
        }

        let class = self.classes.get(id)?.clone();
        for sup in &class.supertypes {
            self.remove_generalization(id, sup);
        }
        for sub in &class.subtypes {
            self.remove_generalization(sub, id);
        }
        if let Some(assoc) = &class.association_class_for {
            if let Some(a) = self.associations.get_mut(assoc) {
                a.association_class = None;
            }
        }

        let dangling = self.referencing_properties(id);
        if !dangling.is_empty() {
            tracing::debug!(class = %id, count = dangling.len(), "unresolving references to removed class");
        }
        for p in dangling {
            if let Some(p) = self.properties.get_mut(&p) {
                p.type_ref.id = None;
            }
        }

        if let Some(pkg) = self.packages.get_mut(&class.package) {
            pkg.classes.remove(id);
        }
        self.unindex_name(&class.name, id);
        self.classes.remove(id)
    }

    pub fn rename_class(&mut self, id: &Id, name: impl Into<String>) {
        let name = name.into();
        let Some(class) = self.classes.get_mut(id) else {
            return;
        };
        let old = std::mem::replace(&mut class.name, name.clone());
        self.unindex_name(&old, id);
        self.class_names.entry(name.clone()).or_default().insert(id.clone());
        for p in self.properties.values_mut() {
            if p.type_ref.is(id) {
                p.type_ref.name = name.clone();
            }
        }
    }

    fn unindex_name(&mut self, name: &str, id: &Id) {
        if let Some(ids) = self.class_names.get_mut(name) {
            ids.remove(id);
            if ids.is_empty() {
                self.class_names.remove(name);
            }
        }
    }

    pub fn add_generalization(&mut self, sub: &Id, sup: &Id) {
        if sub == sup || !self.classes.contains_key(sub) || !self.classes.contains_key(sup) {
            return;
        }
        if let Some(c) = self.classes.get_mut(sub) {
            c.supertypes.insert(sup.clone());
        }
        if let Some(c) = self.classes.get_mut(sup) {
            c.subtypes.insert(sub.clone());
        }
    }

    pub fn remove_generalization(&mut self, sub: &Id, sup: &Id) {
        if let Some(c) = self.classes.get_mut(sub) {
            c.supertypes.remove(sup);
        }
        if let Some(c) = self.classes.get_mut(sup) {
            c.subtypes.remove(sub);
        }
    }

    // ── Properties ─────────────────────────────────────────────────

    /// Register an attribute with its owner. A taken ordering key is
    /// extended with a suffix until free.
    pub fn add_attribute(&mut self, mut property: Property) -> Id {
        property.is_attribute = true;
        property.reverse = None;
        property.association = None;
        self.insert_property(property)
    }

    fn insert_property(&mut self, mut property: Property) -> Id {
        let id = property.id.clone();
        if let Some(owner) = self.classes.get_mut(&property.owner) {
            if owner.properties.contains_key(&property.sequence) {
                let base = property.sequence.clone();
                let mut suffix = 1;
                while owner.properties.contains_key(&property.sequence) {
                    property.sequence = base.derive(suffix);
                    suffix += 1;
                }
                tracing::debug!(property = %id, sequence = %property.sequence, "ordering key collision resolved");
            }
            owner.properties.insert(property.sequence.clone(), id.clone());
        }
        self.properties.insert(id.clone(), property);
        id
    }

    fn unregister_property(&mut self, id: &Id) -> Option<Property> {
        let property = self.properties.remove(id)?;
        if let Some(owner) = self.classes.get_mut(&property.owner) {
            if owner.properties.get(&property.sequence) == Some(id) {
                owner.properties.remove(&property.sequence);
            } else {
                owner.properties.retain(|_, p| p != id);
            }
        }
        Some(property)
    }

    /// Remove a property. Removing either end of an association removes
    /// the whole association.
    pub fn remove_property(&mut self, id: &Id) -> Option<Property> {
        let assoc = self.properties.get(id)?.association.clone();
        match assoc {
            Some(assoc) => {
                let p = self.properties.get(id).cloned();
                self.remove_association(&assoc);
                p
            }
            None => self.unregister_property(id),
        }
    }

    pub fn set_property_type(&mut self, id: &Id, type_ref: TypeRef) {
        if let Some(p) = self.properties.get_mut(id) {
            p.type_ref = type_ref;
        }
    }

    /// Move a property to another ordering key in its owner.
    pub fn resequence_property(&mut self, id: &Id, sequence: crate::SequenceNumber) {
        let Some(mut p) = self.unregister_property(id) else {
            return;
        };
        p.sequence = sequence;
        self.insert_property(p);
    }

    /// Turn an association end into a plain attribute of its owner,
    /// dropping the association and the opposite end.
    pub fn detach_role_as_attribute(&mut self, id: &Id) -> Option<Id> {
        let mut p = self.properties.get(id)?.clone();
        let assoc = p.association.clone()?;
        self.remove_association(&assoc);
        p.navigable = true;
        Some(self.add_attribute(p))
    }

    // ── Associations ───────────────────────────────────────────────

    /// Register an association and its two ends. End ids, reverse links and
    /// the association-class back-reference are all set here.
    pub fn add_association(
        &mut self,
        mut association: Association,
        mut end1: Property,
        mut end2: Property,
    ) -> Id {
        let id = association.id.clone();
        association.end1 = end1.id.clone();
        association.end2 = end2.id.clone();

        end1.is_attribute = false;
        end1.association = Some(id.clone());
        end1.reverse = Some(end2.id.clone());
        end2.is_attribute = false;
        end2.association = Some(id.clone());
        end2.reverse = Some(end1.id.clone());

        if let Some(ac) = &association.association_class {
            match self.classes.get_mut(ac) {
                Some(c) => c.association_class_for = Some(id.clone()),
                None => association.association_class = None,
            }
        }

        self.insert_property(end1);
        self.insert_property(end2);
        self.associations.insert(id.clone(), association);
        id
    }

    /// Remove an association, both its ends and any association-class link.
    pub fn remove_association(&mut self, id: &Id) -> Option<Association> {
        let association = self.associations.remove(id)?;
        self.unregister_property(&association.end1);
        self.unregister_property(&association.end2);
        if let Some(ac) = association
            .association_class
            .as_ref()
            .and_then(|c| self.classes.get_mut(c))
        {
            ac.association_class_for = None;
        }
        Some(association)
    }

    /// Link or unlink an association class.
    pub fn set_association_class(&mut self, association: &Id, class: Option<&Id>) {
        let Some(a) = self.associations.get_mut(association) else {
            return;
        };
        let previous = std::mem::replace(&mut a.association_class, class.cloned());
        if let Some(prev) = previous.and_then(|p| self.classes.get_mut(&p)) {
            prev.association_class_for = None;
        }
        if let Some(c) = class.and_then(|c| self.classes.get_mut(c)) {
            c.association_class_for = Some(association.clone());
        }
    }

    // ── Clone primitives ───────────────────────────────────────────

    /// Copy a class under a fresh id: name, package, category, flags,
    /// descriptors, tags and constraints. No properties, generalizations or
    /// association-class link; the caller wires those.
    pub fn copy_class(&mut self, id: &Id) -> Option<Class> {
        let source = self.classes.get(id)?.clone();
        let new_id = self.fresh_id();
        let constraints = source
            .constraints
            .iter()
            .map(|c| c.rebound(ConstraintContext::Class(new_id.clone())))
            .collect();
        Some(Class {
            id: new_id,
            supertypes: BTreeSet::new(),
            subtypes: BTreeSet::new(),
            properties: Default::default(),
            association_class_for: None,
            constraints,
            ..source
        })
    }

    /// Copy a property under a fresh id for `owner`. Reverse and
    /// association links are cleared.
    pub fn copy_property(&mut self, id: &Id, owner: &Id) -> Option<Property> {
        let source = self.properties.get(id)?.clone();
        let new_id = self.fresh_id();
        let constraints = source
            .constraints
            .iter()
            .map(|c| c.rebound(ConstraintContext::Property(new_id.clone())))
            .collect();
        Some(Property {
            id: new_id,
            owner: owner.clone(),
            reverse: None,
            association: None,
            constraints,
            ..source
        })
    }

    /// Copy an association's own attributes under a fresh id. Ends are
    /// supplied when the copy is added.
    pub fn copy_association(&mut self, id: &Id) -> Option<Association> {
        let source = self.associations.get(id)?.clone();
        let new_id = self.fresh_id();
        Some(Association {
            id: new_id,
            association_class: None,
            ..source
        })
    }

    /// A brand-new class with a fresh id.
    pub fn new_class(
        &mut self,
        name: impl Into<String>,
        package: &Id,
        category: crate::Category,
    ) -> Class {
        let id = self.fresh_id();
        Class::new(id, name, package.clone(), category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::multiplicity::Multiplicity;
    use crate::testing::SchemaBuilder;

    #[test]
    fn test_remove_class_cleans_everything() {
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        let a = b.class("A", &pkg, Category::Feature);
        let base = b.class("Base", &pkg, Category::Feature);
        let other = b.class("Other", &pkg, Category::Feature);
        let user = b.class("User", &pkg, Category::DataType);
        b.generalize(&a, &base);
        b.attribute(&a, "x", "Integer", Multiplicity::ONE);
        let typed = b.attribute_of(&user, "a", &a, Multiplicity::ONE);
        b.association(&a, "toOther", &other, "toA");
        let mut g = b.build();

        let removed = g.remove_class(&a).unwrap();
        assert_eq!(removed.name, "A");
        assert!(g.class(&a).is_none());
        assert!(g.class(&base).unwrap().subtypes.is_empty());
        assert!(g.properties_of(&other).is_empty());
        assert_eq!(g.associations().count(), 0);
        assert!(g.class_by_name("A").is_none());
        let p = g.property(&typed).unwrap();
        assert!(p.type_ref.id.is_none());
        assert_eq!(p.type_ref.name, "A");
        assert!(g.check().is_empty(), "{:?}", g.check());
    }

    #[test]
    fn test_add_association_wires_both_ends() {
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        let a = b.class("A", &pkg, Category::Feature);
        let c = b.class("C", &pkg, Category::Feature);
        let (assoc, e1, e2) = b.association(&a, "c", &c, "a");
        let g = b.build();
        let p1 = g.property(&e1).unwrap();
        let p2 = g.property(&e2).unwrap();
        assert_eq!(p1.reverse.as_ref(), Some(&e2));
        assert_eq!(p2.reverse.as_ref(), Some(&e1));
        assert_eq!(p1.association.as_ref(), Some(&assoc));
        assert!(p1.is_role() && p2.is_role());
        assert!(g.check().is_empty());
    }

    #[test]
    fn test_removing_one_end_removes_association() {
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        let a = b.class("A", &pkg, Category::Feature);
        let c = b.class("C", &pkg, Category::Feature);
        let (_, e1, e2) = b.association(&a, "c", &c, "a");
        let mut g = b.build();
        g.remove_property(&e1);
        assert!(g.property(&e2).is_none());
        assert_eq!(g.associations().count(), 0);
        assert!(g.check().is_empty());
    }

    #[test]
    fn test_sequence_collision_is_resolved() {
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        let a = b.class("A", &pkg, Category::Object);
        let first = b.attribute(&a, "x", "Integer", Multiplicity::ONE);
        let mut g = b.build();
        let seq = g.property(&first).unwrap().sequence.clone();
        let mut dup = g.copy_property(&first, &a).unwrap();
        dup.name = "y".into();
        let dup_id = g.add_attribute(dup);
        let dup_seq = &g.property(&dup_id).unwrap().sequence;
        assert_ne!(dup_seq, &seq);
        assert!(seq.is_prefix_of(dup_seq));
        assert!(g.check().is_empty());
    }

    #[test]
    fn test_association_class_link_is_mirrored() {
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        let a = b.class("A", &pkg, Category::Feature);
        let c = b.class("C", &pkg, Category::Feature);
        let ac = b.class("AC", &pkg, Category::Object);
        let (assoc, _, _) = b.association(&a, "c", &c, "a");
        let mut g = b.build();
        g.set_association_class(&assoc, Some(&ac));
        assert_eq!(g.class(&ac).unwrap().association_class_for.as_ref(), Some(&assoc));
        assert!(g.check().is_empty());
        g.remove_class(&ac);
        assert!(g.association(&assoc).unwrap().association_class.is_none());
        assert!(g.check().is_empty());
    }

    #[test]
    fn test_detach_role_as_attribute() {
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        let a = b.class("A", &pkg, Category::Feature);
        let c = b.class("C", &pkg, Category::CodeList);
        let (_, e1, e2) = b.association(&a, "code", &c, "a");
        let mut g = b.build();
        let id = g.detach_role_as_attribute(&e1).unwrap();
        assert_eq!(id, e1);
        let p = g.property(&e1).unwrap();
        assert!(p.is_attribute && p.association.is_none());
        assert!(g.property(&e2).is_none());
        assert!(g.check().is_empty());
    }

    #[test]
    fn test_copy_class_has_fresh_id_and_no_wiring() {
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        let base = b.class("Base", &pkg, Category::Feature);
        let a = b.class("A", &pkg, Category::Feature);
        b.generalize(&a, &base);
        let mut g = b.build();
        let copy = g.copy_class(&a).unwrap();
        assert_ne!(copy.id, a);
        assert_eq!(copy.name, "A");
        assert!(copy.supertypes.is_empty());
        let id = g.add_class(copy);
        assert_eq!(g.classes_named("A").len(), 2);
        g.rename_class(&id, "A2");
        assert_eq!(g.classes_named("A").len(), 1);
        assert!(g.check().is_empty());
    }
}
