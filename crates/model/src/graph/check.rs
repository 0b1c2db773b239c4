//! Structural consistency checks over the whole graph.

use super::SchemaGraph;
use crate::id::Id;
use thiserror::Error;

/// A broken relationship found by [`SchemaGraph::check`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{element}: {message}")]
pub struct InvariantViolation {
    pub element: Id,
    pub message: String,
}

impl InvariantViolation {
    fn new(element: &Id, message: impl Into<String>) -> Self {
        InvariantViolation {
            element: element.clone(),
            message: message.into(),
        }
    }
}

impl SchemaGraph {
    /// Verify that both sides of every relationship agree and that every
    /// id reference lands on an existing element. An empty result means
    /// the graph is consistent.
    pub fn check(&self) -> Vec<InvariantViolation> {
        let mut out = Vec::new();
        self.check_packages(&mut out);
        self.check_classes(&mut out);
        self.check_properties(&mut out);
        self.check_associations(&mut out);
        out
    }

    fn check_packages(&self, out: &mut Vec<InvariantViolation>) {
        for p in self.packages.values() {
            if let Some(owner) = &p.owner {
                match self.packages.get(owner) {
                    None => out.push(InvariantViolation::new(&p.id, format!("owner package {owner} missing"))),
                    Some(o) if !o.child_packages.contains(&p.id) => {
                        out.push(InvariantViolation::new(&p.id, "not listed as child of its owner"))
                    }
                    _ => {}
                }
            }
            for c in &p.classes {
                if self.classes.get(c).map(|c| &c.package) != Some(&p.id) {
                    out.push(InvariantViolation::new(&p.id, format!("lists class {c} it does not own")));
                }
            }
        }
    }

    fn check_classes(&self, out: &mut Vec<InvariantViolation>) {
        for c in self.classes.values() {
            match self.packages.get(&c.package) {
                None => out.push(InvariantViolation::new(&c.id, format!("package {} missing", c.package))),
                Some(p) if !p.classes.contains(&c.id) => {
                    out.push(InvariantViolation::new(&c.id, "not listed in its package"))
                }
                _ => {}
            }
            if !self
                .class_names
                .get(&c.name)
                .is_some_and(|ids| ids.contains(&c.id))
            {
                out.push(InvariantViolation::new(&c.id, "missing from name index"));
            }
            for sup in &c.supertypes {
                if !self.classes.get(sup).is_some_and(|s| s.subtypes.contains(&c.id)) {
                    out.push(InvariantViolation::new(&c.id, format!("supertype {sup} does not list it")));
                }
            }
            for sub in &c.subtypes {
                if !self.classes.get(sub).is_some_and(|s| s.supertypes.contains(&c.id)) {
                    out.push(InvariantViolation::new(&c.id, format!("subtype {sub} does not list it")));
                }
            }
            for (seq, pid) in &c.properties {
                match self.properties.get(pid) {
                    None => out.push(InvariantViolation::new(&c.id, format!("property {pid} missing"))),
                    Some(p) if p.owner != c.id || &p.sequence != seq => out.push(
                        InvariantViolation::new(&c.id, format!("property {pid} registered under {seq}")),
                    ),
                    _ => {}
                }
            }
            if let Some(a) = &c.association_class_for {
                if self
                    .associations
                    .get(a)
                    .and_then(|a| a.association_class.as_ref())
                    != Some(&c.id)
                {
                    out.push(InvariantViolation::new(&c.id, format!("association {a} does not name it")));
                }
            }
        }
        for (name, ids) in &self.class_names {
            for id in ids {
                if self.classes.get(id).map(|c| &c.name) != Some(name) {
                    out.push(InvariantViolation::new(id, format!("stale name index entry {name}")));
                }
            }
        }
    }

    fn check_properties(&self, out: &mut Vec<InvariantViolation>) {
        for p in self.properties.values() {
            if self.classes.get(&p.owner).and_then(|c| c.properties.get(&p.sequence)) != Some(&p.id) {
                out.push(InvariantViolation::new(&p.id, "not registered with its owner"));
            }
            if let Some(t) = &p.type_ref.id {
                if !self.classes.contains_key(t) {
                    out.push(InvariantViolation::new(&p.id, format!("value type {t} missing")));
                }
            }
            if p.is_attribute {
                if p.reverse.is_some() || p.association.is_some() {
                    out.push(InvariantViolation::new(&p.id, "attribute with association links"));
                }
                continue;
            }
            let (Some(rev), Some(assoc)) = (&p.reverse, &p.association) else {
                out.push(InvariantViolation::new(&p.id, "role without reverse or association"));
                continue;
            };
            if self.properties.get(rev).and_then(|r| r.reverse.as_ref()) != Some(&p.id) {
                out.push(InvariantViolation::new(&p.id, format!("reverse {rev} does not point back")));
            }
            if !self
                .associations
                .get(assoc)
                .is_some_and(|a| a.ends().contains(&&p.id))
            {
                out.push(InvariantViolation::new(&p.id, format!("association {assoc} does not list it")));
            }
        }
    }

    fn check_associations(&self, out: &mut Vec<InvariantViolation>) {
        for a in self.associations.values() {
            if a.end1 == a.end2 {
                out.push(InvariantViolation::new(&a.id, "both ends are the same property"));
            }
            for end in a.ends() {
                if self.properties.get(end).and_then(|p| p.association.as_ref()) != Some(&a.id) {
                    out.push(InvariantViolation::new(&a.id, format!("end {end} not linked back")));
                }
            }
            if let Some(ac) = &a.association_class {
                if self
                    .classes
                    .get(ac)
                    .and_then(|c| c.association_class_for.as_ref())
                    != Some(&a.id)
                {
                    out.push(InvariantViolation::new(&a.id, format!("association class {ac} not linked back")));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::category::Category;
    use crate::multiplicity::Multiplicity;
    use crate::testing::SchemaBuilder;

    #[test]
    fn test_consistent_graph_passes() {
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        let a = b.class("A", &pkg, Category::Feature);
        let c = b.class("C", &pkg, Category::Feature);
        b.generalize(&c, &a);
        b.attribute(&a, "name", "CharacterString", Multiplicity::ONE);
        b.association(&a, "c", &c, "a");
        assert!(b.build().check().is_empty());
    }

    #[test]
    fn test_broken_mirror_is_reported() {
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        let a = b.class("A", &pkg, Category::Feature);
        let c = b.class("C", &pkg, Category::Feature);
        b.generalize(&c, &a);
        let mut g = b.build();
        g.class_mut(&a).unwrap().subtypes.clear();
        let violations = g.check();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].element, c);
        assert!(violations[0].to_string().contains("does not list it"));
    }

    #[test]
    fn test_dangling_type_is_reported() {
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        let a = b.class("A", &pkg, Category::Feature);
        let p = b.attribute(&a, "x", "Integer", Multiplicity::ONE);
        let mut g = b.build();
        g.property_mut(&p).unwrap().type_ref.id = Some("nowhere".into());
        assert!(g.check().iter().any(|v| v.element == p));
    }
}
