//! Duplicate names left behind by flattening: property names repeated
//! within a class, class names repeated within a package.

use schemaflat_model::{Id, SchemaGraph};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct DuplicatePropertyName {
    pub class: Id,
    pub class_name: String,
    pub name: String,
    pub properties: Vec<Id>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateClassName {
    pub package: Id,
    pub package_name: String,
    pub name: String,
    pub classes: Vec<Id>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DuplicateReport {
    pub properties: Vec<DuplicatePropertyName>,
    pub classes: Vec<DuplicateClassName>,
}

impl DuplicateReport {
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.classes.is_empty()
    }
}

/// Scan in-scope classes and schema packages for repeated names.
/// Non-navigable association ends are not counted.
pub fn find_duplicate_names(graph: &SchemaGraph) -> DuplicateReport {
    let mut report = DuplicateReport::default();

    for class in graph.classes().filter(|c| graph.in_schema(&c.id)) {
        let mut by_name: BTreeMap<&str, Vec<Id>> = BTreeMap::new();
        // non-navigable ends never surface in an encoding
        for p in graph.properties_of(&class.id).into_iter().filter(|p| p.navigable) {
            by_name.entry(p.name.as_str()).or_default().push(p.id.clone());
        }
        for (name, properties) in by_name {
            if properties.len() > 1 {
                report.properties.push(DuplicatePropertyName {
                    class: class.id.clone(),
                    class_name: class.name.clone(),
                    name: name.to_owned(),
                    properties,
                });
            }
        }
    }

    for package in graph.packages() {
        if graph.schema_package(&package.id).is_none() {
            continue;
        }
        let mut by_name: BTreeMap<&str, Vec<Id>> = BTreeMap::new();
        for id in &package.classes {
            if let Some(c) = graph.class(id) {
                by_name.entry(c.name.as_str()).or_default().push(c.id.clone());
            }
        }
        for (name, classes) in by_name {
            if classes.len() > 1 {
                report.classes.push(DuplicateClassName {
                    package: package.id.clone(),
                    package_name: package.name.clone(),
                    name: name.to_owned(),
                    classes,
                });
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaflat_model::testing::SchemaBuilder;
    use schemaflat_model::{Category, Multiplicity};

    #[test]
    fn test_duplicate_property_and_class_names() {
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        let a = b.class("A", &pkg, Category::Feature);
        b.class("A", &pkg, Category::Object);
        b.attribute(&a, "x", "Integer", Multiplicity::ONE);
        b.attribute(&a, "x", "Real", Multiplicity::ONE);
        b.attribute(&a, "y", "Real", Multiplicity::ONE);
        let g = b.build();

        let report = find_duplicate_names(&g);
        assert_eq!(report.properties.len(), 1);
        assert_eq!(report.properties[0].name, "x");
        assert_eq!(report.properties[0].properties.len(), 2);
        assert_eq!(report.classes.len(), 1);
        assert_eq!(report.classes[0].classes.len(), 2);
    }

    #[test]
    fn test_out_of_scope_ignored() {
        let mut b = SchemaBuilder::new();
        let lib = b.package("Lib", None);
        let a = b.class("A", &lib, Category::Feature);
        b.attribute(&a, "x", "Integer", Multiplicity::ONE);
        b.attribute(&a, "x", "Integer", Multiplicity::ONE);
        assert!(find_duplicate_names(&b.build()).is_empty());
    }

    #[test]
    fn test_non_navigable_end_not_counted() {
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        let a = b.class("A", &pkg, Category::Feature);
        let c = b.class("C", &pkg, Category::Feature);
        b.attribute(&a, "c", "Integer", Multiplicity::ONE);
        let (_, end_on_a, _) = b.association(&a, "c", &c, "a");
        b.graph_mut().property_mut(&end_on_a).unwrap().navigable = false;
        assert!(find_duplicate_names(&b.build()).is_empty());
    }
}
