//! Which classes are eligible for type flattening.
//!
//! The same selection drives the cycle analysis and the type-flattening
//! pass, so both see exactly the same vertex set.

use regex::Regex;
use schemaflat_model::{Category, Id, SchemaGraph};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct TypeSelection {
    /// Merge every in-scope object type.
    pub flatten_object_types: bool,
    /// Object types whose name matches are merged even when
    /// `flatten_object_types` is off.
    pub object_types_include: Option<Regex>,
    /// Data types whose name matches are never merged.
    pub data_types_exclude: Option<Regex>,
}

impl TypeSelection {
    /// Eligibility of a single in-scope class.
    pub fn is_eligible(&self, graph: &SchemaGraph, class: &Id) -> bool {
        let Some(c) = graph.class(class) else {
            return false;
        };
        if !graph.in_schema(class) {
            return false;
        }
        match c.category {
            Category::Union => true,
            Category::DataType => !self
                .data_types_exclude
                .as_ref()
                .is_some_and(|re| re.is_match(&c.name)),
            Category::Object => {
                self.flatten_object_types
                    || self
                        .object_types_include
                        .as_ref()
                        .is_some_and(|re| re.is_match(&c.name))
            }
            _ => false,
        }
    }

    /// All eligible classes, in id order.
    pub fn select(&self, graph: &SchemaGraph) -> BTreeSet<Id> {
        graph
            .classes()
            .filter(|c| self.is_eligible(graph, &c.id))
            .map(|c| c.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaflat_model::testing::SchemaBuilder;

    #[test]
    fn test_default_selection() {
        let mut b = SchemaBuilder::new();
        let app = b.schema_package("App");
        let lib = b.package("Lib", None);
        let u = b.class("U", &app, Category::Union);
        let d = b.class("D", &app, Category::DataType);
        b.class("O", &app, Category::Object);
        b.class("F", &app, Category::Feature);
        b.class("External", &lib, Category::DataType);
        let g = b.build();
        let selected = TypeSelection::default().select(&g);
        assert_eq!(selected, [u, d].into_iter().collect());
    }

    #[test]
    fn test_patterns() {
        let mut b = SchemaBuilder::new();
        let app = b.schema_package("App");
        let keep = b.class("AddressType", &app, Category::Object);
        b.class("Other", &app, Category::Object);
        let excluded = b.class("MeasureType", &app, Category::DataType);
        let g = b.build();
        let sel = TypeSelection {
            flatten_object_types: false,
            object_types_include: Some(Regex::new("^Address").unwrap()),
            data_types_exclude: Some(Regex::new("Measure").unwrap()),
        };
        let selected = sel.select(&g);
        assert!(selected.contains(&keep));
        assert!(!selected.contains(&excluded));
        assert_eq!(selected.len(), 1);
    }
}
