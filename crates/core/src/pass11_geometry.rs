//! Group 11: homogeneous-geometry splitting.
//!
//! A feature type carrying geometry properties of several geometry types
//! is split into one variant per geometry type. Each variant keeps the
//! common properties plus the geometry properties of its type and their
//! name-prefixed siblings. A choice named after the original wraps the
//! variants, associations are replicated over them and the original is
//! removed.

use crate::config::{params, RuleId};
use crate::merge::{replicate_association, retype_attributes, type_ref_to, Replacement};
use crate::session::{PassResult, Session, Skipped};
use schemaflat_model::{codes, Category, Id, Multiplicity, Property, SchemaGraph, SequenceNumber};
use std::collections::{BTreeMap, BTreeSet};

/// Prefix of geometry type names recognized without a mapping.
const GEOMETRY_PREFIX: &str = "GM_";

fn geometry_type<'p>(p: &'p Property, map: &BTreeMap<String, String>) -> Option<&'p str> {
    let name = p.type_ref.name.as_str();
    (p.is_attribute && (map.contains_key(name) || name.starts_with(GEOMETRY_PREFIX))).then_some(name)
}

fn geometry_types(graph: &SchemaGraph, class: &Id, map: &BTreeMap<String, String>) -> BTreeSet<String> {
    graph
        .properties_of(class)
        .into_iter()
        .filter_map(|p| geometry_type(p, map))
        .map(str::to_owned)
        .collect()
}

/// One variant to build: its suffix and the property names it leaves out.
struct Part {
    suffix: String,
    exclude: BTreeSet<String>,
}

fn layout(
    graph: &SchemaGraph,
    session: &mut Session,
    class: &Id,
    map: &BTreeMap<String, String>,
) -> Vec<Part> {
    let class_name = graph.class(class).map(|c| c.name.clone()).unwrap_or_default();
    let attributes: Vec<&Property> = graph
        .properties_of(class)
        .into_iter()
        .filter(|p| p.is_attribute)
        .collect();

    let mut by_type: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for p in &attributes {
        if let Some(t) = geometry_type(p, map) {
            by_type.entry(t.to_owned()).or_default().insert(p.name.clone());
        }
    }
    let geometry_names: BTreeSet<&str> = by_type.values().flatten().map(String::as_str).collect();

    // siblings go to the first partition whose geometry name prefixes them
    let mut claimed: BTreeSet<String> = BTreeSet::new();
    let mut members: Vec<(String, BTreeSet<String>)> = Vec::new();
    for (t, names) in &by_type {
        let mut set = names.clone();
        for p in &attributes {
            if geometry_names.contains(p.name.as_str()) || claimed.contains(&p.name) {
                continue;
            }
            if names.iter().any(|g| p.name.starts_with(g.as_str())) {
                claimed.insert(p.name.clone());
                set.insert(p.name.clone());
            }
        }
        members.push((t.clone(), set));
    }

    let mut parts = Vec::new();
    for (i, (t, _)) in members.iter().enumerate() {
        let Some(suffix) = map.get(t) else {
            session.warn(codes::GEOMETRY_UNMAPPED, vec![class_name.clone(), t.clone()]);
            continue;
        };
        let exclude = members
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .flat_map(|(_, (_, set))| set.iter().cloned())
            .collect();
        parts.push(Part {
            suffix: suffix.clone(),
            exclude,
        });
    }
    parts
}

fn build_variant(graph: &mut SchemaGraph, class: &Id, part: &Part, separator: &str) -> Option<Id> {
    let mut variant = graph.copy_class(class)?;
    variant.name = format!("{}{}{}", variant.name, separator, part.suffix);
    let supertypes: Vec<Id> = graph
        .class(class)
        .map(|c| c.supertypes.iter().cloned().collect())
        .unwrap_or_default();
    let id = graph.add_class(variant);
    for sup in supertypes {
        graph.add_generalization(&id, &sup);
    }
    let kept: Vec<Id> = graph
        .properties_of(class)
        .into_iter()
        .filter(|p| p.is_attribute && !part.exclude.contains(&p.name))
        .map(|p| p.id.clone())
        .collect();
    for prop in kept {
        if let Some(copy) = graph.copy_property(&prop, &id) {
            graph.add_attribute(copy);
        }
    }
    Some(id)
}

/// Choice named after the original, one option per variant.
fn wrap_in_choice(graph: &mut SchemaGraph, original: &Id, variants: &[(Id, String)]) {
    let Some((name, package)) = graph
        .class(original)
        .map(|c| (c.name.clone(), c.package.clone()))
    else {
        return;
    };
    let class = graph.new_class(name, &package, Category::Union);
    let choice = graph.add_class(class);
    for (i, (variant, _)) in variants.iter().enumerate() {
        let id = graph.fresh_id();
        let option_name = graph.class(variant).map(|c| c.name.clone()).unwrap_or_default();
        let mut p = Property::attribute(
            id,
            option_name,
            choice.clone(),
            type_ref_to(graph, variant),
            SequenceNumber::single(i as i64 + 1),
        );
        p.multiplicity = Multiplicity::ONE;
        graph.add_attribute(p);
    }
    let target = type_ref_to(graph, &choice);
    retype_attributes(graph, original, &target, |_, _| true);
}

fn replacements(graph: &SchemaGraph, owner: &Id, splits: &BTreeMap<Id, Vec<(Id, String)>>) -> Vec<Replacement> {
    match splits.get(owner) {
        Some(variants) => variants
            .iter()
            .enumerate()
            .map(|(i, (class, suffix))| Replacement {
                class: class.clone(),
                label: suffix.clone(),
                rank: i as i64 + 1,
                inherit_rank: None,
            })
            .collect(),
        None => vec![Replacement {
            class: owner.clone(),
            label: graph.class(owner).map(|c| c.name.clone()).unwrap_or_default(),
            rank: 1,
            inherit_rank: None,
        }],
    }
}

pub fn split_homogeneous_geometries(graph: &mut SchemaGraph, session: &mut Session) -> PassResult {
    let map: BTreeMap<String, String> = session
        .config()
        .mappings(RuleId::SplitHomogeneousGeometries)
        .map(|e| (e.source.clone(), e.target.clone()))
        .collect();
    if map.is_empty() {
        let rule = RuleId::SplitHomogeneousGeometries.as_str().to_owned();
        session.warn(codes::MISSING_PARAMETER, vec![rule, params::TYPE_MAP.to_owned()]);
        return Err(Skipped);
    }
    let separator = session.text(params::SEPARATOR_FOR_GEOMETRY_TYPE_SUFFIX, "_");
    let cascade = session.flag(params::APPLY_ON_SUBTYPES, false)?;

    let mut worklist: Vec<(String, Id)> = graph
        .classes()
        .filter(|c| c.category == Category::Feature && graph.in_schema(&c.id))
        .filter(|c| geometry_types(graph, &c.id, &map).len() >= 2)
        .map(|c| (c.name.clone(), c.id.clone()))
        .collect();
    worklist.sort();
    let listed: BTreeSet<Id> = worklist.iter().map(|(_, id)| id.clone()).collect();

    let mut splits: BTreeMap<Id, Vec<(Id, String)>> = BTreeMap::new();
    for (name, class) in worklist {
        if splits.contains_key(&class) {
            continue;
        }
        if cascade && graph.ancestors(&class).iter().any(|a| listed.contains(a)) {
            continue;
        }
        let parts = layout(graph, session, &class, &map);
        if parts.is_empty() {
            continue;
        }
        let mut targets = vec![class.clone()];
        if cascade {
            let mut below: Vec<(String, Id)> = graph
                .descendants(&class)
                .into_iter()
                .filter(|d| graph.in_schema(d))
                .filter_map(|d| graph.class(&d).map(|c| (c.name.clone(), d.clone())))
                .collect();
            below.sort();
            targets.extend(below.into_iter().map(|(_, id)| id));
        }
        for target in targets {
            let variants: Vec<(Id, String)> = parts
                .iter()
                .filter_map(|part| build_variant(graph, &target, part, &separator).map(|v| (v, part.suffix.clone())))
                .collect();
            splits.insert(target, variants);
        }
        tracing::debug!(class = %name, variants = parts.len(), cascade, "geometry split");
    }
    if splits.is_empty() {
        return Ok(());
    }

    for (original, variants) in &splits {
        wrap_in_choice(graph, original, variants);
    }

    let split_ids: BTreeSet<&Id> = splits.keys().collect();
    let associations: Vec<Id> = graph
        .associations()
        .filter(|a| {
            a.ends()
                .iter()
                .any(|e| graph.property(e).is_some_and(|p| split_ids.contains(&p.owner)))
        })
        .map(|a| a.id.clone())
        .collect();
    for assoc in associations {
        let Some((o1, o2)) = graph
            .association_ends(&assoc)
            .map(|(e1, e2)| (e1.owner.clone(), e2.owner.clone()))
        else {
            continue;
        };
        let r1 = replacements(graph, &o1, &splits);
        let r2 = replacements(graph, &o2, &splits);
        replicate_association(graph, &assoc, &r1, &r2, &separator);
    }

    // a cascaded variant moves to the variant of its supertype with the
    // same suffix
    let suffix_of: BTreeMap<Id, String> = splits
        .values()
        .flatten()
        .map(|(v, s)| (v.clone(), s.clone()))
        .collect();
    for (original, variants) in &splits {
        let subtypes: Vec<Id> = graph
            .class(original)
            .map(|c| c.subtypes.iter().cloned().collect())
            .unwrap_or_default();
        for sub in subtypes {
            let Some(suffix) = suffix_of.get(&sub) else {
                continue;
            };
            if let Some((target, _)) = variants.iter().find(|(_, s)| s == suffix) {
                graph.add_generalization(&sub, target);
            }
        }
    }

    for original in splits.keys() {
        graph.remove_class(original);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlattenConfig;
    use schemaflat_model::testing::SchemaBuilder;
    use schemaflat_model::Diagnostics;

    fn config() -> FlattenConfig {
        FlattenConfig::new()
            .with_mapping(RuleId::SplitHomogeneousGeometries, "GM_Point", "P")
            .with_mapping(RuleId::SplitHomogeneousGeometries, "GM_Surface", "S")
    }

    fn run(g: &mut SchemaGraph, cfg: &FlattenConfig) -> (PassResult, Diagnostics) {
        let mut sink = Diagnostics::new();
        let mut s = Session::new(cfg, &mut sink);
        s.begin(RuleId::SplitHomogeneousGeometries);
        let result = split_homogeneous_geometries(g, &mut s);
        drop(s);
        (result, sink)
    }

    fn names(g: &SchemaGraph, class: &Id) -> Vec<String> {
        g.properties_of(class).iter().map(|p| p.name.clone()).collect()
    }

    fn building() -> (SchemaBuilder, Id, Id) {
        let mut b = SchemaBuilder::new();
        let pkg = b.schema_package("App");
        let building = b.class("Building", &pkg, Category::Feature);
        b.attribute(&building, "name", "CharacterString", Multiplicity::ONE);
        b.attribute(&building, "position", "GM_Point", Multiplicity::ONE);
        b.attribute(&building, "positionAccuracy", "Real", Multiplicity::OPTIONAL);
        b.attribute(&building, "outline", "GM_Surface", Multiplicity::ONE);
        (b, pkg, building)
    }

    #[test]
    fn test_split_into_variants() {
        let (mut b, pkg, building) = building();
        let owner = b.class("Owner", &pkg, Category::Feature);
        b.association(&owner, "building", &building, "owner");
        let street = b.class("Street", &pkg, Category::Feature);
        let near = b.attribute_of(&street, "near", &building, Multiplicity::OPTIONAL);
        let mut g = b.build();

        let (result, sink) = run(&mut g, &config());
        assert!(result.is_ok());
        assert!(sink.is_empty());
        assert!(g.class(&building).is_none());

        let p = g.class_by_name("Building_P").unwrap().id.clone();
        let s = g.class_by_name("Building_S").unwrap().id.clone();
        assert_eq!(names(&g, &p), vec!["name", "position", "positionAccuracy", "owner"]);
        assert_eq!(names(&g, &s), vec!["name", "outline", "owner"]);

        let choice = g.class_by_name("Building").unwrap();
        assert_eq!(choice.category, Category::Union);
        assert_eq!(names(&g, &choice.id), vec!["Building_P", "Building_S"]);
        assert!(g.property(&near).unwrap().type_ref.is(&choice.id));

        assert_eq!(names(&g, &owner), vec!["building_P", "building_S"]);
        assert!(g.check().is_empty(), "{:?}", g.check());
    }

    #[test]
    fn test_cascade_to_subtypes() {
        let (mut b, pkg, building) = building();
        let house = b.class("House", &pkg, Category::Feature);
        b.generalize(&house, &building);
        b.attribute(&house, "rooms", "Integer", Multiplicity::ONE);
        b.attribute(&house, "position", "GM_Point", Multiplicity::ONE);
        b.attribute(&house, "outline", "GM_Surface", Multiplicity::ONE);
        let mut g = b.build();

        let cfg = config().with_parameter(params::APPLY_ON_SUBTYPES, "true");
        let (result, _) = run(&mut g, &cfg);
        assert!(result.is_ok());
        assert!(g.class(&house).is_none());

        let house_p = g.class_by_name("House_P").unwrap();
        let building_p = g.class_by_name("Building_P").unwrap();
        assert_eq!(names(&g, &house_p.id), vec!["rooms", "position"]);
        assert!(house_p.supertypes.contains(&building_p.id));
        assert_eq!(house_p.supertypes.len(), 1);
        assert!(g.check().is_empty(), "{:?}", g.check());
    }

    #[test]
    fn test_unmapped_geometry_dropped() {
        let (mut b, _, building) = building();
        b.attribute(&building, "centerline", "GM_Curve", Multiplicity::ONE);
        let mut g = b.build();

        let (_, sink) = run(&mut g, &config());
        assert!(sink.has_code(codes::GEOMETRY_UNMAPPED));
        let p = g.class_by_name("Building_P").unwrap().id.clone();
        assert!(!names(&g, &p).contains(&"centerline".to_owned()));
        assert!(g.class_by_name("Building_GM_Curve").is_none());
    }

    #[test]
    fn test_without_type_map_skipped() {
        let (b, _, building) = building();
        let mut g = b.build();
        let (result, sink) = run(&mut g, &FlattenConfig::new());
        assert!(result.is_err());
        let w: Vec<_> = sink.with_code(codes::MISSING_PARAMETER).collect();
        assert_eq!(w[0].params[1], "typeMap");
        assert!(g.class(&building).is_some());
    }
}
