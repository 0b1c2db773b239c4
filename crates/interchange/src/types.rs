//! Typed structs for the model interchange JSON document.
//!
//! The document mirrors the schema graph but keeps relationships the way
//! a model export writes them: supertypes listed on the subtype,
//! attributes nested in their class, association ends nested in their
//! association. Multiplicities and ordering keys stay strings here and
//! are parsed by the loader, which reports the offending element.

use schemaflat_model::{ConstraintKind, Descriptors, TaggedValues};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_multiplicity() -> String {
    "1".to_owned()
}

/// Top-level interchange document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDocument {
    #[serde(default)]
    pub packages: Vec<PackageDoc>,
    #[serde(default)]
    pub classes: Vec<ClassDoc>,
    #[serde(default)]
    pub associations: Vec<AssociationDoc>,
}

// ── Packages ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDoc {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub is_schema: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Descriptors::is_empty")]
    pub descriptors: Descriptors,
    #[serde(default, skip_serializing_if = "TaggedValues::is_empty")]
    pub tags: TaggedValues,
}

// ── Classes ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDoc {
    pub id: String,
    pub name: String,
    pub package: String,
    /// Free-text stereotype; resolved to a category on load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stereotype: Option<String>,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_leaf: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supertypes: Vec<String>,
    #[serde(default, skip_serializing_if = "Descriptors::is_empty")]
    pub descriptors: Descriptors,
    #[serde(default, skip_serializing_if = "TaggedValues::is_empty")]
    pub tags: TaggedValues,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ConstraintDoc>,
    /// Attributes only; association ends live on their association.
    #[serde(default)]
    pub properties: Vec<PropertyDoc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintDoc {
    pub kind: ConstraintKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub text: String,
}

// ── Properties ──────────────────────────────────────────────────────

/// Value type reference. A missing id means "look the name up".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDoc {
    pub id: String,
    pub name: String,
    /// Required on association ends, ignored on attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(rename = "type")]
    pub type_ref: TypeDoc,
    #[serde(default = "default_multiplicity")]
    pub multiplicity: String,
    /// Ordering key such as `"2"` or `"1.3"`; assigned after the owner's
    /// last key when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,
    #[serde(default = "default_true")]
    pub navigable: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_ordered: bool,
    #[serde(default = "default_true")]
    pub is_unique: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_derived: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<String>,
    #[serde(default, skip_serializing_if = "Descriptors::is_empty")]
    pub descriptors: Descriptors,
    #[serde(default, skip_serializing_if = "TaggedValues::is_empty")]
    pub tags: TaggedValues,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ConstraintDoc>,
}

// ── Associations ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationDoc {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub end1: PropertyDoc,
    pub end2: PropertyDoc,
    #[serde(default)]
    pub association_class: Option<String>,
    #[serde(default, skip_serializing_if = "Descriptors::is_empty")]
    pub descriptors: Descriptors,
    #[serde(default, skip_serializing_if = "TaggedValues::is_empty")]
    pub tags: TaggedValues,
}
