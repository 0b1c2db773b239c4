//! Pass configuration: enabled rules, a flat parameter map and the type
//! mapping table.
//!
//! Configuration files are TOML:
//!
//! ```toml
//! rules = ["flatten-inheritance", "flatten-multiplicity"]
//!
//! [parameters]
//! maxOccurs = 3
//! separatorForPropertyIndexNumber = "_"
//!
//! [[type_map]]
//! rule = "flatten-types"
//! source = "Measure"
//! target = "Real"
//! remove = true
//! ```
//!
//! Parameter values may be written as TOML strings, booleans or integers;
//! they are kept as strings and parsed by the typed accessors on
//! [`Session`](crate::session::Session).

use crate::error::FlattenError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ──────────────────────────────────────────────
// Rule identifiers
// ──────────────────────────────────────────────

/// Every rule the engine knows, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum RuleId {
    RemoveType,
    PruneFlatTargetNavigability,
    FlattenConstraints,
    RemoveConstraints,
    FlattenCodelists,
    FlattenReasonCodes,
    ForceOptional,
    UnionOptionsOptional,
    CollapseBasicTypes,
    FlattenInheritance,
    DetectTypeCycles,
    FlattenMultiplicity,
    ReplaceSingleChoiceProperties,
    FlattenTypes,
    SplitHomogeneousGeometries,
    DissolveAssociationClasses,
    FlattenNames,
    DetectDuplicateNames,
}

impl RuleId {
    pub const ALL: [RuleId; 18] = [
        RuleId::RemoveType,
        RuleId::PruneFlatTargetNavigability,
        RuleId::FlattenConstraints,
        RuleId::RemoveConstraints,
        RuleId::FlattenCodelists,
        RuleId::FlattenReasonCodes,
        RuleId::ForceOptional,
        RuleId::UnionOptionsOptional,
        RuleId::CollapseBasicTypes,
        RuleId::FlattenInheritance,
        RuleId::DetectTypeCycles,
        RuleId::FlattenMultiplicity,
        RuleId::ReplaceSingleChoiceProperties,
        RuleId::FlattenTypes,
        RuleId::SplitHomogeneousGeometries,
        RuleId::DissolveAssociationClasses,
        RuleId::FlattenNames,
        RuleId::DetectDuplicateNames,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleId::RemoveType => "remove-type",
            RuleId::PruneFlatTargetNavigability => "prune-flat-target-navigability",
            RuleId::FlattenConstraints => "flatten-constraints",
            RuleId::RemoveConstraints => "remove-constraints",
            RuleId::FlattenCodelists => "flatten-codelists",
            RuleId::FlattenReasonCodes => "flatten-reason-codes",
            RuleId::ForceOptional => "force-optional",
            RuleId::UnionOptionsOptional => "union-options-optional",
            RuleId::CollapseBasicTypes => "collapse-basic-types",
            RuleId::FlattenInheritance => "flatten-inheritance",
            RuleId::DetectTypeCycles => "detect-type-cycles",
            RuleId::FlattenMultiplicity => "flatten-multiplicity",
            RuleId::ReplaceSingleChoiceProperties => "replace-single-choice-properties",
            RuleId::FlattenTypes => "flatten-types",
            RuleId::SplitHomogeneousGeometries => "split-homogeneous-geometries",
            RuleId::DissolveAssociationClasses => "dissolve-association-classes",
            RuleId::FlattenNames => "flatten-names",
            RuleId::DetectDuplicateNames => "detect-duplicate-names",
        }
    }

    /// Precedence group (1-based).
    pub fn group(self) -> u8 {
        match self {
            RuleId::RemoveType | RuleId::PruneFlatTargetNavigability => 1,
            RuleId::FlattenConstraints | RuleId::RemoveConstraints | RuleId::FlattenCodelists => 2,
            RuleId::FlattenReasonCodes => 3,
            RuleId::ForceOptional | RuleId::UnionOptionsOptional => 4,
            RuleId::CollapseBasicTypes => 5,
            RuleId::FlattenInheritance => 6,
            RuleId::DetectTypeCycles => 7,
            RuleId::FlattenMultiplicity => 8,
            RuleId::ReplaceSingleChoiceProperties => 9,
            RuleId::FlattenTypes => 10,
            RuleId::SplitHomogeneousGeometries => 11,
            RuleId::DissolveAssociationClasses => 12,
            RuleId::FlattenNames | RuleId::DetectDuplicateNames => 13,
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RuleId> for &'static str {
    fn from(id: RuleId) -> Self {
        id.as_str()
    }
}

impl FromStr for RuleId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleId::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| s.to_owned())
    }
}

// ──────────────────────────────────────────────
// Parameter names
// ──────────────────────────────────────────────

pub mod params {
    pub const REMOVE_TYPE: &str = "removeType";
    pub const CODELIST_REPLACEMENT_TYPE: &str = "codelistReplacementType";
    pub const REASON_CODE_BOOLEAN_ENUMERATION: &str = "reasonCodeBooleanEnumeration";
    pub const OPTIONAL_TYPES: &str = "optionalTypes";
    pub const SIMPLE_BASE_TYPES: &str = "simpleBaseTypes";
    pub const CHOICE_TYPE_SUFFIX: &str = "choiceTypeSuffix";
    pub const SEPARATOR_FOR_SUBTYPE_SUFFIX: &str = "separatorForSubtypeSuffix";
    pub const MAX_OCCURS: &str = "maxOccurs";
    pub const MAX_MULTIPLICITY_THRESHOLD: &str = "maxMultiplicityThreshold";
    pub const KEEP_BIDIRECTIONAL_ASSOCIATIONS: &str = "keepBiDirectionalAssociations";
    pub const SEPARATOR_FOR_PROPERTY_INDEX_NUMBER: &str = "separatorForPropertyIndexNumber";
    pub const SEPARATOR_FOR_PROPERTY_FROM_UNION: &str = "separatorForPropertyFromUnion";
    pub const SEPARATOR_FOR_PROPERTY_FROM_NON_UNION: &str = "separatorForPropertyFromNonUnion";
    pub const DESCRIPTOR_SEPARATOR: &str = "descriptorSeparator";
    pub const DESCRIPTOR_PRECEDENCE: &str = "descriptorPrecedence";
    pub const FLATTEN_OBJECT_TYPES: &str = "flattenObjectTypes";
    pub const FLATTEN_OBJECT_TYPES_INCLUDE_REGEX: &str = "flattenObjectTypesIncludeRegex";
    pub const FLATTEN_DATA_TYPES_EXCLUDE_REGEX: &str = "flattenDataTypesExcludeRegex";
    pub const IGNORE_REFLEXIVE_RELATIONSHIP: &str = "ignoreReflexiveRelationshipInTypeFlattening";
    pub const TYPE_REMOVAL_POLICY: &str = "typeRemovalPolicy";
    pub const REMOVE_MAPPED_TYPES: &str = "removeMappedTypes";
    pub const SEPARATOR_FOR_GEOMETRY_TYPE_SUFFIX: &str = "separatorForGeometryTypeSuffix";
    pub const APPLY_ON_SUBTYPES: &str = "applyOnSubtypes";

    /// Pseudo-parameter named in diagnostics when a rule has no type-map
    /// entries.
    pub const TYPE_MAP: &str = "typeMap";

    pub const DEFAULT_SIMPLE_BASE_TYPES: &str =
        "CharacterString,Boolean,Integer,Real,Decimal,Date,DateTime,URI";
}

// ──────────────────────────────────────────────
// Typed parameter values
// ──────────────────────────────────────────────

/// Which side of a merge is written first in merged descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    /// Host (outer) text first.
    Outer,
    /// Merged (inner) text first.
    Inner,
}

impl FromStr for Precedence {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outer" => Ok(Precedence::Outer),
            "inner" => Ok(Precedence::Inner),
            _ => Err(()),
        }
    }
}

/// What happens to eligible types once type flattening has merged them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    Unreferenced,
    All,
    None,
}

impl FromStr for RemovalPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unreferenced" => Ok(RemovalPolicy::Unreferenced),
            "all" => Ok(RemovalPolicy::All),
            "none" => Ok(RemovalPolicy::None),
            _ => Err(()),
        }
    }
}

// ──────────────────────────────────────────────
// Configuration
// ──────────────────────────────────────────────

/// One row of the type mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMapEntry {
    pub rule: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    #[serde(default)]
    pub remove: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlattenConfig {
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default, deserialize_with = "scalar_map")]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub type_map: Vec<TypeMapEntry>,
}

impl FlattenConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(text: &str) -> Result<Self, FlattenError> {
        Ok(toml::from_str(text)?)
    }

    /// Builder-style: enable a rule.
    pub fn with_rule(mut self, rule: RuleId) -> Self {
        self.rules.push(rule.as_str().to_owned());
        self
    }

    /// Builder-style: set a parameter.
    pub fn with_parameter(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parameters.insert(name.to_owned(), value.into());
        self
    }

    /// Builder-style: add a type-map entry.
    pub fn with_mapping(mut self, rule: RuleId, source: &str, target: &str) -> Self {
        self.type_map.push(TypeMapEntry {
            rule: rule.as_str().to_owned(),
            source: source.to_owned(),
            target: target.to_owned(),
            param: None,
            remove: false,
        });
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Type-map entries for `rule`, in file order.
    pub fn mappings(&self, rule: RuleId) -> impl Iterator<Item = &TypeMapEntry> {
        self.type_map.iter().filter(move |e| e.rule == rule.as_str())
    }

    /// Entry keyed by (rule, source).
    pub fn mapping(&self, rule: RuleId, source: &str) -> Option<&TypeMapEntry> {
        self.mappings(rule).find(|e| e.source == source)
    }
}

/// Accept TOML strings, booleans, integers and floats as parameter values.
fn scalar_map<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Bool(bool),
        Int(i64),
        Float(f64),
    }

    let raw = BTreeMap::<String, Scalar>::deserialize(d)?;
    Ok(raw
        .into_iter()
        .map(|(k, v)| {
            let text = match v {
                Scalar::Text(s) => s,
                Scalar::Bool(b) => b.to_string(),
                Scalar::Int(i) => i.to_string(),
                Scalar::Float(f) => f.to_string(),
            };
            (k, text)
        })
        .collect())
}
