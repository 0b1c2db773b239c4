//! Class categories.
//!
//! Categories are resolved once from the stereotype when a model is loaded;
//! every pass switches on [`Category`] and never looks at stereotype text.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Feature,
    Object,
    DataType,
    /// Choice type: exactly one of its properties holds a value.
    Union,
    Mixin,
    Enumeration,
    CodeList,
    BasicType,
    FeatureConcept,
    AttributeConcept,
    RoleConcept,
    ValueConcept,
    Unknown,
}

impl Category {
    /// Resolve a stereotype string. Matching ignores case, spaces and
    /// underscores. A missing stereotype on a class means a plain object
    /// type (UML classes without stereotype).
    pub fn from_stereotype(stereotype: Option<&str>) -> Category {
        let Some(raw) = stereotype else {
            return Category::Object;
        };
        let norm: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match norm.as_str() {
            "" | "type" | "objecttype" | "object" => Category::Object,
            "featuretype" | "feature" => Category::Feature,
            "datatype" => Category::DataType,
            "union" | "choice" => Category::Union,
            "mixin" => Category::Mixin,
            "enumeration" | "enum" => Category::Enumeration,
            "codelist" => Category::CodeList,
            "basictype" => Category::BasicType,
            "featureconcept" => Category::FeatureConcept,
            "attributeconcept" => Category::AttributeConcept,
            "roleconcept" => Category::RoleConcept,
            "valueconcept" => Category::ValueConcept,
            _ => Category::Unknown,
        }
    }

    pub fn stereotype(self) -> &'static str {
        match self {
            Category::Feature => "featureType",
            Category::Object => "type",
            Category::DataType => "dataType",
            Category::Union => "union",
            Category::Mixin => "mixin",
            Category::Enumeration => "enumeration",
            Category::CodeList => "codeList",
            Category::BasicType => "basicType",
            Category::FeatureConcept => "featureConcept",
            Category::AttributeConcept => "attributeConcept",
            Category::RoleConcept => "roleConcept",
            Category::ValueConcept => "valueConcept",
            Category::Unknown => "unknown",
        }
    }

    /// Categories whose properties are literals rather than structure.
    pub fn is_enumerated(self) -> bool {
        matches!(self, Category::Enumeration | Category::CodeList)
    }

    /// Categories taking part in inheritance flattening.
    pub fn is_structured(self) -> bool {
        matches!(
            self,
            Category::Feature
                | Category::Object
                | Category::DataType
                | Category::Union
                | Category::Mixin
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stereotype())
    }
}
