//! Schema elements stored in the graph tables.
//!
//! Relationships between elements are ids, never references; the graph
//! keeps both directions of every relationship in step.

use crate::category::Category;
use crate::constraint::Constraint;
use crate::descriptor::{Descriptor, Descriptors, TaggedValues};
use crate::id::Id;
use crate::multiplicity::Multiplicity;
use crate::sequence::SequenceNumber;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ──────────────────────────────────────────────
// Package
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: Id,
    pub name: String,
    pub owner: Option<Id>,
    /// Marks the root of an application schema.
    pub is_schema: bool,
    /// Namespace declared on this package; inherited by nested packages
    /// that declare none (see `SchemaGraph::schema_namespace`).
    pub target_namespace: Option<String>,
    pub child_packages: BTreeSet<Id>,
    pub classes: BTreeSet<Id>,
    pub descriptors: Descriptors,
    pub tags: TaggedValues,
}

impl Package {
    pub fn new(id: Id, name: impl Into<String>, owner: Option<Id>) -> Self {
        Package {
            id,
            name: name.into(),
            owner,
            is_schema: false,
            target_namespace: None,
            child_packages: BTreeSet::new(),
            classes: BTreeSet::new(),
            descriptors: Descriptors::new(),
            tags: TaggedValues::new(),
        }
    }
}

// ──────────────────────────────────────────────
// Class
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub id: Id,
    pub name: String,
    pub package: Id,
    pub category: Category,
    pub is_abstract: bool,
    pub is_leaf: bool,
    pub supertypes: BTreeSet<Id>,
    pub subtypes: BTreeSet<Id>,
    /// Owned properties in ordering-key order.
    pub properties: BTreeMap<SequenceNumber, Id>,
    pub constraints: Vec<Constraint>,
    /// Set when this class is the association class of an association.
    pub association_class_for: Option<Id>,
    pub descriptors: Descriptors,
    pub tags: TaggedValues,
}

impl Class {
    pub fn new(id: Id, name: impl Into<String>, package: Id, category: Category) -> Self {
        Class {
            id,
            name: name.into(),
            package,
            category,
            is_abstract: false,
            is_leaf: false,
            supertypes: BTreeSet::new(),
            subtypes: BTreeSet::new(),
            properties: BTreeMap::new(),
            constraints: Vec::new(),
            association_class_for: None,
            descriptors: Descriptors::new(),
            tags: TaggedValues::new(),
        }
    }

    pub fn is_union(&self) -> bool {
        self.category == Category::Union
    }

    /// Neither abstract nor a mixin.
    pub fn is_concrete(&self) -> bool {
        !self.is_abstract && self.category != Category::Mixin
    }

    /// The code (alias) if one is set, else the name.
    pub fn code_or_name(&self) -> &str {
        self.descriptors
            .first(Descriptor::Alias)
            .unwrap_or(&self.name)
    }

    /// Largest ordering key in use, if any.
    pub fn last_sequence(&self) -> Option<&SequenceNumber> {
        self.properties.keys().next_back()
    }

    /// A key sorting after every owned property, top-level unless the
    /// largest key is already at the top of the range.
    pub fn next_sequence(&self) -> SequenceNumber {
        self.last_sequence()
            .map(SequenceNumber::append_after)
            .unwrap_or_default()
    }
}

// ──────────────────────────────────────────────
// Property
// ──────────────────────────────────────────────

/// Value type of a property. The id is `None` when the type could not be
/// resolved; the name is kept for diagnostics and name-based lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    pub id: Option<Id>,
    pub name: String,
}

impl TypeRef {
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        TypeRef {
            id: Some(id),
            name: name.into(),
        }
    }

    /// Unresolved reference by name only.
    pub fn unresolved(name: impl Into<String>) -> Self {
        TypeRef {
            id: None,
            name: name.into(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.id.is_some()
    }

    pub fn is(&self, class: &Id) -> bool {
        self.id.as_ref() == Some(class)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: Id,
    pub name: String,
    pub owner: Id,
    pub type_ref: TypeRef,
    pub multiplicity: Multiplicity,
    pub navigable: bool,
    pub is_attribute: bool,
    pub sequence: SequenceNumber,
    /// The opposite end; set iff this is an association role.
    pub reverse: Option<Id>,
    /// Owning association; set iff this is an association role.
    pub association: Option<Id>,
    pub is_ordered: bool,
    pub is_unique: bool,
    pub is_derived: bool,
    pub is_read_only: bool,
    pub initial_value: Option<String>,
    pub constraints: Vec<Constraint>,
    pub descriptors: Descriptors,
    pub tags: TaggedValues,
}

impl Property {
    /// A new attribute with multiplicity `1`.
    pub fn attribute(
        id: Id,
        name: impl Into<String>,
        owner: Id,
        type_ref: TypeRef,
        sequence: SequenceNumber,
    ) -> Self {
        Property {
            id,
            name: name.into(),
            owner,
            type_ref,
            multiplicity: Multiplicity::ONE,
            navigable: true,
            is_attribute: true,
            sequence,
            reverse: None,
            association: None,
            is_ordered: false,
            is_unique: true,
            is_derived: false,
            is_read_only: false,
            initial_value: None,
            constraints: Vec::new(),
            descriptors: Descriptors::new(),
            tags: TaggedValues::new(),
        }
    }

    /// A role skeleton; the graph wires `reverse` and `association` when
    /// the owning association is added.
    pub fn role(
        id: Id,
        name: impl Into<String>,
        owner: Id,
        type_ref: TypeRef,
        sequence: SequenceNumber,
    ) -> Self {
        Property {
            is_attribute: false,
            ..Property::attribute(id, name, owner, type_ref, sequence)
        }
    }

    pub fn is_role(&self) -> bool {
        !self.is_attribute
    }

    pub fn code_or_name(&self) -> &str {
        self.descriptors
            .first(Descriptor::Alias)
            .unwrap_or(&self.name)
    }
}

// ──────────────────────────────────────────────
// Association
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Association {
    pub id: Id,
    pub name: Option<String>,
    pub end1: Id,
    pub end2: Id,
    pub association_class: Option<Id>,
    pub descriptors: Descriptors,
    pub tags: TaggedValues,
}

impl Association {
    pub fn new(id: Id, end1: Id, end2: Id) -> Self {
        Association {
            id,
            name: None,
            end1,
            end2,
            association_class: None,
            descriptors: Descriptors::new(),
            tags: TaggedValues::new(),
        }
    }

    /// The end that is not `end`.
    pub fn other_end(&self, end: &Id) -> &Id {
        if &self.end1 == end {
            &self.end2
        } else {
            &self.end1
        }
    }

    pub fn ends(&self) -> [&Id; 2] {
        [&self.end1, &self.end2]
    }
}
