//! schemaflat-model: the in-memory schema graph rewritten by the flattening
//! engine.
//!
//! # Public API
//!
//! - [`SchemaGraph`] -- id-indexed tables plus the mutation and clone
//!   primitives every pass goes through
//! - Elements: [`Package`], [`Class`], [`Property`], [`Association`]
//! - Values: [`Multiplicity`], [`SequenceNumber`], [`Descriptors`],
//!   [`TaggedValues`], [`Constraint`]
//! - [`Diagnostic`] and the [`DiagnosticSink`] trait used to report
//!   anomalies without aborting

pub mod category;
pub mod constraint;
pub mod descriptor;
pub mod diagnostics;
pub mod element;
pub mod graph;
pub mod id;
pub mod multiplicity;
pub mod sequence;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// ── Convenience re-exports ───────────────────────────────────────────

pub use category::Category;
pub use constraint::{Constraint, ConstraintContext, ConstraintKind, ConstraintPayload};
pub use descriptor::{Descriptor, Descriptors, LangString, TaggedValues, Values};
pub use diagnostics::{codes, Diagnostic, DiagnosticSink, Diagnostics, Discard, Severity};
pub use element::{Association, Class, Package, Property, TypeRef};
pub use graph::{InvariantViolation, SchemaGraph};
pub use id::Id;
pub use multiplicity::{Max, Multiplicity, ParseMultiplicityError};
pub use sequence::{ParseSequenceError, SequenceNumber, SequenceOverflow};
