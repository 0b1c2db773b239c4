//! schemaflat-core: rewrite rule engine for application schemas.
//!
//! Takes a [`SchemaGraph`](schemaflat_model::SchemaGraph) and rewrites it,
//! rule by rule, into a flatter schema: inheritance copied down,
//! multi-valued properties split into indexed slots, complex data types
//! merged into their hosts, choices and association classes dissolved.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`flatten()`] -- run every enabled rule in precedence order
//! - [`FlattenConfig`] -- enabled rules, parameters and the type map
//! - [`RuleId`] -- rule identifiers in execution order
//! - [`FlattenOutcome`] -- rules run or skipped, advisory analysis results
//! - [`FlattenError`] -- conditions that stop a run
//! - [`Session`] -- per-run state handed to every rule
//!
//! Individual rule entry points are also re-exported for selective
//! execution.

pub mod config;
pub mod engine;
pub mod error;
mod merge;
pub mod pass10_types;
pub mod pass11_geometry;
pub mod pass12_association_classes;
pub mod pass13_names;
pub mod pass1_prune;
pub mod pass2_codelists;
pub mod pass2_constraints;
pub mod pass3_reason_codes;
pub mod pass4_optional;
pub mod pass5_basic_types;
pub mod pass6_inheritance;
pub mod pass7_cycles;
pub mod pass8_multiplicity;
pub mod pass9_choice;
pub mod session;

// ── Convenience re-exports: key types ────────────────────────────────

pub use config::{params, FlattenConfig, Precedence, RemovalPolicy, RuleId, TypeMapEntry};
pub use engine::FlattenOutcome;
pub use error::FlattenError;
pub use session::{PassResult, Session, Skipped};

// ── Convenience re-exports: rule entry points ────────────────────────

pub use engine::flatten;
pub use pass10_types::flatten_types;
pub use pass11_geometry::split_homogeneous_geometries;
pub use pass12_association_classes::dissolve_association_classes;
pub use pass13_names::{detect_duplicate_names, flatten_names};
pub use pass1_prune::{prune_flat_target_navigability, remove_types};
pub use pass2_codelists::flatten_codelists;
pub use pass2_constraints::{flatten_constraints, remove_constraints};
pub use pass3_reason_codes::flatten_reason_codes;
pub use pass4_optional::{force_optional, union_options_optional};
pub use pass5_basic_types::collapse_basic_types;
pub use pass6_inheritance::flatten_inheritance;
pub use pass7_cycles::detect_type_cycles;
pub use pass8_multiplicity::flatten_multiplicity;
pub use pass9_choice::replace_single_choice_properties;
