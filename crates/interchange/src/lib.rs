//! schemaflat-interchange: JSON interchange documents for schema graphs.
//!
//! Provides typed structs for the model document (packages, classes with
//! their attributes, associations with their ends), a [`load()`] entry
//! point that turns a document into a validated
//! [`SchemaGraph`](schemaflat_model::SchemaGraph), and [`to_document()`]
//! for the way back.
//!
//! Loading is the fatal channel of a run: a document whose structure
//! cannot be wired into a consistent graph is rejected with a
//! [`ModelError`]. Everything softer is a diagnostic.

pub mod load;
pub mod serialize;
pub mod types;

pub use load::{load, load_str, ModelError};
pub use serialize::{to_document, to_json_string, to_json_value};
pub use types::*;
