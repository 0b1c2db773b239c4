//! Element identifiers.
//!
//! Identifiers are unique across every element kind in a graph (packages,
//! classes, properties, associations share one id space). Ids coming from
//! the model loader are kept verbatim; ids minted during a run come from
//! [`SchemaGraph::fresh_id`](crate::SchemaGraph::fresh_id).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    pub fn new(raw: impl Into<String>) -> Self {
        Id(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(raw: &str) -> Self {
        Id(raw.to_owned())
    }
}

impl From<String> for Id {
    fn from(raw: String) -> Self {
        Id(raw)
    }
}
