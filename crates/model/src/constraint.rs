//! Constraints attached to classes and properties.

use crate::id::Id;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKind {
    Text,
    Ocl,
    Fol,
}

/// Element a constraint belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintContext {
    Class(Id),
    Property(Id),
}

/// Parsed form of an OCL invariant. Only the pieces the rewrite passes
/// look at are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintPayload {
    pub invariant: String,
    /// Names navigated from `self`, in order of first appearance.
    pub references: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub context: ConstraintContext,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ConstraintPayload>,
}

impl Constraint {
    /// Build a constraint and attempt to parse its payload. A payload that
    /// does not parse is simply absent.
    pub fn new(
        kind: ConstraintKind,
        context: ConstraintContext,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let text = text.into();
        let payload = match kind {
            ConstraintKind::Ocl => parse_ocl(&text),
            ConstraintKind::Text | ConstraintKind::Fol => None,
        };
        Constraint {
            kind,
            context,
            name: name.into(),
            status: None,
            text,
            payload,
        }
    }

    /// Same constraint bound to another element.
    pub fn rebound(&self, context: ConstraintContext) -> Constraint {
        Constraint {
            context,
            ..self.clone()
        }
    }

    /// Turn into a free-text constraint, dropping any parsed payload.
    pub fn to_text(&mut self) {
        self.kind = ConstraintKind::Text;
        self.payload = None;
    }
}

fn parse_ocl(text: &str) -> Option<ConstraintPayload> {
    let start = text.find("inv")?;
    let after = &text[start + 3..];
    let colon = after.find(':')?;
    // anything between `inv` and `:` is the optional invariant name
    if !after[..colon]
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_')
    {
        return None;
    }
    let invariant = after[colon + 1..].trim();
    if invariant.is_empty() {
        return None;
    }

    let mut references = Vec::new();
    let mut rest = invariant;
    while let Some(pos) = rest.find("self.") {
        let tail = &rest[pos + 5..];
        let ident: String = tail
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if !ident.is_empty() && !references.contains(&ident) {
            references.push(ident);
        }
        rest = tail;
    }

    Some(ConstraintPayload {
        invariant: invariant.to_owned(),
        references,
    })
}
