//! Diagnostics emitted while transforming a schema.
//!
//! A diagnostic is a severity, a numeric code and positional parameters.
//! Rendering to user-facing text is the job of whoever owns the message
//! catalog (the CLI); nothing in the model or engine formats final text.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: u32,
    pub params: Vec<String>,
    /// Identifier of the rule that emitted this diagnostic, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: u32, params: Vec<String>) -> Self {
        Diagnostic {
            severity,
            code,
            params,
            rule: None,
        }
    }

    pub fn info(code: u32, params: Vec<String>) -> Self {
        Diagnostic::new(Severity::Info, code, params)
    }

    pub fn warning(code: u32, params: Vec<String>) -> Self {
        Diagnostic::new(Severity::Warning, code, params)
    }

    pub fn error(code: u32, params: Vec<String>) -> Self {
        Diagnostic::new(Severity::Error, code, params)
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }
}

/// Receiver for diagnostics.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);
}

/// Collecting sink.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|d| d.severity == severity).count()
    }

    pub fn has_code(&self, code: u32) -> bool {
        self.entries.iter().any(|d| d.code == code)
    }

    pub fn with_code(&self, code: u32) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.code == code)
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }
}

impl DiagnosticSink for Diagnostics {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }
}

/// Sink that drops everything. Used where a lookup may emit but the caller
/// has no interest in anomalies.
#[derive(Debug, Default)]
pub struct Discard;

impl DiagnosticSink for Discard {
    fn emit(&mut self, _diagnostic: Diagnostic) {}
}

/// Diagnostic codes. Parameters are listed in emission order.
pub mod codes {
    /// rule, missing parameter
    pub const MISSING_PARAMETER: u32 = 100;
    /// rule, parameter, value
    pub const INVALID_PARAMETER: u32 = 101;
    /// unknown rule identifier
    pub const UNKNOWN_RULE: u32 = 102;
    /// element, unresolved type name
    pub const TYPE_UNRESOLVED: u32 = 110;
    /// rule, type name
    pub const TYPE_NOT_FOUND: u32 = 111;
    /// association
    pub const FLAT_TARGET_BOTH_ENDS: u32 = 120;
    /// choice, role
    pub const REASON_CODE_ROLE_REFERENCE: u32 = 130;
    /// choice, replacement type
    pub const REASON_CODE_FOLDED: u32 = 131;
    /// class, base type
    pub const BASIC_TYPE_HAS_PROPERTIES: u32 = 140;
    /// superclass
    pub const NO_CONCRETE_SUBTYPE: u32 = 150;
    /// superclass
    pub const SUPERCLASS_RETAINED: u32 = 151;
    /// rendered cycle
    pub const CYCLE_DETECTED: u32 = 160;
    /// class, property names
    pub const REFLEXIVE_REFERENCE: u32 = 161;
    /// association
    pub const BIDIRECTIONAL_KEPT: u32 = 170;
    /// association
    pub const BIDIRECTIONAL_DISSOLVED: u32 = 171;
    /// choice, option
    pub const CHOICE_OPTION_IS_ROLE: u32 = 180;
    /// class, property, type
    pub const MERGE_CYCLE_SKIPPED: u32 = 190;
    /// class, property
    pub const REFLEXIVE_PROPERTY_DROPPED: u32 = 191;
    /// class, geometry type
    pub const GEOMETRY_UNMAPPED: u32 = 200;
    /// association, association class
    pub const ASSOCIATION_CLASS_DISSOLVED: u32 = 210;
    /// association, association class
    pub const ASSOCIATION_CLASS_OWNS_END: u32 = 211;
    /// class, property name
    pub const DUPLICATE_PROPERTY_NAME: u32 = 220;
    /// package, class name
    pub const DUPLICATE_CLASS_NAME: u32 = 221;
    /// element, tag
    pub const MULTIPLE_TAG_VALUES: u32 = 230;
}
