//! Per-run state shared by the passes.
//!
//! A [`Session`] owns everything that outlives a single pass: the
//! diagnostics sink, the merge chains recorded by type flattening, the
//! shared reason-code enumeration, and the advisory analysis results. It
//! also carries typed parameter accessors that report configuration
//! defects and tell the pass to stand down.

use crate::config::{params, FlattenConfig, Precedence, RuleId};
use regex::Regex;
use schemaflat_analyze::{AnalysisReport, TypeSelection};
use schemaflat_model::{codes, Diagnostic, DiagnosticSink, Id, SchemaGraph, TypeRef};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Returned by a pass that cannot run with the given configuration. The
/// reason has already been reported as a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Skipped;

pub type PassResult = Result<(), Skipped>;

pub struct Session<'a> {
    config: &'a FlattenConfig,
    sink: &'a mut dyn DiagnosticSink,
    rule: Option<RuleId>,
    /// property id -> types it was merged through, outermost first.
    merge_chains: BTreeMap<Id, Vec<Id>>,
    /// Four-valued enumeration created for boolean reason codes.
    pub(crate) boolean_reason_enum: Option<Id>,
    /// (rule, type name) pairs already reported as not found.
    reported_missing: BTreeSet<(RuleId, String)>,
    pub(crate) analysis: AnalysisReport,
}

/// Lets model-level lookups report through the session, tagged with the
/// current rule.
impl DiagnosticSink for Session<'_> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        Session::emit(self, diagnostic);
    }
}

impl<'a> Session<'a> {
    pub fn new(config: &'a FlattenConfig, sink: &'a mut dyn DiagnosticSink) -> Self {
        Session {
            config,
            sink,
            rule: None,
            merge_chains: BTreeMap::new(),
            boolean_reason_enum: None,
            reported_missing: BTreeSet::new(),
            analysis: AnalysisReport::new(),
        }
    }

    pub fn config(&self) -> &FlattenConfig {
        self.config
    }

    pub fn rule(&self) -> Option<RuleId> {
        self.rule
    }

    pub(crate) fn begin(&mut self, rule: RuleId) {
        self.rule = Some(rule);
    }

    /// Close the current rule. Merge chains and the reason-code
    /// enumeration stay until the run ends.
    pub(crate) fn end_pass(&mut self) {
        self.rule = None;
    }

    pub(crate) fn into_analysis(self) -> AnalysisReport {
        self.analysis
    }

    // ── Diagnostics ────────────────────────────────────────────────

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        let diagnostic = match self.rule {
            Some(r) => diagnostic.with_rule(r.as_str()),
            None => diagnostic,
        };
        self.sink.emit(diagnostic);
    }

    pub fn warn(&mut self, code: u32, params: Vec<String>) {
        self.emit(Diagnostic::warning(code, params));
    }

    pub fn info(&mut self, code: u32, params: Vec<String>) {
        self.emit(Diagnostic::info(code, params));
    }

    /// Sink for callers that emit on their own (tag lookups, analyses).
    pub fn sink(&mut self) -> &mut dyn DiagnosticSink {
        &mut *self.sink
    }

    fn rule_name(&self) -> String {
        self.rule.map(|r| r.as_str().to_owned()).unwrap_or_default()
    }

    fn invalid(&mut self, name: &str, value: &str) -> Skipped {
        let rule = self.rule_name();
        self.warn(codes::INVALID_PARAMETER, vec![rule, name.to_owned(), value.to_owned()]);
        Skipped
    }

    // ── Parameters ─────────────────────────────────────────────────

    /// A parameter the current rule cannot run without.
    pub fn required(&mut self, name: &str) -> Result<String, Skipped> {
        let config = self.config;
        match config.parameter(name).map(str::trim) {
            Some(v) if !v.is_empty() => Ok(v.to_owned()),
            _ => {
                let rule = self.rule_name();
                self.warn(codes::MISSING_PARAMETER, vec![rule, name.to_owned()]);
                Err(Skipped)
            }
        }
    }

    /// A text parameter with a default. The value is used verbatim, so a
    /// separator may be a single space.
    pub fn text(&self, name: &str, default: &str) -> String {
        self.config.parameter(name).unwrap_or(default).to_owned()
    }

    pub fn flag(&mut self, name: &str, default: bool) -> Result<bool, Skipped> {
        let config = self.config;
        match config.parameter(name) {
            None => Ok(default),
            Some(v) => match v.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(self.invalid(name, v)),
            },
        }
    }

    /// A parsed parameter that may be absent.
    pub fn parsed<T: FromStr>(&mut self, name: &str) -> Result<Option<T>, Skipped> {
        let config = self.config;
        match config.parameter(name) {
            None => Ok(None),
            Some(v) => match v.trim().parse::<T>() {
                Ok(parsed) => Ok(Some(parsed)),
                Err(_) => Err(self.invalid(name, v)),
            },
        }
    }

    pub fn parsed_or<T: FromStr>(&mut self, name: &str, default: T) -> Result<T, Skipped> {
        Ok(self.parsed(name)?.unwrap_or(default))
    }

    /// Comma-separated list; blank items are dropped.
    pub fn list(&self, name: &str, default: &str) -> Vec<String> {
        split_list(self.config.parameter(name).unwrap_or(default))
    }

    pub fn required_list(&mut self, name: &str) -> Result<Vec<String>, Skipped> {
        let raw = self.required(name)?;
        Ok(split_list(&raw))
    }

    pub fn regex(&mut self, name: &str) -> Result<Option<Regex>, Skipped> {
        let config = self.config;
        match config.parameter(name) {
            None => Ok(None),
            Some(v) => match Regex::new(v) {
                Ok(re) => Ok(Some(re)),
                Err(e) => {
                    tracing::debug!(parameter = name, error = %e, "invalid regular expression");
                    Err(self.invalid(name, v))
                }
            },
        }
    }

    pub fn descriptor_separator(&self) -> String {
        self.text(params::DESCRIPTOR_SEPARATOR, " ")
    }

    pub fn precedence(&mut self) -> Result<Precedence, Skipped> {
        self.parsed_or(params::DESCRIPTOR_PRECEDENCE, Precedence::Outer)
    }

    /// Eligibility criteria for type flattening.
    pub fn type_selection(&mut self) -> Result<TypeSelection, Skipped> {
        Ok(TypeSelection {
            flatten_object_types: self.flag(params::FLATTEN_OBJECT_TYPES, false)?,
            object_types_include: self.regex(params::FLATTEN_OBJECT_TYPES_INCLUDE_REGEX)?,
            data_types_exclude: self.regex(params::FLATTEN_DATA_TYPES_EXCLUDE_REGEX)?,
        })
    }

    // ── Types ──────────────────────────────────────────────────────

    /// Reference to the class named `name`. When none exists the name is
    /// kept as an unresolved reference, reported once per rule.
    pub fn type_named(&mut self, graph: &SchemaGraph, name: &str) -> TypeRef {
        if let Some(c) = graph.class_by_name(name) {
            return TypeRef::new(c.id.clone(), name);
        }
        if let Some(rule) = self.rule {
            if self.reported_missing.insert((rule, name.to_owned())) {
                self.warn(codes::TYPE_NOT_FOUND, vec![rule.as_str().to_owned(), name.to_owned()]);
            }
        }
        TypeRef::unresolved(name)
    }

    // ── Merge chains ───────────────────────────────────────────────

    pub fn merge_chain(&self, property: &Id) -> &[Id] {
        self.merge_chains
            .get(property)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn record_merge_chain(&mut self, property: Id, chain: Vec<Id>) {
        self.merge_chains.insert(property, chain);
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
