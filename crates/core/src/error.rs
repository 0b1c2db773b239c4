use schemaflat_model::InvariantViolation;
use thiserror::Error;

/// Conditions that stop a run outright. Everything else is a diagnostic.
#[derive(Debug, Error)]
pub enum FlattenError {
    /// The input graph fails its structural self-check.
    #[error("schema graph is inconsistent ({} violation(s)); first: {}", .0.len(), first(.0))]
    InvalidGraph(Vec<InvariantViolation>),

    /// The configuration file cannot be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

fn first(violations: &[InvariantViolation]) -> String {
    violations
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}
