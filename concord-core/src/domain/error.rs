// concord-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Invalid rule specification: field '{field}': {reason}")]
    #[diagnostic(
        code(concord::domain::invalid_rule_spec),
        help("Fix the field '{field}' in the rule definition document and run the command again.")
    )]
    InvalidRuleSpec { field: String, reason: String },

    #[error("Schema mismatch: column '{column}' not found in '{source_id}'")]
    #[diagnostic(
        code(concord::domain::schema_mismatch),
        help("Available columns in '{source_id}': {available}")
    )]
    SchemaMismatch {
        column: String,
        source_id: String,
        available: String,
    },

    #[error("Evaluation Error: {0}")]
    #[diagnostic(code(concord::domain::evaluation))]
    EvaluationError(String),

    #[error("Session ledger is corrupted: {0}")]
    #[diagnostic(
        code(concord::domain::ledger_corruption),
        help("Restore an archived session or run 'concord clear' to start a fresh one.")
    )]
    LedgerCorruption(String),

    #[error("Invalid argument: {0}")]
    #[diagnostic(code(concord::domain::invalid_argument))]
    InvalidArgument(String),

    #[error("Malformed dataset '{source_id}': {reason}")]
    #[diagnostic(code(concord::domain::malformed_dataset))]
    MalformedDataset { source_id: String, reason: String },
}

impl DomainError {
    pub fn invalid_rule(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DomainError::InvalidRuleSpec {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
