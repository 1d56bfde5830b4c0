// concord-core/src/infrastructure/config/rules.rs

use std::fs;
use std::path::Path;
use tracing::{info, instrument};

use crate::domain::error::DomainError;
use crate::domain::rules::{RuleSetDocument, validate_rule_set};
use crate::error::ConcordError;
use crate::infrastructure::error::InfrastructureError;

/// Reads a JSON or YAML rule document and checks every rule before anything runs.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_rule_set(path: &Path) -> Result<RuleSetDocument, ConcordError> {
    if !path.is_file() {
        return Err(InfrastructureError::SourceNotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    let content = fs::read_to_string(path)?;
    let document = parse_rule_set(path, &content)?;
    validate_rule_set(&document.rules)?;
    info!(rules = document.rules.len(), "📏 Rule set loaded");
    Ok(document)
}

pub fn parse_rule_set(path: &Path, content: &str) -> Result<RuleSetDocument, DomainError> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(content).map_err(|e| {
            DomainError::invalid_rule(
                format!("{} (line {}, column {})", path.display(), e.line(), e.column()),
                e.to_string(),
            )
        })
    } else {
        serde_yaml::from_str(content).map_err(|e| {
            let field = match e.location() {
                Some(at) => format!("{} (line {}, column {})", path.display(), at.line(), at.column()),
                None => path.display().to_string(),
            };
            DomainError::invalid_rule(field, e.to_string())
        })
    }
}
