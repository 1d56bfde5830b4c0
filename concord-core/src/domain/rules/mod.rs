// concord-core/src/domain/rules/mod.rs
//
// Declarative rule definitions. A rule document deserializes straight into `Rule`;
// `validate_rule_set` is the gate every document passes before the engine compiles it.

pub mod checks;
pub mod engine;
pub mod expression;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

use crate::domain::error::DomainError;
use crate::domain::finding::CheckKind;
use crate::domain::normalize::Sensitivity;
use expression::Condition;

pub use engine::{EvaluationPlan, References, RuleEngine};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedType {
    Integer,
    Number,
    Boolean,
    Date,
    String,
    Categorical,
}

impl ExpectedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpectedType::Integer => "integer",
            ExpectedType::Number => "number",
            ExpectedType::Boolean => "boolean",
            ExpectedType::Date => "date",
            ExpectedType::String => "string",
            ExpectedType::Categorical => "categorical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TypeRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "column must not be empty"))]
    pub column: String,
    pub expected: ExpectedType,
    /// Allowed values when `expected` is `categorical`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub date_formats: Vec<String>,
    #[serde(default = "default_true")]
    pub allow_null: bool,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub whitespace_sensitive: bool,
}

/// A range boundary: a number, or an ISO date (`"2024-01-31"`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    Number(f64),
    Date(NaiveDate),
}

impl Bound {
    fn kind(&self) -> &'static str {
        match self {
            Bound::Number(_) => "number",
            Bound::Date(_) => "date",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RangeRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "column must not be empty"))]
    pub column: String,
    #[serde(default)]
    pub min: Option<Bound>,
    #[serde(default)]
    pub max: Option<Bound>,
    /// Overrides the engine-wide tolerance.
    #[serde(default)]
    pub tolerance: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub date_formats: Vec<String>,
    #[serde(default = "default_true")]
    pub allow_null: bool,
    #[serde(default)]
    pub whitespace_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PatternRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "column must not be empty"))]
    pub column: String,
    #[validate(length(min = 1, message = "pattern must not be empty"))]
    pub pattern: String,
    #[serde(default = "default_true")]
    pub allow_null: bool,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub whitespace_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CrossColumnRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// SQL-like boolean expression, e.g. `end_date >= start_date`.
    #[validate(length(min = 1, message = "expression must not be empty"))]
    pub expression: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub date_formats: Vec<String>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub whitespace_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ReferentialIntegrityRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "column must not be empty"))]
    pub column: String,
    /// Path of the reference dataset, resolved by the caller.
    #[validate(length(min = 1, message = "reference must name a dataset"))]
    pub reference: String,
    #[validate(length(min = 1, message = "reference_key must not be empty"))]
    pub reference_key: String,
    #[serde(default = "default_true")]
    pub allow_null: bool,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub whitespace_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct UniquenessRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "at least one key column is required"))]
    pub columns: Vec<String>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub whitespace_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CompletenessRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "column must not be empty"))]
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rule {
    Type(TypeRule),
    Range(RangeRule),
    Pattern(PatternRule),
    CrossColumn(CrossColumnRule),
    ReferentialIntegrity(ReferentialIntegrityRule),
    Uniqueness(UniquenessRule),
    Completeness(CompletenessRule),
}

/// Top-level shape of a rule definition document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSetDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub rules: Vec<Rule>,
}

impl Rule {
    pub fn kind(&self) -> CheckKind {
        match self {
            Rule::Type(_) => CheckKind::Type,
            Rule::Range(_) => CheckKind::Range,
            Rule::Pattern(_) => CheckKind::Pattern,
            Rule::CrossColumn(_) => CheckKind::CrossColumn,
            Rule::ReferentialIntegrity(_) => CheckKind::ReferentialIntegrity,
            Rule::Uniqueness(_) => CheckKind::Uniqueness,
            Rule::Completeness(_) => CheckKind::Completeness,
        }
    }

    fn explicit_name(&self) -> Option<&str> {
        match self {
            Rule::Type(r) => r.name.as_deref(),
            Rule::Range(r) => r.name.as_deref(),
            Rule::Pattern(r) => r.name.as_deref(),
            Rule::CrossColumn(r) => r.name.as_deref(),
            Rule::ReferentialIntegrity(r) => r.name.as_deref(),
            Rule::Uniqueness(r) => r.name.as_deref(),
            Rule::Completeness(r) => r.name.as_deref(),
        }
    }

    /// Declared name, or `<kind>:<target>` when the document gives none.
    pub fn name(&self) -> String {
        if let Some(name) = self.explicit_name() {
            return name.to_string();
        }
        let target = match self {
            Rule::Type(r) => r.column.clone(),
            Rule::Range(r) => r.column.clone(),
            Rule::Pattern(r) => r.column.clone(),
            Rule::CrossColumn(r) => r.expression.clone(),
            Rule::ReferentialIntegrity(r) => r.column.clone(),
            Rule::Uniqueness(r) => r.columns.join("+"),
            Rule::Completeness(r) => r.column.clone(),
        };
        format!("{}:{}", self.kind(), target)
    }

    /// Column a row-level finding is reported against.
    pub fn target_column(&self) -> Option<&str> {
        match self {
            Rule::Type(r) => Some(&r.column),
            Rule::Range(r) => Some(&r.column),
            Rule::Pattern(r) => Some(&r.column),
            Rule::CrossColumn(_) => None,
            Rule::ReferentialIntegrity(r) => Some(&r.column),
            Rule::Uniqueness(r) => r.columns.first().map(String::as_str),
            Rule::Completeness(r) => Some(&r.column),
        }
    }

    pub fn sensitivity(&self) -> Sensitivity {
        match self {
            Rule::Type(r) => Sensitivity::new(r.case_sensitive, r.whitespace_sensitive),
            Rule::Range(r) => Sensitivity::new(true, r.whitespace_sensitive),
            Rule::Pattern(r) => Sensitivity::new(r.case_sensitive, r.whitespace_sensitive),
            Rule::CrossColumn(r) => Sensitivity::new(r.case_sensitive, r.whitespace_sensitive),
            Rule::ReferentialIntegrity(r) => {
                Sensitivity::new(r.case_sensitive, r.whitespace_sensitive)
            }
            Rule::Uniqueness(r) => Sensitivity::new(r.case_sensitive, r.whitespace_sensitive),
            Rule::Completeness(_) => Sensitivity::NORMALIZED,
        }
    }

    /// Structural checks that do not need a dataset. `position` is used in field paths.
    pub fn validate_spec(&self, position: usize) -> Result<(), DomainError> {
        let field = |name: &str| format!("rules[{}].{}", position, name);

        match self {
            Rule::Type(r) => {
                check_fields(r, position)?;
                if r.expected == ExpectedType::Categorical && r.values.is_empty() {
                    return Err(DomainError::invalid_rule(
                        field("values"),
                        "a categorical type needs at least one allowed value",
                    ));
                }
            }
            Rule::Range(r) => {
                check_fields(r, position)?;
                match (&r.min, &r.max) {
                    (None, None) => {
                        return Err(DomainError::invalid_rule(
                            field("min"),
                            "a range needs a min, a max, or both",
                        ));
                    }
                    (Some(min), Some(max)) => {
                        if min.kind() != max.kind() {
                            return Err(DomainError::invalid_rule(
                                field("max"),
                                format!("max is a {} but min is a {}", max.kind(), min.kind()),
                            ));
                        }
                        let inverted = match (min, max) {
                            (Bound::Number(a), Bound::Number(b)) => a > b,
                            (Bound::Date(a), Bound::Date(b)) => a > b,
                            _ => false,
                        };
                        if inverted {
                            return Err(DomainError::invalid_rule(
                                field("min"),
                                "min is greater than max",
                            ));
                        }
                    }
                    _ => {}
                }
                for (name, bound) in [("min", &r.min), ("max", &r.max)] {
                    if let Some(Bound::Number(n)) = bound
                        && !n.is_finite()
                    {
                        return Err(DomainError::invalid_rule(field(name), "bound must be finite"));
                    }
                }
                if let Some(t) = r.tolerance
                    && (!t.is_finite() || t < 0.0)
                {
                    return Err(DomainError::invalid_rule(
                        field("tolerance"),
                        "tolerance must be a non-negative number",
                    ));
                }
            }
            Rule::Pattern(r) => {
                check_fields(r, position)?;
                regex::Regex::new(&r.pattern)
                    .map_err(|e| DomainError::invalid_rule(field("pattern"), e.to_string()))?;
            }
            Rule::CrossColumn(r) => {
                check_fields(r, position)?;
                let condition = Condition::parse(&r.expression)
                    .map_err(|reason| DomainError::invalid_rule(field("expression"), reason))?;
                let columns = condition.columns();
                if columns.len() < 2 {
                    return Err(DomainError::invalid_rule(
                        field("expression"),
                        format!(
                            "expression must reference at least 2 columns, found {}",
                            columns.len()
                        ),
                    ));
                }
            }
            Rule::ReferentialIntegrity(r) => check_fields(r, position)?,
            Rule::Uniqueness(r) => {
                check_fields(r, position)?;
                let mut seen = HashSet::new();
                for column in &r.columns {
                    if column.is_empty() || !seen.insert(column.as_str()) {
                        return Err(DomainError::invalid_rule(
                            field("columns"),
                            format!("key column '{}' is empty or repeated", column),
                        ));
                    }
                }
            }
            Rule::Completeness(r) => check_fields(r, position)?,
        }
        Ok(())
    }
}

/// Validates every rule, then rejects explicit names used twice.
pub fn validate_rule_set(rules: &[Rule]) -> Result<(), DomainError> {
    let mut names = HashSet::new();
    for (position, rule) in rules.iter().enumerate() {
        rule.validate_spec(position)?;
        if let Some(name) = rule.explicit_name()
            && !names.insert(name)
        {
            return Err(DomainError::invalid_rule(
                format!("rules[{}].name", position),
                format!("rule name '{}' is used more than once", name),
            ));
        }
    }
    Ok(())
}

fn check_fields(rule: &impl Validate, position: usize) -> Result<(), DomainError> {
    rule.validate().map_err(|errors| {
        let mut fields: Vec<(String, String)> = errors
            .field_errors()
            .iter()
            .map(|(field, errs)| {
                let reason = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "invalid value".to_string());
                (field.to_string(), reason)
            })
            .collect();
        fields.sort();
        match fields.into_iter().next() {
            Some((field, reason)) => {
                DomainError::invalid_rule(format!("rules[{}].{}", position, field), reason)
            }
            None => DomainError::invalid_rule(format!("rules[{}]", position), errors.to_string()),
        }
    })
}
