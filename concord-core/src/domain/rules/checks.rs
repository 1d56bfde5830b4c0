// concord-core/src/domain/rules/checks.rs
//
// Row-level verdicts. Each function looks at exactly one value and always returns a
// verdict: coercion failures become Error verdicts instead of aborting the evaluation.

use regex::Regex;
use std::collections::HashSet;

use crate::domain::dataset::Value;
use crate::domain::dataset::value::{format_number, parse_bool, parse_date, parse_number};
use crate::domain::error::DomainError;
use crate::domain::finding::Severity;
use crate::domain::normalize::{Match, Sensitivity};
use crate::domain::rules::{Bound, ExpectedType, PatternRule, RangeRule, TypeRule};

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub severity: Severity,
    pub message: String,
}

impl Verdict {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Pass,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

fn null_verdict(value: &Value, allow_null: bool, expectation: &str) -> Verdict {
    let what = if value.is_null() { "null value" } else { "blank value" };
    if allow_null {
        Verdict::pass(format!("{} accepted", what))
    } else {
        Verdict::error(format!("{} where {} is required", what, expectation))
    }
}

fn padding_verdict(whitespace_sensitive: bool, raw: &str) -> Verdict {
    if whitespace_sensitive {
        Verdict::error(format!("'{}' has leading or trailing whitespace", raw))
    } else {
        Verdict::warning(format!(
            "'{}' has leading or trailing whitespace; accepted after trimming",
            raw
        ))
    }
}

// ── Type ─────────────────────────────────────────────────────────────

pub fn check_type(rule: &TypeRule, value: &Value, default_formats: &[String]) -> Verdict {
    let expected = rule.expected.as_str();
    if value.is_blank() {
        return null_verdict(value, rule.allow_null, &format!("a {}", expected));
    }
    let formats = if rule.date_formats.is_empty() {
        default_formats
    } else {
        &rule.date_formats
    };

    let Value::String(raw) = value else {
        return check_typed_value(rule, value);
    };

    let trimmed = raw.trim();
    let coerced: Result<Option<String>, String> = match rule.expected {
        ExpectedType::Integer => match parse_number(trimmed) {
            Some(n) if n.fract() == 0.0 => Ok(None),
            Some(n) => Err(format!("{} is not an integer", format_number(n))),
            None => Err(format!("'{}' is not an integer", raw)),
        },
        ExpectedType::Number => parse_number(trimmed)
            .map(|_| None)
            .ok_or_else(|| format!("'{}' is not a number", raw)),
        ExpectedType::Boolean => parse_bool(trimmed)
            .map(|_| None)
            .ok_or_else(|| format!("'{}' is not a boolean", raw)),
        ExpectedType::Date => parse_date(trimmed, formats)
            .map(|_| None)
            .ok_or_else(|| format!("'{}' is not a date", raw)),
        ExpectedType::String => Ok(None),
        ExpectedType::Categorical => categorical(rule, trimmed),
    };

    match coerced {
        Err(reason) => Verdict::error(reason),
        Ok(_) if trimmed.len() != raw.len() => padding_verdict(rule.whitespace_sensitive, raw),
        Ok(Some(warning)) => Verdict::warning(warning),
        Ok(None) => Verdict::pass(format!("valid {}", expected)),
    }
}

/// `Ok(Some(..))` carries a warning for a case-only match.
fn categorical(rule: &TypeRule, candidate: &str) -> Result<Option<String>, String> {
    if rule.values.iter().any(|v| v == candidate) {
        return Ok(None);
    }
    if !rule.case_sensitive
        && let Some(canonical) = rule.values.iter().find(|v| v.to_lowercase() == candidate.to_lowercase())
    {
        return Ok(Some(format!(
            "'{}' matches category '{}' only when ignoring case",
            candidate, canonical
        )));
    }
    Err(format!(
        "'{}' is not one of [{}]",
        candidate,
        rule.values.join(", ")
    ))
}

fn check_typed_value(rule: &TypeRule, value: &Value) -> Verdict {
    let expected = rule.expected;
    let accepted = match (value, expected) {
        (_, ExpectedType::String) => true,
        (Value::Number(n), ExpectedType::Integer) => n.fract() == 0.0,
        (Value::Number(_), ExpectedType::Number) => true,
        (Value::Boolean(_), ExpectedType::Boolean) => true,
        (Value::Date(_), ExpectedType::Date) => true,
        (_, ExpectedType::Categorical) => {
            let text = value.as_text().unwrap_or_default();
            return match categorical(rule, &text) {
                Ok(Some(warning)) => Verdict::warning(warning),
                Ok(None) => Verdict::pass("valid categorical"),
                Err(reason) => Verdict::error(reason),
            };
        }
        _ => false,
    };
    if accepted {
        Verdict::pass(format!("valid {}", expected.as_str()))
    } else {
        Verdict::error(format!(
            "expected {}, found {} '{}'",
            expected.as_str(),
            value.type_name(),
            value
        ))
    }
}

// ── Range ────────────────────────────────────────────────────────────

pub fn check_range(
    rule: &RangeRule,
    value: &Value,
    tolerance: f64,
    default_formats: &[String],
) -> Verdict {
    if value.is_blank() {
        return null_verdict(value, rule.allow_null, "a value");
    }
    let formats = if rule.date_formats.is_empty() {
        default_formats
    } else {
        &rule.date_formats
    };
    let padded = matches!(value, Value::String(s) if s.trim().len() != s.len());
    if padded && rule.whitespace_sensitive {
        return padding_verdict(true, &value.to_string());
    }

    let dates = matches!(rule.min.or(rule.max), Some(Bound::Date(_)));
    // Distances to each bound: negative means outside.
    let (below, above) = if dates {
        let Some(d) = value.as_date(formats) else {
            return Verdict::error(format!("cannot read '{}' as a date", value));
        };
        let distance = |b: &Bound, low: bool| match b {
            Bound::Date(bound) if low => (d - *bound).num_days() as f64,
            Bound::Date(bound) => (*bound - d).num_days() as f64,
            Bound::Number(_) => f64::INFINITY,
        };
        (
            rule.min.as_ref().map(|b| distance(b, true)),
            rule.max.as_ref().map(|b| distance(b, false)),
        )
    } else {
        let Some(x) = value.as_number() else {
            return Verdict::error(format!("cannot read '{}' as a number", value));
        };
        let distance = |b: &Bound, low: bool| match b {
            Bound::Number(bound) if low => x - bound,
            Bound::Number(bound) => bound - x,
            Bound::Date(_) => f64::INFINITY,
        };
        (
            rule.min.as_ref().map(|b| distance(b, true)),
            rule.max.as_ref().map(|b| distance(b, false)),
        )
    };

    if below.is_some_and(|d| d < 0.0) {
        return Verdict::error(format!("'{}' is below the minimum {}", value, describe(rule.min)));
    }
    if above.is_some_and(|d| d < 0.0) {
        return Verdict::error(format!("'{}' is above the maximum {}", value, describe(rule.max)));
    }
    if tolerance > 0.0 {
        if below.is_some_and(|d| d <= tolerance) {
            return Verdict::warning(format!(
                "'{}' is within {} of the minimum {}",
                value,
                format_number(tolerance),
                describe(rule.min)
            ));
        }
        if above.is_some_and(|d| d <= tolerance) {
            return Verdict::warning(format!(
                "'{}' is within {} of the maximum {}",
                value,
                format_number(tolerance),
                describe(rule.max)
            ));
        }
    }
    if padded {
        return padding_verdict(false, &value.to_string());
    }
    Verdict::pass("within range")
}

fn describe(bound: Option<Bound>) -> String {
    match bound {
        Some(Bound::Number(n)) => format_number(n),
        Some(Bound::Date(d)) => d.format("%Y-%m-%d").to_string(),
        None => "-".to_string(),
    }
}

// ── Pattern ──────────────────────────────────────────────────────────

/// Anchored regexes: one exact, one tolerant of case when the rule allows it.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    exact: Regex,
    relaxed: Regex,
    sensitivity: Sensitivity,
    allow_null: bool,
}

impl PatternMatcher {
    pub fn compile(rule: &PatternRule, field: String) -> Result<Self, DomainError> {
        let anchored = format!("^(?:{})$", rule.pattern);
        let exact = Regex::new(&anchored)
            .map_err(|e| DomainError::invalid_rule(field.clone(), e.to_string()))?;
        let relaxed = if rule.case_sensitive {
            exact.clone()
        } else {
            Regex::new(&format!("(?i){}", anchored))
                .map_err(|e| DomainError::invalid_rule(field, e.to_string()))?
        };
        Ok(Self {
            exact,
            relaxed,
            // Case is handled by the relaxed regex, so only whitespace is normalized here.
            sensitivity: Sensitivity::new(true, rule.whitespace_sensitive),
            allow_null: rule.allow_null,
        })
    }

    pub fn check(&self, value: &Value) -> Verdict {
        if value.is_blank() {
            return null_verdict(value, self.allow_null, "a value");
        }
        let raw = value.as_text().unwrap_or_default();
        if self.exact.is_match(&raw) {
            return Verdict::pass("matches pattern");
        }
        let normalized = self.sensitivity.normalize(&raw);
        if self.relaxed.is_match(&normalized) {
            Verdict::warning(format!(
                "'{}' matches the pattern only after normalizing whitespace or case",
                raw
            ))
        } else {
            Verdict::error(format!(
                "'{}' does not match pattern '{}'",
                raw,
                self.exact.as_str()
            ))
        }
    }
}

// ── Referential integrity ────────────────────────────────────────────

/// Key set of a reference dataset, kept both raw and normalized.
#[derive(Debug, Clone)]
pub struct ReferenceIndex {
    exact: HashSet<String>,
    normalized: HashSet<String>,
    sensitivity: Sensitivity,
}

impl ReferenceIndex {
    pub fn new<'a>(keys: impl IntoIterator<Item = &'a Value>, sensitivity: Sensitivity) -> Self {
        let mut exact = HashSet::new();
        let mut normalized = HashSet::new();
        for value in keys {
            if let Some(text) = value.as_text() {
                normalized.insert(sensitivity.normalize(&text).into_owned());
                exact.insert(text.into_owned());
            }
        }
        Self {
            exact,
            normalized,
            sensitivity,
        }
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    pub fn lookup(&self, raw: &str) -> Match {
        if self.exact.contains(raw) {
            Match::Exact
        } else if self.normalized.contains(self.sensitivity.normalize(raw).as_ref()) {
            Match::Normalized
        } else {
            Match::Different
        }
    }

    pub fn check(&self, value: &Value, allow_null: bool, reference: &str) -> Verdict {
        if value.is_blank() {
            return null_verdict(value, allow_null, "a reference key");
        }
        let raw = value.as_text().unwrap_or_default();
        match self.lookup(&raw) {
            Match::Exact => Verdict::pass(format!("found in {}", reference)),
            Match::Normalized => Verdict::warning(format!(
                "'{}' found in {} only after normalizing whitespace or case",
                raw, reference
            )),
            Match::Different => Verdict::error(format!("'{}' not found in {}", raw, reference)),
        }
    }
}

// ── Completeness ─────────────────────────────────────────────────────

pub fn check_completeness(value: &Value) -> Verdict {
    match value {
        Value::Null => Verdict::error("required value is missing"),
        v if v.is_blank() => Verdict::error("required value is empty"),
        _ => Verdict::pass("value present"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn type_rule(expected: ExpectedType, allow_null: bool) -> TypeRule {
        TypeRule {
            name: None,
            column: "qty".into(),
            expected,
            values: vec![],
            date_formats: vec![],
            allow_null,
            case_sensitive: false,
            whitespace_sensitive: false,
        }
    }

    fn range_rule(min: Option<Bound>, max: Option<Bound>) -> RangeRule {
        RangeRule {
            name: None,
            column: "qty".into(),
            min,
            max,
            tolerance: None,
            date_formats: vec![],
            allow_null: true,
            whitespace_sensitive: false,
        }
    }

    fn severities(verdicts: &[Verdict]) -> Vec<Severity> {
        verdicts.iter().map(|v| v.severity).collect()
    }

    #[test]
    fn test_integer_type_scenario() {
        let rule = type_rule(ExpectedType::Integer, false);
        let verdicts: Vec<Verdict> = [Value::text(" 5"), Value::text("abc"), Value::Number(5.0), Value::Null]
            .iter()
            .map(|v| check_type(&rule, v, &[]))
            .collect();
        assert_eq!(
            severities(&verdicts),
            vec![Severity::Warning, Severity::Error, Severity::Pass, Severity::Error]
        );
    }

    #[test]
    fn test_whitespace_sensitive_type_rejects_padding() {
        let mut rule = type_rule(ExpectedType::Integer, true);
        rule.whitespace_sensitive = true;
        assert_eq!(check_type(&rule, &Value::text(" 5"), &[]).severity, Severity::Error);
    }

    #[test]
    fn test_categorical_mixed_case_warns() {
        let mut rule = type_rule(ExpectedType::Categorical, true);
        rule.values = vec!["Open".into(), "Closed".into()];
        assert_eq!(check_type(&rule, &Value::text("Open"), &[]).severity, Severity::Pass);
        assert_eq!(check_type(&rule, &Value::text("OPEN"), &[]).severity, Severity::Warning);
        assert_eq!(check_type(&rule, &Value::text("Pending"), &[]).severity, Severity::Error);

        rule.case_sensitive = true;
        assert_eq!(check_type(&rule, &Value::text("OPEN"), &[]).severity, Severity::Error);
    }

    #[test]
    fn test_typed_cells_are_checked_without_parsing() {
        let rule = type_rule(ExpectedType::Integer, true);
        assert_eq!(check_type(&rule, &Value::Number(2.5), &[]).severity, Severity::Error);
        assert_eq!(check_type(&rule, &Value::Boolean(true), &[]).severity, Severity::Error);
        let date_rule = type_rule(ExpectedType::Date, true);
        let d = Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(check_type(&date_rule, &d, &[]).severity, Severity::Pass);
    }

    #[test]
    fn test_range_boundaries_are_inclusive() {
        let rule = range_rule(Some(Bound::Number(0.0)), Some(Bound::Number(100.0)));
        let check = |v: Value| check_range(&rule, &v, 0.0, &[]).severity;
        assert_eq!(check(Value::Number(0.0)), Severity::Pass);
        assert_eq!(check(Value::Number(100.0)), Severity::Pass);
        assert_eq!(check(Value::Number(100.5)), Severity::Error);
        assert_eq!(check(Value::text("-1")), Severity::Error);
        assert_eq!(check(Value::text("lots")), Severity::Error);
    }

    #[test]
    fn test_range_tolerance_band_warns() {
        let rule = range_rule(Some(Bound::Number(0.0)), Some(Bound::Number(100.0)));
        assert_eq!(check_range(&rule, &Value::Number(98.0), 5.0, &[]).severity, Severity::Warning);
        assert_eq!(check_range(&rule, &Value::Number(50.0), 5.0, &[]).severity, Severity::Pass);
    }

    #[test]
    fn test_date_range() {
        let min = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rule = range_rule(Some(Bound::Date(min)), None);
        assert_eq!(check_range(&rule, &Value::text("2023-12-31"), 0.0, &[]).severity, Severity::Error);
        assert_eq!(check_range(&rule, &Value::text("2024-01-03"), 3.0, &[]).severity, Severity::Warning);
        assert_eq!(check_range(&rule, &Value::text("2024-06-01"), 3.0, &[]).severity, Severity::Pass);
    }

    #[test]
    fn test_pattern_tiers() {
        let rule = PatternRule {
            name: None,
            column: "sku".into(),
            pattern: r"[A-Z]{3}-\d{3}".into(),
            allow_null: true,
            case_sensitive: false,
            whitespace_sensitive: false,
        };
        let matcher = PatternMatcher::compile(&rule, "pattern".into()).unwrap();
        assert_eq!(matcher.check(&Value::text("ABC-123")).severity, Severity::Pass);
        assert_eq!(matcher.check(&Value::text(" abc-123 ")).severity, Severity::Warning);
        assert_eq!(matcher.check(&Value::text("ABC-123x")).severity, Severity::Error);
        assert_eq!(matcher.check(&Value::Null).severity, Severity::Pass);
    }

    #[test]
    fn test_reference_lookup_tiers() {
        let keys = [Value::text("C-1"), Value::text("C-2")];
        let index = ReferenceIndex::new(keys.iter(), Sensitivity::NORMALIZED);
        assert_eq!(index.len(), 2);
        assert_eq!(index.check(&Value::text("C-1"), true, "customers").severity, Severity::Pass);
        assert_eq!(index.check(&Value::text("c-2 "), true, "customers").severity, Severity::Warning);
        assert_eq!(index.check(&Value::text("C-9"), true, "customers").severity, Severity::Error);
        assert_eq!(index.check(&Value::Null, false, "customers").severity, Severity::Error);
    }

    #[test]
    fn test_completeness() {
        assert_eq!(check_completeness(&Value::Null).severity, Severity::Error);
        assert_eq!(check_completeness(&Value::text("  ")).severity, Severity::Error);
        assert_eq!(check_completeness(&Value::Number(0.0)).severity, Severity::Pass);
    }
}
