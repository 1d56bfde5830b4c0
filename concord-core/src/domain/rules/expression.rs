// concord-core/src/domain/rules/expression.rs
//
// Cross-column conditions. The text is parsed with sqlparser's generic dialect so users
// write plain SQL predicates (`end_date >= start_date AND qty BETWEEN 1 AND 10`).

use sqlparser::ast::{BinaryOperator, Expr, UnaryOperator, Value as SqlValue};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::cmp::Ordering;

use crate::domain::dataset::Value;
use crate::domain::dataset::value::{parse_bool, parse_number};
use crate::domain::normalize::Sensitivity;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(String),
    Literal(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl Comparator {
    fn from_sql(op: &BinaryOperator) -> Option<Self> {
        match op {
            BinaryOperator::Eq => Some(Comparator::Eq),
            BinaryOperator::NotEq => Some(Comparator::NotEq),
            BinaryOperator::Lt => Some(Comparator::Lt),
            BinaryOperator::LtEq => Some(Comparator::LtEq),
            BinaryOperator::Gt => Some(Comparator::Gt),
            BinaryOperator::GtEq => Some(Comparator::GtEq),
            _ => None,
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Comparator::Eq => ordering == Ordering::Equal,
            Comparator::NotEq => ordering != Ordering::Equal,
            Comparator::Lt => ordering == Ordering::Less,
            Comparator::LtEq => ordering != Ordering::Greater,
            Comparator::Gt => ordering == Ordering::Greater,
            Comparator::GtEq => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        left: Operand,
        op: Comparator,
        right: Operand,
    },
    Between {
        operand: Operand,
        low: Operand,
        high: Operand,
        negated: bool,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

/// Result of evaluating a condition against one row.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// `normalized` is set when the condition only holds after text normalization.
    Holds { normalized: bool },
    Violated,
    Incomparable(String),
}

/// Read access to the cells of the row under evaluation.
pub trait ColumnLookup {
    fn lookup(&self, column: &str) -> Option<&Value>;
}

/// Evaluation-time options shared by every comparison in a condition.
#[derive(Debug, Clone, Copy)]
pub struct CompareContext<'a> {
    pub sensitivity: Sensitivity,
    pub date_formats: &'a [String],
}

impl Condition {
    pub fn parse(text: &str) -> Result<Self, String> {
        let dialect = GenericDialect {};
        let expr = Parser::new(&dialect)
            .try_with_sql(text)
            .and_then(|mut parser| parser.parse_expr())
            .map_err(|e| e.to_string())?;
        Self::from_expr(&expr)
    }

    fn from_expr(expr: &Expr) -> Result<Self, String> {
        match expr {
            Expr::Nested(inner) => Self::from_expr(inner),
            Expr::BinaryOp { left, op, right } => match op {
                BinaryOperator::And => Ok(Condition::And(
                    Box::new(Self::from_expr(left)?),
                    Box::new(Self::from_expr(right)?),
                )),
                BinaryOperator::Or => Ok(Condition::Or(
                    Box::new(Self::from_expr(left)?),
                    Box::new(Self::from_expr(right)?),
                )),
                other => {
                    let op = Comparator::from_sql(other)
                        .ok_or_else(|| format!("unsupported operator '{}'", other))?;
                    Ok(Condition::Compare {
                        left: operand(left)?,
                        op,
                        right: operand(right)?,
                    })
                }
            },
            Expr::UnaryOp {
                op: UnaryOperator::Not,
                expr,
            } => Ok(Condition::Not(Box::new(Self::from_expr(expr)?))),
            Expr::Between {
                expr,
                negated,
                low,
                high,
            } => Ok(Condition::Between {
                operand: operand(expr)?,
                low: operand(low)?,
                high: operand(high)?,
                negated: *negated,
            }),
            other => Err(format!("'{}' is not a comparison", other)),
        }
    }

    /// Referenced columns, deduplicated, in order of appearance.
    pub fn columns(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut Vec<String>) {
        match self {
            Condition::Compare { left, right, .. } => {
                push_column(left, out);
                push_column(right, out);
            }
            Condition::Between {
                operand, low, high, ..
            } => {
                push_column(operand, out);
                push_column(low, out);
                push_column(high, out);
            }
            Condition::And(a, b) | Condition::Or(a, b) => {
                a.collect_columns(out);
                b.collect_columns(out);
            }
            Condition::Not(inner) => inner.collect_columns(out),
        }
    }

    pub fn evaluate(&self, row: &impl ColumnLookup, ctx: CompareContext<'_>) -> Evaluation {
        match self.tiers(row, ctx) {
            Ok(tiers) => tiers.settle(),
            Err(reason) => Evaluation::Incomparable(reason),
        }
    }

    /// Truth of the condition on raw values and on normalized values, kept apart so
    /// `NOT` can invert each one.
    fn tiers(&self, row: &impl ColumnLookup, ctx: CompareContext<'_>) -> Result<Tiers, String> {
        match self {
            Condition::Compare { left, op, right } => {
                let (exact, normalized) = compare_operands(left, right, row, ctx)?;
                Ok(Tiers {
                    exact: op.holds(exact),
                    normalized: op.holds(normalized),
                })
            }
            Condition::Between {
                operand,
                low,
                high,
                negated,
            } => {
                let (lo_exact, lo_norm) = compare_operands(operand, low, row, ctx)?;
                let (hi_exact, hi_norm) = compare_operands(operand, high, row, ctx)?;
                let within = |lo: Ordering, hi: Ordering| lo != Ordering::Less && hi != Ordering::Greater;
                Ok(Tiers {
                    exact: within(lo_exact, hi_exact) != *negated,
                    normalized: within(lo_norm, hi_norm) != *negated,
                })
            }
            Condition::And(a, b) => {
                let left = a.tiers(row, ctx)?;
                if !left.any() {
                    return Ok(left);
                }
                let right = b.tiers(row, ctx)?;
                Ok(Tiers {
                    exact: left.exact && right.exact,
                    normalized: left.normalized && right.normalized,
                })
            }
            Condition::Or(a, b) => {
                let left = a.tiers(row, ctx);
                if matches!(left, Ok(Tiers { exact: true, .. })) {
                    return left;
                }
                match (left, b.tiers(row, ctx)) {
                    (Ok(l), Ok(r)) => Ok(Tiers {
                        exact: l.exact || r.exact,
                        normalized: l.normalized || r.normalized,
                    }),
                    // A side that holds outweighs an incomparable one.
                    (Err(_), Ok(r)) if r.any() => Ok(r),
                    (Ok(l), Err(_)) if l.any() => Ok(l),
                    (Err(reason), _) | (_, Err(reason)) => Err(reason),
                }
            }
            Condition::Not(inner) => {
                let tiers = inner.tiers(row, ctx)?;
                Ok(Tiers {
                    exact: !tiers.exact,
                    normalized: !tiers.normalized,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tiers {
    exact: bool,
    normalized: bool,
}

impl Tiers {
    fn any(self) -> bool {
        self.exact || self.normalized
    }

    fn settle(self) -> Evaluation {
        match (self.exact, self.normalized) {
            (true, _) => Evaluation::Holds { normalized: false },
            (false, true) => Evaluation::Holds { normalized: true },
            (false, false) => Evaluation::Violated,
        }
    }
}

fn push_column(operand: &Operand, out: &mut Vec<String>) {
    if let Operand::Column(name) = operand
        && !out.contains(name)
    {
        out.push(name.clone());
    }
}

fn operand(expr: &Expr) -> Result<Operand, String> {
    match expr {
        Expr::Identifier(ident) => Ok(Operand::Column(ident.value.clone())),
        Expr::CompoundIdentifier(parts) => Ok(Operand::Column(
            parts
                .iter()
                .map(|p| p.value.as_str())
                .collect::<Vec<_>>()
                .join("."),
        )),
        Expr::Nested(inner) => operand(inner),
        Expr::Value(v) => literal(&v.value),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match operand(expr)? {
            Operand::Literal(Value::Number(n)) => Ok(Operand::Literal(Value::Number(-n))),
            _ => Err(format!("cannot negate '{}'", expr)),
        },
        Expr::UnaryOp {
            op: UnaryOperator::Plus,
            expr,
        } => operand(expr),
        other => Err(format!("'{}' is not a column or a literal", other)),
    }
}

fn literal(value: &SqlValue) -> Result<Operand, String> {
    match value {
        SqlValue::Number(raw, _) => parse_number(raw)
            .map(|n| Operand::Literal(Value::Number(n)))
            .ok_or_else(|| format!("invalid number '{}'", raw)),
        SqlValue::SingleQuotedString(s) => Ok(Operand::Literal(Value::String(s.clone()))),
        SqlValue::Boolean(b) => Ok(Operand::Literal(Value::Boolean(*b))),
        SqlValue::Null => Err("NULL literals are not supported; use a completeness rule".into()),
        other => Err(format!("unsupported literal '{}'", other)),
    }
}

fn resolve<'a>(operand: &'a Operand, row: &'a impl ColumnLookup) -> Option<&'a Value> {
    match operand {
        Operand::Column(name) => row.lookup(name),
        Operand::Literal(value) => Some(value),
    }
}

/// Orders two operands. Returns the exact ordering and the ordering after normalization.
fn compare_operands(
    left: &Operand,
    right: &Operand,
    row: &impl ColumnLookup,
    ctx: CompareContext<'_>,
) -> Result<(Ordering, Ordering), String> {
    let (Some(a), Some(b)) = (resolve(left, row), resolve(right, row)) else {
        return Err("operand column is not available".to_string());
    };
    compare_values(a, b, ctx)
}

pub fn compare_values(
    a: &Value,
    b: &Value,
    ctx: CompareContext<'_>,
) -> Result<(Ordering, Ordering), String> {
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
        return Ok((ord, ord));
    }
    if let (Some(x), Some(y)) = (a.as_date(ctx.date_formats), b.as_date(ctx.date_formats)) {
        let ord = x.cmp(&y);
        return Ok((ord, ord));
    }
    if let (Some(x), Some(y)) = (as_bool(a), as_bool(b))
        && (matches!(a, Value::Boolean(_)) || matches!(b, Value::Boolean(_)))
    {
        let ord = x.cmp(&y);
        return Ok((ord, ord));
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => {
            let exact = x.cmp(y);
            let normalized = ctx
                .sensitivity
                .normalize(x)
                .cmp(&ctx.sensitivity.normalize(y));
            Ok((exact, normalized))
        }
        _ => Err(format!(
            "cannot compare {} '{}' with {} '{}'",
            a.type_name(),
            a,
            b.type_name(),
            b
        )),
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Boolean(b) => Some(*b),
        Value::String(s) => parse_bool(s.trim()),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    struct Row(HashMap<&'static str, Value>);

    impl ColumnLookup for Row {
        fn lookup(&self, column: &str) -> Option<&Value> {
            self.0.get(column)
        }
    }

    fn ctx() -> CompareContext<'static> {
        CompareContext {
            sensitivity: Sensitivity::NORMALIZED,
            date_formats: &[],
        }
    }

    fn row(cells: &[(&'static str, Value)]) -> Row {
        Row(cells.iter().cloned().collect())
    }

    #[test]
    fn test_parse_collects_columns_in_order() {
        let c = Condition::parse("end_date >= start_date AND (qty BETWEEN 1 AND max_qty)").unwrap();
        assert_eq!(c.columns(), vec!["end_date", "start_date", "qty", "max_qty"]);
    }

    #[test]
    fn test_parse_rejects_non_predicates() {
        assert!(Condition::parse("qty + 1").is_err());
        assert!(Condition::parse("qty = NULL").is_err());
        assert!(Condition::parse(">=").is_err());
    }

    #[test]
    fn test_date_comparison_mixes_strings_and_dates() {
        let c = Condition::parse("end_date >= start_date").unwrap();
        let d = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let ok = row(&[("end_date", Value::text("2024-05-02")), ("start_date", Value::Date(d))]);
        let bad = row(&[("end_date", Value::text("2024-04-30")), ("start_date", Value::Date(d))]);
        assert_eq!(c.evaluate(&ok, ctx()), Evaluation::Holds { normalized: false });
        assert_eq!(c.evaluate(&bad, ctx()), Evaluation::Violated);
    }

    #[test]
    fn test_numeric_strings_compare_as_numbers() {
        let c = Condition::parse("shipped <= ordered").unwrap();
        let r = row(&[("shipped", Value::text("9")), ("ordered", Value::text("10"))]);
        assert_eq!(c.evaluate(&r, ctx()), Evaluation::Holds { normalized: false });
    }

    #[test]
    fn test_text_equality_after_normalization_is_flagged() {
        let c = Condition::parse("billing_city = shipping_city").unwrap();
        let r = row(&[
            ("billing_city", Value::text("Paris")),
            ("shipping_city", Value::text("PARIS ")),
        ]);
        assert_eq!(c.evaluate(&r, ctx()), Evaluation::Holds { normalized: true });
    }

    #[test]
    fn test_incomparable_operands() {
        let c = Condition::parse("a > b").unwrap();
        let r = row(&[
            ("a", Value::Number(3.0)),
            ("b", Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())),
        ]);
        assert!(matches!(c.evaluate(&r, ctx()), Evaluation::Incomparable(_)));
    }

    #[test]
    fn test_boolean_logic() {
        let c = Condition::parse("NOT (a > b) OR c = 'yes'").unwrap();
        let r = row(&[
            ("a", Value::Number(5.0)),
            ("b", Value::Number(1.0)),
            ("c", Value::text("no")),
        ]);
        assert_eq!(c.evaluate(&r, ctx()), Evaluation::Violated);

        let negative = Condition::parse("a > -2 AND b NOT BETWEEN 2 AND 4").unwrap();
        assert_eq!(negative.evaluate(&r, ctx()), Evaluation::Holds { normalized: false });
    }

    #[test]
    fn test_negation_agrees_with_not_equal() {
        let r = row(&[("a", Value::text("Paris")), ("b", Value::text("PARIS "))]);
        let not_equal = Condition::parse("a <> b").unwrap().evaluate(&r, ctx());
        let negated = Condition::parse("NOT (a = b)").unwrap().evaluate(&r, ctx());
        assert_eq!(not_equal, Evaluation::Holds { normalized: false });
        assert_eq!(negated, not_equal);

        let same = row(&[("a", Value::text("Paris")), ("b", Value::text("Paris"))]);
        let negated = Condition::parse("NOT (a = b)").unwrap().evaluate(&same, ctx());
        assert_eq!(negated, Evaluation::Violated);
    }

    #[test]
    fn test_negated_normalized_mismatch_warns() {
        let r = row(&[("a", Value::text("Paris")), ("b", Value::text("PARIS "))]);
        let c = Condition::parse("NOT (a <> b)").unwrap();
        assert_eq!(c.evaluate(&r, ctx()), Evaluation::Holds { normalized: true });
    }
}
