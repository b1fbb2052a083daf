//! Rule evaluator
//!
//! Evaluation is total: type mismatches and missing fields make a comparison
//! false and are reported as [`Diagnostic`]s, never as errors.

use crate::record::{Record, Value};
use crate::rule::ast::{AstNode, Comparison, Operator};
use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;

/// Digits with exactly one decimal point on either side of them
static FLOAT_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9]+\.[0-9]*|\.[0-9]+)$").expect("float literal pattern is valid")
});

/// Observable anomaly raised while evaluating a comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Field value and literal have incomparable types
    TypeMismatch {
        field: String,
        left: &'static str,
        right: &'static str,
    },
    /// Referenced field is absent from the record
    MissingField { field: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::TypeMismatch { field, left, right } => write!(
                f,
                "Invalid comparison on '{}' between {} and {}",
                field, left, right
            ),
            Diagnostic::MissingField { field } => write!(f, "Field '{}' not found in record", field),
        }
    }
}

pub type Diagnostics = SmallVec<[Diagnostic; 2]>;

/// Verdict plus the diagnostics collected while reaching it
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub verdict: bool,
    pub diagnostics: Diagnostics,
}

/// Evaluate an AST against a record
pub fn evaluate(ast: &AstNode, record: &Record) -> bool {
    let mut diagnostics = Diagnostics::new();
    eval_node(ast, record, &mut diagnostics)
}

/// Evaluate an AST and keep every diagnostic, in evaluation order
pub fn evaluate_with_diagnostics(ast: &AstNode, record: &Record) -> Evaluation {
    let mut diagnostics = Diagnostics::new();
    let verdict = eval_node(ast, record, &mut diagnostics);
    Evaluation {
        verdict,
        diagnostics,
    }
}

fn eval_node(ast: &AstNode, record: &Record, diagnostics: &mut Diagnostics) -> bool {
    match ast {
        AstNode::Comparison(cond) => eval_comparison(cond, record, diagnostics),
        AstNode::Connective(c) => {
            // Both sides always run so their diagnostics are reported
            let left = eval_node(&c.left, record, diagnostics);
            let right = eval_node(&c.right, record, diagnostics);
            c.kind.apply(left, right)
        }
    }
}

fn eval_comparison(cond: &Comparison, record: &Record, diagnostics: &mut Diagnostics) -> bool {
    let Some(left) = record.get(&cond.field_name) else {
        let diagnostic = Diagnostic::MissingField {
            field: cond.field_name.clone(),
        };
        tracing::warn!(rule = %cond, "{}", diagnostic);
        diagnostics.push(diagnostic);
        return false;
    };

    let right = coerce_literal(&cond.literal);

    match (left, &right) {
        (Value::Integer(l), Value::Integer(r)) => apply_ordering(cond.operator, Some(l.cmp(r))),
        (Value::Integer(l), Value::Float(r)) => {
            apply_ordering(cond.operator, cmp_int_float(*l, *r))
        }
        (Value::Float(l), Value::Integer(r)) => apply_ordering(
            cond.operator,
            cmp_int_float(*r, *l).map(Ordering::reverse),
        ),
        (Value::Float(l), Value::Float(r)) => apply_ordering(cond.operator, l.partial_cmp(r)),
        (Value::String(l), Value::String(r)) => match cond.operator {
            Operator::Equal => l == r,
            Operator::NotEqual => l != r,
            Operator::Greater | Operator::Less => {
                tracing::debug!(rule = %cond, "ordering comparison on strings is not supported");
                false
            }
        },
        (l, r) => {
            let diagnostic = Diagnostic::TypeMismatch {
                field: cond.field_name.clone(),
                left: l.type_name(),
                right: r.type_name(),
            };
            tracing::warn!(rule = %cond, "{}", diagnostic);
            diagnostics.push(diagnostic);
            false
        }
    }
}

/// `None` means unordered (NaN): only `!=` holds
#[inline]
fn apply_ordering(operator: Operator, ordering: Option<Ordering>) -> bool {
    match operator {
        Operator::Greater => ordering == Some(Ordering::Greater),
        Operator::Less => ordering == Some(Ordering::Less),
        Operator::Equal => ordering == Some(Ordering::Equal),
        Operator::NotEqual => ordering != Some(Ordering::Equal),
    }
}

/// 2^63 as f64; every i64 is strictly below it
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

/// Exact ordering of an integer against a float, without widening the
/// integer to f64
fn cmp_int_float(int: i64, float: f64) -> Option<Ordering> {
    if float.is_nan() {
        return None;
    }
    if float >= I64_UPPER {
        return Some(Ordering::Less);
    }
    if float < -I64_UPPER {
        return Some(Ordering::Greater);
    }

    // In range, so the integral part converts to i64 exactly
    let whole = float.trunc();
    let ordering = int.cmp(&(whole as i64)).then_with(|| {
        let fraction = float - whole;
        if fraction > 0.0 {
            Ordering::Less
        } else if fraction < 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    });
    Some(ordering)
}

/// Strip one matching pair of enclosing quotes
fn unquote(literal: &str) -> &str {
    let bytes = literal.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'\'' || first == b'"') && bytes[bytes.len() - 1] == first {
            return &literal[1..literal.len() - 1];
        }
    }
    literal
}

/// Turn a raw literal into a typed value
///
/// Order matters: an all-digit literal is an integer before the float pattern
/// is tried, and anything else stays a string. Quoted numbers are still numbers.
pub fn coerce_literal(literal: &str) -> Value {
    let text = unquote(literal);

    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        return match text.parse::<i64>() {
            Ok(i) => Value::Integer(i),
            // Too large for i64. The rounded float is still >= 2^63, so it
            // orders correctly against every integer field.
            Err(_) => text
                .parse::<f64>()
                .map(Value::Float)
                .unwrap_or_else(|_| Value::String(text.to_string())),
        };
    }

    if FLOAT_LITERAL.is_match(text) {
        if let Ok(f) = text.parse::<f64>() {
            return Value::Float(f);
        }
    }

    Value::String(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::parser::parse;

    fn sales_record() -> Record {
        Record::new()
            .with("age", 35)
            .with("department", "Sales")
            .with("salary", 60000)
            .with("experience", 3)
    }

    #[test]
    fn test_coerce_literal() {
        assert_eq!(coerce_literal("30"), Value::Integer(30));
        assert_eq!(coerce_literal("'30'"), Value::Integer(30));
        assert_eq!(coerce_literal("5.5"), Value::Float(5.5));
        assert_eq!(coerce_literal("5."), Value::Float(5.0));
        assert_eq!(coerce_literal(".5"), Value::Float(0.5));
        assert_eq!(coerce_literal("'Sales'"), Value::String("Sales".into()));
        assert_eq!(coerce_literal("\"Sales\""), Value::String("Sales".into()));
        assert_eq!(coerce_literal("1.2.3"), Value::String("1.2.3".into()));
        assert_eq!(coerce_literal("-5"), Value::String("-5".into()));
        assert_eq!(coerce_literal("."), Value::String(".".into()));
    }

    #[test]
    fn test_unquote_only_matching_pair() {
        assert_eq!(coerce_literal("'Sales\""), Value::String("'Sales\"".into()));
        assert_eq!(coerce_literal("''x''"), Value::String("'x'".into()));
        assert_eq!(coerce_literal("''"), Value::String(String::new()));
    }

    #[test]
    fn test_coerce_huge_integer_falls_back_to_float() {
        assert_eq!(
            coerce_literal("99999999999999999999"),
            Value::Float(99999999999999999999.0)
        );
    }

    #[test]
    fn test_numeric_comparisons() {
        let record = sales_record();
        assert!(evaluate(&parse("age > 30").unwrap(), &record));
        assert!(!evaluate(&parse("age < 30").unwrap(), &record));
        assert!(evaluate(&parse("age == 35").unwrap(), &record));
        assert!(evaluate(&parse("age != 36").unwrap(), &record));
    }

    #[test]
    fn test_integer_against_float_literal() {
        let record = Record::new().with("score", 6);
        assert!(evaluate(&parse("score > 5.5").unwrap(), &record));
        assert!(!evaluate(&parse("score < 5.5").unwrap(), &record));

        let record = Record::new().with("score", 6.0);
        assert!(evaluate(&parse("score == 6").unwrap(), &record));
    }

    #[test]
    fn test_integer_against_float_is_exact() {
        // 2^53 + 1 has no exact f64 representation
        let record = Record::new().with("x", 9_007_199_254_740_993i64);
        assert!(!evaluate(&parse("x == 9007199254740992.0").unwrap(), &record));
        assert!(evaluate(&parse("x != 9007199254740992.0").unwrap(), &record));
        assert!(evaluate(&parse("x > 9007199254740992.0").unwrap(), &record));

        let record = Record::new().with("x", 9_007_199_254_740_992.0);
        assert!(evaluate(&parse("x < 9007199254740993").unwrap(), &record));
        assert!(!evaluate(&parse("x == 9007199254740993").unwrap(), &record));
    }

    #[test]
    fn test_integer_against_literal_beyond_i64() {
        let record = Record::new().with("x", i64::MAX);
        assert!(evaluate(&parse("x < 9223372036854775808").unwrap(), &record));
        assert!(!evaluate(&parse("x == 9223372036854775808").unwrap(), &record));
        assert!(!evaluate(&parse("x > 99999999999999999999").unwrap(), &record));
    }

    #[test]
    fn test_cmp_int_float() {
        assert_eq!(cmp_int_float(5, 5.0), Some(Ordering::Equal));
        assert_eq!(cmp_int_float(5, 5.5), Some(Ordering::Less));
        assert_eq!(cmp_int_float(6, 5.5), Some(Ordering::Greater));
        assert_eq!(cmp_int_float(-5, -5.5), Some(Ordering::Greater));
        assert_eq!(cmp_int_float(i64::MIN, -I64_UPPER), Some(Ordering::Equal));
        assert_eq!(cmp_int_float(i64::MIN, -1e300), Some(Ordering::Greater));
        assert_eq!(cmp_int_float(0, f64::NAN), None);
    }

    #[test]
    fn test_nan_field_only_satisfies_not_equal() {
        let record = Record::new().with("x", f64::NAN);
        assert!(!evaluate(&parse("x == 1.5").unwrap(), &record));
        assert!(!evaluate(&parse("x > 1").unwrap(), &record));
        assert!(evaluate(&parse("x != 1").unwrap(), &record));
    }

    #[test]
    fn test_string_equality() {
        let record = sales_record();
        assert!(evaluate(&parse("department == 'Sales'").unwrap(), &record));
        assert!(evaluate(&parse("department == \"Sales\"").unwrap(), &record));
        assert!(evaluate(&parse("department != 'Marketing'").unwrap(), &record));
        assert!(!evaluate(&parse("department == 'Marketing'").unwrap(), &record));
        assert!(evaluate(&parse("department == Sales").unwrap(), &record));
    }

    #[test]
    fn test_string_ordering_is_false_without_diagnostic() {
        let record = sales_record();
        let result = evaluate_with_diagnostics(&parse("department > 'A'").unwrap(), &record);
        assert!(!result.verdict);
        assert!(result.diagnostics.is_empty());

        let result = evaluate_with_diagnostics(&parse("department < 'Z'").unwrap(), &record);
        assert!(!result.verdict);
    }

    #[test]
    fn test_type_mismatch() {
        let record = Record::new().with("age", "thirty");
        let result = evaluate_with_diagnostics(&parse("age > 30").unwrap(), &record);
        assert!(!result.verdict);
        assert_eq!(
            result.diagnostics.as_slice(),
            &[Diagnostic::TypeMismatch {
                field: "age".to_string(),
                left: "string",
                right: "integer",
            }]
        );
    }

    #[test]
    fn test_type_mismatch_numeric_field_string_literal() {
        let record = sales_record();
        let result = evaluate_with_diagnostics(&parse("age != 'old'").unwrap(), &record);
        assert!(!result.verdict);
        assert!(matches!(
            result.diagnostics[0],
            Diagnostic::TypeMismatch { left: "integer", right: "string", .. }
        ));
    }

    #[test]
    fn test_missing_field() {
        let record = sales_record();
        let result = evaluate_with_diagnostics(&parse("bonus > 10").unwrap(), &record);
        assert!(!result.verdict);
        assert_eq!(
            result.diagnostics.as_slice(),
            &[Diagnostic::MissingField {
                field: "bonus".to_string()
            }]
        );

        // Not even != is satisfied by a missing field
        assert!(!evaluate(&parse("bonus != 10").unwrap(), &record));
    }

    #[test]
    fn test_and_rule() {
        let ast = parse("age > 30 AND department == 'Sales'").unwrap();
        assert!(evaluate(&ast, &sales_record()));

        let record = Record::new().with("age", 22).with("department", "Marketing");
        assert!(!evaluate(&ast, &record));
    }

    #[test]
    fn test_or_rule() {
        let record = sales_record();
        assert!(evaluate(&parse("salary > 50000 OR experience > 5").unwrap(), &record));
        assert!(!evaluate(&parse("salary > 90000 OR experience > 5").unwrap(), &record));
    }

    #[test]
    fn test_no_short_circuit() {
        // Left side is false, right side is still evaluated and reports
        let record = sales_record();
        let ast = parse("age < 18 AND bonus > 10").unwrap();
        let result = evaluate_with_diagnostics(&ast, &record);
        assert!(!result.verdict);
        assert_eq!(result.diagnostics.len(), 1);

        let ast = parse("age > 18 OR bonus > 10").unwrap();
        let result = evaluate_with_diagnostics(&ast, &record);
        assert!(result.verdict);
        assert_eq!(result.diagnostics.len(), 1);
    }

    #[test]
    fn test_diagnostics_in_evaluation_order() {
        let record = Record::new().with("age", "old");
        let ast = parse("bonus > 1 OR age > 30").unwrap();
        let result = evaluate_with_diagnostics(&ast, &record);
        assert!(matches!(result.diagnostics[0], Diagnostic::MissingField { .. }));
        assert!(matches!(result.diagnostics[1], Diagnostic::TypeMismatch { .. }));
    }

    #[test]
    fn test_repeated_evaluation_is_stable() {
        let ast = parse("age > 30 AND department == 'Sales'").unwrap();
        let record = sales_record();
        let first = evaluate(&ast, &record);
        for _ in 0..10 {
            assert_eq!(evaluate(&ast, &record), first);
        }
    }

    #[test]
    fn test_diagnostic_display() {
        let diagnostic = Diagnostic::TypeMismatch {
            field: "age".to_string(),
            left: "string",
            right: "integer",
        };
        assert_eq!(
            diagnostic.to_string(),
            "Invalid comparison on 'age' between string and integer"
        );
    }
}
