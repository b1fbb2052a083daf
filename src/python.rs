//! Python bindings (enabled with the `python` feature)

use crate::config::{InvalidRulePolicy, RuleSetConfig, SharedRuleSet};
use crate::error::RuleEngineError;
use crate::record::{Record, Value};
use crate::rule::{self, AstNode, ConnectiveKind};
use once_cell::sync::Lazy;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

// ============================================================================
// Cached Rule Set
// ============================================================================

/// Global rule set installed by `init_rules`
static CACHED_RULES: Lazy<SharedRuleSet> = Lazy::new(SharedRuleSet::new);

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert a Python dict into a record. int, float and str values are accepted.
fn extract_record(dict: &Bound<'_, PyDict>) -> PyResult<Record> {
    let mut record = Record::new();
    for (key, value) in dict.iter() {
        let name: String = key.extract()?;
        let value = Value::from_conversions(
            &name,
            || value.extract::<i64>().ok(),
            || value.extract::<f64>().ok(),
            || value.extract::<String>().ok(),
        )?;
        record.insert(name, value);
    }
    Ok(record)
}

fn parse_connective(connective: &str) -> PyResult<ConnectiveKind> {
    connective.parse().map_err(PyValueError::new_err)
}

// ============================================================================
// Rule class
// ============================================================================

/// Parsed rule
#[pyclass(name = "Rule", module = "eligibility_rules", frozen)]
#[derive(Clone)]
pub struct PyRule {
    ast: AstNode,
}

#[pymethods]
impl PyRule {
    /// Parse a rule string, raising ValueError on malformed input
    #[staticmethod]
    fn parse(rule: &str) -> PyResult<Self> {
        let ast = rule::parse(rule).map_err(RuleEngineError::from)?;
        Ok(Self { ast })
    }

    /// Combine rules left-to-right; None entries raise ValueError
    #[staticmethod]
    #[pyo3(signature = (rules, connective="AND"))]
    fn combine(rules: Vec<Option<PyRule>>, connective: &str) -> PyResult<Self> {
        let kind = parse_connective(connective)?;
        let ast = rule::combine(rules.into_iter().map(|r| r.map(|r| r.ast)), kind)
            .map_err(RuleEngineError::from)?;
        Ok(Self { ast })
    }

    fn evaluate(&self, record: &Bound<'_, PyDict>) -> PyResult<bool> {
        let record = extract_record(record)?;
        Ok(rule::evaluate(&self.ast, &record))
    }

    fn __str__(&self) -> String {
        self.ast.to_string()
    }

    fn __repr__(&self) -> String {
        format!("Rule({})", self.ast)
    }
}

// ============================================================================
// Python Functions
// ============================================================================

/// Compile and cache a rule set (call once at startup)
///
/// Returns the rule strings that were skipped as invalid. With
/// `skip_invalid=False` any invalid rule raises ValueError instead.
#[pyfunction]
#[pyo3(signature = (rules, connective="AND", skip_invalid=false))]
fn init_rules(rules: Vec<String>, connective: &str, skip_invalid: bool) -> PyResult<Vec<String>> {
    let policy = if skip_invalid {
        InvalidRulePolicy::Skip
    } else {
        InvalidRulePolicy::Abort
    };
    let rule_set = RuleSetConfig::new(rules, parse_connective(connective)?)
        .with_policy(policy)
        .compile()?;

    let skipped = rule_set.skipped().iter().map(|s| s.rule.clone()).collect();

    CACHED_RULES.install(rule_set);

    Ok(skipped)
}

#[pyfunction]
fn is_rules_initialized() -> bool {
    CACHED_RULES.is_installed()
}

/// Evaluate the cached rule set against a record
///
/// # Raises
/// RuntimeError if `init_rules` was not called first
#[pyfunction]
fn is_eligible(record: &Bound<'_, PyDict>) -> PyResult<bool> {
    let record = extract_record(record)?;
    Ok(CACHED_RULES.evaluate(&record)?)
}

/// Parse and evaluate a single rule string, using the parse cache
#[pyfunction]
fn check_rule(rule: &str, record: &Bound<'_, PyDict>) -> PyResult<bool> {
    let record = extract_record(record)?;
    Ok(rule::check_rule(rule, &record)?)
}

/// Drop every cached parse used by `check_rule`
#[pyfunction]
fn clear_rule_cache() {
    rule::clear_cache();
}

// ============================================================================
// Python Module Definition
// ============================================================================

#[pymodule]
fn eligibility_rules(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(init_rules, m)?)?;
    m.add_function(wrap_pyfunction!(is_rules_initialized, m)?)?;
    m.add_function(wrap_pyfunction!(is_eligible, m)?)?;
    m.add_function(wrap_pyfunction!(check_rule, m)?)?;
    m.add_function(wrap_pyfunction!(clear_rule_cache, m)?)?;
    m.add_class::<PyRule>()?;
    Ok(())
}
