//! Rule set configuration
//!
//! A rule set is a list of rule strings folded into one AST with a single
//! connective. Loaded from JSON, e.g.
//!
//! ```json
//! {
//!     "rules": ["age > 30 AND department == 'Sales'", "salary > 50000 OR experience > 5"],
//!     "connective": "OR",
//!     "on_invalid": "skip"
//! }
//! ```

use crate::error::{ParseError, Result, RuleEngineError};
use crate::record::Record;
use crate::rule::{
    combine, evaluate, evaluate_with_diagnostics, parse, AstNode, ConnectiveKind, Evaluation,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What to do with a rule string that fails to parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidRulePolicy {
    /// Fail the whole rule set
    #[default]
    Abort,
    /// Drop the rule and keep going
    Skip,
}

/// Serialized rule set definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSetConfig {
    pub rules: Vec<String>,
    #[serde(default)]
    pub connective: ConnectiveKind,
    #[serde(default)]
    pub on_invalid: InvalidRulePolicy,
}

/// A rule that was dropped under [`InvalidRulePolicy::Skip`]
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRule {
    pub index: usize,
    pub rule: String,
    pub error: ParseError,
}

/// Compiled rule set ready for evaluation
#[derive(Debug, Clone)]
pub struct RuleSet {
    ast: AstNode,
    skipped: Vec<SkippedRule>,
}

impl RuleSetConfig {
    pub fn new(
        rules: impl IntoIterator<Item = impl Into<String>>,
        connective: ConnectiveKind,
    ) -> Self {
        Self {
            rules: rules.into_iter().map(Into::into).collect(),
            connective,
            on_invalid: InvalidRulePolicy::default(),
        }
    }

    pub fn with_policy(mut self, on_invalid: InvalidRulePolicy) -> Self {
        self.on_invalid = on_invalid;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Parse every rule and fold them into one AST
    pub fn compile(&self) -> Result<RuleSet> {
        let mut asts = Vec::with_capacity(self.rules.len());
        let mut skipped = Vec::new();

        for (index, rule) in self.rules.iter().enumerate() {
            match parse(rule) {
                Ok(ast) => asts.push(ast),
                Err(error) if self.on_invalid == InvalidRulePolicy::Skip => {
                    tracing::warn!(index, rule = %rule, %error, "skipping invalid rule");
                    skipped.push(SkippedRule {
                        index,
                        rule: rule.clone(),
                        error,
                    });
                }
                Err(error) => return Err(error.into()),
            }
        }

        let ast = combine(asts, self.connective)?;
        tracing::debug!(rules = ast.leaf_count(), skipped = skipped.len(), "compiled rule set");

        Ok(RuleSet { ast, skipped })
    }
}

impl RuleSet {
    pub fn ast(&self) -> &AstNode {
        &self.ast
    }

    pub fn skipped(&self) -> &[SkippedRule] {
        &self.skipped
    }

    pub fn evaluate(&self, record: &Record) -> bool {
        evaluate(&self.ast, record)
    }

    pub fn evaluate_with_diagnostics(&self, record: &Record) -> Evaluation {
        evaluate_with_diagnostics(&self.ast, record)
    }
}

/// Rule set slot shared across callers, installed once and read many times
#[derive(Debug, Default)]
pub struct SharedRuleSet {
    inner: RwLock<Option<RuleSet>>,
}

impl SharedRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the installed rule set
    pub fn install(&self, rule_set: RuleSet) {
        *self.inner.write() = Some(rule_set);
    }

    pub fn is_installed(&self) -> bool {
        self.inner.read().is_some()
    }

    /// Evaluate the installed rule set
    ///
    /// # Errors
    /// [`RuleEngineError::RulesNotInitialized`] if nothing was installed
    pub fn evaluate(&self, record: &Record) -> Result<bool> {
        let guard = self.inner.read();
        let rule_set = guard.as_ref().ok_or(RuleEngineError::RulesNotInitialized)?;
        Ok(rule_set.evaluate(record))
    }
}
