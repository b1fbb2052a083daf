//! Eligibility Rules - textual rule compiler
//!
//! Rules like `age > 30 AND department == 'Sales'` are parsed into an AST of
//! comparisons and AND/OR connectives, then evaluated against a [`Record`].
//! Optional Python bindings are available behind the `python` feature.
//!
//! ```
//! use eligibility_rules::{evaluate, parse, Record};
//!
//! let rule = parse("age > 30 AND department == 'Sales'").unwrap();
//! let record = Record::new().with("age", 35).with("department", "Sales");
//! assert!(evaluate(&rule, &record));
//! ```

pub mod config;
pub mod error;
pub mod record;
pub mod rule;

#[cfg(feature = "python")]
mod python;

pub use config::{InvalidRulePolicy, RuleSet, RuleSetConfig, SharedRuleSet, SkippedRule};
pub use error::{CombineError, ParseError, Result, RuleEngineError};
pub use record::{Record, Value};
pub use rule::{
    combine, combine_all, evaluate, evaluate_with_diagnostics, parse, AstNode, Comparison,
    Connective, ConnectiveKind, Diagnostic, Evaluation, Operator,
};
