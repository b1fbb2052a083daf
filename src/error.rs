//! Error types for the eligibility rule engine

use thiserror::Error;

/// Failure to turn a rule string into an AST
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// None of the supported comparison operators occurs in the text
    #[error("Invalid condition format: {0}")]
    InvalidCondition(String),

    /// An AND/OR split left one of its operands empty
    #[error("Malformed {connective} connective, empty operand in: {rule}")]
    MalformedConnective { connective: String, rule: String },

    /// Operator found but a side is empty or the operator is doubled (`age >> 30`)
    #[error("Malformed comparison: {0}")]
    MalformedComparison(String),
}

/// Failure to fold several rules into one
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineError {
    #[error("No rules to combine")]
    EmptyInput,

    #[error("Invalid rule in combination at position {index}")]
    NullRule { index: usize },
}

/// Main error type for the eligibility rule engine
#[derive(Error, Debug)]
pub enum RuleEngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Combine(#[from] CombineError),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Rules not initialized. Call init_rules() first.")]
    RulesNotInitialized,
}

#[cfg(feature = "python")]
impl From<RuleEngineError> for pyo3::PyErr {
    fn from(err: RuleEngineError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};

        match err {
            RuleEngineError::Parse(e) => PyValueError::new_err(e.to_string()),
            RuleEngineError::Combine(e) => PyValueError::new_err(e.to_string()),
            RuleEngineError::Config(e) => {
                PyValueError::new_err(format!("Configuration error: {}", e))
            }
            RuleEngineError::Io(e) => PyIOError::new_err(e.to_string()),
            RuleEngineError::InvalidRecord(msg) => {
                PyRuntimeError::new_err(format!("Invalid record: {}", msg))
            }
            RuleEngineError::RulesNotInitialized => {
                PyRuntimeError::new_err("Rules not initialized. Call init_rules() first.")
            }
        }
    }
}

/// Result type alias for the eligibility rule engine
pub type Result<T> = std::result::Result<T, RuleEngineError>;
