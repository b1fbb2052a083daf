//! Rule string parser
//!
//! Connectives are found by a plain substring scan: the first `AND` splits the
//! rule, otherwise the first `OR`. The scan ignores quoting and word
//! boundaries, so a field or literal containing `AND`/`OR` (e.g. `BRAND`,
//! `'ORLANDO'`) is split as well.

use crate::error::ParseError;
use crate::rule::ast::{AstNode, ConnectiveKind, Operator};

/// Characters that may not end a field or start a literal; catches `age >> 30`,
/// `age >= 30`, `age =< 3` and `age <> 30`
const OPERATOR_CHARS: [char; 4] = ['>', '<', '=', '!'];

/// Parse a rule string into an AST
pub fn parse(rule: &str) -> Result<AstNode, ParseError> {
    let rule = rule.trim();

    for kind in [ConnectiveKind::And, ConnectiveKind::Or] {
        if let Some((left, right)) = rule.split_once(kind.keyword()) {
            return parse_connective(kind, left, right, rule);
        }
    }

    parse_comparison(rule)
}

fn parse_connective(
    kind: ConnectiveKind,
    left: &str,
    right: &str,
    rule: &str,
) -> Result<AstNode, ParseError> {
    if left.trim().is_empty() || right.trim().is_empty() {
        return Err(ParseError::MalformedConnective {
            connective: kind.keyword().to_string(),
            rule: rule.to_string(),
        });
    }

    let left = parse(left)?;
    let right = parse(right)?;
    Ok(AstNode::connective(kind, left, right))
}

/// Parse a single `field operator literal` comparison
pub fn parse_comparison(condition: &str) -> Result<AstNode, ParseError> {
    let condition = condition.trim();

    // Priority order, not leftmost position
    for operator in Operator::SCAN_ORDER {
        if let Some((field, literal)) = condition.split_once(operator.symbol()) {
            let field = field.trim();
            let literal = literal.trim();

            if field.is_empty()
                || literal.is_empty()
                || field.ends_with(OPERATOR_CHARS)
                || literal.starts_with(OPERATOR_CHARS)
            {
                return Err(ParseError::MalformedComparison(condition.to_string()));
            }

            return Ok(AstNode::comparison(operator, field, literal));
        }
    }

    Err(ParseError::InvalidCondition(condition.to_string()))
}
