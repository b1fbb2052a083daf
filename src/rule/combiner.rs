//! Fold several rules into a single AST

use crate::error::CombineError;
use crate::rule::ast::{AstNode, ConnectiveKind};

/// Combine rules left-to-right with one connective
///
/// `[r1, r2, r3]` with AND becomes `((r1 AND r2) AND r3)`. Items may be plain
/// nodes or `Option<AstNode>`, so a failed parse passed through as `None`
/// fails the whole combination with [`CombineError::NullRule`].
pub fn combine<I, R>(rules: I, connective: ConnectiveKind) -> Result<AstNode, CombineError>
where
    I: IntoIterator<Item = R>,
    R: Into<Option<AstNode>>,
{
    let mut rules = rules.into_iter().map(Into::into).enumerate();

    let mut root = match rules.next() {
        None => return Err(CombineError::EmptyInput),
        Some((_, Some(rule))) => rule,
        Some((index, None)) => return Err(CombineError::NullRule { index }),
    };

    for (index, rule) in rules {
        let rule = rule.ok_or(CombineError::NullRule { index })?;
        root = AstNode::connective(connective, root, rule);
    }

    Ok(root)
}

/// Combine rules with the default connective (AND)
pub fn combine_all<I, R>(rules: I) -> Result<AstNode, CombineError>
where
    I: IntoIterator<Item = R>,
    R: Into<Option<AstNode>>,
{
    combine(rules, ConnectiveKind::default())
}
