//! Abstract Syntax Tree for rule expressions

use serde::{Deserialize, Serialize};
use std::fmt;

/// AST node for rule expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AstNode {
    /// Leaf comparison like `age > 30`
    Comparison(Comparison),
    /// AND / OR joining two sub-rules
    Connective(Connective),
}

/// Single comparison expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub operator: Operator,
    pub field_name: String,
    /// Raw right-hand side, quotes included; typed only at evaluation time
    pub literal: String,
}

/// Binary logical node; owns both children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connective {
    pub kind: ConnectiveKind,
    pub left: Box<AstNode>,
    pub right: Box<AstNode>,
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// Greater than (>)
    Greater,
    /// Less than (<)
    Less,
    /// Equal (==)
    Equal,
    /// Not equal (!=)
    NotEqual,
}

impl Operator {
    /// Scan order used by the parser. `>` and `<` are tried before `==` and `!=`.
    pub const SCAN_ORDER: [Operator; 4] = [
        Operator::Greater,
        Operator::Less,
        Operator::Equal,
        Operator::NotEqual,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Greater => ">",
            Operator::Less => "<",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Logical connective kinds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectiveKind {
    #[default]
    And,
    Or,
}

impl ConnectiveKind {
    pub fn keyword(self) -> &'static str {
        match self {
            ConnectiveKind::And => "AND",
            ConnectiveKind::Or => "OR",
        }
    }

    #[inline]
    pub fn apply(self, left: bool, right: bool) -> bool {
        match self {
            ConnectiveKind::And => left && right,
            ConnectiveKind::Or => left || right,
        }
    }
}

impl fmt::Display for ConnectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl std::str::FromStr for ConnectiveKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(ConnectiveKind::And),
            "OR" => Ok(ConnectiveKind::Or),
            other => Err(format!("Unknown connective: {}", other)),
        }
    }
}

impl AstNode {
    pub fn comparison(
        operator: Operator,
        field_name: impl Into<String>,
        literal: impl Into<String>,
    ) -> Self {
        AstNode::Comparison(Comparison {
            operator,
            field_name: field_name.into(),
            literal: literal.into(),
        })
    }

    pub fn connective(kind: ConnectiveKind, left: AstNode, right: AstNode) -> Self {
        AstNode::Connective(Connective {
            kind,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn and(self, other: AstNode) -> Self {
        AstNode::connective(ConnectiveKind::And, self, other)
    }

    pub fn or(self, other: AstNode) -> Self {
        AstNode::connective(ConnectiveKind::Or, self, other)
    }

    /// Number of comparison leaves
    pub fn leaf_count(&self) -> usize {
        match self {
            AstNode::Comparison(_) => 1,
            AstNode::Connective(c) => c.left.leaf_count() + c.right.leaf_count(),
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            AstNode::Comparison(_) => 1,
            AstNode::Connective(c) => 1 + c.left.depth().max(c.right.depth()),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field_name, self.operator, self.literal)
    }
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AstNode::Comparison(c) => fmt::Display::fmt(c, f),
            AstNode::Connective(c) => write!(f, "({} {} {})", c.left, c.kind, c.right),
        }
    }
}
