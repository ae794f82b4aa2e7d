//! Abstract Syntax Tree (AST) for the expression language
//!
//! The AST mirrors the grammar directly. Literals are stored as [`Tree`]
//! values so the interpreter can hand them out without conversion.

use std::fmt;

use crate::tree::Tree;

/// AST node representing an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Number, string, boolean or null literal
    Literal(Tree),

    /// JSON array literal: `[a, b]`
    Array(Vec<Expr>),

    /// JSON object literal: `{k: v, "k2": v2}`
    Object(Vec<(String, Expr)>),

    /// Root escape: `$`
    Root,

    /// Bare identifier, looked up in the current scope
    Variable(String),

    /// Member access: `target.name`
    Member { target: Box<Expr>, name: String },

    /// Index access: `target[index]`
    Index { target: Box<Expr>, index: Box<Expr> },

    /// Function call: `name(args)`
    Call { name: String, args: CallArgs },

    /// Prefix operator: `-x`, `!x`, `~x`
    Unary {
        operator: UnaryOperator,
        operand: Box<Expr>,
    },

    /// Arithmetic, bitwise and comparison operators
    Binary {
        left: Box<Expr>,
        operator: BinaryOperator,
        right: Box<Expr>,
    },

    /// Short-circuiting operators: `&&`, `||`, `??`
    Logical {
        left: Box<Expr>,
        operator: LogicalOperator,
        right: Box<Expr>,
    },

    /// Ternary: `condition ? then : otherwise`
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },

    /// Pipe: `source |> target`, evaluating `target` with `source` as scope
    Pipe { source: Box<Expr>, target: Box<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallArgs {
    Positional(Vec<Expr>),
    Keyword(Vec<(String, Expr)>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Not,
    BitwiseNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    BitwiseOr,
    BitwiseXor,
    BitwiseAnd,
    BitwiseAndNot,
    ShiftLeft,
    ShiftRight,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Match,
    NotMatch,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
    Coalesce,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Not => "!",
            UnaryOperator::BitwiseNot => "~",
        })
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Power => "**",
            BinaryOperator::BitwiseOr => "|",
            BinaryOperator::BitwiseXor => "^",
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseAndNot => "&^",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::Match => "=~",
            BinaryOperator::NotMatch => "!~",
            BinaryOperator::In => "in",
        })
    }
}
