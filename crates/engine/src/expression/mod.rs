//! Expression evaluator — a small typed AST compiled from rule expression
//! strings and interpreted against named fact bindings.
//!
//! ```text
//! employee.YearsOfService >= 1 && employee.YearsOfService < 3
//! ```
//!
//! Parsing happens once, when a workflow is loaded. Evaluation is a pure
//! tree walk: it never mutates the facts and never performs I/O.

mod eval;
mod lexer;
mod parser;
mod value;

use std::fmt;

use thiserror::Error;

use crate::error::EvaluationError;
use crate::facts::FactBindings;

pub use value::Value;

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

/// Syntax error in an expression string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("at offset {position}: {message}")]
pub struct ParseError {
    /// Byte offset into the source string.
    pub position: usize,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

/// Dotted path into the fact graph. The first segment names a binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
        })
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        })
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Rem => "%",
        })
    }
}

/// Expression tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    FieldRef(FieldPath),
    Not(Box<Expr>),
    Negate(Box<Expr>),
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Comparison {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Arithmetic {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn logical(op: LogicalOp, left: Expr, right: Expr) -> Self {
        Expr::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn comparison(op: CompareOp, left: Expr, right: Expr) -> Self {
        Expr::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn arithmetic(op: ArithOp, left: Expr, right: Expr) -> Self {
        Expr::Arithmetic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

// ---------------------------------------------------------------------------
// Compiled expression
// ---------------------------------------------------------------------------

/// A compiled expression: its source text plus the AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    /// Compile an expression string.
    ///
    /// # Errors
    /// [`ParseError`] with the byte offset of the first offending token.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let ast = parser::parse(source)?;
        Ok(Self {
            source: source.to_owned(),
            ast,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Evaluate against the given bindings.
    ///
    /// # Errors
    /// [`EvaluationError::UnresolvedReference`] for paths missing from the
    /// facts, [`EvaluationError::TypeMismatch`] for incompatible operands,
    /// [`EvaluationError::DivisionByZero`] for `/ 0` and `% 0`.
    pub fn evaluate(&self, facts: &FactBindings) -> Result<Value, EvaluationError> {
        eval::evaluate(&self.ast, facts)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
