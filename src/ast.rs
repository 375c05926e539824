//! SQL AST produced by the predicate compiler
//!
//! The tree is immutable once built: it is constructed by
//! [`PredicateCompiler`](crate::compile::PredicateCompiler) and consumed by
//! [`render`](crate::render::render).

use std::fmt;

use crate::error::CompileError;
use crate::operator::Operator;
use crate::render::{self, WhereClause};
use crate::value::SqlValue;

/// Quote an identifier with brackets, doubling any closing bracket.
pub fn quote_identifier(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Quote a possibly schema-qualified object name part by part:
/// `dbo.people` becomes `[dbo].[people]`.
pub fn quote_object_name(name: &str) -> String {
    name.split('.')
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(".")
}

/// A resolved column. Always rendered as a quoted identifier, never bound.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnToken {
    name: String,
}

impl ColumnToken {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ColumnToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote_identifier(&self.name))
    }
}

/// One side of a [`SqlExpression`].
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Node(Box<SqlExpression>),
    Column(ColumnToken),
    Literal(SqlValue),
    /// The missing left side of a unary operator; renders as nothing.
    Nothing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlExpression {
    left: Operand,
    operator: Operator,
    right: Operand,
    is_boolean_not: bool,
}

impl SqlExpression {
    pub(crate) fn new(left: Operand, operator: Operator, right: Operand, is_boolean_not: bool) -> Self {
        Self {
            left,
            operator,
            right,
            is_boolean_not,
        }
    }

    pub fn left(&self) -> &Operand {
        &self.left
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn right(&self) -> &Operand {
        &self.right
    }

    pub fn is_boolean_not(&self) -> bool {
        self.is_boolean_not
    }

    /// Render to SQL text and its parameter bindings.
    pub fn render(&self) -> Result<WhereClause, CompileError> {
        render::render(self)
    }
}
