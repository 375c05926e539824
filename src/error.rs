//! Error types for predicate compilation and data access

use thiserror::Error;

use crate::operator::Operator;

/// Failure while compiling a predicate or rendering its SQL.
///
/// Every variant describes a problem with the predicate itself. Compilation
/// is deterministic, so retrying the same predicate yields the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A method call with no invocation target, a target that isn't a mapped
    /// column, or a method outside the allow-list.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// An operator with no SQL rendering.
    #[error("{0:?} isn't supported")]
    NotSupportedOperator(Operator),

    /// The column resolver has no column for this field.
    #[error("field `{0}` is not mapped to a column")]
    UnmappedField(String),

    /// The top level of the predicate is a plain value rather than a condition.
    #[error("expression is not a predicate")]
    NotAPredicate,

    #[error("predicate nesting exceeds the maximum depth of {0}")]
    TooDeep(usize),
}

/// Errors raised by statement building and the data-access service.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("{table}.{column}, exceeds max length of {max} (actual length: {actual})")]
    MaxLength {
        table: String,
        column: String,
        max: usize,
        actual: usize,
    },

    #[error("table `{table}` has no column `{column}`")]
    UnknownColumn { table: String, column: String },

    #[error("nothing to update in `{0}`")]
    NothingToUpdate(String),

    #[error("invalid parameter name `{0}`")]
    InvalidParameterName(String),

    #[error("column `{column}`: cannot convert {found} to {expected}")]
    Conversion {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("column `{0}` missing from result row")]
    MissingColumn(String),

    #[error("`{0}` returned no row")]
    EmptyResult(String),

    #[error("command execution failed: {0}")]
    Executor(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
