//! Operator tags and their SQL tokens

use serde::Serialize;

use crate::error::CompileError;

/// Operator of a predicate node.
///
/// `Power`, `LeftShift`, `RightShift` and `Coalesce` can appear in a
/// predicate but have no SQL mapping, and `CompareTo` is reserved without a
/// rendering. All of them fail with [`CompileError::NotSupportedOperator`]
/// when rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    AndAlso,
    OrElse,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    BitAnd,
    BitOr,
    BitXor,
    Not,
    Negate,
    StartsWith,
    EndsWith,
    Contains,
    CompareTo,
    Power,
    LeftShift,
    RightShift,
    Coalesce,
}

/// Wildcards wrapped around the right side of a `LIKE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wildcards {
    pub leading: bool,
    pub trailing: bool,
}

impl Operator {
    /// Look up an allow-listed string method by name.
    pub fn from_method(name: &str) -> Option<Self> {
        match name {
            "starts_with" => Some(Self::StartsWith),
            "ends_with" => Some(Self::EndsWith),
            "contains" => Some(Self::Contains),
            "compare_to" => Some(Self::CompareTo),
            _ => None,
        }
    }

    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::GreaterThan
                | Self::GreaterThanOrEqual
                | Self::LessThan
                | Self::LessThanOrEqual
        )
    }

    pub const fn is_logical(self) -> bool {
        matches!(self, Self::AndAlso | Self::OrElse)
    }

    pub const fn is_string_match(self) -> bool {
        matches!(self, Self::StartsWith | Self::EndsWith | Self::Contains)
    }

    /// Where `%` goes for the string-match kinds; `None` for everything else.
    pub const fn wildcards(self) -> Option<Wildcards> {
        match self {
            Self::StartsWith => Some(Wildcards {
                leading: false,
                trailing: true,
            }),
            Self::EndsWith => Some(Wildcards {
                leading: true,
                trailing: false,
            }),
            Self::Contains => Some(Wildcards {
                leading: true,
                trailing: true,
            }),
            _ => None,
        }
    }

    /// SQL token for this operator.
    ///
    /// `Not` is ambiguous between logical and bitwise negation; the caller
    /// passes which one the predicate meant.
    pub fn sql_token(self, is_boolean_not: bool) -> Result<&'static str, CompileError> {
        if self.is_string_match() {
            return Ok("LIKE");
        }

        let token = match self {
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::AndAlso => "AND",
            Self::OrElse => "OR",
            Self::Add => "+",
            Self::Subtract | Self::Negate => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Not if is_boolean_not => "NOT",
            Self::Not => "~",
            _ => return Err(CompileError::NotSupportedOperator(self)),
        };

        Ok(token)
    }
}
