//! SQL values carried by predicates, parameters and result rows

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::Serialize;
use uuid::Uuid;

/// A value that is either inlined into SQL text or bound as a parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Decimal(Decimal),
    Char(char),
    Text(String),
    Uuid(Uuid),
    DateTime(NaiveDateTime),
    Bytes(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the value is a numeric primitive that can be written into SQL
    /// text as a literal.
    ///
    /// Non-finite floats have no literal spelling and are bound instead.
    pub fn is_numeric(&self) -> bool {
        match self {
            Self::Bool(_) | Self::Int(_) | Self::UInt(_) | Self::Decimal(_) => true,
            Self::Float(f) => f.is_finite(),
            _ => false,
        }
    }

    /// Decimal text for numeric values, `None` for anything that must be bound.
    pub fn to_sql_literal(&self) -> Option<String> {
        if !self.is_numeric() {
            return None;
        }

        match self {
            Self::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::UInt(u) => Some(u.to_string()),
            Self::Float(f) => Some(float_literal(*f)),
            Self::Decimal(d) => Some(d.to_string()),
            _ => None,
        }
    }

    /// Length checked against a column's max length: characters for text,
    /// bytes for binary data.
    pub fn length(&self) -> Option<usize> {
        match self {
            Self::Text(s) => Some(s.chars().count()),
            Self::Bytes(b) => Some(b.len()),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::UInt(_) => "unsigned integer",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::Char(_) => "char",
            Self::Text(_) => "text",
            Self::Uuid(_) => "uuid",
            Self::DateTime(_) => "datetime",
            Self::Bytes(_) => "bytes",
        }
    }
}

/// Longest numeric literal SQL Server accepts, in digits.
const MAX_LITERAL_DIGITS: usize = 38;

/// Plain decimal text, or exponent form when the plain text would exceed
/// [`MAX_LITERAL_DIGITS`] (`1e-40` instead of forty zeros).
fn float_literal(f: f64) -> String {
    let plain = f.to_string();
    if plain.chars().filter(char::is_ascii_digit).count() > MAX_LITERAL_DIGITS {
        format!("{f:e}")
    } else {
        plain
    }
}

macro_rules! from_primitive {
    ($variant:ident => $($ty:ty),+) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )+
    };
}

from_primitive!(Int => i8, i16, i32, i64);
from_primitive!(UInt => u8, u16, u32, u64);
from_primitive!(Float => f32, f64);
from_primitive!(Bool => bool);
from_primitive!(Char => char);
from_primitive!(Text => String, &str);
from_primitive!(Decimal => Decimal);
from_primitive!(Uuid => Uuid);
from_primitive!(DateTime => NaiveDateTime);
from_primitive!(Bytes => Vec<u8>);

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        Self::Text(v.clone())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// Conversion from a result-row value back into an entity field type.
pub trait FromSqlValue: Sized {
    /// Name used in conversion errors.
    const EXPECTED: &'static str;

    fn from_sql_value(value: &SqlValue) -> Option<Self>;
}

macro_rules! from_sql_integer {
    ($($ty:ty),+) => {
        $(
            impl FromSqlValue for $ty {
                const EXPECTED: &'static str = stringify!($ty);

                fn from_sql_value(value: &SqlValue) -> Option<Self> {
                    match value {
                        SqlValue::Int(i) => <$ty>::try_from(*i).ok(),
                        SqlValue::UInt(u) => <$ty>::try_from(*u).ok(),
                        SqlValue::Bool(b) => Some(<$ty>::from(*b)),
                        SqlValue::Decimal(d) if d.fract().is_zero() => {
                            d.to_i128().and_then(|i| <$ty>::try_from(i).ok())
                        }
                        _ => None,
                    }
                }
            }
        )+
    };
}

from_sql_integer!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromSqlValue for f64 {
    const EXPECTED: &'static str = "f64";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Float(f) => Some(*f),
            SqlValue::Int(i) => Some(*i as f64),
            SqlValue::UInt(u) => Some(*u as f64),
            SqlValue::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }
}

impl FromSqlValue for f32 {
    const EXPECTED: &'static str = "f32";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        f64::from_sql_value(value).map(|f| f as f32)
    }
}

impl FromSqlValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Bool(b) => Some(*b),
            SqlValue::Int(0) | SqlValue::UInt(0) => Some(false),
            SqlValue::Int(1) | SqlValue::UInt(1) => Some(true),
            _ => None,
        }
    }
}

impl FromSqlValue for String {
    const EXPECTED: &'static str = "String";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Char(c) => Some(c.to_string()),
            _ => None,
        }
    }
}

impl FromSqlValue for char {
    const EXPECTED: &'static str = "char";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Char(c) => Some(*c),
            SqlValue::Text(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(c),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl FromSqlValue for Decimal {
    const EXPECTED: &'static str = "Decimal";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Decimal(d) => Some(*d),
            SqlValue::Int(i) => Some(Decimal::from(*i)),
            SqlValue::UInt(u) => Some(Decimal::from(*u)),
            SqlValue::Float(f) => Decimal::from_f64(*f),
            SqlValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl FromSqlValue for Uuid {
    const EXPECTED: &'static str = "Uuid";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Uuid(u) => Some(*u),
            SqlValue::Text(s) => Uuid::parse_str(s).ok(),
            _ => None,
        }
    }
}

impl FromSqlValue for NaiveDateTime {
    const EXPECTED: &'static str = "NaiveDateTime";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::DateTime(dt) => Some(*dt),
            SqlValue::Text(s) => s
                .parse()
                .ok()
                .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok()),
            _ => None,
        }
    }
}

impl FromSqlValue for Vec<u8> {
    const EXPECTED: &'static str = "bytes";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Bytes(b) => Some(b.clone()),
            _ => None,
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Null => Some(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}
