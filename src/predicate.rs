//! Typed predicate builder
//!
//! Predicates are built from the [`Field`] handles generated by
//! `#[derive(Entity)]` and plain Rust values. Values are bound into the tree
//! when the predicate is built, so a predicate that captures a local variable
//! carries that variable's value at construction time.
//!
//! ```rust,ignore
//! let min_age = 21;
//! let adults = Person::FIELDS.age.ge(min_age).and(Person::FIELDS.first_name.contains("Di"));
//! let not_minor = !Person::FIELDS.age.lt(18);
//! ```

use std::borrow::Cow;
use std::marker::PhantomData;
use std::ops;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::entity::FieldType;
use crate::operator::Operator;
use crate::value::SqlValue;

/// Reference to a mapped field of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub name: &'static str,
    pub field_type: FieldType,
}

/// Untyped predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Binary {
        op: Operator,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// `boolean` records whether the operand's static type is boolean, which
    /// decides between logical and bitwise negation.
    Unary {
        op: Operator,
        operand: Box<Node>,
        boolean: bool,
    },
    Call {
        target: Option<Box<Node>>,
        method: Cow<'static, str>,
        args: Vec<Node>,
    },
    Field(FieldRef),
    Constant(SqlValue),
}

impl Node {
    /// Static type of the value this node produces.
    pub fn static_type(&self) -> FieldType {
        match self {
            Self::Binary { op, left, right } => {
                if op.is_comparison() || op.is_logical() || op.is_string_match() {
                    return FieldType::Boolean;
                }
                match left.static_type() {
                    FieldType::Other => right.static_type(),
                    ty => ty,
                }
            }
            Self::Unary { operand, .. } => operand.static_type(),
            Self::Call { method, .. } => match Operator::from_method(method) {
                Some(Operator::CompareTo) => FieldType::Integer,
                Some(_) => FieldType::Boolean,
                None => FieldType::Other,
            },
            Self::Field(field) => field.field_type,
            Self::Constant(value) => match value {
                SqlValue::Bool(_) => FieldType::Boolean,
                SqlValue::Int(_) | SqlValue::UInt(_) => FieldType::Integer,
                SqlValue::Float(_) => FieldType::Float,
                SqlValue::Decimal(_) => FieldType::Decimal,
                SqlValue::Char(_) | SqlValue::Text(_) => FieldType::Text,
                _ => FieldType::Other,
            },
        }
    }
}

/// Typed handle to a field of entity `E`.
pub struct Field<E> {
    field: FieldRef,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Field<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Field<E> {}

impl<E> std::fmt::Debug for Field<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Field").field(&self.field).finish()
    }
}

impl<E> Field<E> {
    pub const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            field: FieldRef { name, field_type },
            _entity: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.field.name
    }

    pub const fn field_ref(&self) -> FieldRef {
        self.field
    }

    pub fn expr(self) -> Expr<E> {
        Expr::from_node(Node::Field(self.field))
    }
}

/// A predicate (or value expression) over entity `E`.
pub struct Expr<E> {
    node: Node,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Expr<E> {
    fn clone(&self) -> Self {
        Self::from_node(self.node.clone())
    }
}

impl<E> std::fmt::Debug for Expr<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.node.fmt(f)
    }
}

impl<E> Expr<E> {
    pub const fn from_node(node: Node) -> Self {
        Self {
            node,
            _entity: PhantomData,
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn into_node(self) -> Node {
        self.node
    }

    pub fn constant(value: impl Into<SqlValue>) -> Self {
        Self::from_node(Node::Constant(value.into()))
    }

    pub fn null() -> Self {
        Self::constant(SqlValue::Null)
    }

    pub fn is_boolean(&self) -> bool {
        self.node.static_type().is_boolean()
    }

    /// Combine two expressions under a binary operator.
    pub fn binary(self, op: Operator, rhs: impl Into<Expr<E>>) -> Self {
        Self::from_node(Node::Binary {
            op,
            left: Box::new(self.node),
            right: Box::new(rhs.into().node),
        })
    }

    /// A method call. Only `starts_with`, `ends_with`, `contains` and
    /// `compare_to` invoked on a mapped column compile; anything else is
    /// rejected by the compiler.
    pub fn call(
        target: Option<Expr<E>>,
        method: impl Into<Cow<'static, str>>,
        args: impl IntoIterator<Item = Expr<E>>,
    ) -> Self {
        Self::from_node(Node::Call {
            target: target.map(|t| Box::new(t.node)),
            method: method.into(),
            args: args.into_iter().map(|a| a.node).collect(),
        })
    }

    fn method(self, method: &'static str, arg: impl Into<Expr<E>>) -> Self {
        Self::call(Some(self), method, [arg.into()])
    }

    pub fn eq(self, rhs: impl Into<Expr<E>>) -> Self {
        self.binary(Operator::Equal, rhs)
    }

    pub fn ne(self, rhs: impl Into<Expr<E>>) -> Self {
        self.binary(Operator::NotEqual, rhs)
    }

    pub fn gt(self, rhs: impl Into<Expr<E>>) -> Self {
        self.binary(Operator::GreaterThan, rhs)
    }

    pub fn ge(self, rhs: impl Into<Expr<E>>) -> Self {
        self.binary(Operator::GreaterThanOrEqual, rhs)
    }

    pub fn lt(self, rhs: impl Into<Expr<E>>) -> Self {
        self.binary(Operator::LessThan, rhs)
    }

    pub fn le(self, rhs: impl Into<Expr<E>>) -> Self {
        self.binary(Operator::LessThanOrEqual, rhs)
    }

    /// Logical AND
    pub fn and(self, rhs: impl Into<Expr<E>>) -> Self {
        self.binary(Operator::AndAlso, rhs)
    }

    /// Logical OR
    pub fn or(self, rhs: impl Into<Expr<E>>) -> Self {
        self.binary(Operator::OrElse, rhs)
    }

    pub fn starts_with(self, value: impl Into<Expr<E>>) -> Self {
        self.method("starts_with", value)
    }

    pub fn ends_with(self, value: impl Into<Expr<E>>) -> Self {
        self.method("ends_with", value)
    }

    pub fn contains(self, value: impl Into<Expr<E>>) -> Self {
        self.method("contains", value)
    }

    pub fn compare_to(self, value: impl Into<Expr<E>>) -> Self {
        self.method("compare_to", value)
    }
}

macro_rules! field_builders {
    ($($name:ident),+) => {
        impl<E> Field<E> {
            $(
                pub fn $name(self, rhs: impl Into<Expr<E>>) -> Expr<E> {
                    self.expr().$name(rhs)
                }
            )+
        }
    };
}

field_builders!(eq, ne, gt, ge, lt, le, and, or, starts_with, ends_with, contains, compare_to);

impl<E> From<Field<E>> for Expr<E> {
    fn from(field: Field<E>) -> Self {
        field.expr()
    }
}

impl<E> From<SqlValue> for Expr<E> {
    fn from(value: SqlValue) -> Self {
        Self::constant(value)
    }
}

impl<E, T: Into<SqlValue>> From<Option<T>> for Expr<E> {
    fn from(value: Option<T>) -> Self {
        Self::constant(value)
    }
}

macro_rules! constant_from {
    ($($ty:ty),+) => {
        $(
            impl<E> From<$ty> for Expr<E> {
                fn from(value: $ty) -> Self {
                    Self::constant(value)
                }
            }
        )+
    };
}

constant_from!(
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    bool,
    char,
    String,
    &String,
    &str,
    Decimal,
    Uuid,
    NaiveDateTime,
    Vec<u8>
);

impl<E> ops::Not for Expr<E> {
    type Output = Self;

    /// Logical NOT for boolean operands, bitwise complement otherwise.
    fn not(self) -> Self {
        let boolean = self.is_boolean();
        Self::from_node(Node::Unary {
            op: Operator::Not,
            operand: Box::new(self.node),
            boolean,
        })
    }
}

impl<E> ops::Not for Field<E> {
    type Output = Expr<E>;

    fn not(self) -> Expr<E> {
        !self.expr()
    }
}

impl<E> ops::Neg for Expr<E> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::from_node(Node::Unary {
            op: Operator::Negate,
            operand: Box::new(self.node),
            boolean: false,
        })
    }
}

impl<E> ops::Neg for Field<E> {
    type Output = Expr<E>;

    fn neg(self) -> Expr<E> {
        -self.expr()
    }
}

macro_rules! binary_ops {
    ($($trait:ident :: $method:ident => $op:ident),+) => {
        $(
            impl<E, R: Into<Expr<E>>> ops::$trait<R> for Expr<E> {
                type Output = Expr<E>;

                fn $method(self, rhs: R) -> Expr<E> {
                    self.binary(Operator::$op, rhs)
                }
            }

            impl<E, R: Into<Expr<E>>> ops::$trait<R> for Field<E> {
                type Output = Expr<E>;

                fn $method(self, rhs: R) -> Expr<E> {
                    self.expr().binary(Operator::$op, rhs)
                }
            }
        )+
    };
}

binary_ops!(
    Add::add => Add,
    Sub::sub => Subtract,
    Mul::mul => Multiply,
    Div::div => Divide,
    Rem::rem => Modulo,
    BitAnd::bitand => BitAnd,
    BitOr::bitor => BitOr,
    BitXor::bitxor => BitXor
);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Person;

    const AGE: Field<Person> = Field::new("age", FieldType::Integer);
    const FIRST_NAME: Field<Person> = Field::new("first_name", FieldType::Text);
    const ACTIVE: Field<Person> = Field::new("active", FieldType::Boolean);

    #[test]
    fn test_comparison_builds_binary_node() {
        let expr = AGE.eq(9);
        assert_eq!(
            expr.into_node(),
            Node::Binary {
                op: Operator::Equal,
                left: Box::new(Node::Field(AGE.field_ref())),
                right: Box::new(Node::Constant(SqlValue::Int(9))),
            }
        );
    }

    #[test]
    fn test_captured_value_is_bound_at_construction() {
        let mut name = String::from("hello");
        let expr = FIRST_NAME.contains(&name);
        name.push_str(" world");

        let Node::Call { args, .. } = expr.into_node() else {
            panic!("expected a call node");
        };
        assert_eq!(args, vec![Node::Constant(SqlValue::Text("hello".into()))]);
    }

    #[test]
    fn test_not_distinguishes_boolean_from_bitwise() {
        let logical = !AGE.gt(9);
        assert!(matches!(logical.node(), Node::Unary { boolean: true, .. }));

        let bitwise = !AGE.expr();
        assert!(matches!(bitwise.node(), Node::Unary { boolean: false, .. }));

        let flag = !ACTIVE;
        assert!(matches!(flag.node(), Node::Unary { boolean: true, .. }));
    }

    #[test]
    fn test_static_types() {
        assert_eq!((AGE + 1).node().static_type(), FieldType::Integer);
        assert_eq!(FIRST_NAME.starts_with("a").node().static_type(), FieldType::Boolean);
        assert_eq!(FIRST_NAME.compare_to("a").node().static_type(), FieldType::Integer);
        assert_eq!(Expr::<Person>::null().node().static_type(), FieldType::Other);
        assert_eq!((ACTIVE & true).node().static_type(), FieldType::Boolean);
    }

    #[test]
    fn test_generic_call() {
        let expr = Expr::call(Some(FIRST_NAME.expr()), "to_uppercase", []);
        assert_eq!(
            expr.into_node(),
            Node::Call {
                target: Some(Box::new(Node::Field(FIRST_NAME.field_ref()))),
                method: Cow::Borrowed("to_uppercase"),
                args: vec![],
            }
        );
    }
}
