//! Predicate compiler: walks a predicate tree and builds the SQL AST
//!
//! Each operand position resolves, in order, to a nested node (binary,
//! unary or allow-listed method call), a mapped column, or a literal value.

use tracing::{debug, warn};

use crate::ast::{ColumnToken, Operand, SqlExpression};
use crate::entity::{ColumnResolver, DatabaseEntity, EntityColumns};
use crate::error::CompileError;
use crate::operator::Operator;
use crate::predicate::{Expr, FieldRef, Node};
use crate::render::WhereClause;
use crate::value::SqlValue;

/// Compiles predicate trees against a column resolver.
pub struct PredicateCompiler<'r, R: ?Sized> {
    resolver: &'r R,
    max_depth: Option<usize>,
}

impl<'r, R: ColumnResolver + ?Sized> PredicateCompiler<'r, R> {
    pub fn new(resolver: &'r R) -> Self {
        Self {
            resolver,
            max_depth: None,
        }
    }

    /// Limit predicate nesting; `None` leaves it unbounded.
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Compile a predicate. Returns `Ok(None)` only when no predicate is given.
    ///
    /// A bare boolean field at the top level compiles as `([col] = 1)`.
    pub fn compile(&self, predicate: Option<&Node>) -> Result<Option<SqlExpression>, CompileError> {
        let Some(node) = predicate else {
            return Ok(None);
        };

        let result = match node {
            Node::Field(field) if field.field_type.is_boolean() => self.is_true(field),
            Node::Field(_) | Node::Constant(_) => Err(CompileError::NotAPredicate),
            _ => self.compile_node(node, 1),
        };

        match result {
            Ok(expr) => {
                debug!(operator = ?expr.operator(), "Compiled predicate");
                Ok(Some(expr))
            }
            Err(e) => {
                warn!(error = %e, "Rejected predicate");
                Err(e)
            }
        }
    }

    fn check_depth(&self, depth: usize) -> Result<(), CompileError> {
        match self.max_depth {
            Some(max) if depth > max => Err(CompileError::TooDeep(max)),
            _ => Ok(()),
        }
    }

    fn compile_node(&self, node: &Node, depth: usize) -> Result<SqlExpression, CompileError> {
        self.check_depth(depth)?;

        match node {
            Node::Binary { op, left, right } if op.is_logical() => Ok(SqlExpression::new(
                self.condition(left, depth)?,
                *op,
                self.condition(right, depth)?,
                false,
            )),
            Node::Binary { op, left, right } => Ok(SqlExpression::new(
                self.operand(left, depth)?,
                *op,
                self.operand(right, depth)?,
                false,
            )),
            Node::Unary {
                op,
                operand,
                boolean,
            } => {
                let operand = if *boolean && *op == Operator::Not {
                    self.condition(operand, depth)?
                } else {
                    self.operand(operand, depth)?
                };
                Ok(SqlExpression::new(Operand::Nothing, *op, operand, *boolean))
            }
            Node::Call {
                target,
                method,
                args,
            } => self.compile_call(target.as_deref(), method, args, depth),
            Node::Field(_) | Node::Constant(_) => Err(CompileError::NotAPredicate),
        }
    }

    /// `target.method(argument)` where the target must be a mapped column and
    /// the method must be one of the allow-listed string methods.
    fn compile_call(
        &self,
        target: Option<&Node>,
        method: &str,
        args: &[Node],
        depth: usize,
    ) -> Result<SqlExpression, CompileError> {
        let Some(target) = target else {
            return Err(CompileError::UnsupportedOperation(format!(
                "`{method}` has no invocation target"
            )));
        };

        let Some(op) = Operator::from_method(method) else {
            return Err(CompileError::UnsupportedOperation(format!(
                "`{method}` isn't a supported method"
            )));
        };

        let Node::Field(field) = target else {
            return Err(CompileError::UnsupportedOperation(format!(
                "`{method}` must be invoked on a mapped column"
            )));
        };

        let [argument] = args else {
            return Err(CompileError::UnsupportedOperation(format!(
                "`{method}` takes one argument, got {}",
                args.len()
            )));
        };

        Ok(SqlExpression::new(
            self.column(field)?,
            op,
            self.operand(argument, depth)?,
            false,
        ))
    }

    /// An operand in a logical position. A bit column isn't a condition in
    /// T-SQL, so a boolean field becomes `([col] = 1)` here.
    fn condition(&self, node: &Node, depth: usize) -> Result<Operand, CompileError> {
        match node {
            Node::Field(field) if field.field_type.is_boolean() => {
                self.check_depth(depth + 1)?;
                Ok(Operand::Node(Box::new(self.is_true(field)?)))
            }
            _ => self.operand(node, depth),
        }
    }

    fn is_true(&self, field: &FieldRef) -> Result<SqlExpression, CompileError> {
        Ok(SqlExpression::new(
            self.column(field)?,
            Operator::Equal,
            Operand::Literal(SqlValue::Bool(true)),
            false,
        ))
    }

    fn operand(&self, node: &Node, depth: usize) -> Result<Operand, CompileError> {
        match node {
            Node::Binary { .. } | Node::Unary { .. } | Node::Call { .. } => Ok(Operand::Node(
                Box::new(self.compile_node(node, depth + 1)?),
            )),
            Node::Field(field) => self.column(field),
            Node::Constant(value) => Ok(Operand::Literal(value.clone())),
        }
    }

    fn column(&self, field: &FieldRef) -> Result<Operand, CompileError> {
        self.resolver
            .resolve(field.name)
            .map(|name| Operand::Column(ColumnToken::new(name)))
            .ok_or_else(|| CompileError::UnmappedField(field.name.to_string()))
    }
}

/// Compile a predicate over `E` using the entity's generated column registry.
pub fn compile<E: DatabaseEntity>(
    predicate: Option<&Expr<E>>,
) -> Result<Option<SqlExpression>, CompileError> {
    PredicateCompiler::new(&EntityColumns::<E>::new()).compile(predicate.map(Expr::node))
}

/// Compile and render a predicate over `E` in one step.
pub fn to_where_clause<E: DatabaseEntity>(
    predicate: Option<&Expr<E>>,
) -> Result<Option<WhereClause>, CompileError> {
    compile(predicate)?.map(|expr| expr.render()).transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::entity::FieldType;
    use crate::predicate::Field;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    struct Person;

    const AGE: Field<Person> = Field::new("age", FieldType::Integer);
    const FIRST_NAME: Field<Person> = Field::new("first_name", FieldType::Text);
    const NICKNAME: Field<Person> = Field::new("nickname", FieldType::Text);
    const ACTIVE: Field<Person> = Field::new("active", FieldType::Boolean);

    fn registry() -> HashMap<&'static str, &'static str> {
        HashMap::from([("age", "age"), ("first_name", "fname"), ("active", "is_active")])
    }

    fn compile_expr(expr: &Expr<Person>) -> Result<Option<SqlExpression>, CompileError> {
        let registry = registry();
        PredicateCompiler::new(&registry).compile(Some(expr.node()))
    }

    #[test]
    fn test_absent_predicate_compiles_to_none() {
        let registry = registry();
        assert_eq!(PredicateCompiler::new(&registry).compile(None), Ok(None));
    }

    #[test]
    fn test_binary_comparison() {
        let expr = compile_expr(&AGE.eq(9)).unwrap().unwrap();
        assert_eq!(expr.left(), &Operand::Column(ColumnToken::new("age")));
        assert_eq!(expr.operator(), Operator::Equal);
        assert_eq!(expr.right(), &Operand::Literal(SqlValue::Int(9)));
        assert!(!expr.is_boolean_not());
    }

    #[test]
    fn test_unary_not_keeps_boolean_flag() {
        let expr = compile_expr(&!AGE.gt(9)).unwrap().unwrap();
        assert_eq!(expr.left(), &Operand::Nothing);
        assert_eq!(expr.operator(), Operator::Not);
        assert!(expr.is_boolean_not());
        assert_matches!(expr.right(), Operand::Node(_));

        let complement = compile_expr(&(!AGE.expr()).eq(0)).unwrap().unwrap();
        let Operand::Node(inner) = complement.left() else {
            panic!("expected nested complement");
        };
        assert!(!inner.is_boolean_not());
    }

    #[test]
    fn test_string_method_on_column() {
        let expr = compile_expr(&FIRST_NAME.starts_with("Di")).unwrap().unwrap();
        assert_eq!(expr.left(), &Operand::Column(ColumnToken::new("fname")));
        assert_eq!(expr.operator(), Operator::StartsWith);
        assert_eq!(expr.right(), &Operand::Literal(SqlValue::from("Di")));
    }

    #[test]
    fn test_call_argument_is_compiled_as_value() {
        let expr = compile_expr(&FIRST_NAME.contains(AGE + 1)).unwrap().unwrap();
        assert_matches!(expr.right(), Operand::Node(inner) if inner.operator() == Operator::Add);
    }

    #[test]
    fn test_call_without_target_is_unsupported() {
        let expr = Expr::<Person>::call(None, "contains", [Expr::constant("x")]);
        assert_matches!(
            compile_expr(&expr),
            Err(CompileError::UnsupportedOperation(msg)) if msg.contains("no invocation target")
        );
    }

    #[test]
    fn test_method_outside_allow_list_is_unsupported() {
        let expr = Expr::call(Some(FIRST_NAME.expr()), "to_uppercase", []).eq("A");
        assert_matches!(
            compile_expr(&expr),
            Err(CompileError::UnsupportedOperation(msg)) if msg.contains("to_uppercase")
        );
    }

    #[test]
    fn test_call_on_non_column_is_unsupported() {
        let expr = Expr::<Person>::constant("abc").contains("b");
        assert_matches!(compile_expr(&expr), Err(CompileError::UnsupportedOperation(_)));
    }

    #[test]
    fn test_call_arity_is_checked() {
        let expr = Expr::call(
            Some(FIRST_NAME.expr()),
            "contains",
            [Expr::constant("a"), Expr::constant("b")],
        );
        assert_matches!(
            compile_expr(&expr),
            Err(CompileError::UnsupportedOperation(msg)) if msg.contains("got 2")
        );
    }

    #[test]
    fn test_compare_to_compiles_but_does_not_render() {
        let expr = compile_expr(&FIRST_NAME.compare_to("b").gt(0)).unwrap().unwrap();
        assert_eq!(
            expr.render(),
            Err(CompileError::NotSupportedOperator(Operator::CompareTo))
        );
    }

    #[test]
    fn test_unmapped_field_fails() {
        assert_eq!(
            compile_expr(&NICKNAME.eq("x")),
            Err(CompileError::UnmappedField("nickname".into()))
        );
    }

    #[test]
    fn test_bare_boolean_field_compares_to_true() {
        let expr = compile_expr(&ACTIVE.expr()).unwrap().unwrap();
        assert_eq!(expr.render().unwrap().sql, "([is_active] = 1)");
    }

    #[test]
    fn test_boolean_field_in_logical_position_compares_to_true() {
        let negated = compile_expr(&!ACTIVE).unwrap().unwrap();
        assert_eq!(negated.render().unwrap().sql, "( NOT ([is_active] = 1))");

        let both = compile_expr(&ACTIVE.and(AGE.gt(9)).or(ACTIVE)).unwrap().unwrap();
        assert_eq!(
            both.render().unwrap().sql,
            "((([is_active] = 1) AND ([age] > 9)) OR ([is_active] = 1))"
        );

        // Comparisons keep the bare column
        let compared = compile_expr(&ACTIVE.eq(false)).unwrap().unwrap();
        assert_eq!(compared.render().unwrap().sql, "([is_active] = 0)");
    }

    #[test]
    fn test_non_predicate_top_level_fails() {
        assert_eq!(compile_expr(&AGE.expr()), Err(CompileError::NotAPredicate));
        assert_eq!(
            compile_expr(&Expr::constant(true)),
            Err(CompileError::NotAPredicate)
        );
    }

    #[test]
    fn test_max_depth() {
        let registry = registry();
        let compiler = PredicateCompiler::new(&registry).with_max_depth(Some(2));

        let shallow = AGE.gt(1).and(AGE.lt(9));
        assert!(compiler.compile(Some(shallow.node())).is_ok());

        let deep = AGE.gt(1).and(AGE.lt(9).or(AGE.eq(20).and(AGE.ne(21))));
        assert_eq!(
            compiler.compile(Some(deep.node())),
            Err(CompileError::TooDeep(2))
        );
    }
}
