//! SQL rendering and parameter binding
//!
//! A [`RenderContext`] owns the placeholder counter and the collected
//! bindings for exactly one render, so concurrent renders never share state.
//!
//! Leaves are classified by their operand kind, never by the shape of their
//! text:
//! - columns render as quoted identifiers
//! - numeric literals render inline as decimal text
//! - rendered subtrees pass through unchanged
//! - every other value is bound to a fresh `@param_N` placeholder

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::ast::{Operand, SqlExpression};
use crate::error::CompileError;
use crate::operator::Operator;
use crate::value::SqlValue;

/// Prefix of generated placeholder names.
pub const PARAMETER_PREFIX: &str = "@param_";

/// Ordered placeholder-name → value bindings. Insertion order is render order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    entries: Vec<(String, SqlValue)>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &SqlValue> {
        self.entries.iter().map(|(_, value)| value)
    }

    fn insert(&mut self, name: String, value: SqlValue) {
        debug_assert!(!self.contains(&name), "duplicate placeholder {name}");
        self.entries.push((name, value));
    }
}

impl IntoIterator for Parameters {
    type Item = (String, SqlValue);
    type IntoIter = std::vec::IntoIter<(String, SqlValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for Parameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A rendered WHERE-clause fragment and its bindings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhereClause {
    pub sql: String,
    pub params: Parameters,
}

/// Call-scoped rendering state: the placeholder counter and the bindings.
///
/// Statement building reuses one context across the SET/VALUES list and the
/// WHERE clause so placeholders stay unique within a command.
#[derive(Debug, Default)]
pub struct RenderContext {
    counter: usize,
    params: Parameters,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value to the next placeholder and return the placeholder name.
    pub fn bind(&mut self, value: SqlValue) -> String {
        let name = format!("{PARAMETER_PREFIX}{}", self.counter);
        self.counter += 1;
        self.params.insert(name.clone(), value);
        name
    }

    /// Render an expression tree. No partial text is returned on error, and
    /// a context that failed a render should be dropped.
    pub fn render(&mut self, expr: &SqlExpression) -> Result<String, CompileError> {
        self.render_node(expr, true)
    }

    pub fn into_parameters(self) -> Parameters {
        self.params
    }

    fn render_node(&mut self, expr: &SqlExpression, root: bool) -> Result<String, CompileError> {
        let operator = expr.operator();
        let token = operator.sql_token(expr.is_boolean_not())?;

        let left = self.render_operand(expr.left())?;

        let (right, lead, trail) = match operator.wildcards() {
            Some(w) => (
                self.render_pattern(expr.right())?,
                if w.leading { "'%' + " } else { "" },
                if w.trailing { " + '%'" } else { "" },
            ),
            None => (self.render_operand(expr.right())?, "", ""),
        };

        let body = format!("{left} {token} {lead}{right}{trail}");

        // Root-level arithmetic reads better bare; nested arithmetic keeps
        // its parentheses so grouping survives.
        if root && matches!(operator, Operator::Add | Operator::Subtract) {
            Ok(body)
        } else {
            Ok(format!("({body})"))
        }
    }

    /// The argument of a LIKE match is concatenated with `'%'`, so a numeric
    /// literal is bound as its text instead of inlined.
    fn render_pattern(&mut self, operand: &Operand) -> Result<String, CompileError> {
        match operand {
            Operand::Literal(value) => Ok(match value.to_sql_literal() {
                Some(literal) => self.bind(SqlValue::Text(literal)),
                None => self.bind(value.clone()),
            }),
            other => self.render_operand(other),
        }
    }

    fn render_operand(&mut self, operand: &Operand) -> Result<String, CompileError> {
        match operand {
            Operand::Nothing => Ok(String::new()),
            Operand::Node(node) => self.render_node(node, false),
            Operand::Column(column) => Ok(column.to_string()),
            Operand::Literal(value) => Ok(match value.to_sql_literal() {
                Some(literal) => literal,
                None => self.bind(value.clone()),
            }),
        }
    }
}

/// Render an expression into SQL text plus a fresh parameter map.
pub fn render(expr: &SqlExpression) -> Result<WhereClause, CompileError> {
    let mut ctx = RenderContext::new();
    let sql = ctx.render(expr)?;

    Ok(WhereClause {
        sql,
        params: ctx.into_parameters(),
    })
}
