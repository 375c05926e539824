//! dorm: a small data-access layer that compiles typed predicates to SQL
//!
//! Entities derive their table metadata with `#[derive(Entity)]`. Predicates
//! are built from the generated field handles and compiled into a
//! parameterized WHERE clause:
//!
//! ```rust,ignore
//! use dorm::{Entity, to_where_clause};
//!
//! #[derive(Entity)]
//! #[entity(table = "people")]
//! struct Person {
//!     #[primary_key]
//!     id: i32,
//!     #[column(name = "fname", max_length = 50)]
//!     first_name: Option<String>,
//!     age: i32,
//! }
//!
//! let predicate = Person::FIELDS.age.ge(0).and(Person::FIELDS.age.lt(21));
//! let clause = to_where_clause(Some(&predicate))?.unwrap();
//! assert_eq!(clause.sql, "(([age] >= 0) AND ([age] < 21))");
//! ```

// Lets `#[derive(Entity)]` expand to `::dorm::...` paths inside this crate.
extern crate self as dorm;

pub mod ast;
pub mod compile;
pub mod config;
pub mod entity;
mod error;
pub mod logging;
pub mod operator;
pub mod predicate;
pub mod render;
pub mod service;
pub mod statement;
pub mod value;

pub use ast::{ColumnToken, Operand, SqlExpression};
pub use compile::{PredicateCompiler, compile, to_where_clause};
pub use config::Config;
pub use entity::{ColumnDef, ColumnResolver, DatabaseEntity, EntityColumns, FieldType, Row};
pub use error::{CompileError, Error, Result};
pub use operator::Operator;
pub use predicate::{Expr, Field, FieldRef, Node};
pub use render::{Parameters, RenderContext, WhereClause, render};
pub use service::{Executor, SqlService};
pub use statement::{Command, Statements, stored_procedure};
pub use value::{FromSqlValue, SqlValue};

pub use dorm_macros::Entity;
