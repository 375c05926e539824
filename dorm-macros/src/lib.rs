//! Procedural macros for dorm
//!
//! This crate provides the derive that maps a struct onto a table:
//!
//! - `#[derive(Entity)]` - Generate table metadata, row conversion and typed field handles

use proc_macro::TokenStream;

mod entity;

/// Derive `dorm::DatabaseEntity` for a struct with named fields.
///
/// # Usage
///
/// ```ignore
/// #[derive(Entity)]
/// #[entity(table = "people")]
/// pub struct Person {
///     #[primary_key]
///     #[column(name = "id")]
///     pub id: i32,
///     #[column(name = "fname", max_length = 50)]
///     pub first_name: Option<String>,
///     pub age: i32,
///     #[column(skip)]
///     pub display_name: Option<String>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[entity(table = "...")]` - table name (defaults to the snake_case struct name)
/// - `#[column(name = "...")]` - column name (defaults to the field name)
/// - `#[column(max_length = N)]` - reject longer text or binary values on write
/// - `#[column(skip)]` - not mapped; filled with `Default::default()` when read
/// - `#[primary_key]` - key column, excluded from INSERT and UPDATE
///
/// # Generated Code
///
/// Besides the `DatabaseEntity` impl, a `PersonFields` struct holding one
/// `dorm::Field<Person>` per mapped field is generated and exposed as
/// `Person::FIELDS`, so predicates read `Person::FIELDS.age.lt(21)`.
#[proc_macro_derive(Entity, attributes(entity, column, primary_key))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity::derive_entity(input.into()).into()
}
