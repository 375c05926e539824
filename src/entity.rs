//! Entity metadata and column resolution
//!
//! These traits are implemented by the `#[derive(Entity)]` macro from
//! `dorm-macros`, which builds a static column registry for each entity in
//! place of runtime reflection.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::marker::PhantomData;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::value::{FromSqlValue, SqlValue};

/// Static type class of a mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FieldType {
    Boolean,
    Integer,
    Float,
    Decimal,
    Text,
    Other,
}

impl FieldType {
    pub const fn is_boolean(self) -> bool {
        matches!(self, Self::Boolean)
    }

    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float | Self::Decimal)
    }
}

/// Column definition generated for each mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Rust field name
    pub field: &'static str,
    /// Column name in the database
    pub name: &'static str,
    pub field_type: FieldType,
    /// Whether the column can be NULL
    pub nullable: bool,
    /// Whether this is the primary key
    pub is_primary_key: bool,
    /// Maximum length for text and binary values
    pub max_length: Option<usize>,
}

/// Metadata about a database entity (table).
///
/// Implemented by `#[derive(Entity)]`.
pub trait DatabaseEntity: Sized + Send + Sync {
    /// The SQL table name (e.g., "people")
    const TABLE_NAME: &'static str;

    /// The primary key column name, if the entity declares one
    const PRIMARY_KEY: Option<&'static str>;

    /// All mapped columns, in declaration order
    fn columns() -> &'static [ColumnDef];

    /// Field values in the same order as [`DatabaseEntity::columns`]
    fn to_values(&self) -> Vec<SqlValue>;

    /// Decode a result row into this entity
    fn from_row(row: &Row) -> Result<Self>;

    /// Find the column mapped to a Rust field
    fn column_for_field(field: &str) -> Option<&'static ColumnDef> {
        Self::columns().iter().find(|c| c.field == field)
    }

    /// Find a column by its database name
    fn column_named(name: &str) -> Option<&'static ColumnDef> {
        Self::columns().iter().find(|c| c.name == name)
    }

    fn column_names() -> Vec<&'static str> {
        Self::columns().iter().map(|c| c.name).collect()
    }
}

/// Resolves a field reference to its declared column name.
pub trait ColumnResolver {
    fn resolve(&self, field: &str) -> Option<&str>;
}

impl<R: ColumnResolver + ?Sized> ColumnResolver for &R {
    fn resolve(&self, field: &str) -> Option<&str> {
        (**self).resolve(field)
    }
}

impl<K, V, S> ColumnResolver for HashMap<K, V, S>
where
    K: Borrow<str> + Hash + Eq,
    V: AsRef<str>,
    S: std::hash::BuildHasher,
{
    fn resolve(&self, field: &str) -> Option<&str> {
        self.get(field).map(AsRef::as_ref)
    }
}

impl<K, V> ColumnResolver for BTreeMap<K, V>
where
    K: Borrow<str> + Ord,
    V: AsRef<str>,
{
    fn resolve(&self, field: &str) -> Option<&str> {
        self.get(field).map(AsRef::as_ref)
    }
}

/// Column registry of an entity, backed by its generated [`ColumnDef`]s.
pub struct EntityColumns<E>(PhantomData<fn() -> E>);

impl<E> EntityColumns<E> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E> Default for EntityColumns<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DatabaseEntity> ColumnResolver for EntityColumns<E> {
    fn resolve(&self, field: &str) -> Option<&str> {
        E::column_for_field(field).map(|c| c.name)
    }
}

/// A result row: column names with their values, in select order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column, builder style
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) {
        self.columns.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    /// Read a column and convert it to a field type.
    pub fn try_get<T: FromSqlValue>(&self, name: &str) -> Result<T> {
        let value = self
            .get(name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))?;

        T::from_sql_value(value).ok_or_else(|| Error::Conversion {
            column: name.to_string(),
            expected: T::EXPECTED,
            found: value.type_name(),
        })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<N: Into<String>, V: Into<SqlValue>> FromIterator<(N, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            columns: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    use crate::Entity;

    #[derive(Entity, Debug, Clone, PartialEq)]
    #[entity(table = "people")]
    struct Person {
        #[primary_key]
        #[column(name = "id")]
        id: i32,
        #[column(name = "fname", max_length = 50)]
        first_name: Option<String>,
        age: i32,
        #[column(skip)]
        cached: Option<String>,
    }

    #[derive(Entity)]
    struct AuditEntry {
        message: String,
    }

    #[test]
    fn test_generated_metadata() {
        assert_eq!(Person::TABLE_NAME, "people");
        assert_eq!(Person::PRIMARY_KEY, Some("id"));
        assert_eq!(Person::column_names(), vec!["id", "fname", "age"]);

        let fname = Person::column_for_field("first_name").unwrap();
        assert_eq!(fname.name, "fname");
        assert_eq!(fname.field_type, FieldType::Text);
        assert!(fname.nullable);
        assert_eq!(fname.max_length, Some(50));

        let age = Person::column_named("age").unwrap();
        assert_eq!(age.field_type, FieldType::Integer);
        assert!(!age.nullable);
        assert!(Person::column_for_field("cached").is_none());
    }

    #[test]
    fn test_default_table_name_is_snake_case() {
        assert_eq!(AuditEntry::TABLE_NAME, "audit_entry");
        assert_eq!(AuditEntry::PRIMARY_KEY, None);
    }

    #[test]
    fn test_entity_columns_resolver() {
        let columns = EntityColumns::<Person>::new();
        assert_eq!(columns.resolve("first_name"), Some("fname"));
        assert_eq!(columns.resolve("age"), Some("age"));
        assert_eq!(columns.resolve("cached"), None);
    }

    #[test]
    fn test_map_resolvers() {
        let hashed: HashMap<&str, &str> = HashMap::from([("first_name", "fname")]);
        assert_eq!(hashed.resolve("first_name"), Some("fname"));

        let ordered: BTreeMap<String, String> =
            BTreeMap::from([("age".to_string(), "age_years".to_string())]);
        assert_eq!(ordered.resolve("age"), Some("age_years"));
        assert_eq!(ordered.resolve("first_name"), None);
    }

    #[test]
    fn test_values_and_row_round_trip() {
        let person = Person {
            id: 4,
            first_name: Some("Paula".into()),
            age: 23,
            cached: None,
        };
        assert_eq!(
            person.to_values(),
            vec![SqlValue::Int(4), SqlValue::Text("Paula".into()), SqlValue::Int(23)]
        );

        let row = Row::new()
            .with("id", 4)
            .with("fname", "Paula")
            .with("age", 23);
        assert_eq!(Person::from_row(&row).unwrap(), person);
    }

    #[test]
    fn test_from_row_errors() {
        let missing = Row::new().with("id", 1).with("fname", SqlValue::Null);
        assert_matches!(Person::from_row(&missing), Err(Error::MissingColumn(c)) if c == "age");

        let wrong_type = Row::new()
            .with("id", 1)
            .with("fname", SqlValue::Null)
            .with("age", "old");
        assert_matches!(
            Person::from_row(&wrong_type),
            Err(Error::Conversion { column, expected: "i32", found: "text" }) if column == "age"
        );
    }
}
