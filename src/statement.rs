//! SQL command builder for entities
//!
//! Builds complete parameterized commands for a [`DatabaseEntity`]. One
//! [`RenderContext`] is shared by a command's value list and its WHERE
//! clause, so every placeholder in a command is unique.

use std::marker::PhantomData;

use serde::Serialize;

use crate::ast::{quote_identifier, quote_object_name};
use crate::compile::PredicateCompiler;
use crate::entity::{ColumnDef, DatabaseEntity, EntityColumns};
use crate::error::{Error, Result};
use crate::predicate::Expr;
use crate::render::{Parameters, RenderContext};
use crate::value::SqlValue;

/// A SQL command ready for an executor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    pub sql: String,
    pub params: Parameters,
}

impl Command {
    fn new(sql: String, ctx: RenderContext) -> Self {
        Self {
            sql,
            params: ctx.into_parameters(),
        }
    }
}

/// Command builder for entity `E`.
pub struct Statements<E> {
    max_depth: Option<usize>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Default for Statements<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Statements<E> {
    pub const fn new() -> Self {
        Self {
            max_depth: None,
            _entity: PhantomData,
        }
    }

    /// Limit predicate nesting for every command this builder produces.
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl<E: DatabaseEntity> Statements<E> {
    fn table() -> String {
        quote_object_name(E::TABLE_NAME)
    }

    /// `" WHERE <predicate>"`, or an empty string without a predicate.
    fn where_sql(&self, ctx: &mut RenderContext, predicate: Option<&Expr<E>>) -> Result<String> {
        let columns = EntityColumns::<E>::new();
        let compiler = PredicateCompiler::new(&columns).with_max_depth(self.max_depth);

        match compiler.compile(predicate.map(Expr::node))? {
            Some(expr) => Ok(format!(" WHERE {}", ctx.render(&expr)?)),
            None => Ok(String::new()),
        }
    }

    /// `SELECT TOP n` over all mapped columns.
    pub fn select_top(&self, limit: usize, predicate: Option<&Expr<E>>) -> Result<Command> {
        let mut ctx = RenderContext::new();
        let columns = E::columns()
            .iter()
            .map(|c| quote_identifier(c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let where_sql = self.where_sql(&mut ctx, predicate)?;

        let sql = format!("SELECT TOP {limit} {columns} FROM {}{where_sql}", Self::table());
        Ok(Command::new(sql, ctx))
    }

    /// `INSERT` of every non-key column, returning the inserted row.
    pub fn insert(&self, entity: &E) -> Result<Command> {
        let values = writable_values(entity)?;
        let mut ctx = RenderContext::new();

        if values.is_empty() {
            let sql = format!("INSERT INTO {} OUTPUT INSERTED.* DEFAULT VALUES", Self::table());
            return Ok(Command::new(sql, ctx));
        }

        let columns = values
            .iter()
            .map(|(c, _)| quote_identifier(c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = values
            .into_iter()
            .map(|(_, value)| ctx.bind(value))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            "INSERT INTO {} ({columns}) OUTPUT INSERTED.* VALUES ({placeholders})",
            Self::table()
        );
        Ok(Command::new(sql, ctx))
    }

    /// `UPDATE` every non-key column from `entity` on rows matching `predicate`.
    pub fn update(&self, entity: &E, predicate: Option<&Expr<E>>) -> Result<Command> {
        let values = writable_values(entity)?;
        self.update_assignments(values, predicate)
    }

    /// `UPDATE` the named columns on rows matching `predicate`.
    pub fn update_columns(
        &self,
        columns: &[(&str, SqlValue)],
        predicate: Option<&Expr<E>>,
    ) -> Result<Command> {
        let values = columns
            .iter()
            .map(|(name, value)| {
                let column = E::column_named(name).ok_or_else(|| Error::UnknownColumn {
                    table: E::TABLE_NAME.to_string(),
                    column: name.to_string(),
                })?;
                check_length::<E>(column, value)?;
                Ok((column, value.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        self.update_assignments(values, predicate)
    }

    fn update_assignments(
        &self,
        values: Vec<(&'static ColumnDef, SqlValue)>,
        predicate: Option<&Expr<E>>,
    ) -> Result<Command> {
        if values.is_empty() {
            return Err(Error::NothingToUpdate(E::TABLE_NAME.to_string()));
        }

        let mut ctx = RenderContext::new();
        let assignments = values
            .into_iter()
            .map(|(column, value)| format!("{} = {}", quote_identifier(column.name), ctx.bind(value)))
            .collect::<Vec<_>>()
            .join(", ");
        let where_sql = self.where_sql(&mut ctx, predicate)?;

        let sql = format!("UPDATE {} SET {assignments}{where_sql}", Self::table());
        Ok(Command::new(sql, ctx))
    }

    pub fn delete(&self, predicate: Option<&Expr<E>>) -> Result<Command> {
        let mut ctx = RenderContext::new();
        let where_sql = self.where_sql(&mut ctx, predicate)?;

        let sql = format!("DELETE FROM {}{where_sql}", Self::table());
        Ok(Command::new(sql, ctx))
    }
}

/// `EXEC [name] @arg = @param_0, ...`
///
/// Argument names may be given with or without the leading `@`.
pub fn stored_procedure<S: AsRef<str>>(
    name: &str,
    args: impl IntoIterator<Item = (S, SqlValue)>,
) -> Result<Command> {
    let mut ctx = RenderContext::new();
    let mut assignments = Vec::new();

    for (arg, value) in args {
        let arg = arg.as_ref().trim_start_matches('@');
        if arg.is_empty() || !arg.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::InvalidParameterName(arg.to_string()));
        }
        assignments.push(format!("@{arg} = {}", ctx.bind(value)));
    }

    let mut sql = format!("EXEC {}", quote_object_name(name));
    if !assignments.is_empty() {
        sql.push(' ');
        sql.push_str(&assignments.join(", "));
    }
    Ok(Command::new(sql, ctx))
}

/// Non-key columns paired with the entity's values, length-checked.
fn writable_values<E: DatabaseEntity>(entity: &E) -> Result<Vec<(&'static ColumnDef, SqlValue)>> {
    E::columns()
        .iter()
        .zip(entity.to_values())
        .filter(|(column, _)| !column.is_primary_key)
        .map(|(column, value)| {
            check_length::<E>(column, &value)?;
            Ok((column, value))
        })
        .collect()
}

fn check_length<E: DatabaseEntity>(column: &ColumnDef, value: &SqlValue) -> Result<()> {
    if let (Some(max), Some(actual)) = (column.max_length, value.length()) {
        if actual > max {
            return Err(Error::MaxLength {
                table: E::TABLE_NAME.to_string(),
                column: column.name.to_string(),
                max,
                actual,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Entity;
    use crate::error::CompileError;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    #[derive(Entity, Debug, Clone, PartialEq)]
    #[entity(table = "people")]
    struct Person {
        #[primary_key]
        #[column(name = "id")]
        id: i32,
        #[column(name = "fname", max_length = 10)]
        first_name: Option<String>,
        #[column(name = "lname")]
        last_name: Option<String>,
        age: i32,
    }

    #[derive(Entity)]
    #[entity(table = "audit.events")]
    struct Event {
        #[primary_key]
        id: i64,
        message: String,
    }

    #[derive(Entity)]
    struct Counter {
        #[primary_key]
        id: i64,
    }

    fn paula() -> Person {
        Person {
            id: 100,
            first_name: Some("Paula".into()),
            last_name: Some("Podolski".into()),
            age: 23,
        }
    }

    #[test]
    fn test_select_top_with_predicate() {
        let predicate = Person::FIELDS.age.ge(0).and(Person::FIELDS.age.lt(21));
        let command = Statements::<Person>::new()
            .select_top(5, Some(&predicate))
            .unwrap();

        assert_eq!(
            command.sql,
            "SELECT TOP 5 [id], [fname], [lname], [age] FROM [people] WHERE (([age] >= 0) AND ([age] < 21))"
        );
        assert!(command.params.is_empty());
    }

    #[test]
    fn test_select_without_predicate() {
        let command = Statements::<Person>::new().select_top(1, None).unwrap();
        assert_eq!(
            command.sql,
            "SELECT TOP 1 [id], [fname], [lname], [age] FROM [people]"
        );
    }

    #[test]
    fn test_insert_skips_primary_key() {
        let command = Statements::<Person>::new().insert(&paula()).unwrap();

        assert_eq!(
            command.sql,
            "INSERT INTO [people] ([fname], [lname], [age]) OUTPUT INSERTED.* VALUES (@param_0, @param_1, @param_2)"
        );
        assert_eq!(
            command.params.values().cloned().collect::<Vec<_>>(),
            vec![
                SqlValue::from("Paula"),
                SqlValue::from("Podolski"),
                SqlValue::Int(23)
            ]
        );
    }

    #[test]
    fn test_insert_key_only_entity_uses_default_values() {
        let command = Statements::<Counter>::new().insert(&Counter { id: 1 }).unwrap();
        assert_eq!(
            command.sql,
            "INSERT INTO [counter] OUTPUT INSERTED.* DEFAULT VALUES"
        );
    }

    #[test]
    fn test_update_placeholders_do_not_collide() {
        let predicate = Person::FIELDS.first_name.contains("Paula");
        let command = Statements::<Person>::new()
            .update(&paula(), Some(&predicate))
            .unwrap();

        assert_eq!(
            command.sql,
            "UPDATE [people] SET [fname] = @param_0, [lname] = @param_1, [age] = @param_2 \
             WHERE ([fname] LIKE '%' + @param_3 + '%')"
        );
        assert_eq!(command.params.len(), 4);
        assert_eq!(command.params.get("@param_3"), Some(&SqlValue::from("Paula")));
    }

    #[test]
    fn test_update_columns() {
        let predicate = Person::FIELDS.age.ge(0).and(Person::FIELDS.age.lt(21));
        let command = Statements::<Person>::new()
            .update_columns(&[("fname", SqlValue::from("Noobs"))], Some(&predicate))
            .unwrap();

        assert_eq!(
            command.sql,
            "UPDATE [people] SET [fname] = @param_0 WHERE (([age] >= 0) AND ([age] < 21))"
        );
    }

    #[test]
    fn test_update_columns_rejects_unknown_and_empty() {
        let statements = Statements::<Person>::new();
        assert_matches!(
            statements.update_columns(&[("nickname", SqlValue::Null)], None),
            Err(Error::UnknownColumn { column, .. }) if column == "nickname"
        );
        assert_matches!(
            statements.update_columns(&[], None),
            Err(Error::NothingToUpdate(table)) if table == "people"
        );
    }

    #[test]
    fn test_max_length_is_enforced() {
        let mut person = paula();
        person.first_name = Some("Paula".repeat(3));

        assert_matches!(
            Statements::<Person>::new().insert(&person),
            Err(Error::MaxLength { column, max: 10, actual: 15, .. }) if column == "fname"
        );
        assert_matches!(
            Statements::<Person>::new().update_columns(&[("fname", SqlValue::from("x".repeat(11)))], None),
            Err(Error::MaxLength { actual: 11, .. })
        );
    }

    #[test]
    fn test_schema_qualified_table() {
        let command = Statements::<Event>::new().select_top(2, None).unwrap();
        assert_eq!(command.sql, "SELECT TOP 2 [id], [message] FROM [audit].[events]");

        let event = Event {
            id: 0,
            message: "login".into(),
        };
        let command = Statements::<Event>::new().insert(&event).unwrap();
        assert_eq!(
            command.sql,
            "INSERT INTO [audit].[events] ([message]) OUTPUT INSERTED.* VALUES (@param_0)"
        );
    }

    #[test]
    fn test_delete() {
        let predicate = Person::FIELDS.last_name.eq(SqlValue::Null);
        let command = Statements::<Person>::new().delete(Some(&predicate)).unwrap();
        assert_eq!(command.sql, "DELETE FROM [people] WHERE ([lname] = @param_0)");
        assert_eq!(command.params.get("@param_0"), Some(&SqlValue::Null));
    }

    #[test]
    fn test_compile_errors_propagate() {
        let predicate = Person::FIELDS.first_name.compare_to("b").gt(0);
        assert_matches!(
            Statements::<Person>::new().delete(Some(&predicate)),
            Err(Error::Compile(CompileError::NotSupportedOperator(_)))
        );

        let deep = Person::FIELDS.age.gt(1).and(Person::FIELDS.age.lt(9));
        assert_matches!(
            Statements::<Person>::new()
                .with_max_depth(Some(1))
                .select_top(1, Some(&deep)),
            Err(Error::Compile(CompileError::TooDeep(1)))
        );
    }

    #[test]
    fn test_stored_procedure() {
        let command = stored_procedure("select_all", Vec::<(&str, SqlValue)>::new()).unwrap();
        assert_eq!(command.sql, "EXEC [select_all]");

        let command = stored_procedure(
            "people_by_age",
            [("@min", SqlValue::from(18)), ("max", SqlValue::from(65))],
        )
        .unwrap();
        assert_eq!(
            command.sql,
            "EXEC [people_by_age] @min = @param_0, @max = @param_1"
        );

        let command = stored_procedure("dbo.select_all", [("limit", SqlValue::from(5))]).unwrap();
        assert_eq!(command.sql, "EXEC [dbo].[select_all] @limit = @param_0");

        assert_matches!(
            stored_procedure("p", [("bad name", SqlValue::Null)]),
            Err(Error::InvalidParameterName(name)) if name == "bad name"
        );
    }
}
