//! Data-access service
//!
//! [`SqlService`] builds commands with [`Statements`] and hands them to an
//! [`Executor`], which owns the connection and runs the SQL.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! let service = SqlService::new(executor).with_config(Config::from_env()?);
//!
//! let first = service
//!     .select(Some(&Person::FIELDS.first_name.eq("Paula")))
//!     .await?;
//!
//! let teens = service
//!     .select_many(Some(10), Some(&Person::FIELDS.age.lt(20)))
//!     .await?;
//!
//! let saved = service.insert(&person).await?;
//! ```

use async_trait::async_trait;
use tracing::debug;

use crate::config::Config;
use crate::entity::{DatabaseEntity, Row};
use crate::error::{Error, Result};
use crate::predicate::Expr;
use crate::statement::{self, Command, Statements};
use crate::value::SqlValue;

/// Runs SQL commands against a database connection.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a command that returns rows.
    async fn query(&self, command: &Command) -> anyhow::Result<Vec<Row>>;

    /// Run a command and return the number of affected rows.
    async fn execute(&self, command: &Command) -> anyhow::Result<u64>;
}

#[async_trait]
impl<X: Executor + ?Sized> Executor for std::sync::Arc<X> {
    async fn query(&self, command: &Command) -> anyhow::Result<Vec<Row>> {
        (**self).query(command).await
    }

    async fn execute(&self, command: &Command) -> anyhow::Result<u64> {
        (**self).execute(command).await
    }
}

/// Entity CRUD over an [`Executor`].
pub struct SqlService<X> {
    executor: X,
    config: Config,
}

impl<X: Executor> SqlService<X> {
    pub fn new(executor: X) -> Self {
        Self {
            executor,
            config: Config::default(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn executor(&self) -> &X {
        &self.executor
    }

    fn statements<E: DatabaseEntity>(&self) -> Statements<E> {
        Statements::new().with_max_depth(self.config.max_predicate_depth)
    }

    async fn query(&self, command: &Command) -> Result<Vec<Row>> {
        debug!(sql = %command.sql, params = command.params.len(), "Executing query");
        self.executor.query(command).await.map_err(Error::Executor)
    }

    async fn execute(&self, command: &Command) -> Result<u64> {
        debug!(sql = %command.sql, params = command.params.len(), "Executing command");
        self.executor.execute(command).await.map_err(Error::Executor)
    }

    /// First row matching `predicate`, if any.
    pub async fn select<E: DatabaseEntity>(&self, predicate: Option<&Expr<E>>) -> Result<Option<E>> {
        let command = self.statements::<E>().select_top(1, predicate)?;
        let rows = self.query(&command).await?;

        rows.first().map(E::from_row).transpose()
    }

    /// Up to `limit` rows matching `predicate`. Without a limit the
    /// configured default applies.
    pub async fn select_many<E: DatabaseEntity>(
        &self,
        limit: Option<usize>,
        predicate: Option<&Expr<E>>,
    ) -> Result<Vec<E>> {
        let limit = limit.unwrap_or(self.config.default_select_limit);
        let command = self.statements::<E>().select_top(limit, predicate)?;
        let rows = self.query(&command).await?;

        rows.iter().map(E::from_row).collect()
    }

    /// Insert an entity and return the stored row, including generated keys.
    pub async fn insert<E: DatabaseEntity>(&self, entity: &E) -> Result<E> {
        let command = self.statements::<E>().insert(entity)?;
        let rows = self.query(&command).await?;

        let row = rows
            .first()
            .ok_or_else(|| Error::EmptyResult(E::TABLE_NAME.to_string()))?;
        E::from_row(row)
    }

    /// Insert several entities. Every command is built, and validated, before
    /// any of them runs.
    pub async fn insert_many<E: DatabaseEntity>(&self, entities: &[E]) -> Result<Vec<E>> {
        let statements = self.statements::<E>();
        let commands = entities
            .iter()
            .map(|entity| statements.insert(entity))
            .collect::<Result<Vec<_>>>()?;

        let mut inserted = Vec::with_capacity(commands.len());
        for command in &commands {
            let rows = self.query(command).await?;
            let row = rows
                .first()
                .ok_or_else(|| Error::EmptyResult(E::TABLE_NAME.to_string()))?;
            inserted.push(E::from_row(row)?);
        }

        debug!(table = E::TABLE_NAME, count = inserted.len(), "Inserted entities");
        Ok(inserted)
    }

    /// Write every non-key column of `entity` to the rows matching `predicate`.
    pub async fn update<E: DatabaseEntity>(
        &self,
        entity: &E,
        predicate: Option<&Expr<E>>,
    ) -> Result<u64> {
        let command = self.statements::<E>().update(entity, predicate)?;
        self.execute(&command).await
    }

    /// Write the named columns to the rows matching `predicate`.
    pub async fn update_columns<E: DatabaseEntity>(
        &self,
        columns: &[(&str, SqlValue)],
        predicate: Option<&Expr<E>>,
    ) -> Result<u64> {
        let command = self.statements::<E>().update_columns(columns, predicate)?;
        self.execute(&command).await
    }

    pub async fn delete<E: DatabaseEntity>(&self, predicate: Option<&Expr<E>>) -> Result<u64> {
        let command = self.statements::<E>().delete(predicate)?;
        self.execute(&command).await
    }

    /// Run a stored procedure and decode its result set.
    pub async fn invoke_stored_procedure<E, S>(
        &self,
        name: &str,
        args: impl IntoIterator<Item = (S, SqlValue)>,
    ) -> Result<Vec<E>>
    where
        E: DatabaseEntity,
        S: AsRef<str>,
    {
        let command = statement::stored_procedure(name, args)?;
        let rows = self.query(&command).await?;

        rows.iter().map(E::from_row).collect()
    }
}
