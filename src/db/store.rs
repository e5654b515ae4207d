//! Fixture persistence.
//!
//! `FixtureStore` ties the schema registry to a live pool: it creates and
//! drops the fixture schema, inserts rows with their client-side defaults
//! and reads them back as decoded records or typed models.
//!
//! # Architecture
//!
//! Statements are rendered by [`ddl`](crate::db::ddl) and
//! [`dml`](crate::db::dml); the driver submodules below only bind, run and
//! decode. Each submodule provides the same interface adapted to its driver.

use crate::config::DEFAULT_STATEMENT_TIMEOUT_SECS;
use crate::db::dml::{self, Statement};
use crate::db::pool::DbPool;
use crate::db::{ddl, types::RowToJson};
use crate::error::{FixtureError, FixtureResult};
use crate::fixtures::Model;
use crate::models::connection::Dialect;
use crate::models::value::{RowValues, SqlValue};
use crate::registry::SchemaRegistry;
use serde_json::{Map, Value as JsonValue};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info};

/// A decoded record keyed by attribute name.
pub type Record = Map<String, JsonValue>;

/// Result of running a write statement.
#[derive(Debug, Clone, Copy)]
struct WriteOutcome {
    rows_affected: u64,
    generated_key: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct FixtureStore {
    pool: DbPool,
    registry: Arc<SchemaRegistry>,
    statement_timeout: Duration,
}

impl FixtureStore {
    pub fn new(pool: DbPool, registry: Arc<SchemaRegistry>) -> Self {
        Self {
            pool,
            registry,
            statement_timeout: Duration::from_secs(DEFAULT_STATEMENT_TIMEOUT_SECS),
        }
    }

    pub fn with_statement_timeout(mut self, statement_timeout: Duration) -> Self {
        self.statement_timeout = statement_timeout;
        self
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn dialect(&self) -> Dialect {
        self.pool.dialect()
    }

    /// Idle connections in the underlying pool.
    pub fn idle_count(&self) -> FixtureResult<usize> {
        self.pool.idle_count()
    }

    /// Create every fixture table (and PostgreSQL enum type) that does not exist yet.
    pub async fn create_all(&self) -> FixtureResult<()> {
        let statements = ddl::create_statements(&self.registry, self.dialect())?;
        info!(
            dialect = %self.dialect(),
            statements = statements.len(),
            "Creating fixture schema"
        );
        for sql in &statements {
            self.execute_raw(sql).await?;
        }
        Ok(())
    }

    /// Drop every fixture table, referrers first.
    pub async fn drop_all(&self) -> FixtureResult<()> {
        let statements = ddl::drop_statements(&self.registry, self.dialect())?;
        info!(
            dialect = %self.dialect(),
            statements = statements.len(),
            "Dropping fixture schema"
        );
        for sql in &statements {
            self.execute_raw(sql).await?;
        }
        Ok(())
    }

    /// Insert a row after filling its defaults.
    ///
    /// Returns the row as written, keyed by attribute, with the generated
    /// surrogate key filled in.
    pub async fn insert(&self, entity: &str, row: RowValues) -> FixtureResult<RowValues> {
        let definition = self.registry.entity(entity)?;
        let mut prepared = self.registry.prepare_insert(entity, row)?;
        let statement = dml::insert(definition, &prepared, self.dialect())?;
        let returns_key = definition.generated_key().is_some();

        let outcome = self.execute(&statement, returns_key).await?;

        if let Some(key) = definition.generated_key() {
            let missing = prepared.get(&key.attribute).is_none_or(SqlValue::is_null);
            if missing {
                let id = outcome.generated_key.ok_or_else(|| {
                    FixtureError::decode(format!("{} insert returned no generated key", entity))
                })?;
                prepared.set(key.attribute.clone(), id);
            }
        }

        debug!(entity, rows_affected = outcome.rows_affected, "Inserted fixture row");
        Ok(prepared)
    }

    /// Insert a row and read it back as a typed model.
    pub async fn insert_model<T: Model>(&self, row: RowValues) -> FixtureResult<T> {
        let written = self.insert(T::ENTITY, row).await?;
        let definition = self.registry.entity(T::ENTITY)?;

        let mut key = RowValues::new();
        for column in definition.primary_key_columns() {
            let attribute = definition
                .column(column)
                .map(|c| c.attribute.as_str())
                .unwrap_or(column);
            let value = written
                .get(attribute)
                .cloned()
                .ok_or_else(|| FixtureError::unknown_column(T::ENTITY, attribute))?;
            key.set(attribute, value);
        }

        self.fetch::<T>(&key)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| FixtureError::decode(format!("{} row vanished after insert", T::ENTITY)))
    }

    /// All rows of `entity` matching `filter`, decoded and ordered by primary key.
    pub async fn fetch_all(&self, entity: &str, filter: &RowValues) -> FixtureResult<Vec<Record>> {
        let definition = self.registry.entity(entity)?;
        let statement = dml::select(definition, filter, self.dialect())?;
        let raw_rows = self.fetch_maps(&statement).await?;

        raw_rows
            .into_iter()
            .map(|raw| self.registry.decode_record(entity, raw))
            .collect()
    }

    /// Rows matching `filter` deserialized into their model type.
    pub async fn fetch<T: Model>(&self, filter: &RowValues) -> FixtureResult<Vec<T>> {
        self.fetch_all(T::ENTITY, filter)
            .await?
            .into_iter()
            .map(|record| serde_json::from_value(JsonValue::Object(record)).map_err(FixtureError::from))
            .collect()
    }

    /// Delete the rows matching `filter`; returns the number of rows removed
    /// (cascaded deletes are not counted).
    pub async fn delete(&self, entity: &str, filter: &RowValues) -> FixtureResult<u64> {
        let definition = self.registry.entity(entity)?;
        let statement = dml::delete(definition, filter, self.dialect())?;
        Ok(self.execute(&statement, false).await?.rows_affected)
    }

    pub async fn count(&self, entity: &str, filter: &RowValues) -> FixtureResult<i64> {
        let definition = self.registry.entity(entity)?;
        let statement = dml::count(definition, filter, self.dialect())?;
        match &self.pool {
            DbPool::MySql(p) => self.bounded("count", mysql::fetch_count(p, &statement)).await,
            DbPool::Postgres(p) => {
                self.bounded("count", postgres::fetch_count(p, &statement)).await
            }
            DbPool::SQLite(p) => self.bounded("count", sqlite::fetch_count(p, &statement)).await,
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn execute_raw(&self, sql: &str) -> FixtureResult<()> {
        let start = Instant::now();
        debug!(sql = %sql, "Executing schema statement");
        match &self.pool {
            DbPool::MySql(p) => self.bounded("schema statement", mysql::execute_raw(p, sql)).await?,
            DbPool::Postgres(p) => {
                self.bounded("schema statement", postgres::execute_raw(p, sql)).await?
            }
            DbPool::SQLite(p) => {
                self.bounded("schema statement", sqlite::execute_raw(p, sql)).await?
            }
        }
        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Schema statement done");
        Ok(())
    }

    async fn execute(&self, statement: &Statement, returns_key: bool) -> FixtureResult<WriteOutcome> {
        debug!(
            sql = %statement.sql,
            params = statement.params.len(),
            timeout_secs = self.statement_timeout.as_secs(),
            "Executing write statement"
        );
        match &self.pool {
            DbPool::MySql(p) => self.bounded("write statement", mysql::execute(p, statement)).await,
            DbPool::Postgres(p) => {
                self.bounded(
                    "write statement",
                    postgres::execute(p, statement, returns_key),
                )
                .await
            }
            DbPool::SQLite(p) => {
                self.bounded("write statement", sqlite::execute(p, statement)).await
            }
        }
    }

    async fn fetch_maps(&self, statement: &Statement) -> FixtureResult<Vec<Record>> {
        debug!(
            sql = %statement.sql,
            params = statement.params.len(),
            "Executing query"
        );
        match &self.pool {
            DbPool::MySql(p) => self.bounded("query", mysql::fetch_maps(p, statement)).await,
            DbPool::Postgres(p) => self.bounded("query", postgres::fetch_maps(p, statement)).await,
            DbPool::SQLite(p) => self.bounded("query", sqlite::fetch_maps(p, statement)).await,
        }
    }

    /// Run a driver future under the statement timeout. A pool acquire that
    /// times out reports the pool's own acquire timeout.
    async fn bounded<T, F>(&self, operation: &str, future: F) -> FixtureResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match timeout(self.statement_timeout, future).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(sqlx::Error::PoolTimedOut)) => Err(FixtureError::timeout(
                "connection pool acquire",
                self.pool.acquire_timeout().as_secs(),
            )),
            Ok(Err(e)) => Err(FixtureError::from(e)),
            Err(_) => Err(FixtureError::timeout(operation, self.statement_timeout.as_secs())),
        }
    }
}

mod mysql {
    use super::*;
    use crate::db::params::bind_mysql_param;
    use sqlx::{Executor, MySqlPool, Row};

    pub async fn execute_raw(pool: &MySqlPool, sql: &str) -> Result<(), sqlx::Error> {
        pool.execute(sql).await.map(|_| ())
    }

    pub async fn execute(pool: &MySqlPool, statement: &Statement) -> Result<WriteOutcome, sqlx::Error> {
        let mut query = sqlx::query(&statement.sql);
        for param in &statement.params {
            query = bind_mysql_param(query, param);
        }
        let result = query.execute(pool).await?;
        let generated = result.last_insert_id();
        Ok(WriteOutcome {
            rows_affected: result.rows_affected(),
            generated_key: (generated > 0).then_some(generated as i64),
        })
    }

    pub async fn fetch_maps(pool: &MySqlPool, statement: &Statement) -> Result<Vec<Record>, sqlx::Error> {
        let mut query = sqlx::query(&statement.sql);
        for param in &statement.params {
            query = bind_mysql_param(query, param);
        }
        let rows = query.fetch_all(pool).await?;
        Ok(rows.iter().map(|r| r.to_json_map()).collect())
    }

    pub async fn fetch_count(pool: &MySqlPool, statement: &Statement) -> Result<i64, sqlx::Error> {
        let mut query = sqlx::query(&statement.sql);
        for param in &statement.params {
            query = bind_mysql_param(query, param);
        }
        query.fetch_one(pool).await?.try_get(0)
    }
}

mod postgres {
    use super::*;
    use crate::db::params::bind_postgres_param;
    use sqlx::{Executor, PgPool, Row};

    pub async fn execute_raw(pool: &PgPool, sql: &str) -> Result<(), sqlx::Error> {
        pool.execute(sql).await.map(|_| ())
    }

    pub async fn execute(
        pool: &PgPool,
        statement: &Statement,
        returns_key: bool,
    ) -> Result<WriteOutcome, sqlx::Error> {
        let mut query = sqlx::query(&statement.sql);
        for param in &statement.params {
            query = bind_postgres_param(query, param);
        }
        if returns_key {
            let row = query.fetch_one(pool).await?;
            let id: i64 = row.try_get(0)?;
            Ok(WriteOutcome {
                rows_affected: 1,
                generated_key: Some(id),
            })
        } else {
            let result = query.execute(pool).await?;
            Ok(WriteOutcome {
                rows_affected: result.rows_affected(),
                generated_key: None,
            })
        }
    }

    pub async fn fetch_maps(pool: &PgPool, statement: &Statement) -> Result<Vec<Record>, sqlx::Error> {
        let mut query = sqlx::query(&statement.sql);
        for param in &statement.params {
            query = bind_postgres_param(query, param);
        }
        let rows = query.fetch_all(pool).await?;
        Ok(rows.iter().map(|r| r.to_json_map()).collect())
    }

    pub async fn fetch_count(pool: &PgPool, statement: &Statement) -> Result<i64, sqlx::Error> {
        let mut query = sqlx::query(&statement.sql);
        for param in &statement.params {
            query = bind_postgres_param(query, param);
        }
        query.fetch_one(pool).await?.try_get(0)
    }
}

mod sqlite {
    use super::*;
    use crate::db::params::bind_sqlite_param;
    use sqlx::{Executor, Row, SqlitePool};

    pub async fn execute_raw(pool: &SqlitePool, sql: &str) -> Result<(), sqlx::Error> {
        pool.execute(sql).await.map(|_| ())
    }

    pub async fn execute(pool: &SqlitePool, statement: &Statement) -> Result<WriteOutcome, sqlx::Error> {
        let mut query = sqlx::query(&statement.sql);
        for param in &statement.params {
            query = bind_sqlite_param(query, param);
        }
        let result = query.execute(pool).await?;
        Ok(WriteOutcome {
            rows_affected: result.rows_affected(),
            generated_key: Some(result.last_insert_rowid()),
        })
    }

    pub async fn fetch_maps(pool: &SqlitePool, statement: &Statement) -> Result<Vec<Record>, sqlx::Error> {
        let mut query = sqlx::query(&statement.sql);
        for param in &statement.params {
            query = bind_sqlite_param(query, param);
        }
        let rows = query.fetch_all(pool).await?;
        Ok(rows.iter().map(|r| r.to_json_map()).collect())
    }

    pub async fn fetch_count(pool: &SqlitePool, statement: &Statement) -> Result<i64, sqlx::Error> {
        let mut query = sqlx::query(&statement.sql);
        for param in &statement.params {
            query = bind_sqlite_param(query, param);
        }
        query.fetch_one(pool).await?.try_get(0)
    }
}
