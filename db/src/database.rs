//! Query executors
//!
//! [`Database`] wraps a [`DatabaseConfig`] built once at process start and
//! runs each statement over its own short-lived connection: open, one
//! round-trip, close. There is no pool and no connection reuse; the
//! database itself is the only shared state between calls, so a `Database`
//! is freely cloneable and shareable.

use sqlx::postgres::{PgArguments, PgConnection, Postgres};
use sqlx::query::Query;
use sqlx::Connection;

use dal_shared::DatabaseConfig;

use crate::connection::establish_connection;
use crate::error::DbError;
use crate::params::{expand_named, SqlParam, SqlParams};
use crate::row::{Row, SqlValue};

/// Handle for running parameterized statements against one database.
#[derive(Debug, Clone)]
pub struct Database {
    config: DatabaseConfig,
}

impl Database {
    /// Create a handle from an explicit configuration.
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    /// Create a handle from environment variables.
    ///
    /// See [`DatabaseConfig::from_env`] for the variables consulted.
    pub fn from_env() -> Self {
        Self::new(DatabaseConfig::from_env())
    }

    /// The configuration this handle was built with.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Run a read statement and fetch every matching row.
    ///
    /// Returns an empty `Vec` when nothing matches. Driver-level statement
    /// errors (syntax, constraint, type) surface as [`DbError::Query`].
    ///
    /// # Example
    /// ```no_run
    /// use dal_db::{Database, SqlParams};
    ///
    /// async fn list_users(db: &Database) -> Result<(), dal_db::DbError> {
    ///     let rows = db
    ///         .execute_select(
    ///             "SELECT id, name FROM users WHERE name = :name",
    ///             &SqlParams::new().with("name", "Ann"),
    ///         )
    ///         .await?;
    ///     for row in &rows {
    ///         println!("{:?}", row.get("id"));
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub async fn execute_select(
        &self,
        statement: &str,
        params: &SqlParams,
    ) -> Result<Vec<Row>, DbError> {
        let (sql, values) = expand_named(statement, params)?;
        tracing::debug!("Executing select with {} bound parameters", values.len());

        let mut conn = establish_connection(&self.config).await?;
        let result = fetch_all_rows(&mut conn, &sql, &values).await;
        conn.close().await.ok();
        result
    }

    /// Run a read statement and fetch at most one row.
    ///
    /// Returns `None` when nothing matches; never an error for an empty
    /// result.
    pub async fn execute_select_one(
        &self,
        statement: &str,
        params: &SqlParams,
    ) -> Result<Option<Row>, DbError> {
        let (sql, values) = expand_named(statement, params)?;
        tracing::debug!("Executing select-one with {} bound parameters", values.len());

        let mut conn = establish_connection(&self.config).await?;
        let result = fetch_optional_row(&mut conn, &sql, &values).await;
        conn.close().await.ok();
        result
    }

    /// Run a write (INSERT/UPDATE/DELETE) statement.
    ///
    /// A statement with a `RETURNING` clause yields `Some(row)`; one that
    /// produces no result set yields `None`. Each statement commits
    /// immediately (autocommit) - there is no rollback path once this
    /// returns `Ok`.
    pub async fn execute_dml_statement(
        &self,
        statement: &str,
        params: &SqlParams,
    ) -> Result<Option<Row>, DbError> {
        let (sql, values) = expand_named(statement, params)?;
        tracing::debug!("Executing DML with {} bound parameters", values.len());

        let mut conn = establish_connection(&self.config).await?;
        let result = fetch_optional_row(&mut conn, &sql, &values).await;
        conn.close().await.ok();
        result
    }

    /// Check that the database answers a trivial query.
    pub async fn ping(&self) -> Result<bool, DbError> {
        tracing::debug!("Performing database ping");
        let row = self
            .execute_select_one("SELECT 1 AS ping", &SqlParams::new())
            .await?;
        Ok(matches!(
            row.as_ref().and_then(|r| r.get("ping")),
            Some(SqlValue::Int(1))
        ))
    }
}

async fn fetch_all_rows(
    conn: &mut PgConnection,
    sql: &str,
    values: &[SqlParam],
) -> Result<Vec<Row>, DbError> {
    let mut query = sqlx::query(sql);
    for value in values {
        query = bind_param(query, value);
    }
    let rows = query.fetch_all(&mut *conn).await?;
    rows.iter().map(Row::from_pg).collect()
}

async fn fetch_optional_row(
    conn: &mut PgConnection,
    sql: &str,
    values: &[SqlParam],
) -> Result<Option<Row>, DbError> {
    let mut query = sqlx::query(sql);
    for value in values {
        query = bind_param(query, value);
    }
    let row = query.fetch_optional(&mut *conn).await?;
    row.as_ref().map(Row::from_pg).transpose()
}

fn bind_param<'q>(
    query: Query<'q, Postgres, PgArguments>,
    param: &SqlParam,
) -> Query<'q, Postgres, PgArguments> {
    match param {
        SqlParam::Null => query.bind(None::<String>),
        SqlParam::Bool(v) => query.bind(*v),
        SqlParam::Int(v) => query.bind(*v),
        SqlParam::Float(v) => query.bind(*v),
        SqlParam::Text(v) => query.bind(v.clone()),
        SqlParam::Bytes(v) => query.bind(v.clone()),
        SqlParam::Uuid(v) => query.bind(*v),
        SqlParam::Timestamp(v) => query.bind(*v),
        SqlParam::Json(v) => query.bind(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_holds_config() {
        let config = DatabaseConfig::new("postgres://localhost/app_test");
        let db = Database::new(config);
        assert_eq!(
            db.config().url.as_deref(),
            Some("postgres://localhost/app_test")
        );
    }

    #[test]
    fn test_handle_is_cloneable() {
        let db = Database::new(DatabaseConfig::default().with_dbname("app"));
        let clone = db.clone();
        assert_eq!(clone.config().dbname.as_deref(), Some("app"));
    }

    #[tokio::test]
    async fn test_bad_placeholder_fails_before_connecting() {
        // Parameter mismatch is caught during expansion, so no connection
        // attempt happens even with an unreachable config.
        let db = Database::new(DatabaseConfig::new("postgres://nowhere.invalid/db"));
        let err = db
            .execute_select("SELECT :missing", &SqlParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Statement(_)));
    }
}
