//! MySQL connector.
//!
//! # Module Structure
//! - `connection`: connect options, TLS mapping and session lifecycle
//!
//! Statements target a database by issuing `USE` on the session first, so a
//! single profile serves every database visible to its credentials.

mod connection;


use super::helpers::{
    expect_single_row, filter_system_databases, query_within, quote_backtick, sql_string_list,
    sqlx_column_value, sqlx_row_to_record, with_session,
};
use super::{ConnectorConfig, DatabaseAdapter};
use crate::error::HarborError;
use crate::models::{Connection, Engine, Record};
use crate::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value as JsonValue;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlConnection, Row};
use std::time::Duration;

pub use connection::ssl_mode_for;

/// Schemas MySQL maintains for itself.
pub const SYSTEM_DATABASES: &[&str] = &["information_schema", "mysql", "performance_schema", "sys"];

/// MySQL connector bound to one connection profile
pub struct MySqlAdapter {
    connection: Connection,
    config: ConnectorConfig,
}

impl std::fmt::Debug for MySqlAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlAdapter")
            .field("address", &self.connection.address())
            .field("config", &self.config)
            // Password omitted
            .finish_non_exhaustive()
    }
}

impl MySqlAdapter {
    /// Binds a connector to `connection`. No network I/O happens here.
    pub fn new(connection: Connection, config: ConnectorConfig) -> Self {
        Self { connection, config }
    }

    /// Opens a session on the profile's database and runs `op` inside it.
    async fn with_connection<T, F>(&self, op: F) -> Result<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut MySqlConnection) -> BoxFuture<'c, Result<T>> + Send,
    {
        let conn = self.open().await?;
        with_session(conn, op).await
    }
}

/// Switches the session's default database.
async fn use_database(conn: &mut MySqlConnection, database: &str, limit: Duration) -> Result<()> {
    let statement = format!("USE {}", quote_backtick(database));
    query_within(limit, "switch database", async {
        sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(&statement))
            .await
            .map_err(|e| {
                HarborError::query_failed(format!("failed to switch to database '{}'", database), e)
            })
    })
    .await?;
    Ok(())
}

/// Decodes a MySQL column, reading unsigned integers before the shared types.
fn mysql_column_value(row: &MySqlRow, index: usize) -> JsonValue {
    match row.try_get::<Option<u64>, _>(index) {
        Ok(value) => value.map(JsonValue::from).unwrap_or(JsonValue::Null),
        Err(_) => sqlx_column_value(row, index),
    }
}

/// Reads the `Create Table` column of a `SHOW CREATE TABLE` row.
fn create_table_text(row: &MySqlRow) -> Result<String> {
    if let Ok(text) = row.try_get::<String, _>("Create Table") {
        return Ok(text);
    }
    row.try_get::<Vec<u8>, _>("Create Table")
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|e| HarborError::query_failed("SHOW CREATE TABLE returned no definition", e))
}

#[async_trait]
impl DatabaseAdapter for MySqlAdapter {
    async fn test_connection(&self) -> Result<()> {
        let limit = self.config.query_timeout;
        self.with_connection(move |conn| {
            Box::pin(async move {
                let one: i64 = query_within(limit, "connectivity check", async {
                    sqlx::query_scalar("SELECT 1")
                        .fetch_one(&mut *conn)
                        .await
                        .map_err(|e| HarborError::query_failed("connectivity check", e))
                })
                .await?;

                if one != 1 {
                    return Err(HarborError::query(
                        "connectivity check returned an unexpected result",
                    ));
                }
                Ok(())
            })
        })
        .await
    }

    async fn execute(&self, database: &str, statement: &str) -> Result<Vec<Record>> {
        let limit = self.config.query_timeout;
        let database = database.to_string();
        let statement = statement.to_string();
        tracing::debug!("Executing statement on MySQL database '{}'", database);

        self.with_connection(move |conn| {
            Box::pin(async move {
                use_database(conn, &database, limit).await?;
                let rows = query_within(limit, "statement", async {
                    sqlx::Executor::fetch_all(&mut *conn, sqlx::raw_sql(&statement))
                        .await
                        .map_err(|e| HarborError::query_failed("statement failed", e))
                })
                .await?;
                Ok(rows
                    .iter()
                    .map(|row| sqlx_row_to_record(row, mysql_column_value))
                    .collect::<Vec<Record>>())
            })
        })
        .await
    }

    async fn get_databases(&self) -> Result<Vec<String>> {
        let limit = self.config.query_timeout;
        // Cast to CHAR to avoid VARBINARY type issues in MySQL 8.0+
        let query = format!(
            "SELECT CAST(SCHEMA_NAME AS CHAR) FROM INFORMATION_SCHEMA.SCHEMATA \
             WHERE SCHEMA_NAME NOT IN ({}) ORDER BY SCHEMA_NAME",
            sql_string_list(SYSTEM_DATABASES)
        );

        let names = self
            .with_connection(move |conn| {
                Box::pin(async move {
                    query_within(limit, "list databases", async {
                        sqlx::query_scalar::<_, String>(&query)
                            .fetch_all(&mut *conn)
                            .await
                            .map_err(|e| HarborError::query_failed("failed to list databases", e))
                    })
                    .await
                })
            })
            .await?;

        Ok(filter_system_databases(names, SYSTEM_DATABASES))
    }

    async fn get_tables(&self, database: &str) -> Result<Vec<String>> {
        let limit = self.config.query_timeout;
        let database = database.to_string();

        self.with_connection(move |conn| {
            Box::pin(async move {
                query_within(limit, "list tables", async {
                    sqlx::query_scalar::<_, String>(
                        "SELECT CAST(TABLE_NAME AS CHAR) FROM INFORMATION_SCHEMA.TABLES \
                         WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE' \
                         ORDER BY TABLE_NAME",
                    )
                    .bind(&database)
                    .fetch_all(&mut *conn)
                    .await
                    .map_err(|e| HarborError::query_failed("failed to list tables", e))
                })
                .await
            })
        })
        .await
    }

    async fn get_table_structure(&self, database: &str, table: &str) -> Result<String> {
        let limit = self.config.query_timeout;
        let database = database.to_string();
        let table = table.to_string();

        self.with_connection(move |conn| {
            Box::pin(async move {
                use_database(conn, &database, limit).await?;
                let statement = format!("SHOW CREATE TABLE {}", quote_backtick(&table));
                let rows = query_within(limit, "describe table", async {
                    sqlx::Executor::fetch_all(&mut *conn, sqlx::raw_sql(&statement))
                        .await
                        .map_err(|e| HarborError::query_failed("failed to describe table", e))
                })
                .await?;

                let row = expect_single_row(&table, rows)?;
                create_table_text(&row)
            })
        })
        .await
    }

    fn engine(&self) -> Engine {
        Engine::MySQL
    }
}
