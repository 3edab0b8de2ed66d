//! PostgreSQL connector.
//!
//! # Module Structure
//! - `connection`: connect options, TLS mapping and session lifecycle
//!
//! PostgreSQL sessions are bound to one database for their lifetime, so
//! operations that target a database open their session against it instead
//! of switching context on a live session.

mod connection;

#[cfg(test)]
mod tests;

use super::helpers::{
    expect_single_row, filter_system_databases, query_within, quote_double, render_create_table,
    sql_string_list, sqlx_column_value, sqlx_row_to_record, unique_names, with_session,
};
use super::{ConnectorConfig, DatabaseAdapter};
use crate::error::HarborError;
use crate::models::{Connection, Engine, Record};
use crate::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use sqlx::PgConnection;
use sqlx::postgres::PgRow;

pub use connection::ssl_mode_for;

/// Databases PostgreSQL or managed providers create for their own use.
pub const SYSTEM_DATABASES: &[&str] = &[
    "template0",
    "template1",
    "rdsadmin",
    "cloudsqladmin",
    "azure_maintenance",
    "azure_sys",
];

/// Database used for server-level queries when the profile names none.
const MAINTENANCE_DATABASE: &str = "postgres";

/// Base tables visible through the session's search path.
const LIST_TABLES_QUERY: &str = "SELECT DISTINCT table_name::text FROM information_schema.tables \
     WHERE table_type = 'BASE TABLE' \
     AND table_schema::name = ANY (current_schemas(false)) \
     ORDER BY 1";

/// Column list of the table an unqualified name resolves to.
///
/// Only search-path schemas are considered, and the first schema on the path
/// wins, matching how PostgreSQL resolves the name itself.
const DESCRIBE_TABLE_QUERY: &str = r#"
SELECT
    c.table_schema::text AS table_schema,
    string_agg(
        quote_ident(c.column_name::text) || ' ' ||
        CASE
            WHEN c.character_maximum_length IS NOT NULL
            THEN c.data_type::text || '(' || c.character_maximum_length::text || ')'
            ELSE c.data_type::text
        END ||
        CASE WHEN c.is_nullable::text = 'NO' THEN ' NOT NULL' ELSE '' END ||
        COALESCE(' DEFAULT ' || c.column_default::text, ''),
        E',\n  ' ORDER BY c.ordinal_position
    ) AS columns
FROM information_schema.columns c
JOIN information_schema.tables t
  ON t.table_schema = c.table_schema
 AND t.table_name = c.table_name
 AND t.table_type = 'BASE TABLE'
WHERE c.table_name = $1
  AND c.table_schema::name = ANY (current_schemas(false))
GROUP BY c.table_schema
ORDER BY array_position(current_schemas(false), c.table_schema::name)
LIMIT 1
"#;

/// PostgreSQL connector bound to one connection profile
pub struct PostgresAdapter {
    connection: Connection,
    config: ConnectorConfig,
}

impl std::fmt::Debug for PostgresAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresAdapter")
            .field("address", &self.connection.address())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PostgresAdapter {
    /// Binds a connector to `connection`. No network I/O happens here.
    pub fn new(connection: Connection, config: ConnectorConfig) -> Self {
        Self { connection, config }
    }

    fn home_database(&self) -> String {
        self.connection
            .database
            .clone()
            .filter(|db| !db.is_empty())
            .unwrap_or_else(|| MAINTENANCE_DATABASE.to_string())
    }

    /// Opens a session on `database` and runs `op` inside it.
    async fn with_connection<T, F>(&self, database: &str, op: F) -> Result<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T>> + Send,
    {
        let conn = self.open(database).await?;
        with_session(conn, op).await
    }
}

#[async_trait]
impl DatabaseAdapter for PostgresAdapter {
    async fn test_connection(&self) -> Result<()> {
        let limit = self.config.query_timeout;
        self.with_connection(&self.home_database(), move |conn| {
            Box::pin(async move {
                let one: i32 = query_within(limit, "connectivity check", async {
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
        let statement = statement.to_string();
        tracing::debug!("Executing statement on PostgreSQL database '{}'", database);

        self.with_connection(database, move |conn| {
            Box::pin(async move {
                let rows = query_within(limit, "statement", async {
                    sqlx::Executor::fetch_all(&mut *conn, sqlx::raw_sql(&statement))
                        .await
                        .map_err(|e| HarborError::query_failed("statement failed", e))
                })
                .await?;
                Ok(rows
                    .iter()
                    .map(|row| sqlx_row_to_record(row, sqlx_column_value::<PgRow>))
                    .collect::<Vec<Record>>())
            })
        })
        .await
    }

    async fn get_databases(&self) -> Result<Vec<String>> {
        let limit = self.config.query_timeout;
        let query = format!(
            "SELECT datname::text FROM pg_catalog.pg_database \
             WHERE NOT datistemplate AND datallowconn AND datname NOT IN ({}) \
             ORDER BY datname",
            sql_string_list(SYSTEM_DATABASES)
        );

        let names = self
            .with_connection(&self.home_database(), move |conn| {
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
        let names = self
            .with_connection(database, move |conn| {
                Box::pin(async move {
                    query_within(limit, "list tables", async {
                        sqlx::query_scalar::<_, String>(LIST_TABLES_QUERY)
                            .fetch_all(&mut *conn)
                            .await
                            .map_err(|e| HarborError::query_failed("failed to list tables", e))
                    })
                    .await
                })
            })
            .await?;

        Ok(unique_names(names))
    }

    async fn get_table_structure(&self, database: &str, table: &str) -> Result<String> {
        let limit = self.config.query_timeout;
        let table = table.to_string();

        self.with_connection(database, move |conn| {
            Box::pin(async move {
                let rows: Vec<(String, String)> = query_within(limit, "describe table", async {
                    sqlx::query_as(DESCRIBE_TABLE_QUERY)
                        .bind(&table)
                        .fetch_all(&mut *conn)
                        .await
                        .map_err(|e| HarborError::query_failed("failed to describe table", e))
                })
                .await?;

                let (schema, columns) = expect_single_row(&table, rows)?;
                let qualified = format!("{}.{}", quote_double(&schema), quote_double(&table));
                Ok(render_create_table(&qualified, &columns))
            })
        })
        .await
    }

    fn engine(&self) -> Engine {
        Engine::PostgreSQL
    }
}
