//! Database connector trait and factory for uniform database access.
//!
//! Every engine implements the same five operations. The engine is chosen
//! by the connection profile's `engineType` tag and dispatched through the
//! closed [`Connector`] enum.
//!
//! # Module Structure
//! - `config`: connector tuning ([`ConnectorConfig`])
//! - `helpers`: scoped sessions, timeouts, quoting and row conversion
//! - Engine modules (`postgres`, `mysql`, `mssql`), each behind a feature

use crate::{
    Result,
    error::HarborError,
    models::{Connection, Engine, Record},
};
use async_trait::async_trait;

pub mod config;
pub mod helpers;

pub use config::{ConnectorConfig, MAX_TIMEOUT};

#[cfg(not(any(feature = "postgresql", feature = "mysql", feature = "mssql")))]
compile_error!("enable at least one engine feature: postgresql, mysql or mssql");

#[cfg(feature = "postgresql")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "mssql")]
pub mod mssql;

/// Uniform contract implemented by every engine connector.
///
/// # Resource Safety
/// Each call opens its own engine session and closes it before returning,
/// on success and on failure alike. A connector holds no live connection
/// between calls and may be kept or dropped freely.
///
/// # Object Safety
/// This trait is object-safe, allowing `Box<dyn DatabaseAdapter>` or
/// `Arc<dyn DatabaseAdapter>`.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Opens and closes a session to prove the server is reachable and the
    /// credentials are accepted.
    ///
    /// # Errors
    /// Returns a connection error if the server cannot be reached or
    /// authenticated within the connect timeout.
    async fn test_connection(&self) -> Result<()>;

    /// Runs `statement` against `database` and returns its rows in order.
    ///
    /// Column values are materialized as the driver decodes them; the
    /// statement itself is not inspected.
    ///
    /// # Errors
    /// Returns a query error carrying the engine's message on syntax,
    /// permission or runtime failures.
    async fn execute(&self, database: &str, statement: &str) -> Result<Vec<Record>>;

    /// Lists databases visible to the credentials, without system databases.
    async fn get_databases(&self) -> Result<Vec<String>>;

    /// Lists base tables of `database`; views and system objects are excluded.
    async fn get_tables(&self, database: &str) -> Result<Vec<String>>;

    /// Returns the `CREATE TABLE` definition of `table`.
    ///
    /// # Errors
    /// Returns an integrity error unless introspection yields exactly one row.
    async fn get_table_structure(&self, database: &str, table: &str) -> Result<String>;

    /// Engine this connector talks to.
    fn engine(&self) -> Engine;
}

/// Closed set of engine connectors.
#[derive(Debug)]
pub enum Connector {
    #[cfg(feature = "postgresql")]
    Postgres(postgres::PostgresAdapter),
    #[cfg(feature = "mysql")]
    MySql(mysql::MySqlAdapter),
    #[cfg(feature = "mssql")]
    SqlServer(mssql::SqlServerAdapter),
}

/// Dispatches a call to whichever engine variant is present.
macro_rules! dispatch {
    ($connector:expr, $adapter:ident => $call:expr) => {
        match $connector {
            #[cfg(feature = "postgresql")]
            Connector::Postgres($adapter) => $call,
            #[cfg(feature = "mysql")]
            Connector::MySql($adapter) => $call,
            #[cfg(feature = "mssql")]
            Connector::SqlServer($adapter) => $call,
        }
    };
}

#[async_trait]
impl DatabaseAdapter for Connector {
    async fn test_connection(&self) -> Result<()> {
        dispatch!(self, adapter => adapter.test_connection().await)
    }

    async fn execute(&self, database: &str, statement: &str) -> Result<Vec<Record>> {
        dispatch!(self, adapter => adapter.execute(database, statement).await)
    }

    async fn get_databases(&self) -> Result<Vec<String>> {
        dispatch!(self, adapter => adapter.get_databases().await)
    }

    async fn get_tables(&self, database: &str) -> Result<Vec<String>> {
        dispatch!(self, adapter => adapter.get_tables(database).await)
    }

    async fn get_table_structure(&self, database: &str, table: &str) -> Result<String> {
        dispatch!(self, adapter => adapter.get_table_structure(database, table).await)
    }

    fn engine(&self) -> Engine {
        dispatch!(self, adapter => adapter.engine())
    }
}

/// Builds a connector for `connection` with default tuning.
///
/// # Example
/// ```rust
/// use sqlharbor_core::{Connection, DatabaseAdapter, Engine, create_connector};
///
/// let connection = Connection::new("local", Engine::PostgreSQL, "localhost", 5432, "app", "pw");
/// let connector = create_connector(&connection).expect("postgresql feature is enabled");
/// assert_eq!(connector.engine(), Engine::PostgreSQL);
/// ```
///
/// # Errors
/// Returns an unsupported-feature error when the engine's adapter is not
/// compiled in.
pub fn create_connector(connection: &Connection) -> Result<Connector> {
    create_connector_with_config(connection, ConnectorConfig::default())
}

/// Builds a connector for `connection` with explicit tuning.
///
/// # Errors
/// Returns a configuration error for an invalid profile or config, and an
/// unsupported-feature error when the engine's adapter is not compiled in.
pub fn create_connector_with_config(
    connection: &Connection,
    config: ConnectorConfig,
) -> Result<Connector> {
    config.validate()?;
    if connection.host.trim().is_empty() {
        return Err(HarborError::configuration("host cannot be empty"));
    }
    if connection.port == 0 {
        return Err(HarborError::configuration("port must be greater than 0"));
    }

    match connection.engine_type {
        #[cfg(feature = "postgresql")]
        Engine::PostgreSQL => Ok(Connector::Postgres(postgres::PostgresAdapter::new(
            connection.clone(),
            config,
        ))),
        #[cfg(not(feature = "postgresql"))]
        Engine::PostgreSQL => Err(HarborError::unsupported_feature(
            "PostgreSQL adapter",
            "this build (enable the postgresql feature)",
        )),
        #[cfg(feature = "mysql")]
        Engine::MySQL => Ok(Connector::MySql(mysql::MySqlAdapter::new(
            connection.clone(),
            config,
        ))),
        #[cfg(not(feature = "mysql"))]
        Engine::MySQL => Err(HarborError::unsupported_feature(
            "MySQL adapter",
            "this build (enable the mysql feature)",
        )),
        #[cfg(feature = "mssql")]
        Engine::SqlServer => Ok(Connector::SqlServer(mssql::SqlServerAdapter::new(
            connection.clone(),
            config,
        ))),
        #[cfg(not(feature = "mssql"))]
        Engine::SqlServer => Err(HarborError::unsupported_feature(
            "SQL Server adapter",
            "this build (enable the mssql feature)",
        )),
    }
}
