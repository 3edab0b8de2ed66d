//! In-process fetcher that drives the engine connectors directly.

use super::MetadataFetcher;
use crate::Result;
use crate::adapters::{ConnectorConfig, DatabaseAdapter, create_connector_with_config};
use crate::models::{Connection, ResponseObject, Schema};
use async_trait::async_trait;

/// Fetches metadata by building a connector for each request.
#[derive(Debug, Clone, Default)]
pub struct ConnectorFetcher {
    config: ConnectorConfig,
}

impl ConnectorFetcher {
    /// Fetcher whose connectors use `config` for timeouts.
    pub fn new(config: ConnectorConfig) -> Self {
        Self { config }
    }

    async fn describe_database(
        &self,
        connection: &Connection,
        database: &str,
    ) -> Result<Vec<Schema>> {
        let connector = create_connector_with_config(connection, self.config.clone())?;
        let tables = connector.get_tables(database).await?;
        tracing::debug!("Describing {} tables of '{}'", tables.len(), database);

        let mut schemas = Vec::with_capacity(tables.len());
        for table in tables {
            let structure = connector.get_table_structure(database, &table).await?;
            schemas.push(Schema {
                name: table,
                structure,
            });
        }
        Ok(schemas)
    }
}

#[async_trait]
impl MetadataFetcher for ConnectorFetcher {
    async fn fetch_databases(&self, connection: &Connection) -> Result<Vec<String>> {
        let connector = create_connector_with_config(connection, self.config.clone())?;
        connector.get_databases().await
    }

    /// Introspection failures are reported in the response message, the way
    /// the schema endpoint answers.
    async fn fetch_schema(
        &self,
        connection: &Connection,
        database: &str,
    ) -> Result<ResponseObject<Vec<Schema>>> {
        match self.describe_database(connection, database).await {
            Ok(schemas) => Ok(ResponseObject::ok(schemas)),
            Err(e) => {
                tracing::debug!("Schema introspection of '{}' failed: {}", database, e);
                Ok(ResponseObject::error(e.detailed_message()))
            }
        }
    }
}
