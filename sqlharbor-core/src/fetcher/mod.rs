//! Boundary between the metadata store and whatever produces metadata.
//!
//! The store never talks to an engine directly. It asks a
//! [`MetadataFetcher`] for database names and table schemas, which either
//! runs a connector in-process ([`ConnectorFetcher`]) or calls the remote
//! metadata endpoints ([`HttpFetcher`]).

use crate::Result;
use crate::models::{Connection, ResponseObject, Schema};
use async_trait::async_trait;

mod connector;
#[cfg(feature = "http")]
mod http;

pub use connector::ConnectorFetcher;
#[cfg(feature = "http")]
pub use http::{DATABASES_PATH, HttpFetcher, SCHEMA_PATH};

/// Source of database and schema metadata for the store.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Returns the names of the databases visible on `connection`.
    async fn fetch_databases(&self, connection: &Connection) -> Result<Vec<String>>;

    /// Returns the table schemas of `database` on `connection`.
    ///
    /// A failure to introspect may be reported in-band through
    /// [`ResponseObject::message`]; transport failures are errors.
    async fn fetch_schema(
        &self,
        connection: &Connection,
        database: &str,
    ) -> Result<ResponseObject<Vec<Schema>>>;
}

#[async_trait]
impl<F: MetadataFetcher + ?Sized> MetadataFetcher for std::sync::Arc<F> {
    async fn fetch_databases(&self, connection: &Connection) -> Result<Vec<String>> {
        (**self).fetch_databases(connection).await
    }

    async fn fetch_schema(
        &self,
        connection: &Connection,
        database: &str,
    ) -> Result<ResponseObject<Vec<Schema>>> {
        (**self).fetch_schema(connection, database).await
    }
}
