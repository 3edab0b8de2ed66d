//! Core data structures and services for SQLHarbor.
//!
//! This crate lets a client talk to heterogeneous relational databases through
//! one uniform connector contract and keeps the resulting metadata (database
//! lists and table schemas) in a client-side cache.
//!
//! # Architecture
//! - [`adapters`]: one connector per engine behind the [`DatabaseAdapter`]
//!   trait, selected by the closed [`Connector`] enum
//! - [`fetcher`]: the boundary the store uses to obtain metadata, either
//!   in-process through a connector or from remote HTTP endpoints
//! - [`store`]: the metadata cache with persistence and versioned migration
//!
//! # Security Guarantees
//! - Passwords and TLS keys never appear in `Debug` output, errors or logs
//! - Every connector operation closes its own engine connection on all paths
//! - TLS is opt-in per connection profile

pub mod adapters;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod models;
pub mod security;
pub mod store;

// Re-export commonly used types
pub use adapters::{
    Connector, ConnectorConfig, DatabaseAdapter, create_connector, create_connector_with_config,
};
pub use error::{ErrorKind, HarborError, Result};
pub use fetcher::MetadataFetcher;
pub use models::{
    Connection, ConnectionContext, ConnectionPatch, Database, Engine, Record, ResponseObject,
    Schema, SslOptions,
};
pub use store::{ConnectionStore, JsonFileStorage, MemoryStorage, StateStorage};
