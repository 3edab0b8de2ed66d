//! Configuration types for database connectors.

mod connector;

pub use connector::{ConnectorConfig, MAX_TIMEOUT};
