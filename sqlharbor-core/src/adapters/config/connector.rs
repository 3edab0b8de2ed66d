//! Per-adapter tuning knobs.
//!
//! Connection details live on the [`Connection`](crate::models::Connection)
//! profile; this struct only carries timeouts and session metadata.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound accepted for either timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration shared by every connector.
///
/// # Example
/// ```rust
/// use sqlharbor_core::adapters::ConnectorConfig;
/// use std::time::Duration;
///
/// let config = ConnectorConfig::default()
///     .with_connect_timeout(Duration::from_secs(5))
///     .with_application_name("reporting");
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Time allowed to establish and authenticate a session
    pub connect_timeout: Duration,
    /// Time allowed for one statement round-trip
    pub query_timeout: Duration,
    /// Name reported to the server where the engine supports it
    pub application_name: String,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            query_timeout: Duration::from_secs(30),
            application_name: "sqlharbor".to_string(),
        }
    }
}

impl ConnectorConfig {
    /// Validates timeout bounds.
    ///
    /// # Errors
    /// Returns a configuration error for zero timeouts or timeouts above
    /// [`MAX_TIMEOUT`].
    pub fn validate(&self) -> crate::Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(crate::error::HarborError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        if self.query_timeout.is_zero() {
            return Err(crate::error::HarborError::configuration(
                "query_timeout must be greater than 0",
            ));
        }

        if self.connect_timeout > MAX_TIMEOUT || self.query_timeout > MAX_TIMEOUT {
            return Err(crate::error::HarborError::configuration(format!(
                "timeouts should not exceed {} seconds",
                MAX_TIMEOUT.as_secs()
            )));
        }

        Ok(())
    }

    /// Builder method to set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builder method to set the statement timeout.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Builder method to set the reported application name.
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }
}
