//! PostgreSQL session management.
//!
//! # Security Features
//! - Credentials are copied into zeroizing storage only while options are built
//! - TLS is enabled only when the profile asks for it
//! - Server-side `statement_timeout` mirrors the client-side query timeout

use super::PostgresAdapter;
use crate::adapters::helpers::{Session, connect_within};
use crate::error::HarborError;
use crate::models::SslOptions;
use crate::security::Credentials;
use crate::Result;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::{ConnectOptions, PgConnection};

/// Chooses the sqlx TLS mode for a profile's TLS options.
///
/// Validation is permissive (`Require`) unless the profile sets
/// `rejectUnauthorized`, in which case the chain and hostname are verified.
pub fn ssl_mode_for(ssl: Option<&SslOptions>) -> PgSslMode {
    match ssl {
        None => PgSslMode::Disable,
        Some(ssl) if ssl.reject_unauthorized => PgSslMode::VerifyFull,
        Some(_) => PgSslMode::Require,
    }
}

impl PostgresAdapter {
    /// Builds connect options targeting `database`.
    pub(crate) fn connect_options(&self, database: &str) -> PgConnectOptions {
        let credentials = Credentials::from_connection(&self.connection);
        let ssl = self.connection.active_ssl();

        let mut options = PgConnectOptions::new()
            .host(&self.connection.host)
            .port(self.connection.port)
            .username(credentials.username())
            .database(database)
            .application_name(&self.config.application_name)
            .options([(
                "statement_timeout",
                format!("{}ms", self.config.query_timeout.as_millis()),
            )])
            .ssl_mode(ssl_mode_for(ssl));

        if credentials.has_password() {
            options = options.password(credentials.password());
        }

        if let Some(ssl) = ssl {
            if let Some(ca) = &ssl.ca {
                options = options.ssl_root_cert_from_pem(ca.as_bytes().to_vec());
            }
            if let Some(cert) = &ssl.cert {
                options = options.ssl_client_cert_from_pem(cert.as_bytes());
            }
            if let Some(key) = &ssl.key {
                options = options.ssl_client_key_from_pem(key.as_bytes());
            }
        }

        options
    }

    /// Opens a fresh session, bounded by the connect timeout.
    pub(crate) async fn open(&self, database: &str) -> Result<PgConnection> {
        let target = self.connection.address();
        let options = self.connect_options(database);
        tracing::debug!("Connecting to PostgreSQL at {} (database '{}')", target, database);

        connect_within(self.config.connect_timeout, &target, async {
            options
                .connect()
                .await
                .map_err(|e| HarborError::connection_failed(&target, e))
        })
        .await
    }
}

#[async_trait]
impl Session for PgConnection {
    async fn close(self) -> Result<()> {
        sqlx::Connection::close(self)
            .await
            .map_err(|e| HarborError::session_close_failed("PostgreSQL", e))
    }
}
