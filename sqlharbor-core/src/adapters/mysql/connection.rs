//! MySQL session management.

use super::MySqlAdapter;
use crate::adapters::helpers::{Session, connect_within};
use crate::error::HarborError;
use crate::models::SslOptions;
use crate::security::Credentials;
use crate::Result;
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlSslMode};
use sqlx::{ConnectOptions, MySqlConnection};

/// Chooses the sqlx TLS mode for a profile's TLS options.
///
/// `Required` encrypts without validating the server certificate;
/// `rejectUnauthorized` upgrades to full identity verification.
pub fn ssl_mode_for(ssl: Option<&SslOptions>) -> MySqlSslMode {
    match ssl {
        None => MySqlSslMode::Disabled,
        Some(ssl) if ssl.reject_unauthorized => MySqlSslMode::VerifyIdentity,
        Some(_) => MySqlSslMode::Required,
    }
}

impl MySqlAdapter {
    /// Builds connect options from the bound profile.
    pub(crate) fn connect_options(&self) -> MySqlConnectOptions {
        let credentials = Credentials::from_connection(&self.connection);
        let ssl = self.connection.active_ssl();

        let mut options = MySqlConnectOptions::new()
            .host(&self.connection.host)
            .port(self.connection.port)
            .username(credentials.username())
            .charset("utf8mb4")
            .ssl_mode(ssl_mode_for(ssl));

        if credentials.has_password() {
            options = options.password(credentials.password());
        }

        if let Some(database) = self.connection.database.as_deref().filter(|db| !db.is_empty()) {
            options = options.database(database);
        }

        if let Some(ssl) = ssl {
            if let Some(ca) = &ssl.ca {
                options = options.ssl_ca_from_pem(ca.as_bytes().to_vec());
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
    pub(crate) async fn open(&self) -> Result<MySqlConnection> {
        let target = self.connection.address();
        let options = self.connect_options();
        tracing::debug!("Connecting to MySQL at {}", target);

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
impl Session for MySqlConnection {
    async fn close(self) -> Result<()> {
        sqlx::Connection::close(self)
            .await
            .map_err(|e| HarborError::session_close_failed("MySQL", e))
    }
}
