//! Fetcher backed by the remote metadata endpoints.
//!
//! Both endpoints take a JSON POST body. The database endpoint answers with a
//! bare array of names; the schema endpoint answers with a
//! [`ResponseObject`] whose `message` signals an introspection failure.

use super::MetadataFetcher;
use crate::Result;
use crate::error::HarborError;
use crate::models::{Connection, ResponseObject, Schema};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Path of the database-list endpoint, relative to the base URL.
pub const DATABASES_PATH: &str = "api/connection/db";
/// Path of the schema endpoint, relative to the base URL.
pub const SCHEMA_PATH: &str = "api/connection/db_schema";

#[derive(Serialize)]
struct DatabasesRequest<'a> {
    connection: &'a Connection,
}

#[derive(Serialize)]
struct SchemaRequest<'a> {
    connection: &'a Connection,
    db: &'a str,
}

/// Calls the metadata endpoints of a remote service.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpFetcher {
    /// Creates a fetcher for the service rooted at `base_url`.
    ///
    /// # Errors
    /// Returns a configuration error for an unparsable URL or when the HTTP
    /// client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| {
            HarborError::configuration(format!("invalid metadata service URL: {}", e))
        })?;
        // Relative joins replace the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                HarborError::configuration(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client, base_url })
    }

    /// Absolute URL of an endpoint.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| {
            HarborError::configuration(format!("invalid endpoint path '{}': {}", path, e))
        })
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let target = url.as_str().to_string();
        tracing::debug!("POST {}", target);

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| HarborError::connection_failed(&target, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| HarborError::connection_failed(&target, e))?;

        if !status.is_success() {
            return Err(error_from_body(&target, status, &text));
        }

        serde_json::from_str(&text)
            .map_err(|e| HarborError::remote(format!("invalid response from {}: {}", target, e)))
    }
}

/// Prefers the service's own `{message}` over a bare status line.
fn error_from_body(target: &str, status: reqwest::StatusCode, body: &str) -> HarborError {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: Option<String>,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(message),
        }) if !message.is_empty() => HarborError::remote(message),
        _ => HarborError::remote(format!("{} answered HTTP {}", target, status)),
    }
}

#[async_trait]
impl MetadataFetcher for HttpFetcher {
    async fn fetch_databases(&self, connection: &Connection) -> Result<Vec<String>> {
        self.post(DATABASES_PATH, &DatabasesRequest { connection })
            .await
    }

    async fn fetch_schema(
        &self,
        connection: &Connection,
        database: &str,
    ) -> Result<ResponseObject<Vec<Schema>>> {
        self.post(
            SCHEMA_PATH,
            &SchemaRequest {
                connection,
                db: database,
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::Engine;

    #[test]
    fn test_endpoint_joins_under_base_path() {
        let fetcher = HttpFetcher::new("http://localhost:3000/app", Duration::from_secs(5)).unwrap();
        assert_eq!(
            fetcher.endpoint(DATABASES_PATH).unwrap().as_str(),
            "http://localhost:3000/app/api/connection/db"
        );

        let fetcher = HttpFetcher::new("http://localhost:3000/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            fetcher.endpoint(SCHEMA_PATH).unwrap().as_str(),
            "http://localhost:3000/api/connection/db_schema"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let error = HttpFetcher::new("not a url", Duration::from_secs(5)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_request_bodies() {
        let connection = Connection::new("t", Engine::MySQL, "h", 3306, "u", "p");
        let body = serde_json::to_value(SchemaRequest {
            connection: &connection,
            db: "sales",
        })
        .unwrap();
        assert_eq!(body["db"], "sales");
        assert_eq!(body["connection"]["engineType"], "MYSQL");

        let body = serde_json::to_value(DatabasesRequest {
            connection: &connection,
        })
        .unwrap();
        assert_eq!(body["connection"]["host"], "h");
    }

    #[test]
    fn test_error_body_message_is_used() {
        let error = error_from_body(
            "http://x/api",
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"message":"Access denied"}"#,
        );
        assert_eq!(error.kind(), ErrorKind::Remote);
        assert_eq!(error.to_string(), "Access denied");

        let error = error_from_body("http://x/api", reqwest::StatusCode::BAD_GATEWAY, "<html>");
        assert!(error.to_string().contains("502"));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_connection_error() {
        let fetcher = HttpFetcher::new("http://127.0.0.1:1/", Duration::from_secs(2)).unwrap();
        let connection = Connection::new("t", Engine::MySQL, "h", 3306, "u", "p");
        let error = fetcher.fetch_databases(&connection).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Connection);
    }
}
