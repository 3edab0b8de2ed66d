//! Unit tests for the PostgreSQL connector.

use super::*;
use crate::error::ErrorKind;
use crate::models::SslOptions;
use sqlx::postgres::PgSslMode;
use std::time::Duration;

fn profile() -> Connection {
    let mut connection = Connection::new("pg", Engine::PostgreSQL, "127.0.0.1", 1, "reader", "secret");
    connection.id = "c-pg".to_string();
    connection
}

fn fast_config() -> ConnectorConfig {
    ConnectorConfig::default()
        .with_connect_timeout(Duration::from_secs(2))
        .with_query_timeout(Duration::from_secs(2))
}

#[test]
fn test_ssl_mode_mapping() {
    assert!(matches!(ssl_mode_for(None), PgSslMode::Disable));

    let permissive = SslOptions {
        enabled: true,
        ..Default::default()
    };
    assert!(matches!(ssl_mode_for(Some(&permissive)), PgSslMode::Require));

    let strict = SslOptions {
        enabled: true,
        reject_unauthorized: true,
        ..Default::default()
    };
    assert!(matches!(ssl_mode_for(Some(&strict)), PgSslMode::VerifyFull));
}

#[test]
fn test_disabled_ssl_block_connects_without_tls() {
    let connection = profile().with_ssl(SslOptions {
        enabled: false,
        reject_unauthorized: true,
        ..Default::default()
    });
    let adapter = PostgresAdapter::new(connection, fast_config());
    let options = adapter.connect_options("sales");
    assert!(matches!(options.get_ssl_mode(), PgSslMode::Disable));
}

#[test]
fn test_connect_options_target_database() {
    let adapter = PostgresAdapter::new(profile(), fast_config());
    let options = adapter.connect_options("sales");

    assert_eq!(options.get_host(), "127.0.0.1");
    assert_eq!(options.get_port(), 1);
    assert_eq!(options.get_database(), Some("sales"));
    assert_eq!(options.get_username(), "reader");
    assert_eq!(options.get_application_name(), Some("sqlharbor"));
}

#[test]
fn test_home_database_defaults_to_maintenance_db() {
    let adapter = PostgresAdapter::new(profile(), fast_config());
    assert_eq!(adapter.home_database(), "postgres");

    let adapter = PostgresAdapter::new(profile().with_database("hr"), fast_config());
    assert_eq!(adapter.home_database(), "hr");
}

#[test]
fn test_debug_output_has_no_credentials() {
    let adapter = PostgresAdapter::new(profile(), fast_config());
    let rendered = format!("{:?}", adapter);
    assert!(rendered.contains("127.0.0.1:1"));
    assert!(!rendered.contains("secret"));
}

#[test]
fn test_system_database_list() {
    assert!(SYSTEM_DATABASES.contains(&"template0"));
    assert!(SYSTEM_DATABASES.contains(&"template1"));
    assert!(!SYSTEM_DATABASES.contains(&"postgres"));
}

#[test]
fn test_table_queries_share_search_path_scope() {
    for query in [LIST_TABLES_QUERY, DESCRIBE_TABLE_QUERY] {
        assert!(query.contains("table_schema::name = ANY (current_schemas(false))"));
    }
    assert!(LIST_TABLES_QUERY.contains("SELECT DISTINCT"));
    assert!(DESCRIBE_TABLE_QUERY.contains("LIMIT 1"));
}

#[tokio::test]
async fn test_unreachable_server_fails_with_connection_error() {
    let adapter = PostgresAdapter::new(profile(), fast_config());

    let error = adapter.test_connection().await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Connection);
    assert!(!error.to_string().contains("secret"));

    let error = adapter.get_databases().await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Connection);

    let error = adapter.get_table_structure("sales", "orders").await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Connection);

    let error = adapter.get_tables("sales").await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Connection);

    let error = adapter.execute("sales", "SELECT now()").await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Connection);
}
