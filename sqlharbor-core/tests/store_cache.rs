//! Cache behavior of the connection store against a scripted fetcher.

mod common;

use common::{ScriptedFetcher, profile, table};
use sqlharbor_core::{
    ConnectionContext, ConnectionPatch, ConnectionStore, Database, ErrorKind, ResponseObject,
};
use std::collections::HashSet;
use std::sync::Arc;

fn store_with(fetcher: &Arc<ScriptedFetcher>) -> ConnectionStore {
    ConnectionStore::new(fetcher.clone())
}

#[tokio::test]
async fn test_create_connection_assigns_fresh_ids() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let store = store_with(&fetcher);

    let first = store.create_connection(profile("primary")).await;
    let second = store.create_connection(profile("primary")).await;

    assert!(!first.id.is_empty());
    assert_ne!(first.id, second.id);
    assert_eq!(first.title, "primary");
    assert_eq!(store.connection_list().await.len(), 2);
    assert_eq!(store.get_connection_by_id(&second.id).await, Some(second));
    assert!(store.get_connection_by_id("missing").await.is_none());
}

#[tokio::test]
async fn test_database_list_is_served_from_cache() {
    let fetcher = Arc::new(ScriptedFetcher::with_databases(&["sales", "hr"]));
    let store = store_with(&fetcher);
    let connection = store.create_connection(profile("primary")).await;

    let first = store.get_or_fetch_database_list(&connection, false).await.unwrap();
    let second = store.get_or_fetch_database_list(&connection, false).await.unwrap();

    assert_eq!(fetcher.database_calls(), 1);
    assert_eq!(first, second);
    let names: Vec<&str> = first.iter().map(|db| db.name.as_str()).collect();
    assert_eq!(names, ["sales", "hr"]);
    assert!(first.iter().all(|db| db.connection_id == connection.id));
    assert!(first.iter().all(|db| db.schema_list.is_empty()));
}

#[tokio::test]
async fn test_refetch_merges_without_duplicates() {
    let fetcher = Arc::new(ScriptedFetcher::with_databases(&["sales", "hr"]));
    let store = store_with(&fetcher);
    let connection = store.create_connection(profile("primary")).await;

    store.get_or_fetch_database_list(&connection, false).await.unwrap();
    fetcher.set_databases(&["sales", "ops"]);
    let refreshed = store.get_or_fetch_database_list(&connection, true).await.unwrap();

    assert_eq!(fetcher.database_calls(), 2);
    let names: Vec<&str> = refreshed.iter().map(|db| db.name.as_str()).collect();
    assert_eq!(names, ["sales", "ops", "hr"]);
    assert_eq!(store.database_list().await.len(), 3);
}

#[tokio::test]
async fn test_database_lists_are_scoped_per_connection() {
    let fetcher = Arc::new(ScriptedFetcher::with_databases(&["sales"]));
    let store = store_with(&fetcher);
    let first = store.create_connection(profile("first")).await;
    let second = store.create_connection(profile("second")).await;

    store.get_or_fetch_database_list(&first, false).await.unwrap();
    let other = store.get_or_fetch_database_list(&second, false).await.unwrap();

    assert_eq!(fetcher.database_calls(), 2);
    assert_eq!(other, vec![Database::new(second.id.clone(), "sales")]);
    assert_eq!(store.database_list().await.len(), 2);
}

#[tokio::test]
async fn test_failed_fetch_never_returns_stale_data() {
    let fetcher = Arc::new(ScriptedFetcher::with_databases(&["sales"]));
    let store = store_with(&fetcher);
    let connection = store.create_connection(profile("primary")).await;

    store.get_or_fetch_database_list(&connection, false).await.unwrap();
    fetcher.fail_databases(true);

    let error = store
        .get_or_fetch_database_list(&connection, true)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Remote);
    assert!(error.to_string().contains("Access denied"));
    assert_eq!(store.database_list().await.len(), 1);
}

#[tokio::test]
async fn test_concurrent_misses_merge_cleanly() {
    let fetcher = Arc::new(ScriptedFetcher::with_databases(&["sales", "hr"]));
    let store = Arc::new(store_with(&fetcher));
    let connection = store.create_connection(profile("primary")).await;

    let (left, right) = tokio::join!(
        store.get_or_fetch_database_list(&connection, false),
        store.get_or_fetch_database_list(&connection, false)
    );

    assert_eq!(left.unwrap().len(), 2);
    assert_eq!(right.unwrap().len(), 2);
    assert!(fetcher.database_calls() >= 1);

    let cached = store.database_list().await;
    let keys: HashSet<(&str, &str)> = cached.iter().map(Database::key).collect();
    assert_eq!(keys.len(), cached.len());
    assert_eq!(cached.len(), 2);
}

#[tokio::test]
async fn test_schema_is_fetched_once_and_cached_in_place() {
    let fetcher = Arc::new(ScriptedFetcher::with_databases(&["sales"]));
    fetcher.set_schema(ResponseObject::ok(vec![table("orders"), table("customers")]));
    let store = store_with(&fetcher);
    let connection = store.create_connection(profile("primary")).await;
    let databases = store.get_or_fetch_database_list(&connection, false).await.unwrap();

    let first = store
        .get_or_fetch_database_schema(&databases[0], false)
        .await
        .unwrap();
    let second = store
        .get_or_fetch_database_schema(&databases[0], false)
        .await
        .unwrap();

    assert_eq!(fetcher.schema_calls(), 1);
    assert_eq!(first, second);
    assert_eq!(first[0].name, "orders");
    assert_eq!(store.database_list().await[0].schema_list, first);

    store
        .get_or_fetch_database_schema(&databases[0], true)
        .await
        .unwrap();
    assert_eq!(fetcher.schema_calls(), 2);
}

#[tokio::test]
async fn test_schema_of_unknown_connection_is_empty_without_fetch() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let store = store_with(&fetcher);

    let schemas = store
        .get_or_fetch_database_schema(&Database::new("ghost", "sales"), false)
        .await
        .unwrap();

    assert!(schemas.is_empty());
    assert_eq!(fetcher.schema_calls(), 0);
}

#[tokio::test]
async fn test_schema_message_is_remote_error() {
    let fetcher = Arc::new(ScriptedFetcher::with_databases(&["sales"]));
    fetcher.set_schema(ResponseObject::error("Unknown database 'sales'"));
    let store = store_with(&fetcher);
    let connection = store.create_connection(profile("primary")).await;
    let databases = store.get_or_fetch_database_list(&connection, false).await.unwrap();

    let error = store
        .get_or_fetch_database_schema(&databases[0], false)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Remote);
    assert_eq!(error.to_string(), "Unknown database 'sales'");
    assert!(store.database_list().await[0].schema_list.is_empty());
}

#[tokio::test]
async fn test_update_connection_changes_only_patched_fields() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let store = store_with(&fetcher);
    let original = store.create_connection(profile("primary")).await;

    let updated = store
        .update_connection(
            &original.id,
            ConnectionPatch {
                title: Some("renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "renamed");
    assert_eq!(updated.host, original.host);
    assert_eq!(updated.password, original.password);
    assert_eq!(store.get_connection_by_id(&original.id).await, Some(updated));

    let before = store.connection_list().await;
    let missing = store
        .update_connection("unknown", ConnectionPatch::default())
        .await;
    assert!(missing.is_none());
    assert_eq!(store.connection_list().await, before);
}

#[tokio::test]
async fn test_clear_connection_prunes_dependent_state() {
    let fetcher = Arc::new(ScriptedFetcher::with_databases(&["sales"]));
    let store = store_with(&fetcher);
    let keep = store.create_connection(profile("keep")).await;
    let gone = store.create_connection(profile("gone")).await;
    store.get_or_fetch_database_list(&keep, false).await.unwrap();
    store.get_or_fetch_database_list(&gone, false).await.unwrap();
    store
        .set_current_connection_ctx(Some(ConnectionContext {
            connection: gone.clone(),
            database: None,
        }))
        .await;

    let removed = store.clear_connection(|c| c.id != gone.id).await;

    assert_eq!(removed, 1);
    assert_eq!(store.connection_list().await, vec![keep.clone()]);
    assert!(
        store
            .database_list()
            .await
            .iter()
            .all(|db| db.connection_id == keep.id)
    );
    assert!(store.current_connection_ctx().await.is_none());
}

#[tokio::test]
async fn test_current_context_is_stored_verbatim() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let store = store_with(&fetcher);
    let unknown = profile("not stored");

    let ctx = ConnectionContext {
        connection: unknown,
        database: Some(Database::new("nowhere", "sales")),
    };
    store.set_current_connection_ctx(Some(ctx.clone())).await;
    assert_eq!(store.current_connection_ctx().await, Some(ctx));

    store.set_current_connection_ctx(None).await;
    assert!(store.current_connection_ctx().await.is_none());
}
