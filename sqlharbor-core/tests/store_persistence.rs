//! Restore, save and migration of persisted store state.

mod common;

use common::{ScriptedFetcher, profile, table};
use sqlharbor_core::store::{CURRENT_STATE_VERSION, PersistedState, StoreState, run_migrations};
use sqlharbor_core::{
    ConnectionContext, ConnectionStore, Database, JsonFileStorage, MemoryStorage, ResponseObject,
    StateStorage,
};
use std::sync::Arc;
use tempfile::TempDir;

fn focused_state() -> StoreState {
    let mut connection = profile("primary");
    connection.id = "c1".to_string();
    let database = Database::new("c1", "sales");
    StoreState {
        connection_list: vec![connection.clone()],
        database_list: vec![database.clone()],
        current_connection_ctx: Some(ConnectionContext {
            connection,
            database: Some(database),
        }),
    }
}

#[tokio::test]
async fn test_restore_without_saved_state_is_empty() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let storage = MemoryStorage::new();

    let store = ConnectionStore::restore(fetcher.clone(), &storage).await.unwrap();

    assert!(store.connection_list().await.is_empty());
    assert!(store.current_connection_ctx().await.is_none());
    assert_eq!(fetcher.schema_calls(), 0);
}

#[tokio::test]
async fn test_save_then_restore_through_file() {
    let dir = TempDir::new().unwrap();
    let storage = JsonFileStorage::new(dir.path().join("state.json"));
    let fetcher = Arc::new(ScriptedFetcher::with_databases(&["sales", "hr"]));

    let store = ConnectionStore::new(fetcher.clone());
    let connection = store.create_connection(profile("primary")).await;
    store.get_or_fetch_database_list(&connection, false).await.unwrap();
    store.save(&storage).await.unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(storage.path()).unwrap()).unwrap();
    assert_eq!(raw["version"], CURRENT_STATE_VERSION);
    assert_eq!(raw["state"]["connectionList"][0]["id"], connection.id.as_str());
    assert_eq!(raw["state"]["databaseList"][1]["name"], "hr");

    let restored = ConnectionStore::restore(fetcher.clone(), &storage).await.unwrap();
    assert_eq!(restored.snapshot().await, store.snapshot().await);

    // Restored cache answers without another fetch
    restored
        .get_or_fetch_database_list(&connection, false)
        .await
        .unwrap();
    assert_eq!(fetcher.database_calls(), 1);
}

#[tokio::test]
async fn test_unversioned_file_refreshes_focused_schema() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("legacy.json");
    let state = serde_json::to_value(focused_state()).unwrap();
    std::fs::write(&path, serde_json::json!({ "state": state }).to_string()).unwrap();

    let fetcher = Arc::new(ScriptedFetcher::default());
    fetcher.set_schema(ResponseObject::ok(vec![table("orders")]));

    let store = ConnectionStore::restore(fetcher.clone(), &JsonFileStorage::new(&path))
        .await
        .unwrap();

    assert_eq!(fetcher.schema_calls(), 1);
    assert_eq!(store.database_list().await[0].schema_list, vec![table("orders")]);
}

#[tokio::test]
async fn test_migration_failure_does_not_fail_restore() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    fetcher.set_schema(ResponseObject::error("connection refused"));
    let storage = MemoryStorage::with_envelope(PersistedState {
        version: 0,
        state: focused_state(),
    });

    let store = ConnectionStore::restore(fetcher.clone(), &storage).await.unwrap();

    assert_eq!(fetcher.schema_calls(), 1);
    assert_eq!(store.snapshot().await, focused_state());
}

#[tokio::test]
async fn test_current_version_skips_migration() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let storage = MemoryStorage::with_envelope(PersistedState {
        version: CURRENT_STATE_VERSION,
        state: focused_state(),
    });

    ConnectionStore::restore(fetcher.clone(), &storage).await.unwrap();
    assert_eq!(fetcher.schema_calls(), 0);
}

#[tokio::test]
async fn test_newer_version_is_loaded_untouched() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let store = ConnectionStore::with_state(fetcher.clone(), focused_state());

    let reached = run_migrations(&store, CURRENT_STATE_VERSION + 1).await;

    assert_eq!(reached, CURRENT_STATE_VERSION + 1);
    assert_eq!(fetcher.schema_calls(), 0);
}

#[tokio::test]
async fn test_migration_without_focus_is_a_no_op() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let mut state = focused_state();
    state.current_connection_ctx = None;
    let store = ConnectionStore::with_state(fetcher.clone(), state);

    assert_eq!(run_migrations(&store, 0).await, CURRENT_STATE_VERSION);
    assert_eq!(fetcher.schema_calls(), 0);
}

#[tokio::test]
async fn test_save_stamps_current_version() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let storage = MemoryStorage::new();
    let store = ConnectionStore::with_state(fetcher, focused_state());

    store.save(&storage).await.unwrap();

    let envelope = storage.load().await.unwrap().unwrap();
    assert_eq!(envelope.version, CURRENT_STATE_VERSION);
    assert_eq!(envelope.state, focused_state());
}
