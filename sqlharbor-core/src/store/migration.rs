//! Upgrades of previously persisted state.

use super::ConnectionStore;

/// Version written by [`ConnectionStore::save`].
pub const CURRENT_STATE_VERSION: u32 = 1;

/// Brings a freshly restored store from `from_version` up to
/// [`CURRENT_STATE_VERSION`] and returns the version reached.
///
/// Steps run in order and never fail the restore; a failing step is logged
/// and the next one runs. State written by a newer build is left untouched.
pub async fn run_migrations(store: &ConnectionStore, from_version: u32) -> u32 {
    if from_version > CURRENT_STATE_VERSION {
        tracing::warn!(
            "State version {} is newer than supported version {}; loading as-is",
            from_version,
            CURRENT_STATE_VERSION
        );
        return from_version;
    }

    let mut version = from_version;
    while version < CURRENT_STATE_VERSION {
        if version == 0 {
            refresh_focused_schema(store).await;
        }
        version += 1;
        tracing::info!("Migrated state to version {}", version);
    }
    version
}

/// Version 0 cached schemas in an older layout; re-fetch the one in focus.
async fn refresh_focused_schema(store: &ConnectionStore) {
    let Some(database) = store
        .current_connection_ctx()
        .await
        .and_then(|ctx| ctx.database)
    else {
        return;
    };

    if let Err(e) = store.get_or_fetch_database_schema(&database, true).await {
        tracing::warn!(
            "Could not refresh schema of '{}' during migration: {}",
            database.name,
            e
        );
    }
}
