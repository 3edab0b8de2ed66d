//! Client-side metadata cache.
//!
//! [`ConnectionStore`] is the single authoritative registry of connection
//! profiles, fetched database lists and fetched table schemas. Reads are
//! served from the cache unless the caller asks to skip it; misses go
//! through the injected [`MetadataFetcher`].
//!
//! # Concurrency
//! The state lock is never held while a fetch is in flight. Two concurrent
//! misses for the same connection therefore both fetch, and both results are
//! merged under the write lock; the merge is keyed, so repeating it never
//! duplicates entries.
//!
//! # Module Structure
//! - `persistence`: versioned envelope and storage backends
//! - `migration`: one-shot upgrades of previously persisted state

mod migration;
mod persistence;

pub use migration::{CURRENT_STATE_VERSION, run_migrations};
pub use persistence::{JsonFileStorage, MemoryStorage, PersistedState, StateStorage};

use crate::Result;
use crate::fetcher::MetadataFetcher;
use crate::models::{Connection, ConnectionContext, ConnectionPatch, Database, Schema};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Everything the store keeps, in its persisted layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    #[serde(default)]
    pub connection_list: Vec<Connection>,
    #[serde(default)]
    pub database_list: Vec<Database>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_connection_ctx: Option<ConnectionContext>,
}

/// Merges `fetched` into `cached`, de-duplicated by `(connection_id, name)`.
///
/// Fetched entries come first and win on conflict.
fn merge_databases(fetched: Vec<Database>, cached: Vec<Database>) -> Vec<Database> {
    let mut merged: Vec<Database> = Vec::with_capacity(fetched.len() + cached.len());
    for database in fetched.into_iter().chain(cached) {
        if !merged.iter().any(|existing| existing.same_identity(&database)) {
            merged.push(database);
        }
    }
    merged
}

/// Process-wide metadata cache, shared by callers through an `Arc`.
pub struct ConnectionStore {
    fetcher: Arc<dyn MetadataFetcher>,
    state: RwLock<StoreState>,
}

impl std::fmt::Debug for ConnectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionStore").finish_non_exhaustive()
    }
}

impl ConnectionStore {
    /// Creates an empty store.
    pub fn new(fetcher: Arc<dyn MetadataFetcher>) -> Self {
        Self::with_state(fetcher, StoreState::default())
    }

    /// Creates a store holding `state` as-is, without migrating it.
    pub fn with_state(fetcher: Arc<dyn MetadataFetcher>, state: StoreState) -> Self {
        Self {
            fetcher,
            state: RwLock::new(state),
        }
    }

    /// Loads persisted state from `storage` and migrates it to
    /// [`CURRENT_STATE_VERSION`].
    ///
    /// Missing storage yields an empty store. Migration failures are logged
    /// and never fail the load.
    ///
    /// # Errors
    /// Returns a storage error if the persisted blob cannot be read or parsed.
    pub async fn restore(
        fetcher: Arc<dyn MetadataFetcher>,
        storage: &dyn StateStorage,
    ) -> Result<Self> {
        let Some(persisted) = storage.load().await? else {
            tracing::debug!("No persisted state found, starting empty");
            return Ok(Self::new(fetcher));
        };

        let store = Self::with_state(fetcher, persisted.state);
        run_migrations(&store, persisted.version).await;
        Ok(store)
    }

    /// Writes the current state at [`CURRENT_STATE_VERSION`].
    pub async fn save(&self, storage: &dyn StateStorage) -> Result<()> {
        let envelope = PersistedState {
            version: CURRENT_STATE_VERSION,
            state: self.snapshot().await,
        };
        storage.store(&envelope).await
    }

    /// Copy of the whole state.
    pub async fn snapshot(&self) -> StoreState {
        self.state.read().await.clone()
    }

    /// Every stored profile, in creation order.
    pub async fn connection_list(&self) -> Vec<Connection> {
        self.state.read().await.connection_list.clone()
    }

    /// Cached databases of all connections.
    pub async fn database_list(&self) -> Vec<Database> {
        self.state.read().await.database_list.clone()
    }

    /// The focused connection and database, if any.
    pub async fn current_connection_ctx(&self) -> Option<ConnectionContext> {
        self.state.read().await.current_connection_ctx.clone()
    }

    /// Stores a copy of `profile` under a freshly generated id and returns it.
    pub async fn create_connection(&self, profile: Connection) -> Connection {
        let created = Connection {
            id: uuid::Uuid::new_v4().to_string(),
            ..profile
        };
        self.state
            .write()
            .await
            .connection_list
            .push(created.clone());
        tracing::info!("Created connection '{}' ({})", created.title, created.id);
        created
    }

    /// Replaces the focused connection/database. References are not checked.
    pub async fn set_current_connection_ctx(&self, ctx: Option<ConnectionContext>) {
        self.state.write().await.current_connection_ctx = ctx;
    }

    /// Returns the databases of `connection`, fetching them on a cache miss
    /// or when `skip_cache` is set.
    ///
    /// # Errors
    /// Fetch failures are returned unchanged; cached data is never returned
    /// in their place.
    pub async fn get_or_fetch_database_list(
        &self,
        connection: &Connection,
        skip_cache: bool,
    ) -> Result<Vec<Database>> {
        if !skip_cache {
            let state = self.state.read().await;
            let cached: Vec<Database> = state
                .database_list
                .iter()
                .filter(|db| db.connection_id == connection.id)
                .cloned()
                .collect();
            if !cached.is_empty() {
                return Ok(cached);
            }
        }

        let names = self.fetcher.fetch_databases(connection).await?;
        let fetched: Vec<Database> = names
            .into_iter()
            .map(|name| Database::new(connection.id.clone(), name))
            .collect();
        tracing::info!(
            "Fetched {} databases for connection {}",
            fetched.len(),
            connection.id
        );

        let mut state = self.state.write().await;
        let cached = std::mem::take(&mut state.database_list);
        state.database_list = merge_databases(fetched, cached);

        Ok(state
            .database_list
            .iter()
            .filter(|db| db.connection_id == connection.id)
            .cloned()
            .collect())
    }

    /// Returns the table schemas of `database`, fetching them when the cached
    /// entry has none or when `skip_cache` is set.
    ///
    /// An owning connection that is not in the store yields an empty list
    /// without any fetch.
    ///
    /// # Errors
    /// A `message` in the fetch response is returned as a remote error.
    pub async fn get_or_fetch_database_schema(
        &self,
        database: &Database,
        skip_cache: bool,
    ) -> Result<Vec<Schema>> {
        let connection = {
            let state = self.state.read().await;
            if !skip_cache
                && let Some(cached) = state
                    .database_list
                    .iter()
                    .find(|db| db.same_identity(database))
                && !cached.schema_list.is_empty()
            {
                return Ok(cached.schema_list.clone());
            }

            match state
                .connection_list
                .iter()
                .find(|c| c.id == database.connection_id)
            {
                Some(connection) => connection.clone(),
                None => return Ok(Vec::new()),
            }
        };

        let schemas = self
            .fetcher
            .fetch_schema(&connection, &database.name)
            .await?
            .into_result()?;
        tracing::info!(
            "Fetched {} table schemas for {}/{}",
            schemas.len(),
            database.connection_id,
            database.name
        );

        let mut state = self.state.write().await;
        if let Some(entry) = state
            .database_list
            .iter_mut()
            .find(|db| db.same_identity(database))
        {
            entry.schema_list = schemas.clone();
        }

        Ok(schemas)
    }

    /// Looks up a connection by id.
    pub async fn get_connection_by_id(&self, id: &str) -> Option<Connection> {
        self.state
            .read()
            .await
            .connection_list
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    /// Shallow-merges `patch` into the connection with `id`.
    ///
    /// Returns the updated connection, or `None` (and changes nothing) when
    /// no connection has that id.
    pub async fn update_connection(&self, id: &str, patch: ConnectionPatch) -> Option<Connection> {
        let mut state = self.state.write().await;
        let connection = state.connection_list.iter_mut().find(|c| c.id == id)?;
        connection.apply(patch);
        Some(connection.clone())
    }

    /// Keeps only the connections for which `keep` returns true.
    ///
    /// Cached databases of removed connections are pruned as well, and a
    /// focus context pointing at a removed connection is cleared. Returns the
    /// number of removed connections.
    pub async fn clear_connection<F>(&self, keep: F) -> usize
    where
        F: Fn(&Connection) -> bool,
    {
        let mut state = self.state.write().await;
        let before = state.connection_list.len();
        state.connection_list.retain(|c| keep(c));

        let StoreState {
            connection_list,
            database_list,
            current_connection_ctx,
        } = &mut *state;
        database_list.retain(|db| connection_list.iter().any(|c| c.id == db.connection_id));
        if current_connection_ctx
            .as_ref()
            .is_some_and(|ctx| !connection_list.iter().any(|c| c.id == ctx.connection.id))
        {
            *current_connection_ctx = None;
        }

        before - connection_list.len()
    }
}
