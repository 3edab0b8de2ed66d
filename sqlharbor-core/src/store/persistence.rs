//! Versioned persistence of the store state.
//!
//! The blob layout is `{"version": N, "state": {...}}`. A blob without a
//! `version` field predates versioning and is read as version 0.

use super::StoreState;
use crate::Result;
use crate::error::HarborError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Persisted envelope around [`StoreState`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub state: StoreState,
}

/// Durable home of the persisted envelope.
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Reads the envelope, or `None` when nothing was ever stored.
    async fn load(&self) -> Result<Option<PersistedState>>;

    /// Replaces the stored envelope.
    async fn store(&self, envelope: &PersistedState) -> Result<()>;
}

/// Stores the envelope as pretty-printed JSON in a single file.
///
/// Writes go to a sibling temporary file that is renamed over the target,
/// so a crash mid-write leaves the previous state intact.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Storage backed by the JSON file at `path`. Nothing is read until `load`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateStorage for JsonFileStorage {
    async fn load(&self) -> Result<Option<PersistedState>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(HarborError::io(
                    format!("failed to read state file {}", self.path.display()),
                    e,
                ));
            }
        };

        if text.trim().is_empty() {
            return Ok(None);
        }

        let envelope = serde_json::from_str(&text).map_err(|e| {
            HarborError::serialization(
                format!("invalid state file {}", self.path.display()),
                e,
            )
        })?;
        Ok(Some(envelope))
    }

    async fn store(&self, envelope: &PersistedState) -> Result<()> {
        let json = serde_json::to_string_pretty(envelope)
            .map_err(|e| HarborError::serialization("failed to encode state", e))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                HarborError::io(format!("failed to create {}", parent.display()), e)
            })?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, json)
            .await
            .map_err(|e| HarborError::io(format!("failed to write {}", temp.display()), e))?;
        tokio::fs::rename(&temp, &self.path).await.map_err(|e| {
            HarborError::io(format!("failed to replace {}", self.path.display()), e)
        })?;

        tracing::debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}

/// Keeps the envelope in memory; for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    envelope: Mutex<Option<PersistedState>>,
}

impl MemoryStorage {
    /// Empty storage; `load` returns `None` until something is stored.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts out holding `envelope`.
    pub fn with_envelope(envelope: PersistedState) -> Self {
        Self {
            envelope: Mutex::new(Some(envelope)),
        }
    }

    /// The envelope last stored, if any.
    pub async fn envelope(&self) -> Option<PersistedState> {
        self.envelope.lock().await.clone()
    }
}

#[async_trait]
impl StateStorage for MemoryStorage {
    async fn load(&self) -> Result<Option<PersistedState>> {
        Ok(self.envelope.lock().await.clone())
    }

    async fn store(&self, envelope: &PersistedState) -> Result<()> {
        *self.envelope.lock().await = Some(envelope.clone());
        Ok(())
    }
}
