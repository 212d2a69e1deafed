//! JSON-file cache store.
//!
//! Loads the whole file into memory on open and rewrites it after every
//! change. Meant for a single bot instance on one host.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{CacheStore, MemoryStore};
use crate::types::PipelineError;

pub struct JsonFileStore {
    path: PathBuf,
    entries: MemoryStore,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read cache from {}", path.display()))?;
            let map: BTreeMap<String, String> = serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse cache from {}", path.display()))?;
            info!(path = %path.display(), entries = map.len(), "Cache loaded from disk");
            map
        } else {
            info!(path = %path.display(), "No cache file found, starting empty");
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: MemoryStore::from_entries(entries),
        })
    }

    fn persist(&self) -> Result<(), PipelineError> {
        let json = serde_json::to_string_pretty(&self.entries.snapshot())
            .map_err(|e| PipelineError::Cache(format!("Failed to serialise cache: {e}")))?;
        std::fs::write(&self.path, json).map_err(|e| {
            PipelineError::Cache(format!("Failed to write cache to {}: {e}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), "Cache saved");
        Ok(())
    }
}

#[async_trait]
impl CacheStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PipelineError> {
        self.entries.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PipelineError> {
        self.entries.set(key, value).await?;
        self.persist()
    }

    async fn del(&self, key: &str) -> Result<(), PipelineError> {
        self.entries.del(key).await?;
        self.persist()
    }
}
