//! Persistence layer for publication records.
//!
//! A flat key-value contract (`get`/`set`/`del`, no TTL) with three
//! backends: Redis for production, a JSON file for single-host setups, and
//! an in-memory map that the file backend builds on.

pub mod file;
pub mod memory;
pub mod redis;

use async_trait::async_trait;

use crate::types::PipelineError;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use self::redis::RedisStore;

/// Key-value store holding the last published fingerprint per cache key.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, PipelineError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), PipelineError>;
    async fn del(&self, key: &str) -> Result<(), PipelineError>;
}

/// Wraps a store so that writes are logged and dropped. Used by dry runs,
/// which must read the real records without ever replacing them.
pub struct ReadOnlyStore<S> {
    inner: S,
}

impl<S> ReadOnlyStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: CacheStore> CacheStore for ReadOnlyStore<S> {
    async fn get(&self, key: &str) -> Result<Option<String>, PipelineError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, _value: &str) -> Result<(), PipelineError> {
        tracing::info!(key, "[DRY RUN] Would update cache");
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), PipelineError> {
        tracing::info!(key, "[DRY RUN] Would clear cache");
        Ok(())
    }
}

#[async_trait]
impl<S: CacheStore + ?Sized> CacheStore for Box<S> {
    async fn get(&self, key: &str) -> Result<Option<String>, PipelineError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PipelineError> {
        (**self).set(key, value).await
    }

    async fn del(&self, key: &str) -> Result<(), PipelineError> {
        (**self).del(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_only_store_drops_writes() {
        let inner = MemoryStore::new();
        inner.set("hockey-bot-odds-NSH", "old").await.unwrap();

        let store = ReadOnlyStore::new(inner);
        store.set("hockey-bot-odds-NSH", "new").await.unwrap();
        store.del("hockey-bot-odds-NSH").await.unwrap();

        assert_eq!(store.get("hockey-bot-odds-NSH").await.unwrap().as_deref(), Some("old"));
    }
}
