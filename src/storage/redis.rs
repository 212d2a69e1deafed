//! Redis cache store.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::CacheStore;
use crate::types::PipelineError;

pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect, trying up to `max_attempts` times in total; a bot started
    /// alongside Redis may come up first.
    pub async fn connect(url: &str, max_attempts: u32) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| anyhow!("Invalid Redis URL: {e}"))?;
        let mut attempt = 0;
        loop {
            match ConnectionManager::new(client.clone()).await {
                Ok(conn) => {
                    info!("Connected to Redis");
                    return Ok(Self { conn });
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_attempts {
                        return Err(anyhow!(
                            "Failed to connect to Redis after {attempt} attempts: {e}"
                        ));
                    }
                    warn!(attempt, error = %e, "Redis connection attempt failed, retrying");
                    tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                }
            }
        }
    }
}

fn cache_error(op: &str, key: &str, e: redis::RedisError) -> PipelineError {
    PipelineError::Cache(format!("Redis {op} {key} failed: {e}"))
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PipelineError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.map_err(|e| cache_error("GET", key, e))?;
        debug!(key, hit = value.is_some(), "Redis GET");
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PipelineError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| cache_error("SET", key, e))?;
        debug!(key, "Redis SET");
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), PipelineError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| cache_error("DEL", key, e))?;
        debug!(key, "Redis DEL");
        Ok(())
    }
}
