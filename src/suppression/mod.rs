//! Time-bucketed suppression of repeated notifications
//!
//! Each error message is reduced to a fingerprint (SHA-256 of the message
//! text). While a flag for that fingerprint is live, the same fault does not
//! notify again. Two backends are provided:
//!
//! - [`MemorySuppressionStore`]: process-local, expiry checked on read
//! - [`RedisSuppressionStore`]: shared across processes, `SET ... NX EX`
//!
//! # Example
//!
//! ```rust,ignore
//! use startle::suppression::{suppression_key, MemorySuppressionStore, SuppressionStore};
//! use std::time::Duration;
//!
//! let store = MemorySuppressionStore::new();
//! let key = suppression_key("startle", "Allowed memory size exhausted");
//! if store.try_suppress(&key, Duration::from_secs(3600)).await? {
//!     // first occurrence in the window
//! }
//! ```

use async_trait::async_trait;
use deadpool_redis::{Config as PoolConfig, Pool, Runtime};
use redis::AsyncCommands;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::error::{Error, Result};

/// Content hash of an error message
pub fn fingerprint(message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(message.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Store key for a message under `prefix`
pub fn suppression_key(prefix: &str, message: &str) -> String {
    format!("{prefix}_{}", fingerprint(message))
}

/// TTL-capable flag store keyed by suppression key
#[async_trait]
pub trait SuppressionStore: Send + Sync {
    /// Whether a live flag exists for `key`
    async fn is_suppressed(&self, key: &str) -> Result<bool>;

    /// Set the flag for `key` unless a live one exists
    ///
    /// Check and write are a single atomic step. Returns `true` when this
    /// call set the flag, `false` when the key was already suppressed.
    async fn try_suppress(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Process-local suppression store
#[derive(Default)]
pub struct MemorySuppressionStore {
    entries: Mutex<HashMap<String, Instant>>,
}

impl MemorySuppressionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live flags
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|expires| **expires > now)
            .count()
    }

    /// Whether no live flags are held
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SuppressionStore for MemorySuppressionStore {
    async fn is_suppressed(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        match entries.get(key) {
            Some(expires) if *expires > now => Ok(true),
            Some(_) => {
                entries.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn try_suppress(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let expires = now.checked_add(ttl).ok_or_else(|| {
            Error::suppression(format!("Suppression window out of range: {}s", ttl.as_secs()))
        })?;

        let mut entries = self.entries.lock().await;
        entries.retain(|_, at| *at > now);
        if entries.contains_key(key) {
            return Ok(false);
        }

        entries.insert(key.to_string(), expires);
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Redis-backed suppression store
pub struct RedisSuppressionStore {
    pool: Pool,
}

impl RedisSuppressionStore {
    /// Connect to Redis and verify the connection
    pub async fn new(config: &RateLimitConfig) -> Result<Self> {
        let pool = PoolConfig::from_url(&config.redis_url)
            .builder()
            .map_err(|e| Error::suppression(format!("Failed to create pool builder: {e}")))?
            .max_size(4)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| Error::suppression(format!("Failed to create Redis pool: {e}")))?;

        let mut conn = pool
            .get()
            .await
            .map_err(|e| Error::suppression(format!("Failed to get Redis connection: {e}")))?;

        let _: String = redis::cmd("PING").query_async(&mut *conn).await?;

        tracing::info!(url = %config.redis_url, "Connected to Redis suppression store");

        Ok(Self { pool })
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| Error::suppression(format!("Failed to get Redis connection: {e}")))
    }
}

#[async_trait]
impl SuppressionStore for RedisSuppressionStore {
    async fn is_suppressed(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value.is_some_and(|v| !v.is_empty() && v != "0"))
    }

    async fn try_suppress(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.connection().await?;
        let set: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut *conn)
            .await?;
        Ok(set.is_some())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
