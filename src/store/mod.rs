//! Key-value store subsystem.
//!
//! # Data Flow
//! ```text
//! store URL (config)
//!     → StoreClient::connect
//!         redis://, rediss:// → redis.rs (multiplexed tokio connection)
//!         memory://           → memory.rs (in-process map)
//!     → ServiceRegistry.store
//!     → strategies read/write through StoreClient
//!
//! Shutdown:
//!     FLUSHALL → QUIT
//! ```
//!
//! # Design Decisions
//! - Strategies only see the `KeyValueStore` seam, never the driver
//! - Transient state only: the store is flushed on every graceful shutdown

pub mod memory;
pub mod redis;

use std::sync::Arc;

use futures_util::future::BoxFuture;
use thiserror::Error;

pub use memory::MemoryStore;
pub use self::redis::RedisStore;

/// Future returned by store operations.
pub type StoreFuture<'a, T> = BoxFuture<'a, Result<T, StoreError>>;

/// Errors raised by store clients.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store URL could not be parsed.
    #[error("invalid store url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Store URL scheme has no client.
    #[error("unsupported store scheme '{0}'")]
    UnsupportedScheme(String),

    /// Redis command or connection failure.
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// Value stored under the key is not an integer.
    #[error("value at '{0}' is not an integer")]
    NotAnInteger(String),

    /// Increment would leave the 64-bit signed range.
    #[error("increment at '{0}' would overflow")]
    Overflow(String),

    /// Operation issued after the connection was closed.
    #[error("store connection is closed")]
    Closed,
}

/// Operations the server needs from a key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> StoreFuture<'a, ()>;

    /// Increment the integer at `key` by one, creating it at zero first.
    fn incr<'a>(&'a self, key: &'a str) -> StoreFuture<'a, i64>;

    /// Remove every key.
    fn flush_all(&self) -> StoreFuture<'_, ()>;

    /// Gracefully close the connection.
    fn quit(&self) -> StoreFuture<'_, ()>;
}

/// Shared handle to the configured store.
#[derive(Clone)]
pub struct StoreClient {
    inner: Arc<dyn KeyValueStore>,
    backend: &'static str,
}

impl StoreClient {
    /// Connect to the store named by `url`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let parsed = url::Url::parse(url)?;
        match parsed.scheme() {
            "redis" | "rediss" => {
                let store = RedisStore::connect(url).await?;
                tracing::info!(backend = "redis", "Store connected");
                Ok(Self {
                    inner: Arc::new(store),
                    backend: "redis",
                })
            }
            "memory" => {
                tracing::info!(backend = "memory", "Store connected");
                Ok(Self::from_store(MemoryStore::new(), "memory"))
            }
            other => Err(StoreError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Wrap an existing store implementation.
    pub fn from_store(store: impl KeyValueStore + 'static, backend: &'static str) -> Self {
        Self {
            inner: Arc::new(store),
            backend,
        }
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set(key, value).await
    }

    pub async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        self.inner.incr(key).await
    }

    /// Flush all transient state, then close the connection.
    pub async fn close(self) -> Result<(), StoreError> {
        self.inner.flush_all().await?;
        self.inner.quit().await?;
        tracing::info!(backend = self.backend, "Store flushed and closed");
        Ok(())
    }
}

impl std::fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}
