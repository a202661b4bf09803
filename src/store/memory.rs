//! In-process store backed by a concurrent map.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::{KeyValueStore, StoreError, StoreFuture};

/// A thread-safe in-memory store.
///
/// Clones share the same map, so a clone kept aside can observe what the
/// server wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, String>>,
    closed: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move {
            self.ensure_open()?;
            Ok(self.inner.get(key).map(|v| v.value().clone()))
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.ensure_open()?;
            self.inner.insert(key.to_string(), value.to_string());
            Ok(())
        })
    }

    fn incr<'a>(&'a self, key: &'a str) -> StoreFuture<'a, i64> {
        Box::pin(async move {
            self.ensure_open()?;
            // The entry guard holds the shard lock, so read-modify-write is atomic.
            let mut entry = self.inner.entry(key.to_string()).or_insert_with(|| "0".to_string());
            let current: i64 = entry
                .parse()
                .map_err(|_| StoreError::NotAnInteger(key.to_string()))?;
            let next = current
                .checked_add(1)
                .ok_or_else(|| StoreError::Overflow(key.to_string()))?;
            *entry = next.to_string();
            Ok(next)
        })
    }

    fn flush_all(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.ensure_open()?;
            self.inner.clear();
            Ok(())
        })
    }

    fn quit(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.ensure_open()?;
            self.closed.store(true, Ordering::Release);
            Ok(())
        })
    }
}
