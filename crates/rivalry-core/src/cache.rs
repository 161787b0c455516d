//! Cache collaborator
//!
//! The pipeline only needs `get_or_set`: return the stored value for a key,
//! or run the compute closure and store its result. Locking and stampede
//! protection belong to the implementation, not the caller.
//!
//! `InMemoryCache` is a process-local implementation used by the CLI and
//! tests. Each key has its own lock, held across compute, so concurrent
//! callers of one key compute at most once while other keys proceed. The
//! entry map itself is only locked for lookups and inserts. Entries past
//! their TTL but inside the stale window are recomputed; the stale value is
//! served if that recompute fails.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::Result;

/// Deferred computation handed to the cache
pub type ComputeFn<'a> = Box<dyn FnOnce() -> Result<Value> + Send + 'a>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// How long past the TTL a value may still be served
    pub stale_ttl: Duration,
    pub tags: Vec<String>,
}

#[async_trait]
pub trait InsightsCache: Send + Sync {
    async fn get_or_set<'a>(
        &'a self,
        key: &'a str,
        ttl: Duration,
        options: CacheOptions,
        compute: ComputeFn<'a>,
    ) -> Result<Value>;
}

struct Entry {
    value: Value,
    stored_at: Instant,
    ttl: Duration,
    stale_ttl: Duration,
    tags: Vec<String>,
}

impl Entry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) < self.ttl
    }

    fn is_servable(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) < self.ttl + self.stale_ttl
    }
}

#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    /// Per-key compute locks, dropped once no caller holds them
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    computes: AtomicUsize,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times a compute closure has run
    pub fn compute_count(&self) -> usize {
        self.computes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Drop every entry carrying `tag`; returns how many were removed
    pub async fn invalidate_tag(&self, tag: &str) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, e| !e.tags.iter().any(|t| t == tag));
        before - entries.len()
    }

    pub async fn invalidate(&self, key: &str) -> bool {
        self.entries.lock().await.remove(key).is_some()
    }

    async fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    async fn release_key_lock(&self, key: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // The map and `lock` are the only holders
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
    }

    async fn lookup_or_compute(
        &self,
        key: &str,
        ttl: Duration,
        options: CacheOptions,
        compute: ComputeFn<'_>,
    ) -> Result<Value> {
        let now = Instant::now();
        let stale = match self.entries.lock().await.get(key) {
            Some(entry) if entry.is_fresh(now) => {
                tracing::debug!(key, "Cache hit");
                return Ok(entry.value.clone());
            }
            Some(entry) if entry.is_servable(now) => Some(entry.value.clone()),
            _ => None,
        };

        tracing::debug!(key, stale = stale.is_some(), "Cache miss, computing");
        self.computes.fetch_add(1, Ordering::SeqCst);
        let value = match compute() {
            Ok(value) => value,
            Err(e) => {
                return match stale {
                    Some(value) => {
                        tracing::warn!(key, error = %e, "Recompute failed, serving stale value");
                        Ok(value)
                    }
                    None => Err(e),
                };
            }
        };

        let mut entries = self.entries.lock().await;
        entries.retain(|_, e| e.is_servable(now));
        entries.insert(
            key.to_string(),
            Entry {
                value: value.clone(),
                stored_at: now,
                ttl,
                stale_ttl: options.stale_ttl,
                tags: options.tags,
            },
        );
        Ok(value)
    }
}

#[async_trait]
impl InsightsCache for InMemoryCache {
    async fn get_or_set<'a>(
        &'a self,
        key: &'a str,
        ttl: Duration,
        options: CacheOptions,
        compute: ComputeFn<'a>,
    ) -> Result<Value> {
        let lock = self.key_lock(key).await;
        let result = {
            let _guard = lock.lock().await;
            self.lookup_or_compute(key, ttl, options, compute).await
        };
        self.release_key_lock(key, lock).await;
        result
    }
}
