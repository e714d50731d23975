//! In-memory caching for rate snapshots.
//!
//! Rates for a past date never change, so the short TTL here is not a
//! correctness mechanism: it only absorbs bursts of identical requests. The
//! durable store beneath this layer is the real long-lived cache.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use time::Date;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::RateSnapshot;
use crate::error::RatesError;
use crate::provider::RateProvider;

/// Cache bounds. The key is the date alone: the base currency is fixed per
/// deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 5_000,
            ttl: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    snapshot: RateSnapshot,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<Date, CacheEntry>,
    config: CacheConfig,
}

impl CacheInner {
    fn new(config: CacheConfig) -> Self {
        Self {
            map: HashMap::new(),
            config,
        }
    }

    fn get(&self, date: Date) -> Option<RateSnapshot> {
        self.map.get(&date).and_then(|entry| {
            if Instant::now() <= entry.expires_at {
                Some(entry.snapshot.clone())
            } else {
                None
            }
        })
    }

    fn put(&mut self, date: Date, snapshot: RateSnapshot) {
        if self.map.len() >= self.config.capacity && !self.map.contains_key(&date) {
            let now = Instant::now();
            self.map.retain(|_, entry| entry.expires_at > now);
        }
        if self.map.len() >= self.config.capacity && !self.map.contains_key(&date) {
            // Uniform TTL makes earliest expiry the oldest entry; ties
            // break on the earlier date to keep eviction deterministic.
            if let Some(oldest) = self
                .map
                .iter()
                .min_by_key(|(date, entry)| (entry.expires_at, **date))
                .map(|(date, _)| *date)
            {
                self.map.remove(&oldest);
            }
        }

        let expires_at = Instant::now() + self.config.ttl;
        self.map.insert(
            date,
            CacheEntry {
                snapshot,
                expires_at,
            },
        );
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

/// Thread-safe, bounded, time-expiring snapshot cache.
#[derive(Debug)]
pub struct SnapshotCache {
    inner: RwLock<CacheInner>,
}

impl SnapshotCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: RwLock::new(CacheInner::new(config)),
        }
    }

    pub async fn get(&self, date: Date) -> Option<RateSnapshot> {
        let cache = self.inner.read().await;
        cache.get(date)
    }

    pub async fn put(&self, date: Date, snapshot: RateSnapshot) {
        let mut cache = self.inner.write().await;
        cache.put(date, snapshot);
    }

    pub async fn len(&self) -> usize {
        let cache = self.inner.read().await;
        cache.len()
    }
}

/// Decorates a provider with the cache. Failures are never cached: a failed
/// lookup re-executes the full delegate chain on the next call.
pub struct CachedProvider {
    cache: SnapshotCache,
    delegate: Arc<dyn RateProvider>,
}

impl CachedProvider {
    pub fn new(config: CacheConfig, delegate: Arc<dyn RateProvider>) -> Self {
        Self {
            cache: SnapshotCache::new(config),
            delegate,
        }
    }

    async fn get(&self, date: Date) -> Result<RateSnapshot, RatesError> {
        if let Some(snapshot) = self.cache.get(date).await {
            debug!(%date, "snapshot cache hit");
            return Ok(snapshot);
        }
        debug!(%date, "snapshot cache miss");

        let snapshot = self.delegate.get_rates(date).await?;
        self.cache.put(date, snapshot.clone()).await;
        Ok(snapshot)
    }
}

impl RateProvider for CachedProvider {
    fn get_rates<'a>(
        &'a self,
        date: Date,
    ) -> Pin<Box<dyn Future<Output = Result<RateSnapshot, RatesError>> + Send + 'a>> {
        Box::pin(self.get(date))
    }
}
