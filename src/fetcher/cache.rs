//! In-memory response cache keyed by URL

use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

/// Bounded response cache
///
/// Holds at most `capacity` bodies. Inserting past capacity evicts the entry
/// that was stored first. A capacity of 0 disables caching.
pub struct ResponseCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, Bytes>,
    order: VecDeque<String>,
}

impl ResponseCache {
    /// Create an empty cache holding up to `capacity` responses
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Cached body for `url`, if any
    pub async fn get(&self, url: &str) -> Option<Bytes> {
        self.inner.lock().await.entries.get(url).cloned()
    }

    /// Store `body` for `url`, replacing any previous entry
    pub async fn insert(&self, url: String, body: Bytes) {
        if self.capacity == 0 {
            return;
        }

        let mut inner = self.inner.lock().await;
        if inner.entries.insert(url.clone(), body).is_some() {
            return;
        }
        inner.order.push_back(url);

        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
    }

    /// Drop every cached response
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
        inner.order.clear();
    }

    /// Number of cached responses
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    /// Whether the cache holds no responses
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
