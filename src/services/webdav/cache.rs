use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// What was stored for a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedBody {
    /// Raw multistatus body describing the resource
    Present(Bytes),
    /// The last lookup failed with this HTTP status
    Failed(u16),
}

#[derive(Debug, Clone)]
pub struct CachedBlob {
    pub body: CachedBody,
    pub expires_at: Instant,
}

/// Outcome of a cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(Bytes),
    Failed(u16),
    /// Never cached, invalidated, or expired
    Miss,
}

/// Short-lived property cache keyed by normalized resource path.
///
/// Entries are evicted lazily: an expired entry stays in the map until the
/// next `get` for its path removes it.
#[derive(Debug)]
pub struct ResourceCache {
    entries: HashMap<String, CachedBlob>,
    ttl: Duration,
}

impl ResourceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// TTL used by the session for every insert
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&mut self, path: &str) -> CacheLookup {
        let Some(blob) = self.entries.get(path) else {
            debug!("Cache miss for path: {}", path);
            return CacheLookup::Miss;
        };

        if blob.expires_at <= Instant::now() {
            debug!("Cache expired for path: {}", path);
            self.entries.remove(path);
            return CacheLookup::Miss;
        }

        match &blob.body {
            CachedBody::Present(body) => {
                debug!("Cache hit for path: {}", path);
                CacheLookup::Hit(body.clone())
            }
            CachedBody::Failed(status) => {
                debug!("Cached failure {} for path: {}", status, path);
                CacheLookup::Failed(*status)
            }
        }
    }

    pub fn insert(&mut self, path: impl Into<String>, body: CachedBody, ttl: Duration) {
        let path = path.into();
        debug!("Caching {} for {:?}", path, ttl);
        self.entries.insert(
            path,
            CachedBlob {
                body,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Drops the entry for `path`; with `include_ancestors` also drops every
    /// prefix of it, both with and without a trailing slash.
    pub fn invalidate(&mut self, path: &str, include_ancestors: bool) {
        if !include_ancestors {
            self.entries.remove(path);
            debug!("Invalidated cache for path: {}", path);
            return;
        }

        let segments: Vec<&str> = path.split('/').collect();
        for i in 1..=segments.len() {
            let prefix = segments[..i].join("/");
            self.entries.remove(&format!("{}/", prefix));
            self.entries.remove(&prefix);
        }
        debug!("Invalidated cache for path and ancestors: {}", path);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
