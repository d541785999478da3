use std::{num::NonZeroUsize, time::Duration};

use instant::Instant;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const DEFAULT_CAPACITY: usize = 128;
const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Kind of analysis a cached response belongs to. Same content analyzed for different
/// categories yields different entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheCategory {
    Graph,
    MindmapShape,
    Trace,
}

impl CacheCategory {
    pub fn tag(self) -> &'static str {
        match self {
            CacheCategory::Graph => "graph",
            CacheCategory::MindmapShape => "mindmap-shape",
            CacheCategory::Trace => "trace",
        }
    }
}

/// Fixed-size digest of category and content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    pub fn new(content: &str, category: CacheCategory) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(category.tag().as_bytes());
        hasher.update([0u8]);
        hasher.update(content.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Entries kept before the least recently used one is evicted.
    pub capacity: usize,
    /// Age after which an entry is treated as absent.
    pub ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl: DEFAULT_TTL,
        }
    }
}

impl CacheSettings {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<P> {
    stored_at: Instant,
    payload: P,
}

/// Time-boxed store of collaborator responses.
///
/// Expiry is lazy: an entry older than the TTL is removed when a read observes it. Nothing
/// sweeps the cache in the background; [`ResponseCache::purge_expired_at`] is available for
/// hosts that want to.
#[derive(Debug)]
pub struct ResponseCache<P> {
    entries: LruCache<CacheKey, CacheEntry<P>>,
    ttl: Duration,
}

impl<P: Clone> Default for ResponseCache<P> {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}

impl<P: Clone> ResponseCache<P> {
    pub fn new(settings: CacheSettings) -> Self {
        let capacity = NonZeroUsize::new(settings.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            ttl: settings.ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
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

    pub fn get(&mut self, content: &str, category: CacheCategory) -> Option<P> {
        self.get_at(content, category, Instant::now())
    }

    pub fn set(&mut self, content: &str, category: CacheCategory, payload: P) {
        self.set_at(content, category, payload, Instant::now());
    }

    /// Cached payload as of `now`. An expired entry is purged and reported absent.
    pub fn get_at(&mut self, content: &str, category: CacheCategory, now: Instant) -> Option<P> {
        let key = CacheKey::new(content, category);
        let expired = self.is_expired(self.entries.peek(&key)?, now);
        if expired {
            self.entries.pop(&key);
            log::debug!("cache entry for {} expired", category.tag());
            return None;
        }
        self.entries.get(&key).map(|e| e.payload.clone())
    }

    /// Stores `payload`, overwriting any entry for the same content and refreshing its age.
    pub fn set_at(&mut self, content: &str, category: CacheCategory, payload: P, now: Instant) {
        let key = CacheKey::new(content, category);
        let evicted = self.entries.push(
            key,
            CacheEntry {
                stored_at: now,
                payload,
            },
        );
        if let Some((evicted_key, _)) = evicted {
            if evicted_key != key {
                log::trace!("cache full, evicted least recently used entry");
            }
        }
    }

    /// Removes every entry expired as of `now`. Returns how many were removed.
    pub fn purge_expired_at(&mut self, now: Instant) -> usize {
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, e)| self.is_expired(e, now))
            .map(|(k, _)| *k)
            .collect();
        for key in &expired {
            self.entries.pop(key);
        }
        expired.len()
    }

    fn is_expired(&self, entry: &CacheEntry<P>, now: Instant) -> bool {
        now > entry.stored_at && now.duration_since(entry.stored_at) > self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_set_then_get() {
        let mut cache = ResponseCache::default();
        let t0 = Instant::now();
        cache.set_at("fn main() {}", CacheCategory::Graph, "payload".to_string(), t0);
        assert_eq!(
            cache.get_at("fn main() {}", CacheCategory::Graph, t0 + MINUTE),
            Some("payload".to_string())
        );
    }

    #[test]
    fn test_categories_are_separate() {
        let mut cache = ResponseCache::default();
        let t0 = Instant::now();
        cache.set_at("x = 1", CacheCategory::Graph, 1, t0);
        cache.set_at("x = 1", CacheCategory::Trace, 2, t0);
        assert_eq!(cache.get_at("x = 1", CacheCategory::Graph, t0), Some(1));
        assert_eq!(cache.get_at("x = 1", CacheCategory::Trace, t0), Some(2));
        assert_eq!(cache.get_at("x = 1", CacheCategory::MindmapShape, t0), None);
    }

    #[test]
    fn test_expires_after_ttl_and_is_purged() {
        let mut cache = ResponseCache::default();
        let t0 = Instant::now();
        cache.set_at("code", CacheCategory::Graph, 7, t0);

        assert_eq!(cache.get_at("code", CacheCategory::Graph, t0 + 30 * MINUTE), Some(7));
        assert_eq!(cache.get_at("code", CacheCategory::Graph, t0 + 31 * MINUTE), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reset_refreshes_age() {
        let mut cache = ResponseCache::default();
        let t0 = Instant::now();
        cache.set_at("code", CacheCategory::Graph, 1, t0);
        cache.set_at("code", CacheCategory::Graph, 2, t0 + 20 * MINUTE);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_at("code", CacheCategory::Graph, t0 + 45 * MINUTE), Some(2));
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let mut cache = ResponseCache::new(CacheSettings::default().with_capacity(2));
        let t0 = Instant::now();
        cache.set_at("a", CacheCategory::Graph, 1, t0);
        cache.set_at("b", CacheCategory::Graph, 2, t0);
        assert_eq!(cache.get_at("a", CacheCategory::Graph, t0), Some(1));
        cache.set_at("c", CacheCategory::Graph, 3, t0);
        assert_eq!(cache.get_at("b", CacheCategory::Graph, t0), None);
        assert_eq!(cache.get_at("a", CacheCategory::Graph, t0), Some(1));
        assert_eq!(cache.get_at("c", CacheCategory::Graph, t0), Some(3));
    }

    #[test]
    fn test_purge_expired() {
        let mut cache = ResponseCache::new(CacheSettings::default().with_ttl(MINUTE));
        let t0 = Instant::now();
        cache.set_at("old", CacheCategory::Graph, 1, t0);
        cache.set_at("new", CacheCategory::Graph, 2, t0 + MINUTE);
        assert_eq!(cache.purge_expired_at(t0 + MINUTE + MINUTE / 2), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_key_is_stable_and_category_tagged() {
        let a = CacheKey::new("same", CacheCategory::Graph);
        assert_eq!(a, CacheKey::new("same", CacheCategory::Graph));
        assert_ne!(a, CacheKey::new("same", CacheCategory::Trace));
        assert_ne!(
            CacheKey::new("ab", CacheCategory::Graph),
            CacheKey::new("b", CacheCategory::Graph)
        );
    }

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&CacheCategory::MindmapShape).unwrap();
        assert_eq!(json, r#""mindmap-shape""#);
    }
}
