//! Short-lived cache of rendered pages.
//!
//! Entries expire after a fixed TTL; a zero TTL turns the cache off.
//! Stale entries are dropped on lookup and swept on every insert, so the
//! map never holds more than what was rendered within one TTL.

use std::future::Future;
use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Debug, Clone)]
struct CachedPage {
    body: String,
    stored_at: Instant,
}

#[derive(Debug)]
pub struct PageCache {
    ttl: Duration,
    pages: DashMap<String, CachedPage>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pages: DashMap::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let hit = self.pages.get(key)?;
        if hit.stored_at.elapsed() < self.ttl {
            return Some(hit.body.clone());
        }
        drop(hit);
        self.pages.remove(key);
        None
    }

    pub fn insert(&self, key: String, body: String) {
        if !self.is_enabled() {
            return;
        }
        self.pages.retain(|_, page| page.stored_at.elapsed() < self.ttl);
        self.pages.insert(
            key,
            CachedPage {
                body,
                stored_at: Instant::now(),
            },
        );
    }

    /// Returns the cached body or renders, stores and returns a fresh one.
    /// Failed renders are not cached.
    pub async fn get_or_render<F, Fut, E>(&self, key: String, render: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        if let Some(body) = self.get(&key) {
            log::debug!("page cache hit: {key}");
            return Ok(body);
        }
        let body = render().await?;
        self.insert(key, body.clone());
        Ok(body)
    }

    pub fn clear(&self) {
        self.pages.clear();
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_stored_body_until_cleared() {
        let cache = PageCache::new(Duration::from_secs(60));
        let first: Result<_, ()> = cache.get_or_render("k".into(), || async { Ok("one".to_string()) }).await;
        assert_eq!(first.unwrap(), "one");

        let second: Result<_, ()> = cache.get_or_render("k".into(), || async { Ok("two".to_string()) }).await;
        assert_eq!(second.unwrap(), "one");

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn zero_ttl_stores_nothing() {
        let cache = PageCache::disabled();
        cache.insert("k".into(), "body".into());
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn expired_entries_are_evicted() {
        let cache = PageCache::new(Duration::from_millis(1));
        cache.insert("k".into(), "body".into());
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn insert_sweeps_expired_keys() {
        let cache = PageCache::new(Duration::from_millis(100));
        for i in 0..200 {
            cache.insert(format!("/?junk={i}|"), "body".into());
        }
        assert_eq!(cache.len(), 200);
        std::thread::sleep(Duration::from_millis(150));
        cache.insert("1|".into(), "fresh".into());
        assert_eq!(cache.len(), 1);
    }
}
