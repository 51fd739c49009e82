//! Embedding Cache (C4): `sha256(text) -> Vec<f32>`, LRU-evicted.
//!
//! Grounded on the teacher's `EmbeddingCache` in `llmspell-rag` (same
//! content-hash-keyed shape) but backed by the `lru` crate as
//! `llmspell-memory` does for its own bounded caches, behind a
//! `parking_lot::Mutex` since this is a small, hot, short-critical-section
//! structure (a `RwLock` buys nothing when every hit also touches LRU
//! order).

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use semem_core::ids::content_hash;

/// Default capacity (§4.4 "Capacity configurable (default 1024)").
pub const DEFAULT_CAPACITY: usize = 1024;

/// Content-addressed embedding cache.
pub struct EmbeddingCache {
    inner: Mutex<LruCache<String, Vec<f32>>>,
}

impl EmbeddingCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self { inner: Mutex::new(LruCache::new(capacity)) }
    }

    /// Look up a cached embedding by the sha256 of `text`.
    #[must_use]
    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        let key = content_hash(&[text]);
        self.inner.lock().get(&key).cloned()
    }

    /// Insert (or refresh) a cached embedding.
    pub fn put(&self, text: &str, embedding: Vec<f32>) {
        let key = content_hash(&[text]);
        self.inner.lock().put(key, embedding);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_put_then_hit() {
        let cache = EmbeddingCache::new(4);
        assert!(cache.get("hello").is_none());
        cache.put("hello", vec![1.0, 2.0]);
        assert_eq!(cache.get("hello"), Some(vec![1.0, 2.0]));
    }

    #[test]
    fn evicts_least_recently_used_beyond_capacity() {
        let cache = EmbeddingCache::new(2);
        cache.put("a", vec![1.0]);
        cache.put("b", vec![2.0]);
        cache.put("c", vec![3.0]); // evicts "a"
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn distinct_text_distinct_keys() {
        let cache = EmbeddingCache::new(4);
        cache.put("same prefix", vec![1.0]);
        cache.put("same prefi", vec![2.0]);
        assert_eq!(cache.get("same prefix"), Some(vec![1.0]));
        assert_eq!(cache.get("same prefi"), Some(vec![2.0]));
    }
}
