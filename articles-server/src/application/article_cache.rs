use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::article::Article;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    All,
    Id(i64),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::All => f.write_str("all"),
            CacheKey::Id(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CachedArticles {
    List(Arc<Vec<Article>>),
    Single(Arc<Article>),
}

/// Snapshot of the eviction counter taken before a repository read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CachedArticles>,
    generation: u64,
}

/// Unbounded memo store in front of the article repository.
///
/// Entries never expire; they are dropped only through [`ArticleCache::evict`].
/// Every eviction bumps a generation counter, and [`ArticleCache::put`]
/// refuses values loaded under an older generation, so a slow read cannot
/// re-populate a key that a concurrent mutation has just invalidated.
#[derive(Clone, Default)]
pub struct ArticleCache {
    state: Arc<Mutex<CacheState>>,
}

impl ArticleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: CacheKey) -> Option<CachedArticles> {
        self.state.lock().entries.get(&key).cloned()
    }

    pub fn generation(&self) -> Generation {
        Generation(self.state.lock().generation)
    }

    /// Stores `value` unless an eviction happened after `seen` was taken.
    pub fn put(&self, key: CacheKey, value: CachedArticles, seen: Generation) -> bool {
        let mut state = self.state.lock();
        if state.generation != seen.0 {
            return false;
        }
        state.entries.insert(key, value);
        true
    }

    pub fn evict(&self, key: CacheKey) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.entries.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(title: &str) -> CachedArticles {
        CachedArticles::Single(Arc::new(Article::new(
            title.into(),
            None,
            None,
            "Reja".into(),
        )))
    }

    #[test]
    fn keys_render_as_all_or_id() {
        assert_eq!(CacheKey::All.to_string(), "all");
        assert_eq!(CacheKey::Id(42).to_string(), "42");
    }

    #[test]
    fn evict_removes_only_that_key() {
        let cache = ArticleCache::new();
        let seen = cache.generation();
        assert!(cache.put(CacheKey::Id(1), single("one"), seen));
        assert!(cache.put(CacheKey::All, CachedArticles::List(Arc::new(Vec::new())), seen));

        cache.evict(CacheKey::Id(1));

        assert!(cache.get(CacheKey::Id(1)).is_none());
        assert!(cache.get(CacheKey::All).is_some());
    }

    #[test]
    fn stale_put_after_eviction_is_discarded() {
        let cache = ArticleCache::new();
        let seen = cache.generation();

        // a mutation lands between the reader's load and its put
        cache.evict(CacheKey::All);

        assert!(!cache.put(CacheKey::All, single("stale"), seen));
        assert!(cache.get(CacheKey::All).is_none());

        let fresh = single("fresh");
        assert!(cache.put(CacheKey::All, fresh.clone(), cache.generation()));
        assert_eq!(cache.get(CacheKey::All), Some(fresh));
    }
}
