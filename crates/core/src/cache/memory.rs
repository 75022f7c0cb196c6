//! In-process cache store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CacheEntry, CacheStore, RequestKey};
use crate::Error;

type Generation = HashMap<RequestKey, CacheEntry>;

/// In-memory [`CacheStore`].
///
/// Uses a HashMap of generations behind a tokio RwLock. Contents are lost
/// when the process exits.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    generations: Arc<RwLock<HashMap<String, Generation>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn generations(&self) -> Result<Vec<String>, Error> {
        let mut names: Vec<String> = self.generations.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn lookup(&self, generation: &str, key: &RequestKey) -> Result<Option<CacheEntry>, Error> {
        let generations = self.generations.read().await;
        Ok(generations.get(generation).and_then(|g| g.get(key)).cloned())
    }

    async fn put(&self, generation: &str, entry: CacheEntry) -> Result<(), Error> {
        let mut generations = self.generations.write().await;
        generations
            .entry(generation.to_string())
            .or_default()
            .insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn commit_generation(&self, generation: &str, entries: Vec<CacheEntry>) -> Result<(), Error> {
        let staged: Generation = entries.into_iter().map(|e| (e.key.clone(), e)).collect();
        self.generations.write().await.insert(generation.to_string(), staged);
        Ok(())
    }

    async fn delete_generation(&self, generation: &str) -> Result<bool, Error> {
        Ok(self.generations.write().await.remove(generation).is_some())
    }

    async fn keys(&self, generation: &str) -> Result<Vec<RequestKey>, Error> {
        let generations = self.generations.read().await;
        let mut keys: Vec<RequestKey> = generations
            .get(generation)
            .map(|g| g.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort_by(|a, b| a.url().cmp(b.url()));
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ResponseSnapshot;
    use url::Url;

    fn entry(url: &str, body: &'static str) -> CacheEntry {
        let key = RequestKey::get(&Url::parse(url).unwrap());
        CacheEntry::new(key, ResponseSnapshot::new(200, Vec::new(), body))
    }

    #[tokio::test]
    async fn test_put_creates_generation_lazily() {
        let store = MemoryStore::new();
        assert!(!store.has_generation("dynamic-v1").await.unwrap());

        store.put("dynamic-v1", entry("http://origin/a.css", "a")).await.unwrap();

        assert!(store.has_generation("dynamic-v1").await.unwrap());
        assert_eq!(store.keys("dynamic-v1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let store = MemoryStore::new();
        store.put("dynamic-v1", entry("http://origin/a.css", "old")).await.unwrap();
        store.put("dynamic-v1", entry("http://origin/a.css", "new")).await.unwrap();

        let key = RequestKey::get(&Url::parse("http://origin/a.css").unwrap());
        let found = store.lookup("dynamic-v1", &key).await.unwrap().unwrap();
        assert_eq!(found.response.body.as_ref(), b"new");
    }

    #[tokio::test]
    async fn test_commit_replaces_generation() {
        let store = MemoryStore::new();
        store.put("static-v1", entry("http://origin/old.js", "x")).await.unwrap();
        store
            .commit_generation("static-v1", vec![entry("http://origin/new.js", "y")])
            .await
            .unwrap();

        let keys = store.keys("static-v1").await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].url(), "http://origin/new.js");
    }

    #[tokio::test]
    async fn test_lookup_any_prefers_first_generation() {
        let store = MemoryStore::new();
        store.put("static-v1", entry("http://origin/a.css", "static")).await.unwrap();
        store.put("dynamic-v1", entry("http://origin/a.css", "dynamic")).await.unwrap();

        let key = RequestKey::get(&Url::parse("http://origin/a.css").unwrap());
        let found = store.lookup_any(&["dynamic-v1", "static-v1"], &key).await.unwrap().unwrap();
        assert_eq!(found.response.body.as_ref(), b"dynamic");
    }

    #[tokio::test]
    async fn test_delete_generation() {
        let store = MemoryStore::new();
        store.put("old", entry("http://origin/a.css", "a")).await.unwrap();

        assert!(store.delete_generation("old").await.unwrap());
        assert!(!store.delete_generation("old").await.unwrap());
        assert!(store.generations().await.unwrap().is_empty());
    }
}
