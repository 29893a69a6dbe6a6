//! In-memory key-value store.
//!
//! Keys compare case-insensitively and are unique. Writing to an existing key
//! replaces its value and timestamp in place, so insertion order is stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

/// One remembered fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryItem {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

impl MemoryItem {
    fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: Utc::now(),
        }
    }

    fn matches_key(&self, key: &str) -> bool {
        self.key.to_lowercase() == key.to_lowercase()
    }
}

/// The demo profile installed by [`MemoryStore::seeded`].
const SEED_FACTS: &[(&str, &str)] = &[
    ("name", "Alex Johnson"),
    ("age", "28"),
    ("location", "San Francisco"),
    ("occupation", "Software Developer"),
    ("hobbies", "hiking, reading sci-fi, playing guitar"),
    ("favorite_food", "sushi and ramen"),
    ("pet", "a golden retriever named Max"),
];

/// A shared key-value store. Every operation holds the lock for its whole
/// duration, so each one is atomic with respect to concurrent runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<Vec<MemoryItem>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with the demo profile facts.
    pub fn seeded() -> Self {
        let items = SEED_FACTS
            .iter()
            .map(|(key, value)| MemoryItem::new(key, value))
            .collect();
        Self {
            items: RwLock::new(items),
        }
    }

    /// Insert a fact, or overwrite the value of an existing key in place.
    pub async fn add(&self, key: &str, value: &str) -> MemoryItem {
        let mut items = self.items.write().await;
        if let Some(item) = items.iter_mut().find(|i| i.matches_key(key)) {
            item.value = value.to_string();
            item.updated_at = Utc::now();
            debug!(key = %item.key, "Memory overwritten");
            return item.clone();
        }
        let item = MemoryItem::new(key, value);
        items.push(item.clone());
        debug!(key, "Memory added");
        item
    }

    /// Look up a fact by key, ignoring case.
    pub async fn get(&self, key: &str) -> Option<MemoryItem> {
        self.items
            .read()
            .await
            .iter()
            .find(|i| i.matches_key(key))
            .cloned()
    }

    /// All facts whose key or value contains `query`, ignoring case,
    /// in insertion order. An empty query matches everything.
    pub async fn search(&self, query: &str) -> Vec<MemoryItem> {
        let needle = query.to_lowercase();
        self.items
            .read()
            .await
            .iter()
            .filter(|i| {
                i.key.to_lowercase().contains(&needle) || i.value.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Change the value of an existing key. Returns `false` if the key is absent.
    pub async fn update(&self, key: &str, value: &str) -> bool {
        let mut items = self.items.write().await;
        match items.iter_mut().find(|i| i.matches_key(key)) {
            Some(item) => {
                item.value = value.to_string();
                item.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Remove a key. Returns `false` if it was absent.
    pub async fn delete(&self, key: &str) -> bool {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|i| !i.matches_key(key));
        items.len() < before
    }

    /// Every fact, in insertion order.
    pub async fn list(&self) -> Vec<MemoryItem> {
        self.items.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn seeded_store_has_profile() {
        let store = MemoryStore::seeded();
        assert_eq!(store.len().await, 7);
        assert_eq!(store.get("name").await.unwrap().value, "Alex Johnson");
        assert_eq!(store.get("PET").await.unwrap().value, "a golden retriever named Max");
    }

    #[tokio::test]
    async fn add_overwrites_in_place() {
        let store = MemoryStore::new();
        store.add("color", "blue").await;
        store.add("city", "Oslo").await;
        let first = store.get("color").await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        store.add("Color", "green").await;

        let items = store.list().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].key, "color");
        assert_eq!(items[0].value, "green");
        assert!(items[0].updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn update_only_touches_existing_keys() {
        let store = MemoryStore::new();
        assert!(!store.update("missing", "x").await);
        assert!(store.is_empty().await);

        store.add("age", "28").await;
        assert!(store.update("AGE", "29").await);
        assert_eq!(store.get("age").await.unwrap().value, "29");
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let store = MemoryStore::seeded();
        assert!(store.delete("Hobbies").await);
        assert!(!store.delete("hobbies").await);
        assert!(store.get("hobbies").await.is_none());
        assert_eq!(store.len().await, 6);
    }

    #[tokio::test]
    async fn search_matches_keys_and_values_in_order() {
        let store = MemoryStore::seeded();
        let hits = store.search("SAN").await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "location");

        let hits = store.search("o").await;
        let keys: Vec<_> = hits.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys[0], "name");
        assert!(keys.contains(&"favorite_food"));

        assert!(store.search("zebra").await.is_empty());
        assert_eq!(store.search("").await.len(), 7);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_on_values() {
        let store = MemoryStore::seeded();
        let hits = store.search("max").await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, "a golden retriever named Max");
    }

    #[tokio::test]
    async fn concurrent_adds_never_duplicate_keys() {
        let store = Arc::new(MemoryStore::new());
        let writes = (0..32).map(|i| {
            let store = store.clone();
            async move {
                store.add("shared", &i.to_string()).await;
                store.add(&format!("own_{i}"), "v").await;
            }
        });
        futures::future::join_all(writes).await;

        let items = store.list().await;
        assert_eq!(items.len(), 33);
        assert_eq!(items.iter().filter(|i| i.key == "shared").count(), 1);
    }
}
