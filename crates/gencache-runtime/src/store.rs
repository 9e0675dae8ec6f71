//! Persistent idea store boundary.
//!
//! A slower, secondary tier for idea lists. The engine only reads by key and
//! upserts by key; the schema behind the trait belongs to the implementor.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;

/// Errors from a persistent store.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Key-value store for serialized idea lists.
#[async_trait]
pub trait IdeaStore: Send + Sync {
    /// Serialized list stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert or replace the row for `key`.
    async fn upsert(&self, key: &str, query: &str, locale: &str, items: &str) -> Result<(), StoreError>;
}

/// One stored row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredIdeas {
    pub query: String,
    pub locale: String,
    pub items: String,
    pub updated_at: DateTime<Utc>,
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryIdeaStore {
    rows: RwLock<HashMap<String, StoredIdeas>>,
}

impl InMemoryIdeaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(&self, key: &str) -> Option<StoredIdeas> {
        self.rows.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[async_trait]
impl IdeaStore for InMemoryIdeaStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.rows.read().get(key).map(|row| row.items.clone()))
    }

    async fn upsert(&self, key: &str, query: &str, locale: &str, items: &str) -> Result<(), StoreError> {
        self.rows.write().insert(
            key.to_string(),
            StoredIdeas {
                query: query.to_string(),
                locale: locale.to_string(),
                items: items.to_string(),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_replaces_row() {
        let store = InMemoryIdeaStore::new();
        assert!(store.get("en_US:rust").await.unwrap().is_none());

        store.upsert("en_US:rust", "Rust", "en_US", "[1]").await.unwrap();
        store.upsert("en_US:rust", "rust", "en_US", "[2]").await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("en_US:rust").await.unwrap().as_deref(), Some("[2]"));
        assert_eq!(store.row("en_US:rust").unwrap().query, "rust");
    }
}
