//! MemoryStore - in-process config store with DashMap
//!
//! Lock-free concurrent reads; cloning shares the same map.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::ConfigStore;
use crate::error::Result;

/// Thread-safe in-memory store: (namespace, key) → payload
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<(String, String), Arc<[u8]>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry
    pub fn insert(&self, namespace: &str, key: &str, payload: impl AsRef<[u8]>) {
        self.entries.insert(
            (namespace.to_string(), key.to_string()),
            Arc::from(payload.as_ref()),
        );
    }

    /// Builder-style insert
    pub fn with_entry(self, namespace: &str, key: &str, payload: impl AsRef<[u8]>) -> Self {
        self.insert(namespace, key, payload);
        self
    }

    pub fn remove(&self, namespace: &str, key: &str) -> bool {
        self.entries
            .remove(&(namespace.to_string(), key.to_string()))
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn lookup(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .entries
            .get(&(namespace.to_string(), key.to_string()))
            .map(|entry| entry.value().to_vec()))
    }
}
