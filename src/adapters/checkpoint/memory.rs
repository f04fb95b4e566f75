//! In-process checkpoint store used for dry runs and tests

use super::traits::CheckpointStore;
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;

/// Checkpoint store that lives only as long as the process
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    values: Mutex<HashMap<String, String>>,
    sets: Mutex<HashMap<String, BTreeSet<String>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn add_to_set(&self, key: &str, member: &str) -> Result<()> {
        self.sets
            .lock()
            .await
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn members(&self, key: &str) -> Result<Vec<String>> {
        Ok(self
            .sets
            .lock()
            .await
            .get(key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_values_overwrite() {
        let store = InMemoryCheckpointStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "a").await.unwrap();
        store.set("k", "b").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_set_membership_is_idempotent() {
        let store = InMemoryCheckpointStore::new();
        store.add_to_set("s", "y").await.unwrap();
        store.add_to_set("s", "x").await.unwrap();
        store.add_to_set("s", "y").await.unwrap();

        assert_eq!(store.members("s").await.unwrap(), vec!["x", "y"]);
        assert!(store.members("other").await.unwrap().is_empty());
    }
}
