use crate::core::store::DocumentStore;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory document store for tests and ephemeral runs.
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<(String, String), Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let map = self.inner.lock().await;
        let value = map.get(&(collection.to_string(), key.to_string())).cloned();
        debug!(
            "Store GET {collection}/{key}: {}",
            if value.is_some() { "hit" } else { "miss" }
        );
        Ok(value)
    }

    async fn put(&self, collection: &str, key: &str, value: &[u8]) -> Result<()> {
        let mut map = self.inner.lock().await;
        debug!("Store PUT {collection}/{key}");
        map.insert((collection.to_string(), key.to_string()), value.to_vec());
        Ok(())
    }

    async fn remove(&self, collection: &str, key: &str) -> Result<()> {
        let mut map = self.inner.lock().await;
        map.remove(&(collection.to_string(), key.to_string()));
        debug!("Store REMOVE {collection}/{key}");
        Ok(())
    }
}
