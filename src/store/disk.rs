use crate::core::store::DocumentStore;
use anyhow::Result;
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions};
use std::path::Path;
use tracing::debug;

/// Persistent document store backed by a fjall keyspace. Collections map to
/// partitions; documents are raw bytes keyed by string.
pub struct FjallStore {
    keyspace: Keyspace,
}

impl FjallStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;
        let keyspace = fjall::Config::new(path).open()?;
        Ok(Self { keyspace })
    }

    fn partition(&self, name: &str) -> Result<fjall::PartitionHandle> {
        Ok(self
            .keyspace
            .open_partition(name, PartitionCreateOptions::default())?)
    }
}

#[async_trait]
impl DocumentStore for FjallStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let partition = self.partition(collection)?;
        let value = partition.get(key)?.map(|slice| slice.to_vec());
        debug!(
            "Store GET {collection}/{key}: {}",
            if value.is_some() { "hit" } else { "miss" }
        );
        Ok(value)
    }

    async fn put(&self, collection: &str, key: &str, value: &[u8]) -> Result<()> {
        let partition = self.partition(collection)?;
        partition.insert(key, value)?;
        debug!("Store PUT {collection}/{key}");
        Ok(())
    }

    async fn remove(&self, collection: &str, key: &str) -> Result<()> {
        let partition = self.partition(collection)?;
        partition.remove(key)?;
        debug!("Store REMOVE {collection}/{key}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_get_put_remove() {
        let dir = tempdir().unwrap();
        let store = FjallStore::open(dir.path()).unwrap();

        assert!(store.get("portfolios", "u1").await.unwrap().is_none());

        store.put("portfolios", "u1", b"doc").await.unwrap();
        assert_eq!(
            store.get("portfolios", "u1").await.unwrap(),
            Some(b"doc".to_vec())
        );

        store.remove("portfolios", "u1").await.unwrap();
        assert!(store.get("portfolios", "u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let dir = tempdir().unwrap();
        let store = FjallStore::open(dir.path()).unwrap();

        store.put("portfolios", "k", b"a").await.unwrap();
        store.put("sessions", "k", b"b").await.unwrap();

        assert_eq!(
            store.get("portfolios", "k").await.unwrap(),
            Some(b"a".to_vec())
        );
        assert_eq!(
            store.get("sessions", "k").await.unwrap(),
            Some(b"b".to_vec())
        );
    }

    #[tokio::test]
    async fn test_put_overwrites_last_write_wins() {
        let dir = tempdir().unwrap();
        let store = FjallStore::open(dir.path()).unwrap();

        store.put("portfolios", "u1", b"first").await.unwrap();
        store.put("portfolios", "u1", b"second").await.unwrap();
        assert_eq!(
            store.get("portfolios", "u1").await.unwrap(),
            Some(b"second".to_vec())
        );
    }

    #[tokio::test]
    async fn test_reopen_preserves_documents() {
        let dir = tempdir().unwrap();
        {
            let store = FjallStore::open(dir.path()).unwrap();
            store.put("portfolios", "u1", b"persisted").await.unwrap();
        }
        let store = FjallStore::open(dir.path()).unwrap();
        assert_eq!(
            store.get("portfolios", "u1").await.unwrap(),
            Some(b"persisted".to_vec())
        );
    }
}
