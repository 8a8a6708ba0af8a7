//! # In-Memory Backend
//!
//! The whole tree in one `serde_json::Value` behind a tokio `RwLock`.
//! Every write holds the lock for its full duration, so a multi-path
//! update is observed either entirely or not at all.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreResult;
use crate::path::StorePath;
use crate::store::{writable_path, ChangeFeed, DocumentStore, MultiPathUpdate, Subscription};
use crate::tree;

/// Volatile document store, used by tests and demos.
#[derive(Debug, Default)]
pub struct MemoryStore {
    root: RwLock<Value>,
    feed: ChangeFeed,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing tree (fixtures).
    pub fn with_root(root: Value) -> Self {
        MemoryStore {
            root: RwLock::new(tree::prune(root).unwrap_or(Value::Null)),
            feed: ChangeFeed::default(),
        }
    }

    /// Copy of the whole tree.
    pub async fn snapshot(&self) -> Value {
        self.root.read().await.clone()
    }

    /// Live subscriptions on this store.
    pub fn subscriber_count(&self) -> usize {
        self.feed.receiver_count()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn read(&self, path: &str) -> StoreResult<Option<Value>> {
        let path = StorePath::parse(path)?;
        let root = self.root.read().await;
        Ok(tree::get(&root, path.segments()).cloned())
    }

    async fn write(&self, path: &str, value: Value) -> StoreResult<()> {
        let path = writable_path(path)?;
        {
            let mut root = self.root.write().await;
            tree::set(&mut root, path.segments(), value);
        }
        debug!(path = %path, "Node written");
        self.feed.publish(vec![path]);
        Ok(())
    }

    async fn update(&self, update: MultiPathUpdate) -> StoreResult<()> {
        let entries = update.into_entries()?;
        if entries.is_empty() {
            return Ok(());
        }

        let mut paths = Vec::with_capacity(entries.len());
        {
            let mut root = self.root.write().await;
            for (path, value) in entries {
                tree::set(&mut root, path.segments(), value);
                paths.push(path);
            }
        }
        debug!(count = paths.len(), "Multi-path update applied");
        self.feed.publish(paths);
        Ok(())
    }

    fn subscribe(&self, path: &str) -> StoreResult<Subscription> {
        Ok(self.feed.subscribe(StorePath::parse(path)?))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let store = MemoryStore::new();
        store
            .write("vehicles/v1", json!({"matricula": "AA-11-BB", "ano": 2020}))
            .await
            .unwrap();

        assert_eq!(
            store.read("vehicles/v1/matricula").await.unwrap(),
            Some(json!("AA-11-BB"))
        );
        assert_eq!(
            store.read("vehicles").await.unwrap(),
            Some(json!({"v1": {"matricula": "AA-11-BB", "ano": 2020}}))
        );
        assert_eq!(store.read("vehicles/v2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_null_deletes() {
        let store = MemoryStore::new();
        store.write("a/b", json!(1)).await.unwrap();
        store.write("a/b", Value::Null).await.unwrap();
        assert_eq!(store.read("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_moves_document() {
        let store = MemoryStore::with_root(json!({
            "contracts_active": {"c1": {"cliente": {"nome": "Ana"}}}
        }));

        let update = MultiPathUpdate::new()
            .set("contracts_terminated/c1", json!({"cliente": {"nome": "Ana"}}))
            .remove("contracts_active/c1");
        store.update(update).await.unwrap();

        assert_eq!(store.read("contracts_active").await.unwrap(), None);
        assert!(store.read("contracts_terminated/c1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rejected_update_changes_nothing() {
        let store = MemoryStore::with_root(json!({"a": {"b": 1}}));
        let before = store.snapshot().await;

        let update = MultiPathUpdate::new().set("a", json!(2)).set("a/b", json!(3));
        assert!(store.update(update).await.is_err());
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_root_is_not_writable() {
        let store = MemoryStore::new();
        assert!(store.write("", json!({"a": 1})).await.is_err());
    }

    #[tokio::test]
    async fn test_subscription_sees_update_once() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("contracts_active").unwrap();

        let update = MultiPathUpdate::new()
            .set("contracts_active/c1", json!({"x": 1}))
            .set("contracts_active/c2", json!({"x": 2}));
        store.update(update).await.unwrap();
        store.write("vehicles/v1", json!({"x": 3})).await.unwrap();
        store.write("contracts_active/c1", Value::Null).await.unwrap();

        let first = sub.changed().await.unwrap();
        assert_eq!(first.paths.len(), 2);
        let second = sub.changed().await.unwrap();
        assert_eq!(second.paths[0].to_string(), "contracts_active/c1");
    }
}
