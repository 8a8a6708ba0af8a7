//! # Document Store Contract
//!
//! The operations every backend offers, plus change notification plumbing.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        DocumentStore                                    │
//! │                                                                         │
//! │  read(path)            ──► Option<Value>   (subtree, None when absent)  │
//! │  write(path, value)    ──► replace subtree (null deletes)               │
//! │  update(MultiPath)     ──► all paths or none, one change event          │
//! │  subscribe(path)       ──► Subscription, fires on overlapping writes    │
//! │                                                                         │
//! │  Writers ──► ChangeFeed (broadcast, 256) ──► Subscription::changed()    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::path::StorePath;

/// Broadcast capacity for change events.
const CHANGE_FEED_CAPACITY: usize = 256;

// =============================================================================
// Trait
// =============================================================================

/// A path-addressable JSON document store.
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug + 'static {
    /// Backend name for logs (`"memory"`, `"sqlite"`).
    fn backend(&self) -> &'static str;

    /// Reads the subtree at `path`.
    async fn read(&self, path: &str) -> StoreResult<Option<Value>>;

    /// Replaces the subtree at `path`. Writing `Value::Null` deletes it.
    async fn write(&self, path: &str, value: Value) -> StoreResult<()>;

    /// Applies every entry of `update` atomically.
    async fn update(&self, update: MultiPathUpdate) -> StoreResult<()>;

    /// Listens for writes touching `path`, its ancestors or descendants.
    fn subscribe(&self, path: &str) -> StoreResult<Subscription>;
}

// =============================================================================
// Multi-Path Update
// =============================================================================

/// A set of path writes applied as one unit.
///
/// ## Example
/// ```rust,ignore
/// let update = MultiPathUpdate::new()
///     .set("contracts_terminated/c1", doc)
///     .remove("contracts_active/c1");
/// store.update(update).await?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiPathUpdate {
    entries: BTreeMap<String, Value>,
}

impl MultiPathUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: impl Into<String>, value: Value) -> Self {
        self.entries.insert(path.into(), value);
        self
    }

    pub fn remove(self, path: impl Into<String>) -> Self {
        self.set(path, Value::Null)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Target paths, as given.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Parses every path and rejects the root and overlapping pairs.
    pub fn into_entries(self) -> StoreResult<Vec<(StorePath, Value)>> {
        let mut parsed: Vec<(StorePath, Value)> = Vec::with_capacity(self.entries.len());
        for (raw, value) in self.entries {
            let path = StorePath::parse(&raw)?;
            if path.is_root() {
                return Err(StoreError::invalid_path(raw, "cannot write the root"));
            }
            if let Some((other, _)) = parsed.iter().find(|(p, _)| p.overlaps(&path)) {
                return Err(StoreError::OverlappingPaths {
                    first: other.to_string(),
                    second: path.to_string(),
                });
            }
            parsed.push((path, value));
        }
        Ok(parsed)
    }
}

/// Parses a path that is about to be written.
pub(crate) fn writable_path(raw: &str) -> StoreResult<StorePath> {
    let path = StorePath::parse(raw)?;
    if path.is_root() {
        return Err(StoreError::invalid_path(raw, "cannot write the root"));
    }
    Ok(path)
}

// =============================================================================
// Change Events
// =============================================================================

/// Paths written by one `write` or `update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub paths: Vec<StorePath>,
    /// Set when the listener fell behind and events were dropped; the
    /// listener should re-read instead of trusting `paths`.
    pub resync: bool,
}

impl ChangeEvent {
    pub fn new(paths: Vec<StorePath>) -> Self {
        ChangeEvent {
            paths,
            resync: false,
        }
    }

    pub fn touches(&self, path: &StorePath) -> bool {
        self.resync || self.paths.iter().any(|p| p.overlaps(path))
    }
}

/// Fan-out of change events to every subscription of one store.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        ChangeFeed { tx }
    }
}

impl ChangeFeed {
    pub fn publish(&self, paths: Vec<StorePath>) {
        // No receivers is fine.
        let receivers = self.tx.send(ChangeEvent::new(paths)).unwrap_or(0);
        debug!(receivers, "Change event published");
    }

    pub fn subscribe(&self, path: StorePath) -> Subscription {
        Subscription {
            path,
            rx: Some(self.tx.subscribe()),
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// A live listener on one path. Dropping it detaches the listener.
#[derive(Debug)]
pub struct Subscription {
    path: StorePath,
    rx: Option<broadcast::Receiver<ChangeEvent>>,
}

impl Subscription {
    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Waits for the next write touching this path.
    ///
    /// Returns `None` once the subscription is closed or the store is gone.
    /// When the listener lags, a `resync` event is returned in place of the
    /// dropped ones.
    pub async fn changed(&mut self) -> Option<ChangeEvent> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(event) if event.touches(&self.path) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(n)) => {
                    warn!(path = %self.path, dropped = n, "Subscription lagged, requesting resync");
                    return Some(ChangeEvent {
                        paths: vec![self.path.clone()],
                        resync: true,
                    });
                }
                Err(RecvError::Closed) => {
                    self.rx = None;
                    return None;
                }
            }
        }
    }

    /// Detaches from the store. Idempotent.
    pub fn close(&mut self) {
        if self.rx.take().is_some() {
            debug!(path = %self.path, "Subscription closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_none()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(raw: &str) -> StorePath {
        StorePath::parse(raw).unwrap()
    }

    #[test]
    fn test_update_rejects_overlap() {
        let update = MultiPathUpdate::new()
            .set("contracts_active", json!({}))
            .remove("contracts_active/c1");
        assert!(matches!(
            update.into_entries(),
            Err(StoreError::OverlappingPaths { .. })
        ));
    }

    #[test]
    fn test_update_rejects_root() {
        let update = MultiPathUpdate::new().set("/", json!(1));
        assert!(matches!(update.into_entries(), Err(StoreError::InvalidPath { .. })));
    }

    #[test]
    fn test_update_accepts_siblings() {
        let entries = MultiPathUpdate::new()
            .set("contracts_terminated/c1", json!({"a": 1}))
            .remove("contracts_active/c1")
            .into_entries()
            .unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_event_touches_overlap() {
        let event = ChangeEvent::new(vec![p("contracts_active/c1")]);
        assert!(event.touches(&p("contracts_active")));
        assert!(event.touches(&p("contracts_active/c1/aluguer")));
        assert!(!event.touches(&p("contracts_terminated")));
    }

    #[tokio::test]
    async fn test_subscription_filters_by_path() {
        let feed = ChangeFeed::default();
        let mut sub = feed.subscribe(p("contracts_active"));

        feed.publish(vec![p("vehicles/v1")]);
        feed.publish(vec![p("contracts_active/c1")]);

        let event = sub.changed().await.unwrap();
        assert_eq!(event.paths, vec![p("contracts_active/c1")]);
        assert!(!event.resync);
    }

    #[tokio::test]
    async fn test_close_detaches() {
        let feed = ChangeFeed::default();
        let mut sub = feed.subscribe(p("vehicles"));
        assert_eq!(feed.receiver_count(), 1);

        sub.close();
        sub.close();
        assert!(sub.is_closed());
        assert_eq!(feed.receiver_count(), 0);
        assert!(sub.changed().await.is_none());
    }

    #[tokio::test]
    async fn test_closed_feed_ends_subscription() {
        let feed = ChangeFeed::default();
        let mut sub = feed.subscribe(p("vehicles"));
        drop(feed);
        assert!(sub.changed().await.is_none());
        assert!(sub.is_closed());
    }

    #[tokio::test]
    async fn test_lag_yields_resync() {
        let feed = ChangeFeed::default();
        let mut sub = feed.subscribe(p("vehicles"));
        for i in 0..(CHANGE_FEED_CAPACITY + 10) {
            feed.publish(vec![p(&format!("vehicles/v{}", i))]);
        }
        let event = sub.changed().await.unwrap();
        assert!(event.resync);
    }
}
