//! # Repository Module
//!
//! Typed access to each collection of the document tree.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories over DocumentStore                      │
//! │                                                                         │
//! │  Engine operation                                                       │
//! │       │                                                                 │
//! │       │  store.contracts().archive(&closed)                             │
//! │       ▼                                                                 │
//! │  ContractRepository                                                     │
//! │  ├── get_active / get_terminated / state_of                             │
//! │  ├── put_active                                                         │
//! │  └── archive / restore / remove_terminated   (multi-path, atomic)       │
//! │       │                                                                 │
//! │       │  serde_json::Value at "contracts_active/{id}" ...               │
//! │       ▼                                                                 │
//! │  Arc<dyn DocumentStore>  (MemoryStore | SqliteStore)                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keys are not part of stored documents; repositories copy the key into
//! the `id` field of every document they return.
//!
//! ## Available Repositories
//!
//! - [`VehicleRepository`] - inventory, id and plate lookups
//! - [`ContractRepository`] - active/terminated contracts and moves between them
//! - [`DamageRepository`] - damage records per contract
//! - [`AuditRepository`] - removed-contract audit trail

pub mod audit;
pub mod contract;
pub mod damage;
pub mod vehicle;

pub use audit::{AuditEntry, AuditRepository};
pub use contract::ContractRepository;
pub use damage::DamageRepository;
pub use vehicle::VehicleRepository;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::memory::MemoryStore;
use crate::sqlite::{SqliteStore, StoreConfig};
use crate::store::DocumentStore;

// =============================================================================
// Store Handle
// =============================================================================

/// Cheap-to-clone handle giving repository access to one document store.
///
/// ## Usage
/// ```rust,ignore
/// let store = Store::sqlite(StoreConfig::new("./frota.db")).await?;
/// let active = store.contracts().list_active().await?;
/// ```
#[derive(Debug, Clone)]
pub struct Store {
    inner: Arc<dyn DocumentStore>,
}

impl Store {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Store { inner }
    }

    /// Fresh in-memory store.
    pub fn memory() -> Self {
        Store::new(Arc::new(MemoryStore::new()))
    }

    /// Opens (and migrates) a SQLite store.
    pub async fn sqlite(config: StoreConfig) -> StoreResult<Self> {
        Ok(Store::new(Arc::new(SqliteStore::new(config).await?)))
    }

    /// The underlying store, for subscriptions and raw paths.
    pub fn raw(&self) -> &Arc<dyn DocumentStore> {
        &self.inner
    }

    pub fn vehicles(&self) -> VehicleRepository {
        VehicleRepository::new(self.inner.clone())
    }

    pub fn contracts(&self) -> ContractRepository {
        ContractRepository::new(self.inner.clone())
    }

    pub fn damages(&self) -> DamageRepository {
        DamageRepository::new(self.inner.clone())
    }

    pub fn audit(&self) -> AuditRepository {
        AuditRepository::new(self.inner.clone())
    }
}

// =============================================================================
// Document Codec
// =============================================================================

pub(crate) fn encode<T: Serialize>(doc: &T) -> StoreResult<Value> {
    Ok(serde_json::to_value(doc)?)
}

pub(crate) fn decode<T: DeserializeOwned>(path: &str, value: Value) -> StoreResult<T> {
    serde_json::from_value(value).map_err(|e| StoreError::corrupt(path, e))
}

/// Decodes every child of a collection node, keyed by store key.
///
/// Children that fail to decode are logged and skipped so one bad
/// document cannot hide the rest of the collection.
pub(crate) fn decode_children<T: DeserializeOwned>(
    collection: &str,
    node: Option<Value>,
) -> Vec<(String, T)> {
    let Some(Value::Object(children)) = node else {
        return Vec::new();
    };

    children
        .into_iter()
        .filter_map(|(key, value)| match serde_json::from_value::<T>(value) {
            Ok(doc) => Some((key, doc)),
            Err(e) => {
                warn!(collection, key = %key, error = %e, "Skipping undecodable document");
                None
            }
        })
        .collect()
}
