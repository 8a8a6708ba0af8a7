//! # frota-store: Document Store for Frota Rent
//!
//! Persistence for vehicles, contracts, damage records and the audit trail,
//! as one hierarchical JSON tree addressed by slash-separated paths.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Frota Rent Data Flow                             │
//! │                                                                         │
//! │  frota-engine (contract lifecycle, check-in, damages)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   frota-store (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │     Store     │───►│  Repositories │───►│DocumentStore │   │   │
//! │  │   │   (handle)    │    │ vehicle, ...  │    │    trait     │   │   │
//! │  │   └───────────────┘    └───────────────┘    └──────┬───────┘   │   │
//! │  │                                                    │           │   │
//! │  │                                 ┌──────────────────┼────────┐  │   │
//! │  │                                 ▼                  ▼        │  │   │
//! │  │                           MemoryStore        SqliteStore    │  │   │
//! │  │                           (tests, demo)      (nodes table)  │  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`store`] - `DocumentStore` trait, multi-path updates, subscriptions
//! - [`memory`] / [`sqlite`] - backends
//! - [`path`] - path parsing and collection layout
//! - [`repository`] - typed repositories and the [`Store`] handle
//! - [`migrations`] - embedded SQLite migrations
//! - [`error`] - store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use frota_store::{Store, StoreConfig};
//!
//! let store = Store::sqlite(StoreConfig::new("path/to/frota.db")).await?;
//! let vehicles = store.vehicles().list().await?;
//! let mut changes = store.raw().subscribe("contracts_active")?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod memory;
pub mod migrations;
pub mod path;
pub mod repository;
pub mod sqlite;
pub mod store;
mod tree;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, StoreConfig};
pub use store::{ChangeEvent, DocumentStore, MultiPathUpdate, Subscription};

// Repository re-exports for convenience
pub use repository::{
    AuditEntry, AuditRepository, ContractRepository, DamageRepository, Store, VehicleRepository,
};
