//! # frota-engine: Rental Engine for Frota Rent
//!
//! Contract lifecycle, check-in reconciliation, damage ledger and live
//! vehicle availability, built on [`frota_store`] and the pure rules in
//! [`frota_core`].
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Engine Operations                             │
//! │                                                                         │
//! │  create / edit ──► validate ──► availability ──► photos ──► price      │
//! │                                                   │                     │
//! │                                                   ▼                     │
//! │                        render PDF ──► photo write-back ──► persist      │
//! │                                                                         │
//! │  check-in ──► photos ──► validate ──► damages ──► render ──► vehicle   │
//! │                                                              │          │
//! │                                                              ▼          │
//! │                                                       archive contract  │
//! │                                                                         │
//! │  close / reopen / delete ──► one atomic multi-path update               │
//! │                                                                         │
//! │  watch_availability ──► store subscription + identity ──► live set     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Reporting
//! Every store call runs under the configured timeout. A failed operation
//! returns [`EngineError`]; for persistence failures
//! [`EngineError::write_outcome`] tells whether the write was not applied
//! or whether its outcome is unknown.
//!
//! ## Modules
//! - [`engine`] - the [`Engine`] handle and its collaborators
//! - [`lifecycle`] - create, edit, close, reopen, delete and queries
//! - [`checkin`] - vehicle return and inventory reconciliation
//! - [`damage`] - per-contract damage items
//! - [`availability`] - the live unavailable-vehicle watcher
//! - [`photos`] - photo encoding pipeline
//! - [`collaborators`] - identity, renderer and image processor seams
//! - [`config`] - TOML + environment configuration

pub mod availability;
pub mod checkin;
pub mod collaborators;
pub mod config;
pub mod damage;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod photos;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use availability::AvailabilityWatcher;
pub use checkin::{CheckinOutcome, ReconciliationWarning};
pub use collaborators::{
    DocumentRenderer, IdentityProvider, ImageError, ImageProcessor, PassthroughImages,
    PhotoSource, RenderError, StaticIdentity,
};
pub use config::EngineConfig;
pub use damage::{DamageReceipt, VehicleDamage};
pub use engine::{Collaborators, Engine};
pub use error::{EngineError, EngineResult, WriteOutcome};
pub use lifecycle::{ContractEdit, ContractReceipt, NewContract};
pub use photos::{PhotoBatch, PhotoPipeline, SkippedPhoto};
