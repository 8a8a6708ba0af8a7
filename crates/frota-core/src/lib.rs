//! # frota-core: Pure Business Logic for Frota Rent
//!
//! Everything that decides *what* should happen to a rental contract lives
//! here. Nothing in this crate touches the store, the renderer or the
//! image pipeline.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Frota Rent Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Browser UI (forms, wizards)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 frota-engine (orchestration)                    │   │
//! │  │    create / edit / close / reopen / delete / check-in          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ frota-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │  pricing  │  │ available │  │  contract  │  │  damage   │  │   │
//! │  │   │  days     │  │ ids/plates│  │  close     │  │  summary  │  │   │
//! │  │   │  totals   │  │ selection │  │  reopen    │  │  patches  │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO STORE • NO NETWORK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                frota-store (document store)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Vehicles, identities and authorship metadata
//! - [`contract`] - Rental contracts and their state transitions
//! - [`checkin`] - The `rececao` record captured on vehicle return
//! - [`damage`] - Damage items, records and the printable summary
//! - [`pricing`] - Day counts and totals
//! - [`availability`] - Which vehicles are tied to active contracts
//! - [`money`] - Euro amounts in integer cents
//! - [`validation`] - Plate format and required-field checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use frota_core::pricing::quote;
//!
//! let q = quote("2024-01-01", "2024-01-05", 50.0, 0.0, 0.0);
//! assert_eq!(q.days, 4);
//! assert_eq!(q.total.cents(), 20_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod availability;
pub mod checkin;
pub mod contract;
pub mod damage;
pub mod error;
pub mod lenient;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use availability::{UnavailableSet, VehicleClaim};
pub use checkin::{CheckinDraft, CheckinRecord, DetailedChecklist};
pub use contract::{Client, Contract, ContractState, RentalTerms};
pub use damage::{DamageItem, DamageRecord, Responsibility, Severity};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Minimum number of return photographs a check-in must carry.
///
/// ## Business Reason
/// Four photos cover the four sides of the car; anything less has led to
/// disputes over damage that could not be attributed to a rental.
pub const MIN_CHECKIN_PHOTOS: usize = 4;

/// Value written to `aluguer.estado` when a contract is archived.
pub const STATUS_TERMINATED: &str = "terminado";

/// Suffix appended to a vehicle label in selection lists when it is taken.
pub const UNAVAILABLE_MARKER: &str = "(indisponível)";

/// Milliseconds in one rental day.
pub const MS_PER_DAY: i64 = 86_400_000;

/// Display name used when the signed-in user has neither name nor email.
pub const UNKNOWN_USER_NAME: &str = "—";
