//! # Error Types
//!
//! Domain-specific error types for frota-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  frota-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  frota-store errors (separate crate)                                   │
//! │  └── StoreError       - Document store failures                        │
//! │                                                                         │
//! │  frota-engine errors                                                   │
//! │  └── EngineError      - What the UI sees (with a stable code)          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → UI message          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::contract::ContractState;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The chosen vehicle is tied to an active contract.
    ///
    /// ## When This Occurs
    /// ```text
    /// Operator A opens the form, picks AA-11-BB (available)
    ///      │
    ///      ▼
    /// Operator B signs a contract for AA-11-BB
    ///      │
    ///      ▼
    /// Operator A submits
    ///      │
    ///      ▼
    /// VehicleUnavailable { plate: "AA-11-BB" }
    /// ```
    #[error("Vehicle {plate} is tied to an active contract")]
    VehicleUnavailable {
        vehicle_id: Option<String>,
        plate: String,
    },

    /// The contract is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Editing or checking in a contract that is already terminated
    /// - Reopening or deleting a contract that is still active
    #[error("Contract {contract_id} is {state:?}, cannot {action}")]
    InvalidTransition {
        contract_id: String,
        state: ContractState,
        action: &'static str,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before anything is written, so a failed validation never leaves
/// partial state behind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Invalid format (plate, date, number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Numeric value must be finite and not negative.
    #[error("{field} must be a non-negative number")]
    MustBeNonNegative { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Not enough photographs were supplied.
    #[error("at least {required} photos are required, got {provided}")]
    TooFewPhotos { required: usize, provided: usize },
}

impl ValidationError {
    /// Shorthand for the most common case.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Name of the offending field, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::Required { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::MustBeNonNegative { field }
            | ValidationError::OutOfRange { field, .. } => Some(field),
            ValidationError::TooFewPhotos { .. } => None,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
