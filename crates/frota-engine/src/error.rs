//! # Engine Error Types
//!
//! Every failure an engine operation can report, with a stable code for the
//! UI and, for persistence failures, whether the write landed.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Variant               Raised                 Store touched?            │
//! │  ───────────────────   ────────────────────   ───────────────────────   │
//! │  Validation            before any write       no                        │
//! │  AvailabilityConflict  before any write       no                        │
//! │  Render                before any write       no                        │
//! │  NotFound              before any write       no                        │
//! │  InvalidTransition     before any write       no                        │
//! │  Persistence           read or write failed   see `outcome`             │
//! │  Config                at startup             no                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Vehicle reconciliation problems during check-in are not errors; they are
//! reported as [`crate::checkin::ReconciliationWarning`] on the outcome.

use std::fmt;
use thiserror::Error;

use frota_core::{ContractState, CoreError, ValidationError};

/// What is known about a failed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Nothing reached the store.
    NotApplied,
    /// The write is durable; a later step failed.
    Applied,
    /// The store gave no answer (timeout, failed commit).
    Unknown,
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOutcome::NotApplied => write!(f, "not applied"),
            WriteOutcome::Applied => write!(f, "applied"),
            WriteOutcome::Unknown => write!(f, "unknown"),
        }
    }
}

/// Engine operation errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A required field is missing or invalid.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The chosen vehicle is already on an active contract.
    #[error("Vehicle {plate} is already on an active contract")]
    AvailabilityConflict {
        vehicle_id: Option<String>,
        plate: String,
    },

    /// A store call failed or timed out.
    #[error("Store {operation} failed (write {outcome}): {message}")]
    Persistence {
        operation: &'static str,
        outcome: WriteOutcome,
        message: String,
    },

    /// The document renderer failed; nothing was written.
    #[error("Document generation failed: {0}")]
    Render(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The contract is not in the state the action requires.
    #[error("Cannot {action} contract {contract_id} while it is {state:?}")]
    InvalidTransition {
        contract_id: String,
        state: ContractState,
        action: &'static str,
    },

    /// Configuration could not be loaded, saved or validated.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Stable machine-readable code for the UI layer.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::AvailabilityConflict { .. } => "AVAILABILITY_CONFLICT",
            EngineError::Persistence { .. } => "PERSISTENCE_ERROR",
            EngineError::Render(_) => "RENDER_ERROR",
            EngineError::NotFound { .. } => "NOT_FOUND",
            EngineError::InvalidTransition { .. } => "INVALID_TRANSITION",
            EngineError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Write outcome for persistence errors; every other error precedes
    /// any write.
    pub fn write_outcome(&self) -> WriteOutcome {
        match self {
            EngineError::Persistence { outcome, .. } => *outcome,
            _ => WriteOutcome::NotApplied,
        }
    }

    /// Whether retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Persistence { .. } | EngineError::Render(_))
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::VehicleUnavailable { vehicle_id, plate } => {
                EngineError::AvailabilityConflict { vehicle_id, plate }
            }
            CoreError::InvalidTransition {
                contract_id,
                state,
                action,
            } => EngineError::InvalidTransition {
                contract_id,
                state,
                action,
            },
            CoreError::Validation(e) => EngineError::Validation(e),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for EngineError {
    fn from(err: toml::ser::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        let err: EngineError = ValidationError::required("cliente.nome").into();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(err.write_outcome(), WriteOutcome::NotApplied);

        let err = EngineError::Persistence {
            operation: "archive",
            outcome: WriteOutcome::Unknown,
            message: "timed out".into(),
        };
        assert_eq!(err.code(), "PERSISTENCE_ERROR");
        assert_eq!(err.write_outcome(), WriteOutcome::Unknown);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("write unknown"));
    }

    #[test]
    fn test_core_errors_map() {
        let err: EngineError = CoreError::VehicleUnavailable {
            vehicle_id: Some("v1".into()),
            plate: "AA-11-BB".into(),
        }
        .into();
        assert_eq!(err.code(), "AVAILABILITY_CONFLICT");
        assert!(!err.is_retryable());

        let err: EngineError = CoreError::InvalidTransition {
            contract_id: "c1".into(),
            state: ContractState::Terminated,
            action: "close",
        }
        .into();
        assert_eq!(err.code(), "INVALID_TRANSITION");
    }
}
