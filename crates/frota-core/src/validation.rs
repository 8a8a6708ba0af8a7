//! # Validation Module
//!
//! Plate handling and required-field checks.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Browser form                                                 │
//! │  ├── Input masks (plate formatting as you type)                        │
//! │  └── Disabled options for unavailable vehicles                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required fields before any write                                  │
//! │  └── Plate format                                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: frota-engine                                                 │
//! │  └── Availability re-check at submit time                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use frota_core::validation::{format_plate, validate_plate_format};
//!
//! let plate = format_plate("aa11bb");
//! assert_eq!(plate, "AA-11-BB");
//! assert!(validate_plate_format(&plate).is_ok());
//! ```

use crate::contract::Contract;
use crate::error::ValidationError;
use crate::pricing::parse_rental_date;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Plates
// =============================================================================

/// Comparison key for plates: trimmed and lower-cased.
///
/// Every plate fallback (availability, vehicle lookup, damage filtering)
/// compares through this key so `" AA-11-BB"` and `"aa-11-bb"` match.
pub fn plate_key(plate: &str) -> String {
    plate.trim().to_lowercase()
}

/// Formats raw input into the canonical `XX-XX-XX` shape.
///
/// Upper-cases, drops anything that is not an ASCII letter or digit, keeps
/// at most six characters and groups them in pairs. Partial input yields
/// partial groups (`"aa1"` → `"AA-1"`).
pub fn format_plate(raw: &str) -> String {
    let cleaned: Vec<char> = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .take(6)
        .collect();

    cleaned
        .chunks(2)
        .map(|pair| pair.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("-")
}

/// Checks the canonical `XX-XX-XX` form (letters or digits in each pair).
pub fn validate_plate_format(plate: &str) -> ValidationResult<()> {
    let plate = plate.trim().to_uppercase();
    if plate.is_empty() {
        return Err(ValidationError::required("matricula"));
    }

    let groups: Vec<&str> = plate.split('-').collect();
    let well_formed = groups.len() == 3
        && groups
            .iter()
            .all(|g| g.len() == 2 && g.chars().all(|c| c.is_ascii_alphanumeric()));

    if !well_formed {
        return Err(ValidationError::InvalidFormat {
            field: "matricula".to_string(),
            reason: "expected XX-XX-XX".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Field Helpers
// =============================================================================

/// Fails with `Required` when the text is empty after trimming.
pub fn require_text(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

/// Accepts `None`, rejects NaN, infinities and negatives.
pub fn validate_optional_amount(field: &str, value: Option<f64>) -> ValidationResult<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Contract Validation
// =============================================================================

/// Required fields for creating or editing a contract.
///
/// ## Rules
/// - `cliente.nome`, `veiculo.matricula`, `aluguer.inicio` and `aluguer.fim`
///   must be present
/// - both dates must parse
/// - `aluguer.precoDiario` must be a finite, non-negative number when given
/// - deposit, extras and discount follow the same rule
pub fn validate_contract(contract: &Contract) -> ValidationResult<()> {
    require_text("cliente.nome", &contract.cliente.nome)?;
    require_text("veiculo.matricula", &contract.veiculo.matricula)?;
    require_text("aluguer.inicio", &contract.aluguer.inicio)?;
    require_text("aluguer.fim", &contract.aluguer.fim)?;

    for (field, value) in [
        ("aluguer.inicio", &contract.aluguer.inicio),
        ("aluguer.fim", &contract.aluguer.fim),
    ] {
        if parse_rental_date(value).is_none() {
            return Err(ValidationError::InvalidFormat {
                field: field.to_string(),
                reason: "expected YYYY-MM-DD or an ISO 8601 date-time".to_string(),
            });
        }
    }

    validate_optional_amount("aluguer.precoDiario", contract.aluguer.preco_diario)?;
    validate_optional_amount("aluguer.precoCaucao", contract.aluguer.preco_caucao)?;
    validate_optional_amount("aluguer.extras", contract.aluguer.extras)?;
    validate_optional_amount("aluguer.desconto", contract.aluguer.desconto)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
