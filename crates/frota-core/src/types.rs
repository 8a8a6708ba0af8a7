//! # Domain Types
//!
//! Inventory and identity types shared by every other module.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Vehicle      │   │    Identity     │   │    UserMeta     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (store key) │   │  id             │   │  uid            │       │
//! │  │  matricula      │   │  email          │   │  email          │       │
//! │  │  quilometragem  │   │  display_name   │   │  nome           │       │
//! │  │  fotos          │   └────────┬────────┘   └─────────────────┘       │
//! │  └─────────────────┘            └── signed-in user ──► stamped on docs  │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │ VehicleChecklist│   │    FuelLevel    │                             │
//! │  │  pneus, pintura │   │  75  | "75%"    │                             │
//! │  │  vidros, luzes  │   │  numeric | text │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every vehicle has:
//! - `id`: the store key, used as the weak reference from contracts
//! - `matricula`: the plate, the human business key and lookup fallback

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use ts_rs::TS;

use crate::lenient;
use crate::validation::plate_key;
use crate::UNKNOWN_USER_NAME;

// =============================================================================
// Identity
// =============================================================================

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Authorship stamp embedded in documents (`criadoPor`, `terminadoPor`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserMeta {
    pub uid: Option<String>,
    pub email: Option<String>,
    pub nome: String,
}

impl UserMeta {
    /// Builds the stamp for the current user, or an anonymous one.
    ///
    /// `nome` falls back from display name to email to `"—"`.
    pub fn from_identity(identity: Option<&Identity>) -> Self {
        match identity {
            Some(user) => {
                let nome = user
                    .display_name
                    .as_deref()
                    .filter(|n| !n.trim().is_empty())
                    .or(user.email.as_deref())
                    .unwrap_or(UNKNOWN_USER_NAME)
                    .to_string();
                UserMeta {
                    uid: Some(user.id.clone()),
                    email: user.email.clone(),
                    nome,
                }
            }
            None => UserMeta::anonymous(),
        }
    }

    pub fn anonymous() -> Self {
        UserMeta {
            uid: None,
            email: None,
            nome: UNKNOWN_USER_NAME.to_string(),
        }
    }
}

// =============================================================================
// Fuel Level
// =============================================================================

/// Fuel level as stored on a vehicle: a number or descriptive text.
///
/// Inventory screens store `"75%"`; older records hold a bare number or a
/// word like `"cheio"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(untagged)]
pub enum FuelLevel {
    Numeric(f64),
    Descriptive(String),
}

impl FuelLevel {
    /// The `"NN%"` form written back after a check-in.
    pub fn from_percent(percent: u8) -> Self {
        FuelLevel::Descriptive(format!("{}%", percent.min(100)))
    }

    /// Percentage, when the value can be read as one.
    ///
    /// ```rust
    /// use frota_core::types::FuelLevel;
    ///
    /// assert_eq!(FuelLevel::Descriptive("75%".into()).percent(), Some(75));
    /// assert_eq!(FuelLevel::Numeric(50.0).percent(), Some(50));
    /// assert_eq!(FuelLevel::Descriptive("cheio".into()).percent(), None);
    /// ```
    pub fn percent(&self) -> Option<u8> {
        let value = match self {
            FuelLevel::Numeric(n) => Some(*n),
            FuelLevel::Descriptive(s) => {
                s.trim().trim_end_matches('%').trim().parse::<f64>().ok()
            }
        }?;
        value
            .is_finite()
            .then(|| value.clamp(0.0, 100.0).round() as u8)
    }
}

impl fmt::Display for FuelLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuelLevel::Numeric(n) => write!(f, "{}%", n),
            FuelLevel::Descriptive(s) => f.write_str(s),
        }
    }
}

// =============================================================================
// Vehicle
// =============================================================================

/// Five quick condition flags kept on the inventory record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct VehicleChecklist {
    pub pneus: bool,
    pub pintura: bool,
    pub vidros: bool,
    pub interior: bool,
    pub luzes: bool,
}

/// A vehicle in the inventory (`vehicles/{id}`).
///
/// The same shape is copied into a contract as the vehicle snapshot at
/// signing time. Keys this type does not model are kept in `extra` so a
/// read-modify-write never drops data written by other screens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    /// Store key; not part of the stored document.
    #[serde(skip)]
    pub id: Option<String>,

    /// Plate in `XX-XX-XX` form.
    #[serde(default)]
    pub matricula: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marca: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modelo: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cor: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_i32",
        skip_serializing_if = "Option::is_none"
    )]
    pub ano: Option<i32>,

    /// Fuel type (gasolina, gasóleo, elétrico...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combustivel: Option<String>,

    #[serde(
        default,
        alias = "km",
        deserialize_with = "lenient::opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub quilometragem: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nivel_combustivel: Option<FuelLevel>,

    /// Free-text condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,

    #[serde(default)]
    pub estado_checklist: VehicleChecklist,

    #[serde(default)]
    pub fotos: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disponivel: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atualizado_por: Option<UserMeta>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub atualizado_em: Option<DateTime<Utc>>,

    #[serde(flatten)]
    #[ts(skip)]
    pub extra: Map<String, Value>,
}

impl Vehicle {
    /// Lower-cased trimmed plate used for every plate comparison.
    pub fn plate_key(&self) -> String {
        plate_key(&self.matricula)
    }

    /// `"Renault Clio • AA-11-BB"`, the label used in selection lists.
    pub fn label(&self) -> String {
        format!(
            "{} {} • {}",
            self.marca.as_deref().unwrap_or(""),
            self.modelo.as_deref().unwrap_or(""),
            self.matricula
        )
    }

    /// Returns a copy carrying the given store key.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
