//! # Availability Resolver
//!
//! Which vehicles are tied to an active contract.
//!
//! ```text
//! contracts_active/*  ──►  UnavailableSet { ids, plates }
//!                               │
//!     vehicle v is unavailable  ◄┘  if v.id ∈ ids  OR  key(v.matricula) ∈ plates
//! ```
//!
//! The plate half exists for contracts signed before vehicles had ids; the
//! two checks are OR-ed. There is no date-window logic: any active contract
//! blocks its vehicle for as long as the contract stays active.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use ts_rs::TS;

use crate::contract::Contract;
use crate::error::{CoreError, CoreResult};
use crate::types::Vehicle;
use crate::validation::plate_key;
use crate::UNAVAILABLE_MARKER;

// =============================================================================
// Unavailable Set
// =============================================================================

/// The vehicle an active contract holds: its id, its plate, or both.
///
/// Claims are read from the raw contract documents, so a contract whose
/// other fields no longer decode still blocks its vehicle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VehicleClaim {
    pub contract_id: String,
    pub vehicle_id: Option<String>,
    pub plate: String,
}

impl From<&Contract> for VehicleClaim {
    fn from(contract: &Contract) -> Self {
        VehicleClaim {
            contract_id: contract.id.clone(),
            vehicle_id: contract.vehicle_id().map(str::to_string),
            plate: contract.veiculo.matricula.clone(),
        }
    }
}

/// Vehicle ids and plate keys referenced by active contracts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UnavailableSet {
    ids: BTreeSet<String>,
    plates: BTreeSet<String>,
}

impl UnavailableSet {
    /// Builds the set from the claims of every active contract.
    pub fn from_claims<'a>(claims: impl IntoIterator<Item = &'a VehicleClaim>) -> Self {
        let mut set = UnavailableSet::default();
        for claim in claims {
            set.insert(claim.vehicle_id.as_deref(), &claim.plate);
        }
        set
    }

    /// Same as [`from_claims`](Self::from_claims) but ignores one contract,
    /// so editing a contract never conflicts with itself.
    pub fn excluding<'a>(
        claims: impl IntoIterator<Item = &'a VehicleClaim>,
        contract_id: &str,
    ) -> Self {
        Self::from_claims(claims.into_iter().filter(|c| c.contract_id != contract_id))
    }

    fn insert(&mut self, vehicle_id: Option<&str>, plate: &str) {
        if let Some(id) = vehicle_id.map(str::trim).filter(|id| !id.is_empty()) {
            self.ids.insert(id.to_string());
        }
        let plate = plate_key(plate);
        if !plate.is_empty() {
            self.plates.insert(plate);
        }
    }

    pub fn contains_id(&self, vehicle_id: &str) -> bool {
        self.ids.contains(vehicle_id)
    }

    /// Plate lookup; the argument is normalized first.
    pub fn contains_plate(&self, plate: &str) -> bool {
        let key = plate_key(plate);
        !key.is_empty() && self.plates.contains(&key)
    }

    /// True when either the id or the plate is taken.
    pub fn is_unavailable(&self, vehicle_id: Option<&str>, plate: &str) -> bool {
        vehicle_id.map(|id| self.contains_id(id)).unwrap_or(false) || self.contains_plate(plate)
    }

    pub fn vehicle_is_unavailable(&self, vehicle: &Vehicle) -> bool {
        self.is_unavailable(vehicle.id.as_deref(), &vehicle.matricula)
    }

    /// Submit-time check; the UI disabling an option is not enough.
    pub fn ensure_available(&self, vehicle_id: Option<&str>, plate: &str) -> CoreResult<()> {
        if self.is_unavailable(vehicle_id, plate) {
            return Err(CoreError::VehicleUnavailable {
                vehicle_id: vehicle_id.map(str::to_string),
                plate: plate.trim().to_string(),
            });
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.plates.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.plates.clear();
    }
}

// =============================================================================
// Selection Listing
// =============================================================================

/// A vehicle as offered in the contract form's selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SelectableVehicle {
    pub vehicle: Vehicle,
    pub selectable: bool,
    /// `"Marca Modelo • XX-XX-XX"`, with `(indisponível)` when taken.
    pub label: String,
}

/// Flags every vehicle found in either half of `unavailable`.
///
/// When editing, pass a set built with [`UnavailableSet::excluding`] so the
/// contract's own vehicle stays selectable.
pub fn selectable_vehicles(vehicles: &[Vehicle], unavailable: &UnavailableSet) -> Vec<SelectableVehicle> {
    vehicles
        .iter()
        .map(|vehicle| {
            let taken = unavailable.vehicle_is_unavailable(vehicle);
            let mut label = vehicle.label();
            if taken {
                label.push(' ');
                label.push_str(UNAVAILABLE_MARKER);
            }
            SelectableVehicle {
                vehicle: vehicle.clone(),
                selectable: !taken,
                label,
            }
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
