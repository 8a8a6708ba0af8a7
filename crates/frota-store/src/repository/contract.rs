//! # Contract Repository
//!
//! Contracts live in exactly one of two collections:
//!
//! ```text
//! contracts_active/{id}  ──archive──►  contracts_terminated/{id}  ──remove──►  audit/{category}/{id}
//!                        ◄──restore──
//! ```
//!
//! Every move is one multi-path update: the document is written at the
//! destination and nulled at the source in the same commit, so no reader
//! ever sees it in both places or in neither.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use frota_core::{Contract, ContractState, VehicleClaim};

use super::audit::AuditEntry;
use super::{decode, decode_children, encode};
use crate::error::StoreResult;
use crate::path::{self, CONTRACTS_ACTIVE, CONTRACTS_TERMINATED};
use crate::store::{DocumentStore, MultiPathUpdate};

#[derive(Debug, Clone)]
pub struct ContractRepository {
    store: Arc<dyn DocumentStore>,
}

impl ContractRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        ContractRepository { store }
    }

    /// Fresh contract key.
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    async fn get_at(&self, path: String, id: &str) -> StoreResult<Option<Contract>> {
        match self.store.read(&path).await? {
            Some(value) => {
                let mut contract: Contract = decode(&path, value)?;
                contract.id = id.to_string();
                Ok(Some(contract))
            }
            None => Ok(None),
        }
    }

    async fn list_at(&self, collection: &str) -> StoreResult<Vec<Contract>> {
        let node = self.store.read(collection).await?;
        Ok(decode_children::<Contract>(collection, node)
            .into_iter()
            .map(|(id, mut contract)| {
                contract.id = id;
                contract
            })
            .collect())
    }

    pub async fn get_active(&self, id: &str) -> StoreResult<Option<Contract>> {
        self.get_at(path::active_contract(id), id).await
    }

    pub async fn get_terminated(&self, id: &str) -> StoreResult<Option<Contract>> {
        self.get_at(path::terminated_contract(id), id).await
    }

    /// The contract and the collection it was found in, active first.
    pub async fn find(&self, id: &str) -> StoreResult<Option<(ContractState, Contract)>> {
        if let Some(contract) = self.get_active(id).await? {
            return Ok(Some((ContractState::Active, contract)));
        }
        Ok(self
            .get_terminated(id)
            .await?
            .map(|contract| (ContractState::Terminated, contract)))
    }

    pub async fn state_of(&self, id: &str) -> StoreResult<ContractState> {
        Ok(self
            .find(id)
            .await?
            .map(|(state, _)| state)
            .unwrap_or(ContractState::Missing))
    }

    pub async fn list_active(&self) -> StoreResult<Vec<Contract>> {
        self.list_at(CONTRACTS_ACTIVE).await
    }

    /// The vehicle held by every active contract, read from the raw
    /// documents. Only `veiculoId` and `veiculo.matricula` are looked at, so
    /// a contract with malformed terms still claims its vehicle.
    pub async fn active_claims(&self) -> StoreResult<Vec<VehicleClaim>> {
        let Some(Value::Object(children)) = self.store.read(CONTRACTS_ACTIVE).await? else {
            return Ok(Vec::new());
        };

        let mut claims = Vec::with_capacity(children.len());
        for (id, doc) in children {
            let vehicle_id = doc
                .get("veiculoId")
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string);
            let plate = doc
                .pointer("/veiculo/matricula")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if vehicle_id.is_none() && plate.trim().is_empty() {
                warn!(contract_id = %id, "Active contract references no vehicle");
                continue;
            }
            claims.push(VehicleClaim {
                contract_id: id,
                vehicle_id,
                plate,
            });
        }
        Ok(claims)
    }

    pub async fn list_terminated(&self) -> StoreResult<Vec<Contract>> {
        self.list_at(CONTRACTS_TERMINATED).await
    }

    /// Creates or replaces an active contract.
    pub async fn put_active(&self, contract: &Contract) -> StoreResult<()> {
        self.store
            .write(&path::active_contract(&contract.id), encode(contract)?)
            .await?;
        debug!(contract_id = %contract.id, "Active contract written");
        Ok(())
    }

    /// Moves `terminated` (already stamped) from active to terminated.
    pub async fn archive(&self, terminated: &Contract) -> StoreResult<()> {
        let id = &terminated.id;
        let update = MultiPathUpdate::new()
            .set(path::terminated_contract(id), encode(terminated)?)
            .remove(path::active_contract(id));
        self.store.update(update).await?;
        info!(contract_id = %id, "Contract archived");
        Ok(())
    }

    /// Moves `reopened` (already stripped) from terminated back to active.
    pub async fn restore(&self, reopened: &Contract) -> StoreResult<()> {
        let id = &reopened.id;
        let update = MultiPathUpdate::new()
            .set(path::active_contract(id), encode(reopened)?)
            .remove(path::terminated_contract(id));
        self.store.update(update).await?;
        info!(contract_id = %id, "Contract restored to active");
        Ok(())
    }

    /// Removes a terminated contract, leaving `entry` in the audit trail.
    pub async fn remove_terminated(&self, entry: &AuditEntry, category: &str) -> StoreResult<()> {
        let id = &entry.contract.id;
        let update = MultiPathUpdate::new()
            .set(path::audit_entry(category, id), encode(entry)?)
            .remove(path::terminated_contract(id));
        self.store.update(update).await?;
        info!(contract_id = %id, category, "Terminated contract removed to audit");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
