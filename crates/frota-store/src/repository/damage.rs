//! # Damage Repository
//!
//! One [`DamageRecord`] per contract under `damages/{contractId}`.

use std::sync::Arc;
use tracing::debug;

use frota_core::DamageRecord;

use super::{decode, decode_children, encode};
use crate::error::{StoreError, StoreResult};
use crate::path::{self, DAMAGES};
use crate::store::DocumentStore;

#[derive(Debug, Clone)]
pub struct DamageRepository {
    store: Arc<dyn DocumentStore>,
}

impl DamageRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        DamageRepository { store }
    }

    pub async fn get(&self, contract_id: &str) -> StoreResult<Option<DamageRecord>> {
        let path = path::damage_record(contract_id);
        match self.store.read(&path).await? {
            Some(value) => {
                let mut record: DamageRecord = decode(&path, value)?;
                if record.contrato_id.is_empty() {
                    record.contrato_id = contract_id.to_string();
                }
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Writes the whole record. A record without items deletes the node.
    pub async fn put(&self, record: &DamageRecord) -> StoreResult<()> {
        if record.contrato_id.trim().is_empty() {
            return Err(StoreError::invalid_path(DAMAGES, "record has no contratoId"));
        }
        let path = path::damage_record(&record.contrato_id);
        if record.items.is_empty() {
            self.store.write(&path, serde_json::Value::Null).await?;
        } else {
            self.store.write(&path, encode(record)?).await?;
        }
        debug!(contract_id = %record.contrato_id, items = record.items.len(), "Damage record written");
        Ok(())
    }

    pub async fn list(&self) -> StoreResult<Vec<DamageRecord>> {
        let node = self.store.read(DAMAGES).await?;
        Ok(decode_children::<DamageRecord>(DAMAGES, node)
            .into_iter()
            .map(|(key, mut record)| {
                if record.contrato_id.is_empty() {
                    record.contrato_id = key;
                }
                record
            })
            .collect())
    }

    /// Records belonging to a vehicle, by id with plate fallback.
    pub async fn for_vehicle(&self, vehicle_id: &str, plate: &str) -> StoreResult<Vec<DamageRecord>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|record| record.concerns_vehicle(vehicle_id, plate))
            .collect())
    }

    /// Number of damage items on one contract.
    pub async fn count(&self, contract_id: &str) -> StoreResult<usize> {
        Ok(self
            .get(contract_id)
            .await?
            .map(|record| record.items.len())
            .unwrap_or(0))
    }
}
