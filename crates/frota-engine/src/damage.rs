//! # Damage Ledger
//!
//! Damage items recorded against a contract, active or terminated. Every
//! save rewrites the whole `damages/{contractId}` record, refreshing the
//! denormalized contract context alongside the items.
//!
//! Resolving a damage removes it; there is no resolved status.

use tracing::{info, warn};

use frota_core::damage::{DamageDraft, DamagePatch};
use frota_core::{Contract, DamageItem, DamageRecord, Vehicle};

use crate::collaborators::PhotoSource;
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::photos::SkippedPhoto;

/// A saved damage item and the photos that could not be attached.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageReceipt {
    pub item: DamageItem,
    pub skipped_photos: Vec<SkippedPhoto>,
}

/// One damage item in the vehicle-scoped listing.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleDamage {
    pub contrato_id: String,
    /// Vehicle snapshot from the contract, when the record carries one.
    pub veiculo: Option<Vehicle>,
    pub item: DamageItem,
}

impl Engine {
    /// Records a new damage with a fresh id.
    pub async fn add_damage(
        &self,
        contract_id: &str,
        draft: DamageDraft,
        photos: &[PhotoSource],
    ) -> EngineResult<DamageReceipt> {
        draft.validate()?;
        let (contract, mut record) = self.damage_record_for(contract_id).await?;

        let batch = self.photos.process_damage(photos).await;
        let item = DamageItem::new(draft, batch.photos, self.now());
        record.items.push(item.clone());

        self.save_damage_record(&contract, record).await?;
        info!(contract_id, damage_id = %item.id, skipped_photos = batch.skipped.len(), "Damage recorded");
        Ok(DamageReceipt {
            item,
            skipped_photos: batch.skipped,
        })
    }

    /// Edits an item in place. New photos are appended to the existing ones.
    pub async fn update_damage(
        &self,
        contract_id: &str,
        item_id: &str,
        patch: DamagePatch,
        photos: &[PhotoSource],
    ) -> EngineResult<DamageReceipt> {
        patch.validate()?;
        let (contract, mut record) = self.damage_record_for(contract_id).await?;
        if record.item_mut(item_id).is_none() {
            return Err(EngineError::not_found("Damage", item_id));
        }

        let batch = self.photos.process_damage(photos).await;
        let item = record
            .item_mut(item_id)
            .map(|item| {
                item.apply_patch(patch, batch.photos);
                item.clone()
            })
            .ok_or_else(|| EngineError::not_found("Damage", item_id))?;

        self.save_damage_record(&contract, record).await?;
        info!(contract_id, damage_id = item_id, photos = item.fotos.len(), "Damage updated");
        Ok(DamageReceipt {
            item,
            skipped_photos: batch.skipped,
        })
    }

    /// Deletes an item from the contract's record.
    pub async fn remove_damage(&self, contract_id: &str, item_id: &str) -> EngineResult<()> {
        let (contract, mut record) = self.damage_record_for(contract_id).await?;
        if !record.remove_item(item_id) {
            return Err(EngineError::not_found("Damage", item_id));
        }
        self.save_damage_record(&contract, record).await?;
        info!(contract_id, damage_id = item_id, "Damage removed");
        Ok(())
    }

    /// Marks a damage as repaired, which removes it.
    pub async fn resolve_damage(&self, contract_id: &str, item_id: &str) -> EngineResult<()> {
        self.remove_damage(contract_id, item_id).await
    }

    pub async fn contract_damages(&self, contract_id: &str) -> EngineResult<Vec<DamageItem>> {
        Ok(self
            .read("load damages", self.store.damages().get(contract_id))
            .await?
            .map(|record| record.items)
            .unwrap_or_default())
    }

    pub async fn damage_count(&self, contract_id: &str) -> EngineResult<usize> {
        self.read("count damages", self.store.damages().count(contract_id))
            .await
    }

    /// Every damage item across contracts that belongs to `vehicle_id`,
    /// matching records without a `veiculoId` by the vehicle's plate.
    pub async fn vehicle_damages(&self, vehicle_id: &str) -> EngineResult<Vec<VehicleDamage>> {
        let vehicle = self
            .read("load vehicle", self.store.vehicles().get(vehicle_id))
            .await?
            .ok_or_else(|| EngineError::not_found("Vehicle", vehicle_id))?;
        let records = self
            .read(
                "list damages",
                self.store.damages().for_vehicle(vehicle_id, &vehicle.matricula),
            )
            .await?;

        Ok(records
            .into_iter()
            .flat_map(|record| {
                let DamageRecord {
                    contrato_id,
                    veiculo,
                    items,
                    ..
                } = record;
                items.into_iter().map(move |item| VehicleDamage {
                    contrato_id: contrato_id.clone(),
                    veiculo: veiculo.clone(),
                    item,
                })
            })
            .collect())
    }

    /// The contract (active or terminated) and its current damage record.
    async fn damage_record_for(&self, contract_id: &str) -> EngineResult<(Contract, DamageRecord)> {
        let (_, contract) = self.find_contract(contract_id).await?;
        let record = self
            .read("load damages", self.store.damages().get(contract_id))
            .await?
            .unwrap_or_default();
        Ok((contract, record))
    }

    /// Rebuilds the envelope from the contract and writes it with `items`.
    async fn save_damage_record(&self, contract: &Contract, current: DamageRecord) -> EngineResult<()> {
        let vehicle_id = match contract.vehicle_id() {
            Some(id) => Some(id.to_string()),
            None => self.vehicle_id_by_plate(contract).await,
        };

        let mut record = DamageRecord::for_contract(contract, vehicle_id);
        record.items = current.items;
        record.touch(&self.actor(), self.now());

        self.write("save damages", self.store.damages().put(&record))
            .await
    }

    async fn vehicle_id_by_plate(&self, contract: &Contract) -> Option<String> {
        match self
            .read(
                "find vehicle by plate",
                self.store.vehicles().find_by_plate(&contract.veiculo.matricula),
            )
            .await
        {
            Ok(found) => found.and_then(|v| v.id),
            Err(e) => {
                warn!(contract_id = %contract.id, error = %e, "Plate lookup failed, damage record saved without veiculoId");
                None
            }
        }
    }
}
