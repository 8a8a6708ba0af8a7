//! # Vehicle Repository
//!
//! Inventory under `vehicles/{id}`.
//!
//! Contracts may reference a vehicle by id, by plate only (older
//! documents) or both; [`VehicleRepository::resolve`] does the two-step
//! lookup every caller needs.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use frota_core::validation::plate_key;
use frota_core::{UserMeta, Vehicle};

use super::{decode, decode_children, encode};
use crate::error::{StoreError, StoreResult};
use crate::path::{self, VEHICLES};
use crate::store::{DocumentStore, MultiPathUpdate};

#[derive(Debug, Clone)]
pub struct VehicleRepository {
    store: Arc<dyn DocumentStore>,
}

impl VehicleRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        VehicleRepository { store }
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<Vehicle>> {
        let path = path::vehicle(id);
        match self.store.read(&path).await? {
            Some(value) => Ok(Some(decode::<Vehicle>(&path, value)?.with_id(id))),
            None => Ok(None),
        }
    }

    /// Every vehicle, ordered by key.
    pub async fn list(&self) -> StoreResult<Vec<Vehicle>> {
        let node = self.store.read(VEHICLES).await?;
        Ok(decode_children::<Vehicle>(VEHICLES, node)
            .into_iter()
            .map(|(id, vehicle)| vehicle.with_id(id))
            .collect())
    }

    /// First vehicle whose plate matches, compared trimmed and case-insensitive.
    pub async fn find_by_plate(&self, plate: &str) -> StoreResult<Option<Vehicle>> {
        let wanted = plate_key(plate);
        if wanted.is_empty() {
            return Ok(None);
        }
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|vehicle| vehicle.plate_key() == wanted))
    }

    /// Looks up by id first, then by plate.
    pub async fn resolve(&self, vehicle_id: Option<&str>, plate: &str) -> StoreResult<Option<Vehicle>> {
        if let Some(id) = vehicle_id.filter(|id| !id.trim().is_empty()) {
            if let Some(vehicle) = self.get(id).await? {
                return Ok(Some(vehicle));
            }
            debug!(vehicle_id = %id, "Vehicle id not found, falling back to plate");
        }
        self.find_by_plate(plate).await
    }

    /// Adds a vehicle under a fresh key and returns the key.
    pub async fn insert(&self, vehicle: &Vehicle) -> StoreResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        self.store.write(&path::vehicle(&id), encode(vehicle)?).await?;
        debug!(vehicle_id = %id, plate = %vehicle.matricula, "Vehicle inserted");
        Ok(id)
    }

    /// Replaces the stored vehicle with `vehicle`, which must carry its id.
    pub async fn put(&self, vehicle: &Vehicle) -> StoreResult<()> {
        let id = vehicle
            .id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StoreError::invalid_path(VEHICLES, "vehicle has no id"))?;
        self.store.write(&path::vehicle(id), encode(vehicle)?).await
    }

    /// Replaces the photo list and stamps the editor, leaving other fields alone.
    pub async fn write_photos(
        &self,
        id: &str,
        photos: &[String],
        by: &UserMeta,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let base = path::vehicle(id);
        let update = MultiPathUpdate::new()
            .set(format!("{}/fotos", base), json!(photos))
            .set(format!("{}/atualizadoPor", base), encode(by)?)
            .set(format!("{}/atualizadoEm", base), encode(&at)?);
        self.store.update(update).await?;
        debug!(vehicle_id = %id, count = photos.len(), "Vehicle photos replaced");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Store;

    fn clio(plate: &str) -> Vehicle {
        Vehicle {
            matricula: plate.to_string(),
            marca: Some("Renault".into()),
            modelo: Some("Clio".into()),
            fotos: vec!["data:image/jpeg;base64,AAA".into()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_get_list() {
        let store = Store::memory();
        let repo = store.vehicles();

        let id = repo.insert(&clio("AA-11-BB")).await.unwrap();
        repo.insert(&clio("CC-22-DD")).await.unwrap();

        let vehicle = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(vehicle.id.as_deref(), Some(id.as_str()));
        assert_eq!(vehicle.matricula, "AA-11-BB");
        assert_eq!(repo.list().await.unwrap().len(), 2);
        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_plate() {
        let store = Store::memory();
        let repo = store.vehicles();
        let id = repo.insert(&clio("AA-11-BB")).await.unwrap();

        let by_id = repo.resolve(Some(&id), "ZZ-99-ZZ").await.unwrap().unwrap();
        assert_eq!(by_id.id.as_deref(), Some(id.as_str()));

        let by_plate = repo.resolve(Some("gone"), " aa-11-bb ").await.unwrap().unwrap();
        assert_eq!(by_plate.id.as_deref(), Some(id.as_str()));

        let by_plate_only = repo.resolve(None, "AA-11-BB").await.unwrap();
        assert!(by_plate_only.is_some());

        assert!(repo.resolve(None, "").await.unwrap().is_none());
        assert!(repo.resolve(None, "XX-00-XX").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_requires_id() {
        let store = Store::memory();
        let repo = store.vehicles();
        assert!(repo.put(&clio("AA-11-BB")).await.is_err());

        let mut vehicle = clio("AA-11-BB").with_id("v1");
        repo.put(&vehicle).await.unwrap();
        vehicle.quilometragem = Some(1200);
        repo.put(&vehicle).await.unwrap();
        assert_eq!(repo.get("v1").await.unwrap().unwrap().quilometragem, Some(1200));
    }

    #[tokio::test]
    async fn test_write_photos_keeps_other_fields() {
        let store = Store::memory();
        let repo = store.vehicles();
        repo.put(&clio("AA-11-BB").with_id("v1")).await.unwrap();

        let by = UserMeta::anonymous();
        repo.write_photos("v1", &["p1".to_string(), "p2".to_string()], &by, Utc::now())
            .await
            .unwrap();

        let vehicle = repo.get("v1").await.unwrap().unwrap();
        assert_eq!(vehicle.fotos, vec!["p1".to_string(), "p2".to_string()]);
        assert_eq!(vehicle.marca.as_deref(), Some("Renault"));
        assert!(vehicle.atualizado_em.is_some());
        assert_eq!(vehicle.atualizado_por, Some(by));
    }
}
