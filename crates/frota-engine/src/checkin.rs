//! # Check-in Reconciler
//!
//! Receives a returned vehicle: records its condition on the contract,
//! folds mileage, fuel and photos back into the inventory and archives the
//! contract.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. load active contract                                                │
//! │  2. process return photos (sequential, failures skipped)                │
//! │  3. validate draft (required fields, >= 4 photos)                       │
//! │  4. damages: summary + normalized items (photos re-encoded)             │
//! │  5. render check-in PDF, attach to the record                           │
//! │  ─────────────────────── first store write ─────────────────────────── │
//! │  6. resolve vehicle (id, then plate) and update it                      │
//! │       failure → ReconciliationWarning, never aborts                     │
//! │  7. archive: contracts_terminated/{id} set + contracts_active/{id} null │
//! │       one multi-path update                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{error, info, warn};

use frota_core::checkin::reconcile_vehicle;
use frota_core::damage::summarize;
use frota_core::{CheckinDraft, Contract, ContractState, DamageItem, UserMeta, Vehicle};

use crate::collaborators::PhotoSource;
use crate::engine::Engine;
use crate::error::EngineResult;
use crate::photos::SkippedPhoto;

/// Inventory sync problem during a check-in. Logged and reported; the
/// contract is archived regardless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationWarning {
    /// No vehicle matched the contract's id or plate.
    VehicleNotFound { plate: String },
    /// The inventory could not be read.
    LookupFailed { message: String },
    /// The vehicle was found but the update failed.
    UpdateFailed { vehicle_id: String, message: String },
}

impl fmt::Display for ReconciliationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconciliationWarning::VehicleNotFound { plate } => {
                write!(f, "no vehicle found for plate {}", plate)
            }
            ReconciliationWarning::LookupFailed { message } => {
                write!(f, "vehicle lookup failed: {}", message)
            }
            ReconciliationWarning::UpdateFailed { vehicle_id, message } => {
                write!(f, "vehicle {} was not updated: {}", vehicle_id, message)
            }
        }
    }
}

/// Result of a completed check-in.
#[derive(Debug, Clone)]
pub struct CheckinOutcome {
    /// The archived contract, `rececao` included.
    pub contract: Contract,
    pub pdf: Vec<u8>,
    /// The inventory record as written, when the sync succeeded.
    pub vehicle: Option<Vehicle>,
    pub warning: Option<ReconciliationWarning>,
    /// Return photos that could not be processed; they did not count
    /// toward the minimum.
    pub skipped_photos: Vec<SkippedPhoto>,
}

impl Engine {
    pub async fn check_in(
        &self,
        contract_id: &str,
        draft: CheckinDraft,
        photos: &[PhotoSource],
    ) -> EngineResult<CheckinOutcome> {
        let contract = self
            .load_in_state(contract_id, ContractState::Active, "check in")
            .await?;

        let batch = self.photos.process(photos).await;
        if let Err(e) = draft.validate(batch.photos.len()) {
            if !batch.skipped.is_empty() {
                warn!(contract_id, skipped = batch.skipped.len(), "Check-in rejected with unprocessable photos");
            }
            return Err(e.into());
        }

        let damages = self
            .read("load damages", self.store.damages().get(contract_id))
            .await?
            .map(|record| record.items)
            .unwrap_or_default();
        let summary = summarize(&damages);
        let detailed = self.embeddable_damages(&damages).await;

        let by = self.actor();
        let at = self.now();
        let mut record = draft.into_record(batch.photos, summary, detailed, &by, at);

        let preview = contract.clone().checked_in(record.clone(), &by, at);
        let pdf = self.render_checkin(&preview).await?;
        record.pdf_base64 = Some(STANDARD.encode(&pdf));

        let terminated = contract.checked_in(record, &by, at);

        let (vehicle, warning) = self.reconcile_inventory(&terminated, &by, at).await;

        self.write("archive contract", self.store.contracts().archive(&terminated))
            .await?;
        info!(
            contract_id,
            plate = %terminated.veiculo.matricula,
            damages = damages.len(),
            vehicle_synced = vehicle.is_some(),
            "Vehicle checked in"
        );

        Ok(CheckinOutcome {
            contract: terminated,
            pdf,
            vehicle,
            warning,
            skipped_photos: batch.skipped,
        })
    }

    /// Damage items as embedded in the check-in record.
    async fn embeddable_damages(&self, items: &[DamageItem]) -> Vec<DamageItem> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let mut item = item.normalized();
            item.fotos = self.photos.reencode(&item.fotos).await;
            out.push(item);
        }
        out
    }

    async fn reconcile_inventory(
        &self,
        contract: &Contract,
        by: &UserMeta,
        at: DateTime<Utc>,
    ) -> (Option<Vehicle>, Option<ReconciliationWarning>) {
        let Some(record) = contract.rececao.as_ref() else {
            return (None, None);
        };
        let plate = &contract.veiculo.matricula;
        let vehicles = self.store.vehicles();

        let found = match self
            .read("resolve vehicle", vehicles.resolve(contract.vehicle_id(), plate))
            .await
        {
            Ok(Some(vehicle)) => vehicle,
            Ok(None) => {
                warn!(contract_id = %contract.id, plate = %plate, "No inventory vehicle to update on check-in");
                return (
                    None,
                    Some(ReconciliationWarning::VehicleNotFound {
                        plate: plate.clone(),
                    }),
                );
            }
            Err(e) => {
                error!(contract_id = %contract.id, error = %e, "Vehicle lookup failed on check-in");
                return (
                    None,
                    Some(ReconciliationWarning::LookupFailed {
                        message: e.to_string(),
                    }),
                );
            }
        };

        let updated = reconcile_vehicle(found, record, by, at);
        match self.write("update vehicle", vehicles.put(&updated)).await {
            Ok(()) => (Some(updated), None),
            Err(e) => {
                let vehicle_id = updated.id.clone().unwrap_or_default();
                error!(vehicle_id = %vehicle_id, error = %e, "Vehicle update failed on check-in");
                (
                    None,
                    Some(ReconciliationWarning::UpdateFailed {
                        vehicle_id,
                        message: e.to_string(),
                    }),
                )
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WriteOutcome;
    use crate::testing::{checkin_draft, clio, new_contract, photos, Harness};
    use frota_core::damage::DamageDraft;
    use frota_core::checkin::{GlassChecklist, InteriorChecklist};
    use frota_core::{FuelLevel, VehicleChecklist, STATUS_TERMINATED};
    use frota_store::{path, DocumentStore};

    #[tokio::test]
    async fn test_fewer_than_four_photos_rejected() {
        let h = Harness::new().await;
        let id = h.engine.create_contract(new_contract(&h.v1, "Maria Silva")).await.unwrap().contract.id;

        let err = h.engine.check_in(&id, checkin_draft(), &photos(3)).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(h.engine.contract_state(&id).await.unwrap(), ContractState::Active);

        // A photo that fails to process does not count.
        let mut five = photos(3);
        five.push(PhotoSource::jpeg("bad-1.jpg", vec![9]));
        five.push(PhotoSource::jpeg("bad-2.jpg", vec![9]));
        let err = h.engine.check_in(&id, checkin_draft(), &five).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let mut with_bad = photos(4);
        with_bad.push(PhotoSource::jpeg("bad-3.jpg", vec![9]));
        let outcome = h.engine.check_in(&id, checkin_draft(), &with_bad).await.unwrap();
        assert_eq!(outcome.contract.rececao.unwrap().fotos_devolucao.len(), 4);
        assert_eq!(outcome.skipped_photos.len(), 1);
        assert_eq!(outcome.skipped_photos[0].file_name, "bad-3.jpg");
    }

    #[tokio::test]
    async fn test_missing_fields_rejected() {
        let h = Harness::new().await;
        let id = h.engine.create_contract(new_contract(&h.v1, "Maria Silva")).await.unwrap().contract.id;

        let mut draft = checkin_draft();
        draft.nivel_combustivel = None;
        let err = h.engine.check_in(&id, draft, &photos(4)).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let mut draft = checkin_draft();
        draft.estado_geral = "  ".to_string();
        assert!(h.engine.check_in(&id, draft, &photos(4)).await.is_err());
        assert_eq!(h.renderer.checkin_calls(), 0);
    }

    #[tokio::test]
    async fn test_checkin_archives_and_updates_vehicle() {
        let h = Harness::new().await;
        let id = h.engine.create_contract(new_contract(&h.v1, "Maria Silva")).await.unwrap().contract.id;

        let mut draft = checkin_draft();
        draft.checklist.vidros_espelhos = GlassChecklist::uniform(true);
        draft.checklist.interior = InteriorChecklist::uniform(true);
        let outcome = h.engine.check_in(&id, draft, &photos(5)).await.unwrap();
        assert!(outcome.warning.is_none());
        assert_eq!(outcome.pdf, b"checkin:Maria Silva".to_vec());

        let raw = h.engine.store().raw();
        assert!(raw.read(&path::active_contract(&id)).await.unwrap().is_none());
        let archived = h.engine.store().contracts().get_terminated(&id).await.unwrap().unwrap();
        assert_eq!(archived.aluguer.estado.as_deref(), Some(STATUS_TERMINATED));
        assert!(archived.aluguer.terminado_por.is_some());
        let rececao = archived.rececao.unwrap();
        assert_eq!(rececao.quilometragem_devolucao, 43_100);
        assert_eq!(
            STANDARD.decode(rececao.pdf_base64.unwrap()).unwrap(),
            b"checkin:Maria Silva".to_vec()
        );

        let vehicle = h.engine.store().vehicles().get(&h.v1).await.unwrap().unwrap();
        assert_eq!(vehicle.fotos.len(), 5);
        assert_eq!(vehicle.fotos, rececao.fotos_devolucao);
        assert_eq!(vehicle.quilometragem, Some(43_100));
        assert_eq!(vehicle.nivel_combustivel, Some(FuelLevel::from_percent(75)));
        assert_eq!(vehicle.estado.as_deref(), Some("Bom estado, sem sujidade"));
        assert_eq!(
            vehicle.estado_checklist,
            VehicleChecklist { vidros: true, interior: true, ..Default::default() }
        );
        assert_eq!(vehicle.disponivel, Some(true));
    }

    #[tokio::test]
    async fn test_checkin_replaces_existing_vehicle_photos() {
        let h = Harness::new().await;
        let mut request = new_contract(&h.v1, "Maria Silva");
        request.veiculo.fotos = vec!["data:old-1".into(), "data:old-2".into()];
        let id = h.engine.create_contract(request).await.unwrap().contract.id;

        h.engine.check_in(&id, checkin_draft(), &photos(4)).await.unwrap();
        let vehicle = h.engine.store().vehicles().get(&h.v1).await.unwrap().unwrap();
        assert_eq!(vehicle.fotos.len(), 4);
        assert!(!vehicle.fotos.contains(&"data:old-1".to_string()));
    }

    #[tokio::test]
    async fn test_checkin_embeds_damages() {
        let h = Harness::new().await;
        let id = h.engine.create_contract(new_contract(&h.v1, "Maria Silva")).await.unwrap().contract.id;
        let draft = DamageDraft {
            localizacao: "Porta frente esq.".into(),
            tipo: "Risco".into(),
            descricao: "Risco ligeiro".into(),
            dimensao: "5 cm".into(),
            custo_estimado: 80.0,
            ..Default::default()
        };
        h.engine
            .add_damage(&id, draft, &[PhotoSource::jpeg("scratch.jpg", vec![1])])
            .await
            .unwrap();

        let outcome = h.engine.check_in(&id, checkin_draft(), &photos(4)).await.unwrap();
        let rececao = outcome.contract.rececao.unwrap();
        assert!(rececao.danos_identificados.starts_with("Foram registados 1 dano(s):\n1. Risco em Porta frente esq. (5 cm)"));
        assert_eq!(rececao.danos_detalhados.len(), 1);
        assert_eq!(
            rececao.danos_detalhados[0].fotos,
            vec!["resized:bounded:resized:data:scratch.jpg".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_vehicle_warns_but_archives() {
        let h = Harness::new().await;
        let mut request = new_contract(&h.v1, "Maria Silva");
        request.veiculo_id = None;
        request.veiculo = clio("ZZ-99-ZZ");
        let id = h.engine.create_contract(request).await.unwrap().contract.id;

        let outcome = h.engine.check_in(&id, checkin_draft(), &photos(4)).await.unwrap();
        assert_eq!(
            outcome.warning,
            Some(ReconciliationWarning::VehicleNotFound {
                plate: "ZZ-99-ZZ".to_string()
            })
        );
        assert!(outcome.vehicle.is_none());
        assert_eq!(h.engine.contract_state(&id).await.unwrap(), ContractState::Terminated);
    }

    #[tokio::test]
    async fn test_vehicle_update_failure_warns_but_archives() {
        let h = Harness::new().await;
        let id = h.engine.create_contract(new_contract(&h.v1, "Maria Silva")).await.unwrap().contract.id;
        h.store.fail_writes_under(path::VEHICLES);

        let outcome = h.engine.check_in(&id, checkin_draft(), &photos(4)).await.unwrap();
        assert!(matches!(
            outcome.warning,
            Some(ReconciliationWarning::UpdateFailed { ref vehicle_id, .. }) if vehicle_id == &h.v1
        ));
        assert_eq!(h.engine.contract_state(&id).await.unwrap(), ContractState::Terminated);
    }

    #[tokio::test]
    async fn test_render_failure_leaves_everything_untouched() {
        let h = Harness::new().await;
        let id = h.engine.create_contract(new_contract(&h.v1, "Maria Silva")).await.unwrap().contract.id;
        let before = h.engine.store().vehicles().get(&h.v1).await.unwrap().unwrap();
        h.renderer.fail_next();

        let err = h.engine.check_in(&id, checkin_draft(), &photos(4)).await.unwrap_err();
        assert_eq!(err.code(), "RENDER_ERROR");
        assert_eq!(h.engine.contract_state(&id).await.unwrap(), ContractState::Active);
        let after = h.engine.store().vehicles().get(&h.v1).await.unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_archive_failure_reports_not_applied() {
        let h = Harness::new().await;
        let id = h.engine.create_contract(new_contract(&h.v1, "Maria Silva")).await.unwrap().contract.id;
        h.store.fail_writes_under(path::CONTRACTS_TERMINATED);

        let err = h.engine.check_in(&id, checkin_draft(), &photos(4)).await.unwrap_err();
        assert_eq!(err.write_outcome(), WriteOutcome::NotApplied);
        assert_eq!(h.engine.contract_state(&id).await.unwrap(), ContractState::Active);
    }

    #[tokio::test]
    async fn test_checkin_on_terminated_contract_rejected() {
        let h = Harness::new().await;
        let id = h.engine.create_contract(new_contract(&h.v1, "Maria Silva")).await.unwrap().contract.id;
        h.engine.close_contract(&id).await.unwrap();

        let err = h.engine.check_in(&id, checkin_draft(), &photos(4)).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_TRANSITION");
    }

    #[tokio::test]
    async fn test_checkin_pdf_retrievable() {
        let h = Harness::new().await;
        let id = h.engine.create_contract(new_contract(&h.v1, "Maria Silva")).await.unwrap().contract.id;
        h.engine.check_in(&id, checkin_draft(), &photos(4)).await.unwrap();
        assert_eq!(
            h.engine.checkin_pdf(&id).await.unwrap(),
            Some(b"checkin:Maria Silva".to_vec())
        );
    }
}
