//! # Contract Lifecycle
//!
//! Create, edit, close, reopen and delete.
//!
//! ## State Machine
//! ```text
//!                create
//!                  │
//!                  ▼
//!   ┌──────────►  ACTIVE  ──── edit ────┐
//!   │               │  ▲                │
//!   │     close /   │  └────────────────┘
//!   │     check-in  │
//!   │               ▼
//! reopen ──── TERMINATED
//!                   │
//!                 delete (audit copy + removal, one update)
//!                   │
//!                   ▼
//!                DELETED
//! ```
//!
//! ## Create / Edit Order
//! ```text
//! validate ─► availability ─► photos ─► pricing ─► render PDF ─► photo write-back ─► persist
//! └──────────── no store write before here ──────────────────┘   (best effort)
//! ```
//! A failed render leaves the store untouched. The photo write-back to the
//! live vehicle is logged on failure and never blocks the contract.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use frota_core::availability::{selectable_vehicles, SelectableVehicle};
use frota_core::pricing::PriceQuote;
use frota_core::validation::validate_contract;
use frota_core::{Client, Contract, ContractState, RentalTerms, UnavailableSet, UserMeta, Vehicle};
use frota_store::{AuditEntry, ContractRepository};

use crate::collaborators::PhotoSource;
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult, WriteOutcome};
use crate::photos::SkippedPhoto;

// =============================================================================
// Requests / Results
// =============================================================================

/// Input for a new contract.
#[derive(Debug, Clone, Default)]
pub struct NewContract {
    pub cliente: Client,
    /// Vehicle snapshot as shown on the form, `fotos` holding the photos the
    /// operator kept.
    pub veiculo: Vehicle,
    /// Inventory id of the chosen vehicle; falls back to `veiculo.id`.
    pub veiculo_id: Option<String>,
    pub aluguer: RentalTerms,
    pub novas_fotos: Vec<PhotoSource>,
}

/// Field-level overrides for an active contract. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ContractEdit {
    pub cliente: Option<Client>,
    pub veiculo: Option<Vehicle>,
    pub veiculo_id: Option<String>,
    /// Blank signatures keep the stored ones.
    pub aluguer: Option<RentalTerms>,
    pub novas_fotos: Vec<PhotoSource>,
}

/// A persisted contract and its generated document.
#[derive(Debug, Clone)]
pub struct ContractReceipt {
    pub contract: Contract,
    pub quote: PriceQuote,
    pub pdf: Vec<u8>,
    /// Whether the final photo list reached the live vehicle record.
    pub vehicle_photos_synced: bool,
    /// New photos that could not be processed and were left out.
    pub skipped_photos: Vec<SkippedPhoto>,
}

fn non_empty(id: Option<String>) -> Option<String> {
    id.filter(|id| !id.trim().is_empty())
}

impl Engine {
    // =========================================================================
    // Create
    // =========================================================================

    pub async fn create_contract(&self, request: NewContract) -> EngineResult<ContractReceipt> {
        let NewContract {
            cliente,
            veiculo,
            veiculo_id,
            aluguer,
            novas_fotos,
        } = request;

        let veiculo_id = non_empty(veiculo_id).or_else(|| non_empty(veiculo.id.clone()));
        let contract = Contract {
            id: ContractRepository::new_id(),
            cliente,
            veiculo,
            veiculo_id,
            aluguer,
            ..Default::default()
        };

        validate_contract(&contract)?;
        self.ensure_vehicle_free(&contract, None).await?;

        let by = self.actor();
        let at = self.now();
        let (mut contract, skipped) = self.with_new_photos(contract, &novas_fotos).await;
        contract.criado_por = Some(by.clone());
        contract.criado_em = Some(at);

        self.finish_and_persist(contract, skipped, &by, at).await
    }

    // =========================================================================
    // Edit
    // =========================================================================

    pub async fn edit_contract(&self, contract_id: &str, edit: ContractEdit) -> EngineResult<ContractReceipt> {
        let original = self.load_in_state(contract_id, ContractState::Active, "edit").await?;

        let veiculo_id = non_empty(edit.veiculo_id)
            .or_else(|| edit.veiculo.as_ref().and_then(|v| non_empty(v.id.clone())))
            .or_else(|| original.veiculo_id.clone());

        let mut contract = original.clone();
        if let Some(cliente) = edit.cliente {
            contract.cliente = cliente;
        }
        if let Some(veiculo) = edit.veiculo {
            contract.veiculo = veiculo;
        }
        if let Some(mut aluguer) = edit.aluguer {
            aluguer.keep_signatures_from(&original.aluguer);
            contract.aluguer = aluguer;
        }
        contract.veiculo_id = veiculo_id;

        validate_contract(&contract)?;
        self.ensure_vehicle_free(&contract, Some(contract_id)).await?;

        let by = self.actor();
        let at = self.now();
        let (mut contract, skipped) = self.with_new_photos(contract, &edit.novas_fotos).await;
        contract.atualizado_por = Some(by.clone());
        contract.atualizado_em = Some(at);

        self.finish_and_persist(contract, skipped, &by, at).await
    }

    /// Pricing, PDF, photo write-back, then the contract itself.
    async fn finish_and_persist(
        &self,
        contract: Contract,
        skipped_photos: Vec<SkippedPhoto>,
        by: &UserMeta,
        at: DateTime<Utc>,
    ) -> EngineResult<ContractReceipt> {
        let (mut contract, quote) = contract.with_derived_pricing();

        let pdf = self.render_contract(&contract).await?;
        contract.pdf_base64 = Some(STANDARD.encode(&pdf));

        let vehicle_photos_synced = self.write_back_photos(&contract, by, at).await;

        self.write("save contract", self.store.contracts().put_active(&contract))
            .await?;
        info!(
            contract_id = %contract.id,
            plate = %contract.veiculo.matricula,
            days = quote.days,
            total = %quote.total,
            skipped_photos = skipped_photos.len(),
            "Contract saved"
        );

        Ok(ContractReceipt {
            contract,
            quote,
            pdf,
            vehicle_photos_synced,
            skipped_photos,
        })
    }

    /// Appends freshly processed photos to the ones kept on the snapshot.
    async fn with_new_photos(
        &self,
        mut contract: Contract,
        sources: &[PhotoSource],
    ) -> (Contract, Vec<SkippedPhoto>) {
        if sources.is_empty() {
            return (contract, Vec::new());
        }
        let batch = self.photos.process(sources).await;
        contract.veiculo.fotos.extend(batch.photos);
        (contract, batch.skipped)
    }

    /// Submit-time availability check. `editing` excludes that contract.
    async fn ensure_vehicle_free(&self, contract: &Contract, editing: Option<&str>) -> EngineResult<()> {
        let unavailable = self.unavailable_vehicles(editing).await?;
        if let Err(e) = unavailable.ensure_available(contract.vehicle_id(), &contract.veiculo.matricula) {
            warn!(
                plate = %contract.veiculo.matricula,
                vehicle_id = ?contract.vehicle_id(),
                "Vehicle taken by another active contract"
            );
            return Err(e.into());
        }
        Ok(())
    }

    /// Copies the contract's photo list onto the live vehicle.
    async fn write_back_photos(&self, contract: &Contract, by: &UserMeta, at: DateTime<Utc>) -> bool {
        let vehicles = self.store.vehicles();
        let found = self
            .read(
                "resolve vehicle",
                vehicles.resolve(contract.vehicle_id(), &contract.veiculo.matricula),
            )
            .await;
        let vehicle_id = match found {
            Ok(Some(Vehicle { id: Some(id), .. })) => id,
            Ok(_) => {
                warn!(plate = %contract.veiculo.matricula, "No inventory vehicle for contract, photos not synced");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Vehicle lookup failed, photos not synced");
                return false;
            }
        };
        match self
            .write(
                "write vehicle photos",
                vehicles.write_photos(&vehicle_id, &contract.veiculo.fotos, by, at),
            )
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(vehicle_id = %vehicle_id, error = %e, "Vehicle photo update failed");
                false
            }
        }
    }

    // =========================================================================
    // Close / Reopen / Delete
    // =========================================================================

    /// Archives an active contract without check-in data.
    pub async fn close_contract(&self, contract_id: &str) -> EngineResult<Contract> {
        let contract = self.load_in_state(contract_id, ContractState::Active, "close").await?;
        let terminated = contract.closed(&self.actor(), self.now());
        self.write("archive contract", self.store.contracts().archive(&terminated))
            .await?;
        Ok(terminated)
    }

    /// Moves a terminated contract back to active.
    pub async fn reopen_contract(&self, contract_id: &str) -> EngineResult<Contract> {
        let contract = self
            .load_in_state(contract_id, ContractState::Terminated, "reopen")
            .await?;
        let reopened = contract.reopened(&self.actor(), self.now());
        self.write("restore contract", self.store.contracts().restore(&reopened))
            .await?;
        Ok(reopened)
    }

    /// Removes a terminated contract, leaving a copy in the audit trail.
    pub async fn delete_contract(&self, contract_id: &str) -> EngineResult<AuditEntry> {
        let contract = self
            .load_in_state(contract_id, ContractState::Terminated, "delete")
            .await?;
        let entry = AuditEntry::new(contract, self.actor(), self.now());
        let category = self.config.terminated_category().to_string();
        self.write(
            "delete contract",
            self.store.contracts().remove_terminated(&entry, &category),
        )
        .await?;
        Ok(entry)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn contract_state(&self, contract_id: &str) -> EngineResult<ContractState> {
        self.read("contract state", self.store.contracts().state_of(contract_id))
            .await
    }

    /// The contract wherever it lives.
    pub async fn find_contract(&self, contract_id: &str) -> EngineResult<(ContractState, Contract)> {
        self.read("load contract", self.store.contracts().find(contract_id))
            .await?
            .ok_or_else(|| EngineError::not_found("Contract", contract_id))
    }

    pub async fn active_contracts(&self) -> EngineResult<Vec<Contract>> {
        self.read("list active contracts", self.store.contracts().list_active())
            .await
    }

    pub async fn terminated_contracts(&self) -> EngineResult<Vec<Contract>> {
        self.read("list terminated contracts", self.store.contracts().list_terminated())
            .await
    }

    /// Vehicles taken by active contracts, ignoring `editing`.
    ///
    /// Built from the raw active documents, so a contract that no longer
    /// decodes still blocks its vehicle.
    pub async fn unavailable_vehicles(&self, editing: Option<&str>) -> EngineResult<UnavailableSet> {
        let claims = self
            .read("list vehicle claims", self.store.contracts().active_claims())
            .await?;
        Ok(match editing {
            Some(id) => UnavailableSet::excluding(&claims, id),
            None => UnavailableSet::from_claims(&claims),
        })
    }

    /// The vehicle selector: every vehicle, flagged when taken.
    pub async fn vehicle_options(&self, editing: Option<&str>) -> EngineResult<Vec<SelectableVehicle>> {
        let vehicles = self.read("list vehicles", self.store.vehicles().list()).await?;
        let unavailable = self.unavailable_vehicles(editing).await?;
        Ok(selectable_vehicles(&vehicles, &unavailable))
    }

    /// Decoded contract PDF, if one was stored.
    pub async fn contract_pdf(&self, contract_id: &str) -> EngineResult<Option<Vec<u8>>> {
        let (_, contract) = self.find_contract(contract_id).await?;
        decode_pdf(contract_id, contract.pdf_base64.as_deref())
    }

    /// Decoded check-in PDF, if the contract went through check-in.
    pub async fn checkin_pdf(&self, contract_id: &str) -> EngineResult<Option<Vec<u8>>> {
        let (_, contract) = self.find_contract(contract_id).await?;
        let encoded = contract.rececao.as_ref().and_then(|r| r.pdf_base64.as_deref());
        decode_pdf(contract_id, encoded)
    }

    /// Loads a contract and checks it is in `expected`.
    pub(crate) async fn load_in_state(
        &self,
        contract_id: &str,
        expected: ContractState,
        action: &'static str,
    ) -> EngineResult<Contract> {
        let (state, contract) = self.find_contract(contract_id).await?;
        state.require(expected, contract_id, action)?;
        debug!(contract_id, ?state, action, "Contract loaded");
        Ok(contract)
    }
}

fn decode_pdf(contract_id: &str, encoded: Option<&str>) -> EngineResult<Option<Vec<u8>>> {
    let Some(encoded) = encoded.filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    STANDARD
        .decode(encoded)
        .map(Some)
        .map_err(|e| EngineError::Persistence {
            operation: "decode pdf",
            outcome: WriteOutcome::NotApplied,
            message: format!("stored PDF of {} is not valid base64: {}", contract_id, e),
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
