//! # Damage Ledger Model
//!
//! Damage items recorded against a contract, stored as one record per
//! contract under `damages/{contractId}`.
//!
//! ## Record Layout
//! ```text
//! damages/{contractId}
//! ├── contratoId
//! ├── veiculo / veiculoId / cliente / aluguer   (denormalized for filtering)
//! ├── atualizadoEm / atualizadoPor
//! └── items[]
//!     ├── id            stable across edits, used for update/remove
//!     ├── localizacao, tipo, severidade, dimensao, descricao
//!     ├── custoEstimado, responsabilidade
//!     └── fotos[]       only ever grows on update
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Write as _;
use ts_rs::TS;
use uuid::Uuid;

use crate::contract::{Client, Contract, RentalTerms};
use crate::lenient;
use crate::types::{UserMeta, Vehicle};
use crate::validation::{plate_key, require_text, validate_optional_amount, ValidationResult};

// =============================================================================
// Severity / Responsibility
// =============================================================================

/// How bad a damage is. Unknown, empty or `null` values read as `Leve`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub enum Severity {
    #[default]
    Leve,
    Moderado,
    Severo,
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "moderado" => Severity::Moderado,
            "severo" => Severity::Severo,
            _ => Severity::Leve,
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient::text_or_empty(deserializer).map(Severity::from)
    }
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Leve => "Leve",
            Severity::Moderado => "Moderado",
            Severity::Severo => "Severo",
        }
    }
}

/// Who pays for a damage. Unknown, empty or `null` values read as `A apurar`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub enum Responsibility {
    Cliente,
    Empresa,
    Terceiro,
    /// Still to be determined.
    #[default]
    #[serde(rename = "A apurar")]
    ToBeDetermined,
}

impl From<String> for Responsibility {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "cliente" => Responsibility::Cliente,
            "empresa" => Responsibility::Empresa,
            "terceiro" => Responsibility::Terceiro,
            _ => Responsibility::ToBeDetermined,
        }
    }
}

impl<'de> Deserialize<'de> for Responsibility {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient::text_or_empty(deserializer).map(Responsibility::from)
    }
}

// =============================================================================
// Damage Item
// =============================================================================

/// A single recorded defect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default, rename_all = "camelCase")]
pub struct DamageItem {
    pub id: String,
    pub localizacao: String,
    pub tipo: String,
    pub severidade: Severity,
    /// Approximate size, free text ("5 cm").
    pub dimensao: String,
    pub descricao: String,
    #[serde(alias = "custo", deserialize_with = "lenient::f64_or_zero")]
    pub custo_estimado: f64,
    pub responsabilidade: Responsibility,
    pub fotos: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub criado_em: Option<DateTime<Utc>>,
}

impl DamageItem {
    /// Creates an item with a fresh id and creation stamp.
    pub fn new(draft: DamageDraft, photos: Vec<String>, at: DateTime<Utc>) -> Self {
        DamageItem {
            id: Uuid::new_v4().to_string(),
            localizacao: draft.localizacao.trim().to_string(),
            tipo: draft.tipo,
            severidade: draft.severidade,
            dimensao: draft.dimensao,
            descricao: draft.descricao.trim().to_string(),
            custo_estimado: sanitize_cost(draft.custo_estimado),
            responsabilidade: draft.responsabilidade,
            fotos: photos,
            criado_em: Some(at),
        }
    }

    /// Applies an edit in place.
    ///
    /// The id and creation stamp never change. `new_photos` are appended to
    /// the photos already on the item.
    pub fn apply_patch(&mut self, patch: DamagePatch, new_photos: Vec<String>) {
        if let Some(v) = patch.localizacao {
            self.localizacao = v.trim().to_string();
        }
        if let Some(v) = patch.tipo {
            self.tipo = v;
        }
        if let Some(v) = patch.severidade {
            self.severidade = v;
        }
        if let Some(v) = patch.dimensao {
            self.dimensao = v;
        }
        if let Some(v) = patch.descricao {
            self.descricao = v.trim().to_string();
        }
        if let Some(v) = patch.custo_estimado {
            self.custo_estimado = sanitize_cost(v);
        }
        if let Some(v) = patch.responsabilidade {
            self.responsabilidade = v;
        }
        self.fotos.extend(new_photos);
    }

    /// Copy with an id and a non-negative cost, as embedded in the
    /// check-in document.
    pub fn normalized(&self) -> DamageItem {
        let mut item = self.clone();
        if item.id.trim().is_empty() {
            item.id = Uuid::new_v4().to_string();
        }
        item.custo_estimado = sanitize_cost(item.custo_estimado);
        item
    }

    /// One numbered line of the printable summary.
    fn summary_line(&self, position: usize) -> String {
        let tipo = non_empty_or(&self.tipo, "Dano");
        let localizacao = non_empty_or(&self.localizacao, "—");
        let mut line = format!("{}. {} em {}", position, tipo, localizacao);
        if !self.dimensao.trim().is_empty() {
            let _ = write!(line, " ({})", self.dimensao);
        }
        let _ = write!(line, " — {}", self.severidade.as_str());
        if self.custo_estimado.is_finite() && self.custo_estimado > 0.0 {
            let _ = write!(line, " — Estimativa: €{:.2}", self.custo_estimado);
        }
        line
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

fn sanitize_cost(cost: f64) -> f64 {
    if cost.is_finite() && cost > 0.0 {
        cost
    } else {
        0.0
    }
}

/// Human-readable summary embedded in the check-in record.
///
/// ```rust
/// use frota_core::damage::{summarize, DamageItem};
///
/// assert_eq!(summarize(&[]), "");
///
/// let item = DamageItem {
///     tipo: "Risco".into(),
///     localizacao: "Porta frente esq.".into(),
///     dimensao: "5 cm".into(),
///     custo_estimado: 80.0,
///     ..Default::default()
/// };
/// assert_eq!(
///     summarize(&[item]),
///     "Foram registados 1 dano(s):\n1. Risco em Porta frente esq. (5 cm) — Leve — Estimativa: €80.00"
/// );
/// ```
pub fn summarize(items: &[DamageItem]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = items
        .iter()
        .enumerate()
        .map(|(i, item)| item.summary_line(i + 1))
        .collect();
    format!("Foram registados {} dano(s):\n{}", items.len(), lines.join("\n"))
}

// =============================================================================
// Draft / Patch
// =============================================================================

/// Damage form input for a new item (photos travel separately).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DamageDraft {
    pub localizacao: String,
    pub tipo: String,
    pub severidade: Severity,
    pub dimensao: String,
    pub descricao: String,
    pub custo_estimado: f64,
    pub responsabilidade: Responsibility,
}

impl DamageDraft {
    /// Location, type and description are mandatory; the cost must be a
    /// non-negative number.
    pub fn validate(&self) -> ValidationResult<()> {
        require_text("localizacao", &self.localizacao)?;
        require_text("tipo", &self.tipo)?;
        require_text("descricao", &self.descricao)?;
        validate_optional_amount("custoEstimado", Some(self.custo_estimado))
    }
}

/// Field-level edit of an existing item. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DamagePatch {
    pub localizacao: Option<String>,
    pub tipo: Option<String>,
    pub severidade: Option<Severity>,
    pub dimensao: Option<String>,
    pub descricao: Option<String>,
    pub custo_estimado: Option<f64>,
    pub responsabilidade: Option<Responsibility>,
}

impl DamagePatch {
    pub fn validate(&self) -> ValidationResult<()> {
        for (field, value) in [
            ("localizacao", &self.localizacao),
            ("tipo", &self.tipo),
            ("descricao", &self.descricao),
        ] {
            if let Some(value) = value {
                require_text(field, value)?;
            }
        }
        validate_optional_amount("custoEstimado", self.custo_estimado)
    }
}

// =============================================================================
// Damage Record
// =============================================================================

/// Everything stored under `damages/{contractId}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default, rename_all = "camelCase")]
pub struct DamageRecord {
    pub contrato_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub veiculo: Option<Vehicle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub veiculo_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cliente: Option<Client>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aluguer: Option<RentalTerms>,
    pub items: Vec<DamageItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub atualizado_em: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atualizado_por: Option<UserMeta>,
}

impl DamageRecord {
    /// Empty record carrying the contract's denormalized context.
    ///
    /// `vehicle_id` is the resolved inventory id (the contract's own
    /// `veiculoId`, or one found by plate).
    pub fn for_contract(contract: &Contract, vehicle_id: Option<String>) -> Self {
        DamageRecord {
            contrato_id: contract.id.clone(),
            veiculo: Some(contract.veiculo.clone()),
            veiculo_id: vehicle_id,
            cliente: Some(contract.cliente.clone()),
            aluguer: Some(contract.aluguer.clone()),
            items: Vec::new(),
            atualizado_em: None,
            atualizado_por: None,
        }
    }

    pub fn touch(&mut self, by: &UserMeta, at: DateTime<Utc>) {
        self.atualizado_por = Some(by.clone());
        self.atualizado_em = Some(at);
    }

    pub fn item_mut(&mut self, item_id: &str) -> Option<&mut DamageItem> {
        self.items.iter_mut().find(|item| item.id == item_id)
    }

    /// Drops the item with `item_id`. Returns whether one was removed.
    pub fn remove_item(&mut self, item_id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != item_id);
        self.items.len() != before
    }

    /// Whether this record belongs to the given vehicle.
    ///
    /// Matches on `veiculoId` first; records without one fall back to the
    /// plate of the denormalized vehicle snapshot.
    pub fn concerns_vehicle(&self, vehicle_id: &str, plate: &str) -> bool {
        if let Some(id) = self.veiculo_id.as_deref().filter(|id| !id.is_empty()) {
            return id == vehicle_id;
        }
        let wanted = plate_key(plate);
        !wanted.is_empty()
            && self
                .veiculo
                .as_ref()
                .map(|v| v.plate_key() == wanted)
                .unwrap_or(false)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
