//! # Rental Contracts
//!
//! The contract document and its pure state transitions.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Contract Lifecycle                                 │
//! │                                                                         │
//! │   create ──► ┌──────────┐  close / check-in   ┌─────────────┐          │
//! │              │  Active  │ ──────────────────► │ Terminated  │          │
//! │              │          │ ◄────────────────── │             │          │
//! │              └──────────┘       reopen        └──────┬──────┘          │
//! │                  ▲ │ edit                            │ delete           │
//! │                  └─┘                                 ▼                  │
//! │                                               ┌─────────────┐          │
//! │                                               │  (removed,  │          │
//! │                                               │   audited)  │          │
//! │                                               └─────────────┘          │
//! │                                                                         │
//! │  State is implicit: it is the collection the document lives in.        │
//! │  contracts_active/{id}  ◄──►  contracts_terminated/{id}                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Functions here only reshape documents. Moving them between collections
//! atomically is frota-engine's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::checkin::CheckinRecord;
use crate::error::{CoreError, CoreResult};
use crate::lenient;
use crate::pricing::{quote_terms, PriceQuote};
use crate::types::{UserMeta, Vehicle};
use crate::validation::plate_key;
use crate::STATUS_TERMINATED;

/// Key some older clients left inside the document body.
const LEGACY_ID_KEY: &str = "_id";

// =============================================================================
// Contract State
// =============================================================================

/// Where a contract currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ContractState {
    /// Present in `contracts_active`.
    Active,
    /// Present in `contracts_terminated`.
    Terminated,
    /// In neither collection (never existed, or deleted).
    Missing,
}

impl ContractState {
    /// Fails with `InvalidTransition` unless the contract is in `expected`.
    pub fn require(
        self,
        expected: ContractState,
        contract_id: &str,
        action: &'static str,
    ) -> CoreResult<()> {
        if self == expected {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                contract_id: contract_id.to_string(),
                state: self,
                action,
            })
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// Identity document presented by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct IdDocument {
    /// `CC`, `Passaporte`, `Carta de condução`...
    pub tipo: String,
    pub numero: String,
}

/// Client data as captured at signing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default, rename_all = "camelCase")]
pub struct Client {
    pub nome: String,
    pub documento: IdDocument,
    /// Tax number.
    pub nif: String,
    pub data_nascimento: String,
    pub contacto: String,
    pub email: String,
    pub morada: String,
}

// =============================================================================
// Rental Terms
// =============================================================================

/// The `aluguer` block: period, prices, signatures and termination marks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RentalTerms {
    #[serde(default)]
    pub inicio: String,

    #[serde(default)]
    pub fim: String,

    /// Day count derived when the contract was last priced.
    #[serde(
        default,
        deserialize_with = "lenient::opt_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub dias: Option<i64>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub preco_total: Option<f64>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub preco_diario: Option<f64>,

    /// Deposit.
    #[serde(
        default,
        deserialize_with = "lenient::opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub preco_caucao: Option<f64>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub extras: Option<f64>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub desconto: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forma_pagamento: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_devolucao: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observacoes: Option<String>,

    /// Client signature (PNG data URI).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assinatura: Option<String>,

    /// Rental company signature (PNG data URI).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assinatura_locadora: Option<String>,

    /// `"terminado"` once archived; absent while active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub terminado_em: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminado_por: Option<UserMeta>,

    #[serde(flatten)]
    #[ts(skip)]
    pub extra: Map<String, Value>,
}

impl RentalTerms {
    /// Keeps the previous signatures when the edit form left the pads blank.
    pub fn keep_signatures_from(&mut self, previous: &RentalTerms) {
        if self.assinatura.is_none() {
            self.assinatura = previous.assinatura.clone();
        }
        if self.assinatura_locadora.is_none() {
            self.assinatura_locadora = previous.assinatura_locadora.clone();
        }
    }

    fn clear_termination(&mut self) {
        self.estado = None;
        self.terminado_em = None;
        self.terminado_por = None;
    }
}

// =============================================================================
// Contract
// =============================================================================

/// A rental agreement.
///
/// `veiculo` is a copy of the vehicle taken at signing and is never
/// refreshed from the inventory. `veiculo_id` is only a lookup key into
/// `vehicles/`; contracts written before vehicles had ids lack it, which is
/// why every lookup also falls back to the plate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    /// Store key; not part of the stored document.
    #[serde(skip)]
    pub id: String,

    #[serde(default)]
    pub cliente: Client,

    #[serde(default)]
    pub veiculo: Vehicle,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub veiculo_id: Option<String>,

    #[serde(default)]
    pub aluguer: RentalTerms,

    /// Generated contract PDF, base64 encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_base64: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criado_por: Option<UserMeta>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub criado_em: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atualizado_por: Option<UserMeta>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub atualizado_em: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encerrado_por: Option<UserMeta>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub encerrado_em: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaberto_por: Option<UserMeta>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub reaberto_em: Option<DateTime<Utc>>,

    /// Check-in record, present once the vehicle was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rececao: Option<CheckinRecord>,

    #[serde(flatten)]
    #[ts(skip)]
    pub extra: Map<String, Value>,
}

impl Contract {
    /// Plate of the vehicle snapshot, as a comparison key.
    pub fn plate_key(&self) -> String {
        plate_key(&self.veiculo.matricula)
    }

    /// `veiculo_id` when set and non-empty.
    pub fn vehicle_id(&self) -> Option<&str> {
        self.veiculo_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    pub fn is_terminated(&self) -> bool {
        self.aluguer.estado.as_deref() == Some(STATUS_TERMINATED)
    }

    /// Stamps `dias` and, when no explicit total was given, `precoTotal`.
    pub fn with_derived_pricing(mut self) -> (Self, PriceQuote) {
        let quote = quote_terms(&self.aluguer);
        self.aluguer.dias = Some(quote.days);
        if self.aluguer.preco_total.is_none() {
            self.aluguer.preco_total = Some(quote.total.as_euros_f64());
        }
        (self, quote)
    }

    /// Document for `contracts_terminated` after an explicit close.
    pub fn closed(mut self, by: &UserMeta, at: DateTime<Utc>) -> Self {
        self.mark_terminated(at);
        self.encerrado_por = Some(by.clone());
        self.encerrado_em = Some(at);
        self
    }

    /// Document for `contracts_terminated` after a vehicle check-in.
    pub fn checked_in(mut self, record: CheckinRecord, by: &UserMeta, at: DateTime<Utc>) -> Self {
        self.mark_terminated(at);
        self.aluguer.terminado_por = Some(by.clone());
        self.rececao = Some(record);
        self
    }

    /// Document for `contracts_active` after a reopen.
    ///
    /// Termination marks are stripped; the check-in record stays so the
    /// history of the earlier return is not lost.
    pub fn reopened(mut self, by: &UserMeta, at: DateTime<Utc>) -> Self {
        self.aluguer.clear_termination();
        self.encerrado_por = None;
        self.encerrado_em = None;
        self.reaberto_por = Some(by.clone());
        self.reaberto_em = Some(at);
        self.extra.remove(LEGACY_ID_KEY);
        self
    }

    fn mark_terminated(&mut self, at: DateTime<Utc>) {
        self.aluguer.estado = Some(STATUS_TERMINATED.to_string());
        self.aluguer.terminado_em = Some(at);
        self.extra.remove(LEGACY_ID_KEY);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Contract {
        serde_json::from_value(json!({
            "cliente": { "nome": "Maria Silva", "documento": { "tipo": "CC", "numero": "123" } },
            "veiculo": { "matricula": "AA-11-BB", "marca": "Renault", "fotos": [] },
            "veiculoId": "v1",
            "aluguer": {
                "inicio": "2024-01-01",
                "fim": "2024-01-05",
                "precoDiario": "50",
                "observacoes": "Entrega no aeroporto"
            },
            "_id": "legacy",
            "canal": "balcão"
        }))
        .unwrap()
    }

    fn operator() -> UserMeta {
        UserMeta {
            uid: Some("u1".into()),
            email: Some("op@frota.pt".into()),
            nome: "Operador".into(),
        }
    }

    #[test]
    fn test_reads_document_and_keeps_unknown_keys() {
        let c = sample();
        assert_eq!(c.cliente.documento.tipo, "CC");
        assert_eq!(c.aluguer.preco_diario, Some(50.0));
        assert_eq!(c.vehicle_id(), Some("v1"));
        assert_eq!(c.plate_key(), "aa-11-bb");
        assert_eq!(c.extra.get("canal"), Some(&json!("balcão")));
        assert!(!c.is_terminated());
    }

    #[test]
    fn test_derived_pricing() {
        let (c, q) = sample().with_derived_pricing();
        assert_eq!(q.days, 4);
        assert_eq!(c.aluguer.dias, Some(4));
        assert_eq!(c.aluguer.preco_total, Some(200.0));

        let mut explicit = sample();
        explicit.aluguer.preco_total = Some(180.0);
        let (c, _) = explicit.with_derived_pricing();
        assert_eq!(c.aluguer.preco_total, Some(180.0));
    }

    #[test]
    fn test_closed_marks_termination() {
        let at = Utc::now();
        let c = sample().closed(&operator(), at);
        assert!(c.is_terminated());
        assert_eq!(c.aluguer.terminado_em, Some(at));
        assert_eq!(c.encerrado_por.as_ref().map(|m| m.nome.as_str()), Some("Operador"));
        assert!(!c.extra.contains_key("_id"));

        let doc = serde_json::to_value(&c).unwrap();
        assert_eq!(doc["aluguer"]["estado"], json!("terminado"));
    }

    #[test]
    fn test_close_then_reopen_restores_terms() {
        let original = sample();
        let at = Utc::now();
        let reopened = original
            .clone()
            .closed(&operator(), at)
            .reopened(&operator(), at);

        assert_eq!(reopened.cliente, original.cliente);
        assert_eq!(reopened.veiculo, original.veiculo);
        assert_eq!(reopened.aluguer, original.aluguer);
        assert_eq!(reopened.encerrado_em, None);
        assert!(reopened.reaberto_em.is_some());

        let doc = serde_json::to_value(&reopened).unwrap();
        assert!(doc["aluguer"].get("estado").is_none());
        assert!(doc["aluguer"].get("terminadoEm").is_none());
    }

    #[test]
    fn test_require_state() {
        assert!(ContractState::Active
            .require(ContractState::Active, "c1", "edit")
            .is_ok());
        let err = ContractState::Active
            .require(ContractState::Terminated, "c1", "delete")
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidTransition { state: ContractState::Active, action: "delete", .. }
        ));
    }

    #[test]
    fn test_keep_signatures_from() {
        let previous = RentalTerms {
            assinatura: Some("data:image/png;base64,AAA".into()),
            assinatura_locadora: Some("data:image/png;base64,BBB".into()),
            ..Default::default()
        };
        let mut edited = RentalTerms {
            assinatura: Some("data:image/png;base64,NEW".into()),
            ..Default::default()
        };
        edited.keep_signatures_from(&previous);
        assert_eq!(edited.assinatura.as_deref(), Some("data:image/png;base64,NEW"));
        assert_eq!(edited.assinatura_locadora, previous.assinatura_locadora);
    }
}
