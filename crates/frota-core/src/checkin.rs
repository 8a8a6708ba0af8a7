//! # Check-in (`rececao`)
//!
//! The record captured when a rented vehicle comes back, and the pure rules
//! that fold it into the inventory record.
//!
//! ## Flow
//! ```text
//! CheckinDraft (form) ──validate──► CheckinRecord ──► contract.rececao
//!                                        │
//!                                        └──reconcile_vehicle──► vehicles/{id}
//!                                             mileage, "NN%" fuel, condition,
//!                                             photos (replace or keep)
//! ```
//!
//! Two check-in screens existed historically. The detailed checklist is the
//! canonical one; records from the quick screen carry five `estado*` flags
//! that [`CheckinRecord::checklist`] maps onto the detailed groups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::damage::DamageItem;
use crate::error::ValidationError;
use crate::lenient;
use crate::pricing::parse_rental_date;
use crate::types::{FuelLevel, UserMeta, Vehicle, VehicleChecklist};
use crate::validation::{require_text, ValidationResult};
use crate::MIN_CHECKIN_PHOTOS;

// =============================================================================
// Detailed Checklist
// =============================================================================

/// Declares one checklist group: a struct of booleans that all default to
/// `false`, plus `uniform`/`all_ok` helpers.
macro_rules! checklist_group {
    ($(#[$outer:meta])* $name:ident { $($(#[$inner:meta])* $field:ident),+ $(,)? }) => {
        $(#[$outer])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
        #[ts(export)]
        #[serde(default, rename_all = "camelCase")]
        pub struct $name {
            $( $(#[$inner])* pub $field: bool, )+
        }

        impl $name {
            /// Every flag set to `value`.
            pub fn uniform(value: bool) -> Self {
                Self { $( $field: value, )+ }
            }

            /// True when every item was checked.
            pub fn all_ok(&self) -> bool {
                true $( && self.$field )+
            }
        }
    };
}

checklist_group!(
    /// Body panels (`carroçaria`).
    BodyChecklist {
        capot,
        para_choques_frente,
        para_choques_tras,
        porta_frente_esq,
        porta_frente_dir,
        porta_tras_esq,
        porta_tras_dir,
        guarda_lamas_esq,
        guarda_lamas_dir,
        tejadilho,
    }
);

checklist_group!(
    /// Tyres, rims and the spare-wheel kit.
    WheelsChecklist {
        #[serde(rename = "pneuFE")]
        pneu_fe,
        #[serde(rename = "pneuFD")]
        pneu_fd,
        #[serde(rename = "pneuTE")]
        pneu_te,
        #[serde(rename = "pneuTD")]
        pneu_td,
        #[serde(rename = "jantesOK")]
        jantes_ok,
        pneu_suplente,
        macaco,
        chave_rodas,
    }
);

checklist_group!(
    GlassChecklist {
        parabrisas,
        vidro_traseiro,
        vidros_laterais,
        espelhos,
    }
);

checklist_group!(
    LightsChecklist {
        medios,
        maximos,
        piscas,
        traseiras,
        stop,
        re,
        nevoeiro,
    }
);

checklist_group!(
    InteriorChecklist {
        bancos,
        tapetes,
        estofos,
        tablier,
        radio,
        ac,
    }
);

checklist_group!(
    /// Mandatory equipment and vehicle papers.
    EquipmentChecklist {
        triangulo,
        colete,
        kit_socorros,
        dua,
        seguro,
        inspecao,
        segunda_chave,
    }
);

checklist_group!(
    ElectronicsChecklist {
        vidros_eletricos,
        travao_mao,
        fechos_portas,
        alarme,
    }
);

checklist_group!(
    FluidsChecklist {
        oleo,
        refrigerante,
        limpa_para_brisas,
    }
);

/// The full return checklist (`checklistDetalhado`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default, rename_all = "camelCase")]
pub struct DetailedChecklist {
    #[serde(rename = "carroçaria")]
    pub carrocaria: BodyChecklist,
    pub jantes_pneus: WheelsChecklist,
    pub vidros_espelhos: GlassChecklist,
    pub luzes: LightsChecklist,
    pub interior: InteriorChecklist,
    pub equipamento_docs: EquipmentChecklist,
    pub eletronica: ElectronicsChecklist,
    pub fluidos: FluidsChecklist,
}

impl DetailedChecklist {
    /// Spreads the five quick flags over the groups they summarize.
    ///
    /// Groups the quick screen never asked about stay unchecked.
    pub fn from_quick(quick: &VehicleChecklist) -> Self {
        DetailedChecklist {
            carrocaria: BodyChecklist::uniform(quick.pintura),
            jantes_pneus: WheelsChecklist {
                pneu_fe: quick.pneus,
                pneu_fd: quick.pneus,
                pneu_te: quick.pneus,
                pneu_td: quick.pneus,
                jantes_ok: quick.pneus,
                ..Default::default()
            },
            vidros_espelhos: GlassChecklist::uniform(quick.vidros),
            luzes: LightsChecklist::uniform(quick.luzes),
            interior: InteriorChecklist::uniform(quick.interior),
            ..Default::default()
        }
    }

    /// Collapses the groups back into the five quick flags.
    ///
    /// A flag is set only when every item it summarizes was checked. Tyres
    /// cover the four wheels and the rims, not the spare-wheel kit.
    pub fn to_quick(&self) -> VehicleChecklist {
        let wheels = &self.jantes_pneus;
        VehicleChecklist {
            pneus: wheels.pneu_fe
                && wheels.pneu_fd
                && wheels.pneu_te
                && wheels.pneu_td
                && wheels.jantes_ok,
            pintura: self.carrocaria.all_ok(),
            vidros: self.vidros_espelhos.all_ok(),
            interior: self.interior.all_ok(),
            luzes: self.luzes.all_ok(),
        }
    }
}

// =============================================================================
// Check-in Record
// =============================================================================

/// The `rececao` block embedded in a terminated contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRecord {
    #[serde(default, deserialize_with = "lenient::u64_or_zero")]
    pub quilometragem_devolucao: u64,

    /// Fuel on return, 0-100.
    #[serde(default)]
    pub nivel_combustivel_devolucao: u8,

    /// Return date-time as entered (`datetime-local`).
    #[serde(default)]
    pub data_devolucao: String,

    #[serde(default)]
    pub estado_geral_devolucao: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist_detalhado: Option<DetailedChecklist>,

    // Quick-screen flags, only present on older records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estado_pneus: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estado_pintura: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estado_vidros: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estado_interior: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estado_luzes: Option<bool>,

    #[serde(default)]
    pub fotos_devolucao: Vec<String>,

    /// Printable damage summary, see [`crate::damage::summarize`].
    #[serde(default)]
    pub danos_identificados: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub danos_detalhados: Vec<DamageItem>,

    #[serde(default)]
    pub observacoes_rececao: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assinatura_cliente: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assinatura_rececao: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub recebido_em: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recebido_por: Option<UserMeta>,

    /// Check-in PDF, base64 encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_base64: Option<String>,
}

impl CheckinRecord {
    /// The detailed checklist, derived from the quick flags on old records.
    pub fn checklist(&self) -> DetailedChecklist {
        if let Some(detailed) = self.checklist_detalhado {
            return detailed;
        }
        DetailedChecklist::from_quick(&VehicleChecklist {
            pneus: self.estado_pneus.unwrap_or(false),
            pintura: self.estado_pintura.unwrap_or(false),
            vidros: self.estado_vidros.unwrap_or(false),
            interior: self.estado_interior.unwrap_or(false),
            luzes: self.estado_luzes.unwrap_or(false),
        })
    }
}

// =============================================================================
// Check-in Draft
// =============================================================================

/// Check-in form input, before photos are processed.
///
/// Numeric fields are `Option` so an empty input can be told apart from a
/// zero reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckinDraft {
    pub quilometragem: Option<u64>,
    pub nivel_combustivel: Option<u8>,
    pub data_devolucao: String,
    pub estado_geral: String,
    pub checklist: DetailedChecklist,
    pub observacoes: String,
    pub assinatura_cliente: Option<String>,
    pub assinatura_rececao: Option<String>,
}

impl CheckinDraft {
    /// Checks the required inputs and the photo floor.
    ///
    /// ## Rules
    /// - mileage, fuel level, return date-time and overall condition present
    /// - fuel level within 0-100
    /// - return date-time parses
    /// - at least [`MIN_CHECKIN_PHOTOS`] photos survived processing
    pub fn validate(&self, photo_count: usize) -> ValidationResult<()> {
        if self.quilometragem.is_none() {
            return Err(ValidationError::required("quilometragemDevolucao"));
        }
        match self.nivel_combustivel {
            None => return Err(ValidationError::required("nivelCombustivelDevolucao")),
            Some(level) if level > 100 => {
                return Err(ValidationError::OutOfRange {
                    field: "nivelCombustivelDevolucao".to_string(),
                    min: 0,
                    max: 100,
                })
            }
            Some(_) => {}
        }
        require_text("dataDevolucao", &self.data_devolucao)?;
        if parse_rental_date(&self.data_devolucao).is_none() {
            return Err(ValidationError::InvalidFormat {
                field: "dataDevolucao".to_string(),
                reason: "expected an ISO 8601 date-time".to_string(),
            });
        }
        require_text("estadoGeralDevolucao", &self.estado_geral)?;

        if photo_count < MIN_CHECKIN_PHOTOS {
            return Err(ValidationError::TooFewPhotos {
                required: MIN_CHECKIN_PHOTOS,
                provided: photo_count,
            });
        }
        Ok(())
    }

    /// Builds the stored record. The PDF is attached later.
    pub fn into_record(
        self,
        photos: Vec<String>,
        damage_summary: String,
        damages: Vec<DamageItem>,
        by: &UserMeta,
        at: DateTime<Utc>,
    ) -> CheckinRecord {
        CheckinRecord {
            quilometragem_devolucao: self.quilometragem.unwrap_or(0),
            nivel_combustivel_devolucao: self.nivel_combustivel.unwrap_or(0),
            data_devolucao: self.data_devolucao,
            estado_geral_devolucao: self.estado_geral,
            checklist_detalhado: Some(self.checklist),
            fotos_devolucao: photos,
            danos_identificados: damage_summary,
            danos_detalhados: damages,
            observacoes_rececao: self.observacoes,
            assinatura_cliente: self.assinatura_cliente,
            assinatura_rececao: self.assinatura_rececao,
            recebido_em: Some(at),
            recebido_por: Some(by.clone()),
            ..Default::default()
        }
    }
}

// =============================================================================
// Vehicle Reconciliation
// =============================================================================

/// Photos the vehicle keeps after a check-in.
///
/// At least one new photo replaces the whole set; none keeps the old set.
///
/// ```rust
/// use frota_core::checkin::choose_vehicle_photos;
///
/// let old = vec!["a".to_string(), "b".to_string()];
/// assert_eq!(choose_vehicle_photos(&old, &[]), old);
/// assert_eq!(choose_vehicle_photos(&old, &["c".to_string()]), vec!["c".to_string()]);
/// ```
pub fn choose_vehicle_photos(existing: &[String], new: &[String]) -> Vec<String> {
    if new.is_empty() {
        existing.to_vec()
    } else {
        new.to_vec()
    }
}

/// Folds a check-in into the live inventory record.
///
/// Mileage and fuel are overwritten (fuel as `"NN%"`), the condition text is
/// replaced when one was given, the quick checklist is rebuilt from the
/// return checklist and the vehicle is marked available again.
pub fn reconcile_vehicle(
    mut vehicle: Vehicle,
    record: &CheckinRecord,
    by: &UserMeta,
    at: DateTime<Utc>,
) -> Vehicle {
    vehicle.quilometragem = Some(record.quilometragem_devolucao);
    vehicle.nivel_combustivel = Some(FuelLevel::from_percent(record.nivel_combustivel_devolucao));
    if !record.estado_geral_devolucao.trim().is_empty() {
        vehicle.estado = Some(record.estado_geral_devolucao.clone());
    }
    vehicle.estado_checklist = record.checklist().to_quick();
    vehicle.fotos = choose_vehicle_photos(&vehicle.fotos, &record.fotos_devolucao);
    vehicle.disponivel = Some(true);
    vehicle.atualizado_por = Some(by.clone());
    vehicle.atualizado_em = Some(at);
    vehicle
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft() -> CheckinDraft {
        CheckinDraft {
            quilometragem: Some(15_420),
            nivel_combustivel: Some(60),
            data_devolucao: "2024-01-05T18:30".into(),
            estado_geral: "Bom estado".into(),
            ..Default::default()
        }
    }

    fn photos(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("data:image/jpeg;base64,P{i}")).collect()
    }

    #[test]
    fn test_photo_floor() {
        assert_eq!(
            draft().validate(3),
            Err(ValidationError::TooFewPhotos { required: 4, provided: 3 })
        );
        assert!(draft().validate(4).is_ok());
        assert!(draft().validate(9).is_ok());
    }

    #[test]
    fn test_required_fields() {
        let mut d = draft();
        d.quilometragem = None;
        assert_eq!(d.validate(4).unwrap_err().field(), Some("quilometragemDevolucao"));

        let mut d = draft();
        d.nivel_combustivel = Some(101);
        assert!(matches!(d.validate(4), Err(ValidationError::OutOfRange { .. })));

        let mut d = draft();
        d.data_devolucao = "ontem".into();
        assert!(matches!(d.validate(4), Err(ValidationError::InvalidFormat { .. })));

        let mut d = draft();
        d.estado_geral = " ".into();
        assert_eq!(d.validate(4).unwrap_err().field(), Some("estadoGeralDevolucao"));
    }

    #[test]
    fn test_checklist_defaults_to_false() {
        let record: CheckinRecord = serde_json::from_value(json!({
            "quilometragemDevolucao": "1200",
            "checklistDetalhado": { "luzes": { "stop": true }, "carroçaria": {} }
        }))
        .unwrap();
        let checklist = record.checklist();
        assert!(checklist.luzes.stop);
        assert!(!checklist.luzes.medios);
        assert!(!checklist.carrocaria.capot);
        assert!(!checklist.fluidos.all_ok());
        assert_eq!(record.quilometragem_devolucao, 1200);
    }

    #[test]
    fn test_quick_flags_map_onto_detailed_groups() {
        let record: CheckinRecord = serde_json::from_value(json!({
            "estadoPneus": true,
            "estadoVidros": true
        }))
        .unwrap();
        let checklist = record.checklist();
        assert!(checklist.jantes_pneus.pneu_fe && checklist.jantes_pneus.jantes_ok);
        assert!(!checklist.jantes_pneus.macaco);
        assert!(checklist.vidros_espelhos.all_ok());
        assert!(!checklist.carrocaria.tejadilho);
    }

    #[test]
    fn test_quick_flags_survive_a_round_trip() {
        let quick = VehicleChecklist { pneus: true, vidros: true, luzes: true, ..Default::default() };
        assert_eq!(DetailedChecklist::from_quick(&quick).to_quick(), quick);

        let mut detailed = DetailedChecklist::from_quick(&quick);
        detailed.jantes_pneus.pneu_td = false;
        assert!(!detailed.to_quick().pneus);
    }

    #[test]
    fn test_checklist_wire_names() {
        let mut checklist = DetailedChecklist::default();
        checklist.jantes_pneus.pneu_fe = true;
        checklist.jantes_pneus.jantes_ok = true;
        let value = serde_json::to_value(checklist).unwrap();
        assert_eq!(value["jantesPneus"]["pneuFE"], json!(true));
        assert_eq!(value["jantesPneus"]["jantesOK"], json!(true));
        assert_eq!(value["carroçaria"]["paraChoquesFrente"], json!(false));
        assert_eq!(value["fluidos"]["limpaParaBrisas"], json!(false));
    }

    #[test]
    fn test_reconcile_vehicle_replaces_photos() {
        let by = UserMeta::anonymous();
        let vehicle = Vehicle {
            matricula: "AA-11-BB".into(),
            fotos: photos(2),
            estado_checklist: VehicleChecklist { pneus: true, ..Default::default() },
            ..Default::default()
        };
        let mut d = draft();
        d.checklist.carrocaria = BodyChecklist::uniform(true);
        d.checklist.luzes = LightsChecklist::uniform(true);
        d.checklist.jantes_pneus.pneu_fe = true;
        let record = d.into_record(photos(5), String::new(), vec![], &by, Utc::now());

        let updated = reconcile_vehicle(vehicle, &record, &by, Utc::now());
        assert_eq!(updated.fotos, photos(5));
        assert_eq!(updated.quilometragem, Some(15_420));
        assert_eq!(updated.nivel_combustivel, Some(FuelLevel::Descriptive("60%".into())));
        assert_eq!(updated.estado.as_deref(), Some("Bom estado"));
        assert_eq!(
            updated.estado_checklist,
            VehicleChecklist { pintura: true, luzes: true, ..Default::default() }
        );
        assert_eq!(updated.disponivel, Some(true));
    }

    #[test]
    fn test_reconcile_vehicle_keeps_photos_when_none_captured() {
        let by = UserMeta::anonymous();
        let vehicle = Vehicle {
            fotos: photos(3),
            estado: Some("Riscos ligeiros".into()),
            ..Default::default()
        };
        let mut record = draft().into_record(vec![], String::new(), vec![], &by, Utc::now());
        record.estado_geral_devolucao.clear();

        let updated = reconcile_vehicle(vehicle, &record, &by, Utc::now());
        assert_eq!(updated.fotos, photos(3));
        assert_eq!(updated.estado.as_deref(), Some("Riscos ligeiros"));
    }
}
