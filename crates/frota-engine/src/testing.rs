//! Test doubles and fixtures shared by the engine's unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use frota_core::{CheckinDraft, Client, Contract, DetailedChecklist, RentalTerms, Vehicle};
use frota_store::{
    DocumentStore, MemoryStore, MultiPathUpdate, Store, StoreError, StoreResult, Subscription,
};

use crate::collaborators::{
    DocumentRenderer, ImageError, ImageProcessor, PhotoSource, RenderError, StaticIdentity,
};
use crate::config::EngineConfig;
use crate::engine::{Collaborators, Engine};
use crate::lifecycle::NewContract;

// =============================================================================
// Images
// =============================================================================

/// Image processor that tags each step in the URI.
///
/// Files named `bad*` fail to encode, URIs containing `unresizable` fail
/// to resize and URIs containing `huge` fail the size bound.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedImages {
    resizes: Arc<Mutex<Vec<(u32, u32)>>>,
}

impl ScriptedImages {
    pub(crate) fn resize_calls(&self) -> Vec<(u32, u32)> {
        self.resizes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageProcessor for ScriptedImages {
    async fn to_data_uri(&self, photo: &PhotoSource) -> Result<String, ImageError> {
        if photo.file_name.starts_with("bad") {
            return Err(ImageError(format!("cannot read {}", photo.file_name)));
        }
        Ok(format!("data:{}", photo.file_name))
    }

    async fn resize(&self, data_uri: &str, max_width: u32, max_height: u32) -> Result<String, ImageError> {
        if data_uri.contains("unresizable") {
            return Err(ImageError("decode failed".to_string()));
        }
        self.resizes.lock().unwrap().push((max_width, max_height));
        Ok(format!("resized:{data_uri}"))
    }

    async fn bound_to_max_bytes(&self, data_uri: &str, _max_bytes: usize) -> Result<String, ImageError> {
        if data_uri.contains("huge") {
            return Err(ImageError("still over the limit".to_string()));
        }
        Ok(format!("bounded:{data_uri}"))
    }
}

// =============================================================================
// Renderer
// =============================================================================

/// Renders `contract:{client}` / `checkin:{client}` and counts attempts.
#[derive(Debug, Default)]
pub(crate) struct FakeRenderer {
    fail_next: AtomicBool,
    contract_calls: AtomicUsize,
    checkin_calls: AtomicUsize,
}

impl FakeRenderer {
    /// The next render of either kind fails.
    pub(crate) fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub(crate) fn contract_calls(&self) -> usize {
        self.contract_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn checkin_calls(&self) -> usize {
        self.checkin_calls.load(Ordering::SeqCst)
    }

    fn output(&self, kind: &str, contract: &Contract) -> Result<Vec<u8>, RenderError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(RenderError("font missing".to_string()));
        }
        Ok(format!("{kind}:{}", contract.cliente.nome).into_bytes())
    }
}

#[async_trait]
impl DocumentRenderer for FakeRenderer {
    async fn render_contract(&self, contract: &Contract) -> Result<Vec<u8>, RenderError> {
        self.contract_calls.fetch_add(1, Ordering::SeqCst);
        self.output("contract", contract)
    }

    async fn render_checkin(&self, contract: &Contract) -> Result<Vec<u8>, RenderError> {
        self.checkin_calls.fetch_add(1, Ordering::SeqCst);
        self.output("checkin", contract)
    }
}

// =============================================================================
// Store
// =============================================================================

/// Memory store whose writes can be made to fail under chosen prefixes.
#[derive(Debug, Default)]
pub(crate) struct FailingStore {
    inner: MemoryStore,
    failing: Mutex<Vec<String>>,
}

impl FailingStore {
    /// Every write or update touching `prefix` (or below it) fails before
    /// anything is applied.
    pub(crate) fn fail_writes_under(&self, prefix: &str) {
        self.failing.lock().unwrap().push(prefix.to_string());
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count()
    }

    fn check<'a>(&self, mut paths: impl Iterator<Item = &'a str>) -> StoreResult<()> {
        let failing = self.failing.lock().unwrap();
        let hit = paths.find(|p| {
            failing
                .iter()
                .any(|prefix| *p == prefix.as_str() || p.starts_with(&format!("{prefix}/")))
        });
        match hit {
            Some(p) => Err(StoreError::TransactionFailed(format!("injected failure on {p}"))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    fn backend(&self) -> &'static str {
        "failing-memory"
    }

    async fn read(&self, path: &str) -> StoreResult<Option<Value>> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &str, value: Value) -> StoreResult<()> {
        self.check(std::iter::once(path))?;
        self.inner.write(path, value).await
    }

    async fn update(&self, update: MultiPathUpdate) -> StoreResult<()> {
        self.check(update.paths())?;
        self.inner.update(update).await
    }

    fn subscribe(&self, path: &str) -> StoreResult<Subscription> {
        self.inner.subscribe(path)
    }
}

// =============================================================================
// Harness
// =============================================================================

pub(crate) const V1_PLATE: &str = "AA-11-BB";
pub(crate) const V2_PLATE: &str = "CC-22-DD";

/// Engine over a [`FailingStore`] seeded with two cars, `v1` and `v2`,
/// operated by "Ana Operadora".
pub(crate) struct Harness {
    pub engine: Engine,
    pub store: Arc<FailingStore>,
    pub renderer: Arc<FakeRenderer>,
    pub identity: Arc<StaticIdentity>,
    pub v1: String,
    pub v2: String,
}

impl Harness {
    pub(crate) async fn new() -> Self {
        let store = Arc::new(FailingStore::default());
        let handle = Store::new(store.clone());
        handle.vehicles().put(&clio(V1_PLATE).with_id("v1")).await.unwrap();
        handle.vehicles().put(&clio(V2_PLATE).with_id("v2")).await.unwrap();

        let renderer = Arc::new(FakeRenderer::default());
        let identity = Arc::new(StaticIdentity::signed_in(
            "u-ana",
            "ana@frota.pt",
            "Ana Operadora",
        ));
        let engine = Engine::new(
            handle,
            Collaborators {
                identity: identity.clone(),
                renderer: renderer.clone(),
                images: Arc::new(ScriptedImages::default()),
            },
            EngineConfig::default(),
        );

        Harness {
            engine,
            store,
            renderer,
            identity,
            v1: "v1".to_string(),
            v2: "v2".to_string(),
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub(crate) fn clio(plate: &str) -> Vehicle {
    Vehicle {
        matricula: plate.to_string(),
        marca: Some("Renault".to_string()),
        modelo: Some("Clio".to_string()),
        cor: Some("Branco".to_string()),
        ano: Some(2021),
        combustivel: Some("gasolina".to_string()),
        quilometragem: Some(42_000),
        ..Default::default()
    }
}

/// Four-day rental at 50/day of the harness car `vehicle_id`.
pub(crate) fn new_contract(vehicle_id: &str, client_name: &str) -> NewContract {
    let plate = if vehicle_id == "v2" { V2_PLATE } else { V1_PLATE };
    NewContract {
        cliente: Client {
            nome: client_name.to_string(),
            nif: "123456789".to_string(),
            contacto: "912345678".to_string(),
            ..Default::default()
        },
        veiculo: clio(plate),
        veiculo_id: Some(vehicle_id.to_string()),
        aluguer: RentalTerms {
            inicio: "2024-01-01".to_string(),
            fim: "2024-01-05".to_string(),
            preco_diario: Some(50.0),
            ..Default::default()
        },
        novas_fotos: Vec::new(),
    }
}

pub(crate) fn photos(n: usize) -> Vec<PhotoSource> {
    (1..=n)
        .map(|i| PhotoSource::jpeg(format!("photo-{i}.jpg"), vec![i as u8]))
        .collect()
}

pub(crate) fn checkin_draft() -> CheckinDraft {
    CheckinDraft {
        quilometragem: Some(43_100),
        nivel_combustivel: Some(75),
        data_devolucao: "2024-01-05T10:30".to_string(),
        estado_geral: "Bom estado, sem sujidade".to_string(),
        checklist: DetailedChecklist::default(),
        observacoes: String::new(),
        assinatura_cliente: None,
        assinatura_rececao: None,
    }
}
