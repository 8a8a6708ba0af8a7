//! # Engine Handle
//!
//! [`Engine`] owns the store handle, the collaborators and the config. The
//! operations themselves live in [`crate::lifecycle`], [`crate::checkin`]
//! and [`crate::damage`] as further `impl Engine` blocks.
//!
//! ## Bounded Store Calls
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every store call goes through `read` or `write`:                       │
//! │                                                                         │
//! │   store future ──► timeout(operation_timeout) ──► EngineError mapping   │
//! │                                                                         │
//! │   read  failed / timed out   → Persistence { NotApplied }              │
//! │   write failed before commit → Persistence { NotApplied }              │
//! │   write failed at commit     → Persistence { Unknown }                 │
//! │   write timed out            → Persistence { Unknown }                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use frota_core::{Contract, UserMeta};
use frota_store::{Store, StoreError, StoreResult};

use crate::availability::AvailabilityWatcher;
use crate::collaborators::{DocumentRenderer, IdentityProvider, ImageProcessor};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, WriteOutcome};
use crate::photos::PhotoPipeline;

/// The services the engine calls out to.
#[derive(Debug, Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub images: Arc<dyn ImageProcessor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Read,
    Write,
}

/// Rental engine. Cheap to clone; clones share the store and collaborators.
#[derive(Debug, Clone)]
pub struct Engine {
    pub(crate) store: Store,
    pub(crate) identity: Arc<dyn IdentityProvider>,
    pub(crate) renderer: Arc<dyn DocumentRenderer>,
    pub(crate) photos: PhotoPipeline,
    pub(crate) config: Arc<EngineConfig>,
}

impl Engine {
    pub fn new(store: Store, collaborators: Collaborators, config: EngineConfig) -> Self {
        let photos = PhotoPipeline::new(collaborators.images, config.photos.clone());
        Engine {
            store,
            identity: collaborators.identity,
            renderer: collaborators.renderer,
            photos,
            config: Arc::new(config),
        }
    }

    /// Opens the SQLite store named in `config` and builds the engine on it.
    pub async fn open(config: EngineConfig, collaborators: Collaborators) -> EngineResult<Self> {
        config.validate()?;
        let store = bounded(
            config.operation_timeout(),
            "open store",
            CallKind::Read,
            Store::sqlite(config.store_config()),
        )
        .await?;
        info!(
            path = %config.store.database_path.display(),
            backend = store.raw().backend(),
            "Rental engine ready"
        );
        Ok(Self::new(store, collaborators, config))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Authorship stamp for the signed-in user (anonymous when signed out).
    pub fn actor(&self) -> UserMeta {
        UserMeta::from_identity(self.identity.current_user().as_ref())
    }

    /// Starts a live view of unavailable vehicles; see [`AvailabilityWatcher`].
    pub async fn watch_availability(&self) -> EngineResult<AvailabilityWatcher> {
        AvailabilityWatcher::start(self.clone()).await
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    // =========================================================================
    // Bounded Store Calls
    // =========================================================================

    pub(crate) async fn read<T, F>(&self, operation: &'static str, call: F) -> EngineResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        bounded(self.config.operation_timeout(), operation, CallKind::Read, call).await
    }

    pub(crate) async fn write<T, F>(&self, operation: &'static str, call: F) -> EngineResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        bounded(self.config.operation_timeout(), operation, CallKind::Write, call).await
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    pub(crate) async fn render_contract(&self, contract: &Contract) -> EngineResult<Vec<u8>> {
        self.renderer.render_contract(contract).await.map_err(|e| {
            error!(contract_id = %contract.id, error = %e, "Contract PDF generation failed");
            EngineError::Render(e.0)
        })
    }

    pub(crate) async fn render_checkin(&self, contract: &Contract) -> EngineResult<Vec<u8>> {
        self.renderer.render_checkin(contract).await.map_err(|e| {
            error!(contract_id = %contract.id, error = %e, "Check-in PDF generation failed");
            EngineError::Render(e.0)
        })
    }
}

async fn bounded<T, F>(
    timeout: Duration,
    operation: &'static str,
    kind: CallKind,
    call: F,
) -> EngineResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(persistence_error(operation, kind, e)),
        Err(_) => {
            let outcome = match kind {
                CallKind::Read => WriteOutcome::NotApplied,
                CallKind::Write => WriteOutcome::Unknown,
            };
            error!(
                operation,
                timeout_secs = timeout.as_secs(),
                %outcome,
                "Store call timed out"
            );
            Err(EngineError::Persistence {
                operation,
                outcome,
                message: format!("timed out after {}s", timeout.as_secs()),
            })
        }
    }
}

fn persistence_error(operation: &'static str, kind: CallKind, err: StoreError) -> EngineError {
    let outcome = if kind == CallKind::Write && err.outcome_unknown() {
        WriteOutcome::Unknown
    } else {
        WriteOutcome::NotApplied
    };
    error!(operation, %outcome, error = %err, "Store call failed");
    EngineError::Persistence {
        operation,
        outcome,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_write_has_unknown_outcome() {
        let err = bounded(
            Duration::from_secs(1),
            "archive",
            CallKind::Write,
            std::future::pending::<StoreResult<()>>(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.write_outcome(), WriteOutcome::Unknown);

        let err = bounded(
            Duration::from_secs(1),
            "list",
            CallKind::Read,
            std::future::pending::<StoreResult<()>>(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.write_outcome(), WriteOutcome::NotApplied);
    }

    #[tokio::test]
    async fn test_store_errors_classify_outcome() {
        let err = bounded(Duration::from_secs(1), "archive", CallKind::Write, async {
            Err::<(), _>(StoreError::CommitFailed("disk I/O error".into()))
        })
        .await
        .unwrap_err();
        assert_eq!(err.write_outcome(), WriteOutcome::Unknown);

        let err = bounded(Duration::from_secs(1), "archive", CallKind::Write, async {
            Err::<(), _>(StoreError::invalid_path("a/b", "bad"))
        })
        .await
        .unwrap_err();
        assert_eq!(err.write_outcome(), WriteOutcome::NotApplied);
    }
}
