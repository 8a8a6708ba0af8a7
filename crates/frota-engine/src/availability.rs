//! # Availability Watcher
//!
//! Keeps the set of unavailable vehicles current while a view is open.
//!
//! ```text
//! ┌──────────────────────┐  change on contracts_active  ┌─────────────────┐
//! │     DocumentStore    │ ───────────────────────────► │                 │
//! └──────────────────────┘                              │  watcher task   │
//! ┌──────────────────────┐  sign-in / sign-out          │  (recompute or  │
//! │   IdentityProvider   │ ───────────────────────────► │   clear)        │
//! └──────────────────────┘                              └────────┬────────┘
//!                                                                │ watch
//!                                                                ▼
//!                                                     AvailabilityWatcher
//!                                                     current() / changed()
//! ```
//!
//! The watcher owns its store subscription. `close()` or dropping the
//! watcher stops the task, which detaches the subscription.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use frota_core::{Identity, UnavailableSet, Vehicle};
use frota_store::path::CONTRACTS_ACTIVE;
use frota_store::{DocumentStore, Subscription};

use crate::engine::Engine;
use crate::error::EngineResult;

#[derive(Debug)]
pub struct AvailabilityWatcher {
    state: watch::Receiver<UnavailableSet>,
    task: Option<JoinHandle<()>>,
}

impl AvailabilityWatcher {
    pub(crate) async fn start(engine: Engine) -> EngineResult<Self> {
        let raw = engine.store.raw().clone();
        let subscription = engine
            .read("subscribe", std::future::ready(raw.subscribe(CONTRACTS_ACTIVE)))
            .await?;

        let mut identity = engine.identity.changes();
        let signed_in = identity.borrow_and_update().is_some();
        let initial = if signed_in {
            engine.unavailable_vehicles(None).await?
        } else {
            UnavailableSet::default()
        };

        let (tx, state) = watch::channel(initial);
        let task = tokio::spawn(watch_loop(engine, subscription, identity, tx));
        debug!(signed_in, "Availability watcher started");

        Ok(AvailabilityWatcher {
            state,
            task: Some(task),
        })
    }

    /// Snapshot of the unavailable set.
    pub fn current(&self) -> UnavailableSet {
        self.state.borrow().clone()
    }

    pub fn is_unavailable(&self, vehicle: &Vehicle) -> bool {
        self.state.borrow().vehicle_is_unavailable(vehicle)
    }

    /// Waits for the next recomputation. `false` once the watcher stopped.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }

    /// Stops listening. Idempotent.
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Availability watcher closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.task.is_none()
    }
}

impl Drop for AvailabilityWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

async fn watch_loop(
    engine: Engine,
    mut subscription: Subscription,
    mut identity: watch::Receiver<Option<Identity>>,
    tx: watch::Sender<UnavailableSet>,
) {
    loop {
        tokio::select! {
            event = subscription.changed() => {
                let Some(event) = event else {
                    debug!("Store closed, availability watcher stopping");
                    break;
                };
                if identity.borrow().is_none() {
                    continue;
                }
                debug!(resync = event.resync, "Active contracts changed");
                refresh(&engine, &tx).await;
            }
            changed = identity.changed() => {
                if changed.is_err() {
                    debug!("Identity provider gone, availability watcher stopping");
                    tx.send_replace(UnavailableSet::default());
                    break;
                }
                let signed_in = identity.borrow_and_update().is_some();
                if signed_in {
                    refresh(&engine, &tx).await;
                } else {
                    tx.send_replace(UnavailableSet::default());
                    info!("Signed out, availability cleared");
                }
            }
        }
    }
    subscription.close();
}

async fn refresh(engine: &Engine, tx: &watch::Sender<UnavailableSet>) {
    match engine.unavailable_vehicles(None).await {
        Ok(set) => {
            tx.send_replace(set);
        }
        Err(e) => warn!(error = %e, "Could not recompute availability, keeping previous set"),
    }
}
