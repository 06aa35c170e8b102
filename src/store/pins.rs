use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::backend::PinBackend;
use crate::models::{Pin, PinTag};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Receives the latest live pin set on every store notification.
pub type SnapshotFn = Arc<dyn Fn(Vec<Pin>) + Send + Sync>;

/// Store thresholds.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Age at which a pin stops being live and gets deleted from the shared
    /// collection.
    pub max_duration: Duration,
    /// How often the periodic sweep re-checks the collection; bridges expiry
    /// gaps when no writer is pushing changes.
    pub sweep_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(60),
            sweep_interval: Duration::from_millis(1000),
        }
    }
}

struct StoreInner {
    backend: PinBackend,
    config: StoreConfig,
    listeners: Mutex<Vec<JoinHandle<()>>>,
    cancel: Mutex<Option<CancellationToken>>,
}

/// Authoritative set of non-expired pins for a shared backend collection.
///
/// Mutations are asynchronous and non-blocking: `add_pin` and `remove` fire a
/// backend request and return; the resulting state arrives later through the
/// subscription channel. Callers must not assume a pin is visible (or gone)
/// the moment the call returns.
#[derive(Clone)]
pub struct PinStore {
    inner: Arc<StoreInner>,
}

impl PinStore {
    pub fn new(backend: PinBackend, config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                backend,
                config,
                listeners: Mutex::new(Vec::new()),
                cancel: Mutex::new(None),
            }),
        }
    }

    /// Registers for live updates filtered to `map_id`. Delivers the current
    /// live set immediately, then re-sweeps and re-notifies on every backend
    /// change and on every sweep tick. Cancelled by [`PinStore::unsubscribe_all`].
    pub async fn subscribe(&self, map_id: &str, callback: SnapshotFn) {
        let token = {
            let mut cancel = self.inner.cancel.lock().await;
            cancel.get_or_insert_with(CancellationToken::new).clone()
        };

        // Subscribe to revisions before the first sweep so a write landing
        // between the sweep and the listener startup is not missed.
        let mut revisions = self.inner.backend.watch();

        let mut last_live = match self.sweep(map_id).await {
            Ok(live) => {
                callback(live.clone());
                live
            }
            Err(err) => {
                log_warn!("initial pin sweep failed for map {map_id}: {err:?}");
                Vec::new()
            }
        };

        let store = self.clone();
        let map_id = map_id.to_string();
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(store.inner.config.sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the initial delivery
            // already happened, so consume it.
            ticker.tick().await;

            loop {
                tokio::select! {
                    changed = revisions.changed() => {
                        if changed.is_err() {
                            log_warn!("pin backend dropped; listener for map {map_id} stopping");
                            break;
                        }
                        match store.sweep(&map_id).await {
                            Ok(live) => {
                                last_live = live.clone();
                                callback(live);
                            }
                            Err(err) => log_warn!("pin sweep failed for map {map_id}: {err:?}"),
                        }
                    }
                    _ = ticker.tick() => {
                        match store.sweep(&map_id).await {
                            // Ticks only re-notify when expiry actually
                            // changed the set; backend pushes always notify.
                            Ok(live) if live != last_live => {
                                last_live = live.clone();
                                callback(live);
                            }
                            Ok(_) => {}
                            Err(err) => log_warn!("pin sweep failed for map {map_id}: {err:?}"),
                        }
                    }
                    _ = token.cancelled() => {
                        log_info!("pin listener for map {map_id} shutting down");
                        break;
                    }
                }
            }
        });

        self.inner.listeners.lock().await.push(handle);
    }

    /// Persists a new pin at the given map ratio. Backend failures are logged
    /// and swallowed; the next user action or sweep retries implicitly. The
    /// pin appears to subscribers once the backend acknowledges it.
    pub async fn add_pin(&self, x_ratio: f64, y_ratio: f64, tag: PinTag, map_id: &str) {
        let pin = Pin::new(x_ratio, y_ratio, tag, map_id);
        log_info!("placing {} pin {} on map {map_id}", pin.tag.as_str(), pin.id);
        if let Err(err) = self.inner.backend.upsert(&pin).await {
            log_warn!("failed to persist pin {}: {err:?}", pin.id);
        }
    }

    /// Requests deletion of a pin by id. Removing an id that is already gone
    /// is not an error.
    pub async fn remove(&self, id: &str) {
        if let Err(err) = self.inner.backend.delete(id).await {
            log_warn!("failed to remove pin {id}: {err:?}");
        }
    }

    /// Stops every listener and its sweep ticker. Safe to call repeatedly and
    /// before any subscribe; once it returns no further snapshot is delivered.
    pub async fn unsubscribe_all(&self) {
        if let Some(token) = self.inner.cancel.lock().await.take() {
            token.cancel();
        }
        let mut listeners = self.inner.listeners.lock().await;
        for handle in listeners.drain(..) {
            handle.abort();
        }
    }

    /// Queries the backend, requests deletion of every expired pin, and
    /// returns the live remainder. Deletion goes through the shared store, not
    /// a local filter; a racing store deleting the same pin is a no-op.
    async fn sweep(&self, map_id: &str) -> Result<Vec<Pin>> {
        let pins = self
            .inner
            .backend
            .query(map_id)
            .await
            .with_context(|| format!("pin query failed for map {map_id}"))?;

        let now = Utc::now();
        let max_duration = self.inner.config.max_duration;
        let (live, expired): (Vec<Pin>, Vec<Pin>) = pins
            .into_iter()
            .partition(|pin| pin.is_live(now, max_duration));

        for pin in &expired {
            log_info!("deleting expired pin {} from map {map_id}", pin.id);
            if let Err(err) = self.inner.backend.delete(&pin.id).await {
                log_warn!("failed to delete expired pin {}: {err:?}", pin.id);
            }
        }

        Ok(live)
    }
}
