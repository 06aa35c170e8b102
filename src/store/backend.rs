use std::{collections::HashMap, sync::Arc};

use anyhow::{Context, Result};
use log::warn;
use tokio::sync::{watch, Mutex};

use crate::models::Pin;

struct BackendInner {
    /// Documents keyed by pin id. Writing an id that already exists replaces
    /// the document, so a retried add can never produce a second pin.
    documents: Mutex<HashMap<String, serde_json::Value>>,
    /// Revision counter bumped on every mutation; the push-notification side
    /// of the live query.
    revision: watch::Sender<u64>,
}

/// Handle to the shared pin collection.
///
/// Clones share one underlying collection, so two stores built over clones of
/// the same handle behave like two clients of one replicated backend: each
/// sees the other's writes through [`PinBackend::watch`]. Readers observe the
/// latest revision whenever they get around to it; no caller may assume a
/// write is visible before the next notification.
#[derive(Clone)]
pub struct PinBackend {
    inner: Arc<BackendInner>,
}

impl PinBackend {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(BackendInner {
                documents: Mutex::new(HashMap::new()),
                revision,
            }),
        }
    }

    /// Writes a pin document under its id, replacing any previous document
    /// with the same id.
    pub async fn upsert(&self, pin: &Pin) -> Result<()> {
        let doc = serde_json::to_value(pin)
            .with_context(|| format!("failed to serialize pin {}", pin.id))?;
        {
            let mut documents = self.inner.documents.lock().await;
            documents.insert(pin.id.clone(), doc);
        }
        self.bump();
        Ok(())
    }

    /// Deletes a document by id. Deleting an id that is already gone is a
    /// no-op, so racing clients can both request the same removal.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let removed = {
            let mut documents = self.inner.documents.lock().await;
            documents.remove(id).is_some()
        };
        if removed {
            self.bump();
        }
        Ok(())
    }

    /// All pins of one map, ordered by creation time (ties broken by id).
    /// Documents that fail to deserialize are skipped, not fatal; another
    /// writer's garbage must never take the collection down.
    pub async fn query(&self, map_id: &str) -> Result<Vec<Pin>> {
        let mut pins = {
            let documents = self.inner.documents.lock().await;
            let mut pins = Vec::with_capacity(documents.len());
            for (id, doc) in documents.iter() {
                match serde_json::from_value::<Pin>(doc.clone()) {
                    Ok(pin) if pin.map_id == map_id => pins.push(pin),
                    Ok(_) => {}
                    Err(err) => warn!("skipping malformed pin document {id}: {err}"),
                }
            }
            pins
        };
        pins.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(pins)
    }

    /// Receiver of the revision counter; completes a `changed()` wait on every
    /// collection mutation.
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    fn bump(&self) {
        self.inner.revision.send_modify(|revision| *revision += 1);
    }
}

impl Default for PinBackend {
    fn default() -> Self {
        Self::new()
    }
}
