// ── Store apply task ──
//
// The single writer of the DataStore. Fetch outcomes and write patches
// arrive over an unbounded channel and are applied in arrival order.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::worker::FetchOutcome;
use crate::error::CoreError;
use crate::model::{ResourceId, ResourceType};
use crate::store::DataStore;

pub(crate) enum StoreMessage {
    Fetched(FetchOutcome),
    Patched {
        kind: ResourceType,
        id: ResourceId,
        fields: Map<String, Value>,
        etag: Option<String>,
    },
    /// Answered once every message sent before it has been applied.
    Barrier(oneshot::Sender<()>),
}

/// Applies messages to the store, remembering the newest launch
/// sequence applied per type.
pub(crate) struct Applier {
    store: Arc<DataStore>,
    applied: HashMap<ResourceType, u64>,
}

impl Applier {
    pub(crate) fn new(store: Arc<DataStore>) -> Self {
        Self {
            store,
            applied: HashMap::new(),
        }
    }

    /// Apply one message. Returns the fetch error, if the message carried
    /// one, so the caller can report it.
    pub(crate) fn apply(&mut self, message: StoreMessage) -> Option<CoreError> {
        match message {
            StoreMessage::Fetched(FetchOutcome { kind, seq, result }) => match result {
                Ok(records) => {
                    let newest = self.applied.entry(kind).or_insert(0);
                    if seq < *newest {
                        // Last completed wins, even when launched earlier.
                        debug!(%kind, seq, newest = *newest, "out-of-order completion applied");
                    } else {
                        *newest = seq;
                    }
                    self.store.update_database(kind, records);
                    None
                }
                Err(e) => {
                    log_fetch_error(kind, &e);
                    Some(e)
                }
            },
            StoreMessage::Patched {
                kind,
                id,
                fields,
                etag,
            } => {
                self.store.update_item_fields(kind, &id, fields, etag);
                None
            }
            StoreMessage::Barrier(done) => {
                let _ = done.send(());
                None
            }
        }
    }
}

fn log_fetch_error(kind: ResourceType, error: &CoreError) {
    match error {
        CoreError::NotReady { waiting_for, .. } => {
            debug!(%kind, %waiting_for, "fetch skipped, dependency not loaded");
        }
        e if e.is_connectivity() => {
            warn!(%kind, error = %e, "backend unreachable, keeping cached data");
        }
        e => warn!(%kind, error = %e, "fetch failed, keeping cached data"),
    }
}

/// Drain `rx` into the store until every sender is gone.
pub(crate) async fn apply_task(mut applier: Applier, mut rx: mpsc::UnboundedReceiver<StoreMessage>) {
    info!("store apply task started");
    while let Some(message) = rx.recv().await {
        applier.apply(message);
    }
    debug!("store apply task stopped");
}
