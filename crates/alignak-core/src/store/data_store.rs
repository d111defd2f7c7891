// ── Central data store ──
//
// Latest collection per resource type. Reads are snapshot clones;
// writes come from a single apply task (see `refresh.rs`).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use super::collection::{CollectionSnapshot, ResourceCollection};
use crate::model::{ResourceType, StoreEvent};
use crate::stream::ResourceStream;

const EVENT_CHANNEL_SIZE: usize = 256;

/// Process-lifetime cache of monitoring data.
///
/// Every type starts empty and unloaded. Nothing is ever evicted: a
/// collection only changes when a newer fetch replaces it or a write
/// patches one of its records.
pub struct DataStore {
    pub(crate) user: ResourceCollection,
    pub(crate) realms: ResourceCollection,
    pub(crate) timeperiods: ResourceCollection,
    pub(crate) hosts: ResourceCollection,
    pub(crate) services: ResourceCollection,
    pub(crate) daemons: ResourceCollection,
    pub(crate) livesynthesis: ResourceCollection,
    pub(crate) history: ResourceCollection,
    pub(crate) notifications: ResourceCollection,
    pub(crate) event_tx: broadcast::Sender<StoreEvent>,
}

impl DataStore {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

        Self {
            user: ResourceCollection::new(ResourceType::User),
            realms: ResourceCollection::new(ResourceType::Realm),
            timeperiods: ResourceCollection::new(ResourceType::Timeperiod),
            hosts: ResourceCollection::new(ResourceType::Host),
            services: ResourceCollection::new(ResourceType::Service),
            daemons: ResourceCollection::new(ResourceType::Daemon),
            livesynthesis: ResourceCollection::new(ResourceType::LiveSynthesis),
            history: ResourceCollection::new(ResourceType::History),
            notifications: ResourceCollection::new(ResourceType::Notification),
            event_tx,
        }
    }

    pub(crate) fn collection(&self, kind: ResourceType) -> &ResourceCollection {
        match kind {
            ResourceType::User => &self.user,
            ResourceType::Realm => &self.realms,
            ResourceType::Timeperiod => &self.timeperiods,
            ResourceType::Host => &self.hosts,
            ResourceType::Service => &self.services,
            ResourceType::Daemon => &self.daemons,
            ResourceType::LiveSynthesis => &self.livesynthesis,
            ResourceType::History => &self.history,
            ResourceType::Notification => &self.notifications,
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    /// Current collection for `kind` (cheap `Arc` clone).
    pub fn snapshot(&self, kind: ResourceType) -> Arc<CollectionSnapshot> {
        self.collection(kind).snapshot()
    }

    /// Subscribe to replacements of the `kind` collection.
    pub fn subscribe(&self, kind: ResourceType) -> ResourceStream {
        ResourceStream::new(self.collection(kind).subscribe())
    }

    /// Subscribe to store change events.
    pub fn events(&self) -> broadcast::Receiver<StoreEvent> {
        self.event_tx.subscribe()
    }

    // ── Load state ───────────────────────────────────────────────────

    pub fn last_refresh(&self, kind: ResourceType) -> Option<DateTime<Utc>> {
        self.collection(kind).last_refresh()
    }

    pub fn is_loaded(&self, kind: ResourceType) -> bool {
        self.last_refresh(kind).is_some()
    }

    /// Every resource type has been loaded at least once.
    pub fn is_ready(&self) -> bool {
        ResourceType::all().into_iter().all(|k| self.is_loaded(k))
    }

    pub(crate) fn emit(&self, event: StoreEvent) {
        // No receivers is fine.
        let _ = self.event_tx.send(event);
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}
