// ── Per-type resource collection ──
//
// Whole-collection snapshots published through a `watch` channel.
// Writers build a new snapshot and swap it in; readers hold an `Arc`
// to whichever version they loaded and never observe a partial update.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::model::{Resource, ResourceId, ResourceType};

/// Immutable view of one collection at a point in time.
#[derive(Debug, Clone)]
pub struct CollectionSnapshot {
    pub kind: ResourceType,
    /// Records keyed by id, in backend order.
    pub items: IndexMap<ResourceId, Arc<Resource>>,
    /// When the collection was last replaced. `None` until the first load.
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Bumped on every replace or patch.
    pub version: u64,
}

impl CollectionSnapshot {
    fn empty(kind: ResourceType) -> Self {
        Self {
            kind,
            items: IndexMap::new(),
            refreshed_at: None,
            version: 0,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.refreshed_at.is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Arc<Resource>> {
        self.items.get(id)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Arc<Resource>> + ExactSizeIterator {
        self.items.values()
    }

    pub fn first(&self) -> Option<&Arc<Resource>> {
        self.items.first().map(|(_, r)| r)
    }
}

pub(crate) struct ResourceCollection {
    kind: ResourceType,
    snapshot: watch::Sender<Arc<CollectionSnapshot>>,
}

impl ResourceCollection {
    pub(crate) fn new(kind: ResourceType) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(CollectionSnapshot::empty(kind)));
        Self { kind, snapshot }
    }

    /// Swap in a new set of records and return the snapshot it replaced.
    ///
    /// Duplicate ids keep the first occurrence. Single-record types keep
    /// only the first record.
    pub(crate) fn replace(&self, records: Vec<Resource>) -> Arc<CollectionSnapshot> {
        let limit = if self.kind.is_single() { 1 } else { usize::MAX };
        let mut items = IndexMap::with_capacity(records.len().min(limit));
        for record in records {
            if items.len() >= limit {
                break;
            }
            items.entry(record.id.clone()).or_insert_with(|| Arc::new(record));
        }

        let previous = self.snapshot();
        let next = CollectionSnapshot {
            kind: self.kind,
            items,
            refreshed_at: Some(Utc::now()),
            version: previous.version + 1,
        };
        // `send_replace` updates unconditionally, even with zero receivers.
        self.snapshot.send_replace(Arc::new(next));
        previous
    }

    /// Merge `fields` into one record. Returns the updated record, or
    /// `None` if the id is not cached.
    pub(crate) fn patch(
        &self,
        id: &ResourceId,
        fields: Map<String, Value>,
        etag: Option<String>,
    ) -> Option<Arc<Resource>> {
        let current = self.snapshot();
        let existing = current.get(id)?;

        let mut record = (**existing).clone();
        record.apply_patch(fields, etag);
        let record = Arc::new(record);

        let mut next = (*current).clone();
        next.items.insert(id.clone(), Arc::clone(&record));
        next.version += 1;
        self.snapshot.send_replace(Arc::new(next));
        Some(record)
    }

    pub(crate) fn snapshot(&self) -> Arc<CollectionSnapshot> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<CollectionSnapshot>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.snapshot.borrow().refreshed_at
    }
}
