// ── Store write path ──
//
// Only the controller's apply task (and the initial load that runs
// before it exists) calls these.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use super::DataStore;
use crate::model::{Resource, ResourceId, ResourceType, StoreEvent};

impl DataStore {
    /// Replace the `kind` collection with `records`.
    ///
    /// Readers see either the previous collection or this one. For
    /// notifications, records absent from the previous load are announced
    /// as [`StoreEvent::NewNotification`], except on the very first load.
    pub(crate) fn update_database(&self, kind: ResourceType, records: Vec<Resource>) {
        let collection = self.collection(kind);
        let previous = collection.replace(records);
        let current = collection.snapshot();

        debug!(%kind, count = current.len(), "collection replaced");

        if kind == ResourceType::Notification && previous.is_loaded() {
            // Announce oldest first; the backend sorts newest first.
            for record in current.iter().rev() {
                if previous.get(&record.id).is_none() {
                    self.emit(StoreEvent::NewNotification(Arc::clone(record)));
                }
            }
        }

        self.emit(StoreEvent::Refreshed {
            kind,
            count: current.len(),
        });
    }

    /// Patch one record with the fields of a successful write. Returns
    /// `false` if the record is not cached.
    pub(crate) fn update_item_fields(
        &self,
        kind: ResourceType,
        id: &ResourceId,
        fields: Map<String, Value>,
        etag: Option<String>,
    ) -> bool {
        match self.collection(kind).patch(id, fields, etag) {
            Some(_) => {
                debug!(%kind, %id, "record patched");
                self.emit(StoreEvent::ItemPatched {
                    kind,
                    id: id.clone(),
                });
                true
            }
            None => {
                debug!(%kind, %id, "patch for uncached record ignored");
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(kind: ResourceType, item: Value) -> Resource {
        Resource::from_item(kind, item).unwrap()
    }

    #[test]
    fn readers_observe_exactly_the_last_update() {
        let store = DataStore::new();
        let first = vec![record(ResourceType::Daemon, json!({ "_id": "d1", "name": "arbiter" }))];
        let second = vec![
            record(ResourceType::Daemon, json!({ "_id": "d2", "name": "poller" })),
            record(ResourceType::Daemon, json!({ "_id": "d3", "name": "broker" })),
        ];

        store.update_database(ResourceType::Daemon, first);
        store.update_database(ResourceType::Daemon, second.clone());

        let snap = store.snapshot(ResourceType::Daemon);
        let got: Vec<Resource> = snap.iter().map(|r| (**r).clone()).collect();
        assert_eq!(got, second);
        // Other types untouched.
        assert!(!store.is_loaded(ResourceType::Host));
    }

    #[test]
    fn new_notifications_are_announced_after_first_load() {
        let store = DataStore::new();
        let mut events = store.events();
        let notif = |id: &str| {
            record(
                ResourceType::Notification,
                json!({ "_id": id, "type": "monitoring.notification", "message": "x" }),
            )
        };

        store.update_database(ResourceType::Notification, vec![notif("n1")]);
        store.update_database(ResourceType::Notification, vec![notif("n2"), notif("n1")]);

        let mut announced = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let StoreEvent::NewNotification(r) = event {
                announced.push(r.id.to_string());
            }
        }
        assert_eq!(announced, vec!["n2"]);
    }

    #[test]
    fn new_notifications_are_announced_oldest_first() {
        let store = DataStore::new();
        let notif = |id: &str| {
            record(
                ResourceType::Notification,
                json!({ "_id": id, "type": "monitoring.notification", "message": "x" }),
            )
        };
        store.update_database(ResourceType::Notification, vec![notif("n1")]);

        let mut events = store.events();
        store.update_database(
            ResourceType::Notification,
            vec![notif("n4"), notif("n3"), notif("n2"), notif("n1")],
        );

        let mut announced = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let StoreEvent::NewNotification(r) = event {
                announced.push(r.id.to_string());
            }
        }
        assert_eq!(announced, vec!["n2", "n3", "n4"]);
    }

    #[test]
    fn patch_updates_cached_record() {
        let store = DataStore::new();
        store.update_database(
            ResourceType::Host,
            vec![record(
                ResourceType::Host,
                json!({ "_id": "h1", "_etag": "e1", "name": "web" }),
            )],
        );

        let mut fields = Map::new();
        fields.insert("notes".into(), json!("rack 4"));
        assert!(store.update_item_fields(
            ResourceType::Host,
            &ResourceId::from("h1"),
            fields,
            Some("e2".into()),
        ));

        let host = store
            .get_item(ResourceType::Host, "_id", "h1")
            .unwrap();
        assert_eq!(host.str_field("notes"), Some("rack 4"));
        assert_eq!(host.etag.as_deref(), Some("e2"));

        assert!(!store.update_item_fields(
            ResourceType::Host,
            &ResourceId::from("nope"),
            Map::new(),
            None,
        ));
    }
}
