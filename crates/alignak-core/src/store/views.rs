// ── Read-side queries ──
//
// Derived views over the current snapshots. "Not found" is `None` or an
// empty `Vec`, never an error.

use std::sync::Arc;

use serde_json::Value;

use super::DataStore;
use crate::model::{
    HostWithServices, ItemCounts, ItemsAndProblems, Problems, Resource, ResourceType,
    SynthesisCount,
};

impl DataStore {
    /// First record of `kind` whose `key_field` equals `key_value`.
    ///
    /// `_id` and `name` match the record id and name; any other key is
    /// compared against the field's textual value.
    pub fn get_item(
        &self,
        kind: ResourceType,
        key_field: &str,
        key_value: &str,
    ) -> Option<Arc<Resource>> {
        let snap = self.snapshot(kind);
        snap.iter()
            .find(|r| match key_field {
                "_id" => r.id.as_str() == key_value,
                "name" => r.name == key_value,
                field => r.field(field).is_some_and(|v| text_equals(v, key_value)),
            })
            .cloned()
    }

    /// The session user record, once loaded.
    pub fn user(&self) -> Option<Arc<Resource>> {
        self.user.snapshot().first().cloned()
    }

    /// A host, looked up by id then by name, with its services.
    pub fn get_host_with_services(&self, host_id_or_name: &str) -> Option<HostWithServices> {
        let host = self
            .get_item(ResourceType::Host, "_id", host_id_or_name)
            .or_else(|| self.get_item(ResourceType::Host, "name", host_id_or_name))?;
        let services = self.get_host_services(host.id.as_str());
        Some(HostWithServices { host, services })
    }

    /// Services whose `host` field equals `host_id`.
    pub fn get_host_services(&self, host_id: &str) -> Vec<Arc<Resource>> {
        self.services
            .snapshot()
            .iter()
            .filter(|s| s.host_id() == Some(host_id))
            .cloned()
            .collect()
    }

    /// History entries of one host, newest first.
    pub fn get_host_history(&self, host_id: &str) -> Vec<Arc<Resource>> {
        self.history
            .snapshot()
            .iter()
            .filter(|h| h.host_id() == Some(host_id))
            .cloned()
            .collect()
    }

    pub fn get_all_hostnames(&self) -> Vec<String> {
        self.hosts.snapshot().iter().map(|h| h.name.clone()).collect()
    }

    pub fn notifications(&self) -> Vec<Arc<Resource>> {
        self.notifications.snapshot().iter().cloned().collect()
    }

    /// Hosts and services that fail and are neither acknowledged nor in
    /// downtime.
    pub fn get_problems(&self) -> Problems {
        let hosts: Vec<Arc<Resource>> = self
            .hosts
            .snapshot()
            .iter()
            .filter(|r| r.is_problem())
            .cloned()
            .collect();
        let services: Vec<Arc<Resource>> = self
            .services
            .snapshot()
            .iter()
            .filter(|r| r.is_problem())
            .cloned()
            .collect();

        let hosts_nb = hosts.len();
        let services_nb = services.len();
        let mut problems = hosts;
        problems.extend(services);

        Problems {
            hosts_nb,
            services_nb,
            problems,
        }
    }

    pub fn get_items_and_problems(&self) -> ItemsAndProblems {
        let count = |kind: ResourceType| {
            let snap = self.snapshot(kind);
            ItemCounts {
                total: snap.len(),
                problems: snap.iter().filter(|r| r.is_problem()).count(),
            }
        };
        ItemsAndProblems {
            hosts: count(ResourceType::Host),
            services: count(ResourceType::Service),
        }
    }

    /// Display name of a realm: its alias when set, else its name.
    pub fn get_realm_name(&self, realm_id: &str) -> Option<String> {
        self.get_item(ResourceType::Realm, "_id", realm_id)
            .map(|r| display_name(&r))
    }

    /// Display name of a timeperiod: its alias when set, else its name.
    pub fn get_period_name(&self, period_id: &str) -> Option<String> {
        self.get_item(ResourceType::Timeperiod, "_id", period_id)
            .map(|r| display_name(&r))
    }

    /// Live-synthesis counters summed over every realm.
    pub fn synthesis_count(&self) -> SynthesisCount {
        let mut count = SynthesisCount::default();
        for record in self.livesynthesis.snapshot().iter() {
            count.add(record);
        }
        count
    }

    /// `(alive, total)` daemon counts.
    pub fn daemons_status(&self) -> (usize, usize) {
        let snap = self.daemons.snapshot();
        let alive = snap.iter().filter(|d| d.bool_field("alive")).count();
        (alive, snap.len())
    }
}

fn display_name(record: &Resource) -> String {
    record
        .str_field("alias")
        .filter(|a| !a.is_empty())
        .unwrap_or(record.name.as_str())
        .to_owned()
}

fn text_equals(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Null => false,
        other => other.to_string() == expected,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn load(store: &DataStore, kind: ResourceType, items: Value) {
        let Value::Array(items) = items else {
            panic!("expected array")
        };
        let records = items
            .into_iter()
            .filter_map(|i| Resource::from_item(kind, i))
            .collect();
        store.update_database(kind, records);
    }

    fn sample_store() -> DataStore {
        let store = DataStore::new();
        load(
            &store,
            ResourceType::Host,
            json!([
                { "_id": "h1", "name": "web", "ls_state": "UP" },
                { "_id": "h2", "name": "db", "ls_state": "DOWN" },
                { "_id": "h3", "name": "mail", "ls_state": "DOWN", "ls_acknowledged": true },
                { "_id": "h4", "name": "dns", "ls_state": "UNREACHABLE", "ls_downtimed": true },
            ]),
        );
        load(
            &store,
            ResourceType::Service,
            json!([
                { "_id": "s1", "name": "http", "host": "h1", "ls_state": "OK" },
                { "_id": "s2", "name": "disk", "host": "h1", "ls_state": "CRITICAL" },
                { "_id": "s3", "name": "pgsql", "host": "h2", "ls_state": "WARNING",
                  "ls_downtimed": true },
                { "_id": "s4", "name": "load", "host": "h2", "ls_state": "PENDING" },
                { "_id": "s5", "name": "smtp", "host": "h3", "ls_state": "UNKNOWN" },
            ]),
        );
        store
    }

    fn ids(records: &[Arc<Resource>]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn host_with_services_has_exactly_its_services() {
        let store = sample_store();

        let by_id = store.get_host_with_services("h1").unwrap();
        assert_eq!(by_id.host.name, "web");
        assert_eq!(ids(&by_id.services), vec!["s1", "s2"]);

        let by_name = store.get_host_with_services("db").unwrap();
        assert_eq!(ids(&by_name.services), vec!["s3", "s4"]);

        assert!(store.get_host_with_services("nope").is_none());
    }

    #[test]
    fn problems_are_unhandled_failures_only() {
        let store = sample_store();
        let problems = store.get_problems();

        assert_eq!(problems.hosts_nb, 1);
        assert_eq!(problems.services_nb, 2);
        assert_eq!(ids(&problems.problems), vec!["h2", "s2", "s5"]);
    }

    #[test]
    fn records_without_state_are_not_problems() {
        let store = DataStore::new();
        load(
            &store,
            ResourceType::Service,
            json!([{ "_id": "s1", "name": "http", "host": "h1" }]),
        );
        load(&store, ResourceType::Host, json!([{ "_id": "h1", "name": "web" }]));

        let problems = store.get_problems();
        assert_eq!((problems.hosts_nb, problems.services_nb), (0, 0));
        assert_eq!(store.get_items_and_problems().services.problems, 0);
    }

    #[test]
    fn items_and_problems_counts() {
        let store = sample_store();
        let counts = store.get_items_and_problems();
        assert_eq!(counts.hosts, ItemCounts { total: 4, problems: 1 });
        assert_eq!(counts.services, ItemCounts { total: 5, problems: 2 });
    }

    #[test]
    fn get_item_matches_field_text() {
        let store = sample_store();
        assert_eq!(
            store
                .get_item(ResourceType::Service, "ls_state", "CRITICAL")
                .unwrap()
                .id
                .as_str(),
            "s2"
        );
        assert_eq!(
            store
                .get_item(ResourceType::Host, "ls_acknowledged", "true")
                .unwrap()
                .name,
            "mail"
        );
        assert!(store.get_item(ResourceType::Host, "name", "ghost").is_none());
    }

    #[test]
    fn empty_store_answers_empty() {
        let store = DataStore::new();
        assert!(store.get_all_hostnames().is_empty());
        assert_eq!(store.get_problems().problems.len(), 0);
        assert!(store.user().is_none());
        assert_eq!(store.daemons_status(), (0, 0));
        assert!(!store.is_ready());
    }

    #[test]
    fn synthesis_sums_realms_and_merges_hard_soft() {
        let store = DataStore::new();
        load(
            &store,
            ResourceType::LiveSynthesis,
            json!([
                { "_id": "ls1", "_realm": "r1", "hosts_total": 3, "hosts_up_hard": 2,
                  "hosts_down_soft": 1, "services_total": 4, "services_critical_hard": 1 },
                { "_id": "ls2", "_realm": "r2", "hosts_total": 1, "hosts_up_soft": 1,
                  "services_total": 2, "services_critical_soft": 2 },
            ]),
        );

        let count = store.synthesis_count();
        assert_eq!(count.hosts.total, 4);
        assert_eq!(count.hosts.up, 3);
        assert_eq!(count.hosts.down, 1);
        assert_eq!(count.services.total, 6);
        assert_eq!(count.services.critical, 3);
    }

    #[test]
    fn realm_and_period_names_prefer_alias() {
        let store = DataStore::new();
        load(
            &store,
            ResourceType::Realm,
            json!([{ "_id": "r1", "name": "All", "alias": "Everything" }]),
        );
        load(
            &store,
            ResourceType::Timeperiod,
            json!([{ "_id": "t1", "name": "24x7", "alias": "" }]),
        );
        assert_eq!(store.get_realm_name("r1").as_deref(), Some("Everything"));
        assert_eq!(store.get_period_name("t1").as_deref(), Some("24x7"));
        assert!(store.get_realm_name("r9").is_none());
    }

    #[test]
    fn daemons_status_counts_alive() {
        let store = DataStore::new();
        load(
            &store,
            ResourceType::Daemon,
            json!([
                { "_id": "d1", "name": "arbiter-master", "alive": true },
                { "_id": "d2", "name": "poller-master", "alive": false },
            ]),
        );
        assert_eq!(store.daemons_status(), (1, 2));
    }
}
