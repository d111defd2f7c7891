// ── Derived views ──
//
// Value types returned by the store's read-side queries.

use std::sync::Arc;

use serde::Serialize;

use super::resource::Resource;

/// Unhandled failing hosts and services.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Problems {
    pub hosts_nb: usize,
    pub services_nb: usize,
    /// Hosts first, then services, each in store order.
    pub problems: Vec<Arc<Resource>>,
}

/// A host and the services attached to it.
#[derive(Debug, Clone, Serialize)]
pub struct HostWithServices {
    pub host: Arc<Resource>,
    pub services: Vec<Arc<Resource>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ItemCounts {
    pub total: usize,
    pub problems: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ItemsAndProblems {
    pub hosts: ItemCounts,
    pub services: ItemCounts,
}

/// Host counters summed over every realm's live synthesis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HostCounts {
    pub total: u64,
    pub not_monitored: u64,
    pub up: u64,
    pub down: u64,
    pub unreachable: u64,
    pub acknowledged: u64,
    pub in_downtime: u64,
    pub flapping: u64,
}

/// Service counters summed over every realm's live synthesis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServiceCounts {
    pub total: u64,
    pub not_monitored: u64,
    pub ok: u64,
    pub warning: u64,
    pub critical: u64,
    pub unknown: u64,
    pub unreachable: u64,
    pub acknowledged: u64,
    pub in_downtime: u64,
    pub flapping: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SynthesisCount {
    pub hosts: HostCounts,
    pub services: ServiceCounts,
}

impl SynthesisCount {
    /// Add one live-synthesis record. Hard and soft counters are merged.
    pub(crate) fn add(&mut self, record: &Resource) {
        let n = |key: &str| record.u64_field(key).unwrap_or(0);
        let hs = |state: &str| n(&format!("hosts_{state}_hard")) + n(&format!("hosts_{state}_soft"));
        let ss = |state: &str| {
            n(&format!("services_{state}_hard")) + n(&format!("services_{state}_soft"))
        };

        let h = &mut self.hosts;
        h.total += n("hosts_total");
        h.not_monitored += n("hosts_not_monitored");
        h.up += hs("up");
        h.down += hs("down");
        h.unreachable += hs("unreachable");
        h.acknowledged += n("hosts_acknowledged");
        h.in_downtime += n("hosts_in_downtime");
        h.flapping += n("hosts_flapping");

        let s = &mut self.services;
        s.total += n("services_total");
        s.not_monitored += n("services_not_monitored");
        s.ok += ss("ok");
        s.warning += ss("warning");
        s.critical += ss("critical");
        s.unknown += ss("unknown");
        s.unreachable += ss("unreachable");
        s.acknowledged += n("services_acknowledged");
        s.in_downtime += n("services_in_downtime");
        s.flapping += n("services_flapping");
    }
}
