// ── Resource types ──
//
// Closed set of monitoring data categories. Each variant carries the
// query that fetches it, so the scheduler iterates the enum instead of
// matching on names.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// A category of monitoring data fetched and cached independently.
///
/// Declaration order is the scheduling and initial-load order: a type
/// only depends on types declared before it (History needs Hosts).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ResourceType {
    User,
    Realm,
    Timeperiod,
    Host,
    Service,
    Daemon,
    LiveSynthesis,
    History,
    Notification,
}

const USER_FIELDS: &[&str] = &[
    "name",
    "alias",
    "_realm",
    "is_admin",
    "can_submit_commands",
    "email",
    "notes",
    "host_notifications_enabled",
    "service_notifications_enabled",
    "host_notification_period",
    "service_notification_period",
    "host_notification_options",
    "service_notification_options",
];

const REALM_FIELDS: &[&str] = &["name", "alias", "_level", "_parent"];

const TIMEPERIOD_FIELDS: &[&str] = &["name", "alias", "is_active", "dateranges"];

const HOST_FIELDS: &[&str] = &[
    "name",
    "alias",
    "address",
    "notes",
    "business_impact",
    "_realm",
    "_overall_state_id",
    "parents",
    "active_checks_enabled",
    "passive_checks_enabled",
    "notifications_enabled",
    "check_interval",
    "ls_state",
    "ls_state_type",
    "ls_acknowledged",
    "ls_downtimed",
    "ls_output",
    "ls_long_output",
    "ls_perf_data",
    "ls_last_check",
    "ls_last_state_changed",
    "ls_next_check",
];

const SERVICE_FIELDS: &[&str] = &[
    "name",
    "alias",
    "display_name",
    "host",
    "notes",
    "business_impact",
    "aggregation",
    "_realm",
    "_overall_state_id",
    "active_checks_enabled",
    "passive_checks_enabled",
    "notifications_enabled",
    "check_interval",
    "ls_state",
    "ls_state_type",
    "ls_acknowledged",
    "ls_downtimed",
    "ls_output",
    "ls_long_output",
    "ls_perf_data",
    "ls_last_check",
    "ls_last_state_changed",
    "ls_next_check",
];

const DAEMON_FIELDS: &[&str] = &[
    "name",
    "type",
    "alive",
    "reachable",
    "spare",
    "passive",
    "address",
    "port",
    "last_check",
    "_realm",
];

const LIVESYNTHESIS_FIELDS: &[&str] = &[
    "_realm",
    "hosts_total",
    "hosts_not_monitored",
    "hosts_up_hard",
    "hosts_up_soft",
    "hosts_down_hard",
    "hosts_down_soft",
    "hosts_unreachable_hard",
    "hosts_unreachable_soft",
    "hosts_acknowledged",
    "hosts_in_downtime",
    "hosts_flapping",
    "services_total",
    "services_not_monitored",
    "services_ok_hard",
    "services_ok_soft",
    "services_warning_hard",
    "services_warning_soft",
    "services_critical_hard",
    "services_critical_soft",
    "services_unknown_hard",
    "services_unknown_soft",
    "services_unreachable_hard",
    "services_unreachable_soft",
    "services_acknowledged",
    "services_in_downtime",
    "services_flapping",
];

const HISTORY_FIELDS: &[&str] = &[
    "host",
    "host_name",
    "service",
    "service_name",
    "user",
    "user_name",
    "type",
    "message",
    "logcheckresult",
    "_created",
];

impl ResourceType {
    /// Every type, in scheduling order.
    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }

    /// REST collection holding this type.
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Realm => "realm",
            Self::Timeperiod => "timeperiod",
            Self::Host => "host",
            Self::Service => "service",
            Self::Daemon => "alignakdaemon",
            Self::LiveSynthesis => "livesynthesis",
            Self::History | Self::Notification => "history",
        }
    }

    /// The filter sent as `where`. History adds a per-host clause on top.
    pub fn default_filter(self) -> Option<Value> {
        match self {
            Self::Host | Self::Service => Some(json!({ "_is_template": false })),
            Self::Notification => Some(json!({ "type": "monitoring.notification" })),
            Self::User
            | Self::Realm
            | Self::Timeperiod
            | Self::Daemon
            | Self::LiveSynthesis
            | Self::History => None,
        }
    }

    /// Fields requested through `projection`.
    pub fn projection(self) -> &'static [&'static str] {
        match self {
            Self::User => USER_FIELDS,
            Self::Realm => REALM_FIELDS,
            Self::Timeperiod => TIMEPERIOD_FIELDS,
            Self::Host => HOST_FIELDS,
            Self::Service => SERVICE_FIELDS,
            Self::Daemon => DAEMON_FIELDS,
            Self::LiveSynthesis => LIVESYNTHESIS_FIELDS,
            Self::History | Self::Notification => HISTORY_FIELDS,
        }
    }

    /// `sort` parameter (newest first for event-like collections).
    pub fn sort(self) -> Option<&'static str> {
        match self {
            Self::History | Self::Notification => Some("-_id"),
            _ => None,
        }
    }

    /// Whether the fetch walks every page. Event-like collections read a
    /// single bounded page instead.
    pub fn fetches_all_pages(self) -> bool {
        !matches!(self, Self::User | Self::History | Self::Notification)
    }

    /// The store keeps one record instead of a collection.
    pub fn is_single(self) -> bool {
        self == Self::User
    }

    /// Type that must be loaded before this one can be fetched.
    pub fn depends_on(self) -> Option<Self> {
        match self {
            Self::History => Some(Self::Host),
            _ => None,
        }
    }

    /// Name of the field used as a record's display name.
    pub(crate) fn name_field(self) -> &'static str {
        match self {
            Self::LiveSynthesis => "_realm",
            Self::History | Self::Notification => "type",
            _ => "name",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn declaration_order_puts_dependencies_first() {
        let all = ResourceType::all();
        for kind in &all {
            if let Some(dep) = kind.depends_on() {
                let dep_pos = all.iter().position(|k| *k == dep).unwrap();
                let pos = all.iter().position(|k| k == kind).unwrap();
                assert!(dep_pos < pos, "{dep} must come before {kind}");
            }
        }
    }

    #[test]
    fn names_round_trip_through_strings() {
        assert_eq!(ResourceType::LiveSynthesis.to_string(), "livesynthesis");
        assert_eq!(
            "Daemon".parse::<ResourceType>().unwrap(),
            ResourceType::Daemon
        );
        assert!("widget".parse::<ResourceType>().is_err());
    }

    #[test]
    fn notifications_read_history_endpoint() {
        assert_eq!(ResourceType::Notification.endpoint(), "history");
        assert!(!ResourceType::Notification.fetches_all_pages());
        assert!(ResourceType::Host.fetches_all_pages());
    }
}
