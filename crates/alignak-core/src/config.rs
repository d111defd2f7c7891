// ── Runtime connection configuration ──
//
// These types describe *how* to reach and poll an Alignak backend.
// They carry credential data and polling tuning, but never touch disk.
// The CLI constructs a `ControllerConfig` and hands it in.

use std::collections::HashMap;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::model::ResourceType;

/// How to authenticate with the backend.
#[derive(Debug, Clone)]
pub enum AuthCredentials {
    /// `POST /login` with username and password.
    Password {
        username: String,
        password: SecretString,
    },
    /// A token obtained earlier. `username`, when the profile names one,
    /// stands in for the session user until its record is loaded.
    Token {
        token: SecretString,
        username: Option<String>,
    },
}

impl AuthCredentials {
    /// The user name known before the first user fetch, if any. Token
    /// sessions only have one when the profile sets it.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Password { username, .. } => Some(username),
            Self::Token { username, .. } => username.as_deref(),
        }
    }
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

/// Timer and worker tuning for the polling scheduler.
#[derive(Debug, Clone)]
pub struct PollSchedule {
    /// Period of the scheduler timer. Each tick launches at most one fetch.
    pub tick_interval: Duration,
    /// Upper bound on a single fetch, retries included.
    pub fetch_timeout: Duration,
    /// How long shutdown waits for in-flight workers before aborting them.
    pub shutdown_grace: Duration,
    /// Minimum delay between two launches of the same type. A type polled
    /// too recently is skipped for the current round.
    pub min_intervals: HashMap<ResourceType, Duration>,
    /// Types the scheduler cycles through, in round-robin order.
    pub resources: Vec<ResourceType>,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            fetch_timeout: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(5),
            min_intervals: HashMap::new(),
            resources: ResourceType::all(),
        }
    }
}

impl PollSchedule {
    pub fn min_interval(&self, kind: ResourceType) -> Option<Duration> {
        self.min_intervals.get(&kind).copied()
    }
}

/// Configuration for connecting to a single backend.
///
/// Built by the CLI, passed to `Controller`. Core never reads config files.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Backend URL (e.g., `http://127.0.0.1:5000`).
    pub url: Url,
    pub auth: AuthCredentials,
    pub tls: TlsVerification,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Page size for collection fetches.
    pub page_size: u32,
    /// History entries kept per host.
    pub history_depth: u32,
    /// Notification entries read per fetch.
    pub notifications_depth: u32,
    pub schedule: PollSchedule,
}

impl ControllerConfig {
    pub fn new(url: Url, auth: AuthCredentials) -> Self {
        Self {
            url,
            auth,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            page_size: alignak_api::client::DEFAULT_PAGE_SIZE,
            history_depth: 25,
            notifications_depth: 30,
            schedule: PollSchedule::default(),
        }
    }
}
