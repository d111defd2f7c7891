//! Configuration for alignak-app.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `alignak_core::ControllerConfig`. The CLI adds
//! flag-aware wrappers on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use alignak_core::{AuthCredentials, ControllerConfig, PollSchedule, ResourceType, TlsVerification};

/// Keyring service holding saved passwords and tokens.
pub const KEYRING_SERVICE: &str = "alignak-app";

/// Prefix of environment overrides (`ALIGNAK_APP_DEFAULTS__TIMEOUT=10`).
pub const ENV_PREFIX: &str = "ALIGNAK_APP_";

/// Environment variable read for the password before the keyring.
pub const PASSWORD_ENV: &str = "ALIGNAK_APP_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Pick the profile named `requested`, else the default profile.
    pub fn profile(&self, requested: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = requested
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|p| (name.to_owned(), p))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named backend profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Backend base URL (e.g., "http://127.0.0.1:5000").
    pub backend: String,

    /// Login name. Also used to filter notifications.
    pub username: Option<String>,

    /// Password (plaintext: prefer keyring or env var).
    pub password: Option<String>,

    /// Session token (plaintext: prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the token.
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,

    #[serde(default)]
    pub polling: PollingSection,
}

/// `[profiles.<name>.polling]`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingSection {
    /// Scheduler period in seconds. `0` disables polling.
    #[serde(default = "default_tick")]
    pub tick_secs: u64,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,

    #[serde(default = "default_history_depth")]
    pub history_depth: u32,

    #[serde(default = "default_notifications_depth")]
    pub notifications_depth: u32,

    /// Minimum seconds between two fetches of a type, keyed by type name
    /// (`livesynthesis = 10`).
    #[serde(default)]
    pub intervals: HashMap<String, u64>,

    /// Types to poll. All of them when unset.
    #[serde(default)]
    pub resources: Option<Vec<String>>,
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            tick_secs: default_tick(),
            fetch_timeout_secs: default_fetch_timeout(),
            shutdown_grace_secs: default_shutdown_grace(),
            history_depth: default_history_depth(),
            notifications_depth: default_notifications_depth(),
            intervals: HashMap::new(),
            resources: None,
        }
    }
}

fn default_tick() -> u64 {
    1
}
fn default_fetch_timeout() -> u64 {
    30
}
fn default_shutdown_grace() -> u64 {
    5
}
fn default_history_depth() -> u32 {
    25
}
fn default_notifications_depth() -> u32 {
    30
}

impl PollingSection {
    /// Translate into a scheduler configuration, validating type names.
    pub fn to_schedule(&self) -> Result<PollSchedule, ConfigError> {
        let resources = match &self.resources {
            Some(names) => names
                .iter()
                .map(|n| parse_resource(n, "polling.resources"))
                .collect::<Result<Vec<_>, _>>()?,
            None => ResourceType::all(),
        };

        let min_intervals = self
            .intervals
            .iter()
            .map(|(name, secs)| {
                parse_resource(name, "polling.intervals").map(|k| (k, Duration::from_secs(*secs)))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(PollSchedule {
            tick_interval: Duration::from_secs(self.tick_secs),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs.max(1)),
            shutdown_grace: Duration::from_secs(self.shutdown_grace_secs),
            min_intervals,
            resources,
        })
    }
}

fn parse_resource(name: &str, field: &str) -> Result<ResourceType, ConfigError> {
    name.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("unknown resource type '{name}'"),
    })
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "alignak", "alignak-app")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory for log files written by `start`.
pub fn log_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("logs"),
        |dirs| dirs.data_local_dir().join("logs"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("alignak-app");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment.
///
/// Later sources win: built-in defaults, then the file, then
/// `ALIGNAK_APP_*` variables (`__` separates nested keys).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Keyring ─────────────────────────────────────────────────────────

fn keyring_entry(profile_name: &str, secret: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/{secret}"),
    )?)
}

fn keyring_lookup(profile_name: &str, secret: &str) -> Option<SecretString> {
    keyring_entry(profile_name, secret)
        .ok()?
        .get_password()
        .ok()
        .map(SecretString::from)
}

/// Store a password in the system keyring for `profile_name`.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name, "password")?.set_password(password)?;
    Ok(())
}

/// Store a token in the system keyring for `profile_name`.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name, "token")?.set_password(token)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve a token from the credential chain: `token_env`, keyring,
/// plaintext. `None` when the profile has no token anywhere.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Some(token) = keyring_lookup(profile_name, "token") {
        return Some(token);
    }

    // 3. Plaintext in config
    profile.token.clone().map(SecretString::from)
}

/// Resolve username + password: `ALIGNAK_APP_PASSWORD`, keyring, plaintext.
pub fn resolve_password_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<(String, SecretString), ConfigError> {
    let username = profile
        .username
        .clone()
        .or_else(|| std::env::var("ALIGNAK_APP_USERNAME").ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;

    // 1. Env var
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok((username, SecretString::from(pw)));
    }

    // 2. Keyring
    if let Some(pw) = keyring_lookup(profile_name, "password") {
        return Ok((username, pw));
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok((username, SecretString::from(pw.clone())));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Resolve `AuthCredentials` for a profile. A token, wherever it is
/// found, wins over a password.
pub fn resolve_auth(profile: &Profile, profile_name: &str) -> Result<AuthCredentials, ConfigError> {
    if let Some(token) = resolve_token(profile, profile_name) {
        return Ok(AuthCredentials::Token {
            token,
            username: profile.username.clone(),
        });
    }
    let (username, password) = resolve_password_credentials(profile, profile_name)?;
    Ok(AuthCredentials::Password { username, password })
}

/// Build a `ControllerConfig` from a profile, without CLI flag overrides.
pub fn profile_to_controller_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    let auth = resolve_auth(profile, profile_name)?;
    build_controller_config(profile, auth, defaults)
}

/// Build a `ControllerConfig` from a profile with already-resolved auth.
pub fn build_controller_config(
    profile: &Profile,
    auth: AuthCredentials,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    let url: url::Url = profile
        .backend
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "backend".into(),
            reason: format!("invalid URL: {}", profile.backend),
        })?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let mut config = ControllerConfig::new(url, auth);
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.history_depth = profile.polling.history_depth;
    config.notifications_depth = profile.polling.notifications_depth;
    config.schedule = profile.polling.to_schedule()?;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    const SAMPLE: &str = r#"
default_profile = "lab"

[defaults]
output = "json"
timeout = 10

[profiles.lab]
backend = "http://127.0.0.1:5000"
username = "admin"
password = "admin"

[profiles.lab.polling]
tick_secs = 2
history_depth = 5

[profiles.lab.polling.intervals]
livesynthesis = 10

[profiles.prod]
backend = "https://alignak.example.org"
token = "abc"
ca_cert = "/etc/ssl/alignak.pem"
"#;

    fn load_sample() -> Config {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        load_config_from(&path).unwrap()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.output, "table");
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn file_overrides_defaults() {
        let cfg = load_sample();
        assert_eq!(cfg.defaults.output, "json");
        assert_eq!(cfg.defaults.color, "auto");

        let (name, lab) = cfg.profile(None).unwrap();
        assert_eq!(name, "lab");
        assert_eq!(lab.polling.tick_secs, 2);
        assert_eq!(lab.polling.fetch_timeout_secs, 30);

        assert!(matches!(
            cfg.profile(Some("nope")),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn profile_translates_to_controller_config() {
        let cfg = load_sample();
        let (name, lab) = cfg.profile(Some("lab")).unwrap();
        let cc = profile_to_controller_config(lab, &name, &cfg.defaults).unwrap();

        assert_eq!(cc.url.as_str(), "http://127.0.0.1:5000/");
        assert_eq!(cc.timeout, Duration::from_secs(10));
        assert_eq!(cc.history_depth, 5);
        assert_eq!(cc.tls, TlsVerification::SystemDefaults);
        assert_eq!(cc.schedule.tick_interval, Duration::from_secs(2));
        assert_eq!(
            cc.schedule.min_interval(ResourceType::LiveSynthesis),
            Some(Duration::from_secs(10))
        );
        assert_eq!(cc.schedule.resources, ResourceType::all());
        assert!(matches!(cc.auth, AuthCredentials::Password { .. }));
    }

    #[test]
    fn plaintext_token_wins_over_password() {
        let cfg = load_sample();
        let (name, prod) = cfg.profile(Some("prod")).unwrap();
        match resolve_auth(prod, &name).unwrap() {
            AuthCredentials::Token { token, .. } => assert_eq!(token.expose_secret(), "abc"),
            other @ AuthCredentials::Password { .. } => panic!("expected token, got {other:?}"),
        }

        let cc = profile_to_controller_config(prod, &name, &cfg.defaults).unwrap();
        assert_eq!(
            cc.tls,
            TlsVerification::CustomCa(PathBuf::from("/etc/ssl/alignak.pem"))
        );
    }

    #[test]
    fn unknown_resource_names_are_rejected() {
        let polling = PollingSection {
            resources: Some(vec!["host".into(), "widget".into()]),
            ..PollingSection::default()
        };
        assert!(matches!(
            polling.to_schedule(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn profile_without_credentials_fails() {
        let profile = Profile {
            backend: "http://b".into(),
            ..Profile::default()
        };
        assert!(matches!(
            resolve_password_credentials(&profile, "empty-test-profile"),
            Err(ConfigError::NoCredentials { .. })
        ));
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                backend: "http://127.0.0.1:5000".into(),
                username: Some("admin".into()),
                ..Profile::default()
            },
        );

        save_config_to(&cfg, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        let (_, profile) = loaded.profile(None).unwrap();
        assert_eq!(profile.username.as_deref(), Some("admin"));
    }
}
