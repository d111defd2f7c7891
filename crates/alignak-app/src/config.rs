//! CLI configuration: thin wrapper around `alignak_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--backend, --username, --token, --insecure, --timeout).

use std::path::PathBuf;

use secrecy::SecretString;

use alignak_core::{AuthCredentials, ControllerConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use alignak_config::{Config, Defaults, Profile};

/// The config file in use: `--config` or the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(alignak_config::config_path)
}

/// Load the config file, falling back to defaults when it is unreadable.
pub fn load(global: &GlobalOpts) -> Config {
    alignak_config::load_config_from(&config_file(global)).unwrap_or_default()
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `ControllerConfig` from the config file, profile, and CLI overrides.
pub fn resolve_controller_config(global: &GlobalOpts) -> Result<ControllerConfig, CliError> {
    let path = config_file(global);
    let cfg = alignak_config::load_config_from(&path)?;
    let profile_name = active_profile_name(global, &cfg);

    // Without a profile, flags (or env vars) must name the backend.
    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(p) => p.clone(),
        None if global.backend.is_some() => Profile::default(),
        None if global.profile.is_some() => {
            let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
            names.sort();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: path.display().to_string(),
            });
        }
    };

    apply_overrides(&mut profile, global);

    let auth = match global.token {
        Some(ref token) => AuthCredentials::Token {
            token: SecretString::from(token.clone()),
            username: profile.username.clone(),
        },
        None => alignak_config::resolve_auth(&profile, &profile_name)?,
    };

    Ok(alignak_config::build_controller_config(
        &profile,
        auth,
        &cfg.defaults,
    )?)
}

/// CLI flags win over profile values.
fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref backend) = global.backend {
        profile.backend.clone_from(backend);
    }
    if let Some(ref username) = global.username {
        profile.username = Some(username.clone());
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
}
