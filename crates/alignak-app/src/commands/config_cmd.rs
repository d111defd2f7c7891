//! Config subcommand handlers.

use std::collections::HashMap;
use std::fmt::Write as _;

use dialoguer::{Input, Select};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Defaults, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "backend = \"{}\"", p.backend);
        if let Some(ref u) = p.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        if p.token.is_some() {
            let _ = writeln!(out, "token = \"****\"");
        }
        if let Some(ref env) = p.token_env {
            let _ = writeln!(out, "token_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        let poll = &p.polling;
        let _ = writeln!(
            out,
            "polling: every {}s, fetch timeout {}s, history depth {}, notifications depth {}",
            poll.tick_secs, poll.fetch_timeout_secs, poll.history_depth, poll.notifications_depth
        );
    }

    out.trim_end().to_owned()
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Offer to store a secret in the system keyring or return it for plaintext config.
///
/// Returns `Some(secret)` if the user chose plaintext, `None` if stored in keyring.
fn prompt_secret_storage(
    secret: &str,
    profile_name: &str,
    is_token: bool,
) -> Result<Option<String>, CliError> {
    let label = if is_token { "Token" } else { "Password" };
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt(format!("Where to store the {}?", label.to_lowercase()))
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        store_secret(profile_name, secret, is_token)?;
        eprintln!("   ✓ {label} stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(secret.to_owned()))
    }
}

fn store_secret(profile_name: &str, secret: &str, is_token: bool) -> Result<(), CliError> {
    if is_token {
        alignak_config::store_token(profile_name, secret)?;
    } else {
        alignak_config::store_password(profile_name, secret)?;
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),

        ConfigCommand::Show => {
            let cfg = config::load(global);
            let out = output::render_single(&global.output, &cfg, format_config_redacted, |_| {
                "config".into()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config::config_file(global).display());
            Ok(())
        }

        ConfigCommand::SetPassword { profile, token } => {
            let cfg = config::load(global);
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            if !cfg.profiles.contains_key(&profile_name) {
                let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
                available.sort();
                return Err(CliError::ProfileNotFound {
                    name: profile_name,
                    available: if available.is_empty() {
                        "(none)".into()
                    } else {
                        available.join(", ")
                    },
                });
            }

            let label = if token { "Token: " } else { "Password: " };
            let secret = rpassword::prompt_password(label).map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "secret".into(),
                    reason: "value cannot be empty".into(),
                });
            }
            store_secret(&profile_name, &secret, token)?;

            eprintln!("✓ Secret stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

/// Interactive wizard writing a single-profile config.
fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let config_path = config::config_file(global);
    eprintln!("Alignak-app configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let backend: String = Input::new()
        .with_prompt("Backend URL")
        .default("http://127.0.0.1:5000".into())
        .interact_text()
        .map_err(prompt_err)?;

    let username: String = Input::new()
        .with_prompt("Username")
        .default("admin".into())
        .interact_text()
        .map_err(prompt_err)?;

    let auth_choices = &["Password", "Session token"];
    let use_token = Select::new()
        .with_prompt("Authentication method")
        .items(auth_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?
        == 1;

    let label = if use_token { "Token: " } else { "Password: " };
    let secret = rpassword::prompt_password(label).map_err(prompt_err)?;
    if secret.is_empty() {
        return Err(CliError::Validation {
            field: "credentials".into(),
            reason: "secret cannot be empty".into(),
        });
    }
    let plaintext = prompt_secret_storage(&secret, &profile_name, use_token)?;
    let (password, token) = if use_token {
        (None, plaintext)
    } else {
        (plaintext, None)
    };

    let profile = Profile {
        backend,
        username: Some(username),
        password,
        token,
        ..Profile::default()
    };

    let mut profiles = HashMap::new();
    profiles.insert(profile_name.clone(), profile);

    let cfg = Config {
        default_profile: Some(profile_name.clone()),
        defaults: Defaults::default(),
        profiles,
    };

    alignak_config::save_config_to(&cfg, &config_path)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: alignak-app user");
    Ok(())
}
