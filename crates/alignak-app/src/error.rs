//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use alignak_config::ConfigError;
use alignak_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to backend at {url}")]
    #[diagnostic(
        code(alignak::connection_failed),
        help(
            "Check that the Alignak backend is running and accessible.\n\
             URL: {url}\n\
             Try: alignak-app user --insecure"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Backend unreachable: {reason}")]
    #[diagnostic(
        code(alignak::unreachable),
        help("The request was retried once. Check the backend and network, then try again.")
    )]
    Unreachable { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(alignak::auth_failed),
        help(
            "Verify your username and password, or your token.\n\
             Run: alignak-app config set-password"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(alignak::no_credentials),
        help(
            "Configure credentials with: alignak-app config init\n\
             Or set ALIGNAK_APP_PASSWORD / ALIGNAK_APP_TOKEN."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(alignak::not_found),
        help("Run: alignak-app {list_command} to see what is monitored")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{message}")]
    #[diagnostic(
        code(alignak::conflict),
        help("The record changed on the backend since it was read. Run the command again.")
    )]
    Conflict { message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Backend error ({code}): {message}")]
    #[diagnostic(code(alignak::api_error))]
    ApiError { code: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(alignak::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(alignak::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: alignak-app config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(alignak::no_config),
        help(
            "Create one with: alignak-app config init\n\
             Or pass --backend. Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(alignak::config))]
    Config(Box<ConfigError>),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("{operation} timed out after {seconds}s")]
    #[diagnostic(
        code(alignak::timeout),
        help("Increase timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { operation: String, seconds: u64 },

    // ── Platform ─────────────────────────────────────────────────────
    #[error("'{feature}' is not supported on {os}")]
    #[diagnostic(
        code(alignak::unsupported),
        help("Run `alignak-app start` from your own service manager instead.")
    )]
    Unsupported { feature: String, os: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(alignak::render))]
    Render(String),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::UnknownProfile { name } => Self::ProfileNotFound {
                name,
                available: "(see alignak-app config show)".into(),
            },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Unreachable { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::BackendUnreachable { endpoint, reason } => CliError::Unreachable {
                reason: format!("{endpoint}: {reason}"),
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::ControllerDisconnected => CliError::ConnectionFailed {
                url: "(disconnected)".into(),
                reason: "backend session was closed".into(),
            },

            CoreError::Timeout {
                operation,
                timeout_secs,
            } => CliError::Timeout {
                operation,
                seconds: timeout_secs,
            },

            CoreError::NotFound {
                resource_type,
                identifier,
            } => CliError::NotFound {
                list_command: list_command_for(&resource_type).into(),
                resource_type,
                identifier,
            },

            CoreError::NotReady { resource, waiting_for } => CliError::ApiError {
                code: "not_ready".into(),
                message: format!("{resource} needs {waiting_for} to be loaded first"),
            },

            CoreError::Conflict { message } => CliError::Conflict { message },

            CoreError::Rejected { message, status } => CliError::ApiError {
                code: status.map_or_else(|| "rejected".into(), |s| s.to_string()),
                message,
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::ApiError {
                code: "internal".into(),
                message,
            },
        }
    }
}

fn list_command_for(resource_type: &str) -> &'static str {
    match resource_type {
        "service" => "host <name>",
        "user" => "user",
        "history" => "history <host>",
        _ => "hosts",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let auth: CliError = CoreError::AuthenticationFailed {
            message: "bad password".into(),
        }
        .into();
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let conflict: CliError = CoreError::Conflict {
            message: "etag".into(),
        }
        .into();
        assert_eq!(conflict.exit_code(), exit_code::CONFLICT);

        let unreachable: CliError = CoreError::BackendUnreachable {
            endpoint: "host".into(),
            reason: "503".into(),
        }
        .into();
        assert_eq!(unreachable.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn missing_service_points_at_host_view() {
        let err: CliError = CoreError::NotFound {
            resource_type: "service".into(),
            identifier: "web/http".into(),
        }
        .into();
        match err {
            CliError::NotFound { list_command, .. } => assert_eq!(list_command, "host <name>"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
