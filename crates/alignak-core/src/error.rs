// ── Core error types ──
//
// User-facing errors from alignak-core. Consumers never see HTTP status
// codes or JSON parse failures directly: the `From<alignak_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

use crate::model::ResourceType;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Backend unreachable while fetching '{endpoint}': {reason}")]
    BackendUnreachable { endpoint: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Controller disconnected")]
    ControllerDisconnected,

    #[error("{operation} timed out after {timeout_secs}s")]
    Timeout { operation: String, timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("{resource_type} not found: {identifier}")]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    #[error("Cannot fetch {resource} before {waiting_for} is loaded")]
    NotReady {
        resource: ResourceType,
        waiting_for: ResourceType,
    },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Write conflict (stale revision, refetch and retry): {message}")]
    Conflict { message: String },

    #[error("Operation rejected by backend: {message}")]
    Rejected {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` if the backend could not be reached, as opposed to
    /// refusing the request.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::BackendUnreachable { .. } | Self::Timeout { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<alignak_api::Error> for CoreError {
    fn from(err: alignak_api::Error) -> Self {
        // Rejected tokens surface as 401 on any endpoint.
        if err.is_auth_expired() {
            let message = match err {
                alignak_api::Error::Authentication { message }
                | alignak_api::Error::Backend { message, .. } => message,
                other => other.to_string(),
            };
            return CoreError::AuthenticationFailed { message };
        }

        match err {
            alignak_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            alignak_api::Error::NotAuthenticated => CoreError::AuthenticationFailed {
                message: "not logged in".into(),
            },
            alignak_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout {
                        operation: "Backend request".into(),
                        timeout_secs: 0,
                    }
                } else {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                }
            }
            alignak_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            alignak_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            alignak_api::Error::Backend { status, message } => match status {
                // Stale or missing If-Match revision tag.
                412 | 428 => CoreError::Conflict { message },
                404 => CoreError::NotFound {
                    resource_type: "resource".into(),
                    identifier: message,
                },
                _ => CoreError::Rejected {
                    message,
                    status: Some(status),
                },
            },
            alignak_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            alignak_api::Error::Connectivity { endpoint, source } => {
                CoreError::BackendUnreachable {
                    endpoint,
                    reason: source.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_etag_becomes_conflict() {
        let err = CoreError::from(alignak_api::Error::Backend {
            status: 412,
            message: "etags don't match".into(),
        });
        assert!(matches!(err, CoreError::Conflict { .. }));
    }

    #[test]
    fn rejected_token_is_an_authentication_failure() {
        let err = CoreError::from(alignak_api::Error::Backend {
            status: 401,
            message: "Please provide proper credentials".into(),
        });
        assert!(matches!(
            err,
            CoreError::AuthenticationFailed { ref message } if message.contains("credentials")
        ));
    }

    #[test]
    fn exhausted_retry_is_connectivity() {
        let err = CoreError::from(alignak_api::Error::Connectivity {
            endpoint: "host".into(),
            source: Box::new(alignak_api::Error::Backend {
                status: 503,
                message: "down".into(),
            }),
        });
        assert!(err.is_connectivity());
        assert!(err.to_string().contains("host"));
    }
}
