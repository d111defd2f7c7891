use thiserror::Error;

/// Top-level error type for the `alignak-api` crate.
///
/// Covers authentication, transport, backend rejections, and the
/// "gave up after retrying" connectivity failure. `alignak-core` maps these
/// into user-facing errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed (wrong credentials, unknown token, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A request needing a session was issued before `login`.
    #[error("Not authenticated -- login required")]
    NotAuthenticated,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Backend ─────────────────────────────────────────────────────
    /// The backend answered with a non-success status.
    ///
    /// Eve reports `412 Precondition Failed` when the `If-Match` etag is
    /// stale and `422` when the payload fails validation.
    #[error("Backend error (HTTP {status}): {message}")]
    Backend { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Connectivity ────────────────────────────────────────────────
    /// A read failed again after its automatic retry. The client's
    /// connectivity flag has been cleared.
    #[error("Backend unreachable while fetching '{endpoint}': {source}")]
    Connectivity {
        endpoint: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Returns `true` if the session token is missing or was rejected.
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::NotAuthenticated | Self::Backend { status: 401, .. }
        )
    }

    /// Returns `true` for failures worth one retry: transport errors,
    /// undecodable payloads, and server-side (5xx) errors.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Deserialization { .. } => true,
            Self::Backend { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the backend could not be reached at all, as
    /// opposed to answering with a rejection.
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Connectivity { .. } | Self::Transport(_) | Self::Deserialization { .. } => true,
            Self::Backend { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if a write was refused because of a stale or
    /// missing `If-Match` revision tag.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Backend { status: 412 | 428, .. })
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Backend { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(status: u16) -> Error {
        Error::Backend {
            status,
            message: String::new(),
        }
    }

    #[test]
    fn server_errors_are_transient_client_errors_are_not() {
        assert!(backend(503).is_transient());
        assert!(!backend(404).is_transient());
        assert!(!backend(412).is_transient());
    }

    #[test]
    fn stale_etag_is_a_conflict() {
        assert!(backend(412).is_conflict());
        assert!(backend(428).is_conflict());
        assert!(!backend(422).is_conflict());
    }

    #[test]
    fn rejection_is_not_a_connectivity_failure() {
        assert!(!backend(422).is_connectivity());
        assert!(!Error::NotAuthenticated.is_connectivity());
        let wrapped = Error::Connectivity {
            endpoint: "host".into(),
            source: Box::new(backend(502)),
        };
        assert!(wrapped.is_connectivity());
    }
}
