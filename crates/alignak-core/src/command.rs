// ── Command API ──
//
// All write operations flow through a unified `Command` enum routed by
// the controller's command processor.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::model::{ResourceId, ResourceType};

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// All write operations against the backend.
#[derive(Debug, Clone)]
pub enum Command {
    /// Acknowledge a failing host or service (`POST /actionacknowledge`).
    Acknowledge {
        kind: ResourceType,
        id: ResourceId,
        comment: String,
        sticky: bool,
        notify: bool,
    },
    /// Schedule a downtime starting now (`POST /actiondowntime`).
    Downtime {
        kind: ResourceType,
        id: ResourceId,
        duration: Duration,
        fixed: bool,
        comment: String,
    },
    /// Replace the `notes` field of a record.
    EditNotes {
        kind: ResourceType,
        id: ResourceId,
        notes: String,
    },
    /// Change the session user's password.
    ChangePassword { password: SecretString },
    /// Arbitrary field update with the cached revision tag.
    Patch {
        kind: ResourceType,
        id: ResourceId,
        fields: Map<String, Value>,
    },
}

/// Result of a successfully executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// An action request was accepted. `id` is the created action, when
    /// the backend returns one.
    Accepted { id: Option<String> },
    /// A record was patched; `etag` is its new revision tag.
    Updated {
        kind: ResourceType,
        id: ResourceId,
        etag: Option<String>,
    },
}
