// ── Resource record ──
//
// One backend item as cached by the store. Fields stay loosely typed:
// the projection per type decides what is present, and the accessors
// below read what the views need.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::resource_type::ResourceType;
use super::state::State;

/// Opaque backend identifier (`_id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A cached backend item.
///
/// `id` and `kind` never change once built. `fields` is replaced on
/// refresh or patched after a successful write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub id: ResourceId,
    pub kind: ResourceType,
    pub name: String,
    /// Revision tag sent back as `If-Match` on PATCH.
    pub etag: Option<String>,
    pub fields: Map<String, Value>,
}

impl Resource {
    /// Build a record from a backend item. Items without `_id` are
    /// rejected.
    pub fn from_item(kind: ResourceType, item: Value) -> Option<Self> {
        let Value::Object(mut fields) = item else {
            return None;
        };

        let id = match fields.remove("_id")? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let etag = match fields.remove("_etag") {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };

        let name = fields
            .get(kind.name_field())
            .and_then(reference_id)
            .map_or_else(|| id.clone(), str::to_owned);

        Some(Self {
            id: ResourceId(id),
            kind,
            name,
            etag,
            fields,
        })
    }

    // ── Typed accessors ──────────────────────────────────────────────

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Missing or non-boolean fields read as `false`.
    pub fn bool_field(&self, key: &str) -> bool {
        self.fields
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn u64_field(&self, key: &str) -> Option<u64> {
        self.fields.get(key).and_then(Value::as_u64)
    }

    /// Live state (`ls_state`), `None` when the backend sent none.
    pub fn ls_state(&self) -> Option<State> {
        self.str_field("ls_state").map(State::from)
    }

    pub fn is_acknowledged(&self) -> bool {
        self.bool_field("ls_acknowledged")
    }

    pub fn is_downtimed(&self) -> bool {
        self.bool_field("ls_downtimed")
    }

    /// Owning host of a service or history entry. The backend may embed
    /// the host instead of referencing it.
    pub fn host_id(&self) -> Option<&str> {
        self.fields.get("host").and_then(reference_id)
    }

    pub fn realm_id(&self) -> Option<&str> {
        self.fields.get("_realm").and_then(reference_id)
    }

    /// Failing and nobody has taken it in hand yet.
    pub fn is_problem(&self) -> bool {
        self.ls_state().is_some_and(|s| s.is_failure_for(self.kind))
            && !self.is_acknowledged()
            && !self.is_downtimed()
    }

    // ── Mutation (apply path only) ───────────────────────────────────

    /// Merge fields returned by a successful write.
    pub(crate) fn apply_patch(&mut self, fields: Map<String, Value>, etag: Option<String>) {
        for (key, value) in fields {
            if key == "name" {
                if let Some(name) = value.as_str() {
                    self.name = name.to_owned();
                }
            }
            self.fields.insert(key, value);
        }
        if etag.is_some() {
            self.etag = etag;
        }
    }
}

/// Read a reference field as an id: either a plain string or an embedded
/// document carrying `_id`.
fn reference_id(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        Value::Object(obj) => obj.get("_id").and_then(Value::as_str),
        _ => None,
    }
}
