// Wire shapes of the Eve backend.
//
// Items stay loosely typed (`serde_json::Value`): the set of fields depends
// on the projection the caller asked for, and the domain conversion lives
// in `alignak-core`.

use serde::Deserialize;
use serde_json::Value;

/// One page of a collection: `{ "_items": [...], "_meta": {...} }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemsPage {
    #[serde(rename = "_items", default)]
    pub items: Vec<Value>,
    #[serde(rename = "_meta", default)]
    pub meta: Option<PageMeta>,
}

/// Pagination metadata.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub max_results: u32,
    #[serde(default)]
    pub total: u64,
}

/// Body returned by POST / PATCH: `{ "_status": "OK", "_id": .., "_etag": .. }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WriteResponse {
    #[serde(rename = "_status", default)]
    pub status: Option<String>,
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(rename = "_etag", default)]
    pub etag: Option<String>,
    #[serde(rename = "_issues", default)]
    pub issues: Option<Value>,
    /// Remaining payload (action endpoints may add their own keys).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl WriteResponse {
    pub fn is_ok(&self) -> bool {
        self.status.as_deref().is_none_or(|s| s == "OK")
    }
}

/// Eve error body: `{ "_status": "ERR", "_error": { "code", "message" }, "_issues": {..} }`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(rename = "_error")]
    pub error: Option<ErrorInner>,
    #[serde(rename = "_issues")]
    pub issues: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorInner {
    pub message: Option<String>,
}

/// Body returned by `POST /login`.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: Option<String>,
}
