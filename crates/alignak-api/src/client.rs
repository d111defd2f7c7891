// Backend HTTP client
//
// Wraps `reqwest::Client` with endpoint URL construction, token auth,
// Eve error parsing, the retry-once rule for reads, and the connectivity
// flag. Login / logout live in `auth.rs` as inherent methods.

use arc_swap::ArcSwapOption;
use reqwest::header::IF_MATCH;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Error;
use crate::models::{ErrorBody, ItemsPage, WriteResponse};
use crate::params::QueryParams;
use crate::transport::TransportConfig;

/// Page size used by [`BackendClient::get_all`] when the caller does not
/// set `max_results`.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

const BODY_PREVIEW_CHARS: usize = 200;

/// HTTP client for the Alignak backend.
///
/// Reads go through [`get`](Self::get) / [`get_all`](Self::get_all) and are
/// retried once on transient failure. Writes ([`post`](Self::post),
/// [`patch`](Self::patch)) are single-attempt. Every outcome feeds the
/// connectivity flag observable through [`connectivity`](Self::connectivity).
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
    page_size: u32,
    /// Session token from `POST /login`, sent as the basic-auth username.
    token: ArcSwapOption<SecretString>,
    connected: watch::Sender<bool>,
}

impl BackendClient {
    /// Create a client for the backend at `base_url` (e.g. `http://127.0.0.1:5000`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        let (connected, _) = watch::channel(false);
        Self {
            http,
            base_url: normalize_base_url(base_url),
            page_size: DEFAULT_PAGE_SIZE,
            token: ArcSwapOption::empty(),
            connected,
        }
    }

    /// Override the page size used by `get_all`.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The backend base URL (always ends with `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── Session state ────────────────────────────────────────────────

    /// Whether a session token is held.
    pub fn is_authenticated(&self) -> bool {
        self.token.load().is_some()
    }

    pub(crate) fn set_token(&self, token: Option<SecretString>) {
        self.token.store(token.map(std::sync::Arc::new));
    }

    // ── Connectivity ─────────────────────────────────────────────────

    /// Last known reachability of the backend.
    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Subscribe to connectivity changes.
    pub fn connectivity(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        let changed = self.connected.send_if_modified(|current| {
            if *current == connected {
                false
            } else {
                *current = connected;
                true
            }
        });
        if changed {
            if connected {
                info!(backend = %self.base_url, "backend reachable");
            } else {
                warn!(backend = %self.base_url, "backend unreachable");
            }
        }
    }

    // ── URL / auth helpers ───────────────────────────────────────────

    pub(crate) fn endpoint_url(&self, endpoint: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(endpoint.trim_start_matches('/'))?)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, Error> {
        let guard = self.token.load();
        let Some(token) = &*guard else {
            return Err(Error::NotAuthenticated);
        };
        Ok(builder.basic_auth(token.expose_secret(), Some("")))
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Fetch one page of `endpoint`.
    ///
    /// A transient failure (transport, undecodable JSON, 5xx) is retried
    /// exactly once. If the retry fails too the connectivity flag is
    /// cleared and [`Error::Connectivity`] is returned: the caller should
    /// skip this cycle rather than treat the resource as empty.
    pub async fn get(&self, endpoint: &str, params: &QueryParams) -> Result<ItemsPage, Error> {
        let first = match self.get_once(endpoint, params).await {
            Ok(page) => {
                self.set_connected(true);
                return Ok(page);
            }
            Err(e) if e.is_transient() => e,
            Err(e) => return Err(e),
        };

        debug!(endpoint, error = %first, "transient failure, retrying once");

        match self.get_once(endpoint, params).await {
            Ok(page) => {
                self.set_connected(true);
                Ok(page)
            }
            Err(e) if e.is_transient() => {
                self.set_connected(false);
                Err(Error::Connectivity {
                    endpoint: endpoint.to_owned(),
                    source: Box::new(e),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch every page of `endpoint` and concatenate the items.
    pub async fn get_all(&self, endpoint: &str, params: &QueryParams) -> Result<Vec<Value>, Error> {
        let max_results = params.max_results.unwrap_or(self.page_size).max(1);
        let page_len = usize::try_from(max_results).unwrap_or(usize::MAX);
        let mut all = Vec::new();
        let mut page_number: u32 = 1;

        loop {
            let page_params = params
                .clone()
                .with_max_results(max_results)
                .with_page(page_number);
            let page = self.get(endpoint, &page_params).await?;
            let received = page.items.len();
            all.extend(page.items);

            let total = page.meta.map(|m| m.total);
            let seen = u64::try_from(all.len()).unwrap_or(u64::MAX);
            if received < page_len || total.is_some_and(|t| seen >= t) {
                break;
            }
            page_number += 1;
        }

        debug!(endpoint, count = all.len(), pages = page_number, "fetched all items");
        Ok(all)
    }

    async fn get_once(&self, endpoint: &str, params: &QueryParams) -> Result<ItemsPage, Error> {
        let url = self.endpoint_url(endpoint)?;
        debug!("GET {url}");

        let builder = self.authorize(self.http.get(url).query(&params.to_pairs()))?;
        let resp = builder.send().await?;
        parse_response(resp).await
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// `POST /<endpoint>` with a JSON body. Single attempt.
    pub async fn post(&self, endpoint: &str, data: &Value) -> Result<WriteResponse, Error> {
        let url = self.endpoint_url(endpoint)?;
        debug!("POST {url}");

        let builder = self.authorize(self.http.post(url).json(data))?;
        let result = match builder.send().await {
            Ok(resp) => parse_write(resp).await,
            Err(e) => Err(Error::Transport(e)),
        };
        self.record_write(result)
    }

    /// `PATCH /<endpoint>` with `If-Match: <etag>`. Single attempt.
    ///
    /// A stale etag comes back as a conflict ([`Error::is_conflict`]); the
    /// caller decides whether to refetch and try again.
    pub async fn patch(
        &self,
        endpoint: &str,
        data: &Value,
        etag: &str,
    ) -> Result<WriteResponse, Error> {
        let url = self.endpoint_url(endpoint)?;
        debug!(etag, "PATCH {url}");

        let builder = self.authorize(self.http.patch(url).header(IF_MATCH, etag).json(data))?;
        let result = match builder.send().await {
            Ok(resp) => parse_write(resp).await,
            Err(e) => Err(Error::Transport(e)),
        };
        self.record_write(result)
    }

    fn record_write<T>(&self, result: Result<T, Error>) -> Result<T, Error> {
        match &result {
            Ok(_) => self.set_connected(true),
            Err(e) if e.is_connectivity() => self.set_connected(false),
            Err(e) => debug!(error = %e, "write rejected by backend"),
        }
        result
    }
}

// ── Response parsing ─────────────────────────────────────────────────

fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

/// Map a non-success response to [`Error`], decoding Eve's error body
/// when there is one.
pub(crate) async fn error_from_response(resp: reqwest::Response) -> Error {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Error::Authentication {
            message: "session token rejected (HTTP 401)".into(),
        };
    }

    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody { error, issues }) => {
            let base = error
                .and_then(|e| e.message)
                .unwrap_or_else(|| status.to_string());
            match issues {
                Some(issues) => format!("{base} ({issues})"),
                None => base,
            }
        }
        Err(_) => preview(&body),
    };

    Error::Backend {
        status: status.as_u16(),
        message,
    }
}

async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    if !resp.status().is_success() {
        return Err(error_from_response(resp).await);
    }

    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body,
    })
}

async fn parse_write(resp: reqwest::Response) -> Result<WriteResponse, Error> {
    let status = resp.status().as_u16();
    let write: WriteResponse = parse_response(resp).await?;
    if write.is_ok() {
        Ok(write)
    } else {
        Err(Error::Backend {
            status,
            message: write
                .issues
                .map_or_else(|| "write refused".to_owned(), |i| i.to_string()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = BackendClient::with_client(
            reqwest::Client::new(),
            Url::parse("http://backend:5000/api").unwrap(),
        );
        assert_eq!(client.base_url().as_str(), "http://backend:5000/api/");
        assert_eq!(
            client.endpoint_url("/host").unwrap().as_str(),
            "http://backend:5000/api/host"
        );
    }

    #[test]
    fn starts_disconnected_and_unauthenticated() {
        let client =
            BackendClient::with_client(reqwest::Client::new(), Url::parse("http://b").unwrap());
        assert!(!client.is_connected());
        assert!(!client.is_authenticated());
    }

    #[test]
    fn connectivity_changes_are_broadcast_once() {
        let client =
            BackendClient::with_client(reqwest::Client::new(), Url::parse("http://b").unwrap());
        let mut rx = client.connectivity();
        client.set_connected(true);
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());
        client.set_connected(true);
        assert!(!rx.has_changed().unwrap());
    }
}
