// ── Per-type fetch functions ──
//
// One fetch per resource type, chosen by matching on `ResourceType`.
// Each turns backend items into `Resource` records; none of them
// touches the store.

use std::sync::Arc;

use alignak_api::{BackendClient, QueryParams};
use futures_util::{StreamExt, TryStreamExt, stream};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{Resource, ResourceType};
use crate::store::DataStore;

/// Per-host history queries in flight at once.
const HISTORY_CONCURRENCY: usize = 4;

/// How the session user record is looked up.
#[derive(Debug, Clone)]
pub(crate) enum UserLookup {
    Name(String),
    /// `username` comes from the profile and stands in for the user
    /// record until it is loaded.
    Token {
        token: SecretString,
        username: Option<String>,
    },
}

/// Everything a fetch needs. Cheap to clone into a worker.
#[derive(Clone)]
pub(crate) struct FetchContext {
    pub client: Arc<BackendClient>,
    pub store: Arc<DataStore>,
    pub user: UserLookup,
    pub history_depth: u32,
    pub notifications_depth: u32,
}

impl FetchContext {
    /// Session user name: the loaded user record, else the login name.
    fn username(&self) -> Option<String> {
        if let Some(user) = self.store.user() {
            return Some(user.name.clone());
        }
        match &self.user {
            UserLookup::Name(name) => Some(name.clone()),
            UserLookup::Token { username, .. } => username.clone(),
        }
    }
}

/// Fetch the current records of `kind`.
pub(crate) async fn fetch(ctx: &FetchContext, kind: ResourceType) -> Result<Vec<Resource>, CoreError> {
    match kind {
        ResourceType::User => fetch_user(ctx).await,
        ResourceType::History => fetch_history(ctx).await,
        ResourceType::Notification => fetch_notifications(ctx).await,
        ResourceType::Realm
        | ResourceType::Timeperiod
        | ResourceType::Host
        | ResourceType::Service
        | ResourceType::Daemon
        | ResourceType::LiveSynthesis => fetch_collection(ctx, kind).await,
    }
}

/// Filter, projection and sort for `kind`, without paging.
pub(crate) fn base_params(kind: ResourceType) -> QueryParams {
    let mut params = QueryParams::new().with_projection(kind.projection().iter().copied());
    if let Some(filter) = kind.default_filter() {
        params = params.with_filter(filter);
    }
    if let Some(sort) = kind.sort() {
        params = params.with_sort(sort);
    }
    params
}

async fn fetch_collection(ctx: &FetchContext, kind: ResourceType) -> Result<Vec<Resource>, CoreError> {
    let params = base_params(kind);
    let items = if kind.fetches_all_pages() {
        ctx.client.get_all(kind.endpoint(), &params).await?
    } else {
        ctx.client.get(kind.endpoint(), &params).await?.items
    };
    Ok(to_records(kind, items))
}

async fn fetch_user(ctx: &FetchContext) -> Result<Vec<Resource>, CoreError> {
    let filter = match &ctx.user {
        UserLookup::Name(name) => json!({ "name": name }),
        UserLookup::Token { token, .. } => json!({ "token": token.expose_secret() }),
    };
    let params = base_params(ResourceType::User)
        .with_filter(filter)
        .with_max_results(1);

    let page = ctx.client.get(ResourceType::User.endpoint(), &params).await?;
    let records = to_records(ResourceType::User, page.items);
    if records.is_empty() {
        return Err(CoreError::NotFound {
            resource_type: "user".into(),
            identifier: match &ctx.user {
                UserLookup::Name(name) => name.clone(),
                UserLookup::Token { .. } => "<session token>".into(),
            },
        });
    }
    Ok(records)
}

/// Latest history entries of every known host, one query per host.
async fn fetch_history(ctx: &FetchContext) -> Result<Vec<Resource>, CoreError> {
    let hosts = ctx.store.snapshot(ResourceType::Host);
    if !hosts.is_loaded() {
        return Err(CoreError::NotReady {
            resource: ResourceType::History,
            waiting_for: ResourceType::Host,
        });
    }

    let base = base_params(ResourceType::History).with_max_results(ctx.history_depth);
    let host_ids: Vec<String> = hosts.iter().map(|h| h.id.to_string()).collect();
    debug!(hosts = host_ids.len(), "fetching per-host history");

    let pages: Vec<Vec<Value>> = stream::iter(host_ids)
        .map(|host_id| {
            let params = base.clone().with_filter(json!({ "host": host_id }));
            let client = Arc::clone(&ctx.client);
            async move {
                client
                    .get(ResourceType::History.endpoint(), &params)
                    .await
                    .map(|page| page.items)
            }
        })
        .buffered(HISTORY_CONCURRENCY)
        .try_collect()
        .await?;

    Ok(to_records(
        ResourceType::History,
        pages.into_iter().flatten().collect(),
    ))
}

async fn fetch_notifications(ctx: &FetchContext) -> Result<Vec<Resource>, CoreError> {
    let params = base_params(ResourceType::Notification).with_max_results(ctx.notifications_depth);
    let page = ctx
        .client
        .get(ResourceType::Notification.endpoint(), &params)
        .await?;

    let Some(username) = ctx.username() else {
        debug!("session user unknown, no notification can match");
        return Ok(Vec::new());
    };

    Ok(to_records(ResourceType::Notification, page.items)
        .into_iter()
        .filter(|r| {
            r.str_field("message")
                .is_some_and(|m| is_notification_for(m, &username))
        })
        .collect())
}

/// Whether a notification message is addressed to `username`.
///
/// Messages look like `SERVICE NOTIFICATION: admin;host;svc;CRITICAL;..`:
/// the recipient is the part of the first `;` segment after its first
/// `:`, with every space removed.
pub fn is_notification_for(message: &str, username: &str) -> bool {
    message
        .split(';')
        .next()
        .and_then(|head| head.split(':').nth(1))
        .is_some_and(|recipient| recipient.replace(' ', "") == username)
}

fn to_records(kind: ResourceType, items: Vec<Value>) -> Vec<Resource> {
    let total = items.len();
    let records: Vec<Resource> = items
        .into_iter()
        .filter_map(|item| Resource::from_item(kind, item))
        .collect();
    if records.len() < total {
        warn!(%kind, dropped = total - records.len(), "items without _id ignored");
    }
    records
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use url::Url;

    #[test]
    fn notification_recipient_parsing() {
        let msg = "SERVICE NOTIFICATION: admin;web;http;CRITICAL;notify-service;down";
        assert!(is_notification_for(msg, "admin"));
        assert!(!is_notification_for(msg, "guest"));
        assert!(is_notification_for("HOST NOTIFICATION: ad min;web;DOWN", "admin"));
        assert!(!is_notification_for("no recipient here", "admin"));
        // Only the first `;` segment counts.
        assert!(!is_notification_for("HOST NOTIFICATION;x: admin", "admin"));
    }

    #[test]
    fn base_params_carry_type_query() {
        let params = base_params(ResourceType::Host);
        assert_eq!(params.filter, Some(json!({ "_is_template": false })));
        assert!(params.projection.iter().any(|f| f == "ls_state"));
        assert_eq!(params.sort, None);

        let params = base_params(ResourceType::Notification);
        assert_eq!(params.sort.as_deref(), Some("-_id"));
    }

    #[test]
    fn token_session_falls_back_to_profile_username() {
        let client = BackendClient::new(
            Url::parse("http://127.0.0.1:1").unwrap(),
            &alignak_api::TransportConfig::default(),
        )
        .unwrap();
        let store = Arc::new(DataStore::new());
        let ctx = FetchContext {
            client: Arc::new(client),
            store: Arc::clone(&store),
            user: UserLookup::Token {
                token: SecretString::from("tkn"),
                username: Some("bob".into()),
            },
            history_depth: 5,
            notifications_depth: 5,
        };
        assert_eq!(ctx.username().as_deref(), Some("bob"));

        store.update_database(
            ResourceType::User,
            vec![
                Resource::from_item(ResourceType::User, json!({ "_id": "u1", "name": "alice" }))
                    .unwrap(),
            ],
        );
        assert_eq!(ctx.username().as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn history_waits_for_hosts() {
        let client = BackendClient::new(
            Url::parse("http://127.0.0.1:1").unwrap(),
            &alignak_api::TransportConfig::default(),
        )
        .unwrap();
        let ctx = FetchContext {
            client: Arc::new(client),
            store: Arc::new(DataStore::new()),
            user: UserLookup::Name("admin".into()),
            history_depth: 5,
            notifications_depth: 5,
        };

        let err = fetch(&ctx, ResourceType::History).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::NotReady {
                waiting_for: ResourceType::Host,
                ..
            }
        ));
    }
}
