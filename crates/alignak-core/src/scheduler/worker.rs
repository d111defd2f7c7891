// ── Fetch worker ──
//
// One spawned task per launched fetch. Workers never touch the store;
// they report to the apply task.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::apply::StoreMessage;
use crate::error::CoreError;
use crate::model::{Resource, ResourceType};
use crate::query::{self, FetchContext};

/// Result of one fetch, tagged with its launch sequence number.
#[derive(Debug)]
pub(crate) struct FetchOutcome {
    pub kind: ResourceType,
    pub seq: u64,
    pub result: Result<Vec<Resource>, CoreError>,
}

/// Run `query::fetch` for `kind` under `timeout`, without blocking on
/// the store.
pub(crate) async fn run_fetch(
    ctx: &FetchContext,
    kind: ResourceType,
    seq: u64,
    timeout: Duration,
) -> FetchOutcome {
    let result = match tokio::time::timeout(timeout, query::fetch(ctx, kind)).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::Timeout {
            operation: format!("Fetching {kind}"),
            timeout_secs: timeout.as_secs(),
        }),
    };
    FetchOutcome { kind, seq, result }
}

/// Spawn a worker that fetches `kind` and sends the outcome to `tx`.
/// A cancelled worker sends nothing.
pub(crate) fn spawn_fetch(
    ctx: FetchContext,
    kind: ResourceType,
    seq: u64,
    timeout: Duration,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<StoreMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(%kind, seq, "fetch cancelled");
            }
            outcome = run_fetch(&ctx, kind, seq, timeout) => {
                if tx.send(StoreMessage::Fetched(outcome)).is_err() {
                    debug!(%kind, seq, "apply task gone, outcome dropped");
                }
            }
        }
    })
}
