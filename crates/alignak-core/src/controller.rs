// ── Controller abstraction ──
//
// Full lifecycle management for a backend connection: login, initial
// load, the polling scheduler, the store apply task, and command routing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alignak_api::transport::{TlsMode, TransportConfig};
use alignak_api::BackendClient;
use secrecy::ExposeSecret;
use serde_json::{Map, Value, json};
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::{AuthCredentials, ControllerConfig, PollSchedule, TlsVerification};
use crate::error::CoreError;
use crate::model::{ResourceId, ResourceType, StoreEvent};
use crate::query::{FetchContext, UserLookup};
use crate::scheduler::apply::{self, Applier, StoreMessage};
use crate::scheduler::worker::{self, FetchOutcome};
use crate::scheduler::TaskManager;
use crate::store::DataStore;

const COMMAND_CHANNEL_SIZE: usize = 64;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Logged in, but the last read gave up after its retry. Cached data
    /// is kept and polling continues.
    Unreachable,
    Failed,
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Owns the backend client,
/// the data store, and every background task of a connection.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    store: Arc<DataStore>,
    connection_state: watch::Sender<ConnectionState>,
    command_tx: Mutex<mpsc::Sender<CommandEnvelope>>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    /// Child token for the current connection: cancelled on disconnect,
    /// replaced on reconnect.
    cancel_child: Mutex<CancellationToken>,
    /// Fetch context of the live session (client, store, user lookup).
    session: Mutex<Option<FetchContext>>,
    /// Sender side of the apply channel; the apply task is the only
    /// store writer once connected.
    apply_tx: Mutex<Option<mpsc::UnboundedSender<StoreMessage>>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    /// Launch sequence shared by scheduled and manual fetches.
    seq: Arc<AtomicU64>,
}

impl Controller {
    /// Create a new Controller from configuration. Does NOT connect:
    /// call [`connect()`](Self::connect) to log in and start background tasks.
    pub fn new(config: ControllerConfig) -> Self {
        let store = Arc::new(DataStore::new());
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(ControllerInner {
                config,
                store,
                connection_state,
                command_tx: Mutex::new(command_tx),
                command_rx: Mutex::new(Some(command_rx)),
                cancel,
                cancel_child: Mutex::new(cancel_child),
                session: Mutex::new(None),
                apply_tx: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
                seq: Arc::new(AtomicU64::new(0)),
            }),
        }
    }

    /// Access the controller configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    /// Access the underlying DataStore.
    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Connect to the backend.
    ///
    /// Logs in, loads every scheduled type once in declaration order, then
    /// spawns the apply task, the command processor, the connectivity
    /// watcher, and (unless the tick interval is zero) the scheduler.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.set_state(ConnectionState::Connecting);

        match self.establish().await {
            Ok(()) => {
                self.set_state(ConnectionState::Connected);
                info!(backend = %self.inner.config.url, "connected to backend");
                Ok(())
            }
            Err(e) => {
                self.set_state(ConnectionState::Failed);
                Err(e)
            }
        }
    }

    async fn establish(&self) -> Result<(), CoreError> {
        // Fresh child token for this connection (supports reconnect).
        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        let config = &self.inner.config;
        let client = BackendClient::new(config.url.clone(), &build_transport(config))?
            .with_page_size(config.page_size);

        let user = match &config.auth {
            AuthCredentials::Password { username, password } => {
                client.login(username, password).await?;
                debug!(username, "password authentication successful");
                UserLookup::Name(username.clone())
            }
            AuthCredentials::Token { token, username } => {
                client.login_with_token(token.clone()).await?;
                debug!("token authentication successful");
                UserLookup::Token {
                    token: token.clone(),
                    username: username.clone(),
                }
            }
        };

        let client = Arc::new(client);
        let ctx = FetchContext {
            client: Arc::clone(&client),
            store: Arc::clone(&self.inner.store),
            user,
            history_depth: config.history_depth,
            notifications_depth: config.notifications_depth,
        };

        // Initial load. No worker exists yet, so applying inline keeps the
        // store single-writer.
        let mut applier = Applier::new(Arc::clone(&self.inner.store));
        for kind in initial_load_order(&config.schedule) {
            let outcome =
                worker::run_fetch(&ctx, kind, self.next_seq(), config.schedule.fetch_timeout).await;
            if let Some(e) = applier.apply(StoreMessage::Fetched(outcome)) {
                if kind == ResourceType::User {
                    if matches!(config.auth, AuthCredentials::Password { .. }) {
                        let _ = client.logout().await;
                    }
                    return Err(e);
                }
            }
        }

        // Spawn background tasks
        let (apply_tx, apply_rx) = mpsc::unbounded_channel();
        let mut handles = self.inner.task_handles.lock().await;

        handles.push(tokio::spawn(apply::apply_task(applier, apply_rx)));

        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            let ctrl = self.clone();
            handles.push(tokio::spawn(command_processor_task(ctrl, rx, child.clone())));
        }

        {
            let ctrl = self.clone();
            let rx = client.connectivity();
            handles.push(tokio::spawn(connectivity_task(ctrl, rx, child.clone())));
        }

        if config.schedule.tick_interval.is_zero() {
            debug!("polling disabled");
        } else {
            handles.push(tokio::spawn(scheduler_task(
                ctx.clone(),
                config.schedule.clone(),
                Arc::clone(&self.inner.seq),
                apply_tx.clone(),
                child,
            )));
        }

        *self.inner.apply_tx.lock().await = Some(apply_tx);
        *self.inner.session.lock().await = Some(ctx);
        Ok(())
    }

    /// Disconnect from the backend.
    ///
    /// Cancels background tasks, waits for the scheduler to wind down its
    /// workers, logs out of password sessions, and resets the connection
    /// state to [`Disconnected`](ConnectionState::Disconnected).
    pub async fn disconnect(&self) {
        // Cancel the child token (not the parent: allows reconnect).
        self.inner.cancel_child.lock().await.cancel();

        // The apply task ends once every sender is gone.
        self.inner.apply_tx.lock().await.take();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }
        drop(handles);

        if let Some(ctx) = self.inner.session.lock().await.take() {
            if matches!(self.inner.config.auth, AuthCredentials::Password { .. }) {
                if let Err(e) = ctx.client.logout().await {
                    warn!(error = %e, "logout failed (non-fatal)");
                }
            }
        }

        // Recreate command channel so reconnects can spawn a fresh receiver.
        {
            let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
            *self.inner.command_tx.lock().await = tx;
            *self.inner.command_rx.lock().await = Some(rx);
        }

        self.set_state(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    /// Fetch every resource type now, in declaration order, and wait until
    /// the results are in the store.
    ///
    /// A failing type keeps its cached data; the first failure is
    /// returned after every type has been tried.
    pub async fn full_refresh(&self) -> Result<(), CoreError> {
        let (ctx, tx) = self.live_session().await?;
        let mut first_error = None;
        for kind in ResourceType::all() {
            if let Err(e) = self.refresh_with(&ctx, &tx, kind).await {
                warn!(%kind, error = %e, "refresh failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Fetch one resource type now and wait until it is in the store.
    pub async fn refresh(&self, kind: ResourceType) -> Result<(), CoreError> {
        let (ctx, tx) = self.live_session().await?;
        self.refresh_with(&ctx, &tx, kind).await
    }

    async fn refresh_with(
        &self,
        ctx: &FetchContext,
        tx: &mpsc::UnboundedSender<StoreMessage>,
        kind: ResourceType,
    ) -> Result<(), CoreError> {
        let timeout = self.inner.config.schedule.fetch_timeout;
        let FetchOutcome { kind, seq, result } =
            worker::run_fetch(ctx, kind, self.next_seq(), timeout).await;
        let records = result?;
        tx.send(StoreMessage::Fetched(FetchOutcome {
            kind,
            seq,
            result: Ok(records),
        }))
        .map_err(|_| CoreError::ControllerDisconnected)?;
        barrier(tx).await
    }

    async fn live_session(
        &self,
    ) -> Result<(FetchContext, mpsc::UnboundedSender<StoreMessage>), CoreError> {
        let ctx = self.inner.session.lock().await.clone();
        let tx = self.inner.apply_tx.lock().await.clone();
        match (ctx, tx) {
            (Some(ctx), Some(tx)) => Ok((ctx, tx)),
            _ => Err(CoreError::ControllerDisconnected),
        }
    }

    /// Store the state even when nobody is subscribed.
    fn set_state(&self, state: ConnectionState) {
        self.inner.connection_state.send_replace(state);
    }

    fn next_seq(&self) -> u64 {
        self.inner.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command against the backend.
    ///
    /// Sends the command through the internal channel to the command
    /// processor task and awaits the result.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if !matches!(
            *self.inner.connection_state.borrow(),
            ConnectionState::Connected | ConnectionState::Unreachable
        ) {
            return Err(CoreError::ControllerDisconnected);
        }

        let (tx, rx) = oneshot::channel();

        let command_tx = self.inner.command_tx.lock().await.clone();

        command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::ControllerDisconnected)?;

        rx.await.map_err(|_| CoreError::ControllerDisconnected)?
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: connect, run closure, disconnect.
    ///
    /// The scheduler is not started; the closure sees the store as loaded
    /// by `connect()`.
    pub async fn oneshot<F, Fut, T>(config: ControllerConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.schedule.tick_interval = Duration::ZERO;

        let controller = Controller::new(cfg);
        controller.connect().await?;
        let result = f(controller.clone()).await;
        controller.disconnect().await;
        result
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    /// Subscribe to store change events.
    pub fn events(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.store.events()
    }
}

/// Types loaded by `connect()`: the scheduled ones plus the user, in
/// declaration order.
fn initial_load_order(schedule: &PollSchedule) -> Vec<ResourceType> {
    ResourceType::all()
        .into_iter()
        .filter(|k| *k == ResourceType::User || schedule.resources.contains(k))
        .collect()
}

async fn barrier(tx: &mpsc::UnboundedSender<StoreMessage>) -> Result<(), CoreError> {
    let (done_tx, done_rx) = oneshot::channel();
    tx.send(StoreMessage::Barrier(done_tx))
        .map_err(|_| CoreError::ControllerDisconnected)?;
    done_rx.await.map_err(|_| CoreError::ControllerDisconnected)
}

// ── Background tasks ─────────────────────────────────────────────

/// Drive the [`TaskManager`] from a timer until cancelled, then wind down
/// its workers within the shutdown grace period.
async fn scheduler_task(
    ctx: FetchContext,
    schedule: PollSchedule,
    seq: Arc<AtomicU64>,
    apply_tx: mpsc::UnboundedSender<StoreMessage>,
    cancel: CancellationToken,
) {
    let mut manager = TaskManager::new(&schedule);
    let fetch_timeout = schedule.fetch_timeout.max(Duration::from_secs(1));

    let mut interval = tokio::time::interval(schedule.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await; // consume the immediate first tick

    info!(
        tick = ?schedule.tick_interval,
        types = schedule.resources.len(),
        "scheduler started"
    );

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let report = manager
                    .tick(|kind| {
                        let n = seq.fetch_add(1, Ordering::Relaxed) + 1;
                        worker::spawn_fetch(
                            ctx.clone(),
                            kind,
                            n,
                            fetch_timeout,
                            cancel.child_token(),
                            apply_tx.clone(),
                        )
                    })
                    .await;
                if report.launched.is_some() || !report.skipped.is_empty() {
                    debug!(?report, "scheduler tick");
                }
            }
        }
    }

    let aborted = manager.shutdown(schedule.shutdown_grace).await;
    debug!(aborted, "scheduler stopped");
}

/// Mirror the client's connectivity flag into the connection state.
async fn connectivity_task(
    controller: Controller,
    mut rx: watch::Receiver<bool>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let reachable = *rx.borrow_and_update();
                controller.inner.connection_state.send_if_modified(|state| {
                    match (reachable, &*state) {
                        (false, ConnectionState::Connected) => {
                            *state = ConnectionState::Unreachable;
                            true
                        }
                        (true, ConnectionState::Unreachable) => {
                            *state = ConnectionState::Connected;
                            true
                        }
                        _ => false,
                    }
                });
            }
        }
    }
}

/// Process commands from the mpsc channel one at a time.
async fn command_processor_task(
    controller: Controller,
    mut rx: mpsc::Receiver<CommandEnvelope>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&controller, envelope.command).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}

// ── Command routing ──────────────────────────────────────────────

async fn route_command(controller: &Controller, cmd: Command) -> Result<CommandResult, CoreError> {
    let (ctx, tx) = controller.live_session().await?;
    let store = &controller.inner.store;

    match cmd {
        Command::Acknowledge {
            kind,
            id,
            comment,
            sticky,
            notify,
        } => {
            let (host, service) = action_target(store, kind, &id)?;
            let body = json!({
                "action": "add",
                "host": host,
                "service": service,
                "user": session_user_id(store)?,
                "comment": comment,
                "sticky": sticky,
                "notify": notify,
                "persistent": true,
            });
            let resp = ctx.client.post("actionacknowledge", &body).await?;
            info!(%kind, %id, "acknowledge requested");
            Ok(CommandResult::Accepted { id: resp.id })
        }

        Command::Downtime {
            kind,
            id,
            duration,
            fixed,
            comment,
        } => {
            let (host, service) = action_target(store, kind, &id)?;
            let secs = duration.as_secs();
            let start = chrono::Utc::now().timestamp();
            let end = start.saturating_add(i64::try_from(secs).unwrap_or(i64::MAX));
            let body = json!({
                "action": "add",
                "host": host,
                "service": service,
                "user": session_user_id(store)?,
                "start_time": start,
                "end_time": end,
                "fixed": fixed,
                "duration": secs,
                "comment": comment,
            });
            let resp = ctx.client.post("actiondowntime", &body).await?;
            info!(%kind, %id, secs, "downtime requested");
            Ok(CommandResult::Accepted { id: resp.id })
        }

        Command::EditNotes { kind, id, notes } => {
            let mut fields = Map::new();
            fields.insert("notes".into(), Value::String(notes));
            patch_record(store, &ctx, &tx, kind, id, fields.clone(), fields).await
        }

        Command::ChangePassword { password } => {
            let user = store.user().ok_or_else(|| CoreError::ValidationFailed {
                message: "session user is not loaded".into(),
            })?;
            let mut body = Map::new();
            body.insert(
                "password".into(),
                Value::String(password.expose_secret().to_owned()),
            );
            // The password never enters the cache.
            patch_record(store, &ctx, &tx, ResourceType::User, user.id.clone(), body, Map::new())
                .await
        }

        Command::Patch { kind, id, fields } => {
            patch_record(store, &ctx, &tx, kind, id, fields.clone(), fields).await
        }
    }
}

/// `PATCH /<endpoint>/<id>` with the cached etag, then patch the store
/// with `cached` through the apply path.
async fn patch_record(
    store: &DataStore,
    ctx: &FetchContext,
    tx: &mpsc::UnboundedSender<StoreMessage>,
    kind: ResourceType,
    id: ResourceId,
    body: Map<String, Value>,
    cached: Map<String, Value>,
) -> Result<CommandResult, CoreError> {
    let record = store
        .get_item(kind, "_id", id.as_str())
        .ok_or_else(|| CoreError::NotFound {
            resource_type: kind.to_string(),
            identifier: id.to_string(),
        })?;
    let etag = record.etag.clone().ok_or_else(|| CoreError::ValidationFailed {
        message: format!("{kind} {id} has no revision tag"),
    })?;

    let endpoint = format!("{}/{id}", kind.endpoint());
    let resp = ctx.client.patch(&endpoint, &Value::Object(body), &etag).await?;
    info!(%kind, %id, "record updated");

    tx.send(StoreMessage::Patched {
        kind,
        id: id.clone(),
        fields: cached,
        etag: resp.etag.clone(),
    })
    .map_err(|_| CoreError::ControllerDisconnected)?;
    barrier(tx).await?;

    Ok(CommandResult::Updated {
        kind,
        id,
        etag: resp.etag,
    })
}

/// `(host id, service id)` addressed by an acknowledge or downtime.
fn action_target(
    store: &DataStore,
    kind: ResourceType,
    id: &ResourceId,
) -> Result<(String, Option<String>), CoreError> {
    let not_found = || CoreError::NotFound {
        resource_type: kind.to_string(),
        identifier: id.to_string(),
    };

    match kind {
        ResourceType::Host => {
            let host = store.get_item(kind, "_id", id.as_str()).ok_or_else(not_found)?;
            Ok((host.id.to_string(), None))
        }
        ResourceType::Service => {
            let service = store.get_item(kind, "_id", id.as_str()).ok_or_else(not_found)?;
            let host = service
                .host_id()
                .ok_or_else(|| CoreError::ValidationFailed {
                    message: format!("service {id} has no host"),
                })?
                .to_owned();
            Ok((host, Some(service.id.to_string())))
        }
        other => Err(CoreError::ValidationFailed {
            message: format!("only hosts and services accept actions, not {other}"),
        }),
    }
}

fn session_user_id(store: &DataStore) -> Result<String, CoreError> {
    store
        .user()
        .map(|u| u.id.to_string())
        .ok_or_else(|| CoreError::ValidationFailed {
            message: "session user is not loaded".into(),
        })
}

// ── Helpers ──────────────────────────────────────────────────────

/// Build a [`TransportConfig`] from the controller configuration.
fn build_transport(config: &ControllerConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn initial_load_always_includes_user() {
        let schedule = PollSchedule {
            resources: vec![ResourceType::Service, ResourceType::Host],
            ..PollSchedule::default()
        };
        assert_eq!(
            initial_load_order(&schedule),
            vec![ResourceType::User, ResourceType::Host, ResourceType::Service]
        );
    }
}
