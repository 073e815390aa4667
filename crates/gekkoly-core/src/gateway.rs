// ── Gateway ──
//
// One gateway per controller. It owns the HTTP client, the discovery
// tree, the registration table, and two background tasks:
//
//   discovery task  fetches the naming tree until it succeeds, then
//                   flips the gateway to Ready and exits
//   poll task       runs while at least one consumer is registered;
//                   one-shot re-armed, so the effective period is
//                   poll_interval + request latency + dispatch time
//
// Consumers interact only through the `Gateway` handle, which is a
// cheap clone over a shared inner.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use gekkoly_api::{ApiError, QueryApiClient, TransportConfig, status_message};

use crate::codec::{CommandValue, InvalidCommand};
use crate::config::GatewayConfig;
use crate::consumer::{ConsumerIdentity, ConsumerSink, StatusLevel, UpdateOutcome};
use crate::error::GatewayError;
use crate::model::{DiscoveryTree, Kind};
use crate::registry::{Handle, RegistrationTable};

/// Gateway lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayState {
    /// The naming tree has not been fetched yet; registrations by
    /// display name cannot be resolved.
    Discovering,
    /// Discovery completed; registration and polling are available.
    Ready,
}

/// Handle to a running gateway. Clones share the same gateway.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    config: GatewayConfig,
    client: QueryApiClient,
    table: RegistrationTable,
    tree: watch::Sender<Option<Arc<DiscoveryTree>>>,
    state: watch::Sender<GatewayState>,
    cancel: CancellationToken,
    /// Serializes register/unregister against poll task start/stop, so
    /// the first/last-entry signals from the table cannot race.
    lifecycle: Mutex<Lifecycle>,
}

#[derive(Default)]
struct Lifecycle {
    discovery: Option<JoinHandle<()>>,
    poll: Option<PollTask>,
}

struct PollTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Gateway {
    /// Build a gateway from configuration. No requests are issued until
    /// [`Gateway::start`].
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let transport = TransportConfig {
            timeout: config.request_timeout,
            accept_invalid_certs: config.accept_invalid_certs,
        };
        let client = QueryApiClient::new(
            config.base_url.clone(),
            config.credentials.clone(),
            &transport,
        )?;
        Ok(Self {
            inner: Arc::new(GatewayInner {
                config,
                client,
                table: RegistrationTable::new(),
                tree: watch::Sender::new(None),
                state: watch::Sender::new(GatewayState::Discovering),
                cancel: CancellationToken::new(),
                lifecycle: Mutex::new(Lifecycle::default()),
            }),
        })
    }

    /// Start the discovery task. Idempotent.
    pub async fn start(&self) {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if lifecycle.discovery.is_some() {
            return;
        }
        let inner = Arc::clone(&self.inner);
        lifecycle.discovery = Some(tokio::spawn(discovery_task(inner)));
    }

    // ── State ────────────────────────────────────────────────────────

    pub fn state(&self) -> GatewayState {
        *self.inner.state.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == GatewayState::Ready
    }

    /// Watch lifecycle transitions, e.g. to await readiness.
    pub fn subscribe_state(&self) -> watch::Receiver<GatewayState> {
        self.inner.state.subscribe()
    }

    /// The discovery tree, once fetched.
    pub fn discovery_tree(&self) -> Option<Arc<DiscoveryTree>> {
        self.inner.tree.borrow().clone()
    }

    // ── Registration ─────────────────────────────────────────────────

    /// Register a consumer. Fails with [`GatewayError::NotReady`] before
    /// discovery completes and [`GatewayError::ItemNotFound`] when a
    /// display name does not resolve.
    ///
    /// The first registration starts the poll task.
    pub async fn register(
        &self,
        identity: ConsumerIdentity,
        sink: Arc<dyn ConsumerSink>,
    ) -> Result<Handle, GatewayError> {
        let tree = self.discovery_tree().ok_or(GatewayError::NotReady)?;
        let mut lifecycle = self.inner.lifecycle.lock().await;
        let (handle, first) = self.inner.table.register(identity, sink, &tree)?;
        if first {
            start_polling(&self.inner, &mut lifecycle);
        }
        Ok(handle)
    }

    /// Register a consumer, waiting for the gateway to become ready.
    ///
    /// Retries indefinitely while discovery is pending, pushing a
    /// waiting status to the sink between attempts. Other failures are
    /// returned immediately. Returns `NotReady` if the gateway shuts
    /// down while waiting.
    pub async fn register_when_ready(
        &self,
        identity: ConsumerIdentity,
        sink: Arc<dyn ConsumerSink>,
    ) -> Result<Handle, GatewayError> {
        loop {
            match self.register(identity.clone(), Arc::clone(&sink)).await {
                Err(GatewayError::NotReady) => {
                    sink.deliver_status(StatusLevel::Info, "waiting for server to be ready");
                    tokio::select! {
                        () = self.inner.cancel.cancelled() => return Err(GatewayError::NotReady),
                        () = sleep(self.inner.config.registration_retry_delay) => {}
                    }
                }
                other => return other,
            }
        }
    }

    /// Remove a registration. The last removal stops the poll task.
    /// Unknown handles are a no-op.
    pub async fn unregister(&self, handle: Handle) {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if self.inner.table.unregister(handle) {
            if let Some(poll) = lifecycle.poll.take() {
                poll.cancel.cancel();
                let _ = poll.handle.await;
            }
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Issue a write command, fire-and-forget.
    ///
    /// Validation happens before any request: an out-of-range value or
    /// empty item id resolves the returned channel immediately without
    /// touching the network. Dropping the receiver is fine.
    pub fn send_command(
        &self,
        value: &CommandValue,
        item_id: &str,
    ) -> oneshot::Receiver<Result<(), GatewayError>> {
        let (tx, rx) = oneshot::channel();

        if item_id.is_empty() {
            let _ = tx.send(Err(InvalidCommand::new("item id not set").into()));
            return rx;
        }
        let encoded = match value.encode() {
            Ok(encoded) => encoded,
            Err(error) => {
                let _ = tx.send(Err(error.into()));
                return rx;
            }
        };

        let endpoint = value.endpoint();
        let item_id = item_id.to_owned();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = inner.client.send_command(endpoint, &item_id, &encoded).await;
            if let Err(error) = &result {
                warn!(endpoint, item_id, %error, "command failed");
            }
            let _ = tx.send(result.map_err(GatewayError::from));
        });
        rx
    }

    // ── Shutdown ─────────────────────────────────────────────────────

    /// Stop all background tasks. Registrations are dropped.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if let Some(handle) = lifecycle.discovery.take() {
            let _ = handle.await;
        }
        if let Some(poll) = lifecycle.poll.take() {
            poll.cancel.cancel();
            let _ = poll.handle.await;
        }
    }
}

/// Spawn the poll task. Caller holds the lifecycle lock.
fn start_polling(inner: &Arc<GatewayInner>, lifecycle: &mut Lifecycle) {
    let cancel = inner.cancel.child_token();
    let handle = tokio::spawn(poll_task(Arc::clone(inner), cancel.clone()));
    lifecycle.poll = Some(PollTask { cancel, handle });
}

async fn discovery_task(inner: Arc<GatewayInner>) {
    loop {
        tokio::select! {
            () = inner.cancel.cancelled() => return,
            result = inner.client.fetch_tree() => match result {
                Ok(root) => {
                    inner.tree.send_replace(Some(Arc::new(DiscoveryTree::new(root))));
                    inner.state.send_replace(GatewayState::Ready);
                    info!("discovery complete, gateway ready");
                    return;
                }
                Err(error) => {
                    warn!(%error, "discovery failed, retrying");
                    tokio::select! {
                        () = inner.cancel.cancelled() => return,
                        () = sleep(inner.config.discovery_retry_delay) => {}
                    }
                }
            }
        }
    }
}

async fn poll_task(inner: Arc<GatewayInner>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            () = sleep(inner.config.poll_interval) => {}
        }
        if inner.table.is_empty() {
            debug!("no consumers registered, poll task idle");
            return;
        }
        match inner.client.fetch_status().await {
            Ok(snapshot) => dispatch_snapshot(&inner, &snapshot).await,
            Err(error) => broadcast_error(&inner, &error),
        }
    }
}

/// Feed one status snapshot to every live registration.
///
/// Works on a point-in-time copy of the table; entries unregistered
/// mid-dispatch are skipped.
async fn dispatch_snapshot(inner: &Arc<GatewayInner>, snapshot: &Value) {
    for (handle, registration) in inner.table.snapshot() {
        if !inner.table.contains(handle) {
            continue;
        }
        let identity = &registration.identity;
        if identity.kind != Kind::Universal && identity.item_id.is_empty() {
            registration
                .sink
                .deliver_status(StatusLevel::Error, "itemId not set");
            continue;
        }

        let section = match identity.kind.section_key() {
            None => snapshot,
            Some(key) => match snapshot.get(key) {
                Some(section) => section,
                None => {
                    registration
                        .sink
                        .deliver_status(StatusLevel::Error, "invalid QueryApi response");
                    continue;
                }
            },
        };

        let mut state = registration.state.lock().await;
        if state.apply_update(section) == UpdateOutcome::Changed {
            registration.sink.deliver_change(state.change_event());
        }
        registration
            .sink
            .deliver_status(StatusLevel::Ok, &state.connected_status());
    }
}

/// Push a poll failure to every registered sink. Polling continues.
fn broadcast_error(inner: &Arc<GatewayInner>, error: &ApiError) {
    warn!(%error, "status poll failed");
    let message = poll_error_message(error);
    for (_, registration) in inner.table.snapshot() {
        registration.sink.deliver_status(StatusLevel::Error, &message);
    }
}

fn poll_error_message(error: &ApiError) -> String {
    match error {
        ApiError::Status { status } => status_message(*status),
        ApiError::Deserialization { .. } => "error parsing JSON-response".to_owned(),
        _ if error.is_timeout() => "QueryApi-Timeout".to_owned(),
        _ => format!("Error: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_error_messages_follow_the_status_taxonomy() {
        let msg = poll_error_message(&ApiError::Status { status: 410 });
        assert_eq!(msg, "410 - Gone - Gekko offline or false Gekko ID");

        let msg = poll_error_message(&ApiError::Deserialization {
            message: "eof".into(),
            body: "{".into(),
        });
        assert_eq!(msg, "error parsing JSON-response");

        let msg = poll_error_message(&ApiError::InvalidUrl(url::ParseError::EmptyHost));
        assert!(msg.starts_with("Error: "));
    }
}
