// ── Registration table ──
//
// Concurrent map of live registrations, keyed by an opaque handle. The
// table itself is lock-free; callers that need first/last-registration
// signals to be race-free serialize through the gateway's lifecycle
// lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::consumer::{ConsumerIdentity, ConsumerSink, ConsumerState};
use crate::error::GatewayError;
use crate::model::{DiscoveryTree, Kind};

/// Opaque registration handle. Valid until passed to `unregister`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

/// One live registration: identity, diffing state, and the sink events
/// are pushed to.
pub struct Registration {
    pub identity: ConsumerIdentity,
    /// Locked only by the poll task during dispatch; the async mutex
    /// keeps dispatch cancel-safe.
    pub state: Mutex<ConsumerState>,
    pub sink: Arc<dyn ConsumerSink>,
}

#[derive(Default)]
pub struct RegistrationTable {
    entries: DashMap<Handle, Arc<Registration>>,
    next_handle: AtomicU64,
}

impl RegistrationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a registration, resolving an empty item id against the
    /// discovery tree first. Returns the handle and whether this entry
    /// is the first one (the caller starts polling on `true`).
    ///
    /// Resolution failure leaves the table untouched.
    pub fn register(
        &self,
        mut identity: ConsumerIdentity,
        sink: Arc<dyn ConsumerSink>,
        tree: &DiscoveryTree,
    ) -> Result<(Handle, bool), GatewayError> {
        if identity.item_id.is_empty() && identity.kind != Kind::Universal {
            identity.item_id = tree
                .resolve(identity.kind, &identity.display_name)
                .ok_or_else(|| GatewayError::ItemNotFound {
                    kind: identity.kind,
                    name: identity.display_name.clone(),
                })?;
        }

        let handle = Handle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let registration = Arc::new(Registration {
            identity: identity.clone(),
            state: Mutex::new(ConsumerState::new(identity)),
            sink,
        });
        let first = self.entries.is_empty();
        self.entries.insert(handle, registration);
        Ok((handle, first))
    }

    /// Remove a registration. Returns `true` when the table is empty
    /// afterwards (the caller stops polling). Unknown handles are a
    /// no-op and report the current emptiness.
    pub fn unregister(&self, handle: Handle) -> bool {
        self.entries.remove(&handle);
        self.entries.is_empty()
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Point-in-time copy of the live entries, for dispatch without
    /// holding map shards across await points.
    pub fn snapshot(&self) -> Vec<(Handle, Arc<Registration>)> {
        self.entries
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
