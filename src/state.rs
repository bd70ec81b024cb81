//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the access gate and the [`Hub`]: the single session record plus
//! the channel registry, behind one lock. Dispatch takes the write lock,
//! applies a transition, and fans out without awaiting, so every event is
//! one atomic read-mutate-broadcast step.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::event::{Outbound, Role, SessionSnapshot, UserName};
use crate::services::gate::AccessGate;

// =============================================================================
// SESSION STATE
// =============================================================================

/// The single shared session record. Process lifetime, reset only by the
/// `restart-event` transition.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Whether buzzing is currently accepted.
    pub active: bool,
    /// Connected user names in connection order. Duplicates are allowed.
    pub users: Vec<UserName>,
    /// Users who buzzed since the buzzer last became active, in buzz order.
    pub buzzes: Vec<UserName>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only copy for `current-state` broadcasts.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot { active: self.active, users: self.users.clone(), buzzes: self.buzzes.clone() }
    }
}

// =============================================================================
// CHANNEL REGISTRY
// =============================================================================

/// Explicit broadcast-group registry: role → `conn_id` → sender for
/// outgoing events. Joining and leaving happen on the connection lifecycle.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    members: HashMap<Role, HashMap<Uuid, mpsc::Sender<Outbound>>>,
}

impl ChannelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self, role: Role, conn_id: Uuid, tx: mpsc::Sender<Outbound>) {
        self.members.entry(role).or_default().insert(conn_id, tx);
    }

    pub fn leave(&mut self, role: Role, conn_id: Uuid) {
        if let Some(channel) = self.members.get_mut(&role) {
            channel.remove(&conn_id);
        }
    }

    /// Number of current members of a channel.
    #[must_use]
    pub fn len(&self, role: Role) -> usize {
        self.members.get(&role).map_or(0, HashMap::len)
    }

    #[must_use]
    pub fn is_empty(&self, role: Role) -> bool {
        self.len(role) == 0
    }

    /// Deliver an event to every current member of a channel.
    /// Best-effort: if a member's channel is full, skip it.
    pub fn broadcast(&self, role: Role, event: &Outbound) {
        let Some(channel) = self.members.get(&role) else {
            return;
        };
        for tx in channel.values() {
            let _ = tx.try_send(event.clone());
        }
    }
}

// =============================================================================
// HUB
// =============================================================================

/// Session state and channel registry under one lock.
#[derive(Debug, Default)]
pub struct Hub {
    pub session: SessionState,
    pub channels: ChannelRegistry,
}

impl Hub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum — all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<RwLock<Hub>>,
    pub gate: AccessGate,
}

impl AppState {
    #[must_use]
    pub fn new(gate: AccessGate) -> Self {
        Self { hub: Arc::new(RwLock::new(Hub::new())), gate }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;

    /// Create a test `AppState` with no secrets configured.
    #[must_use]
    pub fn test_app_state() -> AppState {
        AppState::new(AccessGate::new(None, None))
    }

    /// Register a fresh connection on a channel and return its id + receiver.
    pub async fn join_channel(state: &AppState, role: Role) -> (Uuid, mpsc::Receiver<Outbound>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(32);
        state.hub.write().await.channels.join(role, conn_id, tx);
        (conn_id, rx)
    }
}
