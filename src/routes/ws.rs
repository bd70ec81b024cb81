//! WebSocket handler — role channels and event dispatch.
//!
//! DESIGN
//! ======
//! Each role endpoint gates the upgrade, registers the connection in its
//! channel, and enters a `select!` loop:
//! - Incoming participant frames → parse + apply the session transition
//! - Broadcast events from the channel registry → forward to the socket
//!
//! Transition functions in `services::session` are pure business logic —
//! they mutate state and return outgoing events with an audience. This
//! layer owns all delivery: channel fan-out and caller-only replies.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade request → access gate (401 on credential mismatch)
//! 2. Join channel + connect-time `current-state` sync (one atomic step)
//! 3. Inbound frames → dispatch → fan out under the hub lock
//! 4. Close → user departure sync → leave channel

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::event::{Inbound, Outbound, Role, UserName};
use crate::services::session::{self, Audience, Outgoing};
use crate::state::{AppState, Hub};

/// Outbound buffer per connection. Members that fall this far behind have
/// events dropped rather than stalling the broadcast.
const OUTBOUND_BUFFER: usize = 256;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn host_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    gate_and_upgrade(Role::Host, state, &params, ws)
}

pub async fn user_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    gate_and_upgrade(Role::User, state, &params, ws)
}

pub async fn board_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    gate_and_upgrade(Role::Board, state, &params, ws)
}

/// Run the access gate against the `pass` query parameter, then upgrade.
/// A refused connection never reaches the channel registry.
fn gate_and_upgrade(
    role: Role,
    state: AppState,
    params: &HashMap<String, String>,
    ws: WebSocketUpgrade,
) -> Response {
    if let Err(e) = state.gate.authorize(role, params.get("pass").map(String::as_str)) {
        warn!(%role, "ws: connection refused");
        return (StatusCode::UNAUTHORIZED, e.to_string()).into_response();
    }
    ws.on_upgrade(move |socket| run_ws(socket, state, role))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, role: Role) {
    let conn_id = Uuid::new_v4();

    // Per-connection channel for receiving broadcast events.
    let (tx, mut rx) = mpsc::channel::<Outbound>(OUTBOUND_BUFFER);

    // Join and sync under one lock so no broadcast lands in between.
    let greetings = {
        let mut hub = state.hub.write().await;
        hub.channels.join(role, conn_id, tx);
        let outgoing = session::connected(&hub.session, role);
        deliver(&hub, outgoing)
    };
    info!(%conn_id, %role, "ws: connected");

    // A send failure here means the socket already died; the recv loop
    // below will observe that and fall through to cleanup.
    for event in greetings {
        let _ = send_event(&mut socket, &event).await;
    }

    // The name this connection identified with, set by `user-connected`.
    let mut user: Option<UserName> = None;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        for event in dispatch_text(&state, role, conn_id, &mut user, text.as_str()).await {
                            let _ = send_event(&mut socket, &event).await;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(event) = rx.recv() => {
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    // Leave first so the departure sync never echoes to this connection.
    {
        let mut hub = state.hub.write().await;
        hub.channels.leave(role, conn_id);
        if role == Role::User {
            let outgoing = session::disconnected(&mut hub.session, user.as_deref());
            let _ = deliver(&hub, outgoing);
        }
    }
    info!(%conn_id, %role, "ws: disconnected");
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Parse and process one inbound text frame and return events for the
/// sender. Admission, mutation, and fan-out run under a single hub write
/// lock with no await points, so every frame is one atomic step.
///
/// Malformed, unknown, and ill-routed frames are logged and dropped — the
/// outbound protocol defines no error event.
async fn dispatch_text(
    state: &AppState,
    role: Role,
    conn_id: Uuid,
    user: &mut Option<UserName>,
    text: &str,
) -> Vec<Outbound> {
    let event = match Inbound::parse(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(%conn_id, %role, error = %e, "ws: dropping invalid frame");
            return Vec::new();
        }
    };
    info!(%conn_id, %role, event = event.name(), "ws: recv");

    let mut hub = state.hub.write().await;
    match session::apply(&mut hub.session, role, user, event) {
        Ok(outgoing) => deliver(&hub, outgoing),
        Err(e) => {
            warn!(%conn_id, %role, error = %e, "ws: dropping ill-routed event");
            Vec::new()
        }
    }
}

/// Fan out outgoing events through the channel registry. Caller-only events
/// are returned for the socket loop to write directly.
fn deliver(hub: &Hub, outgoing: Vec<Outgoing>) -> Vec<Outbound> {
    let mut caller = Vec::new();
    for Outgoing { to, event } in outgoing {
        match to {
            Audience::Caller => caller.push(event),
            Audience::Channel(role) => hub.channels.broadcast(role, &event),
            Audience::All => {
                for role in Role::ALL {
                    hub.channels.broadcast(role, &event);
                }
            }
        }
    }
    caller
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_event(socket: &mut WebSocket, event: &Outbound) -> Result<(), ()> {
    let json = match serde_json::to_string(event) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize event");
            return Err(());
        }
    };
    info!(event = event.name(), "ws: send");
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
