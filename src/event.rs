//! Event — the wire protocol for buzzboard.
//!
//! ARCHITECTURE
//! ============
//! Every communication is a JSON envelope `{"event": ..., "data": ...}`.
//! Participants send inbound events over WebSocket, the server dispatches by
//! event name and role, and resulting outbound events fan out to the role
//! channels.
//!
//! DESIGN
//! ======
//! - Inbound payloads are schema-validated into [`Inbound`]; malformed or
//!   unknown frames are rejected with a [`ProtocolError`], never trusted.
//! - Outbound events serialize from the tagged [`Outbound`] enum into the
//!   same envelope shape.
//! - The dispatch layer routes on event name and sender role and never
//!   inspects raw payloads.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// User identifier as supplied by the `user-connected` event. Not unique:
/// two connections may claim the same name.
pub type UserName = String;

// =============================================================================
// ROLES
// =============================================================================

/// The three participant roles. Each maps to one endpoint and one broadcast
/// channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    User,
    Board,
}

impl Role {
    /// All roles, in broadcast order.
    pub const ALL: [Role; 3] = [Role::Host, Role::User, Role::Board];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::User => "user",
            Role::Board => "board",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Rejection reasons for inbound frames. All of these are logged and
/// absorbed — the outbound protocol defines no error event.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid frame: {0}")]
    BadFrame(#[from] serde_json::Error),
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    #[error("invalid {event} payload: {source}")]
    BadPayload {
        event: &'static str,
        source: serde_json::Error,
    },
    #[error("{event} not accepted from the {role} channel")]
    NotAllowed { event: &'static str, role: Role },
}

// =============================================================================
// INBOUND
// =============================================================================

/// Envelope as it appears on the wire. `data` is absent for payload-free
/// events.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

/// A validated participant → server event.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Activate the buzzer. `force` is the override flag: transition and
    /// rebroadcast even if already active.
    ActivateBuzzer { force: bool },
    /// Deactivate the buzzer, with the same override semantics.
    DeactivateBuzzer { force: bool },
    /// Announce a client-side countdown. The server only relays intent.
    StartCountdown { sec: u64, action: String },
    /// Reset the whole session.
    RestartEvent,
    /// A user identifies itself by name.
    UserConnected { name: UserName },
    /// A user attempts to buzz in.
    Buzz,
}

impl Inbound {
    /// Parse one raw text frame into a validated event.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] for malformed JSON, unknown event names,
    /// or payloads that fail schema validation.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        Self::from_envelope(envelope)
    }

    fn from_envelope(envelope: Envelope) -> Result<Self, ProtocolError> {
        match envelope.event.as_str() {
            "activate-buzzer" => Ok(Inbound::ActivateBuzzer { force: override_flag(&envelope.data) }),
            "deactivate-buzzer" => Ok(Inbound::DeactivateBuzzer { force: override_flag(&envelope.data) }),
            "start-countdown" => {
                #[derive(Deserialize)]
                struct Payload {
                    sec: u64,
                    action: String,
                }
                let Payload { sec, action } = serde_json::from_value(envelope.data)
                    .map_err(|source| ProtocolError::BadPayload { event: "start-countdown", source })?;
                Ok(Inbound::StartCountdown { sec, action })
            }
            "restart-event" => Ok(Inbound::RestartEvent),
            "user-connected" => {
                let name: UserName = serde_json::from_value(envelope.data)
                    .map_err(|source| ProtocolError::BadPayload { event: "user-connected", source })?;
                Ok(Inbound::UserConnected { name })
            }
            "buzz" => Ok(Inbound::Buzz),
            _ => Err(ProtocolError::UnknownEvent(envelope.event)),
        }
    }

    /// Wire name of this event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Inbound::ActivateBuzzer { .. } => "activate-buzzer",
            Inbound::DeactivateBuzzer { .. } => "deactivate-buzzer",
            Inbound::StartCountdown { .. } => "start-countdown",
            Inbound::RestartEvent => "restart-event",
            Inbound::UserConnected { .. } => "user-connected",
            Inbound::Buzz => "buzz",
        }
    }

    /// Which endpoints accept this event. Buzzer toggles are shared between
    /// host and board; everything else belongs to exactly one channel.
    #[must_use]
    pub fn allowed_from(&self, role: Role) -> bool {
        match self {
            Inbound::ActivateBuzzer { .. } | Inbound::DeactivateBuzzer { .. } => {
                matches!(role, Role::Host | Role::Board)
            }
            Inbound::StartCountdown { .. } | Inbound::RestartEvent => role == Role::Host,
            Inbound::UserConnected { .. } | Inbound::Buzz => role == Role::User,
        }
    }
}

/// The override flag arrives either as a bare boolean payload or as
/// `{"override": bool}`. Anything else means no override.
fn override_flag(data: &Value) -> bool {
    match data {
        Value::Bool(b) => *b,
        Value::Object(map) => map.get("override").and_then(Value::as_bool).unwrap_or(false),
        _ => false,
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Read-only view of the session, broadcast as `current-state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub active: bool,
    pub users: Vec<UserName>,
    pub buzzes: Vec<UserName>,
}

/// A server → participant event. Serializes to the same envelope shape as
/// [`Inbound`] frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum Outbound {
    CurrentState(SessionSnapshot),
    BuzzerActivated,
    BuzzerDeactivated,
    CountdownStarted { sec: u64, action: String },
    EventRestarted,
    UserJoined(UserName),
    UserBuzzed(UserName),
}

impl Outbound {
    /// Wire name of this event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Outbound::CurrentState(_) => "current-state",
            Outbound::BuzzerActivated => "buzzer-activated",
            Outbound::BuzzerDeactivated => "buzzer-deactivated",
            Outbound::CountdownStarted { .. } => "countdown-started",
            Outbound::EventRestarted => "event-restarted",
            Outbound::UserJoined(_) => "user-joined",
            Outbound::UserBuzzed(_) => "user-buzzed",
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
