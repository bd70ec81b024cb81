//! Session state machine — pure transition logic.
//!
//! DESIGN
//! ======
//! Every inbound event maps to a transition function: current state + event
//! in, mutations + a list of outgoing events out. Functions here never touch
//! sockets or channels — the dispatch layer in `routes::ws` owns delivery —
//! so the whole protocol is testable without a live transport.
//!
//! Role admission also lives here: an event arriving on a channel whose
//! endpoint does not accept it is rejected without state change.

use tracing::{info, warn};

use crate::event::{Inbound, Outbound, ProtocolError, Role, UserName};
use crate::state::SessionState;

// =============================================================================
// OUTGOING
// =============================================================================

/// Who receives an outgoing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// The originating connection only.
    Caller,
    /// Every current member of one channel.
    Channel(Role),
    /// Host, user, and board channels.
    All,
}

/// One event plus its audience. Transition functions return these; the
/// dispatch layer delivers them.
#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub to: Audience,
    pub event: Outbound,
}

impl Outgoing {
    fn caller(event: Outbound) -> Self {
        Self { to: Audience::Caller, event }
    }

    fn channel(role: Role, event: Outbound) -> Self {
        Self { to: Audience::Channel(role), event }
    }

    fn all(event: Outbound) -> Self {
        Self { to: Audience::All, event }
    }
}

// =============================================================================
// CONNECTION LIFECYCLE
// =============================================================================

/// Connect-time sync. The host gets a private snapshot; a board connection
/// refreshes the whole board channel so every display converges; users stay
/// silent until they identify.
#[must_use]
pub fn connected(session: &SessionState, role: Role) -> Vec<Outgoing> {
    match role {
        Role::Host => vec![Outgoing::caller(Outbound::CurrentState(session.snapshot()))],
        Role::Board => vec![Outgoing::channel(Role::Board, Outbound::CurrentState(session.snapshot()))],
        Role::User => Vec::new(),
    }
}

/// User-channel disconnect: drop the first occurrence of the connection's
/// associated name, then sync the host channel. A connection that never
/// identified itself removes nothing.
#[must_use]
pub fn disconnected(session: &mut SessionState, user: Option<&str>) -> Vec<Outgoing> {
    if let Some(name) = user {
        if let Some(pos) = session.users.iter().position(|u| u == name) {
            session.users.remove(pos);
        }
        info!(name, "user disconnected");
    }
    vec![Outgoing::channel(Role::Host, Outbound::CurrentState(session.snapshot()))]
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Apply one inbound event. `user` is the connection's associated name slot,
/// written once by the first `user-connected` event.
///
/// # Errors
///
/// Returns [`ProtocolError::NotAllowed`] when the sending channel's endpoint
/// does not accept the event; the session is left untouched.
pub fn apply(
    session: &mut SessionState,
    role: Role,
    user: &mut Option<UserName>,
    event: Inbound,
) -> Result<Vec<Outgoing>, ProtocolError> {
    if !event.allowed_from(role) {
        return Err(ProtocolError::NotAllowed { event: event.name(), role });
    }

    Ok(match event {
        Inbound::ActivateBuzzer { force } => activate_buzzer(session, force),
        Inbound::DeactivateBuzzer { force } => deactivate_buzzer(session, force),
        Inbound::StartCountdown { sec, action } => start_countdown(session, sec, action),
        Inbound::RestartEvent => restart_event(session),
        Inbound::UserConnected { name } => user_connected(session, user, name),
        Inbound::Buzz => buzz(session, user.as_deref()),
    })
}

// =============================================================================
// TRANSITIONS
// =============================================================================

/// Idempotent unless forced: a second activation without override is a
/// silent no-op. Every transition into active starts a fresh buzz list.
fn activate_buzzer(session: &mut SessionState, force: bool) -> Vec<Outgoing> {
    if session.active && !force {
        return Vec::new();
    }
    info!("activating buzzer");
    session.buzzes.clear();
    session.active = true;
    vec![Outgoing::all(Outbound::BuzzerActivated)]
}

fn deactivate_buzzer(session: &mut SessionState, force: bool) -> Vec<Outgoing> {
    if !session.active && !force {
        return Vec::new();
    }
    info!("deactivating buzzer");
    session.active = false;
    vec![Outgoing::all(Outbound::BuzzerDeactivated)]
}

/// Announce a client-side countdown. When the countdown ends in activation
/// the buzzer is held inactive until then; any other action leaves it live.
/// Buzzes are not reset — that happens on the activation itself.
fn start_countdown(session: &mut SessionState, sec: u64, action: String) -> Vec<Outgoing> {
    info!(sec, action = %action, "starting countdown");
    session.active = action != "activate-buzzer";
    vec![Outgoing::all(Outbound::CountdownStarted { sec, action })]
}

fn restart_event(session: &mut SessionState) -> Vec<Outgoing> {
    info!("restarting event");
    session.active = false;
    session.users.clear();
    session.buzzes.clear();
    vec![Outgoing::all(Outbound::EventRestarted)]
}

fn user_connected(session: &mut SessionState, user: &mut Option<UserName>, name: UserName) -> Vec<Outgoing> {
    info!(name = %name, "user connected");
    session.users.push(name.clone());
    // First identification wins for this connection.
    user.get_or_insert_with(|| name.clone());
    vec![Outgoing::channel(Role::Host, Outbound::UserJoined(name))]
}

/// A buzz only counts while the buzzer is active and the connection has
/// identified itself; everything else is logged and absorbed.
fn buzz(session: &mut SessionState, user: Option<&str>) -> Vec<Outgoing> {
    let Some(name) = user else {
        warn!("buzz from unidentified connection ignored");
        return Vec::new();
    };
    if !session.active {
        info!(name, "inactive buzz ignored");
        return Vec::new();
    }
    info!(name, "buzz");
    session.buzzes.push(name.to_owned());
    vec![
        Outgoing::channel(Role::Host, Outbound::UserBuzzed(name.to_owned())),
        Outgoing::channel(Role::Board, Outbound::UserBuzzed(name.to_owned())),
    ]
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
