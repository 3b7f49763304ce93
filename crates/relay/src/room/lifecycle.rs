// Session lifecycle: Unidentified -> Identified -> Closed.
//
// Everything here is a pure transition over the registry. Functions return the
// envelopes to deliver and leave the delivery itself to the broadcast engine.

use parlor_common::{
    protocol::ws::{decode_client_envelope, ClientEnvelope, ServerEnvelope},
    text::normalize::{normalize_chat_text, normalize_username},
};

use super::error::ChatError;
use super::registry::{BindError, ConnectionId, Registry, SessionState};

/// Label used for frames that never decoded into an envelope.
pub(crate) const INVALID_EVENT: &str = "invalid";

/// A delivery requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Effect {
    /// Send to the connection whose event is being handled.
    Reply(ServerEnvelope),
    /// Send to every registered connection except `exclude`.
    Broadcast { envelope: ServerEnvelope, exclude: Option<ConnectionId> },
}

/// Result of handling one inbound frame.
#[derive(Debug)]
pub(crate) struct Handled {
    /// Envelope type tag, or [`INVALID_EVENT`].
    pub(crate) event: &'static str,
    pub(crate) result: Result<Vec<Effect>, ChatError>,
}

pub(crate) fn handle_frame(
    registry: &mut Registry,
    connection_id: ConnectionId,
    raw: &[u8],
    now_ms: i64,
) -> Handled {
    match decode_client_envelope(raw) {
        Ok(envelope) => Handled {
            event: envelope.kind(),
            result: handle_envelope(registry, connection_id, envelope, now_ms),
        },
        Err(error) => Handled { event: INVALID_EVENT, result: Err(error.into()) },
    }
}

pub(crate) fn handle_envelope(
    registry: &mut Registry,
    connection_id: ConnectionId,
    envelope: ClientEnvelope,
    now_ms: i64,
) -> Result<Vec<Effect>, ChatError> {
    match envelope {
        ClientEnvelope::Ping => Ok(vec![Effect::Reply(ServerEnvelope::Pong)]),
        ClientEnvelope::Join { username } => join(registry, connection_id, &username, now_ms),
        ClientEnvelope::Message { message } => chat(registry, connection_id, &message, now_ms),
    }
}

/// Remove a connection whose transport closed.
///
/// Returns the state the connection was in and, when it held an identity,
/// the `userLeft` broadcast for everyone still registered.
pub(crate) fn handle_close(
    registry: &mut Registry,
    connection_id: ConnectionId,
    now_ms: i64,
) -> (SessionState, Vec<Effect>) {
    let previous = registry.remove(connection_id);
    let effects = match &previous {
        SessionState::Identified(username) => vec![Effect::Broadcast {
            envelope: ServerEnvelope::UserLeft { username: username.clone(), timestamp: now_ms },
            exclude: None,
        }],
        SessionState::Unidentified | SessionState::Closed => Vec::new(),
    };
    (previous, effects)
}

fn join(
    registry: &mut Registry,
    connection_id: ConnectionId,
    requested: &str,
    now_ms: i64,
) -> Result<Vec<Effect>, ChatError> {
    match registry.state_of(connection_id) {
        SessionState::Unidentified => {}
        SessionState::Identified(_) => return Err(ChatError::AlreadyJoined),
        SessionState::Closed => return Ok(Vec::new()),
    }

    let username = normalize_username(requested)?;
    match registry.bind(connection_id, &username) {
        Ok(()) => {}
        Err(BindError::NameConflict(_)) => return Err(ChatError::UsernameTaken),
        Err(BindError::AlreadyBound(_)) => return Err(ChatError::AlreadyJoined),
        Err(BindError::UnknownConnection) => return Ok(Vec::new()),
    }

    Ok(vec![
        Effect::Reply(ServerEnvelope::Joined {
            message: format!("Welcome to the chat, {username}!"),
            username: username.clone(),
            timestamp: now_ms,
        }),
        Effect::Broadcast {
            envelope: ServerEnvelope::UserJoined { username, timestamp: now_ms },
            exclude: Some(connection_id),
        },
    ])
}

fn chat(
    registry: &Registry,
    connection_id: ConnectionId,
    text: &str,
    now_ms: i64,
) -> Result<Vec<Effect>, ChatError> {
    let username = match registry.state_of(connection_id) {
        SessionState::Identified(username) => username,
        SessionState::Unidentified => return Err(ChatError::NotJoined),
        SessionState::Closed => return Ok(Vec::new()),
    };

    // Blank chat text is dropped without telling anyone.
    let Some(text) = normalize_chat_text(text) else {
        return Ok(Vec::new());
    };

    // The author is not excluded: chat echoes back to its sender.
    Ok(vec![Effect::Broadcast {
        envelope: ServerEnvelope::Message {
            username,
            message: text.to_owned(),
            timestamp: now_ms,
        },
        exclude: None,
    }])
}
