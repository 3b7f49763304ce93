// WebSocket envelope types for the parlor-chat.v1 protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const CURRENT_PROTOCOL_VERSION: &str = "parlor-chat.v1";

/// Type tags a client may send, in declaration order.
pub const INBOUND_MESSAGE_TYPES: &[&str] = &["join", "message", "ping"];

/// Type tags the relay may send, in declaration order.
pub const OUTBOUND_MESSAGE_TYPES: &[&str] =
    &["joined", "userJoined", "userLeft", "message", "pong", "error"];

/// Client -> Server envelopes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEnvelope {
    /// Claim a display name for this connection.
    Join { username: String },

    /// Chat text for everyone in the room.
    Message { message: String },

    /// Client-initiated heartbeat.
    Ping,
}

/// Server -> Client envelopes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEnvelope {
    /// Reply to the joining connection only.
    Joined { username: String, message: String, timestamp: i64 },

    /// Sent to everyone except the connection that joined.
    UserJoined { username: String, timestamp: i64 },

    /// Sent to everyone still connected after a participant leaves.
    UserLeft { username: String, timestamp: i64 },

    /// Chat text, delivered to every connection including its author.
    Message { username: String, message: String, timestamp: i64 },

    Pong,

    Error { message: String },
}

impl ServerEnvelope {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }

    /// The wire `type` tag of this envelope.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Joined { .. } => "joined",
            Self::UserJoined { .. } => "userJoined",
            Self::UserLeft { .. } => "userLeft",
            Self::Message { .. } => "message",
            Self::Pong => "pong",
            Self::Error { .. } => "error",
        }
    }
}

impl ClientEnvelope {
    /// The wire `type` tag of this envelope.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Message { .. } => "message",
            Self::Ping => "ping",
        }
    }
}

/// Why an inbound frame could not be turned into a [`ClientEnvelope`].
///
/// The `Display` text is what the relay sends back in an `error` envelope.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid message format")]
    MalformedPayload,

    #[error("Unknown message type")]
    UnknownMessageType(String),
}

/// Decode an inbound frame.
///
/// The `type` tag is checked before the variant body so that a well-formed
/// object with an unrecognized tag is reported as [`ProtocolError::UnknownMessageType`]
/// rather than as a malformed payload.
pub fn decode_client_envelope(raw: &[u8]) -> Result<ClientEnvelope, ProtocolError> {
    let value: Value =
        serde_json::from_slice(raw).map_err(|_| ProtocolError::MalformedPayload)?;

    let Some(tag) = value.get("type").and_then(Value::as_str) else {
        return Err(ProtocolError::MalformedPayload);
    };

    if !INBOUND_MESSAGE_TYPES.contains(&tag) {
        return Err(ProtocolError::UnknownMessageType(tag.to_owned()));
    }

    serde_json::from_value(value).map_err(|_| ProtocolError::MalformedPayload)
}

pub fn encode_server_envelope(envelope: &ServerEnvelope) -> Result<String, serde_json::Error> {
    serde_json::to_string(envelope)
}
