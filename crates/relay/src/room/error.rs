use parlor_common::{protocol::ws::ProtocolError, text::normalize::UsernameError};
use thiserror::Error;

/// A rejected inbound event.
///
/// Rejections are reported only to the connection that caused them; the
/// `Display` text is the `message` of the `error` envelope it receives.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    InvalidUsername(#[from] UsernameError),

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("You have already joined the chat")]
    AlreadyJoined,

    #[error("You must join the chat first")]
    NotJoined,
}

impl ChatError {
    /// Stable label for logs and metrics.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Protocol(ProtocolError::MalformedPayload) => "malformed_payload",
            Self::Protocol(ProtocolError::UnknownMessageType(_)) => "unknown_message_type",
            Self::InvalidUsername(UsernameError::Empty) => "empty_username",
            Self::UsernameTaken => "username_taken",
            Self::AlreadyJoined => "already_joined",
            Self::NotJoined => "not_joined",
        }
    }
}
