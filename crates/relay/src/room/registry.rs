// Connection registry: the bidirectional connection <-> identity mapping for one room.

use std::{collections::HashMap, fmt, sync::Arc};

use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A serialized envelope, shared between every recipient of one broadcast.
pub type OutboundFrame = Arc<str>;

/// Write side of a connection's transport. The socket task owns the receiver.
pub type OutboundSender = mpsc::UnboundedSender<OutboundFrame>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Where a connection sits in its lifecycle, as seen by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unidentified,
    Identified(String),
    /// Never registered, or already removed.
    Closed,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("identity `{0}` is bound to another connection")]
    NameConflict(String),

    #[error("connection is already bound to `{0}`")]
    AlreadyBound(String),

    #[error("connection is not registered")]
    UnknownConnection,
}

#[derive(Debug)]
struct ConnectionEntry {
    outbound: OutboundSender,
    session: Option<Session>,
}

#[derive(Debug)]
struct Session {
    identity: String,
    bound_seq: u64,
}

/// Owns every connection in the room and the identities bound to them.
///
/// `connections[c].session.identity == i` holds exactly when
/// `identities[i] == c`; every mutating method preserves that.
#[derive(Debug, Default)]
pub struct Registry {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    identities: HashMap<String, ConnectionId>,
    next_bound_seq: u64,
}

impl Registry {
    /// Add a new, unidentified connection.
    pub fn register(&mut self, outbound: OutboundSender) -> ConnectionId {
        let connection_id = ConnectionId::generate();
        self.connections.insert(connection_id, ConnectionEntry { outbound, session: None });
        connection_id
    }

    /// Bind `identity` to `connection_id`.
    ///
    /// The check and the insert happen under one `&mut self` borrow, so the
    /// first caller to bind a free identity wins. Re-binding a connection to
    /// the identity it already holds is a no-op.
    pub fn bind(&mut self, connection_id: ConnectionId, identity: &str) -> Result<(), BindError> {
        let Some(entry) = self.connections.get_mut(&connection_id) else {
            return Err(BindError::UnknownConnection);
        };

        if let Some(session) = &entry.session {
            if session.identity == identity {
                return Ok(());
            }
            return Err(BindError::AlreadyBound(session.identity.clone()));
        }

        if self.identities.contains_key(identity) {
            return Err(BindError::NameConflict(identity.to_owned()));
        }

        let bound_seq = self.next_bound_seq;
        self.next_bound_seq += 1;
        entry.session = Some(Session { identity: identity.to_owned(), bound_seq });
        self.identities.insert(identity.to_owned(), connection_id);
        Ok(())
    }

    /// Release the identity bound to `connection_id`, if any.
    ///
    /// The connection stays registered. Returns the released identity.
    pub fn unbind(&mut self, connection_id: ConnectionId) -> Option<String> {
        let session = self.connections.get_mut(&connection_id)?.session.take()?;
        self.identities.remove(&session.identity);
        Some(session.identity)
    }

    /// Forget `connection_id` entirely and return the state it was in.
    pub fn remove(&mut self, connection_id: ConnectionId) -> SessionState {
        let Some(entry) = self.connections.remove(&connection_id) else {
            return SessionState::Closed;
        };

        match entry.session {
            Some(session) => {
                self.identities.remove(&session.identity);
                SessionState::Identified(session.identity)
            }
            None => SessionState::Unidentified,
        }
    }

    pub fn lookup(&self, identity: &str) -> Option<ConnectionId> {
        self.identities.get(identity).copied()
    }

    pub fn identity_of(&self, connection_id: ConnectionId) -> Option<&str> {
        self.connections
            .get(&connection_id)
            .and_then(|entry| entry.session.as_ref())
            .map(|session| session.identity.as_str())
    }

    pub fn state_of(&self, connection_id: ConnectionId) -> SessionState {
        match self.connections.get(&connection_id) {
            Some(ConnectionEntry { session: Some(session), .. }) => {
                SessionState::Identified(session.identity.clone())
            }
            Some(ConnectionEntry { session: None, .. }) => SessionState::Unidentified,
            None => SessionState::Closed,
        }
    }

    /// Bound identities in the order they were bound.
    pub fn snapshot(&self) -> Vec<String> {
        let mut sessions = self
            .connections
            .values()
            .filter_map(|entry| entry.session.as_ref())
            .collect::<Vec<_>>();
        sessions.sort_by_key(|session| session.bound_seq);
        sessions.into_iter().map(|session| session.identity.clone()).collect()
    }

    pub(crate) fn outbound(&self, connection_id: ConnectionId) -> Option<&OutboundSender> {
        self.connections.get(&connection_id).map(|entry| &entry.outbound)
    }

    /// Every registered connection except `exclude`.
    pub(crate) fn recipients(
        &self,
        exclude: Option<ConnectionId>,
    ) -> impl Iterator<Item = (ConnectionId, &OutboundSender)> + '_ {
        self.connections
            .iter()
            .filter(move |(connection_id, _)| Some(**connection_id) != exclude)
            .map(|(connection_id, entry)| (*connection_id, &entry.outbound))
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn session_count(&self) -> usize {
        self.identities.len()
    }
}
