// The room coordinator.
//
// One `Room` per process owns the connection registry. Each inbound event
// takes the registry lock, runs its lifecycle transition, and delivers the
// resulting envelopes before releasing it, so two events never interleave.
// Delivery only pushes onto unbounded channels and never waits on a socket.

mod broadcast;
mod error;
mod lifecycle;
mod registry;

pub use registry::{ConnectionId, OutboundFrame, OutboundSender};

use chrono::Utc;
use parlor_common::protocol::ws::ServerEnvelope;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::metrics;
use lifecycle::Effect;
use registry::{Registry, SessionState};

/// Response body of the online-users query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUsers {
    pub users: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Default)]
pub struct Room {
    registry: Mutex<Registry>,
}

impl Room {
    /// Register a ready connection. It starts unidentified.
    pub async fn accept(&self, outbound: OutboundSender) -> ConnectionId {
        let mut registry = self.registry.lock().await;
        let connection_id = registry.register(outbound);
        record_gauges(&registry);
        debug!(connection_id = %connection_id, "connection accepted");
        connection_id
    }

    /// Handle one inbound text or binary frame from `connection_id`.
    pub async fn handle_frame(&self, connection_id: ConnectionId, raw: &[u8]) {
        let started_at = Instant::now();
        let mut registry = self.registry.lock().await;

        let handled = lifecycle::handle_frame(&mut registry, connection_id, raw, now_ms());
        let is_error = handled.result.is_err();
        let effects = match handled.result {
            Ok(effects) => effects,
            Err(error) => {
                debug!(
                    connection_id = %connection_id,
                    event = handled.event,
                    code = error.code(),
                    "rejected inbound frame"
                );
                vec![Effect::Reply(ServerEnvelope::error(error.to_string()))]
            }
        };

        if handled.event == "join" && !is_error {
            if let Some(username) = registry.identity_of(connection_id) {
                info!(connection_id = %connection_id, username, "user joined");
            }
        }

        apply(&registry, connection_id, effects);
        record_gauges(&registry);
        drop(registry);

        let latency_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        metrics::record_ws_event(handled.event, is_error, latency_ms);
    }

    /// The transport behind `connection_id` closed. Idempotent.
    pub async fn close(&self, connection_id: ConnectionId) {
        let mut registry = self.registry.lock().await;
        let (previous, effects) = lifecycle::handle_close(&mut registry, connection_id, now_ms());

        match &previous {
            SessionState::Identified(username) => {
                info!(connection_id = %connection_id, username = %username, "user left");
            }
            SessionState::Unidentified => {
                debug!(connection_id = %connection_id, "unidentified connection closed");
            }
            SessionState::Closed => return,
        }

        apply(&registry, connection_id, effects);
        record_gauges(&registry);
    }

    /// Bound identities in join order.
    pub async fn list_users(&self) -> OnlineUsers {
        let users = self.registry.lock().await.snapshot();
        OnlineUsers { count: users.len(), users }
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.lock().await.connection_count()
    }
}

fn apply(registry: &Registry, connection_id: ConnectionId, effects: Vec<Effect>) {
    for effect in effects {
        match effect {
            Effect::Reply(envelope) => {
                broadcast::send_to(registry, connection_id, &envelope);
            }
            Effect::Broadcast { envelope, exclude } => {
                broadcast::broadcast(registry, &envelope, exclude);
            }
        }
    }
}

fn record_gauges(registry: &Registry) {
    metrics::set_room_occupancy(registry.connection_count(), registry.session_count());
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
