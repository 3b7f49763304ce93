// Broadcast engine: serialize once, fan out to every ready connection.

use std::sync::Arc;

use parlor_common::protocol::ws::{encode_server_envelope, ServerEnvelope};
use tracing::{debug, warn};

use super::registry::{ConnectionId, OutboundFrame, Registry};
use crate::metrics;

/// How one fan-out went. Never surfaced to the author of the event.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeliveryReport {
    /// Frames queued on a live transport.
    pub(crate) delivered: usize,
    /// Connections whose transport was already gone.
    pub(crate) skipped: usize,
    /// Connections whose transport went away mid-send.
    pub(crate) failed: usize,
}

fn encode(envelope: &ServerEnvelope) -> Option<OutboundFrame> {
    match encode_server_envelope(envelope) {
        Ok(encoded) => Some(Arc::from(encoded)),
        Err(error) => {
            warn!(kind = envelope.kind(), error = %error, "failed to serialize envelope");
            None
        }
    }
}

/// Deliver `envelope` to every registered connection except `exclude`.
///
/// A failed send to one connection does not stop delivery to the rest.
/// Each connection has a single ordered channel, so frames sent to the same
/// connection arrive in the order they were broadcast.
pub(crate) fn broadcast(
    registry: &Registry,
    envelope: &ServerEnvelope,
    exclude: Option<ConnectionId>,
) -> DeliveryReport {
    let Some(frame) = encode(envelope) else {
        return DeliveryReport::default();
    };

    let mut report = DeliveryReport::default();
    for (connection_id, outbound) in registry.recipients(exclude) {
        if outbound.is_closed() {
            report.skipped += 1;
            continue;
        }

        match outbound.send(Arc::clone(&frame)) {
            Ok(()) => report.delivered += 1,
            Err(_) => {
                report.failed += 1;
                debug!(connection_id = %connection_id, kind = envelope.kind(), "dropped broadcast frame");
            }
        }
    }

    metrics::record_broadcast(envelope.kind(), report.delivered, report.skipped + report.failed);
    debug!(
        kind = envelope.kind(),
        recipients = report.delivered,
        skipped = report.skipped,
        failed = report.failed,
        "broadcast envelope"
    );
    report
}

/// Deliver `envelope` to one connection. Returns whether it was queued.
pub(crate) fn send_to(
    registry: &Registry,
    connection_id: ConnectionId,
    envelope: &ServerEnvelope,
) -> bool {
    let Some(outbound) = registry.outbound(connection_id) else {
        return false;
    };
    let Some(frame) = encode(envelope) else {
        return false;
    };

    if outbound.send(frame).is_err() {
        debug!(connection_id = %connection_id, kind = envelope.kind(), "dropped reply frame");
        return false;
    }
    true
}
