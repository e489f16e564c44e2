use super::{ConnectionId, ConnectionRegistry, Role};
use crate::protocol::ServerMessage;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, warn};

/// Outcome of one fan-out call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Queued for the socket writer
    pub delivered: usize,
    /// Recipient queue full, message skipped for that recipient
    pub dropped: usize,
    /// Recipient already gone, unregistered after the fan-out
    pub closed: usize,
}

impl ConnectionRegistry {
    pub fn broadcast_to_admins(&mut self, message: &ServerMessage) -> Delivery {
        self.broadcast(Role::Admin, message)
    }

    pub fn broadcast_to_tourists(&mut self, message: &ServerMessage) -> Delivery {
        self.broadcast(Role::Tourist, message)
    }

    /// Serialize once and queue the same bytes for every member of `role`.
    ///
    /// Best effort: a full or closed recipient never blocks the others.
    pub fn broadcast(&mut self, role: Role, message: &ServerMessage) -> Delivery {
        let payload = match message.encode() {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, kind = message.kind(), "Failed to serialize broadcast");
                return Delivery::default();
            }
        };

        let mut delivery = Delivery::default();
        let mut stale = Vec::new();

        for (id, outbound) in self.audience(role) {
            match outbound.try_send(Arc::clone(&payload)) {
                Ok(()) => delivery.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(connection_id = %id, kind = message.kind(), "Outbound queue full, message dropped");
                    delivery.dropped += 1;
                }
                Err(TrySendError::Closed(_)) => {
                    stale.push(id);
                    delivery.closed += 1;
                }
            }
        }

        for id in stale {
            self.unregister(id);
        }

        debug!(
            role = ?role,
            kind = message.kind(),
            delivered = delivery.delivered,
            dropped = delivery.dropped,
            closed = delivery.closed,
            "Broadcast complete"
        );

        delivery
    }

    /// Queue a message for a single connection (anonymous ones included)
    pub fn send_to(&mut self, id: ConnectionId, message: &ServerMessage) -> bool {
        let Some(connection) = self.connections.get(&id) else {
            return false;
        };

        let payload = match message.encode() {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, kind = message.kind(), "Failed to serialize message");
                return false;
            }
        };

        match connection.outbound.try_send(payload) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(connection_id = %id, kind = message.kind(), "Outbound queue full, message dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.unregister(id);
                false
            }
        }
    }
}
