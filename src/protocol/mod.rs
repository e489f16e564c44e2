// Wire protocol: one JSON object per WebSocket text frame, `type` discriminated

mod inbound;
mod outbound;

pub use inbound::{
    ActivityMessage, AdminAction, AdminActionMessage, AuthMessage, ClientMessage,
    CreateIncidentMessage, LocationUpdateMessage, ProtocolError, UpdateIncidentMessage,
};
pub use outbound::{EmergencyNotice, ServerMessage};

#[cfg(test)]
mod tests;
