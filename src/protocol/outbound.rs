use crate::registry::Role;
use crate::state::{AdminSnapshot, Alert, Incident, Location, Stats, Tourist};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Server → Client message types
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    AuthSuccess {
        role: Role,
        /// Full snapshot, admins only
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<AdminSnapshot>,
    },
    Error {
        message: String,
    },
    TouristJoined {
        tourist: Tourist,
    },
    TouristActivity {
        #[serde(rename = "touristId")]
        tourist_id: String,
        activity: Value,
        details: Value,
        timestamp: DateTime<Utc>,
    },
    NewIncident {
        incident: Incident,
    },
    IncidentCreated {
        incident: Incident,
    },
    IncidentUpdated {
        incident: Incident,
    },
    TouristUpdated {
        tourist: Tourist,
    },
    LocationUpdate {
        #[serde(rename = "touristId")]
        tourist_id: String,
        location: Location,
    },
    SystemAlert {
        alert: Alert,
    },
    EmergencyBroadcast(EmergencyNotice),
    EmergencyBroadcastSent(EmergencyNotice),
    StatsUpdate {
        stats: Stats,
    },
}

/// Body of an emergency broadcast (sent to tourists, acknowledged to admins)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmergencyNotice {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub priority: String,
    pub timestamp: DateTime<Utc>,
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Serialize once; the result is shared by every recipient of a fan-out
    pub fn encode(&self) -> Result<Arc<str>, serde_json::Error> {
        serde_json::to_string(self).map(Arc::from)
    }

    /// Wire name of this message type
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::AuthSuccess { .. } => "auth_success",
            ServerMessage::Error { .. } => "error",
            ServerMessage::TouristJoined { .. } => "tourist_joined",
            ServerMessage::TouristActivity { .. } => "tourist_activity",
            ServerMessage::NewIncident { .. } => "new_incident",
            ServerMessage::IncidentCreated { .. } => "incident_created",
            ServerMessage::IncidentUpdated { .. } => "incident_updated",
            ServerMessage::TouristUpdated { .. } => "tourist_updated",
            ServerMessage::LocationUpdate { .. } => "location_update",
            ServerMessage::SystemAlert { .. } => "system_alert",
            ServerMessage::EmergencyBroadcast(_) => "emergency_broadcast",
            ServerMessage::EmergencyBroadcastSent(_) => "emergency_broadcast_sent",
            ServerMessage::StatsUpdate { .. } => "stats_update",
        }
    }
}
