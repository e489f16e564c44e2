use crate::state::NewIncident;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// Client → Server: identify the connection
#[derive(Debug, Clone, Deserialize)]
pub struct AuthMessage {
    /// "admin" or "tourist"; anything else is ignored
    pub role: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Client → Server: tourist activity report
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityMessage {
    #[serde(default)]
    pub activity: Value,
    #[serde(default)]
    pub details: Value,
}

/// Client → Server: file a new incident.
///
/// The incident's own type travels as `incidentType` because `type` is the
/// envelope discriminator.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateIncidentMessage {
    #[serde(rename = "incidentType", default)]
    pub incident_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl From<CreateIncidentMessage> for NewIncident {
    fn from(msg: CreateIncidentMessage) -> Self {
        Self {
            incident_type: msg.incident_type,
            description: msg.description,
            severity: msg.severity,
            location: msg.location,
        }
    }
}

/// Client → Server: merge fields into an existing incident
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateIncidentMessage {
    #[serde(rename = "incidentId")]
    pub incident_id: String,
    #[serde(default)]
    pub updates: Option<Map<String, Value>>,
}

/// Client → Server: admin dashboard action
#[derive(Debug, Clone, Deserialize)]
pub struct AdminActionMessage {
    pub action: String,
    #[serde(rename = "targetId", default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub details: Option<Map<String, Value>>,
}

/// Typed view of an `admin_action` envelope
#[derive(Debug, Clone, PartialEq)]
pub enum AdminAction {
    SendAlert {
        alert_type: String,
        message: Option<String>,
    },
    UpdateTouristStatus {
        tourist_id: Option<String>,
        updates: Map<String, Value>,
    },
    EmergencyBroadcast {
        message: Option<String>,
    },
    /// Unrecognized nested action (ignored by the hub)
    Unknown(String),
}

impl AdminActionMessage {
    pub fn into_action(self) -> AdminAction {
        let details = self.details.unwrap_or_default();

        match self.action.as_str() {
            "send_alert" => AdminAction::SendAlert {
                alert_type: detail_text(&details, "type")
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "info".to_string()),
                message: detail_text(&details, "message"),
            },
            "emergency_broadcast" => AdminAction::EmergencyBroadcast {
                message: detail_text(&details, "message"),
            },
            "update_tourist_status" => AdminAction::UpdateTouristStatus {
                tourist_id: self.target_id,
                updates: details,
            },
            _ => AdminAction::Unknown(self.action.clone()),
        }
    }
}

fn detail_text(details: &Map<String, Value>, key: &str) -> Option<String> {
    details.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Client → Server: tourist position report
#[derive(Debug, Clone, Deserialize)]
pub struct LocationUpdateMessage {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

/// Client → Server message types
#[derive(Debug, Clone)]
pub enum ClientMessage {
    Auth(AuthMessage),
    TouristActivity(ActivityMessage),
    CreateIncident(CreateIncidentMessage),
    UpdateIncident(UpdateIncidentMessage),
    AdminAction(AdminActionMessage),
    LocationUpdate(LocationUpdateMessage),
}

impl ClientMessage {
    /// Decode one inbound text frame.
    ///
    /// The `type` discriminator is checked before the body so that an
    /// unknown type and a malformed body produce different errors.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text).map_err(|_| ProtocolError::InvalidFormat)?;

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::InvalidFormat)?
            .to_string();

        match kind.as_str() {
            "auth" => decode(&kind, value).map(ClientMessage::Auth),
            "tourist_activity" => decode(&kind, value).map(ClientMessage::TouristActivity),
            "create_incident" => decode(&kind, value).map(ClientMessage::CreateIncident),
            "update_incident" => decode(&kind, value).map(ClientMessage::UpdateIncident),
            "admin_action" => decode(&kind, value).map(ClientMessage::AdminAction),
            "location_update" => decode(&kind, value).map(ClientMessage::LocationUpdate),
            _ => Err(ProtocolError::UnknownType(kind)),
        }
    }

    /// Wire name of this message type
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Auth(_) => "auth",
            ClientMessage::TouristActivity(_) => "tourist_activity",
            ClientMessage::CreateIncident(_) => "create_incident",
            ClientMessage::UpdateIncident(_) => "update_incident",
            ClientMessage::AdminAction(_) => "admin_action",
            ClientMessage::LocationUpdate(_) => "location_update",
        }
    }
}

fn decode<T: DeserializeOwned>(kind: &str, value: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(|e| ProtocolError::InvalidShape {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

/// Inbound decoding errors, reported back to the sending connection only
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// Not JSON, not an object, or no string `type`
    InvalidFormat,
    /// `type` is not one the relay handles
    UnknownType(String),
    /// Recognized `type` but the body does not fit it
    InvalidShape { kind: String, reason: String },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::InvalidFormat => write!(f, "Invalid message format"),
            ProtocolError::UnknownType(_) => write!(f, "Unknown message type"),
            ProtocolError::InvalidShape { kind, reason } => {
                write!(f, "Invalid {} message: {}", kind, reason)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}
