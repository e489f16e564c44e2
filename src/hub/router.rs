use super::Hub;
use crate::protocol::{
    ActivityMessage, AdminAction, AdminActionMessage, AuthMessage, ClientMessage,
    CreateIncidentMessage, EmergencyNotice, LocationUpdateMessage, ServerMessage,
    UpdateIncidentMessage,
};
use crate::registry::{ConnectionId, Identity, Role};
use crate::state::StoreError;
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

impl Hub {
    /// Route one inbound frame.
    ///
    /// Malformed frames and unknown types get an `error` envelope on the same
    /// connection. Everything else fails open: unmet preconditions and
    /// unknown ids are logged and dropped.
    pub fn handle_text(&mut self, id: ConnectionId, text: &str) {
        let message = match ClientMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(connection_id = %id, error = %e, "Rejected client message");
                self.registry.send_to(id, &ServerMessage::error(e.to_string()));
                return;
            }
        };

        debug!(connection_id = %id, kind = message.kind(), "Client message");

        match message {
            ClientMessage::Auth(msg) => self.handle_auth(id, msg),
            ClientMessage::TouristActivity(msg) => self.handle_activity(id, msg),
            ClientMessage::CreateIncident(msg) => self.handle_create_incident(id, msg),
            ClientMessage::UpdateIncident(msg) => self.handle_update_incident(id, msg),
            ClientMessage::AdminAction(msg) => self.handle_admin_action(id, msg),
            ClientMessage::LocationUpdate(msg) => self.handle_location_update(id, msg),
        }
    }

    fn handle_auth(&mut self, id: ConnectionId, msg: AuthMessage) {
        let Some(role) = Role::parse(&msg.role) else {
            warn!(connection_id = %id, role = %msg.role, "Auth with unknown role ignored");
            return;
        };

        if !self
            .registry
            .register(id, role, msg.user_id.clone(), msg.username.clone())
        {
            debug!(connection_id = %id, "Auth from a connection that already closed");
            return;
        }

        info!(connection_id = %id, role = ?role, user_id = %msg.user_id, "Connection authenticated");

        match role {
            Role::Admin => {
                let data = self.store.snapshot();
                self.registry.send_to(
                    id,
                    &ServerMessage::AuthSuccess {
                        role,
                        data: Some(data),
                    },
                );
            }
            Role::Tourist => {
                let tourist = self.store.upsert_tourist(&msg.user_id, msg.username);
                self.registry
                    .send_to(id, &ServerMessage::AuthSuccess { role, data: None });
                self.registry
                    .broadcast_to_admins(&ServerMessage::TouristJoined { tourist });
                self.publish_stats();
            }
        }
    }

    fn handle_activity(&mut self, id: ConnectionId, msg: ActivityMessage) {
        let Some(identity) = self.authenticated(id, "tourist_activity") else {
            return;
        };

        match self
            .store
            .record_activity(&identity.user_id, msg.activity, msg.details)
        {
            Ok(activity) => {
                self.registry
                    .broadcast_to_admins(&ServerMessage::TouristActivity {
                        tourist_id: identity.user_id,
                        activity: activity.activity,
                        details: activity.details,
                        timestamp: activity.timestamp,
                    });
            }
            Err(e) => debug!(connection_id = %id, error = %e, "Activity ignored"),
        }
    }

    fn handle_create_incident(&mut self, id: ConnectionId, msg: CreateIncidentMessage) {
        let Some(identity) = self.authenticated(id, "create_incident") else {
            return;
        };

        let incident = self.store.create_incident(&identity.user_id, msg.into());

        let announcement = ServerMessage::NewIncident {
            incident: incident.clone(),
        };
        self.registry.broadcast_to_admins(&announcement);
        self.registry.broadcast_to_tourists(&announcement);
        self.registry
            .send_to(id, &ServerMessage::IncidentCreated { incident });
        self.publish_stats();
    }

    fn handle_update_incident(&mut self, id: ConnectionId, msg: UpdateIncidentMessage) {
        let updates = msg.updates.unwrap_or_default();

        match self.store.update_incident(&msg.incident_id, &updates) {
            Ok(incident) => {
                info!(
                    connection_id = %id,
                    incident_id = %incident.id,
                    status = %incident.status,
                    "Incident updated"
                );
                let message = ServerMessage::IncidentUpdated { incident };
                self.registry.broadcast_to_admins(&message);
                self.registry.broadcast_to_tourists(&message);
                self.publish_stats();
            }
            Err(StoreError::UnknownIncident(incident_id)) => {
                debug!(connection_id = %id, incident_id = %incident_id, "Update for unknown incident ignored");
            }
            Err(e) => warn!(connection_id = %id, error = %e, "Incident update rejected"),
        }
    }

    fn handle_admin_action(&mut self, id: ConnectionId, msg: AdminActionMessage) {
        let Some(identity) = self.authenticated(id, "admin_action") else {
            return;
        };
        if identity.role != Role::Admin {
            warn!(connection_id = %id, user_id = %identity.user_id, "Admin action from non-admin ignored");
            return;
        }

        match msg.into_action() {
            AdminAction::SendAlert {
                alert_type,
                message,
            } => self.send_alert(alert_type, message),
            AdminAction::UpdateTouristStatus {
                tourist_id,
                updates,
            } => self.update_tourist_status(id, tourist_id, updates),
            AdminAction::EmergencyBroadcast { message } => self.emergency_broadcast(message),
            AdminAction::Unknown(action) => {
                warn!(connection_id = %id, action = %action, "Unknown admin action ignored");
            }
        }
    }

    fn update_tourist_status(
        &mut self,
        id: ConnectionId,
        tourist_id: Option<String>,
        updates: Map<String, Value>,
    ) {
        let Some(tourist_id) = tourist_id else {
            debug!(connection_id = %id, "Tourist status update without target ignored");
            return;
        };

        match self.store.update_tourist(&tourist_id, &updates) {
            Ok(tourist) => {
                self.registry
                    .broadcast_to_admins(&ServerMessage::TouristUpdated { tourist });
            }
            Err(StoreError::UnknownTourist(_)) => {
                debug!(connection_id = %id, tourist_id = %tourist_id, "Status update for unknown tourist ignored");
            }
            Err(e) => warn!(connection_id = %id, error = %e, "Tourist update rejected"),
        }
    }

    fn emergency_broadcast(&mut self, message: Option<String>) {
        let notice = EmergencyNotice {
            id: Uuid::new_v4().to_string(),
            message,
            priority: "emergency".to_string(),
            timestamp: Utc::now(),
        };

        warn!(broadcast_id = %notice.id, "Emergency broadcast");

        self.registry
            .broadcast_to_tourists(&ServerMessage::EmergencyBroadcast(notice.clone()));
        self.registry
            .broadcast_to_admins(&ServerMessage::EmergencyBroadcastSent(notice));
    }

    fn handle_location_update(&mut self, id: ConnectionId, msg: LocationUpdateMessage) {
        let Some(identity) = self.authenticated(id, "location_update") else {
            return;
        };

        match self.store.update_location(
            &identity.user_id,
            msg.latitude,
            msg.longitude,
            msg.accuracy,
        ) {
            Ok(location) => {
                self.registry
                    .broadcast_to_admins(&ServerMessage::LocationUpdate {
                        tourist_id: identity.user_id,
                        location,
                    });
            }
            Err(e) => debug!(connection_id = %id, error = %e, "Location update ignored"),
        }
    }

    /// Identity of an authenticated connection, or None (logged) if anonymous
    fn authenticated(&self, id: ConnectionId, kind: &str) -> Option<Identity> {
        let identity = self.registry.identity(id).cloned();
        if identity.is_none() {
            debug!(connection_id = %id, kind = %kind, "Message before auth ignored");
        }
        identity
    }
}
