use super::*;
use crate::registry::Role;
use crate::state::Stats;
use chrono::Utc;
use serde_json::{json, Value};

#[test]
fn test_parse_auth() {
    let msg = ClientMessage::parse(
        r#"{"type":"auth","role":"tourist","userId":"T1","username":"ana"}"#,
    )
    .unwrap();

    match msg {
        ClientMessage::Auth(auth) => {
            assert_eq!(auth.role, "tourist");
            assert_eq!(auth.user_id, "T1");
            assert_eq!(auth.username.as_deref(), Some("ana"));
        }
        other => panic!("unexpected message: {:?}", other),
    }
}

#[test]
fn test_invalid_json_is_invalid_format() {
    let err = ClientMessage::parse("{not json").unwrap_err();
    assert_eq!(err, ProtocolError::InvalidFormat);
    assert_eq!(err.to_string(), "Invalid message format");
}

#[test]
fn test_missing_or_non_string_type_is_invalid_format() {
    assert_eq!(
        ClientMessage::parse(r#"{"role":"admin"}"#).unwrap_err(),
        ProtocolError::InvalidFormat
    );
    assert_eq!(
        ClientMessage::parse(r#"{"type":5}"#).unwrap_err(),
        ProtocolError::InvalidFormat
    );
    assert_eq!(
        ClientMessage::parse("[1,2,3]").unwrap_err(),
        ProtocolError::InvalidFormat
    );
}

#[test]
fn test_unknown_type() {
    let err = ClientMessage::parse(r#"{"type":"subscribe"}"#).unwrap_err();
    assert_eq!(err, ProtocolError::UnknownType("subscribe".to_string()));
    assert_eq!(err.to_string(), "Unknown message type");
}

#[test]
fn test_recognized_type_with_bad_body() {
    let err = ClientMessage::parse(r#"{"type":"location_update","latitude":"north"}"#).unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::InvalidShape { ref kind, .. } if kind == "location_update"
    ));
}

#[test]
fn test_create_incident_fields_are_optional() {
    let msg = ClientMessage::parse(r#"{"type":"create_incident"}"#).unwrap();
    assert_eq!(msg.kind(), "create_incident");

    let msg = ClientMessage::parse(
        r#"{"type":"create_incident","incidentType":"Theft Report","severity":"High","location":"Beach Area","description":"wallet"}"#,
    )
    .unwrap();
    let ClientMessage::CreateIncident(incident) = msg else {
        panic!("expected create_incident");
    };
    assert_eq!(incident.incident_type.as_deref(), Some("Theft Report"));
    assert_eq!(incident.location.as_deref(), Some("Beach Area"));
}

#[test]
fn test_admin_actions() {
    let parse_action = |text: &str| match ClientMessage::parse(text).unwrap() {
        ClientMessage::AdminAction(action) => action.into_action(),
        other => panic!("unexpected message: {:?}", other),
    };

    assert_eq!(
        parse_action(r#"{"type":"admin_action","action":"send_alert","targetId":null,"details":{"message":"Storm"}}"#),
        AdminAction::SendAlert {
            alert_type: "info".to_string(),
            message: Some("Storm".to_string()),
        }
    );

    assert_eq!(
        parse_action(r#"{"type":"admin_action","action":"send_alert","details":{"type":"","message":"Storm"}}"#),
        AdminAction::SendAlert {
            alert_type: "info".to_string(),
            message: Some("Storm".to_string()),
        }
    );

    assert_eq!(
        parse_action(r#"{"type":"admin_action","action":"send_alert","details":{"type":"warning"}}"#),
        AdminAction::SendAlert {
            alert_type: "warning".to_string(),
            message: None,
        }
    );

    assert_eq!(
        parse_action(r#"{"type":"admin_action","action":"emergency_broadcast","details":{"message":"Evacuate"}}"#),
        AdminAction::EmergencyBroadcast {
            message: Some("Evacuate".to_string()),
        }
    );

    let action = parse_action(
        r#"{"type":"admin_action","action":"update_tourist_status","targetId":"T1","details":{"status":"emergency"}}"#,
    );
    match action {
        AdminAction::UpdateTouristStatus { tourist_id, updates } => {
            assert_eq!(tourist_id.as_deref(), Some("T1"));
            assert_eq!(updates.get("status"), Some(&json!("emergency")));
        }
        other => panic!("unexpected action: {:?}", other),
    }

    assert_eq!(
        parse_action(r#"{"type":"admin_action","action":"reboot"}"#),
        AdminAction::Unknown("reboot".to_string())
    );
}

#[test]
fn test_outbound_envelope_is_flat() {
    let msg = ServerMessage::StatsUpdate {
        stats: Stats::initial(94),
    };
    let value: Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();

    assert_eq!(value["type"], "stats_update");
    assert_eq!(value["stats"]["activeTourists"], 0);
    assert_eq!(value["stats"]["safetyScore"], 94);
}

#[test]
fn test_emergency_envelopes_keep_their_type() {
    let notice = EmergencyNotice {
        id: "b1".to_string(),
        message: Some("Evacuate".to_string()),
        priority: "emergency".to_string(),
        timestamp: Utc::now(),
    };

    let sent: Value =
        serde_json::from_str(&ServerMessage::EmergencyBroadcastSent(notice.clone()).encode().unwrap())
            .unwrap();
    assert_eq!(sent["type"], "emergency_broadcast_sent");
    assert_eq!(sent["message"], "Evacuate");

    let broadcast: Value =
        serde_json::from_str(&ServerMessage::EmergencyBroadcast(notice).encode().unwrap()).unwrap();
    assert_eq!(broadcast["type"], "emergency_broadcast");
    assert_eq!(broadcast["priority"], "emergency");
}

#[test]
fn test_auth_success_data_only_for_admin() {
    let tourist: Value = serde_json::from_str(
        &ServerMessage::AuthSuccess {
            role: Role::Tourist,
            data: None,
        }
        .encode()
        .unwrap(),
    )
    .unwrap();

    assert_eq!(tourist, json!({"type": "auth_success", "role": "tourist"}));
}

#[test]
fn test_kind_matches_wire_type() {
    let msg = ServerMessage::error("boom");
    let value: Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
    assert_eq!(value["type"], msg.kind());
    assert_eq!(value["message"], "boom");
}
