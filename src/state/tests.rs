use super::*;
use serde_json::{json, Map, Value};

fn store() -> StateStore {
    StateStore::new(50, 94)
}

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn theft() -> NewIncident {
    NewIncident {
        incident_type: Some("Theft Report".to_string()),
        description: Some("Bag taken near the pier".to_string()),
        severity: Some("High".to_string()),
        location: Some("Beach Area".to_string()),
    }
}

#[test]
fn test_initial_stats_are_not_derived() {
    let store = store();
    assert_eq!(store.stats(), Stats::initial(94));
    assert_eq!(store.stats().safety_score, 94);
}

#[test]
fn test_upsert_creates_active_tourist() {
    let mut store = store();
    let tourist = store.upsert_tourist("T1", Some("Ana".to_string()));

    assert_eq!(tourist.id, "T1");
    assert_eq!(tourist.status, "active");
    assert!(tourist.location.is_none());
    assert!(tourist.incidents.is_empty());
    assert_eq!(store.tourist_count(), 1);
}

/// Current contract: re-authenticating with the same tourist id overwrites the
/// record and discards its incident history. Pinned here so a change is deliberate.
#[test]
fn test_reauth_resets_incident_list() {
    let mut store = store();
    store.upsert_tourist("T1", None);
    let incident = store.create_incident("T1", theft());
    assert_eq!(store.tourist("T1").unwrap().incidents, vec![incident.id.clone()]);

    store.upsert_tourist("T1", None);
    assert!(store.tourist("T1").unwrap().incidents.is_empty());

    // The incident itself survives
    assert!(store.incident(&incident.id).is_some());
}

#[test]
fn test_create_incident_for_unknown_reporter() {
    let mut store = store();
    let incident = store.create_incident(SYSTEM_REPORTER, theft());

    assert_eq!(incident.status, "active");
    assert_eq!(incident.reported_by, "system");
    assert_eq!(incident.reported_at, incident.updated_at);
    assert_eq!(store.incident_count(), 1);
}

#[test]
fn test_incident_ids_are_unique() {
    let mut store = store();
    let a = store.create_incident("T1", NewIncident::default());
    let b = store.create_incident("T1", NewIncident::default());
    assert_ne!(a.id, b.id);
}

#[test]
fn test_update_incident_reflects_latest_merge() {
    let mut store = store();
    let incident = store.create_incident("T1", theft());

    let mut last = incident.updated_at;
    for status in ["in_progress", "resolved", "active"] {
        let updated = store
            .update_incident(&incident.id, &fields(json!({ "status": status })))
            .unwrap();
        assert_eq!(updated.status, status);
        assert!(updated.updated_at > last);
        last = updated.updated_at;
    }

    let stored = store.incident(&incident.id).unwrap();
    assert_eq!(stored.status, "active");
    assert_eq!(stored.updated_at, last);
}

#[test]
fn test_update_incident_accepts_arbitrary_keys() {
    let mut store = store();
    let incident = store.create_incident("T1", theft());

    let updated = store
        .update_incident(
            &incident.id,
            &fields(json!({ "assignedTo": "unit-7", "severity": "Low" })),
        )
        .unwrap();

    assert_eq!(updated.severity.as_deref(), Some("Low"));
    assert_eq!(updated.extra.get("assignedTo"), Some(&json!("unit-7")));
}

#[test]
fn test_update_incident_ignores_client_timestamps() {
    let mut store = store();
    let incident = store.create_incident("T1", theft());
    let before = chrono::Utc::now();

    let updated = store
        .update_incident(
            &incident.id,
            &fields(json!({
                "status": "in_progress",
                "updatedAt": "2099-01-01T00:00:00Z",
                "reportedAt": "2099-01-01T00:00:00Z",
                "reportedBy": "someone-else"
            })),
        )
        .unwrap();

    assert_eq!(updated.status, "in_progress");
    assert!(updated.updated_at > incident.updated_at);
    assert!(updated.updated_at < before + chrono::Duration::minutes(1));
    assert_eq!(updated.reported_at, incident.reported_at);
    assert_eq!(updated.reported_by, "T1");
    assert!(updated.extra.is_empty());

    // An unparsable timestamp does not sink the rest of the update
    let resolved = store
        .update_incident(
            &incident.id,
            &fields(json!({ "status": "resolved", "updatedAt": "not a date" })),
        )
        .unwrap();

    assert_eq!(resolved.status, "resolved");
    assert!(resolved.updated_at > updated.updated_at);
    assert_eq!(store.incident(&incident.id).unwrap().status, "resolved");
}

#[test]
fn test_update_unknown_incident_is_a_miss() {
    let mut store = store();
    let result = store.update_incident("missing", &fields(json!({ "status": "resolved" })));
    assert_eq!(result, Err(StoreError::UnknownIncident("missing".to_string())));
}

#[test]
fn test_rejected_merge_leaves_incident_untouched() {
    let mut store = store();
    let incident = store.create_incident("T1", theft());

    let result = store.update_incident(&incident.id, &fields(json!({ "status": null })));
    assert!(matches!(result, Err(StoreError::Merge(_))));
    assert_eq!(store.incident(&incident.id), Some(&incident));
}

#[test]
fn test_alert_ring_buffer_keeps_newest_fifty() {
    let mut store = store();
    let first = store.push_alert("info".to_string(), Some("alert 0".to_string()));

    for n in 1..=50 {
        store.push_alert("info".to_string(), Some(format!("alert {}", n)));
        assert!(store.alert_count() <= 50);
    }

    assert_eq!(store.alert_count(), 50);
    assert!(store.alerts().all(|a| a.id != first.id));
    assert_eq!(
        store.alerts().next().unwrap().message.as_deref(),
        Some("alert 50")
    );
}

#[test]
fn test_stats_count_only_exact_active_status() {
    let mut store = store();
    store.upsert_tourist("T1", None);
    let a = store.create_incident("T1", theft());
    let b = store.create_incident("T1", theft());
    store.create_incident("T1", theft());

    store
        .update_incident(&a.id, &fields(json!({ "status": "resolved" })))
        .unwrap();
    store
        .update_incident(&b.id, &fields(json!({ "status": "Active" })))
        .unwrap();

    let stats = store.recompute_stats();
    assert_eq!(stats.active_tourists, 1);
    assert_eq!(stats.active_incidents, 1);
    assert_eq!(stats.reports_today, 3);
    assert_eq!(stats.safety_score, 95);
}

#[test]
fn test_safety_score_floor() {
    assert_eq!(Stats::safety_score_for(0), 100);
    assert_eq!(Stats::safety_score_for(3), 85);
    assert_eq!(Stats::safety_score_for(10), 50);
    assert_eq!(Stats::safety_score_for(25), 50);
}

#[test]
fn test_activity_and_location_touch_last_seen() {
    let mut store = store();
    let joined = store.upsert_tourist("T1", None).last_seen;

    let activity = store
        .record_activity("T1", json!("check_in"), json!({ "place": "museum" }))
        .unwrap();
    assert!(activity.timestamp >= joined);
    assert_eq!(
        store.tourist("T1").unwrap().last_activity.as_ref(),
        Some(&activity)
    );

    let location = store.update_location("T1", 15.5, 73.8, Some(12.0)).unwrap();
    let tourist = store.tourist("T1").unwrap();
    assert_eq!(tourist.location.as_ref(), Some(&location));
    assert_eq!(tourist.last_seen, location.timestamp);
}

#[test]
fn test_activity_for_unknown_tourist_is_a_miss() {
    let mut store = store();
    assert!(matches!(
        store.record_activity("ghost", Value::Null, Value::Null),
        Err(StoreError::UnknownTourist(_))
    ));
    assert!(matches!(
        store.update_location("ghost", 0.0, 0.0, None),
        Err(StoreError::UnknownTourist(_))
    ));
}

#[test]
fn test_update_tourist_status() {
    let mut store = store();
    store.upsert_tourist("T1", Some("Ana".to_string()));

    let updated = store
        .update_tourist("T1", &fields(json!({ "status": "emergency" })))
        .unwrap();
    assert_eq!(updated.status, "emergency");
    assert_eq!(store.tourist("T1").unwrap().status, "emergency");

    assert!(matches!(
        store.update_tourist("T9", &fields(json!({ "status": "inactive" }))),
        Err(StoreError::UnknownTourist(_))
    ));
}

#[test]
fn test_jitter_only_touches_located_tourists() {
    let mut store = store();
    store.upsert_tourist("T1", None);
    store.upsert_tourist("T2", None);
    store.update_location("T1", 10.0, 20.0, None).unwrap();

    let moved = store.jitter_locations(|loc| Location {
        latitude: loc.latitude + 1.0,
        longitude: loc.longitude - 1.0,
        accuracy: Some(15.0),
        timestamp: loc.timestamp,
    });

    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].0, "T1");
    let location = store.tourist("T1").unwrap().location.clone().unwrap();
    assert_eq!(location.latitude, 11.0);
    assert_eq!(location.longitude, 19.0);
    assert!(store.tourist("T2").unwrap().location.is_none());
}

#[test]
fn test_snapshot_carries_everything() {
    let mut store = store();
    store.upsert_tourist("T1", None);
    store.create_incident("T1", theft());
    store.push_alert("warning".to_string(), Some("crowded".to_string()));
    store.recompute_stats();

    let snapshot = store.snapshot();
    assert_eq!(snapshot.tourists.len(), 1);
    assert_eq!(snapshot.incidents.len(), 1);
    assert_eq!(snapshot.system_alerts.len(), 1);
    assert_eq!(snapshot.stats.active_incidents, 1);

    let encoded = serde_json::to_value(&snapshot).unwrap();
    assert!(encoded.get("systemAlerts").is_some());
    assert_eq!(encoded["stats"]["safetyScore"], json!(95));
}
