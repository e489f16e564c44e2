use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reporter id recorded on incidents produced by the simulation loop
pub const SYSTEM_REPORTER: &str = "system";

/// Incident status counted towards `Stats::active_incidents`
pub const ACTIVE_STATUS: &str = "active";

/// A tourist known to the relay (created on first tourist auth)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tourist {
    pub id: String,

    /// Display name supplied at auth time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// active / inactive / emergency by convention; never validated
    pub status: String,

    pub last_seen: DateTime<Utc>,

    /// Most recent activity report, overwritten on each report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<Activity>,

    /// Null until the first location report
    pub location: Option<Location>,

    /// Ids of incidents filed by this tourist, oldest first
    #[serde(default)]
    pub incidents: Vec<String>,

    /// Fields merged in by admins that have no typed slot
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Tourist {
    pub fn new(id: String, username: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            username,
            status: ACTIVE_STATUS.to_string(),
            last_seen: now,
            last_activity: None,
            location: None,
            incidents: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// Last activity reported by a tourist
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default)]
    pub activity: Value,
    #[serde(default)]
    pub details: Value,
    pub timestamp: DateTime<Utc>,
}

/// Geographic position of a tourist
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// An incident reported by a tourist or synthesized by the simulation loop
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub incident_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// active -> in_progress -> resolved by convention; never validated
    pub status: String,

    /// Tourist id, or `SYSTEM_REPORTER` for simulated incidents
    pub reported_by: String,

    pub reported_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fields a caller supplies when filing a new incident
#[derive(Clone, Debug, Default)]
pub struct NewIncident {
    pub incident_type: Option<String>,
    pub description: Option<String>,
    pub severity: Option<String>,
    pub location: Option<String>,
}

/// A system alert (ring buffer entry)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Derived dashboard statistics
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub active_tourists: usize,
    pub active_incidents: usize,
    pub reports_today: usize,
    pub safety_score: u32,
}

impl Stats {
    /// Stats shown before the first mutation
    pub fn initial(safety_score: u32) -> Self {
        Self {
            active_tourists: 0,
            active_incidents: 0,
            reports_today: 0,
            safety_score,
        }
    }

    /// `max(50, 100 - 5 * active_incidents)`
    pub fn safety_score_for(active_incidents: usize) -> u32 {
        let penalty = active_incidents.saturating_mul(5).min(50) as u32;
        100 - penalty
    }
}

/// Full state snapshot sent to an admin on auth
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSnapshot {
    pub tourists: Vec<Tourist>,
    pub incidents: Vec<Incident>,
    pub system_alerts: Vec<Alert>,
    pub stats: Stats,
}
