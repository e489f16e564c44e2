use crate::state::entity::{
    Activity, AdminSnapshot, Alert, Incident, Location, NewIncident, Stats, Tourist, ACTIVE_STATUS,
};
use crate::state::merge::{merge_fields, MergeError};
use chrono::{DateTime, Duration, Local, Utc};
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

/// Incident fields only the relay writes; client updates carrying them are
/// applied without them
const SERVER_OWNED_INCIDENT_KEYS: &[&str] = &["reportedBy", "reportedAt", "updatedAt"];

/// Canonical in-process record of tourists, incidents, alerts and stats.
///
/// Owned by the hub task; every mutation runs to completion before the
/// next one starts, so no interior locking is needed.
pub struct StateStore {
    tourists: HashMap<String, Tourist>,
    incidents: HashMap<String, Incident>,

    /// Newest first, bounded by `max_alerts`
    alerts: VecDeque<Alert>,

    /// Last computed stats (only refreshed by `recompute_stats`)
    stats: Stats,

    max_alerts: usize,
}

impl StateStore {
    pub fn new(max_alerts: usize, initial_safety_score: u32) -> Self {
        Self {
            tourists: HashMap::new(),
            incidents: HashMap::new(),
            alerts: VecDeque::with_capacity(max_alerts),
            stats: Stats::initial(initial_safety_score),
            max_alerts,
        }
    }

    /// Create or overwrite a tourist record.
    ///
    /// Overwriting resets the record, including its `incidents` list.
    pub fn upsert_tourist(&mut self, id: &str, username: Option<String>) -> Tourist {
        let tourist = Tourist::new(id.to_string(), username, Utc::now());
        if self.tourists.insert(id.to_string(), tourist.clone()).is_some() {
            debug!(tourist_id = %id, "Tourist record overwritten on re-auth");
        }
        tourist
    }

    /// Record an activity report against a tourist
    pub fn record_activity(
        &mut self,
        tourist_id: &str,
        activity: Value,
        details: Value,
    ) -> Result<Activity, StoreError> {
        let tourist = self
            .tourists
            .get_mut(tourist_id)
            .ok_or_else(|| StoreError::UnknownTourist(tourist_id.to_string()))?;

        let now = Utc::now();
        let entry = Activity {
            activity,
            details,
            timestamp: now,
        };
        tourist.last_seen = now;
        tourist.last_activity = Some(entry.clone());
        Ok(entry)
    }

    /// Overwrite a tourist's location
    pub fn update_location(
        &mut self,
        tourist_id: &str,
        latitude: f64,
        longitude: f64,
        accuracy: Option<f64>,
    ) -> Result<Location, StoreError> {
        let tourist = self
            .tourists
            .get_mut(tourist_id)
            .ok_or_else(|| StoreError::UnknownTourist(tourist_id.to_string()))?;

        let now = Utc::now();
        let location = Location {
            latitude,
            longitude,
            accuracy,
            timestamp: now,
        };
        tourist.last_seen = now;
        tourist.location = Some(location.clone());
        Ok(location)
    }

    /// Rewrite the location of every tourist that has one.
    ///
    /// Returns the new locations keyed by tourist id.
    pub fn jitter_locations<F>(&mut self, mut relocate: F) -> Vec<(String, Location)>
    where
        F: FnMut(&Location) -> Location,
    {
        self.tourists
            .values_mut()
            .filter_map(|tourist| {
                let next = relocate(tourist.location.as_ref()?);
                tourist.location = Some(next.clone());
                Some((tourist.id.clone(), next))
            })
            .collect()
    }

    /// Merge admin-supplied fields into a tourist record
    pub fn update_tourist(
        &mut self,
        tourist_id: &str,
        updates: &Map<String, Value>,
    ) -> Result<Tourist, StoreError> {
        let current = self
            .tourists
            .get(tourist_id)
            .ok_or_else(|| StoreError::UnknownTourist(tourist_id.to_string()))?;

        let merged = merge_fields(current, updates)?;
        self.tourists.insert(tourist_id.to_string(), merged.clone());
        Ok(merged)
    }

    /// File a new incident with status "active".
    ///
    /// The id is appended to the reporter's `incidents` list when the
    /// reporter is a known tourist.
    pub fn create_incident(&mut self, reported_by: &str, fields: NewIncident) -> Incident {
        let now = Utc::now();
        let incident = Incident {
            id: Uuid::new_v4().to_string(),
            incident_type: fields.incident_type,
            description: fields.description,
            severity: fields.severity,
            location: fields.location,
            status: ACTIVE_STATUS.to_string(),
            reported_by: reported_by.to_string(),
            reported_at: now,
            updated_at: now,
            extra: Map::new(),
        };

        if let Some(tourist) = self.tourists.get_mut(reported_by) {
            tourist.incidents.push(incident.id.clone());
        }

        info!(
            incident_id = %incident.id,
            reported_by = %reported_by,
            "Incident created"
        );

        self.incidents.insert(incident.id.clone(), incident.clone());
        incident
    }

    /// Merge fields into an incident and refresh `updatedAt`
    pub fn update_incident(
        &mut self,
        incident_id: &str,
        updates: &Map<String, Value>,
    ) -> Result<Incident, StoreError> {
        let current = self
            .incidents
            .get(incident_id)
            .ok_or_else(|| StoreError::UnknownIncident(incident_id.to_string()))?;

        let updates: Map<String, Value> = updates
            .iter()
            .filter(|(key, _)| !SERVER_OWNED_INCIDENT_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let previous = current.updated_at;
        let mut merged = merge_fields(current, &updates)?;
        merged.updated_at = next_timestamp(previous);

        self.incidents.insert(incident_id.to_string(), merged.clone());
        Ok(merged)
    }

    /// Prepend an alert, dropping the oldest beyond `max_alerts`
    pub fn push_alert(&mut self, alert_type: String, message: Option<String>) -> Alert {
        let alert = Alert {
            id: Uuid::new_v4().to_string(),
            alert_type,
            message,
            timestamp: Utc::now(),
        };

        self.alerts.push_front(alert.clone());
        self.alerts.truncate(self.max_alerts);
        alert
    }

    /// Recompute stats from the current records and store them
    pub fn recompute_stats(&mut self) -> Stats {
        let today = Local::now().date_naive();

        let active_incidents = self
            .incidents
            .values()
            .filter(|i| i.status == ACTIVE_STATUS)
            .count();

        let reports_today = self
            .incidents
            .values()
            .filter(|i| i.reported_at.with_timezone(&Local).date_naive() == today)
            .count();

        self.stats = Stats {
            active_tourists: self.tourists.len(),
            active_incidents,
            reports_today,
            safety_score: Stats::safety_score_for(active_incidents),
        };
        self.stats
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn tourist(&self, id: &str) -> Option<&Tourist> {
        self.tourists.get(id)
    }

    pub fn incident(&self, id: &str) -> Option<&Incident> {
        self.incidents.get(id)
    }

    /// Alerts, newest first
    pub fn alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    pub fn tourist_count(&self) -> usize {
        self.tourists.len()
    }

    pub fn incident_count(&self) -> usize {
        self.incidents.len()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.len()
    }

    /// Everything an admin dashboard needs on connect
    pub fn snapshot(&self) -> AdminSnapshot {
        let mut incidents: Vec<Incident> = self.incidents.values().cloned().collect();
        incidents.sort_by_key(|i| i.reported_at);

        AdminSnapshot {
            tourists: self.tourists.values().cloned().collect(),
            incidents,
            system_alerts: self.alerts.iter().cloned().collect(),
            stats: self.stats,
        }
    }
}

/// `now`, bumped past `previous` so successive updates strictly increase
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(1)
    }
}

/// Referential misses and rejected merges
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    UnknownTourist(String),
    UnknownIncident(String),
    Merge(MergeError),
}

impl From<MergeError> for StoreError {
    fn from(e: MergeError) -> Self {
        StoreError::Merge(e)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::UnknownTourist(id) => write!(f, "unknown tourist '{}'", id),
            StoreError::UnknownIncident(id) => write!(f, "unknown incident '{}'", id),
            StoreError::Merge(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for StoreError {}
