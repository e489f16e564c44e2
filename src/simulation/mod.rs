// Synthetic incidents, location drift and alerts for demo dashboards

use crate::config::SimulationConfig;
use crate::hub::HubHandle;
use crate::state::{Location, NewIncident};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

const INCIDENT_TYPES: &[&str] = &[
    "Safety Concern",
    "Medical Emergency",
    "Lost Tourist",
    "Theft Report",
];

const SEVERITIES: &[&str] = &["Low", "Medium", "High"];

const LOCATIONS: &[&str] = &[
    "Downtown Plaza",
    "Tourist District",
    "Central Park",
    "Beach Area",
    "Shopping Center",
];

const SYNTHETIC_DESCRIPTION: &str = "Automatically generated incident for demonstration";

const ALERTS: &[(&str, &str)] = &[
    ("info", "System performance is optimal"),
    ("warning", "High traffic detected in tourist zones"),
    ("success", "Emergency response team deployed successfully"),
];

/// Simulated accuracy range in meters
const ACCURACY_MIN: f64 = 10.0;
const ACCURACY_MAX: f64 = 30.0;

/// Alert produced by a simulation tick
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticAlert {
    pub alert_type: String,
    pub message: String,
}

/// Random source for the simulation loop.
///
/// Lives inside the hub so every decision is made on the hub task.
pub struct Simulator {
    config: SimulationConfig,
    rng: StdRng,
}

impl Simulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_rng(config: SimulationConfig, rng: StdRng) -> Self {
        Self { config, rng }
    }

    /// Roll for a synthetic incident
    pub fn roll_incident(&mut self) -> Option<NewIncident> {
        if !self.rng.gen_bool(probability(self.config.incident_probability)) {
            return None;
        }

        Some(NewIncident {
            incident_type: self.pick(INCIDENT_TYPES),
            description: Some(SYNTHETIC_DESCRIPTION.to_string()),
            severity: self.pick(SEVERITIES),
            location: self.pick(LOCATIONS),
        })
    }

    /// Perturb a location and rewrite its accuracy
    pub fn jitter(&mut self, location: &Location) -> Location {
        let width = self.config.location_jitter_degrees;
        Location {
            latitude: location.latitude + (self.rng.gen::<f64>() - 0.5) * width,
            longitude: location.longitude + (self.rng.gen::<f64>() - 0.5) * width,
            accuracy: Some(self.rng.gen_range(ACCURACY_MIN..ACCURACY_MAX)),
            timestamp: Utc::now(),
        }
    }

    /// Roll for a synthetic alert
    pub fn roll_alert(&mut self) -> Option<SyntheticAlert> {
        if !self.rng.gen_bool(probability(self.config.alert_probability)) {
            return None;
        }

        ALERTS
            .choose(&mut self.rng)
            .map(|(alert_type, message)| SyntheticAlert {
                alert_type: alert_type.to_string(),
                message: message.to_string(),
            })
    }

    fn pick(&mut self, options: &[&str]) -> Option<String> {
        options.choose(&mut self.rng).map(|s| s.to_string())
    }
}

/// `gen_bool` panics outside [0, 1]
fn probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

/// Submit a simulation tick to the hub every `interval_seconds`.
///
/// Runs until the hub goes away.
pub async fn run_simulation_loop(hub: HubHandle, interval_seconds: u64) {
    let mut ticker = interval(Duration::from_secs(interval_seconds.max(1)));

    // Skip missed ticks to prevent backlog under load
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // First tick completes immediately; the loop starts one period in
    ticker.tick().await;

    info!(interval_seconds, "Simulation loop started");

    loop {
        ticker.tick().await;

        if hub.simulation_tick().await.is_err() {
            warn!("Hub stopped, simulation loop exiting");
            break;
        }
    }
}
