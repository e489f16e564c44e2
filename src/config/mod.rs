use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use tracing::warn;

/// Complete relay configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub hub: HubConfig,
}

/// Listen address
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

/// Background simulation loop
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_simulation_enabled")]
    pub enabled: bool,
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    /// Chance per tick of a synthetic incident
    #[serde(default = "default_incident_probability")]
    pub incident_probability: f64,
    /// Chance per tick of a synthetic alert
    #[serde(default = "default_alert_probability")]
    pub alert_probability: f64,
    /// Full width of the uniform lat/lng perturbation
    #[serde(default = "default_location_jitter")]
    pub location_jitter_degrees: f64,
}

fn default_simulation_enabled() -> bool {
    true
}

fn default_interval_seconds() -> u64 {
    30
}

fn default_incident_probability() -> f64 {
    0.1
}

fn default_alert_probability() -> f64 {
    0.05
}

fn default_location_jitter() -> f64 {
    0.001
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: default_simulation_enabled(),
            interval_seconds: default_interval_seconds(),
            incident_probability: default_incident_probability(),
            alert_probability: default_alert_probability(),
            location_jitter_degrees: default_location_jitter(),
        }
    }
}

/// Hub sizing and initial state
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Alert ring buffer length
    #[serde(default = "default_max_alerts")]
    pub max_alerts: usize,
    /// Pending commands (socket events + ticks) before submitters wait
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
    /// Per-connection outbound queue; overflow drops for that connection
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
    /// Safety score reported before the first stats recompute
    #[serde(default = "default_initial_safety_score")]
    pub initial_safety_score: u32,
}

fn default_max_alerts() -> usize {
    50
}

fn default_command_buffer() -> usize {
    1024
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_initial_safety_score() -> u32 {
    94
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_alerts: default_max_alerts(),
            command_buffer: default_command_buffer(),
            outbound_buffer: default_outbound_buffer(),
            initial_safety_score: default_initial_safety_score(),
        }
    }
}

impl RelayConfig {
    /// Build from `RELAY_CONFIG` (if set) plus env overrides, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut cfg = match std::env::var("RELAY_CONFIG") {
            Ok(path) => load_config(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(v) = std::env::var("RELAY_HOST") {
            cfg.server.host = v;
        }
        if let Ok(v) = std::env::var("RELAY_PORT") {
            match v.parse::<u16>() {
                Ok(port) => cfg.server.port = port,
                Err(_) => warn!(value = %v, "Ignoring invalid RELAY_PORT"),
            }
        }
        if let Ok(v) = std::env::var("RELAY_SIMULATION_ENABLED") {
            if let Ok(b) = v.parse::<bool>() {
                cfg.simulation.enabled = b;
            }
        }
        if let Ok(v) = std::env::var("RELAY_SIMULATION_INTERVAL_SECONDS") {
            if let Ok(n) = v.parse::<u64>() {
                cfg.simulation.interval_seconds = n;
            }
        }

        Ok(cfg)
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<RelayConfig> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path))?;
    let config: RelayConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file {}", path))?;
    Ok(config)
}
