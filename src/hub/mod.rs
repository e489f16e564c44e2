// Single-writer relay hub: all state mutation and fan-out happens on one task

mod router;

use crate::config::HubConfig;
use crate::protocol::ServerMessage;
use crate::registry::{ConnectionId, ConnectionRegistry, Outbound, Role};
use crate::simulation::Simulator;
use crate::state::{StateStore, Stats, SYSTEM_REPORTER};
use serde::Serialize;
use std::fmt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Work submitted to the hub task
#[derive(Debug)]
pub enum HubCommand {
    /// A socket was accepted; `outbound` feeds its writer
    Connect { id: ConnectionId, outbound: Outbound },
    /// One inbound text frame, in arrival order per connection
    Message { id: ConnectionId, text: String },
    /// The socket closed or errored
    Disconnect { id: ConnectionId },
    /// Timer tick from the simulation loop
    SimulationTick,
    /// Operational snapshot for the status endpoint
    Status { reply: oneshot::Sender<HubStatus> },
}

/// Point-in-time view of the hub
#[derive(Debug, Clone, Serialize)]
pub struct HubStatus {
    pub connections: ConnectionCounts,
    pub stats: Stats,
    pub tourists: usize,
    pub incidents: usize,
    pub alerts: usize,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ConnectionCounts {
    pub total: usize,
    pub admins: usize,
    pub tourists: usize,
}

/// Owns the state store and connection registry.
///
/// Every connection event and timer tick is applied here one at a time,
/// which is what keeps the store lock-free.
pub struct Hub {
    store: StateStore,
    registry: ConnectionRegistry,
    simulator: Simulator,
}

impl Hub {
    pub fn new(config: &HubConfig, simulator: Simulator) -> Self {
        Self {
            store: StateStore::new(config.max_alerts, config.initial_safety_score),
            registry: ConnectionRegistry::new(),
            simulator,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Apply one command
    pub fn apply(&mut self, command: HubCommand) {
        match command {
            HubCommand::Connect { id, outbound } => self.connect(id, outbound),
            HubCommand::Message { id, text } => self.handle_text(id, &text),
            HubCommand::Disconnect { id } => self.disconnect(id),
            HubCommand::SimulationTick => self.simulation_tick(),
            HubCommand::Status { reply } => {
                // Requester may have given up
                let _ = reply.send(self.status());
            }
        }
    }

    /// Drain commands until every handle is dropped
    pub async fn run(mut self, mut commands: mpsc::Receiver<HubCommand>) {
        info!("Hub started");
        while let Some(command) = commands.recv().await {
            self.apply(command);
        }
        info!("Hub stopped");
    }

    pub fn connect(&mut self, id: ConnectionId, outbound: Outbound) {
        self.registry.open(id, outbound);
        info!(connection_id = %id, connections = self.registry.len(), "WebSocket connection established");
    }

    /// Drop a connection from the registry; its tourist record stays in the store
    pub fn disconnect(&mut self, id: ConnectionId) {
        match self.registry.unregister(id) {
            Some(identity) => info!(
                connection_id = %id,
                role = ?identity.role,
                user_id = %identity.user_id,
                "WebSocket connection closed"
            ),
            None => debug!(connection_id = %id, "WebSocket connection closed"),
        }
    }

    pub fn status(&self) -> HubStatus {
        HubStatus {
            connections: ConnectionCounts {
                total: self.registry.len(),
                admins: self.registry.audience_size(Role::Admin),
                tourists: self.registry.audience_size(Role::Tourist),
            },
            stats: self.store.stats(),
            tourists: self.store.tourist_count(),
            incidents: self.store.incident_count(),
            alerts: self.store.alert_count(),
        }
    }

    /// One pass of the simulation loop, through the same paths as client traffic
    pub fn simulation_tick(&mut self) {
        if let Some(fields) = self.simulator.roll_incident() {
            let incident = self.store.create_incident(SYSTEM_REPORTER, fields);
            self.registry
                .broadcast_to_admins(&ServerMessage::NewIncident { incident });
            self.publish_stats();
        }

        let simulator = &mut self.simulator;
        let moved = self.store.jitter_locations(|location| simulator.jitter(location));
        for (tourist_id, location) in moved {
            self.registry
                .broadcast_to_admins(&ServerMessage::LocationUpdate { tourist_id, location });
        }

        if let Some(alert) = self.simulator.roll_alert() {
            self.send_alert(alert.alert_type, Some(alert.message));
        }
    }

    /// Recompute stats and push them to the admin audience
    fn publish_stats(&mut self) {
        let stats = self.store.recompute_stats();
        self.registry
            .broadcast_to_admins(&ServerMessage::StatsUpdate { stats });
    }

    /// Record an alert and deliver it to both audiences
    fn send_alert(&mut self, alert_type: String, message: Option<String>) {
        let alert = self.store.push_alert(alert_type, message);
        info!(alert_id = %alert.id, alert_type = %alert.alert_type, "System alert");

        let message = ServerMessage::SystemAlert { alert };
        self.registry.broadcast_to_admins(&message);
        self.registry.broadcast_to_tourists(&message);
    }
}

/// Start the hub task; returns the submission handle and the task
pub fn spawn_hub(hub: Hub, command_buffer: usize) -> (HubHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(command_buffer.max(1));
    let task = tokio::spawn(hub.run(rx));
    (HubHandle { tx }, task)
}

/// Cloneable submission side of the hub
#[derive(Clone, Debug)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    pub async fn connect(&self, id: ConnectionId, outbound: Outbound) -> Result<(), HubClosed> {
        self.submit(HubCommand::Connect { id, outbound }).await
    }

    pub async fn message(&self, id: ConnectionId, text: String) -> Result<(), HubClosed> {
        self.submit(HubCommand::Message { id, text }).await
    }

    pub async fn disconnect(&self, id: ConnectionId) -> Result<(), HubClosed> {
        self.submit(HubCommand::Disconnect { id }).await
    }

    pub async fn simulation_tick(&self) -> Result<(), HubClosed> {
        self.submit(HubCommand::SimulationTick).await
    }

    pub async fn status(&self) -> Result<HubStatus, HubClosed> {
        let (reply, rx) = oneshot::channel();
        self.submit(HubCommand::Status { reply }).await?;
        rx.await.map_err(|_| HubClosed)
    }

    async fn submit(&self, command: HubCommand) -> Result<(), HubClosed> {
        self.tx.send(command).await.map_err(|_| HubClosed)
    }
}

/// The hub task is no longer running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubClosed;

impl fmt::Display for HubClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "relay hub is not running")
    }
}

impl std::error::Error for HubClosed {}
