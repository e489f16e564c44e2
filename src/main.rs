use anyhow::{Context, Result};
use safety_relay::api::{create_router, RelayAppState};
use safety_relay::config::RelayConfig;
use safety_relay::hub::{spawn_hub, Hub};
use safety_relay::simulation::{run_simulation_loop, Simulator};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "safety_relay=info".into()),
        )
        .init();

    info!("Safety relay starting...");

    let config = RelayConfig::from_env().context("Failed to load configuration")?;
    let addr = config.server.socket_addr()?;

    info!(
        addr = %addr,
        simulation_enabled = config.simulation.enabled,
        simulation_interval_seconds = config.simulation.interval_seconds,
        max_alerts = config.hub.max_alerts,
        "Configuration loaded"
    );

    // Hub owns all relay state
    let hub = Hub::new(&config.hub, Simulator::new(config.simulation.clone()));
    let (hub_handle, hub_task) = spawn_hub(hub, config.hub.command_buffer);

    let simulation_task = if config.simulation.enabled {
        Some(tokio::spawn(run_simulation_loop(
            hub_handle.clone(),
            config.simulation.interval_seconds,
        )))
    } else {
        info!("Simulation loop disabled");
        None
    };

    // Start HTTP/WebSocket server
    let state = Arc::new(RelayAppState {
        hub: hub_handle,
        outbound_buffer: config.hub.outbound_buffer,
    });
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(addr = %addr, "Safety relay listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Relay server error")?;

    info!("Shutdown signal received");

    if let Some(task) = simulation_task {
        task.abort();
    }
    hub_task.abort();
    info!("Safety relay stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl_c signal");
        // Without a signal handler, run until killed
        std::future::pending::<()>().await;
    }
}
