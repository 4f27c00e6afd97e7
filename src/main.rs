//! sonic-bridge server entry point.
//!
//! Starts the Axum HTTP server with REST, webhook, and WebSocket endpoints,
//! sets up the configured device, and keeps it refreshed.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::routing::get;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use sonic_bridge::api;
use sonic_bridge::app_state::AppState;
use sonic_bridge::client::{DeviceClient, HttpDeviceClient};
use sonic_bridge::config::BridgeConfig;
use sonic_bridge::domain::EventBus;
use sonic_bridge::service::{DeviceRegistry, DeviceService, spawn_refresh_loop};
use sonic_bridge::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = BridgeConfig::from_env().context("invalid LISTEN_ADDR")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, "starting sonic-bridge");

    // Build service layer
    let registry = Arc::new(DeviceRegistry::new());
    let event_bus = EventBus::new(config.event_bus_capacity);
    let device_service = Arc::new(DeviceService::new(
        registry,
        event_bus,
        config.public_url.clone(),
        config.refresh_timeout(),
    ));

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState::new(Arc::clone(&device_service)));

    // Start server before device setup so the webhook endpoint is reachable
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut server_shutdown = shutdown_rx.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.changed().await;
            })
            .await
    });

    // Set up the configured device
    let mut refresh_loops = Vec::new();
    match config.sonic_address.as_deref() {
        Some(address) => {
            let client = HttpDeviceClient::new(address, config.device_request_timeout())
                .with_context(|| format!("invalid SONIC_ADDRESS {address}"))?;
            let client: Arc<dyn DeviceClient> = Arc::new(client);
            let coordinator = device_service
                .setup_device(&config.sonic_name, client)
                .await
                .context("device setup failed")?;
            refresh_loops.push(spawn_refresh_loop(
                coordinator,
                config.refresh_interval(),
                config.refresh_timeout(),
                shutdown_rx.clone(),
            ));
        }
        None => tracing::warn!("SONIC_ADDRESS not set; serving without a device"),
    }

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("shutting down");
    let _ = shutdown_tx.send(true);

    for handle in refresh_loops {
        let _ = handle.await;
    }
    server
        .await
        .context("server task panicked")?
        .context("server error")?;

    Ok(())
}
