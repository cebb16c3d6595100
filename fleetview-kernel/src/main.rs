/**
 * FLEETVIEW KERNEL - Point d'entrée du serveur
 *
 * RÔLE : Orchestration : config, contrats, snapshot initial, ingestion MQTT,
 * publication du health, API HTTP.
 *
 * ARCHITECTURE : les snapshots arrivent (MQTT ou POST), remplacent l'état
 * partagé, et chaque requête HTTP recalcule sa vue via fleetview-core.
 * UTILITÉ : Hôte du pipeline de vue et du moteur carte pour le front.
 */

mod config;
mod contracts;
mod health;
mod http;
mod models;
mod mqtt;
mod state;

use anyhow::Context;
use fleetview_core::geo::MarkerLayer;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::load_config;
use crate::contracts::ContractRegistry;
use crate::health::HealthTracker;
use crate::http::AppState;
use crate::state::{load_snapshot_file, new_state, FleetSnapshot};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env optionnel
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fleetview_kernel=info,fleetview_core=info")),
        )
        .init();

    let cfg = load_config().await;

    let contracts = match ContractRegistry::load_contracts_from_dir(&cfg.contracts_dir).await {
        Ok(registry) => {
            info!(count = registry.list_contracts().len(), "contracts loaded");
            registry
        }
        Err(e) => {
            warn!(dir = %cfg.contracts_dir, error = %e, "failed to load contracts, MQTT ingestion will reject everything");
            ContractRegistry::new()
        }
    };

    let snapshot = new_state(FleetSnapshot::default());
    if let Some(path) = &cfg.snapshot_file {
        if let Err(e) = load_snapshot_file(path, &snapshot).await {
            warn!(error = %e, "initial snapshot not loaded");
        }
    }

    let health_tracker = HealthTracker::new();
    mqtt::spawn_mqtt_listener(snapshot.clone(), cfg.clone(), contracts.clone(), health_tracker.clone());
    health_tracker.spawn_health_publisher(cfg.clone(), contracts.clone(), snapshot.clone());

    let addr: SocketAddr = cfg
        .http
        .bind
        .parse()
        .with_context(|| format!("invalid http.bind address '{}'", cfg.http.bind))?;

    let app_state = AppState {
        snapshot,
        cfg: Arc::new(cfg),
        contracts,
        health_tracker,
        markers: new_state(MarkerLayer::new()),
    };
    let app = http::build_router(app_state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{addr}");
    axum::serve(listener, app).await.context("HTTP server stopped")?;
    Ok(())
}
