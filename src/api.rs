//! HTTP query service for the dashboard.
//!
//! Exposes a single read-only route, `GET /data`, returning the latest reading
//! as JSON. CORS is fully permissive so the dashboard can fetch from any
//! origin. Handlers only touch the store's read path, so arbitrarily many
//! concurrent requests contend on nothing else.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::store::LatestStore;
use crate::telemetry::Reading;

pub fn router(store: Arc<LatestStore>) -> Router {
    Router::new()
        .route("/data", get(get_data))
        .layer(CorsLayer::permissive())
        .with_state(store)
}

/// Serves the query API until a shutdown signal arrives.
pub async fn serve(listen_port: u16, store: Arc<LatestStore>) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], listen_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Query service listening on {}", addr);

    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

// Always succeeds: before the first message this returns the store's initial
// zero-valued reading.
async fn get_data(State(store): State<Arc<LatestStore>>) -> Json<Reading> {
    let (reading, _version) = store.read().await;
    Json(reading)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received, stopping query service");
}
