// Server module - HTTP server setup and routing
pub mod handlers;
pub mod state;

use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::info;

use self::state::AppState;
use crate::IndexerError;

/// Create the Axum application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v0/search", post(handlers::search_handler))
        .route("/api/v0/store", post(handlers::store_handler))
        .route("/api/v0/status", get(handlers::status_handler))
        .route("/health", get(handlers::health_check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the server on the specified address until the shutdown signal fires
pub async fn run_server(
    app: Router,
    addr: SocketAddr,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), IndexerError> {
    info!("Server listening on {}", addr);
    info!("- Search endpoint: http://{}/api/v0/search", addr);
    info!("- Status endpoint: http://{}/api/v0/status", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| IndexerError::config(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
        .map_err(|e| IndexerError::config(format!("HTTP server error: {}", e)))?;

    Ok(())
}
