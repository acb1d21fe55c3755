//! Keysync Main Entry Point
//!
//! This is the main binary for the keyspace index synchronizer. It mirrors a
//! key prefix of the source store into an embedded full-text index and serves
//! search queries over HTTP.

use std::env;
use std::sync::Arc;

use dotenv::dotenv;
use keysync::server::{self, state::AppState};
use keysync::{Dependencies, IndexerError};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("keysync=info"));

    let json_logs = env::var("LOG_JSON")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();

        info!(
            service_name = "keysync",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();

        info!(
            service_name = "keysync",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), IndexerError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing();

    info!("Starting keysync");

    let deps = match Dependencies::new().await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let app_state = AppState {
        sink: Arc::clone(&deps.sink),
        store: Arc::clone(&deps.store),
        follower_state: deps.supervisor.follower_state(),
        scanner_state: deps.supervisor.scanner_state(),
    };
    let app = server::create_app(app_state);

    let http_shutdown = deps.supervisor.subscribe_shutdown();
    let http_addr = deps.http_addr;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::run_server(app, http_addr, http_shutdown).await {
            error!(error = %e, "HTTP server error");
        }
    });

    let result = deps.supervisor.run().await;

    // The supervisor's shutdown broadcast also stops the HTTP server.
    let _ = server_handle.await;

    match result {
        Ok(()) => {
            info!("keysync shut down cleanly");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Synchronization failed");
            Err(e.into())
        }
    }
}
