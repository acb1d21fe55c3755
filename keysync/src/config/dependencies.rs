//! Dependency initialization and wiring for the synchronizer.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::follower::ChangeFollower;
use crate::scanner::ReconciliationScanner;
use crate::store::{EtcdStore, SourceStore};
use crate::supervisor::SyncSupervisor;
use crate::IndexerError;
use keysync_repository::{IndexConfig, IndexSink, TantivyIndexSink};

/// Default source store endpoints.
const DEFAULT_ETCD_ENDPOINTS: &str = "localhost:2379,localhost:2380";

/// Default key prefix to synchronize.
const DEFAULT_KEY_PREFIX: &str = "test";

/// Default reconciliation interval in seconds.
const DEFAULT_SCAN_INTERVAL_SECS: u64 = 60;

/// Default HTTP listen port.
const DEFAULT_HTTP_PORT: u16 = 8000;

/// Default store connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Connection mode for the source store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if the connection fails.
    FailFast,
    /// Retry the connection until successful.
    Retry,
}

impl ConnectionMode {
    /// Parse connection mode from environment variable.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive)
    /// Defaults to "retry" if not set or invalid.
    fn from_env() -> Self {
        match env::var("STORE_CONNECTION_MODE")
            .unwrap_or_else(|_| "retry".to_string())
            .to_lowercase()
            .as_str()
        {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!("Invalid STORE_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured supervisor ready to run.
    pub supervisor: SyncSupervisor,
    /// The shared index sink, also served by the query endpoints.
    pub sink: Arc<dyn IndexSink>,
    /// The source store client, also served by the direct-read endpoint.
    pub store: Arc<dyn SourceStore>,
    /// Address the HTTP server should bind.
    pub http_addr: SocketAddr,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `ETCD_ENDPOINTS`: Store endpoints, comma-separated (default: localhost:2379,localhost:2380)
    /// - `ETCD_USERNAME` / `ETCD_PASSWORD`: Optional store credentials
    /// - `KEY_PREFIX`: Key prefix to synchronize (default: test)
    /// - `SCAN_INTERVAL_SECS`: Reconciliation interval (default: 60)
    /// - `HTTP_PORT`: HTTP listen port (default: 8000)
    /// - `STORE_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `STORE_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexerError)` - If initialization fails (only in fail-fast mode)
    pub async fn new() -> Result<Self, IndexerError> {
        let endpoints: Vec<String> = env::var("ETCD_ENDPOINTS")
            .unwrap_or_else(|_| DEFAULT_ETCD_ENDPOINTS.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let credentials = match (env::var("ETCD_USERNAME"), env::var("ETCD_PASSWORD")) {
            (Ok(username), Ok(password)) => Some((username, password)),
            _ => None,
        };
        let key_prefix = env::var("KEY_PREFIX").unwrap_or_else(|_| DEFAULT_KEY_PREFIX.to_string());
        let scan_interval = env::var("SCAN_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_SCAN_INTERVAL_SECS);
        let http_port = env::var("HTTP_PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(DEFAULT_HTTP_PORT);
        let connection_mode = ConnectionMode::from_env();
        let retry_interval = env::var("STORE_RETRY_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_INTERVAL_SECS);

        info!(
            endpoints = ?endpoints,
            key_prefix = %key_prefix,
            scan_interval_secs = scan_interval,
            http_port = http_port,
            connection_mode = ?connection_mode,
            retry_interval_secs = retry_interval,
            "Initializing dependencies"
        );

        // The index lives in process memory; the scanner's first tick after a
        // restart re-indexes the whole prefix.
        let sink = TantivyIndexSink::new(IndexConfig::default())
            .map_err(|e| IndexerError::config(format!("Failed to create index sink: {}", e)))?;
        sink.ensure_ready()
            .await
            .map_err(|e| IndexerError::config(format!("Index sink not ready: {}", e)))?;
        let sink: Arc<dyn IndexSink> = Arc::new(sink);

        info!("Index sink ready");

        let store = Self::connect_to_store(
            endpoints,
            credentials,
            connection_mode,
            Duration::from_secs(retry_interval),
        )
        .await?;
        let store: Arc<dyn SourceStore> = Arc::new(store);

        info!("Source store connection established");

        let follower = ChangeFollower::new(
            Arc::clone(&store),
            Arc::clone(&sink),
            key_prefix.as_str(),
        );
        let scanner = ReconciliationScanner::new(
            Arc::clone(&store),
            Arc::clone(&sink),
            key_prefix.as_str(),
            Duration::from_secs(scan_interval),
        );
        let supervisor = SyncSupervisor::new(follower, scanner);

        let http_addr = SocketAddr::from(([0, 0, 0, 0], http_port));

        Ok(Self {
            supervisor,
            sink,
            store,
            http_addr,
        })
    }

    /// Connect to the source store with retry logic based on connection mode.
    async fn connect_to_store(
        endpoints: Vec<String>,
        credentials: Option<(String, String)>,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<EtcdStore, IndexerError> {
        loop {
            match EtcdStore::connect(endpoints.clone(), credentials.clone()).await {
                Ok(store) => return Ok(store),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(IndexerError::config(format!(
                            "Failed to connect to source store: {}",
                            e
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            endpoints = ?endpoints,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to source store, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }
}
