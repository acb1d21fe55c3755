// App state for the Axum server
use std::sync::Arc;

use tokio::sync::watch;

use crate::follower::FollowerState;
use crate::scanner::ScannerState;
use crate::store::SourceStore;
use keysync_repository::IndexSink;

#[derive(Clone)]
pub struct AppState {
    pub sink: Arc<dyn IndexSink>,
    pub store: Arc<dyn SourceStore>,
    pub follower_state: watch::Receiver<FollowerState>,
    pub scanner_state: watch::Receiver<ScannerState>,
}
