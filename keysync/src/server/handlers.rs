// HTTP request handlers
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use tracing::{error, info};

use crate::server::state::AppState;

/// Maximum number of hits returned by a search.
const SEARCH_RESULT_LIMIT: usize = 25;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub term: String,
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "keysync is running")
}

/// Search endpoint - runs a full-text query against the index
pub async fn search_handler(
    State(state): State<AppState>,
    Json(payload): Json<SearchRequest>,
) -> impl IntoResponse {
    info!(term = %payload.term, "Received search request");

    match state.sink.search(&payload.term, SEARCH_RESULT_LIMIT).await {
        Ok(hits) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "total": hits.len(),
                "hits": hits,
            })),
        ),
        Err(e) => {
            error!(term = %payload.term, error = %e, "Search failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "error",
                    "message": e.to_string(),
                })),
            )
        }
    }
}

/// Store endpoint - reads the store directly, bypassing the index
pub async fn store_handler(
    State(state): State<AppState>,
    Json(payload): Json<SearchRequest>,
) -> impl IntoResponse {
    info!(prefix = %payload.term, "Received store read request");

    match state.store.scan(&payload.term).await {
        Ok(entries) => {
            let entries: Vec<_> = entries
                .into_iter()
                .map(|entry| {
                    serde_json::json!({
                        "key": entry.key,
                        "value": String::from_utf8_lossy(&entry.value),
                        "revision": entry.revision,
                    })
                })
                .collect();
            (StatusCode::OK, Json(serde_json::json!({ "kvs": entries })))
        }
        Err(e) => {
            error!(prefix = %payload.term, error = %e, "Store read failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "error",
                    "message": e.to_string(),
                })),
            )
        }
    }
}

/// Status endpoint - reports worker states and index size
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let documents = match state.sink.document_count().await {
        Ok(count) => count,
        Err(e) => {
            error!(error = %e, "Failed to read document count");
            0
        }
    };

    Json(serde_json::json!({
        "follower": format!("{:?}", *state.follower_state.borrow()),
        "scanner": format!("{:?}", *state.scanner_state.borrow()),
        "documents": documents,
    }))
}
