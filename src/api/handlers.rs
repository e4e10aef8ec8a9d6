//! Health endpoint

use axum::{
    Json,
    extract::{Query, State as AxumState},
    response::IntoResponse,
};
use serde_json::json;
use std::collections::HashMap;

use crate::SharedState;

/// Root health check endpoint
/// Supports ?format=json for detailed JSON response
pub async fn root(
    AxumState(state): AxumState<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let format = params.get("format").map(|s| s.as_str());

    if format == Some("json") {
        Json(json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "started_at": state.started_at,
            "uptime_seconds": state.start_time.elapsed().as_secs(),
            "total_groups": state.config.groups.len(),
            "message_mode": state.config.message_mode.as_str(),
            "status": "healthy"
        }))
        .into_response()
    } else {
        concat!(env!("CARGO_PKG_NAME"), " - healthy").into_response()
    }
}
