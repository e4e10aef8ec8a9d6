//! Webhook handler for GitHub push events

use axum::{
    Json,
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{Instrument, info_span};
use uuid::Uuid;

use crate::SharedState;
use crate::dispatcher::{DispatchResult, WebhookRequest};

pub const EVENT_HEADER: &str = "X-GitHub-Event";
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
pub const DELIVERY_HEADER: &str = "X-GitHub-Delivery";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Handles the GitHub webhook POST request.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let delivery_id = header_str(&headers, DELIVERY_HEADER)
        .map(String::from)
        .unwrap_or_else(|| Uuid::now_v7().to_string());

    let request = WebhookRequest {
        event: header_str(&headers, EVENT_HEADER),
        signature: header_str(&headers, SIGNATURE_HEADER),
        body: &body,
    };

    let result = state
        .dispatcher
        .dispatch(request)
        .instrument(info_span!("webhook", delivery = %delivery_id))
        .await;

    match result {
        DispatchResult::NoMatch => {
            (StatusCode::OK, Json(json!({"msg": "no matching group found"}))).into_response()
        }
        DispatchResult::Delivered(count) => (
            StatusCode::OK,
            Json(json!({"msg": format!("message sent to {} group(s)", count)})),
        )
            .into_response(),
        DispatchResult::Rejected(rejection) => (
            rejection.status_code(),
            Json(json!({"error": rejection.to_string()})),
        )
            .into_response(),
    }
}
