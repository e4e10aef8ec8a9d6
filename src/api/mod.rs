//! API module for all HTTP handlers

pub mod handlers;
pub mod webhook;

use axum::{Router, routing};

use crate::SharedState;

// Re-export handlers
pub use handlers::root;
pub use webhook::handle_webhook;

/// Builds the application router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", routing::get(root))
        .route("/webhook", routing::post(handle_webhook))
        .with_state(state)
}
