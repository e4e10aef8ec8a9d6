use axum::http::StatusCode;
use std::io;

/// Custom error type for github_push_relay operations
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Delivery to group {group_id} failed: {source}")]
    DeliveryFailed {
        group_id: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Chat API answered {status} for group {group_id}: {body}")]
    UnexpectedStatus {
        group_id: String,
        status: StatusCode,
        body: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

/// Reasons a webhook request is refused before or during fan-out.
#[derive(Debug, thiserror::Error)]
pub enum WebhookRejection {
    #[error("missing X-GitHub-Event or X-Hub-Signature-256 header")]
    MissingHeaders,

    #[error("invalid JSON payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("signature verification failed for group {group_id}")]
    SignatureMismatch { group_id: String },
}

impl WebhookRejection {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookRejection::MissingHeaders | WebhookRejection::MalformedPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookRejection::SignatureMismatch { .. } => StatusCode::FORBIDDEN,
        }
    }

    /// The group whose secret did not verify, if that is why the request failed.
    pub fn failing_group(&self) -> Option<&str> {
        match self {
            WebhookRejection::SignatureMismatch { group_id } => Some(group_id),
            _ => None,
        }
    }
}

/// Helper type for Results that use RelayError
pub type Result<T> = std::result::Result<T, RelayError>;
