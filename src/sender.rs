//! Outbound delivery to the chat API

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{RelayError, Result};
use crate::formatter::{ForwardMessage, OutboundMessage};

/// Destination for rendered notifications.
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn send(&self, group_id: &str, message: &OutboundMessage) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct GroupTextRequest<'a> {
    group_id: &'a str,
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct GroupForwardRequest<'a> {
    group_id: &'a str,
    #[serde(flatten)]
    message: &'a ForwardMessage,
}

/// Posts messages to a OneBot-style HTTP API
/// (`/send_group_msg` and `/send_group_forward_msg`).
#[derive(Debug, Clone)]
pub struct HttpChatSink {
    client: reqwest::Client,
    api_url: String,
}

impl HttpChatSink {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self, message: &OutboundMessage) -> String {
        let action = match message {
            OutboundMessage::Text(_) => "send_group_msg",
            OutboundMessage::Forward(_) => "send_group_forward_msg",
        };
        format!("{}/{}", self.api_url, action)
    }
}

#[async_trait]
impl ChatSink for HttpChatSink {
    async fn send(&self, group_id: &str, message: &OutboundMessage) -> Result<()> {
        let url = self.endpoint(message);
        debug!("Sending message to group {} via {}", group_id, url);

        let request = self.client.post(&url);
        let request = match message {
            OutboundMessage::Text(text) => request.json(&GroupTextRequest {
                group_id,
                message: text,
            }),
            OutboundMessage::Forward(forward) => request.json(&GroupForwardRequest {
                group_id,
                message: forward,
            }),
        };

        let response = request
            .send()
            .await
            .map_err(|source| RelayError::DeliveryFailed {
                group_id: group_id.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(RelayError::UnexpectedStatus {
                group_id: group_id.to_string(),
                status,
                body,
            });
        }

        info!("Message delivered to group {}: {}", group_id, body);
        Ok(())
    }
}
