pub mod api;
pub mod binding;
pub mod dispatcher;
pub mod error;
pub mod formatter;
pub mod logging;
pub mod payload;
pub mod sender;
pub mod signature;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::dispatcher::NotificationDispatcher;
use crate::error::RelayError;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    /// Base URL of the chat API, e.g. `http://127.0.0.1:3000`
    pub api_url: String,
    #[serde(default)]
    pub message_mode: MessageMode,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub groups: Vec<Binding>,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// A chat group and the GitHub organization/repository it listens to.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Binding {
    pub group_id: String,
    pub secret: String,
    pub organization: Option<String>,
    pub repository: Option<String>,
}

/// Shape of the outbound message, chosen per deployment.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageMode {
    /// One plain text block sent with `send_group_msg`.
    Text,
    /// A node tree sent with `send_group_forward_msg`.
    #[default]
    Forward,
}

impl MessageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageMode::Text => "text",
            MessageMode::Forward => "forward",
        }
    }
}

impl Binding {
    /// Returns true if the binding can ever match a payload.
    pub fn has_target(&self) -> bool {
        self.organization.is_some() || self.repository.is_some()
    }
}

impl RelayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Rejects configurations the relay cannot run with.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.api_url.trim().is_empty() {
            return Err(RelayError::ConfigError("api_url must not be empty".into()));
        }

        for (idx, binding) in self.groups.iter().enumerate() {
            if binding.group_id.trim().is_empty() {
                return Err(RelayError::ConfigError(format!(
                    "groups[{}]: group_id must not be empty",
                    idx
                )));
            }
            if binding.secret.is_empty() {
                return Err(RelayError::ConfigError(format!(
                    "groups[{}] ({}): secret must not be empty",
                    idx, binding.group_id
                )));
            }
            if !binding.has_target() {
                warn!(
                    "Group '{}' has neither organization nor repository set and will never be notified",
                    binding.group_id
                );
            }
        }

        Ok(())
    }
}

/// Parses and validates a TOML configuration string.
pub fn parse_config(config_str: &str) -> Result<RelayConfig, RelayError> {
    let config: RelayConfig = toml::from_str(config_str)?;
    config.validate()?;
    Ok(config)
}

/// Load and parse the configuration file
pub fn load_config(path: impl AsRef<Path>) -> Result<RelayConfig, RelayError> {
    let path = path.as_ref();
    let config_str = std::fs::read_to_string(path).map_err(|e| {
        RelayError::ConfigError(format!("Failed to read config file '{}': {}", path.display(), e))
    })?;

    parse_config(&config_str).map_err(|e| {
        RelayError::ConfigError(format!("Failed to load config file '{}': {}", path.display(), e))
    })
}

pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub dispatcher: NotificationDispatcher,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Arc<RelayConfig>, dispatcher: NotificationDispatcher) -> Self {
        Self {
            config,
            dispatcher,
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<AppState>;
