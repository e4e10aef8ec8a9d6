//! Verifies a push webhook against each matched group and fans it out

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::RelayConfig;
use crate::binding::resolve;
use crate::error::WebhookRejection;
use crate::formatter::OutboundMessage;
use crate::payload::PushPayload;
use crate::sender::ChatSink;
use crate::signature::verify;

/// The parts of an inbound webhook request the dispatcher needs.
#[derive(Debug, Clone, Copy)]
pub struct WebhookRequest<'a> {
    /// `X-GitHub-Event`
    pub event: Option<&'a str>,
    /// `X-Hub-Signature-256`
    pub signature: Option<&'a str>,
    /// Raw request body, exactly as received.
    pub body: &'a [u8],
}

#[derive(Debug)]
pub enum DispatchResult {
    /// No configured group wants this payload.
    NoMatch,
    Rejected(WebhookRejection),
    /// Number of groups the message was handed to.
    Delivered(usize),
}

pub struct NotificationDispatcher {
    config: Arc<RelayConfig>,
    sink: Arc<dyn ChatSink>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl NotificationDispatcher {
    pub fn new(config: Arc<RelayConfig>, sink: Arc<dyn ChatSink>) -> Self {
        Self { config, sink }
    }

    pub async fn dispatch(&self, request: WebhookRequest<'_>) -> DispatchResult {
        let (Some(event), Some(signature)) =
            (non_empty(request.event), non_empty(request.signature))
        else {
            warn!("Webhook request without event or signature header");
            return DispatchResult::Rejected(WebhookRejection::MissingHeaders);
        };

        let raw: serde_json::Value = match serde_json::from_slice(request.body) {
            Ok(v) => v,
            Err(e) => {
                info!("Could not parse JSON body: {:?}", e);
                return DispatchResult::Rejected(WebhookRejection::MalformedPayload(e));
            }
        };

        let payload = PushPayload::new(&raw);
        let organization = payload.organization();
        let repository = payload.repository();

        let matched = resolve(&self.config.groups, organization, repository);
        if matched.is_empty() {
            warn!(
                "No matching group for organization {:?} and repository {:?}, skipping.",
                organization, repository
            );
            return DispatchResult::NoMatch;
        }

        debug!(
            "Event '{}' for {:?} matched {} group(s)",
            event,
            repository,
            matched.len()
        );

        let message = OutboundMessage::build(self.config.message_mode, &raw);
        debug!("Rendered message:\n{}", message.to_plain_text());

        for binding in &matched {
            if !verify(&binding.secret, signature, request.body) {
                error!(
                    "Signature verification failed for group '{}'!",
                    binding.group_id
                );
                return DispatchResult::Rejected(WebhookRejection::SignatureMismatch {
                    group_id: binding.group_id.clone(),
                });
            }

            if let Err(e) = self.sink.send(&binding.group_id, &message).await {
                error!("Failed to deliver message to group '{}': {}", binding.group_id, e);
            }
        }

        info!(
            "Push to {} delivered to {} group(s)",
            payload.repository_or_default(),
            matched.len()
        );
        DispatchResult::Delivered(matched.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RelayError, Result};
    use crate::signature::compute_signature;
    use crate::{Binding, MessageMode};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const PAYLOAD: &str = r#"{"repository":{"full_name":"acme/app"},"commits":[{"id":"deadbeef0000","message":"fix bug","url":"http://x/1","author":{"name":"Ann"}}]}"#;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(String, OutboundMessage)>>,
        fail: bool,
    }

    impl RecordingSink {
        fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn sent(&self) -> Vec<(String, OutboundMessage)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatSink for RecordingSink {
        async fn send(&self, group_id: &str, message: &OutboundMessage) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((group_id.to_string(), message.clone()));
            if self.fail {
                return Err(RelayError::UnexpectedStatus {
                    group_id: group_id.to_string(),
                    status: axum::http::StatusCode::BAD_GATEWAY,
                    body: "chat API unreachable".to_string(),
                });
            }
            Ok(())
        }
    }

    fn binding(group_id: &str, secret: &str, org: Option<&str>, repo: Option<&str>) -> Binding {
        Binding {
            group_id: group_id.to_string(),
            secret: secret.to_string(),
            organization: org.map(String::from),
            repository: repo.map(String::from),
        }
    }

    fn dispatcher(
        groups: Vec<Binding>,
        mode: MessageMode,
        sink: Arc<RecordingSink>,
    ) -> NotificationDispatcher {
        let config = RelayConfig {
            api_url: "http://127.0.0.1:3000".into(),
            message_mode: mode,
            request_timeout_secs: 1,
            groups,
        };
        NotificationDispatcher::new(Arc::new(config), sink)
    }

    fn signed(secret: &str, body: &str) -> String {
        format!("sha256={}", compute_signature(secret, body.as_bytes()).unwrap())
    }

    fn request<'a>(signature: &'a str, body: &'a str) -> WebhookRequest<'a> {
        WebhookRequest {
            event: Some("push"),
            signature: Some(signature),
            body: body.as_bytes(),
        }
    }

    #[tokio::test]
    async fn delivers_to_matching_group() {
        let sink = Arc::new(RecordingSink::default());
        let d = dispatcher(
            vec![binding("1001", "s1", None, Some("acme/app"))],
            MessageMode::Text,
            sink.clone(),
        );

        let sig = signed("s1", PAYLOAD);
        let result = d.dispatch(request(&sig, PAYLOAD)).await;

        assert!(matches!(result, DispatchResult::Delivered(1)));
        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "1001");
        let text = sent[0].1.to_plain_text();
        assert!(text.contains("deadbee"));
        assert!(text.contains("fix bug"));
    }

    #[tokio::test]
    async fn forward_mode_builds_forward_message() {
        let sink = Arc::new(RecordingSink::default());
        let d = dispatcher(
            vec![binding("1001", "s1", None, Some("acme/app"))],
            MessageMode::Forward,
            sink.clone(),
        );

        let sig = signed("s1", PAYLOAD);
        d.dispatch(request(&sig, PAYLOAD)).await;

        let sent = sink.sent();
        let OutboundMessage::Forward(forward) = &sent[0].1 else {
            panic!("expected a forward message");
        };
        assert_eq!(forward.news[0].text, "deadbee: fix bug");
    }

    #[tokio::test]
    async fn no_match_sends_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let d = dispatcher(
            vec![binding("1001", "s1", None, Some("acme/other"))],
            MessageMode::Text,
            sink.clone(),
        );

        let sig = signed("s1", PAYLOAD);
        let result = d.dispatch(request(&sig, PAYLOAD)).await;

        assert!(matches!(result, DispatchResult::NoMatch));
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let sink = Arc::new(RecordingSink::default());
        let d = dispatcher(
            vec![binding("1001", "s1", None, Some("acme/app"))],
            MessageMode::Text,
            sink.clone(),
        );

        let sig = signed("not-s1", PAYLOAD);
        let result = d.dispatch(request(&sig, PAYLOAD)).await;

        let DispatchResult::Rejected(rejection) = result else {
            panic!("expected rejection");
        };
        assert_eq!(rejection.failing_group(), Some("1001"));
        assert_eq!(rejection.status_code(), axum::http::StatusCode::FORBIDDEN);
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn stops_at_first_failing_group() {
        let body = r#"{"organization":{"login":"acme"},"repository":{"full_name":"acme/app"}}"#;
        let sink = Arc::new(RecordingSink::default());
        let d = dispatcher(
            vec![
                binding("first", "shared", Some("acme"), None),
                binding("second", "different", None, Some("acme/app")),
                binding("third", "shared", None, Some("acme/app")),
            ],
            MessageMode::Text,
            sink.clone(),
        );

        let sig = signed("shared", body);
        let result = d.dispatch(request(&sig, body)).await;

        let DispatchResult::Rejected(rejection) = result else {
            panic!("expected rejection");
        };
        assert_eq!(rejection.failing_group(), Some("second"));
        let sent: Vec<String> = sink.sent().into_iter().map(|(g, _)| g).collect();
        assert_eq!(sent, vec!["first"]);
    }

    #[tokio::test]
    async fn delivery_failures_do_not_abort() {
        let body = r#"{"organization":{"login":"acme"}}"#;
        let sink = Arc::new(RecordingSink::failing());
        let d = dispatcher(
            vec![
                binding("a", "k", Some("acme"), None),
                binding("b", "k", Some("acme"), None),
            ],
            MessageMode::Text,
            sink.clone(),
        );

        let sig = signed("k", body);
        let result = d.dispatch(request(&sig, body)).await;

        assert!(matches!(result, DispatchResult::Delivered(2)));
        assert_eq!(sink.sent().len(), 2);
    }

    #[tokio::test]
    async fn missing_headers_are_rejected_before_parsing() {
        let sink = Arc::new(RecordingSink::default());
        let d = dispatcher(vec![], MessageMode::Text, sink.clone());

        let result = d
            .dispatch(WebhookRequest {
                event: None,
                signature: Some("sha256=00"),
                body: b"not json",
            })
            .await;
        assert!(matches!(
            result,
            DispatchResult::Rejected(WebhookRejection::MissingHeaders)
        ));

        let result = d
            .dispatch(WebhookRequest {
                event: Some("push"),
                signature: Some(""),
                body: b"{}",
            })
            .await;
        assert!(matches!(
            result,
            DispatchResult::Rejected(WebhookRejection::MissingHeaders)
        ));
        let result = d
            .dispatch(WebhookRequest {
                event: Some(""),
                signature: Some("sha256=00"),
                body: b"{}",
            })
            .await;
        assert!(matches!(
            result,
            DispatchResult::Rejected(WebhookRejection::MissingHeaders)
        ));
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let sink = Arc::new(RecordingSink::default());
        let d = dispatcher(vec![], MessageMode::Text, sink.clone());

        let result = d.dispatch(request("sha256=00", "{not json")).await;
        let DispatchResult::Rejected(rejection) = result else {
            panic!("expected rejection");
        };
        assert!(matches!(rejection, WebhookRejection::MalformedPayload(_)));
        assert_eq!(rejection.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }
}
