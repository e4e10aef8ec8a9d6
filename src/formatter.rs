//! Rendering push payloads into chat messages

use serde::Serialize;
use serde_json::Value;

use crate::MessageMode;
use crate::payload::{PushPayload, fallback};

pub const BOT_NICKNAME: &str = "GitHub Bot";
pub const NOTIFICATION_TITLE: &str = "GitHub Push Notification";

/// The message sent to every matched group for one push.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Text(String),
    Forward(ForwardMessage),
}

impl OutboundMessage {
    /// Renders the payload in the given mode.
    pub fn build(mode: MessageMode, payload: &Value) -> Self {
        match mode {
            MessageMode::Text => OutboundMessage::Text(format_to_text(payload)),
            MessageMode::Forward => OutboundMessage::Forward(format_to_json(payload)),
        }
    }

    /// Flat text of the message, used for debug logging.
    pub fn to_plain_text(&self) -> String {
        match self {
            OutboundMessage::Text(text) => text.clone(),
            OutboundMessage::Forward(forward) => forward
                .messages
                .iter()
                .flat_map(|node| match node {
                    ForwardNode::Node(data) => data.content.iter(),
                })
                .map(|segment| match segment {
                    Segment::Text { text } => text.as_str(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Forwarded-message bundle understood by `send_group_forward_msg`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForwardMessage {
    pub prompt: String,
    pub summary: String,
    pub source: String,
    pub messages: Vec<ForwardNode>,
    pub news: Vec<NewsItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ForwardNode {
    Node(NodeData),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeData {
    pub user_id: String,
    pub nickname: String,
    pub content: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Segment {
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsItem {
    pub text: String,
}

impl ForwardNode {
    fn text(text: String) -> Self {
        ForwardNode::Node(NodeData {
            user_id: String::new(),
            nickname: BOT_NICKNAME.to_string(),
            content: vec![Segment::Text { text }],
        })
    }
}

/// Builds the plain text report for a push.
pub fn format_to_text(raw: &Value) -> String {
    let payload = PushPayload::new(raw);
    let commits = payload.commits();

    let commit_details = if commits.is_empty() {
        format!("  {}", fallback::COMMIT_DETAILS)
    } else {
        commits
            .iter()
            .map(|commit| {
                let message = commit
                    .message()
                    .unwrap_or("")
                    .replace("\r\n", " ")
                    .replace('\n', " ");
                format!(
                    "  - Commit: {}\n    Message: {}\n    Link: {}",
                    commit.short_id(),
                    message,
                    commit.url()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "[{}]\n\
         Repository: {}\n\
         Repository URL: {}\n\
         Branch: {}\n\
         Pusher: {}\n\
         Push time: {}\n\
         Commits: {}\n\
         Commit details:\n{}\n\
         Compare: {}",
        NOTIFICATION_TITLE,
        payload.repository_or_default(),
        payload.repository_url(),
        payload.branch(),
        payload.pusher_name(),
        payload.push_time(),
        commits.len(),
        commit_details,
        payload.compare_url(),
    )
}

/// Builds the forwarded-message tree for a push: a summary node, one node per
/// commit and a trailing links node.
pub fn format_to_json(raw: &Value) -> ForwardMessage {
    let payload = PushPayload::new(raw);
    let repo_name = payload.repository_or_default();
    let commits = payload.commits();

    let mut messages = Vec::with_capacity(commits.len() + 2);
    let mut news = Vec::with_capacity(commits.len());

    messages.push(ForwardNode::text(format!(
        "Repository: {}\n\
         Branch: {}\n\
         Pusher: {} ({})\n\
         Push time: {}\n\
         Commits: {}\n",
        repo_name,
        payload.branch(),
        payload.pusher_name(),
        payload.pusher_email(),
        payload.push_time(),
        commits.len(),
    )));

    for commit in &commits {
        let short_id = commit.short_id();
        let message = commit.message().unwrap_or(fallback::COMMIT_MESSAGE);

        messages.push(ForwardNode::text(format!(
            "Commit: {}\nMessage: {}\nAuthor: {} ({})\nLink: {}",
            short_id,
            message,
            commit.author_name(),
            commit.author_email(),
            commit.url(),
        )));
        news.push(NewsItem {
            text: format!("{}: {}", short_id, message),
        });
    }

    messages.push(ForwardNode::text(format!(
        "Repository URL: {}\nCompare: {}",
        payload.repository_url(),
        payload.compare_url(),
    )));

    ForwardMessage {
        prompt: NOTIFICATION_TITLE.to_string(),
        summary: format!("Repository: {}", repo_name),
        source: NOTIFICATION_TITLE.to_string(),
        messages,
        news,
    }
}
