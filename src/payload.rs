//! Read-only view over an untrusted GitHub push payload
//!
//! Every accessor tolerates missing or mistyped fields and falls back to the
//! placeholders in [`fallback`].

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

/// Placeholder text used when a payload field is absent.
pub mod fallback {
    pub const REPOSITORY: &str = "unknown repository";
    pub const BRANCH: &str = "unknown branch";
    pub const PUSHER: &str = "unknown pusher";
    pub const EMAIL: &str = "unknown email";
    pub const AUTHOR: &str = "unknown author";
    pub const LINK: &str = "no link";
    pub const COMPARE_LINK: &str = "no compare link";
    pub const TIME: &str = "unknown time";
    pub const COMMIT_MESSAGE: &str = "no commit message";
    pub const COMMIT_DETAILS: &str = "no commit details";
}

const BRANCH_REF_PREFIX: &str = "refs/heads/";
const SHORT_ID_LEN: usize = 7;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";
const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Follows `path` through nested objects and returns the string found there.
fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |current, key| current.get(key))
        .and_then(Value::as_str)
}

#[derive(Debug, Clone, Copy)]
pub struct PushPayload<'a> {
    raw: &'a Value,
}

impl<'a> PushPayload<'a> {
    pub fn new(raw: &'a Value) -> Self {
        Self { raw }
    }

    /// `organization.login`, only when the payload carries an `organization` key.
    pub fn organization(&self) -> Option<&'a str> {
        self.raw
            .get("organization")
            .and_then(|org| org.get("login"))
            .and_then(Value::as_str)
    }

    /// `repository.full_name`, only when the payload carries a `repository` key.
    pub fn repository(&self) -> Option<&'a str> {
        str_at(self.raw, &["repository", "full_name"])
    }

    pub fn repository_or_default(&self) -> &'a str {
        self.repository().unwrap_or(fallback::REPOSITORY)
    }

    pub fn repository_url(&self) -> &'a str {
        str_at(self.raw, &["repository", "html_url"]).unwrap_or(fallback::LINK)
    }

    /// Branch name with any `refs/heads/` prefix removed.
    pub fn branch(&self) -> &'a str {
        match str_at(self.raw, &["ref"]) {
            Some(git_ref) => git_ref.strip_prefix(BRANCH_REF_PREFIX).unwrap_or(git_ref),
            None => fallback::BRANCH,
        }
    }

    pub fn pusher_name(&self) -> &'a str {
        str_at(self.raw, &["pusher", "name"]).unwrap_or(fallback::PUSHER)
    }

    pub fn pusher_email(&self) -> &'a str {
        str_at(self.raw, &["pusher", "email"]).unwrap_or(fallback::EMAIL)
    }

    pub fn compare_url(&self) -> &'a str {
        str_at(self.raw, &["compare"]).unwrap_or(fallback::COMPARE_LINK)
    }

    /// Push time taken from `head_commit.timestamp`, rendered for display.
    pub fn push_time(&self) -> String {
        str_at(self.raw, &["head_commit", "timestamp"])
            .and_then(format_timestamp)
            .unwrap_or_else(|| fallback::TIME.to_string())
    }

    pub fn commits(&self) -> Vec<CommitView<'a>> {
        self.raw
            .get("commits")
            .and_then(Value::as_array)
            .map(|commits| commits.iter().map(CommitView::new).collect())
            .unwrap_or_default()
    }
}

/// One entry of the payload's `commits` array.
#[derive(Debug, Clone, Copy)]
pub struct CommitView<'a> {
    raw: &'a Value,
}

impl<'a> CommitView<'a> {
    fn new(raw: &'a Value) -> Self {
        Self { raw }
    }

    pub fn short_id(&self) -> String {
        abbreviate_commit_id(str_at(self.raw, &["id"]).unwrap_or(""))
    }

    /// Commit message with surrounding whitespace trimmed, if present.
    pub fn message(&self) -> Option<&'a str> {
        str_at(self.raw, &["message"]).map(str::trim)
    }

    pub fn url(&self) -> &'a str {
        str_at(self.raw, &["url"]).unwrap_or(fallback::LINK)
    }

    pub fn author_name(&self) -> &'a str {
        str_at(self.raw, &["author", "name"]).unwrap_or(fallback::AUTHOR)
    }

    pub fn author_email(&self) -> &'a str {
        str_at(self.raw, &["author", "email"]).unwrap_or(fallback::EMAIL)
    }
}

/// First seven characters of a commit id.
pub fn abbreviate_commit_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

/// Parses `YYYY-MM-DDTHH:MM:SS±HHMM` and renders `YYYY-MM-DD HH:MM:SS <zone>`.
///
/// A trailing `Z` is read as `+0000`. Returns `None` on any parse failure.
pub fn format_timestamp(timestamp: &str) -> Option<String> {
    let normalized = match timestamp.strip_suffix('Z') {
        Some(rest) => format!("{}+0000", rest),
        None => timestamp.to_string(),
    };
    let parsed = DateTime::parse_from_str(&normalized, TIMESTAMP_FORMAT).ok()?;
    Some(format!(
        "{} {}",
        parsed.format(DISPLAY_TIME_FORMAT),
        zone_name(parsed.offset())
    ))
}

/// `UTC` for a zero offset, otherwise `UTC±HH:MM`.
fn zone_name(offset: &FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    if seconds == 0 {
        return "UTC".to_string();
    }
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.unsigned_abs() / 60;
    format!("UTC{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
}
