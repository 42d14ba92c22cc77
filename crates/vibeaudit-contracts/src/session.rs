//! Audit session identity, parameters, lifecycle states, and log events.
//!
//! These types describe what flows through a live session. They carry no
//! behaviour beyond validation; the controller in `vibeaudit-core` owns all
//! transitions.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    error::{AuditError, AuditResult},
    payload::FinalPayload,
};

/// Smallest page budget a session may request.
pub const MIN_PAGES: u32 = 1;

/// Largest page budget a session may request.
pub const MAX_PAGES: u32 = 5;

/// Unique identifier for one audit session, used as a tracing field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub uuid::Uuid);

impl SessionId {
    /// Create a new, unique session ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The parameters a user submits to launch an audit.
///
/// Only constructible through `new` / `from_parts`, so a value of this type
/// always holds an http(s) URL with a host and a page budget in
/// `MIN_PAGES..=MAX_PAGES`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditParams {
    url: String,
    max_pages: u32,
    intent: Option<String>,
}

impl AuditParams {
    /// Validate and build a parameter set.
    ///
    /// A blank intent is normalized to `None`.
    pub fn new(url: &str, max_pages: u32, intent: Option<&str>) -> AuditResult<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AuditError::InvalidParameters {
                reason: "URL is required".to_string(),
            });
        }

        let parsed = Url::parse(url).map_err(|e| AuditError::InvalidParameters {
            reason: format!("invalid URL format: {e}"),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AuditError::InvalidParameters {
                reason: "URL must start with http:// or https://".to_string(),
            });
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(AuditError::InvalidParameters {
                reason: "URL must include a domain name".to_string(),
            });
        }

        if !(MIN_PAGES..=MAX_PAGES).contains(&max_pages) {
            return Err(AuditError::InvalidParameters {
                reason: format!(
                    "max_pages must be between {MIN_PAGES} and {MAX_PAGES}, got {max_pages}"
                ),
            });
        }

        let intent = intent
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self {
            url: url.to_string(),
            max_pages,
            intent,
        })
    }

    /// Build from optionally-present values, reporting every absent one.
    ///
    /// Returns `MissingSessionParameters` when the URL or page budget is
    /// absent; this is the "no prior configuration" case, not a bad value.
    pub fn from_parts(
        url: Option<&str>,
        max_pages: Option<u32>,
        intent: Option<&str>,
    ) -> AuditResult<Self> {
        let mut missing = Vec::new();
        if url.map_or(true, |u| u.trim().is_empty()) {
            missing.push("url".to_string());
        }
        if max_pages.is_none() {
            missing.push("max_pages".to_string());
        }

        match (url, max_pages) {
            (Some(url), Some(max_pages)) if missing.is_empty() => {
                Self::new(url, max_pages, intent)
            }
            _ => Err(AuditError::MissingSessionParameters { missing }),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    pub fn intent(&self) -> Option<&str> {
        self.intent.as_deref()
    }
}

/// Lifecycle of a single audit session.
///
/// `Completed`, `Errored`, and `Stopped` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Running,
    Completed,
    Errored,
    Stopped,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Errored | Self::Stopped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Errored => "errored",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of event kinds a timeline entry can have.
///
/// `Divider` is recognized on the wire and kept in the timeline, but the
/// presentation layer does not render it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Success,
    Error,
    Progress,
    Step,
    Thought,
    Action,
    Result,
    Url,
    Stopped,
    Divider,
}

impl LogKind {
    /// Map a wire tag to a kind. Unknown and absent tags become `Info`.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("info") => Self::Info,
            Some("success") => Self::Success,
            Some("error") => Self::Error,
            Some("progress") => Self::Progress,
            Some("step") => Self::Step,
            Some("thought") => Self::Thought,
            Some("action") => Self::Action,
            Some("result") => Self::Result,
            Some("url") => Self::Url,
            Some("stopped") => Self::Stopped,
            Some("divider") => Self::Divider,
            _ => Self::Info,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
            Self::Progress => "progress",
            Self::Step => "step",
            Self::Thought => "thought",
            Self::Action => "action",
            Self::Result => "result",
            Self::Url => "url",
            Self::Stopped => "stopped",
            Self::Divider => "divider",
        }
    }

    pub fn is_rendered(self) -> bool {
        self != Self::Divider
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable entry in a session timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub kind: LogKind,
    pub message: String,
    /// Viewport the event refers to, when the worker supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<u32>,
}

impl LogEvent {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            viewport: None,
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    /// The worker delivered its final payload.
    Completed(Box<FinalPayload>),
    /// The connection failed, the worker reported an error, or it went idle.
    Errored(AuditError),
    /// The user stopped the session.
    Stopped,
}

impl SessionOutcome {
    /// The final payload, or why there is none. A stopped session yields
    /// `UserCancelled`.
    pub fn result(&self) -> AuditResult<&FinalPayload> {
        match self {
            Self::Completed(payload) => Ok(payload.as_ref()),
            Self::Errored(error) => Err(error.clone()),
            Self::Stopped => Err(AuditError::UserCancelled),
        }
    }
}
