//! Per-request chat context: who is asking, what they are looking at, and
//! the conversation so far.
//!
//! A `ChatContext` is read-only input to one execution. It is built by the
//! caller with the `with_*` builders and borrowed by the orchestrator and
//! by every tool it dispatches to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// A prior message replayed ahead of the current question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

impl HistoryMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The page or record the user is currently viewing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Kind of record, e.g. `issue`, `epic`, `merge_request`.
    pub resource_type: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Code the user selected in an editor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectedFile {
    pub file_name: String,
    pub selected_text: String,
    #[serde(default)]
    pub content_above_cursor: String,
    #[serde(default)]
    pub content_below_cursor: String,
}

/// A whole file attached as an extra resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub path: String,
    pub data: String,
}

/// Extra context items forwarded verbatim to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalContext {
    pub category: String,
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Everything the orchestrator knows about the caller for one execution.
#[derive(Debug, Clone, Default)]
pub struct ChatContext {
    /// Identifier of the asking user.
    pub user: String,
    pub resource: Option<Resource>,
    pub current_file: Option<SelectedFile>,
    pub blob: Option<Blob>,
    pub additional_context: Vec<AdditionalContext>,
    /// When the user submitted the question; drives the first-token apdex.
    pub started_at: Option<DateTime<Utc>>,
    /// Top-level group the request is billed against, if any.
    pub root_namespace: Option<String>,
    pub history: Vec<HistoryMessage>,
}

impl ChatContext {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ..Self::default()
        }
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn with_current_file(mut self, file: SelectedFile) -> Self {
        self.current_file = Some(file);
        self
    }

    pub fn with_blob(mut self, blob: Blob) -> Self {
        self.blob = Some(blob);
        self
    }

    pub fn with_additional_context(mut self, item: AdditionalContext) -> Self {
        self.additional_context.push(item);
        self
    }

    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self
    }

    pub fn with_root_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.root_namespace = Some(namespace.into());
        self
    }

    pub fn with_history(mut self, history: Vec<HistoryMessage>) -> Self {
        self.history = history;
        self
    }
}

/// Decides whether the user may see a resource's details.
///
/// Unauthorized resources are omitted from the request entirely.
pub trait ResourceAuthorizer: Send + Sync {
    fn can_read(&self, user: &str, resource: &Resource) -> bool;
}

/// Authorizer that admits every resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl ResourceAuthorizer for AllowAll {
    fn can_read(&self, _user: &str, _resource: &Resource) -> bool {
        true
    }
}
