//! The request payload sent to the gateway for one turn.
//!
//! `StepRequest` is rebuilt fresh every turn. Only the scratchpad message
//! changes between turns; the user message and metadata are stable for the
//! lifetime of one execution.

use serde::{Deserialize, Serialize};

use crate::agent_step::AgentSteps;
use crate::context::{AdditionalContext, ChatContext, Role};

/// Payload for one `step()` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRequest {
    /// Ordered messages: history, then the user turn, then the scratchpad.
    pub messages: Vec<RequestMessage>,

    /// Provider/model selection. Serialized as `null` when unset.
    pub model_metadata: Option<ModelMetadata>,

    /// Capabilities the current actor cannot use.
    pub unavailable_resources: Vec<String>,
}

impl StepRequest {
    /// The scratchpad replayed in this request, if any.
    pub fn agent_scratchpad(&self) -> Option<&AgentSteps> {
        self.messages.iter().find_map(|message| match message {
            RequestMessage::Scratchpad {
                agent_scratchpad, ..
            } => Some(agent_scratchpad),
            _ => None,
        })
    }
}

/// One entry of `StepRequest::messages`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestMessage {
    /// The current question with its page and file context.
    User(UserMessage),

    /// Synthetic assistant message replaying the scratchpad.
    Scratchpad {
        role: Role,
        agent_scratchpad: AgentSteps,
    },

    /// A prior conversation message.
    History { role: Role, content: String },
}

impl RequestMessage {
    pub fn scratchpad(steps: AgentSteps) -> Self {
        Self::Scratchpad {
            role: Role::Assistant,
            agent_scratchpad: steps,
        }
    }
}

/// The first (user) message of a request. Absent context is `null`, never omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserMessage {
    pub role: Role,
    pub content: String,
    pub context: Option<PageContext>,
    pub current_file: Option<CurrentFile>,
    pub additional_context: Vec<AdditionalContext>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    #[serde(rename = "type")]
    pub page_type: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentFile {
    pub file_path: String,
    pub data: String,
    pub selected_code: bool,
}

/// Model selection forwarded to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelMetadata {
    /// A customer-hosted model endpoint.
    SelfHosted {
        api_key: Option<String>,
        endpoint: String,
        name: String,
        provider: String,
        identifier: Option<String>,
    },

    /// A model chosen through a namespace-level feature setting.
    Namespace {
        provider: String,
        identifier: Option<String>,
        feature_setting: String,
    },

    /// Amazon Q integration.
    AmazonQ {
        provider: String,
        name: String,
        role_arn: String,
    },
}

impl ModelMetadata {
    pub fn namespace(identifier: Option<String>, feature_setting: impl Into<String>) -> Self {
        Self::Namespace {
            provider: "gitlab".into(),
            identifier,
            feature_setting: feature_setting.into(),
        }
    }

    pub fn amazon_q(role_arn: impl Into<String>) -> Self {
        Self::AmazonQ {
            provider: "amazon_q".into(),
            name: "amazon_q".into(),
            role_arn: role_arn.into(),
        }
    }

    pub fn provider(&self) -> &str {
        match self {
            Self::SelfHosted { provider, .. }
            | Self::Namespace { provider, .. }
            | Self::AmazonQ { provider, .. } => provider,
        }
    }
}

/// Resolves which model the gateway should use for a request.
pub trait ModelMetadataResolver: Send + Sync {
    fn resolve(&self, context: &ChatContext) -> Option<ModelMetadata>;
}

/// Always defers to the gateway's default model.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultModel;

impl ModelMetadataResolver for DefaultModel {
    fn resolve(&self, _context: &ChatContext) -> Option<ModelMetadata> {
        None
    }
}
