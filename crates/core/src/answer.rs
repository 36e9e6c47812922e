//! The result handed back to the caller of one agent execution.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const GENERIC_APOLOGY: &str = "I'm sorry, I can't generate a response. Please try again.";

/// Stable, client-facing error codes.
///
/// Clients surface these for support and diagnostics, so the string values
/// must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "A1000")]
    Timeout,
    #[serde(rename = "A1001")]
    ConnectionFailed,
    #[serde(rename = "A1002")]
    ServerError,
    #[serde(rename = "A1003")]
    UnexpectedEof,
    #[serde(rename = "A1004")]
    AgentEvent,
    #[serde(rename = "A1005")]
    PromptTooLong,
    #[serde(rename = "A1006")]
    ExhaustedLoop,
    #[serde(rename = "A9999")]
    Unknown,
    #[serde(rename = "G3001")]
    LicenseMismatch,
    #[serde(rename = "M3006")]
    Forbidden,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "A1000",
            Self::ConnectionFailed => "A1001",
            Self::ServerError => "A1002",
            Self::UnexpectedEof => "A1003",
            Self::AgentEvent => "A1004",
            Self::PromptTooLong => "A1005",
            Self::ExhaustedLoop => "A1006",
            Self::Unknown => "A9999",
            Self::LicenseMismatch => "G3001",
            Self::Forbidden => "M3006",
        }
    }

    /// The fixed apology shown to the user for this code.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Timeout => "I'm sorry, I couldn't respond in time. Please try again.",
            Self::PromptTooLong => {
                "I'm sorry, you've entered too many prompts. Please run /clear or /reset \
                 before asking the next question."
            }
            Self::ExhaustedLoop => {
                "I'm sorry, Duo Chat agent reached the limit before finding an answer for your \
                 question. Please try a different prompt or clear your conversation history \
                 with /clear."
            }
            Self::LicenseMismatch => {
                "I'm sorry, but answering this question requires a different Duo subscription \
                 tier. Please contact your administrator."
            }
            Self::Forbidden => {
                "I'm sorry, you don't have the GitLab Duo subscription required to use Duo \
                 Chat. Please contact your administrator."
            }
            Self::ConnectionFailed
            | Self::ServerError
            | Self::UnexpectedEof
            | Self::AgentEvent
            | Self::Unknown => GENERIC_APOLOGY,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A terminal or intermediate answer.
///
/// Tools return non-final answers whose `content` becomes the observation
/// for the next turn; everything the orchestrator returns is final.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub is_final: bool,
    pub content: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extras: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

impl Answer {
    pub fn final_answer(content: impl Into<String>) -> Self {
        Self {
            is_final: true,
            content: content.into(),
            extras: Map::new(),
            error_code: None,
        }
    }

    /// A non-final answer, typically a tool observation.
    pub fn observation(content: impl Into<String>) -> Self {
        Self {
            is_final: false,
            ..Self::final_answer(content)
        }
    }

    /// A final answer carrying the fixed apology for `code`.
    pub fn error(code: ErrorCode) -> Self {
        Self {
            error_code: Some(code),
            ..Self::final_answer(code.user_message())
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    pub fn is_error(&self) -> bool {
        self.error_code.is_some()
    }
}
