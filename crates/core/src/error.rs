//! Error types for the chatloop domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Each bounded context
//! (transport, tools) has its own enum; `ExecutionError` is the union the
//! orchestrator tracks and converts into a terminal `Answer`.

use thiserror::Error;

use crate::answer::ErrorCode;

/// Failures raised by the step transport while talking to the gateway.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Gateway request timed out: {0}")]
    Timeout(String),

    #[error("Gateway connection failed: {0}")]
    Connection(String),

    #[error("Gateway refused access (status 403): {body}")]
    Forbidden { body: String },

    #[error("Gateway client error (status {status}): {body}")]
    Client { status: u16, body: String },

    #[error("Gateway server error (status {status}): {body}")]
    Server { status: u16, body: String },

    #[error("Gateway stream ended unexpectedly: {0}")]
    UnexpectedEof(String),

    #[error("Gateway request could not be built: {0}")]
    Request(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool input: {0}")]
    InvalidInput(String),
}

/// How a protocol-level `error` event was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentEventErrorKind {
    /// The prompt exceeded the model's context window.
    PromptTooLong,
    /// A retryable error arrived after the retry budget was spent.
    RetriesExhausted,
    /// The requested capability is not covered by the caller's license.
    LicenseMismatch,
    Generic,
}

/// Everything that can end an execution early.
///
/// This is the value handed to the error tracker, so telemetry can tell
/// "agent never converged" apart from transport or tool failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Agent event error ({kind:?}): {message}")]
    AgentEvent {
        kind: AgentEventErrorKind,
        message: String,
    },

    #[error("Agent loop exhausted after {iterations} iterations")]
    ExhaustedLoop { iterations: usize },
}

impl ExecutionError {
    /// The stable, client-facing code for this failure.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Transport(TransportError::Timeout(_)) => ErrorCode::Timeout,
            Self::Transport(TransportError::Connection(_)) => ErrorCode::ConnectionFailed,
            Self::Transport(TransportError::Forbidden { .. }) => ErrorCode::Forbidden,
            Self::Transport(TransportError::Client { .. }) => ErrorCode::ConnectionFailed,
            Self::Transport(TransportError::Server { .. }) => ErrorCode::ServerError,
            Self::Transport(TransportError::UnexpectedEof(_)) => ErrorCode::UnexpectedEof,
            Self::Transport(TransportError::Request(_)) => ErrorCode::ConnectionFailed,
            Self::Tool(ToolError::Timeout { .. }) => ErrorCode::Timeout,
            Self::Tool(_) => ErrorCode::Unknown,
            Self::AgentEvent { kind, .. } => match kind {
                AgentEventErrorKind::PromptTooLong => ErrorCode::PromptTooLong,
                AgentEventErrorKind::LicenseMismatch => ErrorCode::LicenseMismatch,
                AgentEventErrorKind::RetriesExhausted | AgentEventErrorKind::Generic => {
                    ErrorCode::AgentEvent
                }
            },
            Self::ExhaustedLoop { .. } => ErrorCode::ExhaustedLoop,
        }
    }

    /// A short machine-readable name, used as the tracked error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(TransportError::Timeout(_)) => "read_timeout",
            Self::Transport(TransportError::Connection(_)) => "connection_error",
            Self::Transport(TransportError::Forbidden { .. }) => "forbidden_error",
            Self::Transport(TransportError::Client { .. }) => "client_error",
            Self::Transport(TransportError::Server { .. }) => "server_error",
            Self::Transport(TransportError::UnexpectedEof(_)) => "eof_error",
            Self::Transport(TransportError::Request(_)) => "request_error",
            Self::Tool(ToolError::NotFound(_)) => "tool_not_found",
            Self::Tool(ToolError::Timeout { .. }) => "read_timeout",
            Self::Tool(_) => "tool_error",
            Self::AgentEvent { .. } => "agent_event_error",
            Self::ExhaustedLoop { .. } => "exhausted_loop_error",
        }
    }

    /// Whether this failure is reported to the error tracker.
    ///
    /// An unknown tool name is an answer-quality problem, not an incident.
    pub fn is_tracked(&self) -> bool {
        !matches!(self, Self::Tool(ToolError::NotFound(_)))
    }

    /// Whether this failure counts against the first-token error-rate SLI.
    ///
    /// Missing entitlements are excluded: the service worked as intended.
    pub fn counts_against_sli(&self) -> bool {
        !matches!(self, Self::Transport(TransportError::Forbidden { .. }))
    }
}
