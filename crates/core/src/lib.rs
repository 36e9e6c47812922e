//! # chatloop core
//!
//! Domain types, collaborator traits, and error definitions for the
//! chatloop ReAct agent loop. Every other crate depends inward on this one.
//!
//! ## Layout
//!
//! - `event`: the gateway's streaming protocol events and their parser
//! - `agent_step`: the per-execution scratchpad of actions and observations
//! - `request`: the payload sent to the gateway each turn
//! - `answer`: the result handed back to the caller, plus stable error codes
//! - `transport`, `tool`, `stream`, `metrics`, `context`: collaborator seams

pub mod agent_step;
pub mod answer;
pub mod context;
pub mod error;
pub mod event;
pub mod metrics;
pub mod request;
pub mod stream;
pub mod tool;
pub mod transport;

// Re-export key types at crate root for ergonomics
pub use agent_step::{AgentStep, AgentSteps};
pub use answer::{Answer, ErrorCode};
pub use context::{
    AdditionalContext, AllowAll, Blob, ChatContext, HistoryMessage, Resource, ResourceAuthorizer,
    Role, SelectedFile,
};
pub use error::{AgentEventErrorKind, ExecutionError, ToolError, TransportError};
pub use event::{Action, Event};
pub use metrics::{ErrorTracker, NoopTelemetry, SliLabels, SliSink};
pub use request::{
    CurrentFile, DefaultModel, ModelMetadata, ModelMetadataResolver, PageContext, RequestMessage,
    StepRequest, UserMessage,
};
pub use stream::{NullResponseStream, ResponseStream, StreamOptions, StreamedResponse};
pub use tool::{Tool, ToolOptions, ToolRegistry};
pub use transport::{EventCallback, StepTransport};
