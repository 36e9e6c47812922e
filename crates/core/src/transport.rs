//! Step transport trait: the abstraction over one streaming gateway call.
//!
//! A transport instance belongs to exactly one execution. It owns the
//! scratchpad for that execution, records every `action` event it parses,
//! and lets the orchestrator attach tool observations between turns.

use async_trait::async_trait;

use crate::agent_step::AgentSteps;
use crate::error::TransportError;
use crate::event::Event;
use crate::request::StepRequest;

/// Callback invoked for each event as soon as it is parsed.
pub type EventCallback<'a> = dyn FnMut(&Event) + Send + 'a;

#[async_trait]
pub trait StepTransport: Send {
    /// Issue one streaming request and collect its events in arrival order.
    ///
    /// `on_event` sees every event before it is returned, so partial answers
    /// can be forwarded while the stream is still open.
    async fn step(
        &mut self,
        request: &StepRequest,
        on_event: &mut EventCallback<'_>,
    ) -> std::result::Result<Vec<Event>, TransportError>;

    /// The scratchpad accumulated so far.
    fn agent_steps(&self) -> &AgentSteps;

    /// Attach a tool's output to the most recent unanswered action.
    fn update_observation(&mut self, observation: &str);

    /// Forget every step recorded after the first `len`.
    ///
    /// Used when a turn is retried, so actions from the abandoned turn are
    /// not replayed.
    fn truncate_steps(&mut self, len: usize);
}
