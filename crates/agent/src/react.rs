//! ReAct executor: Thought → Action → Observation over a streaming gateway.
//!
//! Each turn sends the conversation plus the scratchpad to the gateway and
//! inspects the events that come back:
//!
//! - **Error** events are classified; retryable ones re-run the turn while
//!   the retry budget lasts, everything else ends the execution.
//! - An **Action** dispatches a tool. A final tool answer is returned as-is;
//!   otherwise its content becomes the observation for the next turn.
//! - **Final answer deltas** are streamed to the response sink as they
//!   arrive and concatenated into the returned answer.
//! - A turn with only **Unknown** events surfaces their text and stops.
//!
//! `execute` never fails: every error ends in an `Answer` carrying a fixed
//! apology and a stable error code.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use chatloop_config::AgentSettings;
use chatloop_core::{
    Action, AgentSteps, AllowAll, Answer, ChatContext, DefaultModel, ErrorTracker, Event,
    ExecutionError, ModelMetadataResolver, NoopTelemetry, NullResponseStream, ResourceAuthorizer,
    ResponseStream, SliLabels, SliSink, StepTransport, StreamOptions, StreamedResponse, ToolError,
    ToolOptions, ToolRegistry,
};

use crate::policy::{self, ErrorDecision};
use crate::request::RequestBuilder;
use crate::sanitize::LinkSanitizer;

/// Default cap on tool-dispatching turns per execution.
pub const MAX_ITERATIONS: usize = 10;

/// Default number of retryable gateway errors tolerated per execution.
pub const MAX_RETRY_STEP_FORWARD: u32 = 2;

/// Default time-to-first-token target.
pub const FIRST_TOKEN_APDEX_THRESHOLD: Duration = Duration::from_secs(5);

const AI_COMPONENT: &str = "duo_chat";

/// The ReAct orchestrator.
///
/// Holds only read-only collaborators, so one instance can serve any number
/// of concurrent executions. Per-execution state lives in `execute`.
pub struct ReactExecutor {
    tools: Arc<ToolRegistry>,
    stream: Arc<dyn ResponseStream>,
    error_tracker: Arc<dyn ErrorTracker>,
    sli: Arc<dyn SliSink>,
    model_resolver: Arc<dyn ModelMetadataResolver>,
    authorizer: Arc<dyn ResourceAuthorizer>,
    sanitizer: Option<LinkSanitizer>,
    labels: SliLabels,
    max_iterations: usize,
    max_retry_step_forward: u32,
    first_token_apdex_threshold: Duration,
    expanded_logging: bool,
    unavailable_resources: Vec<String>,
}

/// Mutable state owned by one `execute` call.
struct ExecutionState {
    turn: usize,
    retries_left: u32,
    chunk_id: u32,
    first_token_seen: bool,
}

/// What one turn's events ask the loop to do.
enum TurnOutcome<'a> {
    Failed { message: &'a str, retryable: bool },
    Act(&'a Action),
    Answer(String),
    Unknown(String),
}

impl ReactExecutor {
    /// Create an executor with no-op collaborators and default limits.
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            tools,
            stream: Arc::new(NullResponseStream),
            error_tracker: Arc::new(NoopTelemetry),
            sli: Arc::new(NoopTelemetry),
            model_resolver: Arc::new(DefaultModel),
            authorizer: Arc::new(AllowAll),
            sanitizer: None,
            labels: SliLabels::default(),
            max_iterations: MAX_ITERATIONS,
            max_retry_step_forward: MAX_RETRY_STEP_FORWARD,
            first_token_apdex_threshold: FIRST_TOKEN_APDEX_THRESHOLD,
            expanded_logging: false,
            unavailable_resources: vec!["Pipelines".into(), "Vulnerabilities".into()],
        }
    }

    /// Apply limits and answer post-processing from configuration.
    pub fn with_settings(mut self, settings: &AgentSettings) -> Self {
        self.max_iterations = settings.max_iterations;
        self.max_retry_step_forward = settings.max_retry_step_forward;
        self.first_token_apdex_threshold =
            Duration::from_millis(settings.first_token_apdex_threshold_ms);
        self.expanded_logging = settings.expanded_logging;
        self.unavailable_resources = settings.unavailable_resources.clone();
        self.sanitizer = settings
            .sanitize_final_answer
            .then(|| LinkSanitizer::new(settings.allowed_link_hosts.iter().cloned()));
        self
    }

    pub fn with_response_stream(mut self, stream: Arc<dyn ResponseStream>) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_error_tracker(mut self, tracker: Arc<dyn ErrorTracker>) -> Self {
        self.error_tracker = tracker;
        self
    }

    pub fn with_sli_sink(mut self, sli: Arc<dyn SliSink>) -> Self {
        self.sli = sli;
        self
    }

    pub fn with_model_resolver(mut self, resolver: Arc<dyn ModelMetadataResolver>) -> Self {
        self.model_resolver = resolver;
        self
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn ResourceAuthorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: LinkSanitizer) -> Self {
        self.sanitizer = Some(sanitizer);
        self
    }

    pub fn with_labels(mut self, labels: SliLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_max_retry_step_forward(mut self, max: u32) -> Self {
        self.max_retry_step_forward = max;
        self
    }

    pub fn with_first_token_apdex_threshold(mut self, threshold: Duration) -> Self {
        self.first_token_apdex_threshold = threshold;
        self
    }

    pub fn with_expanded_logging(mut self, enabled: bool) -> Self {
        self.expanded_logging = enabled;
        self
    }

    pub fn with_unavailable_resources(mut self, resources: Vec<String>) -> Self {
        self.unavailable_resources = resources;
        self
    }

    /// Run the loop to completion.
    ///
    /// `transport` must be fresh for this execution: its scratchpad is
    /// replayed to the gateway every turn.
    pub async fn execute<T>(
        &self,
        transport: &mut T,
        user_input: &str,
        context: &ChatContext,
    ) -> Answer
    where
        T: StepTransport + ?Sized,
    {
        let mut state = ExecutionState {
            turn: 0,
            retries_left: self.max_retry_step_forward,
            chunk_id: 0,
            first_token_seen: false,
        };

        match self.run(transport, user_input, context, &mut state).await {
            Ok(answer) => answer,
            Err(error) => self.fail(&error, context, &state),
        }
    }

    async fn run<T>(
        &self,
        transport: &mut T,
        user_input: &str,
        context: &ChatContext,
        state: &mut ExecutionState,
    ) -> Result<Answer, ExecutionError>
    where
        T: StepTransport + ?Sized,
    {
        let builder = RequestBuilder::new(
            user_input,
            context,
            self.authorizer.as_ref(),
            self.model_resolver.resolve(context),
            self.unavailable_resources.clone(),
        );

        loop {
            let checkpoint = transport.agent_steps().len();
            let request = builder.build(transport.agent_steps());

            info!(
                react_turn = state.turn,
                event_name = "react_turn",
                ai_component = AI_COMPONENT,
                "ReAct turn"
            );

            let events = {
                let mut on_event = |event: &Event| self.on_event(event, context, state);
                transport.step(&request, &mut on_event).await?
            };

            match interpret(&events) {
                TurnOutcome::Failed { message, retryable } => {
                    match policy::decide(message, retryable, state.retries_left) {
                        ErrorDecision::Retry => {
                            state.retries_left -= 1;
                            transport.truncate_steps(checkpoint);
                            warn!(
                                react_turn = state.turn,
                                retries_left = state.retries_left,
                                "Retryable agent error, stepping forward again"
                            );
                        }
                        ErrorDecision::Fail(kind) => {
                            return Err(ExecutionError::AgentEvent {
                                kind,
                                message: message.to_string(),
                            });
                        }
                    }
                }
                TurnOutcome::Act(action) => {
                    let answer = self.dispatch(action, context).await?;
                    if answer.is_final {
                        self.sli.increment_error_rate(&self.labels, false);
                        return Ok(answer);
                    }

                    transport.update_observation(&answer.content);
                    state.turn += 1;
                    if state.turn >= self.max_iterations {
                        return Err(ExecutionError::ExhaustedLoop {
                            iterations: state.turn,
                        });
                    }
                }
                TurnOutcome::Answer(content) => {
                    let content = match &self.sanitizer {
                        Some(sanitizer) => sanitizer.sanitize(&content),
                        None => content,
                    };
                    return Ok(self.finish(content, transport.agent_steps()));
                }
                TurnOutcome::Unknown(content) => {
                    warn!(
                        react_turn = state.turn,
                        "Surfacing unknown agent event as the final answer"
                    );
                    return Ok(self.finish(content, transport.agent_steps()));
                }
            }
        }
    }

    /// Streaming callback: forwards answer deltas and records first-token latency.
    fn on_event(&self, event: &Event, context: &ChatContext, state: &mut ExecutionState) {
        let Event::FinalAnswerDelta { text } = event else {
            return;
        };

        state.chunk_id += 1;
        if !state.first_token_seen {
            state.first_token_seen = true;
            self.record_first_token(context);
        }

        let chunk_id = state.chunk_id;
        self.stream.execute(
            StreamedResponse {
                content: text.clone(),
                chunk_id,
            },
            StreamOptions { chunk_id },
        );
    }

    fn record_first_token(&self, context: &ChatContext) {
        let Some(started_at) = context.started_at else {
            return;
        };

        let elapsed = Utc::now().signed_duration_since(started_at);
        // A start time in the future (clock skew) counts as instant.
        let success = elapsed
            .to_std()
            .map_or(true, |elapsed| elapsed <= self.first_token_apdex_threshold);

        debug!(
            elapsed_ms = elapsed.num_milliseconds(),
            success, "First token streamed"
        );
        self.sli.increment_apdex(&self.labels, success);
    }

    async fn dispatch(
        &self,
        action: &Action,
        context: &ChatContext,
    ) -> Result<Answer, ExecutionError> {
        let Some(tool) = self.tools.resolve(&action.tool) else {
            return Err(ToolError::NotFound(action.tool.clone()).into());
        };

        if self.expanded_logging {
            info!(
                tool = %action.tool,
                tool_input = %action.tool_input,
                thought = %action.thought,
                ai_component = AI_COMPONENT,
                "ReAct calling tool"
            );
        } else {
            info!(tool = %action.tool, ai_component = AI_COMPONENT, "ReAct calling tool");
        }

        let options = ToolOptions {
            input: action.tool_input.clone(),
            suggestions: action.thought.clone(),
        };
        let answer = tool.execute(context, options).await?;

        debug!(tool = %action.tool, is_final = answer.is_final, "Tool returned");
        Ok(answer)
    }

    fn finish(&self, content: String, steps: &AgentSteps) -> Answer {
        self.sli.increment_error_rate(&self.labels, false);
        let scratchpad = serde_json::to_value(steps).unwrap_or_else(|_| Value::Array(Vec::new()));
        Answer::final_answer(content).with_extra("agent_scratchpad", scratchpad)
    }

    fn fail(&self, error: &ExecutionError, context: &ChatContext, state: &ExecutionState) -> Answer {
        let code = error.error_code();

        if error.is_tracked() {
            let mut details = Map::new();
            details.insert("user".into(), Value::String(context.user.clone()));
            details.insert("error_code".into(), Value::String(code.as_str().into()));
            details.insert("react_turn".into(), Value::from(state.turn));
            details.insert("ai_component".into(), Value::String(AI_COMPONENT.into()));
            self.error_tracker.track(error, &details);
        }

        if error.counts_against_sli() {
            self.sli.increment_error_rate(&self.labels, true);
        }

        warn!(
            error_code = %code,
            error_kind = error.kind(),
            react_turn = state.turn,
            "ReAct execution failed: {error}"
        );
        Answer::error(code)
    }
}

/// Decide what one turn's events mean.
///
/// Precedence: the first error, then the most recent action, then answer
/// deltas. Unknown events only matter when nothing else arrived.
fn interpret(events: &[Event]) -> TurnOutcome<'_> {
    let error = events.iter().find_map(|event| match event {
        Event::Error { message, retryable } => Some((message.as_str(), *retryable)),
        _ => None,
    });
    if let Some((message, retryable)) = error {
        return TurnOutcome::Failed { message, retryable };
    }

    let action = events.iter().rev().find_map(|event| match event {
        Event::Action(action) => Some(action),
        _ => None,
    });
    if let Some(action) = action {
        return TurnOutcome::Act(action);
    }

    let mut content = String::new();
    let mut unknown = String::new();
    let mut has_delta = false;
    for event in events {
        match event {
            Event::FinalAnswerDelta { text } => {
                has_delta = true;
                content.push_str(text);
            }
            Event::Unknown { text } => unknown.push_str(text),
            Event::Error { .. } | Event::Action(_) => {}
        }
    }

    if has_delta || events.is_empty() {
        TurnOutcome::Answer(content)
    } else {
        TurnOutcome::Unknown(unknown)
    }
}
