//! Shared test helpers for executor tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chatloop_core::{
    Action, AgentSteps, Answer, ChatContext, ErrorTracker, Event, EventCallback, ExecutionError,
    ResponseStream, SliLabels, SliSink, StepRequest, StepTransport, StreamOptions,
    StreamedResponse, Tool, ToolError, ToolOptions, ToolRegistry, TransportError,
};
use serde_json::{Map, Value};

use crate::react::ReactExecutor;

/// A transport that replays scripted turns.
///
/// Each call to `step` returns the next scripted turn. Panics if more calls
/// are made than turns provided, unless built with `always`.
pub struct ScriptedTransport {
    turns: Vec<Result<Vec<Event>, TransportError>>,
    repeat: Option<Vec<Event>>,
    steps: AgentSteps,
    pub requests: Vec<StepRequest>,
}

impl ScriptedTransport {
    pub fn new(turns: Vec<Result<Vec<Event>, TransportError>>) -> Self {
        Self {
            turns,
            repeat: None,
            steps: AgentSteps::new(),
            requests: Vec::new(),
        }
    }

    /// Answer every turn with the same events.
    pub fn always(events: Vec<Event>) -> Self {
        Self {
            repeat: Some(events),
            ..Self::new(Vec::new())
        }
    }

    /// Start from an existing scratchpad.
    pub fn with_steps(mut self, steps: AgentSteps) -> Self {
        self.steps = steps;
        self
    }
}

#[async_trait]
impl StepTransport for ScriptedTransport {
    async fn step(
        &mut self,
        request: &StepRequest,
        on_event: &mut EventCallback<'_>,
    ) -> Result<Vec<Event>, TransportError> {
        let call = self.requests.len();
        self.requests.push(request.clone());

        let events = match &self.repeat {
            Some(events) => events.clone(),
            None => {
                if self.turns.is_empty() {
                    panic!("ScriptedTransport: no more turns (call #{call})");
                }
                self.turns.remove(0)?
            }
        };

        for event in &events {
            if let Event::Action(action) = event {
                self.steps.record_action(action.clone());
            }
            on_event(event);
        }
        Ok(events)
    }

    fn agent_steps(&self) -> &AgentSteps {
        &self.steps
    }

    fn update_observation(&mut self, observation: &str) {
        self.steps.update_observation(observation);
    }

    fn truncate_steps(&mut self, len: usize) {
        self.steps.truncate(len);
    }
}

#[derive(Default)]
pub struct RecordingStream {
    chunks: Mutex<Vec<(u32, String)>>,
}

impl RecordingStream {
    pub fn chunks(&self) -> Vec<(u32, String)> {
        self.chunks.lock().unwrap().clone()
    }
}

impl ResponseStream for RecordingStream {
    fn execute(&self, response: StreamedResponse, options: StreamOptions) {
        assert_eq!(response.chunk_id, options.chunk_id);
        self.chunks
            .lock()
            .unwrap()
            .push((options.chunk_id, response.content));
    }
}

#[derive(Default)]
pub struct RecordingTracker {
    tracked: Mutex<Vec<&'static str>>,
}

impl RecordingTracker {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.tracked.lock().unwrap().clone()
    }
}

impl ErrorTracker for RecordingTracker {
    fn track(&self, error: &ExecutionError, _context: &Map<String, Value>) {
        self.tracked.lock().unwrap().push(error.kind());
    }
}

#[derive(Default)]
pub struct RecordingSli {
    errors: Mutex<Vec<bool>>,
    apdex: Mutex<Vec<bool>>,
}

impl RecordingSli {
    pub fn errors(&self) -> Vec<bool> {
        self.errors.lock().unwrap().clone()
    }

    pub fn apdex(&self) -> Vec<bool> {
        self.apdex.lock().unwrap().clone()
    }
}

impl SliSink for RecordingSli {
    fn increment_error_rate(&self, _labels: &SliLabels, error: bool) {
        self.errors.lock().unwrap().push(error);
    }

    fn increment_apdex(&self, _labels: &SliLabels, success: bool) {
        self.apdex.lock().unwrap().push(success);
    }
}

/// Recorders wired into an executor.
pub struct Harness {
    pub stream: Arc<RecordingStream>,
    pub tracker: Arc<RecordingTracker>,
    pub sli: Arc<RecordingSli>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            stream: Arc::new(RecordingStream::default()),
            tracker: Arc::new(RecordingTracker::default()),
            sli: Arc::new(RecordingSli::default()),
        }
    }

    pub fn executor(&self, tools: ToolRegistry) -> ReactExecutor {
        ReactExecutor::new(Arc::new(tools))
            .with_response_stream(self.stream.clone())
            .with_error_tracker(self.tracker.clone())
            .with_sli_sink(self.sli.clone())
    }
}

/// A tool that always returns the same result and records its options.
pub struct ScriptedTool {
    name: String,
    result: Result<Answer, ToolError>,
    calls: Arc<Mutex<Vec<ToolOptions>>>,
}

impl ScriptedTool {
    pub fn new(name: &str, result: Result<Answer, ToolError>) -> Self {
        Self {
            name: name.to_string(),
            result,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<ToolOptions>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Tool for ScriptedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Scripted test tool"
    }

    async fn execute(
        &self,
        _context: &ChatContext,
        options: ToolOptions,
    ) -> Result<Answer, ToolError> {
        self.calls.lock().unwrap().push(options);
        self.result.clone()
    }
}

pub fn registry_with(tool: ScriptedTool) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(tool));
    registry
}

pub fn delta(text: &str) -> Event {
    Event::FinalAnswerDelta { text: text.into() }
}

pub fn action(tool: &str, tool_input: &str, thought: &str) -> Event {
    Event::Action(Action {
        thought: thought.into(),
        tool: tool.into(),
        tool_input: tool_input.into(),
    })
}

pub fn error(message: &str, retryable: bool) -> Event {
    Event::Error {
        message: message.into(),
        retryable,
    }
}

pub fn unknown(text: &str) -> Event {
    Event::Unknown { text: text.into() }
}
