//! The HTTP step executor.
//!
//! One `StepExecutor` serves one execution: it owns that execution's
//! scratchpad and issues one streaming POST per turn.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use chatloop_core::{AgentSteps, Event, EventCallback, StepRequest, StepTransport, TransportError};

use crate::framer::EventFramer;
use crate::status::status_error;

pub struct StepExecutor {
    client: reqwest::Client,
    url: String,
    steps: AgentSteps,
}

impl StepExecutor {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            steps: AgentSteps::new(),
        }
    }

    /// Frame, parse, and dispatch every event in `stream`.
    ///
    /// Action events are recorded in the scratchpad the moment they are
    /// parsed, before `on_event` sees them.
    pub async fn drain<S, B>(
        &mut self,
        stream: S,
        on_event: &mut EventCallback<'_>,
    ) -> Result<Vec<Event>, TransportError>
    where
        S: Stream<Item = Result<B, TransportError>> + Send,
        B: AsRef<[u8]> + Send,
    {
        let mut stream = std::pin::pin!(stream);
        let mut framer = EventFramer::new();
        let mut events = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            trace!(bytes = chunk.as_ref().len(), "Received agent stream chunk");
            for frame in framer.push(chunk.as_ref()) {
                self.accept(&frame, on_event, &mut events);
            }
        }

        if let Some(frame) = framer.finish() {
            self.accept(&frame, on_event, &mut events);
        }

        Ok(events)
    }

    fn accept(&mut self, frame: &str, on_event: &mut EventCallback<'_>, events: &mut Vec<Event>) {
        let Some(event) = Event::parse(frame) else {
            return;
        };

        if let Event::Action(action) = &event {
            self.steps.record_action(action.clone());
        }

        on_event(&event);
        events.push(event);
    }
}

#[async_trait]
impl StepTransport for StepExecutor {
    async fn step(
        &mut self,
        request: &StepRequest,
        on_event: &mut EventCallback<'_>,
    ) -> Result<Vec<Event>, TransportError> {
        let request_id = Uuid::new_v4();
        debug!(
            %request_id,
            url = %self.url,
            messages = request.messages.len(),
            scratchpad = self.steps.len(),
            "Sending agent step request"
        );

        let response = self
            .client
            .post(&self.url)
            .header(ACCEPT, "application/json")
            .json(request)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%request_id, status, "Agent step request failed");
            return Err(status_error(status, body));
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_stream_error));
        let events = self.drain(stream, on_event).await?;

        debug!(%request_id, events = events.len(), "Agent step completed");
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

fn map_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_builder() {
        TransportError::Request(e.to_string())
    } else {
        TransportError::Connection(e.to_string())
    }
}

fn map_stream_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else {
        TransportError::UnexpectedEof(e.to_string())
    }
}
