//! The agent scratchpad: the ordered history of actions taken and
//! observations received within one execution.
//!
//! The scratchpad is owned by the step transport. Each `action` event it
//! parses is recorded here, and the orchestrator attaches the tool's output
//! back onto the same entry before the next turn.

use serde::{Deserialize, Serialize};

use crate::event::Action;

/// One prior turn as replayed to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AgentStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
}

/// Ordered scratchpad, serialized as a bare JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentSteps(Vec<AgentStep>);

impl AgentSteps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action that has not been answered yet.
    pub fn record_action(&mut self, action: Action) {
        self.0.push(AgentStep {
            action: Some(action),
            observation: None,
        });
    }

    /// Attach `observation` to the most recent unanswered action.
    ///
    /// With no pending action the observation is kept as a step of its own,
    /// so tool output is never dropped from the history.
    pub fn update_observation(&mut self, observation: impl Into<String>) {
        let observation = observation.into();
        match self.0.iter().rposition(|step| step.observation.is_none()) {
            Some(index) => self.0[index].observation = Some(observation),
            None => self.0.push(AgentStep {
                action: None,
                observation: Some(observation),
            }),
        }
    }

    /// Drop every step recorded after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    pub fn as_slice(&self) -> &[AgentStep] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&AgentStep> {
        self.0.last()
    }
}

impl From<Vec<AgentStep>> for AgentSteps {
    fn from(steps: Vec<AgentStep>) -> Self {
        Self(steps)
    }
}
