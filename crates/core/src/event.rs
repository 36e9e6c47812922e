//! Agent events: the discrete units of the gateway's streaming protocol.
//!
//! Every logical unit on the wire is a JSON object of the form
//! `{"type": "<kind>", "data": {...}}`. Recognised kinds:
//!
//! - `final_answer_delta`: `data.text`
//! - `action`: `data.thought`, `data.tool`, `data.tool_input`
//! - `error`: `data.message`, `data.retryable` (optional)
//! - `unknown`: `data.text`, the protocol's own catch-all
//!
//! Parsing never fails loudly. Malformed units yield `None` plus a
//! diagnostic, so one bad chunk cannot abort a stream.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// A request from the model to invoke a named tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub thought: String,
    pub tool: String,
    pub tool_input: String,
}

/// One parsed protocol event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Event {
    /// A fragment of the eventual answer.
    FinalAnswerDelta { text: String },

    /// The model wants a tool called.
    Action(Action),

    /// A protocol-level failure reported by the gateway.
    Error { message: String, retryable: bool },

    /// An event kind the gateway itself marks as unclassified.
    Unknown { text: String },
}

impl Event {
    /// Parse one delimited protocol unit.
    ///
    /// Returns `None` unless the unit is a JSON object whose `type` is a
    /// recognised kind.
    pub fn parse(raw: &str) -> Option<Self> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(_) => {
                // Length only: chunk bodies can be large and carry user content.
                warn!(length = raw.len(), "Failed to parse a chunk from the agent stream");
                return None;
            }
        };

        let Value::Object(object) = value else {
            warn!(length = raw.len(), "Agent stream chunk is not a JSON object");
            return None;
        };
        let Some(kind) = object.get("type").and_then(Value::as_str) else {
            warn!(length = raw.len(), "Agent stream chunk has no string type");
            return None;
        };

        let empty = Map::new();
        let data = object
            .get("data")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let event = Self::from_data(kind, data);
        if event.is_none() {
            warn!(event_type = %kind, "Received an agent event of unrecognised type");
        }
        event
    }

    /// Build an event from its kind and flat `data` mapping.
    ///
    /// Unknown keys are ignored; missing keys default to `""` / `false`.
    pub fn from_data(kind: &str, data: &Map<String, Value>) -> Option<Self> {
        let event = match kind {
            "final_answer_delta" => Self::FinalAnswerDelta {
                text: string_field(data, "text"),
            },
            "action" => Self::Action(Action {
                thought: string_field(data, "thought"),
                tool: string_field(data, "tool"),
                tool_input: string_field(data, "tool_input"),
            }),
            "error" => Self::Error {
                message: string_field(data, "message"),
                retryable: data
                    .get("retryable")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            },
            "unknown" => Self::Unknown {
                text: string_field(data, "text"),
            },
            _ => return None,
        };
        Some(event)
    }

    /// The wire name of this event's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FinalAnswerDelta { .. } => "final_answer_delta",
            Self::Action(_) => "action",
            Self::Error { .. } => "error",
            Self::Unknown { .. } => "unknown",
        }
    }
}

fn string_field(data: &Map<String, Value>, key: &str) -> String {
    match data.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
