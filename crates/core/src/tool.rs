//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what let the agent look things up: read an issue, an epic,
//! a CI log. The orchestrator resolves the tool named by an `action` event
//! in the `ToolRegistry` and executes it with the model's input.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::answer::Answer;
use crate::context::ChatContext;
use crate::error::ToolError;

/// Options passed to a tool for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOptions {
    /// The model's `tool_input`.
    pub input: String,

    /// The model's `thought` that led to this call.
    pub suggestions: String,
}

/// The core Tool trait.
///
/// A tool returns a non-final `Answer` whose content becomes the next
/// observation, or a final `Answer` that ends the execution as-is.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name the model uses to call this tool (e.g., "issue_reader").
    fn name(&self) -> &str;

    /// A description of what this tool does.
    fn description(&self) -> &str;

    async fn execute(
        &self,
        context: &ChatContext,
        options: ToolOptions,
    ) -> std::result::Result<Answer, ToolError>;
}

/// A registry of available tools, shared read-only across executions.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn resolve(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
