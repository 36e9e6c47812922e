//! Builds the per-turn `StepRequest`.
//!
//! Everything except the scratchpad is fixed for one execution, so the
//! builder assembles it once and only appends the scratchpad each turn.

use chatloop_core::{
    AgentSteps, ChatContext, CurrentFile, ModelMetadata, PageContext, RequestMessage,
    ResourceAuthorizer, Role, StepRequest, UserMessage,
};
use tracing::debug;

pub struct RequestBuilder {
    base: Vec<RequestMessage>,
    model_metadata: Option<ModelMetadata>,
    unavailable_resources: Vec<String>,
}

impl RequestBuilder {
    pub fn new(
        user_input: &str,
        context: &ChatContext,
        authorizer: &dyn ResourceAuthorizer,
        model_metadata: Option<ModelMetadata>,
        unavailable_resources: Vec<String>,
    ) -> Self {
        let mut base: Vec<RequestMessage> = context
            .history
            .iter()
            .map(|message| RequestMessage::History {
                role: message.role,
                content: message.content.clone(),
            })
            .collect();

        base.push(RequestMessage::User(UserMessage {
            role: Role::User,
            content: user_input.to_string(),
            context: page_context(context, authorizer),
            current_file: current_file(context),
            additional_context: context.additional_context.clone(),
        }));

        Self {
            base,
            model_metadata,
            unavailable_resources,
        }
    }

    /// The request for the next turn, replaying `steps` when non-empty.
    pub fn build(&self, steps: &AgentSteps) -> StepRequest {
        let mut messages = self.base.clone();
        if !steps.is_empty() {
            messages.push(RequestMessage::scratchpad(steps.clone()));
        }

        StepRequest {
            messages,
            model_metadata: self.model_metadata.clone(),
            unavailable_resources: self.unavailable_resources.clone(),
        }
    }
}

/// Page context for the current resource, if there is one the user may read.
fn page_context(context: &ChatContext, authorizer: &dyn ResourceAuthorizer) -> Option<PageContext> {
    let resource = context.resource.as_ref()?;
    if !authorizer.can_read(&context.user, resource) {
        debug!(resource_type = %resource.resource_type, "Resource omitted from request: not authorized");
        return None;
    }

    Some(PageContext {
        page_type: resource.resource_type.clone(),
        title: resource.title.clone(),
    })
}

/// Selected code takes precedence over an attached blob.
fn current_file(context: &ChatContext) -> Option<CurrentFile> {
    if let Some(file) = &context.current_file {
        return Some(CurrentFile {
            file_path: file.file_name.clone(),
            data: file.selected_text.clone(),
            selected_code: true,
        });
    }

    context.blob.as_ref().map(|blob| CurrentFile {
        file_path: blob.path.clone(),
        data: blob.data.clone(),
        selected_code: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatloop_core::{
        Action, AdditionalContext, AllowAll, Blob, HistoryMessage, Resource, SelectedFile,
    };
    use serde_json::json;

    struct DenyAll;

    impl ResourceAuthorizer for DenyAll {
        fn can_read(&self, _user: &str, _resource: &Resource) -> bool {
            false
        }
    }

    fn issue_context() -> ChatContext {
        ChatContext::new("alice")
            .with_resource(Resource {
                resource_type: "issue".into(),
                title: "Fix the flaky test".into(),
                id: Some("1".into()),
            })
            .with_additional_context(AdditionalContext {
                category: "snippet".into(),
                id: "hello world".into(),
                content: "puts \"Hello, world\"".into(),
                metadata: json!({}),
            })
    }

    fn builder(context: &ChatContext, authorizer: &dyn ResourceAuthorizer) -> RequestBuilder {
        RequestBuilder::new(
            "question?",
            context,
            authorizer,
            None,
            vec!["Pipelines".into(), "Vulnerabilities".into()],
        )
    }

    #[test]
    fn first_turn_payload() {
        let request = builder(&issue_context(), &AllowAll).build(&AgentSteps::new());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(
            json,
            json!({
                "messages": [{
                    "role": "user",
                    "content": "question?",
                    "context": {"type": "issue", "title": "Fix the flaky test"},
                    "current_file": null,
                    "additional_context": [{
                        "category": "snippet",
                        "id": "hello world",
                        "content": "puts \"Hello, world\"",
                        "metadata": {}
                    }]
                }],
                "model_metadata": null,
                "unavailable_resources": ["Pipelines", "Vulnerabilities"]
            })
        );
    }

    #[test]
    fn unauthorized_resource_is_null_context() {
        let request = builder(&issue_context(), &DenyAll).build(&AgentSteps::new());
        let json = serde_json::to_value(&request).unwrap();
        assert!(json["messages"][0]["context"].is_null());
    }

    #[test]
    fn absent_resource_is_null_context() {
        let request = builder(&ChatContext::new("bob"), &AllowAll).build(&AgentSteps::new());
        let json = serde_json::to_value(&request).unwrap();
        assert!(json["messages"][0]["context"].is_null());
        assert_eq!(json["messages"][0]["additional_context"], json!([]));
    }

    #[test]
    fn selected_code_beats_blob() {
        let context = ChatContext::new("alice")
            .with_current_file(SelectedFile {
                file_name: "main.rs".into(),
                selected_text: "fn main() {}".into(),
                ..SelectedFile::default()
            })
            .with_blob(Blob {
                path: "README.md".into(),
                data: "# readme".into(),
            });
        let request = builder(&context, &AllowAll).build(&AgentSteps::new());
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json["messages"][0]["current_file"],
            json!({"file_path": "main.rs", "data": "fn main() {}", "selected_code": true})
        );
    }

    #[test]
    fn blob_becomes_current_file() {
        let context = ChatContext::new("alice").with_blob(Blob {
            path: "app/models/user.rb".into(),
            data: "class User; end".into(),
        });
        let request = builder(&context, &AllowAll).build(&AgentSteps::new());
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json["messages"][0]["current_file"],
            json!({"file_path": "app/models/user.rb", "data": "class User; end", "selected_code": false})
        );
    }

    #[test]
    fn scratchpad_follows_user_message() {
        let context = issue_context();
        let builder = builder(&context, &AllowAll);
        let mut steps = AgentSteps::new();
        steps.update_observation("observation");

        let json = serde_json::to_value(builder.build(&steps)).unwrap();
        assert_eq!(
            json["messages"][1],
            json!({"role": "assistant", "agent_scratchpad": [{"observation": "observation"}]})
        );

        steps.record_action(Action {
            thought: "t".into(),
            tool: "issue_reader".into(),
            tool_input: "#1".into(),
        });
        let next = builder.build(&steps);
        assert_eq!(next.agent_scratchpad().map(AgentSteps::len), Some(2));
        assert_eq!(next.messages.len(), 2);
    }

    #[test]
    fn history_precedes_user_message() {
        let context = ChatContext::new("alice").with_history(vec![
            HistoryMessage::user("earlier question"),
            HistoryMessage::assistant("earlier answer"),
        ]);
        let json = serde_json::to_value(builder(&context, &AllowAll).build(&AgentSteps::new()))
            .unwrap();

        assert_eq!(json["messages"][0], json!({"role": "user", "content": "earlier question"}));
        assert_eq!(json["messages"][1]["role"], "assistant");
        assert_eq!(json["messages"][2]["content"], "question?");
    }
}
