//! End-to-end: executor + HTTP transport + telemetry against a mock gateway.

use std::sync::Arc;

use async_trait::async_trait;
use chatloop_agent::{ChannelResponseStream, ReactExecutor};
use chatloop_config::GatewayConfig;
use chatloop_core::{
    Answer, ChatContext, ErrorCode, ErrorTracker, SliLabels, SliSink, Tool, ToolError,
    ToolOptions, ToolRegistry,
};
use chatloop_telemetry::{ErrorLog, SliEngine};
use chatloop_transport::GatewayClient;
use mockito::Matcher;

struct IssueReader;

#[async_trait]
impl Tool for IssueReader {
    fn name(&self) -> &str {
        "issue_reader"
    }

    fn description(&self) -> &str {
        "Reads an issue"
    }

    async fn execute(
        &self,
        _context: &ChatContext,
        options: ToolOptions,
    ) -> Result<Answer, ToolError> {
        Ok(Answer::observation(format!("{} is open", options.input)))
    }
}

struct Fixture {
    executor: ReactExecutor,
    client: GatewayClient,
    sli: Arc<SliEngine>,
    errors: Arc<ErrorLog>,
    chunks: tokio::sync::mpsc::UnboundedReceiver<chatloop_core::StreamedResponse>,
}

fn fixture(base_url: String) -> Fixture {
    let client = GatewayClient::new(&GatewayConfig {
        base_url,
        agent_path: "/v2/chat/agent".into(),
        ..GatewayConfig::default()
    })
    .unwrap();

    let mut tools = ToolRegistry::new();
    tools.register(Box::new(IssueReader));

    let sli = Arc::new(SliEngine::new());
    let errors = Arc::new(ErrorLog::new());
    let (stream, chunks) = ChannelResponseStream::new();

    let executor = ReactExecutor::new(Arc::new(tools))
        .with_response_stream(Arc::new(stream))
        .with_sli_sink(sli.clone() as Arc<dyn SliSink>)
        .with_error_tracker(errors.clone() as Arc<dyn ErrorTracker>);

    Fixture {
        executor,
        client,
        sli,
        errors,
        chunks,
    }
}

#[tokio::test]
async fn tool_turn_then_streamed_answer() {
    let mut server = mockito::Server::new_async().await;

    let second = server
        .mock("POST", "/v2/chat/agent")
        .match_body(Matcher::Regex("#123 is open".into()))
        .with_status(200)
        .with_body(concat!(
            r#"{"type":"final_answer_delta","data":{"text":"The issue "}}"#,
            "\n\n",
            r#"{"type":"final_answer_delta","data":{"text":"is open."}}"#,
        ))
        .expect(1)
        .create_async()
        .await;
    let first = server
        .mock("POST", "/v2/chat/agent")
        .with_status(200)
        .with_body(concat!(
            r##"{"type":"action","data":{"thought":"I need the issue","tool":"issue_reader","tool_input":"#123"}}"##,
            "\n\n",
        ))
        .expect(1)
        .create_async()
        .await;

    let mut fx = fixture(server.url());
    let mut transport = fx.client.step_executor();
    let context = ChatContext::new("alice").with_started_at(chrono::Utc::now());

    let answer = fx
        .executor
        .execute(&mut transport, "Is #123 open?", &context)
        .await;

    first.assert_async().await;
    second.assert_async().await;

    assert!(answer.is_final);
    assert_eq!(answer.content, "The issue is open.");
    assert_eq!(answer.extras["agent_scratchpad"][0]["observation"], "#123 is open");

    let first_chunk = fx.chunks.recv().await.unwrap();
    let second_chunk = fx.chunks.recv().await.unwrap();
    assert_eq!((first_chunk.chunk_id, first_chunk.content.as_str()), (1, "The issue "));
    assert_eq!((second_chunk.chunk_id, second_chunk.content.as_str()), (2, "is open."));

    let labels = SliLabels::default();
    assert_eq!(fx.sli.error_rate(&labels), Some(0.0));
    assert_eq!(fx.sli.apdex(&labels), Some(1.0));
    assert!(fx.errors.is_empty());
}

#[tokio::test]
async fn forbidden_gateway_is_tracked_but_not_an_sli_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v2/chat/agent")
        .with_status(403)
        .with_body("forbidden")
        .create_async()
        .await;

    let fx = fixture(server.url());
    let mut transport = fx.client.step_executor();

    let answer = fx
        .executor
        .execute(&mut transport, "question?", &ChatContext::new("alice"))
        .await;

    assert_eq!(answer.error_code, Some(ErrorCode::Forbidden));
    assert_eq!(fx.sli.error_rate(&SliLabels::default()), None);
    assert_eq!(fx.errors.by_kind("forbidden_error").len(), 1);
}

#[tokio::test]
async fn server_error_counts_against_the_sli() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v2/chat/agent")
        .with_status(500)
        .create_async()
        .await;

    let fx = fixture(server.url());
    let mut transport = fx.client.step_executor();

    let answer = fx
        .executor
        .execute(&mut transport, "question?", &ChatContext::new("alice"))
        .await;

    assert!(answer.is_final);
    assert_eq!(answer.error_code, Some(ErrorCode::ServerError));
    assert_eq!(fx.sli.error_rate(&SliLabels::default()), Some(1.0));
    assert_eq!(fx.errors.recent(1)[0].kind, "server_error");
}

#[tokio::test]
async fn retryable_gateway_errors_exhaust_the_budget() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v2/chat/agent")
        .with_status(200)
        .with_body(r#"{"type":"error","data":{"message":"overloaded","retryable":true}}"#)
        .expect(3)
        .create_async()
        .await;

    let fx = fixture(server.url());
    let mut transport = fx.client.step_executor();

    let answer = fx
        .executor
        .execute(&mut transport, "question?", &ChatContext::new("alice"))
        .await;

    mock.assert_async().await;
    assert_eq!(answer.error_code, Some(ErrorCode::AgentEvent));
    assert_eq!(fx.errors.by_kind("agent_event_error").len(), 1);
}
