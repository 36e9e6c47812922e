//! `chatloop ask`: one execution against the configured gateway.

use std::io::Write;
use std::sync::{Arc, Mutex};

use chatloop_agent::ReactExecutor;
use chatloop_config::AppConfig;
use chatloop_core::{
    Answer, ChatContext, Resource, ResponseStream, StreamOptions, StreamedResponse, ToolRegistry,
};
use chatloop_telemetry::{SliEngine, TracingErrorTracker};
use chatloop_transport::GatewayClient;

/// Writes each streamed fragment to stdout as soon as it arrives.
#[derive(Default)]
pub struct StdoutStream {
    streamed: Mutex<String>,
}

impl StdoutStream {
    /// Everything written so far.
    pub fn streamed(&self) -> String {
        self.streamed.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ResponseStream for StdoutStream {
    fn execute(&self, response: StreamedResponse, _options: StreamOptions) {
        self.streamed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_str(&response.content);
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "{}", response.content);
        let _ = stdout.flush();
    }
}

pub async fn run(
    question: &str,
    resource: Option<(String, String)>,
    started_now: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let client = GatewayClient::new(&config.gateway)?;

    let stream = Arc::new(StdoutStream::default());
    let sli = Arc::new(SliEngine::new());
    let executor = ReactExecutor::new(Arc::new(ToolRegistry::new()))
        .with_settings(&config.agent)
        .with_labels(config.telemetry.sli_labels())
        .with_model_resolver(Arc::new(config.model_selection.clone()))
        .with_response_stream(stream.clone())
        .with_error_tracker(Arc::new(TracingErrorTracker))
        .with_sli_sink(sli.clone());

    let context = build_context(resource, started_now);
    let mut transport = client.step_executor();
    let answer = executor.execute(&mut transport, question, &context).await;

    print_answer(&answer, &stream.streamed());

    let labels = config.telemetry.sli_labels();
    tracing::debug!(
        error_rate = ?sli.error_rate(&labels),
        apdex = ?sli.apdex(&labels),
        "SLI summary"
    );

    Ok(())
}

fn build_context(resource: Option<(String, String)>, started_now: bool) -> ChatContext {
    let user = std::env::var("USER").unwrap_or_else(|_| "cli".into());
    let mut context = ChatContext::new(user);

    if let Some((resource_type, title)) = resource {
        context = context.with_resource(Resource {
            resource_type,
            title,
            id: None,
        });
    }
    if started_now {
        context = context.with_started_at(chrono::Utc::now());
    }
    context
}

fn print_answer(answer: &Answer, streamed: &str) {
    if !streamed.is_empty() {
        println!();
    }

    if let Some(code) = answer.error_code {
        eprintln!("{}", answer.content);
        eprintln!("  [error code {code}]");
        return;
    }

    if let Some(content) = unstreamed_content(answer, streamed) {
        if !streamed.is_empty() {
            println!();
        }
        println!("{content}");
    }
}

/// The final answer text still owed to the user after streaming.
///
/// Streamed fragments are raw; the final answer may have been rewritten
/// (for example by link sanitizing), in which case it is printed again.
fn unstreamed_content<'a>(answer: &'a Answer, streamed: &str) -> Option<&'a str> {
    if answer.content == streamed {
        None
    } else {
        Some(&answer.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_carries_resource_and_start_time() {
        let context = build_context(Some(("issue".into(), "Crash on save".into())), true);
        let resource = context.resource.unwrap();
        assert_eq!(resource.resource_type, "issue");
        assert_eq!(resource.title, "Crash on save");
        assert!(context.started_at.is_some());
    }

    #[test]
    fn bare_context() {
        let context = build_context(None, false);
        assert!(context.resource.is_none());
        assert!(context.started_at.is_none());
    }

    #[test]
    fn stdout_stream_remembers_output() {
        let stream = StdoutStream::default();
        assert!(stream.streamed().is_empty());
        for (chunk_id, content) in [(1, "See "), (2, "https://evil.example.com")] {
            stream.execute(
                StreamedResponse {
                    content: content.into(),
                    chunk_id,
                },
                StreamOptions { chunk_id },
            );
        }
        assert_eq!(stream.streamed(), "See https://evil.example.com");
    }

    #[test]
    fn sanitized_answer_is_printed_after_the_stream() {
        let answer = Answer::final_answer("See `https://evil.example.com`");
        assert_eq!(
            unstreamed_content(&answer, "See https://evil.example.com"),
            Some("See `https://evil.example.com`")
        );
    }

    #[test]
    fn identical_answer_is_not_repeated() {
        let answer = Answer::final_answer("The issue is open.");
        assert_eq!(unstreamed_content(&answer, "The issue is open."), None);
    }

    #[test]
    fn unstreamed_answer_is_printed() {
        let answer = Answer::final_answer("From a tool");
        assert_eq!(unstreamed_content(&answer, ""), Some("From a tool"));
    }
}
