use super::events::{new_id, StreamEvent};
use super::messages::Conversation;
use crate::config::Config;
use crate::prompts::build_prompt;
use crate::provider::{
    ChatChunk, ChatRequest, Message, Part, Provider, ProviderError, Role, Tool, ToolCall,
    ToolResult,
};
use daylight_plugin::PluginRegistry;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// A single tool invocation record.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub arguments: Value,
    pub output: Value,
    pub success: bool,
    pub duration_ms: u64,
}

/// Final result of a chat turn.
#[derive(Debug, Clone, Default)]
pub struct ChatOutcome {
    /// Assistant text across all steps
    pub text: String,
    pub tool_invocations: Vec<ToolInvocation>,
    /// Number of model calls made
    pub steps: usize,
}

/// Runs chat turns against a provider with the registry's tools available.
///
/// Each turn is a loop of model calls: text is streamed out as it arrives,
/// requested tools are executed, and their results are sent back to the model.
/// The loop ends on a step without tool calls or after `max_steps` calls.
pub struct ChatManager {
    provider: Arc<dyn Provider>,
    registry: Arc<PluginRegistry>,
    system_prompt: String,
    model: String,
    temperature: Option<f64>,
    max_steps: usize,
}

impl ChatManager {
    pub fn new(config: &Config, provider: Arc<dyn Provider>, registry: Arc<PluginRegistry>) -> Self {
        Self {
            provider,
            registry,
            system_prompt: build_prompt(&config.prompt_scenarios),
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_steps: config.llm.max_steps.max(1),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Asks a single question and returns the complete answer.
    pub async fn query(&self, message: &str) -> Result<ChatOutcome, ChatError> {
        let (sender, _receiver) = mpsc::unbounded_channel();
        self.stream(Conversation::from_user_text(message), sender)
            .await
    }

    /// Runs one chat turn, emitting UI stream events to `sender`.
    ///
    /// Provider failures are emitted as an `error` event and also returned.
    /// The loop stops early once the receiving side is dropped.
    pub async fn stream(
        &self,
        conversation: Conversation,
        sender: UnboundedSender<StreamEvent>,
    ) -> Result<ChatOutcome, ChatError> {
        let mut system = self.system_prompt.clone();
        for extra in &conversation.system {
            system.push_str("\n\n");
            system.push_str(extra);
        }

        let tools: Vec<Tool> = self
            .registry
            .plugin_specs()
            .iter()
            .filter_map(Tool::from_spec)
            .collect();

        let mut history = conversation.messages;
        let mut outcome = ChatOutcome::default();

        let _ = sender.send(StreamEvent::Start {
            message_id: new_id("msg"),
        });

        while outcome.steps < self.max_steps {
            if sender.is_closed() {
                debug!("Client went away, stopping chat turn");
                break;
            }
            outcome.steps += 1;
            let _ = sender.send(StreamEvent::StartStep);

            let request = ChatRequest::new(&self.model, history.clone())
                .with_system(system.clone())
                .with_tools(tools.clone())
                .with_temperature(self.temperature);

            let (text, calls) = match self.run_step(request, &sender).await {
                Ok(step) => step,
                Err(e) => {
                    warn!("Chat step {} failed: {}", outcome.steps, e);
                    let _ = sender.send(StreamEvent::Error {
                        error_text: e.to_string(),
                    });
                    return Err(e.into());
                }
            };

            outcome.text.push_str(&text);
            debug!(
                "Chat step {} tool calls: {}",
                outcome.steps,
                serde_json::to_string(&calls).unwrap_or_default()
            );

            let mut parts = Vec::new();
            if !text.is_empty() {
                parts.push(Part::Text { text });
            }
            parts.extend(calls.iter().cloned().map(Part::ToolCall));
            if !parts.is_empty() {
                history.push(Message::new(Role::Assistant, parts));
            }

            if calls.is_empty() {
                let _ = sender.send(StreamEvent::FinishStep);
                break;
            }

            let mut results = Vec::new();
            for call in calls {
                let (result, invocation) = self.execute_tool(call, &sender).await;
                results.push(Part::ToolResult(result));
                outcome.tool_invocations.push(invocation);
            }
            history.push(Message::new(Role::Tool, results));
            let _ = sender.send(StreamEvent::FinishStep);
        }

        let _ = sender.send(StreamEvent::Finish);
        info!(
            "Chat turn finished: steps={} tools={}",
            outcome.steps,
            outcome.tool_invocations.len()
        );
        Ok(outcome)
    }

    /// Streams one model call, returning its text and requested tool calls.
    async fn run_step(
        &self,
        request: ChatRequest,
        sender: &UnboundedSender<StreamEvent>,
    ) -> Result<(String, Vec<ToolCall>), ProviderError> {
        let text_id = new_id("txt");
        let mut text = String::new();
        let mut started = false;
        let mut calls = Vec::new();

        let mut on_chunk = |chunk: ChatChunk| match chunk {
            ChatChunk::TextDelta(delta) => {
                if !started {
                    started = true;
                    let _ = sender.send(StreamEvent::TextStart {
                        id: text_id.clone(),
                    });
                }
                text.push_str(&delta);
                let _ = sender.send(StreamEvent::TextDelta {
                    id: text_id.clone(),
                    delta,
                });
            }
            ChatChunk::ToolCall(call) => calls.push(call),
            ChatChunk::Finish { reason } => {
                debug!("Model step finished: {:?}", reason);
            }
        };
        self.provider.chat(request, &mut on_chunk).await?;

        if started {
            let _ = sender.send(StreamEvent::TextEnd { id: text_id });
        }
        Ok((text, calls))
    }

    async fn execute_tool(
        &self,
        call: ToolCall,
        sender: &UnboundedSender<StreamEvent>,
    ) -> (ToolResult, ToolInvocation) {
        let _ = sender.send(StreamEvent::ToolInputAvailable {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            input: call.args.clone(),
        });

        let start = Instant::now();
        let result = self.registry.execute(&call.name, call.args.clone()).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (output, success) = match result {
            Ok(output) => {
                let _ = sender.send(StreamEvent::ToolOutputAvailable {
                    tool_call_id: call.id.clone(),
                    output: output.content.clone(),
                });
                (output.content, true)
            }
            Err(e) => {
                warn!("Tool {} failed: {}", call.name, e);
                let _ = sender.send(StreamEvent::ToolOutputError {
                    tool_call_id: call.id.clone(),
                    error_text: e.to_string(),
                });
                (serde_json::json!({ "error": e.to_string() }), false)
            }
        };
        info!("Tool {} finished in {}ms (success={})", call.name, duration_ms, success);

        let invocation = ToolInvocation {
            tool_name: call.name.clone(),
            arguments: call.args,
            output: output.clone(),
            success,
            duration_ms,
        };
        let result = ToolResult {
            id: call.id,
            name: call.name,
            output,
        };
        (result, invocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ObjectRequest;
    use async_trait::async_trait;
    use daylight_plugin::{Plugin, PluginOutput};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays one scripted chunk list per model call and records the requests.
    struct ScriptedProvider {
        steps: Mutex<VecDeque<Vec<ChatChunk>>>,
        repeat_last: bool,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedProvider {
        fn new(steps: Vec<Vec<ChatChunk>>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                repeat_last: false,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat(
            &self,
            request: ChatRequest,
            callback: &mut (dyn FnMut(ChatChunk) + Send),
        ) -> crate::provider::Result<()> {
            self.requests.lock().unwrap().push(request);
            let step = {
                let mut steps = self.steps.lock().unwrap();
                if self.repeat_last && steps.len() == 1 {
                    steps.front().cloned()
                } else {
                    steps.pop_front()
                }
            };
            let step = step.ok_or_else(|| ProviderError::Other("script exhausted".into()))?;
            for chunk in step {
                callback(chunk);
            }
            Ok(())
        }

        async fn generate_object(&self, _request: ObjectRequest) -> crate::provider::Result<Value> {
            Err(ProviderError::Other("not scripted".into()))
        }
    }

    struct KnowledgeBase;

    #[async_trait]
    impl Plugin for KnowledgeBase {
        fn name(&self) -> &str {
            "vectorSearch"
        }

        fn description(&self) -> &str {
            "Searches the knowledge base"
        }

        fn parameter_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn execute(&self, input: Value) -> daylight_plugin::Result<PluginOutput> {
            Ok(PluginOutput::new(json!({"textChunks": ["Returns accepted within 30 days."], "query": input["query"]})))
        }
    }

    fn tool_call(id: &str, name: &str) -> ChatChunk {
        ChatChunk::ToolCall(ToolCall {
            id: id.into(),
            name: name.into(),
            args: json!({"query": "returns"}),
        })
    }

    fn text(delta: &str) -> ChatChunk {
        ChatChunk::TextDelta(delta.into())
    }

    fn manager(provider: Arc<ScriptedProvider>, max_steps: usize) -> ChatManager {
        let mut registry = PluginRegistry::new();
        registry.register(KnowledgeBase);
        let config = Config::default().with_max_steps(max_steps);
        ChatManager::new(&config, provider, Arc::new(registry))
    }

    async fn run(manager: &ChatManager) -> (Result<ChatOutcome, ChatError>, Vec<StreamEvent>) {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let result = manager
            .stream(Conversation::from_user_text("Can I return my readers?"), sender)
            .await;
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        (result, events)
    }

    fn kinds(events: &[StreamEvent]) -> Vec<&'static str> {
        events
            .iter()
            .map(|event| match event {
                StreamEvent::Start { .. } => "start",
                StreamEvent::StartStep => "start-step",
                StreamEvent::TextStart { .. } => "text-start",
                StreamEvent::TextDelta { .. } => "text-delta",
                StreamEvent::TextEnd { .. } => "text-end",
                StreamEvent::ToolInputAvailable { .. } => "tool-input-available",
                StreamEvent::ToolOutputAvailable { .. } => "tool-output-available",
                StreamEvent::ToolOutputError { .. } => "tool-output-error",
                StreamEvent::FinishStep => "finish-step",
                StreamEvent::Finish => "finish",
                StreamEvent::Error { .. } => "error",
            })
            .collect()
    }

    #[tokio::test]
    async fn text_only_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![vec![
            text("Hello "),
            text("there!"),
            ChatChunk::Finish { reason: None },
        ]]));
        let manager = manager(provider.clone(), 5);

        let (result, events) = run(&manager).await;
        let outcome = result.unwrap();
        assert_eq!(outcome.text, "Hello there!");
        assert_eq!(outcome.steps, 1);
        assert_eq!(
            kinds(&events),
            vec![
                "start",
                "start-step",
                "text-start",
                "text-delta",
                "text-delta",
                "text-end",
                "finish-step",
                "finish"
            ]
        );

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].system.as_deref(), Some(manager.system_prompt()));
        assert_eq!(requests[0].tools.len(), 1);
        assert_eq!(requests[0].tools[0].name, "vectorSearch");
    }

    #[tokio::test]
    async fn tool_results_are_fed_back() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            vec![tool_call("c1", "vectorSearch")],
            vec![text("You can return them within 30 days.")],
        ]));
        let manager = manager(provider.clone(), 5);

        let (result, events) = run(&manager).await;
        let outcome = result.unwrap();
        assert_eq!(outcome.steps, 2);
        assert_eq!(outcome.tool_invocations.len(), 1);
        assert!(outcome.tool_invocations[0].success);
        assert_eq!(
            kinds(&events),
            vec![
                "start",
                "start-step",
                "tool-input-available",
                "tool-output-available",
                "finish-step",
                "start-step",
                "text-start",
                "text-delta",
                "text-end",
                "finish-step",
                "finish"
            ]
        );

        let requests = provider.requests.lock().unwrap();
        let second = &requests[1].messages;
        assert_eq!(second.len(), 3);
        assert_eq!(second[1].role, Role::Assistant);
        assert_eq!(second[1].tool_calls().next().unwrap().id, "c1");
        match &second[2].parts[0] {
            Part::ToolResult(result) => {
                assert_eq!(result.name, "vectorSearch");
                assert_eq!(result.output["query"], "returns");
            }
            other => panic!("unexpected part {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_tool_reports_error_output() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            vec![tool_call("c1", "orderLookup")],
            vec![text("Sorry.")],
        ]));
        let manager = manager(provider.clone(), 5);

        let (result, events) = run(&manager).await;
        let outcome = result.unwrap();
        assert!(!outcome.tool_invocations[0].success);
        assert!(events.iter().any(|event| matches!(
            event,
            StreamEvent::ToolOutputError { error_text, .. } if error_text.contains("Unknown plugin")
        )));

        let requests = provider.requests.lock().unwrap();
        match &requests[1].messages[2].parts[0] {
            Part::ToolResult(result) => assert!(result.output["error"]
                .as_str()
                .unwrap()
                .contains("orderLookup")),
            other => panic!("unexpected part {:?}", other),
        }
    }

    #[tokio::test]
    async fn stops_after_max_steps() {
        let provider = Arc::new(ScriptedProvider {
            repeat_last: true,
            ..ScriptedProvider::new(vec![vec![tool_call("c", "vectorSearch")]])
        });
        let manager = manager(provider.clone(), 2);

        let (result, events) = run(&manager).await;
        let outcome = result.unwrap();
        assert_eq!(outcome.steps, 2);
        assert_eq!(provider.requests.lock().unwrap().len(), 2);
        assert_eq!(events.last(), Some(&StreamEvent::Finish));
    }

    #[tokio::test]
    async fn provider_failure_emits_error_event() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let manager = manager(provider, 5);

        let (result, events) = run(&manager).await;
        assert!(matches!(result, Err(ChatError::Provider(_))));
        assert!(matches!(
            events.last(),
            Some(StreamEvent::Error { error_text }) if error_text == "script exhausted"
        ));
    }

    #[tokio::test]
    async fn query_collects_text() {
        let provider = Arc::new(ScriptedProvider::new(vec![vec![text("Hi!")]]));
        let outcome = manager(provider, 5).query("hello").await.unwrap();
        assert_eq!(outcome.text, "Hi!");
    }
}
