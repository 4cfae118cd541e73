//! Agent runner with tool calling loop.

use super::definition::Agent;
use super::tools::{parse_arguments, tool_definitions, ToolInvoker};
use crate::error::{MarqueeError, Result};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Prior turns of a conversation, excluding the system prompt.
pub type History = Vec<ChatCompletionRequestMessage>;

/// Runs an [`Agent`] against the chat-completions API, executing the tools it requests.
pub struct AgentRunner {
    agent: Arc<Agent>,
    invoker: Arc<dyn ToolInvoker>,
    client: Client<OpenAIConfig>,
}

impl AgentRunner {
    /// Create a runner with the default OpenAI client.
    pub fn new(agent: Arc<Agent>, invoker: Arc<dyn ToolInvoker>) -> Result<Self> {
        Ok(Self::with_client(agent, invoker, create_client()?))
    }

    /// Create a runner with a custom client.
    pub fn with_client(
        agent: Arc<Agent>,
        invoker: Arc<dyn ToolInvoker>,
        client: Client<OpenAIConfig>,
    ) -> Self {
        Self {
            agent,
            invoker,
            client,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Run the agent on a single task with no prior conversation.
    pub async fn run(&self, task: &str) -> Result<AgentResponse> {
        let mut history = History::new();
        self.run_with_history(&mut history, task).await
    }

    /// Run the agent on a task, continuing `history`. On success the task,
    /// the tool traffic and the final answer are appended to `history`.
    #[instrument(skip(self, history, task), fields(agent = %self.agent.name()))]
    pub async fn run_with_history(&self, history: &mut History, task: &str) -> Result<AgentResponse> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.agent.instructions().to_string())
                .build()
                .map_err(|e| MarqueeError::Agent(e.to_string()))?
                .into(),
        ];
        messages.extend(history.iter().cloned());
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(task.to_string())
                .build()
                .map_err(|e| MarqueeError::Agent(e.to_string()))?
                .into(),
        );

        let tools = tool_definitions(self.agent.tools());
        let max_iterations = self.agent.max_iterations();
        let mut iterations = 0;
        let mut tool_calls_made = Vec::new();

        loop {
            iterations += 1;
            if iterations > max_iterations {
                return Err(MarqueeError::Agent(format!(
                    "Agent exceeded maximum iterations ({})",
                    max_iterations
                )));
            }

            debug!("Agent iteration {}", iterations);

            let mut request = CreateChatCompletionRequestArgs::default();
            request.model(self.agent.model()).messages(messages.clone());
            if !tools.is_empty() {
                request.tools(tools.clone());
            }
            let request = request
                .build()
                .map_err(|e| MarqueeError::Agent(e.to_string()))?;

            let response = self
                .client
                .chat()
                .create(request)
                .await
                .map_err(|e| MarqueeError::OpenAI(format!("Agent API error: {}", e)))?;

            let choice = response
                .choices
                .first()
                .ok_or_else(|| MarqueeError::Agent("No response from model".to_string()))?;

            match choice.message.tool_calls {
                Some(ref tool_calls) if !tool_calls.is_empty() => {
                    let assistant_msg = ChatCompletionRequestAssistantMessageArgs::default()
                        .tool_calls(tool_calls.clone())
                        .build()
                        .map_err(|e| MarqueeError::Agent(e.to_string()))?;
                    messages.push(assistant_msg.into());

                    for tool_call in tool_calls {
                        let record = self.execute_tool_call(tool_call).await;

                        let tool_msg = ChatCompletionRequestToolMessageArgs::default()
                            .tool_call_id(&tool_call.id)
                            .content(record.result.clone())
                            .build()
                            .map_err(|e| MarqueeError::Agent(e.to_string()))?;
                        messages.push(tool_msg.into());

                        tool_calls_made.push(record);
                    }
                }
                _ => {
                    let content = choice.message.content.clone().unwrap_or_default();
                    messages.push(
                        ChatCompletionRequestAssistantMessageArgs::default()
                            .content(content.clone())
                            .build()
                            .map_err(|e| MarqueeError::Agent(e.to_string()))?
                            .into(),
                    );
                    *history = messages.split_off(1);

                    return Ok(AgentResponse {
                        content,
                        tool_calls: tool_calls_made,
                        iterations,
                    });
                }
            }
        }
    }

    /// Execute a single tool call and return a record of it.
    ///
    /// Failures are reported back to the model as text.
    async fn execute_tool_call(&self, tool_call: &ChatCompletionMessageToolCall) -> ToolCallRecord {
        let name = &tool_call.function.name;
        let arguments = &tool_call.function.arguments;

        info!("Agent calling tool: {} with args: {}", name, arguments);

        let (result, is_error) = match parse_arguments(arguments) {
            Ok(args) => match self.invoker.invoke(name, args).await {
                Ok(output) if output.is_error => (format!("Tool error: {}", output.text), true),
                Ok(output) => (output.text, false),
                Err(e) => (format!("Tool error: {}", e), true),
            },
            Err(e) => (format!("Failed to parse tool call: {}", e), true),
        };

        ToolCallRecord {
            name: name.clone(),
            arguments: arguments.clone(),
            result,
            is_error,
        }
    }
}

/// Response from an agent run.
#[derive(Debug)]
pub struct AgentResponse {
    /// The final response content from the agent.
    pub content: String,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of iterations (LLM calls) used.
    pub iterations: usize,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Qualified name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned by the tool.
    pub result: String,
    /// Whether the call failed.
    pub is_error: bool,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}
