//! Tool-calling agent loop.
//!
//! Each step:
//! 1. Sends the conversation with the tool definitions
//! 2. Executes every requested tool call, in order
//! 3. Answers each call with a `tool` message
//! 4. Stops when the model replies without tool calls

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use super::progress::{ProgressEvent, ProgressReporter};
use super::prompts::STEP_LIMIT_PROMPT;
use crate::codebase::CodebaseContext;
use crate::llm::{GenerationRequest, LlmProvider, Message, ToolCallInfo};
use crate::tools::{ToolRegistry, ToolResult};

/// Default step budget.
pub const DEFAULT_MAX_STEPS: usize = 25;

/// Errors that can occur during agent execution.
#[derive(Debug, Error)]
pub enum AgentError {
    /// LLM provider error.
    #[error("LLM error: {0}")]
    LlmError(#[from] crate::error::LlmError),

    /// The model returned no choice, or an empty final answer.
    #[error("Empty LLM response: {0}")]
    EmptyResponse(String),
}

/// Configuration for the agent loop.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum number of requests that may offer tools.
    pub max_steps: usize,
    /// Model to use for LLM requests; empty means the provider's default.
    pub model: String,
    /// Temperature for LLM sampling.
    pub temperature: f64,
    /// Maximum tokens for LLM response.
    pub max_tokens: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            model: String::new(),
            temperature: 0.2,
            max_tokens: 4096,
        }
    }
}

impl AgentConfig {
    /// Create a new agent configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of steps.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum tokens for responses.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Result of one agent run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentOutcome {
    /// The model's final answer.
    pub final_text: String,
    /// Full conversation, including the final answer.
    pub messages: Vec<Message>,
    /// Tool calls executed during the run.
    pub tool_calls: usize,
    /// Requests sent to the model.
    pub steps: usize,
}

/// Main agent execution loop.
pub struct AgentLoop {
    llm_client: Arc<dyn LlmProvider>,
    tool_registry: ToolRegistry,
    config: AgentConfig,
}

impl AgentLoop {
    /// Create an agent loop with the given tools.
    pub fn new(
        llm_client: Arc<dyn LlmProvider>,
        tool_registry: ToolRegistry,
        config: AgentConfig,
    ) -> Self {
        Self {
            llm_client,
            tool_registry,
            config,
        }
    }

    /// Agent configuration.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run one conversation to a final answer.
    ///
    /// The conversation is `system`, then the non-system messages of
    /// `history`, then `prompt` as a user message.
    ///
    /// # Errors
    ///
    /// LLM failures abort the run. Tool failures never do: they are relayed
    /// to the model as failed tool results.
    pub async fn run(
        &self,
        system: &str,
        history: &[Message],
        prompt: &str,
        ctx: &CodebaseContext,
        reporter: &dyn ProgressReporter,
    ) -> Result<AgentOutcome, AgentError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(system));
        messages.extend(history.iter().filter(|m| m.role != "system").cloned());
        messages.push(Message::user(prompt));

        let tool_definitions = self.tool_registry.to_tool_definitions();
        let mut tool_calls = 0;
        let mut steps = 0;

        while steps < self.config.max_steps {
            steps += 1;
            reporter.report(&ProgressEvent::StepStarted { step: steps });

            let request = self
                .base_request(messages.clone())
                .with_tools(tool_definitions.clone());
            let reply = self.request_message(request).await?;

            let calls = reply.requested_tool_calls().to_vec();
            if calls.is_empty() {
                return finish(reply.content, messages, tool_calls, steps);
            }

            messages.push(Message::assistant_with_tool_calls(reply.content, calls.clone()));
            for call in &calls {
                tool_calls += 1;
                let result = self.execute_call(call, ctx, reporter).await;
                messages.push(Message::tool_result(&call.id, result.to_message_content()));
            }
        }

        reporter.report(&ProgressEvent::StepLimitReached {
            max_steps: self.config.max_steps,
        });
        messages.push(Message::user(STEP_LIMIT_PROMPT));
        steps += 1;

        let reply = self.request_message(self.base_request(messages.clone())).await?;
        finish(reply.content, messages, tool_calls, steps)
    }

    fn base_request(&self, messages: Vec<Message>) -> GenerationRequest {
        GenerationRequest::new(self.config.model.clone(), messages)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens)
    }

    async fn request_message(&self, request: GenerationRequest) -> Result<Message, AgentError> {
        let response = self.llm_client.generate(request).await?;
        tracing::debug!(
            model = %response.model,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "LLM response received"
        );
        response
            .first_message()
            .cloned()
            .ok_or_else(|| AgentError::EmptyResponse("response contained no choices".to_string()))
    }

    /// Execute a tool call, folding every failure into a failed result.
    async fn execute_call(
        &self,
        call: &ToolCallInfo,
        ctx: &CodebaseContext,
        reporter: &dyn ProgressReporter,
    ) -> ToolResult {
        let name = call.function.name.as_str();
        reporter.report(&ProgressEvent::ToolCalled {
            name: name.to_string(),
            arguments: call.function.arguments.clone(),
        });

        let result = match parse_arguments(&call.function.arguments) {
            Ok(args) => match self.tool_registry.invoke(name, args, ctx).await {
                Ok(result) => result,
                Err(err) => {
                    tracing::warn!(tool = name, error = %err, "Tool call failed");
                    ToolResult::failure(err.to_string())
                }
            },
            Err(message) => {
                tracing::warn!(tool = name, error = %message, "Malformed tool arguments");
                ToolResult::failure(message)
            }
        };

        reporter.report(&ProgressEvent::ToolFinished {
            name: name.to_string(),
            success: result.success,
        });
        result
    }
}

/// Decode the JSON-encoded arguments of a tool call; blank means none.
fn parse_arguments(raw: &str) -> Result<Value, String> {
    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(raw).map_err(|e| format!("Invalid JSON arguments: {}", e))
}

fn finish(
    final_text: String,
    mut messages: Vec<Message>,
    tool_calls: usize,
    steps: usize,
) -> Result<AgentOutcome, AgentError> {
    if final_text.trim().is_empty() {
        return Err(AgentError::EmptyResponse(
            "model returned no text and no tool calls".to_string(),
        ));
    }

    messages.push(Message::assistant(final_text.clone()));
    Ok(AgentOutcome {
        final_text,
        messages,
        tool_calls,
        steps,
    })
}
