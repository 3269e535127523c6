//! LLM integration.
//!
//! Provides the chat-completion wire types (including function tools), the
//! [`LlmProvider`] trait the agent loop talks to, the OpenRouter provider and
//! model selection.
//!
//! ```ignore
//! use tracemend::llm::{GenerationRequest, LlmProvider, Message, OpenRouterProvider};
//!
//! let provider = OpenRouterProvider::new(api_key, OPENROUTER_BASE_URL, "anthropic/claude-sonnet-4")?;
//! let request = GenerationRequest::new("", vec![Message::user("Hello!")]);
//! let response = provider.generate(request).await?;
//! ```

pub mod models;
pub mod providers;
pub mod types;

pub use models::{pick_preferred, resolve_model, DEFAULT_MODEL, PREFERRED_MODELS};
pub use providers::{OpenRouterProvider, OPENROUTER_BASE_URL};
pub use types::{
    Choice, FunctionCall, FunctionDefinition, GenerationRequest, GenerationResponse, LlmProvider,
    Message, ModelCatalog, ToolCallInfo, ToolChoice, ToolDefinition, Usage,
};
