//! Tool definitions and registry for the remediation agent.
//!
//! This module defines the `Tool` trait and provides a registry for managing
//! the codebase tools the LLM agent can invoke. Every tool runs against a
//! sandboxed [`CodebaseContext`] supplied at call time.

pub mod file;
pub mod imports;
pub mod search;

pub use file::{ListDirectoryTool, ReadFileTool, StackFrameContextTool};
pub use imports::ImportTreeTool;
pub use search::{FindInFilesTool, FindSymbolReferencesTool};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

use crate::codebase::CodebaseContext;
use crate::error::CodebaseError;
use crate::llm::ToolDefinition;

/// Attempts made by [`ToolRegistry::invoke`] unless configured otherwise.
pub const DEFAULT_TOOL_ATTEMPTS: u32 = 2;

/// Errors that can occur during tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Invalid parameters provided to the tool.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// No tool is registered under the requested name.
    #[error("Tool not available: {0}")]
    NotAvailable(String),

    /// The sandboxed codebase rejected or failed the operation.
    #[error(transparent)]
    Codebase(#[from] CodebaseError),

    /// Tool output could not be rendered.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// The operation kept failing after every attempt.
    #[error("Failed after {attempts} attempt(s): {message}")]
    Retryable { attempts: u32, message: String },
}

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool execution was successful.
    pub success: bool,
    /// Output from the tool execution.
    pub output: String,
    /// Error message if execution failed.
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful tool result.
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    /// Create a failed tool result.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
        }
    }

    /// Text relayed to the model for this result.
    pub fn to_message_content(&self) -> String {
        match (&self.error, self.success) {
            (Some(error), _) => format!("Error: {}", error),
            (None, true) if self.output.is_empty() => "(no output)".to_string(),
            (None, _) => self.output.clone(),
        }
    }
}

/// Trait for tools that can be executed by the agent.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the unique name of the tool.
    fn name(&self) -> &str;

    /// Returns a description of what the tool does.
    fn description(&self) -> &str;

    /// Returns the JSON schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments against `ctx`.
    ///
    /// # Arguments
    ///
    /// * `args` - JSON object containing the tool parameters
    /// * `ctx` - Sandboxed view of the project
    async fn execute(&self, args: Value, ctx: &CodebaseContext) -> Result<ToolResult, ToolError>;
}

/// Run `op` up to `attempts` times (at least once), stopping at the first
/// success.
///
/// When every attempt fails the last error is returned as
/// [`ToolError::Retryable`].
pub async fn with_retry<T, F, Fut>(attempts: u32, mut op: F) -> Result<T, ToolError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ToolError>>,
{
    let attempts = attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                tracing::debug!(attempt, attempts, error = %err, "Tool attempt failed");
                last_error = Some(err);
            }
        }
    }

    Err(ToolError::Retryable {
        attempts,
        message: last_error.map(|e| e.to_string()).unwrap_or_default(),
    })
}

/// Decode tool arguments into a typed parameter struct.
pub(crate) fn parse_params<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    // Models sometimes send `null` for tools without required parameters.
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidParameters(e.to_string()))
}

/// Render a typed list as pretty JSON.
pub(crate) fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value).map_err(|e| ToolError::ExecutionFailed(e.to_string()))
}

/// Reject empty paths and paths carrying NUL bytes.
pub(crate) fn validate_path(path: &str) -> Result<(), ToolError> {
    if path.trim().is_empty() {
        return Err(ToolError::InvalidParameters(
            "Path cannot be empty".to_string(),
        ));
    }
    if path.contains('\0') {
        return Err(ToolError::InvalidParameters(
            "Path contains invalid null character".to_string(),
        ));
    }
    Ok(())
}

/// Registry for managing available tools.
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    max_attempts: u32,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
            max_attempts: DEFAULT_TOOL_ATTEMPTS,
        }
    }

    /// Create a registry with the six codebase tools.
    pub fn with_codebase_tools() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ReadFileTool::new()));
        registry.register(Arc::new(ListDirectoryTool::new()));
        registry.register(Arc::new(FindInFilesTool::new()));
        registry.register(Arc::new(FindSymbolReferencesTool::new()));
        registry.register(Arc::new(ImportTreeTool::new()));
        registry.register(Arc::new(StackFrameContextTool::new()));
        registry
    }

    /// Set how many times `invoke` attempts a tool before giving up.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Attempts made per invocation.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Register a new tool in the registry.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// List all registered tool names, sorted.
    pub fn list_tools(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Function definitions for every registered tool, sorted by name.
    pub fn to_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|tool| {
                ToolDefinition::function(
                    tool.name(),
                    tool.description(),
                    tool.parameters_schema(),
                )
            })
            .collect()
    }

    /// Invoke the tool `name` with retry.
    ///
    /// # Errors
    ///
    /// `NotAvailable` for unknown tools (not retried), otherwise
    /// `Retryable` once every attempt has failed.
    pub async fn invoke(
        &self,
        name: &str,
        args: Value,
        ctx: &CodebaseContext,
    ) -> Result<ToolResult, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotAvailable(name.to_string()))?;
        let tool: &dyn Tool = tool.as_ref();
        let args = &args;

        with_retry(self.max_attempts, move || tool.execute(args.clone(), ctx)).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_tool_result_success() {
        let result = ToolResult::success("output text");
        assert!(result.success);
        assert_eq!(result.output, "output text");
        assert!(result.error.is_none());
        assert_eq!(result.to_message_content(), "output text");
    }

    #[test]
    fn test_tool_result_failure() {
        let result = ToolResult::failure("error message");
        assert!(!result.success);
        assert!(result.output.is_empty());
        assert_eq!(result.error, Some("error message".to_string()));
        assert_eq!(result.to_message_content(), "Error: error message");
    }

    #[test]
    fn test_empty_success_has_placeholder() {
        assert_eq!(ToolResult::success("").to_message_content(), "(no output)");
    }

    #[tokio::test]
    async fn test_with_retry_stops_at_first_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry(3, move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 2 {
                Err(ToolError::ExecutionFailed("flaky".to_string()))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_with_retry_exhausts_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), ToolError> = with_retry(3, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ToolError::ExecutionFailed("always".to_string()))
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(ToolError::Retryable { attempts, message }) => {
                assert_eq!(attempts, 3);
                assert!(message.contains("always"));
            }
            other => panic!("expected Retryable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_with_retry_runs_at_least_once() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let _ = with_retry(0, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(ToolError::ExecutionFailed("x".to_string()))
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tool_registry_new() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.max_attempts(), DEFAULT_TOOL_ATTEMPTS);
        assert_eq!(ToolRegistry::new().with_max_attempts(0).max_attempts(), 1);
    }

    #[test]
    fn test_tool_registry_with_codebase_tools() {
        let registry = ToolRegistry::with_codebase_tools();
        assert_eq!(
            registry.list_tools(),
            vec![
                "find_in_files",
                "find_symbol_references",
                "get_import_tree",
                "get_stack_frame_context",
                "list_directory",
                "read_file",
            ]
        );
    }

    #[test]
    fn test_tool_definitions_structure() {
        let registry = ToolRegistry::with_codebase_tools();
        let definitions = registry.to_tool_definitions();
        assert_eq!(definitions.len(), 6);
        for definition in &definitions {
            assert_eq!(definition.tool_type, "function");
            assert!(!definition.function.description.is_empty());
            assert_eq!(definition.function.parameters["type"], "object");
        }
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = CodebaseContext::new(dir.path()).unwrap();
        let registry = ToolRegistry::with_codebase_tools();

        let result = registry
            .invoke("delete_everything", Value::Null, &ctx)
            .await;
        assert!(matches!(result, Err(ToolError::NotAvailable(_))));
    }

    #[tokio::test]
    async fn test_invoke_failure_is_retryable() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = CodebaseContext::new(dir.path()).unwrap();
        let registry = ToolRegistry::with_codebase_tools();

        let result = registry
            .invoke("read_file", serde_json::json!({"path": "missing.py"}), &ctx)
            .await;
        match result {
            Err(ToolError::Retryable { attempts, message }) => {
                assert_eq!(attempts, DEFAULT_TOOL_ATTEMPTS);
                assert!(message.contains("does not exist"));
            }
            other => panic!("expected Retryable, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("src/app.py").is_ok());
        assert!(matches!(
            validate_path("   "),
            Err(ToolError::InvalidParameters(_))
        ));
        assert!(matches!(
            validate_path("a\0b"),
            Err(ToolError::InvalidParameters(_))
        ));
    }
}
