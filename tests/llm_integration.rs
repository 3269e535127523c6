//! Integration tests for the LLM client.
//!
//! These tests make real API calls to OpenRouter.
//! Run with: OPENROUTER_API_KEY=your_key cargo test --test llm_integration -- --ignored

use serde_json::json;
use std::fs;
use std::sync::Arc;
use tracemend::agent::{AgentConfig, NoopReporter};
use tracemend::codebase::CodebaseContext;
use tracemend::llm::{
    resolve_model, GenerationRequest, LlmProvider, Message, ModelCatalog, OpenRouterProvider,
    ToolDefinition, DEFAULT_MODEL, OPENROUTER_BASE_URL,
};
use tracemend::remediation::RemediationOrchestrator;
use tracemend::tools::ToolRegistry;
use tracemend::trace;

fn get_test_api_key() -> String {
    std::env::var("OPENROUTER_API_KEY")
        .expect("OPENROUTER_API_KEY environment variable must be set for integration tests")
}

fn create_test_client() -> OpenRouterProvider {
    OpenRouterProvider::new(get_test_api_key(), OPENROUTER_BASE_URL, DEFAULT_MODEL)
        .expect("client should build")
}

#[tokio::test]
#[ignore] // Run with: cargo test --test llm_integration -- --ignored
async fn test_simple_generation() {
    let client = create_test_client();

    let request = GenerationRequest::new(
        "",
        vec![
            Message::system("You are a helpful assistant. Reply concisely."),
            Message::user("What is 2 + 2? Reply with just the number."),
        ],
    )
    .with_max_tokens(10)
    .with_temperature(0.0);

    let response = client.generate(request).await;
    assert!(response.is_ok(), "Generation failed: {:?}", response.err());

    let response = response.expect("Should have response");
    let content = response.first_content().expect("Should have content");
    assert!(
        content.contains('4'),
        "Response should contain '4', got: {}",
        content
    );

    // Verify usage was tracked
    assert!(response.usage.total_tokens > 0, "Should have token usage");
}

#[tokio::test]
#[ignore]
async fn test_tool_call_requested() {
    let client = create_test_client();

    let tool = ToolDefinition::function(
        "read_file",
        "Read a file from the project.",
        json!({
            "type": "object",
            "properties": {"path": {"type": "string"}},
            "required": ["path"]
        }),
    );
    let request = GenerationRequest::new(
        "",
        vec![
            Message::system("Always use the available tools before answering."),
            Message::user("What does main.py contain?"),
        ],
    )
    .with_tools(vec![tool])
    .with_temperature(0.0);

    let response = client
        .generate(request)
        .await
        .expect("Generation should succeed");
    let message = response.first_message().expect("Should have a message");
    let calls = message.requested_tool_calls();

    assert!(!calls.is_empty(), "Expected a tool call, got: {:?}", message);
    assert_eq!(calls[0].function.name, "read_file");
    assert!(calls[0].function.arguments.contains("main.py"));
}

#[tokio::test]
#[ignore]
async fn test_model_catalog() {
    let client = create_test_client();

    let models = client.list_models().await.expect("Catalog should load");
    assert!(!models.is_empty());

    let resolved = resolve_model(None, &client).await;
    assert!(models.contains(&resolved) || resolved == DEFAULT_MODEL);
}

#[tokio::test]
#[ignore]
async fn test_invalid_api_key() {
    let client = OpenRouterProvider::new("invalid-key", OPENROUTER_BASE_URL, DEFAULT_MODEL)
        .expect("client should build");

    let request = GenerationRequest::new("", vec![Message::user("Hello")]).with_max_tokens(5);
    let response = client.generate(request).await;
    assert!(response.is_err(), "Should fail with invalid API key");
}

#[tokio::test]
#[ignore]
async fn test_end_to_end_remediation() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("main.py"),
        "def divide(a, b):\n    return a / b\n\n\nprint(divide(1, 0))\n",
    )
    .expect("write fixture");
    let ctx = CodebaseContext::new(dir.path()).expect("context");

    let parsed = trace::parse(
        "Traceback (most recent call last):\n  File \"main.py\", line 5, in <module>\n    print(divide(1, 0))\n  File \"main.py\", line 2, in divide\n    return a / b\nZeroDivisionError: division by zero\n",
    );

    let orchestrator = RemediationOrchestrator::new(
        Arc::new(create_test_client()),
        ToolRegistry::with_codebase_tools(),
        AgentConfig::new().with_max_steps(8),
    )
    .with_structured_output(true);

    let outcome = orchestrator
        .remediate(&parsed, &ctx, &NoopReporter)
        .await
        .expect("remediation should succeed");

    assert!(!outcome.markdown.trim().is_empty());
    assert!(outcome.markdown.contains("divide"));
}
