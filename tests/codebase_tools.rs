//! Integration tests for the sandboxed codebase and the agent tool surface.

use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;
use tracemend::codebase::{CodebaseContext, ImportKind, MAX_SEARCH_RESULTS};
use tracemend::error::CodebaseError;
use tracemend::tools::{ToolError, ToolRegistry};

/// A small Python project plus a sibling file outside of it.
fn project() -> (TempDir, CodebaseContext) {
    let outer = TempDir::new().unwrap();
    let root = outer.path().join("app");
    fs::create_dir_all(root.join("pkg")).unwrap();
    fs::create_dir_all(root.join("__pycache__")).unwrap();
    fs::create_dir_all(root.join("logs")).unwrap();

    fs::write(
        root.join("main.py"),
        "def add(a, b):\n    return a + b\n\n\ndef subtract(a, b):\n    return a - b\n\n\ndef divide(a, b):\n    return a / b\n",
    )
    .unwrap();
    fs::write(
        root.join("test_main.py"),
        "import os\nimport sys\nfrom main import add, subtract\n\nprint(add(1, 2))\n",
    )
    .unwrap();
    fs::write(
        root.join("pkg").join("helpers.py"),
        "from main import divide\n\n\ndef ratio(x, y):\n    return divide(x, y)\n",
    )
    .unwrap();
    fs::write(
        root.join("__pycache__").join("main.cpython-312.pyc"),
        "divide cached bytecode",
    )
    .unwrap();
    fs::write(root.join("logs").join("app.log"), "divide failed\n").unwrap();
    fs::write(outer.path().join("secret.txt"), "do not read").unwrap();

    let ctx = CodebaseContext::new(&root).unwrap();
    (outer, ctx)
}

fn registry() -> ToolRegistry {
    ToolRegistry::with_codebase_tools().with_max_attempts(1)
}

#[test]
fn test_rejects_paths_outside_root() {
    let (_dir, ctx) = project();

    let err = ctx.read_file("../secret.txt", None, None).unwrap_err();
    assert!(err.is_out_of_bounds(), "unexpected error: {err}");

    let err = ctx.read_file("pkg/../../secret.txt", None, None).unwrap_err();
    assert!(err.is_out_of_bounds());

    let err = ctx.list_directory("..").unwrap_err();
    assert!(err.is_out_of_bounds());

    let err = ctx.frame_context("../secret.txt", 1, 2).unwrap_err();
    assert!(err.is_out_of_bounds());

    // Staying inside the root through `..` is fine.
    let content = ctx.read_file("pkg/../main.py", Some(0), Some(0)).unwrap();
    assert_eq!(content, "def add(a, b):\n");
}

#[test]
fn test_exclusions_beat_file_pattern() {
    let (_dir, ctx) = project();

    let logs = ctx.find_in_files("divide", Some("*.log")).unwrap();
    assert!(logs.is_empty(), "excluded log matched: {logs:?}");

    let compiled = ctx.find_in_files("divide", Some("*.pyc")).unwrap();
    assert!(compiled.is_empty());

    let all = ctx.find_in_files("divide", None).unwrap();
    let paths: Vec<&str> = all.iter().map(|m| m.path.as_str()).collect();
    assert_eq!(paths, vec!["main.py", "pkg/helpers.py", "pkg/helpers.py"]);
}

#[test]
fn test_search_results_are_capped() {
    let dir = TempDir::new().unwrap();
    let body: String = (0..250).map(|i| format!("value_{i} = {i}\n")).collect();
    fs::write(dir.path().join("big.py"), body).unwrap();

    let ctx = CodebaseContext::new(dir.path()).unwrap();
    let matches = ctx.find_in_files(r"value_\d+", None).unwrap();
    assert_eq!(matches.len(), MAX_SEARCH_RESULTS);
    assert_eq!(matches[0].line_number, 1);
}

#[test]
fn test_frame_context_marks_requested_line() {
    let (_dir, ctx) = project();

    let window = ctx.frame_context("main.py", 10, 2).unwrap();
    let rows: Vec<&str> = window.lines().collect();
    assert_eq!(rows.len(), 3, "clamped to the end of the file: {window}");
    assert!(rows[0].starts_with("     8 |"));
    assert!(rows[2].starts_with(">   10 | "));
    assert_eq!(rows.iter().filter(|r| r.starts_with('>')).count(), 1);

    let first = ctx.frame_context("main.py", 1, 3).unwrap();
    assert!(first.lines().next().unwrap().starts_with(">    1 | def add"));

    assert!(matches!(
        ctx.frame_context("main.py", 0, 3),
        Err(CodebaseError::InvalidArgument(_))
    ));
}

#[test]
fn test_import_tree() {
    let (_dir, ctx) = project();

    let relations = ctx.import_tree("test_main.py").unwrap();
    assert_eq!(relations.len(), 3);

    assert_eq!(relations[0].module, "os");
    assert_eq!(relations[0].kind, ImportKind::Import);
    assert!(relations[0].imported_symbols.is_none());
    assert_eq!(relations[1].module, "sys");
    assert_eq!(relations[1].kind, ImportKind::Import);

    assert_eq!(relations[2].module, "main");
    assert_eq!(relations[2].kind, ImportKind::FromImport);
    assert_eq!(
        relations[2].imported_symbols,
        Some(vec!["add".to_string(), "subtract".to_string()])
    );
    assert_eq!(relations[2].line_number, 3);

    assert!(matches!(
        ctx.import_tree("logs/app.log"),
        Err(CodebaseError::NotSourceFile { .. })
    ));
}

#[test]
fn test_symbol_references() {
    let (_dir, ctx) = project();

    let refs = ctx.find_symbol_references("divide").unwrap();
    let found: Vec<(&str, usize)> = refs
        .iter()
        .map(|r| (r.file_path.as_str(), r.line_number))
        .collect();
    assert_eq!(found, vec![("main.py", 9), ("pkg/helpers.py", 1), ("pkg/helpers.py", 5)]);
    assert_eq!(refs[0].column, Some(5));

    assert!(matches!(
        ctx.find_symbol_references("a"),
        Err(CodebaseError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_registry_exposes_all_tools() {
    let registry = registry();
    let mut names: Vec<String> = registry
        .to_tool_definitions()
        .into_iter()
        .map(|def| def.function.name)
        .collect();
    names.sort();
    assert_eq!(
        names,
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

#[tokio::test]
async fn test_tools_through_registry() {
    let (_dir, ctx) = project();
    let registry = registry();

    let listing = registry
        .invoke("list_directory", json!({}), &ctx)
        .await
        .unwrap();
    let names: Vec<String> = serde_json::from_str(&listing.output).unwrap();
    assert!(names.contains(&"main.py".to_string()));
    assert!(names.contains(&"pkg".to_string()));

    let frame = registry
        .invoke(
            "get_stack_frame_context",
            json!({"file_path": "main.py", "line_number": 10, "context_lines": 1}),
            &ctx,
        )
        .await
        .unwrap();
    assert!(frame.output.contains(">   10 |     return a / b"));

    let imports = registry
        .invoke("get_import_tree", json!({"file_path": "test_main.py"}), &ctx)
        .await
        .unwrap();
    let relations: Value = serde_json::from_str(&imports.output).unwrap();
    assert_eq!(relations[2]["kind"], "from_import");
    assert_eq!(relations[2]["imported_symbols"], json!(["add", "subtract"]));

    let none = registry
        .invoke("find_in_files", json!({"pattern": "no_such_identifier"}), &ctx)
        .await
        .unwrap();
    assert_eq!(none.output, "No matches found for pattern: no_such_identifier");
}

#[tokio::test]
async fn test_registry_errors() {
    let (_dir, ctx) = project();
    let registry = registry();

    let escaped = registry
        .invoke("read_file", json!({"path": "../secret.txt"}), &ctx)
        .await
        .unwrap_err();
    match escaped {
        ToolError::Retryable { attempts, message } => {
            assert_eq!(attempts, 1);
            assert!(!message.contains("do not read"));
        }
        other => panic!("expected Retryable, got {other:?}"),
    }

    assert!(matches!(
        registry.invoke("delete_file", json!({}), &ctx).await,
        Err(ToolError::NotAvailable(_))
    ));
}
