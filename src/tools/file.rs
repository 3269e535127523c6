//! File viewing tools.
//!
//! - `ReadFileTool`: read a file, optionally a 0-based line slice
//! - `ListDirectoryTool`: list the children of a directory
//! - `StackFrameContextTool`: numbered source window around a frame's line

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_params, to_pretty_json, validate_path, Tool, ToolError, ToolResult};
use crate::codebase::{CodebaseContext, DEFAULT_CONTEXT_LINES};

// ============================================================================
// ReadFileTool
// ============================================================================

/// Parameters for the read_file tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReadFileParams {
    /// Path to the file, relative to the project root.
    path: String,
    /// Optional first line (0-based, inclusive).
    start_line: Option<usize>,
    /// Optional last line (0-based, inclusive).
    end_line: Option<usize>,
}

/// Tool for reading file contents.
#[derive(Debug, Default)]
pub struct ReadFileTool;

impl ReadFileTool {
    /// Create a new ReadFileTool instance.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a file from the project. Optionally pass start_line and end_line \
         (0-based, both inclusive) to read a slice; out-of-range values are clamped to the last line."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file, relative to the project root"
                },
                "start_line": {
                    "type": "integer",
                    "description": "First line to read (0-based, inclusive, optional)",
                    "minimum": 0
                },
                "end_line": {
                    "type": "integer",
                    "description": "Last line to read (0-based, inclusive, optional)",
                    "minimum": 0
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value, ctx: &CodebaseContext) -> Result<ToolResult, ToolError> {
        let params: ReadFileParams = parse_params(args)?;
        validate_path(&params.path)?;

        let content = ctx.read_file(&params.path, params.start_line, params.end_line)?;
        tracing::debug!(path = %params.path, bytes = content.len(), "read_file");
        Ok(ToolResult::success(content))
    }
}

// ============================================================================
// ListDirectoryTool
// ============================================================================

/// Parameters for the list_directory tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ListDirectoryParams {
    /// Directory to list; the project root when omitted.
    #[serde(default = "current_dir")]
    path: String,
}

fn current_dir() -> String {
    ".".to_string()
}

/// Tool for listing a directory's immediate children.
#[derive(Debug, Default)]
pub struct ListDirectoryTool;

impl ListDirectoryTool {
    /// Create a new ListDirectoryTool instance.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List the names of the files and directories directly inside a project directory."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory relative to the project root (default: \".\")"
                }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &CodebaseContext) -> Result<ToolResult, ToolError> {
        let params: ListDirectoryParams = parse_params(args)?;
        validate_path(&params.path)?;

        let names = ctx.list_directory(&params.path)?;
        Ok(ToolResult::success(to_pretty_json(&names)?))
    }
}

// ============================================================================
// StackFrameContextTool
// ============================================================================

/// Parameters for the get_stack_frame_context tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StackFrameContextParams {
    /// File named by the frame.
    file_path: String,
    /// 1-based line named by the frame.
    line_number: usize,
    /// Lines shown on each side of the target.
    #[serde(default = "default_context_lines")]
    context_lines: usize,
}

fn default_context_lines() -> usize {
    DEFAULT_CONTEXT_LINES
}

/// Tool for viewing the code around a stack frame.
#[derive(Debug, Default)]
pub struct StackFrameContextTool;

impl StackFrameContextTool {
    /// Create a new StackFrameContextTool instance.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for StackFrameContextTool {
    fn name(&self) -> &str {
        "get_stack_frame_context"
    }

    fn description(&self) -> &str {
        "Show the numbered source lines around a stack frame. The frame's line is marked with '>'."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "File from the stack frame, relative to the project root"
                },
                "line_number": {
                    "type": "integer",
                    "description": "Line from the stack frame (1-based)",
                    "minimum": 1
                },
                "context_lines": {
                    "type": "integer",
                    "description": "Lines to show on each side (default: 5)",
                    "minimum": 0
                }
            },
            "required": ["file_path", "line_number"]
        })
    }

    async fn execute(&self, args: Value, ctx: &CodebaseContext) -> Result<ToolResult, ToolError> {
        let params: StackFrameContextParams = parse_params(args)?;
        validate_path(&params.file_path)?;

        let window = ctx.frame_context(&params.file_path, params.line_number, params.context_lines)?;
        Ok(ToolResult::success(window))
    }
}
