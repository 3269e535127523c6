//! Search tools for finding patterns and symbol references.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_params, to_pretty_json, Tool, ToolError, ToolResult};
use crate::codebase::{CodebaseContext, MAX_SEARCH_RESULTS};

/// Parameters for the find_in_files tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FindInFilesParams {
    /// Regular expression to search for.
    pattern: String,
    /// Optional glob restricting the searched files (e.g. "*.py").
    file_pattern: Option<String>,
}

/// Tool for regex search across the project.
#[derive(Debug, Default)]
pub struct FindInFilesTool;

impl FindInFilesTool {
    /// Create a new FindInFilesTool instance.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for FindInFilesTool {
    fn name(&self) -> &str {
        "find_in_files"
    }

    fn description(&self) -> &str {
        "Search project files for a regular expression. Returns matching lines with their \
         file path and 1-based line number, at most 100 matches."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Regular expression to search for"
                },
                "file_pattern": {
                    "type": "string",
                    "description": "Glob restricting which files are searched, e.g. \"*.py\" (optional)"
                }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, args: Value, ctx: &CodebaseContext) -> Result<ToolResult, ToolError> {
        let params: FindInFilesParams = parse_params(args)?;
        if params.pattern.is_empty() {
            return Err(ToolError::InvalidParameters(
                "Pattern cannot be empty".to_string(),
            ));
        }

        let file_pattern = params
            .file_pattern
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());
        let matches = ctx.find_in_files(&params.pattern, file_pattern)?;

        if matches.is_empty() {
            return Ok(ToolResult::success(format!(
                "No matches found for pattern: {}",
                params.pattern
            )));
        }
        if matches.len() >= MAX_SEARCH_RESULTS {
            tracing::debug!(pattern = %params.pattern, "find_in_files hit the result limit");
        }
        Ok(ToolResult::success(to_pretty_json(&matches)?))
    }
}

/// Parameters for the find_symbol_references tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FindSymbolReferencesParams {
    /// Identifier to look up.
    symbol: String,
}

/// Tool for whole-word symbol lookup in Python sources.
#[derive(Debug, Default)]
pub struct FindSymbolReferencesTool;

impl FindSymbolReferencesTool {
    /// Create a new FindSymbolReferencesTool instance.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for FindSymbolReferencesTool {
    fn name(&self) -> &str {
        "find_symbol_references"
    }

    fn description(&self) -> &str {
        "Find whole-word references to a symbol (function, class or variable name) in the \
         project's Python files. Symbols must be at least 2 characters long."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "symbol": {
                    "type": "string",
                    "description": "Symbol name to look up",
                    "minLength": 2
                }
            },
            "required": ["symbol"]
        })
    }

    async fn execute(&self, args: Value, ctx: &CodebaseContext) -> Result<ToolResult, ToolError> {
        let params: FindSymbolReferencesParams = parse_params(args)?;
        let locations = ctx.find_symbol_references(params.symbol.trim())?;

        if locations.is_empty() {
            return Ok(ToolResult::success(format!(
                "No references found for symbol: {}",
                params.symbol
            )));
        }
        Ok(ToolResult::success(to_pretty_json(&locations)?))
    }
}
