//! Import analysis tool.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_params, to_pretty_json, validate_path, Tool, ToolError, ToolResult};
use crate::codebase::CodebaseContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ImportTreeParams {
    /// Python file to analyse.
    file_path: String,
}

/// Tool listing the imports declared by a Python file.
#[derive(Debug, Default)]
pub struct ImportTreeTool;

impl ImportTreeTool {
    /// Create a new ImportTreeTool instance.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for ImportTreeTool {
    fn name(&self) -> &str {
        "get_import_tree"
    }

    fn description(&self) -> &str {
        "List the modules imported by a Python file, with the imported names for \
         `from ... import` statements and the line of each import."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Python file relative to the project root"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, args: Value, ctx: &CodebaseContext) -> Result<ToolResult, ToolError> {
        let params: ImportTreeParams = parse_params(args)?;
        validate_path(&params.file_path)?;

        let relations = ctx.import_tree(&params.file_path)?;
        if relations.is_empty() {
            return Ok(ToolResult::success(format!(
                "{} has no imports",
                params.file_path
            )));
        }
        Ok(ToolResult::success(to_pretty_json(&relations)?))
    }
}
