//! Error types for tracemend operations.
//!
//! Defines error types shared across subsystems:
//! - LLM API interactions
//! - Sandboxed codebase access (path resolution, search, import analysis)
//!
//! Subsystem-local errors (`ToolError`, `AgentError`, `OrchestratorError`,
//! `ConfigError`, `CliError`) live next to the code that raises them.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },
}

/// Errors that can occur while accessing the sandboxed codebase.
#[derive(Debug, Error)]
pub enum CodebaseError {
    #[error("Path '{}' resolves outside the project root", path.display())]
    OutOfBounds { path: PathBuf },

    #[error("Path '{}' does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("Path '{}' is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("Path '{}' is not a regular file", path.display())]
    NotAFile { path: PathBuf },

    #[error("Path '{}' is not a Python source file", path.display())]
    NotSourceFile { path: PathBuf },

    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Syntax error in '{}' near line {line}", path.display())]
    Syntax { path: PathBuf, line: usize },

    #[error("Source parser unavailable: {0}")]
    Parser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodebaseError {
    /// Returns `true` for sandbox violations.
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, CodebaseError::OutOfBounds { .. })
    }
}
