//! tracemend: stack-trace driven remediation planning.
//!
//! Parses Python stack traces, gives an LLM agent sandboxed read-only tools
//! over a project, and turns its findings into a markdown remediation plan.

// Core modules
pub mod agent;
pub mod cli;
pub mod codebase;
pub mod config;
pub mod error;
pub mod llm;
pub mod remediation;
pub mod tools;
pub mod trace;
pub mod utils;

// Re-export commonly used types
pub use codebase::CodebaseContext;
pub use config::{ConfigError, Settings};
pub use error::{CodebaseError, LlmError};
pub use remediation::{RemediationOrchestrator, RemediationOutcome, RemediationPlan};
pub use trace::{StackFrame, StackTrace};
