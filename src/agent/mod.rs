//! LLM agent that explores a codebase through tool calls.

pub mod agent_loop;
pub mod progress;
pub mod prompts;

pub use agent_loop::{AgentConfig, AgentError, AgentLoop, AgentOutcome, DEFAULT_MAX_STEPS};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, TracingReporter};
pub use prompts::{
    build_exploration_prompt, REMEDIATION_PROMPT, REMEDIATION_SYSTEM_PROMPT, STEP_LIMIT_PROMPT,
    STRUCTURED_REMEDIATION_PROMPT,
};
