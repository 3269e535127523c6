//! Progress reporting for long-running agent work.
//!
//! Reporters observe; they never influence control flow.

/// Something worth surfacing while a remediation runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// An orchestration phase began.
    PhaseStarted { phase: &'static str },
    /// An orchestration phase produced its text.
    PhaseFinished {
        phase: &'static str,
        tool_calls: usize,
    },
    /// The agent is about to send request number `step`.
    StepStarted { step: usize },
    /// The model asked for a tool.
    ToolCalled { name: String, arguments: String },
    /// A tool call finished.
    ToolFinished { name: String, success: bool },
    /// The step budget ran out; a conclusion is being requested.
    StepLimitReached { max_steps: usize },
}

/// Receives [`ProgressEvent`]s.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: &ProgressEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::PhaseStarted { phase } => {
                tracing::info!(phase, "Phase started");
            }
            ProgressEvent::PhaseFinished { phase, tool_calls } => {
                tracing::info!(phase, tool_calls, "Phase finished");
            }
            ProgressEvent::StepStarted { step } => {
                tracing::debug!(step, "Requesting model response");
            }
            ProgressEvent::ToolCalled { name, arguments } => {
                tracing::info!(tool = %name, arguments = %arguments, "Calling tool");
            }
            ProgressEvent::ToolFinished { name, success } => {
                tracing::debug!(tool = %name, success, "Tool finished");
            }
            ProgressEvent::StepLimitReached { max_steps } => {
                tracing::warn!(max_steps, "Step limit reached, requesting conclusion");
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: &ProgressEvent) {}
}
