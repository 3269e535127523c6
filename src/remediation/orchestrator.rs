//! Two-phase remediation.
//!
//! Phase 1 lets the agent explore the codebase until it can explain the
//! failure. Phase 2 continues the same conversation and asks for the plan,
//! either as markdown or as JSON rendered through [`RemediationPlan`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use super::plan::{PlanDraft, RemediationPlan};
use crate::agent::{
    build_exploration_prompt, AgentConfig, AgentError, AgentLoop, ProgressEvent,
    ProgressReporter, REMEDIATION_PROMPT, REMEDIATION_SYSTEM_PROMPT,
    STRUCTURED_REMEDIATION_PROMPT,
};
use crate::codebase::CodebaseContext;
use crate::llm::LlmProvider;
use crate::tools::ToolRegistry;
use crate::trace::StackTrace;
use crate::utils::extract_json_object;

/// Label of the exploration phase in progress events.
pub const EXPLORATION_PHASE: &str = "exploration";
/// Label of the remediation phase in progress events.
pub const REMEDIATION_PHASE: &str = "remediation";

/// Errors that abort an orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Agent failed: {0}")]
    Agent(#[from] AgentError),
}

/// What one orchestration produced.
#[derive(Debug, Clone, Serialize)]
pub struct RemediationOutcome {
    /// The final document.
    pub markdown: String,
    /// Phase-1 analysis text.
    pub analysis: String,
    /// Present when structured output was requested and decoded.
    pub plan: Option<RemediationPlan>,
    /// Tool calls across both phases.
    pub tool_calls: usize,
    /// Model requested for the run; empty means the provider default.
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

/// Sequences the exploration and remediation phases.
pub struct RemediationOrchestrator {
    agent: AgentLoop,
    structured: bool,
}

impl RemediationOrchestrator {
    /// Create an orchestrator producing markdown plans.
    pub fn new(llm_client: Arc<dyn LlmProvider>, tools: ToolRegistry, config: AgentConfig) -> Self {
        Self {
            agent: AgentLoop::new(llm_client, tools, config),
            structured: false,
        }
    }

    /// Request a JSON plan in phase 2 and render it deterministically.
    pub fn with_structured_output(mut self, structured: bool) -> Self {
        self.structured = structured;
        self
    }

    /// Produce a remediation document for `trace`.
    ///
    /// # Errors
    ///
    /// Any LLM failure in either phase; no partial document is returned.
    pub async fn remediate(
        &self,
        trace: &StackTrace,
        ctx: &CodebaseContext,
        reporter: &dyn ProgressReporter,
    ) -> Result<RemediationOutcome, OrchestratorError> {
        if trace.is_low_confidence() {
            tracing::warn!(
                exception_type = %trace.exception_type,
                "Trace has no frames; the agent will have to search for the failure"
            );
        }

        reporter.report(&ProgressEvent::PhaseStarted {
            phase: EXPLORATION_PHASE,
        });
        let exploration = self
            .agent
            .run(
                REMEDIATION_SYSTEM_PROMPT,
                &[],
                &build_exploration_prompt(trace),
                ctx,
                reporter,
            )
            .await?;
        reporter.report(&ProgressEvent::PhaseFinished {
            phase: EXPLORATION_PHASE,
            tool_calls: exploration.tool_calls,
        });

        let instruction = if self.structured {
            STRUCTURED_REMEDIATION_PROMPT
        } else {
            REMEDIATION_PROMPT
        };

        reporter.report(&ProgressEvent::PhaseStarted {
            phase: REMEDIATION_PHASE,
        });
        let remediation = self
            .agent
            .run(
                REMEDIATION_SYSTEM_PROMPT,
                &exploration.messages,
                instruction,
                ctx,
                reporter,
            )
            .await?;
        reporter.report(&ProgressEvent::PhaseFinished {
            phase: REMEDIATION_PHASE,
            tool_calls: remediation.tool_calls,
        });

        let generated_at = Utc::now();
        let (markdown, plan) = if self.structured {
            match decode_plan(&remediation.final_text) {
                Ok(draft) => {
                    let plan = RemediationPlan::from_draft(draft, trace.clone(), generated_at);
                    (plan.render_markdown(), Some(plan))
                }
                Err(reason) => {
                    tracing::warn!(
                        error = %reason,
                        "Structured plan could not be decoded, returning the raw reply"
                    );
                    (remediation.final_text.clone(), None)
                }
            }
        } else {
            (remediation.final_text.clone(), None)
        };

        let tool_calls = exploration.tool_calls + remediation.tool_calls;
        tracing::info!(
            tool_calls,
            steps = exploration.steps + remediation.steps,
            structured = plan.is_some(),
            "Remediation complete"
        );

        Ok(RemediationOutcome {
            markdown,
            analysis: exploration.final_text,
            plan,
            tool_calls,
            model: self.agent.config().model.clone(),
            generated_at,
        })
    }
}

/// Extract and decode the JSON plan from a phase-2 reply.
fn decode_plan(reply: &str) -> Result<PlanDraft, String> {
    let json = extract_json_object(reply).map_err(|e| e.to_string())?;
    serde_json::from_str(&json).map_err(|e| format!("Invalid plan JSON: {}", e))
}
