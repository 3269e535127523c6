//! Remediation orchestration and the plan output model.

pub mod orchestrator;
pub mod plan;

pub use orchestrator::{
    OrchestratorError, RemediationOrchestrator, RemediationOutcome, EXPLORATION_PHASE,
    REMEDIATION_PHASE,
};
pub use plan::{CodeSnippet, PlanDraft, ProposedFix, RemediationPlan};
