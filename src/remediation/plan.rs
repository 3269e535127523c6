//! Structured remediation plan and its markdown rendering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

use crate::trace::StackTrace;

/// A code excerpt the plan relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSnippet {
    pub file_path: String,
    /// 1-based, inclusive.
    pub start_line: u32,
    /// 1-based, inclusive.
    pub end_line: u32,
    pub content: String,
    /// Why this code matters to the failure.
    #[serde(default)]
    pub rationale: String,
}

/// One suggested change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedFix {
    pub file_path: String,
    /// Short name of the problem being fixed.
    pub issue: String,
    pub description: String,
    /// Replacement code.
    #[serde(default)]
    pub code: String,
    /// Lines replaced, 1-based inclusive; `None` for additions.
    #[serde(default)]
    pub line_range: Option<(u32, u32)>,
}

/// The parts of a plan the model writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDraft {
    pub summary: String,
    pub root_cause: String,
    #[serde(default)]
    pub relevant_code: Vec<CodeSnippet>,
    #[serde(default)]
    pub fixes: Vec<ProposedFix>,
}

/// A complete remediation plan for one stack trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationPlan {
    pub summary: String,
    pub root_cause: String,
    /// The trace being remediated.
    pub trace: StackTrace,
    pub relevant_code: Vec<CodeSnippet>,
    pub fixes: Vec<ProposedFix>,
    pub generated_at: DateTime<Utc>,
}

impl RemediationPlan {
    /// Complete a model-written draft with the trace and a timestamp.
    pub fn from_draft(draft: PlanDraft, trace: StackTrace, generated_at: DateTime<Utc>) -> Self {
        Self {
            summary: draft.summary,
            root_cause: draft.root_cause,
            trace,
            relevant_code: draft.relevant_code,
            fixes: draft.fixes,
            generated_at,
        }
    }

    /// Render the plan as markdown.
    ///
    /// Sections always appear in the same order: Summary, Stack Trace,
    /// Relevant Code, Root Cause, Remediation Steps, then a footer.
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Remediation Plan: {}\n", self.trace.exception_type);

        let _ = writeln!(out, "## Summary\n\n{}\n", self.summary.trim());

        out.push_str("## Stack Trace\n\n");
        self.render_trace(&mut out);

        out.push_str("## Relevant Code\n\n");
        if self.relevant_code.is_empty() {
            out.push_str("_No code excerpts were identified._\n\n");
        }
        for snippet in &self.relevant_code {
            let _ = writeln!(
                out,
                "### `{}` (lines {}-{})\n",
                snippet.file_path, snippet.start_line, snippet.end_line
            );
            if !snippet.rationale.trim().is_empty() {
                let _ = writeln!(out, "{}\n", snippet.rationale.trim());
            }
            push_code_block(&mut out, &snippet.file_path, &snippet.content);
        }

        let _ = writeln!(out, "## Root Cause\n\n{}\n", self.root_cause.trim());

        out.push_str("## Remediation Steps\n\n");
        if self.fixes.is_empty() {
            out.push_str("_No changes were proposed._\n\n");
        }
        for (i, fix) in self.fixes.iter().enumerate() {
            let _ = writeln!(out, "### {}. {}\n", i + 1, fix.issue.trim());
            match fix.line_range {
                Some((start, end)) => {
                    let _ = writeln!(out, "**File:** `{}` (lines {}-{})\n", fix.file_path, start, end);
                }
                None => {
                    let _ = writeln!(out, "**File:** `{}`\n", fix.file_path);
                }
            }
            let _ = writeln!(out, "{}\n", fix.description.trim());
            if !fix.code.trim().is_empty() {
                push_code_block(&mut out, &fix.file_path, &fix.code);
            }
        }

        out.push_str("---\n\n");
        let _ = writeln!(
            out,
            "_Generated by tracemend on {}. Review each change and run the affected tests before applying it; suggestions have not been executed._",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        out
    }

    fn render_trace(&self, out: &mut String) {
        let _ = writeln!(
            out,
            "**{}**: {}\n",
            self.trace.exception_type,
            self.trace.exception_message.trim()
        );

        if self.trace.frames.is_empty() {
            out.push_str("_No stack frames could be extracted._\n\n");
            return;
        }
        for (i, frame) in self.trace.frames.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. `{}` in `{}`",
                i + 1,
                frame.location(),
                frame.function_name
            );
            if let Some(code) = &frame.code_context {
                let _ = writeln!(out, "   `{}`", code);
            }
        }
        out.push('\n');
    }
}

/// Fenced block long enough not to be closed by backticks inside `code`.
fn push_code_block(out: &mut String, file_path: &str, code: &str) {
    let longest_run = code
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run.max(2) + 1);

    let _ = writeln!(out, "{}{}", fence, fence_language(file_path));
    out.push_str(code.trim_end_matches('\n'));
    let _ = writeln!(out, "\n{}\n", fence);
}

fn fence_language(file_path: &str) -> &'static str {
    match Path::new(file_path).extension().and_then(|e| e.to_str()) {
        Some("py" | "pyi" | "pyw") => "python",
        Some("toml") => "toml",
        Some("json") => "json",
        Some("yaml" | "yml") => "yaml",
        Some("sh") => "bash",
        _ => "",
    }
}
