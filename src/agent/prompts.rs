//! Prompts for the remediation agent.
//!
//! The exploration phase lets the model investigate the codebase with tools;
//! the remediation phase turns what it found into a plan.

use crate::trace::StackTrace;

/// System prompt shared by both phases.
pub const REMEDIATION_SYSTEM_PROMPT: &str = r#"You are a senior Python engineer diagnosing a production error. You have read-only access to the project that raised it through tool calls.

## Available Tools

1. **read_file** - Read a file, optionally a line slice (0-based, end inclusive)
2. **list_directory** - List the entries of a directory
3. **find_in_files** - Regex search across project files, optionally filtered by a glob
4. **find_symbol_references** - Whole-word lookup of a function, class or variable name
5. **get_import_tree** - Imports declared by a Python file
6. **get_stack_frame_context** - Numbered source lines around a stack frame (1-based line)

## Guidelines

1. Start from the innermost frame that belongs to the project and work outwards.
2. Read the code before drawing conclusions. Do not guess at file contents.
3. Follow the data: find where the failing values are produced, not only where they are used.
4. Paths are relative to the project root. Frames pointing at the standard library or installed packages cannot be read; reason about them from the trace.
5. If a tool fails, read the error and adjust the call instead of repeating it.
6. Be efficient. Stop exploring once the cause is clear.
"#;

/// Build the phase-1 prompt carrying the trace.
pub fn build_exploration_prompt(trace: &StackTrace) -> String {
    let focus = match trace.innermost_frame() {
        Some(frame) => format!(
            "The error surfaced in `{}` at {}.",
            frame.function_name,
            frame.location()
        ),
        None => "No frames could be extracted; locate the failing code by searching for the exception message.".to_string(),
    };

    format!(
        r#"Investigate the following error in this project.

## Raw Stack Trace

```
{raw}
```

## Parsed Summary

{summary}
{focus}

Use the tools to inspect the relevant code. When you understand the root cause, reply with a concise analysis (no tool call) that names the failing code, explains why it fails, and lists the files and lines involved."#,
        raw = trace.raw_text.trim_end(),
        summary = trace.summary().trim_end(),
        focus = focus,
    )
}

/// Phase-2 instruction for a markdown plan.
pub const REMEDIATION_PROMPT: &str = r#"Based on your investigation, write a remediation plan in markdown with exactly these sections:

## Summary
One paragraph describing the error and its impact.

## Root Cause
What fails and why, referencing the specific files and lines you inspected.

## Specific Changes
Each change as: the file path, the lines affected, and the corrected code in a fenced code block, followed by a short explanation.

## Additional Context
Related risks, tests to add, and anything you could not verify.

Reply with the markdown document only."#;

/// Phase-2 instruction for a JSON plan.
pub const STRUCTURED_REMEDIATION_PROMPT: &str = r#"Based on your investigation, produce the remediation plan as a single JSON object with this shape:

```json
{
  "summary": "One paragraph describing the error and its impact",
  "root_cause": "What fails and why, referencing files and lines",
  "relevant_code": [
    {
      "file_path": "path/relative/to/project.py",
      "start_line": 10,
      "end_line": 20,
      "content": "the code as it is today",
      "rationale": "why this code matters"
    }
  ],
  "fixes": [
    {
      "file_path": "path/relative/to/project.py",
      "issue": "short name of the problem",
      "description": "what to change and why",
      "code": "the corrected code",
      "line_range": [10, 20]
    }
  ]
}
```

Line numbers are 1-based. `line_range` may be null when a fix is not tied to existing lines. Reply with the JSON object only."#;

/// Sent once, without tools, when the step budget is exhausted.
pub const STEP_LIMIT_PROMPT: &str = r#"You have reached the maximum number of tool calls allowed. Do not call any more tools. Using only what you have gathered so far, give your best analysis now, and say what you could not verify."#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace;

    #[test]
    fn test_system_prompt_lists_tools() {
        for tool in [
            "read_file",
            "list_directory",
            "find_in_files",
            "find_symbol_references",
            "get_import_tree",
            "get_stack_frame_context",
        ] {
            assert!(REMEDIATION_SYSTEM_PROMPT.contains(tool), "missing {}", tool);
        }
    }

    #[test]
    fn test_exploration_prompt_carries_trace() {
        let raw = "Traceback (most recent call last):\n  File \"main.py\", line 6, in divide\n    return a / b\nZeroDivisionError: division by zero\n";
        let parsed = trace::parse(raw);
        let prompt = build_exploration_prompt(&parsed);

        assert!(prompt.contains(raw.trim_end()));
        assert!(prompt.contains("ZeroDivisionError: division by zero"));
        assert!(prompt.contains("`divide` at main.py:6"));
    }

    #[test]
    fn test_exploration_prompt_without_frames() {
        let parsed = trace::parse("something went wrong");
        let prompt = build_exploration_prompt(&parsed);
        assert!(prompt.contains("No frames could be extracted"));
    }

    #[test]
    fn test_remediation_prompts() {
        for section in ["## Summary", "## Root Cause", "## Specific Changes", "## Additional Context"] {
            assert!(REMEDIATION_PROMPT.contains(section));
        }
        assert!(STRUCTURED_REMEDIATION_PROMPT.contains("\"relevant_code\""));
        assert!(STRUCTURED_REMEDIATION_PROMPT.contains("\"line_range\""));
        assert!(STEP_LIMIT_PROMPT.contains("maximum"));
    }
}
