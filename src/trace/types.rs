//! Structured stack-trace types produced by the parser.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// One call-site entry in a stack trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// File path exactly as reported (absolute, relative, or synthetic like `<string>`).
    pub file_path: String,
    /// Line number reported for the frame.
    pub line_number: u32,
    /// Function or scope name (`<module>` for top-level code).
    pub function_name: String,
    /// Source line printed under the frame, if any.
    pub code_context: Option<String>,
}

impl StackFrame {
    /// Create a frame without code context.
    pub fn new(
        file_path: impl Into<String>,
        line_number: u32,
        function_name: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            line_number,
            function_name: function_name.into(),
            code_context: None,
        }
    }

    /// Attach the source line printed under the frame.
    pub fn with_code_context(mut self, code: impl Into<String>) -> Self {
        self.code_context = Some(code.into());
        self
    }

    /// `path:line` location string.
    pub fn location(&self) -> String {
        format!("{}:{}", self.file_path, self.line_number)
    }
}

/// A parsed stack trace.
///
/// Frames keep the order in which they appear in the source text, which for
/// conventionally printed tracebacks is outermost call first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackTrace {
    /// Exception class name, possibly dotted (`requests.exceptions.HTTPError`).
    pub exception_type: String,
    /// Exception message; may span several lines.
    pub exception_message: String,
    /// Frames in source order.
    pub frames: Vec<StackFrame>,
    /// The input text, verbatim (before ANSI stripping).
    pub raw_text: String,
}

impl StackTrace {
    /// A trace without frames cannot point at any code.
    pub fn is_low_confidence(&self) -> bool {
        self.frames.is_empty()
    }

    /// The frame closest to where the exception was raised.
    pub fn innermost_frame(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    /// Compact text rendering used in prompts and logs.
    pub fn summary(&self) -> String {
        let mut out = format!("{}: {}\n", self.exception_type, self.exception_message);
        if self.frames.is_empty() {
            out.push_str("No stack frames could be extracted.\n");
            return out;
        }

        out.push_str("Frames (outermost call first):\n");
        for (i, frame) in self.frames.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {}. {} in {}",
                i + 1,
                frame.location(),
                frame.function_name
            );
            if let Some(code) = &frame.code_context {
                let _ = writeln!(out, "       {}", code);
            }
        }
        out
    }
}
