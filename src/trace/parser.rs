//! Stack-trace text parser.
//!
//! Recovers the exception type, message and call frames from a raw traceback.
//! Input may carry ANSI colors, Windows line endings, chained exceptions or
//! arbitrary noise; the parser never fails and degrades to sentinel values
//! instead.

use regex::Regex;
use std::sync::OnceLock;

use super::types::{StackFrame, StackTrace};

/// Exception type used when no header line could be found.
pub const UNKNOWN_EXCEPTION_TYPE: &str = "Unknown";

/// Exception message used when no header line could be found.
pub const UNKNOWN_EXCEPTION_MESSAGE: &str = "Could not parse exception message";

/// Function name used for frames printed without an `in <name>` suffix.
pub const UNKNOWN_FUNCTION: &str = "<unknown>";

fn ansi_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").expect("ANSI regex is valid"))
}

fn chain_boundary_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:During handling of the above exception|The above exception was the direct cause of the following exception)[^\n]*\n(?:[ \t]*\n)*[ \t]*Traceback",
        )
        .expect("chain boundary regex is valid")
    })
}

fn strict_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^([A-Za-z0-9_.]*(?:Error|Exception|Warning)):[ \t]*(.*)$")
            .expect("strict header regex is valid")
    })
}

fn loose_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^([A-Za-z_][A-Za-z0-9_.]*):[ \t]*(.*)$")
            .expect("loose header regex is valid")
    })
}

fn frame_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^[ \t]*File "([^"]+)", line (\d+)(?:, in (.+))?$"#)
            .expect("frame regex is valid")
    })
}

fn underline_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[ \t]*[\^~][\^~ \t]*$").expect("underline regex is valid"))
}

/// `[Previous line repeated N more times]` rows of recursive traces.
fn repeat_notice_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[ \t]*\[Previous line repeated \d+ more times?\][ \t]*$")
            .expect("repeat notice regex is valid")
    })
}

/// Remove ANSI color sequences from `text`.
///
/// Stripping repeats until nothing matches, so the result never contains a
/// sequence that was assembled from the pieces of two removed ones.
pub fn strip_ansi(text: &str) -> String {
    let re = ansi_regex();
    let mut current = text.to_string();
    while re.is_match(&current) {
        current = re.replace_all(&current, "").into_owned();
    }
    current
}

/// Parse raw traceback text into a [`StackTrace`].
///
/// Only the most recent exception of a chain is kept. Missing headers and
/// missing frames are logged at warn level and never reported as errors.
pub fn parse(raw_text: &str) -> StackTrace {
    let cleaned = strip_ansi(raw_text).replace("\r\n", "\n");
    let segment = retain_last_segment(&cleaned);

    let (exception_type, exception_message) = match extract_header(&segment) {
        Some(header) => header,
        None => {
            tracing::warn!("No exception header found in stack trace");
            (
                UNKNOWN_EXCEPTION_TYPE.to_string(),
                UNKNOWN_EXCEPTION_MESSAGE.to_string(),
            )
        }
    };

    let frames = extract_frames(&segment);
    if frames.is_empty() {
        tracing::warn!(
            exception_type = %exception_type,
            "No stack frames found; trace is low-confidence"
        );
    } else {
        tracing::debug!(
            exception_type = %exception_type,
            frames = frames.len(),
            "Parsed stack trace"
        );
    }

    StackTrace {
        exception_type,
        exception_message,
        frames,
        raw_text: raw_text.to_string(),
    }
}

/// Keep only the last traceback of an exception chain.
fn retain_last_segment(text: &str) -> String {
    let segments: Vec<&str> = chain_boundary_regex().split(text).collect();
    let last = segments.last().copied().unwrap_or(text);

    if segments.len() > 1 && !last.starts_with("Traceback") {
        format!("Traceback{}", last)
    } else {
        last.to_string()
    }
}

fn extract_header(segment: &str) -> Option<(String, String)> {
    let caps = strict_header_regex()
        .captures(segment)
        .or_else(|| loose_header_regex().captures(segment))?;

    let exception_type = caps.get(1)?.as_str().to_string();
    let message_start = caps.get(2)?.start();
    let rest = &segment[message_start..];
    let message_end = frame_regex()
        .find(rest)
        .map(|m| m.start())
        .unwrap_or(rest.len());

    Some((exception_type, rest[..message_end].trim().to_string()))
}

fn extract_frames(segment: &str) -> Vec<StackFrame> {
    let lines: Vec<&str> = segment.lines().collect();
    let mut frames = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let Some(caps) = frame_regex().captures(lines[i]) else {
            i += 1;
            continue;
        };
        i += 1;

        let file_path = caps[1].to_string();
        let function_name = caps
            .get(3)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| UNKNOWN_FUNCTION.to_string());

        let mut context = Vec::new();
        while i < lines.len() && is_context_line(lines[i]) {
            let line = lines[i];
            if !underline_regex().is_match(line) && !repeat_notice_regex().is_match(line) {
                context.push(line.trim());
            }
            i += 1;
        }

        let line_number = match caps[2].parse::<u32>() {
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(file = %file_path, error = %e, "Skipping frame with invalid line number");
                continue;
            }
        };

        frames.push(StackFrame {
            file_path,
            line_number,
            function_name,
            code_context: if context.is_empty() {
                None
            } else {
                Some(context.join(" "))
            },
        });
    }

    frames
}

/// Indented, non-blank lines that are not themselves a frame marker.
fn is_context_line(line: &str) -> bool {
    line.starts_with([' ', '\t']) && !line.trim().is_empty() && !frame_regex().is_match(line)
}
