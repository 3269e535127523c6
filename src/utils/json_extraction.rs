//! JSON extraction from LLM replies.
//!
//! Models asked for "a JSON object only" still wrap it in code fences or
//! surround it with prose. Extraction tries, in order:
//! 1. A ```json fenced block
//! 2. Any fenced block containing an object
//! 3. The reply itself when it starts with `{`
//! 4. The largest valid object anywhere in the reply (later wins on ties)
//!
//! Every candidate is validated with `serde_json` before it is returned.
//!
//! # Example
//!
//! ```
//! use tracemend::utils::json_extraction::extract_json_object;
//!
//! let reply = "Here is the plan:\n```json\n{\"summary\": \"ok\"}\n```";
//! assert_eq!(extract_json_object(reply).unwrap(), "{\"summary\": \"ok\"}");
//! ```

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Characters of the reply quoted in `NotFound` errors.
const PREVIEW_CHARS: usize = 60;

/// Error type for JSON extraction failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum JsonExtractionError {
    #[error("JSON appears truncated: {unclosed_braces} unclosed braces, {unclosed_brackets} unclosed brackets")]
    Truncated {
        unclosed_braces: usize,
        unclosed_brackets: usize,
    },
    #[error("No JSON object found in response. Content starts with: '{content_preview}'")]
    NotFound { content_preview: String },
}

fn json_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```json[ \t]*\r?\n?([\s\S]*?)```").expect("valid regex"))
}

fn any_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```[A-Za-z0-9_-]*[ \t]*\r?\n?([\s\S]*?)```").expect("valid regex"))
}

/// Extract the JSON object a reply carries.
///
/// # Errors
///
/// `Truncated` when an object starts but never closes, `NotFound` when the
/// reply holds no valid object at all.
pub fn extract_json_object(content: &str) -> Result<String, JsonExtractionError> {
    let trimmed = content.trim();

    for fence in [json_fence(), any_fence()] {
        for caps in fence.captures_iter(trimmed) {
            if let Some(json) = caps.get(1).and_then(|m| object_at_start(m.as_str().trim())) {
                return Ok(json);
            }
        }
    }

    if let Some(json) = object_at_start(trimmed) {
        return Ok(json);
    }

    if let Some(json) = largest_valid_object(trimmed) {
        return Ok(json);
    }

    let analysis = analyze_json_structure(trimmed);
    if analysis.json_start.is_some()
        && (analysis.unclosed_braces > 0 || analysis.unclosed_brackets > 0 || analysis.in_string)
    {
        return Err(JsonExtractionError::Truncated {
            unclosed_braces: analysis.unclosed_braces,
            unclosed_brackets: analysis.unclosed_brackets,
        });
    }

    Err(JsonExtractionError::NotFound {
        content_preview: trimmed.chars().take(PREVIEW_CHARS).collect(),
    })
}

/// The valid object beginning at the first `{` of `s`, if `s` starts with one.
fn object_at_start(s: &str) -> Option<String> {
    if !s.starts_with('{') {
        return None;
    }
    let end = find_matching_brace(s)?;
    let candidate = &s[..=end];
    is_valid_json(candidate).then(|| candidate.to_string())
}

/// Largest valid object in `content`, preferring later ones of equal size.
///
/// Handles replies that reason in prose (possibly quoting small JSON
/// fragments) before the real answer.
fn largest_valid_object(content: &str) -> Option<String> {
    content
        .char_indices()
        .filter(|&(_, c)| c == '{')
        .filter_map(|(start, _)| {
            let rest = &content[start..];
            let end = find_matching_brace(rest)?;
            let candidate = &rest[..=end];
            is_valid_json(candidate).then_some((start, candidate))
        })
        .max_by(|(pos_a, a), (pos_b, b)| a.len().cmp(&b.len()).then(pos_a.cmp(pos_b)))
        .map(|(_, json)| json.to_string())
}

fn is_valid_json(candidate: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(candidate).is_ok()
}

/// Index of the `}` closing the object that `s` starts with.
///
/// Braces inside string literals (including escaped quotes) are ignored.
pub fn find_matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Brace/bracket balance of a string.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonStructureAnalysis {
    pub unclosed_braces: usize,
    pub unclosed_brackets: usize,
    /// Whether the scan ended inside a string literal.
    pub in_string: bool,
    /// Byte offset of the first `{` or `[`.
    pub json_start: Option<usize>,
}

/// Scan `s` and report unbalanced braces and brackets.
pub fn analyze_json_structure(s: &str) -> JsonStructureAnalysis {
    let mut brace_depth: isize = 0;
    let mut bracket_depth: isize = 0;
    let mut in_string = false;
    let mut escape_next = false;
    let mut json_start = None;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => {
                json_start.get_or_insert(i);
                if c == '{' {
                    brace_depth += 1;
                } else {
                    bracket_depth += 1;
                }
            }
            '}' if !in_string => brace_depth -= 1,
            ']' if !in_string => bracket_depth -= 1,
            _ => {}
        }
    }

    JsonStructureAnalysis {
        unclosed_braces: brace_depth.max(0) as usize,
        unclosed_brackets: bracket_depth.max(0) as usize,
        in_string,
        json_start,
    }
}
