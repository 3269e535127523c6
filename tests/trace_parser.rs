//! Integration tests for stack-trace parsing.

use tracemend::trace::{self, strip_ansi, UNKNOWN_EXCEPTION_MESSAGE, UNKNOWN_EXCEPTION_TYPE};

const DIVISION_TRACE: &str = r#"Traceback (most recent call last):
  File "/app/main.py", line 12, in <module>
    result = divide(10, 0)
  File "/app/calc.py", line 4, in divide
    return a / b
ZeroDivisionError: division by zero
"#;

const CHAINED_TRACE: &str = r#"Traceback (most recent call last):
  File "/app/config.py", line 8, in load
    return settings["db"]
KeyError: 'db'

During handling of the above exception, another exception occurred:

Traceback (most recent call last):
  File "/app/main.py", line 3, in <module>
    start()
  File "/app/server.py", line 21, in start
    config = load()
  File "/app/config.py", line 10, in load
    raise RuntimeError("database settings missing")
RuntimeError: database settings missing
"#;

#[test]
fn test_single_traceback() {
    let parsed = trace::parse(DIVISION_TRACE);

    assert_eq!(parsed.exception_type, "ZeroDivisionError");
    assert_eq!(parsed.exception_message, "division by zero");
    assert_eq!(parsed.frames.len(), 2);

    assert_eq!(parsed.frames[0].file_path, "/app/main.py");
    assert_eq!(parsed.frames[0].line_number, 12);
    assert_eq!(parsed.frames[0].function_name, "<module>");
    assert_eq!(
        parsed.frames[0].code_context.as_deref(),
        Some("result = divide(10, 0)")
    );

    assert_eq!(parsed.frames[1].file_path, "/app/calc.py");
    assert_eq!(parsed.frames[1].line_number, 4);
    assert_eq!(parsed.frames[1].function_name, "divide");
    assert_eq!(parsed.raw_text, DIVISION_TRACE);
    assert!(!parsed.is_low_confidence());
}

#[test]
fn test_chained_exception_uses_final_segment() {
    let parsed = trace::parse(CHAINED_TRACE);

    assert_eq!(parsed.exception_type, "RuntimeError");
    assert_eq!(parsed.exception_message, "database settings missing");
    assert_eq!(parsed.frames.len(), 3);
    assert_eq!(parsed.frames[2].function_name, "load");
    assert_eq!(parsed.frames[2].line_number, 10);
    assert_eq!(parsed.raw_text, CHAINED_TRACE);
}

#[test]
fn test_ansi_colored_trace_parses_the_same() {
    let colored = DIVISION_TRACE
        .replace("ZeroDivisionError", "\x1b[1;31mZeroDivisionError\x1b[0m")
        .replace("/app/calc.py", "\x1b[35m/app/calc.py\x1b[0m");

    let plain = trace::parse(DIVISION_TRACE);
    let from_stripped = trace::parse(&strip_ansi(&colored));
    let from_colored = trace::parse(&colored);

    for parsed in [&from_stripped, &from_colored] {
        assert_eq!(parsed.exception_type, plain.exception_type);
        assert_eq!(parsed.exception_message, plain.exception_message);
        assert_eq!(parsed.frames, plain.frames);
    }
}

#[test]
fn test_degrades_without_panicking() {
    let empty = trace::parse("");
    assert_eq!(empty.exception_type, UNKNOWN_EXCEPTION_TYPE);
    assert_eq!(empty.exception_message, UNKNOWN_EXCEPTION_MESSAGE);
    assert!(empty.frames.is_empty());
    assert!(empty.is_low_confidence());

    let prose = trace::parse("the server fell over again, no idea why");
    assert_eq!(prose.exception_type, UNKNOWN_EXCEPTION_TYPE);
    assert!(prose.frames.is_empty());
}

#[test]
fn test_header_without_frames() {
    let parsed = trace::parse("ValueError: invalid literal for int() with base 10: 'x'");
    assert_eq!(parsed.exception_type, "ValueError");
    assert_eq!(
        parsed.exception_message,
        "invalid literal for int() with base 10: 'x'"
    );
    assert!(parsed.is_low_confidence());
}

#[test]
fn test_windows_line_endings() {
    let parsed = trace::parse(&DIVISION_TRACE.replace('\n', "\r\n"));
    assert_eq!(parsed.exception_type, "ZeroDivisionError");
    assert_eq!(parsed.frames.len(), 2);
    assert_eq!(parsed.frames[1].code_context.as_deref(), Some("return a / b"));
}

#[test]
fn test_trace_serializes_for_display() {
    let parsed = trace::parse(DIVISION_TRACE);
    let json = serde_json::to_value(&parsed).unwrap();
    assert_eq!(json["exception_type"], "ZeroDivisionError");
    assert_eq!(json["frames"][1]["line_number"], 4);
    assert_eq!(json["frames"][1]["function_name"], "divide");
}
