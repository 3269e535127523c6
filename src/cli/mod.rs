//! Command-line interface for tracemend.
//!
//! Provides the `analyze` command, which produces a remediation plan, and the
//! `parse` command, which only inspects a stack trace.

mod commands;

pub use commands::{
    parse_cli, run, run_with_cli, AnalyzeArgs, Cli, CliError, Commands, ParseArgs, TraceSource,
    TraceSourceArgs,
};
