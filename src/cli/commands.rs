//! CLI command definitions for tracemend.
//!
//! `analyze` runs the full remediation flow against a project directory;
//! `parse` only runs the stack-trace parser and prints what it extracted.

use clap::{Args, Parser};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::agent::{AgentConfig, TracingReporter};
use crate::codebase::CodebaseContext;
use crate::config::{ConfigError, Settings};
use crate::error::CodebaseError;
use crate::llm::{resolve_model, OpenRouterProvider};
use crate::remediation::RemediationOrchestrator;
use crate::tools::ToolRegistry;
use crate::trace::{self, StackTrace};

/// Default path of the generated plan.
const DEFAULT_OUTPUT_FILE: &str = "remediation.md";

/// Turn a Python stack trace into a remediation plan for your codebase.
#[derive(Parser)]
#[command(name = "tracemend")]
#[command(about = "Analyze a Python stack trace against a codebase and propose fixes")]
#[command(version)]
#[command(
    long_about = "tracemend parses a Python stack trace, lets an LLM agent explore the project with read-only tools, and writes a markdown remediation plan.\n\nExample usage:\n  tracemend analyze --trace-file error.log --project ./my-app --output plan.md"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Explore the project and write a remediation plan for a stack trace.
    Analyze(AnalyzeArgs),

    /// Parse a stack trace and print the extracted frames as JSON.
    Parse(ParseArgs),
}

/// Where the stack trace comes from. Exactly one option must be given.
#[derive(Args, Debug, Clone, Default)]
pub struct TraceSourceArgs {
    /// Stack trace text.
    #[arg(long)]
    pub trace: Option<String>,

    /// File containing the stack trace.
    #[arg(long)]
    pub trace_file: Option<PathBuf>,

    /// Read the stack trace from standard input.
    #[arg(long)]
    pub stdin: bool,
}

/// Arguments for `tracemend analyze`.
#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub source: TraceSourceArgs,

    /// Root directory of the project the trace came from.
    #[arg(short, long, default_value = ".")]
    pub project: PathBuf,

    /// Where to write the remediation plan.
    #[arg(short, long, default_value = DEFAULT_OUTPUT_FILE)]
    pub output: PathBuf,

    /// Also print the plan to standard output.
    #[arg(long)]
    pub stdout: bool,

    /// Do not write the output file (implies --stdout).
    #[arg(long)]
    pub no_file: bool,

    /// Model to use (overrides TRACEMEND_MODEL; default: best available).
    #[arg(short, long)]
    pub model: Option<String>,

    /// Ask for a JSON plan and render it with a fixed layout.
    #[arg(long)]
    pub structured: bool,

    /// Step budget per phase (overrides TRACEMEND_MAX_STEPS).
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Attempts per tool call (overrides TRACEMEND_TOOL_RETRIES).
    #[arg(long)]
    pub tool_retries: Option<u32>,
}

/// Arguments for `tracemend parse`.
#[derive(Parser, Debug)]
pub struct ParseArgs {
    #[command(flatten)]
    pub source: TraceSourceArgs,
}

/// Input errors reported before any processing starts.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("No stack trace given; use one of --trace, --trace-file or --stdin")]
    MissingTraceSource,

    #[error("Only one of --trace, --trace-file or --stdin may be given (got {0})")]
    MultipleTraceSources(usize),

    #[error("Failed to read stack trace from {path}: {source}")]
    TraceFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read stack trace from stdin: {0}")]
    Stdin(#[source] std::io::Error),

    #[error("Stack trace is empty")]
    EmptyTrace,

    #[error("Invalid project directory: {0}")]
    Project(#[source] CodebaseError),
}

/// A validated trace source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceSource {
    Inline(String),
    File(PathBuf),
    Stdin,
}

impl TraceSourceArgs {
    /// Check that exactly one source was given.
    pub fn resolve(&self) -> Result<TraceSource, CliError> {
        let given = usize::from(self.trace.is_some())
            + usize::from(self.trace_file.is_some())
            + usize::from(self.stdin);
        match given {
            0 => Err(CliError::MissingTraceSource),
            1 => Ok(if let Some(text) = &self.trace {
                TraceSource::Inline(text.clone())
            } else if let Some(path) = &self.trace_file {
                TraceSource::File(path.clone())
            } else {
                TraceSource::Stdin
            }),
            n => Err(CliError::MultipleTraceSources(n)),
        }
    }
}

impl TraceSource {
    /// Read the trace text. Blank input is rejected.
    pub fn read(&self) -> Result<String, CliError> {
        let text = match self {
            TraceSource::Inline(text) => text.clone(),
            TraceSource::File(path) => {
                fs::read_to_string(path).map_err(|source| CliError::TraceFile {
                    path: path.clone(),
                    source,
                })?
            }
            TraceSource::Stdin => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .map_err(CliError::Stdin)?;
                buf
            }
        };

        if text.trim().is_empty() {
            return Err(CliError::EmptyTrace);
        }
        Ok(text)
    }
}

impl AnalyzeArgs {
    /// Whether the plan goes to standard output.
    pub fn prints_to_stdout(&self) -> bool {
        self.stdout || self.no_file
    }

    /// Apply command-line overrides on top of environment settings.
    pub fn apply_overrides(&self, mut settings: Settings) -> anyhow::Result<Settings> {
        if let Some(model) = &self.model {
            settings = settings.with_model(model.clone());
        }
        if let Some(max_steps) = self.max_steps {
            settings = settings.with_max_steps(max_steps);
        }
        if let Some(retries) = self.tool_retries {
            settings = settings.with_tool_retries(retries);
        }
        settings.validate()?;
        Ok(settings)
    }
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows the caller to access global options like log_level before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Analyze(args) => run_analyze_command(args).await,
        Commands::Parse(args) => run_parse_command(args),
    }
}

async fn run_analyze_command(args: AnalyzeArgs) -> anyhow::Result<()> {
    let (settings, ctx, raw_trace) = prepare_analyze(&args, Settings::from_env)?;

    let trace = trace::parse(&raw_trace);
    info!(
        exception_type = %trace.exception_type,
        frames = trace.frames.len(),
        project = %ctx.root().display(),
        "Parsed stack trace"
    );

    let provider = OpenRouterProvider::new(&settings.api_key, &settings.api_base, "")?;
    let model = resolve_model(settings.model.as_deref(), &provider).await;
    info!(model = %model, "Using model");
    let provider = provider.with_default_model(model.clone());

    let config = AgentConfig::new()
        .with_model(model)
        .with_max_steps(settings.max_steps)
        .with_temperature(settings.temperature);
    let tools = ToolRegistry::with_codebase_tools().with_max_attempts(settings.tool_retries);
    let orchestrator = RemediationOrchestrator::new(Arc::new(provider), tools, config)
        .with_structured_output(args.structured);

    let outcome = orchestrator
        .remediate(&trace, &ctx, &TracingReporter)
        .await?;

    if !args.no_file {
        write_plan(&args.output, &outcome.markdown)?;
        info!(path = %args.output.display(), "Remediation plan written");
    }
    if args.prints_to_stdout() {
        println!("{}", outcome.markdown);
    }
    if args.structured && outcome.plan.is_none() {
        warn!("The model did not return a structured plan; the raw reply was used");
    }

    Ok(())
}

/// Validate every input of `analyze` before any work starts.
///
/// Credentials are checked first and the trace is read last, so a missing key
/// fails before stdin is consumed.
fn prepare_analyze<F>(
    args: &AnalyzeArgs,
    load_settings: F,
) -> anyhow::Result<(Settings, CodebaseContext, String)>
where
    F: FnOnce() -> Result<Settings, ConfigError>,
{
    let source = args.source.resolve()?;
    let settings = args.apply_overrides(load_settings()?)?;
    let ctx = CodebaseContext::new(&args.project).map_err(CliError::Project)?;
    let raw_trace = source.read()?;
    Ok((settings, ctx, raw_trace))
}

fn run_parse_command(args: ParseArgs) -> anyhow::Result<()> {
    let raw_trace = args.source.resolve()?.read()?;
    let trace = parse_for_display(&raw_trace);
    println!("{}", serde_json::to_string_pretty(&trace)?);
    Ok(())
}

fn parse_for_display(raw: &str) -> StackTrace {
    let trace = trace::parse(raw);
    if trace.is_low_confidence() {
        warn!("No stack frames found in the input");
    }
    trace
}

fn write_plan(path: &Path, markdown: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, markdown)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))
}
