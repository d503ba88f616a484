//! Command-line front end: option parsing and the check pipeline.
//!
//! Flags are read by hand. Each flag accepts both `--flag value` and
//! `--flag=value`; `--jobs` and `--output-format` fall back to the
//! `SEPCHECK_JOBS` and `SEPCHECK_OUTPUT_FORMAT` environment variables.

use std::str::FromStr;
use std::sync::Arc;

use colored::Colorize;
use sepcheck_analysis::{CheckerConfig, LoadError, load_program};

use crate::json_output::{self, JsonVerificationReport};
use crate::output::{self, FunctionResult};
use crate::parallel::{self, TimedReport};

/// Every procedure verified.
pub const EXIT_VERIFIED: i32 = 0;
/// At least one procedure failed.
pub const EXIT_FAILED: i32 = 1;
/// Usage, I/O or load error.
pub const EXIT_ERROR: i32 = 2;

/// Flags that consume the following argument as their value.
const VALUE_FLAGS: [&str; 3] = ["--jobs", "--output-format", "--max-paths"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Path of the program document.
    pub input: Option<String>,
    pub jobs: usize,
    pub output_format: OutputFormat,
    pub max_paths: Option<usize>,
    pub verbose: bool,
    /// Report only the first failing postcondition per path.
    pub first_failure: bool,
}

impl Options {
    pub fn checker_config(&self) -> CheckerConfig {
        let config =
            CheckerConfig::default().with_stop_at_first_postcondition(self.first_failure);
        match self.max_paths {
            Some(limit) => config.with_max_paths(limit),
            None => config,
        }
    }
}

/// Parse options from arguments, consulting `env` for fallbacks.
pub fn parse_options(args: &[String], env: impl Fn(&str) -> Option<String>) -> Options {
    let jobs = flag_value(args, "--jobs")
        .or_else(|| env("SEPCHECK_JOBS"))
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or_else(parallel::default_jobs);

    let output_format = flag_value(args, "--output-format")
        .or_else(|| env("SEPCHECK_OUTPUT_FORMAT"))
        .map(|v| {
            v.parse().unwrap_or_else(|e: String| {
                tracing::warn!(error = %e, "Falling back to text output");
                OutputFormat::Text
            })
        })
        .unwrap_or(OutputFormat::Text);

    Options {
        input: positional(args),
        jobs,
        output_format,
        max_paths: flag_value(args, "--max-paths").and_then(|v| v.parse().ok()),
        verbose: args.iter().any(|a| a == "--verbose" || a == "-v"),
        first_failure: args.iter().any(|a| a == "--first-failure"),
    }
}

/// Value of `--flag value` or `--flag=value`.
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    for (i, arg) in args.iter().enumerate() {
        if arg == flag
            && let Some(val) = args.get(i + 1)
        {
            return Some(val.clone());
        }
        if let Some(val) = arg.strip_prefix(flag).and_then(|rest| rest.strip_prefix('=')) {
            return Some(val.to_string());
        }
    }
    None
}

/// First argument that is neither a flag nor a flag's value.
fn positional(args: &[String]) -> Option<String> {
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        if !arg.starts_with('-') {
            return Some(arg.clone());
        }
    }
    None
}

fn print_usage() {
    eprintln!("Usage: sepcheck [OPTIONS] PROGRAM.json");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --jobs N                  Worker threads (default: half the cores)");
    eprintln!("  --output-format FORMAT    text (default) or json");
    eprintln!("  --max-paths N             Paths explored per procedure (default: 256)");
    eprintln!("  --first-failure           Stop at the first failing postcondition");
    eprintln!("  -v, --verbose             Show every failure and timing");
    eprintln!("  -h, --help                Print this help");
    eprintln!("  -V, --version             Print version");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  SEPCHECK_JOBS, SEPCHECK_OUTPUT_FORMAT   Defaults for the flags above");
    eprintln!("  SEPCHECK_LOG                            Log filter (default: warn)");
}

/// Load `source` and check every procedure in it.
pub fn check_source(source: &str, options: &Options) -> Result<Vec<TimedReport>, LoadError> {
    let program = Arc::new(load_program(source)?);
    let tasks = parallel::tasks_for(&program);
    Ok(parallel::check_tasks_parallel(
        &tasks,
        &options.checker_config(),
        options.jobs,
    ))
}

pub fn exit_code(reports: &[TimedReport]) -> i32 {
    if reports.iter().all(|r| r.report.verdict.is_verified()) {
        EXIT_VERIFIED
    } else {
        EXIT_FAILED
    }
}

/// Run the checker with command-line arguments (program name excluded).
pub fn run(args: &[String]) -> i32 {
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return EXIT_VERIFIED;
    }
    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!(
            "sepcheck {}",
            option_env!("CARGO_PKG_VERSION").unwrap_or("0.1.0")
        );
        return EXIT_VERIFIED;
    }

    let options = parse_options(args, |key| std::env::var(key).ok());
    let Some(path) = options.input.clone() else {
        eprintln!("{} no program file given", "error:".red().bold());
        print_usage();
        return EXIT_ERROR;
    };

    let source = match std::fs::read_to_string(&path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{} could not read {path}: {e}", "error:".red().bold());
            return EXIT_ERROR;
        }
    };

    if options.output_format == OutputFormat::Text {
        output::print_header(&path);
    }

    let reports = match check_source(&source, &options) {
        Ok(reports) => reports,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            return EXIT_ERROR;
        }
    };

    match options.output_format {
        OutputFormat::Text => {
            let results: Vec<FunctionResult> = reports.iter().map(FunctionResult::from).collect();
            output::print_verification_results(&results, options.verbose);
        }
        OutputFormat::Json => {
            json_output::print_json_report(&JsonVerificationReport::from_reports(&path, &reports));
        }
    }
    exit_code(&reports)
}
