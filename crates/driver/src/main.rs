//! sepcheck: check the ownership annotations of a program document.
//!
//! Usage:
//!   sepcheck [--jobs N] [--output-format text|json] [--max-paths N] [--verbose] PROGRAM.json
//!
//! Log verbosity is controlled by `SEPCHECK_LOG` (an `EnvFilter` directive,
//! default `warn`). Logs go to stderr so JSON reports on stdout stay clean.

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let filter =
        EnvFilter::try_from_env("SEPCHECK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let code = sepcheck::cli::run(&args);
    ExitCode::from(u8::try_from(code).unwrap_or(2))
}
