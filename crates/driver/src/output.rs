/// Colored checking output formatter.
///
/// Produces per-procedure results with color-coded status:
///   [OK]      procedure_name (green)
///   [FAIL]    procedure_name - first failure (red)
use colored::Colorize;

use crate::parallel::TimedReport;

/// Status of a procedure's check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    /// Every path verified
    Ok,
    /// At least one obligation failed
    Fail,
}

/// Result of checking a single procedure, ready for display.
#[derive(Debug, Clone)]
pub struct FunctionResult {
    pub name: String,
    pub status: VerificationStatus,
    /// One line per failure, `location: message`
    pub failures: Vec<String>,
    /// Number of paths explored
    pub paths: usize,
    pub duration_ms: Option<u64>,
}

impl From<&TimedReport> for FunctionResult {
    fn from(timed: &TimedReport) -> Self {
        let report = &timed.report;
        let status = if report.verdict.is_verified() {
            VerificationStatus::Ok
        } else {
            VerificationStatus::Fail
        };
        FunctionResult {
            name: report.function.clone(),
            status,
            failures: report
                .verdict
                .failures()
                .iter()
                .map(|f| format!("{}: {}", f.location, f.error))
                .collect(),
            paths: report.paths,
            duration_ms: Some(timed.duration_ms),
        }
    }
}

/// Print results with colored output.
///
/// Output format:
/// ```text
///   [OK]    length (2 paths)
///   [FAIL]  drop_list (exit: Ownership leaked at return: IntList(xs))
///
/// Summary: 1 OK, 1 FAIL
/// ```
///
/// In verbose mode every failure gets its own line, with per-procedure timing.
pub fn print_verification_results(results: &[FunctionResult], verbose: bool) {
    if results.is_empty() {
        eprintln!("{}", "No procedures found.".dimmed());
        return;
    }

    eprintln!();
    for result in results {
        match result.status {
            VerificationStatus::Ok => {
                let mut line = format!(
                    "  {}  {} ({} {})",
                    "[OK]".green().bold(),
                    result.name,
                    result.paths,
                    if result.paths == 1 { "path" } else { "paths" },
                );
                if verbose && let Some(duration) = result.duration_ms {
                    line.push_str(&format!(", {}ms", duration));
                }
                eprintln!("{}", line);
            }
            VerificationStatus::Fail => {
                let detail = result
                    .failures
                    .first()
                    .map(String::as_str)
                    .unwrap_or("check failed");
                let more = result.failures.len().saturating_sub(1);
                if verbose || more == 0 {
                    eprintln!("  {}  {} ({})", "[FAIL]".red().bold(), result.name, detail);
                } else {
                    eprintln!(
                        "  {}  {} ({}; {} more)",
                        "[FAIL]".red().bold(),
                        result.name,
                        detail,
                        more
                    );
                }
                if verbose {
                    for failure in result.failures.iter().skip(1) {
                        eprintln!("          {}", failure);
                    }
                }
            }
        }
    }

    let ok_count = results
        .iter()
        .filter(|r| r.status == VerificationStatus::Ok)
        .count();
    let fail_count = results.len() - ok_count;
    let total_ms: u64 = results.iter().filter_map(|r| r.duration_ms).sum();

    eprintln!();
    eprint!("Summary: ");
    let mut parts = Vec::new();
    if ok_count > 0 {
        parts.push(format!("{} {}", ok_count, "OK".green()));
    }
    if fail_count > 0 {
        parts.push(format!("{} {}", fail_count, "FAIL".red()));
    }
    let summary = parts.join(", ");
    if verbose && total_ms > 0 {
        eprintln!("{} (total: {}ms)", summary, total_ms);
    } else {
        eprintln!("{}", summary);
    }
    eprintln!();
}

/// Print a header for the run.
pub fn print_header(program_path: &str) {
    eprintln!("{}", format!("Checking {program_path}").bold());
}

#[cfg(test)]
mod tests {
    use super::*;
    use sepcheck_analysis::{CheckError, Failure, FunctionReport, StepLocation, Verdict};

    fn timed(verdict: Verdict, paths: usize) -> TimedReport {
        TimedReport {
            report: FunctionReport {
                function: "f".to_string(),
                verdict,
                paths,
            },
            duration_ms: 3,
        }
    }

    #[test]
    fn test_verified_report_is_ok() {
        let result = FunctionResult::from(&timed(Verdict::Verified, 2));
        assert_eq!(result.status, VerificationStatus::Ok);
        assert!(result.failures.is_empty());
        assert_eq!(result.paths, 2);
        assert_eq!(result.duration_ms, Some(3));
    }

    #[test]
    fn test_failures_render_location_and_message() {
        let failure = Failure {
            function: "f".to_string(),
            location: StepLocation::Exit,
            error: CheckError::LeakedOwnership {
                resource: "IntList(xs)".to_string(),
            },
        };
        let result = FunctionResult::from(&timed(Verdict::Failed(vec![failure]), 1));
        assert_eq!(result.status, VerificationStatus::Fail);
        assert_eq!(
            result.failures,
            vec!["exit: Ownership leaked at return: IntList(xs)".to_string()]
        );
    }

    #[test]
    fn test_print_verification_results_empty() {
        let results: Vec<FunctionResult> = vec![];
        print_verification_results(&results, false);
    }

    #[test]
    fn test_print_verification_results_mixed() {
        let results = vec![
            FunctionResult {
                name: "ok_proc".to_string(),
                status: VerificationStatus::Ok,
                failures: vec![],
                paths: 1,
                duration_ms: Some(4),
            },
            FunctionResult {
                name: "fail_proc".to_string(),
                status: VerificationStatus::Fail,
                failures: vec![
                    "body[0]: Pointer p is not owned".to_string(),
                    "exit: Postcondition not met: (n == 3)".to_string(),
                ],
                paths: 2,
                duration_ms: None,
            },
        ];
        print_verification_results(&results, false);
        print_verification_results(&results, true);
    }
}
