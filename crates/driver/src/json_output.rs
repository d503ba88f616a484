/// Structured JSON output for check results.
///
/// Produced with `--output-format json` for editor and CI integration.
use serde::{Deserialize, Serialize};

use crate::parallel::TimedReport;

/// Complete report in JSON format.
#[derive(Serialize, Deserialize)]
pub struct JsonVerificationReport {
    pub program: String,
    pub functions: Vec<JsonFunctionResult>,
    pub summary: JsonSummary,
}

/// Per-procedure result in JSON format.
#[derive(Serialize, Deserialize)]
pub struct JsonFunctionResult {
    pub name: String,
    /// "ok" or "fail"
    pub status: String,
    pub paths: usize,
    pub duration_ms: u64,
    pub failures: Vec<JsonFailure>,
}

/// A single failed obligation in JSON format.
#[derive(Serialize, Deserialize)]
pub struct JsonFailure {
    /// "incomplete_ownership", "postcondition_unmet", etc.
    pub kind: String,
    /// `entry`, `exit` or a step path such as `body[2].then[0]`
    pub location: String,
    pub message: String,
}

/// Summary of all results.
#[derive(Serialize, Deserialize)]
pub struct JsonSummary {
    pub total: usize,
    pub ok: usize,
    pub fail: usize,
}

impl JsonVerificationReport {
    pub fn from_reports(program: &str, reports: &[TimedReport]) -> Self {
        let functions: Vec<JsonFunctionResult> = reports
            .iter()
            .map(|timed| {
                let report = &timed.report;
                JsonFunctionResult {
                    name: report.function.clone(),
                    status: if report.verdict.is_verified() { "ok" } else { "fail" }.to_string(),
                    paths: report.paths,
                    duration_ms: timed.duration_ms,
                    failures: report
                        .verdict
                        .failures()
                        .iter()
                        .map(|f| JsonFailure {
                            kind: f.error.kind().to_string(),
                            location: f.location.to_string(),
                            message: f.error.to_string(),
                        })
                        .collect(),
                }
            })
            .collect();
        let ok = functions.iter().filter(|f| f.status == "ok").count();
        let summary = JsonSummary {
            total: functions.len(),
            ok,
            fail: functions.len() - ok,
        };
        JsonVerificationReport {
            program: program.to_string(),
            functions,
            summary,
        }
    }
}

/// Print a JSON report to stdout.
///
/// JSON goes to stdout only; progress and logs stay on stderr.
pub fn print_json_report(report: &JsonVerificationReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("[sepcheck] Error serializing JSON report: {}", e);
        }
    }
}
