//! End-to-end tests of the check pipeline over the analysis fixtures.

use sepcheck::cli::{self, EXIT_ERROR, EXIT_FAILED, EXIT_VERIFIED, Options, OutputFormat};
use sepcheck::json_output::JsonVerificationReport;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fixture_path(name: &str) -> String {
    format!(
        "{}/../analysis/tests/fixtures/{name}",
        env!("CARGO_MANIFEST_DIR")
    )
}

fn options(jobs: usize) -> Options {
    Options {
        input: None,
        jobs,
        output_format: OutputFormat::Text,
        max_paths: None,
        verbose: false,
        first_failure: false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn parallel_and_sequential_runs_agree() {
    let source = include_str!("../../analysis/tests/fixtures/tree.json");
    let sequential = cli::check_source(source, &options(1)).unwrap();
    let parallel = cli::check_source(source, &options(4)).unwrap();
    assert_eq!(sequential.len(), parallel.len());
    for (a, b) in sequential.iter().zip(&parallel) {
        assert_eq!(a.report, b.report);
    }
}

#[test]
fn mixed_fixture_exits_with_failure() {
    let source = include_str!("../../analysis/tests/fixtures/int_list.json");
    let reports = cli::check_source(source, &options(2)).unwrap();
    assert_eq!(cli::exit_code(&reports), EXIT_FAILED);

    let report = JsonVerificationReport::from_reports("int_list.json", &reports);
    assert_eq!(report.summary.total, reports.len());
    assert!(report.summary.ok > 0);
    assert!(report.summary.fail > 0);
    let leak = report
        .functions
        .iter()
        .find(|f| f.name == "drop_list")
        .unwrap();
    assert_eq!(leak.failures[0].kind, "leaked_ownership");
    assert_eq!(leak.failures[0].location, "exit");
}

#[test]
fn verified_subset_exits_cleanly() {
    let source = r#"{
        "structs": [{ "name": "cell", "fields": ["v"] }],
        "procedures": [{
            "name": "alloc_and_free",
            "body": [
                { "op": "alloc", "dest": "c", "layout": "cell" },
                { "op": "write", "ptr": "c", "field": "v", "value": "1" },
                { "op": "dispose", "ptr": "c" }
            ]
        }]
    }"#;
    let reports = cli::check_source(source, &options(1)).unwrap();
    assert_eq!(cli::exit_code(&reports), EXIT_VERIFIED);
}

#[test]
fn run_reports_exit_codes() {
    let args = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    assert_eq!(
        cli::run(&args(&["--output-format", "json", &fixture_path("int_list.json")])),
        EXIT_FAILED
    );
    assert_eq!(
        cli::run(&args(&["--jobs=2", &fixture_path("seq.json")])),
        EXIT_FAILED
    );
    assert_eq!(cli::run(&args(&["missing.json"])), EXIT_ERROR);
}

#[test]
fn load_errors_are_reported() {
    assert!(cli::check_source("{ not json", &options(1)).is_err());
    let unknown_layout = r#"{
        "procedures": [{ "name": "p", "body": [{ "op": "alloc", "dest": "c", "layout": "nope" }] }]
    }"#;
    assert!(cli::check_source(unknown_layout, &options(1)).is_err());
}
