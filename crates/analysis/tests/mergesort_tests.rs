//! Integration tests over the mergesort fixture: `split` and `merge` as
//! logical functions with nested patterns, and the list procedures that
//! implement them cell by cell.

use sepcheck_analysis::{
    CheckError, CheckerConfig, FunctionReport, Program, StepLocation, check_procedure,
    load_program,
};

fn program() -> Program {
    load_program(include_str!("fixtures/mergesort.json")).expect("fixture loads")
}

fn check(name: &str) -> FunctionReport {
    let program = program();
    let procedure = program.procedure(name).expect("procedure exists");
    check_procedure(&program, procedure, &CheckerConfig::default())
}

#[test]
fn split_evaluates_through_nested_patterns() {
    let report = check("split_three");
    assert!(report.verdict.is_verified(), "{:?}", report.verdict);
}

#[test]
fn split_needs_every_level_unfolded() {
    let failures = check("split_three_without_inner_unfold")
        .verdict
        .failures()
        .to_vec();
    assert_eq!(failures.len(), 1, "{failures:?}");
    assert_eq!(failures[0].location, StepLocation::Exit);
    assert!(matches!(
        failures[0].error,
        CheckError::PostconditionUnmet { .. }
    ));
}

#[test]
fn split_procedure_matches_split_function() {
    let report = check("split");
    assert!(report.verdict.is_verified(), "{:?}", report.verdict);
    assert_eq!(report.paths, 3);
}

#[test]
fn merge_verifies_on_all_four_branches() {
    let report = check("merge");
    assert!(report.verdict.is_verified(), "{:?}", report.verdict);
    assert_eq!(report.paths, 4);
}

#[test]
fn merge_with_swapped_links_fails_postcondition() {
    let report = check("merge_swapped_links");
    let failures = report.verdict.failures();
    assert!(!failures.is_empty());
    for failure in failures {
        assert_eq!(failure.location, StepLocation::Exit);
        assert!(
            matches!(failure.error, CheckError::PostconditionUnmet { .. }),
            "{failure}"
        );
    }
}
