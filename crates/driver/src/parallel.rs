//! Parallel checking using Rayon.
//!
//! Implements per-procedure parallelism: procedures are checked
//! simultaneously, each path of one procedure sequentially. Procedures share
//! the immutable program behind an `Arc`; a failure in one never affects
//! another.

use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

use sepcheck_analysis::error::DefinitionError;
use sepcheck_analysis::{
    CheckError, Checker, CheckerConfig, Failure, FunctionReport, Program, StepLocation, Verdict,
};

/// A procedure checking task.
#[derive(Clone)]
pub struct CheckTask {
    /// Procedure name
    pub name: String,
    /// Shared program
    pub program: Arc<Program>,
}

/// Result of checking a single procedure.
#[derive(Debug, Clone)]
pub struct TimedReport {
    pub report: FunctionReport,
    /// Checking duration in milliseconds
    pub duration_ms: u64,
}

/// One task per procedure, in definition order.
pub fn tasks_for(program: &Arc<Program>) -> Vec<CheckTask> {
    program
        .procedures()
        .iter()
        .map(|procedure| CheckTask {
            name: procedure.name.clone(),
            program: Arc::clone(program),
        })
        .collect()
}

/// Default worker count: half the available cores, at least one.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| (n.get() / 2).max(1))
        .unwrap_or(1)
}

/// Check tasks in parallel on a pool of `jobs` threads.
///
/// Results come back in task order.
pub fn check_tasks_parallel(
    tasks: &[CheckTask],
    config: &CheckerConfig,
    jobs: usize,
) -> Vec<TimedReport> {
    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(error = %e, "Could not build thread pool; checking sequentially");
            return tasks.iter().map(|task| check_single(task, config)).collect();
        }
    };

    tracing::info!(tasks = tasks.len(), jobs, "Checking procedures");
    pool.install(|| {
        tasks
            .par_iter()
            .map(|task| check_single(task, config))
            .collect()
    })
}

fn check_single(task: &CheckTask, config: &CheckerConfig) -> TimedReport {
    tracing::debug!(procedure = %task.name, "Checking");
    let start = Instant::now();
    let report = match task.program.procedure(&task.name) {
        Some(procedure) => Checker::new(&task.program, config).check(procedure),
        None => FunctionReport {
            function: task.name.clone(),
            verdict: Verdict::Failed(vec![Failure {
                function: task.name.clone(),
                location: StepLocation::Entry,
                error: CheckError::Definition(DefinitionError::UnknownFunction(
                    task.name.clone(),
                )),
            }]),
            paths: 0,
        },
    };
    TimedReport {
        report,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sepcheck_analysis::load_program;

    const PROGRAM: &str = r#"{
        "procedures": [
            { "name": "good", "params": [{ "name": "n", "sort": "integer" }],
              "requires": ["n > 0"], "ensures": ["n >= 1"] },
            { "name": "bad", "params": [{ "name": "n", "sort": "integer" }],
              "ensures": ["n >= 1"] }
        ]
    }"#;

    fn program() -> Arc<Program> {
        Arc::new(load_program(PROGRAM).unwrap())
    }

    #[test]
    fn test_tasks_follow_definition_order() {
        let tasks = tasks_for(&program());
        let names: Vec<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["good", "bad"]);
    }

    #[test]
    fn test_parallel_results_keep_task_order() {
        let tasks = tasks_for(&program());
        let results = check_tasks_parallel(&tasks, &CheckerConfig::default(), 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].report.function, "good");
        assert!(results[0].report.verdict.is_verified());
        assert_eq!(results[1].report.function, "bad");
        assert!(!results[1].report.verdict.is_verified());
    }

    #[test]
    fn test_unknown_task_is_a_failure() {
        let task = CheckTask {
            name: "missing".to_string(),
            program: program(),
        };
        let results = check_tasks_parallel(&[task], &CheckerConfig::default(), 1);
        assert_eq!(
            results[0].report.verdict.failures()[0].error,
            CheckError::Definition(DefinitionError::UnknownFunction("missing".to_string()))
        );
    }

    #[test]
    fn test_default_jobs_positive() {
        assert!(default_jobs() >= 1);
    }
}
