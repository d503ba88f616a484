//! Performance benchmarks for loading and checking programs.
//!
//! Benchmark groups:
//! - `load_*`: JSON parsing and definition validation only
//! - `check_*`: symbolic execution of loaded programs

use criterion::{Criterion, criterion_group, criterion_main};
use sepcheck_analysis::{CheckerConfig, check_program, load_program};
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Program constructors
// ---------------------------------------------------------------------------

fn int_list_header() -> Value {
    json!({
        "structs": [{ "name": "int_list", "fields": ["head", "tail"] }],
        "predicates": [{
            "name": "IntList",
            "param": "p",
            "output": "integer",
            "null_case": "0",
            "node": {
                "cell": "H",
                "layout": "int_list",
                "takes": ["take T = IntList(H.tail)"],
                "output": "T + 1"
            }
        }]
    })
}

/// One procedure that allocates and packs `cells` list cells.
fn make_long_list(cells: usize) -> String {
    let mut body = vec![json!({ "op": "pack", "predicate": "IntList", "ptr": "NULL" })];
    let mut prev = "NULL".to_string();
    for i in 0..cells {
        let cell = format!("c{i}");
        body.push(json!({ "op": "alloc", "dest": cell, "layout": "int_list" }));
        body.push(json!({ "op": "write", "ptr": cell, "field": "head", "value": i.to_string() }));
        body.push(json!({ "op": "write", "ptr": cell, "field": "tail", "value": prev }));
        body.push(json!({ "op": "pack", "predicate": "IntList", "ptr": cell }));
        prev = cell;
    }
    body.push(json!({ "op": "return", "value": prev }));

    let mut program = int_list_header();
    program["procedures"] = json!([{
        "name": "build",
        "ensures": ["take L = IntList(return)", format!("L == {cells}")],
        "body": body
    }]);
    program.to_string()
}

/// `branches` sequential null tests on distinct lists; each branch is
/// feasible, so the path count doubles per test.
fn make_branching(branches: usize) -> String {
    let params: Vec<Value> = (0..branches).map(|i| json!({ "name": format!("x{i}") })).collect();
    let requires: Vec<String> = (0..branches)
        .map(|i| format!("take L{i} = IntList(x{i})"))
        .collect();
    let ensures: Vec<String> = (0..branches)
        .map(|i| format!("take M{i} = IntList(x{i})"))
        .collect();
    let body: Vec<Value> = (0..branches)
        .map(|i| {
            json!({
                "op": "if",
                "condition": format!("x{i} == NULL"),
                "then": [{ "op": "let", "dest": format!("y{i}"), "value": "0" }],
                "else": [{ "op": "let", "dest": format!("y{i}"), "value": "1" }]
            })
        })
        .collect();

    let mut program = int_list_header();
    program["procedures"] = json!([{
        "name": "branches",
        "params": params,
        "requires": requires,
        "ensures": ensures,
        "body": body
    }]);
    program.to_string()
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_load_long_list(c: &mut Criterion) {
    let source = make_long_list(50);
    c.bench_function("load_long_list_50", |b| {
        b.iter(|| load_program(&source));
    });
}

fn bench_check_long_list(c: &mut Criterion) {
    let config = CheckerConfig::default();
    for cells in [10, 50] {
        let program = match load_program(&make_long_list(cells)) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Benchmark program failed to load, skipping: {e}");
                return;
            }
        };
        c.bench_function(&format!("check_long_list_{cells}"), |b| {
            b.iter(|| check_program(&program, &config));
        });
    }
}

fn bench_check_branching(c: &mut Criterion) {
    let config = CheckerConfig::default().with_max_paths(1024);
    let program = match load_program(&make_branching(8)) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Benchmark program failed to load, skipping: {e}");
            return;
        }
    };
    c.bench_function("check_branching_8", |b| {
        b.iter(|| check_program(&program, &config));
    });
}

// ---------------------------------------------------------------------------
// Criterion groups and main
// ---------------------------------------------------------------------------

criterion_group!(load, bench_load_long_list);

criterion_group!(check, bench_check_long_list, bench_check_branching);

criterion_main!(load, check);
