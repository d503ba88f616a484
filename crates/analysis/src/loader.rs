//! JSON program documents.
//!
//! A document lists definitions and procedures; annotation expressions are
//! strings in Rust expression syntax, parsed with [`crate::spec_parser`].
//!
//! ```json
//! {
//!   "structs": [{ "name": "int_list", "fields": ["head", "tail"] }],
//!   "predicates": [{
//!     "name": "IntList", "param": "p", "output": "integer", "null_case": "0",
//!     "node": { "cell": "H", "layout": "int_list",
//!               "takes": ["take T = IntList(H.tail)"], "output": "T + 1" }
//!   }],
//!   "procedures": [{
//!     "name": "id", "params": [{ "name": "xs" }],
//!     "requires": ["take L = IntList(xs)"],
//!     "ensures": ["take L2 = IntList(xs)", "L2 == L"],
//!     "body": []
//!   }]
//! }
//! ```

use serde::Deserialize;
use sepcheck_logic::{Sort, Term};

use crate::error::{DefinitionError, LoadError};
use crate::ir::{
    Clause, Contract, DatatypeDef, LemmaDef, LogicFunction, NodeCase, PredicateDef,
    PredicateTake, Procedure, Resource, Step, StructDef, VariantDef,
};
use crate::program::{Program, ProgramBuilder};
use crate::spec_parser::{parse_clause, parse_sort, parse_term};

#[derive(Debug, Deserialize)]
struct RawProgram {
    #[serde(default)]
    structs: Vec<RawStruct>,
    #[serde(default)]
    datatypes: Vec<RawDatatype>,
    #[serde(default)]
    functions: Vec<RawFunction>,
    #[serde(default)]
    predicates: Vec<RawPredicate>,
    #[serde(default)]
    lemmas: Vec<RawLemma>,
    #[serde(default)]
    procedures: Vec<RawProcedure>,
}

#[derive(Debug, Deserialize)]
struct RawStruct {
    name: String,
    fields: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawDatatype {
    name: String,
    variants: Vec<RawVariant>,
}

#[derive(Debug, Deserialize)]
struct RawVariant {
    name: String,
    #[serde(default)]
    fields: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawParam {
    name: String,
    #[serde(default = "default_sort")]
    sort: String,
}

fn default_sort() -> String {
    "pointer".to_string()
}

#[derive(Debug, Deserialize)]
struct RawFunction {
    name: String,
    #[serde(default)]
    params: Vec<RawParam>,
    result: String,
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPredicate {
    name: String,
    param: String,
    output: String,
    null_case: String,
    node: RawNode,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    cell: String,
    layout: String,
    #[serde(default)]
    takes: Vec<String>,
    #[serde(default)]
    asserts: Vec<String>,
    output: String,
}

#[derive(Debug, Deserialize)]
struct RawLemma {
    name: String,
    #[serde(default)]
    params: Vec<RawParam>,
    #[serde(default)]
    requires: Vec<String>,
    #[serde(default)]
    ensures: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawProcedure {
    name: String,
    #[serde(default)]
    params: Vec<RawParam>,
    #[serde(default)]
    requires: Vec<String>,
    #[serde(default)]
    ensures: Vec<String>,
    #[serde(default)]
    body: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum RawStep {
    Let {
        dest: String,
        value: String,
    },
    Alloc {
        dest: String,
        layout: String,
    },
    Read {
        dest: String,
        ptr: String,
        field: String,
    },
    Write {
        ptr: String,
        field: String,
        value: String,
    },
    Dispose {
        ptr: String,
    },
    Unfold {
        predicate: String,
        ptr: String,
    },
    BaseCase {
        predicate: String,
        ptr: String,
    },
    Pack {
        predicate: String,
        ptr: String,
    },
    ApplyLemma {
        lemma: String,
        #[serde(default)]
        args: Vec<String>,
    },
    UnfoldFunction {
        function: String,
        #[serde(default)]
        args: Vec<String>,
    },
    Call {
        dest: Option<String>,
        function: String,
        #[serde(default)]
        args: Vec<String>,
    },
    Assert {
        condition: String,
    },
    If {
        condition: String,
        #[serde(default)]
        then: Vec<RawStep>,
        #[serde(default, rename = "else")]
        otherwise: Vec<RawStep>,
    },
    Return {
        value: Option<String>,
    },
    Hint {
        text: String,
    },
}

/// Load and validate a program document.
pub fn load_program(json: &str) -> Result<Program, LoadError> {
    let raw: RawProgram = serde_json::from_str(json)?;
    let mut builder = ProgramBuilder::new();

    for s in raw.structs {
        builder.define_struct(StructDef {
            name: s.name,
            fields: s.fields,
        })?;
    }
    for d in raw.datatypes {
        builder.define_datatype(DatatypeDef {
            name: d.name,
            variants: d
                .variants
                .into_iter()
                .map(|v| VariantDef {
                    name: v.name,
                    fields: v.fields,
                })
                .collect(),
        })?;
    }
    for f in raw.functions {
        builder.define_function(LogicFunction {
            name: f.name,
            params: convert_params(&f.params)?,
            result: parse_sort(&f.result)?,
            body: f.body.as_deref().map(parse_term).transpose()?,
        })?;
    }
    for p in raw.predicates {
        builder.define_predicate(convert_predicate(p)?)?;
    }
    for l in raw.lemmas {
        builder.define_lemma(LemmaDef {
            name: l.name,
            params: convert_params(&l.params)?,
            requires: convert_terms(&l.requires)?,
            ensures: convert_terms(&l.ensures)?,
        })?;
    }
    for p in raw.procedures {
        builder.define_procedure(Procedure {
            params: convert_params(&p.params)?,
            contract: Contract {
                requires: convert_clauses(&p.requires)?,
                ensures: convert_clauses(&p.ensures)?,
            },
            body: convert_steps(p.body)?,
            name: p.name,
        })?;
    }
    Ok(builder.build()?)
}

fn convert_params(params: &[RawParam]) -> Result<Vec<(String, Sort)>, DefinitionError> {
    params
        .iter()
        .map(|p| Ok((p.name.clone(), parse_sort(&p.sort)?)))
        .collect()
}

fn convert_terms(sources: &[String]) -> Result<Vec<Term>, DefinitionError> {
    sources.iter().map(|s| parse_term(s)).collect()
}

fn convert_clauses(sources: &[String]) -> Result<Vec<Clause>, DefinitionError> {
    sources.iter().map(|s| parse_clause(s)).collect()
}

fn convert_predicate(raw: RawPredicate) -> Result<PredicateDef, DefinitionError> {
    let takes = raw
        .node
        .takes
        .iter()
        .map(|src| match parse_clause(src)? {
            Clause::Take {
                binder,
                resource: Resource::Predicate { name, ptr },
            } => Ok(PredicateTake {
                binder,
                predicate: name,
                arg: ptr,
            }),
            _ => Err(DefinitionError::BadExpression {
                source: src.clone(),
                message: "expected `take NAME = Predicate(pointer)`".to_string(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PredicateDef {
        name: raw.name,
        param: raw.param,
        output_sort: parse_sort(&raw.output)?,
        null_case: parse_term(&raw.null_case)?,
        node: NodeCase {
            cell: raw.node.cell,
            layout: raw.node.layout,
            takes,
            asserts: convert_terms(&raw.node.asserts)?,
            output: parse_term(&raw.node.output)?,
        },
    })
}

fn convert_steps(steps: Vec<RawStep>) -> Result<Vec<Step>, DefinitionError> {
    steps.into_iter().map(convert_step).collect()
}

fn convert_step(step: RawStep) -> Result<Step, DefinitionError> {
    Ok(match step {
        RawStep::Let { dest, value } => Step::Let {
            dest,
            value: parse_term(&value)?,
        },
        RawStep::Alloc { dest, layout } => Step::Alloc { dest, layout },
        RawStep::Read { dest, ptr, field } => Step::Read {
            dest,
            ptr: parse_term(&ptr)?,
            field,
        },
        RawStep::Write { ptr, field, value } => Step::Write {
            ptr: parse_term(&ptr)?,
            field,
            value: parse_term(&value)?,
        },
        RawStep::Dispose { ptr } => Step::Dispose {
            ptr: parse_term(&ptr)?,
        },
        RawStep::Unfold { predicate, ptr } => Step::Unfold {
            predicate,
            ptr: parse_term(&ptr)?,
        },
        RawStep::BaseCase { predicate, ptr } => Step::BaseCase {
            predicate,
            ptr: parse_term(&ptr)?,
        },
        RawStep::Pack { predicate, ptr } => Step::Pack {
            predicate,
            ptr: parse_term(&ptr)?,
        },
        RawStep::ApplyLemma { lemma, args } => Step::ApplyLemma {
            lemma,
            args: convert_terms(&args)?,
        },
        RawStep::UnfoldFunction { function, args } => Step::UnfoldFunction {
            function,
            args: convert_terms(&args)?,
        },
        RawStep::Call {
            dest,
            function,
            args,
        } => Step::Call {
            dest,
            function,
            args: convert_terms(&args)?,
        },
        RawStep::Assert { condition } => Step::Assert {
            condition: parse_term(&condition)?,
        },
        RawStep::If {
            condition,
            then,
            otherwise,
        } => Step::If {
            condition: parse_term(&condition)?,
            then_branch: convert_steps(then)?,
            else_branch: convert_steps(otherwise)?,
        },
        RawStep::Return { value } => Step::Return {
            value: value.as_deref().map(parse_term).transpose()?,
        },
        RawStep::Hint { text } => Step::Hint { text },
    })
}
