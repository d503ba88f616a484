//! # sepcheck-analysis
//!
//! Checks procedures annotated with separation-logic contracts over
//! recursive ownership predicates.
//!
//! - [`program`]: the immutable registries (structs, datatypes, logical
//!   functions, predicates, lemmas, procedure contracts)
//! - [`heap_model`] / [`ownership`]: the owned cells and folded instances
//!   of one path
//! - [`fold`]: one-level unfold / base case / pack
//! - [`lemma`]: lemma application and logical-function unfolding
//! - [`checker`]: symbolic execution `Entry → {Step}* → Exit`
//! - [`loader`]: JSON program documents
//!
//! ## Usage
//!
//! ```
//! use sepcheck_analysis::{CheckerConfig, check_program, load_program};
//!
//! let program = load_program(r#"{
//!     "procedures": [{ "name": "noop", "requires": ["n > 0"], "ensures": ["n >= 1"] }]
//! }"#).unwrap();
//! let reports = check_program(&program, &CheckerConfig::default());
//! assert!(reports[0].verdict.is_verified());
//! ```

pub mod checker;
pub mod config;
pub mod contract_db;
pub mod error;
pub mod fold;
pub mod function_db;
pub mod heap_model;
pub mod ir;
pub mod lemma;
pub mod lemma_db;
pub mod loader;
pub mod ownership;
pub mod predicate_db;
pub mod program;
pub mod spec_parser;
pub mod type_db;

pub use checker::{
    Block, Checker, Failure, FunctionReport, StepLocation, Verdict, check_procedure,
    check_program,
};
pub use config::CheckerConfig;
pub use error::{CheckError, DefinitionError, LoadError};
pub use loader::load_program;
pub use ownership::FoldState;
pub use program::{Program, ProgramBuilder};
