//! # sepcheck-solver
//!
//! Entailment checking for verification conditions.
//!
//! The [`Prover`] keeps the facts assumed along one symbolic-execution path
//! and answers whether a goal follows from them. It is a rewriting procedure
//! (oriented equalities, linear integer normal forms, constructor reasoning
//! and bounds) rather than a full SMT solver: `Proved` and `Refuted` are
//! sound, `Unknown` means the procedure gave up.
//!
//! ## Usage
//!
//! ```
//! use sepcheck_logic::Term;
//! use sepcheck_solver::Prover;
//!
//! let mut prover = Prover::default();
//! prover.assume(Term::eq(Term::var("n"), Term::add(Term::var("m"), Term::int(1))));
//! prover.assume(Term::eq(Term::var("m"), Term::int(2)));
//! assert!(prover.entails(&Term::eq(Term::var("n"), Term::int(3))).is_proved());
//! ```

pub mod config;
pub mod facts;
pub mod linear;
pub mod normalize;
pub mod result;
pub mod solver;

pub use config::ProverConfig;
pub use facts::{Axiom, FactDatabase};
pub use result::ProofResult;
pub use solver::Prover;
