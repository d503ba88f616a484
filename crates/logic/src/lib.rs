//! # sepcheck-logic
//!
//! The term language shared by the prover and the verification-condition
//! checker: literals, pointers, arithmetic, datatype constructors, `match`
//! and logical-function application, plus a `Display` rendering in
//! annotation syntax.

pub mod formatter;
pub mod sort;
pub mod term;

pub use sort::Sort;
pub use term::{MatchArm, Pattern, Term};
