//! Lemma application and logical-function unfolding.
//!
//! Both extend the fact database without touching the heap. Lemma
//! conclusions go to the trusted-axiom list, tagged with the lemma name;
//! lemma proofs are never re-checked.

use std::collections::HashMap;

use sepcheck_logic::Term;
use sepcheck_solver::Prover;

use crate::error::CheckError;
use crate::ir::{LemmaDef, LogicFunction};

/// Apply `lemma` to `args`.
///
/// Every `requires` clause must be provable before any conclusion is added.
pub fn apply_lemma(prover: &mut Prover, lemma: &LemmaDef, args: &[Term]) -> Result<(), CheckError> {
    let subst = bind_params(&lemma.name, &lemma.params, args)?;
    for requirement in &lemma.requires {
        let condition = requirement.substitute(&subst);
        if !prover.entails(&condition).is_proved() {
            tracing::debug!(lemma = %lemma.name, condition = %condition, "Lemma precondition unmet");
            return Err(CheckError::PreconditionUnmet {
                name: lemma.name.clone(),
                condition,
            });
        }
    }
    for conclusion in &lemma.ensures {
        prover.trust(&lemma.name, conclusion.substitute(&subst));
    }
    Ok(())
}

/// Add the one-level definitional equation `f(args) == body[params := args]`.
pub fn unfold_function(
    prover: &mut Prover,
    function: &LogicFunction,
    args: &[Term],
) -> Result<(), CheckError> {
    let subst = bind_params(&function.name, &function.params, args)?;
    let body = function
        .body
        .as_ref()
        .ok_or_else(|| CheckError::OpaqueFunction(function.name.clone()))?;
    prover.assume(Term::eq(
        Term::app(function.name.clone(), args.to_vec()),
        body.substitute(&subst),
    ));
    Ok(())
}

fn bind_params<S>(
    name: &str,
    params: &[(String, S)],
    args: &[Term],
) -> Result<HashMap<String, Term>, CheckError> {
    if params.len() != args.len() {
        return Err(CheckError::ArityMismatch {
            name: name.to_string(),
            expected: params.len(),
            found: args.len(),
        });
    }
    Ok(params
        .iter()
        .map(|(p, _)| p.clone())
        .zip(args.iter().cloned())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sepcheck_logic::Sort;

    /// `succ_nonneg(n)`: requires `0 <= n`, ensures `0 <= n + 1`.
    fn succ_nonneg() -> LemmaDef {
        LemmaDef {
            name: "succ_nonneg".to_string(),
            params: vec![("n".to_string(), Sort::Int)],
            requires: vec![Term::le(Term::int(0), Term::var("n"))],
            ensures: vec![Term::le(
                Term::int(0),
                Term::add(Term::var("n"), Term::int(1)),
            )],
        }
    }

    #[test]
    fn lemma_conclusions_are_trusted() {
        let mut prover = Prover::default();
        prover.assume(Term::le(Term::int(0), Term::var("k")));
        apply_lemma(&mut prover, &succ_nonneg(), &[Term::var("k")]).unwrap();
        assert_eq!(prover.facts().axioms().len(), 1);
        assert_eq!(prover.facts().axioms()[0].source, "succ_nonneg");
    }

    #[test]
    fn unmet_precondition_adds_nothing() {
        let mut prover = Prover::default();
        let before = prover.facts().len();
        let err = apply_lemma(&mut prover, &succ_nonneg(), &[Term::var("k")]).unwrap_err();
        assert!(matches!(err, CheckError::PreconditionUnmet { ref name, .. } if name == "succ_nonneg"));
        assert_eq!(prover.facts().len(), before);
    }

    #[test]
    fn lemma_arity_checked() {
        let mut prover = Prover::default();
        assert_eq!(
            apply_lemma(&mut prover, &succ_nonneg(), &[]),
            Err(CheckError::ArityMismatch {
                name: "succ_nonneg".to_string(),
                expected: 1,
                found: 0,
            })
        );
    }

    #[test]
    fn unfold_adds_definitional_equation() {
        let double = LogicFunction {
            name: "double".to_string(),
            params: vec![("x".to_string(), Sort::Int)],
            result: Sort::Int,
            body: Some(Term::add(Term::var("x"), Term::var("x"))),
        };
        let mut prover = Prover::default();
        unfold_function(&mut prover, &double, &[Term::int(4)]).unwrap();
        assert!(prover
            .entails(&Term::eq(
                Term::app("double", vec![Term::int(4)]),
                Term::int(8)
            ))
            .is_proved());
    }

    #[test]
    fn uninterpreted_functions_are_opaque() {
        let empty = LogicFunction {
            name: "empty".to_string(),
            params: vec![],
            result: Sort::Int,
            body: None,
        };
        let mut prover = Prover::default();
        assert_eq!(
            unfold_function(&mut prover, &empty, &[]),
            Err(CheckError::OpaqueFunction("empty".to_string()))
        );
    }
}
