//! Integration tests for the prover's public API.

use sepcheck_logic::Term;
use sepcheck_solver::{Prover, ProverConfig};

fn v(name: &str) -> Term {
    Term::var(name)
}

#[test]
fn trusted_facts_are_tagged_and_usable() {
    let mut p = Prover::default();
    p.trust("size_nonneg", Term::le(Term::int(0), Term::field(v("T"), "size")));
    assert_eq!(p.facts().axioms().len(), 1);
    assert_eq!(p.facts().axioms()[0].source, "size_nonneg");
    assert!(p.facts().facts().is_empty());
    assert!(p
        .entails(&Term::le(Term::int(0), Term::field(v("T"), "size")))
        .is_proved());
}

#[test]
fn cloned_provers_diverge_independently() {
    let mut base = Prover::default();
    base.assume(Term::le(Term::int(0), v("n")));

    let mut then_branch = base.clone();
    then_branch.assume(Term::eq(v("n"), Term::int(0)));
    let mut else_branch = base.clone();
    else_branch.assume(Term::ne(v("n"), Term::int(0)));

    assert!(then_branch.entails(&Term::eq(v("n"), Term::int(0))).is_proved());
    assert!(else_branch.entails(&Term::eq(v("n"), Term::int(0))).is_refuted());
    assert!(base.entails(&Term::eq(v("n"), Term::int(0))).is_unknown());
}

#[test]
fn assumptions_after_inconsistency_are_harmless() {
    let mut p = Prover::default();
    p.assume(Term::eq(v("p"), Term::Null));
    p.assume(Term::ne(v("p"), Term::Null));
    assert!(p.is_inconsistent());
    p.assume(Term::eq(v("q"), Term::int(1)));
    assert!(p.is_inconsistent());
    assert!(p.entails(&Term::eq(v("q"), Term::int(2))).is_proved());
}

#[test]
fn normalize_substitutes_known_values() {
    let mut p = Prover::new(ProverConfig::new().with_max_rounds(16));
    p.assume(Term::eq(v("T"), Term::int(2)));
    assert_eq!(p.normalize(&Term::add(v("T"), Term::int(1))), Term::int(3));
    assert_eq!(p.config().max_rounds, 16);
}

#[test]
fn overflowing_literals_are_not_conflated() {
    let p = Prover::default();
    let max_plus_one = Term::add(Term::int(i128::MAX), Term::int(1));
    let max_plus_two = Term::add(Term::int(i128::MAX), Term::int(2));
    assert!(!p.entails(&Term::eq(max_plus_one.clone(), max_plus_two.clone())).is_proved());
    assert!(!p.entails(&Term::eq(max_plus_one, Term::int(i128::MAX))).is_proved());

    let near_max = Term::add(Term::sub(Term::int(i128::MAX), Term::int(1)), Term::int(1));
    assert!(p.entails(&Term::eq(near_max, Term::int(i128::MAX))).is_proved());
}
