//! Term normalization.
//!
//! Rewrites terms bottom-up to a canonical form:
//!
//! - Constant folding and boolean connective simplification
//! - Linear integer normal forms for arithmetic and comparisons
//!   (every comparison becomes `e <= 0`)
//! - Field projection out of constructors
//! - `if` and `match` on known conditions / constructor scrutinees
//! - Equality decomposition and constructor distinctness
//! - Oriented rewrite rules derived from the fact database
//!
//! Normalization repeats whole passes until a fixpoint or the round limit.

use std::collections::HashMap;

use sepcheck_logic::{Pattern, Term};

use crate::linear::LinearExpr;

/// Bottom-up rewriter parameterized by a rule set.
pub struct Normalizer<'a> {
    rules: &'a HashMap<Term, Term>,
    max_rounds: usize,
}

impl<'a> Normalizer<'a> {
    pub fn new(rules: &'a HashMap<Term, Term>, max_rounds: usize) -> Self {
        Self { rules, max_rounds }
    }

    /// Normalize a term to a fixpoint (bounded by the round limit).
    pub fn normalize(&self, term: &Term) -> Term {
        let mut current = term.clone();
        for _ in 0..self.max_rounds {
            let next = self.pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
        tracing::debug!(term = %term, "Normalization round limit reached");
        current
    }

    /// One bottom-up pass.
    fn pass(&self, term: &Term) -> Term {
        // Arm bodies are left alone until an arm is selected: pattern binders
        // must not be rewritten by facts about same-named variables.
        let rebuilt = match term {
            Term::Match(scrutinee, arms) => Term::Match(Box::new(self.pass(scrutinee)), arms.clone()),
            _ => term.map_children(|c| self.pass(c)),
        };
        let simplified = simplify_node(rebuilt);
        match self.rules.get(&simplified) {
            Some(rhs) => rhs.clone(),
            None => simplified,
        }
    }
}

/// Local simplification of a node whose children are already normalized.
pub fn simplify_node(term: Term) -> Term {
    match term {
        Term::Not(inner) => simplify_not(*inner),
        Term::And(parts) => simplify_and(parts),
        Term::Or(parts) => simplify_or(parts),
        Term::Implies(a, b) => simplify_or(vec![simplify_not(*a), *b]),
        Term::Eq(a, b) => simplify_eq(*a, *b),
        Term::Lt(a, b) => canonical_le(&a, &b, 1),
        Term::Le(a, b) => canonical_le(&a, &b, 0),
        Term::Gt(a, b) => canonical_le(&b, &a, 1),
        Term::Ge(a, b) => canonical_le(&b, &a, 0),
        t @ (Term::Add(..) | Term::Sub(..) | Term::Mul(..) | Term::Neg(_)) => {
            LinearExpr::from_term(&t).to_term()
        }
        Term::Ite(c, a, b) => match *c {
            Term::BoolLit(true) => *a,
            Term::BoolLit(false) => *b,
            _ if a == b => *a,
            c => Term::Ite(Box::new(c), a, b),
        },
        Term::Field(base, field) => {
            if let Term::Ctor { fields, .. } = base.as_ref()
                && let Some((_, value)) = fields.iter().find(|(n, _)| *n == field)
            {
                return value.clone();
            }
            Term::Field(base, field)
        }
        Term::Match(scrutinee, arms) => {
            for arm in &arms {
                match match_pattern(&arm.pattern, &scrutinee) {
                    PatternMatch::Matched(bindings) => return arm.body.substitute(&bindings),
                    PatternMatch::NoMatch => continue,
                    PatternMatch::Unknown => break,
                }
            }
            Term::Match(scrutinee, arms)
        }
        other => other,
    }
}

fn simplify_not(inner: Term) -> Term {
    match inner {
        Term::BoolLit(b) => Term::BoolLit(!b),
        Term::Not(x) => *x,
        Term::And(parts) => simplify_or(parts.into_iter().map(simplify_not).collect()),
        Term::Or(parts) => simplify_and(parts.into_iter().map(simplify_not).collect()),
        // !(e <= 0)  <=>  e >= 1  <=>  -e + 1 <= 0
        Term::Le(e, zero) if *zero == Term::IntLit(0) => {
            let negated = LinearExpr::from_term(&e)
                .scale(-1)
                .and_then(|n| n.plus(&LinearExpr::constant(1)));
            match negated {
                Some(negated) => le_zero(negated),
                None => Term::Not(Box::new(Term::Le(e, zero))),
            }
        }
        other => Term::Not(Box::new(other)),
    }
}

fn simplify_and(parts: Vec<Term>) -> Term {
    let mut out: Vec<Term> = Vec::new();
    for part in parts {
        let flattened = match part {
            Term::And(inner) => inner,
            other => vec![other],
        };
        for p in flattened {
            match p {
                Term::BoolLit(true) => {}
                Term::BoolLit(false) => return Term::BoolLit(false),
                p if out.contains(&p) => {}
                p => out.push(p),
            }
        }
    }
    if out
        .iter()
        .any(|p| out.contains(&simplify_not(p.clone())))
    {
        return Term::BoolLit(false);
    }
    Term::conjunction(out)
}

fn simplify_or(parts: Vec<Term>) -> Term {
    let mut out: Vec<Term> = Vec::new();
    for part in parts {
        let flattened = match part {
            Term::Or(inner) => inner,
            other => vec![other],
        };
        for p in flattened {
            match p {
                Term::BoolLit(false) => {}
                Term::BoolLit(true) => return Term::BoolLit(true),
                p if out.contains(&p) => {}
                p => out.push(p),
            }
        }
    }
    if out
        .iter()
        .any(|p| out.contains(&simplify_not(p.clone())))
    {
        return Term::BoolLit(true);
    }
    match out.len() {
        0 => Term::BoolLit(false),
        1 => out.remove(0),
        _ => Term::Or(out),
    }
}

/// Canonical `(lhs - rhs + offset) <= 0`, or `lhs < rhs` / `lhs <= rhs`
/// unchanged when the difference overflows.
fn canonical_le(lhs: &Term, rhs: &Term, offset: i128) -> Term {
    let diff = LinearExpr::from_term(lhs)
        .minus(&LinearExpr::from_term(rhs))
        .and_then(|d| d.plus(&LinearExpr::constant(offset)));
    match diff {
        Some(diff) => le_zero(diff),
        None if offset == 0 => Term::le(lhs.clone(), rhs.clone()),
        None => Term::lt(lhs.clone(), rhs.clone()),
    }
}

fn le_zero(expr: LinearExpr) -> Term {
    match expr.as_constant() {
        Some(c) => Term::BoolLit(c <= 0),
        None => Term::Le(Box::new(expr.to_term()), Box::new(Term::IntLit(0))),
    }
}

/// True if both terms are constructor-headed and can never be equal.
pub fn definitely_distinct(a: &Term, b: &Term) -> bool {
    match (a, b) {
        (Term::IntLit(x), Term::IntLit(y)) => x != y,
        (Term::BoolLit(x), Term::BoolLit(y)) => x != y,
        (Term::Loc(x), Term::Loc(y)) => x != y,
        (Term::Null, Term::Loc(_)) | (Term::Loc(_), Term::Null) => true,
        (Term::Ctor { name: n1, .. }, Term::Ctor { name: n2, .. }) => n1 != n2,
        _ => false,
    }
}

fn simplify_eq(a: Term, b: Term) -> Term {
    if a == b {
        return Term::BoolLit(true);
    }
    if definitely_distinct(&a, &b) {
        return Term::BoolLit(false);
    }
    match (a, b) {
        (Term::BoolLit(true), other) | (other, Term::BoolLit(true)) => other,
        (Term::BoolLit(false), other) | (other, Term::BoolLit(false)) => simplify_not(other),
        (Term::Ctor { fields: f1, .. }, Term::Ctor { fields: f2, .. }) => {
            // Same constructor: fieldwise equality over the fields both spell out.
            let mut parts = Vec::new();
            for (field, v1) in &f1 {
                if let Some((_, v2)) = f2.iter().find(|(n, _)| n == field) {
                    parts.push(simplify_eq(v1.clone(), v2.clone()));
                }
            }
            simplify_and(parts)
        }
        (a, b) if a.is_arithmetic() || b.is_arithmetic() => {
            let diff = LinearExpr::from_term(&a)
                .minus(&LinearExpr::from_term(&b))
                .and_then(|d| d.with_positive_lead());
            match diff {
                Some(diff) => match diff.as_constant() {
                    Some(c) => Term::BoolLit(c == 0),
                    None => Term::eq(diff.to_term(), Term::IntLit(0)),
                },
                None if a <= b => Term::eq(a, b),
                None => Term::eq(b, a),
            }
        }
        (a, b) if a <= b => Term::eq(a, b),
        (a, b) => Term::eq(b, a),
    }
}

/// Outcome of matching a pattern against a (normalized) scrutinee.
#[derive(Debug, PartialEq)]
pub enum PatternMatch {
    Matched(HashMap<String, Term>),
    NoMatch,
    /// The scrutinee is not known well enough to decide.
    Unknown,
}

pub fn match_pattern(pattern: &Pattern, scrutinee: &Term) -> PatternMatch {
    match pattern {
        Pattern::Wildcard => PatternMatch::Matched(HashMap::new()),
        Pattern::Bind(name) => {
            PatternMatch::Matched(HashMap::from([(name.clone(), scrutinee.clone())]))
        }
        Pattern::Ctor { name, fields } => match scrutinee {
            Term::Ctor {
                name: actual,
                fields: values,
            } => {
                if actual != name {
                    return PatternMatch::NoMatch;
                }
                let mut bindings = HashMap::new();
                for (field, sub) in fields {
                    let Some((_, value)) = values.iter().find(|(n, _)| n == field) else {
                        return PatternMatch::Unknown;
                    };
                    match match_pattern(sub, value) {
                        PatternMatch::Matched(b) => bindings.extend(b),
                        other => return other,
                    }
                }
                PatternMatch::Matched(bindings)
            }
            other if other.is_value() => PatternMatch::NoMatch,
            _ => PatternMatch::Unknown,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sepcheck_logic::MatchArm;

    fn norm(t: &Term) -> Term {
        let rules = HashMap::new();
        Normalizer::new(&rules, 32).normalize(t)
    }

    fn nil() -> Term {
        Term::ctor("Seq_Nil", vec![])
    }

    fn cons(h: Term, t: Term) -> Term {
        Term::ctor("Seq_Cons", vec![("head", h), ("tail", t)])
    }

    #[test]
    fn folds_arithmetic_comparisons() {
        let t = Term::lt(Term::add(Term::int(2), Term::int(1)), Term::int(4));
        assert_eq!(norm(&t), Term::BoolLit(true));
    }

    #[test]
    fn comparisons_become_le_zero() {
        let t = Term::lt(Term::var("x"), Term::var("y"));
        let expected = Term::Le(
            Box::new(LinearExpr::from_term(&Term::add(Term::sub(Term::var("x"), Term::var("y")), Term::int(1))).to_term()),
            Box::new(Term::IntLit(0)),
        );
        assert_eq!(norm(&t), expected);
    }

    #[test]
    fn negated_comparison_flips() {
        // !(x < 3)  ==  3 <= x
        let t = Term::not(Term::lt(Term::var("x"), Term::int(3)));
        assert_eq!(norm(&t), norm(&Term::le(Term::int(3), Term::var("x"))));
    }

    #[test]
    fn projects_constructor_fields() {
        let t = Term::field(cons(Term::int(1), nil()), "head");
        assert_eq!(norm(&t), Term::int(1));
    }

    #[test]
    fn distinct_constructors_are_unequal() {
        assert_eq!(norm(&Term::eq(nil(), cons(Term::var("h"), nil()))), Term::BoolLit(false));
        assert_eq!(norm(&Term::eq(Term::Null, Term::Loc(3))), Term::BoolLit(false));
    }

    #[test]
    fn same_constructor_equality_decomposes() {
        let t = Term::eq(cons(Term::var("a"), nil()), cons(Term::int(1), nil()));
        assert_eq!(norm(&t), norm(&Term::eq(Term::var("a"), Term::int(1))));
    }

    #[test]
    fn equality_is_orientation_independent() {
        let a = norm(&Term::eq(Term::var("p"), Term::var("q")));
        let b = norm(&Term::eq(Term::var("q"), Term::var("p")));
        assert_eq!(a, b);
        let c = norm(&Term::eq(Term::var("n"), Term::add(Term::var("m"), Term::int(1))));
        let d = norm(&Term::eq(Term::add(Term::var("m"), Term::int(1)), Term::var("n")));
        assert_eq!(c, d);
    }

    #[test]
    fn match_selects_constructor_arm() {
        let t = Term::Match(
            Box::new(cons(Term::int(5), nil())),
            vec![
                MatchArm {
                    pattern: Pattern::Ctor { name: "Seq_Nil".into(), fields: vec![] },
                    body: Term::int(0),
                },
                MatchArm {
                    pattern: Pattern::Ctor {
                        name: "Seq_Cons".into(),
                        fields: vec![("head".into(), Pattern::Bind("h".into()))],
                    },
                    body: Term::add(Term::var("h"), Term::int(1)),
                },
            ],
        );
        assert_eq!(norm(&t), Term::int(6));
    }

    #[test]
    fn match_on_unknown_scrutinee_is_stuck() {
        let t = Term::Match(
            Box::new(Term::var("xs")),
            vec![MatchArm {
                pattern: Pattern::Ctor { name: "Seq_Nil".into(), fields: vec![] },
                body: Term::int(0),
            }],
        );
        assert!(matches!(norm(&t), Term::Match(..)));
    }

    #[test]
    fn rules_rewrite_subterms() {
        let rules = HashMap::from([(Term::var("L"), Term::int(3))]);
        let n = Normalizer::new(&rules, 32);
        assert_eq!(n.normalize(&Term::eq(Term::var("L"), Term::int(3))), Term::BoolLit(true));
    }

    #[test]
    fn contradictory_conjunction_is_false() {
        let p = Term::var("b");
        assert_eq!(norm(&Term::And(vec![p.clone(), Term::not(p)])), Term::BoolLit(false));
    }
}
