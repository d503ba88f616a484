//! The entailment prover.
//!
//! A small, incomplete but sound decision procedure over the fact database:
//!
//! - Equalities are oriented into rewrite rules (solved for a unit atom when
//!   linear, constructor-valued sides on the right otherwise)
//! - Other atomic facts become rules to `true` / `false`
//! - `e <= 0` facts are also kept as linear bounds; a pair of bounds summing
//!   to a positive constant makes the state inconsistent
//! - A goal is normalized under the rules and then decided structurally,
//!   falling back to a refutation probe on a cloned state
//!
//! An inconsistent state entails everything, which is how infeasible
//! branches are discharged.

use std::collections::{HashMap, VecDeque};

use sepcheck_logic::Term;

use crate::config::ProverConfig;
use crate::facts::FactDatabase;
use crate::linear::LinearExpr;
use crate::normalize::Normalizer;
use crate::result::ProofResult;

/// Rewriting prover over an append-only fact database.
///
/// Cloning is the path-forking operation: each branch gets its own copy.
#[derive(Debug, Clone)]
pub struct Prover {
    config: ProverConfig,
    facts: FactDatabase,
    rules: HashMap<Term, Term>,
    bounds: Vec<LinearExpr>,
    inconsistent: bool,
}

impl Default for Prover {
    fn default() -> Self {
        Self::new(ProverConfig::default())
    }
}

impl Prover {
    pub fn new(config: ProverConfig) -> Self {
        Self {
            config,
            facts: FactDatabase::new(),
            rules: HashMap::new(),
            bounds: Vec::new(),
            inconsistent: false,
        }
    }

    pub fn config(&self) -> &ProverConfig {
        &self.config
    }

    /// The facts assumed so far.
    pub fn facts(&self) -> &FactDatabase {
        &self.facts
    }

    /// True once the assumed facts are known to be contradictory.
    pub fn is_inconsistent(&self) -> bool {
        self.inconsistent
    }

    /// Add a checked fact.
    pub fn assume(&mut self, fact: Term) {
        tracing::debug!(fact = %fact, "Assume");
        self.facts.record(fact.clone());
        self.absorb(fact);
    }

    /// Add a fact admitted without proof (a lemma conclusion).
    pub fn trust(&mut self, source: &str, fact: Term) {
        tracing::debug!(lemma = source, fact = %fact, "Trust lemma conclusion");
        self.facts.record_axiom(source, fact.clone());
        self.absorb(fact);
    }

    /// Normalize a term under the current rewrite rules.
    pub fn normalize(&self, term: &Term) -> Term {
        Normalizer::new(&self.rules, self.config.max_rounds).normalize(term)
    }

    /// Decide whether the facts entail `goal`.
    pub fn entails(&self, goal: &Term) -> ProofResult {
        if self.inconsistent {
            return ProofResult::Proved;
        }
        let normalized = self.normalize(goal);
        let result = self.decide(&normalized);
        if !result.is_unknown() || !self.config.refutation_probe {
            return result;
        }

        let mut probe = self.clone();
        probe.absorb(Term::not(normalized.clone()));
        if probe.inconsistent {
            return ProofResult::Proved;
        }
        let mut probe = self.clone();
        probe.absorb(normalized);
        if probe.inconsistent {
            return ProofResult::Refuted;
        }
        tracing::debug!(goal = %goal, "Entailment unknown");
        ProofResult::Unknown
    }

    // ------------------------------------------------------------------
    // Fact absorption
    // ------------------------------------------------------------------

    fn absorb(&mut self, fact: Term) {
        let mut queue = VecDeque::from([fact]);
        let mut steps = 0usize;
        while let Some(next) = queue.pop_front() {
            if self.inconsistent {
                return;
            }
            steps += 1;
            if steps > self.config.max_absorb_steps {
                tracing::warn!(
                    pending = queue.len() + 1,
                    "Fact absorption step limit reached; remaining facts dropped"
                );
                return;
            }
            match self.normalize(&next) {
                Term::BoolLit(true) => {}
                Term::BoolLit(false) => {
                    tracing::debug!(fact = %next, "Facts became inconsistent");
                    self.inconsistent = true;
                }
                Term::And(parts) => queue.extend(parts),
                Term::Eq(a, b) => self.absorb_equation(*a, *b, &mut queue),
                Term::Le(e, zero) if *zero == Term::IntLit(0) => {
                    self.absorb_bound(*e, &mut queue)
                }
                Term::Not(inner) => self.add_rule(*inner, Term::BoolLit(false), &mut queue),
                other => self.add_rule(other, Term::BoolLit(true), &mut queue),
            }
        }
    }

    fn absorb_equation(&mut self, a: Term, b: Term, queue: &mut VecDeque<Term>) {
        if b == Term::IntLit(0)
            && let Some((atom, value)) = LinearExpr::from_term(&a).solve_unit()
            && !value.contains(&atom)
        {
            self.add_rule(atom, value, queue);
            return;
        }

        let (lhs, rhs) = orient(a, b);
        if rhs.contains(&lhs) {
            self.add_rule(Term::eq(lhs, rhs), Term::BoolLit(true), queue);
        } else {
            self.add_rule(lhs, rhs, queue);
        }
    }

    fn absorb_bound(&mut self, e: Term, queue: &mut VecDeque<Term>) {
        let lin = LinearExpr::from_term(&e);
        for bound in self.current_bounds() {
            let sum = lin.plus(&bound).and_then(|s| s.as_constant());
            match sum {
                Some(c) if c > 0 => {
                    tracing::debug!(bound = %e, "Contradictory bounds");
                    self.inconsistent = true;
                    return;
                }
                // e <= 0 and -e <= 0
                Some(0) => queue.push_back(Term::eq(e.clone(), Term::IntLit(0))),
                _ => {}
            }
        }
        // e <= 0 refutes its complement 1 - e <= 0
        if let Some(opposite) = lin
            .scale(-1)
            .and_then(|n| n.plus(&LinearExpr::constant(1)))
            && opposite.as_constant().is_none()
        {
            self.add_rule(
                Term::Le(Box::new(opposite.to_term()), Box::new(Term::IntLit(0))),
                Term::BoolLit(false),
                queue,
            );
        }
        self.bounds.push(lin);
        self.add_rule(
            Term::Le(Box::new(e), Box::new(Term::IntLit(0))),
            Term::BoolLit(true),
            queue,
        );
    }

    fn add_rule(&mut self, lhs: Term, rhs: Term, queue: &mut VecDeque<Term>) {
        if lhs == rhs {
            return;
        }
        if let Some(previous) = self.rules.remove(&lhs)
            && previous != rhs
        {
            queue.push_back(Term::eq(previous, rhs.clone()));
        }

        // Rules mentioning the new left-hand side are no longer normal.
        let stale: Vec<Term> = self
            .rules
            .iter()
            .filter(|(l, r)| l.contains(&lhs) || r.contains(&lhs))
            .map(|(l, _)| l.clone())
            .collect();
        self.rules.insert(lhs, rhs);
        for l in stale {
            if let Some(r) = self.rules.remove(&l) {
                queue.push_back(Term::eq(l, r));
            }
        }
    }

    /// Bounds rewritten under the current rules.
    fn current_bounds(&self) -> Vec<LinearExpr> {
        self.bounds
            .iter()
            .map(|b| LinearExpr::from_term(&self.normalize(&b.to_term())))
            .collect()
    }

    // ------------------------------------------------------------------
    // Goal evaluation
    // ------------------------------------------------------------------

    fn decide(&self, goal: &Term) -> ProofResult {
        match goal {
            Term::BoolLit(true) => ProofResult::Proved,
            Term::BoolLit(false) => ProofResult::Refuted,
            Term::And(parts) => {
                let mut all = true;
                for part in parts {
                    match self.decide(part) {
                        ProofResult::Refuted => return ProofResult::Refuted,
                        ProofResult::Unknown => all = false,
                        ProofResult::Proved => {}
                    }
                }
                if all {
                    ProofResult::Proved
                } else {
                    ProofResult::Unknown
                }
            }
            Term::Or(parts) => {
                let mut none = true;
                for part in parts {
                    match self.decide(part) {
                        ProofResult::Proved => return ProofResult::Proved,
                        ProofResult::Unknown => none = false,
                        ProofResult::Refuted => {}
                    }
                }
                if none {
                    ProofResult::Refuted
                } else {
                    ProofResult::Unknown
                }
            }
            Term::Not(inner) => match self.decide(inner) {
                ProofResult::Proved => ProofResult::Refuted,
                ProofResult::Refuted => ProofResult::Proved,
                ProofResult::Unknown => ProofResult::Unknown,
            },
            Term::Le(e, zero) if **zero == Term::IntLit(0) => {
                self.decide_le(&LinearExpr::from_term(e))
            }
            Term::Eq(e, zero) if **zero == Term::IntLit(0) => {
                let lin = LinearExpr::from_term(e);
                let upper = self.decide_le(&lin);
                let lower = match lin.scale(-1) {
                    Some(flipped) => self.decide_le(&flipped),
                    None => ProofResult::Unknown,
                };
                match (upper, lower) {
                    (ProofResult::Proved, ProofResult::Proved) => ProofResult::Proved,
                    (ProofResult::Refuted, _) | (_, ProofResult::Refuted) => ProofResult::Refuted,
                    _ => ProofResult::Unknown,
                }
            }
            _ => ProofResult::Unknown,
        }
    }

    /// Decide `lin <= 0` against the known bounds.
    fn decide_le(&self, lin: &LinearExpr) -> ProofResult {
        if let Some(c) = lin.as_constant() {
            return if c <= 0 {
                ProofResult::Proved
            } else {
                ProofResult::Refuted
            };
        }
        // not(lin <= 0)  <=>  -lin + 1 <= 0
        let negated = lin
            .scale(-1)
            .and_then(|n| n.plus(&LinearExpr::constant(1)));
        for bound in self.current_bounds() {
            // lin = bound + c with c <= 0, and bound <= 0
            if let Some(c) = lin.minus(&bound).and_then(|d| d.as_constant())
                && c <= 0
            {
                return ProofResult::Proved;
            }
            if let Some(c) = negated
                .as_ref()
                .and_then(|n| n.minus(&bound))
                .and_then(|d| d.as_constant())
                && c <= 0
            {
                return ProofResult::Refuted;
            }
        }
        ProofResult::Unknown
    }
}

fn is_value_headed(term: &Term) -> bool {
    matches!(
        term,
        Term::BoolLit(_) | Term::IntLit(_) | Term::Null | Term::Loc(_) | Term::Ctor { .. }
    )
}

/// Orient an equation into `(lhs, rhs)` with the rewrite direction lhs → rhs.
fn orient(a: Term, b: Term) -> (Term, Term) {
    match (is_value_headed(&a), is_value_headed(&b)) {
        (false, true) => (a, b),
        (true, false) => (b, a),
        _ => {
            let a_key = (a.size(), &a);
            let b_key = (b.size(), &b);
            if a_key >= b_key { (a, b) } else { (b, a) }
        }
    }
}
