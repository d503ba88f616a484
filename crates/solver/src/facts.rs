//! The fact database: every proposition assumed on the current path.
//!
//! Checked facts (entry assumptions, branch conditions, fold equations) and
//! trusted lemma conclusions are kept apart so reports can list which
//! axioms a verdict relied on.

use sepcheck_logic::Term;

/// A lemma conclusion admitted without proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Axiom {
    /// Name of the lemma the fact came from.
    pub source: String,
    pub fact: Term,
}

/// Ordered log of assumed facts.
#[derive(Debug, Clone, Default)]
pub struct FactDatabase {
    facts: Vec<Term>,
    axioms: Vec<Axiom>,
}

impl FactDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, fact: Term) {
        self.facts.push(fact);
    }

    pub fn record_axiom(&mut self, source: impl Into<String>, fact: Term) {
        self.axioms.push(Axiom {
            source: source.into(),
            fact,
        });
    }

    /// Checked facts, in assumption order.
    pub fn facts(&self) -> &[Term] {
        &self.facts
    }

    /// Trusted lemma conclusions, in application order.
    pub fn axioms(&self) -> &[Axiom] {
        &self.axioms
    }

    /// Total number of facts of either kind.
    pub fn len(&self) -> usize {
        self.facts.len() + self.axioms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_database() {
        let db = FactDatabase::new();
        assert!(db.is_empty());
        assert_eq!(db.len(), 0);
    }

    #[test]
    fn axioms_are_kept_apart() {
        let mut db = FactDatabase::new();
        db.record(Term::var("b"));
        db.record_axiom("lemma_len", Term::eq(Term::var("x"), Term::int(0)));
        assert_eq!(db.len(), 2);
        assert_eq!(db.facts(), &[Term::var("b")]);
        assert_eq!(db.axioms().len(), 1);
        assert_eq!(db.axioms()[0].source, "lemma_len");
    }
}
