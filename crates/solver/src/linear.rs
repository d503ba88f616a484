//! Linear integer normal forms.
//!
//! Every integer-valued term is viewed as `constant + Σ coeff·atom`, where an
//! atom is any subterm that is not itself linear arithmetic (variables, field
//! projections, function applications, non-linear products). Two terms with
//! the same normal form are equal; comparisons reduce to the sign of a
//! difference.

use std::collections::BTreeMap;

use sepcheck_logic::Term;

/// `constant + Σ coeff·atom` with no zero coefficients.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinearExpr {
    pub constant: i128,
    pub atoms: BTreeMap<Term, i128>,
}

impl LinearExpr {
    pub fn constant(value: i128) -> Self {
        Self {
            constant: value,
            atoms: BTreeMap::new(),
        }
    }

    pub fn atom(term: Term) -> Self {
        Self {
            constant: 0,
            atoms: BTreeMap::from([(term, 1)]),
        }
    }

    /// Decompose arithmetic operators; any other term becomes an atom.
    ///
    /// An operation whose constant or coefficients overflow `i128` is kept
    /// whole as an atom.
    pub fn from_term(term: &Term) -> Self {
        let decomposed = match term {
            Term::IntLit(n) => Some(Self::constant(*n)),
            Term::Add(a, b) => Self::from_term(a).plus(&Self::from_term(b)),
            Term::Sub(a, b) => Self::from_term(a).minus(&Self::from_term(b)),
            Term::Neg(a) => Self::from_term(a).scale(-1),
            Term::Mul(a, b) => {
                let la = Self::from_term(a);
                let lb = Self::from_term(b);
                match (la.as_constant(), lb.as_constant()) {
                    (Some(k), _) => lb.scale(k),
                    (_, Some(k)) => la.scale(k),
                    _ => {
                        // Non-linear: keep the product as an atom, factors ordered.
                        let (x, y) = (la.to_term(), lb.to_term());
                        let (x, y) = if x <= y { (x, y) } else { (y, x) };
                        Some(Self::atom(Term::Mul(Box::new(x), Box::new(y))))
                    }
                }
            }
            other => Some(Self::atom(other.clone())),
        };
        decomposed.unwrap_or_else(|| {
            tracing::trace!(term = %term, "Arithmetic overflow, term kept as atom");
            Self::atom(term.clone())
        })
    }

    /// `None` on overflow.
    pub fn plus(&self, other: &Self) -> Option<Self> {
        let mut out = self.clone();
        out.constant = out.constant.checked_add(other.constant)?;
        for (atom, coeff) in &other.atoms {
            let entry = out.atoms.entry(atom.clone()).or_insert(0);
            *entry = entry.checked_add(*coeff)?;
        }
        out.atoms.retain(|_, c| *c != 0);
        Some(out)
    }

    pub fn minus(&self, other: &Self) -> Option<Self> {
        self.plus(&other.scale(-1)?)
    }

    /// `None` on overflow.
    pub fn scale(&self, k: i128) -> Option<Self> {
        if k == 0 {
            return Some(Self::constant(0));
        }
        Some(Self {
            constant: self.constant.checked_mul(k)?,
            atoms: self
                .atoms
                .iter()
                .map(|(a, c)| Some((a.clone(), c.checked_mul(k)?)))
                .collect::<Option<_>>()?,
        })
    }

    pub fn as_constant(&self) -> Option<i128> {
        self.atoms.is_empty().then_some(self.constant)
    }

    /// Flip the sign so the first atom has a positive coefficient.
    pub fn with_positive_lead(&self) -> Option<Self> {
        match self.atoms.values().next() {
            Some(c) if *c < 0 => self.scale(-1),
            _ => Some(self.clone()),
        }
    }

    /// Canonical term rendering: atoms in order, constant last.
    pub fn to_term(&self) -> Term {
        let mut acc: Option<Term> = None;
        for (atom, coeff) in &self.atoms {
            let summand = match coeff {
                1 => atom.clone(),
                -1 => Term::Neg(Box::new(atom.clone())),
                c => Term::Mul(Box::new(Term::IntLit(*c)), Box::new(atom.clone())),
            };
            acc = Some(match acc {
                None => summand,
                Some(prev) => Term::add(prev, summand),
            });
        }
        match acc {
            None => Term::IntLit(self.constant),
            Some(t) if self.constant == 0 => t,
            Some(t) => Term::add(t, Term::IntLit(self.constant)),
        }
    }

    /// Solve `self == 0` for an atom with a unit coefficient.
    ///
    /// Prefers the largest atom (by size, then term order) so that compound
    /// terms are rewritten in favour of simpler ones. Atoms that occur inside
    /// another atom are skipped.
    pub fn solve_unit(&self) -> Option<(Term, Term)> {
        let candidate = self
            .atoms
            .iter()
            .filter(|(_, c)| c.abs() == 1)
            .map(|(a, _)| a)
            .filter(|a| {
                !self
                    .atoms
                    .keys()
                    .any(|other| other != *a && other.contains(a))
            })
            .max_by(|x, y| x.size().cmp(&y.size()).then_with(|| x.cmp(y)))?
            .clone();
        let coeff = self.atoms[&candidate];
        let mut rest = self.clone();
        rest.atoms.remove(&candidate);
        // coeff·atom + rest == 0  =>  atom == -rest / coeff
        let solved = if coeff == 1 { rest.scale(-1)? } else { rest };
        Some((candidate, solved.to_term()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(name: &str) -> Term {
        Term::var(name)
    }

    #[test]
    fn collects_like_terms() {
        // (x + 1) + (x - 3) == 2x - 2
        let t = Term::add(
            Term::add(v("x"), Term::int(1)),
            Term::sub(v("x"), Term::int(3)),
        );
        let lin = LinearExpr::from_term(&t);
        assert_eq!(lin.constant, -2);
        assert_eq!(lin.atoms.get(&v("x")), Some(&2));
    }

    #[test]
    fn cancels_to_constant() {
        let t = Term::sub(Term::add(v("n"), Term::int(5)), v("n"));
        assert_eq!(LinearExpr::from_term(&t).as_constant(), Some(5));
    }

    #[test]
    fn non_linear_products_are_atoms() {
        let t = Term::Mul(Box::new(v("y")), Box::new(v("x")));
        let lin = LinearExpr::from_term(&t);
        assert_eq!(lin.atoms.len(), 1);
        let swapped = LinearExpr::from_term(&Term::Mul(Box::new(v("x")), Box::new(v("y"))));
        assert_eq!(lin, swapped);
    }

    #[test]
    fn to_term_round_trips() {
        let t = Term::sub(Term::Mul(Box::new(Term::int(3)), Box::new(v("a"))), v("b"));
        let lin = LinearExpr::from_term(&t);
        let again = LinearExpr::from_term(&lin.to_term());
        assert_eq!(lin, again);
    }

    #[test]
    fn solve_unit_isolates_an_atom() {
        // L - T - 1 == 0  =>  T == L - 1 ("T" > "L" in term order)
        let lin = LinearExpr::from_term(&Term::sub(Term::sub(v("L"), v("T")), Term::int(1)));
        let (atom, rhs) = lin.solve_unit().expect("unit coefficient available");
        assert_eq!(atom, v("T"));
        assert_eq!(
            LinearExpr::from_term(&rhs),
            LinearExpr::from_term(&Term::sub(v("L"), Term::int(1)))
        );
    }

    #[test]
    fn overflowing_sums_stay_atomic() {
        let a = Term::add(Term::int(i128::MAX), Term::int(1));
        let b = Term::add(Term::int(i128::MAX), Term::int(2));
        let la = LinearExpr::from_term(&a);
        let lb = LinearExpr::from_term(&b);
        assert_eq!(la, LinearExpr::atom(a));
        assert_ne!(la, lb);
        assert_eq!(la.minus(&lb).and_then(|d| d.as_constant()), None);
    }

    #[test]
    fn overflowing_scale_is_rejected() {
        let lin = LinearExpr::constant(i128::MIN);
        assert_eq!(lin.scale(-1), None);
        let neg = Term::Neg(Box::new(Term::int(i128::MIN)));
        assert_eq!(LinearExpr::from_term(&neg), LinearExpr::atom(neg.clone()));
        assert_eq!(LinearExpr::constant(3).scale(-2), Some(LinearExpr::constant(-6)));
    }

    #[test]
    fn solve_unit_requires_unit_coefficient() {
        let lin = LinearExpr::from_term(&Term::Mul(Box::new(Term::int(2)), Box::new(v("x"))));
        assert!(lin.solve_unit().is_none());
    }
}
