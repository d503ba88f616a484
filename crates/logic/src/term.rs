use std::collections::{BTreeSet, HashMap};

/// Logical term (expression) representation.
///
/// Terms describe pure values: integers, booleans, pointers and datatype
/// instances. Struct cell contents are constructor terms named after the
/// struct layout, so `H.next` on a cell value is plain field projection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    // === Literals ===
    /// Boolean literal
    BoolLit(bool),
    /// Integer literal (unbounded)
    IntLit(i128),
    /// The null pointer
    Null,
    /// An allocated location, identified by its address
    Loc(u64),

    // === Variables ===
    /// Named variable reference
    Var(String),

    // === Boolean operations ===
    /// Logical NOT
    Not(Box<Term>),
    /// Logical AND (n-ary)
    And(Vec<Term>),
    /// Logical OR (n-ary)
    Or(Vec<Term>),
    /// Logical implication
    Implies(Box<Term>, Box<Term>),

    // === Core ===
    /// Equality
    Eq(Box<Term>, Box<Term>),
    /// If-then-else
    Ite(Box<Term>, Box<Term>, Box<Term>),

    // === Integer arithmetic ===
    /// `a + b`
    Add(Box<Term>, Box<Term>),
    /// `a - b`
    Sub(Box<Term>, Box<Term>),
    /// `a * b`
    Mul(Box<Term>, Box<Term>),
    /// `-a`
    Neg(Box<Term>),
    /// `a < b`
    Lt(Box<Term>, Box<Term>),
    /// `a <= b`
    Le(Box<Term>, Box<Term>),
    /// `a > b`
    Gt(Box<Term>, Box<Term>),
    /// `a >= b`
    Ge(Box<Term>, Box<Term>),

    // === Datatypes ===
    /// Field projection: `base.field`
    Field(Box<Term>, String),
    /// Constructor application with named fields: `Seq_Cons { head: h, tail: t }`
    Ctor {
        name: String,
        fields: Vec<(String, Term)>,
    },
    /// Case analysis over constructors
    Match(Box<Term>, Vec<MatchArm>),

    // === Function application ===
    /// Logical function application: `f(arg1, arg2, ...)`
    App(String, Vec<Term>),
}

/// One arm of a `match` term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub body: Term,
}

/// Patterns accepted in `match` arms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pattern {
    /// `_`
    Wildcard,
    /// Binds the scrutinee to a name
    Bind(String),
    /// `Name { field: pattern, ... }`; unlisted fields are ignored
    Ctor {
        name: String,
        fields: Vec<(String, Pattern)>,
    },
}

impl MatchArm {
    fn substitute(&self, map: &HashMap<String, Term>) -> MatchArm {
        let binders: Vec<String> = self
            .pattern
            .binders()
            .into_iter()
            .map(str::to_string)
            .collect();
        let inner: HashMap<String, Term> = map
            .iter()
            .filter(|(k, _)| !binders.contains(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let body_free = self.body.free_vars();
        let incoming: BTreeSet<String> = inner
            .iter()
            .filter(|(k, _)| body_free.contains(*k))
            .flat_map(|(_, v)| v.free_vars())
            .collect();
        let captured: Vec<&String> = binders.iter().filter(|b| incoming.contains(*b)).collect();
        if captured.is_empty() {
            return MatchArm {
                pattern: self.pattern.clone(),
                body: self.body.substitute(&inner),
            };
        }

        let mut taken = incoming;
        taken.extend(self.body.names());
        taken.extend(binders.iter().cloned());
        taken.extend(inner.keys().cloned());
        let mut renaming: HashMap<String, String> = HashMap::new();
        for binder in captured {
            let fresh = fresh_name(binder, &taken);
            taken.insert(fresh.clone());
            renaming.insert(binder.clone(), fresh);
        }
        let rename_map: HashMap<String, Term> = renaming
            .iter()
            .map(|(from, to)| (from.clone(), Term::Var(to.clone())))
            .collect();
        MatchArm {
            pattern: self.pattern.rename(&renaming),
            body: self.body.substitute(&rename_map).substitute(&inner),
        }
    }
}

/// `base$N` with the smallest `N` not in `taken`.
fn fresh_name(base: &str, taken: &BTreeSet<String>) -> String {
    let stem = base.split('$').next().unwrap_or(base);
    (1usize..)
        .map(|n| format!("{stem}${n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| format!("{stem}$"))
}

impl Pattern {
    fn rename(&self, renaming: &HashMap<String, String>) -> Pattern {
        match self {
            Pattern::Wildcard => Pattern::Wildcard,
            Pattern::Bind(name) => {
                Pattern::Bind(renaming.get(name).cloned().unwrap_or_else(|| name.clone()))
            }
            Pattern::Ctor { name, fields } => Pattern::Ctor {
                name: name.clone(),
                fields: fields
                    .iter()
                    .map(|(f, p)| (f.clone(), p.rename(renaming)))
                    .collect(),
            },
        }
    }

    /// Names bound by this pattern.
    pub fn binders(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_binders(&mut out);
        out
    }

    fn collect_binders<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Pattern::Wildcard => {}
            Pattern::Bind(name) => out.push(name),
            Pattern::Ctor { fields, .. } => {
                for (_, pat) in fields {
                    pat.collect_binders(out);
                }
            }
        }
    }
}

impl Term {
    pub fn var(name: impl Into<String>) -> Term {
        Term::Var(name.into())
    }

    pub fn int(value: i128) -> Term {
        Term::IntLit(value)
    }

    pub fn not(inner: Term) -> Term {
        Term::Not(Box::new(inner))
    }

    pub fn eq(lhs: Term, rhs: Term) -> Term {
        Term::Eq(Box::new(lhs), Box::new(rhs))
    }

    /// `lhs != rhs`, encoded as `!(lhs == rhs)`.
    pub fn ne(lhs: Term, rhs: Term) -> Term {
        Term::not(Term::eq(lhs, rhs))
    }

    pub fn add(lhs: Term, rhs: Term) -> Term {
        Term::Add(Box::new(lhs), Box::new(rhs))
    }

    pub fn sub(lhs: Term, rhs: Term) -> Term {
        Term::Sub(Box::new(lhs), Box::new(rhs))
    }

    pub fn lt(lhs: Term, rhs: Term) -> Term {
        Term::Lt(Box::new(lhs), Box::new(rhs))
    }

    pub fn le(lhs: Term, rhs: Term) -> Term {
        Term::Le(Box::new(lhs), Box::new(rhs))
    }

    pub fn field(base: Term, field: impl Into<String>) -> Term {
        Term::Field(Box::new(base), field.into())
    }

    pub fn ctor(name: impl Into<String>, fields: Vec<(&str, Term)>) -> Term {
        Term::Ctor {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(f, t)| (f.to_string(), t))
                .collect(),
        }
    }

    pub fn app(name: impl Into<String>, args: Vec<Term>) -> Term {
        Term::App(name.into(), args)
    }

    /// Conjunction that avoids wrapping zero or one conjunct.
    pub fn conjunction(mut terms: Vec<Term>) -> Term {
        match terms.len() {
            0 => Term::BoolLit(true),
            1 => terms.remove(0),
            _ => Term::And(terms),
        }
    }

    /// Ground values: literals, `NULL`, locations and constructors of values.
    pub fn is_value(&self) -> bool {
        match self {
            Term::BoolLit(_) | Term::IntLit(_) | Term::Null | Term::Loc(_) => true,
            Term::Ctor { fields, .. } => fields.iter().all(|(_, t)| t.is_value()),
            _ => false,
        }
    }

    /// True for terms whose top-level operator is integer arithmetic.
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Term::IntLit(_) | Term::Add(..) | Term::Sub(..) | Term::Mul(..) | Term::Neg(_)
        )
    }

    /// Number of nodes in the term tree.
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|c| c.size()).sum::<usize>()
    }

    /// Immediate subterms, in order. Match arm bodies are included.
    pub fn children(&self) -> Vec<&Term> {
        match self {
            Term::BoolLit(_) | Term::IntLit(_) | Term::Null | Term::Loc(_) | Term::Var(_) => {
                vec![]
            }
            Term::Not(a) | Term::Neg(a) | Term::Field(a, _) => vec![a],
            Term::And(ts) | Term::Or(ts) | Term::App(_, ts) => ts.iter().collect(),
            Term::Implies(a, b)
            | Term::Eq(a, b)
            | Term::Add(a, b)
            | Term::Sub(a, b)
            | Term::Mul(a, b)
            | Term::Lt(a, b)
            | Term::Le(a, b)
            | Term::Gt(a, b)
            | Term::Ge(a, b) => vec![a, b],
            Term::Ite(c, a, b) => vec![c, a, b],
            Term::Ctor { fields, .. } => fields.iter().map(|(_, t)| t).collect(),
            Term::Match(scrutinee, arms) => {
                let mut out: Vec<&Term> = vec![scrutinee];
                out.extend(arms.iter().map(|arm| &arm.body));
                out
            }
        }
    }

    /// True if `needle` occurs anywhere inside `self` (including `self`).
    pub fn contains(&self, needle: &Term) -> bool {
        self == needle || self.children().iter().any(|c| c.contains(needle))
    }

    /// Free variables of the term. Names bound by match patterns are excluded.
    pub fn free_vars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_free_vars(&mut Vec::new(), &mut out);
        out
    }

    fn collect_free_vars(&self, bound: &mut Vec<String>, out: &mut BTreeSet<String>) {
        match self {
            Term::Var(name) => {
                if !bound.iter().any(|b| b == name) {
                    out.insert(name.clone());
                }
            }
            Term::Match(scrutinee, arms) => {
                scrutinee.collect_free_vars(bound, out);
                for arm in arms {
                    let names: Vec<String> = arm
                        .pattern
                        .binders()
                        .into_iter()
                        .map(str::to_string)
                        .collect();
                    let depth = bound.len();
                    bound.extend(names);
                    arm.body.collect_free_vars(bound, out);
                    bound.truncate(depth);
                }
            }
            _ => {
                for child in self.children() {
                    child.collect_free_vars(bound, out);
                }
            }
        }
    }

    /// Every variable name in the term, free or bound by a pattern.
    pub fn names(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names(&self, out: &mut BTreeSet<String>) {
        match self {
            Term::Var(name) => {
                out.insert(name.clone());
            }
            Term::Match(_, arms) => {
                for arm in arms {
                    out.extend(arm.pattern.binders().into_iter().map(str::to_string));
                }
                for child in self.children() {
                    child.collect_names(out);
                }
            }
            _ => {
                for child in self.children() {
                    child.collect_names(out);
                }
            }
        }
    }

    /// Capture-avoiding substitution of variables by terms.
    ///
    /// Pattern binders shadow the substitution inside their arm. A binder that
    /// occurs free in a replacement term is renamed to `binder$N` first.
    pub fn substitute(&self, map: &HashMap<String, Term>) -> Term {
        if map.is_empty() {
            return self.clone();
        }
        match self {
            Term::Var(name) => map.get(name).cloned().unwrap_or_else(|| self.clone()),
            Term::BoolLit(_) | Term::IntLit(_) | Term::Null | Term::Loc(_) => self.clone(),
            Term::Not(a) => Term::Not(Box::new(a.substitute(map))),
            Term::Neg(a) => Term::Neg(Box::new(a.substitute(map))),
            Term::And(ts) => Term::And(ts.iter().map(|t| t.substitute(map)).collect()),
            Term::Or(ts) => Term::Or(ts.iter().map(|t| t.substitute(map)).collect()),
            Term::Implies(a, b) => bin(Term::Implies, a, b, map),
            Term::Eq(a, b) => bin(Term::Eq, a, b, map),
            Term::Add(a, b) => bin(Term::Add, a, b, map),
            Term::Sub(a, b) => bin(Term::Sub, a, b, map),
            Term::Mul(a, b) => bin(Term::Mul, a, b, map),
            Term::Lt(a, b) => bin(Term::Lt, a, b, map),
            Term::Le(a, b) => bin(Term::Le, a, b, map),
            Term::Gt(a, b) => bin(Term::Gt, a, b, map),
            Term::Ge(a, b) => bin(Term::Ge, a, b, map),
            Term::Ite(c, a, b) => Term::Ite(
                Box::new(c.substitute(map)),
                Box::new(a.substitute(map)),
                Box::new(b.substitute(map)),
            ),
            Term::Field(base, f) => Term::Field(Box::new(base.substitute(map)), f.clone()),
            Term::Ctor { name, fields } => Term::Ctor {
                name: name.clone(),
                fields: fields
                    .iter()
                    .map(|(f, t)| (f.clone(), t.substitute(map)))
                    .collect(),
            },
            Term::App(name, args) => {
                Term::App(name.clone(), args.iter().map(|t| t.substitute(map)).collect())
            }
            Term::Match(scrutinee, arms) => Term::Match(
                Box::new(scrutinee.substitute(map)),
                arms.iter().map(|arm| arm.substitute(map)).collect(),
            ),
        }
    }

    /// Replace every occurrence of `from` with `to`.
    pub fn replace(&self, from: &Term, to: &Term) -> Term {
        if self == from {
            return to.clone();
        }
        self.map_children(|c| c.replace(from, to))
    }

    /// Rebuild the term with `f` applied to each immediate subterm.
    pub fn map_children(&self, mut f: impl FnMut(&Term) -> Term) -> Term {
        match self {
            Term::BoolLit(_)
            | Term::IntLit(_)
            | Term::Null
            | Term::Loc(_)
            | Term::Var(_) => self.clone(),
            Term::Not(a) => Term::Not(Box::new(f(a))),
            Term::Neg(a) => Term::Neg(Box::new(f(a))),
            Term::Field(a, name) => Term::Field(Box::new(f(a)), name.clone()),
            Term::And(ts) => Term::And(ts.iter().map(&mut f).collect()),
            Term::Or(ts) => Term::Or(ts.iter().map(&mut f).collect()),
            Term::App(name, ts) => Term::App(name.clone(), ts.iter().map(&mut f).collect()),
            Term::Implies(a, b) => Term::Implies(Box::new(f(a)), Box::new(f(b))),
            Term::Eq(a, b) => Term::Eq(Box::new(f(a)), Box::new(f(b))),
            Term::Add(a, b) => Term::Add(Box::new(f(a)), Box::new(f(b))),
            Term::Sub(a, b) => Term::Sub(Box::new(f(a)), Box::new(f(b))),
            Term::Mul(a, b) => Term::Mul(Box::new(f(a)), Box::new(f(b))),
            Term::Lt(a, b) => Term::Lt(Box::new(f(a)), Box::new(f(b))),
            Term::Le(a, b) => Term::Le(Box::new(f(a)), Box::new(f(b))),
            Term::Gt(a, b) => Term::Gt(Box::new(f(a)), Box::new(f(b))),
            Term::Ge(a, b) => Term::Ge(Box::new(f(a)), Box::new(f(b))),
            Term::Ite(c, a, b) => Term::Ite(Box::new(f(c)), Box::new(f(a)), Box::new(f(b))),
            Term::Ctor { name, fields } => Term::Ctor {
                name: name.clone(),
                fields: fields.iter().map(|(n, t)| (n.clone(), f(t))).collect(),
            },
            Term::Match(scrutinee, arms) => Term::Match(
                Box::new(f(scrutinee)),
                arms.iter()
                    .map(|arm| MatchArm {
                        pattern: arm.pattern.clone(),
                        body: f(&arm.body),
                    })
                    .collect(),
            ),
        }
    }
}

fn bin(
    ctor: fn(Box<Term>, Box<Term>) -> Term,
    a: &Term,
    b: &Term,
    map: &HashMap<String, Term>,
) -> Term {
    ctor(Box::new(a.substitute(map)), Box::new(b.substitute(map)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitute_replaces_free_variables() {
        let t = Term::add(Term::var("x"), Term::int(1));
        let map = HashMap::from([("x".to_string(), Term::int(41))]);
        assert_eq!(t.substitute(&map), Term::add(Term::int(41), Term::int(1)));
    }

    #[test]
    fn substitute_respects_pattern_shadowing() {
        let t = Term::Match(
            Box::new(Term::var("xs")),
            vec![MatchArm {
                pattern: Pattern::Ctor {
                    name: "Seq_Cons".to_string(),
                    fields: vec![("head".to_string(), Pattern::Bind("x".to_string()))],
                },
                body: Term::var("x"),
            }],
        );
        let map = HashMap::from([
            ("x".to_string(), Term::int(7)),
            ("xs".to_string(), Term::var("ys")),
        ]);
        let result = t.substitute(&map);
        match result {
            Term::Match(scrutinee, arms) => {
                assert_eq!(*scrutinee, Term::var("ys"));
                assert_eq!(arms[0].body, Term::var("x"));
            }
            other => panic!("expected Match, got {other:?}"),
        }
    }

    #[test]
    fn substitute_renames_binder_captured_by_replacement() {
        // match xs { Seq_Cons { tail: tl } => append(tl, ys) } with ys := tl
        let t = Term::Match(
            Box::new(Term::var("xs")),
            vec![MatchArm {
                pattern: Pattern::Ctor {
                    name: "Seq_Cons".to_string(),
                    fields: vec![("tail".to_string(), Pattern::Bind("tl".to_string()))],
                },
                body: Term::App(
                    "append".to_string(),
                    vec![Term::var("tl"), Term::var("ys")],
                ),
            }],
        );
        let map = HashMap::from([("ys".to_string(), Term::var("tl"))]);
        let result = t.substitute(&map);
        let Term::Match(_, arms) = &result else {
            panic!("expected Match, got {result:?}");
        };
        assert_eq!(
            arms[0].pattern,
            Pattern::Ctor {
                name: "Seq_Cons".to_string(),
                fields: vec![("tail".to_string(), Pattern::Bind("tl$1".to_string()))],
            }
        );
        assert_eq!(
            arms[0].body,
            Term::App(
                "append".to_string(),
                vec![Term::var("tl$1"), Term::var("tl")],
            )
        );
        assert!(result.free_vars().contains("tl"));
    }

    #[test]
    fn fresh_binder_avoids_names_already_in_the_arm() {
        let t = Term::Match(
            Box::new(Term::var("xs")),
            vec![MatchArm {
                pattern: Pattern::Bind("x".to_string()),
                body: Term::add(Term::var("x"), Term::add(Term::var("x$1"), Term::var("y"))),
            }],
        );
        let map = HashMap::from([("y".to_string(), Term::var("x"))]);
        let Term::Match(_, arms) = t.substitute(&map) else {
            panic!("expected Match");
        };
        assert_eq!(arms[0].pattern, Pattern::Bind("x$2".to_string()));
        assert_eq!(
            arms[0].body,
            Term::add(Term::var("x$2"), Term::add(Term::var("x$1"), Term::var("x")))
        );
    }

    #[test]
    fn free_vars_exclude_pattern_binders() {
        let t = Term::Match(
            Box::new(Term::var("xs")),
            vec![MatchArm {
                pattern: Pattern::Bind("y".to_string()),
                body: Term::add(Term::var("y"), Term::var("z")),
            }],
        );
        let vars: Vec<String> = t.free_vars().into_iter().collect();
        assert_eq!(vars, vec!["xs".to_string(), "z".to_string()]);
    }

    #[test]
    fn is_value_recognizes_ground_constructors() {
        let v = Term::ctor("Seq_Cons", vec![("head", Term::int(1)), ("tail", Term::ctor("Seq_Nil", vec![]))]);
        assert!(v.is_value());
        let s = Term::ctor("Seq_Cons", vec![("head", Term::var("h"))]);
        assert!(!s.is_value());
    }

    #[test]
    fn replace_rewrites_every_occurrence() {
        let p = Term::field(Term::var("H"), "next");
        let t = Term::eq(p.clone(), Term::add(p.clone(), Term::int(0)));
        let out = t.replace(&p, &Term::Null);
        assert_eq!(out, Term::eq(Term::Null, Term::add(Term::Null, Term::int(0))));
    }

    #[test]
    fn size_counts_nodes() {
        assert_eq!(Term::int(1).size(), 1);
        assert_eq!(Term::add(Term::var("a"), Term::int(1)).size(), 3);
    }
}
