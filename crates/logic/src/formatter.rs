//! Annotation-syntax text formatting for terms.
//!
//! Implements `Display` for [`Sort`], [`Term`] and [`Pattern`], producing the
//! same Rust-expression syntax `spec_parser` reads, so diagnostics quote
//! obligations the way the user wrote them.

use std::fmt;

use crate::sort::Sort;
use crate::term::{Pattern, Term};

// ---------------------------------------------------------------------------
// Sort
// ---------------------------------------------------------------------------

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "bool"),
            Sort::Int => write!(f, "integer"),
            Sort::Pointer => write!(f, "pointer"),
            Sort::Datatype(name) => write!(f, "datatype {name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Term
// ---------------------------------------------------------------------------

/// Write `(lhs op rhs)`.
fn fmt_binop(op: &str, lhs: &Term, rhs: &Term, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({lhs} {op} {rhs})")
}

/// Write `items` separated by `sep`, each rendered by `item`.
fn fmt_joined<T>(
    items: &[T],
    sep: &str,
    f: &mut fmt::Formatter<'_>,
    mut item: impl FnMut(&T, &mut fmt::Formatter<'_>) -> fmt::Result,
) -> fmt::Result {
    for (i, it) in items.iter().enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        item(it, f)?;
    }
    Ok(())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::BoolLit(b) => write!(f, "{b}"),
            Term::IntLit(n) => write!(f, "{n}"),
            Term::Null => write!(f, "NULL"),
            Term::Loc(addr) => write!(f, "loc({addr})"),
            Term::Var(name) => write!(f, "{name}"),
            Term::Not(inner) => match inner.as_ref() {
                Term::Eq(a, b) => fmt_binop("!=", a, b, f),
                other => write!(f, "!{other}"),
            },
            Term::And(ts) if ts.is_empty() => write!(f, "true"),
            Term::Or(ts) if ts.is_empty() => write!(f, "false"),
            Term::And(ts) | Term::Or(ts) => {
                let sep = if matches!(self, Term::And(_)) {
                    " && "
                } else {
                    " || "
                };
                write!(f, "(")?;
                fmt_joined(ts, sep, f, |t, f| write!(f, "{t}"))?;
                write!(f, ")")
            }
            Term::Implies(a, b) => write!(f, "implies({a}, {b})"),
            Term::Eq(a, b) => fmt_binop("==", a, b, f),
            Term::Ite(c, a, b) => write!(f, "if {c} {{ {a} }} else {{ {b} }}"),
            Term::Add(a, b) => fmt_binop("+", a, b, f),
            Term::Sub(a, b) => fmt_binop("-", a, b, f),
            Term::Mul(a, b) => fmt_binop("*", a, b, f),
            Term::Neg(a) => write!(f, "-{a}"),
            Term::Lt(a, b) => fmt_binop("<", a, b, f),
            Term::Le(a, b) => fmt_binop("<=", a, b, f),
            Term::Gt(a, b) => fmt_binop(">", a, b, f),
            Term::Ge(a, b) => fmt_binop(">=", a, b, f),
            Term::Field(base, field) => write!(f, "{base}.{field}"),
            Term::Ctor { name, fields } => {
                if fields.is_empty() {
                    return write!(f, "{name} {{}}");
                }
                write!(f, "{name} {{ ")?;
                fmt_joined(fields, ", ", f, |(n, t), f| write!(f, "{n}: {t}"))?;
                write!(f, " }}")
            }
            Term::Match(scrutinee, arms) => {
                write!(f, "match {scrutinee} {{ ")?;
                fmt_joined(arms, ", ", f, |arm, f| {
                    write!(f, "{} => {}", arm.pattern, arm.body)
                })?;
                write!(f, " }}")
            }
            Term::App(name, args) => {
                write!(f, "{name}(")?;
                fmt_joined(args, ", ", f, |t, f| write!(f, "{t}"))?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Wildcard => write!(f, "_"),
            Pattern::Bind(name) => write!(f, "{name}"),
            Pattern::Ctor { name, fields } if fields.is_empty() => write!(f, "{name} {{}}"),
            Pattern::Ctor { name, fields } => {
                write!(f, "{name} {{ ")?;
                fmt_joined(fields, ", ", f, |(n, p), f| write!(f, "{n}: {p}"))?;
                write!(f, " }}")
            }
        }
    }
}
