/// Annotation expression parser using the `syn` crate.
///
/// Annotations are written in Rust expression syntax and converted into
/// logic [`Term`]s.
///
/// ## Supported syntax
///
/// - **Literals:** integer (`42`), boolean (`true`, `false`), `NULL`
/// - **Identifiers:** program variables, ghost binders, `return`
/// - **Binary ops:** `+`, `-`, `*`, `==`, `!=`, `<`, `<=`, `>`, `>=`, `&&`, `||`
/// - **Unary ops:** `!expr`, `-expr`
/// - **Field access:** `H.tail`, `Tail.len`
/// - **Calls:** logical functions `f(a, b)`, and `implies(a, b)`
/// - **Constructors:** `Seq_Cons { head: h, tail: t }`, `Seq_Nil {}`
/// - **Control:** `if c { a } else { b }`, `match xs { Pat => e, ... }`,
///   blocks with `let` bindings
///
/// Clauses additionally accept `take X = P(p)` and `take X = Owned<S>(p)`.
use std::collections::HashMap;

use sepcheck_logic::{MatchArm, Pattern, Sort, Term};
use syn::{BinOp as SynBinOp, Expr, Lit, Pat, Stmt, UnOp as SynUnOp};

use crate::error::DefinitionError;
use crate::ir::{Clause, Resource};

/// Parse an annotation expression.
pub fn parse_term(src: &str) -> Result<Term, DefinitionError> {
    let src = src.trim();
    if src.is_empty() {
        return Err(bad(src, "empty expression"));
    }
    let expr: Expr = syn::parse_str(src).map_err(|e| bad(src, &e.to_string()))?;
    convert_expr(&expr).map_err(|msg| bad(src, &msg))
}

/// Parse a `requires` / `ensures` clause.
pub fn parse_clause(src: &str) -> Result<Clause, DefinitionError> {
    let trimmed = src.trim();
    let Some(rest) = trimmed.strip_prefix("take") else {
        return parse_term(trimmed).map(Clause::Pure);
    };
    if !rest.starts_with(char::is_whitespace) {
        // An identifier that merely starts with "take".
        return parse_term(trimmed).map(Clause::Pure);
    }
    let Some((binder, resource)) = rest.split_once('=') else {
        return Err(bad(trimmed, "expected `take NAME = RESOURCE`"));
    };
    let binder = binder.trim();
    if !is_identifier(binder) {
        return Err(bad(trimmed, "take binder must be an identifier"));
    }
    Ok(Clause::Take {
        binder: binder.to_string(),
        resource: parse_resource(resource)?,
    })
}

/// Parse `Owned<S>(p)` or `P(p)`.
pub fn parse_resource(src: &str) -> Result<Resource, DefinitionError> {
    let src = src.trim();
    if let Some(rest) = src.strip_prefix("Owned")
        && let Some(rest) = rest.trim_start().strip_prefix('<')
    {
        let Some((layout, ptr)) = rest.split_once('>') else {
            return Err(bad(src, "unterminated `Owned<...>`"));
        };
        let layout = layout.trim();
        let layout = layout.strip_prefix("struct ").unwrap_or(layout).trim();
        if !is_identifier(layout) {
            return Err(bad(src, "Owned layout must be a struct name"));
        }
        let ptr = ptr.trim();
        if !(ptr.starts_with('(') && ptr.ends_with(')')) {
            return Err(bad(src, "expected `Owned<S>(pointer)`"));
        }
        return Ok(Resource::Owned {
            layout: layout.to_string(),
            ptr: parse_term(ptr)?,
        });
    }

    match parse_term(src)? {
        Term::App(name, mut args) if args.len() == 1 => Ok(Resource::Predicate {
            name,
            ptr: args.remove(0),
        }),
        _ => Err(bad(src, "expected `Predicate(pointer)`")),
    }
}

/// Parse a sort name (`integer`, `pointer`, `datatype seq`, ...).
pub fn parse_sort(src: &str) -> Result<Sort, DefinitionError> {
    src.parse::<Sort>().map_err(|msg| bad(src, &msg))
}

fn bad(src: &str, message: &str) -> DefinitionError {
    DefinitionError::BadExpression {
        source: src.to_string(),
        message: message.to_string(),
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

// ---------------------------------------------------------------------------
// syn conversion
// ---------------------------------------------------------------------------

fn convert_expr(expr: &Expr) -> Result<Term, String> {
    match expr {
        Expr::Lit(lit_expr) => convert_lit(&lit_expr.lit),

        Expr::Path(path_expr) => {
            let ident = path_expr
                .path
                .get_ident()
                .ok_or_else(|| "qualified paths are not supported".to_string())?;
            Ok(match ident.to_string().as_str() {
                "NULL" => Term::Null,
                name => Term::var(name),
            })
        }

        Expr::Return(ret) if ret.expr.is_none() => Ok(Term::var("return")),

        Expr::Binary(bin_expr) => {
            let left = convert_expr(&bin_expr.left)?;
            let right = convert_expr(&bin_expr.right)?;
            convert_binop(&bin_expr.op, left, right)
        }

        Expr::Unary(unary_expr) => {
            let inner = convert_expr(&unary_expr.expr)?;
            match unary_expr.op {
                SynUnOp::Not(_) => Ok(Term::not(inner)),
                SynUnOp::Neg(_) => Ok(match inner {
                    Term::IntLit(n) => Term::IntLit(-n),
                    other => Term::Neg(Box::new(other)),
                }),
                _ => Err("unsupported unary operator".to_string()),
            }
        }

        Expr::Paren(paren_expr) => convert_expr(&paren_expr.expr),
        Expr::Group(group_expr) => convert_expr(&group_expr.expr),

        Expr::Field(field_expr) => match &field_expr.member {
            syn::Member::Named(ident) => Ok(Term::field(
                convert_expr(&field_expr.base)?,
                ident.to_string(),
            )),
            syn::Member::Unnamed(_) => Err("tuple fields are not supported".to_string()),
        },

        Expr::Call(call_expr) => {
            let Expr::Path(path) = &*call_expr.func else {
                return Err("call target must be a function name".to_string());
            };
            let name = path
                .path
                .get_ident()
                .ok_or_else(|| "qualified function names are not supported".to_string())?
                .to_string();
            let args = call_expr
                .args
                .iter()
                .map(convert_expr)
                .collect::<Result<Vec<_>, _>>()?;
            if name == "implies" {
                let [a, b]: [Term; 2] = args
                    .try_into()
                    .map_err(|_| "implies takes two arguments".to_string())?;
                return Ok(Term::Implies(Box::new(a), Box::new(b)));
            }
            Ok(Term::App(name, args))
        }

        Expr::Struct(struct_expr) => {
            if struct_expr.rest.is_some() {
                return Err("struct update syntax is not supported".to_string());
            }
            let name = last_segment(&struct_expr.path)?;
            let mut fields = Vec::new();
            for fv in &struct_expr.fields {
                let syn::Member::Named(ident) = &fv.member else {
                    return Err("constructor fields must be named".to_string());
                };
                fields.push((ident.to_string(), convert_expr(&fv.expr)?));
            }
            Ok(Term::Ctor { name, fields })
        }

        Expr::If(if_expr) => {
            let cond = convert_expr(&if_expr.cond)?;
            let then_term = convert_block(&if_expr.then_branch)?;
            let Some((_, else_expr)) = &if_expr.else_branch else {
                return Err("`if` needs an `else` branch".to_string());
            };
            let else_term = convert_expr(else_expr)?;
            Ok(Term::Ite(
                Box::new(cond),
                Box::new(then_term),
                Box::new(else_term),
            ))
        }

        Expr::Match(match_expr) => {
            let scrutinee = convert_expr(&match_expr.expr)?;
            let mut arms = Vec::new();
            for arm in &match_expr.arms {
                if arm.guard.is_some() {
                    return Err("match guards are not supported".to_string());
                }
                arms.push(MatchArm {
                    pattern: convert_pattern(&arm.pat)?,
                    body: convert_expr(&arm.body)?,
                });
            }
            Ok(Term::Match(Box::new(scrutinee), arms))
        }

        Expr::Block(block_expr) => convert_block(&block_expr.block),

        _ => Err("unsupported expression".to_string()),
    }
}

/// `{ let a = e1; let b = e2; body }`: bindings are substituted into the body.
fn convert_block(block: &syn::Block) -> Result<Term, String> {
    let mut bindings: Vec<(String, Term)> = Vec::new();
    let mut result = None;
    for (i, stmt) in block.stmts.iter().enumerate() {
        match stmt {
            Stmt::Local(local) => {
                let Pat::Ident(pat_ident) = &local.pat else {
                    return Err("`let` must bind a plain name".to_string());
                };
                let init = local
                    .init
                    .as_ref()
                    .ok_or_else(|| "`let` needs an initializer".to_string())?;
                bindings.push((pat_ident.ident.to_string(), convert_expr(&init.expr)?));
            }
            Stmt::Expr(expr, None) if i + 1 == block.stmts.len() => {
                result = Some(convert_expr(expr)?);
            }
            _ => return Err("unsupported statement in block".to_string()),
        }
    }
    let mut body = result.ok_or_else(|| "block has no result expression".to_string())?;
    for (name, value) in bindings.into_iter().rev() {
        body = body.substitute(&HashMap::from([(name, value)]));
    }
    Ok(body)
}

fn convert_pattern(pat: &Pat) -> Result<Pattern, String> {
    match pat {
        Pat::Wild(_) => Ok(Pattern::Wildcard),
        Pat::Ident(pat_ident) if pat_ident.subpat.is_none() => {
            Ok(Pattern::Bind(pat_ident.ident.to_string()))
        }
        Pat::Path(pat_path) => Ok(Pattern::Ctor {
            name: last_segment(&pat_path.path)?,
            fields: vec![],
        }),
        Pat::Struct(pat_struct) => {
            let mut fields = Vec::new();
            for fp in &pat_struct.fields {
                let syn::Member::Named(ident) = &fp.member else {
                    return Err("pattern fields must be named".to_string());
                };
                fields.push((ident.to_string(), convert_pattern(&fp.pat)?));
            }
            Ok(Pattern::Ctor {
                name: last_segment(&pat_struct.path)?,
                fields,
            })
        }
        _ => Err("unsupported pattern".to_string()),
    }
}

fn last_segment(path: &syn::Path) -> Result<String, String> {
    path.segments
        .last()
        .map(|seg| seg.ident.to_string())
        .ok_or_else(|| "empty path".to_string())
}

fn convert_lit(lit: &Lit) -> Result<Term, String> {
    match lit {
        Lit::Int(int_lit) => int_lit
            .base10_parse::<i128>()
            .map(Term::IntLit)
            .map_err(|e| e.to_string()),
        Lit::Bool(bool_lit) => Ok(Term::BoolLit(bool_lit.value)),
        _ => Err("unsupported literal".to_string()),
    }
}

fn convert_binop(op: &SynBinOp, left: Term, right: Term) -> Result<Term, String> {
    let (l, r) = (Box::new(left), Box::new(right));
    Ok(match op {
        SynBinOp::Add(_) => Term::Add(l, r),
        SynBinOp::Sub(_) => Term::Sub(l, r),
        SynBinOp::Mul(_) => Term::Mul(l, r),
        SynBinOp::Eq(_) => Term::Eq(l, r),
        SynBinOp::Ne(_) => Term::not(Term::Eq(l, r)),
        SynBinOp::Lt(_) => Term::Lt(l, r),
        SynBinOp::Le(_) => Term::Le(l, r),
        SynBinOp::Gt(_) => Term::Gt(l, r),
        SynBinOp::Ge(_) => Term::Ge(l, r),
        SynBinOp::And(_) => Term::And(vec![*l, *r]),
        SynBinOp::Or(_) => Term::Or(vec![*l, *r]),
        _ => return Err("unsupported binary operator".to_string()),
    })
}
