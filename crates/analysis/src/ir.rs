/// Intermediate representation of annotated programs.
///
/// Definitions (structs, datatypes, logical functions, predicates, lemmas)
/// and procedures whose bodies are flat step lists with structured
/// branching. Annotation expressions are already parsed into [`Term`]s.
use std::collections::HashMap;
use std::fmt;

use sepcheck_logic::{Sort, Term};

/// A struct layout: the shape of one heap cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDef {
    pub name: String,
    /// Field names in declaration order.
    pub fields: Vec<String>,
}

impl StructDef {
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }
}

/// One constructor of a datatype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDef {
    pub name: String,
    pub fields: Vec<String>,
}

/// An algebraic datatype such as `seq`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatatypeDef {
    pub name: String,
    pub variants: Vec<VariantDef>,
}

/// A logical (specification-only) function.
///
/// `body == None` declares an uninterpreted function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicFunction {
    pub name: String,
    pub params: Vec<(String, Sort)>,
    pub result: Sort,
    pub body: Option<Term>,
}

/// `take binder = predicate(arg)` inside a predicate's node case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateTake {
    pub binder: String,
    pub predicate: String,
    pub arg: Term,
}

/// The non-null case of a predicate: one owned cell plus recursive takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCase {
    /// Name bound to the value of the cell owned at the root.
    pub cell: String,
    /// Struct layout of that cell.
    pub layout: String,
    pub takes: Vec<PredicateTake>,
    /// Pure facts that hold of the node.
    pub asserts: Vec<Term>,
    /// Output value, over `cell` and the take binders.
    pub output: Term,
}

/// A recursive ownership predicate over one root pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateDef {
    pub name: String,
    /// The root pointer parameter.
    pub param: String,
    pub output_sort: Sort,
    /// Output when the root is `NULL`; owns nothing.
    pub null_case: Term,
    pub node: NodeCase,
}

impl PredicateDef {
    /// Substitution binding the root parameter and the node cell.
    ///
    /// Callers extend it with take binders before instantiating the asserts
    /// and the output.
    pub fn bind_cell(&self, root: &Term, cell_value: &Term) -> HashMap<String, Term> {
        HashMap::from([
            (self.param.clone(), root.clone()),
            (self.node.cell.clone(), cell_value.clone()),
        ])
    }
}

/// An ownership resource named by a `take` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// `Owned<layout>(ptr)`: a single struct cell.
    Owned { layout: String, ptr: Term },
    /// `name(ptr)`: a predicate instance.
    Predicate { name: String, ptr: Term },
}

impl Resource {
    pub fn ptr(&self) -> &Term {
        match self {
            Resource::Owned { ptr, .. } | Resource::Predicate { ptr, .. } => ptr,
        }
    }

    pub fn substitute(&self, map: &HashMap<String, Term>) -> Resource {
        match self {
            Resource::Owned { layout, ptr } => Resource::Owned {
                layout: layout.clone(),
                ptr: ptr.substitute(map),
            },
            Resource::Predicate { name, ptr } => Resource::Predicate {
                name: name.clone(),
                ptr: ptr.substitute(map),
            },
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Owned { layout, ptr } => write!(f, "Owned<{layout}>({ptr})"),
            Resource::Predicate { name, ptr } => write!(f, "{name}({ptr})"),
        }
    }
}

/// One `requires` / `ensures` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Take { binder: String, resource: Resource },
    Pure(Term),
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Take { binder, resource } => write!(f, "take {binder} = {resource}"),
            Clause::Pure(term) => write!(f, "{term}"),
        }
    }
}

/// Pre- and postconditions of a procedure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contract {
    pub requires: Vec<Clause>,
    pub ensures: Vec<Clause>,
}

/// A user-proved fact, admitted as an axiom when applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LemmaDef {
    pub name: String,
    pub params: Vec<(String, Sort)>,
    pub requires: Vec<Term>,
    pub ensures: Vec<Term>,
}

/// A procedure to be checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Procedure {
    pub name: String,
    pub params: Vec<(String, Sort)>,
    pub contract: Contract,
    pub body: Vec<Step>,
}

impl Procedure {
    pub fn param_names(&self) -> Vec<String> {
        self.params.iter().map(|(n, _)| n.clone()).collect()
    }
}

/// One operation in a procedure body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// `let dest = value;`
    Let { dest: String, value: Term },
    /// `dest = malloc(sizeof(struct layout));`
    Alloc { dest: String, layout: String },
    /// `dest = ptr->field;`
    Read { dest: String, ptr: Term, field: String },
    /// `ptr->field = value;`
    Write { ptr: Term, field: String, value: Term },
    /// `free(ptr);`
    Dispose { ptr: Term },
    /// `unpack predicate(ptr);` on a non-null pointer.
    Unfold { predicate: String, ptr: Term },
    /// `unpack predicate(ptr);` on a null pointer.
    BaseCase { predicate: String, ptr: Term },
    /// `pack predicate(ptr);`
    Pack { predicate: String, ptr: Term },
    ApplyLemma { lemma: String, args: Vec<Term> },
    /// `unfold f(args);` on a logical function.
    UnfoldFunction { function: String, args: Vec<Term> },
    Call {
        dest: Option<String>,
        function: String,
        args: Vec<Term>,
    },
    Assert { condition: Term },
    If {
        condition: Term,
        then_branch: Vec<Step>,
        else_branch: Vec<Step>,
    },
    Return { value: Option<Term> },
    /// `instantiate` / `extract` annotations.
    Hint { text: String },
}

impl Step {
    /// Short operation name, for logs.
    pub fn op_name(&self) -> &'static str {
        match self {
            Step::Let { .. } => "let",
            Step::Alloc { .. } => "alloc",
            Step::Read { .. } => "read",
            Step::Write { .. } => "write",
            Step::Dispose { .. } => "dispose",
            Step::Unfold { .. } => "unfold",
            Step::BaseCase { .. } => "base_case",
            Step::Pack { .. } => "pack",
            Step::ApplyLemma { .. } => "apply_lemma",
            Step::UnfoldFunction { .. } => "unfold_function",
            Step::Call { .. } => "call",
            Step::Assert { .. } => "assert",
            Step::If { .. } => "if",
            Step::Return { .. } => "return",
            Step::Hint { .. } => "hint",
        }
    }
}

/// Generator of path-local variable names.
///
/// Generated names carry a `$` suffix, which annotation syntax cannot
/// spell, so they never collide with user names.
#[derive(Debug, Clone, Default)]
pub struct FreshNames {
    next: usize,
}

impl FreshNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self, base: &str) -> String {
        self.next += 1;
        let base = base.split('$').next().unwrap_or(base);
        format!("{base}${}", self.next)
    }

    pub fn fresh_var(&mut self, base: &str) -> Term {
        Term::Var(self.fresh(base))
    }
}
