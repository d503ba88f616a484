use std::fmt;

use sepcheck_logic::Term;

use crate::ownership::FoldState;

/// Errors raised while registering definitions. Fatal to loading a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// A definition of the same kind and name already exists.
    DuplicateDefinition { kind: &'static str, name: String },
    /// A predicate name that was never defined.
    UnknownPredicate(String),
    /// A recursive take that does not strictly descend into the owned cell.
    NonWellFounded { predicate: String, reason: String },
    UnknownStruct(String),
    UnknownDatatype(String),
    UnknownLemma(String),
    /// A logical function or procedure name that was never defined.
    UnknownFunction(String),
    /// Annotation text that does not parse or uses unsupported syntax.
    BadExpression { source: String, message: String },
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionError::DuplicateDefinition { kind, name } => {
                write!(f, "Duplicate {kind} definition: {name}")
            }
            DefinitionError::UnknownPredicate(name) => write!(f, "Unknown predicate: {name}"),
            DefinitionError::NonWellFounded { predicate, reason } => {
                write!(f, "Predicate {predicate} is not well-founded: {reason}")
            }
            DefinitionError::UnknownStruct(name) => write!(f, "Unknown struct: {name}"),
            DefinitionError::UnknownDatatype(name) => write!(f, "Unknown datatype: {name}"),
            DefinitionError::UnknownLemma(name) => write!(f, "Unknown lemma: {name}"),
            DefinitionError::UnknownFunction(name) => write!(f, "Unknown function: {name}"),
            DefinitionError::BadExpression { source, message } => {
                write!(f, "Bad expression `{source}`: {message}")
            }
        }
    }
}

impl std::error::Error for DefinitionError {}

/// Errors raised while checking one path of a procedure.
///
/// Fatal to the path that raised them, never to the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// The pointer does not resolve to a cell owned by the current context.
    NotOwned { ptr: Term },
    /// The pointer resolves to a cell that was already disposed.
    UseAfterDispose { ptr: Term },
    /// Unfolding a pointer that is (or may be) null.
    UnfoldOnNull { predicate: String, ptr: Term },
    /// A required cell or predicate instance is not owned. `held` is how the
    /// context owns `ptr` instead.
    IncompleteOwnership {
        predicate: String,
        ptr: Term,
        held: FoldState,
    },
    /// A lemma or callee precondition could not be proved.
    PreconditionUnmet { name: String, condition: Term },
    /// A new ownership token would reference an already-owned address.
    AliasedOwnership { ptr: Term },
    UnknownField { layout: String, field: String },
    ArityMismatch { name: String, expected: usize, found: usize },
    AssertionFailed { condition: Term },
    PostconditionUnmet { condition: Term },
    /// Ownership left over when the procedure returns.
    LeakedOwnership { resource: String },
    /// Unfolding a logical function that has no body.
    OpaqueFunction(String),
    /// The procedure forks into more paths than the configured limit.
    PathLimitExceeded { limit: usize },
    Definition(DefinitionError),
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::NotOwned { ptr } => write!(f, "Pointer {ptr} is not owned"),
            CheckError::UseAfterDispose { ptr } => {
                write!(f, "Pointer {ptr} used after dispose")
            }
            CheckError::UnfoldOnNull { predicate, ptr } => {
                write!(f, "Cannot unfold {predicate}({ptr}): pointer may be NULL")
            }
            CheckError::IncompleteOwnership {
                predicate,
                ptr,
                held,
            } => write!(f, "Missing ownership of {predicate}({ptr}): {held}"),
            CheckError::PreconditionUnmet { name, condition } => {
                write!(f, "Precondition of {name} not met: {condition}")
            }
            CheckError::AliasedOwnership { ptr } => {
                write!(f, "Pointer {ptr} is already owned")
            }
            CheckError::UnknownField { layout, field } => {
                write!(f, "Struct {layout} has no field {field}")
            }
            CheckError::ArityMismatch {
                name,
                expected,
                found,
            } => write!(f, "{name} expects {expected} argument(s), found {found}"),
            CheckError::AssertionFailed { condition } => {
                write!(f, "Assertion failed: {condition}")
            }
            CheckError::PostconditionUnmet { condition } => {
                write!(f, "Postcondition not met: {condition}")
            }
            CheckError::LeakedOwnership { resource } => {
                write!(f, "Ownership leaked at return: {resource}")
            }
            CheckError::OpaqueFunction(name) => {
                write!(f, "Cannot unfold {name}: function has no body")
            }
            CheckError::PathLimitExceeded { limit } => {
                write!(f, "Path limit of {limit} exceeded")
            }
            CheckError::Definition(err) => write!(f, "{err}"),
        }
    }
}

impl CheckError {
    /// Stable snake_case name of the error kind, used in machine-readable reports.
    pub fn kind(&self) -> &'static str {
        match self {
            CheckError::NotOwned { .. } => "not_owned",
            CheckError::UseAfterDispose { .. } => "use_after_dispose",
            CheckError::UnfoldOnNull { .. } => "unfold_on_null",
            CheckError::IncompleteOwnership { .. } => "incomplete_ownership",
            CheckError::PreconditionUnmet { .. } => "precondition_unmet",
            CheckError::AliasedOwnership { .. } => "aliased_ownership",
            CheckError::UnknownField { .. } => "unknown_field",
            CheckError::ArityMismatch { .. } => "arity_mismatch",
            CheckError::AssertionFailed { .. } => "assertion_failed",
            CheckError::PostconditionUnmet { .. } => "postcondition_unmet",
            CheckError::LeakedOwnership { .. } => "leaked_ownership",
            CheckError::OpaqueFunction(_) => "opaque_function",
            CheckError::PathLimitExceeded { .. } => "path_limit_exceeded",
            CheckError::Definition(_) => "definition",
        }
    }
}

impl std::error::Error for CheckError {}

impl From<DefinitionError> for CheckError {
    fn from(err: DefinitionError) -> Self {
        CheckError::Definition(err)
    }
}

/// Errors raised while loading a program document.
#[derive(Debug)]
pub enum LoadError {
    /// The document is not valid JSON or does not match the program schema.
    Json(serde_json::Error),
    Definition(DefinitionError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Json(err) => write!(f, "Malformed program document: {err}"),
            LoadError::Definition(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Json(err) => Some(err),
            LoadError::Definition(err) => Some(err),
        }
    }
}

impl PartialEq for LoadError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LoadError::Json(a), LoadError::Json(b)) => a.to_string() == b.to_string(),
            (LoadError::Definition(a), LoadError::Definition(b)) => a == b,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        LoadError::Json(err)
    }
}

impl From<DefinitionError> for LoadError {
    fn from(err: DefinitionError) -> Self {
        LoadError::Definition(err)
    }
}
