//! Procedure contracts for inter-procedural checking.
//!
//! A call never looks at the callee's body. The caller consumes the callee's
//! `requires` with arguments substituted for formals, binds a fresh return
//! value and produces the callee's `ensures` with fresh binder names.

use std::collections::HashMap;

use crate::error::DefinitionError;
use crate::ir::{Clause, Contract, Procedure};

/// What a caller needs to know about a procedure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionSummary {
    pub contract: Contract,
    /// Formal parameter names, in order.
    pub param_names: Vec<String>,
}

impl FunctionSummary {
    pub fn of(procedure: &Procedure) -> Self {
        Self {
            contract: procedure.contract.clone(),
            param_names: procedure.param_names(),
        }
    }

    /// Number of ownership takes the caller gives up.
    pub fn consumed_resources(&self) -> usize {
        self.contract
            .requires
            .iter()
            .filter(|c| matches!(c, Clause::Take { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContractDatabase {
    summaries: HashMap<String, FunctionSummary>,
}

impl ContractDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the summary of `procedure`. Names are unique.
    pub fn define(&mut self, procedure: &Procedure) -> Result<(), DefinitionError> {
        if self.summaries.contains_key(&procedure.name) {
            return Err(DefinitionError::DuplicateDefinition {
                kind: "procedure",
                name: procedure.name.clone(),
            });
        }
        self.summaries
            .insert(procedure.name.clone(), FunctionSummary::of(procedure));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&FunctionSummary, DefinitionError> {
        self.summaries
            .get(name)
            .ok_or_else(|| DefinitionError::UnknownFunction(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.summaries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    /// Procedure names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.summaries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Resource;
    use sepcheck_logic::{Sort, Term};

    fn rev_tree() -> Procedure {
        Procedure {
            name: "rev_tree".to_string(),
            params: vec![("t".to_string(), Sort::Pointer)],
            contract: Contract {
                requires: vec![Clause::Take {
                    binder: "T".to_string(),
                    resource: Resource::Predicate {
                        name: "Tree".to_string(),
                        ptr: Term::var("t"),
                    },
                }],
                ensures: vec![
                    Clause::Take {
                        binder: "T2".to_string(),
                        resource: Resource::Predicate {
                            name: "Tree".to_string(),
                            ptr: Term::var("return"),
                        },
                    },
                    Clause::Pure(Term::eq(
                        Term::field(Term::var("T2"), "size"),
                        Term::field(Term::var("T"), "size"),
                    )),
                ],
            },
            body: vec![],
        }
    }

    #[test]
    fn unknown_procedures_are_reported() {
        let db = ContractDatabase::new();
        assert!(db.is_empty());
        assert!(!db.contains("foo"));
        assert_eq!(
            db.lookup("foo").unwrap_err(),
            DefinitionError::UnknownFunction("foo".to_string())
        );
    }

    #[test]
    fn summaries_carry_contract_and_formals() {
        let mut db = ContractDatabase::new();
        db.define(&rev_tree()).unwrap();
        assert_eq!(db.len(), 1);
        assert_eq!(db.names(), vec!["rev_tree"]);

        let summary = db.lookup("rev_tree").unwrap();
        assert_eq!(summary.param_names, vec!["t"]);
        assert_eq!(summary.contract.ensures.len(), 2);
        assert_eq!(summary.consumed_resources(), 1);
    }

    #[test]
    fn duplicate_procedures_are_rejected() {
        let mut db = ContractDatabase::new();
        db.define(&rev_tree()).unwrap();
        assert_eq!(
            db.define(&rev_tree()),
            Err(DefinitionError::DuplicateDefinition {
                kind: "procedure",
                name: "rev_tree".to_string(),
            })
        );
    }
}
