//! Registry of recursive ownership predicates.
//!
//! Predicates are registered once at load time. Registration checks that
//! self-recursion is well-founded on pointer structure; [`PredicateStore::seal`]
//! resolves forward references and repeats the check for mutual recursion
//! once every definition is in.
use std::collections::{HashMap, HashSet};

use sepcheck_logic::Term;

use crate::error::DefinitionError;
use crate::ir::{PredicateDef, PredicateTake};
use crate::type_db::TypeDatabase;

/// Maps predicate name → [`PredicateDef`].
#[derive(Debug, Clone, Default)]
pub struct PredicateStore {
    predicates: HashMap<String, PredicateDef>,
}

impl PredicateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a predicate.
    ///
    /// A take of the predicate itself must be rooted at a field of the cell
    /// owned at the root, so each unfolding strictly descends. Takes of other
    /// predicates may be rooted anywhere unless they recurse back, which
    /// [`PredicateStore::seal`] checks.
    pub fn define(&mut self, def: PredicateDef) -> Result<(), DefinitionError> {
        if self.predicates.contains_key(&def.name) {
            return Err(DefinitionError::DuplicateDefinition {
                kind: "predicate",
                name: def.name,
            });
        }
        for take in def.node.takes.iter().filter(|t| t.predicate == def.name) {
            check_descends(&def, take)?;
        }
        tracing::debug!(predicate = %def.name, takes = def.node.takes.len(), "Registered predicate");
        self.predicates.insert(def.name.clone(), def);
        Ok(())
    }

    /// Look up a predicate by name.
    pub fn lookup(&self, name: &str) -> Result<&PredicateDef, DefinitionError> {
        self.predicates
            .get(name)
            .ok_or_else(|| DefinitionError::UnknownPredicate(name.to_string()))
    }

    /// Check cross-references once all definitions are registered.
    pub fn seal(&self, types: &TypeDatabase) -> Result<(), DefinitionError> {
        for def in self.iter() {
            let layout = types.struct_def(&def.node.layout)?;
            for take in &def.node.takes {
                self.lookup(&take.predicate)?;
                if self.reaches(&take.predicate, &def.name) {
                    check_descends(def, take)?;
                }
                if let Term::Field(_, field) = &take.arg
                    && !layout.has_field(field)
                {
                    return Err(DefinitionError::NonWellFounded {
                        predicate: def.name.clone(),
                        reason: format!("struct {} has no field {field}", layout.name),
                    });
                }
            }
        }
        Ok(())
    }

    /// True if unfolding `from` can eventually produce an instance of `to`.
    fn reaches(&self, from: &str, to: &str) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![from];
        while let Some(name) = stack.pop() {
            if name == to {
                return true;
            }
            if !seen.insert(name) {
                continue;
            }
            if let Some(def) = self.predicates.get(name) {
                stack.extend(def.node.takes.iter().map(|t| t.predicate.as_str()));
            }
        }
        false
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Definitions in name order.
    pub fn iter(&self) -> impl Iterator<Item = &PredicateDef> {
        let mut defs: Vec<&PredicateDef> = self.predicates.values().collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs.into_iter()
    }
}

fn check_descends(def: &PredicateDef, take: &PredicateTake) -> Result<(), DefinitionError> {
    let descends = matches!(
        &take.arg,
        Term::Field(base, _) if **base == Term::Var(def.node.cell.clone())
    );
    if descends {
        return Ok(());
    }
    Err(DefinitionError::NonWellFounded {
        predicate: def.name.clone(),
        reason: format!(
            "take {} = {}({}) is not rooted at a field of {}",
            take.binder, take.predicate, take.arg, def.node.cell
        ),
    })
}
