//! Ownership state of one symbolic-execution path.
//!
//! A path owns concrete heap cells (unfolded pointers) and folded predicate
//! instances. A pointer is in at most one of the two states: unfolding
//! consumes the instance before the cell is adopted, packing consumes the
//! cell before the instance is produced.

use std::fmt;

use sepcheck_logic::Term;
use sepcheck_solver::{Prover, ProverConfig};

use crate::heap_model::{Address, Heap};
use crate::ir::FreshNames;

/// A folded predicate instance: `predicate(root)` with abstract value `output`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateInstance {
    pub predicate: String,
    pub root: Term,
    pub output: Term,
}

impl fmt::Display for PredicateInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.predicate, self.root)
    }
}

/// How a pointer is currently owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoldState {
    /// Held abstractly by an instance of the named predicate.
    Folded(String),
    /// The concrete cell is owned.
    Unfolded(Address),
    Unowned,
}

impl fmt::Display for FoldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FoldState::Folded(predicate) => write!(f, "held folded as {predicate}"),
            FoldState::Unfolded(addr) => write!(f, "held as unfolded cell {addr}"),
            FoldState::Unowned => write!(f, "not owned"),
        }
    }
}

/// Heap, folded instances, facts and name supply of one path.
///
/// Cloned when the path forks.
#[derive(Debug, Clone)]
pub struct OwnershipContext {
    pub heap: Heap,
    pub prover: Prover,
    pub fresh: FreshNames,
    instances: Vec<PredicateInstance>,
}

impl OwnershipContext {
    pub fn new(config: ProverConfig) -> Self {
        Self {
            heap: Heap::new(),
            prover: Prover::new(config),
            fresh: FreshNames::new(),
            instances: Vec::new(),
        }
    }

    pub fn instances(&self) -> &[PredicateInstance] {
        &self.instances
    }

    pub fn add_instance(&mut self, instance: PredicateInstance) {
        tracing::debug!(instance = %instance, output = %instance.output, "Add predicate instance");
        self.instances.push(instance);
    }

    /// Index of the instance of `predicate` rooted at `ptr`, if any.
    pub fn find_instance(&self, predicate: &str, ptr: &Term) -> Option<usize> {
        let normalized = self.prover.normalize(ptr);
        let candidates = || {
            self.instances
                .iter()
                .enumerate()
                .filter(|(_, inst)| inst.predicate == predicate)
        };
        if let Some((i, _)) = candidates()
            .find(|(_, inst)| inst.root == *ptr || self.prover.normalize(&inst.root) == normalized)
        {
            return Some(i);
        }
        candidates()
            .find(|(_, inst)| {
                self.prover
                    .entails(&Term::eq(normalized.clone(), inst.root.clone()))
                    .is_proved()
            })
            .map(|(i, _)| i)
    }

    /// Remove and return the instance of `predicate` rooted at `ptr`.
    pub fn take_instance(&mut self, predicate: &str, ptr: &Term) -> Option<PredicateInstance> {
        let index = self.find_instance(predicate, ptr)?;
        Some(self.instances.remove(index))
    }

    /// How `ptr` is owned right now, for diagnostics.
    pub fn fold_state(&self, ptr: &Term) -> FoldState {
        if let Some(addr) = self.heap.find(ptr, &self.prover) {
            return FoldState::Unfolded(addr);
        }
        let normalized = self.prover.normalize(ptr);
        self.instances
            .iter()
            .find(|inst| {
                inst.root == normalized
                    || self
                        .prover
                        .entails(&Term::eq(normalized.clone(), inst.root.clone()))
                        .is_proved()
            })
            .map(|inst| FoldState::Folded(inst.predicate.clone()))
            .unwrap_or(FoldState::Unowned)
    }

    pub fn is_null(&self, ptr: &Term) -> bool {
        self.prover
            .entails(&Term::eq(ptr.clone(), Term::Null))
            .is_proved()
    }

    pub fn is_non_null(&self, ptr: &Term) -> bool {
        self.prover
            .entails(&Term::ne(ptr.clone(), Term::Null))
            .is_proved()
    }

    /// Ownership still held: every live cell and every instance whose root is
    /// not provably `NULL`.
    pub fn leftovers(&self) -> Vec<String> {
        let cells = self
            .heap
            .iter()
            .map(|(_, cell)| format!("Owned<{}>({})", cell.layout, cell.root));
        let instances = self
            .instances
            .iter()
            .filter(|inst| !self.is_null(&inst.root))
            .map(|inst| inst.to_string());
        cells.chain(instances).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(root: Term, output: Term) -> PredicateInstance {
        PredicateInstance {
            predicate: "IntList".to_string(),
            root,
            output,
        }
    }

    #[test]
    fn instances_found_through_equalities() {
        let mut ctx = OwnershipContext::new(ProverConfig::default());
        ctx.add_instance(instance(Term::var("xs"), Term::var("L")));
        ctx.prover.assume(Term::eq(Term::var("ys"), Term::var("xs")));
        assert_eq!(ctx.find_instance("IntList", &Term::var("ys")), Some(0));
        assert_eq!(ctx.find_instance("Tree", &Term::var("xs")), None);
        assert_eq!(
            ctx.fold_state(&Term::var("ys")),
            FoldState::Folded("IntList".to_string())
        );
        let taken = ctx.take_instance("IntList", &Term::var("xs")).unwrap();
        assert_eq!(taken.output, Term::var("L"));
        assert!(ctx.instances().is_empty());
        assert_eq!(ctx.fold_state(&Term::var("xs")), FoldState::Unowned);
    }

    #[test]
    fn cells_are_unfolded() {
        let mut ctx = OwnershipContext::new(ProverConfig::default());
        let addr = ctx
            .heap
            .adopt(Term::var("p"), "int_list", Term::var("H"), &mut ctx.prover)
            .unwrap();
        assert_eq!(ctx.fold_state(&Term::var("p")), FoldState::Unfolded(addr));
        assert!(ctx.is_non_null(&Term::var("p")));
    }

    #[test]
    fn null_instances_are_not_leftovers() {
        let mut ctx = OwnershipContext::new(ProverConfig::default());
        ctx.add_instance(instance(Term::Null, Term::int(0)));
        ctx.add_instance(instance(Term::var("xs"), Term::var("L")));
        assert_eq!(ctx.leftovers(), vec!["IntList(xs)".to_string()]);
    }
}
