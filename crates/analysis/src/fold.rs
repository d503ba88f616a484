//! Fold/unfold of predicate instances, one level at a time.
//!
//! - `unfold` turns a folded instance at a non-null root into the owned root
//!   cell plus one folded instance per recursive take
//! - `base_case` consumes an instance at a null root
//! - `pack` is the inverse of `unfold`
//!
//! Each operation touches only the root it names; sub-pointers keep their
//! own fold states.

use std::collections::HashMap;

use sepcheck_logic::Term;

use crate::error::CheckError;
use crate::heap_model::Address;
use crate::ir::PredicateDef;
use crate::ownership::{OwnershipContext, PredicateInstance};
use crate::predicate_db::PredicateStore;

pub struct FoldEngine<'a> {
    predicates: &'a PredicateStore,
}

impl<'a> FoldEngine<'a> {
    pub fn new(predicates: &'a PredicateStore) -> Self {
        Self { predicates }
    }

    /// Open the instance of `predicate` at `ptr`. Returns the root cell.
    pub fn unfold(
        &self,
        ctx: &mut OwnershipContext,
        predicate: &str,
        ptr: &Term,
    ) -> Result<Address, CheckError> {
        let def = self.predicates.lookup(predicate)?;
        if ctx.find_instance(predicate, ptr).is_none() {
            return Err(incomplete(ctx, predicate, ptr));
        }
        if !ctx.is_non_null(ptr) {
            return Err(CheckError::UnfoldOnNull {
                predicate: predicate.to_string(),
                ptr: ptr.clone(),
            });
        }
        let instance = ctx
            .take_instance(predicate, ptr)
            .ok_or_else(|| incomplete(ctx, predicate, ptr))?;

        let cell = ctx.fresh.fresh_var(&def.node.cell);
        let addr = ctx.heap.adopt(
            instance.root.clone(),
            &def.node.layout,
            cell.clone(),
            &mut ctx.prover,
        )?;

        let mut subst = def.bind_cell(&instance.root, &cell);
        for take in &def.node.takes {
            let output = ctx.fresh.fresh_var(&take.binder);
            ctx.add_instance(PredicateInstance {
                predicate: take.predicate.clone(),
                root: take.arg.substitute(&subst),
                output: output.clone(),
            });
            subst.insert(take.binder.clone(), output);
        }
        for fact in &def.node.asserts {
            ctx.prover.assume(fact.substitute(&subst));
        }
        ctx.prover
            .assume(Term::eq(instance.output, def.node.output.substitute(&subst)));
        tracing::debug!(predicate, ptr = %ptr, addr = %addr, "Unfold");
        Ok(addr)
    }

    /// Consume the instance of `predicate` at a provably null `ptr`.
    pub fn base_case(
        &self,
        ctx: &mut OwnershipContext,
        predicate: &str,
        ptr: &Term,
    ) -> Result<(), CheckError> {
        let def = self.predicates.lookup(predicate)?;
        if ctx.find_instance(predicate, ptr).is_none() {
            return Err(incomplete(ctx, predicate, ptr));
        }
        if !ctx.is_null(ptr) {
            return Err(CheckError::PreconditionUnmet {
                name: predicate.to_string(),
                condition: Term::eq(ptr.clone(), Term::Null),
            });
        }
        let instance = ctx
            .take_instance(predicate, ptr)
            .ok_or_else(|| incomplete(ctx, predicate, ptr))?;
        ctx.prover
            .assume(Term::eq(instance.output, null_output(def, &instance.root)));
        tracing::debug!(predicate, ptr = %ptr, "Base case");
        Ok(())
    }

    /// Fold the cell at `ptr` and its sub-instances into one instance.
    ///
    /// Returns the output of the new instance.
    pub fn pack(
        &self,
        ctx: &mut OwnershipContext,
        predicate: &str,
        ptr: &Term,
    ) -> Result<Term, CheckError> {
        let def = self.predicates.lookup(predicate)?;
        let root = ctx.prover.normalize(ptr);
        if ctx.is_null(&root) {
            let output = null_output(def, &root);
            ctx.add_instance(PredicateInstance {
                predicate: predicate.to_string(),
                root,
                output: output.clone(),
            });
            return Ok(output);
        }

        let addr = ctx
            .heap
            .resolve(&root, &ctx.prover)
            .map_err(|_| incomplete(ctx, predicate, ptr))?;
        if ctx.heap.read(addr)?.layout != def.node.layout {
            return Err(incomplete(ctx, predicate, ptr));
        }
        let cell = ctx.heap.take(addr)?;

        let mut subst = def.bind_cell(&root, &cell.value);
        for take in &def.node.takes {
            let arg = ctx.prover.normalize(&take.arg.substitute(&subst));
            let output = if let Some(instance) = ctx.take_instance(&take.predicate, &arg) {
                instance.output
            } else if ctx.is_null(&arg) {
                null_output(self.predicates.lookup(&take.predicate)?, &arg)
            } else {
                return Err(incomplete(ctx, &take.predicate, &arg));
            };
            subst.insert(take.binder.clone(), output);
        }
        for fact in &def.node.asserts {
            let condition = fact.substitute(&subst);
            if !ctx.prover.entails(&condition).is_proved() {
                return Err(CheckError::AssertionFailed { condition });
            }
        }

        let output = ctx.prover.normalize(&def.node.output.substitute(&subst));
        tracing::debug!(predicate, ptr = %ptr, output = %output, "Pack");
        ctx.add_instance(PredicateInstance {
            predicate: predicate.to_string(),
            root,
            output: output.clone(),
        });
        Ok(output)
    }
}

/// Output of `def` at a null root.
pub fn null_output(def: &PredicateDef, root: &Term) -> Term {
    def.null_case
        .substitute(&HashMap::from([(def.param.clone(), root.clone())]))
}

fn incomplete(ctx: &OwnershipContext, predicate: &str, ptr: &Term) -> CheckError {
    CheckError::IncompleteOwnership {
        predicate: predicate.to_string(),
        ptr: ptr.clone(),
        held: ctx.fold_state(ptr),
    }
}
