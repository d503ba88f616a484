//! Verification-condition checker.
//!
//! Each procedure is symbolically executed against its own contract:
//! `Entry → {Step}* → Exit`. The entry produces the precondition's
//! resources and facts, every step transforms the path's
//! [`OwnershipContext`], and the exit consumes the postcondition and
//! requires that nothing else is left owned.
//!
//! Branches whose condition the prover cannot decide fork the path; each
//! fork carries a clone of the context. A path whose facts become
//! contradictory is infeasible and ends without failures.

use std::collections::{HashMap, HashSet};
use std::fmt;

use sepcheck_logic::Term;

use crate::config::CheckerConfig;
use crate::error::CheckError;
use crate::fold::{FoldEngine, null_output};
use crate::ir::{Clause, Procedure, Resource, Step};
use crate::lemma::{apply_lemma, unfold_function};
use crate::ownership::{OwnershipContext, PredicateInstance};
use crate::program::Program;

/// Name of the return value in postconditions.
pub const RETURN_VAR: &str = "return";

/// Statement list a step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Block {
    Body,
    Then,
    Else,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::Body => write!(f, "body"),
            Block::Then => write!(f, "then"),
            Block::Else => write!(f, "else"),
        }
    }
}

/// Where in a procedure a failure happened.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StepLocation {
    Entry,
    /// Index path through nested branches, outermost first.
    Step(Vec<(Block, usize)>),
    Exit,
}

impl fmt::Display for StepLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepLocation::Entry => write!(f, "entry"),
            StepLocation::Exit => write!(f, "exit"),
            StepLocation::Step(segments) => {
                for (i, (block, index)) in segments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{block}[{index}]")?;
                }
                Ok(())
            }
        }
    }
}

/// One failed obligation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub function: String,
    pub location: StepLocation,
    pub error: CheckError,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.function, self.location, self.error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Verified,
    Failed(Vec<Failure>),
}

impl Verdict {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verdict::Verified)
    }

    pub fn failures(&self) -> &[Failure] {
        match self {
            Verdict::Verified => &[],
            Verdict::Failed(failures) => failures,
        }
    }
}

/// Result of checking one procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionReport {
    pub function: String,
    pub verdict: Verdict,
    /// Number of paths explored.
    pub paths: usize,
}

/// Check one procedure of `program`.
pub fn check_procedure(
    program: &Program,
    procedure: &Procedure,
    config: &CheckerConfig,
) -> FunctionReport {
    Checker::new(program, config).check(procedure)
}

/// Check every procedure of `program`, in definition order.
pub fn check_program(program: &Program, config: &CheckerConfig) -> Vec<FunctionReport> {
    let checker = Checker::new(program, config);
    program
        .procedures()
        .iter()
        .map(|procedure| checker.check(procedure))
        .collect()
}

pub struct Checker<'p> {
    program: &'p Program,
    config: &'p CheckerConfig,
}

/// Per-procedure bookkeeping shared by all paths.
struct Walk<'p> {
    procedure: &'p Procedure,
    failures: Vec<Failure>,
    paths: usize,
}

impl Walk<'_> {
    fn fail(&mut self, location: StepLocation, error: CheckError) {
        let failure = Failure {
            function: self.procedure.name.clone(),
            location,
            error,
        };
        tracing::debug!(failure = %failure, "Obligation failed");
        if !self.failures.contains(&failure) {
            self.failures.push(failure);
        }
    }
}

/// State of one path.
#[derive(Debug, Clone)]
struct PathState {
    ctx: OwnershipContext,
    /// Current values of program variables.
    env: HashMap<String, Term>,
    /// Parameter values and precondition binders, as seen by the postcondition.
    entry_env: HashMap<String, Term>,
    returned: Option<Term>,
}

impl PathState {
    fn eval(&self, term: &Term) -> Term {
        self.ctx.prover.normalize(&term.substitute(&self.env))
    }
}

/// A statement list being executed.
#[derive(Debug, Clone)]
struct Frame<'p> {
    steps: &'p [Step],
    next: usize,
    block: Block,
    prefix: Vec<(Block, usize)>,
}

impl<'p> Frame<'p> {
    fn new(steps: &'p [Step], block: Block, prefix: Vec<(Block, usize)>) -> Self {
        Self {
            steps,
            next: 0,
            block,
            prefix,
        }
    }

    fn segments(&self, index: usize) -> Vec<(Block, usize)> {
        let mut segments = self.prefix.clone();
        segments.push((self.block, index));
        segments
    }
}

impl<'p> Checker<'p> {
    pub fn new(program: &'p Program, config: &'p CheckerConfig) -> Self {
        Self { program, config }
    }

    pub fn check(&self, procedure: &Procedure) -> FunctionReport {
        tracing::info!(function = %procedure.name, "Checking function");
        let mut walk = Walk {
            procedure,
            failures: Vec::new(),
            paths: 1,
        };
        let mut path = PathState {
            ctx: OwnershipContext::new(self.config.prover.clone()),
            env: HashMap::new(),
            entry_env: HashMap::new(),
            returned: None,
        };
        match self.enter(&mut path, procedure) {
            Ok(()) => {
                let frames = vec![Frame::new(&procedure.body, Block::Body, Vec::new())];
                self.run(&mut walk, path, frames);
            }
            Err(error) => walk.fail(StepLocation::Entry, error),
        }

        let verdict = if walk.failures.is_empty() {
            Verdict::Verified
        } else {
            Verdict::Failed(walk.failures)
        };
        tracing::info!(
            function = %procedure.name,
            paths = walk.paths,
            verified = verdict.is_verified(),
            "Function checked"
        );
        FunctionReport {
            function: procedure.name.clone(),
            verdict,
            paths: walk.paths,
        }
    }

    // ------------------------------------------------------------------
    // Entry
    // ------------------------------------------------------------------

    fn enter(&self, path: &mut PathState, procedure: &Procedure) -> Result<(), CheckError> {
        for (name, _) in &procedure.params {
            path.env.insert(name.clone(), Term::var(name));
        }
        for clause in &procedure.contract.requires {
            match clause {
                Clause::Take { binder, resource } => {
                    let ptr = path.eval(resource.ptr());
                    let value = Term::var(binder);
                    match resource {
                        Resource::Owned { layout, .. } => {
                            path.ctx
                                .heap
                                .adopt(ptr, layout, value.clone(), &mut path.ctx.prover)?;
                        }
                        Resource::Predicate { name, .. } => {
                            path.ctx.add_instance(PredicateInstance {
                                predicate: name.clone(),
                                root: ptr,
                                output: value.clone(),
                            });
                        }
                    }
                    path.env.insert(binder.clone(), value);
                }
                Clause::Pure(fact) => {
                    let fact = path.eval(fact);
                    path.ctx.prover.assume(fact);
                }
            }
        }
        path.entry_env = path.env.clone();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Steps
    // ------------------------------------------------------------------

    fn run<'s>(&self, walk: &mut Walk<'_>, mut path: PathState, mut frames: Vec<Frame<'s>>) {
        loop {
            if path.ctx.prover.is_inconsistent() {
                tracing::debug!(function = %walk.procedure.name, "Infeasible path");
                return;
            }
            let Some(frame) = frames.last_mut() else {
                break;
            };
            let steps = frame.steps;
            let index = frame.next;
            let Some(step) = steps.get(index) else {
                frames.pop();
                continue;
            };
            frame.next += 1;
            let segments = frame.segments(index);
            let location = StepLocation::Step(segments.clone());
            tracing::debug!(
                function = %walk.procedure.name,
                location = %location,
                op = step.op_name(),
                "Step"
            );

            match step {
                Step::If {
                    condition,
                    then_branch,
                    else_branch,
                } => {
                    let condition = path.eval(condition);
                    let decided = path.ctx.prover.entails(&condition);
                    if decided.is_proved() {
                        frames.push(Frame::new(then_branch, Block::Then, segments));
                    } else if decided.is_refuted() {
                        frames.push(Frame::new(else_branch, Block::Else, segments));
                    } else {
                        if walk.paths >= self.config.max_paths {
                            walk.fail(
                                location,
                                CheckError::PathLimitExceeded {
                                    limit: self.config.max_paths,
                                },
                            );
                            return;
                        }
                        walk.paths += 1;
                        let mut then_path = path.clone();
                        then_path.ctx.prover.assume(condition.clone());
                        let mut then_frames = frames.clone();
                        then_frames.push(Frame::new(then_branch, Block::Then, segments.clone()));
                        self.run(walk, then_path, then_frames);

                        path.ctx.prover.assume(Term::not(condition));
                        frames.push(Frame::new(else_branch, Block::Else, segments));
                    }
                }
                Step::Return { value } => {
                    if let Some(value) = value {
                        path.returned = Some(path.eval(value));
                    }
                    break;
                }
                _ => {
                    if let Err(error) = self.execute(&mut path, step) {
                        walk.fail(location, error);
                        return;
                    }
                }
            }
        }
        if path.ctx.prover.is_inconsistent() {
            return;
        }
        self.exit(walk, path);
    }

    fn execute(&self, path: &mut PathState, step: &Step) -> Result<(), CheckError> {
        let types = self.program.types();
        let engine = FoldEngine::new(self.program.predicates());
        match step {
            Step::Let { dest, value } => {
                let value = path.eval(value);
                path.env.insert(dest.clone(), value);
            }
            Step::Alloc { dest, layout } => {
                let layout = types.struct_def(layout)?;
                let ctx = &mut path.ctx;
                let addr = ctx.heap.allocate(layout, &mut ctx.fresh, &mut ctx.prover);
                path.env.insert(dest.clone(), addr.to_term());
            }
            Step::Read { dest, ptr, field } => {
                let ptr = path.eval(ptr);
                let addr = path.ctx.heap.resolve(&ptr, &path.ctx.prover)?;
                let layout = types.struct_def(&path.ctx.heap.read(addr)?.layout)?;
                let value = path.ctx.heap.read_field(addr, layout, field)?;
                let value = path.ctx.prover.normalize(&value);
                path.env.insert(dest.clone(), value);
            }
            Step::Write { ptr, field, value } => {
                let ptr = path.eval(ptr);
                let value = path.eval(value);
                let addr = path.ctx.heap.resolve(&ptr, &path.ctx.prover)?;
                let layout = types.struct_def(&path.ctx.heap.read(addr)?.layout)?;
                path.ctx.heap.write_field(addr, layout, field, value)?;
            }
            Step::Dispose { ptr } => {
                let ptr = path.eval(ptr);
                let addr = path.ctx.heap.resolve(&ptr, &path.ctx.prover)?;
                path.ctx.heap.dispose(addr)?;
            }
            Step::Unfold { predicate, ptr } => {
                let ptr = path.eval(ptr);
                engine.unfold(&mut path.ctx, predicate, &ptr)?;
            }
            Step::BaseCase { predicate, ptr } => {
                let ptr = path.eval(ptr);
                engine.base_case(&mut path.ctx, predicate, &ptr)?;
            }
            Step::Pack { predicate, ptr } => {
                let ptr = path.eval(ptr);
                engine.pack(&mut path.ctx, predicate, &ptr)?;
            }
            Step::ApplyLemma { lemma, args } => {
                let lemma = self.program.lemmas().lookup(lemma)?;
                let args: Vec<Term> = args.iter().map(|a| path.eval(a)).collect();
                apply_lemma(&mut path.ctx.prover, lemma, &args)?;
            }
            Step::UnfoldFunction { function, args } => {
                let function = self.program.functions().lookup(function)?;
                let args: Vec<Term> = args.iter().map(|a| path.eval(a)).collect();
                unfold_function(&mut path.ctx.prover, function, &args)?;
            }
            Step::Call {
                dest,
                function,
                args,
            } => {
                let args: Vec<Term> = args.iter().map(|a| path.eval(a)).collect();
                let value = self.call(&mut path.ctx, function, args)?;
                if let Some(dest) = dest {
                    path.env.insert(dest.clone(), value);
                }
            }
            Step::Assert { condition } => {
                if !path.ctx.prover.entails(&path.eval(condition)).is_proved() {
                    return Err(CheckError::AssertionFailed {
                        condition: condition.clone(),
                    });
                }
            }
            Step::Hint { text } => {
                tracing::debug!(hint = %text, "Ignoring hint");
            }
            Step::If { .. } | Step::Return { .. } => {}
        }
        Ok(())
    }

    /// Consume the callee's precondition, produce its postcondition and
    /// return the fresh return value.
    fn call(
        &self,
        ctx: &mut OwnershipContext,
        function: &str,
        args: Vec<Term>,
    ) -> Result<Term, CheckError> {
        let summary = self.program.contracts().lookup(function)?;
        if summary.param_names.len() != args.len() {
            return Err(CheckError::ArityMismatch {
                name: function.to_string(),
                expected: summary.param_names.len(),
                found: args.len(),
            });
        }
        let mut env: HashMap<String, Term> =
            summary.param_names.iter().cloned().zip(args).collect();

        for clause in &summary.contract.requires {
            match clause {
                Clause::Take { binder, resource } => {
                    let ptr = ctx.prover.normalize(&resource.ptr().substitute(&env));
                    let value = self.consume(ctx, resource, &ptr)?;
                    env.insert(binder.clone(), value);
                }
                Clause::Pure(fact) => {
                    let condition = ctx.prover.normalize(&fact.substitute(&env));
                    if !ctx.prover.entails(&condition).is_proved() {
                        return Err(CheckError::PreconditionUnmet {
                            name: function.to_string(),
                            condition: fact.substitute(&env),
                        });
                    }
                }
            }
        }

        let result = ctx.fresh.fresh_var(RETURN_VAR);
        env.insert(RETURN_VAR.to_string(), result.clone());
        for clause in &summary.contract.ensures {
            match clause {
                Clause::Take { binder, resource } => {
                    let ptr = ctx.prover.normalize(&resource.ptr().substitute(&env));
                    let value = ctx.fresh.fresh_var(binder);
                    match resource {
                        Resource::Owned { layout, .. } => {
                            ctx.heap.adopt(ptr, layout, value.clone(), &mut ctx.prover)?;
                        }
                        Resource::Predicate { name, .. } => ctx.add_instance(PredicateInstance {
                            predicate: name.clone(),
                            root: ptr,
                            output: value.clone(),
                        }),
                    }
                    env.insert(binder.clone(), value);
                }
                Clause::Pure(fact) => ctx.prover.assume(fact.substitute(&env)),
            }
        }
        tracing::debug!(callee = function, result = %result, "Applied callee contract");
        Ok(result)
    }

    /// Remove the resource at `ptr` from the context and return its value.
    ///
    /// A predicate at a provably null pointer needs no instance.
    fn consume(
        &self,
        ctx: &mut OwnershipContext,
        resource: &Resource,
        ptr: &Term,
    ) -> Result<Term, CheckError> {
        match resource {
            Resource::Owned { layout, .. } => {
                let missing = |ctx: &OwnershipContext| CheckError::IncompleteOwnership {
                    predicate: format!("Owned<{layout}>"),
                    ptr: ptr.clone(),
                    held: ctx.fold_state(ptr),
                };
                let addr = ctx
                    .heap
                    .resolve(ptr, &ctx.prover)
                    .map_err(|_| missing(ctx))?;
                if ctx.heap.read(addr)?.layout != *layout {
                    return Err(missing(ctx));
                }
                Ok(ctx.heap.take(addr)?.value)
            }
            Resource::Predicate { name, .. } => {
                if let Some(instance) = ctx.take_instance(name, ptr) {
                    Ok(instance.output)
                } else if ctx.is_null(ptr) {
                    Ok(null_output(self.program.predicates().lookup(name)?, ptr))
                } else {
                    Err(CheckError::IncompleteOwnership {
                        predicate: name.clone(),
                        ptr: ptr.clone(),
                        held: ctx.fold_state(ptr),
                    })
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Exit
    // ------------------------------------------------------------------

    fn exit(&self, walk: &mut Walk<'_>, mut path: PathState) {
        let mut env = path.entry_env.clone();
        if let Some(value) = path.returned.take() {
            env.insert(RETURN_VAR.to_string(), value);
        }
        let procedure = walk.procedure;
        let ctx = &mut path.ctx;
        let mut failed: HashSet<String> = HashSet::new();
        let depends_on_failed = |term: &Term, failed: &HashSet<String>| {
            term.free_vars().iter().any(|v| failed.contains(v))
        };

        for clause in &procedure.contract.ensures {
            let error = match clause {
                Clause::Take { binder, resource } => {
                    if depends_on_failed(resource.ptr(), &failed) {
                        failed.insert(binder.clone());
                        continue;
                    }
                    let ptr = ctx.prover.normalize(&resource.ptr().substitute(&env));
                    match self.consume(ctx, resource, &ptr) {
                        Ok(value) => {
                            env.insert(binder.clone(), value);
                            continue;
                        }
                        Err(error) => {
                            failed.insert(binder.clone());
                            error
                        }
                    }
                }
                Clause::Pure(fact) => {
                    if depends_on_failed(fact, &failed) {
                        continue;
                    }
                    let condition = ctx.prover.normalize(&fact.substitute(&env));
                    if ctx.prover.entails(&condition).is_proved() {
                        continue;
                    }
                    CheckError::PostconditionUnmet {
                        condition: fact.clone(),
                    }
                }
            };
            walk.fail(StepLocation::Exit, error);
            if !self.config.collect_postconditions {
                return;
            }
        }

        if failed.is_empty() {
            for resource in ctx.leftovers() {
                walk.fail(StepLocation::Exit, CheckError::LeakedOwnership { resource });
            }
        }
    }
}
