//! The immutable program: every registry plus the procedures to check.
//!
//! Built once by [`ProgramBuilder`] at load time and then shared read-only
//! by every procedure check.
use sepcheck_logic::Sort;

use crate::contract_db::ContractDatabase;
use crate::error::DefinitionError;
use crate::function_db::FunctionDatabase;
use crate::ir::{
    Clause, DatatypeDef, LemmaDef, LogicFunction, PredicateDef, Procedure, Resource, Step,
    StructDef,
};
use crate::lemma_db::LemmaDatabase;
use crate::predicate_db::PredicateStore;
use crate::type_db::TypeDatabase;

#[derive(Debug, Clone, Default)]
pub struct Program {
    types: TypeDatabase,
    functions: FunctionDatabase,
    predicates: PredicateStore,
    lemmas: LemmaDatabase,
    contracts: ContractDatabase,
    procedures: Vec<Procedure>,
}

impl Program {
    pub fn types(&self) -> &TypeDatabase {
        &self.types
    }

    pub fn functions(&self) -> &FunctionDatabase {
        &self.functions
    }

    pub fn predicates(&self) -> &PredicateStore {
        &self.predicates
    }

    pub fn lemmas(&self) -> &LemmaDatabase {
        &self.lemmas
    }

    pub fn contracts(&self) -> &ContractDatabase {
        &self.contracts
    }

    /// Procedures in definition order.
    pub fn procedures(&self) -> &[Procedure] {
        &self.procedures
    }

    pub fn procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures.iter().find(|p| p.name == name)
    }
}

/// Collects definitions, then validates cross-references in [`build`].
///
/// [`build`]: ProgramBuilder::build
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_struct(&mut self, def: StructDef) -> Result<(), DefinitionError> {
        self.program.types.define_struct(def)
    }

    pub fn define_datatype(&mut self, def: DatatypeDef) -> Result<(), DefinitionError> {
        self.program.types.define_datatype(def)
    }

    pub fn define_function(&mut self, def: LogicFunction) -> Result<(), DefinitionError> {
        self.program.functions.define(def)
    }

    pub fn define_predicate(&mut self, def: PredicateDef) -> Result<(), DefinitionError> {
        self.program.predicates.define(def)
    }

    pub fn define_lemma(&mut self, def: LemmaDef) -> Result<(), DefinitionError> {
        self.program.lemmas.define(def)
    }

    pub fn define_procedure(&mut self, procedure: Procedure) -> Result<(), DefinitionError> {
        self.program.contracts.define(&procedure)?;
        self.program.procedures.push(procedure);
        Ok(())
    }

    /// Resolve forward references and freeze the program.
    pub fn build(self) -> Result<Program, DefinitionError> {
        let program = self.program;
        program.predicates.seal(&program.types)?;

        let validator = Validator { program: &program };
        validator.check_definitions()?;
        for procedure in &program.procedures {
            validator.check_procedure(procedure)?;
        }
        tracing::info!(
            procedures = program.procedures.len(),
            predicates = program.predicates.len(),
            lemmas = program.lemmas.len(),
            "Program loaded"
        );
        Ok(program)
    }
}

struct Validator<'a> {
    program: &'a Program,
}

impl Validator<'_> {
    fn check_sort(&self, sort: &Sort) -> Result<(), DefinitionError> {
        if let Sort::Datatype(name) = sort {
            self.program.types.datatype(name)?;
        }
        Ok(())
    }

    fn check_definitions(&self) -> Result<(), DefinitionError> {
        for def in self.program.functions.iter() {
            for (_, sort) in &def.params {
                self.check_sort(sort)?;
            }
            self.check_sort(&def.result)?;
        }
        for def in self.program.lemmas.iter() {
            for (_, sort) in &def.params {
                self.check_sort(sort)?;
            }
        }
        for def in self.program.predicates.iter() {
            self.check_sort(&def.output_sort)?;
        }
        Ok(())
    }

    fn check_procedure(&self, procedure: &Procedure) -> Result<(), DefinitionError> {
        for (_, sort) in &procedure.params {
            self.check_sort(sort)?;
        }
        for clause in procedure
            .contract
            .requires
            .iter()
            .chain(&procedure.contract.ensures)
        {
            if let Clause::Take { resource, .. } = clause {
                self.check_resource(resource)?;
            }
        }
        self.check_steps(&procedure.body)
    }

    fn check_resource(&self, resource: &Resource) -> Result<(), DefinitionError> {
        match resource {
            Resource::Owned { layout, .. } => self.program.types.struct_def(layout).map(|_| ()),
            Resource::Predicate { name, .. } => self.program.predicates.lookup(name).map(|_| ()),
        }
    }

    fn check_steps(&self, steps: &[Step]) -> Result<(), DefinitionError> {
        for step in steps {
            match step {
                Step::Alloc { layout, .. } => {
                    self.program.types.struct_def(layout)?;
                }
                Step::Unfold { predicate, .. }
                | Step::BaseCase { predicate, .. }
                | Step::Pack { predicate, .. } => {
                    self.program.predicates.lookup(predicate)?;
                }
                Step::ApplyLemma { lemma, .. } => {
                    self.program.lemmas.lookup(lemma)?;
                }
                Step::UnfoldFunction { function, .. } => {
                    self.program.functions.lookup(function)?;
                }
                Step::Call { function, .. } => {
                    self.program.contracts.lookup(function)?;
                }
                Step::If {
                    then_branch,
                    else_branch,
                    ..
                } => {
                    self.check_steps(then_branch)?;
                    self.check_steps(else_branch)?;
                }
                Step::Let { .. }
                | Step::Read { .. }
                | Step::Write { .. }
                | Step::Dispose { .. }
                | Step::Assert { .. }
                | Step::Return { .. }
                | Step::Hint { .. } => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Contract, NodeCase, PredicateTake, VariantDef};
    use sepcheck_logic::Term;

    fn int_list_builder() -> ProgramBuilder {
        let mut builder = ProgramBuilder::new();
        builder
            .define_struct(StructDef {
                name: "int_list".to_string(),
                fields: vec!["head".to_string(), "tail".to_string()],
            })
            .unwrap();
        builder
            .define_predicate(PredicateDef {
                name: "IntList".to_string(),
                param: "p".to_string(),
                output_sort: Sort::Int,
                null_case: Term::int(0),
                node: NodeCase {
                    cell: "H".to_string(),
                    layout: "int_list".to_string(),
                    takes: vec![PredicateTake {
                        binder: "T".to_string(),
                        predicate: "IntList".to_string(),
                        arg: Term::field(Term::var("H"), "tail"),
                    }],
                    asserts: vec![],
                    output: Term::add(Term::var("T"), Term::int(1)),
                },
            })
            .unwrap();
        builder
    }

    fn procedure(name: &str, body: Vec<Step>) -> Procedure {
        Procedure {
            name: name.to_string(),
            params: vec![("p".to_string(), Sort::Pointer)],
            contract: Contract::default(),
            body,
        }
    }

    #[test]
    fn builds_and_indexes_procedures() {
        let mut builder = int_list_builder();
        builder.define_procedure(procedure("noop", vec![])).unwrap();
        let program = builder.build().unwrap();
        assert_eq!(program.procedures().len(), 1);
        assert!(program.procedure("noop").is_some());
        assert_eq!(program.contracts().lookup("noop").unwrap().param_names, vec!["p"]);
    }

    #[test]
    fn duplicate_procedure_rejected() {
        let mut builder = int_list_builder();
        builder.define_procedure(procedure("f", vec![])).unwrap();
        assert!(matches!(
            builder.define_procedure(procedure("f", vec![])),
            Err(DefinitionError::DuplicateDefinition { kind: "procedure", .. })
        ));
    }

    #[test]
    fn steps_must_name_known_definitions() {
        let mut builder = int_list_builder();
        builder
            .define_procedure(procedure(
                "f",
                vec![Step::If {
                    condition: Term::BoolLit(true),
                    then_branch: vec![Step::ApplyLemma {
                        lemma: "missing".to_string(),
                        args: vec![],
                    }],
                    else_branch: vec![],
                }],
            ))
            .unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            DefinitionError::UnknownLemma("missing".to_string())
        );
    }

    #[test]
    fn calls_must_name_known_procedures() {
        let mut builder = int_list_builder();
        builder
            .define_procedure(procedure(
                "f",
                vec![Step::Call {
                    dest: None,
                    function: "g".to_string(),
                    args: vec![],
                }],
            ))
            .unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            DefinitionError::UnknownFunction("g".to_string())
        );
    }

    #[test]
    fn datatype_sorts_must_exist() {
        let mut builder = int_list_builder();
        builder
            .define_function(LogicFunction {
                name: "len".to_string(),
                params: vec![("xs".to_string(), Sort::Datatype("seq".to_string()))],
                result: Sort::Int,
                body: None,
            })
            .unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            DefinitionError::UnknownDatatype("seq".to_string())
        );

        let mut builder = int_list_builder();
        builder
            .define_datatype(DatatypeDef {
                name: "seq".to_string(),
                variants: vec![VariantDef {
                    name: "Seq_Nil".to_string(),
                    fields: vec![],
                }],
            })
            .unwrap();
        builder
            .define_function(LogicFunction {
                name: "len".to_string(),
                params: vec![("xs".to_string(), Sort::Datatype("seq".to_string()))],
                result: Sort::Int,
                body: None,
            })
            .unwrap();
        assert!(builder.build().is_ok());
    }
}
