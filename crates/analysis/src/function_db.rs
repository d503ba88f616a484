//! Registry of logical functions.
use std::collections::HashMap;

use crate::error::DefinitionError;
use crate::ir::LogicFunction;

/// Maps function name → [`LogicFunction`].
#[derive(Debug, Clone, Default)]
pub struct FunctionDatabase {
    functions: HashMap<String, LogicFunction>,
}

impl FunctionDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, def: LogicFunction) -> Result<(), DefinitionError> {
        if self.functions.contains_key(&def.name) {
            return Err(DefinitionError::DuplicateDefinition {
                kind: "function",
                name: def.name,
            });
        }
        self.functions.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&LogicFunction, DefinitionError> {
        self.functions
            .get(name)
            .ok_or_else(|| DefinitionError::UnknownFunction(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Definitions in name order.
    pub fn iter(&self) -> impl Iterator<Item = &LogicFunction> {
        let mut defs: Vec<&LogicFunction> = self.functions.values().collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sepcheck_logic::Sort;

    #[test]
    fn uninterpreted_functions_have_no_body() {
        let mut db = FunctionDatabase::new();
        db.define(LogicFunction {
            name: "empty".to_string(),
            params: vec![],
            result: Sort::Datatype("seq".to_string()),
            body: None,
        })
        .unwrap();
        assert!(db.lookup("empty").unwrap().body.is_none());
        assert!(db.contains("empty"));
        assert!(!db.is_empty());
        assert_eq!(
            db.lookup("merge").unwrap_err(),
            DefinitionError::UnknownFunction("merge".to_string())
        );
    }
}
