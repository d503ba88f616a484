//! Registry of lemmas.
use std::collections::HashMap;

use crate::error::DefinitionError;
use crate::ir::LemmaDef;

/// Maps lemma name → [`LemmaDef`].
#[derive(Debug, Clone, Default)]
pub struct LemmaDatabase {
    lemmas: HashMap<String, LemmaDef>,
}

impl LemmaDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, def: LemmaDef) -> Result<(), DefinitionError> {
        if self.lemmas.contains_key(&def.name) {
            return Err(DefinitionError::DuplicateDefinition {
                kind: "lemma",
                name: def.name,
            });
        }
        self.lemmas.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&LemmaDef, DefinitionError> {
        self.lemmas
            .get(name)
            .ok_or_else(|| DefinitionError::UnknownLemma(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lemmas.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.lemmas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lemmas.is_empty()
    }

    /// Definitions in name order.
    pub fn iter(&self) -> impl Iterator<Item = &LemmaDef> {
        let mut defs: Vec<&LemmaDef> = self.lemmas.values().collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs.into_iter()
    }
}
