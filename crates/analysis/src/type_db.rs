//! Struct layouts and datatypes.
use std::collections::HashMap;

use crate::error::DefinitionError;
use crate::ir::{DatatypeDef, StructDef};

/// Maps struct and datatype names to their definitions.
///
/// Constructor names are indexed too, so a constructor term can be traced
/// back to its datatype.
#[derive(Debug, Clone, Default)]
pub struct TypeDatabase {
    structs: HashMap<String, StructDef>,
    datatypes: HashMap<String, DatatypeDef>,
    constructors: HashMap<String, String>,
}

impl TypeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a struct layout.
    pub fn define_struct(&mut self, def: StructDef) -> Result<(), DefinitionError> {
        if self.structs.contains_key(&def.name) {
            return Err(DefinitionError::DuplicateDefinition {
                kind: "struct",
                name: def.name,
            });
        }
        self.structs.insert(def.name.clone(), def);
        Ok(())
    }

    /// Register a datatype and its constructors.
    pub fn define_datatype(&mut self, def: DatatypeDef) -> Result<(), DefinitionError> {
        if self.datatypes.contains_key(&def.name) {
            return Err(DefinitionError::DuplicateDefinition {
                kind: "datatype",
                name: def.name,
            });
        }
        for variant in &def.variants {
            if self.constructors.contains_key(&variant.name) {
                return Err(DefinitionError::DuplicateDefinition {
                    kind: "constructor",
                    name: variant.name.clone(),
                });
            }
        }
        for variant in &def.variants {
            self.constructors
                .insert(variant.name.clone(), def.name.clone());
        }
        self.datatypes.insert(def.name.clone(), def);
        Ok(())
    }

    /// Look up a struct layout.
    pub fn struct_def(&self, name: &str) -> Result<&StructDef, DefinitionError> {
        self.structs
            .get(name)
            .ok_or_else(|| DefinitionError::UnknownStruct(name.to_string()))
    }

    /// Look up a datatype.
    pub fn datatype(&self, name: &str) -> Result<&DatatypeDef, DefinitionError> {
        self.datatypes
            .get(name)
            .ok_or_else(|| DefinitionError::UnknownDatatype(name.to_string()))
    }

    /// The datatype a constructor belongs to.
    pub fn datatype_of_constructor(&self, ctor: &str) -> Option<&DatatypeDef> {
        self.constructors
            .get(ctor)
            .and_then(|name| self.datatypes.get(name))
    }

    pub fn contains_struct(&self, name: &str) -> bool {
        self.structs.contains_key(name)
    }

    pub fn contains_datatype(&self, name: &str) -> bool {
        self.datatypes.contains_key(name)
    }
}
