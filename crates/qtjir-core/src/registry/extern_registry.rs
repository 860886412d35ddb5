//! Registered foreign-module function signatures.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use indexmap::IndexMap;

/// LLVM type strings accepted in a foreign signature. Closed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LlvmTypeName {
    I1,
    I32,
    I64,
    Float,
    Double,
    Ptr,
    Void,
}

impl LlvmTypeName {
    pub fn as_str(self) -> &'static str {
        match self {
            LlvmTypeName::I1 => "i1",
            LlvmTypeName::I32 => "i32",
            LlvmTypeName::I64 => "i64",
            LlvmTypeName::Float => "float",
            LlvmTypeName::Double => "double",
            LlvmTypeName::Ptr => "ptr",
            LlvmTypeName::Void => "void",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "i1" => Some(LlvmTypeName::I1),
            "i32" => Some(LlvmTypeName::I32),
            "i64" => Some(LlvmTypeName::I64),
            "float" => Some(LlvmTypeName::Float),
            "double" => Some(LlvmTypeName::Double),
            "ptr" => Some(LlvmTypeName::Ptr),
            "void" => Some(LlvmTypeName::Void),
            _ => None,
        }
    }
}

/// A single ingested foreign function signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternFunction {
    pub name: String,
    pub param_types: Vec<LlvmTypeName>,
    pub return_type: LlvmTypeName,
    pub source_path: String,
}

/// Maps function name to its signature, plus the set of already-ingested
/// source paths so registration stays idempotent per path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternRegistry {
    functions: IndexMap<String, ExternFunction>,
    ingested_paths: HashSet<String>,
}

impl ExternRegistry {
    pub fn new() -> Self {
        ExternRegistry::default()
    }

    pub fn has_ingested(&self, source_path: &str) -> bool {
        self.ingested_paths.contains(source_path)
    }

    pub fn mark_ingested(&mut self, source_path: impl Into<String>) {
        self.ingested_paths.insert(source_path.into());
    }

    pub fn register(&mut self, function: ExternFunction) {
        self.functions.insert(function.name.clone(), function);
    }

    pub fn lookup(&self, name: &str) -> Option<&ExternFunction> {
        self.functions.get(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExternFunction> {
        self.functions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_idempotent_per_path() {
        let mut reg = ExternRegistry::new();
        assert!(!reg.has_ingested("foo.zig"));
        reg.mark_ingested("foo.zig");
        assert!(reg.has_ingested("foo.zig"));
    }

    #[test]
    fn lookup_after_register() {
        let mut reg = ExternRegistry::new();
        reg.register(ExternFunction {
            name: "add_i32".into(),
            param_types: vec![LlvmTypeName::I32, LlvmTypeName::I32],
            return_type: LlvmTypeName::I32,
            source_path: "math.zig".into(),
        });
        let found = reg.lookup("add_i32").unwrap();
        assert_eq!(found.param_types.len(), 2);
    }

    #[test]
    fn type_name_roundtrips_through_strings() {
        for t in [
            LlvmTypeName::I1,
            LlvmTypeName::I32,
            LlvmTypeName::I64,
            LlvmTypeName::Float,
            LlvmTypeName::Double,
            LlvmTypeName::Ptr,
            LlvmTypeName::Void,
        ] {
            assert_eq!(LlvmTypeName::parse(t.as_str()), Some(t));
        }
        assert_eq!(LlvmTypeName::parse("bogus"), None);
    }
}
