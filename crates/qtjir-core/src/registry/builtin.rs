//! The static table of source-level callables the lowerer recognizes
//! without consulting the extern registry.

use serde::Serialize;

/// What kind of value a builtin call produces, for the lowerer's
/// result-wiring step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReturnKind {
    Void,
    Scalar,
    Tensor,
    Qubit,
}

/// A single row of the builtin table.
#[derive(Debug, Clone, Serialize)]
pub struct BuiltinEntry {
    pub source_name: &'static str,
    pub runtime_name: &'static str,
    pub min_args: usize,
    pub max_args: Option<usize>,
    pub return_kind: ReturnKind,
}

impl BuiltinEntry {
    pub fn accepts_arity(&self, arity: usize) -> bool {
        arity >= self.min_args && self.max_args.map_or(true, |max| arity <= max)
    }
}

/// Read-only at runtime; built once from a fixed list.
#[derive(Debug, Clone, Serialize)]
pub struct BuiltinRegistry {
    entries: Vec<BuiltinEntry>,
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        BuiltinRegistry::standard()
    }
}

impl BuiltinRegistry {
    /// The fixed row set: arithmetic helper (`pow`), assertion, string
    /// intrinsics, and the generic runtime print/alloc helpers an emitted
    /// program's runtime support library provides.
    pub fn standard() -> Self {
        BuiltinRegistry {
            entries: vec![
                BuiltinEntry {
                    source_name: "pow",
                    runtime_name: "qtjir_rt_pow",
                    min_args: 2,
                    max_args: Some(2),
                    return_kind: ReturnKind::Scalar,
                },
                BuiltinEntry {
                    source_name: "assert",
                    runtime_name: "qtjir_rt_assert_fail",
                    min_args: 1,
                    max_args: Some(1),
                    return_kind: ReturnKind::Void,
                },
                BuiltinEntry {
                    source_name: "string_data_intrinsic",
                    runtime_name: "qtjir_rt_string_data",
                    min_args: 1,
                    max_args: Some(1),
                    return_kind: ReturnKind::Scalar,
                },
                BuiltinEntry {
                    source_name: "string_len_intrinsic",
                    runtime_name: "qtjir_rt_string_len",
                    min_args: 1,
                    max_args: Some(1),
                    return_kind: ReturnKind::Scalar,
                },
                BuiltinEntry {
                    source_name: "print",
                    runtime_name: "qtjir_rt_print",
                    min_args: 1,
                    max_args: None,
                    return_kind: ReturnKind::Void,
                },
                BuiltinEntry {
                    source_name: "alloc",
                    runtime_name: "qtjir_rt_alloc",
                    min_args: 1,
                    max_args: Some(1),
                    return_kind: ReturnKind::Scalar,
                },
            ],
        }
    }

    pub fn lookup(&self, source_name: &str) -> Option<&BuiltinEntry> {
        self.entries.iter().find(|e| e.source_name == source_name)
    }

    /// `true` for callee paths matched by category rather than by exact
    /// table row (`tensor.*`, `quantum.*`, `ssm.*`).
    pub fn is_category_path(callee: &str) -> Option<&'static str> {
        if callee.starts_with("tensor.") {
            Some("tensor")
        } else if callee.starts_with("quantum.") {
            Some("quantum")
        } else if callee.starts_with("ssm.") {
            Some("ssm")
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pow_is_registered_with_exact_arity() {
        let reg = BuiltinRegistry::standard();
        let entry = reg.lookup("pow").unwrap();
        assert!(entry.accepts_arity(2));
        assert!(!entry.accepts_arity(1));
        assert!(!entry.accepts_arity(3));
    }

    #[test]
    fn print_accepts_variable_arity() {
        let reg = BuiltinRegistry::standard();
        let entry = reg.lookup("print").unwrap();
        assert!(entry.accepts_arity(1));
        assert!(entry.accepts_arity(10));
    }

    #[test]
    fn unknown_name_is_not_found() {
        let reg = BuiltinRegistry::standard();
        assert!(reg.lookup("not_a_builtin").is_none());
    }

    #[test]
    fn category_path_recognizes_tensor_quantum_ssm() {
        assert_eq!(BuiltinRegistry::is_category_path("tensor.matmul"), Some("tensor"));
        assert_eq!(BuiltinRegistry::is_category_path("quantum.hadamard"), Some("quantum"));
        assert_eq!(BuiltinRegistry::is_category_path("ssm.scan"), Some("ssm"));
        assert_eq!(BuiltinRegistry::is_category_path("math.pow"), None);
    }
}
