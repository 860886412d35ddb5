pub mod builtin;
pub mod extern_registry;

pub use builtin::{BuiltinEntry, BuiltinRegistry, ReturnKind};
pub use extern_registry::{ExternFunction, ExternRegistry, LlvmTypeName};
