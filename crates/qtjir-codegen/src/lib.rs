//! LLVM textual IR emission for the CPU target.
//!
//! [`module::emit`] is the crate's single entry point: it takes every
//! graph belonging to one compilation unit plus the foreign-function
//! registry gathered during lowering, and returns a verified LLVM module
//! as text.

pub mod emitter;
pub mod error;
mod opcodes;
pub mod module;
pub mod runtime;
mod state;
pub mod types;

pub use error::CodegenError;
pub use module::{emit, EmittedModule, DEFAULT_TARGET_TRIPLE};
