//! Whole-module emission: declare every function up front (so forward and
//! mutually recursive calls resolve), compile each graph's body, then
//! verify the finished module.

use std::fmt;

use inkwell::context::Context;
use inkwell::types::BasicTypeEnum;
use inkwell::AddressSpace;

use qtjir_core::{ExternRegistry, Graph, LlvmTypeName};

use crate::emitter;
use crate::error::CodegenError;

/// The only target this emitter produces code for.
pub const DEFAULT_TARGET_TRIPLE: &str = "x86_64-unknown-linux-gnu";

/// The finished, verified LLVM textual IR for a module.
pub struct EmittedModule {
    ir_text: String,
}

impl EmittedModule {
    pub fn ir(&self) -> &str {
        &self.ir_text
    }
}

impl fmt::Display for EmittedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ir_text)
    }
}

/// Maps a foreign-signature LLVM type name to its inkwell type. `Void`
/// cannot appear as a parameter type and is handled separately at the
/// return-type call site.
pub fn llvm_basic_type<'ctx>(context: &'ctx Context, name: LlvmTypeName) -> Option<BasicTypeEnum<'ctx>> {
    match name {
        LlvmTypeName::I1 => Some(context.bool_type().into()),
        LlvmTypeName::I32 => Some(context.i32_type().into()),
        LlvmTypeName::I64 => Some(context.i64_type().into()),
        LlvmTypeName::Float => Some(context.f32_type().into()),
        LlvmTypeName::Double => Some(context.f64_type().into()),
        LlvmTypeName::Ptr => Some(context.ptr_type(AddressSpace::default()).into()),
        LlvmTypeName::Void => None,
    }
}

/// Compiles every graph into one LLVM module and returns its verified
/// textual IR. Each graph gets a fresh `Context`-scoped compile so no LLVM
/// type or value escapes this call.
pub fn emit(graphs: &[Graph], externs: &ExternRegistry) -> Result<EmittedModule, CodegenError> {
    let context = Context::create();
    let module = context.create_module("qtjir_module");
    module.set_triple(&inkwell::targets::TargetTriple::create(DEFAULT_TARGET_TRIPLE));

    for graph in graphs {
        emitter::declare_function(&context, &module, graph);
    }

    let mut thunk_counter = 0u32;
    for graph in graphs {
        emitter::compile_function(&context, &module, graph, externs, &mut thunk_counter)?;
    }

    module.verify().map_err(|e| CodegenError::VerificationFailed(e.to_string()))?;

    Ok(EmittedModule {
        ir_text: module.print_to_string().to_string(),
    })
}
