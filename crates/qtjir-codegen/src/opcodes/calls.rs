//! `Call`/`AsyncCall`/`Pow` emission: dispatch through the builtin table,
//! then the extern registry, then a plain user-defined function lookup.
//! `qtjir_rt_print` is special-cased at the call site because the builtin
//! table records one runtime name per source builtin but the runtime
//! actually exposes three overloads (`_int`/`_float`/generic `ptr`) picked
//! by the argument's concrete LLVM type.

use inkwell::values::{BasicValueEnum, FunctionValue};

use qtjir_core::{BuiltinRegistry, LlvmTypeName, Node, NodeData};

use super::operand;
use crate::error::CodegenError;
use crate::runtime;
use crate::state::EmitState;

fn callee_name(node: &Node) -> Result<&str, CodegenError> {
    match &node.data {
        NodeData::Str(name) => Ok(name.as_str()),
        _ => Err(CodegenError::InvalidGraph(node.id.0)),
    }
}

fn args<'ctx>(state: &EmitState<'ctx, '_>, node: &Node) -> Result<Vec<BasicValueEnum<'ctx>>, CodegenError> {
    (0..node.inputs.len()).map(|i| operand(state, node, i)).collect()
}

fn as_call_metadata<'ctx>(value: BasicValueEnum<'ctx>) -> inkwell::values::BasicMetadataValueEnum<'ctx> {
    value.into()
}

pub fn emit_pow<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let callee = runtime::pow(state.context, state.module);
    let args = args(state, node)?;
    call(state, callee, &args)
}

fn call<'ctx>(state: &EmitState<'ctx, '_>, callee: FunctionValue<'ctx>, args: &[BasicValueEnum<'ctx>]) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let metadata: Vec<_> = args.iter().map(|a| as_call_metadata(*a)).collect();
    let site = state
        .builder
        .build_call(callee, &metadata, "call")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    Ok(site
        .try_as_basic_value()
        .left()
        .unwrap_or_else(|| state.context.i32_type().const_zero().into()))
}

fn emit_print<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let args = args(state, node)?;
    let arg = *args.first().ok_or(CodegenError::MissingOperand(node.id.0))?;
    let callee = match arg {
        BasicValueEnum::IntValue(v) if v.get_type().get_bit_width() == 32 => runtime::print_int(state.context, state.module),
        BasicValueEnum::FloatValue(_) => runtime::print_float(state.context, state.module),
        _ => runtime::print(state.context, state.module),
    };
    call(state, callee, &args)
}

fn emit_assert<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let cond = operand(state, node, 0)?.into_int_value();
    let cond = super::truthy(state, cond)?;
    let fail_block = state.context.append_basic_block(state.function, "assert_fail");
    let cont_block = state.context.append_basic_block(state.function, "assert_ok");
    state
        .builder
        .build_conditional_branch(cond, cont_block, fail_block)
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;

    state.builder.position_at_end(fail_block);
    let message = state
        .builder
        .build_global_string_ptr("assertion failed", "assert_msg")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    let callee = runtime::assert_fail(state.context, state.module);
    state
        .builder
        .build_call(callee, &[message.as_pointer_value().into()], "assert_fail_call")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    state.builder.build_unreachable().map_err(|e| CodegenError::Llvm(e.to_string()))?;

    state.builder.position_at_end(cont_block);
    Ok(state.context.i32_type().const_zero().into())
}

fn extern_llvm_cast<'ctx>(state: &EmitState<'ctx, '_>, value: BasicValueEnum<'ctx>, target: LlvmTypeName) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    match (value, target) {
        (BasicValueEnum::IntValue(v), LlvmTypeName::I64) if v.get_type().get_bit_width() < 64 => Ok(state
            .builder
            .build_int_s_extend(v, state.context.i64_type(), "sext")
            .map_err(|e| CodegenError::Llvm(e.to_string()))?
            .into()),
        (BasicValueEnum::IntValue(v), LlvmTypeName::I32) if v.get_type().get_bit_width() > 32 => Ok(state
            .builder
            .build_int_truncate(v, state.context.i32_type(), "trunc")
            .map_err(|e| CodegenError::Llvm(e.to_string()))?
            .into()),
        _ => Ok(value),
    }
}

fn emit_extern_call<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node, name: &str) -> Result<Option<BasicValueEnum<'ctx>>, CodegenError> {
    let Some(sig) = state.externs.lookup(name).cloned() else {
        return Ok(None);
    };
    let param_types: Vec<_> = sig.param_types.iter().map(|t| crate::module::llvm_basic_type(state.context, *t)).collect();
    let fn_type = match crate::module::llvm_basic_type(state.context, sig.return_type) {
        Some(ret) => ret.fn_type(&param_types.iter().map(|t| (*t).unwrap().into()).collect::<Vec<_>>(), false),
        None => state
            .context
            .void_type()
            .fn_type(&param_types.iter().map(|t| (*t).unwrap().into()).collect::<Vec<_>>(), false),
    };
    let callee = state.module.get_function(name).unwrap_or_else(|| state.module.add_function(name, fn_type, None));
    let raw_args = args(state, node)?;
    let mut casted = Vec::with_capacity(raw_args.len());
    for (value, ty) in raw_args.into_iter().zip(sig.param_types.iter()) {
        casted.push(extern_llvm_cast(state, value, *ty)?);
    }
    Ok(Some(call(state, callee, &casted)?))
}

pub fn emit_call<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let name = callee_name(node)?.to_string();

    if name == "print" {
        return emit_print(state, node);
    }
    if name == "assert" {
        return emit_assert(state, node);
    }

    let builtins = BuiltinRegistry::standard();
    if let Some(entry) = builtins.lookup(&name) {
        let callee = match entry.runtime_name {
            "qtjir_rt_string_data" => runtime::string_data(state.context, state.module),
            "qtjir_rt_string_len" => runtime::string_len(state.context, state.module),
            "qtjir_rt_alloc" => runtime::alloc(state.context, state.module),
            other => state
                .module
                .get_function(other)
                .unwrap_or_else(|| state.module.add_function(other, state.context.i32_type().fn_type(&[], true), None)),
        };
        let args = args(state, node)?;
        return call(state, callee, &args);
    }

    if let Some(value) = emit_extern_call(state, node, &name)? {
        return Ok(value);
    }

    let args = args(state, node)?;
    let callee = state
        .module
        .get_function(&name)
        .ok_or_else(|| CodegenError::Llvm(format!("call to undeclared function '{name}'")))?;
    call(state, callee, &args)
}

/// A CPU target with no real coroutine runtime runs an async call
/// synchronously: the callee executes to completion before the `AsyncCall`
/// node's value is available, same as a plain `Call`.
pub fn emit_async_call<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    tracing::debug!(node = node.id.index(), "emitting async call as a synchronous call");
    emit_call(state, node)
}
