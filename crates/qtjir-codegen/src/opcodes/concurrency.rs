//! `Spawn`/`Nursery*`/`Await` on a single-threaded CPU target: spawning
//! hands a thunk to the runtime's nursery instead of starting a real
//! thread, and `Await` is a passthrough since the nursery already ran the
//! task to completion by the time its result is consumed.

use inkwell::values::BasicValueEnum;

use qtjir_core::{Node, NodeData, Opcode};

use super::operand;
use crate::error::CodegenError;
use crate::runtime;
use crate::state::EmitState;

fn target_function_name<'ctx>(state: &EmitState<'ctx, '_>, node: &Node) -> Option<String> {
    let target_id = *node.inputs.first()?;
    let producer = state.graph.node(target_id)?;
    match (&producer.op, &producer.data) {
        (Opcode::FnRef, NodeData::Str(name)) => Some(name.clone()),
        _ => None,
    }
}

pub fn emit_spawn<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let Some(target_name) = target_function_name(state, node) else {
        tracing::warn!(node = node.id.index(), "spawn target is not a direct function reference, skipping");
        return Ok(state.context.i32_type().const_zero().into());
    };
    let Some(target_fn) = state.module.get_function(&target_name) else {
        return Err(CodegenError::Llvm(format!("spawn target '{target_name}' is not declared in this module")));
    };

    let mut spawn_args = Vec::with_capacity(node.inputs.len().saturating_sub(1));
    for index in 1..node.inputs.len() {
        spawn_args.push(operand(state, node, index)?);
    }

    if spawn_args.is_empty() {
        let fn_ptr = target_fn.as_global_value().as_pointer_value();
        let callee = runtime::nursery_spawn_noarg(state.context, state.module);
        let site = state
            .builder
            .build_call(callee, &[fn_ptr.into()], "spawn")
            .map_err(|e| CodegenError::Llvm(e.to_string()))?;
        return Ok(site.try_as_basic_value().left().unwrap_or_else(|| state.context.i32_type().const_zero().into()));
    }

    let thunk = build_spawn_thunk(state, target_fn, spawn_args.len());
    let args_struct_ty = state.context.struct_type(&vec![state.context.i32_type().into(); spawn_args.len()], false);
    let args_ptr = state
        .builder
        .build_alloca(args_struct_ty, "spawn_args")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    for (index, value) in spawn_args.into_iter().enumerate() {
        let field_ptr = state
            .builder
            .build_struct_gep(args_struct_ty, args_ptr, index as u32, "spawn_arg")
            .map_err(|e| CodegenError::Llvm(e.to_string()))?;
        state.builder.build_store(field_ptr, value).map_err(|e| CodegenError::Llvm(e.to_string()))?;
    }

    let thunk_ptr = thunk.as_global_value().as_pointer_value();
    let callee = runtime::nursery_spawn(state.context, state.module);
    let site = state
        .builder
        .build_call(callee, &[thunk_ptr.into(), args_ptr.into()], "spawn")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    Ok(site.try_as_basic_value().left().unwrap_or_else(|| state.context.i32_type().const_zero().into()))
}

/// Synthesizes `fn(ptr) -> i64` that unpacks the args struct at `ptr`,
/// calls `target`, and sign-extends its return value. The nursery stores
/// the thunk pointer and args pointer, then invokes the thunk on its own
/// schedule.
fn build_spawn_thunk<'ctx>(state: &mut EmitState<'ctx, '_>, target: inkwell::values::FunctionValue<'ctx>, arg_count: usize) -> inkwell::values::FunctionValue<'ctx> {
    let name = state.next_thunk_name();
    let ptr_ty = state.context.ptr_type(inkwell::AddressSpace::default());
    let fn_ty = state.context.i64_type().fn_type(&[ptr_ty.into()], false);
    let thunk = state.module.add_function(&name, fn_ty, None);
    let entry = state.context.append_basic_block(thunk, "entry");

    let saved_block = state.builder.get_insert_block();
    state.builder.position_at_end(entry);

    let args_ptr = thunk.get_nth_param(0).unwrap().into_pointer_value();
    let struct_ty = state.context.struct_type(&vec![state.context.i32_type().into(); arg_count], false);
    let mut call_args = Vec::with_capacity(arg_count);
    for index in 0..arg_count {
        let field_ptr = state.builder.build_struct_gep(struct_ty, args_ptr, index as u32, "arg").unwrap();
        let value = state.builder.build_load(state.context.i32_type(), field_ptr, "arg_val").unwrap();
        call_args.push(value.into());
    }
    let result = state.builder.build_call(target, &call_args, "thunk_call").unwrap();
    let result_value = result.try_as_basic_value().left().unwrap_or_else(|| state.context.i32_type().const_zero().into());
    let widened = match result_value {
        BasicValueEnum::IntValue(v) => state.builder.build_int_s_extend(v, state.context.i64_type(), "widen").unwrap(),
        _ => state.context.i64_type().const_zero(),
    };
    state.builder.build_return(Some(&widened)).unwrap();

    if let Some(block) = saved_block {
        state.builder.position_at_end(block);
    }
    thunk
}

pub fn emit_nursery_begin<'ctx>(state: &mut EmitState<'ctx, '_>) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let callee = runtime::nursery_create(state.context, state.module);
    let site = state.builder.build_call(callee, &[], "nursery").map_err(|e| CodegenError::Llvm(e.to_string()))?;
    Ok(site.try_as_basic_value().left().unwrap_or_else(|| state.context.i32_type().const_zero().into()))
}

pub fn emit_nursery_end<'ctx>(state: &mut EmitState<'ctx, '_>, _node: &Node) -> Result<(), CodegenError> {
    let callee = runtime::nursery_await_all(state.context, state.module);
    state.builder.build_call(callee, &[], "nursery_join").map_err(|e| CodegenError::Llvm(e.to_string()))?;
    Ok(())
}

pub fn emit_await<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    operand(state, node, 0)
}
