//! The per-graph emission procedure: basic-block pre-scan, in-order node
//! emission, deferred `Phi` resolution, and epilogue synthesis.

use std::collections::HashMap;

use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::values::BasicValue;

use qtjir_core::{ExternRegistry, Graph, Node, Opcode};

use crate::error::CodegenError;
use crate::opcodes;
use crate::state::{EmitState, PendingPhi};
use crate::types::{return_llvm_type, ReturnLlvmType};

/// Declares (or returns the existing declaration of) `graph`'s function
/// signature. Called in a first pass over every graph in a module so that
/// forward and mutually recursive calls resolve.
pub fn declare_function<'ctx>(context: &'ctx Context, module: &Module<'ctx>, graph: &Graph) -> inkwell::values::FunctionValue<'ctx> {
    if let Some(existing) = module.get_function(&graph.function_name) {
        return existing;
    }
    if graph.function_name == "main" {
        let fn_type = context.i32_type().fn_type(&[], false);
        return module.add_function("main", fn_type, None);
    }
    let param_types: Vec<inkwell::types::BasicMetadataTypeEnum> =
        graph.parameters.iter().map(|_| context.i32_type().into()).collect();
    let fn_type = match return_llvm_type(context, &graph.return_type) {
        ReturnLlvmType::Void => context.void_type().fn_type(&param_types, false),
        ReturnLlvmType::Basic(t) => t.fn_type(&param_types, false),
    };
    module.add_function(&graph.function_name, fn_type, None)
}

pub fn compile_function<'ctx>(
    context: &'ctx Context,
    module: &Module<'ctx>,
    graph: &Graph,
    externs: &ExternRegistry,
    thunk_counter: &mut u32,
) -> Result<(), CodegenError> {
    let function = module
        .get_function(&graph.function_name)
        .expect("every graph is pre-declared before compile_function runs");
    let builder = context.create_builder();

    let entry = context.append_basic_block(function, "entry");
    builder.position_at_end(entry);

    let mut blocks = HashMap::new();
    for (index, node) in graph.iter().enumerate() {
        if node.op.is_label() {
            if index == 0 {
                blocks.insert(node.id, entry);
            } else {
                let bb = context.append_basic_block(function, &format!("bb{}", node.id.index()));
                blocks.insert(node.id, bb);
            }
        }
    }

    let mut state = EmitState {
        context,
        module,
        builder: &builder,
        function,
        graph,
        externs,
        blocks,
        values: HashMap::new(),
        producer_block: HashMap::new(),
        pending_phis: Vec::new(),
        thunk_counter: *thunk_counter,
    };

    for node in graph.iter() {
        match node.op {
            Opcode::Label => position_at_label(&mut state, node)?,
            Opcode::Branch => emit_branch(&mut state, node)?,
            Opcode::Jump => emit_jump(&mut state, node)?,
            Opcode::Phi => emit_phi_placeholder(&mut state, node)?,
            Opcode::Return => emit_return(&mut state, node)?,
            _ => opcodes::dispatch(&mut state, node)?,
        }
    }

    resolve_pending_phis(&mut state);
    synthesize_epilogue(&mut state, graph)?;

    *thunk_counter = state.thunk_counter;
    Ok(())
}

fn position_at_label(state: &mut EmitState, node: &Node) -> Result<(), CodegenError> {
    let block = *state.blocks.get(&node.id).ok_or(CodegenError::MissingLabel(node.id.0))?;
    if state.builder.get_insert_block() != Some(block) {
        state.builder.position_at_end(block);
    }
    Ok(())
}

fn emit_branch(state: &mut EmitState, node: &Node) -> Result<(), CodegenError> {
    let cond = opcodes::int_operand(state, node, 0)?;
    let cond = opcodes::truthy(state, cond)?;
    let true_id = *node.inputs.get(1).ok_or(CodegenError::MissingOperand(node.id.0))?;
    let false_id = *node.inputs.get(2).ok_or(CodegenError::MissingOperand(node.id.0))?;
    let true_block = *state.blocks.get(&true_id).ok_or(CodegenError::MissingLabel(true_id.0))?;
    let false_block = *state.blocks.get(&false_id).ok_or(CodegenError::MissingLabel(false_id.0))?;
    state
        .builder
        .build_conditional_branch(cond, true_block, false_block)
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    Ok(())
}

fn emit_jump(state: &mut EmitState, node: &Node) -> Result<(), CodegenError> {
    let target_id = *node.inputs.first().ok_or(CodegenError::MissingOperand(node.id.0))?;
    let target_block = *state.blocks.get(&target_id).ok_or(CodegenError::MissingLabel(target_id.0))?;
    state.builder.build_unconditional_branch(target_block).map_err(|e| CodegenError::Llvm(e.to_string()))?;
    Ok(())
}

fn emit_phi_placeholder<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<(), CodegenError> {
    let phi = state
        .builder
        .build_phi(state.context.i32_type(), "phi")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    state.record(node.id, phi.as_basic_value());
    state.pending_phis.push(PendingPhi {
        phi,
        incoming: node.inputs.iter().copied().collect(),
    });
    Ok(())
}

/// A `Phi`'s incoming value may be produced by a node with a higher id than
/// the `Phi` itself (loop latches), so incoming edges are resolved only
/// after every node in the graph has emitted its value.
fn resolve_pending_phis(state: &mut EmitState) {
    let pending = std::mem::take(&mut state.pending_phis);
    for entry in pending {
        for incoming_id in &entry.incoming {
            let Some(value) = state.value_of(*incoming_id) else {
                tracing::warn!(node = incoming_id.index(), "phi incoming value never produced, leaving edge unresolved");
                continue;
            };
            let Some(block) = state.producer_block.get(incoming_id).copied() else {
                continue;
            };
            entry.phi.add_incoming(&[(&value, block)]);
        }
    }
}

/// `main` is always declared `i32`-returning regardless of what its graph's
/// `return_type` says, so a bare `return;` inside `main` still needs a
/// value -- zero, the same value the epilogue synthesizes on fallthrough.
fn function_is_void(graph: &Graph) -> bool {
    graph.function_name != "main" && graph.return_type == "void"
}

fn emit_return(state: &mut EmitState, node: &Node) -> Result<(), CodegenError> {
    match node.inputs.first() {
        Some(id) => {
            let value = state.value_of(*id).ok_or(CodegenError::MissingOperand(id.0))?;
            state.builder.build_return(Some(&value)).map_err(|e| CodegenError::Llvm(e.to_string()))?;
        }
        None if function_is_void(state.graph) => {
            state.builder.build_return(None).map_err(|e| CodegenError::Llvm(e.to_string()))?;
        }
        None => {
            let zero = state.context.i32_type().const_zero();
            state.builder.build_return(Some(&zero)).map_err(|e| CodegenError::Llvm(e.to_string()))?;
        }
    }
    Ok(())
}

fn synthesize_epilogue(state: &mut EmitState, graph: &Graph) -> Result<(), CodegenError> {
    let last_block = state.builder.get_insert_block().expect("at least the entry block exists");
    if last_block.get_terminator().is_some() {
        return Ok(());
    }
    if graph.is_error_union_return() {
        return Err(CodegenError::MissingReturn(graph.function_name.clone()));
    }
    match return_llvm_type(state.context, &graph.return_type) {
        ReturnLlvmType::Void => {
            state.builder.build_return(None).map_err(|e| CodegenError::Llvm(e.to_string()))?;
        }
        ReturnLlvmType::Basic(_) => {
            let zero = state.context.i32_type().const_zero();
            state.builder.build_return(Some(&zero)).map_err(|e| CodegenError::Llvm(e.to_string()))?;
        }
    }
    Ok(())
}
