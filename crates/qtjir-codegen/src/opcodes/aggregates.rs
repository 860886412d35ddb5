//! Memory, aggregate, slice, optional, and error-union opcodes.
//!
//! Optionals and error unions share one representation: the `{i8, i64}`
//! tagged struct from [`crate::types::tagged_payload_type`] -- tag `0` means
//! "empty"/"ok", tag `1` means "present"/"error". That symmetry is why
//! [`emit_tagged_payload`] and [`emit_tagged_tag_nonzero`] each serve two
//! opcodes.

use inkwell::types::BasicTypeEnum;
use inkwell::values::{BasicValue, BasicValueEnum, PointerValue};

use qtjir_core::{Node, NodeData, NodeId, Opcode};

use super::operand;
use crate::error::CodegenError;
use crate::runtime;
use crate::state::EmitState;
use crate::types::tagged_payload_type;

fn ptr_operand<'ctx>(state: &EmitState<'ctx, '_>, node: &Node, slot: usize) -> Result<PointerValue<'ctx>, CodegenError> {
    operand(state, node, slot)?.try_into().map_err(|_| CodegenError::MissingOperand(node.id.0))
}

pub fn emit_constant<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let value = match &node.data {
        NodeData::Integer(v) => state.context.i32_type().const_int(*v as u64, true).into(),
        NodeData::Float(v) => state.context.f64_type().const_float(*v).into(),
        NodeData::Bool(v) => state.context.bool_type().const_int(*v as u64, false).into(),
        NodeData::Str(s) => state
            .builder
            .build_global_string_ptr(s, "str")
            .map_err(|e| CodegenError::Llvm(e.to_string()))?
            .as_pointer_value()
            .into(),
        NodeData::Unused => state.context.i32_type().const_zero().into(),
    };
    Ok(value)
}

pub fn emit_alloca<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let name = match &node.op {
        Opcode::Alloca { name } => name.as_str(),
        _ => unreachable!("emit_alloca called with non-Alloca opcode"),
    };
    let ptr = state
        .builder
        .build_alloca(state.context.i32_type(), name)
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    Ok(ptr.into())
}

pub fn emit_load<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let ptr = ptr_operand(state, node, 0)?;
    let value = state
        .builder
        .build_load(state.context.i32_type(), ptr, "load")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    Ok(value)
}

pub fn emit_store<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<(), CodegenError> {
    let value = operand(state, node, 0)?;
    let ptr = ptr_operand(state, node, 1)?;
    state.builder.build_store(ptr, value).map_err(|e| CodegenError::Llvm(e.to_string()))?;
    Ok(())
}

/// Field names declared on the node that produced `struct_value`: either a
/// `StructAlloca` (`"name:f1,f2,f3"`) or a `StructConstruct`
/// (`"f1,f2,f3"`).
fn field_names(graph: &qtjir_core::Graph, struct_value: NodeId) -> Vec<String> {
    let Some(producer) = graph.node(struct_value) else {
        return Vec::new();
    };
    let raw = producer.data.as_str().unwrap_or("");
    let list = match producer.op {
        Opcode::StructAlloca => raw.split_once(':').map(|(_, fields)| fields).unwrap_or(""),
        _ => raw,
    };
    if list.is_empty() {
        Vec::new()
    } else {
        list.split(',').map(str::to_string).collect()
    }
}

fn struct_type_for<'ctx>(state: &EmitState<'ctx, '_>, field_count: usize) -> inkwell::types::StructType<'ctx> {
    let fields: Vec<BasicTypeEnum> = (0..field_count).map(|_| state.context.i32_type().into()).collect();
    state.context.struct_type(&fields, false)
}

pub fn emit_struct_alloca<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let raw = node.data.as_str().unwrap_or("");
    let (name, fields) = raw.split_once(':').unwrap_or((raw, ""));
    let field_count = if fields.is_empty() { 0 } else { fields.split(',').count() };
    let struct_ty = struct_type_for(state, field_count.max(1));
    let ptr = state
        .builder
        .build_alloca(struct_ty, name)
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    Ok(ptr.into())
}

pub fn emit_field_access<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let struct_id = *node.inputs.first().ok_or(CodegenError::MissingOperand(node.id.0))?;
    let field_name = node.data.as_str().unwrap_or("");
    let names = field_names(state.graph, struct_id);
    let index = names.iter().position(|n| n == field_name).unwrap_or(0) as u32;
    let struct_ptr = ptr_operand(state, node, 0)?;
    let struct_ty = struct_type_for(state, names.len().max(1));
    let field_ptr = state
        .builder
        .build_struct_gep(struct_ty, struct_ptr, index, "field")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    let value = state
        .builder
        .build_load(state.context.i32_type(), field_ptr, "field_val")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    Ok(value)
}

pub fn emit_field_store<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<(), CodegenError> {
    let struct_id = *node.inputs.first().ok_or(CodegenError::MissingOperand(node.id.0))?;
    let field_name = node.data.as_str().unwrap_or("");
    let names = field_names(state.graph, struct_id);
    let index = names.iter().position(|n| n == field_name).unwrap_or(0) as u32;
    let struct_ptr = ptr_operand(state, node, 0)?;
    let value = operand(state, node, 1)?;
    let struct_ty = struct_type_for(state, names.len().max(1));
    let field_ptr = state
        .builder
        .build_struct_gep(struct_ty, struct_ptr, index, "field")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    state.builder.build_store(field_ptr, value).map_err(|e| CodegenError::Llvm(e.to_string()))?;
    Ok(())
}

pub fn emit_struct_construct<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let names = node.data.as_str().unwrap_or("").split(',').filter(|s| !s.is_empty()).count();
    let struct_ty = struct_type_for(state, names.max(node.inputs.len()).max(1));
    let ptr = state
        .builder
        .build_alloca(struct_ty, "struct_lit")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    for (index, _) in node.inputs.iter().enumerate() {
        let value = operand(state, node, index)?;
        let field_ptr = state
            .builder
            .build_struct_gep(struct_ty, ptr, index as u32, "field")
            .map_err(|e| CodegenError::Llvm(e.to_string()))?;
        state.builder.build_store(field_ptr, value).map_err(|e| CodegenError::Llvm(e.to_string()))?;
    }
    Ok(ptr.into())
}

pub fn emit_array_construct<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let len = node.inputs.len().max(1) as u32;
    let array_ty = state.context.i32_type().array_type(len);
    let ptr = state
        .builder
        .build_alloca(array_ty, "array_lit")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    for (index, _) in node.inputs.iter().enumerate() {
        let value = operand(state, node, index)?;
        let element_ptr = unsafe {
            state
                .builder
                .build_gep(
                    state.context.i32_type(),
                    ptr,
                    &[state.context.i32_type().const_int(index as u64, false)],
                    "elem",
                )
                .map_err(|e| CodegenError::Llvm(e.to_string()))?
        };
        state.builder.build_store(element_ptr, value).map_err(|e| CodegenError::Llvm(e.to_string()))?;
    }
    Ok(ptr.into())
}

pub fn emit_index<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let array_ptr = ptr_operand(state, node, 0)?;
    let index = operand(state, node, 1)?.into_int_value();
    let element_ptr = unsafe {
        state
            .builder
            .build_gep(state.context.i32_type(), array_ptr, &[index], "elem")
            .map_err(|e| CodegenError::Llvm(e.to_string()))?
    };
    let value = state
        .builder
        .build_load(state.context.i32_type(), element_ptr, "elem_val")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    Ok(value)
}

pub fn emit_slice<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let array_ptr = ptr_operand(state, node, 0)?;
    let start = operand(state, node, 1)?.into_int_value();
    let end = operand(state, node, 2)?.into_int_value();
    let inclusive = node.data.as_integer().unwrap_or(0) != 0;
    let callee = if inclusive {
        runtime::make_slice_inclusive_i32(state.context, state.module)
    } else {
        runtime::make_slice_i32(state.context, state.module)
    };
    let result = state
        .builder
        .build_call(callee, &[array_ptr.into(), start.into(), end.into()], "slice")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    result.try_as_basic_value().left().ok_or(CodegenError::Llvm("slice builtin returned void".into()))
}

pub fn emit_slice_index<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let slice = operand(state, node, 0)?;
    let index = operand(state, node, 1)?.into_int_value();
    let index64 = state
        .builder
        .build_int_s_extend(index, state.context.i64_type(), "idx64")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    let callee = runtime::slice_get_i32(state.context, state.module);
    let result = state
        .builder
        .build_call(callee, &[slice.into(), index64.into()], "slice_idx")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    result.try_as_basic_value().left().ok_or(CodegenError::Llvm("slice_get_i32 returned void".into()))
}

pub fn emit_slice_len<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let slice = operand(state, node, 0)?.into_struct_value();
    let len = state
        .builder
        .build_extract_value(slice, 1, "slice_len")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    Ok(len)
}

pub fn emit_range<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let start = operand(state, node, 0)?.into_int_value();
    let end = operand(state, node, 1)?.into_int_value();
    let range_ty = state.context.struct_type(&[state.context.i32_type().into(), state.context.i32_type().into()], false);
    let base = range_ty.const_zero();
    let with_start = state
        .builder
        .build_insert_value(base, start, 0, "range_start")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    let with_end = state
        .builder
        .build_insert_value(with_start, end, 1, "range_end")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    Ok(with_end.as_basic_value_enum())
}

fn tag_const<'ctx>(state: &EmitState<'ctx, '_>, present: bool) -> inkwell::values::IntValue<'ctx> {
    state.context.i8_type().const_int(present as u64, false)
}

fn build_tagged<'ctx>(state: &mut EmitState<'ctx, '_>, present: bool, payload: Option<BasicValueEnum<'ctx>>) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let base = tagged_payload_type(state.context).const_zero();
    let with_tag = state
        .builder
        .build_insert_value(base, tag_const(state, present), 0, "tag")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    let payload64 = match payload {
        Some(BasicValueEnum::IntValue(v)) => state
            .builder
            .build_int_s_extend(v, state.context.i64_type(), "payload64")
            .map_err(|e| CodegenError::Llvm(e.to_string()))?,
        Some(_) | None => state.context.i64_type().const_zero(),
    };
    let with_payload = state
        .builder
        .build_insert_value(with_tag, payload64, 1, "payload")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    Ok(with_payload.as_basic_value_enum())
}

pub fn emit_optional_none<'ctx>(state: &mut EmitState<'ctx, '_>) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    build_tagged(state, false, None)
}

pub fn emit_optional_some<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let payload = operand(state, node, 0)?;
    build_tagged(state, true, Some(payload))
}

pub fn emit_error_union_construct<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node, is_fail: bool) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let payload = operand(state, node, 0)?;
    build_tagged(state, is_fail, Some(payload))
}

pub fn emit_tagged_payload<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let tagged = operand(state, node, 0)?.into_struct_value();
    let payload64 = state
        .builder
        .build_extract_value(tagged, 1, "payload")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?
        .into_int_value();
    let payload32 = state
        .builder
        .build_int_truncate(payload64, state.context.i32_type(), "payload32")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    Ok(payload32.into())
}

pub fn emit_tagged_tag_nonzero<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let tagged = operand(state, node, 0)?.into_struct_value();
    let tag = state
        .builder
        .build_extract_value(tagged, 0, "tag")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?
        .into_int_value();
    let zero = tag.get_type().const_zero();
    let result = state
        .builder
        .build_int_compare(inkwell::IntPredicate::NE, tag, zero, "tag_set")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    Ok(result.into())
}
