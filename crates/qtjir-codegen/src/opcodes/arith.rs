//! Integer arithmetic, comparison, and bitwise opcodes. Every value in this
//! family is `i32` -- QTJIR carries no type system into codegen, so binary
//! arithmetic never has to pick between an int and float path here; tensor
//! scalars are handled separately in `tensor.rs`.

use inkwell::values::BasicValueEnum;
use inkwell::IntPredicate;

use qtjir_core::{Node, Opcode};

use super::int_operand;
use crate::error::CodegenError;
use crate::state::EmitState;

pub fn emit_binary_arith<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let lhs = int_operand(state, node, 0)?;
    let rhs = int_operand(state, node, 1)?;
    let result = match node.op {
        Opcode::Add => state.builder.build_int_add(lhs, rhs, "add"),
        Opcode::Sub => state.builder.build_int_sub(lhs, rhs, "sub"),
        Opcode::Mul => state.builder.build_int_mul(lhs, rhs, "mul"),
        Opcode::Div => state.builder.build_int_signed_div(lhs, rhs, "sdiv"),
        Opcode::Mod => state.builder.build_int_signed_rem(lhs, rhs, "srem"),
        _ => unreachable!("emit_binary_arith called with non-arithmetic opcode"),
    };
    Ok(result.map_err(|e| CodegenError::Llvm(e.to_string()))?.into())
}

pub fn emit_compare<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let lhs = int_operand(state, node, 0)?;
    let rhs = int_operand(state, node, 1)?;
    let predicate = match node.op {
        Opcode::Equal => IntPredicate::EQ,
        Opcode::NotEqual => IntPredicate::NE,
        Opcode::Less => IntPredicate::SLT,
        Opcode::LessEqual => IntPredicate::SLE,
        Opcode::Greater => IntPredicate::SGT,
        Opcode::GreaterEqual => IntPredicate::SGE,
        _ => unreachable!("emit_compare called with non-comparison opcode"),
    };
    let result = state
        .builder
        .build_int_compare(predicate, lhs, rhs, "cmp")
        .map_err(|e| CodegenError::Llvm(e.to_string()))?;
    Ok(result.into())
}

pub fn emit_bitwise<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let lhs = int_operand(state, node, 0)?;
    let rhs = int_operand(state, node, 1)?;
    let result = match node.op {
        Opcode::BitAnd => state.builder.build_and(lhs, rhs, "and"),
        Opcode::BitOr => state.builder.build_or(lhs, rhs, "or"),
        Opcode::Xor => state.builder.build_xor(lhs, rhs, "xor"),
        Opcode::Shl => state.builder.build_left_shift(lhs, rhs, "shl"),
        Opcode::Shr => state.builder.build_right_shift(lhs, rhs, true, "ashr"),
        _ => unreachable!("emit_bitwise called with non-bitwise opcode"),
    };
    Ok(result.map_err(|e| CodegenError::Llvm(e.to_string()))?.into())
}

pub fn emit_bit_not<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let operand = int_operand(state, node, 0)?;
    let result = state.builder.build_not(operand, "not").map_err(|e| CodegenError::Llvm(e.to_string()))?;
    Ok(result.into())
}
