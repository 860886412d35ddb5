//! Quantum opcodes have no lowering target on this CPU backend: they
//! describe QPU-tenancy work a quantum control stack would schedule.
//! Emission logs and substitutes a zero, mirroring the tensor stub policy.

use inkwell::values::BasicValueEnum;

use qtjir_core::Node;

use crate::error::CodegenError;
use crate::state::EmitState;

pub fn emit_stub<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    tracing::warn!(node = node.id.index(), op = ?node.op, "quantum opcode has no CPU backend, emitting zero");
    Ok(state.context.i32_type().const_zero().into())
}
