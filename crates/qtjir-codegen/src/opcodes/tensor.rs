//! Tensor and state-space-model opcodes have no lowering target on this
//! CPU backend: they describe NPU-tenancy work an accelerator driver would
//! schedule. Emission logs and substitutes a zero so a mixed CPU/tensor
//! graph still produces valid IR for its CPU-tenancy portion.

use inkwell::values::BasicValueEnum;

use qtjir_core::Node;

use crate::error::CodegenError;
use crate::state::EmitState;

pub fn emit_stub<'ctx>(state: &mut EmitState<'ctx, '_>, node: &Node) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    tracing::warn!(node = node.id.index(), op = ?node.op, "tensor opcode has no CPU backend, emitting zero");
    Ok(state.context.i32_type().const_zero().into())
}
