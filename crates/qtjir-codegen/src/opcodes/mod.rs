//! Opcode emission, split by family. [`dispatch`] is the single entry point
//! the emitter's main node loop calls for every non-control-flow,
//! non-label node.

mod aggregates;
mod arith;
mod calls;
mod concurrency;
mod quantum;
mod tensor;

use inkwell::values::{BasicValueEnum, IntValue};
use inkwell::IntPredicate;

use qtjir_core::{Node, Opcode};

use crate::error::CodegenError;
use crate::state::EmitState;

/// Emits every node except `Label`/`Branch`/`Jump`/`Return`/`Phi`, which the
/// main emission loop in `emitter.rs` handles directly because they
/// interact with basic-block bookkeeping the opcode families don't see.
pub fn dispatch(state: &mut EmitState, node: &Node) -> Result<(), CodegenError> {
    use Opcode::*;
    let value = match &node.op {
        Constant => Some(aggregates::emit_constant(state, node)?),
        Argument { index } => Some(argument(state, *index)?),
        Alloca { .. } => Some(aggregates::emit_alloca(state, node)?),
        Load => Some(aggregates::emit_load(state, node)?),
        Store => {
            aggregates::emit_store(state, node)?;
            None
        }
        Index => Some(aggregates::emit_index(state, node)?),
        Slice => Some(aggregates::emit_slice(state, node)?),
        SliceIndex => Some(aggregates::emit_slice_index(state, node)?),
        SliceLen => Some(aggregates::emit_slice_len(state, node)?),
        Range => Some(aggregates::emit_range(state, node)?),
        ArrayConstruct => Some(aggregates::emit_array_construct(state, node)?),
        StructConstruct => Some(aggregates::emit_struct_construct(state, node)?),
        StructAlloca => Some(aggregates::emit_struct_alloca(state, node)?),
        FieldAccess => Some(aggregates::emit_field_access(state, node)?),
        FieldStore => {
            aggregates::emit_field_store(state, node)?;
            None
        }

        OptionalNone => Some(aggregates::emit_optional_none(state)?),
        OptionalSome => Some(aggregates::emit_optional_some(state, node)?),
        OptionalUnwrap => Some(aggregates::emit_tagged_payload(state, node)?),
        OptionalIsSome => Some(aggregates::emit_tagged_tag_nonzero(state, node)?),

        ErrorUnionConstruct => Some(aggregates::emit_error_union_construct(state, node, false)?),
        ErrorFailConstruct => Some(aggregates::emit_error_union_construct(state, node, true)?),
        ErrorUnionIsError => Some(aggregates::emit_tagged_tag_nonzero(state, node)?),
        ErrorUnionUnwrap => Some(aggregates::emit_tagged_payload(state, node)?),
        ErrorUnionGetError => Some(aggregates::emit_tagged_payload(state, node)?),

        Add | Sub | Mul | Div | Mod => Some(arith::emit_binary_arith(state, node)?),
        Pow => Some(calls::emit_pow(state, node)?),
        Equal | NotEqual | Less | LessEqual | Greater | GreaterEqual => Some(arith::emit_compare(state, node)?),
        BitAnd | BitOr | Xor | Shl | Shr => Some(arith::emit_bitwise(state, node)?),
        BitNot => Some(arith::emit_bit_not(state, node)?),

        Call => Some(calls::emit_call(state, node)?),
        AsyncCall => Some(calls::emit_async_call(state, node)?),

        TensorMatmul | TensorConv | TensorReduce | TensorScalarMul | TensorContract | TensorRelu | TensorSoftmax
        | TensorFusedMatmulRelu | TensorFusedMatmulAdd | SsmScan | SsmSelectiveScan => {
            Some(tensor::emit_stub(state, node)?)
        }

        QuantumGate | QuantumMeasure => Some(quantum::emit_stub(state, node)?),

        Spawn => Some(concurrency::emit_spawn(state, node)?),
        NurseryBegin => Some(concurrency::emit_nursery_begin(state)?),
        NurseryEnd => {
            concurrency::emit_nursery_end(state, node)?;
            None
        }
        Await => Some(concurrency::emit_await(state, node)?),

        UnionConstruct | UnionTagCheck | UnionPayloadExtract | FnRef | ClosureCreate | ClosureCall
        | ClosureEnvLoad | ClosureEnvStore | ChannelCreate | ChannelSend | ChannelRecv | ChannelClose
        | ChannelTryRecv | ChannelTrySend | ChannelIsClosed | SelectBegin | SelectArm | SelectEnd | UsingBegin
        | UsingEnd | TraitMethodCall | VtableLookup | VtableConstruct | ImplMethodRef => {
            Some(unimplemented_stub(state, node))
        }

        // handled directly by the emitter's main loop
        Label | Branch | Jump | Return | Phi => None,
    };

    if let Some(value) = value {
        state.record(node.id, value);
    }
    Ok(())
}

fn argument<'ctx>(state: &EmitState<'ctx, '_>, index: u32) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    state
        .function
        .get_nth_param(index)
        .ok_or(CodegenError::InvalidGraph(index))
}

/// The fallback for opcodes no lowerer in this workspace ever produces
/// (closures, tagged unions, channels, select, using, trait dispatch).
/// Rather than failing the whole module, emit a zero and move on -- the
/// same policy the tensor/quantum backend stubs use.
fn unimplemented_stub<'ctx>(state: &EmitState<'ctx, '_>, node: &Node) -> BasicValueEnum<'ctx> {
    tracing::warn!(node = node.id.index(), op = ?node.op, "opcode has no codegen backend on this target, emitting zero");
    state.context.i32_type().const_zero().into()
}

pub(crate) fn operand<'ctx>(state: &EmitState<'ctx, '_>, node: &Node, slot: usize) -> Result<BasicValueEnum<'ctx>, CodegenError> {
    let id = node.inputs.get(slot).ok_or(CodegenError::MissingOperand(node.id.0))?;
    state.value_of(*id).ok_or(CodegenError::MissingOperand(id.0))
}

pub(crate) fn int_operand<'ctx>(state: &EmitState<'ctx, '_>, node: &Node, slot: usize) -> Result<IntValue<'ctx>, CodegenError> {
    operand(state, node, slot)?.try_into().map_err(|_| CodegenError::MissingOperand(node.id.0))
}

/// Narrows any integer value to `i1` via a `!= 0` comparison, used at
/// branch conditions and tag checks where the producer may already be an
/// `i1` (comparisons) or a wider `i32` (arbitrary truthy value).
pub(crate) fn truthy<'ctx>(state: &EmitState<'ctx, '_>, value: IntValue<'ctx>) -> Result<IntValue<'ctx>, CodegenError> {
    if value.get_type().get_bit_width() == 1 {
        return Ok(value);
    }
    let zero = value.get_type().const_zero();
    state
        .builder
        .build_int_compare(IntPredicate::NE, value, zero, "truthy")
        .map_err(|e| CodegenError::Llvm(e.to_string()))
}
