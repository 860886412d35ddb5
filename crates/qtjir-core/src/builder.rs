//! The append-only node builder.
//!
//! Every creation method appends a node and returns its monotonically
//! increasing `NodeId`. Input lists are empty on return unless a helper
//! promises otherwise; callers append inputs themselves via `add_input`
//! when the documented order requires it to be built incrementally (e.g.
//! backpatched branch targets).

use crate::data::NodeData;
use crate::graph::Graph;
use crate::id::NodeId;
use crate::metadata::{QuantumMetadata, TensorMetadata};
use crate::node::Node;
use crate::opcode::Opcode;
use crate::tenancy::Tenancy;

/// Wraps a `Graph` under construction. Owns the `current_tenancy` the
/// lowerer flips around tensor/quantum constructs.
pub struct GraphBuilder {
    graph: Graph,
    pub current_tenancy: Tenancy,
}

impl GraphBuilder {
    pub fn new(function_name: impl Into<String>) -> Self {
        GraphBuilder {
            graph: Graph::new(function_name),
            current_tenancy: Tenancy::CpuSerial,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn finish(self) -> Graph {
        self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Appends a bare node with the builder's current tenancy and no inputs.
    pub fn create_node(&mut self, op: Opcode) -> NodeId {
        let node = Node::new(NodeId(0), op, self.current_tenancy);
        self.graph.push_node(node)
    }

    /// Appends a node and immediately sets its input list.
    pub fn create_node_with_inputs(&mut self, op: Opcode, inputs: &[NodeId]) -> NodeId {
        let id = self.create_node(op);
        for input in inputs {
            self.add_input(id, *input);
        }
        id
    }

    pub fn add_input(&mut self, node: NodeId, input: NodeId) {
        if let Some(n) = self.graph.node_mut(node) {
            n.push_input(input);
        }
    }

    pub fn set_data(&mut self, node: NodeId, data: NodeData) {
        if let Some(n) = self.graph.node_mut(node) {
            n.data = data;
        }
    }

    pub fn set_tensor_metadata(&mut self, node: NodeId, metadata: TensorMetadata) {
        if let Some(n) = self.graph.node_mut(node) {
            n.tensor_metadata = Some(metadata);
        }
    }

    pub fn set_quantum_metadata(&mut self, node: NodeId, metadata: QuantumMetadata) {
        if let Some(n) = self.graph.node_mut(node) {
            n.quantum_metadata = Some(metadata);
        }
    }

    pub fn set_source_ast_id(&mut self, node: NodeId, ast_id: u32) {
        if let Some(n) = self.graph.node_mut(node) {
            n.source_ast_id = Some(ast_id);
        }
    }

    // -- Constants --

    pub fn create_constant_int(&mut self, value: i64) -> NodeId {
        let id = self.create_node(Opcode::Constant);
        self.set_data(id, NodeData::Integer(value));
        id
    }

    pub fn create_constant_float(&mut self, value: f64) -> NodeId {
        let id = self.create_node(Opcode::Constant);
        self.set_data(id, NodeData::Float(value));
        id
    }

    pub fn create_constant_bool(&mut self, value: bool) -> NodeId {
        let id = self.create_node(Opcode::Constant);
        self.set_data(id, NodeData::Bool(value));
        id
    }

    pub fn create_constant_string(&mut self, value: impl Into<String>) -> NodeId {
        let id = self.create_node(Opcode::Constant);
        self.set_data(id, NodeData::Str(value.into()));
        id
    }

    // -- Calls / returns --

    pub fn create_call(&mut self, callee: impl Into<String>, args: &[NodeId]) -> NodeId {
        let id = self.create_node_with_inputs(Opcode::Call, args);
        self.set_data(id, NodeData::Str(callee.into()));
        id
    }

    pub fn create_return(&mut self, value: Option<NodeId>) -> NodeId {
        let id = self.create_node(Opcode::Return);
        if let Some(v) = value {
            self.add_input(id, v);
        }
        id
    }

    // -- Memory --

    pub fn build_alloca(&mut self, name: impl Into<String>) -> NodeId {
        self.create_node(Opcode::Alloca { name: name.into() })
    }

    pub fn build_struct_alloca(&mut self, name: impl Into<String>, field_names: &[String]) -> NodeId {
        let id = self.create_node(Opcode::StructAlloca);
        self.set_data(id, NodeData::Str(format!("{}:{}", name.into(), field_names.join(","))));
        id
    }

    pub fn build_store(&mut self, value: NodeId, ptr: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::Store, &[value, ptr])
    }

    pub fn build_load(&mut self, ptr: NodeId, _name: &str) -> NodeId {
        self.create_node_with_inputs(Opcode::Load, &[ptr])
    }

    pub fn build_argument(&mut self, index: u32) -> NodeId {
        self.create_node(Opcode::Argument { index })
    }

    // -- Binary/unary/compare --

    pub fn build_binary(&mut self, op: Opcode, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.create_node_with_inputs(op, &[lhs, rhs])
    }

    pub fn build_unary(&mut self, op: Opcode, operand: NodeId) -> NodeId {
        self.create_node_with_inputs(op, &[operand])
    }

    pub fn build_bit_not(&mut self, operand: NodeId) -> NodeId {
        self.build_unary(Opcode::BitNot, operand)
    }

    // -- Control flow --

    pub fn build_branch(&mut self, cond: NodeId, true_target: NodeId, false_target: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::Branch, &[cond, true_target, false_target])
    }

    /// Creates a branch with placeholder (self-referential, later rewired)
    /// targets, matching the lowerer's forward-jump backpatching scheme
    ///. The caller records the returned ID in a patch list and
    /// fixes up inputs[1]/inputs[2] once the real `Label` nodes exist.
    pub fn build_branch_placeholder(&mut self, cond: NodeId) -> NodeId {
        let placeholder = cond;
        self.create_node_with_inputs(Opcode::Branch, &[cond, placeholder, placeholder])
    }

    pub fn build_jump(&mut self, target: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::Jump, &[target])
    }

    pub fn build_jump_placeholder(&mut self) -> NodeId {
        self.create_node(Opcode::Jump)
    }

    pub fn build_label(&mut self) -> NodeId {
        self.create_node(Opcode::Label)
    }

    pub fn build_phi(&mut self, incoming: &[NodeId]) -> NodeId {
        self.create_node_with_inputs(Opcode::Phi, incoming)
    }

    pub fn patch_input(&mut self, node: NodeId, input_index: usize, new_value: NodeId) {
        if let Some(n) = self.graph.node_mut(node) {
            if let Some(slot) = n.inputs.get_mut(input_index) {
                *slot = new_value;
            }
        }
    }

    // -- Optionals --

    pub fn build_optional_none(&mut self) -> NodeId {
        self.create_node(Opcode::OptionalNone)
    }

    pub fn build_optional_some(&mut self, value: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::OptionalSome, &[value])
    }

    pub fn build_optional_unwrap(&mut self, value: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::OptionalUnwrap, &[value])
    }

    pub fn build_optional_is_some(&mut self, value: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::OptionalIsSome, &[value])
    }

    // -- Error unions --

    pub fn build_error_union_construct(&mut self, ok_value: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::ErrorUnionConstruct, &[ok_value])
    }

    pub fn build_error_fail_construct(&mut self, err_value: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::ErrorFailConstruct, &[err_value])
    }

    pub fn build_error_union_is_error(&mut self, value: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::ErrorUnionIsError, &[value])
    }

    pub fn build_error_union_unwrap(&mut self, value: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::ErrorUnionUnwrap, &[value])
    }

    pub fn build_error_union_get_error(&mut self, value: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::ErrorUnionGetError, &[value])
    }

    // -- Tagged unions --

    pub fn build_union_construct(&mut self, variant_index: u32, payload: NodeId) -> NodeId {
        let id = self.create_node_with_inputs(Opcode::UnionConstruct, &[payload]);
        self.set_data(id, NodeData::Integer(variant_index as i64));
        id
    }

    pub fn build_union_tag_check(&mut self, variant_index: u32, value: NodeId) -> NodeId {
        let id = self.create_node_with_inputs(Opcode::UnionTagCheck, &[value]);
        self.set_data(id, NodeData::Integer(variant_index as i64));
        id
    }

    pub fn build_union_payload_extract(&mut self, variant_index: u32, value: NodeId) -> NodeId {
        let id = self.create_node_with_inputs(Opcode::UnionPayloadExtract, &[value]);
        self.set_data(id, NodeData::Integer(variant_index as i64));
        id
    }

    // -- Closures --

    pub fn build_fn_ref(&mut self, name: impl Into<String>) -> NodeId {
        let id = self.create_node(Opcode::FnRef);
        self.set_data(id, NodeData::Str(name.into()));
        id
    }

    pub fn build_closure_create(&mut self, function_name: impl Into<String>, captures: &[NodeId]) -> NodeId {
        let id = self.create_node_with_inputs(Opcode::ClosureCreate, captures);
        self.set_data(id, NodeData::Str(function_name.into()));
        id
    }

    pub fn build_closure_call(&mut self, closure: NodeId, args: &[NodeId]) -> NodeId {
        let mut inputs = vec![closure];
        inputs.extend_from_slice(args);
        self.create_node_with_inputs(Opcode::ClosureCall, &inputs)
    }

    pub fn build_closure_env_load(&mut self, index: u32, env: NodeId) -> NodeId {
        let id = self.create_node_with_inputs(Opcode::ClosureEnvLoad, &[env]);
        self.set_data(id, NodeData::Integer(index as i64));
        id
    }

    pub fn build_closure_env_store(&mut self, index: u32, env: NodeId, value: NodeId) -> NodeId {
        let id = self.create_node_with_inputs(Opcode::ClosureEnvStore, &[env, value]);
        self.set_data(id, NodeData::Integer(index as i64));
        id
    }

    // -- Aggregates / slices --

    pub fn build_array_construct(&mut self, elements: &[NodeId]) -> NodeId {
        self.create_node_with_inputs(Opcode::ArrayConstruct, elements)
    }

    pub fn build_struct_construct(&mut self, field_names: &[String], values: &[NodeId]) -> NodeId {
        let id = self.create_node_with_inputs(Opcode::StructConstruct, values);
        self.set_data(id, NodeData::Str(field_names.join(",")));
        id
    }

    pub fn build_field_access(&mut self, struct_value: NodeId, field_name: impl Into<String>) -> NodeId {
        let id = self.create_node_with_inputs(Opcode::FieldAccess, &[struct_value]);
        self.set_data(id, NodeData::Str(field_name.into()));
        id
    }

    pub fn build_field_store(&mut self, struct_addr: NodeId, field_name: impl Into<String>, value: NodeId) -> NodeId {
        let id = self.create_node_with_inputs(Opcode::FieldStore, &[struct_addr, value]);
        self.set_data(id, NodeData::Str(field_name.into()));
        id
    }

    pub fn build_index(&mut self, array: NodeId, index: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::Index, &[array, index])
    }

    pub fn build_slice(&mut self, array: NodeId, start: NodeId, end: NodeId, inclusive: bool) -> NodeId {
        let id = self.create_node_with_inputs(Opcode::Slice, &[array, start, end]);
        self.set_data(id, NodeData::Integer(if inclusive { 1 } else { 0 }));
        id
    }

    pub fn build_slice_index(&mut self, slice: NodeId, index: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::SliceIndex, &[slice, index])
    }

    pub fn build_slice_len(&mut self, slice: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::SliceLen, &[slice])
    }

    pub fn build_range(&mut self, start: NodeId, end: NodeId, inclusive: bool) -> NodeId {
        let id = self.create_node_with_inputs(Opcode::Range, &[start, end]);
        self.set_data(id, NodeData::Bool(inclusive));
        id
    }

    // -- Tensor --

    pub fn build_tensor_op(&mut self, op: Opcode, inputs: &[NodeId]) -> NodeId {
        self.create_node_with_inputs(op, inputs)
    }

    // -- Quantum --

    pub fn build_quantum_gate(&mut self, metadata: QuantumMetadata, inputs: &[NodeId]) -> NodeId {
        let id = self.create_node_with_inputs(Opcode::QuantumGate, inputs);
        self.set_quantum_metadata(id, metadata);
        id
    }

    pub fn build_quantum_measure(&mut self, qubits: &[usize], input: NodeId) -> NodeId {
        let id = self.create_node_with_inputs(Opcode::QuantumMeasure, &[input]);
        self.set_quantum_metadata(
            id,
            QuantumMetadata::new(crate::opcode::GateType::Hadamard, qubits.to_vec(), Vec::new()),
        );
        id
    }

    // -- Concurrency --

    pub fn build_spawn(&mut self, target: NodeId, args: &[NodeId]) -> NodeId {
        let mut inputs = vec![target];
        inputs.extend_from_slice(args);
        self.create_node_with_inputs(Opcode::Spawn, &inputs)
    }

    pub fn build_nursery_begin(&mut self) -> NodeId {
        self.create_node(Opcode::NurseryBegin)
    }

    pub fn build_nursery_end(&mut self, nursery: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::NurseryEnd, &[nursery])
    }

    pub fn build_await(&mut self, value: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::Await, &[value])
    }

    pub fn build_async_call(&mut self, callee: impl Into<String>, args: &[NodeId]) -> NodeId {
        let id = self.create_node_with_inputs(Opcode::AsyncCall, args);
        self.set_data(id, NodeData::Str(callee.into()));
        id
    }

    pub fn build_channel_create(&mut self) -> NodeId {
        self.create_node(Opcode::ChannelCreate)
    }

    pub fn build_channel_send(&mut self, channel: NodeId, value: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::ChannelSend, &[channel, value])
    }

    pub fn build_channel_recv(&mut self, channel: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::ChannelRecv, &[channel])
    }

    pub fn build_channel_close(&mut self, channel: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::ChannelClose, &[channel])
    }

    pub fn build_channel_try_recv(&mut self, channel: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::ChannelTryRecv, &[channel])
    }

    pub fn build_channel_try_send(&mut self, channel: NodeId, value: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::ChannelTrySend, &[channel, value])
    }

    pub fn build_channel_is_closed(&mut self, channel: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::ChannelIsClosed, &[channel])
    }

    pub fn build_select_begin(&mut self) -> NodeId {
        self.create_node(Opcode::SelectBegin)
    }

    pub fn build_select_arm(&mut self, select: NodeId, channel: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::SelectArm, &[select, channel])
    }

    pub fn build_select_end(&mut self, select: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::SelectEnd, &[select])
    }

    pub fn build_using_begin(&mut self, resource: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::UsingBegin, &[resource])
    }

    pub fn build_using_end(&mut self, using: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::UsingEnd, &[using])
    }

    // -- Dispatch --

    pub fn build_trait_method_call(&mut self, method_name: impl Into<String>, receiver: NodeId, args: &[NodeId]) -> NodeId {
        let mut inputs = vec![receiver];
        inputs.extend_from_slice(args);
        let id = self.create_node_with_inputs(Opcode::TraitMethodCall, &inputs);
        self.set_data(id, NodeData::Str(method_name.into()));
        id
    }

    pub fn build_vtable_lookup(&mut self, receiver: NodeId) -> NodeId {
        self.create_node_with_inputs(Opcode::VtableLookup, &[receiver])
    }

    pub fn build_vtable_construct(&mut self, method_refs: &[NodeId]) -> NodeId {
        self.create_node_with_inputs(Opcode::VtableConstruct, method_refs)
    }

    pub fn build_impl_method_ref(&mut self, method_name: impl Into<String>) -> NodeId {
        let id = self.create_node(Opcode::ImplMethodRef);
        self.set_data(id, NodeData::Str(method_name.into()));
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic() {
        let mut b = GraphBuilder::new("f");
        let a = b.create_constant_int(1);
        let c = b.create_constant_int(2);
        assert_eq!(a, NodeId(0));
        assert_eq!(c, NodeId(1));
    }

    #[test]
    fn constant_sets_payload() {
        let mut b = GraphBuilder::new("f");
        let c = b.create_constant_int(42);
        let g = b.finish();
        assert_eq!(g.node(c).unwrap().data.as_integer(), Some(42));
    }

    #[test]
    fn binary_op_inputs_in_order() {
        let mut b = GraphBuilder::new("f");
        let x = b.create_constant_int(1);
        let y = b.create_constant_int(2);
        let add = b.build_binary(Opcode::Add, x, y);
        let g = b.finish();
        assert_eq!(&g.node(add).unwrap().inputs[..], &[x, y]);
    }

    #[test]
    fn tenancy_is_inherited_from_builder_current_tenancy() {
        let mut b = GraphBuilder::new("f");
        b.current_tenancy = Tenancy::NpuTensor;
        let id = b.create_constant_int(1);
        let g = b.finish();
        assert_eq!(g.node(id).unwrap().tenancy, Tenancy::NpuTensor);
    }

    #[test]
    fn patch_input_rewrites_placeholder_target() {
        let mut b = GraphBuilder::new("f");
        let cond = b.create_constant_bool(true);
        let branch = b.build_branch_placeholder(cond);
        let label = b.build_label();
        b.patch_input(branch, 1, label);
        let g = b.finish();
        assert_eq!(g.node(branch).unwrap().inputs[1], label);
    }

    #[test]
    fn field_access_stores_field_name_in_data() {
        let mut b = GraphBuilder::new("f");
        let s = b.build_alloca("s");
        let access = b.build_field_access(s, "x");
        let g = b.finish();
        assert_eq!(g.node(access).unwrap().data.as_str(), Some("x"));
    }

    #[test]
    fn closure_create_records_function_name_and_captures() {
        let mut b = GraphBuilder::new("f");
        let c0 = b.create_constant_int(1);
        let closure = b.build_closure_create("inner", &[c0]);
        let g = b.finish();
        let node = g.node(closure).unwrap();
        assert_eq!(node.data.as_str(), Some("inner"));
        assert_eq!(&node.inputs[..], &[c0]);
    }
}
