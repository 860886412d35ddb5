//! Per-function emission scratch threaded through every opcode family.

use std::collections::HashMap;

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::values::{BasicValueEnum, FunctionValue, PhiValue};

use qtjir_core::{ExternRegistry, Graph, NodeId};

/// A queued `Phi` awaiting its incoming `(value, block)` pairs, filled in
/// once every node in the graph has produced a value -- a `Phi`'s incoming
/// edge may originate from a node with a *higher* id than the `Phi` itself
/// when the edge comes from a loop latch.
pub struct PendingPhi<'ctx> {
    pub phi: PhiValue<'ctx>,
    pub incoming: Vec<NodeId>,
}

pub struct EmitState<'ctx, 'a> {
    pub context: &'ctx Context,
    pub module: &'a Module<'ctx>,
    pub builder: &'a Builder<'ctx>,
    pub function: FunctionValue<'ctx>,
    pub graph: &'a Graph,
    pub externs: &'a ExternRegistry,
    /// `Label` node id -> the basic block it opens.
    pub blocks: HashMap<NodeId, BasicBlock<'ctx>>,
    pub values: HashMap<NodeId, BasicValueEnum<'ctx>>,
    /// The block active when a node's value was produced, used to resolve
    /// `Phi` incoming edges.
    pub producer_block: HashMap<NodeId, BasicBlock<'ctx>>,
    pub pending_phis: Vec<PendingPhi<'ctx>>,
    pub thunk_counter: u32,
}

impl<'ctx, 'a> EmitState<'ctx, 'a> {
    pub fn record(&mut self, id: NodeId, value: BasicValueEnum<'ctx>) {
        self.values.insert(id, value);
        let block = self.builder.get_insert_block().expect("builder has an active block");
        self.producer_block.insert(id, block);
    }

    pub fn value_of(&self, id: NodeId) -> Option<BasicValueEnum<'ctx>> {
        self.values.get(&id).copied()
    }

    pub fn next_thunk_name(&mut self) -> String {
        let name = format!("qtjir_spawn_thunk_{}", self.thunk_counter);
        self.thunk_counter += 1;
        name
    }
}
