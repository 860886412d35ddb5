//! A single node in the QTJIR graph.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::data::NodeData;
use crate::id::NodeId;
use crate::level::Level;
use crate::metadata::{QuantumMetadata, TensorMetadata};
use crate::opcode::Opcode;
use crate::tenancy::Tenancy;

/// Ordered predecessor list. Most nodes have one or two inputs; `SmallVec`
/// keeps those inline without a heap allocation, matching the "CISC-like,
/// fewer nodes per program" sizing concern the op vocabulary itself is
/// designed around.
pub type InputList = SmallVec<[NodeId; 2]>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub op: Opcode,
    pub level: Level,
    pub tenancy: Tenancy,
    /// Ordered data/control predecessors. Order is semantically significant:
    /// operand 0 vs 1, branch true vs false, phi argument order.
    pub inputs: InputList,
    pub data: NodeData,
    pub tensor_metadata: Option<TensorMetadata>,
    pub quantum_metadata: Option<QuantumMetadata>,
    /// Backlink to the originating AST node, if this node was produced by
    /// lowering rather than by a pass.
    pub source_ast_id: Option<u32>,
}

impl Node {
    pub fn new(id: NodeId, op: Opcode, tenancy: Tenancy) -> Self {
        Node {
            id,
            op,
            level: Level::default(),
            tenancy,
            inputs: SmallVec::new(),
            data: NodeData::default(),
            tensor_metadata: None,
            quantum_metadata: None,
            source_ast_id: None,
        }
    }

    pub fn push_input(&mut self, input: NodeId) {
        self.inputs.push(input);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_node_has_no_inputs_and_high_level() {
        let n = Node::new(NodeId(0), Opcode::Constant, Tenancy::CpuSerial);
        assert!(n.inputs.is_empty());
        assert_eq!(n.level, Level::High);
        assert_eq!(n.data, NodeData::Unused);
    }

    #[test]
    fn push_input_appends_in_order() {
        let mut n = Node::new(NodeId(2), Opcode::Add, Tenancy::CpuSerial);
        n.push_input(NodeId(0));
        n.push_input(NodeId(1));
        assert_eq!(&n.inputs[..], &[NodeId(0), NodeId(1)]);
    }

    #[test]
    fn serde_roundtrip() {
        let mut n = Node::new(NodeId(3), Opcode::Store, Tenancy::CpuSerial);
        n.push_input(NodeId(1));
        n.push_input(NodeId(2));
        let json = serde_json::to_string(&n).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, NodeId(3));
        assert_eq!(&back.inputs[..], &[NodeId(1), NodeId(2)]);
    }
}
