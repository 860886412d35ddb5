//! The owned, append-only QTJIR graph.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::id::NodeId;
use crate::node::Node;

/// A formal function parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
}

/// A captured variable from an enclosing scope (closures).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capture {
    pub name: String,
    pub parent_alloca_id: NodeId,
    pub index: u32,
    pub is_mutable: bool,
}

/// Sentinel return-type string marking an error-union-returning function.
pub const ERROR_UNION_RETURN_TYPE: &str = "error_union";

/// The sovereign, owned graph of IR nodes for a single function or test.
///
/// Nodes are stored in a plain `Vec` so that `node.id == index` holds for
/// every node at every point in the graph's lifetime -- this is why QTJIR
/// stores nodes directly rather than in a `petgraph::StableGraph`, which
/// tolerates index holes after removal. The graph is created empty,
/// grown append-only by `GraphBuilder`, optionally rewritten in place by
/// transform passes, and is never aliased: a destroyed `Graph` frees every
/// owned string/metadata buffer exactly once by ordinary Rust drop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    nodes: Vec<Node>,
    pub function_name: String,
    pub return_type: String,
    pub parameters: Vec<Parameter>,
    pub captures: Vec<Capture>,
}

impl Graph {
    pub fn new(function_name: impl Into<String>) -> Self {
        Graph {
            nodes: Vec::new(),
            function_name: function_name.into(),
            return_type: "i32".to_string(),
            parameters: Vec::new(),
            captures: Vec::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn is_error_union_return(&self) -> bool {
        self.return_type == ERROR_UNION_RETURN_TYPE
    }

    /// Appends a fully-formed node, assigning it the next monotonic ID.
    /// Not part of the public builder surface -- `GraphBuilder` owns node
    /// construction and calls this once the node's fields are set.
    pub(crate) fn push_node(&mut self, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        node.id = id;
        self.nodes.push(node);
        id
    }

    /// Replaces the node vector wholesale. Used by passes (DCE renumbering,
    /// CSE rewiring) that must rebuild the graph under the `node.id ==
    /// index` invariant. Every ID inside `nodes` must already match its new
    /// position.
    pub fn replace_nodes(&mut self, nodes: Vec<Node>) {
        debug_assert!(
            nodes
                .iter()
                .enumerate()
                .all(|(i, n)| n.id.index() == i),
            "replace_nodes requires node.id == index for every node"
        );
        self.nodes = nodes;
    }

    /// A textual, ID-ordered listing of every node.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "graph {} -> {}",
            self.function_name, self.return_type
        );
        for node in &self.nodes {
            let _ = writeln!(
                out,
                "  %{} = {:?} [{:?}/{:?}] <- {:?}",
                node.id, node.op, node.level, node.tenancy, node.inputs
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::opcode::Opcode;
    use crate::tenancy::Tenancy;

    #[test]
    fn push_node_assigns_monotonic_ids() {
        let mut g = Graph::new("f");
        let a = g.push_node(Node::new(NodeId(999), Opcode::Constant, Tenancy::CpuSerial));
        let b = g.push_node(Node::new(NodeId(999), Opcode::Constant, Tenancy::CpuSerial));
        assert_eq!(a, NodeId(0));
        assert_eq!(b, NodeId(1));
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn node_id_equals_index_invariant() {
        let mut g = Graph::new("f");
        for _ in 0..5 {
            g.push_node(Node::new(NodeId(0), Opcode::Constant, Tenancy::CpuSerial));
        }
        for (i, n) in g.iter().enumerate() {
            assert_eq!(n.id.index(), i);
        }
    }

    #[test]
    fn is_error_union_return() {
        let mut g = Graph::new("f");
        assert!(!g.is_error_union_return());
        g.return_type = ERROR_UNION_RETURN_TYPE.to_string();
        assert!(g.is_error_union_return());
    }

    #[test]
    fn dump_lists_every_node() {
        let mut g = Graph::new("f");
        g.push_node(Node::new(NodeId(0), Opcode::Constant, Tenancy::CpuSerial));
        g.push_node(Node::new(NodeId(0), Opcode::Return, Tenancy::CpuSerial));
        let text = g.dump();
        assert!(text.contains("%0"));
        assert!(text.contains("%1"));
    }

    #[test]
    #[should_panic]
    fn replace_nodes_rejects_mismatched_ids_in_debug() {
        let mut g = Graph::new("f");
        let bad = Node::new(NodeId(5), Opcode::Constant, Tenancy::CpuSerial);
        g.replace_nodes(vec![bad]);
    }
}
