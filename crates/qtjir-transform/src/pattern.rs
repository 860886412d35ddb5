//! Structural node patterns used by passes to find rewrite sites.

use qtjir_core::{Graph, NodeId, Opcode, Tenancy};

/// A structural match over a single node and, recursively, its inputs.
/// Absent fields are wildcards; `inputs` when present also constrains
/// input arity.
#[derive(Debug, Clone, Default)]
pub struct Pattern {
    pub op: Option<Opcode>,
    pub tenancy: Option<Tenancy>,
    pub inputs: Option<Vec<Pattern>>,
}

impl Pattern {
    pub fn op(op: Opcode) -> Self {
        Pattern {
            op: Some(op),
            ..Default::default()
        }
    }

    pub fn with_tenancy(mut self, tenancy: Tenancy) -> Self {
        self.tenancy = Some(tenancy);
        self
    }

    pub fn with_inputs(mut self, inputs: Vec<Pattern>) -> Self {
        self.inputs = Some(inputs);
        self
    }

    /// `true` when every specified field agrees with `node_id`, recursing
    /// into `inputs` when present.
    pub fn matches(&self, graph: &Graph, node_id: NodeId) -> bool {
        let Some(node) = graph.node(node_id) else {
            return false;
        };

        if let Some(expected_op) = &self.op {
            if &node.op != expected_op {
                return false;
            }
        }

        if let Some(expected_tenancy) = self.tenancy {
            if node.tenancy != expected_tenancy {
                return false;
            }
        }

        if let Some(child_patterns) = &self.inputs {
            if node.inputs.len() != child_patterns.len() {
                return false;
            }
            for (child_pattern, &input_id) in child_patterns.iter().zip(node.inputs.iter()) {
                if !child_pattern.matches(graph, input_id) {
                    return false;
                }
            }
        }

        true
    }
}

/// Scans every node in `graph`, returning the IDs that satisfy `pattern`.
pub fn find_all_matches(graph: &Graph, pattern: &Pattern) -> Vec<NodeId> {
    graph
        .iter()
        .filter(|node| pattern.matches(graph, node.id))
        .map(|node| node.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtjir_core::GraphBuilder;

    #[test]
    fn wildcard_pattern_matches_any_op() {
        let mut b = GraphBuilder::new("f");
        let c = b.create_constant_int(1);
        let g = b.finish();
        assert!(Pattern::default().matches(&g, c));
    }

    #[test]
    fn op_pattern_rejects_mismatch() {
        let mut b = GraphBuilder::new("f");
        let c = b.create_constant_int(1);
        let g = b.finish();
        assert!(!Pattern::op(Opcode::Return).matches(&g, c));
        assert!(Pattern::op(Opcode::Constant).matches(&g, c));
    }

    #[test]
    fn nested_input_pattern_matches_recursively() {
        let mut b = GraphBuilder::new("f");
        let x = b.create_constant_int(1);
        let y = b.create_constant_int(2);
        let add = b.build_binary(Opcode::Add, x, y);
        let g = b.finish();

        let pattern = Pattern::op(Opcode::Add).with_inputs(vec![
            Pattern::op(Opcode::Constant),
            Pattern::op(Opcode::Constant),
        ]);
        assert!(pattern.matches(&g, add));
    }

    #[test]
    fn find_all_matches_scans_every_node() {
        let mut b = GraphBuilder::new("f");
        b.create_constant_int(1);
        b.create_constant_int(2);
        b.create_constant_bool(true);
        let g = b.finish();
        let matches = find_all_matches(&g, &Pattern::op(Opcode::Constant));
        assert_eq!(matches.len(), 3);
    }
}
