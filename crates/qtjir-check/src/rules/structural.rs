//! Reference integrity, acyclicity, and ID-ordering checks.

use qtjir_core::{Graph, NodeId};

use crate::diagnostics::Diagnostic;

/// Every `input_id` in every node must index an existing node.
pub fn check_reference_integrity(graph: &Graph) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let count = graph.node_count();
    for node in graph.iter() {
        for &input in &node.inputs {
            if input.index() >= count {
                diagnostics.push(Diagnostic::error(
                    node.id,
                    format!("node {} references out-of-range input {}", node.id, input),
                ));
            }
        }
    }
    diagnostics
}

/// `node.id == index` must hold for every node in the graph.
pub fn check_id_ordering(graph: &Graph) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for (position, node) in graph.iter().enumerate() {
        if node.id.index() != position {
            diagnostics.push(Diagnostic::error(
                node.id,
                format!("node at position {position} carries mismatched id {}", node.id),
            ));
        }
    }
    diagnostics
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    Unvisited,
    Visiting,
    Visited,
}

/// DFS cycle detection over the input-edge graph. A back edge to a
/// `Visiting` node is a cycle; self-edges are a degenerate one-node cycle.
pub fn check_acyclicity(graph: &Graph) -> Vec<Diagnostic> {
    let count = graph.node_count();
    let mut colors = vec![Color::Unvisited; count];
    let mut diagnostics = Vec::new();
    let mut path = Vec::new();

    for start in 0..count {
        if colors[start] == Color::Unvisited {
            visit(graph, NodeId(start as u32), &mut colors, &mut path, &mut diagnostics);
        }
    }
    diagnostics
}

fn visit(
    graph: &Graph,
    id: NodeId,
    colors: &mut [Color],
    path: &mut Vec<NodeId>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let idx = id.index();
    if idx >= colors.len() {
        return;
    }
    colors[idx] = Color::Visiting;
    path.push(id);

    let Some(node) = graph.node(id) else {
        colors[idx] = Color::Visited;
        path.pop();
        return;
    };

    for &input in &node.inputs {
        if input.index() >= colors.len() {
            continue;
        }
        match colors[input.index()] {
            Color::Unvisited => visit(graph, input, colors, path, diagnostics),
            Color::Visiting => {
                let cycle_start = path.iter().position(|&n| n == input).unwrap_or(0);
                let cycle: Vec<String> = path[cycle_start..].iter().map(|n| n.to_string()).collect();
                diagnostics.push(Diagnostic::error(
                    id,
                    format!("cycle detected: {} -> {}", cycle.join(" -> "), input),
                ));
            }
            Color::Visited => {}
        }
    }

    colors[idx] = Color::Visited;
    path.pop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtjir_core::{GraphBuilder, Opcode};

    #[test]
    fn detects_out_of_range_input() {
        let mut b = GraphBuilder::new("f");
        let c = b.create_constant_int(1);
        let mut g = b.finish();
        g.node_mut(c).unwrap().push_input(NodeId(99));
        let diags = check_reference_integrity(&g);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn accepts_well_formed_graph() {
        let mut b = GraphBuilder::new("f");
        let x = b.create_constant_int(1);
        let y = b.create_constant_int(2);
        b.build_binary(Opcode::Add, x, y);
        let g = b.finish();
        assert!(check_reference_integrity(&g).is_empty());
        assert!(check_id_ordering(&g).is_empty());
        assert!(check_acyclicity(&g).is_empty());
    }

    #[test]
    fn detects_self_edge_as_degenerate_cycle() {
        let mut b = GraphBuilder::new("f");
        let c = b.create_constant_int(1);
        let mut g = b.finish();
        g.node_mut(c).unwrap().push_input(c);
        let diags = check_acyclicity(&g);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn detects_two_node_cycle() {
        let mut b = GraphBuilder::new("f");
        let a = b.create_constant_int(1);
        let c = b.create_constant_int(2);
        let mut g = b.finish();
        g.node_mut(a).unwrap().push_input(c);
        g.node_mut(c).unwrap().push_input(a);
        let diags = check_acyclicity(&g);
        assert!(!diags.is_empty());
    }

    #[test]
    fn detects_id_index_mismatch() {
        let mut b = GraphBuilder::new("f");
        b.create_constant_int(1);
        let mut g = b.finish();
        g.node_mut(NodeId(0)).unwrap().id = NodeId(7);
        let diags = check_id_ordering(&g);
        assert_eq!(diags.len(), 1);
    }
}
